//! crates/price_analysis_core/src/domain.rs
//!
//! Defines the pure, core data structures for the price analysis client.
//! These structs are independent of any transport or serialization format.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

//=========================================================================================
// Authentication
//=========================================================================================

/// The role the API granted to the authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

/// The authenticated user's credential state.
///
/// At most one `Session` is active per client instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub role: Role,
    pub email: Option<String>,
    pub access_token_expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The instant a token issued at `now` with `lifetime` expires.
    ///
    /// Lifetimes that overflow the calendar never expire.
    pub fn expiry_after(now: DateTime<Utc>, lifetime: Duration) -> DateTime<Utc> {
        now.checked_add_signed(lifetime)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether the access token is past its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.access_token_expires_at
    }
}

/// A freshly minted access token returned by the refresh endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in: Duration,
}

//=========================================================================================
// Price Analysis
//=========================================================================================

/// One requested line item's outcome, as computed by the remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceAnalysisResult {
    pub barcode: String,
    pub quantity: u32,
    pub product_name: Option<String>,
    /// Semi-structured supplier descriptor, see [`crate::supplier::parse_supplier_identity`].
    pub supplier_name: Option<String>,
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
    pub requires_manual_processing: bool,
    pub message: String,
}

/// Parsed view of a supplier descriptor string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SupplierIdentity {
    pub name: String,
    pub tax_id: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

/// Aggregation unit used for display and per-supplier export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierGroup {
    pub supplier_name: String,
    pub supplier_info: Option<SupplierIdentity>,
    pub products: Vec<PriceAnalysisResult>,
    pub total_cost: Decimal,
    pub product_count: usize,
}

/// A supplier ranked by how many line items it won.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierRanking {
    pub supplier_name: String,
    pub count: usize,
    pub info: Option<SupplierIdentity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisStats {
    pub total_requested: usize,
    pub total_found: usize,
    pub manual_processing_count: usize,
    pub total_cost: Decimal,
}

//=========================================================================================
// History
//=========================================================================================

/// A past analysis request from the user's own profile history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRequest {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub request_details: String,
    pub response_details: Vec<PriceAnalysisResult>,
}

/// A barcode/quantity pair recovered from an uploaded request file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedLine {
    pub barcode: String,
    pub quantity: u32,
}

/// A file upload made by any company, as seen from the admin history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUserRequest {
    pub full_name: String,
    pub tax_id: String,
    pub phone: String,
    pub lines: Vec<RequestedLine>,
    pub timestamp: DateTime<Utc>,
}

/// Admin history requests grouped per company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyGroup {
    pub full_name: String,
    pub tax_id: String,
    pub phone: String,
    pub requests: Vec<AdminUserRequest>,
}

//=========================================================================================
// Uploads, Subscriptions and Downloads
//=========================================================================================

/// Statistics returned after uploading a supplier price list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadStats {
    pub success: bool,
    pub message: String,
    pub new_records: u64,
    pub updated_records: u64,
    pub unchanged_records: u64,
    pub processed_records: u64,
    pub failed_records: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionStatus {
    pub is_expired: bool,
}

/// A binary spreadsheet returned by the API, with the name it should be saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub bytes: bytes::Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_expiry_is_inclusive() {
        let now = Utc::now();
        let session = Session {
            access_token: "a".into(),
            refresh_token: "r".into(),
            role: Role::Admin,
            email: None,
            access_token_expires_at: now,
        };
        assert!(session.is_expired_at(now));
        assert!(!session.is_expired_at(now - Duration::seconds(1)));
        assert!(session.is_admin());
    }

    #[test]
    fn oversized_lifetime_saturates_instead_of_overflowing() {
        let now = Utc::now();
        assert_eq!(
            Session::expiry_after(now, Duration::milliseconds(i64::MAX)),
            DateTime::<Utc>::MAX_UTC
        );
        assert_eq!(Session::expiry_after(now, Duration::minutes(15)), now + Duration::minutes(15));
    }
}
