//! services/client/src/adapters/wire.rs
//!
//! JSON shapes exchanged with the remote API. Each "impure" wire struct maps
//! to and from the pure domain types of the core crate.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use price_analysis_core::domain::{
    AdminUserRequest, PriceAnalysisResult, RefreshedToken, RequestedLine, Role, Session,
    SubscriptionStatus, SupplierGroup, SupplierIdentity, UploadStats, UserRequest,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

//=========================================================================================
// Authentication
//=========================================================================================

#[derive(Serialize, Debug)]
pub struct LoginRequest<'a> {
    pub phone: &'a str,
    pub password: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest<'a> {
    pub inn: &'a str,
    pub full_name: &'a str,
    pub phone: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<&'a str>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoleRecord {
    User,
    Admin,
}

impl From<RoleRecord> for Role {
    fn from(role: RoleRecord) -> Self {
        match role {
            RoleRecord::User => Role::User,
            RoleRecord::Admin => Role::Admin,
        }
    }
}

impl From<Role> for RoleRecord {
    fn from(role: Role) -> Self {
        match role {
            Role::User => RoleRecord::User,
            Role::Admin => RoleRecord::Admin,
        }
    }
}

/// Answer of `/auth/login` and `/auth/register`.
///
/// Older deployments answer with `token` and no refresh token or lifetime.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub role: RoleRecord,
    /// Access token lifetime in milliseconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl AuthResponse {
    pub fn into_session(self, email: Option<String>, now: DateTime<Utc>) -> Session {
        let access_token_expires_at = self
            .expires_in
            .map(|millis| Session::expiry_after(now, lifetime(millis)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token.unwrap_or_default(),
            role: self.role.into(),
            email,
            access_token_expires_at,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    /// Milliseconds.
    pub expires_in: i64,
}

/// A server-sent lifetime in milliseconds; negative values count as already expired.
fn lifetime(millis: i64) -> Duration {
    Duration::milliseconds(millis.max(0))
}

impl RefreshResponse {
    pub fn to_domain(self) -> RefreshedToken {
        RefreshedToken {
            access_token: self.access_token,
            expires_in: lifetime(self.expires_in),
        }
    }
}

/// The persisted session as written by the file store.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub role: RoleRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

//=========================================================================================
// Price Analysis
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PriceAnalysisRecord {
    pub barcode: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub total_price: Option<Decimal>,
    #[serde(default)]
    pub requires_manual_processing: bool,
    #[serde(default)]
    pub message: String,
}

impl PriceAnalysisRecord {
    pub fn to_domain(self) -> PriceAnalysisResult {
        PriceAnalysisResult {
            barcode: self.barcode,
            quantity: self.quantity,
            product_name: self.product_name,
            supplier_name: self.supplier_name,
            unit_price: self.unit_price,
            total_price: self.total_price,
            requires_manual_processing: self.requires_manual_processing,
            message: self.message,
        }
    }

    pub fn from_domain(result: &PriceAnalysisResult) -> Self {
        Self {
            barcode: result.barcode.clone(),
            quantity: result.quantity,
            product_name: result.product_name.clone(),
            supplier_name: result.supplier_name.clone(),
            unit_price: result.unit_price,
            total_price: result.total_price,
            requires_manual_processing: result.requires_manual_processing,
            message: result.message.clone(),
        }
    }
}

/// Row shape of `/data/export-detailed-analysis`: missing values become empty or zero.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DetailedExportRow {
    pub barcode: String,
    pub quantity: u32,
    pub product_name: String,
    pub supplier_name: String,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub requires_manual_processing: bool,
    pub message: String,
}

impl DetailedExportRow {
    pub fn from_domain(result: &PriceAnalysisResult) -> Self {
        Self {
            barcode: result.barcode.clone(),
            quantity: result.quantity,
            product_name: result.product_name.clone().unwrap_or_default(),
            supplier_name: result.supplier_name.clone().unwrap_or_default(),
            unit_price: result.unit_price.unwrap_or_default(),
            total_price: result.total_price.unwrap_or_default(),
            requires_manual_processing: result.requires_manual_processing,
            message: result.message.clone(),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SupplierIdentityRecord {
    pub name: String,
    pub inn: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

impl SupplierIdentityRecord {
    pub fn from_domain(identity: &SupplierIdentity) -> Self {
        Self {
            name: identity.name.clone(),
            inn: identity.tax_id.clone(),
            address: identity.address.clone(),
            phone: identity.phone.clone(),
            email: identity.email.clone(),
        }
    }
}

/// Body of `/data/export-supplier-results` and `/data/export-invoice`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SupplierExportRequest {
    pub supplier_name: String,
    pub supplier_info: Option<SupplierIdentityRecord>,
    pub products: Vec<PriceAnalysisRecord>,
    pub total_cost: Decimal,
    pub product_count: usize,
}

impl SupplierExportRequest {
    pub fn from_domain(group: &SupplierGroup) -> Self {
        Self {
            supplier_name: group.supplier_name.clone(),
            supplier_info: group.supplier_info.as_ref().map(SupplierIdentityRecord::from_domain),
            products: group.products.iter().map(PriceAnalysisRecord::from_domain).collect(),
            total_cost: group.total_cost,
            product_count: group.product_count,
        }
    }
}

//=========================================================================================
// History
//=========================================================================================

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserRequestRecord {
    pub id: i64,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub request_details: String,
    #[serde(default)]
    pub response_details: Vec<PriceAnalysisRecord>,
}

impl UserRequestRecord {
    pub fn to_domain(self) -> UserRequest {
        UserRequest {
            id: self.id,
            timestamp: self.timestamp,
            request_details: self.request_details,
            response_details: self
                .response_details
                .into_iter()
                .map(PriceAnalysisRecord::to_domain)
                .collect(),
        }
    }
}

const BARCODE_KEYS: &[&str] = &["barcode", "Штрихкод", "Штрих-код", "barCode", "code", "Код"];
const QUANTITY_KEYS: &[&str] = &["quantity", "Количество", "qty", "Кол-во", "count"];

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserRequestRecord {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub inn: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub file_content: Option<Vec<Map<String, Value>>>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl AdminUserRequestRecord {
    /// Recovers barcode/quantity pairs from the free-form uploaded rows,
    /// dropping rows without a barcode or with a non-positive quantity.
    pub fn to_domain(self) -> AdminUserRequest {
        let lines = self
            .file_content
            .unwrap_or_default()
            .iter()
            .filter_map(|row| {
                let barcode = first_value(row, BARCODE_KEYS)
                    .map(value_to_text)
                    .unwrap_or_default();
                let quantity = first_value(row, QUANTITY_KEYS)
                    .and_then(value_to_quantity)
                    .unwrap_or(0);
                (!barcode.is_empty() && quantity > 0).then_some(RequestedLine { barcode, quantity })
            })
            .collect();

        AdminUserRequest {
            full_name: self.full_name,
            tax_id: self.inn,
            phone: self.phone,
            lines,
            timestamp: self.timestamp,
        }
    }
}

/// The first non-empty, non-zero value stored under any of `keys`.
fn first_value<'a>(row: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|key| row.get(*key)).find(|value| match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => true,
    })
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

fn value_to_quantity(value: &Value) -> Option<u32> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (number.is_finite() && number > 0.0 && number <= u32::MAX as f64).then(|| number as u32)
}

/// Row shape of `/data/export-history-to-excel`.
#[derive(Serialize, Debug)]
pub struct HistoryExportRow {
    #[serde(rename = "Штрихкод")]
    pub barcode: String,
    #[serde(rename = "Количество")]
    pub quantity: u32,
}

impl HistoryExportRow {
    pub fn from_domain(line: &RequestedLine) -> Self {
        Self {
            barcode: line.barcode.clone(),
            quantity: line.quantity,
        }
    }
}

/// Accepts RFC 3339 timestamps as well as offset-less ones, which are taken as UTC.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

//=========================================================================================
// Uploads and Subscriptions
//=========================================================================================

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadStatsRecord {
    pub success: bool,
    pub message: String,
    pub new_records: u64,
    pub updated_records: u64,
    pub unchanged_records: u64,
    pub processed_records: u64,
    pub failed_records: u64,
}

impl UploadStatsRecord {
    pub fn to_domain(self) -> UploadStats {
        UploadStats {
            success: self.success,
            message: self.message,
            new_records: self.new_records,
            updated_records: self.updated_records,
            unchanged_records: self.unchanged_records,
            processed_records: self.processed_records,
            failed_records: self.failed_records,
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatusRecord {
    pub is_expired: bool,
}

impl SubscriptionStatusRecord {
    pub fn to_domain(self) -> SubscriptionStatus {
        SubscriptionStatus {
            is_expired: self.is_expired,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GrantRequest<'a> {
    pub email: &'a str,
    pub minutes_to_add: u32,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct GrantResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
}

/// The `{"message": ...}` envelope the API uses for errors.
#[derive(Deserialize, Debug)]
pub struct ErrorBody {
    pub message: Option<String>,
}

/// Extracts the server-provided message from an error body, if there is one.
pub fn server_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.message)
        .filter(|message| !message.trim().is_empty())
}
