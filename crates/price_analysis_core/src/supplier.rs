//! crates/price_analysis_core/src/supplier.rs
//!
//! Parses the comma-separated supplier descriptor the API returns in
//! `supplierName` into a structured [`SupplierIdentity`].
//!
//! Grammar, applied to the comma-split and trimmed segments:
//!
//! ```text
//! name [, taxId] [, address segment]* [, phone | email]*
//! ```
//!
//! - Segment 0 is always the name.
//! - Segment 1 is the tax id when it is exactly 10 or 12 digits.
//! - Every later segment matching the phone pattern is a phone; they are joined with `", "`.
//! - The first later segment containing `@` is the email.
//! - The address is every segment between the name/tax id and the first phone or email.
//!
//! A descriptor with no tax id, phone or email is not structured at all and the
//! whole raw string becomes the name.

use regex::Regex;
use std::sync::OnceLock;

use crate::domain::SupplierIdentity;

const SEPARATOR: &str = ", ";

fn phone_pattern() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| {
        Regex::new(r"^[78]\s?\(\d{3}\)\s?\d{3}[- ]?\d{2}[- ]?\d{2}$")
            .expect("phone pattern is a valid regex")
    })
}

fn is_tax_id(segment: &str) -> bool {
    matches!(segment.len(), 10 | 12) && segment.chars().all(|c| c.is_ascii_digit())
}

fn is_phone(segment: &str) -> bool {
    phone_pattern().is_match(segment)
}

fn is_email(segment: &str) -> bool {
    segment.contains('@')
}

/// Parses a raw supplier descriptor. Returns `None` only for a missing or blank input.
pub fn parse_supplier_identity(raw: Option<&str>) -> Option<SupplierIdentity> {
    let raw = raw?;
    if raw.trim().is_empty() {
        return None;
    }

    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();

    let tax_id = parts.get(1).copied().filter(|segment| is_tax_id(segment));
    let email_index = parts
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, segment)| is_email(segment))
        .map(|(index, _)| index);
    let phone_indices: Vec<usize> = parts
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, segment)| is_phone(segment))
        .map(|(index, _)| index)
        .collect();

    if tax_id.is_none() && email_index.is_none() && phone_indices.is_empty() {
        return Some(SupplierIdentity {
            name: raw.to_string(),
            ..SupplierIdentity::default()
        });
    }

    let address_start = if tax_id.is_some() { 2 } else { 1 };
    let address_end = [email_index, phone_indices.first().copied()]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(parts.len());

    let address = if address_end > address_start {
        parts[address_start..address_end].join(SEPARATOR)
    } else {
        String::new()
    };

    let phone = phone_indices
        .iter()
        .map(|&index| parts[index])
        .collect::<Vec<_>>()
        .join(SEPARATOR);

    Some(SupplierIdentity {
        name: parts[0].to_string(),
        tax_id: tax_id.unwrap_or_default().to_string(),
        address,
        phone,
        email: email_index.map(|index| parts[index].to_string()).unwrap_or_default(),
    })
}

/// The key results are grouped under: the parsed display name, or the raw string.
pub fn supplier_key(raw: &str) -> String {
    parse_supplier_identity(Some(raw))
        .map(|identity| identity.name)
        .unwrap_or_else(|| raw.to_string())
}
