//! crates/price_analysis_core/src/history.rs
//!
//! Grouping of the admin upload history per company.

use std::collections::HashMap;

use crate::domain::{AdminUserRequest, CompanyGroup};

/// Groups requests by `(tax_id, full_name)`.
///
/// Requests inside a group are ordered newest first and groups are ordered
/// by company name.
pub fn group_requests_by_company(requests: &[AdminUserRequest]) -> Vec<CompanyGroup> {
    let mut groups: Vec<CompanyGroup> = Vec::new();
    let mut positions: HashMap<(&str, &str), usize> = HashMap::new();

    for request in requests {
        let key = (request.tax_id.as_str(), request.full_name.as_str());
        let position = *positions.entry(key).or_insert_with(|| {
            groups.push(CompanyGroup {
                full_name: request.full_name.clone(),
                tax_id: request.tax_id.clone(),
                phone: request.phone.clone(),
                requests: Vec::new(),
            });
            groups.len() - 1
        });
        groups[position].requests.push(request.clone());
    }

    for group in &mut groups {
        group.requests.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }
    groups.sort_by(|a, b| a.full_name.cmp(&b.full_name));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn request(name: &str, tax_id: &str, day: u32) -> AdminUserRequest {
        AdminUserRequest {
            full_name: name.into(),
            tax_id: tax_id.into(),
            phone: "89990001122".into(),
            lines: Vec::new(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn groups_sorted_by_name_with_newest_request_first() {
        let requests = vec![
            request("Zeta", "1111111111", 1),
            request("Alpha", "2222222222", 3),
            request("Zeta", "1111111111", 9),
            request("Alpha", "2222222222", 2),
        ];

        let groups = group_requests_by_company(&requests);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].full_name, "Alpha");
        assert_eq!(groups[1].full_name, "Zeta");
        assert_eq!(groups[1].requests[0].timestamp.format("%d").to_string(), "09");
        assert_eq!(groups[0].requests[1].timestamp.format("%d").to_string(), "02");
    }

    #[test]
    fn same_name_different_tax_id_is_a_separate_company() {
        let requests = vec![
            request("Acme", "1111111111", 1),
            request("Acme", "3333333333", 2),
        ];
        assert_eq!(group_requests_by_company(&requests).len(), 2);
    }
}
