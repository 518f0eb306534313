//! crates/price_analysis_core/src/analysis.rs
//!
//! Aggregates the flat list of per-line-item results from one analysis run
//! into the supplier-ranked views shown to the user and used for export.
//!
//! Every function here is pure: the input is never mutated and identical input
//! always yields identical output.

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::domain::{AnalysisStats, PriceAnalysisResult, SupplierGroup, SupplierRanking};
use crate::supplier::{parse_supplier_identity, supplier_key};

/// The supplier descriptor of an item that takes part in supplier aggregation.
fn aggregatable_supplier(item: &PriceAnalysisResult) -> Option<&str> {
    if item.requires_manual_processing {
        return None;
    }
    item.supplier_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
}

fn line_total(item: &PriceAnalysisResult) -> Decimal {
    item.total_price.unwrap_or(Decimal::ZERO)
}

/// Groups priced items by resolved supplier name, in first-seen order.
pub fn group_by_supplier(results: &[PriceAnalysisResult]) -> Vec<SupplierGroup> {
    let mut groups: Vec<SupplierGroup> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for item in results {
        let Some(raw) = aggregatable_supplier(item) else {
            continue;
        };
        let key = supplier_key(raw);

        match positions.get(&key) {
            Some(&position) => {
                let group = &mut groups[position];
                group.total_cost += line_total(item);
                group.product_count += 1;
                group.products.push(item.clone());
            }
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push(SupplierGroup {
                    supplier_name: key,
                    supplier_info: parse_supplier_identity(Some(raw)),
                    products: vec![item.clone()],
                    total_cost: line_total(item),
                    product_count: 1,
                });
            }
        }
    }

    groups
}

/// The `limit` suppliers that won the most line items, most first.
///
/// Ties keep first-seen order.
pub fn top_suppliers(results: &[PriceAnalysisResult], limit: usize) -> Vec<SupplierRanking> {
    let mut rankings: Vec<SupplierRanking> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for item in results {
        let Some(raw) = aggregatable_supplier(item) else {
            continue;
        };
        let key = supplier_key(raw);

        match positions.get(&key) {
            Some(&position) => rankings[position].count += 1,
            None => {
                positions.insert(key.clone(), rankings.len());
                rankings.push(SupplierRanking {
                    supplier_name: key,
                    count: 1,
                    info: parse_supplier_identity(Some(raw)),
                });
            }
        }
    }

    // `sort_by` is stable, which keeps insertion order among equal counts.
    rankings.sort_by(|a, b| b.count.cmp(&a.count));
    rankings.truncate(limit);
    rankings
}

pub const DEFAULT_TOP_SUPPLIERS: usize = 3;

/// Items the server could not price-match, in their original order.
pub fn manual_processing_items(results: &[PriceAnalysisResult]) -> Vec<PriceAnalysisResult> {
    results
        .iter()
        .filter(|item| item.requires_manual_processing)
        .cloned()
        .collect()
}

pub fn stats(results: &[PriceAnalysisResult]) -> AnalysisStats {
    let manual_processing_count = results
        .iter()
        .filter(|item| item.requires_manual_processing)
        .count();

    AnalysisStats {
        total_requested: results.len(),
        total_found: results.len() - manual_processing_count,
        manual_processing_count,
        total_cost: results.iter().map(line_total).sum(),
    }
}

/// Sum of line totals for one resolved supplier name, excluding manual items.
pub fn supplier_total_price(results: &[PriceAnalysisResult], supplier_name: &str) -> Decimal {
    results
        .iter()
        .filter(|item| !item.requires_manual_processing)
        .filter(|item| {
            item.supplier_name
                .as_deref()
                .is_some_and(|raw| supplier_key(raw) == supplier_name)
        })
        .map(line_total)
        .sum()
}
