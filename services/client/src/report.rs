//! services/client/src/report.rs
//!
//! Plain-text renderings of analysis results and histories for the terminal.

use price_analysis_core::analysis::{
    group_by_supplier, manual_processing_items, stats, supplier_total_price, top_suppliers,
    DEFAULT_TOP_SUPPLIERS,
};
use price_analysis_core::domain::{
    CompanyGroup, PriceAnalysisResult, SupplierIdentity, UploadStats, UserRequest,
};
use price_analysis_core::format::format_price;
use std::fmt::{self, Write};

const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Runs `write` against a fresh `String`. Formatting into a `String` only
/// fails if a `Display` impl does, in which case the partial text is kept.
fn render(write: impl FnOnce(&mut String) -> fmt::Result) -> String {
    let mut out = String::new();
    if write(&mut out).is_err() {
        out.push_str("\n(report truncated)\n");
    }
    out
}

/// Renders one analysis run: summary, best suppliers, per-supplier lines and
/// the items that still need manual processing.
pub fn render_analysis_report(results: &[PriceAnalysisResult]) -> String {
    render(|out| write_analysis_report(out, results))
}

pub fn render_upload_stats(stats: &UploadStats) -> String {
    render(|out| write_upload_stats(out, stats))
}

pub fn render_profile_history(requests: &[UserRequest]) -> String {
    if requests.is_empty() {
        return "No requests yet.\n".to_string();
    }
    render(|out| write_profile_history(out, requests))
}

pub fn render_company_history(groups: &[CompanyGroup]) -> String {
    if groups.is_empty() {
        return "No uploads yet.\n".to_string();
    }
    render(|out| write_company_history(out, groups))
}

//=========================================================================================
// Writers
//=========================================================================================

fn write_analysis_report(out: &mut impl Write, results: &[PriceAnalysisResult]) -> fmt::Result {
    let summary = stats(results);
    writeln!(out, "Price analysis")?;
    writeln!(out, "  Requested items:    {}", summary.total_requested)?;
    writeln!(out, "  Found:              {}", summary.total_found)?;
    writeln!(out, "  Manual processing:  {}", summary.manual_processing_count)?;
    writeln!(out, "  Total cost:         {}", format_price(Some(summary.total_cost)))?;

    let top = top_suppliers(results, DEFAULT_TOP_SUPPLIERS);
    if !top.is_empty() {
        writeln!(out, "\nTop suppliers")?;
        for (place, ranking) in top.iter().enumerate() {
            let total = supplier_total_price(results, &ranking.supplier_name);
            writeln!(
                out,
                "  {}. {} ({} items, {})",
                place + 1,
                display_name(&ranking.supplier_name, ranking.info.as_ref()),
                ranking.count,
                format_price(Some(total))
            )?;
            if let Some(info) = &ranking.info {
                write_identity(out, info, "     ")?;
            }
        }
    }

    for group in group_by_supplier(results) {
        writeln!(
            out,
            "\n{} | {} items | {}",
            display_name(&group.supplier_name, group.supplier_info.as_ref()),
            group.product_count,
            format_price(Some(group.total_cost))
        )?;
        for item in &group.products {
            write_line_item(out, item)?;
        }
    }

    let manual = manual_processing_items(results);
    if !manual.is_empty() {
        writeln!(out, "\nRequires manual processing")?;
        for item in &manual {
            writeln!(out, "  {} x{}  {}", item.barcode, item.quantity, item.message)?;
        }
    }
    Ok(())
}

fn write_upload_stats(out: &mut impl Write, stats: &UploadStats) -> fmt::Result {
    let headline = if stats.message.is_empty() { "Upload finished" } else { stats.message.as_str() };
    writeln!(out, "{}", headline)?;
    writeln!(out, "  Processed: {}", stats.processed_records)?;
    writeln!(out, "  New:       {}", stats.new_records)?;
    writeln!(out, "  Updated:   {}", stats.updated_records)?;
    writeln!(out, "  Unchanged: {}", stats.unchanged_records)?;
    writeln!(out, "  Failed:    {}", stats.failed_records)
}

fn write_profile_history(out: &mut impl Write, requests: &[UserRequest]) -> fmt::Result {
    for request in requests {
        let summary = stats(&request.response_details);
        writeln!(
            out,
            "#{} {}  {} items, {} found, {}",
            request.id,
            request.timestamp.format(TIMESTAMP_FORMAT),
            summary.total_requested,
            summary.total_found,
            format_price(Some(summary.total_cost))
        )?;
    }
    Ok(())
}

fn write_company_history(out: &mut impl Write, groups: &[CompanyGroup]) -> fmt::Result {
    for group in groups {
        writeln!(out, "{} (tax id {}, phone {})", group.full_name, group.tax_id, group.phone)?;
        for request in &group.requests {
            writeln!(
                out,
                "  {}  {} lines",
                request.timestamp.format(TIMESTAMP_FORMAT),
                request.lines.len()
            )?;
        }
    }
    Ok(())
}

fn display_name<'a>(key: &'a str, info: Option<&'a SupplierIdentity>) -> &'a str {
    info.map(|info| info.name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(key)
}

fn write_identity(out: &mut impl Write, info: &SupplierIdentity, indent: &str) -> fmt::Result {
    for (label, value) in [
        ("Tax id", &info.tax_id),
        ("Address", &info.address),
        ("Phone", &info.phone),
        ("Email", &info.email),
    ] {
        if !value.is_empty() {
            writeln!(out, "{}{}: {}", indent, label, value)?;
        }
    }
    Ok(())
}

fn write_line_item(out: &mut impl Write, item: &PriceAnalysisResult) -> fmt::Result {
    writeln!(
        out,
        "  {} {} x{} @ {} = {}",
        item.barcode,
        item.product_name.as_deref().unwrap_or("—"),
        item.quantity,
        format_price(item.unit_price),
        format_price(item.total_price)
    )
}
