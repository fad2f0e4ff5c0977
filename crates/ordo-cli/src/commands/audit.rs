//! Density audits.

use anyhow::{bail, Result};
use ordo_core::allocator::{DensityReport, SequenceAllocator};
use ordo_core::category::Category;
use uuid::Uuid;

pub fn run(
    allocator: &SequenceAllocator,
    owner: Uuid,
    category: Option<Category>,
) -> Result<()> {
    let reports = match category {
        Some(category) => vec![allocator.audit_group(owner, category)?],
        None => allocator.audit_owner(owner)?,
    };

    let mut violations = 0usize;
    for report in &reports {
        print_report(report);
        if !report.is_dense() {
            violations += 1;
        }
    }

    if violations > 0 {
        bail!("{violations} group(s) violate the density invariant");
    }
    println!("all groups dense");
    Ok(())
}

fn print_report(report: &DensityReport) {
    let status = if report.is_dense() { "ok" } else { "BROKEN" };
    println!(
        "{:<12} {}  counter={} articles={}",
        report.category.to_string(),
        status,
        report.counter_size,
        report.article_count
    );
    if !report.missing.is_empty() {
        println!("             missing seqs: {:?}", report.missing);
    }
    if !report.duplicates.is_empty() {
        println!("             duplicate seqs: {:?}", report.duplicates);
    }
    if !report.out_of_range.is_empty() {
        println!("             out-of-range seqs: {:?}", report.out_of_range);
    }
}
