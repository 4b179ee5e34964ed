//! Reporting commands: `rollup` and `check`.

use anyhow::{bail, Result};
use colored::Colorize;
use strata::{IntegrityReport, Strata, WorkstreamId};

use super::display::print_rollup;
use super::{print_json, OutputMode};

/// Run the rollup command.
pub fn rollup(strata: &Strata, id: WorkstreamId, mode: OutputMode) -> Result<()> {
    let report = strata.rollup_report(id)?;

    match mode {
        OutputMode::Json => print_json(&report)?,
        OutputMode::Text => print_rollup(&report),
    }
    Ok(())
}

/// Run the check command. Fails when problems are found.
pub fn check(strata: &Strata, mode: OutputMode) -> Result<()> {
    let report = strata.verify_integrity()?;

    if mode == OutputMode::Json {
        print_json(&report)?;
    } else {
        print_findings(&report, strata.config().max_depth);
    }

    if !report.is_healthy() {
        bail!("integrity check found {} problem(s)", report.issue_count());
    }
    Ok(())
}

fn print_findings(report: &IntegrityReport, max_depth: u32) {
    if report.is_healthy() {
        println!(
            "{} {} workstreams checked, no problems found",
            "OK".green().bold(),
            report.checked
        );
        return;
    }

    for cycle in &report.cycles {
        let ids: Vec<_> = cycle.iter().map(|id| format!("#{id}")).collect();
        println!("{} cycle through {}", "✗".red(), ids.join(" → "));
    }
    for dangling in &report.dangling_parents {
        println!(
            "{} #{} points at missing parent #{}",
            "✗".red(),
            dangling.node,
            dangling.parent
        );
    }
    for violation in &report.depth_violations {
        println!(
            "{} #{} is at depth {} (max {})",
            "✗".red(),
            violation.node,
            violation.depth,
            max_depth
        );
    }
    for link in &report.cross_tenant_links {
        println!(
            "{} #{} ({}) is under #{} ({})",
            "✗".red(),
            link.node,
            link.node_tenant,
            link.parent,
            link.parent_tenant
        );
    }
}
