//! Common display utilities for CLI commands.

use colored::Colorize;
use strata::{
    PermissionSet, RollupReport, RollupSummary, TreeNode, Workstream, WorkstreamRef,
    WorkstreamStatus,
};

/// Apply color to a workstream status.
pub fn colorize_status(status: WorkstreamStatus) -> String {
    let text = status.as_str();
    match status {
        WorkstreamStatus::Planned => text.white().to_string(),
        WorkstreamStatus::Active => text.green().to_string(),
        WorkstreamStatus::Paused => text.yellow().to_string(),
        WorkstreamStatus::Completed => text.blue().to_string(),
        WorkstreamStatus::Archived => text.dimmed().to_string(),
    }
}

/// One-line summary: glyph, id, name, status.
pub fn workstream_line(ws: &Workstream) -> String {
    format!(
        "{} {} {} [{}]",
        ws.kind.traits().glyph,
        format!("#{}", ws.id).cyan(),
        ws.name.bold(),
        colorize_status(ws.status)
    )
}

/// Print workstreams as a bulleted list, or `empty_message` if there are none.
pub fn print_workstreams(workstreams: &[Workstream], empty_message: &str) {
    if workstreams.is_empty() {
        println!("  {}", empty_message.dimmed());
        return;
    }
    for ws in workstreams {
        println!("  {} {}", "•".dimmed(), workstream_line(ws));
    }
}

/// Print a tree with box-drawing connectors.
///
/// ```text
/// ◆ #1 Platform [active]
/// ├── ● #2 Search [planned]
/// │   └── ○ #4 Ranking [planned]
/// └── ● #3 Storage [active]
/// ```
pub fn print_tree(tree: &TreeNode) {
    println!("{}", workstream_line(&tree.workstream));
    print_tree_children(&tree.children, "");
}

fn print_tree_children(children: &[TreeNode], prefix: &str) {
    for (i, child) in children.iter().enumerate() {
        let last = i + 1 == children.len();
        let (branch, indent) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
        println!("{prefix}{}{}", branch.dimmed(), workstream_line(&child.workstream));
        print_tree_children(&child.children, &format!("{prefix}{indent}"));
    }
}

/// Print a permission set, or `(none)`.
pub fn permissions_text(permissions: &PermissionSet) -> String {
    if permissions.is_empty() {
        permissions.to_string().dimmed().to_string()
    } else {
        permissions.to_string().green().bold().to_string()
    }
}

fn summary_text(summary: &RollupSummary) -> String {
    let pct = format!("{:.1}%", summary.completion_percentage);
    let pct = if summary.total_tasks == 0 {
        pct.dimmed().to_string()
    } else if summary.completed_tasks == summary.total_tasks {
        pct.green().to_string()
    } else {
        pct.yellow().to_string()
    };
    format!(
        "{pct} ({}/{} tasks, {} releases)",
        summary.completed_tasks, summary.total_tasks, summary.total_releases
    )
}

fn rollup_label(ws: &WorkstreamRef) -> String {
    format!("{} {}", format!("#{}", ws.id).cyan(), ws.name.bold())
}

/// Print a rollup report as a tree, one summary per node.
pub fn print_rollup(report: &RollupReport) {
    println!("{}  {}", rollup_label(&report.workstream), summary_text(&report.summary));
    print_rollup_children(&report.child_workstreams, "");
}

fn print_rollup_children(children: &[RollupReport], prefix: &str) {
    for (i, child) in children.iter().enumerate() {
        let last = i + 1 == children.len();
        let (branch, indent) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
        println!(
            "{prefix}{}{}  {}",
            branch.dimmed(),
            rollup_label(&child.workstream),
            summary_text(&child.summary)
        );
        print_rollup_children(&child.child_workstreams, &format!("{prefix}{indent}"));
    }
}
