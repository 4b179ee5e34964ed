//! Release and task rollups over a subtree.
//!
//! One statement returns every workstream in the subtree together with the
//! release, task and done-task counts it owns directly. Totals are then folded
//! bottom-up in memory, so each node's summary covers itself and everything
//! beneath it.

use std::collections::{HashMap, HashSet};

use rusqlite::Connection;
use tracing::debug;

use crate::config::TRAVERSAL_LIMIT;
use crate::db::{row_to_workstream, WORKSTREAM_COLUMNS, WORKSTREAM_COLUMN_COUNT};
use crate::error::{Error, Result};
use crate::hierarchy::SUBTREE_CTE;
use crate::types::{RollupReport, RollupSummary, TaskStatus, Workstream, WorkstreamId, WorkstreamRef};

/// Builds [`RollupReport`]s against one read snapshot.
pub(crate) struct RollupAggregator<'c> {
    conn: &'c Connection,
}

impl<'c> RollupAggregator<'c> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Rollup of `id` and all of its descendants.
    pub(crate) fn report(&self, id: WorkstreamId) -> Result<RollupReport> {
        let rows = self.subtree_counts(id)?;
        let node_count = rows.len();

        let mut rows = rows.into_iter();
        let (root, root_summary) = rows.next().ok_or(Error::WorkstreamNotFound(id))?;

        let mut by_parent: HashMap<WorkstreamId, Vec<(Workstream, RollupSummary)>> = HashMap::new();
        for (ws, summary) in rows {
            if let Some(parent) = ws.parent {
                by_parent.entry(parent).or_default().push((ws, summary));
            }
        }

        let report = fold(&root, root_summary, &mut by_parent);
        debug!(
            workstream = %id,
            nodes = node_count,
            tasks = report.summary.total_tasks,
            "Computed rollup"
        );
        Ok(report)
    }

    /// Each subtree node with its directly owned counts, root first, then by
    /// depth, name and id.
    fn subtree_counts(&self, id: WorkstreamId) -> Result<Vec<(Workstream, RollupSummary)>> {
        let sql = format!(
            "{SUBTREE_CTE}
             SELECT {WORKSTREAM_COLUMNS},
                 (SELECT COUNT(*) FROM releases r WHERE r.workstream_id = w.id),
                 (SELECT COUNT(*) FROM tasks t JOIN releases r ON r.id = t.release_id
                  WHERE r.workstream_id = w.id),
                 (SELECT COUNT(*) FROM tasks t JOIN releases r ON r.id = t.release_id
                  WHERE r.workstream_id = w.id AND t.status = ?3)
             FROM sub s
             JOIN workstreams w ON w.id = s.id
             ORDER BY s.hops, w.name, w.id"
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(
                rusqlite::params![id.as_i64(), i64::from(TRAVERSAL_LIMIT), TaskStatus::Done.as_str()],
                |row| {
                    let ws = row_to_workstream(row)?;
                    let summary = RollupSummary::new(
                        row.get(WORKSTREAM_COLUMN_COUNT)?,
                        row.get(WORKSTREAM_COLUMN_COUNT + 1)?,
                        row.get(WORKSTREAM_COLUMN_COUNT + 2)?,
                    );
                    Ok((ws, summary))
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if rows.is_empty() {
            return Err(Error::WorkstreamNotFound(id));
        }

        let mut seen = HashSet::with_capacity(rows.len());
        Ok(rows.into_iter().filter(|(w, _)| seen.insert(w.id)).collect())
    }
}

fn fold(
    ws: &Workstream,
    own: RollupSummary,
    by_parent: &mut HashMap<WorkstreamId, Vec<(Workstream, RollupSummary)>>,
) -> RollupReport {
    let children: Vec<RollupReport> = by_parent
        .remove(&ws.id)
        .unwrap_or_default()
        .into_iter()
        .map(|(child, summary)| fold(&child, summary, by_parent))
        .collect();

    let summary = children
        .iter()
        .fold(own, |acc, child| acc.merge(child.summary));

    RollupReport {
        workstream: WorkstreamRef::from(ws),
        summary,
        child_workstreams: children,
    }
}

/// Ids of every workstream covered by a report.
pub(crate) fn report_ids(report: &RollupReport) -> HashSet<WorkstreamId> {
    let mut ids = HashSet::new();
    let mut stack = vec![report];
    while let Some(node) = stack.pop() {
        ids.insert(node.workstream.id);
        stack.extend(node.child_workstreams.iter());
    }
    ids
}
