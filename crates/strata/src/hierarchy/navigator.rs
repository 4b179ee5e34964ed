//! Recursive-CTE traversals over the `workstreams` table.
//!
//! Every traversal is one statement: the recursive CTE walks `parent_id` links
//! (up for chains, down for subtrees) and the final `SELECT` joins the rows it
//! needs. The starting node is included at `hops = 0`, so an empty result is
//! the "not found" signal and no separate existence query is issued.
//!
//! Recursion is bounded by a hop limit. On healthy data the limit is never
//! reached because depth is capped far below it; on corrupted data (a cycle
//! written around the engine) it stops the walk instead of looping.

use std::collections::{HashMap, HashSet};

use rusqlite::Connection;

use crate::config::TRAVERSAL_LIMIT;
use crate::db::{row_to_workstream, WORKSTREAM_COLUMNS, WORKSTREAM_COLUMN_COUNT};
use crate::error::{Error, Result};
use crate::types::{TreeNode, Workstream, WorkstreamId};

/// Self-inclusive ancestor chain of `?1`, limited to `?2` hops.
///
/// Produces `chain(id, parent, hops)` with the start node at `hops = 0`.
pub(crate) const CHAIN_CTE: &str = "WITH RECURSIVE chain(id, parent, hops) AS (
    SELECT id, parent_id, 0 FROM workstreams WHERE id = ?1
    UNION ALL
    SELECT w.id, w.parent_id, c.hops + 1
    FROM workstreams w
    JOIN chain c ON w.id = c.parent
    WHERE c.hops < ?2
)";

/// Self-inclusive subtree of `?1`, limited to `?2` hops.
///
/// Produces `sub(id, hops)` with the start node at `hops = 0`. Walks down via
/// the `parent_id` index.
pub(crate) const SUBTREE_CTE: &str = "WITH RECURSIVE sub(id, hops) AS (
    SELECT id, 0 FROM workstreams WHERE id = ?1
    UNION ALL
    SELECT w.id, s.hops + 1
    FROM workstreams w
    JOIN sub s ON w.parent_id = s.id
    WHERE s.hops < ?2
)";

/// Read-only hierarchy queries bound to one connection (one snapshot).
#[derive(Clone, Copy)]
pub(crate) struct Navigator<'c> {
    conn: &'c Connection,
    limit: u32,
}

impl<'c> Navigator<'c> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            limit: TRAVERSAL_LIMIT,
        }
    }

    pub(crate) fn conn(&self) -> &'c Connection {
        self.conn
    }

    /// Ancestors of `id`, root first. Empty for a root.
    pub(crate) fn ancestors(&self, id: WorkstreamId) -> Result<Vec<Workstream>> {
        let sql = format!(
            "{CHAIN_CTE}
             SELECT {WORKSTREAM_COLUMNS}
             FROM chain c
             JOIN workstreams w ON w.id = c.id
             ORDER BY c.hops DESC"
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut chain = stmt
            .query_map([id.as_i64(), i64::from(self.limit)], row_to_workstream)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        // The last row is the node itself.
        if chain.pop().is_none() {
            return Err(Error::WorkstreamNotFound(id));
        }
        Ok(chain)
    }

    /// The node followed by its ancestors, nearest first, with hop counts.
    pub(crate) fn chain_ids(&self, id: WorkstreamId) -> Result<Vec<(WorkstreamId, u32)>> {
        let sql = format!("{CHAIN_CTE} SELECT id, hops FROM chain ORDER BY hops");
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let chain = stmt
            .query_map([id.as_i64(), i64::from(self.limit)], |row| {
                Ok((WorkstreamId(row.get(0)?), row.get::<_, u32>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if chain.is_empty() {
            return Err(Error::WorkstreamNotFound(id));
        }
        Ok(chain)
    }

    /// Number of ancestors; a root has depth 0.
    pub(crate) fn depth(&self, id: WorkstreamId) -> Result<u32> {
        let sql = format!("{CHAIN_CTE} SELECT MAX(hops) FROM chain");
        self.conn
            .prepare_cached(&sql)?
            .query_row([id.as_i64(), i64::from(self.limit)], |row| {
                row.get::<_, Option<u32>>(0)
            })?
            .ok_or(Error::WorkstreamNotFound(id))
    }

    /// Returns `true` if `candidate` is `id` or one of its ancestors.
    pub(crate) fn is_self_or_ancestor(&self, candidate: WorkstreamId, id: WorkstreamId) -> Result<bool> {
        let sql = format!("{CHAIN_CTE} SELECT EXISTS(SELECT 1 FROM chain WHERE id = ?3)");
        self.conn
            .prepare_cached(&sql)?
            .query_row(
                [id.as_i64(), i64::from(self.limit), candidate.as_i64()],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    /// Descendants of `id` ordered by depth, then name, then id. Excludes `id`.
    pub(crate) fn descendants(&self, id: WorkstreamId) -> Result<Vec<Workstream>> {
        let mut rows = self.subtree(id)?;
        rows.remove(0);
        Ok(rows.into_iter().map(|(w, _)| w).collect())
    }

    /// Ids of `id` and all of its descendants.
    pub(crate) fn subtree_ids(&self, id: WorkstreamId) -> Result<HashSet<WorkstreamId>> {
        let sql = format!("{SUBTREE_CTE} SELECT id FROM sub");
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let ids = stmt
            .query_map([id.as_i64(), i64::from(self.limit)], |row| {
                row.get(0).map(WorkstreamId)
            })?
            .collect::<std::result::Result<HashSet<_>, _>>()?;

        if ids.is_empty() {
            return Err(Error::WorkstreamNotFound(id));
        }
        Ok(ids)
    }

    /// Levels below `id`; a leaf has height 0.
    pub(crate) fn subtree_height(&self, id: WorkstreamId) -> Result<u32> {
        let sql = format!("{SUBTREE_CTE} SELECT MAX(hops) FROM sub");
        self.conn
            .prepare_cached(&sql)?
            .query_row([id.as_i64(), i64::from(self.limit)], |row| {
                row.get::<_, Option<u32>>(0)
            })?
            .ok_or(Error::WorkstreamNotFound(id))
    }

    /// Nested tree rooted at `id`, from one bulk fetch.
    pub(crate) fn build_tree(&self, id: WorkstreamId) -> Result<TreeNode> {
        let mut rows = self.subtree(id)?.into_iter().map(|(w, _)| w);
        let root = rows.next().ok_or(Error::WorkstreamNotFound(id))?;

        // Rows arrive ordered by depth, then name, so each child list is
        // already in display order.
        let mut by_parent: HashMap<WorkstreamId, Vec<Workstream>> = HashMap::new();
        for ws in rows {
            if let Some(parent) = ws.parent {
                by_parent.entry(parent).or_default().push(ws);
            }
        }

        Ok(assemble(root, &mut by_parent))
    }

    /// `id` and its descendants with their distance from `id`, `id` first.
    ///
    /// Duplicate rows (only possible on corrupted data) keep the first
    /// occurrence.
    fn subtree(&self, id: WorkstreamId) -> Result<Vec<(Workstream, u32)>> {
        let sql = format!(
            "{SUBTREE_CTE}
             SELECT {WORKSTREAM_COLUMNS}, s.hops
             FROM sub s
             JOIN workstreams w ON w.id = s.id
             ORDER BY s.hops, w.name, w.id"
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map([id.as_i64(), i64::from(self.limit)], |row| {
                Ok((row_to_workstream(row)?, row.get::<_, u32>(WORKSTREAM_COLUMN_COUNT)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if rows.is_empty() {
            return Err(Error::WorkstreamNotFound(id));
        }

        let mut seen = HashSet::with_capacity(rows.len());
        Ok(rows.into_iter().filter(|(w, _)| seen.insert(w.id)).collect())
    }
}

fn assemble(workstream: Workstream, by_parent: &mut HashMap<WorkstreamId, Vec<Workstream>>) -> TreeNode {
    let children = by_parent.remove(&workstream.id).unwrap_or_default();
    TreeNode {
        children: children
            .into_iter()
            .map(|child| assemble(child, by_parent))
            .collect(),
        workstream,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{add, memory_db};

    fn names(rows: &[Workstream]) -> Vec<&str> {
        rows.iter().map(|w| w.name.as_str()).collect()
    }

    #[test]
    fn ancestors_are_root_first() {
        let conn = memory_db();
        let r = add(&conn, "R", None);
        let a = add(&conn, "A", Some(r));
        let c = add(&conn, "C", Some(a));
        let nav = Navigator::new(&conn);

        assert_eq!(names(&nav.ancestors(c).unwrap()), vec!["R", "A"]);
        assert!(nav.ancestors(r).unwrap().is_empty());
        assert_eq!(nav.depth(c).unwrap(), 2);
        assert_eq!(nav.depth(r).unwrap(), 0);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let conn = memory_db();
        let nav = Navigator::new(&conn);
        let missing = WorkstreamId(404);

        assert!(matches!(nav.ancestors(missing), Err(Error::WorkstreamNotFound(_))));
        assert!(matches!(nav.descendants(missing), Err(Error::WorkstreamNotFound(_))));
        assert!(matches!(nav.depth(missing), Err(Error::WorkstreamNotFound(_))));
        assert!(matches!(nav.build_tree(missing), Err(Error::WorkstreamNotFound(_))));
        assert!(matches!(nav.chain_ids(missing), Err(Error::WorkstreamNotFound(_))));
    }

    #[test]
    fn descendants_are_ordered_by_depth_then_name() {
        let conn = memory_db();
        let r = add(&conn, "R", None);
        let b = add(&conn, "B", Some(r));
        let a = add(&conn, "A", Some(r));
        add(&conn, "Z", Some(a));
        add(&conn, "Y", Some(b));
        let nav = Navigator::new(&conn);

        assert_eq!(names(&nav.descendants(r).unwrap()), vec!["A", "B", "Y", "Z"]);
        assert_eq!(nav.subtree_height(r).unwrap(), 2);
        assert_eq!(nav.subtree_ids(a).unwrap().len(), 2);
    }

    #[test]
    fn build_tree_nests_children_in_name_order() {
        let conn = memory_db();
        let r = add(&conn, "R", None);
        let b = add(&conn, "B", Some(r));
        add(&conn, "A", Some(r));
        add(&conn, "B1", Some(b));

        let tree = Navigator::new(&conn).build_tree(r).unwrap();
        let top: Vec<_> = tree.children.iter().map(|c| c.workstream.name.as_str()).collect();
        assert_eq!(top, vec!["A", "B"]);
        assert_eq!(tree.children[1].children[0].workstream.name, "B1");
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn traversal_stops_on_corrupted_cycle() {
        let conn = memory_db();
        let a = add(&conn, "A", None);
        let b = add(&conn, "B", Some(a));
        // Write a cycle directly, bypassing every engine check.
        conn.execute(
            "UPDATE workstreams SET parent_id = ?1 WHERE id = ?2",
            [b.as_i64(), a.as_i64()],
        )
        .unwrap();
        let nav = Navigator::new(&conn);

        let tree = nav.build_tree(a).unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(nav.descendants(a).unwrap().len(), 1);
        assert_eq!(nav.depth(a).unwrap(), TRAVERSAL_LIMIT);
    }
}
