//! Workstream node CRUD.
//!
//! These functions only persist rows. Structural rules (parent validity,
//! cycles, depth) are enforced by the callers in `lib.rs` inside the same
//! write transaction.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::helpers::{count_at, row_to_workstream, WORKSTREAM_COLUMNS};
use crate::error::{Error, Result};
use crate::types::{NewWorkstream, PrincipalId, TenantId, Workstream, WorkstreamId, WorkstreamStatus};

/// Get a workstream by id.
pub(crate) fn get(conn: &Connection, id: WorkstreamId) -> Result<Option<Workstream>> {
    let sql = format!("SELECT {WORKSTREAM_COLUMNS} FROM workstreams w WHERE w.id = ?1");
    conn.prepare_cached(&sql)?
        .query_row([id.as_i64()], row_to_workstream)
        .optional()
        .map_err(Into::into)
}

/// Get a workstream by id, failing with `WorkstreamNotFound`.
pub(crate) fn require(conn: &Connection, id: WorkstreamId) -> Result<Workstream> {
    get(conn, id)?.ok_or(Error::WorkstreamNotFound(id))
}

/// Insert a workstream row. `name` must already be validated.
pub(crate) fn insert(
    conn: &Connection,
    new: &NewWorkstream,
    name: &str,
    status: WorkstreamStatus,
    now: DateTime<Utc>,
) -> Result<Workstream> {
    conn.execute(
        "INSERT INTO workstreams (tenant_id, name, kind, status, owner_id, parent_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            new.tenant.as_str(),
            name,
            new.kind.as_str(),
            status.as_str(),
            new.owner.as_str(),
            new.parent.map(WorkstreamId::as_i64),
            now,
        ],
    )?;
    let id = WorkstreamId(conn.last_insert_rowid());

    Ok(Workstream {
        id,
        tenant: new.tenant.clone(),
        name: name.to_string(),
        kind: new.kind,
        status,
        owner: new.owner.clone(),
        parent: new.parent,
        created_at: now,
        updated_at: now,
    })
}

/// Point a workstream at a new parent (or detach it with `None`).
pub(crate) fn set_parent(
    conn: &Connection,
    id: WorkstreamId,
    parent: Option<WorkstreamId>,
    now: DateTime<Utc>,
) -> Result<()> {
    let updated = conn.execute(
        "UPDATE workstreams SET parent_id = ?2, updated_at = ?3 WHERE id = ?1",
        params![id.as_i64(), parent.map(WorkstreamId::as_i64), now],
    )?;
    if updated == 0 {
        return Err(Error::WorkstreamNotFound(id));
    }
    Ok(())
}

/// Overwrite the descriptive fields of a workstream.
pub(crate) fn update_details(
    conn: &Connection,
    id: WorkstreamId,
    name: &str,
    status: WorkstreamStatus,
    owner: &PrincipalId,
    now: DateTime<Utc>,
) -> Result<()> {
    let updated = conn.execute(
        "UPDATE workstreams SET name = ?2, status = ?3, owner_id = ?4, updated_at = ?5 WHERE id = ?1",
        params![id.as_i64(), name, status.as_str(), owner.as_str(), now],
    )?;
    if updated == 0 {
        return Err(Error::WorkstreamNotFound(id));
    }
    Ok(())
}

/// Delete a workstream row. Children and releases must already be gone.
pub(crate) fn delete(conn: &Connection, id: WorkstreamId) -> Result<()> {
    let deleted = conn.execute("DELETE FROM workstreams WHERE id = ?1", [id.as_i64()])?;
    if deleted == 0 {
        return Err(Error::WorkstreamNotFound(id));
    }
    Ok(())
}

/// Number of direct children.
pub(crate) fn child_count(conn: &Connection, id: WorkstreamId) -> Result<usize> {
    conn.prepare_cached("SELECT COUNT(*) FROM workstreams WHERE parent_id = ?1")?
        .query_row([id.as_i64()], |row| count_at(row, 0))
        .map_err(Into::into)
}

/// Direct children ordered by name then id.
pub(crate) fn children(conn: &Connection, id: WorkstreamId) -> Result<Vec<Workstream>> {
    let sql = format!(
        "SELECT {WORKSTREAM_COLUMNS} FROM workstreams w WHERE w.parent_id = ?1 ORDER BY w.name, w.id"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map([id.as_i64()], row_to_workstream)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Root workstreams, optionally restricted to one tenant.
pub(crate) fn roots(conn: &Connection, tenant: Option<&TenantId>) -> Result<Vec<Workstream>> {
    let sql = format!(
        "SELECT {WORKSTREAM_COLUMNS} FROM workstreams w
         WHERE w.parent_id IS NULL AND (?1 IS NULL OR w.tenant_id = ?1)
         ORDER BY w.name, w.id"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map([tenant.map(TenantId::as_str)], row_to_workstream)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// A parent link as stored, for whole-forest checks.
#[derive(Debug, Clone)]
pub(crate) struct Link {
    pub id: WorkstreamId,
    pub parent: Option<WorkstreamId>,
    pub tenant: TenantId,
}

/// Every `(id, parent_id, tenant_id)` triple in one query.
pub(crate) fn all_links(conn: &Connection) -> Result<Vec<Link>> {
    let mut stmt = conn.prepare("SELECT id, parent_id, tenant_id FROM workstreams ORDER BY id")?;
    let links = stmt
        .query_map([], |row| {
            Ok(Link {
                id: WorkstreamId(row.get(0)?),
                parent: row.get::<_, Option<i64>>(1)?.map(WorkstreamId),
                tenant: TenantId(row.get(2)?),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{add, memory_db};

    #[test]
    fn insert_then_get_round_trips_fields() {
        let conn = memory_db();
        let root = add(&conn, "Platform", None);
        let child = add(&conn, "Search", Some(root));

        let loaded = require(&conn, child).unwrap();
        assert_eq!(loaded.name, "Search");
        assert_eq!(loaded.parent, Some(root));
        assert_eq!(loaded.tenant, TenantId::new("acme"));
    }

    #[test]
    fn require_missing_is_not_found() {
        let conn = memory_db();
        assert!(matches!(
            require(&conn, WorkstreamId(99)),
            Err(Error::WorkstreamNotFound(WorkstreamId(99)))
        ));
    }

    #[test]
    fn children_are_sorted_by_name() {
        let conn = memory_db();
        let root = add(&conn, "Root", None);
        add(&conn, "Zeta", Some(root));
        add(&conn, "Alpha", Some(root));

        let names: Vec<_> = children(&conn, root)
            .unwrap()
            .into_iter()
            .map(|w| w.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
        assert_eq!(child_count(&conn, root).unwrap(), 2);
    }

    #[test]
    fn schema_rejects_self_parent() {
        let conn = memory_db();
        let id = add(&conn, "Loop", None);

        assert!(set_parent(&conn, id, Some(id), Utc::now()).is_err());
    }

    #[test]
    fn roots_filter_by_tenant() {
        let conn = memory_db();
        add(&conn, "Mine", None);

        assert_eq!(roots(&conn, None).unwrap().len(), 1);
        assert_eq!(roots(&conn, Some(&TenantId::new("acme"))).unwrap().len(), 1);
        assert!(roots(&conn, Some(&TenantId::new("other"))).unwrap().is_empty());
    }
}
