//! Permission grant CRUD.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::helpers::{row_to_grant, GRANT_COLUMNS};
use crate::error::{Error, Result};
use crate::types::{GrantId, NewGrant, PermissionGrant, WorkstreamId};

/// Insert a grant, or return the identical grant that already exists.
///
/// Returns the grant and whether it was newly created.
pub(crate) fn insert_or_get(
    conn: &Connection,
    new: &NewGrant,
    now: DateTime<Utc>,
) -> Result<(PermissionGrant, bool)> {
    let inserted = conn.execute(
        "INSERT INTO permission_grants (workstream_id, principal_id, permission, scope, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (workstream_id, principal_id, permission, scope) DO NOTHING",
        params![
            new.workstream.as_i64(),
            new.principal.as_str(),
            new.permission.as_str(),
            new.scope.as_str(),
            now,
        ],
    )?;

    let sql = format!(
        "SELECT {GRANT_COLUMNS} FROM permission_grants g
         WHERE g.workstream_id = ?1 AND g.principal_id = ?2 AND g.permission = ?3 AND g.scope = ?4"
    );
    let grant = conn.prepare_cached(&sql)?.query_row(
        params![
            new.workstream.as_i64(),
            new.principal.as_str(),
            new.permission.as_str(),
            new.scope.as_str(),
        ],
        row_to_grant,
    )?;

    Ok((grant, inserted > 0))
}

/// Get a grant by id, failing with `GrantNotFound`.
pub(crate) fn require(conn: &Connection, id: GrantId) -> Result<PermissionGrant> {
    let sql = format!("SELECT {GRANT_COLUMNS} FROM permission_grants g WHERE g.id = ?1");
    conn.prepare_cached(&sql)?
        .query_row([id.as_i64()], row_to_grant)
        .optional()?
        .ok_or(Error::GrantNotFound(id))
}

/// Delete a grant.
pub(crate) fn delete(conn: &Connection, id: GrantId) -> Result<()> {
    let deleted = conn.execute("DELETE FROM permission_grants WHERE id = ?1", [id.as_i64()])?;
    if deleted == 0 {
        return Err(Error::GrantNotFound(id));
    }
    Ok(())
}

/// Grants created directly on a workstream, for any principal.
pub(crate) fn grants_on(conn: &Connection, workstream: WorkstreamId) -> Result<Vec<PermissionGrant>> {
    let sql = format!(
        "SELECT {GRANT_COLUMNS} FROM permission_grants g
         WHERE g.workstream_id = ?1 ORDER BY g.principal_id, g.permission, g.id"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map([workstream.as_i64()], row_to_grant)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
