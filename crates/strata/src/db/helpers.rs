//! Helper functions for database row conversion and parsing.
//!
//! These utilities convert between database representations and domain types.
//! Also provides SQL column list constants so every query selects columns in
//! the order the row converters expect.

use std::str::FromStr;

use rusqlite::Row;

use crate::types::{
    GrantId, PermissionGrant, Principal, PrincipalId, Release, ReleaseId, Task, TaskId, TenantId,
    Workstream, WorkstreamId,
};

/// SQL column list for the workstreams table, aliased as `w`.
///
/// Use with `row_to_workstream` for consistent column ordering.
pub(crate) const WORKSTREAM_COLUMNS: &str =
    "w.id, w.tenant_id, w.name, w.kind, w.status, w.owner_id, w.parent_id, w.created_at, w.updated_at";

/// Number of columns in `WORKSTREAM_COLUMNS`; extra selected columns start here.
pub(crate) const WORKSTREAM_COLUMN_COUNT: usize = 9;

/// SQL column list for the permission_grants table, aliased as `g`.
pub(crate) const GRANT_COLUMNS: &str =
    "g.id, g.workstream_id, g.principal_id, g.permission, g.scope, g.created_at";

/// Number of columns in `GRANT_COLUMNS`.
pub(crate) const GRANT_COLUMN_COUNT: usize = 6;

/// SQL column list for the releases table, aliased as `r`.
pub(crate) const RELEASE_COLUMNS: &str = "r.id, r.workstream_id, r.name, r.status, r.created_at";

/// SQL column list for the tasks table, aliased as `t`.
pub(crate) const TASK_COLUMNS: &str = "t.id, t.release_id, t.title, t.status, t.created_at";

/// Parse an enum column stored as text.
///
/// Returns an error for unrecognized values, indicating possible database corruption.
pub(crate) fn parse_enum<T: FromStr>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("Unknown value '{raw}' in database. Database may be corrupted or from a newer version.").into(),
        )
    })
}

/// Convert a row selected with `WORKSTREAM_COLUMNS` into a `Workstream`.
pub(crate) fn row_to_workstream(row: &Row<'_>) -> rusqlite::Result<Workstream> {
    Ok(Workstream {
        id: WorkstreamId(row.get(0)?),
        tenant: TenantId(row.get(1)?),
        name: row.get(2)?,
        kind: parse_enum(row, 3)?,
        status: parse_enum(row, 4)?,
        owner: PrincipalId(row.get(5)?),
        parent: row.get::<_, Option<i64>>(6)?.map(WorkstreamId),
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Convert a row selected with `GRANT_COLUMNS` into a `PermissionGrant`.
pub(crate) fn row_to_grant(row: &Row<'_>) -> rusqlite::Result<PermissionGrant> {
    Ok(PermissionGrant {
        id: GrantId(row.get(0)?),
        workstream: WorkstreamId(row.get(1)?),
        principal: PrincipalId(row.get(2)?),
        permission: parse_enum(row, 3)?,
        scope: parse_enum(row, 4)?,
        created_at: row.get(5)?,
    })
}

/// Convert a row selected with `RELEASE_COLUMNS` into a `Release`.
pub(crate) fn row_to_release(row: &Row<'_>) -> rusqlite::Result<Release> {
    Ok(Release {
        id: ReleaseId(row.get(0)?),
        workstream: WorkstreamId(row.get(1)?),
        name: row.get(2)?,
        status: parse_enum(row, 3)?,
        created_at: row.get(4)?,
    })
}

/// Convert a row selected with `TASK_COLUMNS` into a `Task`.
pub(crate) fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: TaskId(row.get(0)?),
        release: ReleaseId(row.get(1)?),
        title: row.get(2)?,
        status: parse_enum(row, 3)?,
        created_at: row.get(4)?,
    })
}

/// Convert a `principals` row (`id, display_name, created_at`) into a `Principal`.
pub(crate) fn row_to_principal(row: &Row<'_>) -> rusqlite::Result<Principal> {
    Ok(Principal {
        id: PrincipalId(row.get(0)?),
        display_name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

/// Read a SQLite count column as `usize`.
// COUNT(*) is never negative
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub(crate) fn count_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<usize> {
    Ok(row.get::<_, i64>(idx)? as usize)
}
