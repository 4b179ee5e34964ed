//! Principal directory.
//!
//! A local mirror of identities from the auth subsystem. Grants reference it,
//! and permission checks consult it to tell unknown principals apart.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::helpers::row_to_principal;
use crate::error::Result;
use crate::types::{Principal, PrincipalId};

/// Insert a principal or refresh its display name.
pub(crate) fn upsert(
    conn: &Connection,
    id: &PrincipalId,
    display_name: &str,
    now: DateTime<Utc>,
) -> Result<Principal> {
    conn.execute(
        "INSERT INTO principals (id, display_name, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT (id) DO UPDATE SET display_name = excluded.display_name",
        params![id.as_str(), display_name, now],
    )?;

    let principal = conn
        .prepare_cached("SELECT id, display_name, created_at FROM principals WHERE id = ?1")?
        .query_row([id.as_str()], row_to_principal)?;
    Ok(principal)
}

/// Look up a principal.
pub(crate) fn get(conn: &Connection, id: &PrincipalId) -> Result<Option<Principal>> {
    conn.prepare_cached("SELECT id, display_name, created_at FROM principals WHERE id = ?1")?
        .query_row([id.as_str()], row_to_principal)
        .optional()
        .map_err(Into::into)
}

/// Returns `true` if the principal is registered.
pub(crate) fn exists(conn: &Connection, id: &PrincipalId) -> Result<bool> {
    conn.prepare_cached("SELECT EXISTS(SELECT 1 FROM principals WHERE id = ?1)")?
        .query_row([id.as_str()], |row| row.get(0))
        .map_err(Into::into)
}
