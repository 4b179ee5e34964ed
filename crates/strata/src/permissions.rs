//! Inherited permission resolution.
//!
//! A principal's effective permissions on a workstream are the union of:
//!
//! - every grant made directly on the workstream, whatever its scope, and
//! - every `node_and_descendants` grant on any of its ancestors.
//!
//! There is no "closest grant wins" rule and no implied ordering between
//! permission types: holding `admin` does not imply `view` unless `view` was
//! granted too. Resolution costs three queries regardless of depth.

use rusqlite::Connection;
use serde::Serialize;
use tracing::debug;

use crate::db::{principals, row_to_grant, GRANT_COLUMNS, GRANT_COLUMN_COUNT};
use crate::error::Result;
use crate::hierarchy::{Navigator, CHAIN_CTE};
use crate::types::{GrantScope, PermissionGrant, PermissionSet, PrincipalId, WorkstreamId};

/// A grant that contributed to a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantSource {
    /// The contributing grant
    pub grant: PermissionGrant,
    /// Distance from the resolved node to the grant's workstream (0 = direct)
    pub hops: u32,
}

/// Full result of a permission check, for auditing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// The workstream checked
    pub workstream: WorkstreamId,
    /// The principal checked
    pub principal: PrincipalId,
    /// Whether the principal is registered
    pub principal_known: bool,
    /// The workstream followed by its ancestors, nearest first
    pub chain: Vec<WorkstreamId>,
    /// Grants that apply, nearest first
    pub sources: Vec<GrantSource>,
    /// Union of the permission types of `sources`
    pub permissions: PermissionSet,
}

/// Resolves permissions against one read snapshot.
pub(crate) struct PermissionResolver<'c> {
    nav: Navigator<'c>,
}

impl<'c> PermissionResolver<'c> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self {
            nav: Navigator::new(conn),
        }
    }

    /// Resolve `principal`'s permissions on `workstream`.
    ///
    /// Fails with `WorkstreamNotFound` for an unknown workstream. An unknown
    /// principal resolves to an empty set.
    pub(crate) fn resolve(
        &self,
        workstream: WorkstreamId,
        principal: &PrincipalId,
    ) -> Result<Resolution> {
        let chain: Vec<_> = self
            .nav
            .chain_ids(workstream)?
            .into_iter()
            .map(|(id, _)| id)
            .collect();

        let mut resolution = Resolution {
            workstream,
            principal: principal.clone(),
            principal_known: false,
            chain,
            sources: Vec::new(),
            permissions: PermissionSet::new(),
        };

        if !principals::exists(self.nav.conn(), principal)? {
            debug!(%principal, %workstream, "Unknown principal resolves to no permissions");
            return Ok(resolution);
        }
        resolution.principal_known = true;

        resolution.sources = self.applicable_grants(workstream, principal)?;
        resolution.permissions = resolution
            .sources
            .iter()
            .map(|source| source.grant.permission)
            .collect();

        debug!(
            %principal,
            %workstream,
            permissions = %resolution.permissions,
            grants = resolution.sources.len(),
            "Resolved permissions"
        );
        Ok(resolution)
    }

    fn applicable_grants(
        &self,
        workstream: WorkstreamId,
        principal: &PrincipalId,
    ) -> Result<Vec<GrantSource>> {
        let sql = format!(
            "{CHAIN_CTE}
             SELECT {GRANT_COLUMNS}, c.hops
             FROM chain c
             JOIN permission_grants g ON g.workstream_id = c.id
             WHERE g.principal_id = ?3 AND (c.hops = 0 OR g.scope = ?4)
             ORDER BY c.hops, g.permission, g.id"
        );
        let mut stmt = self.nav.conn().prepare_cached(&sql)?;
        let sources = stmt
            .query_map(
                rusqlite::params![
                    workstream.as_i64(),
                    i64::from(crate::config::TRAVERSAL_LIMIT),
                    principal.as_str(),
                    GrantScope::NodeAndDescendants.as_str(),
                ],
                |row| {
                    Ok(GrantSource {
                        grant: row_to_grant(row)?,
                        hops: row.get(GRANT_COLUMN_COUNT)?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sources)
    }
}
