//! # Strata: Workstream Hierarchy Engine
//!
//! Strata manages a forest of workstreams (product lines, initiatives,
//! experiments) stored in `SQLite`, and answers the questions teams ask of it:
//! what sits above and below a node, who may act on it through inherited
//! grants, and how far along the releases and tasks beneath it are.
//!
//! ## Design Philosophy
//!
//! - **Rows, not pointers** - every node is a row with a `parent_id`; traversals
//!   are recursive queries, so nothing in memory can drift from the database
//! - **Checks inside the write** - cycle and depth checks run in the same
//!   transaction as the update they guard
//! - **Bounded cost** - each query is a constant number of round trips,
//!   whatever the depth or width of the tree
//! - **Cache as an accelerator** - results are cached with the set of nodes
//!   they depend on and dropped the moment one of those nodes changes
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use strata::{NewWorkstream, Strata, StrataConfig, WorkstreamKind};
//!
//! let strata = Strata::open(Path::new("strata.db"), StrataConfig::default())?;
//!
//! let platform = strata.create_workstream(NewWorkstream::new(
//!     "acme", "Platform", WorkstreamKind::ProductLine, "ana",
//! ))?;
//! let search = strata.create_workstream(
//!     NewWorkstream::new("acme", "Search", WorkstreamKind::Initiative, "ana").under(platform.id),
//! )?;
//!
//! assert_eq!(strata.depth(search.id)?, 1);
//! let report = strata.rollup_report(platform.id)?;
//! println!("{}% complete", report.summary.completion_percentage);
//! # Ok::<(), strata::Error>(())
//! ```

pub mod config;

mod cache;
mod db;
mod error;
mod hierarchy;
mod permissions;
mod rollup;
mod types;

pub use cache::CacheStats;
pub use config::{CacheConfig, CacheMode, StorageConfig, StrataConfig};
pub use error::{Error, Result};
pub use hierarchy::integrity::{
    CrossTenantLink, DanglingParent, DepthViolation, IntegrityReport,
};
pub use permissions::{GrantSource, Resolution};
pub use types::{
    completion_percentage, GrantId, GrantScope, KindTraits, NewGrant, NewRelease, NewTask,
    NewWorkstream, PermissionGrant, PermissionSet, PermissionType, Principal, PrincipalId,
    Release, ReleaseId, ReleaseStatus, RollupReport, RollupSummary, Task, TaskId, TaskStatus,
    TenantId, TreeNode, Workstream, WorkstreamId, WorkstreamKind, WorkstreamRef,
    WorkstreamStatus, WorkstreamUpdate, MAX_NAME_LENGTH,
};

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use cache::{CacheKey, CacheOp, Computed, HierarchyCache};
use config::{find_strata_dir, CONFIG_FILE_NAME, STRATA_DIR_NAME};
use db::{grants, leaf, principals, workstreams, Store};
use hierarchy::{CycleGuard, Navigator};
use permissions::PermissionResolver;
use rollup::RollupAggregator;
use types::validate_name;

/// Workstream hierarchy engine over one `SQLite` database.
///
/// `Strata` is `Send + Sync`; share it between threads with an `Arc`. Reads
/// run concurrently on pooled connections, writes are serialized.
pub struct Strata {
    store: Store,
    cache: HierarchyCache,
    config: StrataConfig,
}

#[allow(clippy::missing_errors_doc)]
impl Strata {
    // === Setup ===

    /// Open (or create) the database at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `config` fails validation or `db_path` is
    /// not an on-disk file (`:memory:`), or a database error if the file
    /// cannot be opened or migrated.
    pub fn open(db_path: &Path, config: StrataConfig) -> Result<Self> {
        config.validate()?;
        let store = Store::open(db_path, config.storage.busy_timeout())?;
        let cache = HierarchyCache::new(&config.cache);

        debug!(
            db = %db_path.display(),
            max_depth = config.max_depth,
            cache = ?config.cache.mode,
            "Opened strata"
        );
        Ok(Self {
            store,
            cache,
            config,
        })
    }

    /// Create `.strata/` under `root` with `config`, then open it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `root` is already initialized.
    pub fn init(root: &Path, config: StrataConfig) -> Result<Self> {
        let strata_dir = root.join(STRATA_DIR_NAME);
        if strata_dir.exists() {
            return Err(Error::Config(format!(
                "{} already exists; refusing to overwrite",
                strata_dir.display()
            )));
        }
        config.validate()?;

        std::fs::create_dir_all(&strata_dir)?;
        config.save(&strata_dir.join(CONFIG_FILE_NAME))?;
        let db_path = config.database_path(&strata_dir);

        info!(dir = %strata_dir.display(), "Initialized strata workspace");
        Self::open(&db_path, config)
    }

    /// Find the nearest `.strata/` at or above `start` and open it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if no workspace is found or its configuration
    /// is invalid.
    pub fn open_workspace(start: &Path) -> Result<Self> {
        let strata_dir = find_strata_dir(start).ok_or_else(|| {
            Error::Config(format!(
                "no {STRATA_DIR_NAME} directory found at or above {} (run `strata init`)",
                start.display()
            ))
        })?;
        let config = StrataConfig::load(&strata_dir.join(CONFIG_FILE_NAME))?;
        let db_path = config.database_path(&strata_dir);
        Self::open(&db_path, config)
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &StrataConfig {
        &self.config
    }

    /// Path of the database file.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.store.path().to_path_buf()
    }

    /// Run a write transaction that reports the workstreams it touched; their
    /// cache entries are dropped after commit, before this returns.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<(T, Vec<WorkstreamId>)>,
    ) -> Result<T> {
        let (value, _) = self.store.write(f, |(_, touched)| {
            if !touched.is_empty() {
                self.cache.invalidate(touched);
            }
        })?;
        Ok(value)
    }

    // === Node store ===

    /// Create a workstream, as a root or under `new.parent`.
    ///
    /// # Errors
    ///
    /// - `Error::Validation` for an empty or overlong name, or empty tenant
    /// - `Error::InvalidParent` if the parent is missing or in another tenant
    /// - `Error::DepthExceeded` if the new node would be deeper than `max-depth`
    pub fn create_workstream(&self, new: NewWorkstream) -> Result<Workstream> {
        let name = validate_name("workstream name", &new.name)?;
        if new.tenant.as_str().trim().is_empty() {
            return Err(Error::Validation("tenant cannot be empty".to_string()));
        }
        let status = new.status.unwrap_or(new.kind.traits().default_status);
        let max_depth = self.config.max_depth;

        let created = self.mutate(|conn| {
            if let Some(parent) = new.parent {
                require_parent(conn, parent, &new.tenant)?;
                CycleGuard::new(Navigator::new(conn), max_depth).check_new_child(parent)?;
            }
            let ws = workstreams::insert(conn, &new, &name, status, Utc::now())?;
            let touched = ws.parent.into_iter().chain([ws.id]).collect();
            Ok((ws, touched))
        })?;

        info!(id = %created.id, name = %created.name, parent = ?created.parent, "Created workstream");
        Ok(created)
    }

    /// Get a workstream by id.
    pub fn get_workstream(&self, id: WorkstreamId) -> Result<Workstream> {
        self.store.read(|conn| workstreams::require(conn, id))
    }

    /// Change a workstream's name, status or owner.
    pub fn update_workstream(&self, id: WorkstreamId, update: WorkstreamUpdate) -> Result<Workstream> {
        let name = update
            .name
            .as_deref()
            .map(|n| validate_name("workstream name", n))
            .transpose()?;

        let updated = self.mutate(|conn| {
            let mut ws = workstreams::require(conn, id)?;
            if let Some(name) = name {
                ws.name = name;
            }
            if let Some(status) = update.status {
                ws.status = status;
            }
            if let Some(owner) = update.owner {
                ws.owner = owner;
            }
            ws.updated_at = Utc::now();
            workstreams::update_details(conn, id, &ws.name, ws.status, &ws.owner, ws.updated_at)?;
            Ok((ws, vec![id]))
        })?;

        info!(%id, "Updated workstream");
        Ok(updated)
    }

    /// Move `node` under `new_parent`, or make it a root with `None`.
    ///
    /// Moving a node to its current parent is a no-op.
    ///
    /// # Errors
    ///
    /// - `Error::CircularReference` if `new_parent` is `node` or one of its descendants
    /// - `Error::DepthExceeded` if the moved subtree would end up deeper than `max-depth`
    /// - `Error::InvalidParent` if `new_parent` is missing or in another tenant
    pub fn reparent(&self, node: WorkstreamId, new_parent: Option<WorkstreamId>) -> Result<Workstream> {
        let max_depth = self.config.max_depth;

        let moved = self.mutate(|conn| {
            let current = workstreams::require(conn, node)?;
            if current.parent == new_parent {
                return Ok((current, Vec::new()));
            }
            if let Some(parent) = new_parent
                && parent != node
            {
                require_parent(conn, parent, &current.tenant)?;
            }
            CycleGuard::new(Navigator::new(conn), max_depth).check_reparent(node, new_parent)?;

            let now = Utc::now();
            workstreams::set_parent(conn, node, new_parent, now)?;

            let touched = [Some(node), current.parent, new_parent].into_iter().flatten().collect();
            let moved = Workstream {
                parent: new_parent,
                updated_at: now,
                ..current
            };
            Ok((moved, touched))
        })?;

        info!(%node, parent = ?new_parent, "Re-parented workstream");
        Ok(moved)
    }

    /// Delete a workstream that has no children and owns no releases.
    ///
    /// Grants on the workstream are removed with it.
    ///
    /// # Errors
    ///
    /// - `Error::HasDescendants` if children remain
    /// - `Error::HasOwnedReleases` if releases remain
    pub fn delete_workstream(&self, id: WorkstreamId) -> Result<()> {
        self.mutate(|conn| {
            let ws = workstreams::require(conn, id)?;

            let child_count = workstreams::child_count(conn, id)?;
            if child_count > 0 {
                return Err(Error::HasDescendants {
                    node: id,
                    child_count,
                });
            }
            let release_count = leaf::release_count(conn, id)?;
            if release_count > 0 {
                return Err(Error::HasOwnedReleases {
                    node: id,
                    release_count,
                });
            }

            workstreams::delete(conn, id)?;
            Ok(((), ws.parent.into_iter().chain([id]).collect()))
        })?;

        info!(%id, "Deleted workstream");
        Ok(())
    }

    /// Direct children ordered by name then id.
    pub fn children(&self, id: WorkstreamId) -> Result<Vec<Workstream>> {
        self.store.read(|conn| {
            workstreams::require(conn, id)?;
            workstreams::children(conn, id)
        })
    }

    /// Root workstreams, optionally for one tenant.
    pub fn roots(&self, tenant: Option<&TenantId>) -> Result<Vec<Workstream>> {
        self.store.read(|conn| workstreams::roots(conn, tenant))
    }

    // === Navigation ===

    /// Ancestors of `id`, root first; empty for a root.
    pub fn ancestors(&self, id: WorkstreamId) -> Result<Vec<Workstream>> {
        self.cache.get_or_compute(CacheKey::new(id, CacheOp::Ancestors), || {
            self.store.read(|conn| {
                let value = Navigator::new(conn).ancestors(id)?;
                let footprint = value.iter().map(|w| w.id).chain([id]).collect();
                Ok(Computed { value, footprint })
            })
        })
    }

    /// Every workstream below `id`, ordered by depth, then name, then id.
    pub fn descendants(&self, id: WorkstreamId) -> Result<Vec<Workstream>> {
        self.cache.get_or_compute(CacheKey::new(id, CacheOp::Descendants), || {
            self.store.read(|conn| {
                let value = Navigator::new(conn).descendants(id)?;
                let footprint = value.iter().map(|w| w.id).chain([id]).collect();
                Ok(Computed { value, footprint })
            })
        })
    }

    /// Number of ancestors; 0 for a root.
    pub fn depth(&self, id: WorkstreamId) -> Result<u32> {
        self.cache.get_or_compute(CacheKey::new(id, CacheOp::Depth), || {
            self.store.read(|conn| {
                let chain = Navigator::new(conn).chain_ids(id)?;
                let value = chain.iter().map(|&(_, hops)| hops).max().unwrap_or(0);
                let footprint = chain.into_iter().map(|(node, _)| node).collect();
                Ok(Computed { value, footprint })
            })
        })
    }

    /// `id` and its full subtree as a nested tree.
    pub fn build_tree(&self, id: WorkstreamId) -> Result<TreeNode> {
        self.cache.get_or_compute(CacheKey::new(id, CacheOp::Tree), || {
            self.store.read(|conn| {
                let value = Navigator::new(conn).build_tree(id)?;
                let footprint = value.flatten().into_iter().map(|w| w.id).collect();
                Ok(Computed { value, footprint })
            })
        })
    }

    /// Returns `true` if moving `node` under `proposed_parent` would create a cycle.
    ///
    /// # Errors
    ///
    /// Returns `Error::WorkstreamNotFound` if either id is unknown.
    pub fn would_create_cycle(&self, node: WorkstreamId, proposed_parent: WorkstreamId) -> Result<bool> {
        self.store.read(|conn| {
            workstreams::require(conn, node)?;
            workstreams::require(conn, proposed_parent)?;
            CycleGuard::new(Navigator::new(conn), self.config.max_depth)
                .would_create_cycle(node, proposed_parent)
        })
    }

    // === Principals and grants ===

    /// Register a principal, or update its display name.
    pub fn register_principal(&self, id: &PrincipalId, display_name: &str) -> Result<Principal> {
        if id.as_str().trim().is_empty() {
            return Err(Error::Validation("principal id cannot be empty".to_string()));
        }
        let display_name = validate_name("display name", display_name)?;

        // A principal holds no grants until registered, so no cached entry
        // can depend on it.
        let principal = self.store.write(
            |conn| principals::upsert(conn, id, &display_name, Utc::now()),
            |_| {},
        )?;

        info!(principal = %id, "Registered principal");
        Ok(principal)
    }

    /// Look up a principal.
    pub fn get_principal(&self, id: &PrincipalId) -> Result<Option<Principal>> {
        self.store.read(|conn| principals::get(conn, id))
    }

    /// Grant a permission. Granting an identical permission twice returns the
    /// existing grant.
    ///
    /// # Errors
    ///
    /// Returns `Error::PrincipalNotFound` for an unregistered principal and
    /// `Error::WorkstreamNotFound` for an unknown workstream.
    pub fn grant(&self, new: NewGrant) -> Result<PermissionGrant> {
        let grant = self.mutate(|conn| {
            workstreams::require(conn, new.workstream)?;
            if !principals::exists(conn, &new.principal)? {
                return Err(Error::PrincipalNotFound(new.principal.clone()));
            }
            let (grant, created) = grants::insert_or_get(conn, &new, Utc::now())?;
            let touched = if created { vec![grant.workstream] } else { Vec::new() };
            Ok((grant, touched))
        })?;

        info!(
            grant = %grant.id,
            workstream = %grant.workstream,
            principal = %grant.principal,
            permission = grant.permission.as_str(),
            scope = grant.scope.as_str(),
            "Granted permission"
        );
        Ok(grant)
    }

    /// Remove a grant, returning it.
    pub fn revoke(&self, id: GrantId) -> Result<PermissionGrant> {
        let grant = self.mutate(|conn| {
            let grant = grants::require(conn, id)?;
            grants::delete(conn, id)?;
            let touched = vec![grant.workstream];
            Ok((grant, touched))
        })?;

        info!(grant = %id, workstream = %grant.workstream, "Revoked permission");
        Ok(grant)
    }

    /// Grants made directly on a workstream.
    pub fn grants_on(&self, workstream: WorkstreamId) -> Result<Vec<PermissionGrant>> {
        self.store.read(|conn| {
            workstreams::require(conn, workstream)?;
            grants::grants_on(conn, workstream)
        })
    }

    /// Union of the permissions `principal` holds on `workstream`, directly or
    /// through `node_and_descendants` grants on ancestors.
    ///
    /// An unknown principal has no permissions; this is not an error.
    pub fn effective_permissions(
        &self,
        workstream: WorkstreamId,
        principal: &PrincipalId,
    ) -> Result<PermissionSet> {
        let key = CacheKey::new(workstream, CacheOp::Permissions(principal.clone()));
        self.cache.get_or_compute(key, || {
            self.store.read(|conn| {
                let resolution = PermissionResolver::new(conn).resolve(workstream, principal)?;
                Ok(Computed {
                    footprint: resolution.chain.iter().copied().collect(),
                    value: resolution.permissions,
                })
            })
        })
    }

    /// Returns `true` if `principal` holds `permission` on `workstream`.
    pub fn has_inherited_permission(
        &self,
        workstream: WorkstreamId,
        principal: &PrincipalId,
        permission: PermissionType,
    ) -> Result<bool> {
        Ok(self
            .effective_permissions(workstream, principal)?
            .contains(permission))
    }

    /// Like [`Strata::effective_permissions`], with the grants that contributed.
    pub fn explain_permissions(
        &self,
        workstream: WorkstreamId,
        principal: &PrincipalId,
    ) -> Result<Resolution> {
        self.store
            .read(|conn| PermissionResolver::new(conn).resolve(workstream, principal))
    }

    // === Releases and tasks ===

    /// Add a release to a workstream.
    pub fn add_release(&self, new: NewRelease) -> Result<Release> {
        let name = validate_name("release name", &new.name)?;

        let release = self.mutate(|conn| {
            workstreams::require(conn, new.workstream)?;
            let release = leaf::insert_release(conn, &new, &name, Utc::now())?;
            Ok((release, vec![new.workstream]))
        })?;

        info!(release = %release.id, workstream = %release.workstream, "Added release");
        Ok(release)
    }

    /// Get a release by id.
    pub fn get_release(&self, id: ReleaseId) -> Result<Release> {
        self.store.read(|conn| leaf::require_release(conn, id))
    }

    /// Releases owned directly by a workstream.
    pub fn releases_of(&self, workstream: WorkstreamId) -> Result<Vec<Release>> {
        self.store.read(|conn| {
            workstreams::require(conn, workstream)?;
            leaf::releases_of(conn, workstream)
        })
    }

    /// Transfer a release, with its tasks, to another workstream.
    pub fn move_release(&self, id: ReleaseId, workstream: WorkstreamId) -> Result<Release> {
        let release = self.mutate(|conn| {
            let mut release = leaf::require_release(conn, id)?;
            workstreams::require(conn, workstream)?;
            leaf::set_release_workstream(conn, id, workstream)?;

            let touched = vec![release.workstream, workstream];
            release.workstream = workstream;
            Ok((release, touched))
        })?;

        info!(release = %id, %workstream, "Moved release");
        Ok(release)
    }

    /// Change a release's status.
    pub fn set_release_status(&self, id: ReleaseId, status: ReleaseStatus) -> Result<Release> {
        self.mutate(|conn| {
            let mut release = leaf::require_release(conn, id)?;
            leaf::set_release_status(conn, id, status)?;
            release.status = status;
            let touched = vec![release.workstream];
            Ok((release, touched))
        })
    }

    /// Delete a release and its tasks.
    pub fn delete_release(&self, id: ReleaseId) -> Result<()> {
        self.mutate(|conn| {
            let release = leaf::require_release(conn, id)?;
            leaf::delete_release(conn, id)?;
            Ok(((), vec![release.workstream]))
        })?;

        info!(release = %id, "Deleted release");
        Ok(())
    }

    /// Add a task to a release.
    pub fn add_task(&self, new: NewTask) -> Result<Task> {
        let title = validate_name("task title", &new.title)?;

        let task = self.mutate(|conn| {
            let release = leaf::require_release(conn, new.release)?;
            let task = leaf::insert_task(conn, &new, &title, Utc::now())?;
            Ok((task, vec![release.workstream]))
        })?;

        debug!(task = %task.id, release = %task.release, "Added task");
        Ok(task)
    }

    /// Get a task by id.
    pub fn get_task(&self, id: TaskId) -> Result<Task> {
        self.store.read(|conn| leaf::require_task(conn, id))
    }

    /// Tasks of a release.
    pub fn tasks_of(&self, release: ReleaseId) -> Result<Vec<Task>> {
        self.store.read(|conn| {
            leaf::require_release(conn, release)?;
            leaf::tasks_of(conn, release)
        })
    }

    /// Change a task's status.
    pub fn set_task_status(&self, id: TaskId, status: TaskStatus) -> Result<Task> {
        self.mutate(|conn| {
            let mut task = leaf::require_task(conn, id)?;
            let workstream = leaf::task_workstream(conn, id)?;
            leaf::set_task_status(conn, id, status)?;
            task.status = status;
            Ok((task, vec![workstream]))
        })
    }

    /// Delete a task.
    pub fn delete_task(&self, id: TaskId) -> Result<()> {
        self.mutate(|conn| {
            let workstream = leaf::task_workstream(conn, id)?;
            leaf::delete_task(conn, id)?;
            Ok(((), vec![workstream]))
        })
    }

    // === Reporting ===

    /// Release and task totals for `id` and everything beneath it.
    pub fn rollup_report(&self, id: WorkstreamId) -> Result<RollupReport> {
        self.cache.get_or_compute(CacheKey::new(id, CacheOp::Rollup), || {
            self.store.read(|conn| {
                let value = RollupAggregator::new(conn).report(id)?;
                let footprint: HashSet<_> = rollup::report_ids(&value);
                Ok(Computed { value, footprint })
            })
        })
    }

    /// Check the whole forest for cycles, dangling parents, depth violations
    /// and cross-tenant links.
    pub fn verify_integrity(&self) -> Result<IntegrityReport> {
        let links = self.store.read(workstreams::all_links)?;
        let report = hierarchy::integrity::verify(&links, self.config.max_depth);

        if report.is_healthy() {
            debug!(checked = report.checked, "Integrity check passed");
        } else {
            warn!(
                checked = report.checked,
                cycles = report.cycles.len(),
                dangling = report.dangling_parents.len(),
                too_deep = report.depth_violations.len(),
                cross_tenant = report.cross_tenant_links.len(),
                "Integrity check found problems"
            );
        }
        Ok(report)
    }

    /// Drop cached results that depend on `node`, e.g. after the database was
    /// edited by another process.
    pub fn invalidate_subtree(&self, node: WorkstreamId) {
        self.cache.invalidate_subtree(node);
    }

    /// Cache counters since open.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// Load `parent` for use as a parent in `tenant`, mapping problems to
/// `InvalidParent`.
fn require_parent(conn: &Connection, parent: WorkstreamId, tenant: &TenantId) -> Result<Workstream> {
    let ws = workstreams::get(conn, parent)?.ok_or_else(|| Error::InvalidParent {
        parent,
        reason: "parent does not exist".to_string(),
    })?;
    if &ws.tenant != tenant {
        return Err(Error::InvalidParent {
            parent,
            reason: format!("parent belongs to tenant '{}'", ws.tenant),
        });
    }
    Ok(ws)
}
