//! Error types for Strata operations.
//!
//! Errors fall into two groups:
//!
//! - **Caller errors**: structural rule violations and unknown ids. These are
//!   recoverable, expected outcomes (`CircularReference`, `HasDescendants`, ...)
//!   that a controller maps straight back to its client.
//! - **Infrastructure errors**: database, I/O and internal faults that halt the
//!   operation.
//!
//! Structural checks never degrade into silent no-ops: every rejected mutation
//! returns one of the typed variants below and leaves the store untouched.

use thiserror::Error;

use crate::types::{GrantId, PrincipalId, ReleaseId, TaskId, WorkstreamId};

/// Result type for Strata operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for Strata operations.
#[derive(Debug, Error)]
pub enum Error {
    // === Caller errors ===
    /// The requested parent does not exist or belongs to a different tenant.
    #[error("invalid parent {parent}: {reason}")]
    InvalidParent {
        /// The rejected parent id
        parent: WorkstreamId,
        /// Why the parent was rejected
        reason: String,
    },

    /// Re-parenting would make a workstream its own ancestor.
    #[error("moving workstream {node} under {parent} would create a cycle")]
    CircularReference {
        /// The workstream being moved
        node: WorkstreamId,
        /// The proposed parent
        parent: WorkstreamId,
    },

    /// The operation would place a workstream deeper than the configured maximum.
    #[error("hierarchy depth {depth} exceeds the maximum of {max}")]
    DepthExceeded {
        /// Deepest depth the operation would produce
        depth: u32,
        /// Configured maximum depth
        max: u32,
    },

    /// Delete refused because child workstreams still exist.
    #[error("workstream {node} still has {child_count} child workstream(s)")]
    HasDescendants {
        /// The workstream that was not deleted
        node: WorkstreamId,
        /// Number of direct children
        child_count: usize,
    },

    /// Delete refused because releases are still owned by the workstream.
    #[error("workstream {node} still owns {release_count} release(s)")]
    HasOwnedReleases {
        /// The workstream that was not deleted
        node: WorkstreamId,
        /// Number of owned releases
        release_count: usize,
    },

    /// The principal is unknown to the identity directory.
    #[error("principal not found: {0}")]
    PrincipalNotFound(PrincipalId),

    /// Workstream not found.
    #[error("workstream not found: {0}")]
    WorkstreamNotFound(WorkstreamId),

    /// Release not found.
    #[error("release not found: {0}")]
    ReleaseNotFound(ReleaseId),

    /// Task not found.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// Permission grant not found.
    #[error("permission grant not found: {0}")]
    GrantNotFound(GrantId),

    /// Input failed validation (empty names, unknown enum values, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    // === Infrastructure errors ===
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal invariant violated (poisoned locks, corrupted rows)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns `true` if the caller can fix this error by changing the request.
    ///
    /// Everything else is an infrastructure problem on our side.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        !matches!(
            self,
            Self::Config(_) | Self::Database(_) | Self::Io(_) | Self::Internal(_)
        )
    }
}
