//! Structural checks run before a re-parent is written.

use tracing::debug;

use super::Navigator;
use crate::error::{Error, Result};
use crate::types::WorkstreamId;

/// Rejects moves that would create a cycle or exceed the depth limit.
///
/// Runs on the writer connection inside the same transaction as the update
/// it protects, so the answer cannot go stale before the write lands.
pub(crate) struct CycleGuard<'c> {
    nav: Navigator<'c>,
    max_depth: u32,
}

impl<'c> CycleGuard<'c> {
    pub(crate) fn new(nav: Navigator<'c>, max_depth: u32) -> Self {
        Self { nav, max_depth }
    }

    /// Returns `true` if making `proposed_parent` the parent of `node` would
    /// close a loop, i.e. `node` is `proposed_parent` or one of its ancestors.
    pub(crate) fn would_create_cycle(
        &self,
        node: WorkstreamId,
        proposed_parent: WorkstreamId,
    ) -> Result<bool> {
        if node == proposed_parent {
            return Ok(true);
        }
        self.nav.is_self_or_ancestor(node, proposed_parent)
    }

    /// Depth a new child of `parent` would have.
    pub(crate) fn check_new_child(&self, parent: WorkstreamId) -> Result<u32> {
        let depth = self.nav.depth(parent)? + 1;
        self.check_depth(depth)?;
        Ok(depth)
    }

    /// Validate moving `node` under `proposed_parent` (`None` = make root).
    pub(crate) fn check_reparent(
        &self,
        node: WorkstreamId,
        proposed_parent: Option<WorkstreamId>,
    ) -> Result<()> {
        let height = self.nav.subtree_height(node)?;
        let Some(parent) = proposed_parent else {
            return self.check_depth(height);
        };

        if self.would_create_cycle(node, parent)? {
            debug!(%node, %parent, "Rejected re-parent: cycle");
            return Err(Error::CircularReference { node, parent });
        }

        let deepest = self.nav.depth(parent)? + 1 + height;
        self.check_depth(deepest)
    }

    fn check_depth(&self, depth: u32) -> Result<()> {
        if depth > self.max_depth {
            return Err(Error::DepthExceeded {
                depth,
                max: self.max_depth,
            });
        }
        Ok(())
    }
}
