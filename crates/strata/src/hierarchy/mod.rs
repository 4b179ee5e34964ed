//! Hierarchy traversal and structural checks.
//!
//! The tree is stored as rows with a `parent_id` column; nothing here keeps
//! an in-memory pointer graph between calls. Each type borrows a connection
//! for the duration of one read or write transaction.
//!
//! - [`Navigator`] - ancestors, descendants, depth and nested trees
//! - [`CycleGuard`] - cycle and depth checks for re-parenting
//! - [`integrity`] - whole-forest verification with `petgraph`

mod guard;
pub(crate) mod integrity;
mod navigator;

pub(crate) use guard::CycleGuard;
pub(crate) use navigator::{Navigator, CHAIN_CTE, SUBTREE_CTE};
