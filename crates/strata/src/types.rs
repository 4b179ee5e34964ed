//! Domain types for the workstream hierarchy.
//!
//! - **Entities**: `Workstream`, `PermissionGrant`, `Release`, `Task`, `Principal`
//!   (stored in the database)
//! - **Inputs**: `NewWorkstream`, `WorkstreamUpdate`, `NewGrant`, `NewRelease`, `NewTask`
//! - **Results**: `TreeNode`, `PermissionSet`, `RollupReport` (query results)
//!
//! ## Design Decisions
//!
//! | Decision | Choice | Rationale |
//! |----------|--------|-----------|
//! | Tree shape | `parent` id on each row | Arena of rows; no pointer graph to keep in sync |
//! | Kind behaviour | Lookup table keyed by `WorkstreamKind` | Closed set of kinds, no dispatch |
//! | Permissions | `BTreeSet` of types | Union semantics, deterministic order |

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

// ============================================================================
// Strongly-typed ID wrappers
// ============================================================================

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Extract the raw i64 value.
            #[must_use]
            pub fn as_i64(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|_| Error::Validation(format!("'{s}' is not a valid id")))
            }
        }
    };
}

integer_id!(
    /// Identifier of a workstream node.
    WorkstreamId
);
integer_id!(
    /// Identifier of a release.
    ReleaseId
);
integer_id!(
    /// Identifier of a task.
    TaskId
);
integer_id!(
    /// Identifier of a permission grant.
    GrantId
);

/// Identifier of a principal (user or service account) from the identity directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub String);

impl PrincipalId {
    /// Create a new principal id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrincipalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of the tenant (organization) a workstream belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    /// Create a new tenant id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ============================================================================
// Enums
// ============================================================================

fn unknown_value(what: &str, value: &str) -> Error {
    Error::Validation(format!("unknown {what} '{value}'"))
}

/// Kind of workstream.
///
/// The set is closed; per-kind behaviour lives in [`KindTraits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkstreamKind {
    /// Long-lived product line
    ProductLine,
    /// Time-boxed initiative
    Initiative,
    /// Exploratory experiment
    Experiment,
}

/// Static per-kind attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindTraits {
    /// Human-readable label
    pub label: &'static str,
    /// Marker used when rendering trees
    pub glyph: &'static str,
    /// Status assigned when a workstream is created without one
    pub default_status: WorkstreamStatus,
}

const KIND_TRAITS: [KindTraits; 3] = [
    KindTraits {
        label: "Product line",
        glyph: "◆",
        default_status: WorkstreamStatus::Active,
    },
    KindTraits {
        label: "Initiative",
        glyph: "●",
        default_status: WorkstreamStatus::Planned,
    },
    KindTraits {
        label: "Experiment",
        glyph: "○",
        default_status: WorkstreamStatus::Planned,
    },
];

impl WorkstreamKind {
    /// Look up the static attributes of this kind.
    #[must_use]
    pub fn traits(self) -> &'static KindTraits {
        &KIND_TRAITS[self as usize]
    }

    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProductLine => "product_line",
            Self::Initiative => "initiative",
            Self::Experiment => "experiment",
        }
    }
}

impl FromStr for WorkstreamKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "product_line" | "product" => Ok(Self::ProductLine),
            "initiative" => Ok(Self::Initiative),
            "experiment" => Ok(Self::Experiment),
            _ => Err(unknown_value("workstream kind", s)),
        }
    }
}

/// Lifecycle status of a workstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkstreamStatus {
    /// Not started
    Planned,
    /// In flight
    Active,
    /// Temporarily stopped
    Paused,
    /// Finished
    Completed,
    /// Kept for history only
    Archived,
}

impl WorkstreamStatus {
    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }
}

impl FromStr for WorkstreamStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "planned" => Ok(Self::Planned),
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            "archived" => Ok(Self::Archived),
            _ => Err(unknown_value("workstream status", s)),
        }
    }
}

/// Permission level carried by a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    /// Read access
    View,
    /// Modify access
    Edit,
    /// Administrative access
    Admin,
}

impl PermissionType {
    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for PermissionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "view" => Ok(Self::View),
            "edit" => Ok(Self::Edit),
            "admin" => Ok(Self::Admin),
            _ => Err(unknown_value("permission type", s)),
        }
    }
}

/// How far a grant reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantScope {
    /// Applies to the granted workstream only
    NodeOnly,
    /// Applies to the granted workstream and its entire subtree
    NodeAndDescendants,
}

impl GrantScope {
    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NodeOnly => "node_only",
            Self::NodeAndDescendants => "node_and_descendants",
        }
    }
}

impl FromStr for GrantScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "node_only" | "node" => Ok(Self::NodeOnly),
            "node_and_descendants" | "subtree" => Ok(Self::NodeAndDescendants),
            _ => Err(unknown_value("grant scope", s)),
        }
    }
}

/// Status of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStatus {
    /// Scheduled
    Planned,
    /// Being prepared
    InProgress,
    /// Shipped
    Released,
    /// Abandoned
    Cancelled,
}

impl ReleaseStatus {
    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::InProgress => "in_progress",
            Self::Released => "released",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for ReleaseStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "planned" => Ok(Self::Planned),
            "in_progress" => Ok(Self::InProgress),
            "released" => Ok(Self::Released),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(unknown_value("release status", s)),
        }
    }
}

/// Status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started
    Todo,
    /// Being worked on
    InProgress,
    /// Completed
    Done,
}

impl TaskStatus {
    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "todo" => Ok(Self::Todo),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            _ => Err(unknown_value("task status", s)),
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A node in the workstream hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workstream {
    /// Database ID
    pub id: WorkstreamId,
    /// Owning tenant; parent and child always share it
    pub tenant: TenantId,
    /// Display name
    pub name: String,
    /// Kind tag
    pub kind: WorkstreamKind,
    /// Lifecycle status
    pub status: WorkstreamStatus,
    /// Accountable principal
    pub owner: PrincipalId,
    /// Parent node; `None` for roots
    pub parent: Option<WorkstreamId>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Workstream {
    /// Returns `true` if this workstream has no parent.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Data for creating a workstream.
#[derive(Debug, Clone)]
pub struct NewWorkstream {
    /// Owning tenant
    pub tenant: TenantId,
    /// Display name
    pub name: String,
    /// Kind tag
    pub kind: WorkstreamKind,
    /// Initial status; defaults to the kind's default status
    pub status: Option<WorkstreamStatus>,
    /// Accountable principal
    pub owner: PrincipalId,
    /// Parent node, or `None` to create a root
    pub parent: Option<WorkstreamId>,
}

impl NewWorkstream {
    /// Minimal constructor for a root workstream; set `parent` to nest it.
    pub fn new(
        tenant: impl Into<String>,
        name: impl Into<String>,
        kind: WorkstreamKind,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            tenant: TenantId::new(tenant),
            name: name.into(),
            kind,
            status: None,
            owner: PrincipalId::new(owner),
            parent: None,
        }
    }

    /// Builder-style setter for the parent.
    #[must_use]
    pub fn under(mut self, parent: WorkstreamId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Data for updating a workstream's descriptive fields.
///
/// Structural changes go through `Strata::reparent`.
#[derive(Debug, Clone, Default)]
pub struct WorkstreamUpdate {
    /// New name (if updating)
    pub name: Option<String>,
    /// New status (if updating)
    pub status: Option<WorkstreamStatus>,
    /// New owner (if updating)
    pub owner: Option<PrincipalId>,
}

/// Maximum length of workstream, release and task names.
pub const MAX_NAME_LENGTH: usize = 200;

/// Trim and validate a display name.
pub(crate) fn validate_name(field: &str, name: &str) -> Result<String, Error> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{field} cannot be empty")));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(Error::Validation(format!(
            "{field} cannot exceed {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// A principal known to the identity directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Principal ID
    pub id: PrincipalId,
    /// Display name
    pub display_name: String,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

/// A permission granted to a principal on a workstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// Database ID
    pub id: GrantId,
    /// Workstream the grant was created on
    pub workstream: WorkstreamId,
    /// Grantee
    pub principal: PrincipalId,
    /// Granted permission
    pub permission: PermissionType,
    /// Reach of the grant
    pub scope: GrantScope,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Data for creating a grant.
#[derive(Debug, Clone)]
pub struct NewGrant {
    /// Workstream to grant on
    pub workstream: WorkstreamId,
    /// Grantee
    pub principal: PrincipalId,
    /// Granted permission
    pub permission: PermissionType,
    /// Reach of the grant
    pub scope: GrantScope,
}

/// A release owned by a workstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Database ID
    pub id: ReleaseId,
    /// Owning workstream
    pub workstream: WorkstreamId,
    /// Release name (e.g. "2.4.0")
    pub name: String,
    /// Release status
    pub status: ReleaseStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Data for creating a release.
#[derive(Debug, Clone)]
pub struct NewRelease {
    /// Owning workstream
    pub workstream: WorkstreamId,
    /// Release name
    pub name: String,
    /// Initial status
    pub status: ReleaseStatus,
}

/// A task belonging to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Database ID
    pub id: TaskId,
    /// Owning release
    pub release: ReleaseId,
    /// Task title
    pub title: String,
    /// Task status
    pub status: TaskStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Data for creating a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    /// Owning release
    pub release: ReleaseId,
    /// Task title
    pub title: String,
    /// Initial status
    pub status: TaskStatus,
}

// ============================================================================
// Query results
// ============================================================================

/// A workstream with its children, recursively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    /// The workstream at this position
    pub workstream: Workstream,
    /// Direct children, ordered by name then id
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Flatten the tree in pre-order.
    #[must_use]
    pub fn flatten(&self) -> Vec<&Workstream> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(&node.workstream);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Number of workstreams in the tree, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(TreeNode::len).sum::<usize>()
    }

    /// A tree always contains at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// The set of permission types a principal holds on a workstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<PermissionType>);

impl PermissionSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a permission type; returns `true` if it was not already present.
    pub fn insert(&mut self, permission: PermissionType) -> bool {
        self.0.insert(permission)
    }

    /// Membership check.
    #[must_use]
    pub fn contains(&self, permission: PermissionType) -> bool {
        self.0.contains(&permission)
    }

    /// Returns `true` if no permission is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct permission types held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if every permission in `self` is also in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &PermissionSet) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Iterate in `View`, `Edit`, `Admin` order.
    pub fn iter(&self) -> impl Iterator<Item = PermissionType> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<PermissionType> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = PermissionType>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(none)");
        }
        let names: Vec<_> = self.iter().map(PermissionType::as_str).collect();
        f.write_str(&names.join(", "))
    }
}

/// Compact reference to a workstream inside a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkstreamRef {
    /// Workstream ID
    pub id: WorkstreamId,
    /// Display name
    pub name: String,
    /// Kind tag
    pub kind: WorkstreamKind,
    /// Lifecycle status
    pub status: WorkstreamStatus,
}

impl From<&Workstream> for WorkstreamRef {
    fn from(w: &Workstream) -> Self {
        Self {
            id: w.id,
            name: w.name.clone(),
            kind: w.kind,
            status: w.status,
        }
    }
}

/// Aggregated release and task metrics for a subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RollupSummary {
    /// Releases owned anywhere in the subtree
    pub total_releases: u64,
    /// Tasks of those releases
    pub total_tasks: u64,
    /// Tasks with status `done`
    pub completed_tasks: u64,
    /// `completed_tasks / total_tasks * 100`, one decimal; 0 when there are no tasks
    pub completion_percentage: f64,
}

impl RollupSummary {
    /// Build a summary, deriving the completion percentage.
    #[must_use]
    pub fn new(total_releases: u64, total_tasks: u64, completed_tasks: u64) -> Self {
        Self {
            total_releases,
            total_tasks,
            completed_tasks,
            completion_percentage: completion_percentage(completed_tasks, total_tasks),
        }
    }

    /// Combine two summaries, recomputing the percentage from the summed counts.
    #[must_use]
    pub fn merge(self, other: RollupSummary) -> Self {
        Self::new(
            self.total_releases + other.total_releases,
            self.total_tasks + other.total_tasks,
            self.completed_tasks + other.completed_tasks,
        )
    }
}

/// Percentage of completed tasks rounded to one decimal; 0 when `total` is 0.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn completion_percentage(completed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (completed as f64 * 1000.0 / total as f64).round() / 10.0
}

/// Tree-shaped rollup of a workstream and its descendants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupReport {
    /// The workstream this report is rooted at
    pub workstream: WorkstreamRef,
    /// Totals for the workstream and everything beneath it
    pub summary: RollupSummary,
    /// One report per direct child, ordered by name then id
    pub child_workstreams: Vec<RollupReport>,
}

impl RollupReport {
    /// Find the report for `id` anywhere in this tree.
    #[must_use]
    pub fn find(&self, id: WorkstreamId) -> Option<&RollupReport> {
        if self.workstream.id == id {
            return Some(self);
        }
        self.child_workstreams.iter().find_map(|c| c.find(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0, 0.0)]
    #[case(0, 4, 0.0)]
    #[case(1, 3, 33.3)]
    #[case(2, 3, 66.7)]
    #[case(1, 8, 12.5)]
    #[case(5, 5, 100.0)]
    fn completion_percentage_rounds_to_one_decimal(
        #[case] completed: u64,
        #[case] total: u64,
        #[case] expected: f64,
    ) {
        let pct = completion_percentage(completed, total);
        assert!(
            (pct - expected).abs() < f64::EPSILON,
            "{completed}/{total} gave {pct}, expected {expected}"
        );
    }

    #[test]
    fn merge_recomputes_percentage_from_counts() {
        let a = RollupSummary::new(1, 2, 2);
        let b = RollupSummary::new(1, 2, 0);
        let merged = a.merge(b);

        assert_eq!(merged.total_releases, 2);
        assert_eq!(merged.total_tasks, 4);
        assert_eq!(merged.completed_tasks, 2);
        assert!((merged.completion_percentage - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn kind_traits_follow_the_tag() {
        assert_eq!(WorkstreamKind::ProductLine.traits().label, "Product line");
        assert_eq!(
            WorkstreamKind::Experiment.traits().default_status,
            WorkstreamStatus::Planned
        );
        assert_eq!(
            WorkstreamKind::ProductLine.traits().default_status,
            WorkstreamStatus::Active
        );
    }

    #[rstest]
    #[case("product_line", WorkstreamKind::ProductLine)]
    #[case("product-line", WorkstreamKind::ProductLine)]
    #[case("Initiative", WorkstreamKind::Initiative)]
    #[case("experiment", WorkstreamKind::Experiment)]
    fn kind_parses_cli_spellings(#[case] input: &str, #[case] expected: WorkstreamKind) {
        assert_eq!(input.parse::<WorkstreamKind>().unwrap(), expected);
    }

    #[test]
    fn unknown_enum_values_are_validation_errors() {
        assert!(matches!(
            "owner".parse::<PermissionType>(),
            Err(Error::Validation(_))
        ));
        assert!(matches!("abc".parse::<WorkstreamId>(), Err(Error::Validation(_))));
    }

    #[test]
    fn permission_set_is_a_union() {
        let mut set = PermissionSet::new();
        assert!(set.insert(PermissionType::View));
        assert!(set.insert(PermissionType::Admin));
        assert!(!set.insert(PermissionType::View));

        assert_eq!(set.len(), 2);
        assert!(set.contains(PermissionType::Admin));
        assert!(!set.contains(PermissionType::Edit));
        assert_eq!(set.to_string(), "view, admin");
    }

    #[test]
    fn validate_name_trims_and_rejects_blank() {
        assert_eq!(validate_name("name", "  Core  ").unwrap(), "Core");
        assert!(validate_name("name", "   ").is_err());
        assert!(validate_name("name", &"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }
}
