//! Database schema definition for Strata.

/// Database schema definition.
pub(crate) const SCHEMA: &str = r"
-- Identity directory mirror; grants reference it
CREATE TABLE IF NOT EXISTS principals (
    id TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Workstream forest: one row per node, parent_id NULL for roots
CREATE TABLE IF NOT EXISTS workstreams (
    id INTEGER PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    status TEXT NOT NULL,
    owner_id TEXT NOT NULL,
    parent_id INTEGER REFERENCES workstreams(id) ON DELETE RESTRICT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK (parent_id IS NULL OR parent_id <> id)
);

CREATE INDEX IF NOT EXISTS idx_workstreams_parent ON workstreams(parent_id);
CREATE INDEX IF NOT EXISTS idx_workstreams_roots ON workstreams(tenant_id) WHERE parent_id IS NULL;

-- Grants belong to the node they were created on and go away with it
CREATE TABLE IF NOT EXISTS permission_grants (
    id INTEGER PRIMARY KEY,
    workstream_id INTEGER NOT NULL REFERENCES workstreams(id) ON DELETE CASCADE,
    principal_id TEXT NOT NULL REFERENCES principals(id) ON DELETE CASCADE,
    permission TEXT NOT NULL,
    scope TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (workstream_id, principal_id, permission, scope)
);

CREATE INDEX IF NOT EXISTS idx_grants_workstream_principal
    ON permission_grants(workstream_id, principal_id);
CREATE INDEX IF NOT EXISTS idx_grants_principal ON permission_grants(principal_id);

-- Leaf domain: releases block workstream deletion, tasks follow their release
CREATE TABLE IF NOT EXISTS releases (
    id INTEGER PRIMARY KEY,
    workstream_id INTEGER NOT NULL REFERENCES workstreams(id) ON DELETE RESTRICT,
    name TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_releases_workstream ON releases(workstream_id);

CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY,
    release_id INTEGER NOT NULL REFERENCES releases(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tasks_release ON tasks(release_id);
CREATE INDEX IF NOT EXISTS idx_tasks_release_status ON tasks(release_id, status);
";
