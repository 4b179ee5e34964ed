//! Release and task CRUD.
//!
//! Releases and tasks are leaf data owned by a workstream. The engine reads
//! their counts for rollups; the writes here exist so the owning workstream's
//! cache entries can be invalidated in the same call.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::helpers::{count_at, row_to_release, row_to_task, RELEASE_COLUMNS, TASK_COLUMNS};
use crate::error::{Error, Result};
use crate::types::{
    NewRelease, NewTask, Release, ReleaseId, ReleaseStatus, Task, TaskId, TaskStatus,
    WorkstreamId,
};

// === Releases ===

/// Insert a release. `name` must already be validated.
pub(crate) fn insert_release(
    conn: &Connection,
    new: &NewRelease,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Release> {
    conn.execute(
        "INSERT INTO releases (workstream_id, name, status, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![new.workstream.as_i64(), name, new.status.as_str(), now],
    )?;

    Ok(Release {
        id: ReleaseId(conn.last_insert_rowid()),
        workstream: new.workstream,
        name: name.to_string(),
        status: new.status,
        created_at: now,
    })
}

/// Get a release by id, failing with `ReleaseNotFound`.
pub(crate) fn require_release(conn: &Connection, id: ReleaseId) -> Result<Release> {
    let sql = format!("SELECT {RELEASE_COLUMNS} FROM releases r WHERE r.id = ?1");
    conn.prepare_cached(&sql)?
        .query_row([id.as_i64()], row_to_release)
        .optional()?
        .ok_or(Error::ReleaseNotFound(id))
}

/// Releases owned directly by a workstream.
pub(crate) fn releases_of(conn: &Connection, workstream: WorkstreamId) -> Result<Vec<Release>> {
    let sql = format!(
        "SELECT {RELEASE_COLUMNS} FROM releases r WHERE r.workstream_id = ?1 ORDER BY r.id"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map([workstream.as_i64()], row_to_release)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Number of releases owned directly by a workstream.
pub(crate) fn release_count(conn: &Connection, workstream: WorkstreamId) -> Result<usize> {
    conn.prepare_cached("SELECT COUNT(*) FROM releases WHERE workstream_id = ?1")?
        .query_row([workstream.as_i64()], |row| count_at(row, 0))
        .map_err(Into::into)
}

/// Transfer a release (and implicitly its tasks) to another workstream.
pub(crate) fn set_release_workstream(
    conn: &Connection,
    id: ReleaseId,
    workstream: WorkstreamId,
) -> Result<()> {
    let updated = conn.execute(
        "UPDATE releases SET workstream_id = ?2 WHERE id = ?1",
        params![id.as_i64(), workstream.as_i64()],
    )?;
    if updated == 0 {
        return Err(Error::ReleaseNotFound(id));
    }
    Ok(())
}

/// Change a release's status.
pub(crate) fn set_release_status(conn: &Connection, id: ReleaseId, status: ReleaseStatus) -> Result<()> {
    let updated = conn.execute(
        "UPDATE releases SET status = ?2 WHERE id = ?1",
        params![id.as_i64(), status.as_str()],
    )?;
    if updated == 0 {
        return Err(Error::ReleaseNotFound(id));
    }
    Ok(())
}

/// Delete a release; its tasks go with it.
pub(crate) fn delete_release(conn: &Connection, id: ReleaseId) -> Result<()> {
    let deleted = conn.execute("DELETE FROM releases WHERE id = ?1", [id.as_i64()])?;
    if deleted == 0 {
        return Err(Error::ReleaseNotFound(id));
    }
    Ok(())
}

// === Tasks ===

/// Insert a task. `title` must already be validated.
pub(crate) fn insert_task(
    conn: &Connection,
    new: &NewTask,
    title: &str,
    now: DateTime<Utc>,
) -> Result<Task> {
    conn.execute(
        "INSERT INTO tasks (release_id, title, status, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![new.release.as_i64(), title, new.status.as_str(), now],
    )?;

    Ok(Task {
        id: TaskId(conn.last_insert_rowid()),
        release: new.release,
        title: title.to_string(),
        status: new.status,
        created_at: now,
    })
}

/// Get a task by id, failing with `TaskNotFound`.
pub(crate) fn require_task(conn: &Connection, id: TaskId) -> Result<Task> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = ?1");
    conn.prepare_cached(&sql)?
        .query_row([id.as_i64()], row_to_task)
        .optional()?
        .ok_or(Error::TaskNotFound(id))
}

/// Tasks of a release.
pub(crate) fn tasks_of(conn: &Connection, release: ReleaseId) -> Result<Vec<Task>> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.release_id = ?1 ORDER BY t.id");
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map([release.as_i64()], row_to_task)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// The workstream that owns a task through its release.
pub(crate) fn task_workstream(conn: &Connection, id: TaskId) -> Result<WorkstreamId> {
    conn.prepare_cached(
        "SELECT r.workstream_id FROM tasks t JOIN releases r ON r.id = t.release_id WHERE t.id = ?1",
    )?
    .query_row([id.as_i64()], |row| row.get::<_, i64>(0))
    .optional()?
    .map(WorkstreamId)
    .ok_or(Error::TaskNotFound(id))
}

/// Change a task's status.
pub(crate) fn set_task_status(conn: &Connection, id: TaskId, status: TaskStatus) -> Result<()> {
    let updated = conn.execute(
        "UPDATE tasks SET status = ?2 WHERE id = ?1",
        params![id.as_i64(), status.as_str()],
    )?;
    if updated == 0 {
        return Err(Error::TaskNotFound(id));
    }
    Ok(())
}

/// Delete a task.
pub(crate) fn delete_task(conn: &Connection, id: TaskId) -> Result<()> {
    let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", [id.as_i64()])?;
    if deleted == 0 {
        return Err(Error::TaskNotFound(id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{add, memory_db};

    fn release(conn: &Connection, workstream: WorkstreamId) -> Release {
        let new = NewRelease {
            workstream,
            name: "1.0".to_string(),
            status: ReleaseStatus::Planned,
        };
        insert_release(conn, &new, &new.name, Utc::now()).unwrap()
    }

    #[test]
    fn task_workstream_follows_release_moves() {
        let conn = memory_db();
        let a = add(&conn, "A", None);
        let b = add(&conn, "B", None);
        let rel = release(&conn, a);
        let new = NewTask {
            release: rel.id,
            title: "Ship".to_string(),
            status: TaskStatus::Todo,
        };
        let task = insert_task(&conn, &new, &new.title, Utc::now()).unwrap();

        assert_eq!(task_workstream(&conn, task.id).unwrap(), a);
        set_release_workstream(&conn, rel.id, b).unwrap();
        assert_eq!(task_workstream(&conn, task.id).unwrap(), b);
    }

    #[test]
    fn deleting_release_removes_its_tasks() {
        let conn = memory_db();
        let a = add(&conn, "A", None);
        let rel = release(&conn, a);
        let new = NewTask {
            release: rel.id,
            title: "Ship".to_string(),
            status: TaskStatus::Done,
        };
        let task = insert_task(&conn, &new, &new.title, Utc::now()).unwrap();

        delete_release(&conn, rel.id).unwrap();
        assert!(matches!(require_task(&conn, task.id), Err(Error::TaskNotFound(_))));
        assert_eq!(release_count(&conn, a).unwrap(), 0);
    }

    #[test]
    fn release_blocks_workstream_delete_at_schema_level() {
        let conn = memory_db();
        let a = add(&conn, "A", None);
        release(&conn, a);

        assert!(crate::db::workstreams::delete(&conn, a).is_err());
    }
}
