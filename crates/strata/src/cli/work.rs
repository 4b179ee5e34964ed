//! Leaf data commands: `release add`, `release move`, `task add`, `task status`.

use anyhow::Result;
use colored::Colorize;
use strata::{
    NewRelease, NewTask, ReleaseId, ReleaseStatus, Strata, TaskId, TaskStatus, WorkstreamId,
};

use super::{print_json, OutputMode};

/// Run the release add command.
pub fn add_release(strata: &Strata, node: WorkstreamId, name: String, mode: OutputMode) -> Result<()> {
    let release = strata.add_release(NewRelease {
        workstream: node,
        name,
        status: ReleaseStatus::Planned,
    })?;

    match mode {
        OutputMode::Json => print_json(&release)?,
        OutputMode::Text => println!(
            "{} release {} {} on #{}",
            "Added".green().bold(),
            format!("#{}", release.id).cyan(),
            release.name.bold(),
            release.workstream
        ),
    }
    Ok(())
}

/// Run the release move command.
pub fn move_release(
    strata: &Strata,
    release: ReleaseId,
    node: WorkstreamId,
    mode: OutputMode,
) -> Result<()> {
    let release = strata.move_release(release, node)?;

    match mode {
        OutputMode::Json => print_json(&release)?,
        OutputMode::Text => println!(
            "{} release {} to #{}",
            "Moved".green().bold(),
            format!("#{}", release.id).cyan(),
            release.workstream
        ),
    }
    Ok(())
}

/// Run the task add command.
pub fn add_task(strata: &Strata, release: ReleaseId, title: String, mode: OutputMode) -> Result<()> {
    let task = strata.add_task(NewTask {
        release,
        title,
        status: TaskStatus::Todo,
    })?;

    match mode {
        OutputMode::Json => print_json(&task)?,
        OutputMode::Text => println!(
            "{} task {} {}",
            "Added".green().bold(),
            format!("#{}", task.id).cyan(),
            task.title
        ),
    }
    Ok(())
}

/// Run the task status command.
pub fn set_task_status(
    strata: &Strata,
    task: TaskId,
    status: TaskStatus,
    mode: OutputMode,
) -> Result<()> {
    let task = strata.set_task_status(task, status)?;

    match mode {
        OutputMode::Json => print_json(&task)?,
        OutputMode::Text => println!(
            "{} task {} is now {}",
            "Updated".green().bold(),
            format!("#{}", task.id).cyan(),
            task.status.as_str().bold()
        ),
    }
    Ok(())
}
