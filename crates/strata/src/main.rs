//! Strata CLI - workstream hierarchies from the command line.
//!
//! Manages a `.strata/` workspace: workstreams and their parent links,
//! principals and inherited grants, releases and tasks, and rollups.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use strata::{
    PermissionType, PrincipalId, ReleaseId, TaskId, TaskStatus, WorkstreamId, WorkstreamKind,
    WorkstreamStatus,
};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::OutputMode;

/// Strata: workstream hierarchy engine.
#[derive(Parser)]
#[command(name = "strata")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Workspace directory (defaults to current directory)
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print JSON instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a .strata workspace in the current directory
    Init {
        /// Maximum hierarchy depth (root = 0)
        #[arg(long)]
        max_depth: Option<u32>,
    },

    #[command(flatten)]
    Workspace(WorkspaceCommand),
}

/// Commands that run against an existing workspace.
#[derive(Subcommand)]
enum WorkspaceCommand {
    /// Create a workstream
    Add {
        /// Display name
        name: String,

        /// Kind (product_line, initiative, experiment)
        #[arg(short, long)]
        kind: WorkstreamKind,

        /// Accountable principal
        #[arg(short, long)]
        owner: String,

        /// Owning tenant
        #[arg(short, long, default_value = "default")]
        tenant: String,

        /// Parent workstream id (omit to create a root)
        #[arg(short, long)]
        parent: Option<WorkstreamId>,

        /// Initial status (defaults per kind)
        #[arg(short, long)]
        status: Option<WorkstreamStatus>,
    },

    /// Move a workstream under a new parent
    #[command(name = "move")]
    Move {
        /// Workstream to move
        id: WorkstreamId,

        /// New parent id
        #[arg(short, long, conflicts_with = "root", required_unless_present = "root")]
        parent: Option<WorkstreamId>,

        /// Detach the workstream and make it a root
        #[arg(long)]
        root: bool,
    },

    /// Delete a workstream with no children or releases
    Rm {
        /// Workstream to delete
        id: WorkstreamId,
    },

    /// Show one workstream with its position in the hierarchy
    Show {
        /// Workstream id
        id: WorkstreamId,
    },

    /// Print the hierarchy (all roots when no id is given)
    Tree {
        /// Subtree root
        id: Option<WorkstreamId>,
    },

    /// List ancestors, root first
    Ancestors {
        /// Workstream id
        id: WorkstreamId,
    },

    /// List descendants by depth
    Descendants {
        /// Workstream id
        id: WorkstreamId,
    },

    /// Manage principals
    Principal {
        #[command(subcommand)]
        action: PrincipalAction,
    },

    /// Grant a permission to a principal
    Grant {
        /// Workstream id
        node: WorkstreamId,

        /// Principal id
        principal: String,

        /// Permission (view, edit, admin)
        permission: PermissionType,

        /// Apply to this workstream only instead of the whole subtree
        #[arg(long)]
        node_only: bool,
    },

    /// Remove a grant
    Revoke {
        /// Grant id
        grant: strata::GrantId,
    },

    /// Show a principal's effective permissions on a workstream
    Perms {
        /// Workstream id
        node: WorkstreamId,

        /// Principal id
        principal: String,

        /// List the grants that contribute
        #[arg(long)]
        explain: bool,
    },

    /// Manage releases
    Release {
        #[command(subcommand)]
        action: ReleaseAction,
    },

    /// Manage tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Release and task rollup for a subtree
    Rollup {
        /// Workstream id
        id: WorkstreamId,
    },

    /// Verify hierarchy integrity
    Check,
}

#[derive(Subcommand)]
enum PrincipalAction {
    /// Register a principal (or rename an existing one)
    Add {
        /// Principal id
        id: String,

        /// Display name
        display_name: String,
    },
}

#[derive(Subcommand)]
enum ReleaseAction {
    /// Add a release to a workstream
    Add {
        /// Owning workstream id
        node: WorkstreamId,

        /// Release name
        name: String,
    },

    /// Transfer a release to another workstream
    #[command(name = "move")]
    Move {
        /// Release id
        release: ReleaseId,

        /// New owning workstream id
        node: WorkstreamId,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Add a task to a release
    Add {
        /// Release id
        release: ReleaseId,

        /// Task title
        title: String,
    },

    /// Change a task's status
    Status {
        /// Task id
        task: TaskId,

        /// New status (todo, in_progress, done)
        status: TaskStatus,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Determine workspace root
    let workspace = match cli.workspace {
        Some(w) => w,
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!(
                    "{}: failed to get current directory: {e}",
                    "error".red().bold()
                );
                return ExitCode::FAILURE;
            }
        },
    };

    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let result = match cli.command {
        Commands::Init { max_depth } => cli::workspace::init(&workspace, max_depth, mode),
        Commands::Workspace(command) => strata::Strata::open_workspace(&workspace)
            .map_err(anyhow::Error::from)
            .and_then(|strata| dispatch(&strata, command, mode)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            // Show cause chain for nested errors
            for cause in e.chain().skip(1) {
                eprintln!("  {}: {cause}", "caused by".dimmed());
            }
            ExitCode::FAILURE
        }
    }
}

fn dispatch(strata: &strata::Strata, command: WorkspaceCommand, mode: OutputMode) -> anyhow::Result<()> {
    match command {
        WorkspaceCommand::Add {
            name,
            kind,
            owner,
            tenant,
            parent,
            status,
        } => cli::nodes::add(
            strata,
            cli::nodes::AddArgs {
                name,
                kind,
                owner,
                tenant,
                parent,
                status,
            },
            mode,
        ),
        WorkspaceCommand::Move { id, parent, root } => {
            let parent = if root { None } else { parent };
            cli::nodes::reparent(strata, id, parent, mode)
        }
        WorkspaceCommand::Rm { id } => cli::nodes::remove(strata, id, mode),
        WorkspaceCommand::Show { id } => cli::nodes::show(strata, id, mode),
        WorkspaceCommand::Tree { id } => cli::nodes::tree(strata, id, mode),
        WorkspaceCommand::Ancestors { id } => cli::nodes::ancestors(strata, id, mode),
        WorkspaceCommand::Descendants { id } => cli::nodes::descendants(strata, id, mode),
        WorkspaceCommand::Principal {
            action: PrincipalAction::Add { id, display_name },
        } => cli::access::add_principal(strata, &PrincipalId::new(id), &display_name, mode),
        WorkspaceCommand::Grant {
            node,
            principal,
            permission,
            node_only,
        } => cli::access::grant(
            strata,
            node,
            PrincipalId::new(principal),
            permission,
            node_only,
            mode,
        ),
        WorkspaceCommand::Revoke { grant } => cli::access::revoke(strata, grant, mode),
        WorkspaceCommand::Perms {
            node,
            principal,
            explain,
        } => cli::access::perms(strata, node, &PrincipalId::new(principal), explain, mode),
        WorkspaceCommand::Release { action } => match action {
            ReleaseAction::Add { node, name } => cli::work::add_release(strata, node, name, mode),
            ReleaseAction::Move { release, node } => {
                cli::work::move_release(strata, release, node, mode)
            }
        },
        WorkspaceCommand::Task { action } => match action {
            TaskAction::Add { release, title } => cli::work::add_task(strata, release, title, mode),
            TaskAction::Status { task, status } => {
                cli::work::set_task_status(strata, task, status, mode)
            }
        },
        WorkspaceCommand::Rollup { id } => cli::report::rollup(strata, id, mode),
        WorkspaceCommand::Check => cli::report::check(strata, mode),
    }
}
