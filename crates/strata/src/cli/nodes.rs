//! Workstream commands: `add`, `move`, `rm`, `show`, `tree`, `ancestors`,
//! `descendants`.

use anyhow::Result;
use colored::Colorize;
use strata::{
    NewWorkstream, PrincipalId, Strata, TenantId, WorkstreamId, WorkstreamKind, WorkstreamStatus,
};

use super::display::{print_tree, print_workstreams, workstream_line};
use super::{print_json, OutputMode};

/// Arguments of `strata add`.
pub struct AddArgs {
    pub name: String,
    pub kind: WorkstreamKind,
    pub owner: String,
    pub tenant: String,
    pub parent: Option<WorkstreamId>,
    pub status: Option<WorkstreamStatus>,
}

/// Run the add command.
pub fn add(strata: &Strata, args: AddArgs, mode: OutputMode) -> Result<()> {
    let new = NewWorkstream {
        tenant: TenantId::new(args.tenant),
        name: args.name,
        kind: args.kind,
        status: args.status,
        owner: PrincipalId::new(args.owner),
        parent: args.parent,
    };
    let ws = strata.create_workstream(new)?;

    match mode {
        OutputMode::Json => print_json(&ws)?,
        OutputMode::Text => println!("{} {}", "Created".green().bold(), workstream_line(&ws)),
    }
    Ok(())
}

/// Run the move command. `parent = None` detaches to a root.
pub fn reparent(
    strata: &Strata,
    id: WorkstreamId,
    parent: Option<WorkstreamId>,
    mode: OutputMode,
) -> Result<()> {
    let ws = strata.reparent(id, parent)?;

    match mode {
        OutputMode::Json => print_json(&ws)?,
        OutputMode::Text => {
            let target = parent.map_or_else(|| "root".to_string(), |p| format!("#{p}"));
            println!(
                "{} {} under {}",
                "Moved".green().bold(),
                workstream_line(&ws),
                target.cyan()
            );
        }
    }
    Ok(())
}

/// Run the rm command.
pub fn remove(strata: &Strata, id: WorkstreamId, mode: OutputMode) -> Result<()> {
    strata.delete_workstream(id)?;

    match mode {
        OutputMode::Json => print_json(&serde_json::json!({ "deleted": id }))?,
        OutputMode::Text => println!("{} #{id}", "Deleted".green().bold()),
    }
    Ok(())
}

/// Run the show command.
pub fn show(strata: &Strata, id: WorkstreamId, mode: OutputMode) -> Result<()> {
    let ws = strata.get_workstream(id)?;
    let ancestors = strata.ancestors(id)?;
    let children = strata.children(id)?;
    let releases = strata.releases_of(id)?;
    let depth = strata.depth(id)?;

    if mode == OutputMode::Json {
        print_json(&serde_json::json!({
            "workstream": ws,
            "depth": depth,
            "ancestors": ancestors,
            "children": children,
            "releases": releases,
        }))?;
        return Ok(());
    }

    println!("{}", workstream_line(&ws));
    println!("  {}: {}", "Kind".dimmed(), ws.kind.traits().label);
    println!("  {}: {}", "Tenant".dimmed(), ws.tenant);
    println!("  {}: {}", "Owner".dimmed(), ws.owner);
    println!("  {}: {depth}", "Depth".dimmed());
    if !ancestors.is_empty() {
        let path: Vec<_> = ancestors.iter().map(|a| a.name.as_str()).collect();
        println!("  {}: {}", "Path".dimmed(), path.join(" / "));
    }
    println!(
        "  {}: {}",
        "Created".dimmed(),
        ws.created_at.format("%Y-%m-%d %H:%M")
    );

    println!();
    println!("{}", "Children".white().bold());
    print_workstreams(&children, "(none)");

    println!();
    println!("{}", "Releases".white().bold());
    if releases.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for release in &releases {
        println!(
            "  {} {} {} [{}]",
            "•".dimmed(),
            format!("#{}", release.id).cyan(),
            release.name,
            release.status.as_str()
        );
    }
    Ok(())
}

/// Run the tree command; without an id, prints every root.
pub fn tree(strata: &Strata, id: Option<WorkstreamId>, mode: OutputMode) -> Result<()> {
    let roots = match id {
        Some(id) => vec![id],
        None => strata.roots(None)?.into_iter().map(|w| w.id).collect(),
    };
    let trees = roots
        .into_iter()
        .map(|root| strata.build_tree(root))
        .collect::<strata::Result<Vec<_>>>()?;

    match mode {
        OutputMode::Json => print_json(&trees)?,
        OutputMode::Text => {
            if trees.is_empty() {
                println!("{}", "No workstreams yet".dimmed());
            }
            for tree in &trees {
                print_tree(tree);
            }
        }
    }
    Ok(())
}

/// Run the ancestors command.
pub fn ancestors(strata: &Strata, id: WorkstreamId, mode: OutputMode) -> Result<()> {
    let ancestors = strata.ancestors(id)?;

    match mode {
        OutputMode::Json => print_json(&ancestors)?,
        OutputMode::Text => {
            println!("{} of #{id} (root first):", "Ancestors".white().bold());
            print_workstreams(&ancestors, "(root workstream)");
        }
    }
    Ok(())
}

/// Run the descendants command.
pub fn descendants(strata: &Strata, id: WorkstreamId, mode: OutputMode) -> Result<()> {
    let descendants = strata.descendants(id)?;

    match mode {
        OutputMode::Json => print_json(&descendants)?,
        OutputMode::Text => {
            println!("{} of #{id}:", "Descendants".white().bold());
            print_workstreams(&descendants, "(leaf workstream)");
            println!();
            println!(
                "{}: {}",
                "Total".dimmed(),
                descendants.len().to_string().green()
            );
        }
    }
    Ok(())
}
