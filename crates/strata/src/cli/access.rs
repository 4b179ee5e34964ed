//! Access commands: `principal add`, `grant`, `revoke`, `perms`.

use anyhow::Result;
use colored::Colorize;
use strata::{GrantId, GrantScope, NewGrant, PermissionType, PrincipalId, Strata, WorkstreamId};

use super::display::permissions_text;
use super::{print_json, OutputMode};

/// Run the principal add command.
pub fn add_principal(
    strata: &Strata,
    id: &PrincipalId,
    display_name: &str,
    mode: OutputMode,
) -> Result<()> {
    let principal = strata.register_principal(id, display_name)?;

    match mode {
        OutputMode::Json => print_json(&principal)?,
        OutputMode::Text => println!(
            "{} principal {} ({})",
            "Registered".green().bold(),
            principal.id.to_string().cyan(),
            principal.display_name
        ),
    }
    Ok(())
}

/// Run the grant command.
pub fn grant(
    strata: &Strata,
    node: WorkstreamId,
    principal: PrincipalId,
    permission: PermissionType,
    node_only: bool,
    mode: OutputMode,
) -> Result<()> {
    let scope = if node_only {
        GrantScope::NodeOnly
    } else {
        GrantScope::NodeAndDescendants
    };
    let grant = strata.grant(NewGrant {
        workstream: node,
        principal,
        permission,
        scope,
    })?;

    match mode {
        OutputMode::Json => print_json(&grant)?,
        OutputMode::Text => println!(
            "{} {} to {} on #{} ({}) as grant {}",
            "Granted".green().bold(),
            grant.permission.as_str().bold(),
            grant.principal.to_string().cyan(),
            grant.workstream,
            grant.scope.as_str(),
            format!("#{}", grant.id).dimmed()
        ),
    }
    Ok(())
}

/// Run the revoke command.
pub fn revoke(strata: &Strata, id: GrantId, mode: OutputMode) -> Result<()> {
    let grant = strata.revoke(id)?;

    match mode {
        OutputMode::Json => print_json(&grant)?,
        OutputMode::Text => println!(
            "{} {} from {} on #{}",
            "Revoked".green().bold(),
            grant.permission.as_str().bold(),
            grant.principal.to_string().cyan(),
            grant.workstream
        ),
    }
    Ok(())
}

/// Run the perms command.
pub fn perms(
    strata: &Strata,
    node: WorkstreamId,
    principal: &PrincipalId,
    explain: bool,
    mode: OutputMode,
) -> Result<()> {
    if !explain {
        let permissions = strata.effective_permissions(node, principal)?;
        match mode {
            OutputMode::Json => print_json(&permissions)?,
            OutputMode::Text => println!(
                "{} on #{node}: {}",
                principal.to_string().cyan(),
                permissions_text(&permissions)
            ),
        }
        return Ok(());
    }

    let resolution = strata.explain_permissions(node, principal)?;
    if mode == OutputMode::Json {
        print_json(&resolution)?;
        return Ok(());
    }

    println!(
        "{} on #{node}: {}",
        principal.to_string().cyan(),
        permissions_text(&resolution.permissions)
    );
    if !resolution.principal_known {
        println!("  {}", "principal is not registered".yellow());
        return Ok(());
    }
    if resolution.sources.is_empty() {
        println!("  {}", "no applicable grants".dimmed());
    }
    for source in &resolution.sources {
        let origin = if source.hops == 0 {
            "direct".to_string()
        } else {
            format!("inherited from #{} ({} up)", source.grant.workstream, source.hops)
        };
        println!(
            "  {} {} via grant {} [{}]",
            "•".dimmed(),
            source.grant.permission.as_str().bold(),
            format!("#{}", source.grant.id).dimmed(),
            origin
        );
    }
    Ok(())
}
