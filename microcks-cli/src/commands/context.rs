//! `context` lists the stored contexts, switches the current one or
//! deletes one together with the records only it references.

use std::path::Path;

use clap::Args;
use microcks_shared::config::{self, ContextRef, LocalConfig};
use microcks_shared::{MicrocksError, Result};
use tracing::warn;

#[derive(Args, Debug)]
pub struct ContextArgs {
    /// Context to switch to or delete; lists all contexts when omitted
    pub name: Option<String>,

    /// Delete the given context
    #[arg(long, short = 'd')]
    pub delete: bool,
}

pub fn execute(args: ContextArgs) -> Result<()> {
    let config_path = config::default_config_path()?;

    if args.delete {
        let name = args.name.ok_or_else(|| {
            MicrocksError::Validation("a context name is required with --delete".into())
        })?;
        return delete_context(&name, &config_path);
    }

    match args.name {
        None => print_contexts(&config_path),
        Some(name) => switch_context(&name, &config_path),
    }
}

fn switch_context(name: &str, config_path: &Path) -> Result<()> {
    let mut local = read_required(config_path)?;

    if local.current_context == name {
        println!("Already at context '{name}'");
        return Ok(());
    }

    local.resolve_context(name)?;
    local.current_context = name.to_string();
    local.write(config_path)?;
    println!("Switched to context '{name}'");
    Ok(())
}

fn delete_context(name: &str, config_path: &Path) -> Result<()> {
    let mut local = LocalConfig::read(config_path)?
        .ok_or_else(|| MicrocksError::NotFound("nothing to delete, no configuration found".into()))?;

    remove_context_records(&mut local, name)
        .ok_or_else(|| MicrocksError::NotFound(format!("context {name} does not exist")))?;

    if local.is_empty() {
        LocalConfig::delete(config_path)?;
    } else {
        local.write(config_path)?;
    }
    println!("Context '{name}' deleted");
    Ok(())
}

/// Removes a context and the user and server records no other context
/// references anymore. Clears the current-context marker when it pointed at
/// the removed context. Returns `None` when the context does not exist.
pub(crate) fn remove_context_records(local: &mut LocalConfig, name: &str) -> Option<ContextRef> {
    let removed = local.remove_context(name)?;

    if !local.contexts.iter().any(|c| c.user == removed.user) {
        local.remove_user(&removed.user);
    }
    if !local.contexts.iter().any(|c| c.server == removed.server) {
        local.remove_server(&removed.server);
        local.remove_auth(&removed.server);
    }
    if local.current_context == name {
        local.current_context.clear();
    }
    Some(removed)
}

fn print_contexts(config_path: &Path) -> Result<()> {
    let local = read_required(config_path)?;

    let name_width = local
        .contexts
        .iter()
        .map(|c| c.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len())
        + 2;

    println!("{:<9}{:<width$}{}", "CURRENT", "NAME", "SERVER", width = name_width);
    for ctx in &local.contexts {
        if let Err(e) = local.resolve_context(&ctx.name) {
            warn!("context '{}' had error: {e}", ctx.name);
        }
        let prefix = if local.current_context == ctx.name { "*" } else { " " };
        println!("{:<9}{:<width$}{}", prefix, ctx.name, ctx.server, width = name_width);
    }
    Ok(())
}

fn read_required(config_path: &Path) -> Result<LocalConfig> {
    LocalConfig::read(config_path)?.ok_or_else(|| {
        MicrocksError::NotFound(format!("no contexts defined in {}", config_path.display()))
    })
}
