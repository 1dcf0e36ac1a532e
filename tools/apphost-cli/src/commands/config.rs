//! Configuration management commands.

use std::fs;

use anyhow::{bail, Context as _, Result};
use apphost_core::ApplicationFactory;
use apphost_host::{generate_default_config, Host, HostConfig};
use apphost_loaders::builtin_types;

use super::{ConfigArgs, ConfigCommand};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Validate => validate_config(ctx).await,
        ConfigCommand::Init { force, app_base } => init_config(force, &app_base, ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Current Configuration");

    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }
    ctx.output.kv("base_directory", &ctx.config.base_directory);
    ctx.output.kv("app_base", &ctx.config.app_base);
    ctx.output.kv("idle_interval_ms", &ctx.config.idle_interval_ms.to_string());

    for app in &ctx.config.applications {
        ctx.output.info("");
        let disabled = if app.disabled { " (disabled)" } else { "" };
        ctx.output.info(&format!("[{}] type = {}{}", app.name, app.kind, disabled));
        if let Some(base) = &app.base_directory {
            ctx.output.kv("base_directory", base);
        }
        // Listed in lookup order: the last configured loader is consulted first.
        for loader in app.loaders.iter().rev() {
            let via = loader
                .factory
                .as_deref()
                .map(|factory| format!(" via {}", factory))
                .unwrap_or_default();
            ctx.output.list_item(&format!("{} ({}{})", loader.name, loader.kind, via));
        }
    }

    Ok(())
}

async fn validate_config(ctx: &Context) -> Result<()> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if let Err(e) = ctx.config.validate() {
        errors.push(e.to_string());
    }

    // Assemble every application without starting it
    let types = builtin_types();
    let factory = ApplicationFactory::new(&types);
    let probe = Host::from_config(&ctx.config);
    for app in &ctx.config.applications {
        if app.disabled {
            warnings.push(format!("application '{}' is disabled", app.name));
            continue;
        }
        if app.loaders.is_empty() {
            warnings.push(format!("application '{}' has no class loaders", app.name));
        }
        if let Err(e) = factory.assemble(&probe, app) {
            errors.push(e.to_string());
        }
    }

    // Print results
    if errors.is_empty() && warnings.is_empty() {
        ctx.output.success("Configuration is valid");
        return Ok(());
    }

    for error in &errors {
        ctx.output.error(&format!("Error: {}", error));
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    if !errors.is_empty() {
        bail!("Configuration has {} error(s)", errors.len());
    }

    ctx.output.success("Configuration is valid (with warnings)");

    Ok(())
}

async fn init_config(force: bool, app_base: &str, ctx: &Context) -> Result<()> {
    let path = ctx.default_config_path();
    if path.exists() && !force {
        bail!("{} already exists. Use --force to overwrite.", path.display());
    }

    let content = generate_default_config(app_base);
    HostConfig::parse(&path, &content).context("Generated config does not parse")?;
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;

    ctx.output.success(&format!("Created {}", path.display()));
    Ok(())
}
