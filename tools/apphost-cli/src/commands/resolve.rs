//! Resolve a symbol through a running application.

use std::time::Duration;

use anyhow::{anyhow, bail, Context as _, Result};
use apphost_core::{Resolution, WorkerState};
use apphost_host::{Host, HostConfig};
use apphost_loaders::builtin_types;
use serde::Serialize;

use super::{select, ResolveArgs};
use crate::context::Context;

#[derive(Serialize)]
struct ResolutionRow<'a> {
    symbol: &'a str,
    application: &'a str,
    loader: &'a str,
    location: String,
}

/// Run the resolve command.
pub async fn run(args: ResolveArgs, ctx: &Context) -> Result<()> {
    let config = select(&ctx.config, std::slice::from_ref(&args.application))?;
    config.validate().context("Invalid configuration")?;

    let symbol = args.symbol.clone();
    let resolution = tokio::task::spawn_blocking(move || resolve(&config, &args))
        .await
        .context("Resolver task failed")??;

    let Some(resolution) = resolution else {
        bail!("No class loader knows {}", symbol);
    };

    if ctx.output.is_json() {
        ctx.output.json(&ResolutionRow {
            symbol: &resolution.definition.symbol,
            application: &resolution.application,
            loader: &resolution.loader,
            location: resolution.definition.location.display().to_string(),
        });
        return Ok(());
    }

    ctx.output.success(&format!("Resolved {}", resolution.definition.symbol));
    ctx.output.kv("application", &resolution.application);
    ctx.output.kv("loader", &resolution.loader);
    ctx.output.kv("location", &resolution.definition.location.display().to_string());
    Ok(())
}

fn resolve(config: &HostConfig, args: &ResolveArgs) -> Result<Option<Resolution>> {
    let mut host = Host::from_config(config);
    let report = host.build_all(config, &builtin_types());
    if let Some(err) = report.failed.into_iter().next() {
        return Err(err.into());
    }

    host.start(&args.application)?;
    let state = host.wait_running(&args.application, Duration::from_secs(args.startup_timeout))?;
    if state != WorkerState::Running {
        return match host.stop(&args.application) {
            Err(err) => Err(err.into()),
            Ok(_) => Err(anyhow!(
                "{} did not reach the running state ({})",
                args.application, state
            )),
        };
    }

    let resolution = if args.shared {
        host.resolve_shared(&args.symbol)
    } else {
        host.resolve(&args.application, &args.symbol)?
    };
    host.stop(&args.application)?;
    Ok(resolution)
}
