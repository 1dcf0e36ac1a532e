//! Run applications until interrupted.

use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use apphost_core::{WorkerError, WorkerExit, WorkerState};
use apphost_host::Host;
use apphost_loaders::builtin_types;

use super::{print_status, select, RunArgs};
use crate::context::Context;

const REAP_INTERVAL: Duration = Duration::from_millis(500);

/// Run the run command.
pub async fn run(args: RunArgs, ctx: &Context) -> Result<()> {
    let config = select(&ctx.config, &args.only)?;
    config.validate().context("Invalid configuration")?;

    ctx.output.header("Building applications");
    let mut host = Host::from_config(&config);
    let report = host.build_all(&config, &builtin_types());
    for name in &report.skipped {
        ctx.output.debug(&format!("Skipping disabled application {}", name));
    }
    for err in &report.failed {
        ctx.output.warn(&err.to_string());
    }
    if report.built.is_empty() {
        bail!("No application could be built");
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let timeout = Duration::from_secs(args.startup_timeout);
    let startup = tokio::task::spawn_blocking(move || {
        let started = host.start_all();
        let states = host.wait_all_running(timeout);
        (host, started, states)
    });
    tokio::pin!(startup);
    let mut interrupted = false;
    let (mut host, started, states) = loop {
        tokio::select! {
            joined = &mut startup => break joined.context("Failed to start applications")?,
            signal = &mut ctrl_c, if !interrupted => {
                signal.context("Failed to listen for Ctrl-C")?;
                ctx.output.info("Interrupted, stopping once startup settles");
                interrupted = true;
            }
        }
    };

    let start_failure = match started {
        Ok(started) => {
            tracing::info!(applications = started.len(), "host started");
            report_startup(ctx, &states);
            print_status(&ctx.output, &host.status());
            None
        }
        Err(err) => Some(err),
    };

    if !interrupted && start_failure.is_none() {
        ctx.output.info(&format!(
            "{} application(s) resident, press Ctrl-C to stop",
            host.running_count()
        ));
        let mut ticker = tokio::time::interval(REAP_INTERVAL);
        loop {
            tokio::select! {
                signal = &mut ctrl_c => {
                    signal.context("Failed to listen for Ctrl-C")?;
                    ctx.output.info("Stopping applications");
                    break;
                }
                _ = ticker.tick() => {
                    for (name, outcome) in host.reap() {
                        report_exit(ctx, &name, &outcome);
                    }
                    if host.running_count() == 0 {
                        ctx.output.warn("No application left running");
                        break;
                    }
                }
            }
        }
    }

    let (outcomes, statuses) = tokio::task::spawn_blocking(move || {
        let outcomes = host.stop_all();
        (outcomes, host.status())
    })
    .await
    .context("Failed to stop applications")?;

    let mut failures = 0;
    for (name, outcome) in &outcomes {
        failures += usize::from(outcome.is_err());
        report_exit(ctx, name, outcome);
    }
    print_status(&ctx.output, &statuses);

    if let Some(err) = start_failure {
        return Err(err).context("Failed to start applications");
    }
    if failures > 0 {
        bail!("{} application(s) terminated abnormally", failures);
    }
    Ok(())
}

fn report_startup(ctx: &Context, states: &[(String, WorkerState)]) {
    for (name, state) in states {
        match state {
            WorkerState::Running => ctx.output.success(&format!("{} is running", name)),
            WorkerState::Terminated => {
                ctx.output.warn(&format!("{} terminated during startup", name))
            }
            other => ctx.output.warn(&format!("{} still {} after startup timeout", name, other)),
        }
    }
}

fn report_exit(ctx: &Context, name: &str, outcome: &Result<WorkerExit, WorkerError>) {
    match outcome {
        Ok(exit) => ctx.output.success(&format!(
            "{} stopped ({:?}, {} idle cycles)",
            name, exit.reason, exit.idle_cycles
        )),
        Err(err) => ctx.output.error(&format!("{}: {}", name, err)),
    }
}
