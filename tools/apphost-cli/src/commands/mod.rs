//! CLI command implementations.

pub mod config;
pub mod resolve;
pub mod run;

use anyhow::{bail, Result};
use apphost_host::{ApplicationStatus, HostConfig};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::output::{state_badge, Output};

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Only run these applications (repeatable).
    #[arg(long = "only", value_name = "NAME")]
    pub only: Vec<String>,

    /// Seconds to wait for applications to reach the running state.
    #[arg(long, default_value = "30")]
    pub startup_timeout: u64,
}

/// Arguments for the resolve command.
#[derive(Args)]
pub struct ResolveArgs {
    /// Application whose class loaders are consulted.
    pub application: String,

    /// Symbol to resolve (e.g. `app::http::Kernel`).
    pub symbol: String,

    /// Resolve through the shared chain instead of the application's own.
    #[arg(long)]
    pub shared: bool,

    /// Seconds to wait for the application to reach the running state.
    #[arg(long, default_value = "30")]
    pub startup_timeout: u64,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Validate the config file.
    Validate,
    /// Initialize a new config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,

        /// Root directory of hosted applications.
        #[arg(long, default_value = "/opt/appserver/webapps")]
        app_base: String,
    },
}

/// Keep only the named applications. An empty list keeps all of them.
pub fn select(config: &HostConfig, only: &[String]) -> Result<HostConfig> {
    let mut selected = config.clone();
    if only.is_empty() {
        return Ok(selected);
    }
    for name in only {
        if config.application(name).is_none() {
            bail!("Unknown application: {}", name);
        }
    }
    selected.applications.retain(|app| only.contains(&app.name));
    for app in &mut selected.applications {
        app.disabled = false;
    }
    Ok(selected)
}

/// One row of `status` output.
#[derive(Serialize)]
pub struct StatusRow<'a> {
    pub name: &'a str,
    pub state: String,
    pub webapp_path: &'a str,
    pub idle_cycles: u64,
    pub entry_type: Option<&'a str>,
    pub error: Option<&'a str>,
}

impl<'a> From<&'a ApplicationStatus> for StatusRow<'a> {
    fn from(status: &'a ApplicationStatus) -> Self {
        Self {
            name: &status.name,
            state: status.state.to_string(),
            webapp_path: &status.webapp_path,
            idle_cycles: status.idle_cycles,
            entry_type: status.entry_type,
            error: status.error.as_deref(),
        }
    }
}

/// Print a status table, or JSON rows.
pub fn print_status(output: &Output, statuses: &[ApplicationStatus]) {
    if output.is_json() {
        let rows: Vec<StatusRow<'_>> = statuses.iter().map(StatusRow::from).collect();
        output.json(&rows);
        return;
    }

    let widths = [16, 12, 40];
    output.table_row(&["APPLICATION", "STATE", "WEBAPP"], &widths);
    for status in statuses {
        let badge = state_badge(status.state);
        output.table_row(
            &[status.name.as_str(), badge.as_str(), status.webapp_path.as_str()],
            &widths,
        );
        if let Some(error) = &status.error {
            output.kv("error", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apphost_core::ApplicationConfig;

    fn config() -> HostConfig {
        let mut wiki = ApplicationConfig::new("wiki", "passive");
        wiki.disabled = true;
        HostConfig {
            applications: vec![
                ApplicationConfig::new("shop", "kernel"),
                ApplicationConfig::new("blog", "passive"),
                wiki,
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_select_all() {
        assert_eq!(select(&config(), &[]).unwrap(), config());
    }

    #[test]
    fn test_select_named_enables_them() {
        let selected = select(&config(), &["wiki".to_string(), "shop".to_string()]).unwrap();
        let names: Vec<&str> = selected.enabled().map(|app| app.name.as_str()).collect();
        assert_eq!(names, vec!["shop", "wiki"]);
    }

    #[test]
    fn test_select_unknown() {
        let err = select(&config(), &["nope".to_string()]).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
