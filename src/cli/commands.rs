use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

use crate::app::controller_key;
use crate::config::AppConfig;
use crate::router::{PatternRouter, Router};

/// Command-line interface for mvcore
#[derive(Parser, Debug)]
#[command(name = "mvcore", version)]
#[command(about = "Inspect mvcore routing and configuration", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Resolve a URI and print the controller and action it maps to
    Route {
        /// Request URI, e.g. /users/edit/7
        #[arg(short, long)]
        uri: String,

        /// Configuration file supplying suffixes, namespace and modules
        #[arg(short, long, env = "MVC_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Validate a configuration file and print the resolved settings
    CheckConfig {
        /// Configuration file (YAML)
        #[arg(short, long, env = "MVC_CONFIG")]
        config: PathBuf,
    },
}

/// Parse process arguments and run the selected command on stdout.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    execute(&cli, &mut stdout.lock())
}

/// Run a parsed command, writing its report to `out`.
pub fn execute(cli: &Cli, out: &mut impl Write) -> Result<()> {
    match &cli.command {
        Commands::Route { uri, config } => route(uri, config.as_deref(), out),
        Commands::CheckConfig { config } => check_config(config, out),
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path),
        None => Ok(AppConfig::default()),
    }
}

fn route(uri: &str, config: Option<&Path>, out: &mut impl Write) -> Result<()> {
    let config = load_config(config)?;
    let mut router = PatternRouter::new();
    for module in config.modules.keys() {
        router.with_module(module.as_str());
    }
    router.dump_routes();
    let resolved = router.handle(Some(uri));
    debug!(uri, controller = %resolved.controller_name, "Route resolved");

    let report = json!({
        "uri": uri,
        "module": resolved.module_name,
        "controller": resolved.controller_name,
        "action": resolved.action_name,
        "params": resolved.params.to_vec(),
        "controller_key": controller_key(
            &resolved.controller_name,
            &config.app.controller_suffix,
            config.app.default_namespace.as_deref(),
        ),
        "action_method": format!("{}{}", resolved.action_name, config.app.action_suffix),
    });
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?).context("Failed to write report")?;
    Ok(())
}

fn check_config(path: &Path, out: &mut impl Write) -> Result<()> {
    let config = AppConfig::load(path)?;
    let modules: Vec<_> = config
        .modules
        .iter()
        .map(|(name, module)| {
            json!({
                "name": name,
                "path": module.path.display().to_string(),
                "class_name": module.class_name,
                "path_exists": module.path.exists(),
            })
        })
        .collect();

    let report = json!({
        "app": {
            "default_namespace": config.app.default_namespace,
            "controller_suffix": config.app.controller_suffix,
            "action_suffix": config.app.action_suffix,
        },
        "modules": modules,
        "database": {
            "dsn": redact_dsn(&config.server_config().dsn()),
            "db": config.database.db,
        },
        "cookie_encryption": config.cookies.encryption_key.is_some(),
        "logging": {
            "level": config.logging.max_level().as_str(),
            "format": config.logging.format,
            "directives": config.logging.directives,
        },
    });
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?).context("Failed to write report")?;
    Ok(())
}

/// Mask the password in a connection string.
fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut url) if url.password().is_some() => match url.set_password(Some("****")) {
            Ok(()) => url.to_string(),
            Err(()) => dsn.to_string(),
        },
        _ => dsn.to_string(),
    }
}
