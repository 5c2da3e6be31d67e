use mvcore::cli::run_cli;
use mvcore::logging::{init_logging, LogConfig};

fn main() -> anyhow::Result<()> {
    let mut config = LogConfig::from_env();
    if std::env::var("MVC_LOG_LEVEL").is_err() {
        // Keep stdout to the command's own report unless asked otherwise.
        config.level = "warn".to_string();
    }
    init_logging(&config)?;
    run_cli()
}
