use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use brutal_wui_core::config::{Config, LoggingConfig};

mod demo;

#[derive(Parser)]
#[command(
    name = "brutal-wui",
    about = "Server-driven web UIs: the backend pushes DOM commands, the browser sends events",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override `server.host`
    #[arg(long, global = true)]
    host: Option<String>,

    /// Override `server.port`
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the demo application
    Demo,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Validate the configuration
    Check,
}

fn init_logging(logging: Option<&LoggingConfig>, verbose: bool) {
    let mut directives = logging
        .and_then(|l| l.level.clone())
        .unwrap_or_else(|| if verbose { "debug" } else { "info" }.to_string());
    for filter in logging.map(|l| l.filters.as_slice()).unwrap_or_default() {
        directives.push(',');
        directives.push_str(filter);
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));
    let json = logging.is_some_and(|l| l.format == "json");
    let stdout = logging.is_some_and(|l| l.output == "stdout");

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match (json, stdout) {
        (true, true) => builder.json().with_writer(std::io::stdout).init(),
        (true, false) => builder.json().with_writer(std::io::stderr).init(),
        (false, true) => builder.with_writer(std::io::stdout).init(),
        (false, false) => builder.with_writer(std::io::stderr).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(Config::config_path);
    let mut config = Config::load(&config_path)?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    init_logging(config.logging.as_ref(), cli.verbose);

    match cli.command {
        Commands::Demo => {
            let (warnings, errors) = config.validate();
            for w in &warnings {
                tracing::warn!("Config: {w}");
            }
            if !errors.is_empty() {
                for e in &errors {
                    tracing::error!("Config: {e}");
                }
                anyhow::bail!("invalid configuration ({} error(s))", errors.len());
            }

            tracing::info!(path = %config_path.display(), "Starting BrutalWUI demo");
            let ui = demo::build(config);
            #[cfg(feature = "metrics")]
            let ui = ui.with_metrics(brutal_wui_gateway::metrics::install_prometheus_recorder()?);
            ui.run().await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&config)?;
                println!("{json}");
            }
            ConfigAction::Check => {
                let (warnings, errors) = config.validate();
                for w in &warnings {
                    println!("warning: {w}");
                }
                for e in &errors {
                    println!("error: {e}");
                }
                if !errors.is_empty() {
                    anyhow::bail!("{} error(s) in {}", errors.len(), config_path.display());
                }
                println!("Config OK ({})", config_path.display());
            }
        },
    }

    Ok(())
}
