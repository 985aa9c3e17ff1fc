//! Alarm Manager main application.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info};

use ric_alarm_manager::{
    config::AlarmManagerConfig,
    core::{manager::AlarmManagerEvent, AlarmManager},
    http,
    utils::setup_logging,
    Result,
};

#[derive(Parser)]
#[command(name = "ric-alarm-manager")]
#[command(about = "Fault-management core for a near-RT RAN controller")]
#[command(version = ric_alarm_manager::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initial alarm definition file, also settable via DEF_FILE
    #[arg(long, value_name = "FILE", env = "DEF_FILE")]
    def_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the alarm manager
    Start,
    /// Validate configuration
    ValidateConfig,
    /// Generate default configuration
    GenerateConfig {
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_configuration(&cli).await?;
    setup_logging(&config.logging)?;

    info!("starting {} v{}", ric_alarm_manager::NAME, ric_alarm_manager::VERSION);
    info!("{}", ric_alarm_manager::DESCRIPTION);

    match &cli.command {
        Some(Commands::Start) | None => run(config, cli.def_file).await,
        Some(Commands::ValidateConfig) => validate_configuration(&config).await,
        Some(Commands::GenerateConfig { output }) => generate_default_config(output.clone()).await,
    }
}

async fn load_configuration(cli: &Cli) -> Result<AlarmManagerConfig> {
    let config = if let Some(config_path) = &cli.config {
        info!("loading configuration from: {}", config_path.display());
        AlarmManagerConfig::load_from_file(config_path)?
    } else {
        info!("no configuration file specified, trying environment variables");
        match AlarmManagerConfig::load_from_env() {
            Ok(config) => config,
            Err(_) => {
                info!("no environment configuration found, using defaults");
                AlarmManagerConfig::default_config()
            }
        }
    };

    config.validate()?;
    info!("configuration loaded and validated successfully");
    Ok(config)
}

async fn run(config: AlarmManagerConfig, def_file: Option<PathBuf>) -> Result<()> {
    ric_alarm_manager::metrics::init();

    let mut manager = AlarmManager::new(&config);
    let mut event_rx = manager
        .events()
        .ok_or_else(|| ric_alarm_manager::Error::internal("event receiver already taken"))?;

    if let Some(path) = def_file {
        match manager.load_definitions(&path).await {
            Ok(count) => info!(count, path = %path.display(), "loaded initial alarm definitions"),
            Err(err) => error!(error = %err, path = %path.display(), "failed to load initial alarm definitions"),
        }
    } else {
        info!("no DEF_FILE set, starting with an empty definition registry (plus the reserved capacity alarms)");
    }

    manager.start();
    let manager = Arc::new(manager);

    let event_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            handle_event(event);
        }
    });

    let (bus_tx, bus_rx) = mpsc::channel::<http::bus::BusMessage>(256);
    let bus_task = tokio::spawn(http::bus::run(manager.clone(), bus_rx));
    drop(bus_tx); // no simulated bus transport is wired up yet; keep the consumer alive for admin-HTTP-only deployments

    let app = http::router(manager.clone());
    let listener = tokio::net::TcpListener::bind(&config.http.bind_address).await?;
    info!(address = %config.http.bind_address, "admin HTTP surface listening");

    let server_task = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!(error = %err, "admin HTTP server exited");
        }
    });

    match signal::ctrl_c().await {
        Ok(()) => info!("received ctrl-c, shutting down gracefully"),
        Err(err) => error!(error = %err, "unable to listen for shutdown signal"),
    }

    manager.request_shutdown();
    server_task.abort();
    bus_task.abort();
    event_task.abort();

    info!("alarm manager shutdown complete");
    Ok(())
}

fn handle_event(event: AlarmManagerEvent) {
    match event {
        AlarmManagerEvent::Started => info!("alarm manager started"),
        AlarmManagerEvent::Stopped => info!("alarm manager stopped"),
        AlarmManagerEvent::DownstreamError { detail } => error!(detail, "downstream emission failed"),
    }
}

async fn validate_configuration(config: &AlarmManagerConfig) -> Result<()> {
    info!("validating configuration...");
    config.validate()?;

    println!("configuration is valid");
    println!("  node id: {}", config.general.node_id);
    println!("  http bind address: {}", config.http.bind_address);
    println!("  max active alarms: {}", config.controls.max_active_alarms);
    println!("  max alarm history: {}", config.controls.max_alarm_history);
    println!("  alert manager: {}{}", config.controls.prom_alert_manager.schemes, config.controls.prom_alert_manager.address);
    println!("  noma enabled: {}", config.controls.noma.enabled);

    Ok(())
}

async fn generate_default_config(output_path: Option<PathBuf>) -> Result<()> {
    let config = AlarmManagerConfig::default_config();
    let toml_content =
        toml::to_string_pretty(&config).map_err(|e| ric_alarm_manager::Error::internal(format!("failed to serialize config: {}", e)))?;

    match output_path {
        Some(path) => {
            std::fs::write(&path, toml_content)?;
            println!("default configuration written to: {}", path.display());
        }
        None => println!("{}", toml_content),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_config_generation() {
        let result = generate_default_config(None).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_config_validation() {
        let config = AlarmManagerConfig::default_config();
        let result = validate_configuration(&config).await;
        assert!(result.is_ok());
    }
}
