//! docquery CLI entry point.

use anyhow::Result;
use clap::Parser;
use docquery::cli::{commands, Cli, Commands};
use docquery::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli
        .config
        .as_ref()
        .map(|p| Settings::expand_path(p))
        .unwrap_or_else(Settings::default_config_path);
    let settings = Settings::load_from(Some(&config_path))?;

    // Initialize logging: -v flags win over the configured level
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("docquery={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    std::fs::create_dir_all(settings.temp_dir())?;

    // Execute command
    match &cli.command {
        Commands::Serve { host, port } => {
            commands::run_serve(host.clone(), *port, settings).await?;
        }

        Commands::Upload { file } => {
            commands::run_upload(file, settings).await?;
        }

        Commands::Ask {
            document_id,
            question,
            raw,
        } => {
            commands::run_ask(document_id, question, *raw, settings).await?;
        }

        Commands::Summarize { document_id, raw } => {
            commands::run_summarize(document_id, *raw, settings).await?;
        }

        Commands::Show { document_id, full } => {
            commands::run_show(document_id, *full, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, config_path.clone())?;
        }
    }

    Ok(())
}
