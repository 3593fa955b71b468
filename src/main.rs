use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Use the library instead of redeclaring modules
use iptv_aggregator::{
    assembler::AssemblyOutcome,
    config::Config,
    filter::MatchMode,
    pipeline::Aggregator,
};

#[derive(Parser)]
#[command(name = "iptv-aggregator")]
#[command(version = "0.1.0")]
#[command(about = "Aggregates, filters and liveness-checks IPTV channel playlists")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Output directory (overrides config file)
    #[arg(short, long, value_name = "DIR")]
    output: Option<String>,

    /// Channel matching mode: exact or substring (overrides config file)
    #[arg(short, long, value_name = "MODE")]
    match_mode: Option<String>,

    /// Per-probe timeout in seconds (overrides config file)
    #[arg(short = 't', long, value_name = "SECS")]
    probe_timeout: Option<u64>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with specified level
    let log_filter = format!("iptv_aggregator={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting IPTV aggregator v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Load configuration from specified file
    std::env::set_var("CONFIG_FILE", &cli.config);
    let mut config = Config::load()?;
    info!("Configuration loaded from: {}", cli.config);

    // Override config with CLI arguments
    if let Some(output) = cli.output {
        config.output.directory = output.into();
    }
    if let Some(mode) = cli.match_mode {
        config.channels.match_mode = match mode.as_str() {
            "exact" => MatchMode::Exact,
            "substring" => MatchMode::Substring,
            other => anyhow::bail!("Unknown match mode: {other} (expected exact or substring)"),
        };
    }
    if let Some(timeout) = cli.probe_timeout {
        config.probe.timeout_secs = timeout;
    }

    let sources = Aggregator::sources_from_config(&config)?;
    let aggregator = Aggregator::from_config(&config);
    let result = aggregator.run(&sources).await?;

    match result.assembly {
        AssemblyOutcome::Empty => {
            warn!("No working channels found; nothing written");
        }
        AssemblyOutcome::Documents(documents) => {
            std::fs::create_dir_all(&config.output.directory)?;
            for document in &documents {
                let path = config.output.directory.join(&document.filename);
                std::fs::write(&path, document.render())?;
                info!(
                    "Wrote {} ({} channels)",
                    path.display(),
                    document.entries.len()
                );
            }
            info!("Wrote {} playlist document(s)", documents.len());
        }
    }

    Ok(())
}
