use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use m3u_harvest::{
    cache::ProbeCache,
    config::Config,
    logging::init_logging,
    pipeline::Pipeline,
    reporting::{collect_file_stats, format_file_stats, log_summary},
    utils::{HttpClient, StandardHttpClient},
};

#[derive(Parser)]
#[command(name = "m3u-harvest")]
#[command(version)]
#[command(about = "Aggregate, validate and republish live stream sources")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Result file path (overrides config file)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Skip reachability probing for this run
    #[arg(long)]
    no_validate: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    show_config: bool,

    /// Print statistics about input and output files and exit
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_from_file(&cli.config)?;
    if let Some(output) = cli.output {
        config.output.path = output;
    }
    if cli.no_validate {
        config.validation.enabled = false;
    }

    if cli.show_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let _guard = init_logging(&cli.log_level, config.logging.directory.as_deref())?;

    if cli.stats {
        print!("{}", format_file_stats(&collect_file_stats(&cli.config, &config)));
        return Ok(());
    }

    info!("Starting m3u-harvest v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", cli.config.display());

    let client: Arc<dyn HttpClient> = Arc::new(StandardHttpClient::new(&config.http)?);

    let mut cache = if config.cache.enabled {
        Some(ProbeCache::load(&config.cache.path, config.cache.ttl).await)
    } else {
        None
    };

    let pipeline = Pipeline::new(config.clone(), client);
    let run = tokio::select! {
        result = pipeline.run(cache.as_mut()) => result?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, no output written");
            anyhow::bail!("run interrupted");
        }
    };

    run.write(&config.output).await?;

    if let Some(cache) = &cache {
        if let Err(e) = cache.save(&config.cache.path).await {
            warn!("Failed to save probe cache: {}", e);
        }
    }

    log_summary(&run.stats);
    Ok(())
}
