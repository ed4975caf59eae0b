use std::io::Write;
use std::path::Path;

use clap::Parser;
use fines_cache::{DatasetCache, DatasetStatus, GetOptions, Period};
use tracing::{Level, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod cli;
mod config;
mod error;
mod utils;

use cli::{CliArgs, Command};
use config::AppConfig;
use error::AppError;
use utils::{format_bytes, format_duration};

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    let args = CliArgs::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    // stdout may carry the dataset itself
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    let mut app_config = AppConfig::load(args.config.as_deref())?;
    if let Some(cache_dir) = args.cache_dir {
        app_config.cache_dir = cache_dir;
    }
    if let Some(index_url) = args.index_url {
        app_config.index_url = index_url;
    }
    if let Some(max_age) = args.max_age {
        app_config.dataset_max_age = max_age;
    }

    let fines_config = app_config.to_fines_config()?;
    info!(
        cache_dir = %fines_config.cache_dir.display(),
        max_age = %format_duration(fines_config.dataset_max_age),
        "Using dataset cache"
    );
    let cache = DatasetCache::from_config(&fines_config)?;

    match args.command {
        Command::Fetch {
            output,
            force_refresh,
            period,
        } => {
            let options = options_for(period.as_deref())?.force_refresh(force_refresh);
            fetch(&cache, &options, output.as_deref()).await
        }
        Command::Links => {
            for link in cache.candidate_links().await? {
                println!("{}\t{}", link.label, link.url);
            }
            for entry in cache.resolver().period_links(cache.index_url()).await? {
                println!("{}\t{}", entry.period, entry.link.url);
            }
            Ok(())
        }
        Command::Info { period } => {
            let options = options_for(period.as_deref())?;
            match cache.cached(&options).await? {
                Some(entry) => {
                    let age = entry.age();
                    let freshness = if cache.policy().is_fresh(&entry) {
                        "fresh"
                    } else {
                        "stale"
                    };
                    println!("key:      {}", entry.key);
                    println!("source:   {}", entry.source_url);
                    println!("stored:   {}", entry.stored_at.to_rfc3339());
                    println!("age:      {} ({freshness})", format_duration(age));
                    println!("size:     {}", format_bytes(entry.payload.len() as u64));
                }
                None => println!("{} is not cached", cache.dataset_key(&options)),
            }
            Ok(())
        }
        Command::Clear => {
            cache.clear().await?;
            Ok(())
        }
    }
}

fn options_for(period: Option<&str>) -> Result<GetOptions, AppError> {
    let mut options = GetOptions::default();
    if let Some(period) = period {
        options = options.period(period.parse::<Period>()?);
    }
    Ok(options)
}

async fn fetch(
    cache: &DatasetCache,
    options: &GetOptions,
    output: Option<&Path>,
) -> Result<(), AppError> {
    let dataset = cache.get_dataset(options).await?;

    match dataset.status {
        DatasetStatus::Cached => info!(source = %dataset.source_url, "Using cached dataset"),
        DatasetStatus::Fetched => info!(source = %dataset.source_url, "Downloaded dataset"),
        DatasetStatus::StaleFallback => warn!(
            source = %dataset.source_url,
            stored_at = %dataset.stored_at.to_rfc3339(),
            "Portal unreachable, data may be outdated"
        ),
    }

    match output {
        Some(path) => {
            tokio::fs::write(path, &dataset.payload).await?;
            info!(
                path = %path.display(),
                size = %format_bytes(dataset.payload.len() as u64),
                "Dataset written"
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&dataset.payload)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
