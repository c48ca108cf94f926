use anyhow::Context;
use clap::Parser;
use hemnet_sold::scrapers::types::{CONFIG_FILE_NAME, DEFAULT_REGION_ID};
use hemnet_sold::scrapers::{ChromeSession, CrawlConfig};
use hemnet_sold::{storage, Crawler};
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Collect sold properties for one Hemnet region into a Parquet file
#[derive(Parser, Debug)]
#[command(name = "hemnet-sold", version, about, long_about = None)]
struct Cli {
    /// Location id of the region to crawl
    #[arg(value_name = "REGION_ID", default_value = DEFAULT_REGION_ID)]
    region_id: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hemnet_sold=info,warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = CrawlConfig::load_or_default(Path::new(CONFIG_FILE_NAME))?;
    info!("🏠 Hemnet sold-property crawl for region {}", cli.region_id);

    let output_path = config.output_path.clone();
    let records = tokio::task::spawn_blocking(move || {
        let session = ChromeSession::launch(&config.coordinate_url_marker)?;
        Crawler::new(session, &config).run(&cli.region_id)
    })
    .await
    .context("Crawl task panicked")??;

    let written = tokio::task::spawn_blocking(move || storage::save(&records, &output_path))
        .await
        .context("Persist task panicked")??;
    info!("💾 Wrote {} property records", written);

    Ok(())
}
