use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use marketing_agent::config::{AppConfig, CliArgs, Command, EnvOverrides};
use marketing_agent::db::{ConnectionSettings, PgConnectionProvider};
use marketing_agent::ingest::csv::CsvLoader;
use marketing_agent::ingest::sample::{self, SampleGenerator, SampleSizes};
use marketing_agent::llm::backend_from_config;
use marketing_agent::util::logging::init_tracing;
use marketing_agent::web::{self, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Ok(path) = dotenvy::dotenv() {
        eprintln!("Loaded environment from {}", path.display());
    }

    let args = CliArgs::parse();
    let config = AppConfig::new(&args, &EnvOverrides::from_process())
        .context("Failed to load configuration")?;
    init_tracing(&config.log);

    match args.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::GenerateSample {
            out_dir,
            customers,
            items,
            orders,
            seed,
        } => {
            let sizes = SampleSizes {
                customers,
                items,
                orders,
            };
            let now = chrono::Local::now().naive_local();
            let dataset = SampleGenerator::new(seed, now).generate(sizes);
            sample::write_dataset(&out_dir, &dataset)
                .with_context(|| format!("Failed to write sample data to {}", out_dir.display()))?;
            println!(
                "Generated {} customers, {} items and {} orders in {}",
                dataset.customers.len(),
                dataset.items.len(),
                dataset.orders.len(),
                out_dir.display()
            );
            Ok(())
        }
        Command::Import { data_dir } => {
            let settings = ConnectionSettings::from_url(&config.database.url)?;
            let loader = CsvLoader::new(PgConnectionProvider::new(settings));
            let report = loader
                .import_dir(&data_dir)
                .await
                .with_context(|| format!("Failed to import CSV files from {}", data_dir.display()))?;

            println!("Import complete:");
            for (table, count) in report.tables {
                println!("  {table}: {count} records");
            }
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let settings = ConnectionSettings::from_url(&config.database.url)?;
    info!("Database: {}", settings);
    let connections = Arc::new(
        PgConnectionProvider::new(settings).with_read_only(config.pipeline.read_only_guard),
    );

    info!("Initializing LLM backend: {}", config.llm.backend);
    let model = backend_from_config(&config.llm)?;

    let web_config = config.web.clone();
    let app_state = Arc::new(AppState::new(config, model, connections)?);

    info!("Starting Marketing Analysis API on {}:{}", web_config.host, web_config.port);
    if let Err(e) = web::run_server(&web_config, app_state).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server stopped gracefully");
    Ok(())
}
