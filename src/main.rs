use clap::{Parser, Subcommand};
use inventory_dashboard::models::{CatalogRecord, Schema, StockFlowRecord};
use inventory_dashboard::{AppConfig, AppResult, DashboardService, ElasticClient, IngestService};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

/// 库存 CSV -> Elasticsearch -> 静态看板
#[derive(Debug, Parser)]
#[command(name = "inventory-dashboard", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load the CSV file into the inventory index
    Ingest {
        /// Overrides INVENTORY_CSV_PATH
        #[arg(long)]
        file: Option<PathBuf>,
        /// Overrides INVENTORY_CSV_ENCODING (utf-8, latin1, ...)
        #[arg(long)]
        encoding: Option<String>,
    },
    /// Query the index and render the chart and index.html
    Dashboard {
        /// Overrides INVENTORY_OUTPUT_DIR
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Overrides INVENTORY_TOP_N
        #[arg(long)]
        top: Option<usize>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // 初始化日志 - 本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    // 加载配置 (缺失项在联网前一次性报出)
    let mut config = AppConfig::from_env()?;
    info!("Loaded config: {:?}", config);

    let client = ElasticClient::new(&config.store)?;
    info!("Using Elasticsearch at {}", client.base_url());

    match cli.command {
        Command::Ingest { file, encoding } => {
            if let Some(file) = file {
                config.ingest.csv_path = file;
            }
            if let Some(encoding) = encoding {
                config.ingest.encoding = encoding;
            }

            let service = IngestService::new(client, &config.store.index, config.store.bulk_chunk_size);
            let path = &config.ingest.csv_path;
            let summary = match config.schema {
                Schema::StockFlow => service.load_csv::<StockFlowRecord>(path, &config.ingest.encoding).await?,
                Schema::Catalog => service.load_csv::<CatalogRecord>(path, &config.ingest.encoding).await?,
            };

            if summary.rows_written > 0 {
                println!("Loaded {} rows into index '{}'", summary.rows_written, config.store.index);
            } else {
                println!("CSV was empty, nothing loaded");
            }
        }
        Command::Dashboard { output_dir, top } => {
            if let Some(dir) = output_dir {
                config.dashboard.output_dir = dir;
            }
            if let Some(top) = top {
                config.dashboard.top_n = top;
            }

            let source_name = config
                .ingest
                .csv_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| config.ingest.csv_path.display().to_string());

            let service = DashboardService::new(client, &config.store.index, config.dashboard.clone());
            let summary = match config.schema {
                Schema::StockFlow => service.build::<StockFlowRecord>(&source_name).await?,
                Schema::Catalog => service.build::<CatalogRecord>(&source_name).await?,
            };

            if summary.documents == 0 {
                println!("Index '{}' was empty", config.store.index);
            }
            println!(
                "Wrote {} and {} ({} materials ranked)",
                summary.html_path.display(),
                summary.chart_path.display(),
                summary.ranked.len()
            );
        }
    }

    Ok(())
}
