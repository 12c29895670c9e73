use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "esshovel")]
#[command(about = "Bulk export/import and reshard tool for Elasticsearch indices")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dump an entire index to STDOUT (mapping first, then one document per line)
    Export {
        /// Index to export
        index: String,

        /// Elasticsearch host (host:port or full URL)
        #[arg(long, default_value = "localhost:9200")]
        host: String,

        /// Raw JSON search body restricting the export (defaults to match-all)
        #[arg(long)]
        search: Option<String>,
    },

    /// Write documents from STDIN into an index
    Import {
        /// Index to import into
        index: String,

        /// Elasticsearch host (host:port or full URL)
        #[arg(long, default_value = "localhost:9200")]
        host: String,

        /// Number of concurrent workers
        #[arg(short, long, default_value_t = 100)]
        workers: usize,

        /// Override the number of shards on index creation
        #[arg(short, long)]
        shards: Option<u32>,

        /// Override the number of replicas on index creation
        #[arg(short, long)]
        replicas: Option<u32>,

        /// Do not create the index, write into it as-is
        #[arg(long)]
        no_create: bool,
    },

    /// Recreate an index with different shard/replica settings, preserving its documents
    Reshard {
        /// Index to reshard
        index: String,

        /// Elasticsearch host (host:port or full URL)
        #[arg(long, default_value = "localhost:9200")]
        host: String,

        /// Raw JSON search body restricting the export (defaults to match-all)
        #[arg(long)]
        search: Option<String>,

        /// Directory for the spill file (defaults to the current directory)
        #[arg(long)]
        dir: Option<String>,

        /// Delete the spill file after a successful reshard
        #[arg(long)]
        no_keep: bool,

        /// Number of concurrent workers
        #[arg(short, long, default_value_t = 100)]
        workers: usize,

        /// Override the number of shards on index creation
        #[arg(short, long)]
        shards: Option<u32>,

        /// Override the number of replicas on index creation
        #[arg(short, long)]
        replicas: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            index,
            host,
            search,
        } => commands::run_export(&host, &index, search.as_deref()).await,
        Commands::Import {
            index,
            host,
            workers,
            shards,
            replicas,
            no_create,
        } => commands::run_import(&host, &index, workers, shards, replicas, no_create).await,
        Commands::Reshard {
            index,
            host,
            search,
            dir,
            no_keep,
            workers,
            shards,
            replicas,
        } => {
            commands::run_reshard(
                &host, &index, search, dir, no_keep, workers, shards, replicas,
            )
            .await
        }
    }
}
