//! Import command implementation.

use anyhow::Result;
use esshovel::{EsClient, ImportOptions};
use tokio::io::BufReader;

/// Run the import command, reading the spill format from stdin.
pub async fn run_import(
    host: &str,
    index: &str,
    workers: usize,
    shards: Option<u32>,
    replicas: Option<u32>,
    no_create: bool,
) -> Result<()> {
    let client = EsClient::new(host, workers)?;
    let opts = ImportOptions {
        workers,
        skip_create: no_create,
        shards,
        replicas,
        total_hint: 0,
    };

    let reader = BufReader::new(tokio::io::stdin());
    let imported = esshovel::import(&client, index, &opts, reader).await?;
    tracing::info!("imported {} documents", imported);

    Ok(())
}
