//! Reshard command implementation.

use anyhow::Result;
use esshovel::{EsClient, ReshardOptions};
use std::path::PathBuf;

/// Run the reshard command: export, verify, delete, re-import, verify.
#[allow(clippy::too_many_arguments)]
pub async fn run_reshard(
    host: &str,
    index: &str,
    search: Option<String>,
    dir: Option<String>,
    no_keep: bool,
    workers: usize,
    shards: Option<u32>,
    replicas: Option<u32>,
) -> Result<()> {
    let client = EsClient::new(host, workers)?;

    let dir = match dir {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };

    let opts = ReshardOptions {
        dir,
        keep_file: !no_keep,
        query: search,
        workers,
        shards,
        replicas,
        ..ReshardOptions::default()
    };

    esshovel::reshard(&client, index, &opts).await?;

    Ok(())
}
