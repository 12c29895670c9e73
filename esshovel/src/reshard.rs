//! Reshard orchestration: export to a local spill file, verify the
//! copy, delete the live index, re-import with new shard/replica
//! settings, verify the count again.
//!
//! Round-tripping through a file instead of streaming index-to-index is
//! deliberate: a complete, durable copy is verified before anything is
//! destroyed, and the import step can be retried wholesale without
//! re-running the single-pass, non-restartable export.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};

use crate::client::EsClient;
use crate::error::{Error, Result};
use crate::export::export;
use crate::import::{import, ImportOptions};

pub struct ReshardOptions {
    /// Directory for the spill file (`{dir}/{index}.json`).
    pub dir: PathBuf,
    /// Keep the spill file after a successful reshard.
    pub keep_file: bool,
    /// Optional raw JSON search body restricting the export.
    pub query: Option<String>,
    /// Concurrent import workers.
    pub workers: usize,
    pub shards: Option<u32>,
    pub replicas: Option<u32>,
    /// How often a transient index-creation failure is retried.
    pub retry_limit: u32,
    /// Base backoff unit; retry k sleeps `k * retry_unit`. Exists so
    /// tests can shrink the backoff without changing its shape.
    pub retry_unit: Duration,
}

impl Default for ReshardOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            keep_file: true,
            query: None,
            workers: 100,
            shards: None,
            replicas: None,
            retry_limit: 10,
            retry_unit: Duration::from_secs(1),
        }
    }
}

/// Recreate `index` with new shard/replica settings while preserving
/// its documents. Fails loudly on any count mismatch rather than
/// silently losing data.
pub async fn reshard(client: &EsClient, index: &str, opts: &ReshardOptions) -> Result<()> {
    let path = opts.dir.join(format!("{index}.json"));

    let mut writer = BufWriter::new(File::create(&path).await?);
    let exported = export(client, index, opts.query.as_deref(), &mut writer).await?;
    writer.flush().await?;
    drop(writer);

    // The spill file is about to become the only copy of the data, so
    // it must be provably complete before the live index is deleted.
    let lines = count_lines(&path).await?;
    if lines != exported + 1 {
        return Err(Error::SpillCountMismatch {
            expected: exported,
            actual: lines.saturating_sub(1),
        });
    }

    client.delete_index(index).await?;

    let import_opts = ImportOptions {
        workers: opts.workers,
        skip_create: false,
        shards: opts.shards,
        replicas: opts.replicas,
        total_hint: exported,
    };

    let mut attempt = 0u32;
    let imported = loop {
        attempt += 1;
        let reader = BufReader::new(File::open(&path).await?);
        match import(client, index, &import_opts, reader).await {
            Ok(imported) => break imported,
            Err(Error::TemporaryFailure) if attempt <= opts.retry_limit => {
                // Index-creation races do happen when the cluster is
                // busy and index auto-creation is turned on. The whole
                // import step is safe to redo: document writes are
                // idempotent upserts by id.
                tracing::warn!(
                    "temporary failure creating index, retrying ({attempt}/{})",
                    opts.retry_limit
                );
                tokio::time::sleep(opts.retry_unit * attempt).await;
            }
            Err(Error::TemporaryFailure) => {
                return Err(Error::RetriesExhausted { attempts: attempt })
            }
            Err(e) => return Err(e),
        }
    };

    if imported != exported {
        return Err(Error::CountMismatch { exported, imported });
    }

    if !opts.keep_file {
        tokio::fs::remove_file(&path).await?;
    }
    tracing::info!("resharding complete");
    Ok(())
}

async fn count_lines(path: &Path) -> Result<u64> {
    let mut file = File::open(path).await?;
    let mut buf = vec![0u8; 32 * 1024];
    let mut count = 0u64;
    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            return Ok(count);
        }
        count += buf[..read].iter().filter(|b| **b == b'\n').count() as u64;
    }
}
