//! Concurrent index import.
//!
//! Reads the spill format (mapping line followed by hit envelopes) and
//! writes documents through a fixed pool of worker tasks. Individual
//! document failures are logged and skipped, never fatal; the resulting
//! undercount is caught by the caller's end-to-end count verification.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use crate::client::EsClient;
use crate::error::{Error, Result};
use crate::mapping;
use crate::progress::TransferProgress;

pub struct ImportOptions {
    /// Number of concurrent document writers.
    pub workers: usize,
    /// Skip index creation and write into an existing index.
    pub skip_create: bool,
    /// Override `number_of_shards` on creation.
    pub shards: Option<u32>,
    /// Override `number_of_replicas` on creation (0 is valid).
    pub replicas: Option<u32>,
    /// Expected document count, used only to seed the progress meter.
    pub total_hint: u64,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            workers: 100,
            skip_create: false,
            shards: None,
            replicas: None,
            total_hint: 0,
        }
    }
}

/// Import documents from `reader` into `index`, returning the number of
/// documents actually written.
///
/// The first input line must be the mapping document. Unless
/// `skip_create` is set, the index is created from it after stripping
/// server-generated settings and applying the shard/replica overrides;
/// a 400/503 answer on that create surfaces as
/// [`Error::TemporaryFailure`] and is the only error the reshard
/// orchestrator retries.
pub async fn import<R>(
    client: &EsClient,
    index: &str,
    opts: &ImportOptions,
    reader: R,
) -> Result<u64>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    tracing::info!("importing index {}{}", client.base(), index);

    let mut lines = reader.lines();
    let mapping_line = lines
        .next_line()
        .await?
        .ok_or(Error::MissingMappingLine)?;

    if !opts.skip_create {
        let mapping: Value = serde_json::from_str(&mapping_line)?;
        let mapping = mapping::prepare_for_create(mapping, opts.shards, opts.replicas);
        client.create_index(index, &mapping).await?;
    }

    let progress = Arc::new(if opts.total_hint > 0 {
        TransferProgress::with_total(opts.total_hint)
    } else {
        TransferProgress::new()
    });
    let imported = Arc::new(AtomicU64::new(0));

    // Bounded channel: a slow worker pool blocks the feeder rather than
    // buffering the whole input in memory. Dropping the sender is the
    // close signal; workers drain until recv returns None and are then
    // joined (close-then-join, no sentinel records).
    let workers = opts.workers.max(1);
    let (tx, rx) = mpsc::channel::<String>(workers);
    let rx = Arc::new(Mutex::new(rx));

    let mut pool = JoinSet::new();
    for _ in 0..workers {
        let rx = Arc::clone(&rx);
        let client = client.clone();
        let index = index.to_string();
        let progress = Arc::clone(&progress);
        let imported = Arc::clone(&imported);
        pool.spawn(async move {
            loop {
                let record = rx.lock().await.recv().await;
                match record {
                    Some(line) => put_record(&client, &index, &line, &progress, &imported).await,
                    None => break,
                }
            }
        });
    }

    drop(rx);

    let feeder = tokio::spawn(feed(lines, tx));

    while let Some(joined) = pool.join_next().await {
        if let Err(e) = joined {
            tracing::error!("import worker failed: {e}");
        }
    }
    progress.finish();

    // A read error on the input is structural, unlike per-document
    // write failures.
    match feeder.await {
        Ok(result) => result?,
        Err(e) => tracing::error!("import feeder failed: {e}"),
    }

    Ok(imported.load(Ordering::Relaxed))
}

async fn feed<R>(mut lines: Lines<R>, tx: mpsc::Sender<String>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    while let Some(line) = lines.next_line().await? {
        if tx.send(line).await.is_err() {
            break;
        }
    }
    Ok(())
}

/// The three envelope fields a record is written from; everything else
/// in the envelope is ignored, and the source span is passed through
/// byte for byte.
#[derive(Deserialize)]
struct SpillRecord<'a> {
    #[serde(rename = "_id")]
    id: Option<String>,
    #[serde(rename = "_type")]
    doc_type: Option<String>,
    #[serde(rename = "_source", borrow)]
    source: Option<&'a RawValue>,
}

/// Write one spill record. Any failure here is logged and skipped:
/// the job keeps going and the record is simply not counted.
async fn put_record(
    client: &EsClient,
    index: &str,
    line: &str,
    progress: &TransferProgress,
    imported: &AtomicU64,
) {
    let record: SpillRecord = match serde_json::from_str(line) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!("skipping unparseable record: {e}");
            return;
        }
    };

    let (Some(id), Some(doc_type), Some(source)) = (record.id, record.doc_type, record.source)
    else {
        tracing::warn!("skipping record without _id/_type/_source");
        return;
    };

    let body = source.get().to_string();
    let size = body.len() as u64;
    match client.put_document(index, &doc_type, &id, body).await {
        Ok(status) if status == reqwest::StatusCode::OK || status == reqwest::StatusCode::CREATED => {
            imported.fetch_add(1, Ordering::Relaxed);
            progress.add(size);
        }
        Ok(status) => {
            tracing::warn!("PUT {index}/{doc_type}/{id} returned unexpected response: {status}");
        }
        Err(e) => {
            tracing::warn!("PUT {index}/{doc_type}/{id} failed: {e}");
        }
    }
}
