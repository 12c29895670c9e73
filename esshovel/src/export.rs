//! Scroll-based index export.
//!
//! Output format (newline-delimited JSON): line 1 is the index mapping,
//! every following line is one hit envelope exactly as the search API
//! returned it, byte for byte. The line count minus one is the document
//! count, which the reshard orchestrator uses as a cross-check before
//! it deletes anything.

use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::client::EsClient;
use crate::error::{Error, Result};
use crate::progress::TransferProgress;

#[derive(Deserialize)]
struct ScrollPage<'a> {
    #[serde(rename = "_scroll_id")]
    scroll_id: Option<String>,
    #[serde(borrow)]
    hits: Option<PageHits<'a>>,
}

#[derive(Deserialize)]
struct PageHits<'a> {
    total: Option<Value>,
    #[serde(borrow)]
    hits: Option<&'a RawValue>,
}

/// Stream every document of `index` to `writer`, returning the number
/// of documents written.
///
/// Termination is driven solely by an empty hits page; the total count
/// reported by the server is only a progress hint since it can be
/// approximate or stale on some backends. A missing scroll id or a
/// malformed hits field aborts the export: scroll state is too fragile
/// to resume blindly.
pub async fn export<W>(
    client: &EsClient,
    index: &str,
    query: Option<&str>,
    writer: &mut W,
) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    tracing::info!("exporting index {}{}", client.base(), index);

    let mapping = client.fetch_mapping(index).await?;
    write_line(writer, &mapping.to_string()).await?;

    let mut body = client.search_scroll(index, query).await?;
    let mut progress: Option<TransferProgress> = None;
    let mut exported = 0u64;

    loop {
        let page: ScrollPage = serde_json::from_str(&body)?;
        let scroll_id = page.scroll_id.ok_or(Error::MissingScrollId)?;

        let hits_raw = page
            .hits
            .as_ref()
            .and_then(|h| h.hits)
            .ok_or(Error::MalformedHits)?;
        let hits: Vec<&RawValue> =
            serde_json::from_str(hits_raw.get()).map_err(|_| Error::MalformedHits)?;

        if progress.is_none() {
            let total = page.hits.as_ref().and_then(|h| h.total.as_ref());
            progress = Some(TransferProgress::with_total(total_hits(total)));
        }

        if hits.is_empty() {
            break;
        }

        for hit in &hits {
            let line = hit.get();
            write_line(writer, line).await?;
            exported += 1;
            if let Some(progress) = &progress {
                progress.add(line.len() as u64);
            }
        }

        body = client.continue_scroll(&scroll_id).await?;
    }

    writer.flush().await?;
    if let Some(progress) = &progress {
        progress.finish();
    }
    tracing::info!("export complete: {} documents", exported);
    Ok(exported)
}

async fn write_line<W>(writer: &mut W, line: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    Ok(())
}

/// Total hit count from the first page, handling both the bare-number
/// form and the newer `{"value": n, "relation": ...}` form.
fn total_hits(total: Option<&Value>) -> u64 {
    match total {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::Object(obj)) => obj.get("value").and_then(Value::as_u64).unwrap_or(0),
        _ => 0,
    }
}
