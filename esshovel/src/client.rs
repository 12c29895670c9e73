//! Thin Elasticsearch HTTP client.
//!
//! All wire details of the consumed surface live here; the exporter,
//! importer and orchestrator are built on top of it. The client is
//! explicit configuration: tests construct one against a stub server
//! instead of a live cluster.

use reqwest::StatusCode;
use serde_json::{json, Value};
use url::Url;

use crate::error::{Error, Result};

/// Scroll page size for the initial search request.
pub const PAGE_SIZE: u32 = 10_000;

/// How long the server keeps a scroll window alive between pages.
pub const SCROLL_WINDOW: &str = "1m";

#[derive(Clone)]
pub struct EsClient {
    http: reqwest::Client,
    base: Url,
}

impl EsClient {
    /// Build a client for `host` (with or without a scheme; plain
    /// `host:port` defaults to http). `pool_size` sizes the per-host
    /// idle-connection pool and should be at least the number of
    /// concurrent import workers to avoid connection churn.
    pub fn new(host: &str, pool_size: usize) -> Result<Self> {
        let base = if host.contains("://") {
            Url::parse(host)?
        } else {
            Url::parse(&format!("http://{host}"))?
        };
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(pool_size.max(1))
            .build()?;
        Ok(Self { http, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // The base was parsed from an authority-only host string, so
        // path_segments_mut cannot fail here.
        url.path_segments_mut()
            .expect("base URL can be a base")
            .extend(segments);
        url
    }

    /// Fetch index metadata and return the mapping document, i.e. the
    /// value keyed by the index name in the response.
    pub async fn fetch_mapping(&self, index: &str) -> Result<Value> {
        let resp = self.http.get(self.url(&[index])).send().await?;
        if !resp.status().is_success() {
            return Err(Error::UnexpectedStatus {
                op: "mapping fetch",
                status: resp.status().as_u16(),
            });
        }
        let mut body: Value = resp.json().await?;
        body.get_mut(index)
            .map(Value::take)
            .ok_or_else(|| Error::MappingNotFound(index.to_string()))
    }

    /// Create `index` with the given mapping document. A 400 or 503
    /// answer is the transient failure signal (index-already-exists
    /// race, or cluster overload); any other non-2xx is fatal.
    pub async fn create_index(&self, index: &str, mapping: &Value) -> Result<()> {
        let resp = self
            .http
            .put(self.url(&[index]))
            .json(mapping)
            .send()
            .await?;
        match resp.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(()),
            StatusCode::BAD_REQUEST | StatusCode::SERVICE_UNAVAILABLE => {
                Err(Error::TemporaryFailure)
            }
            status => Err(Error::UnexpectedStatus {
                op: "index creation",
                status: status.as_u16(),
            }),
        }
    }

    pub async fn delete_index(&self, index: &str) -> Result<()> {
        let resp = self.http.delete(self.url(&[index])).send().await?;
        match resp.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(()),
            status => Err(Error::UnexpectedStatus {
                op: "index deletion",
                status: status.as_u16(),
            }),
        }
    }

    /// Open a scroll over `index` and return the first page as the raw
    /// response body, so hit envelopes can be passed through byte for
    /// byte. `query` is an optional raw JSON search body; the server
    /// defaults to match-all without one.
    pub async fn search_scroll(&self, index: &str, query: Option<&str>) -> Result<String> {
        let mut url = self.url(&[index, "_search"]);
        url.query_pairs_mut()
            .append_pair("size", &PAGE_SIZE.to_string())
            .append_pair("scroll", SCROLL_WINDOW);
        let mut req = self.http.post(url);
        if let Some(query) = query {
            req = req
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(query.to_string());
        }
        Ok(req.send().await?.text().await?)
    }

    /// Continue a scroll, keeping the window alive. Returns the raw
    /// response body like [`Self::search_scroll`].
    pub async fn continue_scroll(&self, scroll_id: &str) -> Result<String> {
        let body = json!({ "scroll": SCROLL_WINDOW, "scroll_id": scroll_id });
        let resp = self
            .http
            .post(self.url(&["_search", "scroll"]))
            .json(&body)
            .send()
            .await?;
        Ok(resp.text().await?)
    }

    /// Upsert a single document from its already-serialized source.
    /// Returns the response status; transport errors bubble up as
    /// `Error::Http` for the caller to classify.
    pub async fn put_document(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        source: String,
    ) -> Result<StatusCode> {
        let resp = self
            .http
            .put(self.url(&[index, doc_type, id]))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(source)
            .send()
            .await?;
        Ok(resp.status())
    }
}
