//! In-process Elasticsearch stub covering the HTTP surface the engine
//! consumes: index metadata, create/delete, scroll search and document
//! upserts. State knobs let tests script failures (create status
//! sequences, dropped scroll ids, malformed hits, rejected writes).

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

type Shared = Arc<Mutex<StubState>>;

#[derive(Default, Clone)]
pub struct StubIndex {
    pub mapping: Value,
    /// Documents keyed by (type, id).
    pub docs: BTreeMap<(String, String), Value>,
}

#[derive(Default)]
pub struct StubState {
    pub indices: HashMap<String, StubIndex>,
    scrolls: HashMap<String, VecDeque<Vec<Value>>>,
    next_scroll: u64,

    // Call counters.
    pub create_calls: u64,
    pub delete_calls: u64,
    pub scroll_calls: u64,
    pub last_search_body: Option<String>,
    /// Raw bytes of the most recent document PUT, before parsing.
    pub last_put_body: Option<String>,

    // Failure knobs.
    /// Statuses to answer the next create calls with, before behaving
    /// normally again.
    pub create_script: VecDeque<u16>,
    /// Answer every create call with this status.
    pub always_create_status: Option<u16>,
    /// Leave `_scroll_id` out of search responses.
    pub omit_scroll_id: bool,
    /// Answer searches with a non-array `hits.hits`.
    pub corrupt_hits: bool,
    /// Report this total instead of the real document count.
    pub total_override: Option<u64>,
    /// Reject this many document PUTs with a 500 before accepting again.
    pub fail_puts: u64,
    /// Answer the next search with these exact bytes instead of the
    /// generated page.
    pub search_response_override: Option<String>,
}

pub struct StubEs {
    state: Shared,
    addr: SocketAddr,
}

impl StubEs {
    pub async fn start() -> Self {
        let state: Shared = Arc::default();
        let app = Router::new()
            .route("/_search/scroll", post(continue_scroll))
            .route(
                "/:index",
                get(get_index).put(create_index).delete(delete_index),
            )
            .route("/:index/_search", post(search))
            .route("/:index/:doc_type/:id", put(put_doc))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { state, addr }
    }

    pub fn host(&self) -> String {
        format!("127.0.0.1:{}", self.addr.port())
    }

    pub fn seed(&self, name: &str, mapping: Value, docs: Vec<(String, String, Value)>) {
        let mut state = self.state.lock().unwrap();
        let index = StubIndex {
            mapping,
            docs: docs
                .into_iter()
                .map(|(doc_type, id, source)| ((doc_type, id), source))
                .collect(),
        };
        state.indices.insert(name.to_string(), index);
    }

    pub fn configure<F: FnOnce(&mut StubState)>(&self, f: F) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn index(&self, name: &str) -> Option<StubIndex> {
        self.state.lock().unwrap().indices.get(name).cloned()
    }

    pub fn doc_count(&self, name: &str) -> u64 {
        self.index(name).map(|i| i.docs.len() as u64).unwrap_or(0)
    }

    pub fn create_calls(&self) -> u64 {
        self.state.lock().unwrap().create_calls
    }

    pub fn delete_calls(&self) -> u64 {
        self.state.lock().unwrap().delete_calls
    }

    pub fn scroll_calls(&self) -> u64 {
        self.state.lock().unwrap().scroll_calls
    }

    pub fn last_search_body(&self) -> Option<String> {
        self.state.lock().unwrap().last_search_body.clone()
    }

    pub fn last_put_body(&self) -> Option<String> {
        self.state.lock().unwrap().last_put_body.clone()
    }
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn status_from(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn get_index(State(state): State<Shared>, Path(index): Path<String>) -> Response {
    let state = state.lock().unwrap();
    match state.indices.get(&index) {
        Some(idx) => {
            let mut body = serde_json::Map::new();
            body.insert(index.clone(), idx.mapping.clone());
            reply(StatusCode::OK, Value::Object(body))
        }
        None => reply(
            StatusCode::NOT_FOUND,
            json!({ "error": "index_not_found_exception" }),
        ),
    }
}

async fn create_index(
    State(state): State<Shared>,
    Path(index): Path<String>,
    body: String,
) -> Response {
    let mut state = state.lock().unwrap();
    state.create_calls += 1;

    if let Some(code) = state.always_create_status {
        return reply(status_from(code), json!({ "error": "scripted" }));
    }
    if let Some(code) = state.create_script.pop_front() {
        return reply(status_from(code), json!({ "error": "scripted" }));
    }
    if state.indices.contains_key(&index) {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({ "error": "resource_already_exists_exception" }),
        );
    }

    let mapping: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    state.indices.insert(
        index,
        StubIndex {
            mapping,
            docs: BTreeMap::new(),
        },
    );
    reply(StatusCode::OK, json!({ "acknowledged": true }))
}

async fn delete_index(State(state): State<Shared>, Path(index): Path<String>) -> Response {
    let mut state = state.lock().unwrap();
    state.delete_calls += 1;
    match state.indices.remove(&index) {
        Some(_) => reply(StatusCode::OK, json!({ "acknowledged": true })),
        None => reply(
            StatusCode::NOT_FOUND,
            json!({ "error": "index_not_found_exception" }),
        ),
    }
}

async fn search(
    State(state): State<Shared>,
    Path(index): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    let mut state = state.lock().unwrap();
    state.last_search_body = (!body.is_empty()).then_some(body);

    if let Some(raw) = state.search_response_override.take() {
        return (
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            raw,
        )
            .into_response();
    }

    let Some(idx) = state.indices.get(&index) else {
        return reply(
            StatusCode::NOT_FOUND,
            json!({ "error": "index_not_found_exception" }),
        );
    };

    let size: usize = params
        .get("size")
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);

    let envelopes: Vec<Value> = idx
        .docs
        .iter()
        .map(|((doc_type, id), source)| {
            json!({
                "_index": index,
                "_type": doc_type,
                "_id": id,
                "_score": 1.0,
                "_source": source,
            })
        })
        .collect();
    let total = state.total_override.unwrap_or(envelopes.len() as u64);

    let mut pages: VecDeque<Vec<Value>> = envelopes
        .chunks(size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect();
    let first = pages.pop_front().unwrap_or_default();

    state.next_scroll += 1;
    let scroll_id = format!("scroll-{}", state.next_scroll);
    state.scrolls.insert(scroll_id.clone(), pages);

    page_response(&state, Some(&scroll_id), total, first)
}

async fn continue_scroll(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    state.scroll_calls += 1;

    let scroll_id = body
        .get("scroll_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let page = state
        .scrolls
        .get_mut(&scroll_id)
        .and_then(VecDeque::pop_front)
        .unwrap_or_default();

    page_response(&state, Some(&scroll_id), 0, page)
}

fn page_response(
    state: &StubState,
    scroll_id: Option<&str>,
    total: u64,
    hits: Vec<Value>,
) -> Response {
    let hits_value = if state.corrupt_hits {
        json!("not-an-array")
    } else {
        Value::Array(hits)
    };
    let mut body = json!({ "hits": { "total": total, "hits": hits_value } });
    if let (Some(id), false) = (scroll_id, state.omit_scroll_id) {
        body["_scroll_id"] = json!(id);
    }
    reply(StatusCode::OK, body)
}

async fn put_doc(
    State(state): State<Shared>,
    Path((index, doc_type, id)): Path<(String, String, String)>,
    body: String,
) -> Response {
    let mut state = state.lock().unwrap();
    state.last_put_body = Some(body.clone());

    if state.fail_puts > 0 {
        state.fail_puts -= 1;
        return reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "rejected" }),
        );
    }

    let Some(idx) = state.indices.get_mut(&index) else {
        return reply(
            StatusCode::NOT_FOUND,
            json!({ "error": "index_not_found_exception" }),
        );
    };
    let Ok(source) = serde_json::from_str::<Value>(&body) else {
        return reply(StatusCode::BAD_REQUEST, json!({ "error": "parse error" }));
    };

    match idx.docs.insert((doc_type, id), source) {
        Some(_) => reply(StatusCode::OK, json!({ "result": "updated" })),
        None => reply(StatusCode::CREATED, json!({ "result": "created" })),
    }
}

/// Build spill-format bytes: mapping line followed by hit envelopes.
pub fn spill(mapping: &Value, records: &[Value]) -> Vec<u8> {
    let mut out = mapping.to_string().into_bytes();
    out.push(b'\n');
    for record in records {
        out.extend_from_slice(record.to_string().as_bytes());
        out.push(b'\n');
    }
    out
}

/// A hit envelope the way the search API frames documents.
pub fn envelope(doc_type: &str, id: &str, source: Value) -> Value {
    json!({
        "_index": "ignored",
        "_type": doc_type,
        "_id": id,
        "_score": 1.0,
        "_source": source,
    })
}
