//! Test doubles shared by the HTTP integration tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use marketing_agent::config::AppConfig;
use marketing_agent::db::{ConnectionProvider, DbError, QueryConnection, Row};
use marketing_agent::llm::{ChatModel, ChatPurpose, ChatRequest, LlmError, SharedModel};
use marketing_agent::web::{build_router, state::AppState};

/// Deterministic model: one fixed reply per pipeline purpose.
#[derive(Default)]
pub struct ScriptedModel {
    replies: HashMap<ChatPurpose, String>,
}

impl ScriptedModel {
    pub fn reply(mut self, purpose: ChatPurpose, text: &str) -> Self {
        self.replies.insert(purpose, text.to_string());
        self
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        self.replies
            .get(&request.purpose)
            .cloned()
            .ok_or_else(|| LlmError::ResponseError(format!("no reply for {}", request.purpose)))
    }
}

/// Serves fixed rows, or refuses every connection when `rows` is `None`.
pub struct FixedRows {
    rows: Option<Vec<Row>>,
    panic_on_fetch: bool,
    pub opened: AtomicUsize,
    pub closed: Arc<AtomicUsize>,
}

impl FixedRows {
    pub fn new(rows: Vec<Row>) -> Arc<Self> {
        Arc::new(Self {
            rows: Some(rows),
            panic_on_fetch: false,
            opened: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            rows: None,
            panic_on_fetch: false,
            opened: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Connects fine, then panics while fetching.
    pub fn panicking() -> Arc<Self> {
        Arc::new(Self {
            rows: Some(vec![]),
            panic_on_fetch: true,
            opened: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionProvider for FixedRows {
    async fn open(&self) -> Result<Box<dyn QueryConnection>, DbError> {
        let rows = self
            .rows
            .clone()
            .ok_or_else(|| DbError::Connection("connection refused".to_string()))?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixedConnection {
            rows,
            panic_on_fetch: self.panic_on_fetch,
            closed: Arc::clone(&self.closed),
        }))
    }
}

struct FixedConnection {
    rows: Vec<Row>,
    panic_on_fetch: bool,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl QueryConnection for FixedConnection {
    async fn fetch_rows(&mut self, _sql: &str) -> Result<Vec<Row>, DbError> {
        if self.panic_on_fetch {
            panic!("row decoder crashed");
        }
        Ok(self.rows.clone())
    }

    async fn close(self: Box<Self>) -> Result<(), DbError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn app(model: Option<ScriptedModel>, connections: Arc<FixedRows>) -> Router {
    let model: Option<SharedModel> = model.map(|m| Arc::new(m) as SharedModel);
    let state = AppState::new(AppConfig::default(), model, connections).unwrap();
    build_router(Arc::new(state))
}
