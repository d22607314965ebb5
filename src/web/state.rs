use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::ConnectionProvider;
use crate::llm::{LlmError, SharedModel};
use crate::pipeline::QueryPipeline;

/// Shared application state for the web server. Built once, read-only afterwards.
pub struct AppState {
    pub config: AppConfig,
    pub pipeline: QueryPipeline,
    pub connections: Arc<dyn ConnectionProvider>,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        model: Option<SharedModel>,
        connections: Arc<dyn ConnectionProvider>,
    ) -> Result<Self, LlmError> {
        let pipeline = QueryPipeline::new(&config, model, Arc::clone(&connections))?;

        Ok(Self {
            config,
            pipeline,
            connections,
            startup_time: chrono::Utc::now(),
        })
    }
}
