use std::sync::Arc;

use tracing::{error, info};

use super::PipelineError;
use super::parse::strip_code_fence;
use crate::llm::prompts::PromptLibrary;
use crate::llm::{ChatPurpose, ChatRequest, SharedModel};

const TEMPERATURE: f32 = 0.3;

pub const NO_BACKEND_MESSAGE: &str =
    "No LLM backend is configured; set OPENAI_API_KEY to enable SQL generation";

/// Turns a question into one PostgreSQL query over the marketing schema.
pub struct SqlGenerator {
    model: Option<SharedModel>,
    prompts: Arc<PromptLibrary>,
}

impl SqlGenerator {
    pub fn new(model: Option<SharedModel>, prompts: Arc<PromptLibrary>) -> Self {
        Self { model, prompts }
    }

    pub async fn generate_sql(&self, question: &str) -> Result<String, PipelineError> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| PipelineError::ServiceUnavailable(NO_BACKEND_MESSAGE.to_string()))?;

        let system = self
            .prompts
            .generation_system()
            .map_err(|e| PipelineError::Generation(e.to_string()))?;
        let request = ChatRequest::new(ChatPurpose::SqlGeneration, system, question)
            .with_temperature(TEMPERATURE);

        let answer = model.complete(&request).await.map_err(|e| {
            error!("SQL generation failed: {}", e);
            PipelineError::Generation(e.to_string())
        })?;

        let sql = strip_code_fence(&answer, "sql");
        if sql.is_empty() {
            return Err(PipelineError::Generation(
                "the model returned no SQL".to_string(),
            ));
        }

        info!("Generated SQL: {}", sql);
        Ok(sql.to_string())
    }
}
