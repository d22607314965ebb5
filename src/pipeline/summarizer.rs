use std::sync::Arc;

use tracing::{debug, warn};

use crate::db::Row;
use crate::llm::prompts::PromptLibrary;
use crate::llm::{ChatPurpose, ChatRequest, SharedModel};

const TEMPERATURE: f32 = 0.7;

pub fn fallback_summary(record_count: usize) -> String {
    format!("Result: {record_count} records were retrieved.")
}

/// Writes the business-facing report. Never fails: any trouble yields the record count.
pub struct ReportSummarizer {
    model: Option<SharedModel>,
    prompts: Arc<PromptLibrary>,
}

impl ReportSummarizer {
    pub fn new(model: Option<SharedModel>, prompts: Arc<PromptLibrary>) -> Self {
        Self { model, prompts }
    }

    pub async fn summarize(&self, question: &str, sql: &str, rows: &[Row]) -> String {
        let Some(model) = &self.model else {
            return fallback_summary(rows.len());
        };

        let results = serde_json::to_string_pretty(rows).unwrap_or_else(|e| {
            warn!("Could not serialize rows for the summary prompt: {}", e);
            format!("{rows:?}")
        });

        let request = match (self.prompts.summary_system(), self.prompts.summary_user(question, sql, &results)) {
            (Ok(system), Ok(user)) => {
                ChatRequest::new(ChatPurpose::Summary, system, user).with_temperature(TEMPERATURE)
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("Could not render summary prompt: {}", e);
                return fallback_summary(rows.len());
            }
        };

        match model.complete(&request).await {
            Ok(text) if !text.trim().is_empty() => {
                debug!("Summary has {} characters", text.len());
                text
            }
            Ok(_) => {
                warn!("Summary model returned an empty answer");
                fallback_summary(rows.len())
            }
            Err(e) => {
                warn!("Summary generation failed: {}", e);
                fallback_summary(rows.len())
            }
        }
    }
}
