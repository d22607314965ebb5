use std::sync::Arc;

use tracing::{debug, info, warn};

use super::ValidationDecision;
use super::parse::parse_decision;
use crate::llm::prompts::PromptLibrary;
use crate::llm::{ChatPurpose, ChatRequest, SharedModel};

/// Matched case-insensitively as plain substrings when no model is available.
pub const DENYLIST: [&str; 10] = [
    "パスワード",
    "password",
    "ID",
    "id",
    "個人情報",
    "秘密",
    "機密",
    "personal information",
    "secret",
    "confidential",
];

pub const SECURITY_REASON: &str = "This question cannot be answered for security reasons.";
pub const SCREENING_FAILED_REASON: &str = "The question could not be screened.";

const TEMPERATURE: f32 = 0.3;

/// Decides whether a question may be answered at all.
pub struct InputValidator {
    model: Option<SharedModel>,
    prompts: Arc<PromptLibrary>,
    fail_open: bool,
}

impl InputValidator {
    /// With `fail_open`, a model that errors or answers nonsense lets the question through.
    pub fn new(model: Option<SharedModel>, prompts: Arc<PromptLibrary>, fail_open: bool) -> Self {
        Self {
            model,
            prompts,
            fail_open,
        }
    }

    pub async fn validate(&self, question: &str) -> ValidationDecision {
        let Some(model) = &self.model else {
            return screen_with_denylist(question);
        };

        let answer = match self.prompts.validation_system() {
            Ok(system) => {
                let request = ChatRequest::new(ChatPurpose::Validation, system, question)
                    .with_temperature(TEMPERATURE);
                model.complete(&request).await.map_err(|e| e.to_string())
            }
            Err(e) => Err(e.to_string()),
        };

        let parsed = answer.and_then(|text| {
            debug!("Validation model answered: {}", text);
            parse_decision(&text).map_err(|e| format!("unparsable validation answer: {e}"))
        });

        match parsed {
            Ok(decision) => {
                info!(allowed = decision.allowed, "Validation decision: {}", decision.reason);
                decision
            }
            Err(e) if self.fail_open => {
                warn!("Validation failed, allowing question: {}", e);
                ValidationDecision::allow()
            }
            Err(e) => {
                warn!("Validation failed, rejecting question: {}", e);
                ValidationDecision::deny(SCREENING_FAILED_REASON)
            }
        }
    }
}

/// Rule-based screening used when no model backend is configured.
pub fn screen_with_denylist(question: &str) -> ValidationDecision {
    let lowered = question.to_lowercase();
    match DENYLIST.iter().find(|word| lowered.contains(&word.to_lowercase())) {
        Some(word) => {
            info!("Question rejected by denylist entry '{}'", word);
            ValidationDecision::deny(SECURITY_REASON)
        }
        None => ValidationDecision::allow(),
    }
}
