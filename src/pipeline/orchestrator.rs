use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::{Instrument, error, info, info_span};

use super::{
    InputValidator, PipelineError, QueryExecutor, QueryResponse, ReportSummarizer, SqlGenerator,
};
use crate::config::AppConfig;
use crate::db::ConnectionProvider;
use crate::llm::prompts::PromptLibrary;
use crate::llm::{LlmError, SharedModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validating,
    Generating,
    Executing,
    Summarizing,
    Completed,
    Aborted,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Validating => "validating",
            Stage::Generating => "generating",
            Stage::Executing => "executing",
            Stage::Summarizing => "summarizing",
            Stage::Completed => "completed",
            Stage::Aborted => "aborted",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

fn enter(stage: Stage) {
    info!(%stage, "pipeline stage");
}

/// Runs one question through validation, SQL generation, execution and summary.
pub struct QueryPipeline {
    validator: InputValidator,
    generator: SqlGenerator,
    executor: QueryExecutor,
    summarizer: ReportSummarizer,
}

impl QueryPipeline {
    pub fn new(
        config: &AppConfig,
        model: Option<SharedModel>,
        connections: Arc<dyn ConnectionProvider>,
    ) -> Result<Self, LlmError> {
        let prompts = Arc::new(PromptLibrary::new(&config.llm.report_language)?);

        Ok(Self {
            validator: InputValidator::new(
                model.clone(),
                Arc::clone(&prompts),
                config.validator.fail_open,
            ),
            generator: SqlGenerator::new(model.clone(), Arc::clone(&prompts)),
            executor: QueryExecutor::new(connections, config.pipeline.read_only_guard),
            summarizer: ReportSummarizer::new(model, prompts),
        })
    }

    /// Signaled faults come back as `Err`; anything unexpected, panics included,
    /// is folded into an in-band `QueryResponse::Failed`.
    pub async fn answer(&self, question: &str) -> Result<QueryResponse, PipelineError> {
        let span = info_span!("query", question = %question);
        let outcome = AssertUnwindSafe(self.run(question))
            .catch_unwind()
            .instrument(span)
            .await;

        match outcome {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(PipelineError::Unexpected(message))) => {
                error!("Unexpected pipeline error: {}", message);
                Ok(QueryResponse::failed(message))
            }
            Ok(Err(fault)) => Err(fault),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Pipeline panicked: {}", message);
                Ok(QueryResponse::failed(message))
            }
        }
    }

    async fn run(&self, question: &str) -> Result<QueryResponse, PipelineError> {
        enter(Stage::Received);

        enter(Stage::Validating);
        let decision = self.validator.validate(question).await;
        if !decision.allowed {
            enter(Stage::Aborted);
            return Err(PipelineError::Rejected(decision.reason));
        }

        enter(Stage::Generating);
        let sql = self.generator.generate_sql(question).await.inspect_err(|_| enter(Stage::Failed))?;

        enter(Stage::Executing);
        let result = self.executor.execute(&sql).await.inspect_err(|_| enter(Stage::Failed))?;

        enter(Stage::Summarizing);
        let summary = self.summarizer.summarize(question, &sql, &result).await;

        enter(Stage::Completed);
        Ok(QueryResponse::Answered {
            sql,
            result,
            summary,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "internal error".to_string()
    }
}
