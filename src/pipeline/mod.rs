// The question-answering path: validate -> generate SQL -> execute -> summarize.
pub mod executor;
pub mod generator;
pub mod guard;
pub mod orchestrator;
pub mod parse;
pub mod summarizer;
pub mod validator;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::db::{DbError, Row};

pub use executor::QueryExecutor;
pub use generator::SqlGenerator;
pub use orchestrator::{QueryPipeline, Stage};
pub use summarizer::ReportSummarizer;
pub use validator::InputValidator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDecision {
    pub allowed: bool,
    pub reason: String,
}

impl ValidationDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: String::new(),
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

/// Faults a request can end in. All but `Unexpected` become HTTP error responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("This question cannot be answered: {0}")]
    Rejected(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("SQL generation error: {0}")]
    Generation(String),
    #[error("Database connection error: {0}")]
    Connection(String),
    #[error("SQL execution error: {0}")]
    Execution(String),
    #[error("Unsafe SQL rejected: {0}")]
    UnsafeSql(String),
    #[error("{0}")]
    Unexpected(String),
}

impl From<DbError> for PipelineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::InvalidUrl(_) => PipelineError::Connection(err.to_string()),
            DbError::Connection(msg) => PipelineError::Connection(msg),
            DbError::Query(msg) => PipelineError::Execution(msg),
            DbError::Decode { .. } => PipelineError::Unexpected(err.to_string()),
        }
    }
}

/// The outcome of one question: either a full answer or an in-band error.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResponse {
    Answered {
        sql: String,
        result: Vec<Row>,
        summary: String,
    },
    Failed {
        error: String,
    },
}

impl QueryResponse {
    pub fn failed(error: impl Into<String>) -> Self {
        QueryResponse::Failed {
            error: error.into(),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            QueryResponse::Answered { .. } => None,
            QueryResponse::Failed { error } => Some(error.as_str()),
        }
    }
}

/// Both variants go out as `{sql, result, summary, error}`.
#[derive(Serialize)]
struct WireResponse<'a> {
    sql: &'a str,
    result: &'a [Row],
    summary: &'a str,
    error: Option<&'a str>,
}

impl Serialize for QueryResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            QueryResponse::Answered {
                sql,
                result,
                summary,
            } => WireResponse {
                sql,
                result,
                summary,
                error: None,
            },
            QueryResponse::Failed { error } => WireResponse {
                sql: "",
                result: &[],
                summary: "",
                error: Some(error.as_str()),
            },
        };
        wire.serialize(serializer)
    }
}
