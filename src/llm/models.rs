use std::fmt;

/// Which pipeline stage a model call serves. Used for logging and by test doubles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatPurpose {
    Validation,
    SqlGeneration,
    Summary,
}

impl fmt::Display for ChatPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChatPurpose::Validation => "validation",
            ChatPurpose::SqlGeneration => "sql-generation",
            ChatPurpose::Summary => "summary",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub purpose: ChatPurpose,
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn new(purpose: ChatPurpose, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            purpose,
            system: system.into(),
            user: user.into(),
            temperature: 0.3,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}
