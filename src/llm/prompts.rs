use minijinja::{Environment, context};

use crate::ingest::schema::schema_description;
use crate::llm::LlmError;

const VALIDATION_SYSTEM: &str = r#"You are a question-screening system for marketing analysis.
Decide whether the user's question is an appropriate marketing-analysis question.

Reject questions that:
- ask about passwords, IDs or personal information
- concern security
- ask about the database structure or other technical details
- are unrelated to marketing analysis

Allow questions related to marketing analysis (sales, customer analysis, product analysis and similar).

Answer in JSON of the form {"allowed": true/false, "reason": "reason"}."#;

const GENERATION_SYSTEM: &str = r#"You are an expert at writing SQL queries for marketing analysis.
Write a PostgreSQL query that answers the user's question.

{{ schema }}

Important rules:
1. Generate SELECT statements only (INSERT, UPDATE and DELETE are forbidden)
2. Join the tables along the relationships above where needed
3. Use aggregate functions (SUM, COUNT, AVG, ...) where appropriate
4. Use PostgreSQL date functions for time-based grouping
5. The query must be executable and safe

Return only the SQL query. No explanations or comments."#;

const SUMMARY_SYSTEM: &str = r#"You are a marketing analysis expert.
Analyse the result of the SQL query and write an easy-to-read report with insights that help the business.

The report must include:
1. A summary of the results
2. Key figures and trends
3. Business implications and recommendations

Write in {{ language }}, clearly and without overly technical language."#;

const SUMMARY_USER: &str = r#"User question: {{ question }}

Executed SQL: {{ sql }}

Result data:
{{ results }}

Analyse the results above and write a marketing analysis report."#;

/// The three prompt templates of the pipeline.
///
/// Template names end in `.txt` so minijinja never HTML-escapes the inputs.
pub struct PromptLibrary {
    env: Environment<'static>,
    schema: String,
    language: String,
}

impl PromptLibrary {
    pub fn new(report_language: &str) -> Result<Self, LlmError> {
        let mut env = Environment::new();
        env.add_template("validation_system.txt", VALIDATION_SYSTEM)?;
        env.add_template("generation_system.txt", GENERATION_SYSTEM)?;
        env.add_template("summary_system.txt", SUMMARY_SYSTEM)?;
        env.add_template("summary_user.txt", SUMMARY_USER)?;

        Ok(Self {
            env,
            schema: schema_description(),
            language: report_language.to_string(),
        })
    }

    pub fn validation_system(&self) -> Result<String, LlmError> {
        Ok(self.env.get_template("validation_system.txt")?.render(context! {})?)
    }

    pub fn generation_system(&self) -> Result<String, LlmError> {
        Ok(self
            .env
            .get_template("generation_system.txt")?
            .render(context! { schema => &self.schema })?)
    }

    pub fn summary_system(&self) -> Result<String, LlmError> {
        Ok(self
            .env
            .get_template("summary_system.txt")?
            .render(context! { language => &self.language })?)
    }

    pub fn summary_user(&self, question: &str, sql: &str, results: &str) -> Result<String, LlmError> {
        Ok(self.env.get_template("summary_user.txt")?.render(context! {
            question => question,
            sql => sql,
            results => results,
        })?)
    }
}
