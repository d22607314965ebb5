use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::tokenizer::{Token, Tokenizer};
use thiserror::Error;

const MUTATING_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "merge", "create", "alter", "drop", "truncate", "grant",
    "revoke", "copy", "vacuum", "reindex", "cluster", "lock", "call", "execute", "prepare",
    "refresh", "listen", "notify", "begin", "commit", "rollback", "into",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqlViolation {
    #[error("SQL statement is empty")]
    Empty,
    #[error("SQL could not be tokenized: {0}")]
    Unreadable(String),
    #[error("multiple SQL statements are not allowed")]
    MultipleStatements,
    #[error("only SELECT and WITH queries are allowed, got `{0}`")]
    UnsupportedStatement(String),
    #[error("keyword `{0}` is not allowed in a read-only query")]
    MutatingKeyword(String),
}

/// Accepts exactly one SELECT (or WITH ... SELECT) statement.
///
/// The statement is lexed with the PostgreSQL dialect, so escape strings
/// (`E'\''`), dollar quotes and comments never hide or fake keywords.
/// Quoted identifiers are not keywords either.
pub fn check_read_only(sql: &str) -> Result<(), SqlViolation> {
    let tokens = Tokenizer::new(&PostgreSqlDialect {}, sql)
        .tokenize()
        .map_err(|e| SqlViolation::Unreadable(e.to_string()))?;

    let mut code: Vec<&Token> = tokens
        .iter()
        .filter(|t| !matches!(t, Token::Whitespace(_)))
        .collect();
    while matches!(code.last(), Some(Token::SemiColon)) {
        code.pop();
    }

    let Some(first) = code.first() else {
        return Err(SqlViolation::Empty);
    };
    if code.iter().any(|t| matches!(t, Token::SemiColon)) {
        return Err(SqlViolation::MultipleStatements);
    }

    let leading = bare_word(first).unwrap_or_else(|| first.to_string());
    if leading != "select" && leading != "with" {
        return Err(SqlViolation::UnsupportedStatement(leading));
    }

    if let Some(keyword) = code
        .iter()
        .filter_map(|t| bare_word(t))
        .find(|w| MUTATING_KEYWORDS.contains(&w.as_str()))
    {
        return Err(SqlViolation::MutatingKeyword(keyword));
    }

    Ok(())
}

/// Lowercased unquoted word, `None` for literals, operators and `"quoted"` names.
fn bare_word(token: &Token) -> Option<String> {
    match token {
        Token::Word(word) if word.quote_style.is_none() => Some(word.value.to_ascii_lowercase()),
        _ => None,
    }
}
