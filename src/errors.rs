use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum GateError {
    #[error("Config error: {0}")]
    #[diagnostic(code(rulegate::config))]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(rulegate::serde))]
    Serde(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    #[diagnostic(code(rulegate::db))]
    Db(#[from] sea_orm::DbErr),

    #[error("Not found: {0}")]
    #[diagnostic(code(rulegate::not_found))]
    NotFound(String),

    #[error("Bad request: {0}")]
    #[diagnostic(code(rulegate::bad_request))]
    BadRequest(String),

    #[error("{0}")]
    #[diagnostic(code(rulegate::other))]
    Other(String),
}
