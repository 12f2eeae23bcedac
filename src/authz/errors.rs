use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

use crate::errors::GateError;

#[derive(Debug, Error, Diagnostic)]
pub enum AuthzError {
    #[error("Operation registry not provided to the rules middleware")]
    #[diagnostic(
        code(rulegate::authz::missing_operations),
        help("Build an OperationRegistry and pass it when constructing RulesMiddleware")
    )]
    MissingOperations,

    #[error("Rule store lookup failed: {0}")]
    #[diagnostic(code(rulegate::authz::store))]
    Store(#[from] GateError),
}

impl IntoResponse for AuthzError {
    fn into_response(self) -> Response {
        // store failures surface as a plain denial
        let (status, message) = match &self {
            AuthzError::MissingOperations => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AuthzError::Store(_) => (StatusCode::FORBIDDEN, "permission denied".to_string()),
        };
        let body = json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
