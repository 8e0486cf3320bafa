use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};
use serde_json::json;
use axum::Json;
use thiserror::Error;

/// Errors returned by the frequency and association analyzers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    #[error("association needs two distinct columns, got '{0}' twice")]
    InvalidColumnPair(String),

    #[error("no rows with values in both '{column_a}' and '{column_b}'")]
    EmptyTable { column_a: String, column_b: String },

    #[error("contingency table is degenerate ({rows}x{cols}): {reason}")]
    DegenerateTable { rows: usize, cols: usize, reason: String },
}

impl AnalysisError {
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::ColumnNotFound(_) => "column_not_found",
            AnalysisError::InvalidColumnPair(_) => "invalid_column_pair",
            AnalysisError::EmptyTable { .. } => "empty_table",
            AnalysisError::DegenerateTable { .. } => "degenerate_table",
        }
    }
}

/// Errors raised while turning an uploaded file into a table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("file is empty")]
    Empty,

    #[error("file is not valid UTF-8 (first invalid byte at offset {offset})")]
    Encoding { offset: usize },

    #[error("file has no header row")]
    MissingHeader,

    #[error("failed to parse file: {0}")]
    Parse(String),

    /// `size` is unknown when the body was cut off while being received.
    #[error("file exceeds the upload limit of {limit} bytes")]
    TooLarge { size: Option<usize>, limit: usize },
}

#[derive(Debug)]
pub enum AppError {
    InvalidInput(String),
    SessionNotFound(String),
    Load(LoadError),
    Analysis(AnalysisError),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::SessionNotFound(id) => write!(f, "Dataset {} not found or expired", id),
            AppError::Load(err) => write!(f, "Load error: {}", err),
            AppError::Analysis(err) => write!(f, "Analysis error: {}", err),
        }
    }
}

impl std::error::Error for AppError {}

impl From<LoadError> for AppError {
    fn from(err: LoadError) -> Self {
        AppError::Load(err)
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        AppError::Analysis(err)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Load(LoadError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Load(_) => StatusCode::BAD_REQUEST,
            AppError::Analysis(AnalysisError::ColumnNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Analysis(AnalysisError::InvalidColumnPair(_)) => StatusCode::BAD_REQUEST,
            AppError::Analysis(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "invalid_input",
            AppError::SessionNotFound(_) => "session_not_found",
            AppError::Load(_) => "load_error",
            AppError::Analysis(err) => err.kind(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Load(err) => err.to_string(),
            AppError::Analysis(err) => err.to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}
