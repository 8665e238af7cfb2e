use thiserror::Error;

/// A form field failed its presence/length/shape check. Raised before any
/// backend call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        ValidationError {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,
    #[error("Session expired, please log in again")]
    SessionExpired,
    #[error("Authentication service error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("could not decode row: {0}")]
    Decode(String),
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<r2d2::Error> for BackendError {
    fn from(e: r2d2::Error) -> Self {
        BackendError::Connection(e.to_string())
    }
}

impl From<rusqlite::Error> for BackendError {
    fn from(e: rusqlite::Error) -> Self {
        BackendError::Query(e.to_string())
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        BackendError::Decode(e.to_string())
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::Decode(e.to_string())
        } else {
            BackendError::Connection(e.to_string())
        }
    }
}

impl From<BackendError> for AuthError {
    fn from(e: BackendError) -> Self {
        AuthError::Backend(e.to_string())
    }
}

/// Everything a route can fail with. Routes turn it into a flash
/// notification or an inline error region, never a 500.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl AppError {
    /// Message shown to the user. Validation and auth messages are already
    /// human readable; backend failures fall back to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            AppError::Validation(v) => v.message.clone(),
            AppError::Auth(a) => a.to_string(),
            AppError::Backend(_) => fallback.to_string(),
        }
    }
}
