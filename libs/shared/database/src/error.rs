use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DbError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Conflict(String),

    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Client misconfigured: {0}")]
    Config(String),
}

impl DbError {
    /// Connection failures and gateway timeouts may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::Unavailable(_))
    }
}
