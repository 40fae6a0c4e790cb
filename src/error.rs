use thiserror::Error;

#[derive(Error, Debug)]
pub enum EcoShareError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Cannot claim your own donation: {0}")]
    SelfClaim(String),

    #[error("Donation already claimed: {0}")]
    AlreadyClaimed(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A stored record breaks a data-model invariant. Never recoverable.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EcoShareError {
    /// True for every state-transition precondition failure, including the
    /// claim-specific specializations.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            EcoShareError::Conflict(_) | EcoShareError::SelfClaim(_) | EcoShareError::AlreadyClaimed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EcoShareError>;
