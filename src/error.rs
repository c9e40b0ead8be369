use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    #[error("No menu items available to build an order")]
    CatalogUnavailable,

    #[error("Highscore store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GameError>;

impl GameError {
    /// Errors the player can fix by showing a different pattern
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GameError::InvalidSubmission(_))
    }
}
