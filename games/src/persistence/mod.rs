mod game_store;
mod json_store;
mod traits;

pub use game_store::JsonGameStore;
pub use traits::GameStore;

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Game not found: {0}")]
    NotFound(String),
    #[error("Invalid game id: {0:?}")]
    InvalidId(String),
}
