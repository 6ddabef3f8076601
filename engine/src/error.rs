#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine unavailable: {0}")]
    Unavailable(String),
    #[error("Engine session not initialized")]
    NotInitialized,
    #[error("Engine session terminated")]
    Terminated,
    #[error("Invalid FEN: {0}")]
    InvalidFen(String),
    #[error("Engine channel closed")]
    ChannelClosed,
}
