use engine::RequestId;
use tokio::sync::{broadcast, oneshot};

use super::events::{AnalysisEvent, AnalysisSnapshot};
use crate::viewer::SessionSettings;

#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    #[error("Engine unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid FEN: {0}")]
    InvalidFen(String),
    #[error("Engine error: {0}")]
    Engine(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<engine::EngineError> for AnalysisError {
    fn from(e: engine::EngineError) -> Self {
        match e {
            engine::EngineError::Unavailable(reason) => Self::Unavailable(reason),
            engine::EngineError::InvalidFen(fen) => Self::InvalidFen(fen),
            other => Self::Engine(other.to_string()),
        }
    }
}

/// Commands sent to the analysis actor. Each embeds a oneshot for the reply.
pub enum AnalysisCommand {
    /// The displayed position changed. Replies with the request issued, or
    /// `None` while analysis is disabled.
    PositionChanged {
        fen: String,
        reply: oneshot::Sender<Result<Option<RequestId>, AnalysisError>>,
    },
    SettingsChanged {
        settings: SessionSettings,
        reply: oneshot::Sender<Result<(), AnalysisError>>,
    },
    Stop {
        reply: oneshot::Sender<Result<(), AnalysisError>>,
    },
    Subscribe {
        reply: oneshot::Sender<(AnalysisSnapshot, broadcast::Receiver<AnalysisEvent>)>,
    },
    Shutdown,
}
