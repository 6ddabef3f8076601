use engine::SessionState;

use super::line::AnalysisLine;
use crate::viewer::SessionSettings;

/// Events broadcast from the analysis actor to all subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisEvent {
    /// The engine finished its handshake.
    Ready,
    /// Current lines of the running search, best first. Empty when a new
    /// search has just started.
    Lines(Vec<AnalysisLine>),
    /// The current search completed.
    BestMove {
        best_move: String,
        ponder: Option<String>,
    },
    /// The engine could not be started or exited.
    Unavailable(String),
    Error(String),
}

/// What a new subscriber needs to draw before the first event arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSnapshot {
    pub settings: SessionSettings,
    /// `None` while analysis is disabled.
    pub state: Option<SessionState>,
    pub fen: Option<String>,
    pub lines: Vec<AnalysisLine>,
}
