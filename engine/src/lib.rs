pub mod channel;
pub mod error;
pub mod result_set;
pub mod session;
pub mod stockfish;
pub mod uci;

pub use channel::{EngineChannel, EngineLauncher};
pub use error::EngineError;
pub use result_set::{AnalysisResultSet, EvaluationRequest, RequestId};
pub use session::{EngineSession, SessionState};
pub use stockfish::{find_stockfish_path, StockfishChannel, StockfishLauncher};
pub use uci::{parse_engine_line, EngineMessage, Wdl};

use std::fmt;

/// Hard ceiling for `go depth`.
pub const MAX_DEPTH: u8 = 24;

/// Multi-PV line count used when nothing else is configured.
pub const DEFAULT_MULTIPV: usize = 3;

/// Clamp a requested search depth to [`MAX_DEPTH`].
pub fn clamp_depth(depth: u32) -> u8 {
    depth.min(MAX_DEPTH as u32) as u8
}

/// Commands sent to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    Uci,
    IsReady,
    SetOption { name: String, value: String },
    Position { fen: String },
    GoDepth(u8),
    Stop,
    Quit,
}

impl EngineCommand {
    pub fn multipv(lines: usize) -> Self {
        Self::SetOption {
            name: "MultiPV".to_string(),
            value: lines.to_string(),
        }
    }

    pub fn show_wdl() -> Self {
        Self::SetOption {
            name: "UCI_showWDL".to_string(),
            value: "true".to_string(),
        }
    }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uci => write!(f, "uci"),
            Self::IsReady => write!(f, "isready"),
            Self::SetOption { name, value } => write!(f, "setoption name {} value {}", name, value),
            Self::Position { fen } => write!(f, "position fen {}", fen),
            Self::GoDepth(depth) => write!(f, "go depth {}", depth),
            Self::Stop => write!(f, "stop"),
            Self::Quit => write!(f, "quit"),
        }
    }
}
