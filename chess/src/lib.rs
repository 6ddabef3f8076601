//! Move model: FEN, UCI and SAN notation, PGN games and engine line display.

pub mod analysis;
pub mod fen;
pub mod history;
pub mod moves;
pub mod pgn;
pub mod uci;

pub use analysis::AnalysisScore;
pub use fen::{format_fen, parse_fen, FenError, STARTING_FEN};
pub use history::{HistoryEntry, PositionHistory};
pub use moves::{apply_move, apply_uci_move, translate_pv, MoveError};
pub use pgn::{GameResult, PgnError, SanError};
pub use uci::{format_uci_move, parse_square, parse_uci_move, UciMoveError};

/// Re-exported so callers can name squares and pieces without a direct dependency.
pub use cozy_chess::{Color, Piece, Square};
