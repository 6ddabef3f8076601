use std::collections::HashMap;

use crate::fen::{format_fen, parse_fen, FenError, STARTING_FEN};
use crate::pgn::{format_san, parse_pgn, parse_san, GameResult, PgnError};

/// One played move and the position it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub san: String,
    pub fen_after: String,
    /// Clock remaining after the move, if the PGN carried `[%clk]`.
    pub clock: Option<String>,
}

/// The positions of a game, replayed from its PGN.
///
/// Plies are counted from the initial position: ply 0 is the start, ply `n`
/// is the position after the `n`th half-move.
#[derive(Debug, Clone)]
pub struct PositionHistory {
    initial_fen: String,
    entries: Vec<HistoryEntry>,
    tags: HashMap<String, String>,
    result: GameResult,
}

impl PositionHistory {
    /// Parse PGN movetext (with or without tags) and replay every move.
    ///
    /// A `FEN` tag selects the starting position. Fails with
    /// [`PgnError::InvalidNotation`] on the first move that is not legal.
    pub fn load(pgn: &str) -> Result<Self, PgnError> {
        let game = parse_pgn(pgn)?;

        let initial_fen = game
            .tags
            .get("FEN")
            .cloned()
            .unwrap_or_else(|| STARTING_FEN.to_string());
        let mut board = parse_fen(&initial_fen)?;

        let mut entries = Vec::with_capacity(game.moves.len());
        for (ply, pgn_move) in game.moves.into_iter().enumerate() {
            let mv = parse_san(&board, &pgn_move.san).map_err(|reason| {
                PgnError::InvalidNotation {
                    ply: ply + 1,
                    token: pgn_move.san.clone(),
                    reason,
                }
            })?;
            let san = format_san(&board, mv);
            board.play_unchecked(mv);
            entries.push(HistoryEntry {
                san,
                fen_after: format_fen(&board),
                clock: pgn_move.clock,
            });
        }

        Ok(Self {
            initial_fen: format_fen(&parse_fen(&initial_fen)?),
            entries,
            tags: game.tags,
            result: game.result,
        })
    }

    /// An empty history starting from `fen`.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let board = parse_fen(fen)?;
        Ok(Self {
            initial_fen: format_fen(&board),
            entries: Vec::new(),
            tags: HashMap::new(),
            result: GameResult::Ongoing,
        })
    }

    pub fn initial_fen(&self) -> &str {
        &self.initial_fen
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Number of half-moves.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sans(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.san.as_str())
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    pub fn result(&self) -> GameResult {
        self.result
    }

    /// FEN after the move at the 0-based `move_index`.
    pub fn position(&self, move_index: usize) -> Option<&str> {
        self.entries.get(move_index).map(|e| e.fen_after.as_str())
    }

    /// FEN at `ply` (0 = initial position).
    pub fn fen_at_ply(&self, ply: usize) -> Option<&str> {
        match ply {
            0 => Some(&self.initial_fen),
            n => self.position(n - 1),
        }
    }
}

/// The standard starting position with no moves played.
impl Default for PositionHistory {
    fn default() -> Self {
        Self {
            initial_fen: STARTING_FEN.to_string(),
            entries: Vec::new(),
            tags: HashMap::new(),
            result: GameResult::Ongoing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITALIAN: &str = r#"[Event "Casual"]
[White "a"]
[Black "b"]

1. e4 {[%clk 0:05:00]} e5 {[%clk 0:04:59]} 2. Nf3 Nc6 3. Bc4 Bc5 4. O-O Nf6 *"#;

    #[test]
    fn test_load_replays_moves() {
        let history = PositionHistory::load(ITALIAN).unwrap();
        assert_eq!(history.len(), 8);
        let sans: Vec<&str> = history.sans().collect();
        assert_eq!(sans, vec!["e4", "e5", "Nf3", "Nc6", "Bc4", "Bc5", "O-O", "Nf6"]);
        assert_eq!(history.tag("White"), Some("a"));
        assert_eq!(history.entries()[1].clock.as_deref(), Some("0:04:59"));
        assert_eq!(history.initial_fen(), STARTING_FEN);
        assert!(history
            .position(0)
            .unwrap()
            .starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq"));
        assert_eq!(history.fen_at_ply(0), Some(STARTING_FEN));
        assert_eq!(history.fen_at_ply(1), history.position(0));
        assert_eq!(history.position(8), None);
    }

    #[test]
    fn test_load_rejects_illegal_move() {
        let err = PositionHistory::load("1. e4 e5 2. Ke3").unwrap_err();
        match err {
            PgnError::InvalidNotation { ply, token, .. } => {
                assert_eq!(ply, 3);
                assert_eq!(token, "Ke3");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_from_fen_tag() {
        let pgn = r#"[SetUp "1"]
[FEN "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1"]

1. e4 Kd7 *"#;
        let history = PositionHistory::load(pgn).unwrap();
        assert_eq!(history.initial_fen(), "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1");
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_empty_history() {
        let history = PositionHistory::from_fen(STARTING_FEN).unwrap();
        assert!(history.is_empty());
        assert_eq!(history.fen_at_ply(0), Some(STARTING_FEN));
        assert_eq!(history.fen_at_ply(1), None);
        assert!(PositionHistory::from_fen("garbage").is_err());
    }
}
