//! Playing single moves on a FEN and translating engine variations.

use cozy_chess::{Move, Piece, Square};

use crate::fen::{format_fen, parse_fen, FenError};
use crate::pgn::format_san;
use crate::uci::{format_uci_move, normalize_castling, parse_uci_move_on, UciMoveError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error(transparent)]
    Fen(#[from] FenError),
    #[error(transparent)]
    Notation(#[from] UciMoveError),
    #[error("Illegal move: {0}")]
    IllegalMove(String),
}

/// Play `from`-`to` on `fen`, returning the resulting FEN and the move in SAN.
///
/// Castling may be given either as the king moving two squares or as the
/// king moving onto its rook.
pub fn apply_move(
    fen: &str,
    from: Square,
    to: Square,
    promotion: Option<Piece>,
) -> Result<(String, String), MoveError> {
    let mut board = parse_fen(fen)?;
    let mv = normalize_castling(
        &board,
        Move {
            from,
            to,
            promotion,
        },
    );
    if !board.is_legal(mv) {
        return Err(MoveError::IllegalMove(format_uci_move(mv)));
    }

    let san = format_san(&board, mv);
    board.play_unchecked(mv);
    Ok((format_fen(&board), san))
}

/// [`apply_move`] for a move in UCI text form (`e2e4`, `e7e8q`).
pub fn apply_uci_move(fen: &str, uci: &str) -> Result<(String, String), MoveError> {
    let board = parse_fen(fen)?;
    let mv = parse_uci_move_on(&board, uci)?;
    apply_move(fen, mv.from, mv.to, mv.promotion)
}

/// Convert an engine principal variation to SAN, replayed from `fen`.
///
/// Stops at the first move that does not parse or is not legal and returns
/// the prefix translated so far. An invalid `fen` yields an empty list.
pub fn translate_pv<S: AsRef<str>>(fen: &str, pv: &[S]) -> Vec<String> {
    let Ok(mut board) = parse_fen(fen) else {
        return Vec::new();
    };

    let mut sans = Vec::with_capacity(pv.len());
    for uci in pv {
        let Ok(mv) = parse_uci_move_on(&board, uci.as_ref()) else {
            break;
        };
        if !board.is_legal(mv) {
            break;
        }
        sans.push(format_san(&board, mv));
        board.play_unchecked(mv);
    }
    sans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::STARTING_FEN;
    use crate::pgn::legal_moves;
    use crate::uci::parse_square;
    use cozy_chess::Board;
    use proptest::prelude::*;

    fn sq(s: &str) -> Square {
        parse_square(s).unwrap()
    }

    #[test]
    fn test_apply_move_returns_fen_and_san() {
        let (fen, san) = apply_move(STARTING_FEN, sq("g1"), sq("f3"), None).unwrap();
        assert_eq!(san, "Nf3");
        assert_eq!(fen, "rnbqkbnr/pppppppp/8/8/8/5N2/PPPPPPPP/RNBQKB1R b KQkq - 1 1");
    }

    #[test]
    fn test_apply_move_castling_both_forms() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        let (after_uci, san) = apply_move(fen, sq("e1"), sq("g1"), None).unwrap();
        assert_eq!(san, "O-O");
        let (after_cozy, _) = apply_move(fen, sq("e1"), sq("h1"), None).unwrap();
        assert_eq!(after_uci, after_cozy);
        assert!(after_uci.starts_with("r3k2r/8/8/8/8/8/8/R4RK1 b kq"));
    }

    #[test]
    fn test_apply_move_rejects_illegal() {
        let err = apply_move(STARTING_FEN, sq("e2"), sq("e5"), None).unwrap_err();
        assert_eq!(err, MoveError::IllegalMove("e2e5".to_string()));
        assert!(matches!(
            apply_move("bad", sq("e2"), sq("e4"), None),
            Err(MoveError::Fen(_))
        ));
    }

    #[test]
    fn test_apply_uci_move_promotion() {
        let (_, san) = apply_uci_move("8/4P3/8/8/8/8/k7/4K3 w - - 0 1", "e7e8q").unwrap();
        assert_eq!(san, "e8=Q");
        assert!(matches!(
            apply_uci_move(STARTING_FEN, "zz"),
            Err(MoveError::Notation(_))
        ));
    }

    #[test]
    fn test_translate_pv_full_line() {
        let pv = ["e2e4", "e7e5", "g1f3", "b8c6", "f1b5"];
        let sans = translate_pv(STARTING_FEN, &pv);
        assert_eq!(sans, vec!["e4", "e5", "Nf3", "Nc6", "Bb5"]);
    }

    #[test]
    fn test_translate_pv_stops_at_illegal_third_move() {
        let pv = ["e2e4", "e7e5", "e4e5", "g1f3"];
        assert_eq!(translate_pv(STARTING_FEN, &pv), vec!["e4", "e5"]);
    }

    #[test]
    fn test_translate_pv_stops_at_garbage() {
        let pv = vec!["d2d4".to_string(), "(none)".to_string(), "d7d5".to_string()];
        assert_eq!(translate_pv(STARTING_FEN, &pv), vec!["d4"]);
        assert!(translate_pv("not a fen", &pv).is_empty());
    }

    #[test]
    fn test_translate_pv_castling_and_mate() {
        let fen = "rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2";
        assert_eq!(translate_pv(fen, &["d8h4"]), vec!["Qh4#"]);
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        assert_eq!(translate_pv(fen, &["e1c1", "e8g8"]), vec!["O-O-O", "O-O"]);
    }

    /// Random legal walk from the start position, as UCI strings.
    fn random_line(choices: &[usize]) -> Vec<String> {
        let mut board = Board::default();
        let mut line = Vec::new();
        for choice in choices {
            let moves = legal_moves(&board);
            if moves.is_empty() {
                break;
            }
            let mv = moves[choice % moves.len()];
            line.push(format_uci_move(mv));
            board.play_unchecked(mv);
        }
        line
    }

    proptest! {
        #[test]
        fn prop_legal_pv_translates_fully(choices in prop::collection::vec(any::<usize>(), 0..24)) {
            let line = random_line(&choices);
            let sans = translate_pv(STARTING_FEN, &line);
            prop_assert_eq!(sans.len(), line.len());
        }

        #[test]
        fn prop_illegal_third_move_keeps_two(choices in prop::collection::vec(any::<usize>(), 2..3)) {
            let mut line = random_line(&choices);
            prop_assume!(line.len() == 2);
            // A move from an empty square is never legal.
            line.push("e5e6".to_string());
            let fen = {
                let mut board = Board::default();
                for uci in &line[..2] {
                    let mv = parse_uci_move_on(&board, uci).unwrap();
                    board.play_unchecked(mv);
                }
                format_fen(&board)
            };
            let board = parse_fen(&fen).unwrap();
            prop_assume!(board.piece_on(sq("e5")).is_none());
            prop_assert_eq!(translate_pv(STARTING_FEN, &line).len(), 2);
        }
    }
}
