use cozy_chess::{Board, GameStatus, Move, Piece};

use crate::uci::{file_char, format_square, parse_file, parse_rank, parse_square, rank_char};

/// All legal moves in `board`, in cozy-chess notation.
pub fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

/// True when `mv` is a castle (cozy-chess encodes it as king takes own rook).
pub(crate) fn is_castle(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King)
        && board.color_on(mv.to) == Some(board.side_to_move())
}

/// Parse Standard Algebraic Notation (SAN) move
///
/// Check, mate and annotation suffixes are ignored. Over-specified
/// disambiguation (`Ngf3` where `Nf3` suffices) is accepted.
pub fn parse_san(board: &Board, san: &str) -> Result<Move, SanError> {
    let trimmed = san.trim().trim_end_matches(['+', '#', '!', '?']);
    if trimmed.is_empty() {
        return Err(SanError::InvalidFormat(san.to_string()));
    }

    match trimmed {
        "O-O" | "0-0" => return find_castle(board, true, san),
        "O-O-O" | "0-0-0" => return find_castle(board, false, san),
        _ => {}
    }

    let mut chars: Vec<char> = trimmed.chars().filter(|c| *c != 'x' && *c != '-').collect();

    let piece = match chars.first().copied().and_then(piece_from_letter) {
        Some(piece) => {
            chars.remove(0);
            piece
        }
        None => Piece::Pawn,
    };

    let mut promotion = None;
    if let Some(pos) = chars.iter().position(|c| *c == '=') {
        let letter = chars
            .get(pos + 1)
            .copied()
            .ok_or_else(|| SanError::InvalidPromotion(san.to_string()))?;
        promotion = Some(promotion_piece(letter).ok_or_else(|| SanError::InvalidPromotion(san.to_string()))?);
        chars.truncate(pos);
    } else if piece == Piece::Pawn {
        if let Some(p) = chars.last().copied().and_then(promotion_piece) {
            // A trailing `b` is a file, never a bishop promotion without `=`.
            if chars.last() != Some(&'b') {
                promotion = Some(p);
                chars.pop();
            }
        }
    }

    if chars.len() < 2 {
        return Err(SanError::InvalidFormat(san.to_string()));
    }
    let split = chars.len() - 2;
    let dest: String = chars[split..].iter().collect();
    let to = parse_square(&dest).map_err(|_| SanError::InvalidSquare(dest.clone()))?;

    let hints = &chars[..split];
    if hints.len() > 2 {
        return Err(SanError::InvalidFormat(san.to_string()));
    }

    let mut from_file = None;
    let mut from_rank = None;
    for &c in hints {
        if let Some(file) = parse_file(c) {
            from_file = Some(file);
        } else if let Some(rank) = parse_rank(c) {
            from_rank = Some(rank);
        } else if c.is_ascii_alphabetic() {
            return Err(SanError::InvalidFile(c));
        } else {
            return Err(SanError::InvalidRank(c));
        }
    }

    let candidates: Vec<Move> = legal_moves(board)
        .into_iter()
        .filter(|mv| {
            mv.to == to
                && mv.promotion == promotion
                && board.piece_on(mv.from) == Some(piece)
                && !is_castle(board, *mv)
                && from_file.is_none_or(|f| mv.from.file() == f)
                && from_rank.is_none_or(|r| mv.from.rank() == r)
        })
        .collect();

    match candidates.as_slice() {
        [mv] => Ok(*mv),
        [] => Err(SanError::NoLegalMove(san.to_string())),
        _ => Err(SanError::AmbiguousMove(san.to_string())),
    }
}

fn find_castle(board: &Board, kingside: bool, san: &str) -> Result<Move, SanError> {
    legal_moves(board)
        .into_iter()
        .find(|mv| {
            is_castle(board, *mv)
                && if kingside {
                    mv.to.file() as usize > mv.from.file() as usize
                } else {
                    (mv.to.file() as usize) < mv.from.file() as usize
                }
        })
        .ok_or_else(|| SanError::NoLegalMove(san.to_string()))
}

/// Format a legal move as SAN, including disambiguation and check/mate suffix.
///
/// `mv` must be legal in `board`.
pub fn format_san(board: &Board, mv: Move) -> String {
    let mut san = String::new();

    if is_castle(board, mv) {
        san.push_str(if mv.to.file() as usize > mv.from.file() as usize {
            "O-O"
        } else {
            "O-O-O"
        });
    } else {
        let piece = board.piece_on(mv.from).unwrap_or(Piece::Pawn);
        let is_capture = board.color_on(mv.to).is_some()
            || (piece == Piece::Pawn && mv.from.file() != mv.to.file());

        if piece == Piece::Pawn {
            if is_capture {
                san.push(file_char(mv.from.file()));
            }
        } else {
            san.push(piece_letter(piece));
            san.push_str(&disambiguation(board, mv, piece));
        }

        if is_capture {
            san.push('x');
        }
        san.push_str(&format_square(mv.to));

        if let Some(promo) = mv.promotion {
            san.push('=');
            san.push(piece_letter(promo));
        }
    }

    let mut after = board.clone();
    after.play_unchecked(mv);
    if !after.checkers().is_empty() {
        san.push(if after.status() == GameStatus::Won {
            '#'
        } else {
            '+'
        });
    }

    san
}

fn disambiguation(board: &Board, mv: Move, piece: Piece) -> String {
    let rivals: Vec<Move> = legal_moves(board)
        .into_iter()
        .filter(|other| {
            other.to == mv.to
                && other.from != mv.from
                && board.piece_on(other.from) == Some(piece)
                && !is_castle(board, *other)
        })
        .collect();

    if rivals.is_empty() {
        return String::new();
    }

    let shares_file = rivals.iter().any(|o| o.from.file() == mv.from.file());
    let shares_rank = rivals.iter().any(|o| o.from.rank() == mv.from.rank());

    match (shares_file, shares_rank) {
        (false, _) => file_char(mv.from.file()).to_string(),
        (true, false) => rank_char(mv.from.rank()).to_string(),
        (true, true) => format_square(mv.from),
    }
}

fn piece_letter(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'P',
        Piece::Knight => 'N',
        Piece::Bishop => 'B',
        Piece::Rook => 'R',
        Piece::Queen => 'Q',
        Piece::King => 'K',
    }
}

fn piece_from_letter(c: char) -> Option<Piece> {
    match c {
        'N' => Some(Piece::Knight),
        'B' => Some(Piece::Bishop),
        'R' => Some(Piece::Rook),
        'Q' => Some(Piece::Queen),
        'K' => Some(Piece::King),
        _ => None,
    }
}

fn promotion_piece(c: char) -> Option<Piece> {
    match c.to_ascii_uppercase() {
        'N' => Some(Piece::Knight),
        'B' => Some(Piece::Bishop),
        'R' => Some(Piece::Rook),
        'Q' => Some(Piece::Queen),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SanError {
    #[error("No legal move found for: {0}")]
    NoLegalMove(String),
    #[error("Ambiguous move: {0}")]
    AmbiguousMove(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid file: {0}")]
    InvalidFile(char),
    #[error("Invalid rank: {0}")]
    InvalidRank(char),
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uci::parse_uci_move_on;

    fn board(fen: &str) -> Board {
        fen.parse().unwrap()
    }

    fn san_of(fen: &str, uci: &str) -> String {
        let b = board(fen);
        let mv = parse_uci_move_on(&b, uci).unwrap();
        format_san(&b, mv)
    }

    #[test]
    fn test_format_basic_moves() {
        let start = crate::fen::STARTING_FEN;
        assert_eq!(san_of(start, "e2e4"), "e4");
        assert_eq!(san_of(start, "g1f3"), "Nf3");
    }

    #[test]
    fn test_format_capture_and_check() {
        // 1. e4 d5 2. exd5
        let fen = "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2";
        assert_eq!(san_of(fen, "e4d5"), "exd5");
        // 1. e4 f5 2. Qh5+
        let fen = "rnbqkbnr/ppppp1pp/8/5p2/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2";
        assert_eq!(san_of(fen, "d1h5"), "Qh5+");
    }

    #[test]
    fn test_format_mate() {
        // Fool's mate: 1. f3 e5 2. g4 Qh4#
        let fen = "rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2";
        assert_eq!(san_of(fen, "d8h4"), "Qh4#");
    }

    #[test]
    fn test_format_castling() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        assert_eq!(san_of(fen, "e1g1"), "O-O");
        assert_eq!(san_of(fen, "e1c1"), "O-O-O");
    }

    #[test]
    fn test_format_disambiguation() {
        // Knights on b1 and f3 can both reach d2.
        let fen = "4k3/8/8/8/8/5N2/8/1N2K3 w - - 0 1";
        assert_eq!(san_of(fen, "b1d2"), "Nbd2");
        // Rooks on a1 and a5 can both reach a3.
        let fen = "4k3/8/8/R7/8/8/8/R3K3 w - - 0 1";
        assert_eq!(san_of(fen, "a1a3"), "R1a3");
    }

    #[test]
    fn test_format_promotion() {
        let fen = "8/4P3/8/8/8/8/k7/4K3 w - - 0 1";
        assert_eq!(san_of(fen, "e7e8q"), "e8=Q");
        assert_eq!(san_of(fen, "e7e8n"), "e8=N");
    }

    #[test]
    fn test_parse_san_round_trips_every_legal_move() {
        let b = board("r3k2r/pPpp1ppp/8/4p3/4P3/5N2/P1PP1PPP/R3K2R w KQkq - 0 1");
        for mv in legal_moves(&b) {
            let san = format_san(&b, mv);
            assert_eq!(parse_san(&b, &san), Ok(mv), "round trip failed for {san}");
        }
    }

    #[test]
    fn test_parse_san_tolerates_annotations() {
        let b = Board::default();
        let mv = parse_san(&b, "e4!?").unwrap();
        assert_eq!(format_san(&b, mv), "e4");
        assert!(parse_san(&b, "Nf3+").is_ok());
        assert!(parse_san(&b, "Ngf3").is_ok());
    }

    #[test]
    fn test_parse_san_errors() {
        let b = Board::default();
        assert!(matches!(parse_san(&b, "e5"), Err(SanError::NoLegalMove(_))));
        assert!(matches!(parse_san(&b, "O-O"), Err(SanError::NoLegalMove(_))));
        assert!(matches!(parse_san(&b, ""), Err(SanError::InvalidFormat(_))));
        assert!(matches!(parse_san(&b, "Qz9"), Err(SanError::InvalidSquare(_))));

        let two_knights = board("4k3/8/8/8/8/5N2/8/1N2K3 w - - 0 1");
        assert!(matches!(
            parse_san(&two_knights, "Nd2"),
            Err(SanError::AmbiguousMove(_))
        ));
    }
}
