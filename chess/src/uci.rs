//! UCI (Universal Chess Interface) move notation helpers.
//!
//! Engines speak coordinate notation (`e2e4`, `e7e8q`). cozy-chess encodes
//! castling as the king capturing its own rook (`e1h1`), so moves coming from
//! an engine have to be normalised against the position before use.

use cozy_chess::{Board, File, Move, Piece, Rank, Square};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UciMoveError {
    #[error("Invalid move: {0}")]
    InvalidMove(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
}

/// Parse UCI move format (e2e4, e7e8q)
pub fn parse_uci_move(s: &str) -> Result<Move, UciMoveError> {
    if !s.is_ascii() || !(4..=5).contains(&s.len()) {
        return Err(UciMoveError::InvalidMove(s.to_string()));
    }

    let from = parse_square(&s[0..2])?;
    let to = parse_square(&s[2..4])?;

    let promotion = match s.get(4..5) {
        Some(p) => Some(parse_promotion(p).ok_or_else(|| UciMoveError::InvalidPromotion(s.to_string()))?),
        None => None,
    };

    Ok(Move {
        from,
        to,
        promotion,
    })
}

fn parse_promotion(s: &str) -> Option<Piece> {
    match s {
        "q" | "Q" => Some(Piece::Queen),
        "r" | "R" => Some(Piece::Rook),
        "b" | "B" => Some(Piece::Bishop),
        "n" | "N" => Some(Piece::Knight),
        _ => None,
    }
}

/// Parse an algebraic square such as `e4`.
pub fn parse_square(s: &str) -> Result<Square, UciMoveError> {
    let mut chars = s.chars();
    let (Some(f), Some(r), None) = (chars.next(), chars.next(), chars.next()) else {
        return Err(UciMoveError::InvalidSquare(s.to_string()));
    };

    let file = parse_file(f).ok_or_else(|| UciMoveError::InvalidSquare(s.to_string()))?;
    let rank = parse_rank(r).ok_or_else(|| UciMoveError::InvalidSquare(s.to_string()))?;
    Ok(Square::new(file, rank))
}

pub(crate) fn parse_file(c: char) -> Option<File> {
    Some(match c {
        'a' => File::A,
        'b' => File::B,
        'c' => File::C,
        'd' => File::D,
        'e' => File::E,
        'f' => File::F,
        'g' => File::G,
        'h' => File::H,
        _ => return None,
    })
}

pub(crate) fn parse_rank(c: char) -> Option<Rank> {
    Some(match c {
        '1' => Rank::First,
        '2' => Rank::Second,
        '3' => Rank::Third,
        '4' => Rank::Fourth,
        '5' => Rank::Fifth,
        '6' => Rank::Sixth,
        '7' => Rank::Seventh,
        '8' => Rank::Eighth,
        _ => return None,
    })
}

pub(crate) fn file_char(file: File) -> char {
    match file {
        File::A => 'a',
        File::B => 'b',
        File::C => 'c',
        File::D => 'd',
        File::E => 'e',
        File::F => 'f',
        File::G => 'g',
        File::H => 'h',
    }
}

pub(crate) fn rank_char(rank: Rank) -> char {
    match rank {
        Rank::First => '1',
        Rank::Second => '2',
        Rank::Third => '3',
        Rank::Fourth => '4',
        Rank::Fifth => '5',
        Rank::Sixth => '6',
        Rank::Seventh => '7',
        Rank::Eighth => '8',
    }
}

pub fn format_square(sq: Square) -> String {
    format!("{}{}", file_char(sq.file()), rank_char(sq.rank()))
}

/// Format a move in UCI notation (e.g., "e2e4", "e7e8q")
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(match promo {
            Piece::Queen => 'q',
            Piece::Rook => 'r',
            Piece::Bishop => 'b',
            Piece::Knight => 'n',
            Piece::Pawn | Piece::King => '?',
        });
    }
    s
}

/// Convert UCI castling notation to cozy_chess notation.
///
/// UCI moves the king two squares (e1g1, e1c1, e8g8, e8c8); cozy_chess moves
/// the king onto its rook (e1h1, e1a1, e8h8, e8a8). Anything that is not a
/// legal castle in `board` is returned unchanged.
pub fn normalize_castling(board: &Board, mv: Move) -> Move {
    if mv.promotion.is_some() || board.piece_on(mv.from) != Some(Piece::King) {
        return mv;
    }
    if mv.from.file() != File::E || !matches!(mv.from.rank(), Rank::First | Rank::Eighth) {
        return mv;
    }

    let rook_file = match mv.to.file() {
        File::G => File::H,
        File::C => File::A,
        _ => return mv,
    };
    if mv.to.rank() != mv.from.rank() {
        return mv;
    }

    let converted = Move {
        from: mv.from,
        to: Square::new(rook_file, mv.from.rank()),
        promotion: None,
    };

    if board.is_legal(converted) {
        converted
    } else {
        mv
    }
}

/// Parse a UCI move and resolve it against `board`.
pub fn parse_uci_move_on(board: &Board, s: &str) -> Result<Move, UciMoveError> {
    parse_uci_move(s).map(|mv| normalize_castling(board, mv))
}
