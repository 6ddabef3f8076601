//! Evaluation scores and their display forms.

use cozy_chess::Color;
use serde::{Deserialize, Serialize};

/// Centipawn value at which the evaluation bar is pinned to one side.
const EVAL_BAR_RANGE_CP: f64 = 1000.0;

/// Engine evaluation score.
///
/// Centipawns: positive = side-to-move is better.
/// Mate: positive N = side-to-move mates in N moves,
/// negative N = side-to-move gets mated in N moves,
/// 0 = side-to-move is already checkmated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisScore {
    Centipawns(i32),
    Mate(i32),
    /// The other side is checkmated. `Mate(0)` seen from the winner.
    Checkmate,
}

impl AnalysisScore {
    pub fn display(&self) -> String {
        match self {
            Self::Centipawns(cp) => format!("{:+.2}", *cp as f64 / 100.0),
            Self::Mate(m) => {
                if *m > 0 {
                    format!("+M{}", m)
                } else {
                    format!("-M{}", m.abs())
                }
            }
            Self::Checkmate => "+M0".to_string(),
        }
    }

    /// Negate the score (flip perspective).
    pub fn negate(&self) -> Self {
        match self {
            Self::Centipawns(cp) => Self::Centipawns(-cp),
            Self::Mate(0) => Self::Checkmate,
            Self::Mate(m) => Self::Mate(-m),
            Self::Checkmate => Self::Mate(0),
        }
    }

    /// Re-express a side-to-move score from White's point of view.
    pub fn for_white(&self, side_to_move: Color) -> Self {
        match side_to_move {
            Color::White => *self,
            Color::Black => self.negate(),
        }
    }

    /// Fill of a White-perspective evaluation bar, in percent.
    ///
    /// ±10 pawns reach the ends; mate scores pin to 0 or 100.
    pub fn eval_bar_percent(&self) -> f64 {
        match self {
            Self::Centipawns(cp) => {
                ((*cp as f64 + EVAL_BAR_RANGE_CP) / (2.0 * EVAL_BAR_RANGE_CP) * 100.0)
                    .clamp(0.0, 100.0)
            }
            Self::Mate(m) if *m > 0 => 100.0,
            Self::Mate(_) => 0.0,
            Self::Checkmate => 100.0,
        }
    }
}

impl std::fmt::Display for AnalysisScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Side to move in a FEN, if the FEN parses.
pub fn side_to_move(fen: &str) -> Option<Color> {
    crate::fen::parse_fen(fen).ok().map(|b| b.side_to_move())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(AnalysisScore::Centipawns(34).to_string(), "+0.34");
        assert_eq!(AnalysisScore::Centipawns(-120).to_string(), "-1.20");
        assert_eq!(AnalysisScore::Centipawns(0).to_string(), "+0.00");
        assert_eq!(AnalysisScore::Mate(3).to_string(), "+M3");
        assert_eq!(AnalysisScore::Mate(-2).to_string(), "-M2");
    }

    #[test]
    fn test_for_white() {
        let s = AnalysisScore::Centipawns(50);
        assert_eq!(s.for_white(Color::White), s);
        assert_eq!(s.for_white(Color::Black), AnalysisScore::Centipawns(-50));
        assert_eq!(
            AnalysisScore::Mate(2).for_white(Color::Black),
            AnalysisScore::Mate(-2)
        );
    }

    #[test]
    fn test_mated_side_to_move_flips_to_winner() {
        let mated = AnalysisScore::Mate(0);
        assert_eq!(mated.for_white(Color::White), mated);
        assert_eq!(mated.to_string(), "-M0");
        assert_eq!(mated.eval_bar_percent(), 0.0);

        let white_won = mated.for_white(Color::Black);
        assert_eq!(white_won, AnalysisScore::Checkmate);
        assert_eq!(white_won.to_string(), "+M0");
        assert_eq!(white_won.eval_bar_percent(), 100.0);
        assert_eq!(white_won.negate(), mated);
    }

    #[test]
    fn test_eval_bar_percent() {
        assert_eq!(AnalysisScore::Centipawns(0).eval_bar_percent(), 50.0);
        assert_eq!(AnalysisScore::Centipawns(500).eval_bar_percent(), 75.0);
        assert_eq!(AnalysisScore::Centipawns(-1000).eval_bar_percent(), 0.0);
        assert_eq!(AnalysisScore::Centipawns(4000).eval_bar_percent(), 100.0);
        assert_eq!(AnalysisScore::Mate(3).eval_bar_percent(), 100.0);
        assert_eq!(AnalysisScore::Mate(-3).eval_bar_percent(), 0.0);
    }

    #[test]
    fn test_side_to_move() {
        assert_eq!(side_to_move(crate::fen::STARTING_FEN), Some(Color::White));
        assert_eq!(side_to_move("nope"), None);
    }
}
