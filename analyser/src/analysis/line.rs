use chess::{AnalysisScore, Color};
use engine::{EngineMessage, Wdl};

/// One multi-PV line ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisLine {
    /// 1-based multi-PV rank.
    pub rank: u32,
    pub depth: u32,
    /// Score from the side to move.
    pub score: Option<AnalysisScore>,
    pub wdl: Option<Wdl>,
    /// Principal variation in UCI notation, as sent by the engine.
    pub pv: Vec<String>,
    /// The legal prefix of `pv`, in SAN.
    pub san_pv: Vec<String>,
    side_to_move: Color,
}

impl AnalysisLine {
    /// Build a line from engine output for the position `fen`.
    pub fn from_message(message: &EngineMessage, fen: &str) -> Self {
        Self {
            rank: message.multipv,
            depth: message.depth,
            score: message.score(),
            wdl: message.wdl,
            pv: message.pv.clone(),
            san_pv: chess::translate_pv(fen, message.pv.as_slice()),
            side_to_move: chess::analysis::side_to_move(fen).unwrap_or(Color::White),
        }
    }

    /// The score seen from White, for evaluation bars.
    pub fn white_score(&self) -> Option<AnalysisScore> {
        self.score.map(|s| s.for_white(self.side_to_move))
    }

    /// `+0.34`, `-M2`, or `?` when the engine gave no score yet.
    pub fn score_text(&self) -> String {
        self.white_score()
            .map_or_else(|| "?".to_string(), |s| s.display())
    }

    /// Move-numbered SAN, e.g. `12... Nf6 13. Bxf6 gxf6`.
    pub fn numbered_pv(&self, fullmove: u32) -> String {
        let mut out = String::new();
        let mut number = fullmove.max(1);
        let mut white = self.side_to_move == Color::White;

        for (i, san) in self.san_pv.iter().enumerate() {
            if !out.is_empty() {
                out.push(' ');
            }
            if white {
                out.push_str(&format!("{}. ", number));
            } else if i == 0 {
                out.push_str(&format!("{}... ", number));
            }
            out.push_str(san);
            if !white {
                number += 1;
            }
            white = !white;
        }
        out
    }
}

impl std::fmt::Display for AnalysisLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}. [{:>6}] d{:<2} {}",
            self.rank,
            self.score_text(),
            self.depth,
            self.san_pv.join(" ")
        )?;
        if let Some(wdl) = self.wdl {
            write!(f, "  (W {} D {} L {})", wdl.win, wdl.draw, wdl.loss)?;
        }
        Ok(())
    }
}
