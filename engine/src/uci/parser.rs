use chess::AnalysisScore;

/// Win/draw/loss statistics in permille, from the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wdl {
    pub win: u32,
    pub draw: u32,
    pub loss: u32,
}

/// One line of engine output, decomposed into optional fields.
///
/// Every line produces a message; a line without any recognised marker
/// (`readyok`, `id name ...`, garbage) simply leaves the fields unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineMessage {
    pub raw: String,
    pub best_move: Option<String>,
    pub ponder: Option<String>,
    pub centipawns: Option<i32>,
    pub mate: Option<i32>,
    /// Principal variation in UCI move notation.
    pub pv: Vec<String>,
    /// Depth reached, 0 when absent.
    pub depth: u32,
    /// 1-based multi-PV rank, 1 when absent.
    pub multipv: u32,
    pub wdl: Option<Wdl>,
}

impl EngineMessage {
    pub fn is_ready_ok(&self) -> bool {
        self.raw.trim() == "readyok"
    }

    pub fn is_best_move(&self) -> bool {
        self.best_move.is_some()
    }

    /// True for search output that carries a score or a variation.
    pub fn is_evaluation(&self) -> bool {
        self.best_move.is_none()
            && (self.centipawns.is_some() || self.mate.is_some() || !self.pv.is_empty())
    }

    /// Score from the side to move. Mate wins over centipawns when a line
    /// carries both.
    pub fn score(&self) -> Option<AnalysisScore> {
        self.mate
            .map(AnalysisScore::Mate)
            .or(self.centipawns.map(AnalysisScore::Centipawns))
    }

    /// The variation as a space separated string.
    pub fn pv_text(&self) -> String {
        self.pv.join(" ")
    }
}

/// Parse one raw engine line. Never fails.
pub fn parse_engine_line(line: &str) -> EngineMessage {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    EngineMessage {
        raw: line.trim_end().to_string(),
        best_move: parse_best_move(&tokens),
        ponder: parse_ponder(&tokens),
        centipawns: parse_centipawns(&tokens),
        mate: parse_mate(&tokens),
        pv: parse_pv(&tokens),
        depth: parse_depth(&tokens),
        multipv: parse_multipv(&tokens),
        wdl: parse_wdl(&tokens),
    }
}

fn marker_index(tokens: &[&str], marker: &str) -> Option<usize> {
    tokens.iter().position(|t| *t == marker)
}

/// The token immediately following the first `marker`.
fn token_after<'a>(tokens: &[&'a str], marker: &str) -> Option<&'a str> {
    marker_index(tokens, marker).and_then(|i| tokens.get(i + 1).copied())
}

fn parse_best_move(tokens: &[&str]) -> Option<String> {
    token_after(tokens, "bestmove").map(str::to_string)
}

fn parse_ponder(tokens: &[&str]) -> Option<String> {
    token_after(tokens, "ponder").map(str::to_string)
}

fn parse_centipawns(tokens: &[&str]) -> Option<i32> {
    token_after(tokens, "cp").and_then(|t| t.parse().ok())
}

fn parse_mate(tokens: &[&str]) -> Option<i32> {
    token_after(tokens, "mate").and_then(|t| t.parse().ok())
}

fn parse_pv(tokens: &[&str]) -> Vec<String> {
    match marker_index(tokens, "pv") {
        Some(i) => tokens[i + 1..].iter().map(|t| t.to_string()).collect(),
        None => Vec::new(),
    }
}

fn parse_depth(tokens: &[&str]) -> u32 {
    token_after(tokens, "depth")
        .and_then(|t| t.parse().ok())
        .unwrap_or(0)
}

fn parse_multipv(tokens: &[&str]) -> u32 {
    token_after(tokens, "multipv")
        .and_then(|t| t.parse().ok())
        .unwrap_or(1)
}

fn parse_wdl(tokens: &[&str]) -> Option<Wdl> {
    let i = marker_index(tokens, "wdl")?;
    let mut values = tokens.get(i + 1..i + 4)?.iter().map(|t| t.parse::<u32>());
    match (values.next(), values.next(), values.next()) {
        (Some(Ok(win)), Some(Ok(draw)), Some(Ok(loss))) => Some(Wdl { win, draw, loss }),
        _ => None,
    }
}
