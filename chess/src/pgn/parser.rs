use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

/// A PGN game split into tags and raw SAN tokens. Moves are not validated
/// here; [`crate::PositionHistory::load`] replays them against a board.
#[derive(Debug, Clone, Default)]
pub struct PgnGame {
    pub tags: HashMap<String, String>,
    pub moves: Vec<PgnMove>,
    pub result: GameResult,
}

/// A single move in PGN with metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgnMove {
    pub san: String,
    pub comment: Option<String>,
    /// Remaining clock from a `[%clk h:mm:ss]` annotation.
    pub clock: Option<String>,
    pub nags: Vec<u8>, // Numeric Annotation Glyphs (!!, ?, etc.)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    #[default]
    Ongoing,
}

impl GameResult {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "1-0" => Some(Self::WhiteWins),
            "0-1" => Some(Self::BlackWins),
            "1/2-1/2" => Some(Self::Draw),
            "*" => Some(Self::Ongoing),
            _ => None,
        }
    }
}

/// Parse the first game of a PGN document.
///
/// Comments, line comments, NAGs and recursive variations are consumed;
/// parsing stops at the first result token.
pub fn parse_pgn(input: &str) -> Result<PgnGame, PgnError> {
    let mut game = PgnGame::default();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '[' => {
                let (name, value) = read_tag(&mut chars)?;
                game.tags.insert(name, value);
            }
            '{' => {
                let body = take_until(&mut chars, '}').ok_or(PgnError::UnterminatedComment)?;
                if let Some(last) = game.moves.last_mut() {
                    if let Some(clock) = extract_clock(&body) {
                        last.clock = Some(clock);
                    }
                    let text = body.trim();
                    if !text.is_empty() {
                        last.comment = Some(text.to_string());
                    }
                }
            }
            ';' => {
                for n in chars.by_ref() {
                    if n == '\n' {
                        break;
                    }
                }
            }
            '(' => skip_variation(&mut chars)?,
            ')' => return Err(PgnError::UnbalancedVariation),
            '$' => {
                let digits = take_while(&mut chars, |n| n.is_ascii_digit());
                let nag = digits
                    .parse()
                    .map_err(|_| PgnError::InvalidToken(format!("${}", digits)))?;
                if let Some(last) = game.moves.last_mut() {
                    last.nags.push(nag);
                }
            }
            c if c.is_whitespace() => {}
            c => {
                let mut token = String::from(c);
                token.push_str(&take_while(&mut chars, |n| {
                    !n.is_whitespace() && !"{}()[];$".contains(n)
                }));

                if let Some(result) = GameResult::from_token(&token) {
                    game.result = result;
                    break;
                }

                if let Some(san) = strip_move_number(&token) {
                    game.moves.push(PgnMove {
                        san: san.to_string(),
                        ..Default::default()
                    });
                }
            }
        }
    }

    Ok(game)
}

/// Remove a leading move number (`12.`, `12...`, `1.e4`). Returns `None` for
/// a bare move number.
fn strip_move_number(token: &str) -> Option<&str> {
    if token.starts_with("0-0") {
        return Some(token);
    }
    let rest = token.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() == token.len() {
        return Some(token);
    }
    let rest = rest.trim_start_matches('.');
    (!rest.is_empty()).then_some(rest)
}

fn take_while(chars: &mut Peekable<Chars<'_>>, pred: impl Fn(char) -> bool) -> String {
    let mut out = String::new();
    while let Some(&n) = chars.peek() {
        if !pred(n) {
            break;
        }
        out.push(n);
        chars.next();
    }
    out
}

fn take_until(chars: &mut Peekable<Chars<'_>>, end: char) -> Option<String> {
    let mut out = String::new();
    for c in chars.by_ref() {
        if c == end {
            return Some(out);
        }
        out.push(c);
    }
    None
}

/// Read `Name "Value"]` after the opening bracket.
fn read_tag(chars: &mut Peekable<Chars<'_>>) -> Result<(String, String), PgnError> {
    let mut raw = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    loop {
        let c = chars.next().ok_or(PgnError::UnterminatedTag)?;
        if escaped {
            raw.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => {
                in_quotes = !in_quotes;
                raw.push(c);
            }
            ']' if !in_quotes => break,
            _ => raw.push(c),
        }
    }

    let raw = raw.trim();
    let (name, value) = raw
        .split_once(char::is_whitespace)
        .ok_or_else(|| PgnError::InvalidTag(raw.to_string()))?;
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or_else(|| PgnError::InvalidTag(raw.to_string()))?;

    Ok((name.to_string(), value.to_string()))
}

fn skip_variation(chars: &mut Peekable<Chars<'_>>) -> Result<(), PgnError> {
    let mut depth = 1usize;
    while let Some(c) = chars.next() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            '{' => {
                take_until(chars, '}').ok_or(PgnError::UnterminatedComment)?;
            }
            _ => {}
        }
    }
    Err(PgnError::UnbalancedVariation)
}

/// Pull the value out of a `[%clk 0:02:59.9]` command inside a comment.
fn extract_clock(comment: &str) -> Option<String> {
    let start = comment.find("[%clk")? + "[%clk".len();
    let rest = &comment[start..];
    let end = rest.find(']')?;
    let value = rest[..end].trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PgnError {
    #[error("Invalid tag: {0}")]
    InvalidTag(String),
    #[error("Unterminated tag")]
    UnterminatedTag,
    #[error("Unterminated comment")]
    UnterminatedComment,
    #[error("Unbalanced variation")]
    UnbalancedVariation,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Invalid notation at ply {ply}: {token} ({reason})")]
    InvalidNotation {
        ply: usize,
        token: String,
        reason: super::san::SanError,
    },
    #[error("Invalid starting position: {0}")]
    InvalidStart(#[from] crate::fen::FenError),
}
