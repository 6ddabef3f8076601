use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One side of a game as reported by chess.com.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub username: String,
    #[serde(default)]
    pub rating: u32,
    /// chess.com result code: `win`, `checkmated`, `resigned`, `agreed`, ...
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub uuid: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Accuracies {
    pub white: f64,
    pub black: f64,
}

/// A finished game, as stored locally and as returned by the archive API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub uuid: String,
    #[serde(default)]
    pub url: String,
    pub pgn: String,
    #[serde(default)]
    pub tcn: Option<String>,
    /// Final position.
    #[serde(default)]
    pub fen: String,
    #[serde(default)]
    pub time_class: String,
    #[serde(default)]
    pub time_control: String,
    #[serde(default = "default_rules")]
    pub rules: String,
    #[serde(default)]
    pub rated: bool,
    /// Unix seconds.
    #[serde(default)]
    pub end_time: i64,
    #[serde(default)]
    pub accuracies: Option<Accuracies>,
    pub white: Player,
    pub black: Player,
    /// Local flag, never sent by the API.
    #[serde(default)]
    pub starred: bool,
}

fn default_rules() -> String {
    "chess".to_string()
}

impl Game {
    /// Number of full moves, read from the last move number in the PGN.
    pub fn move_count(&self) -> u32 {
        self.pgn
            .split_whitespace()
            .rev()
            .find_map(|token| {
                let digits = token.strip_suffix('.')?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                digits.parse().ok()
            })
            .unwrap_or(0)
    }

    /// `alice (1510) vs bob (1492)`
    pub fn players_label(&self) -> String {
        format!(
            "{} ({}) vs {} ({})",
            self.white.username, self.white.rating, self.black.username, self.black.rating
        )
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.end_time, 0)
    }

    /// `1-0`, `0-1` or `1/2-1/2` from the players' result codes.
    pub fn score_label(&self) -> &'static str {
        match (self.white.result.as_str(), self.black.result.as_str()) {
            ("win", _) => "1-0",
            (_, "win") => "0-1",
            _ => "1/2-1/2",
        }
    }
}

/// Body of `GET /pub/player/{user}/games/{yyyy}/{mm}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonthlyArchive {
    #[serde(default)]
    pub games: Vec<Game>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../tests/fixtures/chesscom_archive.json");

    fn fixture_games() -> Vec<Game> {
        serde_json::from_str::<MonthlyArchive>(FIXTURE).unwrap().games
    }

    #[test]
    fn test_decode_archive() {
        let games = fixture_games();
        assert_eq!(games.len(), 2);

        let first = &games[0];
        assert_eq!(first.uuid, "0b6f8c3e-d8e1-11ee-8a51-6cfe544c0428");
        assert_eq!(first.white.username, "alice");
        assert_eq!(first.black.result, "checkmated");
        assert_eq!(first.accuracies.map(|a| a.white), Some(91.2));
        assert_eq!(first.tcn.as_deref(), Some("mC0Kgv5Qlt!Tvx"));
        assert!(!first.starred);

        let second = &games[1];
        assert!(second.accuracies.is_none());
        assert!(second.tcn.is_none());
        assert!(!second.rated);
    }

    #[test]
    fn test_move_count() {
        let games = fixture_games();
        // Chess.com writes `2...` for black moves, which must not count.
        assert_eq!(games[0].move_count(), 4);
        assert_eq!(games[1].move_count(), 3);

        let mut empty = games[1].clone();
        empty.pgn = "[Event \"x\"]".to_string();
        assert_eq!(empty.move_count(), 0);
    }

    #[test]
    fn test_labels() {
        let games = fixture_games();
        assert_eq!(games[0].players_label(), "alice (1510) vs bob (1492)");
        assert_eq!(games[0].score_label(), "1-0");
        assert_eq!(games[1].score_label(), "1/2-1/2");
        assert_eq!(
            games[0].ended_at().map(|d| d.format("%Y-%m-%d").to_string()),
            Some("2024-03-02".to_string())
        );
    }

    #[test]
    fn test_starred_round_trips() {
        let mut game = fixture_games().remove(0);
        game.starred = true;
        let json = serde_json::to_string(&game).unwrap();
        let back: Game = serde_json::from_str(&json).unwrap();
        assert_eq!(back, game);
    }
}
