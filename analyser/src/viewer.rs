//! Displayed position and engine settings for one loaded game.
//!
//! The viewer does not talk to the engine. Every change that alters what is
//! shown, or how it should be analysed, is returned as a [`ViewerEvent`] for
//! the caller to forward to the analysis controller.

use chess::{HistoryEntry, PgnError, PositionHistory};

use crate::config;

/// Whether the engine runs and how deep it searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub enabled: bool,
    pub depth: u32,
}

impl SessionSettings {
    /// Settings with `depth` clamped to the engine's supported range.
    pub fn new(enabled: bool, depth: u32) -> Self {
        Self {
            enabled,
            depth: config::clamp_depth(depth),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::new(false, config::DEFAULT_DEPTH)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerEvent {
    PositionChanged { fen: String },
    SettingsChanged(SessionSettings),
}

#[derive(Debug, Clone, Default)]
pub struct GameViewer {
    history: PositionHistory,
    /// `None` is the initial position, `Some(i)` the position after move `i`.
    cursor: Option<usize>,
    settings: SessionSettings,
}

impl GameViewer {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn history(&self) -> &PositionHistory {
        &self.history
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    pub fn current_fen(&self) -> &str {
        self.cursor
            .and_then(|i| self.history.position(i))
            .unwrap_or_else(|| self.history.initial_fen())
    }

    /// Half-moves played to reach the displayed position.
    pub fn ply(&self) -> usize {
        self.cursor.map_or(0, |i| i + 1)
    }

    /// The move that produced the displayed position.
    pub fn last_move(&self) -> Option<&HistoryEntry> {
        self.cursor.and_then(|i| self.history.entries().get(i))
    }

    /// Replace the game and show its initial position.
    ///
    /// On error the previously loaded game stays in place.
    pub fn load_pgn(&mut self, pgn: &str) -> Result<ViewerEvent, PgnError> {
        let history = PositionHistory::load(pgn)?;
        Ok(self.load_history(history))
    }

    pub fn load_history(&mut self, history: PositionHistory) -> ViewerEvent {
        tracing::debug!(plies = history.len(), "Loaded game");
        self.history = history;
        self.cursor = None;
        self.position_event()
    }

    /// Show the position after move `index` (`None` for the start).
    ///
    /// Indexes past the end stop at the last move. Returns an event only when
    /// the displayed position actually changed.
    pub fn go_to_move(&mut self, index: Option<usize>) -> Option<ViewerEvent> {
        let target = match index {
            Some(_) if self.history.is_empty() => None,
            Some(i) => Some(i.min(self.history.len() - 1)),
            None => None,
        };
        if target == self.cursor {
            return None;
        }
        self.cursor = target;
        Some(self.position_event())
    }

    pub fn next_move(&mut self) -> Option<ViewerEvent> {
        let next = self.cursor.map_or(0, |i| i + 1);
        if next >= self.history.len() {
            return None;
        }
        self.go_to_move(Some(next))
    }

    /// Step back one move; from the first move this returns to the start.
    pub fn previous_move(&mut self) -> Option<ViewerEvent> {
        match self.cursor {
            None => None,
            Some(0) => self.go_to_move(None),
            Some(i) => self.go_to_move(Some(i - 1)),
        }
    }

    pub fn reset(&mut self) -> Option<ViewerEvent> {
        self.go_to_move(None)
    }

    pub fn set_settings(&mut self, settings: SessionSettings) -> Option<ViewerEvent> {
        let settings = SessionSettings::new(settings.enabled, settings.depth);
        if settings == self.settings {
            return None;
        }
        self.settings = settings;
        Some(ViewerEvent::SettingsChanged(settings))
    }

    fn position_event(&self) -> ViewerEvent {
        ViewerEvent::PositionChanged {
            fen: self.current_fen().to_string(),
        }
    }
}
