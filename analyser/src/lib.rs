//! Game viewer and live engine analysis for stored chess games.

pub mod analysis;
pub mod config;
pub mod viewer;

pub use analysis::{spawn_analysis, AnalysisEvent, AnalysisHandle, AnalysisLine};
pub use viewer::{GameViewer, SessionSettings, ViewerEvent};
