//! Live engine analysis of the displayed position.
//!
//! An actor task owns the [`engine::EngineSession`]. Viewer changes arrive as
//! commands through an [`AnalysisHandle`]; engine output leaves as
//! [`AnalysisEvent`]s on a broadcast channel.

mod actor;
pub mod commands;
pub mod events;
pub mod handle;
pub mod line;

use engine::EngineLauncher;
use tokio::sync::{broadcast, mpsc};

use actor::{run_analysis_actor, AnalysisState};
pub use commands::AnalysisError;
pub use events::{AnalysisEvent, AnalysisSnapshot};
pub use handle::AnalysisHandle;
pub use line::AnalysisLine;

/// Start an analysis actor. Analysis stays disabled until settings enabling
/// it arrive; each enable launches a fresh engine through `launcher`.
pub fn spawn_analysis<L: EngineLauncher + Clone>(launcher: L, multipv: usize) -> AnalysisHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (event_tx, _) = broadcast::channel(100);

    let state = AnalysisState::new(launcher, multipv);
    tokio::spawn(run_analysis_actor(state, cmd_rx, event_tx));

    AnalysisHandle::new(cmd_tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::{GameViewer, SessionSettings};
    use chess::STARTING_FEN;
    use engine::channel::mock::{MemoryEngine, MemoryLauncher};
    use engine::SessionState;
    use std::time::Duration;

    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

    async fn next_event(rx: &mut broadcast::Receiver<AnalysisEvent>) -> AnalysisEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    async fn wait_for<F>(rx: &mut broadcast::Receiver<AnalysisEvent>, pred: F) -> AnalysisEvent
    where
        F: Fn(&AnalysisEvent) -> bool,
    {
        loop {
            let event = next_event(rx).await;
            if pred(&event) {
                return event;
            }
        }
    }

    fn has_lines(event: &AnalysisEvent) -> bool {
        matches!(event, AnalysisEvent::Lines(lines) if !lines.is_empty())
    }

    /// Analysis enabled at `depth` on the starting position, handshake done.
    async fn ready_session(
        depth: u32,
    ) -> (
        AnalysisHandle,
        MemoryEngine,
        broadcast::Receiver<AnalysisEvent>,
    ) {
        let launcher = MemoryLauncher::new();
        let handle = spawn_analysis(launcher.clone(), 3);
        let (_, mut rx) = handle.subscribe().await.unwrap();

        handle.position_changed(STARTING_FEN).await.unwrap();
        handle
            .settings_changed(SessionSettings::new(true, depth))
            .await
            .unwrap();
        let engine = launcher.take_engine().unwrap();
        engine.reply("uciok");
        engine.reply("readyok");
        assert_eq!(next_event(&mut rx).await, AnalysisEvent::Ready);
        (handle, engine, rx)
    }

    #[tokio::test]
    async fn test_disabled_does_not_launch() {
        let launcher = MemoryLauncher::new();
        let handle = spawn_analysis(launcher.clone(), 3);

        assert_eq!(handle.position_changed(STARTING_FEN).await.unwrap(), None);
        assert_eq!(launcher.launches(), 0);

        let (snapshot, _) = handle.subscribe().await.unwrap();
        assert_eq!(snapshot.state, None);
        assert_eq!(snapshot.fen.as_deref(), Some(STARTING_FEN));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_fen_is_rejected() {
        let handle = spawn_analysis(MemoryLauncher::new(), 3);
        let err = handle.position_changed("not a position").await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidFen(_)));

        let (snapshot, _) = handle.subscribe().await.unwrap();
        assert_eq!(snapshot.fen, None);
    }

    #[tokio::test]
    async fn test_enable_handshakes_then_searches_held_position() {
        let launcher = MemoryLauncher::new();
        let handle = spawn_analysis(launcher.clone(), 3);
        let (_, mut rx) = handle.subscribe().await.unwrap();

        handle.position_changed(STARTING_FEN).await.unwrap();
        handle
            .settings_changed(SessionSettings::new(true, 12))
            .await
            .unwrap();
        assert_eq!(launcher.launches(), 1);

        let engine = launcher.take_engine().unwrap();
        assert_eq!(
            engine.take_sent(),
            vec![
                "uci",
                "setoption name MultiPV value 3",
                "setoption name UCI_showWDL value true",
                "isready",
            ]
        );

        let (snapshot, _) = handle.subscribe().await.unwrap();
        assert_eq!(snapshot.state, Some(SessionState::Initializing));

        engine.reply("uciok");
        engine.reply("readyok");
        assert_eq!(next_event(&mut rx).await, AnalysisEvent::Ready);
        assert_eq!(
            engine.take_sent(),
            vec![format!("position fen {}", STARTING_FEN), "go depth 12".to_string()]
        );
    }

    #[tokio::test]
    async fn test_lines_then_best_move() {
        let (handle, engine, mut rx) = ready_session(12).await;

        engine.reply("info depth 8 multipv 1 score cp 25 pv e2e4 e7e5");
        engine.reply("info depth 8 multipv 2 score cp 18 pv d2d4");
        let event = wait_for(&mut rx, has_lines).await;
        let AnalysisEvent::Lines(lines) = event else {
            unreachable!()
        };
        assert_eq!(lines[0].rank, 1);
        assert_eq!(lines[0].san_pv, vec!["e4", "e5"]);
        assert_eq!(lines[0].score_text(), "+0.25");

        let event = wait_for(&mut rx, |e| matches!(e, AnalysisEvent::Lines(l) if l.len() == 2)).await;
        let AnalysisEvent::Lines(lines) = event else {
            unreachable!()
        };
        assert_eq!(lines[1].san_pv, vec!["d4"]);

        engine.reply("bestmove e2e4 ponder e7e5");
        let event = wait_for(&mut rx, |e| matches!(e, AnalysisEvent::BestMove { .. })).await;
        assert_eq!(
            event,
            AnalysisEvent::BestMove {
                best_move: "e2e4".to_string(),
                ponder: Some("e7e5".to_string()),
            }
        );

        let (snapshot, _) = handle.subscribe().await.unwrap();
        assert_eq!(snapshot.state, Some(SessionState::Ready));
        assert_eq!(snapshot.lines.len(), 2);
    }

    #[tokio::test]
    async fn test_new_position_supersedes_search() {
        let (handle, engine, mut rx) = ready_session(12).await;
        engine.take_sent();

        let id = handle.position_changed(AFTER_E4).await.unwrap();
        assert!(id.is_some());
        assert_eq!(
            engine.take_sent(),
            vec![
                "stop".to_string(),
                format!("position fen {}", AFTER_E4),
                "go depth 12".to_string(),
            ]
        );

        // Output of the stopped search is ignored.
        engine.reply("info depth 9 multipv 1 score cp 30 pv e2e4");
        engine.reply("bestmove e2e4");
        engine.reply("info depth 4 multipv 1 score cp 20 pv e7e5");

        let event = wait_for(&mut rx, |e| {
            has_lines(e) || matches!(e, AnalysisEvent::BestMove { .. })
        })
        .await;
        let AnalysisEvent::Lines(lines) = event else {
            panic!("unexpected event: {event:?}");
        };
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].san_pv, vec!["e5"]);
        assert_eq!(lines[0].score_text(), "-0.20");
    }

    #[tokio::test]
    async fn test_depth_change_reissues_search() {
        let (handle, engine, _rx) = ready_session(12).await;
        engine.take_sent();

        handle
            .settings_changed(SessionSettings::new(true, 20))
            .await
            .unwrap();
        let sent = engine.take_sent();
        assert_eq!(sent.last().map(String::as_str), Some("go depth 20"));
    }

    #[tokio::test]
    async fn test_disable_terminates_engine() {
        let (handle, engine, _rx) = ready_session(12).await;

        handle
            .settings_changed(SessionSettings::new(false, 12))
            .await
            .unwrap();
        assert!(engine.is_closed());
        assert_eq!(engine.sent().last().map(String::as_str), Some("quit"));

        let (snapshot, _) = handle.subscribe().await.unwrap();
        assert_eq!(snapshot.state, None);
        assert_eq!(handle.position_changed(AFTER_E4).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reenable_launches_fresh_engine() {
        let launcher = MemoryLauncher::new();
        let handle = spawn_analysis(launcher.clone(), 2);
        handle
            .settings_changed(SessionSettings::new(true, 10))
            .await
            .unwrap();
        handle
            .settings_changed(SessionSettings::new(false, 10))
            .await
            .unwrap();
        handle
            .settings_changed(SessionSettings::new(true, 10))
            .await
            .unwrap();
        assert_eq!(launcher.launches(), 2);
    }

    #[tokio::test]
    async fn test_launch_failure_is_reported() {
        let handle = spawn_analysis(MemoryLauncher::failing("stockfish not found"), 3);
        let (_, mut rx) = handle.subscribe().await.unwrap();

        let err = handle
            .settings_changed(SessionSettings::new(true, 12))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Unavailable(ref r) if r == "stockfish not found"));
        assert_eq!(
            next_event(&mut rx).await,
            AnalysisEvent::Unavailable("stockfish not found".to_string())
        );

        assert_eq!(handle.position_changed(STARTING_FEN).await.unwrap(), None);
        let (snapshot, _) = handle.subscribe().await.unwrap();
        assert_eq!(snapshot.state, Some(SessionState::Unavailable));
    }

    #[tokio::test]
    async fn test_engine_exit_is_reported() {
        let (handle, engine, mut rx) = ready_session(12).await;
        drop(engine);

        let event = wait_for(&mut rx, |e| matches!(e, AnalysisEvent::Unavailable(_))).await;
        assert_eq!(event, AnalysisEvent::Unavailable("engine exited".to_string()));
        assert_eq!(handle.position_changed(AFTER_E4).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_viewer_events_drive_analysis() {
        let launcher = MemoryLauncher::new();
        let handle = spawn_analysis(launcher.clone(), 1);
        let mut viewer = GameViewer::default();

        handle.apply(viewer.load_pgn("1. e4 e5 *").unwrap()).await.unwrap();
        let enable = viewer
            .set_settings(SessionSettings::new(true, 6))
            .unwrap();
        handle.apply(enable).await.unwrap();

        let (_, mut rx) = handle.subscribe().await.unwrap();
        let engine = launcher.take_engine().unwrap();
        engine.reply("readyok");
        wait_for(&mut rx, |e| matches!(e, AnalysisEvent::Lines(_))).await;
        engine.take_sent();

        handle.apply(viewer.next_move().unwrap()).await.unwrap();
        let sent = engine.take_sent();
        assert_eq!(sent[1], format!("position fen {}", viewer.current_fen()));
        assert_eq!(sent[2], "go depth 6");
    }
}
