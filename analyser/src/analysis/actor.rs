use engine::{EngineLauncher, EngineSession, RequestId, SessionState};
use tokio::sync::{broadcast, mpsc};
use tracing::Instrument;

use super::commands::*;
use super::events::{AnalysisEvent, AnalysisSnapshot};
use super::line::AnalysisLine;
use crate::viewer::SessionSettings;

/// Everything the actor owns. Only the actor task touches it.
pub(crate) struct AnalysisState<L: EngineLauncher + Clone> {
    launcher: L,
    multipv: usize,
    settings: SessionSettings,
    /// Last position the viewer displayed.
    fen: Option<String>,
    /// Present while analysis is enabled, including a session that failed.
    session: Option<EngineSession<L>>,
    /// Session state as of the last broadcast.
    reported_state: Option<SessionState>,
    /// Result-set revision as of the last `Lines` broadcast.
    published_revision: u64,
}

impl<L: EngineLauncher + Clone> AnalysisState<L> {
    pub(crate) fn new(launcher: L, multipv: usize) -> Self {
        Self {
            launcher,
            multipv: multipv.max(1),
            settings: SessionSettings::default(),
            fen: None,
            session: None,
            reported_state: None,
            published_revision: 0,
        }
    }

    fn engine_connected(&self) -> bool {
        self.session.as_ref().is_some_and(EngineSession::is_connected)
    }

    async fn next_engine_line(&mut self) -> Option<String> {
        match self.session.as_mut() {
            Some(session) => session.recv_line().await,
            None => None,
        }
    }

    fn snapshot(&self) -> AnalysisSnapshot {
        AnalysisSnapshot {
            settings: self.settings,
            state: self.session.as_ref().map(EngineSession::state),
            fen: self.fen.clone(),
            lines: self.current_lines(),
        }
    }

    fn current_lines(&self) -> Vec<AnalysisLine> {
        let Some(session) = &self.session else {
            return Vec::new();
        };
        let Some(request) = session.current_request() else {
            return Vec::new();
        };
        session
            .results()
            .lines()
            .map(|message| AnalysisLine::from_message(message, &request.fen))
            .collect()
    }

    async fn position_changed(&mut self, fen: String) -> Result<Option<RequestId>, AnalysisError> {
        let fen = fen.trim().to_string();
        if chess::parse_fen(&fen).is_err() {
            return Err(AnalysisError::InvalidFen(fen));
        }
        self.fen = Some(fen);
        self.evaluate_current().await
    }

    async fn settings_changed(&mut self, settings: SessionSettings) -> Result<(), AnalysisError> {
        let settings = SessionSettings::new(settings.enabled, settings.depth);
        let previous = std::mem::replace(&mut self.settings, settings);

        if !settings.enabled {
            if let Some(mut session) = self.session.take() {
                session.terminate().await;
                tracing::info!("Analysis disabled");
            }
            return Ok(());
        }

        let usable = self.session.as_ref().is_some_and(|s| {
            !matches!(
                s.state(),
                SessionState::Terminated | SessionState::Unavailable
            )
        });
        if !usable {
            tracing::info!(depth = settings.depth, "Analysis enabled");
            let mut session = EngineSession::new(self.launcher.clone(), self.multipv);
            self.reported_state = None;
            self.published_revision = 0;
            let result = session.initialize().await;
            self.session = Some(session);
            result?;
            self.evaluate_current().await?;
        } else if previous.depth != settings.depth {
            self.evaluate_current().await?;
        }
        Ok(())
    }

    /// Search the displayed position with the current depth, if the engine
    /// can take requests.
    async fn evaluate_current(&mut self) -> Result<Option<RequestId>, AnalysisError> {
        if !self.settings.enabled {
            return Ok(None);
        }
        let depth = self.settings.depth;
        let (Some(session), Some(fen)) = (self.session.as_mut(), self.fen.as_deref()) else {
            return Ok(None);
        };
        if !matches!(
            session.state(),
            SessionState::Initializing | SessionState::Ready | SessionState::Searching
        ) {
            return Ok(None);
        }
        let id = session.evaluate_position(fen, depth).await?;
        Ok(Some(id))
    }

    async fn stop(&mut self) -> Result<(), AnalysisError> {
        match self.session.as_mut() {
            Some(session)
                if matches!(
                    session.state(),
                    SessionState::Initializing | SessionState::Ready | SessionState::Searching
                ) =>
            {
                session.stop().await.map_err(AnalysisError::from)
            }
            _ => Ok(()),
        }
    }

    /// Broadcast whatever changed since the last call.
    fn publish(&mut self, event_tx: &broadcast::Sender<AnalysisEvent>) {
        let current = self.session.as_ref().map(EngineSession::state);
        let previous = std::mem::replace(&mut self.reported_state, current);

        if previous == Some(SessionState::Initializing)
            && matches!(current, Some(SessionState::Ready | SessionState::Searching))
        {
            let _ = event_tx.send(AnalysisEvent::Ready);
        }

        if current == Some(SessionState::Unavailable) && previous != current {
            let reason = self
                .session
                .as_ref()
                .and_then(EngineSession::unavailable_reason)
                .unwrap_or("engine unavailable")
                .to_string();
            let _ = event_tx.send(AnalysisEvent::Unavailable(reason));
            return;
        }

        let revision = self.session.as_ref().map(|s| s.results().revision());
        if let Some(revision) = revision {
            if revision != self.published_revision {
                self.published_revision = revision;
                let _ = event_tx.send(AnalysisEvent::Lines(self.current_lines()));
            }
        }
    }
}

/// The main analysis actor loop.
/// Owns the engine session. Processes commands and engine output sequentially.
pub(crate) async fn run_analysis_actor<L: EngineLauncher + Clone>(
    state: AnalysisState<L>,
    cmd_rx: mpsc::Receiver<AnalysisCommand>,
    event_tx: broadcast::Sender<AnalysisEvent>,
) {
    let multipv = state.multipv;
    run_analysis_actor_inner(state, cmd_rx, event_tx)
        .instrument(tracing::info_span!("analysis", multipv))
        .await;
}

async fn run_analysis_actor_inner<L: EngineLauncher + Clone>(
    mut state: AnalysisState<L>,
    mut cmd_rx: mpsc::Receiver<AnalysisCommand>,
    event_tx: broadcast::Sender<AnalysisEvent>,
) {
    tracing::info!("Analysis actor started");

    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(AnalysisCommand::Shutdown) | None => {
                        tracing::info!("Analysis actor shutting down");
                        if let Some(mut session) = state.session.take() {
                            session.terminate().await;
                        }
                        break;
                    }
                    Some(cmd) => handle_command(&mut state, cmd, &event_tx).await,
                }
            }

            line = state.next_engine_line(), if state.engine_connected() => {
                match line {
                    Some(line) => handle_engine_line(&mut state, &line, &event_tx).await,
                    None => {
                        if let Some(session) = state.session.as_mut() {
                            session.handle_disconnect().await;
                        }
                        state.publish(&event_tx);
                    }
                }
            }
        }
    }

    tracing::info!("Analysis actor exited");
}

async fn handle_command<L: EngineLauncher + Clone>(
    state: &mut AnalysisState<L>,
    cmd: AnalysisCommand,
    event_tx: &broadcast::Sender<AnalysisEvent>,
) {
    match cmd {
        AnalysisCommand::PositionChanged { fen, reply } => {
            let result = state.position_changed(fen).await;
            state.publish(event_tx);
            let _ = reply.send(result);
        }
        AnalysisCommand::SettingsChanged { settings, reply } => {
            let result = state.settings_changed(settings).await;
            state.publish(event_tx);
            let _ = reply.send(result);
        }
        AnalysisCommand::Stop { reply } => {
            let result = state.stop().await;
            state.publish(event_tx);
            let _ = reply.send(result);
        }
        AnalysisCommand::Subscribe { reply } => {
            let snapshot = state.snapshot();
            let rx = event_tx.subscribe();
            let _ = reply.send((snapshot, rx));
        }
        AnalysisCommand::Shutdown => unreachable!(),
    }
}

async fn handle_engine_line<L: EngineLauncher + Clone>(
    state: &mut AnalysisState<L>,
    line: &str,
    event_tx: &broadcast::Sender<AnalysisEvent>,
) {
    let Some(session) = state.session.as_mut() else {
        return;
    };
    let was_searching = session.state() == SessionState::Searching;

    let finished = match session.process_line(line).await {
        Ok(message) if was_searching && session.state() == SessionState::Ready => {
            message.best_move.map(|best_move| AnalysisEvent::BestMove {
                best_move,
                ponder: message.ponder,
            })
        }
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Engine line failed: {}", e);
            Some(AnalysisEvent::Error(e.to_string()))
        }
    };

    state.publish(event_tx);
    if let Some(event) = finished {
        let _ = event_tx.send(event);
    }
}
