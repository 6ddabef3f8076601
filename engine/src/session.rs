//! Lifecycle of one engine connection and the evaluation requests sent to it.

use crate::channel::{EngineChannel, EngineLauncher};
use crate::result_set::{AnalysisResultSet, EvaluationRequest, RequestId};
use crate::uci::{parse_engine_line, EngineMessage};
use crate::{clamp_depth, EngineCommand, EngineError};

type MessageListener = Box<dyn FnMut(&EngineMessage) + Send>;
type ReadyListener = Box<dyn FnMut() + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No channel yet.
    Uninitialized,
    /// Handshake sent, waiting for `readyok`.
    Initializing,
    Ready,
    Searching,
    Terminated,
    /// The engine could not be started, or went away. Terminal.
    Unavailable,
}

/// One engine and the analysis it is producing.
///
/// The session owns its channel exclusively. Lines are pulled either with
/// [`EngineSession::next_message`] or, inside a `select!`, with
/// [`EngineSession::recv_line`] followed by [`EngineSession::process_line`].
pub struct EngineSession<L: EngineLauncher> {
    launcher: L,
    channel: Option<L::Channel>,
    state: SessionState,
    multipv: usize,
    results: AnalysisResultSet,
    next_id: u64,
    current: Option<EvaluationRequest>,
    /// Request made while the handshake was still running.
    pending: Option<EvaluationRequest>,
    /// Superseded searches whose `bestmove` has not arrived yet.
    stale_searches: usize,
    unavailable_reason: Option<String>,
    message_listeners: Vec<MessageListener>,
    ready_listeners: Vec<ReadyListener>,
}

impl<L: EngineLauncher> EngineSession<L> {
    pub fn new(launcher: L, multipv: usize) -> Self {
        let multipv = multipv.max(1);
        Self {
            launcher,
            channel: None,
            state: SessionState::Uninitialized,
            multipv,
            results: AnalysisResultSet::new(multipv),
            next_id: 0,
            current: None,
            pending: None,
            stale_searches: 0,
            unavailable_reason: None,
            message_listeners: Vec::new(),
            ready_listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn multipv(&self) -> usize {
        self.multipv
    }

    pub fn results(&self) -> &AnalysisResultSet {
        &self.results
    }

    /// The request the engine is (or was last) searching.
    pub fn current_request(&self) -> Option<&EvaluationRequest> {
        self.current.as_ref()
    }

    /// Why the session became [`SessionState::Unavailable`].
    pub fn unavailable_reason(&self) -> Option<&str> {
        self.unavailable_reason.as_deref()
    }

    /// True while a channel is open and lines may arrive.
    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Launch the engine and send the handshake. Does nothing if the
    /// session already has a channel.
    #[tracing::instrument(level = "info", skip(self), fields(multipv = self.multipv))]
    pub async fn initialize(&mut self) -> Result<(), EngineError> {
        match self.state {
            SessionState::Uninitialized => {}
            SessionState::Initializing | SessionState::Ready | SessionState::Searching => {
                return Ok(())
            }
            SessionState::Terminated | SessionState::Unavailable => {
                return Err(self.unusable_error())
            }
        }

        let channel = match self.launcher.launch().await {
            Ok(channel) => channel,
            Err(e) => {
                let reason = match e {
                    EngineError::Unavailable(reason) => reason,
                    other => other.to_string(),
                };
                tracing::warn!("Engine unavailable: {}", reason);
                self.unavailable_reason = Some(reason.clone());
                self.set_state(SessionState::Unavailable);
                return Err(EngineError::Unavailable(reason));
            }
        };
        self.channel = Some(channel);
        self.set_state(SessionState::Initializing);

        // `isready` goes last so `readyok` confirms the options took effect.
        let handshake = [
            EngineCommand::Uci,
            EngineCommand::multipv(self.multipv),
            EngineCommand::show_wdl(),
            EngineCommand::IsReady,
        ];
        for command in handshake {
            self.send(command).await?;
        }
        tracing::info!("Engine handshake sent");
        Ok(())
    }

    /// Call `callback` every time the engine answers `readyok`.
    pub fn on_ready<F>(&mut self, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.ready_listeners.push(Box::new(callback));
    }

    /// Call `callback` with every parsed engine line, stale or not.
    pub fn on_message<F>(&mut self, callback: F)
    where
        F: FnMut(&EngineMessage) + Send + 'static,
    {
        self.message_listeners.push(Box::new(callback));
    }

    /// Ask for `fen` to be searched to `depth` (clamped to 24).
    ///
    /// While the handshake is running the request is held back and sent on
    /// `readyok`; a later request replaces a held one. A request made while
    /// another search runs stops that search first.
    pub async fn evaluate_position(
        &mut self,
        fen: &str,
        depth: u32,
    ) -> Result<RequestId, EngineError> {
        if matches!(
            self.state,
            SessionState::Uninitialized | SessionState::Terminated | SessionState::Unavailable
        ) {
            return Err(self.unusable_error());
        }

        let fen = fen.trim();
        if fen.parse::<cozy_chess::Board>().is_err() {
            return Err(EngineError::InvalidFen(fen.to_string()));
        }

        self.next_id += 1;
        let request = EvaluationRequest {
            id: RequestId(self.next_id),
            fen: fen.to_string(),
            depth: clamp_depth(depth),
        };
        let id = request.id;

        match self.state {
            SessionState::Initializing => {
                tracing::debug!(request = %id, "Engine not ready, holding request");
                self.pending = Some(request);
            }
            SessionState::Ready => self.issue(request).await?,
            SessionState::Searching => {
                self.send(EngineCommand::Stop).await?;
                self.stale_searches += 1;
                tracing::debug!(
                    request = %id,
                    stale = self.stale_searches,
                    "Superseding running search"
                );
                self.issue(request).await?;
            }
            _ => return Err(self.unusable_error()),
        }
        Ok(id)
    }

    /// Ask the engine to finish the current search early.
    pub async fn stop(&mut self) -> Result<(), EngineError> {
        match self.state {
            SessionState::Searching => self.send(EngineCommand::Stop).await,
            SessionState::Initializing => {
                self.pending = None;
                Ok(())
            }
            SessionState::Ready => Ok(()),
            _ => Err(self.unusable_error()),
        }
    }

    /// Send `quit` and release the engine. The session accepts nothing
    /// afterwards.
    pub async fn terminate(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            if let Err(e) = channel.send(EngineCommand::Quit.to_string()).await {
                tracing::debug!("quit not delivered: {}", e);
            }
            channel.close().await;
            tracing::info!("Engine session terminated");
        }
        self.pending = None;
        self.stale_searches = 0;
        self.set_state(SessionState::Terminated);
    }

    /// Next raw line from the engine. `None` when there is no channel or the
    /// engine has gone away. Cancel safe.
    pub async fn recv_line(&mut self) -> Option<String> {
        match self.channel.as_mut() {
            Some(channel) => channel.recv().await,
            None => None,
        }
    }

    /// Read and process the next engine line.
    ///
    /// Returns `Ok(None)` when the engine closed its output; the session is
    /// then [`SessionState::Unavailable`].
    pub async fn next_message(&mut self) -> Result<Option<EngineMessage>, EngineError> {
        if self.channel.is_none() {
            return Err(self.unusable_error());
        }
        match self.recv_line().await {
            Some(line) => self.process_line(&line).await.map(Some),
            None => {
                self.handle_disconnect().await;
                Ok(None)
            }
        }
    }

    /// Parse one engine line, notify listeners and update state and results.
    pub async fn process_line(&mut self, line: &str) -> Result<EngineMessage, EngineError> {
        let message = parse_engine_line(line);
        for listener in &mut self.message_listeners {
            listener(&message);
        }

        if message.is_ready_ok() {
            for listener in &mut self.ready_listeners {
                listener();
            }
            if self.state == SessionState::Initializing {
                tracing::info!("Engine ready");
                self.set_state(SessionState::Ready);
                if let Some(request) = self.pending.take() {
                    self.issue(request).await?;
                }
            }
        } else if message.is_best_move() {
            if self.stale_searches > 0 {
                self.stale_searches -= 1;
                tracing::debug!(
                    remaining = self.stale_searches,
                    "Discarding bestmove of superseded search"
                );
            } else if self.state == SessionState::Searching {
                tracing::debug!(best_move = ?message.best_move, "Search finished");
                self.set_state(SessionState::Ready);
            }
        } else if message.is_evaluation()
            && self.stale_searches == 0
            && self.state == SessionState::Searching
        {
            self.results.record(message.clone());
        }

        Ok(message)
    }

    /// Drop the channel after the engine stopped answering.
    pub async fn handle_disconnect(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
        self.pending = None;
        self.stale_searches = 0;
        if !matches!(
            self.state,
            SessionState::Terminated | SessionState::Unavailable
        ) {
            tracing::warn!("Engine channel closed unexpectedly");
            self.unavailable_reason = Some("engine exited".to_string());
            self.set_state(SessionState::Unavailable);
        }
    }

    async fn issue(&mut self, request: EvaluationRequest) -> Result<(), EngineError> {
        self.results.reset(request.id);
        self.send(EngineCommand::Position {
            fen: request.fen.clone(),
        })
        .await?;
        self.send(EngineCommand::GoDepth(request.depth)).await?;
        tracing::debug!(request = %request.id, depth = request.depth, "Search started");
        self.current = Some(request);
        self.set_state(SessionState::Searching);
        Ok(())
    }

    async fn send(&mut self, command: EngineCommand) -> Result<(), EngineError> {
        let result = match self.channel.as_mut() {
            Some(channel) => channel.send(command.to_string()).await,
            None => Err(EngineError::ChannelClosed),
        };
        if result.is_err() {
            self.handle_disconnect().await;
        }
        result
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            tracing::debug!(from = ?self.state, to = ?state, "Session state changed");
            self.state = state;
        }
    }

    fn unusable_error(&self) -> EngineError {
        match self.state {
            SessionState::Uninitialized => EngineError::NotInitialized,
            SessionState::Terminated => EngineError::Terminated,
            SessionState::Unavailable => EngineError::Unavailable(
                self.unavailable_reason
                    .clone()
                    .unwrap_or_else(|| "engine unavailable".to_string()),
            ),
            SessionState::Initializing | SessionState::Ready | SessionState::Searching => {
                EngineError::ChannelClosed
            }
        }
    }
}

impl<L: EngineLauncher> std::fmt::Debug for EngineSession<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSession")
            .field("state", &self.state)
            .field("multipv", &self.multipv)
            .field("current", &self.current)
            .field("pending", &self.pending)
            .field("stale_searches", &self.stale_searches)
            .finish_non_exhaustive()
    }
}
