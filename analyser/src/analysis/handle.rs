use engine::RequestId;
use tokio::sync::{broadcast, mpsc, oneshot};

use super::commands::*;
use super::events::{AnalysisEvent, AnalysisSnapshot};
use crate::viewer::{SessionSettings, ViewerEvent};

/// Cheap, cloneable handle to an analysis actor.
#[derive(Clone)]
pub struct AnalysisHandle {
    cmd_tx: mpsc::Sender<AnalysisCommand>,
}

impl AnalysisHandle {
    pub(crate) fn new(cmd_tx: mpsc::Sender<AnalysisCommand>) -> Self {
        Self { cmd_tx }
    }

    pub async fn position_changed(
        &self,
        fen: impl Into<String>,
    ) -> Result<Option<RequestId>, AnalysisError> {
        let (tx, rx) = oneshot::channel();
        self.send(AnalysisCommand::PositionChanged {
            fen: fen.into(),
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| AnalysisError::Internal("Reply dropped".into()))?
    }

    pub async fn settings_changed(&self, settings: SessionSettings) -> Result<(), AnalysisError> {
        let (tx, rx) = oneshot::channel();
        self.send(AnalysisCommand::SettingsChanged {
            settings,
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| AnalysisError::Internal("Reply dropped".into()))?
    }

    /// Forward a viewer change to the matching command.
    pub async fn apply(&self, event: ViewerEvent) -> Result<(), AnalysisError> {
        match event {
            ViewerEvent::PositionChanged { fen } => self.position_changed(fen).await.map(|_| ()),
            ViewerEvent::SettingsChanged(settings) => self.settings_changed(settings).await,
        }
    }

    pub async fn stop(&self) -> Result<(), AnalysisError> {
        let (tx, rx) = oneshot::channel();
        self.send(AnalysisCommand::Stop { reply: tx }).await?;
        rx.await
            .map_err(|_| AnalysisError::Internal("Reply dropped".into()))?
    }

    pub async fn subscribe(
        &self,
    ) -> Result<(AnalysisSnapshot, broadcast::Receiver<AnalysisEvent>), AnalysisError> {
        let (tx, rx) = oneshot::channel();
        self.send(AnalysisCommand::Subscribe { reply: tx }).await?;
        rx.await
            .map_err(|_| AnalysisError::Internal("Reply dropped".into()))
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(AnalysisCommand::Shutdown).await;
    }

    async fn send(&self, cmd: AnalysisCommand) -> Result<(), AnalysisError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| AnalysisError::Internal("Analysis actor closed".into()))
    }
}
