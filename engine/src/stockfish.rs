use crate::channel::{EngineChannel, EngineLauncher};
use crate::EngineError;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

/// Places a packaged Stockfish usually lives, checked before `PATH`.
const CANDIDATE_PATHS: &[&str] = &[
    "/usr/local/bin/stockfish",
    "/usr/bin/stockfish",
    "/opt/homebrew/bin/stockfish",
    "/usr/games/stockfish",
];

const LINE_BUFFER: usize = 256;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Find Stockfish executable in common locations, then on `PATH`.
pub fn find_stockfish_path() -> Option<PathBuf> {
    if let Some(path) = CANDIDATE_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
    {
        return Some(path);
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join("stockfish"))
        .find(|p| p.is_file())
}

/// Launches a UCI engine executable as a child process.
#[derive(Debug, Clone)]
pub struct StockfishLauncher {
    path: PathBuf,
}

impl StockfishLauncher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A launcher for the first Stockfish found by [`find_stockfish_path`].
    pub fn discover() -> Option<Self> {
        find_stockfish_path().map(Self::new)
    }
}

impl EngineLauncher for StockfishLauncher {
    type Channel = StockfishChannel;

    #[tracing::instrument(level = "info", skip(self), fields(path = %self.path.display()))]
    async fn launch(&self) -> Result<StockfishChannel, EngineError> {
        let mut child = Command::new(&self.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!("Failed to spawn engine: {}", e);
                EngineError::Unavailable(format!("{}: {}", self.path.display(), e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Unavailable("engine has no stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Unavailable("engine has no stdout".to_string()))?;

        let (line_tx, line_rx) = mpsc::channel::<String>(LINE_BUFFER);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        tracing::trace!("UCI << {}", line);
                        if line_tx.send(line).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        tracing::debug!("Engine stdout closed");
                        break;
                    }
                    Err(e) => {
                        tracing::error!("Error reading engine stdout: {}", e);
                        break;
                    }
                }
            }
        });

        let (command_tx, mut command_rx) = mpsc::channel::<String>(LINE_BUFFER);
        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                tracing::trace!("UCI >> {}", command);
                let written = async {
                    stdin.write_all(command.as_bytes()).await?;
                    stdin.write_all(b"\n").await?;
                    stdin.flush().await
                }
                .await;
                if let Err(e) = written {
                    tracing::error!("Failed to write to engine stdin: {}", e);
                    break;
                }
            }
        });

        tracing::info!(pid = child.id(), "Engine process started");
        Ok(StockfishChannel {
            child,
            commands: Some(command_tx),
            lines: line_rx,
        })
    }
}

/// Line channel to an engine child process.
///
/// The process is killed when the channel is closed or dropped.
pub struct StockfishChannel {
    child: Child,
    commands: Option<mpsc::Sender<String>>,
    lines: mpsc::Receiver<String>,
}

impl EngineChannel for StockfishChannel {
    async fn send(&mut self, line: String) -> Result<(), EngineError> {
        let commands = self.commands.as_ref().ok_or(EngineError::ChannelClosed)?;
        commands
            .send(line)
            .await
            .map_err(|_| EngineError::ChannelClosed)
    }

    async fn recv(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    async fn close(&mut self) {
        if self.commands.take().is_none() {
            return;
        }
        // Dropping the sender ends the writer task, which closes stdin.
        if tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait())
            .await
            .is_err()
        {
            tracing::warn!("Engine did not exit in time, killing it");
            if let Err(e) = self.child.kill().await {
                tracing::error!("Failed to kill engine: {}", e);
            }
        }
        self.lines.close();
        tracing::info!("Engine process stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_launch_missing_binary_is_unavailable() {
        let launcher = StockfishLauncher::new("/nonexistent/definitely-not-stockfish");
        let err = launcher.launch().await.err().unwrap();
        assert!(matches!(err, EngineError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_real_engine_handshake() {
        let Some(launcher) = StockfishLauncher::discover() else {
            eprintln!("stockfish not found, skipping");
            return;
        };
        let mut channel = launcher.launch().await.unwrap();
        channel.send("uci".to_string()).await.unwrap();
        channel.send("isready".to_string()).await.unwrap();

        let saw_ready = tokio::time::timeout(Duration::from_secs(10), async {
            while let Some(line) = channel.recv().await {
                if line.trim() == "readyok" {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap_or(false);
        assert!(saw_ready);

        channel.send("quit".to_string()).await.unwrap();
        channel.close().await;
        assert!(channel.send("isready".to_string()).await.is_err());
    }
}
