//! The seam between a session and the process that runs the engine.

use std::future::Future;

use crate::EngineError;

/// A live, line-oriented connection to one engine instance.
pub trait EngineChannel: Send + 'static {
    /// Send one command line (without trailing newline).
    fn send(&mut self, line: String) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Next output line, or `None` once the engine has gone away.
    ///
    /// Must be cancel safe: it is polled inside `tokio::select!`.
    fn recv(&mut self) -> impl Future<Output = Option<String>> + Send;

    /// Release the engine. Safe to call more than once.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Creates engine channels on demand.
pub trait EngineLauncher: Send + Sync + 'static {
    type Channel: EngineChannel;

    fn launch(&self) -> impl Future<Output = Result<Self::Channel, EngineError>> + Send;
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    //! In-memory engines for tests: every launched channel is paired with a
    //! [`MemoryEngine`] that records commands and injects output lines.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, PoisonError};
    use tokio::sync::mpsc;

    /// Test-side end of a [`MemoryChannel`].
    #[derive(Clone)]
    pub struct MemoryEngine {
        sent: Arc<Mutex<Vec<String>>>,
        output: mpsc::UnboundedSender<String>,
        closed: Arc<AtomicBool>,
    }

    impl MemoryEngine {
        /// Every command the session has sent so far.
        pub fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }

        /// Drain and return the commands sent so far.
        pub fn take_sent(&self) -> Vec<String> {
            std::mem::take(&mut *self.sent.lock().unwrap_or_else(PoisonError::into_inner))
        }

        /// Queue an output line for the session to read.
        pub fn reply(&self, line: &str) {
            let _ = self.output.send(line.to_string());
        }

        pub fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    pub struct MemoryChannel {
        sent: Arc<Mutex<Vec<String>>>,
        output: mpsc::UnboundedReceiver<String>,
        closed: Arc<AtomicBool>,
    }

    impl EngineChannel for MemoryChannel {
        async fn send(&mut self, line: String) -> Result<(), EngineError> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(EngineError::ChannelClosed);
            }
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(line);
            Ok(())
        }

        async fn recv(&mut self) -> Option<String> {
            self.output.recv().await
        }

        async fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
            self.output.close();
        }
    }

    /// Launches [`MemoryChannel`]s and keeps the matching engines for the test.
    #[derive(Clone, Default)]
    pub struct MemoryLauncher {
        launches: Arc<AtomicUsize>,
        engines: Arc<Mutex<VecDeque<MemoryEngine>>>,
        failure: Option<String>,
    }

    impl MemoryLauncher {
        pub fn new() -> Self {
            Self::default()
        }

        /// A launcher whose every launch fails with `reason`.
        pub fn failing(reason: &str) -> Self {
            Self {
                failure: Some(reason.to_string()),
                ..Self::default()
            }
        }

        pub fn launches(&self) -> usize {
            self.launches.load(Ordering::SeqCst)
        }

        /// The oldest launched engine not yet taken.
        pub fn take_engine(&self) -> Option<MemoryEngine> {
            self.engines
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
        }
    }

    impl EngineLauncher for MemoryLauncher {
        type Channel = MemoryChannel;

        async fn launch(&self) -> Result<MemoryChannel, EngineError> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            if let Some(reason) = &self.failure {
                return Err(EngineError::Unavailable(reason.clone()));
            }

            let sent = Arc::new(Mutex::new(Vec::new()));
            let closed = Arc::new(AtomicBool::new(false));
            let (tx, rx) = mpsc::unbounded_channel();

            self.engines
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(MemoryEngine {
                    sent: sent.clone(),
                    output: tx,
                    closed: closed.clone(),
                });

            Ok(MemoryChannel {
                sent,
                output: rx,
                closed,
            })
        }
    }
}
