use std::fmt;

use crate::uci::EngineMessage;

/// Monotonic identifier of an evaluation request within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A position and the (already clamped) depth to search it to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationRequest {
    pub id: RequestId,
    pub fen: String,
    pub depth: u8,
}

/// The latest engine line per multi-PV rank for the current request.
///
/// Holds at most `capacity` slots; slot `k - 1` holds rank `k`.
#[derive(Debug, Clone)]
pub struct AnalysisResultSet {
    request: Option<RequestId>,
    lines: Vec<Option<EngineMessage>>,
    revision: u64,
}

impl AnalysisResultSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            request: None,
            lines: vec![None; capacity.max(1)],
            revision: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.lines.len()
    }

    /// The request these lines belong to.
    pub fn request(&self) -> Option<RequestId> {
        self.request
    }

    /// Bumped on every change, so readers can tell whether to redraw.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Empty all slots and stamp the set with a new request.
    pub fn reset(&mut self, request: RequestId) {
        self.lines.iter_mut().for_each(|slot| *slot = None);
        self.request = Some(request);
        self.revision += 1;
    }

    /// Store `message` in the slot for its rank, replacing what was there.
    ///
    /// Returns false when the rank is 0 or beyond capacity.
    pub fn record(&mut self, message: EngineMessage) -> bool {
        let rank = message.multipv as usize;
        let Some(slot) = rank.checked_sub(1).and_then(|i| self.lines.get_mut(i)) else {
            tracing::debug!(rank, capacity = self.lines.len(), "Dropping out-of-range multipv line");
            return false;
        };
        *slot = Some(message);
        self.revision += 1;
        true
    }

    /// Line for a 1-based rank.
    pub fn get(&self, rank: usize) -> Option<&EngineMessage> {
        rank.checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .and_then(Option::as_ref)
    }

    /// Filled slots in rank order.
    pub fn lines(&self) -> impl Iterator<Item = &EngineMessage> {
        self.lines.iter().flatten()
    }

    /// Number of filled slots.
    pub fn len(&self) -> usize {
        self.lines().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
