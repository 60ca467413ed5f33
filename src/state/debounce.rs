use std::time::{Duration, Instant};

/// Collapses bursts of edits into a single commit once input has been quiet
/// for `delay`. Time is passed in by the caller so the clock stays testable.
#[derive(Debug, Clone)]
pub struct CommitDebouncer {
    delay: Duration,
    pending_since: Option<Instant>,
}

impl CommitDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending_since: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Records an edit; restarts the quiet period.
    pub fn mark(&mut self, now: Instant) {
        self.pending_since = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.pending_since {
            Some(since) => now.saturating_duration_since(since) >= self.delay,
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.pending_since = None;
    }
}
