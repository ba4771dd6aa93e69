use crate::errors::RecognitionError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared flag a caller flips to abort an in-flight request
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Deadline and cancellation state for one pipeline run
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    deadline: Option<Instant>,
    budget: Option<Duration>,
    cancel: Option<CancelHandle>,
}

impl StopSignal {
    /// Never stops
    pub fn none() -> Self {
        Self::default()
    }

    /// Expires `budget` from now
    pub fn with_timeout(budget: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + budget),
            budget: Some(budget),
            cancel: None,
        }
    }

    /// Expires `budget` from now if one is given
    pub fn from_budget(budget: Option<Duration>) -> Self {
        budget.map(Self::with_timeout).unwrap_or_default()
    }

    pub fn with_cancel(mut self, handle: CancelHandle) -> Self {
        self.cancel = Some(handle);
        self
    }

    /// The configured timeout, if any
    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Cancellation wins over expiry when both hold
    pub fn check(&self) -> Result<(), RecognitionError> {
        if self.is_cancelled() {
            return Err(RecognitionError::Cancelled);
        }
        if self.is_expired() {
            return Err(RecognitionError::TimedOut);
        }
        Ok(())
    }
}
