//! Analysis session state.
//!
//! One session per client request. Stage transitions are an explicit
//! state machine rather than implicit callback chaining, and all mutable
//! per-request state (progress, accumulated terms, cancellation) lives
//! here and is passed by reference through the stages.

use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lsa_common::types::SignificantTerm;
use lsa_common::{Error, Result, SessionId};

/// Stage of the analysis pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Scheduling,
    Scoring,
    Grouping,
    Histogramming,
    Done,
    Error,
    Cancelled,
}

impl SessionState {
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Done | SessionState::Error | SessionState::Cancelled
        )
    }

    fn can_advance_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Scheduling, Scoring) => true,
            // Regroup-only sessions skip scheduling and scoring.
            (Scheduling, Grouping) => true,
            (Scoring, Grouping) => true,
            (Grouping, Histogramming) => true,
            (Histogramming, Done) => true,
            (from, Error | Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Scheduling => "scheduling",
            SessionState::Scoring => "scoring",
            SessionState::Grouping => "grouping",
            SessionState::Histogramming => "histogramming",
            SessionState::Done => "done",
            SessionState::Error => "error",
            SessionState::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}

/// Handle for cancelling a running session from another thread.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Per-request mutable analysis state.
#[derive(Debug)]
pub struct AnalysisSession {
    pub id: SessionId,
    state: SessionState,
    loaded: f64,
    terms: Vec<SignificantTerm>,
    seen_terms: BTreeSet<String>,
    cancelled: Arc<AtomicBool>,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            state: SessionState::Scheduling,
            loaded: 0.0,
            terms: Vec::new(),
            seen_terms: BTreeSet::new(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Advance the state machine, rejecting illegal transitions.
    pub fn advance(&mut self, next: SessionState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(Error::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    /// Current `loaded` fraction.
    pub fn loaded(&self) -> f64 {
        self.loaded
    }

    /// Raise `loaded`. The fraction is monotone within a session, so a
    /// lower value than the current one is ignored.
    pub fn set_loaded(&mut self, loaded: f64) -> f64 {
        if loaded > self.loaded {
            self.loaded = loaded.min(1.0);
        }
        self.loaded
    }

    /// Seed terms computed by a prior run. They participate in grouping
    /// but are never re-emitted as `add_significant_terms`.
    pub fn seed_terms(&mut self, terms: Vec<SignificantTerm>) {
        for term in terms {
            if self.seen_terms.insert(term.key()) {
                self.terms.push(term);
            }
        }
    }

    /// Register freshly scored terms, returning only those not seen
    /// before in this session. A seeded (override) term wins over a
    /// freshly discovered duplicate.
    pub fn register_terms(&mut self, terms: Vec<SignificantTerm>) -> Vec<SignificantTerm> {
        let mut fresh = Vec::new();
        for term in terms {
            if self.seen_terms.insert(term.key()) {
                self.terms.push(term.clone());
                fresh.push(term);
            }
        }
        fresh
    }

    /// All terms accumulated so far (seeded and fresh).
    pub fn terms(&self) -> &[SignificantTerm] {
        &self.terms
    }

    /// Handle that lets the transport cancel this session.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancelled))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Error out if the session has been cancelled. Called at every
    /// suspension point.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}
