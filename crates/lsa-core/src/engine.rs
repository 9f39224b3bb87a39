//! Analysis orchestrator.
//!
//! Drives one session through its stages: resolve field candidates,
//! score each field against the baseline, group correlated terms,
//! compute histograms, and emit every result incrementally through the
//! sink. Per-field query failures are logged and skipped; grouping and
//! group-histogram failures abort the run with a terminal `error`
//! action. Cancellation terminates the stream silently.

use tracing::{debug, info, warn};

use lsa_common::types::{GroupHistogram, SignificantTerm, TermGroup};
use lsa_common::{Error, ErrorCategory, Result, SessionId};

use crate::actions::{Action, ProgressPayload};
use crate::config::AnalysisConfig;
use crate::executor::QueryExecutor;
use crate::grouping::GroupingEngine;
use crate::histogram::{group_histogram, term_histogram};
use crate::request::{AnalysisRequest, Overrides};
use crate::scheduler::FieldScheduler;
use crate::scorer::score_field;
use crate::session::{AnalysisSession, SessionState};
use crate::stream::ActionSink;

/// `loaded` value reported after grouping, before histograms finish.
const GROUPING_PROGRESS: f64 = 0.95;

/// Outcome of a completed run.
#[derive(Debug)]
pub struct RunSummary {
    pub session_id: SessionId,
    pub state: SessionState,
    pub term_count: usize,
    pub group_count: usize,
}

/// Stateless orchestrator; one instance can serve many sessions.
pub struct AnalysisEngine<'a> {
    executor: &'a dyn QueryExecutor,
    config: AnalysisConfig,
}

impl<'a> AnalysisEngine<'a> {
    pub fn new(executor: &'a dyn QueryExecutor, config: AnalysisConfig) -> Self {
        Self { executor, config }
    }

    /// Run one analysis session against `request`, emitting into `sink`.
    ///
    /// A rejected request returns the error with the sink untouched. On
    /// a mid-run fatal error the sink receives a terminal `error`
    /// action; on cancellation the stream just ends. Either way the
    /// error is also returned to the caller.
    pub fn run(&self, request: &AnalysisRequest, sink: &mut dyn ActionSink) -> Result<RunSummary> {
        let mut session = AnalysisSession::new();
        self.run_session(request, sink, &mut session)
    }

    /// Like [`run`](Self::run), with a caller-owned session so the
    /// transport can hold a cancel handle.
    pub fn run_session(
        &self,
        request: &AnalysisRequest,
        sink: &mut dyn ActionSink,
        session: &mut AnalysisSession,
    ) -> Result<RunSummary> {
        match self.run_inner(request, sink, session) {
            Ok(counts) => Ok(RunSummary {
                session_id: session.id.clone(),
                state: session.state(),
                term_count: counts.0,
                group_count: counts.1,
            }),
            Err(e) if e.is_cancellation() => {
                let _ = session.advance(SessionState::Cancelled);
                // Cancelled streams end without an error action.
                let _ = sink.close();
                Err(e)
            }
            Err(e) => {
                let _ = session.advance(SessionState::Error);
                // Request validation happens before the first emission, so a
                // rejected request leaves the stream body untouched. Only
                // mid-run failures get a terminal error action.
                if e.category() != ErrorCategory::Request {
                    sink.fail(&e);
                }
                Err(e)
            }
        }
    }

    /// Validate everything checkable before a stream body is attached:
    /// the request itself, the tuning, and (for scoring runs) that the
    /// resolved candidate set is non-empty. Transports call this before
    /// committing to a streaming response so invalid requests can be
    /// rejected outright.
    pub fn preflight(&self, request: &AnalysisRequest) -> Result<()> {
        request.validate()?;
        self.config.validate()?;
        if !request.regroup_only() {
            let resume = request.overrides.as_ref().filter(|o| o.is_resumable());
            self.resolve_candidates(request, resume)?;
        }
        Ok(())
    }

    fn run_inner(
        &self,
        request: &AnalysisRequest,
        sink: &mut dyn ActionSink,
        session: &mut AnalysisSession,
    ) -> Result<(usize, usize)> {
        request.validate()?;
        self.config.validate()?;
        session.check_cancelled()?;

        let resume = request.overrides.as_ref().filter(|o| o.is_resumable());
        let regroup_only = request.regroup_only();

        // Resolve candidates before the first emission so an empty
        // candidate set is rejected without opening the stream body.
        let candidates = if regroup_only {
            Vec::new()
        } else {
            self.resolve_candidates(request, resume)?
        };

        info!(
            session = %session.id,
            candidates = candidates.len(),
            resumed = resume.is_some(),
            regroup_only,
            "starting analysis"
        );

        let mut scheduler = match resume {
            Some(overrides) => {
                session.seed_terms(overrides.significant_terms.clone());
                session.set_loaded(overrides.loaded);
                FieldScheduler::resume(candidates, overrides.loaded)
            }
            None => {
                // Fresh session: the client drops any prior visual state.
                sink.emit(&Action::Reset)?;
                FieldScheduler::new(candidates)
            }
        };

        let mut fresh_terms: Vec<SignificantTerm> = Vec::new();
        if !regroup_only {
            session.advance(SessionState::Scoring)?;
            self.score_candidates(request, sink, session, &mut scheduler, &mut fresh_terms)?;
        }

        session.advance(SessionState::Grouping)?;
        session.check_cancelled()?;
        let groups = self.group_terms(request, sink, session)?;
        self.emit_progress(sink, session, GROUPING_PROGRESS)?;

        session.advance(SessionState::Histogramming)?;
        if !regroup_only {
            self.emit_term_histograms(request, sink, session, &fresh_terms)?;
        }
        self.emit_group_histograms(request, sink, session, &groups)?;

        // `loaded` reaches 1.0 in exactly one emission, even when an
        // override seeded the session at 1.0 already.
        session.set_loaded(1.0);
        sink.emit(&Action::Progress(ProgressPayload { loaded: 1.0 }))?;
        session.advance(SessionState::Done)?;
        sink.close()?;
        info!(
            session = %session.id,
            terms = session.terms().len(),
            groups = groups.len(),
            "analysis complete"
        );
        Ok((session.terms().len(), groups.len()))
    }

    /// Ordered list of fields to score, honoring the allow and deny
    /// lists and any remaining candidates from a resumed run.
    fn resolve_candidates(
        &self,
        request: &AnalysisRequest,
        resume: Option<&Overrides>,
    ) -> Result<Vec<String>> {
        let mut candidates = match resume {
            Some(overrides) => overrides.remaining_field_candidates.clone(),
            None if !request.field_candidates.is_empty() => request.field_candidates.clone(),
            None => self.executor.field_candidates().map_err(Error::from)?,
        };
        candidates.retain(|f| !request.deny_field_candidates.contains(f));

        // A resumed run may legitimately have nothing left to score.
        if candidates.is_empty() && resume.is_none() {
            return Err(Error::InvalidRequest(
                "no field candidates to analyze".into(),
            ));
        }
        Ok(candidates)
    }

    fn score_candidates(
        &self,
        request: &AnalysisRequest,
        sink: &mut dyn ActionSink,
        session: &mut AnalysisSession,
        scheduler: &mut FieldScheduler,
        fresh_terms: &mut Vec<SignificantTerm>,
    ) -> Result<()> {
        while let Some(field) = scheduler.next_field() {
            session.check_cancelled()?;

            match self.score_one_field(request, &field) {
                Ok(terms) => {
                    let fresh = session.register_terms(terms);
                    if !fresh.is_empty() {
                        debug!(field = %field, count = fresh.len(), "significant terms found");
                        sink.emit(&Action::AddSignificantTerms(fresh.clone()))?;
                        fresh_terms.extend(fresh);
                    }
                }
                // One bad field does not abort the whole analysis.
                Err(e) => warn!(field = %field, error = %e, "skipping field"),
            }

            let loaded = scheduler.complete_field();
            self.emit_progress(sink, session, loaded)?;
        }
        Ok(())
    }

    fn score_one_field(
        &self,
        request: &AnalysisRequest,
        field: &str,
    ) -> Result<Vec<SignificantTerm>> {
        let baseline = self
            .executor
            .frequencies(field, request.window.baseline)
            .map_err(Error::from)?;
        let deviation = self
            .executor
            .frequencies(field, request.window.deviation)
            .map_err(Error::from)?;
        Ok(score_field(
            field,
            &baseline,
            &deviation,
            &request.window,
            &self.config,
        ))
    }

    fn group_terms(
        &self,
        request: &AnalysisRequest,
        sink: &mut dyn ActionSink,
        session: &mut AnalysisSession,
    ) -> Result<Vec<TermGroup>> {
        let mut grouping = GroupingEngine::new(self.config.group_overlap_ratio);
        let groups = grouping
            .pass(session.terms(), self.executor, request.window.deviation)
            .map_err(Error::from)?;
        if !groups.is_empty() {
            sink.emit(&Action::AddGroups(groups.clone()))?;
        }
        Ok(groups)
    }

    fn emit_term_histograms(
        &self,
        request: &AnalysisRequest,
        sink: &mut dyn ActionSink,
        session: &AnalysisSession,
        terms: &[SignificantTerm],
    ) -> Result<()> {
        let range = request.window.full_range();
        for term in terms {
            session.check_cancelled()?;
            match term_histogram(self.executor, term, range) {
                Ok(hist) => sink.emit(&Action::AddHistogram(hist))?,
                // Missing chart data degrades the result, not the run.
                Err(e) => warn!(term = %term.key(), error = %e, "skipping term histogram"),
            }
        }
        Ok(())
    }

    fn emit_group_histograms(
        &self,
        request: &AnalysisRequest,
        sink: &mut dyn ActionSink,
        session: &AnalysisSession,
        groups: &[TermGroup],
    ) -> Result<()> {
        let range = request.window.full_range();
        for group in groups {
            session.check_cancelled()?;
            let hist: GroupHistogram =
                group_histogram(self.executor, group, range).map_err(Error::from)?;
            sink.emit(&Action::AddGroupHistograms(vec![hist]))?;
        }
        Ok(())
    }

    /// Record progress and emit it only when the value actually moved
    /// forward; a session seeded at or beyond `loaded` stays silent.
    fn emit_progress(
        &self,
        sink: &mut dyn ActionSink,
        session: &mut AnalysisSession,
        loaded: f64,
    ) -> Result<()> {
        let before = session.loaded();
        let loaded = session.set_loaded(loaded);
        if loaded > before {
            sink.emit(&Action::Progress(ProgressPayload { loaded }))?;
        }
        Ok(())
    }
}
