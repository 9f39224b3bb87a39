//! Typed incremental output actions.
//!
//! Each unit of incremental output is one `Action`, serialized as
//! `{"type": ..., "payload": ...}` on its own line of the response
//! stream. Actions are append-only and ordered: consumers apply them in
//! emission order to reconstruct final state.

use serde::{Deserialize, Serialize};

use lsa_common::types::{GroupHistogram, SignificantTerm, TermGroup, TermHistogram};

/// Progress payload carrying the `loaded` fraction (0.0 to 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPayload {
    pub loaded: f64,
}

/// One unit of incremental analysis output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Action {
    /// Newly discovered significant terms.
    AddSignificantTerms(Vec<SignificantTerm>),
    /// Time histogram for one significant term.
    AddHistogram(TermHistogram),
    /// Newly stabilized term groups.
    AddGroups(Vec<TermGroup>),
    /// Time histogram for one term group.
    AddGroupHistograms(Vec<GroupHistogram>),
    /// Updated loaded fraction.
    Progress(ProgressPayload),
    /// Fatal failure; always the last action of an aborted stream.
    Error(String),
    /// Reset client-side visual state (emitted when a session restarts).
    Reset,
}

impl Action {
    /// Wire name of this action's `type` tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::AddSignificantTerms(_) => "add_significant_terms",
            Action::AddHistogram(_) => "add_histogram",
            Action::AddGroups(_) => "add_groups",
            Action::AddGroupHistograms(_) => "add_group_histograms",
            Action::Progress(_) => "progress",
            Action::Error(_) => "error",
            Action::Reset => "reset",
        }
    }
}
