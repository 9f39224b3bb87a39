//! Log Spike Analysis shared foundation.
//!
//! Types and errors used by every crate in the workspace:
//! - Unified error taxonomy with stable codes
//! - Analysis windows and significant term / group records
//! - Deterministic group and session identifiers

pub mod error;
pub mod id;
pub mod types;

pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use id::{group_id, SessionId};
pub use types::{
    AnalysisWindow, GroupHistogram, GroupMember, HistogramBucket, SignificantTerm, TermGroup,
    TermHistogram, TimeWindow, HISTOGRAM_BUCKET_COUNT,
};
