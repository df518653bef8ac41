//! Review-event ingestion for integration layers.
//!
//! This module converts recorded review events — the shape a CI wrapper
//! extracts from its hosting platform's review API — into the
//! [`ApprovalState`] the expression evaluator consumes.
//!
//! The expected input is a JSON array of events in chronological order:
//!
//! ```json
//! [
//!   {"reviewer": "alice", "state": "approved", "team_memberships": ["org/security"]},
//!   {"reviewer": "bob", "state": "changes_requested"}
//! ]
//! ```
//!
//! # Example
//!
//! ```
//! use mergecap::events::approval_state_from_json;
//!
//! let log = r#"[
//!     {"reviewer": "alice", "state": "approved", "team_memberships": ["org/security"]},
//!     {"reviewer": "alice", "state": "dismissed"}
//! ]"#;
//!
//! let state = approval_state_from_json(log)?;
//! assert!(state.is_empty());
//! # Ok::<(), mergecap::events::EventError>(())
//! ```

use thiserror::Error;

use crate::review::{ApprovalState, ReviewEvent};

/// Error type for malformed review-event input.
#[derive(Debug, Error)]
pub enum EventError {
    /// The input was not a valid JSON review-event log.
    #[error("malformed review event log: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parses a JSON array of review events, preserving their order.
pub fn review_events_from_json(input: &str) -> Result<Vec<ReviewEvent>, EventError> {
    Ok(serde_json::from_str(input)?)
}

/// Parses a JSON review-event log and folds it into an approval state.
pub fn approval_state_from_json(input: &str) -> Result<ApprovalState, EventError> {
    Ok(ApprovalState::from_events(review_events_from_json(input)?))
}
