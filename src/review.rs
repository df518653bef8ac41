use std::collections::{BTreeMap, BTreeSet};

use crate::identity::Identity;

/// The state of a single review event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "events",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ReviewState {
    /// The reviewer approved the change.
    Approved,
    /// The reviewer requested changes.
    ChangesRequested,
    /// The reviewer commented without a verdict.
    Commented,
    /// The review was dismissed (or re-requested).
    Dismissed,
}

/// A single review event at the integration boundary.
///
/// Events are folded into an [`ApprovalState`] in order; a reviewer's most
/// recent event supersedes earlier ones.
///
/// # Example
///
/// ```
/// use mergecap::{ApprovalState, ReviewEvent, ReviewState};
///
/// let state = ApprovalState::from_events([
///     ReviewEvent::new("alice", ReviewState::Approved).with_team("org/security"),
///     ReviewEvent::new("bob", ReviewState::Approved),
///     ReviewEvent::new("bob", ReviewState::Dismissed),
/// ]);
///
/// assert!(state.contains(&"alice".into()));
/// assert!(state.contains(&"org/security".into()));
/// assert!(!state.contains(&"bob".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "events", derive(serde::Serialize, serde::Deserialize))]
pub struct ReviewEvent {
    /// The reviewing identity.
    pub reviewer: Identity,
    /// The review verdict.
    pub state: ReviewState,
    /// Teams the reviewer belongs to.
    #[cfg_attr(feature = "events", serde(default))]
    pub team_memberships: BTreeSet<Identity>,
}

impl ReviewEvent {
    /// Creates a review event with no team memberships.
    pub fn new(reviewer: impl Into<Identity>, state: ReviewState) -> Self {
        Self {
            reviewer: reviewer.into(),
            state,
            team_memberships: BTreeSet::new(),
        }
    }

    /// Adds a team membership for the reviewer.
    pub fn with_team(mut self, team: impl Into<Identity>) -> Self {
        self.team_memberships.insert(team.into());
        self
    }

    /// Adds several team memberships for the reviewer.
    pub fn with_teams<I, T>(mut self, teams: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Identity>,
    {
        self.team_memberships.extend(teams.into_iter().map(Into::into));
        self
    }
}

/// The set of identities currently holding an approving review.
///
/// Contains each reviewer whose latest review approves, plus every team
/// identity with at least one such member. This is the value the expression
/// evaluator consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovalState {
    approved: BTreeSet<Identity>,
}

impl ApprovalState {
    /// Creates an empty approval state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an approval state directly from a set of identities.
    ///
    /// For callers that already hold the flat approved set (and for tests);
    /// integration layers normally fold review events instead.
    pub fn from_identities<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Identity>,
    {
        Self {
            approved: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Folds a chronological sequence of review events into an approval state.
    ///
    /// A reviewer's most recent event wins: a later dismissal, comment, or
    /// changes-requested review removes an earlier approval. A team identity
    /// is included iff at least one of its members' latest review approves.
    pub fn from_events(events: impl IntoIterator<Item = ReviewEvent>) -> Self {
        let mut latest: BTreeMap<Identity, ReviewEvent> = BTreeMap::new();
        for event in events {
            latest.insert(event.reviewer.clone(), event);
        }

        let mut approved = BTreeSet::new();
        for (reviewer, event) in latest {
            if event.state == ReviewState::Approved {
                approved.insert(reviewer);
                approved.extend(event.team_memberships);
            }
        }
        Self { approved }
    }

    /// Records an approving identity.
    pub fn insert(&mut self, id: impl Into<Identity>) {
        self.approved.insert(id.into());
    }

    /// Returns `true` if the identity currently approves.
    pub fn contains(&self, id: &Identity) -> bool {
        self.approved.contains(id)
    }

    /// Iterates the approving identities in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.approved.iter()
    }

    /// Returns the number of approving identities.
    pub fn len(&self) -> usize {
        self.approved.len()
    }

    /// Returns `true` if nobody currently approves.
    pub fn is_empty(&self) -> bool {
        self.approved.is_empty()
    }
}

impl<T: Into<Identity>> FromIterator<T> for ApprovalState {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_identities(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identity {
        Identity::new(s)
    }

    #[test]
    fn test_latest_review_wins() {
        let state = ApprovalState::from_events([
            ReviewEvent::new("alice", ReviewState::Approved),
            ReviewEvent::new("alice", ReviewState::ChangesRequested),
        ]);
        assert!(!state.contains(&id("alice")));

        let state = ApprovalState::from_events([
            ReviewEvent::new("alice", ReviewState::ChangesRequested),
            ReviewEvent::new("alice", ReviewState::Approved),
        ]);
        assert!(state.contains(&id("alice")));
    }

    #[test]
    fn test_dismissal_removes_approval() {
        let state = ApprovalState::from_events([
            ReviewEvent::new("alice", ReviewState::Approved),
            ReviewEvent::new("alice", ReviewState::Dismissed),
        ]);
        assert!(state.is_empty());
    }

    #[test]
    fn test_comment_does_not_approve() {
        let state = ApprovalState::from_events([ReviewEvent::new("bob", ReviewState::Commented)]);
        assert!(state.is_empty());
    }

    #[test]
    fn test_team_included_via_approving_member() {
        let state = ApprovalState::from_events([
            ReviewEvent::new("alice", ReviewState::Approved).with_team("org/security"),
        ]);
        assert!(state.contains(&id("alice")));
        assert!(state.contains(&id("org/security")));
    }

    #[test]
    fn test_team_dropped_when_member_superseded() {
        let state = ApprovalState::from_events([
            ReviewEvent::new("alice", ReviewState::Approved).with_team("org/security"),
            ReviewEvent::new("alice", ReviewState::ChangesRequested).with_team("org/security"),
        ]);
        assert!(!state.contains(&id("org/security")));
    }

    #[test]
    fn test_team_survives_if_another_member_approves() {
        let state = ApprovalState::from_events([
            ReviewEvent::new("alice", ReviewState::Approved).with_team("org/security"),
            ReviewEvent::new("bob", ReviewState::Approved).with_team("org/security"),
            ReviewEvent::new("alice", ReviewState::Dismissed).with_team("org/security"),
        ]);
        assert!(!state.contains(&id("alice")));
        assert!(state.contains(&id("bob")));
        assert!(state.contains(&id("org/security")));
    }

    #[test]
    fn test_independent_reviewers() {
        let state = ApprovalState::from_events([
            ReviewEvent::new("alice", ReviewState::Approved),
            ReviewEvent::new("bob", ReviewState::ChangesRequested),
            ReviewEvent::new("carol", ReviewState::Approved).with_teams(["org/a", "org/b"]),
        ]);
        assert_eq!(state.len(), 4);
        assert!(state.contains(&id("alice")));
        assert!(!state.contains(&id("bob")));
        assert!(state.contains(&id("org/a")));
        assert!(state.contains(&id("org/b")));
    }

    #[test]
    fn test_events_and_identities_agree() {
        let from_events = ApprovalState::from_events([
            ReviewEvent::new("platform", ReviewState::Approved),
            ReviewEvent::new("security", ReviewState::Approved),
        ]);
        let from_identities = ApprovalState::from_identities(["platform", "security"]);
        assert_eq!(from_events, from_identities);
    }
}
