//! Mergecap: a library for expressing and evaluating boolean approval rules
//! over code-ownership files.
//!
//! Mergecap extends the flat "any owner of this path approves" rule of a
//! conventional ownership file with boolean logic: a comment-form directive
//! placed above a rule combines the rule's owners with `AND`, `OR`, and
//! parentheses, and merge eligibility is decided by evaluating the resulting
//! expressions against the set of identities that currently approve.
//!
//! The engine is pure and synchronous: parse a document into a [`RuleSet`],
//! fold review events into an [`ApprovalState`], and resolve a changed-path
//! list into a [`Verdict`]. Fetching reviews, posting comments, and merging
//! belong to the surrounding integration layer.
//!
//! # Example
//!
//! ```
//! use mergecap::{ApprovalState, ReviewEvent, ReviewState, RuleSet};
//!
//! let document = "\
//! # Config changes need an infra owner plus a security sign-off.
//! #@BOOL *.config.js (devops OR platform) AND security
//! *.config.js devops platform security
//! ";
//! let rules = RuleSet::parse(document)?;
//!
//! let approved = ApprovalState::from_events([
//!     ReviewEvent::new("platform", ReviewState::Approved),
//!     ReviewEvent::new("security", ReviewState::Approved),
//! ]);
//!
//! let verdict = rules.resolve(["app.config.js", "docs/intro.md"], &approved);
//! assert!(verdict.mergeable());
//!
//! // A path matching no rule carries no requirement.
//! assert!(verdict.file("docs/intro.md").unwrap().rule().is_none());
//!
//! // Without the security approval the change set is blocked, and the
//! // verdict pinpoints what is still missing.
//! let approved = ApprovalState::from_events([
//!     ReviewEvent::new("platform", ReviewState::Approved),
//! ]);
//! let verdict = rules.resolve(["app.config.js"], &approved);
//! assert!(!verdict.mergeable());
//! let unmet = verdict.file("app.config.js").unwrap().unmet().unwrap();
//! assert_eq!(unmet.to_string(), "security");
//! # Ok::<(), mergecap::ParseError>(())
//! ```

mod expr;
mod identity;
mod parser;
mod pattern;
mod review;
mod rule;
mod ruleset;
mod verdict;

#[cfg(feature = "events")]
pub mod events;

pub use expr::{Evaluation, Expr};
pub use identity::Identity;
pub use parser::{ParseError, ParseWarning};
pub use pattern::{Pattern, PatternError};
pub use review::{ApprovalState, ReviewEvent, ReviewState};
pub use rule::Rule;
pub use ruleset::RuleSet;
pub use verdict::{FileVerdict, Verdict};
