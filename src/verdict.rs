use std::collections::BTreeMap;

use crate::expr::Expr;
use crate::rule::Rule;

/// The per-path outcome of resolving a change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileVerdict {
    rule: Option<Rule>,
    satisfied: bool,
    unmet: Option<Expr>,
}

impl FileVerdict {
    pub(crate) fn new(rule: Option<Rule>, satisfied: bool, unmet: Option<Expr>) -> Self {
        Self {
            rule,
            satisfied,
            unmet,
        }
    }

    /// Returns the rule governing the path, or `None` if no pattern matched.
    pub fn rule(&self) -> Option<&Rule> {
        self.rule.as_ref()
    }

    /// Returns whether the path's requirement is satisfied.
    pub fn satisfied(&self) -> bool {
        self.satisfied
    }

    /// Returns the still-missing portion of the requirement, if any.
    ///
    /// Rendering this with `Display` produces the "missing: ..." text an
    /// integration layer would post back to reviewers.
    pub fn unmet(&self) -> Option<&Expr> {
        self.unmet.as_ref()
    }
}

/// The computed mergeability of a change set.
///
/// A verdict is derived data: it is recomputed on every resolution request
/// and never persisted. Per-path details are retained so callers can report
/// which rule and which sub-condition is outstanding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    mergeable: bool,
    files: BTreeMap<String, FileVerdict>,
}

impl Verdict {
    pub(crate) fn new(mergeable: bool, files: BTreeMap<String, FileVerdict>) -> Self {
        Self { mergeable, files }
    }

    /// Returns `true` if every changed path's requirement is satisfied.
    pub fn mergeable(&self) -> bool {
        self.mergeable
    }

    /// Returns the per-path outcomes, keyed by path.
    pub fn files(&self) -> &BTreeMap<String, FileVerdict> {
        &self.files
    }

    /// Returns the outcome for a single path, if it was part of the change
    /// set.
    pub fn file(&self, path: &str) -> Option<&FileVerdict> {
        self.files.get(path)
    }

    /// Iterates the paths whose requirements are not satisfied, in sorted
    /// order.
    pub fn unsatisfied(&self) -> impl Iterator<Item = (&str, &FileVerdict)> {
        self.files
            .iter()
            .filter(|(_, verdict)| !verdict.satisfied)
            .map(|(path, verdict)| (path.as_str(), verdict))
    }
}
