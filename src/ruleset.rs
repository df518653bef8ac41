use std::collections::BTreeMap;
use std::str::FromStr;

use crate::parser::{self, ParseError, ParseWarning};
use crate::review::ApprovalState;
use crate::rule::Rule;
use crate::verdict::{FileVerdict, Verdict};

/// An ordered sequence of ownership rules.
///
/// Rules keep their declaration order, and order is significant: when several
/// patterns match a path, the **last** matching rule governs it, mirroring
/// ignore-file precedence where later, more specific patterns override
/// earlier, more general ones.
///
/// A rule set is immutable once parsed; re-parse the document to pick up
/// changes.
///
/// # Example
///
/// ```
/// use mergecap::{ApprovalState, RuleSet};
///
/// let document = "\
/// #@BOOL *.config.js (devops OR platform) AND security
/// *.config.js devops platform security
/// ";
/// let rules = RuleSet::parse(document)?;
///
/// let approved = ApprovalState::from_identities(["platform", "security"]);
/// let verdict = rules.resolve(["app.config.js"], &approved);
/// assert!(verdict.mergeable());
///
/// let approved = ApprovalState::from_identities(["platform"]);
/// let verdict = rules.resolve(["app.config.js"], &approved);
/// assert!(!verdict.mergeable());
/// # Ok::<(), mergecap::ParseError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    warnings: Vec<ParseWarning>,
}

impl RuleSet {
    /// Parses a rule document into a rule set.
    ///
    /// Stops at the first malformed line; see [`ParseError`] for the
    /// conditions. Non-fatal conditions are collected as [`warnings`].
    ///
    /// [`warnings`]: RuleSet::warnings
    pub fn parse(document: &str) -> Result<Self, ParseError> {
        let parsed = parser::parse_document(document)?;
        Ok(Self {
            rules: parsed.rules,
            warnings: parsed.warnings,
        })
    }

    /// Creates a rule set from already-built rules.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            warnings: Vec::new(),
        }
    }

    /// Creates an empty rule set.
    ///
    /// An empty rule set requires no approvals: every path resolves to no
    /// rule and is satisfied by default.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the rules in declaration order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns the warnings collected while parsing.
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    /// Returns the rule governing a path: the last declared rule whose
    /// pattern matches, or `None` if no pattern matches.
    pub fn resolve_path(&self, path: &str) -> Option<&Rule> {
        self.rules.iter().rev().find(|rule| rule.matches(path))
    }

    /// Resolves a changed-path list against an approval set.
    ///
    /// Each path is governed by its last matching rule; a path matching no
    /// rule carries no approval requirement and is satisfied by default.
    /// The change set is mergeable iff every path is satisfied.
    ///
    /// Resolution is recomputed in full on every call and is a pure function
    /// of its inputs: identical rules, paths, and approvals always produce
    /// an identical [`Verdict`].
    pub fn resolve<I, S>(&self, changed_paths: I, approved: &ApprovalState) -> Verdict
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut mergeable = true;
        let mut files = BTreeMap::new();

        for path in changed_paths {
            let path = path.as_ref();
            let verdict = match self.resolve_path(path) {
                Some(rule) => {
                    let result = rule.evaluate(approved);
                    if !result.satisfied {
                        mergeable = false;
                    }
                    FileVerdict::new(Some(rule.clone()), result.satisfied, result.unmet)
                }
                None => FileVerdict::new(None, true, None),
            };
            files.insert(path.to_string(), verdict);
        }

        Verdict::new(mergeable, files)
    }
}

impl FromStr for RuleSet {
    type Err = ParseError;

    fn from_str(document: &str) -> Result<Self, Self::Err> {
        Self::parse(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    fn approved(ids: &[&str]) -> ApprovalState {
        ApprovalState::from_identities(ids.iter().copied())
    }

    #[test]
    fn test_empty_ruleset_is_satisfied() {
        let rules = RuleSet::empty();
        let verdict = rules.resolve(["src/main.rs"], &approved(&[]));
        assert!(verdict.mergeable());
        assert!(verdict.file("src/main.rs").unwrap().rule().is_none());
    }

    #[test]
    fn test_last_match_wins() {
        let rules = RuleSet::parse("* alpha\n*.js beta\n").unwrap();

        let rule = rules.resolve_path("x.js").unwrap();
        assert_eq!(rule.expr(), &Expr::identity("beta"));

        let rule = rules.resolve_path("x.go").unwrap();
        assert_eq!(rule.expr(), &Expr::identity("alpha"));
    }

    #[test]
    fn test_later_specific_rule_overrides_general() {
        let document = "\
* org/everyone
src/crypto/ org/security
";
        let rules = RuleSet::parse(document).unwrap();

        let verdict = rules.resolve(["src/crypto/aes.rs"], &approved(&["org/everyone"]));
        assert!(!verdict.mergeable());

        let verdict = rules.resolve(["src/crypto/aes.rs"], &approved(&["org/security"]));
        assert!(verdict.mergeable());
    }

    #[test]
    fn test_unmatched_path_is_satisfied() {
        let rules = RuleSet::parse("*.js alice\n").unwrap();
        let verdict = rules.resolve(["README.md"], &approved(&[]));
        assert!(verdict.mergeable());
        let file = verdict.file("README.md").unwrap();
        assert!(file.rule().is_none());
        assert!(file.satisfied());
    }

    #[test]
    fn test_one_blocked_path_blocks_the_change_set() {
        let rules = RuleSet::parse("*.js alice\n*.go bob\n").unwrap();
        let verdict = rules.resolve(["a.js", "b.go"], &approved(&["alice"]));

        assert!(!verdict.mergeable());
        assert!(verdict.file("a.js").unwrap().satisfied());
        assert!(!verdict.file("b.go").unwrap().satisfied());

        let blocked: Vec<_> = verdict.unsatisfied().map(|(path, _)| path).collect();
        assert_eq!(blocked, vec!["b.go"]);
    }

    #[test]
    fn test_verdict_reports_governing_rule_and_unmet() {
        let document = "\
#@BOOL *.config.js (devops OR platform) AND security
*.config.js devops platform security
";
        let rules = RuleSet::parse(document).unwrap();
        let verdict = rules.resolve(["app.config.js"], &approved(&["platform"]));

        let file = verdict.file("app.config.js").unwrap();
        assert_eq!(file.rule().unwrap().source_line(), 2);
        assert_eq!(file.unmet(), Some(&Expr::identity("security")));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let rules = RuleSet::parse("* alice\n*.js bob\n").unwrap();
        let state = approved(&["bob"]);
        let first = rules.resolve(["x.js", "y.go"], &state);
        let second = rules.resolve(["x.js", "y.go"], &state);
        assert_eq!(first, second);
    }

    #[test]
    fn test_idempotent_under_no_op_review_events() {
        use crate::review::{ReviewEvent, ReviewState};

        let rules = RuleSet::parse("*.js alice bob\n").unwrap();
        let before = ApprovalState::from_events([
            ReviewEvent::new("alice", ReviewState::Approved),
        ]);
        // A comment from a third party does not change the approved set.
        let after = ApprovalState::from_events([
            ReviewEvent::new("alice", ReviewState::Approved),
            ReviewEvent::new("carol", ReviewState::Commented),
        ]);

        assert_eq!(before, after);
        assert_eq!(
            rules.resolve(["a.js"], &before),
            rules.resolve(["a.js"], &after)
        );
    }

    #[test]
    fn test_end_to_end_scenario() {
        let document = "\
#@BOOL *.config.js (devops OR platform) AND security
*.config.js devops platform security
";
        let rules = RuleSet::parse(document).unwrap();

        let verdict = rules.resolve(["app.config.js"], &approved(&["platform", "security"]));
        assert!(verdict.mergeable());

        let verdict = rules.resolve(["app.config.js"], &approved(&["platform"]));
        assert!(!verdict.mergeable());
        assert_eq!(
            verdict.file("app.config.js").unwrap().unmet(),
            Some(&Expr::identity("security"))
        );
    }

    #[test]
    fn test_from_str() {
        let rules: RuleSet = "*.js alice\n".parse().unwrap();
        assert_eq!(rules.rules().len(), 1);
    }
}
