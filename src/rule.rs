use crate::expr::{Evaluation, Expr};
use crate::pattern::Pattern;
use crate::review::ApprovalState;

/// A rule pairs a path pattern with the boolean requirement its owners form.
///
/// Rules live in a [`RuleSet`](crate::RuleSet) in declaration order; the
/// last rule whose pattern matches a path is the one that governs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pattern: Pattern,
    expr: Expr,
    source_line: usize,
}

impl Rule {
    /// Creates a rule from a pattern, an expression, and the 1-based line it
    /// was declared on.
    pub fn new(pattern: Pattern, expr: Expr, source_line: usize) -> Self {
        Self {
            pattern,
            expr,
            source_line,
        }
    }

    /// Returns the pattern for this rule.
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Returns the approval requirement for this rule.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Returns the 1-based line this rule was declared on.
    pub fn source_line(&self) -> usize {
        self.source_line
    }

    /// Tests whether this rule's pattern matches a path.
    pub fn matches(&self, path: &str) -> bool {
        self.pattern.matches(path)
    }

    /// Evaluates this rule's requirement against an approval set.
    pub fn evaluate(&self, approved: &ApprovalState) -> Evaluation {
        self.expr.evaluate(approved)
    }
}
