use std::fmt;

use crate::identity::Identity;
use crate::review::ApprovalState;

/// A boolean requirement over approver identities.
///
/// Expressions are built either implicitly (a bare owner list on a rule is
/// the `Or` of all its owners) or explicitly (from a boolean directive, which
/// may group the same owners differently).
///
/// # Example
///
/// ```
/// use mergecap::{ApprovalState, Expr};
///
/// // (devops OR platform) AND security
/// let expr = Expr::and(
///     Expr::or(Expr::identity("devops"), Expr::identity("platform")),
///     Expr::identity("security"),
/// );
///
/// let approved = ApprovalState::from_identities(["platform"]);
/// let result = expr.evaluate(&approved);
/// assert!(!result.satisfied);
/// assert_eq!(result.unmet.unwrap().to_string(), "security");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Satisfied iff the identity is in the approved set.
    Identity(Identity),
    /// Satisfied iff both sides are satisfied.
    And(Box<Expr>, Box<Expr>),
    /// Satisfied iff either side is satisfied.
    Or(Box<Expr>, Box<Expr>),
}

/// The result of evaluating an expression against an approval set.
///
/// `unmet` is `None` exactly when the expression is satisfied; otherwise it
/// holds the still-missing portion of the requirement, pruned of everything
/// already satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Whether the expression is satisfied.
    pub satisfied: bool,
    /// The unsatisfied remainder of the expression, if any.
    pub unmet: Option<Expr>,
}

impl Evaluation {
    fn satisfied() -> Self {
        Self {
            satisfied: true,
            unmet: None,
        }
    }

    fn unmet(expr: Expr) -> Self {
        Self {
            satisfied: false,
            unmet: Some(expr),
        }
    }
}

impl Expr {
    /// Creates a leaf requiring approval from a single identity.
    pub fn identity(id: impl Into<Identity>) -> Self {
        Expr::Identity(id.into())
    }

    /// Creates a conjunction of two requirements.
    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::And(Box::new(left), Box::new(right))
    }

    /// Creates a disjunction of two requirements.
    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::Or(Box::new(left), Box::new(right))
    }

    /// Builds the `Or` of all given identities, left-associated, or `None`
    /// for an empty list.
    ///
    /// This is the implicit expression of a plain ownership rule: any one
    /// listed owner approves.
    pub(crate) fn any_of(ids: impl IntoIterator<Item = Identity>) -> Option<Self> {
        let mut ids = ids.into_iter();
        let first = Expr::Identity(ids.next()?);
        Some(ids.fold(first, |acc, id| Expr::or(acc, Expr::Identity(id))))
    }

    /// Evaluates this expression against a set of approving identities.
    ///
    /// Evaluation is a pure function of the tree and the approval set:
    /// identical inputs always produce an identical result.
    ///
    /// - A leaf is satisfied iff its identity is in the set.
    /// - An `And` reports only its unsatisfied sides, so partial progress
    ///   surfaces precisely.
    /// - An unsatisfied `Or` reports both branches, since the caller does
    ///   not know which one the author intends to pursue.
    pub fn evaluate(&self, approved: &ApprovalState) -> Evaluation {
        match self {
            Expr::Identity(id) => {
                if approved.contains(id) {
                    Evaluation::satisfied()
                } else {
                    Evaluation::unmet(self.clone())
                }
            }
            Expr::And(left, right) => {
                let left = left.evaluate(approved);
                let right = right.evaluate(approved);
                match (left.unmet, right.unmet) {
                    (None, None) => Evaluation::satisfied(),
                    (Some(unmet), None) | (None, Some(unmet)) => Evaluation::unmet(unmet),
                    (Some(l), Some(r)) => Evaluation::unmet(Expr::and(l, r)),
                }
            }
            Expr::Or(left, right) => {
                let left = left.evaluate(approved);
                let right = right.evaluate(approved);
                match (left.unmet, right.unmet) {
                    (Some(l), Some(r)) => Evaluation::unmet(Expr::or(l, r)),
                    _ => Evaluation::satisfied(),
                }
            }
        }
    }

    /// Returns the identities referenced by this expression, in reading order.
    pub fn identities(&self) -> Vec<&Identity> {
        let mut out = Vec::new();
        self.collect_identities(&mut out);
        out
    }

    fn collect_identities<'a>(&'a self, out: &mut Vec<&'a Identity>) {
        match self {
            Expr::Identity(id) => out.push(id),
            Expr::And(left, right) | Expr::Or(left, right) => {
                left.collect_identities(out);
                right.collect_identities(out);
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Identity(_) => 3,
            Expr::And(_, _) => 2,
            Expr::Or(_, _) => 1,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parent: u8, is_right: bool) -> fmt::Result {
        // A right-hand child at equal precedence needs parentheses so the
        // rendered text re-parses to the same left-associated shape.
        let parens = self.precedence() < parent || (is_right && self.precedence() == parent);
        if parens {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

/// Renders the expression in directive syntax, losslessly.
///
/// `AND` binds tighter than `OR`; parentheses appear exactly where the
/// structure requires them, so re-parsing the rendered text reproduces the
/// tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Identity(id) => write!(f, "{}", id),
            Expr::And(left, right) => {
                left.fmt_operand(f, 2, false)?;
                f.write_str(" AND ")?;
                right.fmt_operand(f, 2, true)
            }
            Expr::Or(left, right) => {
                left.fmt_operand(f, 1, false)?;
                f.write_str(" OR ")?;
                right.fmt_operand(f, 1, true)
            }
        }
    }
}
