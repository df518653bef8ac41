//! Ownership-rule document parsing.
//!
//! A rule document is processed line by line:
//!
//! - **Blank lines** are ignored.
//! - **Comments** start with `#` in the first column.
//! - **Plain rules** are `pattern owner1 owner2 ...`; the owners form an
//!   implicit `OR` (any one owner approves).
//! - **Boolean directives** are comment-form lines of the shape
//!   `#@BOOL pattern expression` placed immediately above the plain rule
//!   they annotate. The expression may combine the rule's owners with
//!   `AND`, `OR` (case-insensitive; `AND` binds tighter) and parentheses,
//!   and must reference exactly the owners the rule lists. The directive's
//!   pattern must repeat the rule's pattern verbatim.
//!
//! A directive that is not immediately followed by a plain rule — because a
//! blank line, a comment, another directive, or the end of the document
//! intervenes — is discarded with a warning rather than an error.
//!
//! The parser stops at the first error and reports the offending line: a
//! half-parsed ownership policy is unsafe to act on.

use std::fmt;

use thiserror::Error;

use crate::expr::Expr;
use crate::identity::Identity;
use crate::pattern::{Pattern, PatternError};
use crate::rule::Rule;

/// The fixed prefix token marking a boolean directive line.
pub(crate) const DIRECTIVE_MARKER: &str = "#@BOOL";

/// Error type for rule document parsing failures.
///
/// Every variant carries the 1-based line number of the offending line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The rule's pattern was malformed.
    #[error("line {line}: {source}")]
    Pattern {
        line: usize,
        #[source]
        source: PatternError,
    },

    /// A rule listed no owners. Such a rule can never be satisfied and is
    /// almost certainly a document mistake.
    #[error("line {line}: rule has no owners")]
    EmptyOwners { line: usize },

    /// A directive line was missing its pattern or its expression.
    #[error("line {line}: boolean directive is missing a pattern or expression")]
    MalformedDirective { line: usize },

    /// A directive expression had unbalanced parentheses.
    #[error("line {line}: unbalanced parentheses in boolean expression")]
    UnbalancedParens { line: usize },

    /// A token appeared where `AND` or `OR` was expected.
    #[error("line {line}: expected AND or OR, found `{token}`")]
    UnknownOperator { line: usize, token: String },

    /// An operator or closing parenthesis appeared where an approver was
    /// expected.
    #[error("line {line}: expected an approver, found `{token}`")]
    ExpectedOperand { line: usize, token: String },

    /// A directive expression ended while an approver was still expected.
    #[error("line {line}: boolean expression ends unexpectedly")]
    UnexpectedEnd { line: usize },

    /// A directive referenced an identity the annotated rule does not list.
    #[error("line {line}: directive references `{identity}` but the rule's owners do not include it")]
    UndeclaredIdentity { line: usize, identity: Identity },

    /// The annotated rule listed an owner the directive never references.
    #[error("line {line}: owner `{identity}` is not referenced by the directive")]
    UnreferencedOwner { line: usize, identity: Identity },

    /// A directive's pattern did not repeat the annotated rule's pattern.
    #[error("line {line}: directive pattern `{directive}` does not match rule pattern `{rule}`")]
    PatternMismatch {
        line: usize,
        directive: String,
        rule: String,
    },
}

/// A non-fatal condition noticed while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// A boolean directive was not immediately followed by a plain rule and
    /// was ignored.
    DiscardedDirective { line: usize },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::DiscardedDirective { line } => {
                write!(f, "line {line}: boolean directive does not immediately precede a rule; ignored")
            }
        }
    }
}

/// The outcome of a successful parse.
#[derive(Debug, PartialEq)]
pub(crate) struct ParsedDocument {
    pub(crate) rules: Vec<Rule>,
    pub(crate) warnings: Vec<ParseWarning>,
}

/// A directive line waiting for the plain rule it annotates.
struct PendingDirective {
    line: usize,
    pattern_text: String,
    expr_text: String,
}

/// Parses a rule document into an ordered rule sequence.
pub(crate) fn parse_document(document: &str) -> Result<ParsedDocument, ParseError> {
    let mut rules = Vec::new();
    let mut warnings = Vec::new();
    let mut pending: Option<PendingDirective> = None;

    for (index, raw) in document.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.strip_suffix('\r').unwrap_or(raw).trim_start();

        if line.is_empty() {
            discard_pending(&mut pending, &mut warnings);
            continue;
        }

        if let Some(rest) = line.strip_prefix(DIRECTIVE_MARKER) {
            if rest.starts_with(char::is_whitespace) {
                discard_pending(&mut pending, &mut warnings);
                pending = Some(parse_directive_line(rest, line_no)?);
                continue;
            }
            if rest.is_empty() {
                return Err(ParseError::MalformedDirective { line: line_no });
            }
            // `#@BOOLEAN` and the like are ordinary comments.
        }

        if line.starts_with('#') {
            discard_pending(&mut pending, &mut warnings);
            continue;
        }

        let tokens = split_tokens(line);
        let Some((pattern_text, owner_tokens)) = tokens.split_first() else {
            continue;
        };
        if owner_tokens.is_empty() {
            return Err(ParseError::EmptyOwners { line: line_no });
        }

        let pattern = Pattern::parse(pattern_text).map_err(|source| ParseError::Pattern {
            line: line_no,
            source,
        })?;

        // Duplicates collapse; order is preserved for deterministic reporting.
        let mut owners: Vec<Identity> = Vec::new();
        for token in owner_tokens {
            let id = Identity::new(token);
            if !owners.contains(&id) {
                owners.push(id);
            }
        }

        let expr = match pending.take() {
            Some(directive) => {
                if directive.pattern_text != *pattern_text {
                    return Err(ParseError::PatternMismatch {
                        line: directive.line,
                        directive: directive.pattern_text,
                        rule: pattern_text.clone(),
                    });
                }
                let expr = parse_expression(&directive.expr_text, directive.line)?;
                validate_owner_coverage(&expr, &owners, directive.line)?;
                expr
            }
            None => Expr::any_of(owners).ok_or(ParseError::EmptyOwners { line: line_no })?,
        };

        rules.push(Rule::new(pattern, expr, line_no));
    }

    discard_pending(&mut pending, &mut warnings);

    Ok(ParsedDocument { rules, warnings })
}

fn discard_pending(pending: &mut Option<PendingDirective>, warnings: &mut Vec<ParseWarning>) {
    if let Some(directive) = pending.take() {
        warnings.push(ParseWarning::DiscardedDirective {
            line: directive.line,
        });
    }
}

fn parse_directive_line(rest: &str, line: usize) -> Result<PendingDirective, ParseError> {
    let rest = rest.trim();
    let (pattern_text, expr_text) = split_first_token(rest);
    let expr_text = expr_text.trim();
    if pattern_text.is_empty() || expr_text.is_empty() {
        return Err(ParseError::MalformedDirective { line });
    }
    Ok(PendingDirective {
        line,
        pattern_text,
        expr_text: expr_text.to_string(),
    })
}

/// Splits a line into whitespace-separated tokens, honoring backslash
/// escapes (`ends\ with\ space` stays one token).
fn split_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            current.push(c);
            if let Some(next) = chars.next() {
                current.push(next);
            }
        } else if c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Splits off the first token of a line, returning it with the remainder.
fn split_first_token(text: &str) -> (String, &str) {
    let mut token = String::new();
    let mut iter = text.char_indices();
    let mut rest_start = text.len();
    while let Some((i, c)) = iter.next() {
        if c == '\\' {
            token.push(c);
            if let Some((_, next)) = iter.next() {
                token.push(next);
            }
        } else if c.is_whitespace() {
            rest_start = i;
            break;
        } else {
            token.push(c);
        }
    }
    (token, &text[rest_start..])
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ExprToken {
    Open,
    Close,
    And,
    Or,
    Word(String),
}

impl ExprToken {
    fn text(&self) -> &str {
        match self {
            ExprToken::Open => "(",
            ExprToken::Close => ")",
            ExprToken::And => "AND",
            ExprToken::Or => "OR",
            ExprToken::Word(word) => word,
        }
    }
}

fn tokenize(text: &str) -> Vec<ExprToken> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for c in text.chars() {
        match c {
            '(' | ')' => {
                flush_word(&mut word, &mut tokens);
                tokens.push(if c == '(' {
                    ExprToken::Open
                } else {
                    ExprToken::Close
                });
            }
            c if c.is_whitespace() => flush_word(&mut word, &mut tokens),
            c => word.push(c),
        }
    }
    flush_word(&mut word, &mut tokens);
    tokens
}

fn flush_word(word: &mut String, tokens: &mut Vec<ExprToken>) {
    if word.is_empty() {
        return;
    }
    let token = if word.eq_ignore_ascii_case("and") {
        ExprToken::And
    } else if word.eq_ignore_ascii_case("or") {
        ExprToken::Or
    } else {
        ExprToken::Word(std::mem::take(word))
    };
    word.clear();
    tokens.push(token);
}

/// Parses a directive expression.
///
/// Grammar, with `AND` binding tighter than `OR` and both left-associative:
///
/// ```text
/// expression := and_expr (OR and_expr)*
/// and_expr   := primary (AND primary)*
/// primary    := APPROVER | '(' expression ')'
/// ```
pub(crate) fn parse_expression(text: &str, line: usize) -> Result<Expr, ParseError> {
    let tokens = tokenize(text);

    let opens = tokens.iter().filter(|t| **t == ExprToken::Open).count();
    let closes = tokens.iter().filter(|t| **t == ExprToken::Close).count();
    if opens != closes {
        return Err(ParseError::UnbalancedParens { line });
    }

    let mut parser = ExprParser {
        tokens: &tokens,
        pos: 0,
        line,
    };
    let expr = parser.or_expr()?;
    match parser.next() {
        None => Ok(expr),
        Some(ExprToken::Close) => Err(ParseError::UnbalancedParens { line }),
        Some(token) => Err(ParseError::UnknownOperator {
            line,
            token: token.text().to_string(),
        }),
    }
}

struct ExprParser<'a> {
    tokens: &'a [ExprToken],
    pos: usize,
    line: usize,
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<&'a ExprToken> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a ExprToken> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, want: &ExprToken) -> bool {
        if self.peek() == Some(want) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.and_expr()?;
        while self.eat(&ExprToken::Or) {
            let right = self.and_expr()?;
            left = Expr::or(left, right);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.primary()?;
        while self.eat(&ExprToken::And) {
            let right = self.primary()?;
            left = Expr::and(left, right);
        }
        Ok(left)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.next() {
            Some(ExprToken::Word(word)) => Ok(Expr::identity(word.as_str())),
            Some(ExprToken::Open) => {
                let expr = self.or_expr()?;
                match self.next() {
                    Some(ExprToken::Close) => Ok(expr),
                    Some(token) => Err(ParseError::UnknownOperator {
                        line: self.line,
                        token: token.text().to_string(),
                    }),
                    None => Err(ParseError::UnbalancedParens { line: self.line }),
                }
            }
            Some(token) => Err(ParseError::ExpectedOperand {
                line: self.line,
                token: token.text().to_string(),
            }),
            None => Err(ParseError::UnexpectedEnd { line: self.line }),
        }
    }
}

/// Checks that a directive expression references exactly the rule's owners.
fn validate_owner_coverage(
    expr: &Expr,
    owners: &[Identity],
    line: usize,
) -> Result<(), ParseError> {
    let referenced = expr.identities();
    for id in &referenced {
        if !owners.contains(id) {
            return Err(ParseError::UndeclaredIdentity {
                line,
                identity: (*id).clone(),
            });
        }
    }
    for owner in owners {
        if !referenced.contains(&owner) {
            return Err(ParseError::UnreferencedOwner {
                line,
                identity: owner.clone(),
            });
        }
    }
    Ok(())
}
