//! Mergecap offline checker
//!
//! Evaluates a changed-path list against a boolean ownership-rule document,
//! the way a merge gate would in CI, using locally recorded inputs: the rule
//! document, the diff's path list, and an optional JSON review-event log.
//! No network access anywhere.
//!
//! # Usage
//!
//! ```bash
//! mergecap-check --rules .github/CODEOWNERS \
//!     --changed changed-paths.txt \
//!     --reviews reviews.json
//! ```
//!
//! Exits 0 when the change set is mergeable, 1 when an approval requirement
//! is unmet, and 2 when an input could not be read or parsed.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use mergecap::events::{EventError, approval_state_from_json};
use mergecap::{ApprovalState, ParseError, RuleSet, Verdict};
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Parser, Debug)]
#[command(name = "mergecap-check")]
#[command(about = "Evaluates changed paths against boolean ownership rules")]
struct Args {
    /// Path to the ownership rule document
    #[arg(long, default_value = ".github/CODEOWNERS")]
    rules: PathBuf,

    /// File listing the changed paths, one per line
    #[arg(long)]
    changed: PathBuf,

    /// JSON review-event log; the approval set is empty if omitted
    #[arg(long)]
    reviews: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum CheckError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Events(#[from] EventError),
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose {
        "mergecap_check=debug"
    } else {
        "mergecap_check=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(verdict) => {
            print!("{}", render_report(&verdict));
            if verdict.mergeable() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(err) => {
            error!("{err}");
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> Result<Verdict, CheckError> {
    let document = read(&args.rules)?;
    let rules = RuleSet::parse(&document)?;
    for warning in rules.warnings() {
        warn!("{}: {warning}", args.rules.display());
    }
    debug!(
        "loaded {} rules from {}",
        rules.rules().len(),
        args.rules.display()
    );

    let changed = read(&args.changed)?;
    let paths: Vec<&str> = changed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let approved = match &args.reviews {
        Some(path) => approval_state_from_json(&read(path)?)?,
        None => ApprovalState::new(),
    };
    debug!("{} identities currently approve", approved.len());

    Ok(rules.resolve(paths, &approved))
}

fn read(path: &Path) -> Result<String, CheckError> {
    fs::read_to_string(path).map_err(|source| CheckError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Renders the per-path report followed by the overall verdict line.
fn render_report(verdict: &Verdict) -> String {
    let mut out = String::new();
    for (path, file) in verdict.files() {
        if file.satisfied() {
            let _ = writeln!(out, "ok      {path}");
        } else if let Some(unmet) = file.unmet() {
            let line = file.rule().map_or(0, |rule| rule.source_line());
            let _ = writeln!(out, "blocked {path}  missing: {unmet}  (rule at line {line})");
        }
    }

    let total = verdict.files().len();
    if verdict.mergeable() {
        let _ = writeln!(out, "mergeable: all {total} changed paths satisfied");
    } else {
        let blocked = verdict.unsatisfied().count();
        let _ = writeln!(out, "not mergeable: {blocked} of {total} changed paths unsatisfied");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn args(rules: PathBuf, changed: PathBuf, reviews: Option<PathBuf>) -> Args {
        Args {
            rules,
            changed,
            reviews,
            verbose: false,
        }
    }

    #[test]
    fn test_run_mergeable() {
        let dir = tempfile::tempdir().unwrap();
        let rules = write_file(
            &dir,
            "CODEOWNERS",
            "#@BOOL *.config.js (devops OR platform) AND security\n\
             *.config.js devops platform security\n",
        );
        let changed = write_file(&dir, "changed.txt", "app.config.js\nREADME.md\n");
        let reviews = write_file(
            &dir,
            "reviews.json",
            r#"[
                {"reviewer": "platform", "state": "approved"},
                {"reviewer": "security", "state": "approved"}
            ]"#,
        );

        let verdict = run(&args(rules, changed, Some(reviews))).unwrap();
        assert!(verdict.mergeable());
        assert_eq!(verdict.files().len(), 2);
    }

    #[test]
    fn test_run_blocked_without_reviews() {
        let dir = tempfile::tempdir().unwrap();
        let rules = write_file(&dir, "CODEOWNERS", "*.js alice\n");
        let changed = write_file(&dir, "changed.txt", "index.js\n");

        let verdict = run(&args(rules, changed, None)).unwrap();
        assert!(!verdict.mergeable());
    }

    #[test]
    fn test_run_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let rules = write_file(&dir, "CODEOWNERS", "*.js\n");
        let changed = write_file(&dir, "changed.txt", "index.js\n");

        let err = run(&args(rules, changed, None)).unwrap_err();
        assert!(matches!(
            err,
            CheckError::Parse(ParseError::EmptyOwners { line: 1 })
        ));
    }

    #[test]
    fn test_run_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let changed = write_file(&dir, "changed.txt", "index.js\n");

        let err = run(&args(dir.path().join("absent"), changed, None)).unwrap_err();
        assert!(matches!(err, CheckError::Io { .. }));
    }

    #[test]
    fn test_report_format() {
        let rules = RuleSet::parse(
            "#@BOOL *.config.js (devops OR platform) AND security\n\
             *.config.js devops platform security\n",
        )
        .unwrap();
        let approved = ApprovalState::from_identities(["platform"]);
        let verdict = rules.resolve(["app.config.js", "README.md"], &approved);

        let report = render_report(&verdict);
        assert!(report.contains("ok      README.md"));
        assert!(report.contains("blocked app.config.js  missing: security  (rule at line 2)"));
        assert!(report.contains("not mergeable: 1 of 2 changed paths unsatisfied"));
    }

    #[test]
    fn test_report_all_satisfied() {
        let rules = RuleSet::parse("*.js alice\n").unwrap();
        let verdict = rules.resolve(["a.js"], &ApprovalState::from_identities(["alice"]));

        let report = render_report(&verdict);
        assert!(report.contains("mergeable: all 1 changed paths satisfied"));
    }
}
