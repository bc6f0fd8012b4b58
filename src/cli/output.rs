//! Handles all user-facing output for the CLI: colored status lines, diffs and diagnostics.

use difference::{Changeset, Difference};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::errors::print_error;
use crate::suite::{CheckReport, FileReport, Freshness, Outcome};

/// Totals printed at the end of a batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub generated: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub failed: usize,
}

impl Summary {
    pub fn tally(reports: &[FileReport]) -> Self {
        let mut summary = Self::default();
        for report in reports {
            match report.outcome {
                Outcome::Generated(_) => summary.generated += 1,
                Outcome::Unchanged(_) => summary.unchanged += 1,
                Outcome::Removed(_) => summary.removed += 1,
                Outcome::Absent(_) => {}
                Outcome::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }
}

fn stdout(colors: bool) -> StandardStream {
    StandardStream::stdout(if colors {
        ColorChoice::Always
    } else {
        ColorChoice::Never
    })
}

fn status(out: &mut StandardStream, color: Color, tag: &str, message: &str) {
    let _ = out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    print!("{:>10}", tag);
    let _ = out.reset();
    println!(" {}", message);
}

/// Prints one status line per spec file; failures are rendered as full diagnostics.
pub fn print_reports(reports: Vec<FileReport>, colors: bool) -> Summary {
    let summary = Summary::tally(&reports);
    let mut out = stdout(colors);
    for report in reports {
        let spec = report.spec.display();
        match report.outcome {
            Outcome::Generated(path) => status(
                &mut out,
                Color::Green,
                "generated",
                &format!("{} -> {}", spec, path.display()),
            ),
            Outcome::Unchanged(path) => status(
                &mut out,
                Color::Cyan,
                "unchanged",
                &format!("{} -> {}", spec, path.display()),
            ),
            Outcome::Removed(path) => {
                status(&mut out, Color::Yellow, "removed", &path.display().to_string())
            }
            Outcome::Absent(_) => {}
            Outcome::Failed(error) => {
                status(&mut out, Color::Red, "failed", &spec.to_string());
                print_error(error);
            }
        }
    }
    summary
}

pub fn print_summary(summary: &Summary, colors: bool) {
    let mut out = stdout(colors);
    let color = if summary.failed > 0 {
        Color::Red
    } else {
        Color::Green
    };
    status(
        &mut out,
        color,
        "done",
        &format!(
            "{} generated, {} unchanged, {} removed, {} failed",
            summary.generated, summary.unchanged, summary.removed, summary.failed
        ),
    );
}

/// Prints check results with diffs for stale outputs. Returns true when everything is current.
pub fn print_check(reports: Vec<CheckReport>, colors: bool) -> bool {
    let mut out = stdout(colors);
    let mut all_current = true;
    for report in reports {
        let output = report.output.display().to_string();
        match report.result {
            Ok(Freshness::Current) => status(&mut out, Color::Green, "current", &output),
            Ok(Freshness::Missing { .. }) => {
                all_current = false;
                status(&mut out, Color::Yellow, "missing", &output);
            }
            Ok(Freshness::Stale { existing, expected }) => {
                all_current = false;
                status(&mut out, Color::Yellow, "stale", &output);
                let changeset = Changeset::new(&existing, &expected, "\n");
                print_diff(&mut out, &changeset.diffs);
            }
            Err(error) => {
                all_current = false;
                status(&mut out, Color::Red, "failed", &report.spec.display().to_string());
                print_error(error);
            }
        }
    }
    all_current
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn print_diff(stdout: &mut StandardStream, diffs: &[Difference]) {
    for diff in diffs {
        match diff {
            Difference::Same(_) => {}
            Difference::Add(ref x) => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
                for line in x.lines() {
                    println!("+{}", line);
                }
            }
            Difference::Rem(ref x) => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
                for line in x.lines() {
                    println!("-{}", line);
                }
            }
        }
    }
    let _ = stdout.reset();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CarinataError;
    use std::path::{Path, PathBuf};

    #[test]
    fn tally_counts_each_outcome() {
        let reports = vec![
            FileReport {
                spec: PathBuf::from("a.carinata"),
                outcome: Outcome::Generated(PathBuf::from("a.py")),
            },
            FileReport {
                spec: PathBuf::from("b.carinata"),
                outcome: Outcome::Unchanged(PathBuf::from("b.py")),
            },
            FileReport {
                spec: PathBuf::from("c.carinata"),
                outcome: Outcome::Failed(CarinataError::io(Path::new("c.carinata"), "boom")),
            },
        ];
        let summary = Summary::tally(&reports);
        assert_eq!(
            summary,
            Summary {
                generated: 1,
                unchanged: 1,
                removed: 0,
                failed: 1
            }
        );
    }
}
