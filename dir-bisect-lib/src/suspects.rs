//! Discovery of the suspect set: the relative paths of the files that differ
//! between the good and bad trees.
//!
//! Discovery shells out to a recursive, binary-aware, quiet `diff` and keeps
//! only the `Files <a> and <b> differ` lines. Files present in just one of
//! the two trees are deliberately not suspects; the search's revert-check
//! failure path exists to surface the rare case where that matters.

use std::path::Path;

use regex::Regex;
use thiserror::Error;
use tracing::instrument;

use crate::run::{RunInfo, RunOpts};

/// Names that are never suspects: VCS control directories and binary build
/// artifacts. Passed to `diff -x`.
pub const DIFF_EXCLUDES: &[&str] = &["CVS", ".svn", ".hg", "*.o", "*.so"];

/// The error returned when `diff` output cannot be interpreted.
#[allow(missing_docs)]
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ParseDiffOutputError {
    #[error("diff path {path:?} is not under the compared root {root:?}")]
    PathOutsideRoot { path: String, root: String },
}

/// Compute the suspect set by diffing `good` against `bad`. The returned
/// paths are relative to the tree roots, in the (deterministic) order `diff`
/// reports them, with any path matching an exclude pattern removed.
#[instrument]
pub fn find_suspects(
    run_info: &RunInfo,
    good: &Path,
    bad: &Path,
    excludes: &[Regex],
) -> eyre::Result<Vec<String>> {
    let mut args = Vec::new();
    for exclude in DIFF_EXCLUDES {
        args.push("-x".to_owned());
        args.push((*exclude).to_owned());
    }
    args.push("-rqb".to_owned());
    args.push(good.to_string_lossy().into_owned());
    args.push(bad.to_string_lossy().into_owned());

    let result = run_info.run_with_output(
        "diff",
        args.as_slice(),
        RunOpts {
            treat_failure_as_error: false,
        },
    )?;
    // Exit code 1 just means that differences were found; 2 or more means
    // that diff itself ran into trouble.
    match result.exit_code.0 {
        0 | 1 => {}
        _ => eyre::bail!("diff subprocess failed: {:?}", result),
    }

    let stdout = String::from_utf8_lossy(&result.stdout);
    let suspects = parse_diff_output(good, &stdout)?;
    Ok(apply_excludes(suspects, excludes))
}

/// Extract the good-side paths from `diff -rq` output and relativize them
/// against `good_root`. Lines other than `Files <a> and <b> differ` (such as
/// `Only in <dir>: <file>`) are ignored.
pub fn parse_diff_output(
    good_root: &Path,
    output: &str,
) -> Result<Vec<String>, ParseDiffOutputError> {
    let differ_line = Regex::new(r"^Files (.*?) and .* differ$").unwrap();
    let mut suspects = Vec::new();
    for line in output.lines() {
        let path = match differ_line.captures(line) {
            Some(captures) => captures.get(1).unwrap().as_str(),
            None => continue,
        };
        let relative = Path::new(path).strip_prefix(good_root).map_err(|_| {
            ParseDiffOutputError::PathOutsideRoot {
                path: path.to_owned(),
                root: good_root.to_string_lossy().into_owned(),
            }
        })?;
        suspects.push(relative.to_string_lossy().into_owned());
    }
    Ok(suspects)
}

/// Remove every suspect whose relative path matches any of the given
/// patterns.
pub fn apply_excludes(suspects: Vec<String>, excludes: &[Regex]) -> Vec<String> {
    suspects
        .into_iter()
        .filter(|suspect| !excludes.iter().any(|pattern| pattern.is_match(suspect)))
        .collect()
}
