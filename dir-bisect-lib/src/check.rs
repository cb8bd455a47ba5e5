//! Classifying a working copy as good or bad.
//!
//! The check contract is the one honored by every tool in this workspace: a
//! check is an external executable invoked with the working-directory path as
//! its sole argument, communicating its verdict solely via its exit status
//! (0 = good, nonzero = bad). A few `internal:` checks are built in for
//! convenience.

use std::fmt::{Display, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::instrument;

use crate::effects::Effects;
use crate::run::RunInfo;

/// The verdict of running a check against a working-copy state.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Verdict {
    /// The working copy satisfies the check.
    Good,

    /// The working copy does not satisfy the check.
    Bad,
}

/// The error returned when a check command cannot be parsed.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ParseCheckCommandError {
    #[error(
        "unknown built-in check {0:?} \
        (expected internal:make, internal:confirm, or internal:none)"
    )]
    UnknownInternalCheck(String),
}

/// How to decide whether a working copy is good or bad.
#[derive(Clone, Debug)]
pub enum CheckCommand {
    /// Invoke an external executable with the working-directory path as its
    /// sole argument.
    External(PathBuf),

    /// Run `make -C <dir>`; the working copy is good iff the build exits
    /// zero.
    Make,

    /// Ask the operator. When no terminal is attended, answers "bad" rather
    /// than blocking forever.
    Confirm,

    /// Every working copy is good.
    None,
}

impl FromStr for CheckCommand {
    type Err = ParseCheckCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "internal:make" => Ok(CheckCommand::Make),
            "internal:confirm" => Ok(CheckCommand::Confirm),
            "internal:none" => Ok(CheckCommand::None),
            s if s.starts_with("internal:") => {
                Err(ParseCheckCommandError::UnknownInternalCheck(s.to_owned()))
            }
            s => Ok(CheckCommand::External(PathBuf::from(s))),
        }
    }
}

impl Display for CheckCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckCommand::External(script) => write!(f, "{}", script.display()),
            CheckCommand::Make => write!(f, "internal:make"),
            CheckCommand::Confirm => write!(f, "internal:confirm"),
            CheckCommand::None => write!(f, "internal:none"),
        }
    }
}

impl CheckCommand {
    /// Classify the contents of `dir`. A check executable that cannot be
    /// started at all is a fatal error, not a verdict.
    #[instrument]
    pub fn run(&self, effects: &Effects, run_info: &RunInfo, dir: &Path) -> eyre::Result<Verdict> {
        match self {
            CheckCommand::External(script) => {
                let verdict = match run_info.run(effects, script, &[dir])? {
                    Ok(()) => Verdict::Good,
                    Err(_exit_code) => Verdict::Bad,
                };
                Ok(verdict)
            }

            CheckCommand::Make => {
                let args = [std::ffi::OsStr::new("-C"), dir.as_os_str()];
                let verdict = match run_info.run(effects, "make", &args)? {
                    Ok(()) => Verdict::Good,
                    Err(_exit_code) => Verdict::Bad,
                };
                Ok(verdict)
            }

            CheckCommand::Confirm => {
                writeln!(
                    effects.get_output_stream(),
                    "Please test the contents of {}",
                    dir.display()
                )?;
                if confirm(effects, "Is it good?", false)? {
                    writeln!(effects.get_output_stream(), "Working copy is good so far")?;
                    Ok(Verdict::Good)
                } else {
                    writeln!(effects.get_output_stream(), "OOPS, got you!")?;
                    Ok(Verdict::Bad)
                }
            }

            CheckCommand::None => Ok(Verdict::Good),
        }
    }
}

/// Ask the operator a yes/no question. Returns `default` immediately when no
/// terminal is attended, and on an empty answer.
fn confirm(effects: &Effects, message: &str, default: bool) -> eyre::Result<bool> {
    if !console::user_attended() {
        return Ok(default);
    }

    let mut output = effects.get_output_stream();
    write!(
        output,
        "{message} ({}/{})? ",
        if default { "Y" } else { "y" },
        if default { "n" } else { "N" },
    )?;
    loop {
        let mut answer = String::new();
        let num_read = std::io::stdin().read_line(&mut answer)?;
        let answer = answer.trim();
        if num_read == 0 || answer.is_empty() {
            return Ok(default);
        }
        if ["y", "yes", "true"]
            .iter()
            .any(|yes| answer.eq_ignore_ascii_case(yes))
        {
            return Ok(true);
        }
        if ["n", "no", "false"]
            .iter()
            .any(|no| answer.eq_ignore_ascii_case(no))
        {
            return Ok(false);
        }
        write!(output, "Invalid answer, please answer either 'y' or 'n': ")?;
    }
}

#[cfg(test)]
mod tests {
    use super::{CheckCommand, ParseCheckCommandError, Verdict};
    use crate::effects::Effects;
    use crate::run::RunInfo;

    #[test]
    fn test_parse_check_command() {
        assert!(matches!(
            "internal:make".parse::<CheckCommand>(),
            Ok(CheckCommand::Make)
        ));
        assert!(matches!(
            "internal:confirm".parse::<CheckCommand>(),
            Ok(CheckCommand::Confirm)
        ));
        assert!(matches!(
            "internal:none".parse::<CheckCommand>(),
            Ok(CheckCommand::None)
        ));
        assert!(matches!(
            "./check.sh".parse::<CheckCommand>(),
            Ok(CheckCommand::External(path)) if path == std::path::Path::new("./check.sh")
        ));
    }

    #[test]
    fn test_parse_unknown_internal_check() {
        insta::assert_debug_snapshot!("internal:wibble".parse::<CheckCommand>(), @r###"
        Err(
            UnknownInternalCheck(
                "internal:wibble",
            ),
        )
        "###);
    }

    #[test]
    fn test_parse_error_message_names_alternatives() {
        let err = "internal:wibble".parse::<CheckCommand>().unwrap_err();
        let ParseCheckCommandError::UnknownInternalCheck(_) = &err;
        assert_eq!(
            err.to_string(),
            "unknown built-in check \"internal:wibble\" \
            (expected internal:make, internal:confirm, or internal:none)"
        );
    }

    #[test]
    fn test_none_check_is_always_good() -> eyre::Result<()> {
        let effects = Effects::new_suppress_for_test();
        let run_info = RunInfo::from_current_dir()?;
        let verdict = CheckCommand::None.run(&effects, &run_info, std::path::Path::new("."))?;
        assert_eq!(verdict, Verdict::Good);
        Ok(())
    }
}
