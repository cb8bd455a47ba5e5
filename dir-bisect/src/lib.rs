//! Bisect two directory trees: find the minimal set of files that differ
//! between a good and a bad tree and cause a check to fail.
//!
//! Useful when using an ancient SCM with no built-in bisect support (such as
//! CVS), or when the diff between two revisions is too big and unrelated to
//! read. See also `git help bisect` and `hg help bisect`.

#![warn(missing_docs)]
#![warn(
    clippy::all,
    clippy::as_conversions,
    clippy::clone_on_ref_ptr,
    clippy::dbg_macro
)]
#![allow(clippy::too_many_arguments, clippy::blocks_in_conditions)]

use std::fmt::Write;
use std::path::PathBuf;

use clap::Parser;
use console::style;
use lib::check::CheckCommand;
use lib::invoke::CommandContext;
use lib::search::{Outcome, Search};
use lib::suspects::find_suspects;
use lib::util::{ExitCode, EyreExitOr};
use lib::working_copy::WorkingCopy;
use regex::Regex;
use tracing::instrument;

/// Exit code used when a combination was found guilty (the bisection
/// succeeded).
pub const GUILTY_EXIT_CODE: isize = 1;

/// Exit code used for setup errors: bad arguments or missing directories.
pub const SETUP_ERROR_EXIT_CODE: isize = 2;

/// Exit code used when the pristine working directory failed the initial
/// sanity check.
pub const PRISTINE_CHECK_FAILED_EXIT_CODE: isize = 10;

/// Exit code used when the working directory failed to return to good after
/// reverting a combination.
pub const REVERT_CHECK_FAILED_EXIT_CODE: isize = 11;

/// Bisect two directory trees.
///
/// Copies combinations of differing files from the bad tree into the working
/// directory, smallest combinations first, until the check fails, and prints
/// the first minimal combination that makes it fail. The working directory is
/// mutated in place and no backup is taken: run this against a disposable
/// checkout.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct BisectArgs {
    /// The known-good tree.
    #[clap(value_name = "GOOD")]
    pub good: PathBuf,

    /// The known-bad tree.
    #[clap(value_name = "BAD")]
    pub bad: PathBuf,

    /// The working directory to search in. Must itself pass the check before
    /// the search starts.
    #[clap(value_name = "WORK")]
    pub work: PathBuf,

    /// Exclude suspects whose relative path matches PATTERN (a regular
    /// expression; may be given multiple times).
    #[clap(short = 'x', long = "exclude", value_name = "PATTERN")]
    pub excludes: Vec<Regex>,

    /// Path to a script to check whether the working directory is good or
    /// bad, or one of the built-ins "internal:make", "internal:confirm", or
    /// "internal:none". The script is passed the working-directory path as
    /// its sole argument and must exit zero iff the working directory is
    /// good.
    #[clap(
        short = 'c',
        long = "check",
        value_name = "SCRIPT",
        default_value = "internal:confirm"
    )]
    pub check: CheckCommand,
}

/// Top-level entry point for the `dir-bisect` executable.
#[instrument]
pub fn command_main(ctx: CommandContext, args: BisectArgs) -> EyreExitOr<()> {
    let CommandContext { effects, run_info } = ctx;
    let BisectArgs {
        good,
        bad,
        work,
        excludes,
        check,
    } = args;

    for (role, dir) in [("good", &good), ("bad", &bad), ("working", &work)] {
        if !dir.is_dir() {
            writeln!(
                effects.get_error_stream(),
                "{}: {role} directory {dir:?} does not exist or is not a directory",
                style("error").red().bold(),
            )?;
            return Ok(Err(ExitCode(SETUP_ERROR_EXIT_CODE)));
        }
    }

    let mut output = effects.get_output_stream();
    writeln!(output, "Bisecting")?;
    writeln!(output, " good : {}", good.display())?;
    writeln!(output, " bad  : {}", bad.display())?;
    writeln!(output, " work : {}", work.display())?;

    writeln!(output, "Diffing directories...")?;
    let suspects = find_suspects(&run_info, &good, &bad, &excludes)?;
    writeln!(output, "Files that differ:")?;
    for suspect in &suspects {
        writeln!(output, " - {suspect}")?;
    }

    let working_copy = WorkingCopy::new(good, bad, work, check, run_info);
    let mut search = Search::new(working_copy, suspects);
    match search.run(&effects)? {
        Outcome::Guilty { combination } => {
            writeln!(output, "{}", style("GUILTY").red().bold())?;
            for suspect in &combination {
                writeln!(output, " - {suspect}")?;
            }
            Ok(Err(ExitCode(GUILTY_EXIT_CODE)))
        }

        Outcome::Inconclusive {
            num_combinations_tested,
        } => {
            writeln!(output)?;
            writeln!(
                output,
                "OOPS - all {num_combinations_tested} combinations proved innocent. \
                You've got the wrong guys!"
            )?;
            Ok(Ok(()))
        }

        Outcome::PristineCheckFailed => {
            writeln!(
                output,
                "OOPS - pristine working directory failed to check!"
            )?;
            Ok(Err(ExitCode(PRISTINE_CHECK_FAILED_EXIT_CODE)))
        }

        Outcome::RevertCheckFailed { combination } => {
            writeln!(
                output,
                "OOPS - working directory failed to check after reverting changes!"
            )?;
            for suspect in &combination {
                writeln!(output, " - {suspect}")?;
            }
            Ok(Err(ExitCode(REVERT_CHECK_FAILED_EXIT_CODE)))
        }
    }
}
