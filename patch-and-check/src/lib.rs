//! Apply a sequence of patch files to a working copy, checking after each
//! patch that the result is still good.
//!
//! Useful when two possibly-diverging lines of development live in two
//! different SCMs and fixes done in one line need to be transplanted on top
//! of a head in the other (such as transplanting changes from Mercurial onto
//! a CVS HEAD). Optionally, a `.zip` archive of the working copy is exported
//! after each patch is applied and validated. See also `hg export` and
//! `hg import`.

#![warn(missing_docs)]
#![warn(
    clippy::all,
    clippy::as_conversions,
    clippy::clone_on_ref_ptr,
    clippy::dbg_macro
)]
#![allow(clippy::too_many_arguments, clippy::blocks_in_conditions)]

mod format;

use std::fmt::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use console::style;
use eyre::Context;
use lib::check::{CheckCommand, Verdict};
use lib::effects::Effects;
use lib::invoke::CommandContext;
use lib::run::RunInfo;
use lib::util::{ExitCode, EyreExitOr};
use tracing::instrument;

pub use format::expand_archive_format;

/// Apply a sequence of patch files to a working copy.
///
/// Each patch is applied with patch(1); after each successful application the
/// check runs, and the run stops at the first patch that fails to apply or to
/// check.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct PatchAndCheckArgs {
    /// The working copy to apply patches to.
    #[clap(
        short = 'C',
        long = "working-copy",
        value_name = "DIR",
        default_value = "."
    )]
    pub working_copy: PathBuf,

    /// Path to a script to check whether the working copy is good or bad
    /// after each patch, or one of the built-ins "internal:make",
    /// "internal:confirm", or "internal:none".
    #[clap(
        short = 'c',
        long = "check",
        value_name = "SCRIPT",
        default_value = "internal:make"
    )]
    pub check: CheckCommand,

    /// Strip the smallest prefix containing NUM leading slashes from each
    /// file name found in the patch file. Passed through to patch(1).
    #[clap(short = 'p', long = "strip", value_name = "NUM", default_value = "1")]
    pub strip: usize,

    /// Stop after each successfully applied patch, waiting for the operator
    /// to press enter before continuing.
    #[clap(short = 'i', long = "interactive")]
    pub interactive: bool,

    /// Export a .zip archive of the working copy after applying each patch,
    /// named by expanding FORMAT ("%%" literal percent, "%n" patch number,
    /// "%N" patch count, "%1" the number one, "%P" patch basename; numbers
    /// are zero-padded to the width of the patch count).
    #[clap(short = 'a', long = "archive", value_name = "FORMAT")]
    pub archive: Option<String>,

    /// The patch files to apply, in order.
    #[clap(value_name = "PATCH", required = true)]
    pub patches: Vec<PathBuf>,
}

fn report_error(effects: &Effects, message: &str) -> eyre::Result<()> {
    writeln!(
        effects.get_error_stream(),
        "{}: {message}",
        style("error").red().bold(),
    )?;
    Ok(())
}

/// Top-level entry point for the `patch-and-check` executable.
#[instrument]
pub fn command_main(ctx: CommandContext, args: PatchAndCheckArgs) -> EyreExitOr<()> {
    let CommandContext { effects, run_info } = ctx;
    let PatchAndCheckArgs {
        working_copy,
        check,
        strip,
        interactive,
        archive,
        patches,
    } = args;

    if !working_copy.is_dir() {
        report_error(
            &effects,
            &format!("working copy {working_copy:?} does not exist or is not a directory"),
        )?;
        return Ok(Err(ExitCode(1)));
    }
    let working_copy = std::fs::canonicalize(&working_copy)
        .wrap_err_with(|| format!("Canonicalizing working copy {working_copy:?}"))?;

    // The patches are opened by patch(1) after we change its working
    // directory, so resolve them relative to the invocation directory first.
    let patches = {
        let mut resolved = Vec::new();
        for patch in patches {
            if !patch.is_file() {
                report_error(&effects, &format!("patch {patch:?} does not exist"))?;
                return Ok(Err(ExitCode(1)));
            }
            resolved.push(
                std::fs::canonicalize(&patch)
                    .wrap_err_with(|| format!("Canonicalizing patch {patch:?}"))?,
            );
        }
        resolved
    };

    if interactive {
        let mut output = effects.get_output_stream();
        writeln!(output, "Will apply the following patches in order:")?;
        for (i, patch) in patches.iter().enumerate() {
            writeln!(output, "{} {}", i + 1, patch.display())?;
        }
    }

    let work_run_info = run_info.with_working_directory(working_copy.clone());
    for (i, patch) in patches.iter().enumerate() {
        match patch_and_check(&effects, &work_run_info, &working_copy, patch, strip, &check)? {
            Ok(()) => {}
            Err(exit_code) => return Ok(Err(exit_code)),
        }

        if let Some(archive_format) = &archive {
            let archive_file = {
                let expanded =
                    format::expand_archive_format(archive_format, patch, i + 1, patches.len());
                run_info.working_directory.join(expanded)
            };
            match archive_working_copy(&effects, &run_info, &working_copy, &archive_file)? {
                Ok(()) => {}
                Err(exit_code) => return Ok(Err(exit_code)),
            }
        }

        if interactive {
            let mut output = effects.get_output_stream();
            if let Some(next) = patches.get(i + 1) {
                writeln!(output, "Next patch is {}", next.display())?;
            }
            writeln!(output, "Press enter to continue (CTRL-C to abort)")?;
            let mut ignored = String::new();
            std::io::stdin().read_line(&mut ignored)?;
        }
    }

    Ok(Ok(()))
}

/// Apply one patch to the working copy and run the check on the result.
#[instrument]
fn patch_and_check(
    effects: &Effects,
    run_info: &RunInfo,
    working_copy: &Path,
    patch: &Path,
    strip: usize,
    check: &CheckCommand,
) -> EyreExitOr<()> {
    let mut output = effects.get_output_stream();
    writeln!(output)?;
    writeln!(output, "Patching {}", patch.display())?;
    let args = [
        "-N".to_owned(),
        "-s".to_owned(),
        "-f".to_owned(),
        format!("-p{strip}"),
        "-i".to_owned(),
        patch.display().to_string(),
    ];
    match run_info.run(effects, "patch", &args)? {
        Ok(()) => {}
        Err(_exit_code) => {
            report_error(
                effects,
                &format!("patching failed for {}", patch.display()),
            )?;
            return Ok(Err(ExitCode(1)));
        }
    }

    writeln!(output, "Checking {}", patch.display())?;
    match check.run(effects, run_info, working_copy)? {
        Verdict::Good => {
            writeln!(output, "Patch {} applied cleanly", patch.display())?;
            Ok(Ok(()))
        }
        Verdict::Bad => {
            report_error(
                effects,
                &format!("check failed after applying patch {}", patch.display()),
            )?;
            Ok(Err(ExitCode(1)))
        }
    }
}

/// Export the working copy as a `.zip` archive. The working copy is
/// symlinked under the archive's stem inside a scratch directory and zipped
/// from there, so that the archive's top-level directory carries the archive
/// name rather than the working copy's.
#[instrument]
fn archive_working_copy(
    effects: &Effects,
    run_info: &RunInfo,
    working_copy: &Path,
    archive_file: &Path,
) -> EyreExitOr<()> {
    let archive_dir = {
        let file_name = archive_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        match file_name.strip_suffix(".zip") {
            Some(stem) => stem.to_owned(),
            None => file_name,
        }
    };

    writeln!(
        effects.get_output_stream(),
        "Archiving {} to {}",
        working_copy.display(),
        archive_file.display()
    )?;

    let scratch_dir = tempfile::tempdir().wrap_err("Creating scratch directory for archive")?;
    let link = scratch_dir.path().join(&archive_dir);
    #[cfg(unix)]
    std::os::unix::fs::symlink(working_copy, &link)
        .wrap_err_with(|| format!("Symlinking {working_copy:?} to {link:?}"))?;
    #[cfg(not(unix))]
    eyre::bail!("archiving is only supported on Unix platforms");

    let zip_run_info = run_info.with_working_directory(scratch_dir.path().to_path_buf());
    let args = [
        "-r".to_owned(),
        archive_file.display().to_string(),
        archive_dir,
        "-x".to_owned(),
        "*.o".to_owned(),
        "-x".to_owned(),
        "*.obj".to_owned(),
        "-x".to_owned(),
        ".orig".to_owned(),
        "-x".to_owned(),
        ".rej".to_owned(),
        "-x".to_owned(),
        ".#*".to_owned(),
    ];
    match zip_run_info.run(effects, "zip", &args)? {
        Ok(()) => Ok(Ok(())),
        Err(_exit_code) => {
            report_error(
                effects,
                &format!("cannot create archive {}", archive_file.display()),
            )?;
            Ok(Err(ExitCode(1)))
        }
    }
}
