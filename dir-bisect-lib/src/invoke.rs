//! Entry-point plumbing shared by the executables in this workspace: panic
//! handler and tracing installation, construction of the shared
//! [`CommandContext`], and translation of a command's result into a process
//! exit code.

use std::ffi::OsString;

use clap::Parser;
use tracing::instrument;
use tracing::level_filters::LevelFilter;
use tracing_error::ErrorLayer;
use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::effects::Effects;
use crate::run::RunInfo;
use crate::util::{ExitCode, EyreExitOr};

/// Shared context for all commands.
#[derive(Clone, Debug)]
pub struct CommandContext {
    /// The `Effects` to use.
    pub effects: Effects,

    /// The capability to invoke external tools.
    pub run_info: RunInfo,
}

#[instrument]
fn install_tracing(effects: Effects) -> eyre::Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse(std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| "warn".to_string()))?;
    let fmt_layer = tracing_fmt::layer().with_writer(move || effects.clone().get_error_stream());

    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(fmt_layer.with_filter(env_filter))
        .try_init()?;

    Ok(())
}

/// Wrapper function for `main` to ensure that `Drop` is called for local
/// variables, since `std::process::exit` will skip them. You probably want to
/// call `invoke_command_main` instead.
#[instrument(skip(f))]
pub fn do_main_and_drop_locals<T: Parser>(
    f: impl Fn(CommandContext, T) -> EyreExitOr<()>,
    args: Vec<OsString>,
) -> eyre::Result<i32> {
    let command_args = T::parse_from(&args);

    let effects = Effects::new();
    install_tracing(effects.clone())?;

    let run_info = RunInfo::from_current_dir()?;
    let ctx = CommandContext { effects, run_info };
    let exit_code: i32 = match f(ctx, command_args)? {
        Ok(()) => 0,
        Err(ExitCode(exit_code)) => exit_code.try_into()?,
    };
    Ok(exit_code)
}

/// Invoke the provided command main function. This should be used in the
/// `main.rs` file for each executable. For example:
///
/// ```ignore
/// fn main() {
///     dir_bisect_lib::invoke::invoke_command_main(dir_bisect::command_main)
/// }
/// ```
#[instrument(skip(f))]
pub fn invoke_command_main<T: Parser>(f: impl Fn(CommandContext, T) -> EyreExitOr<()>) {
    // Install panic handler.
    color_eyre::install().expect("Could not install panic handler");
    let args = std::env::args_os().collect();
    let exit_code = do_main_and_drop_locals(f, args).expect("A fatal error occurred");
    std::process::exit(exit_code);
}
