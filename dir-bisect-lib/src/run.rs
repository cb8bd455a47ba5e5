//! Tools for invoking the external programs that do the real work here
//! (`diff`, `patch`, `make`, check scripts, ...). Everything going through
//! [`RunInfo`] is strictly sequential: each invocation blocks until the
//! subprocess completes.

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::fmt::Write;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};

use eyre::Context;
use itertools::Itertools;
use tracing::instrument;

use crate::effects::Effects;
use crate::util::{ExitCode, EyreExitOr};

/// The capability to spawn external tools: a working directory to spawn them
/// in and the environment variables to pass along.
#[derive(Clone)]
pub struct RunInfo {
    /// The working directory that subprocesses should be run in.
    pub working_directory: PathBuf,

    /// The environment variables that should be passed to subprocesses.
    pub env: HashMap<OsString, OsString>,
}

impl std::fmt::Debug for RunInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<RunInfo working_directory={:?} env=not shown>",
            self.working_directory
        )
    }
}

impl RunInfo {
    /// Construct from the current working directory and environment.
    pub fn from_current_dir() -> eyre::Result<Self> {
        Ok(RunInfo {
            working_directory: std::env::current_dir()?,
            env: std::env::vars_os().collect(),
        })
    }

    /// The same capability, but spawning subprocesses in `working_directory`
    /// instead.
    pub fn with_working_directory(&self, working_directory: PathBuf) -> Self {
        RunInfo {
            working_directory,
            env: self.env.clone(),
        }
    }
}

/// Options for invoking a tool with captured output.
pub struct RunOpts {
    /// If set, a non-zero exit code will be treated as an error.
    pub treat_failure_as_error: bool,
}

impl Default for RunOpts {
    fn default() -> Self {
        Self {
            treat_failure_as_error: true,
        }
    }
}

/// The result of invoking a tool with captured output.
#[must_use]
pub struct RunResult {
    /// The exit code of the process.
    pub exit_code: ExitCode,

    /// The stdout contents written by the invocation.
    pub stdout: Vec<u8>,

    /// The stderr contents written by the invocation.
    pub stderr: Vec<u8>,
}

impl std::fmt::Debug for RunResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<RunResult exit_code={:?} stdout={:?} stderr={:?}>",
            self.exit_code,
            String::from_utf8_lossy(&self.stdout),
            String::from_utf8_lossy(&self.stderr),
        )
    }
}

impl RunInfo {
    fn spawn_writer_thread<
        InputStream: Read + Send + 'static,
        OutputStream: Write + Send + 'static,
    >(
        &self,
        stream: Option<InputStream>,
        mut output: OutputStream,
    ) -> JoinHandle<()> {
        thread::spawn(move || {
            let stream = match stream {
                Some(stream) => stream,
                None => return,
            };
            let reader = BufReader::new(stream);
            for line in reader.lines() {
                let line = line.expect("Reading line from subprocess");
                writeln!(output, "{line}").expect("Writing line from subprocess");
            }
        })
    }

    fn run_inner(
        &self,
        effects: &Effects,
        program: &OsStr,
        args: &[&OsStr],
    ) -> EyreExitOr<()> {
        let RunInfo {
            working_directory,
            env,
        } = self;

        let command_string = {
            let mut words = vec![program.to_string_lossy().to_string()];
            words.extend(args.iter().map(|arg| arg.to_string_lossy().to_string()));
            words.join(" ")
        };
        writeln!(
            effects.get_output_stream(),
            "dir-bisect: running command: {command_string}"
        )?;

        let mut command = Command::new(program);
        command.current_dir(working_directory);
        command.args(args);
        command.env_clear();
        command.envs(env.iter());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .wrap_err_with(|| format!("Spawning subprocess: {command_string}"))?;

        let stdout = child.stdout.take();
        let stdout_thread = self.spawn_writer_thread(stdout, effects.get_output_stream());
        let stderr = child.stderr.take();
        let stderr_thread = self.spawn_writer_thread(stderr, effects.get_error_stream());

        let exit_status = child
            .wait()
            .wrap_err("Waiting for subprocess to complete")?;
        stdout_thread.join().unwrap();
        stderr_thread.join().unwrap();

        // On Unix, if the child process was terminated by a signal, we need to
        // call some Unix-specific functions to access the signal that
        // terminated it. For simplicity, just return `1` in those cases.
        let exit_code: i32 = exit_status.code().unwrap_or(1);
        let exit_code: isize = exit_code
            .try_into()
            .wrap_err("Converting exit code from i32 to isize")?;
        let exit_code = ExitCode(exit_code);
        if exit_code.is_success() {
            Ok(Ok(()))
        } else {
            Ok(Err(exit_code))
        }
    }

    /// Run the given program in a subprocess, and inform the user.
    ///
    /// This is suitable for commands whose output the operator should see as
    /// it is produced (builds, check scripts, `patch`).
    ///
    /// Returns the exit code of the program (non-zero signifies error).
    #[instrument]
    #[must_use = "The return code for `RunInfo::run` must be checked"]
    pub fn run<S: AsRef<OsStr> + std::fmt::Debug>(
        &self,
        effects: &Effects,
        program: impl AsRef<OsStr> + std::fmt::Debug,
        args: &[S],
    ) -> EyreExitOr<()> {
        self.run_inner(
            effects,
            program.as_ref(),
            args.iter().map(AsRef::as_ref).collect_vec().as_slice(),
        )
    }

    fn run_with_output_inner(
        &self,
        program: &OsStr,
        args: &[&OsStr],
        opts: RunOpts,
    ) -> eyre::Result<RunResult> {
        let RunInfo {
            working_directory,
            env,
        } = self;
        let RunOpts {
            treat_failure_as_error,
        } = opts;

        let mut command = Command::new(program);
        command.current_dir(working_directory);
        command.args(args);
        command.env_clear();
        command.envs(env.iter());
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let child = command.spawn().wrap_err_with(|| {
            format!("Spawning subprocess: {:?}", program.to_string_lossy())
        })?;
        let output = child
            .wait_with_output()
            .wrap_err("Waiting for subprocess to complete")?;

        // On Unix, if the child process was terminated by a signal, we need to
        // call some Unix-specific functions to access the signal that
        // terminated it. For simplicity, just return `1` in those cases.
        let exit_code = ExitCode(output.status.code().unwrap_or(1).try_into()?);
        let result = RunResult {
            exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        };
        if treat_failure_as_error && !exit_code.is_success() {
            eyre::bail!(
                "Subprocess failed:\nProgram: {:?}\nArgs: {:?}\nResult: {:?}",
                program,
                args,
                result
            );
        }
        Ok(result)
    }

    /// Run the given program silently (don't display output to the user), and
    /// return its captured output.
    pub fn run_with_output<S: AsRef<OsStr> + std::fmt::Debug>(
        &self,
        program: impl AsRef<OsStr> + std::fmt::Debug,
        args: &[S],
        opts: RunOpts,
    ) -> eyre::Result<RunResult> {
        self.run_with_output_inner(
            program.as_ref(),
            args.iter().map(AsRef::as_ref).collect_vec().as_slice(),
            opts,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{RunInfo, RunOpts};
    use crate::effects::Effects;

    #[cfg(unix)]
    #[test]
    fn test_run_with_output_captures_stdout() -> eyre::Result<()> {
        let run_info = RunInfo::from_current_dir()?;
        let result = run_info.run_with_output("echo", &["hello"], RunOpts::default())?;
        assert!(result.exit_code.is_success());
        assert_eq!(String::from_utf8_lossy(&result.stdout), "hello\n");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_run_reports_exit_code() -> eyre::Result<()> {
        let effects = Effects::new_suppress_for_test();
        let run_info = RunInfo::from_current_dir()?;
        let result = run_info.run(&effects, "false", &[] as &[&str])?;
        let exit_code = result.expect_err("`false` should exit non-zero");
        assert_eq!(exit_code.0, 1);
        Ok(())
    }
}
