//! Utility functions.

use std::num::TryFromIntError;
use std::process::ExitStatus;

/// Represents the code to exit the process with.
#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct ExitCode(pub isize);

impl ExitCode {
    /// Return an exit code corresponding to success.
    pub fn success() -> Self {
        Self(0)
    }

    /// Determine whether or not this exit code represents a successful
    /// termination.
    pub fn is_success(&self) -> bool {
        match self {
            ExitCode(0) => true,
            ExitCode(_) => false,
        }
    }
}

impl TryFrom<ExitStatus> for ExitCode {
    type Error = TryFromIntError;

    fn try_from(status: ExitStatus) -> Result<Self, Self::Error> {
        let exit_code = status.code().unwrap_or(1);
        Ok(Self(exit_code.try_into()?))
    }
}

/// Alias for the common case of returning either `T` or an exit code to exit
/// the process with. The exit-code case is not an "error" per se, but rather a
/// deliberate request to terminate with a specific status, so it travels in
/// the `Ok` arm of the outer `eyre::Result`.
pub type EyreExitOr<T> = eyre::Result<Result<T, ExitCode>>;
