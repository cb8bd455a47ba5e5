//! The on-disk working copy that the search mutates in place.

use std::path::{Path, PathBuf};

use eyre::Context;
use tracing::instrument;

use crate::check::{CheckCommand, Verdict};
use crate::effects::Effects;
use crate::run::RunInfo;
use crate::search::Workspace;

/// A working copy on disk, together with the good and bad trees whose
/// differing files are copied into it and the check that classifies it.
///
/// No backup of the working copy's original contents is taken; callers are
/// responsible for pointing this at a disposable checkout.
#[derive(Debug)]
pub struct WorkingCopy {
    good: PathBuf,
    bad: PathBuf,
    work: PathBuf,
    check: CheckCommand,
    run_info: RunInfo,
}

impl WorkingCopy {
    /// Constructor.
    pub fn new(
        good: PathBuf,
        bad: PathBuf,
        work: PathBuf,
        check: CheckCommand,
        run_info: RunInfo,
    ) -> Self {
        WorkingCopy {
            good,
            bad,
            work,
            check,
            run_info,
        }
    }

    /// The working directory being mutated.
    pub fn work_dir(&self) -> &Path {
        &self.work
    }

    #[instrument]
    fn copy_files(&self, source_root: &Path, combination: &[String]) -> eyre::Result<()> {
        for suspect in combination {
            let source = source_root.join(suspect);
            let target = self.work.join(suspect);
            std::fs::copy(&source, &target)
                .wrap_err_with(|| format!("Copying {source:?} to {target:?}"))?;
        }
        Ok(())
    }
}

impl Workspace for WorkingCopy {
    type Suspect = String;

    fn apply(&mut self, combination: &[String]) -> eyre::Result<()> {
        self.copy_files(&self.bad, combination)
    }

    fn revert(&mut self, combination: &[String]) -> eyre::Result<()> {
        self.copy_files(&self.good, combination)
    }

    fn check(&mut self, effects: &Effects) -> eyre::Result<Verdict> {
        self.check.run(effects, &self.run_info, &self.work)
    }
}
