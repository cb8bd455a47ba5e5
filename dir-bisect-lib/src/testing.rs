//! Testing utilities.

use std::collections::BTreeSet;

use crate::check::Verdict;
use crate::effects::Effects;
use crate::search::Workspace;

/// A fake [`Workspace`] whose verdict is a pure function of the set of
/// suspects currently applied, for driving the search without touching the
/// filesystem or spawning subprocesses.
pub struct ScriptedWorkspace {
    /// The suspects currently applied from the "bad" side.
    pub applied: BTreeSet<char>,

    /// Classifies the applied set; `true` means the working copy is bad.
    pub is_bad: Box<dyn Fn(&BTreeSet<char>) -> bool>,

    /// If set, the check with this (1-based) sequence number reports bad
    /// regardless of `is_bad`. Simulates a non-deterministic check.
    pub bad_on_check: Option<usize>,

    /// How many times the check has run.
    pub num_checks: usize,
}

impl std::fmt::Debug for ScriptedWorkspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<ScriptedWorkspace applied={:?} num_checks={:?}>",
            self.applied, self.num_checks
        )
    }
}

impl ScriptedWorkspace {
    /// Construct from a non-capturing predicate.
    pub fn new(is_bad: fn(&BTreeSet<char>) -> bool) -> Self {
        Self::new_boxed(Box::new(is_bad))
    }

    /// Construct from an arbitrary (possibly capturing) predicate.
    pub fn new_boxed(is_bad: Box<dyn Fn(&BTreeSet<char>) -> bool>) -> Self {
        ScriptedWorkspace {
            applied: Default::default(),
            is_bad,
            bad_on_check: None,
            num_checks: 0,
        }
    }
}

impl Workspace for ScriptedWorkspace {
    type Suspect = char;

    fn apply(&mut self, combination: &[char]) -> eyre::Result<()> {
        self.applied.extend(combination.iter().copied());
        Ok(())
    }

    fn revert(&mut self, combination: &[char]) -> eyre::Result<()> {
        for suspect in combination {
            self.applied.remove(suspect);
        }
        Ok(())
    }

    fn check(&mut self, _effects: &Effects) -> eyre::Result<Verdict> {
        self.num_checks += 1;
        if self.bad_on_check == Some(self.num_checks) || (self.is_bad)(&self.applied) {
            Ok(Verdict::Bad)
        } else {
            Ok(Verdict::Good)
        }
    }
}
