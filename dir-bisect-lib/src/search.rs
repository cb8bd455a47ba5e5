//! A search over combinations of suspects to find the minimal set of changed
//! files which makes a working copy fail its check.
//!
//! The search is a brute-force enumeration of the power set of the suspects,
//! smallest combinations first, rather than a `ddmin`-style delta-debugging
//! minimization. The worst case is `2^N - 1` tested combinations, which is
//! practical only for small suspect sets (tens, not hundreds); in exchange,
//! the reported guilty combination is always the lexicographically first
//! minimal one, and the enumeration order is stable across runs.

use std::fmt::{Debug, Display, Write};

use itertools::Itertools;
use tracing::instrument;

use crate::check::Verdict;
use crate::effects::Effects;

/// The working copy under test, owned exclusively by the search for the
/// duration of a run. The search mutates it in place; callers are
/// responsible for working against a disposable copy.
pub trait Workspace: Debug {
    /// The identifier for a single suspect. For the real filesystem
    /// implementation this is a path relative to the tree roots.
    type Suspect: Clone + Debug + Display + Eq;

    /// Copy each suspect in `combination` from the bad tree into the working
    /// copy, overwriting.
    fn apply(&mut self, combination: &[Self::Suspect]) -> eyre::Result<()>;

    /// Copy each suspect in `combination` from the good tree back into the
    /// working copy, overwriting.
    fn revert(&mut self, combination: &[Self::Suspect]) -> eyre::Result<()>;

    /// Classify the current contents of the working copy.
    fn check(&mut self, effects: &Effects) -> eyre::Result<Verdict>;
}

/// The terminal result of a search run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome<S> {
    /// The combination flipped the check from good to bad. It is the first
    /// failing combination in the enumeration order, and therefore minimal
    /// (no strictly smaller combination fails).
    Guilty {
        /// The guilty combination, in suspect order.
        combination: Vec<S>,
    },

    /// Every combination, up to and including the full suspect set, proved
    /// innocent. This contradicts the premise that the good and bad trees
    /// differ in outcome.
    Inconclusive {
        /// How many combinations were tested and found innocent.
        num_combinations_tested: usize,
    },

    /// The pristine working copy failed the initial sanity check. This is a
    /// setup failure, not a finding: no combinations were tested.
    PristineCheckFailed,

    /// The working copy failed to return to good after reverting the given
    /// combination. Either the check is not deterministic or the copy step
    /// is incomplete; neither can be trusted, so the search stops.
    RevertCheckFailed {
        /// The combination whose reversion did not restore a good state.
        combination: Vec<S>,
    },
}

/// Enumerate every non-empty subset of `suspects`, by size and then
/// lexicographically over the original suspect ordering within each size.
pub fn combinations<S: Clone>(suspects: &[S]) -> impl Iterator<Item = Vec<S>> + '_ {
    (1..=suspects.len()).flat_map(move |size| suspects.iter().cloned().combinations(size))
}

/// The verdict on a single combination.
enum Judgment {
    Guilty,
    Innocent,
    RevertCheckFailed,
}

/// The combination search. Drives a [`Workspace`] through
/// apply/check/revert/check cycles until a combination is found guilty or
/// the suspect set is exhausted.
#[derive(Debug)]
pub struct Search<W: Workspace> {
    workspace: W,
    suspects: Vec<W::Suspect>,
}

impl<W: Workspace> Search<W> {
    /// Construct a new search over the given suspects.
    pub fn new(workspace: W, suspects: impl IntoIterator<Item = W::Suspect>) -> Self {
        Self {
            workspace,
            suspects: suspects.into_iter().collect(),
        }
    }

    /// The workspace being searched.
    pub fn workspace(&self) -> &W {
        &self.workspace
    }

    /// Run the search to completion. Every step blocks until the underlying
    /// check completes; there is no timeout and no retry.
    #[instrument]
    pub fn run(&mut self, effects: &Effects) -> eyre::Result<Outcome<W::Suspect>> {
        writeln!(
            effects.get_output_stream(),
            "Checking pristine working directory..."
        )?;
        if self.workspace.check(effects)? == Verdict::Bad {
            return Ok(Outcome::PristineCheckFailed);
        }

        let suspects = self.suspects.clone();
        let mut num_combinations_tested = 0;
        for combination in combinations(&suspects) {
            match self.judge(effects, &combination)? {
                Judgment::Guilty => return Ok(Outcome::Guilty { combination }),
                Judgment::Innocent => num_combinations_tested += 1,
                Judgment::RevertCheckFailed => {
                    return Ok(Outcome::RevertCheckFailed { combination })
                }
            }
        }
        Ok(Outcome::Inconclusive {
            num_combinations_tested,
        })
    }

    /// Try a single combination: apply it and check; if the check still
    /// passes, revert it and re-check to confirm that the working copy is
    /// back in a good state.
    fn judge(
        &mut self,
        effects: &Effects,
        combination: &[W::Suspect],
    ) -> eyre::Result<Judgment> {
        let mut output = effects.get_output_stream();
        writeln!(output)?;
        writeln!(output, "Judging:")?;
        for suspect in combination {
            writeln!(output, " - {suspect}")?;
        }

        self.workspace.apply(combination)?;
        if self.workspace.check(effects)? == Verdict::Bad {
            return Ok(Judgment::Guilty);
        }

        self.workspace.revert(combination)?;
        if self.workspace.check(effects)? == Verdict::Bad {
            return Ok(Judgment::RevertCheckFailed);
        }

        writeln!(output, "Considered innocent:")?;
        for suspect in combination {
            writeln!(output, " - {suspect}")?;
        }
        Ok(Judgment::Innocent)
    }
}
