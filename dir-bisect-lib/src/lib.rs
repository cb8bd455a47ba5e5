//! Core functionality for `dir-bisect`: discovering the files that differ
//! between a known-good and a known-bad directory tree, and searching for the
//! minimal combination of those files which makes a caller-supplied check
//! fail.

#![warn(missing_docs)]
#![warn(
    clippy::all,
    clippy::as_conversions,
    clippy::clone_on_ref_ptr,
    clippy::dbg_macro
)]
#![allow(clippy::too_many_arguments, clippy::blocks_in_conditions)]

pub mod check;
pub mod effects;
pub mod invoke;
pub mod run;
pub mod search;
pub mod suspects;
pub mod util;
pub mod working_copy;

#[cfg(test)]
pub mod testing;
