//! Distribution calculation engine for closed vessel operating periods
//! ("mareas"): given the period's aggregated income and expense totals, an
//! ordered list of computation items derives the profit/cost distribution.
//!
//! - [`core`] holds the engine itself: money arithmetic, item definitions and
//!   resolution, and the single-pass evaluator.
//! - [`api`] is the facade the surrounding ledger calls, with a repository
//!   trait seam for storage backends.
//! - [`storage`] is the filesystem backend: a YAML profile in, JSON
//!   distribution snapshots out.
//! - [`cli`] is a thin command-line surface over the facade.

pub mod api;
pub mod cli;
pub mod core;
pub mod storage;
