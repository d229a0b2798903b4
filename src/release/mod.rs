//! Release engine
//!
//! Policy resolution, the ordered access evaluator, and the sweep /
//! death-confirmation trigger paths.

pub mod access;
pub mod handler;
pub mod policy;
pub mod sweeper;

pub use access::{AccessEvaluator, Decision, DenyReason};
pub use policy::{resolve, ResolvedRelease};
pub use sweeper::{ReleaseSweeper, SweepReport};
