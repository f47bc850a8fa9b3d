//! Loop drivers connecting an agent to an environment.
//!
//! - [`BanditRunner`]: sequential step/observe/train loop with forced exploration

pub mod bandit_runner;

pub use bandit_runner::{is_forced_exploration, BanditRunner, RunSummary, RunnerConfig};
