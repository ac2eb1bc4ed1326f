//! Upgrade engine for the stored settings record.
//!
//! # Overview
//!
//! - [`UpgradeController`]: finds the milestone a stored record needs next and persists it
//! - [`UpgradeStep`]: one milestone's patch to the untyped record
//! - [`steps`]: the built-in milestones `1.4.1 → 1.4.1.1 → 1.4.2 → 1.4.3 → 1.4.3.2`
//!
//! ## Platform Usage (Kotlin)
//!
//! ```kotlin
//! val controller = UpgradeController(optionStore, PluginConfig("1.4.3.2"))
//! when (val outcome = controller.upgradeOnce()) {
//!     is UpgradeOutcome.Advanced -> log("settings ${outcome.from} -> ${outcome.to}")
//!     else -> {}
//! }
//! ```
//!
//! ## Adding a milestone
//!
//! Implement [`UpgradeStep`] with the new release as its milestone and append it to
//! [`steps::default_steps`]. Its guard becomes `[previous milestone, new milestone)`.

mod controller;
mod error;
mod record_keys;
mod step;

/// Built-in milestones
pub mod steps;

pub use controller::{UpgradeController, UpgradeOutcome};
pub use error::{UpgradeError, UpgradeResult};
pub use step::{StepOutcome, UpgradeStep};
