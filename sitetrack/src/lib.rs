#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

//! `sitetrack` is the settings core of a site analytics plugin.
//!
//! It owns the plugin's single persisted settings record: its defaults, its validation
//! when the settings form is submitted, and its upgrade from whatever layout an older
//! release left behind. The host supplies option storage, logging and translations
//! through foreign traits.

pub use sitetrack_macros::{sitetrack_error, sitetrack_export};

/// Host-provided collaborators: option storage, logging and process configuration.
pub mod primitives;

/// Dotted plugin versions and version guards.
pub mod version;

/// The static registry of trackable site events.
pub mod events;

/// The settings record, its defaults and its persistence.
pub mod settings;

/// Upgrading a stored record written by an older release.
pub mod upgrade;

/// Validation of settings form submissions.
pub mod validation;

/// The exported façade the host drives.
pub mod manager;

pub use manager::{SettingsError, SettingsManager, SubmissionOutcome};

uniffi::setup_scaffolding!("sitetrack");
