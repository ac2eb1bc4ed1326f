use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::events::{EventGroup, EventRegistry};

/// Where the analytics dashboard is linked from in the host's admin menu
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsTab {
    /// Under the dashboard menu
    #[default]
    Dashboard,
    /// As its own top-level menu entry
    Toplevel,
}

/// Whether the tracking snippet is emitted at all
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Tracking is active
    #[default]
    On,
    /// Tracking is paused
    Off,
}

/// Seconds of inactivity before the analytics service ends a visit, when overridden
pub const DEFAULT_TIMEOUT_SECONDS: i64 = 600;

/// Default number of rows requested by the dashboard
pub const DEFAULT_LIMIT: u32 = 50;

/// Default dashboard date format
pub const DEFAULT_DATE_FORMAT: &str = "yyyy-MM-dd";

/// The persisted settings record.
///
/// Stored as a single JSON object. Keys missing from a stored record take the defaults
/// below, so records written by older releases always load; keys this schema does not know
/// are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct Configuration {
    /// Plugin version that last wrote the record; empty until first persisted
    #[serde(default)]
    pub version: String,
    /// Whether the plugin is activated in the host
    #[serde(default = "enabled")]
    pub activated: bool,
    /// Key for the analytics service's reporting API
    #[serde(default)]
    pub api_key: String,
    /// Where the dashboard menu entry goes
    #[serde(default)]
    pub analytics_tab: AnalyticsTab,
    /// Master switch for the tracking snippet
    #[serde(default)]
    pub run_status: RunStatus,
    /// Date format used by the dashboard
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Rows requested by the dashboard
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Domain the site is tracked as
    #[serde(default)]
    pub track_as: String,
    /// Track "article view" instead of "pageview" for articles
    #[serde(default = "enabled")]
    pub track_article: bool,
    /// Skip tracking for administrators
    #[serde(default)]
    pub ignore_admin: bool,
    /// Track visits to admin pages
    #[serde(default)]
    pub track_admin: bool,
    /// Track button and link clicks
    #[serde(default = "enabled")]
    pub track_clicks: bool,
    /// Track file downloads
    #[serde(default = "enabled")]
    pub track_downloads: bool,
    /// Track outgoing links
    #[serde(default = "enabled")]
    pub track_outgoing: bool,
    /// Override the service's idle timeout with `timeout`
    #[serde(default)]
    pub use_timeout: bool,
    /// Master switch for event forwarding
    #[serde(default = "enabled")]
    pub process_event: bool,
    /// Idle timeout in seconds; only used with `use_timeout`
    #[serde(default = "default_timeout")]
    pub timeout: i64,
    /// Hide campaign properties in reports
    #[serde(default)]
    pub hide_campaign: bool,
    /// Site event identifier → forwarded
    #[serde(default = "default_site_events")]
    pub events: HashMap<String, bool>,
    /// Commerce event identifier → forwarded
    #[serde(default = "default_commerce_events")]
    pub woocommerce_events: HashMap<String, bool>,
}

impl Configuration {
    /// The enabled flags of an event group
    #[must_use]
    pub const fn event_states(&self, group: EventGroup) -> &HashMap<String, bool> {
        match group {
            EventGroup::Site => &self.events,
            EventGroup::Commerce => &self.woocommerce_events,
        }
    }

    /// Mutable enabled flags of an event group
    pub fn event_states_mut(&mut self, group: EventGroup) -> &mut HashMap<String, bool> {
        match group {
            EventGroup::Site => &mut self.events,
            EventGroup::Commerce => &mut self.woocommerce_events,
        }
    }

    /// Whether an event is forwarded: event processing must be on and the event checked
    #[must_use]
    pub fn is_event_enabled(&self, group: EventGroup, identifier: &str) -> bool {
        self.process_event
            && self
                .event_states(group)
                .get(identifier)
                .copied()
                .unwrap_or(false)
    }

    /// The idle timeout to send to the analytics service, if overridden
    #[must_use]
    pub const fn effective_timeout(&self) -> Option<i64> {
        if self.use_timeout && self.timeout > 0 {
            Some(self.timeout)
        } else {
            None
        }
    }

    /// Whether the record has never been persisted with a version
    #[must_use]
    pub fn is_unversioned(&self) -> bool {
        self.version.trim().is_empty()
    }
}

const fn enabled() -> bool {
    true
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

const fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

const fn default_timeout() -> i64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_site_events() -> HashMap<String, bool> {
    EventRegistry::builtin().default_states(EventGroup::Site)
}

fn default_commerce_events() -> HashMap<String, bool> {
    EventRegistry::builtin().default_states(EventGroup::Commerce)
}
