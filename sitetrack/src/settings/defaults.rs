use crate::events::{EventGroup, EventRegistry};

use super::configuration::{
    AnalyticsTab, Configuration, RunStatus, DEFAULT_DATE_FORMAT, DEFAULT_LIMIT,
    DEFAULT_TIMEOUT_SECONDS,
};

/// The canonical default record for a site reached at `request_host`.
///
/// `version` is left empty; it is stamped with the running version on first write.
#[must_use]
#[uniffi::export]
pub fn default_configuration(request_host: &str) -> Configuration {
    defaults_with_registry(request_host, &EventRegistry::builtin())
}

/// Defaults with event maps taken from `registry`
#[must_use]
pub fn defaults_with_registry(request_host: &str, registry: &EventRegistry) -> Configuration {
    Configuration {
        version: String::new(),
        activated: true,
        api_key: String::new(),
        analytics_tab: AnalyticsTab::Dashboard,
        run_status: RunStatus::On,
        date_format: DEFAULT_DATE_FORMAT.to_string(),
        limit: DEFAULT_LIMIT,
        track_as: domain_from_host(request_host),
        track_article: true,
        ignore_admin: false,
        track_admin: false,
        track_clicks: true,
        track_downloads: true,
        track_outgoing: true,
        use_timeout: false,
        process_event: true,
        timeout: DEFAULT_TIMEOUT_SECONDS,
        hide_campaign: false,
        events: registry.default_states(EventGroup::Site),
        woocommerce_events: registry.default_states(EventGroup::Commerce),
    }
}

/// Reduces a request host to a bare domain.
///
/// Drops an `http://` or `https://` scheme, then a leading `www.`, then everything from the
/// first `/`.
#[must_use]
#[uniffi::export]
pub fn domain_from_host(host: &str) -> String {
    let host = host.trim();
    let host = host
        .strip_prefix("https://")
        .or_else(|| host.strip_prefix("http://"))
        .unwrap_or(host);
    let host = host.strip_prefix("www.").unwrap_or(host);
    host.split('/').next().unwrap_or_default().to_string()
}

/// The domain to track as: the stored value, or the request's domain when none is stored
#[must_use]
pub fn effective_track_as(config: &Configuration, request_host: &str) -> String {
    if config.track_as.trim().is_empty() {
        domain_from_host(request_host)
    } else {
        config.track_as.clone()
    }
}
