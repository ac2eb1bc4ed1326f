use serde_json::{Map, Value};

use crate::settings::{AnalyticsTab, ConfigStore, ConfigStoreError, RawRecord, RunStatus};
use crate::upgrade::error::{UpgradeError, UpgradeResult};
use crate::upgrade::record_keys::normalize_record_keys;
use crate::upgrade::step::{StepOutcome, UpgradeStep};

/// Value a legacy checkbox option holds when it is checked
const LEGACY_CHECKED: &str = "YES";

/// Legacy checkbox options and the record field each one becomes.
/// `None` means the option is dropped without a replacement.
const LEGACY_FLAGS: [(&str, Option<FlagTarget>); 5] = [
    ("auto_tag_commentators", None),
    ("ignore_admin", Some(FlagTarget::Field("ignore_admin"))),
    ("track_admin", Some(FlagTarget::Field("track_admin"))),
    ("show_comments", Some(FlagTarget::SiteEvent("comment_post"))),
    ("show_searches", Some(FlagTarget::SiteEvent("search_query"))),
];

#[derive(Clone, Copy)]
enum FlagTarget {
    Field(&'static str),
    SiteEvent(&'static str),
}

/// Legacy scalar options carried over unchanged
const LEGACY_SCALARS: [&str; 2] = ["api_key", "analytics_tab"];

/// Folds the individually stored options of early releases into the settings record.
///
/// Checkbox options set the matching record fields; `api_key` and `analytics_tab` are
/// carried over. An option that is no longer stored leaves the record's current value,
/// so a second run changes nothing. Old record keys are renamed to their current names,
/// and the record is marked activated.
pub struct ConsolidateLegacyOptions;

impl ConsolidateLegacyOptions {
    /// Whether any legacy option is still stored
    ///
    /// # Errors
    /// - `ConfigStoreError::Persistence` if the host store fails
    pub fn legacy_options_present(store: &ConfigStore) -> Result<bool, ConfigStoreError> {
        for name in LEGACY_FLAGS.iter().map(|(name, _)| *name).chain(LEGACY_SCALARS) {
            if store.legacy_option(name)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl UpgradeStep for ConsolidateLegacyOptions {
    fn milestone(&self) -> &'static str {
        "1.4.1"
    }

    fn apply(&self, record: &mut RawRecord, store: &ConfigStore) -> UpgradeResult<StepOutcome> {
        normalize_record_keys(record, store.plugin_config().legacy_option_prefix());

        let mut retired_options = Vec::new();

        for (name, target) in LEGACY_FLAGS {
            let Some(value) = store.legacy_option(name)? else {
                continue;
            };
            let checked = value.trim() == LEGACY_CHECKED;
            match target {
                Some(FlagTarget::Field(field)) => {
                    record.insert(field.to_string(), Value::Bool(checked));
                }
                Some(FlagTarget::SiteEvent(identifier)) => {
                    site_events(record)?.insert(identifier.to_string(), Value::Bool(checked));
                }
                None => {}
            }
            retired_options.push(name.to_string());
        }

        if let Some(api_key) = store.legacy_option("api_key")? {
            record.insert("api_key".to_string(), Value::String(api_key));
            retired_options.push("api_key".to_string());
        }

        if let Some(tab) = store.legacy_option("analytics_tab")? {
            record.insert("analytics_tab".to_string(), serde_json::to_value(parse_tab(&tab))?);
            retired_options.push("analytics_tab".to_string());
        }
        let tab_is_empty = record
            .get("analytics_tab")
            .is_none_or(|tab| tab.as_str().is_some_and(|tab| tab.trim().is_empty()));
        if tab_is_empty {
            record.insert(
                "analytics_tab".to_string(),
                serde_json::to_value(AnalyticsTab::Dashboard)?,
            );
        }

        record.insert("run_status".to_string(), serde_json::to_value(RunStatus::On)?);
        record.insert("activated".to_string(), Value::Bool(true));

        Ok(StepOutcome { retired_options })
    }
}

fn parse_tab(value: &str) -> AnalyticsTab {
    match value.trim().to_ascii_lowercase().as_str() {
        "toplevel" => AnalyticsTab::Toplevel,
        _ => AnalyticsTab::Dashboard,
    }
}

fn site_events(record: &mut RawRecord) -> UpgradeResult<&mut Map<String, Value>> {
    record
        .entry("events".to_string())
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| UpgradeError::Json {
            message: "`events` is not an object".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::primitives::option_store::InMemoryOptionStore;
    use crate::primitives::PluginConfig;

    fn store_with(options: &[(&str, &str)]) -> ConfigStore {
        ConfigStore::new(
            Arc::new(InMemoryOptionStore::with_options(options)),
            Arc::new(PluginConfig::new("1.4.3.2").unwrap()),
        )
    }

    fn raw(value: Value) -> RawRecord {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_consolidates_legacy_options() {
        let store = store_with(&[
            ("sitetrack_auto_tag_commentators", "YES"),
            ("sitetrack_ignore_admin", "YES"),
            ("sitetrack_track_admin", "NO"),
            ("sitetrack_show_comments", "YES"),
            ("sitetrack_show_searches", ""),
            ("sitetrack_api_key", "abc123"),
            ("sitetrack_analytics_tab", "toplevel"),
        ]);
        let mut record = RawRecord::new();

        let outcome = ConsolidateLegacyOptions.apply(&mut record, &store).unwrap();

        assert_eq!(record["ignore_admin"], true);
        assert_eq!(record["track_admin"], false);
        assert_eq!(record["events"]["comment_post"], true);
        assert_eq!(record["events"]["search_query"], false);
        assert_eq!(record["api_key"], "abc123");
        assert_eq!(record["analytics_tab"], "toplevel");
        assert_eq!(record["run_status"], "on");
        assert_eq!(record["activated"], true);
        assert!(!record.contains_key("auto_tag_commentators"));
        assert_eq!(outcome.retired_options.len(), 7);
    }

    #[test]
    fn test_absent_options_keep_record_values() {
        let store = store_with(&[]);
        let mut record = raw(json!({
            "ignore_admin": true,
            "api_key": "kept",
            "analytics_tab": "toplevel",
            "run_status": "off",
        }));

        let outcome = ConsolidateLegacyOptions.apply(&mut record, &store).unwrap();

        assert_eq!(record["ignore_admin"], true);
        assert_eq!(record["api_key"], "kept");
        assert_eq!(record["analytics_tab"], "toplevel");
        assert_eq!(record["run_status"], "on");
        assert!(outcome.retired_options.is_empty());
    }

    #[test]
    fn test_empty_tab_becomes_dashboard() {
        let store = store_with(&[("sitetrack_analytics_tab", "")]);
        let mut record = RawRecord::new();
        ConsolidateLegacyOptions.apply(&mut record, &store).unwrap();
        assert_eq!(record["analytics_tab"], "dashboard");

        let store = store_with(&[]);
        let mut record = raw(json!({ "analytics_tab": "" }));
        ConsolidateLegacyOptions.apply(&mut record, &store).unwrap();
        assert_eq!(record["analytics_tab"], "dashboard");
    }

    #[test]
    fn test_renames_old_record_keys() {
        let store = store_with(&[]);
        let mut record = raw(json!({
            "trackas": "example.com",
            "sitetrack_event": { "signup": false },
            "sitetrack_woocommerce_event": { "cart": false },
            "sitetrack_events": { "stale": true },
        }));

        ConsolidateLegacyOptions.apply(&mut record, &store).unwrap();

        assert_eq!(record["track_as"], "example.com");
        assert_eq!(record["events"], json!({ "signup": false }));
        assert_eq!(record["woocommerce_events"], json!({ "cart": false }));
        for key in ["trackas", "sitetrack_event", "sitetrack_woocommerce_event", "sitetrack_events"] {
            assert!(!record.contains_key(key), "{key}");
        }
    }

    #[test]
    fn test_detects_legacy_options() {
        assert!(!ConsolidateLegacyOptions::legacy_options_present(&store_with(&[])).unwrap());
        assert!(ConsolidateLegacyOptions::legacy_options_present(&store_with(&[(
            "sitetrack_analytics_tab",
            "dashboard"
        )]))
        .unwrap());
        assert!(ConsolidateLegacyOptions::legacy_options_present(&store_with(&[(
            "sitetrack_show_searches",
            "YES"
        )]))
        .unwrap());
    }

    #[test]
    fn test_is_idempotent() {
        let store = store_with(&[("sitetrack_show_searches", "YES"), ("sitetrack_api_key", "k")]);
        let mut once = raw(json!({ "trackas": "example.com" }));
        ConsolidateLegacyOptions.apply(&mut once, &store).unwrap();

        let mut twice = once.clone();
        ConsolidateLegacyOptions.apply(&mut twice, &store).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_non_object_events_is_rejected() {
        let store = store_with(&[("sitetrack_show_comments", "YES")]);
        let mut record = raw(json!({ "events": "broken" }));

        let result = ConsolidateLegacyOptions.apply(&mut record, &store);
        assert!(matches!(result, Err(UpgradeError::Json { .. })));
    }
}
