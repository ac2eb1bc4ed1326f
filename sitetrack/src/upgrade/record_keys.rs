use serde_json::Value;

use crate::settings::{Configuration, RawRecord};

/// Renames record keys written by older releases to their current names and drops the
/// ones with no replacement. Returns whether anything changed.
///
/// Older releases kept writing `trackas` and `<prefix>event` long after the record gained
/// `track_as` and `events`, so this runs before every upgrade write, not only the first.
pub fn normalize_record_keys(record: &mut RawRecord, prefix: &str) -> bool {
    let mut changed = rename_key(record, "trackas", "track_as");
    changed |= rename_key(record, &format!("{prefix}event"), "events");
    changed |= rename_key(record, &format!("{prefix}woocommerce_event"), "woocommerce_events");
    changed |= record.remove(&format!("{prefix}events")).is_some();
    changed
}

/// Whether `record` reads back as a [`Configuration`]; the deserialization error otherwise
pub fn check_loadable(record: &RawRecord) -> Result<(), serde_json::Error> {
    serde_json::from_value::<Configuration>(Value::Object(record.clone())).map(|_| ())
}

/// The current name wins when both are present.
fn rename_key(record: &mut RawRecord, from: &str, to: &str) -> bool {
    let Some(value) = record.remove(from) else {
        return false;
    };
    record.entry(to.to_string()).or_insert(value);
    true
}
