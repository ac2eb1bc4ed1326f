//! Validation of settings form submissions.
//!
//! A submission is the settings form as a JSON object keyed by record field names, plus
//! the `delete` and `default` control flags. Checkboxes follow form semantics: an
//! unchecked box is simply absent from the submission.

mod error;

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub use error::ValidationError;

use crate::events::{EventGroup, EventRegistry};
use crate::settings::{defaults_with_registry, Configuration};

/// A settings submission keyed by field name
pub type Submission = Map<String, Value>;

const DELETE_FLAG: &str = "delete";
const RESET_FLAG: &str = "default";

/// Fields rendered as checkboxes; absent means unchecked
const CHECKBOXES: [&str; 9] = [
    "track_article",
    "ignore_admin",
    "track_admin",
    "track_clicks",
    "track_downloads",
    "track_outgoing",
    "use_timeout",
    "process_event",
    "hide_campaign",
];

/// What a valid submission asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Delete the stored record
    Delete,
    /// Replace the stored record with these defaults
    Reset(Configuration),
    /// Persist this record
    Update(Configuration),
}

/// Turns form submissions into settings records.
pub struct SettingsValidator<'a> {
    registry: &'a EventRegistry,
}

impl<'a> SettingsValidator<'a> {
    /// Validator filling event maps from `registry`
    #[must_use]
    pub const fn new(registry: &'a EventRegistry) -> Self {
        Self { registry }
    }

    /// Parses a JSON submission.
    ///
    /// # Errors
    /// - `ValidationError::InvalidField` if `json` is not a JSON object
    pub fn parse(json: &str) -> Result<Submission, ValidationError> {
        match serde_json::from_str(json) {
            Ok(Value::Object(submission)) => Ok(submission),
            Ok(other) => Err(ValidationError::InvalidField {
                field: "submission".to_string(),
                message: format!("expected a JSON object, found {other}"),
            }),
            Err(e) => Err(ValidationError::InvalidField {
                field: "submission".to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// The action a set `delete` or `default` flag asks for, `None` when neither is set.
    ///
    /// Needs nothing from the stored record, so a record that no longer loads can still be
    /// deleted or reset.
    #[must_use]
    pub fn control_action(
        &self,
        submission: &Submission,
        request_host: &str,
    ) -> Option<ValidationOutcome> {
        if is_flag_set(submission.get(DELETE_FLAG)) {
            return Some(ValidationOutcome::Delete);
        }
        if is_flag_set(submission.get(RESET_FLAG)) {
            return Some(ValidationOutcome::Reset(defaults_with_registry(
                request_host,
                self.registry,
            )));
        }
        None
    }

    /// Validates `submission` against the currently stored record.
    ///
    /// The control flags are checked first: `delete` wins over `default`, and neither
    /// looks at any other field. Otherwise fields present in the submission replace the
    /// stored values, unchecked checkboxes become `false`, and `version` is always kept
    /// from `stored`. A non-positive `timeout` switches `use_timeout` off.
    ///
    /// # Errors
    /// - `ValidationError::TimeoutNotNumeric` if `timeout` is missing or not a whole number
    /// - `ValidationError::UnknownField` for a key the record does not have
    /// - `ValidationError::InvalidField` for a value that cannot be read as its field's type
    pub fn validate(
        &self,
        submission: &Submission,
        stored: &Configuration,
        request_host: &str,
    ) -> Result<ValidationOutcome, ValidationError> {
        if let Some(action) = self.control_action(submission, request_host) {
            return Ok(action);
        }

        let fields = submission
            .iter()
            .filter(|(field, _)| *field != DELETE_FLAG && *field != RESET_FLAG);

        let mut config = stored.clone();
        config.timeout = parse_timeout(submission.get("timeout"))?;
        for checkbox in CHECKBOXES {
            if let Some(slot) = checkbox_mut(&mut config, checkbox) {
                *slot = false;
            }
        }

        for (field, value) in fields {
            if let Some(slot) = checkbox_mut(&mut config, field) {
                *slot = coerce_bool(field, value)?;
                continue;
            }
            match field.as_str() {
                "version" | "timeout" | "events" | "woocommerce_events" => {}
                "activated" => config.activated = coerce_bool(field, value)?,
                "api_key" => config.api_key = coerce_string(field, value)?,
                "analytics_tab" => config.analytics_tab = coerce_enum(field, value)?,
                "run_status" => config.run_status = coerce_enum(field, value)?,
                "date_format" => config.date_format = coerce_string(field, value)?,
                "limit" => config.limit = coerce_limit(field, value)?,
                "track_as" => config.track_as = coerce_string(field, value)?.trim().to_string(),
                _ => {
                    return Err(ValidationError::UnknownField {
                        field: field.clone(),
                    })
                }
            }
        }

        for group in [EventGroup::Site, EventGroup::Commerce] {
            let states = self.event_states(group, submission, stored.event_states(group))?;
            *config.event_states_mut(group) = states;
        }

        if config.timeout <= 0 {
            config.use_timeout = false;
        }

        Ok(ValidationOutcome::Update(config))
    }

    /// Enabled flags for every registered event of `group`.
    ///
    /// Accepts an object of identifier → checkbox value or an array of checked identifiers.
    /// Admin-only events are not on the form and keep their stored state.
    fn event_states(
        &self,
        group: EventGroup,
        submission: &Submission,
        stored: &HashMap<String, bool>,
    ) -> Result<HashMap<String, bool>, ValidationError> {
        let field = group_field(group);
        let invalid = |message: String| ValidationError::InvalidField {
            field: field.to_string(),
            message,
        };

        let mut checked = HashMap::new();
        match submission.get(field) {
            None | Some(Value::Null) => {}
            Some(Value::Object(flags)) => {
                for (identifier, value) in flags {
                    checked.insert(identifier.clone(), coerce_bool(field, value)?);
                }
            }
            Some(Value::Array(identifiers)) => {
                for identifier in identifiers {
                    let identifier = identifier
                        .as_str()
                        .ok_or_else(|| invalid(format!("expected event identifiers, found {identifier}")))?;
                    checked.insert(identifier.to_string(), true);
                }
            }
            Some(other) => return Err(invalid(format!("expected event flags, found {other}"))),
        }

        let descriptors = self.registry.descriptors(group);
        if let Some(unknown) = checked
            .keys()
            .find(|identifier| !descriptors.iter().any(|d| d.identifier() == identifier.as_str()))
        {
            return Err(invalid(format!("unknown event {unknown:?}")));
        }

        Ok(descriptors
            .iter()
            .map(|descriptor| {
                let identifier = descriptor.identifier();
                let enabled = if descriptor.is_admin_only() {
                    stored.get(identifier).copied().unwrap_or(true)
                } else {
                    checked.get(identifier).copied().unwrap_or(false)
                };
                (identifier.to_string(), enabled)
            })
            .collect())
    }
}

const fn group_field(group: EventGroup) -> &'static str {
    match group {
        EventGroup::Site => "events",
        EventGroup::Commerce => "woocommerce_events",
    }
}

fn checkbox_mut<'c>(config: &'c mut Configuration, field: &str) -> Option<&'c mut bool> {
    let slot = match field {
        "track_article" => &mut config.track_article,
        "ignore_admin" => &mut config.ignore_admin,
        "track_admin" => &mut config.track_admin,
        "track_clicks" => &mut config.track_clicks,
        "track_downloads" => &mut config.track_downloads,
        "track_outgoing" => &mut config.track_outgoing,
        "use_timeout" => &mut config.use_timeout,
        "process_event" => &mut config.process_event,
        "hide_campaign" => &mut config.hide_campaign,
        _ => return None,
    };
    Some(slot)
}

fn is_flag_set(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(set)) => *set,
        Some(Value::String(set)) => set == "true",
        _ => false,
    }
}

fn parse_timeout(value: Option<&Value>) -> Result<i64, ValidationError> {
    let not_numeric = |value: String| ValidationError::TimeoutNotNumeric { value };
    match value {
        Some(Value::Number(number)) => number.as_i64().ok_or_else(|| not_numeric(number.to_string())),
        Some(Value::String(text)) => text.trim().parse().map_err(|_| not_numeric(text.clone())),
        None | Some(Value::Null) => Err(not_numeric(String::new())),
        Some(other) => Err(not_numeric(other.to_string())),
    }
}

fn invalid_field(field: &str, value: &Value, expected: &str) -> ValidationError {
    ValidationError::InvalidField {
        field: field.to_string(),
        message: format!("expected {expected}, found {value}"),
    }
}

fn coerce_bool(field: &str, value: &Value) -> Result<bool, ValidationError> {
    match value {
        Value::Bool(checked) => Ok(*checked),
        Value::Null => Ok(false),
        Value::Number(number) => match number.as_i64() {
            Some(1) => Ok(true),
            Some(0) => Ok(false),
            _ => Err(invalid_field(field, value, "a checkbox value")),
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Ok(true),
            "" | "0" | "false" | "off" | "no" => Ok(false),
            _ => Err(invalid_field(field, value, "a checkbox value")),
        },
        Value::Array(_) | Value::Object(_) => Err(invalid_field(field, value, "a checkbox value")),
    }
}

fn coerce_string(field: &str, value: &Value) -> Result<String, ValidationError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Null => Ok(String::new()),
        Value::Number(number) => Ok(number.to_string()),
        _ => Err(invalid_field(field, value, "text")),
    }
}

fn coerce_limit(field: &str, value: &Value) -> Result<u32, ValidationError> {
    let limit = match value {
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    limit.ok_or_else(|| invalid_field(field, value, "a non-negative whole number"))
}

fn coerce_enum<T: DeserializeOwned>(field: &str, value: &Value) -> Result<T, ValidationError> {
    let Value::String(text) = value else {
        return Err(invalid_field(field, value, "text"));
    };
    serde_json::from_value(Value::String(text.trim().to_ascii_lowercase())).map_err(|e| {
        ValidationError::InvalidField {
            field: field.to_string(),
            message: e.to_string(),
        }
    })
}
