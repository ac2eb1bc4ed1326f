//! Static registry of trackable site events.
//!
//! The registry only describes events. Whether an event is forwarded is user configuration
//! and lives in the settings record's `events` / `woocommerce_events` maps, keyed by
//! [`EventDescriptor::identifier`].

use std::collections::HashMap;

/// The settings map an event's enabled flag is stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum EventGroup {
    /// Core site events, stored in `events`
    Site,
    /// Shop events, stored in `woocommerce_events`
    Commerce,
}

/// The host hook an event is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventHook {
    /// An action hook
    Action(String),
    /// A filter hook
    Filter(String),
}

/// Metadata describing one trackable site action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDescriptor {
    hook: EventHook,
    setting: Option<String>,
    display_name: String,
    description: String,
    admin_only: bool,
}

impl EventDescriptor {
    /// Event fired from an action hook
    #[must_use]
    pub fn action(action: &str, display_name: &str, description: &str) -> Self {
        Self::new(EventHook::Action(action.to_string()), display_name, description)
    }

    /// Event fired from a filter hook
    #[must_use]
    pub fn filter(filter: &str, display_name: &str, description: &str) -> Self {
        Self::new(EventHook::Filter(filter.to_string()), display_name, description)
    }

    fn new(hook: EventHook, display_name: &str, description: &str) -> Self {
        Self {
            hook,
            setting: None,
            display_name: display_name.to_string(),
            description: description.to_string(),
            admin_only: false,
        }
    }

    /// Stores the enabled flag under `setting` instead of the hook name.
    ///
    /// Needed when two events share a hook.
    #[must_use]
    pub fn with_setting(mut self, setting: &str) -> Self {
        self.setting = Some(setting.to_string());
        self
    }

    /// Hides the event from the settings screen
    #[must_use]
    pub const fn admin_only(mut self) -> Self {
        self.admin_only = true;
        self
    }

    /// Key of this event in the settings maps: the explicit setting, else the hook name
    #[must_use]
    pub fn identifier(&self) -> &str {
        self.setting.as_deref().unwrap_or(match &self.hook {
            EventHook::Action(name) | EventHook::Filter(name) => name.as_str(),
        })
    }

    /// The hook this event is attached to
    #[must_use]
    pub const fn hook(&self) -> &EventHook {
        &self.hook
    }

    /// Name shown to users
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// One-line description shown next to the checkbox
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether the event is hidden from the settings screen
    #[must_use]
    pub const fn is_admin_only(&self) -> bool {
        self.admin_only
    }

    fn translated(&self, translator: &dyn Translator) -> Self {
        Self {
            display_name: translator.translate(self.display_name.clone()),
            description: translator.translate(self.description.clone()),
            ..self.clone()
        }
    }
}

/// Translation lookup provided by the host once its localization data is loaded
#[uniffi::export(with_foreign)]
pub trait Translator: Send + Sync {
    /// Returns the localized form of `text`, or `text` itself if there is none
    fn translate(&self, text: String) -> String;
}

/// A user-facing event with its checkbox state
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct EventListing {
    /// Key in the settings map
    pub identifier: String,
    /// Name shown to users
    pub display_name: String,
    /// Description shown next to the checkbox
    pub description: String,
    /// Whether the event is currently forwarded
    pub enabled: bool,
}

/// The descriptors of every event the plugin can forward, per group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRegistry {
    site: Vec<EventDescriptor>,
    commerce: Vec<EventDescriptor>,
}

impl EventRegistry {
    /// Registry with explicit descriptor lists
    #[must_use]
    pub const fn new(site: Vec<EventDescriptor>, commerce: Vec<EventDescriptor>) -> Self {
        Self { site, commerce }
    }

    /// The events shipped with the plugin
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(
            vec![
                EventDescriptor::action(
                    "comment_post",
                    "comments",
                    "Show comments as they are posted.",
                ),
                EventDescriptor::action("search_query", "search", "Show users search queries."),
                EventDescriptor::action("signup", "signup", "Show users sign up."),
            ],
            vec![
                EventDescriptor::action("cart", "cart update", "Show cart updates."),
                EventDescriptor::action("checkout", "checkout", "Show users checkouts."),
                EventDescriptor::action("coupon", "coupon", "Track coupons applied."),
            ],
        )
    }

    /// All descriptors of a group, including admin-only ones
    #[must_use]
    pub fn descriptors(&self, group: EventGroup) -> &[EventDescriptor] {
        match group {
            EventGroup::Site => &self.site,
            EventGroup::Commerce => &self.commerce,
        }
    }

    /// Descriptors shown on the settings screen
    pub fn user_facing(&self, group: EventGroup) -> impl Iterator<Item = &EventDescriptor> {
        self.descriptors(group)
            .iter()
            .filter(|descriptor| !descriptor.is_admin_only())
    }

    /// Every identifier of the group mapped to `true`, as used by the defaults
    #[must_use]
    pub fn default_states(&self, group: EventGroup) -> HashMap<String, bool> {
        self.descriptors(group)
            .iter()
            .map(|descriptor| (descriptor.identifier().to_string(), true))
            .collect()
    }

    /// A copy with display names and descriptions passed through `translator`
    #[must_use]
    pub fn localized(&self, translator: &dyn Translator) -> Self {
        let translate_all = |descriptors: &[EventDescriptor]| -> Vec<EventDescriptor> {
            descriptors
                .iter()
                .map(|descriptor| descriptor.translated(translator))
                .collect()
        };
        Self::new(
            translate_all(self.site.as_slice()),
            translate_all(self.commerce.as_slice()),
        )
    }

    /// User-facing events of a group with their enabled state in `states`.
    ///
    /// Events missing from `states` are listed as disabled.
    #[must_use]
    pub fn listing(&self, group: EventGroup, states: &HashMap<String, bool>) -> Vec<EventListing> {
        self.user_facing(group)
            .map(|descriptor| EventListing {
                identifier: descriptor.identifier().to_string(),
                display_name: descriptor.display_name().to_string(),
                description: descriptor.description().to_string(),
                enabled: states
                    .get(descriptor.identifier())
                    .copied()
                    .unwrap_or(false),
            })
            .collect()
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
