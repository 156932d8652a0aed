use serde::{Deserialize, Serialize};

use crate::storage::KeyValueStore;

pub const THEME_KEY: &str = "userTheme";
pub const DEBUG_KEY: &str = "debug";
pub const NOTIFICATION_SETTINGS_KEY: &str = "notificationSettings";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub email_orders: bool,
    pub email_marketing: bool,
    pub email_news: bool,
    pub sms_important: bool,
    pub sms_payments: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email_orders: true,
            email_marketing: true,
            email_news: false,
            sms_important: true,
            sms_payments: true,
        }
    }
}

/// Per-browser panel settings.
#[derive(Debug, Clone)]
pub struct Preferences {
    store: KeyValueStore,
}

impl Preferences {
    pub fn new(store: KeyValueStore) -> Self {
        Self { store }
    }

    pub fn theme(&self) -> Theme {
        self.store.get(THEME_KEY).unwrap_or_default()
    }

    pub fn set_theme(&self, theme: Theme) -> bool {
        self.store.set(THEME_KEY, &theme)
    }

    /// Flips and persists the theme, returning the new one.
    pub fn toggle_theme(&self) -> Theme {
        let next = self.theme().toggled();
        self.set_theme(next);
        next
    }

    pub fn is_debug(&self) -> bool {
        self.store.get(DEBUG_KEY).unwrap_or(false)
    }

    pub fn enable_debug(&self) -> bool {
        self.store.set(DEBUG_KEY, &true)
    }

    pub fn disable_debug(&self) -> bool {
        self.store.remove(DEBUG_KEY)
    }

    pub fn notification_settings(&self) -> NotificationSettings {
        self.store.get(NOTIFICATION_SETTINGS_KEY).unwrap_or_default()
    }

    pub fn set_notification_settings(&self, settings: &NotificationSettings) -> bool {
        self.store.set(NOTIFICATION_SETTINGS_KEY, settings)
    }
}
