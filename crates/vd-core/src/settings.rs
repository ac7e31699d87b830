//! Key-value settings consumed by the core.
//!
//! The core never owns settings storage; it reads values through
//! `SettingsProvider` every time it needs one, so edits take effect on the
//! next download without a restart.

use std::fmt;

/// Settings the core reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    DigestRules,
    SignatureRules,
    UseAutodetect,
    NotifyOnError,
    NotifyOnFail,
    NotifyOnSuccess,
}

impl Setting {
    pub const ALL: [Setting; 6] = [
        Setting::DigestRules,
        Setting::SignatureRules,
        Setting::UseAutodetect,
        Setting::NotifyOnError,
        Setting::NotifyOnFail,
        Setting::NotifyOnSuccess,
    ];

    /// Storage key of the setting.
    pub fn key(self) -> &'static str {
        match self {
            Setting::DigestRules => "digest-rules",
            Setting::SignatureRules => "sig-rules",
            Setting::UseAutodetect => "use-autodetect",
            Setting::NotifyOnError => "notify-on-error",
            Setting::NotifyOnFail => "notify-on-fail",
            Setting::NotifyOnSuccess => "notify-on-success",
        }
    }

    pub fn from_key(key: &str) -> Option<Setting> {
        Setting::ALL.into_iter().find(|s| s.key() == key)
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Text(String),
    Flag(bool),
}

/// Read access to the user's settings.
pub trait SettingsProvider: Send + Sync {
    fn get(&self, setting: Setting) -> Option<SettingValue>;

    /// Text value of `setting`; empty when unset or not text.
    fn text(&self, setting: Setting) -> String {
        match self.get(setting) {
            Some(SettingValue::Text(text)) => text,
            _ => String::new(),
        }
    }

    /// Boolean value of `setting`, or `default` when unset or not a flag.
    fn flag(&self, setting: Setting, default: bool) -> bool {
        match self.get(setting) {
            Some(SettingValue::Flag(flag)) => flag,
            _ => default,
        }
    }
}
