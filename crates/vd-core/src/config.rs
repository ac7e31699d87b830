use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::listing::DigestProfile;
use crate::settings::{Setting, SettingValue, SettingsProvider};

/// Which verification outcomes produce a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub on_error: bool,
    pub on_fail: bool,
    pub on_success: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            on_error: true,
            on_fail: true,
            on_success: true,
        }
    }
}

/// External verifier process (speaks native messaging on stdin/stdout).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            program: "vd-verifier".to_string(),
            args: Vec::new(),
        }
    }
}

/// Global configuration loaded from `~/.config/vd/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VdConfig {
    /// How many downloads are tracked at once; the oldest is forgotten beyond that.
    pub remember_downloads: usize,
    /// Upper bound for a directory listing fetch, in milliseconds.
    pub fetch_timeout_ms: u64,
    /// Rule list for digest files, one `pattern || template` per line.
    #[serde(default)]
    pub digest_rules: String,
    /// Rule list for signature files; checked before `digest_rules`.
    #[serde(default)]
    pub signature_rules: String,
    /// Scan the download's directory listing when no rule matches.
    pub use_autodetect: bool,
    /// Whether the verifier can check signatures on this system.
    pub signatures_supported: bool,
    /// Accept `<file>.md5` as a single-file digest.
    #[serde(default)]
    pub include_md5: bool,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub verifier: VerifierConfig,
}

impl Default for VdConfig {
    fn default() -> Self {
        Self {
            remember_downloads: 10,
            fetch_timeout_ms: 2000,
            digest_rules: String::new(),
            signature_rules: String::new(),
            use_autodetect: true,
            signatures_supported: true,
            include_md5: false,
            notify: NotifyConfig::default(),
            verifier: VerifierConfig::default(),
        }
    }
}

impl VdConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn digest_profile(&self) -> DigestProfile {
        DigestProfile {
            include_md5: self.include_md5,
        }
    }
}

impl SettingsProvider for VdConfig {
    fn get(&self, setting: Setting) -> Option<SettingValue> {
        let value = match setting {
            Setting::DigestRules => SettingValue::Text(self.digest_rules.clone()),
            Setting::SignatureRules => SettingValue::Text(self.signature_rules.clone()),
            Setting::UseAutodetect => SettingValue::Flag(self.use_autodetect),
            Setting::NotifyOnError => SettingValue::Flag(self.notify.on_error),
            Setting::NotifyOnFail => SettingValue::Flag(self.notify.on_fail),
            Setting::NotifyOnSuccess => SettingValue::Flag(self.notify.on_success),
        };
        Some(value)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vd")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<VdConfig> {
    load_or_init_at(&config_path()?)
}

/// Same as `load_or_init` for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<VdConfig> {
    if !path.exists() {
        let default_cfg = VdConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: VdConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
