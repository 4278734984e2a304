//! Layered configuration: compiled-in defaults, an optional config file,
//! then `SIGNAL_`-prefixed environment overrides.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use smart_default::SmartDefault;

/// Storage backend selection for the object-store interface.
#[derive(Clone, Copy, Debug, Eq, PartialEq, SmartDefault, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    S3,
}

#[derive(Clone, Debug, SmartDefault, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    #[default = "0.0.0.0:8080"]
    pub bind_addr: String,
}

#[derive(Clone, Debug, SmartDefault, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    #[default = "./data/objects"]
    pub local_dir: String,
    #[default = 3600]
    pub object_ttl_s: u64,
    #[default = 3600]
    pub cleanup_interval_s: u64,
    pub s3_endpoint: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,
    #[default = 300]
    pub s3_put_ttl_s: u64,
    #[default = 3600]
    pub s3_get_ttl_s: u64,
}

#[derive(Clone, Debug, SmartDefault, Deserialize)]
#[serde(default)]
pub struct SignalSettings {
    #[default = false]
    pub debug_enabled: bool,
    #[default = 800]
    pub debug_max_chars: usize,
    #[default = 1200]
    pub probe_timeout_ms: u64,
}

#[derive(Clone, Debug, SmartDefault, Deserialize)]
#[serde(default)]
pub struct TransferSettings {
    #[default = 10_000]
    pub decision_timeout_ms_default: u64,
    #[default = 30_000]
    pub decision_timeout_ms_max: u64,
    #[default = 1_000]
    pub decision_timeout_ms_min: u64,
}

/// Top-level, process-wide settings.
#[derive(Clone, Debug, SmartDefault, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub signal: SignalSettings,
    pub transfer: TransferSettings,
}

impl Settings {
    /// Loads settings from compiled-in defaults, `config/default.toml` and
    /// `config/local.toml` (both optional), then `SIGNAL_`-prefixed
    /// environment variables, in that order of increasing precedence.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("SIGNAL")
                    .separator("__")
                    .try_parsing(true),
            );
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let s = Settings::default();
        assert_eq!(s.transfer.decision_timeout_ms_default, 10_000);
        assert_eq!(s.transfer.decision_timeout_ms_max, 30_000);
        assert_eq!(s.signal.probe_timeout_ms, 1_200);
        assert_eq!(s.storage.backend, StorageBackend::Local);
    }
}
