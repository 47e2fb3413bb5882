use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::Argon2Params;
use crate::errors::{CredVaultError, Result};
use crate::vault::{LockPolicy, StoreOptions};

/// Environment variable naming a config file for the C ABI.
pub const CONFIG_ENV_VAR: &str = "CREDVAULT_CONFIG";

/// Configuration, loaded from `.credvault.toml`.
///
/// Every field has a sensible default so CredVault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Store file used by the CLI when `--file` is not given.
    #[serde(default = "default_store_file")]
    pub store_file: String,

    /// Argon2 memory cost in KiB for new stores (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count for new stores (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree for new stores (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    /// Give up waiting for the store lock after this long.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Delay between lock attempts.
    #[serde(default = "default_lock_poll_interval_ms")]
    pub lock_poll_interval_ms: u64,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_store_file() -> String {
    "credentials.cvlt".to_string()
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_lock_poll_interval_ms() -> u64 {
    25
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_file: default_store_file(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            lock_timeout_ms: default_lock_timeout_ms(),
            lock_poll_interval_ms: default_lock_poll_interval_ms(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the working directory.
    pub const FILE_NAME: &'static str = ".credvault.toml";

    /// Load settings from `<dir>/.credvault.toml`.
    ///
    /// If the file does not exist, defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::load_file(&config_path)
    }

    /// Load settings from an explicit file path.
    pub fn load_file(config_path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(config_path).map_err(|e| {
            CredVaultError::ConfigError(format!("Failed to read {}: {e}", config_path.display()))
        })?;

        toml::from_str(&contents).map_err(|e| {
            CredVaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })
    }

    /// Settings for the C ABI: the file named by `CREDVAULT_CONFIG`, or
    /// defaults when the variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::load_file(&PathBuf::from(path)),
            _ => Ok(Self::default()),
        }
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }

    /// Lock waiting policy.
    pub fn lock_policy(&self) -> LockPolicy {
        LockPolicy {
            timeout: Duration::from_millis(self.lock_timeout_ms),
            poll_interval: Duration::from_millis(self.lock_poll_interval_ms.max(1)),
        }
    }

    /// Everything an `AccountStore` session needs.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            argon2: self.argon2_params(),
            lock: self.lock_policy(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.store_file, "credentials.cvlt");
        assert_eq!(s.argon2_memory_kib, 65_536);
        assert_eq!(s.argon2_iterations, 3);
        assert_eq!(s.argon2_parallelism, 4);
        assert_eq!(s.lock_timeout_ms, 5_000);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.store_file, "credentials.cvlt");
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
store_file = "work.cvlt"
argon2_memory_kib = 131072
argon2_iterations = 5
argon2_parallelism = 8
lock_timeout_ms = 250
lock_poll_interval_ms = 5
"#;
        fs::write(tmp.path().join(".credvault.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.store_file, "work.cvlt");
        assert_eq!(settings.argon2_memory_kib, 131_072);
        assert_eq!(settings.argon2_iterations, 5);
        assert_eq!(settings.argon2_parallelism, 8);

        let options = settings.store_options();
        assert_eq!(options.lock.timeout, Duration::from_millis(250));
        assert_eq!(options.lock.poll_interval, Duration::from_millis(5));
        assert_eq!(options.argon2.memory_kib, 131_072);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".credvault.toml"), "lock_timeout_ms = 10\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.lock_timeout_ms, 10);
        assert_eq!(settings.store_file, "credentials.cvlt");
        assert_eq!(settings.argon2_iterations, 3);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".credvault.toml"), "not valid {{toml").unwrap();

        let result = Settings::load(tmp.path());
        assert!(matches!(result, Err(CredVaultError::ConfigError(_))));
    }

    #[test]
    fn load_errors_on_unknown_keys() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".credvault.toml"), "lock_timout_ms = 10\n").unwrap();
        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let s = Settings {
            lock_poll_interval_ms: 0,
            ..Settings::default()
        };
        assert_eq!(s.lock_policy().poll_interval, Duration::from_millis(1));
    }
}
