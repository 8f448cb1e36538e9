use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::session::cache::DEFAULT_MAX_CACHE_SIZE;
use crate::session::config::SessionTimeouts;

/// Ten years, the default client-side lifetime of the session cookie
pub const DEFAULT_COOKIE_MAX_AGE_SECS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SessionVaultSettings {
    pub application: ApplicationSettings,
    pub session: SessionSettings,
    pub cookies: CookieSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Mount the development sign-in endpoint, which binds any user id it is
    /// given. Never enable this without an authenticator in front.
    pub dev_sign_in: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Maximum idle time in seconds. Unset means sessions never idle out.
    pub session_expiry_secs: Option<u64>,
    /// Maximum age of a session id in seconds before it is rotated
    pub id_expiry_secs: u64,
    /// How long a rotated-out id keeps resolving, in seconds
    pub id_grace_period_secs: u64,
    /// Cache capacity. `0` disables caching, negative values never evict.
    pub max_cache_size: i64,
    /// Interval of the expired-session sweep in seconds. `0` disables it.
    pub purge_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
    pub http_only: bool,
    pub path: String,
    pub domain: Option<String>,
    pub max_age_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            dev_sign_in: false,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            session_expiry_secs: None,
            id_expiry_secs: 60 * 60,
            id_grace_period_secs: 5 * 60,
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            purge_interval_secs: 60 * 60,
        }
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: "id".to_string(),
            secure: true, // Default to secure cookies
            http_only: true,
            path: "/".to_string(),
            domain: None,
            max_age_secs: DEFAULT_COOKIE_MAX_AGE_SECS,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl SessionSettings {
    /// Timing rules for the session lifecycle
    #[must_use]
    pub fn timeouts(&self) -> SessionTimeouts {
        SessionTimeouts {
            session_expiry: self.session_expiry_secs.map(seconds),
            id_expiry: seconds(self.id_expiry_secs),
            id_grace_period: seconds(self.id_grace_period_secs),
        }
    }

    /// Interval of the expired-session sweep, if enabled
    #[must_use]
    pub fn purge_interval(&self) -> Option<std::time::Duration> {
        (self.purge_interval_secs > 0)
            .then(|| std::time::Duration::from_secs(self.purge_interval_secs))
    }
}

fn seconds(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

impl SessionVaultSettings {
    /// Load settings from configuration files and environment variables,
    /// then initialize logging at the configured level
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A settings file cannot be read
    /// - TOML parsing fails
    /// - Logger initialization fails
    pub fn load() -> Result<Self> {
        Self::load_env_file();

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);

        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(settings.logging.level.as_str()),
        )
        .try_init()
        .context("Failed to initialize logger")?;

        Ok(settings)
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `SESSIONVAULT_CONFIG_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    fn load_base_settings() -> Result<Self> {
        let mut settings = Self::default();

        let default_config_path = Path::new("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(default_config_path)?;
            println!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(config_dir) = std::env::var("SESSIONVAULT_CONFIG_DIR") {
            let config_path = Path::new(&config_dir).join("Settings.toml");
            if config_path.exists() {
                settings = Self::from_file(&config_path)?;
                println!("✓ Overriding settings from {}", config_path.display());
            } else {
                println!(
                    "ℹ SESSIONVAULT_CONFIG_DIR set but no Settings.toml found at: {}",
                    config_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse settings from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self> {
        let toml_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        basic_toml::from_str(&toml_content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_session_env_overrides(&mut settings.session);
        Self::apply_cookie_env_overrides(&mut settings.cookies);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        Self::apply_parsed_env_override("PORT", &mut app_settings.port);
    }

    /// Apply environment overrides for session settings
    pub fn apply_session_env_overrides(session_settings: &mut SessionSettings) {
        if let Ok(value) = std::env::var("SESSION_EXPIRY_SECS") {
            if value.is_empty() {
                session_settings.session_expiry_secs = None;
            } else if let Ok(secs) = value.parse::<u64>() {
                session_settings.session_expiry_secs = Some(secs);
            }
        }
        Self::apply_parsed_env_override("SESSION_ID_EXPIRY_SECS", &mut session_settings.id_expiry_secs);
        Self::apply_parsed_env_override(
            "SESSION_ID_GRACE_PERIOD_SECS",
            &mut session_settings.id_grace_period_secs,
        );
        Self::apply_parsed_env_override("SESSION_MAX_CACHE_SIZE", &mut session_settings.max_cache_size);
        Self::apply_parsed_env_override(
            "SESSION_PURGE_INTERVAL_SECS",
            &mut session_settings.purge_interval_secs,
        );
    }

    fn apply_cookie_env_overrides(cookie_settings: &mut CookieSettings) {
        if let Ok(name) = std::env::var("COOKIE_NAME") {
            cookie_settings.name = name;
        }
        Self::apply_parsed_env_override("COOKIE_SECURE", &mut cookie_settings.secure);
        if let Ok(domain) = std::env::var("COOKIE_DOMAIN") {
            cookie_settings.domain = (!domain.is_empty()).then_some(domain);
        }
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Helper function to apply parsed environment variable overrides.
    /// Unparseable values are ignored.
    fn apply_parsed_env_override<T: FromStr>(env_var: &str, target: &mut T) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<T>() {
                *target = value;
            }
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = fs::read_to_string(".env") {
            for line in contents.lines() {
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    // Helper function to clean all relevant environment variables for tests
    fn clean_env_vars() {
        for var in [
            "SESSION_EXPIRY_SECS",
            "SESSION_ID_EXPIRY_SECS",
            "SESSION_ID_GRACE_PERIOD_SECS",
            "SESSION_MAX_CACHE_SIZE",
            "SESSION_PURGE_INTERVAL_SECS",
            "COOKIE_NAME",
            "COOKIE_SECURE",
            "COOKIE_DOMAIN",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults_match_session_package_defaults() {
        let settings = SessionVaultSettings::default();
        let timeouts = settings.session.timeouts();

        assert_eq!(timeouts.session_expiry, None);
        assert_eq!(timeouts.id_expiry, Duration::hours(1));
        assert_eq!(timeouts.id_grace_period, Duration::minutes(5));
        assert_eq!(settings.session.max_cache_size, 1024 * 1024);
        assert_eq!(settings.cookies.name, "id");
        assert!(settings.cookies.http_only);
        assert!(!settings.application.dev_sign_in);
    }

    #[test]
    #[serial]
    fn test_session_env_overrides() {
        clean_env_vars();

        std::env::set_var("SESSION_EXPIRY_SECS", "1800");
        std::env::set_var("SESSION_ID_EXPIRY_SECS", "600");
        std::env::set_var("SESSION_MAX_CACHE_SIZE", "-1");
        std::env::set_var("SESSION_ID_GRACE_PERIOD_SECS", "not-a-number");

        let mut session_settings = SessionSettings::default();
        SessionVaultSettings::apply_session_env_overrides(&mut session_settings);

        assert_eq!(session_settings.session_expiry_secs, Some(1800));
        assert_eq!(session_settings.id_expiry_secs, 600);
        assert_eq!(session_settings.max_cache_size, -1);
        // Unparseable values leave the default in place
        assert_eq!(session_settings.id_grace_period_secs, 300);

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_empty_session_expiry_disables_idle_timeout() {
        clean_env_vars();

        std::env::set_var("SESSION_EXPIRY_SECS", "");
        let mut session_settings = SessionSettings {
            session_expiry_secs: Some(60),
            ..Default::default()
        };
        SessionVaultSettings::apply_session_env_overrides(&mut session_settings);
        assert_eq!(session_settings.session_expiry_secs, None);

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_cookie_env_overrides() {
        clean_env_vars();

        std::env::set_var("COOKIE_NAME", "sid");
        std::env::set_var("COOKIE_SECURE", "false");
        std::env::set_var("COOKIE_DOMAIN", "example.com");

        let mut settings = SessionVaultSettings::default();
        SessionVaultSettings::apply_env_overrides(&mut settings);

        assert_eq!(settings.cookies.name, "sid");
        assert!(!settings.cookies.secure);
        assert_eq!(settings.cookies.domain.as_deref(), Some("example.com"));

        clean_env_vars();
    }

    #[test]
    fn test_partial_settings_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[session]\nid_expiry_secs = 120\nmax_cache_size = 10\n\n[cookies]\nsecure = false"
        )
        .unwrap();

        let settings = SessionVaultSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.session.id_expiry_secs, 120);
        assert_eq!(settings.session.max_cache_size, 10);
        assert_eq!(settings.session.id_grace_period_secs, 300);
        assert!(!settings.cookies.secure);
        assert_eq!(settings.cookies.name, "id");
        assert_eq!(settings.application.port, 8080);
    }

    #[test]
    fn test_invalid_settings_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\nid_expiry_secs = \"soon\"").unwrap();

        assert!(SessionVaultSettings::from_file(file.path()).is_err());
    }

    #[test]
    fn test_purge_interval_zero_disables_sweep() {
        let session_settings = SessionSettings {
            purge_interval_secs: 0,
            ..Default::default()
        };
        assert!(session_settings.purge_interval().is_none());
        assert_eq!(
            SessionSettings::default().purge_interval(),
            Some(std::time::Duration::from_secs(3600))
        );
    }

    #[test]
    fn test_huge_expiry_saturates() {
        let session_settings = SessionSettings {
            session_expiry_secs: Some(u64::MAX),
            ..Default::default()
        };
        assert_eq!(session_settings.timeouts().session_expiry, Some(Duration::MAX));
    }
}
