//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables. It provides
//! thread-safe access and mutation for testing or overrides in runtime environments.
//!
//! Most callers use the free accessor functions at the bottom of this module
//! (`config::host()`, `config::code_tolerance_seconds()`, ...) instead of
//! holding the lock themselves.

use std::env;
use std::str::FromStr;
use std::sync::{OnceLock, RwLock};

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub database_path: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_duration_minutes: u64,
    /// Trailing window, in seconds, in which a displayed code is still accepted.
    pub code_tolerance_seconds: i64,
    /// Fixed UTC offset that event dates and start times are written in.
    pub event_utc_offset_minutes: i32,
    /// Attempts made when an attendance append loses a uniqueness race.
    pub max_conflict_retries: u32,
    /// Interval of the in-process finalize sweep. `0` disables it.
    pub finalize_sweep_seconds: u64,
    /// How many days back the finalize sweep looks for due events.
    pub finalize_lookback_days: i64,
    pub deeplink_scheme: String,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

fn var_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// This method is used internally to populate the singleton. A missing
    /// `JWT_SECRET` loads as empty; the API server refuses to start with it.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            project_name: env::var("PROJECT_NAME").unwrap_or_else(|_| "wasso-attendance".into()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "api=info,services=info".into()),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "api.log".into()),
            log_to_stdout: env::var("LOG_TO_STDOUT").unwrap_or_else(|_| "false".into()) == "true",
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/attendance.db".into()),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: var_or("PORT", 3000),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_default(),
            jwt_duration_minutes: var_or("JWT_DURATION_MINUTES", 60),
            code_tolerance_seconds: var_or("CODE_TOLERANCE_SECONDS", 10),
            event_utc_offset_minutes: var_or("EVENT_UTC_OFFSET_MINUTES", 0),
            max_conflict_retries: var_or("MAX_CONFLICT_RETRIES", 3),
            finalize_sweep_seconds: var_or("FINALIZE_SWEEP_SECONDS", 60),
            finalize_lookback_days: var_or("FINALIZE_LOOKBACK_DAYS", 1),
            deeplink_scheme: env::var("DEEPLINK_SCHEME").unwrap_or_else(|_| "wasso".into()),
        }
    }

    /// Returns a shared reference to the global configuration.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    pub fn global() -> std::sync::RwLockReadGuard<'static, AppConfig> {
        CONFIG_INSTANCE
            .get_or_init(|| RwLock::new(AppConfig::from_env()))
            .read()
            .expect("Failed to acquire AppConfig read lock")
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        if let Some(lock) = CONFIG_INSTANCE.get() {
            if let Ok(mut guard) = lock.write() {
                *guard = AppConfig::from_env();
            }
        }
    }

    /// Generic internal setter for any field in the config.
    ///
    /// Used by public per-field setter methods.
    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        let mut guard = lock
            .write()
            .expect("Failed to acquire AppConfig write lock");
        setter(&mut guard);
    }

    // --- Per-field setters below ---

    pub fn set_env(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.env = value.into());
    }

    pub fn set_log_to_stdout(value: bool) {
        AppConfig::set_field(|cfg| cfg.log_to_stdout = value);
    }

    pub fn set_database_path(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.database_path = value.into());
    }

    pub fn set_jwt_secret(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.jwt_secret = value.into());
    }

    pub fn set_code_tolerance_seconds(value: i64) {
        AppConfig::set_field(|cfg| cfg.code_tolerance_seconds = value);
    }

    pub fn set_event_utc_offset_minutes(value: i32) {
        AppConfig::set_field(|cfg| cfg.event_utc_offset_minutes = value);
    }

    pub fn set_max_conflict_retries(value: u32) {
        AppConfig::set_field(|cfg| cfg.max_conflict_retries = value);
    }

    pub fn set_finalize_sweep_seconds(value: u64) {
        AppConfig::set_field(|cfg| cfg.finalize_sweep_seconds = value);
    }
}

// --- Free accessors ---

pub fn env() -> String {
    AppConfig::global().env.clone()
}

pub fn project_name() -> String {
    AppConfig::global().project_name.clone()
}

pub fn log_level() -> String {
    AppConfig::global().log_level.clone()
}

pub fn log_file() -> String {
    AppConfig::global().log_file.clone()
}

pub fn log_to_stdout() -> bool {
    AppConfig::global().log_to_stdout
}

pub fn database_path() -> String {
    AppConfig::global().database_path.clone()
}

pub fn host() -> String {
    AppConfig::global().host.clone()
}

pub fn port() -> u16 {
    AppConfig::global().port
}

pub fn jwt_secret() -> String {
    AppConfig::global().jwt_secret.clone()
}

pub fn jwt_duration_minutes() -> u64 {
    AppConfig::global().jwt_duration_minutes
}

pub fn code_tolerance_seconds() -> i64 {
    AppConfig::global().code_tolerance_seconds
}

pub fn event_utc_offset_minutes() -> i32 {
    AppConfig::global().event_utc_offset_minutes
}

pub fn max_conflict_retries() -> u32 {
    AppConfig::global().max_conflict_retries
}

pub fn finalize_sweep_seconds() -> u64 {
    AppConfig::global().finalize_sweep_seconds
}

pub fn finalize_lookback_days() -> i64 {
    AppConfig::global().finalize_lookback_days
}

pub fn deeplink_scheme() -> String {
    AppConfig::global().deeplink_scheme.clone()
}
