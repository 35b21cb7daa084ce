//! Configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`). Unset variables fall back to defaults suitable for a local
//! Redis instance.

/// Top-level configuration.
///
/// Loaded once at startup via [`SyncConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Redis connection URL (e.g. `redis://127.0.0.1:6379/0`).
    pub redis_url: String,

    /// Whether the object cache starts with identity caching enabled.
    pub caching_enabled: bool,

    /// Sets to expose as containers and report on at startup.
    pub watch_sets: Vec<String>,

    /// Maximum characters of an object preview in log output.
    pub preview_length: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            caching_enabled: true,
            watch_sets: Vec::new(),
            preview_length: crate::text::DEFAULT_LENGTH,
        }
    }
}

impl SyncConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file,
    /// then reads `REDIS_URL`, `CACHE_ENABLED`, `WATCH_SETS` and
    /// `PREVIEW_LENGTH`.
    ///
    /// # Errors
    ///
    /// Returns an error if `PREVIEW_LENGTH` is set but is not an integer of
    /// at least 2.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`SyncConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let redis_url = lookup("REDIS_URL").unwrap_or(defaults.redis_url);
        let caching_enabled = parse_bool(lookup("CACHE_ENABLED"), defaults.caching_enabled);
        let watch_sets = lookup("WATCH_SETS")
            .map(|v| parse_list(&v))
            .unwrap_or(defaults.watch_sets);

        let preview_length = match lookup("PREVIEW_LENGTH") {
            Some(v) => v.trim().parse::<usize>()?,
            None => defaults.preview_length,
        };
        if preview_length < 2 {
            return Err(format!("PREVIEW_LENGTH must be at least 2, got {preview_length}").into());
        }

        Ok(Self {
            redis_url,
            caching_enabled,
            watch_sets,
            preview_length,
        })
    }
}

/// Parses a boolean. Accepts `"true"`, `"1"`, `"false"`, `"0"`
/// (case-insensitive). Returns `default` otherwise.
fn parse_bool(value: Option<String>, default: bool) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}

/// Splits a comma-separated list, dropping blanks.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
