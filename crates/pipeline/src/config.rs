use std::time::Duration;

/// Tunables for the decision pipeline, loaded from environment variables.
///
/// All fields have defaults matching the shipped behaviour.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a caller-supplied dedupe key suppresses repeats (default: `3600`).
    pub exact_window_secs: u64,
    /// How long a content fingerprint suppresses repeats (default: `300`).
    pub near_window_secs: u64,
    /// Deadline for any single store call or per-user lock wait (default: `250ms`).
    pub store_timeout: Duration,
    /// Defer applied to non-time-sensitive events in degraded mode (default: `300`).
    pub fallback_defer_secs: u64,
    /// Maximum events accepted by one batch call (default: `100`).
    pub batch_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exact_window_secs: 3600,
            near_window_secs: 300,
            store_timeout: Duration::from_millis(250),
            fallback_defer_secs: 300,
            batch_limit: 100,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default |
    /// |---------------------------|---------|
    /// | `EXACT_DEDUP_WINDOW_SECS` | `3600`  |
    /// | `NEAR_DEDUP_WINDOW_SECS`  | `300`   |
    /// | `STORE_TIMEOUT_MS`        | `250`   |
    /// | `FALLBACK_DEFER_SECS`     | `300`   |
    /// | `BATCH_LIMIT`             | `100`   |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            exact_window_secs: env_or("EXACT_DEDUP_WINDOW_SECS", defaults.exact_window_secs),
            near_window_secs: env_or("NEAR_DEDUP_WINDOW_SECS", defaults.near_window_secs),
            store_timeout: Duration::from_millis(env_or(
                "STORE_TIMEOUT_MS",
                defaults.store_timeout.as_millis() as u64,
            )),
            fallback_defer_secs: env_or("FALLBACK_DEFER_SECS", defaults.fallback_defer_secs),
            batch_limit: env_or("BATCH_LIMIT", defaults.batch_limit),
        }
    }
}

/// Parse `key` from the environment, falling back to `default` when unset.
///
/// Panics at startup on an unparseable value; misconfiguration should fail
/// fast rather than run with a silently different limit.
fn env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid number, got '{raw}': {e}")),
        Err(_) => default,
    }
}
