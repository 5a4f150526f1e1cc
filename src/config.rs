//! Runtime configuration sourced from environment variables.

use std::{env, str::FromStr};

use tracing::warn;

/// Default TCP port the server listens on.
const DEFAULT_PORT: u16 = 8080;
/// Default buffer depth of each session's broadcast channel.
const DEFAULT_HUB_CAPACITY: usize = 64;

/// Immutable runtime configuration shared across the application.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// TCP port the server binds to.
    pub port: u16,
    /// Buffer depth of each session's broadcast channel; slow subscribers
    /// that fall further behind start dropping events.
    pub hub_capacity: usize,
}

impl AppConfig {
    /// Load the configuration from the environment, falling back to defaults
    /// on missing or malformed values.
    pub fn load() -> Self {
        Self {
            port: env_or("PORT", DEFAULT_PORT),
            hub_capacity: env_or("BUZZROOM_HUB_CAPACITY", DEFAULT_HUB_CAPACITY),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            hub_capacity: DEFAULT_HUB_CAPACITY,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(%key, value = %raw, "ignoring malformed environment value");
            default
        }),
        Err(_) => default,
    }
}
