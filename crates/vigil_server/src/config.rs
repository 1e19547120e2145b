use std::fs;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use vigil_shared::{
    DEFAULT_QUEUE_DRAIN_MINUTES, DEFAULT_RETRY_INTERVAL_SECS, RETRY_INTERVAL_MAX_SECS,
    RETRY_INTERVAL_MIN_SECS,
};

#[derive(Clone, Deserialize)]
pub struct VigilConfig {
    pub backend: Backend,
    pub bans: Bans,
    pub admins: Admins,
}

#[derive(Clone, Deserialize)]
pub struct Backend {
    /// Primary store holding the authoritative ban and admin tables.
    pub database_path: String,
    /// Local store for the durable ban-write queue.
    pub queue_path: String,
    /// Prefix shared by the web panel's tables.
    pub table_prefix: String,
    /// This game server's id in the panel.
    pub server_id: i64,
}

#[derive(Clone, Deserialize)]
pub struct Bans {
    /// Informational website included in kick and deny messages.
    pub website: String,
    pub addban_enabled: bool,
    pub unban_enabled: bool,
    /// Seconds between retries after a failed backend read. Bounded to
    /// 15-60.
    pub retry_interval_secs: u64,
    /// Minutes between drains of the durable ban-write queue.
    pub queue_drain_minutes: u64,
}

#[derive(Clone, Deserialize)]
pub struct Admins {
    pub enabled: bool,
    /// Only trust admin accounts that have logged into the web panel at
    /// least once.
    pub require_site_login: bool,
}

impl VigilConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from("config.toml")
    }

    pub fn load_from(path: &str) -> Result<Self, String> {
        let config_str =
            fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path, e))?;

        let config: VigilConfig =
            toml::from_str(&config_str).map_err(|e| format!("Failed to parse {}: {}", path, e))?;

        config.validated()
    }

    /// Validate and normalize a configuration. The table prefix is checked
    /// here because it is interpolated into SQL; values never are.
    pub fn validated(mut self) -> Result<Self, String> {
        let prefix_ok = !self.backend.table_prefix.is_empty()
            && self
                .backend
                .table_prefix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !prefix_ok {
            return Err(format!(
                "table_prefix '{}' must be non-empty lowercase alphanumeric/underscore",
                self.backend.table_prefix
            ));
        }

        if self.bans.queue_drain_minutes == 0 {
            return Err("queue_drain_minutes must be at least 1".to_string());
        }

        let clamped = self
            .bans
            .retry_interval_secs
            .clamp(RETRY_INTERVAL_MIN_SECS, RETRY_INTERVAL_MAX_SECS);
        if clamped != self.bans.retry_interval_secs {
            warn!(
                "retry_interval_secs {} out of bounds, using {}",
                self.bans.retry_interval_secs, clamped
            );
            self.bans.retry_interval_secs = clamped;
        }

        Ok(self)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.bans.retry_interval_secs)
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_secs(self.bans.queue_drain_minutes * 60)
    }
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            backend: Backend {
                database_path: "moderation.db".to_string(),
                queue_path: "vigil_queue.db".to_string(),
                table_prefix: "sb".to_string(),
                server_id: 1,
            },
            bans: Bans {
                website: String::new(),
                addban_enabled: true,
                unban_enabled: true,
                retry_interval_secs: DEFAULT_RETRY_INTERVAL_SECS,
                queue_drain_minutes: DEFAULT_QUEUE_DRAIN_MINUTES,
            },
            admins: Admins {
                enabled: true,
                require_site_login: false,
            },
        }
    }
}
