// ============================================================================
// MODERATION CONSTANTS
// ============================================================================

/// Seconds a cached ban status stays fresh before a new lookup is required.
pub const BAN_CACHE_TTL_SECS: u64 = 300;

/// Seconds the resolved admin roster stays fresh.
pub const ADMIN_CACHE_TTL_SECS: u64 = 300;

/// Default interval between retries after a failed backend read.
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 45;

/// Bounds for the configurable retry interval.
pub const RETRY_INTERVAL_MIN_SECS: u64 = 15;
pub const RETRY_INTERVAL_MAX_SECS: u64 = 60;

/// Default interval between drains of the durable ban-write queue.
pub const DEFAULT_QUEUE_DRAIN_MINUTES: u64 = 5;

/// Actor identity recorded for commands issued from the server console.
pub const CONSOLE_IDENTITY: &str = "CONSOLE";

/// Actor address recorded for commands issued from the server console.
pub const CONSOLE_IP: &str = "127.0.0.1";
