//! Ban enforcement and admin authorization backed by a remote relational
//! store.
//!
//! The host game server calls [`Vigil::on_connection_attempt`] on every
//! connection; the decision is made synchronously from cached state and
//! never blocks on I/O. Cache misses trigger a background lookup, and a
//! confirmed ban is enforced by forcible disconnect once the lookup
//! resolves. Admin records are loaded from the backend, merged with their
//! group grants, and pushed into the host's live registry. Ban writes that
//! fail to reach the primary store land in a local durable queue and are
//! replayed until they stick.
//!
//! Backend outages never surface to players: failed reads are retried on
//! single-shot timers, failed writes are queued, and the only user-visible
//! errors are command validation and permission problems.
//!
//! After constructing the service the host should call
//! [`Vigil::process_ban_queue`] once to replay writes left over from a
//! previous run.

pub mod admins;
pub mod audit;
pub mod backend;
pub mod cache;
pub mod clock;
pub mod commands;
pub mod config;
pub mod database;
pub mod host;
pub mod queue;
pub mod scheduler;
pub mod verifier;
pub mod writer;

use std::sync::{Arc, Mutex, RwLock, Weak};

use crate::admins::AdminReloadState;
use crate::backend::DynBanBackend;
use crate::cache::ModCache;
use crate::config::VigilConfig;
use crate::database::SqlBackend;
use crate::host::DynHostServices;
use crate::queue::{DynQueueStore, SqliteQueueStore};
use crate::scheduler::RetryTimer;
use crate::verifier::RecheckState;

pub use crate::backend::{BackendError, BanBackend};
pub use crate::commands::{CommandActor, CommandError};
pub use crate::host::{HostServices, LiveConnection};
pub use crate::queue::{QueueError, QueueStore};
pub use crate::writer::UnbanOutcome;
pub use vigil_shared::{AccessFlags, AdminRecord, ConnectionVerdict, PendingBan};

/// The moderation core. One instance per game server process.
///
/// All mutable state lives behind short-lived locks; async work is spawned
/// onto the surrounding tokio runtime, so the public entry points must be
/// called from within one.
pub struct Vigil {
    self_ref: Weak<Vigil>,
    backend: DynBanBackend,
    queue: DynQueueStore,
    host: DynHostServices,
    config: RwLock<VigilConfig>,
    cache: Mutex<ModCache>,
    recheck: Mutex<RecheckState>,
    admin_reload: Mutex<AdminReloadState>,
    drain_timer: Mutex<RetryTimer>,
}

impl Vigil {
    pub fn new(
        config: VigilConfig,
        backend: DynBanBackend,
        queue: DynQueueStore,
        host: DynHostServices,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            backend,
            queue,
            host,
            config: RwLock::new(config),
            cache: Mutex::new(ModCache::new()),
            recheck: Mutex::new(RecheckState::new()),
            admin_reload: Mutex::new(AdminReloadState::new()),
            drain_timer: Mutex::new(RetryTimer::new()),
        })
    }

    /// Opens the configured primary and local stores and builds the service
    /// on top of them.
    pub async fn connect(
        config: VigilConfig,
        host: DynHostServices,
    ) -> Result<Arc<Self>, sqlx::Error> {
        let primary = database::connect_primary(&config.backend.database_path).await?;
        let local = database::connect_local(&config.backend.queue_path).await?;

        let backend = Arc::new(SqlBackend::new(primary, config.backend.table_prefix.clone()));
        let queue = Arc::new(SqliteQueueStore::new(local));

        Ok(Self::new(config, backend, queue, host))
    }

    /// Applies a new configuration. Changes to the admin-relevant settings
    /// (admins enabled, site-login requirement, server id) trigger an admin
    /// reload.
    pub fn apply_config(&self, new: VigilConfig) {
        let reload = {
            let mut config = self.config.write().unwrap();
            let reload = config.admins.enabled != new.admins.enabled
                || config.admins.require_site_login != new.admins.require_site_login
                || config.backend.server_id != new.backend.server_id;
            *config = new;
            reload
        };
        if reload {
            self.on_admin_reload_requested();
        }
    }

    pub(crate) fn config_snapshot(&self) -> VigilConfig {
        self.config.read().unwrap().clone()
    }

    /// Owned handle for spawning background work. Infallible while any
    /// caller holds the service.
    pub(crate) fn handle(&self) -> Arc<Self> {
        self.self_ref.upgrade().expect("service already dropped")
    }
}
