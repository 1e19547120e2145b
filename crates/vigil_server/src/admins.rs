//! Admin roster resolution.
//!
//! A reload runs two queries in sequence: the group table first, then the
//! per-server admin assignments. Each admin row absorbs its group's flags
//! and immunity before being registered with the host and cached as one
//! wholesale roster snapshot. A present roster, even an expired one, is
//! still applied without re-querying; only an absent roster forces the
//! backend round trip, and a failed round trip keeps whatever roster was
//! there before.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::time::Duration;
use tracing::{debug, info, warn};

use vigil_shared::{AccessFlags, AdminRecord, ADMIN_CACHE_TTL_SECS};

use crate::backend::BackendError;
use crate::config::VigilConfig;
use crate::scheduler::RetryTimer;
use crate::Vigil;

pub(crate) struct AdminReloadState {
    pub(crate) in_flight: bool,
    pub(crate) timer: RetryTimer,
}

impl AdminReloadState {
    pub(crate) fn new() -> Self {
        Self {
            in_flight: false,
            timer: RetryTimer::new(),
        }
    }
}

/// Group grants, built fresh for each reload and discarded after the merge.
struct GroupInfo {
    flags: AccessFlags,
    immunity: i32,
}

impl Vigil {
    /// Triggered by the reload command and by admin-relevant config
    /// changes. A no-op while a previous reload is still pending.
    pub fn on_admin_reload_requested(&self) {
        let config = self.config_snapshot();
        if !config.admins.enabled {
            debug!("Admin loading disabled, skipping reload");
            return;
        }

        // Present beats fresh: re-applying a stale roster avoids hammering
        // the backend on every reload trigger.
        let cached: Option<Vec<AdminRecord>> = self
            .cache
            .lock()
            .unwrap()
            .admins()
            .map(|(roster, _)| roster.to_vec());
        if let Some(roster) = cached {
            self.apply_roster(&roster);
            return;
        }

        self.spawn_admin_reload();
    }

    pub(crate) fn spawn_admin_reload(&self) {
        let mut state = self.admin_reload.lock().unwrap();
        if state.in_flight {
            return;
        }
        state.in_flight = true;

        let core = self.handle();
        tokio::spawn(async move {
            core.run_admin_reload().await;
        });
    }

    async fn run_admin_reload(self: Arc<Self>) {
        let config = self.config_snapshot();
        match self.load_admins(&config).await {
            Ok(roster) => {
                {
                    let mut state = self.admin_reload.lock().unwrap();
                    state.in_flight = false;
                    state.timer.cancel();
                }
                self.cache.lock().unwrap().set_admins(
                    roster.clone(),
                    Duration::from_secs(ADMIN_CACHE_TTL_SECS),
                );
                self.apply_roster(&roster);
            }
            Err(e) => {
                warn!("Admin reload failed: {}", e);
                let mut state = self.admin_reload.lock().unwrap();
                state.in_flight = false;
                if !state.timer.is_armed() {
                    let core = self.handle();
                    state.timer.arm(config.retry_interval(), async move {
                        core.admin_reload.lock().unwrap().timer.clear();
                        core.spawn_admin_reload();
                    });
                }
            }
        }
    }

    async fn load_admins(&self, config: &VigilConfig) -> Result<Vec<AdminRecord>, BackendError> {
        let groups = self.backend.fetch_groups().await?;
        let mut group_map: HashMap<String, GroupInfo> = HashMap::new();
        for group in groups {
            if group.name.is_empty() {
                continue;
            }
            group_map.insert(
                group.name,
                GroupInfo {
                    flags: AccessFlags::new(group.flags),
                    immunity: group.immunity,
                },
            );
        }

        let rows = self
            .backend
            .fetch_admins(config.backend.server_id, config.admins.require_site_login)
            .await?;

        let mut roster = Vec::with_capacity(rows.len());
        for row in rows {
            let mut admin = AdminRecord::new(row.identity, row.flags, row.immunity);
            if let Some(group) = row.group_name.as_deref().and_then(|name| group_map.get(name)) {
                admin.absorb_group(&group.flags, group.immunity);
            }
            roster.push(admin);
        }
        Ok(roster)
    }

    fn apply_roster(&self, roster: &[AdminRecord]) {
        for admin in roster {
            self.host.register_admin(admin);
        }
        info!("Registered {} admin(s)", roster.len());
    }
}
