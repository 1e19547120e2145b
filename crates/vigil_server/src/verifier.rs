//! Per-connection ban decision engine.
//!
//! The synchronous entry point answers from the cache alone. A miss or an
//! expired entry starts a background lookup; the connection itself is
//! allowed through, and a confirmed ban is enforced by forcible disconnect
//! once the lookup resolves. Lookups that fail land the identity in a
//! recheck set drained by a single-shot timer, so a backend outage delays
//! enforcement instead of skipping it.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::time::Duration;
use tracing::{debug, warn};

use vigil_shared::{ConnectionVerdict, BAN_CACHE_TTL_SECS};

use crate::clock;
use crate::host::LiveConnection;
use crate::scheduler::RetryTimer;
use crate::Vigil;

/// Identities whose ban lookup failed and is awaiting the recheck timer.
/// An identity that disconnects before the timer fires is dropped at drain
/// time without a query.
pub(crate) struct RecheckState {
    pub(crate) pending: HashSet<String>,
    pub(crate) timer: RetryTimer,
}

impl RecheckState {
    pub(crate) fn new() -> Self {
        Self {
            pending: HashSet::new(),
            timer: RetryTimer::new(),
        }
    }
}

impl Vigil {
    /// Synchronous decision for a connection attempt. Never blocks on I/O:
    /// a fresh cache entry decides immediately, anything else allows the
    /// attempt and resolves in the background.
    pub fn on_connection_attempt(
        &self,
        raw_identity: &str,
        ip: &str,
        display_name: &str,
    ) -> ConnectionVerdict {
        let Some(identity) = self.host.normalize_identity(raw_identity) else {
            warn!("Cannot evaluate malformed identity '{}'", raw_identity);
            return ConnectionVerdict::Allow;
        };

        let cached = self.cache.lock().unwrap().player_status(&identity);
        match cached {
            Some((banned, false)) => {
                if banned {
                    ConnectionVerdict::Deny {
                        reason: self.deny_message(),
                    }
                } else {
                    ConnectionVerdict::Allow
                }
            }
            _ => {
                // Already awaiting a recheck: the timer owns the next query.
                let awaiting = self.recheck.lock().unwrap().pending.contains(&identity);
                if !awaiting {
                    let target = LiveConnection {
                        identity,
                        ip: ip.to_string(),
                        display_name: display_name.to_string(),
                    };
                    let core = self.handle();
                    tokio::spawn(async move {
                        core.run_ban_check(target).await;
                    });
                }
                ConnectionVerdict::Allow
            }
        }
    }

    pub(crate) async fn run_ban_check(self: Arc<Self>, target: LiveConnection) {
        let now = clock::now_unix();
        match self.backend.is_banned(&target.identity, &target.ip, now).await {
            Ok(banned) => {
                self.cache.lock().unwrap().set_player_status(
                    &target.identity,
                    banned,
                    Duration::from_secs(BAN_CACHE_TTL_SECS),
                );
                if banned {
                    self.enforce_ban(&target).await;
                }
            }
            Err(e) => {
                warn!("Ban lookup for {} failed: {}", target.identity, e);
                // A previously confirmed ban is enforced even stale rather
                // than failing open while the backend is down.
                let stale_banned = matches!(
                    self.cache.lock().unwrap().player_status(&target.identity),
                    Some((true, true))
                );
                if stale_banned {
                    self.enforce_ban(&target).await;
                }
                self.schedule_recheck(target.identity);
            }
        }
    }

    /// Kick a confirmed-banned player if they are still connected, recording
    /// the hit in the backend ban log. The log write is best-effort.
    async fn enforce_ban(&self, target: &LiveConnection) {
        if self.host.find_live_connection(&target.identity).is_none() {
            debug!("{} disconnected before ban enforcement", target.identity);
            return;
        }

        let server_id = self.config_snapshot().backend.server_id;
        if let Err(e) = self
            .backend
            .log_blocked_connection(
                &target.identity,
                &target.display_name,
                server_id,
                clock::now_unix(),
            )
            .await
        {
            warn!(
                "Failed to record blocked connection for {}: {}",
                target.identity, e
            );
        }

        self.host.force_disconnect(&target.identity, &self.deny_message());
    }

    fn schedule_recheck(&self, identity: String) {
        let mut recheck = self.recheck.lock().unwrap();
        recheck.pending.insert(identity);
        if !recheck.timer.is_armed() {
            let core = self.handle();
            let delay = self.config_snapshot().retry_interval();
            recheck.timer.arm(delay, async move {
                core.run_recheck().await;
            });
        }
    }

    async fn run_recheck(self: Arc<Self>) {
        let drained: Vec<String> = {
            let mut recheck = self.recheck.lock().unwrap();
            recheck.timer.clear();
            recheck.pending.drain().collect()
        };

        for identity in drained {
            match self.host.find_live_connection(&identity) {
                Some(connection) => self.clone().run_ban_check(connection).await,
                None => debug!("Dropping recheck for {}: no longer connected", identity),
            }
        }
    }

    pub(crate) fn deny_message(&self) -> String {
        let website = self.config_snapshot().bans.website;
        if website.is_empty() {
            "You have been banned from this server.".to_string()
        } else {
            format!(
                "You have been banned from this server. Visit {} for more information.",
                website
            )
        }
    }
}
