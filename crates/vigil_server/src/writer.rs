//! Ban writes and the durable retry pipeline.
//!
//! A write that fails to reach the primary store is not an error the caller
//! sees: it is upserted into the local queue under its dedup key and
//! replayed by the drain timer until the backend accepts it. The queue
//! store itself failing is the one case with no further fallback; it is
//! logged as an operational error and nothing panics.

use tokio::time::Duration;
use tracing::{error, info, warn};

use vigil_shared::{PendingBan, BAN_CACHE_TTL_SECS};

use crate::backend::BackendError;
use crate::clock;
use crate::scheduler::RetryTimer;
use crate::Vigil;

/// Result of an unban request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnbanOutcome {
    Removed,
    /// No active ban matched. Not an error.
    NotBanned,
}

impl Vigil {
    /// Records a ban against the primary store, falling back to the durable
    /// queue on failure. Infallible from the caller's point of view.
    pub async fn insert_ban(&self, ban: PendingBan) {
        let now = clock::now_unix();

        // A ban whose end is not in the future (permanent bans store a zero
        // duration, so their literal end is the start) must not leave a
        // stale "not banned" entry behind while the write is in flight.
        if !ban.identity.is_empty() && ban.ends() <= now {
            self.cache.lock().unwrap().set_player_status(
                &ban.identity,
                true,
                Duration::from_secs(BAN_CACHE_TTL_SECS),
            );
        }

        match self.backend.insert_ban(&ban).await {
            Ok(()) => {
                info!("Recorded ban for {}", ban.dedup_key());
                if !ban.identity.is_empty() {
                    self.cache.lock().unwrap().set_player_status(
                        &ban.identity,
                        true,
                        Duration::from_secs(BAN_CACHE_TTL_SECS),
                    );
                }
                // A queued copy of this write may exist if a manual retry
                // raced a drain; the store treats a missing key as a no-op.
                if let Err(e) = self.queue.delete(&ban.dedup_key()).await {
                    warn!(
                        "Failed to clear queued ban write for {}: {}",
                        ban.dedup_key(),
                        e
                    );
                }
            }
            Err(e) => {
                warn!("Ban write for {} failed, queueing: {}", ban.dedup_key(), e);
                if let Err(qe) = self.queue.upsert(&ban).await {
                    error!(
                        "Failed to persist queued ban write for {}: {}",
                        ban.dedup_key(),
                        qe
                    );
                }
                self.arm_drain_timer();
            }
        }
    }

    /// Replays every queued ban write. Writes that fail again re-enter the
    /// queue under the same key, so repeated drains of an unreachable
    /// backend neither lose nor duplicate entries.
    pub async fn process_ban_queue(&self) {
        let rows = match self.queue.load_all().await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Could not read ban queue, will retry: {}", e);
                self.restart_drain_timer();
                return;
            }
        };

        if rows.is_empty() {
            return;
        }

        info!("Replaying {} queued ban write(s)", rows.len());
        for ban in rows {
            self.insert_ban(ban).await;
        }
    }

    /// Removes the active ban matching the identity or IP, if any.
    pub async fn unban(
        &self,
        identity: &str,
        ip: &str,
        reason: &str,
        actor_identity: &str,
    ) -> Result<UnbanOutcome, BackendError> {
        let now = clock::now_unix();
        match self.backend.find_active_ban(identity, ip, now).await? {
            Some(ban_id) => {
                self.backend
                    .mark_removed(ban_id, actor_identity, reason, now)
                    .await?;
                info!("Ban {} removed by {}", ban_id, actor_identity);
                Ok(UnbanOutcome::Removed)
            }
            None => Ok(UnbanOutcome::NotBanned),
        }
    }

    /// Arms the drain timer if it is idle.
    fn arm_drain_timer(&self) {
        let mut timer = self.drain_timer.lock().unwrap();
        if timer.is_armed() {
            return;
        }
        self.arm_drain_locked(&mut timer);
    }

    /// Restarts the drain timer unconditionally, superseding a pending one.
    fn restart_drain_timer(&self) {
        let mut timer = self.drain_timer.lock().unwrap();
        self.arm_drain_locked(&mut timer);
    }

    fn arm_drain_locked(&self, timer: &mut RetryTimer) {
        let core = self.handle();
        let delay = self.config_snapshot().drain_interval();
        timer.arm(delay, async move {
            core.drain_timer.lock().unwrap().clear();
            core.process_ban_queue().await;
        });
    }
}
