//! Ban and unban command handling.
//!
//! Thin orchestration over the writer: validate the arguments, check the
//! actor's capability flags, resolve the target, then hand the write to the
//! retry pipeline. Only validation and permission problems surface to the
//! actor; backend outages show up as a generic try-again reply.

use std::net::IpAddr;

use thiserror::Error;
use tracing::warn;

use vigil_shared::{
    AccessFlags, PendingBan, CONSOLE_IDENTITY, CONSOLE_IP, FLAG_ROOT, FLAG_UNBAN,
};

use crate::clock;
use crate::writer::UnbanOutcome;
use crate::Vigil;

/// Who issued a moderation command. Commands from the server console have
/// no client behind them and are recorded under a sentinel identity.
#[derive(Debug, Clone)]
pub struct CommandActor {
    pub identity: Option<String>,
    pub ip: Option<String>,
    pub flags: AccessFlags,
}

impl CommandActor {
    pub fn console() -> Self {
        Self {
            identity: None,
            ip: None,
            flags: AccessFlags::new(FLAG_ROOT.to_string()),
        }
    }

    fn identity_for_record(&self) -> String {
        self.identity
            .clone()
            .unwrap_or_else(|| CONSOLE_IDENTITY.to_string())
    }

    fn ip_for_record(&self) -> String {
        self.ip.clone().unwrap_or_else(|| CONSOLE_IP.to_string())
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    /// The actor lacks a required capability flag.
    #[error("{0}")]
    NotAuthorized(String),
    /// Bad duration, unresolvable target, or malformed identity.
    #[error("{0}")]
    InvalidArgument(String),
    /// The feature is switched off in configuration.
    #[error("{0}")]
    Disabled(String),
    /// The backend could not answer a synchronous command path.
    #[error("{0}")]
    Unavailable(String),
}

/// Duration argument: non-negative whole minutes, zero meaning permanent.
fn parse_minutes(arg: &str) -> Result<i64, CommandError> {
    match arg.parse::<i64>() {
        Ok(minutes) if minutes >= 0 => Ok(minutes),
        _ => Err(CommandError::InvalidArgument(format!(
            "Invalid duration '{}': expected a non-negative number of minutes",
            arg
        ))),
    }
}

impl Vigil {
    /// `ban <player> <minutes> <reason>` - ban a connected player.
    pub async fn handle_ban(
        &self,
        actor: &CommandActor,
        target_query: &str,
        minutes_arg: &str,
        reason: &str,
    ) -> Result<String, CommandError> {
        let minutes = parse_minutes(minutes_arg)?;
        self.check_permanent_allowed(actor, minutes)?;

        let Some(target) = self.host.resolve_target(target_query) else {
            return Err(CommandError::InvalidArgument(format!(
                "Player '{}' not found",
                target_query
            )));
        };

        let display_name = target.display_name.clone();
        let ban = self.build_ban(
            actor,
            target.identity.clone(),
            target.ip.clone(),
            target.display_name,
            minutes,
            reason,
        );

        self.host.force_disconnect(
            &target.identity,
            &self.kick_message(minutes * 60, reason),
        );
        self.insert_ban(ban).await;

        Ok(format!("Banned {} {}", display_name, length_phrase(minutes)))
    }

    /// `banip <player|address> <minutes> <reason>` - ban an address, either
    /// a connected player's or a literal one.
    pub async fn handle_banip(
        &self,
        actor: &CommandActor,
        target_query: &str,
        minutes_arg: &str,
        reason: &str,
    ) -> Result<String, CommandError> {
        let minutes = parse_minutes(minutes_arg)?;
        self.check_permanent_allowed(actor, minutes)?;

        if let Some(target) = self.host.resolve_target(target_query) {
            let display_name = target.display_name.clone();
            let ip = target.ip.clone();
            let ban = self.build_ban(
                actor,
                target.identity.clone(),
                target.ip.clone(),
                target.display_name,
                minutes,
                reason,
            );

            self.host.force_disconnect(
                &target.identity,
                &self.kick_message(minutes * 60, reason),
            );
            self.insert_ban(ban).await;

            return Ok(format!(
                "Banned {} ({}) {}",
                display_name,
                ip,
                length_phrase(minutes)
            ));
        }

        if target_query.parse::<IpAddr>().is_err() {
            return Err(CommandError::InvalidArgument(format!(
                "'{}' is neither a connected player nor a valid address",
                target_query
            )));
        }

        let ban = self.build_ban(
            actor,
            String::new(),
            target_query.to_string(),
            String::new(),
            minutes,
            reason,
        );
        self.insert_ban(ban).await;

        Ok(format!(
            "Banned address {} {}",
            target_query,
            length_phrase(minutes)
        ))
    }

    /// `addban <identity> <minutes> <reason>` - ban by identity without the
    /// player being connected.
    pub async fn handle_addban(
        &self,
        actor: &CommandActor,
        raw_identity: &str,
        minutes_arg: &str,
        reason: &str,
    ) -> Result<String, CommandError> {
        if !self.config_snapshot().bans.addban_enabled {
            return Err(CommandError::Disabled("addban is disabled".to_string()));
        }

        let minutes = parse_minutes(minutes_arg)?;
        self.check_permanent_allowed(actor, minutes)?;

        let Some(identity) = self.host.normalize_identity(raw_identity) else {
            return Err(CommandError::InvalidArgument(format!(
                "'{}' is not a valid identity",
                raw_identity
            )));
        };

        // The target may happen to be connected right now.
        let mut display_name = String::new();
        if let Some(connection) = self.host.find_live_connection(&identity) {
            display_name = connection.display_name.clone();
            self.host.force_disconnect(&identity, &self.kick_message(minutes * 60, reason));
        }

        let ban = self.build_ban(actor, identity.clone(), String::new(), display_name, minutes, reason);
        self.insert_ban(ban).await;

        Ok(format!("Added ban for {} {}", identity, length_phrase(minutes)))
    }

    /// `unban <identity|address> <reason>` - lift an active ban. A missing
    /// ban is reported neutrally, not as an error.
    pub async fn handle_unban(
        &self,
        actor: &CommandActor,
        target_query: &str,
        reason: &str,
    ) -> Result<String, CommandError> {
        if !self.config_snapshot().bans.unban_enabled {
            return Err(CommandError::Disabled("unban is disabled".to_string()));
        }
        if !actor.flags.has(FLAG_UNBAN) {
            return Err(CommandError::NotAuthorized(
                "You do not have permission to remove bans".to_string(),
            ));
        }

        let (identity, ip) = if target_query.parse::<IpAddr>().is_ok() {
            (String::new(), target_query.to_string())
        } else {
            match self.host.normalize_identity(target_query) {
                Some(identity) => (identity, String::new()),
                None => {
                    return Err(CommandError::InvalidArgument(format!(
                        "'{}' is not a valid identity or address",
                        target_query
                    )))
                }
            }
        };

        match self
            .unban(&identity, &ip, reason, &actor.identity_for_record())
            .await
        {
            Ok(UnbanOutcome::Removed) => Ok(format!("Removed ban for {}", target_query)),
            Ok(UnbanOutcome::NotBanned) => {
                Ok(format!("No active ban found for {}", target_query))
            }
            Err(e) => {
                warn!("Unban for {} failed: {}", target_query, e);
                Err(CommandError::Unavailable(
                    "The ban database is unavailable, please try again".to_string(),
                ))
            }
        }
    }

    /// Permanent bans are gated behind unban access.
    fn check_permanent_allowed(
        &self,
        actor: &CommandActor,
        minutes: i64,
    ) -> Result<(), CommandError> {
        if minutes == 0 && !actor.flags.has(FLAG_UNBAN) {
            return Err(CommandError::NotAuthorized(
                "Permanent bans require unban access".to_string(),
            ));
        }
        Ok(())
    }

    fn build_ban(
        &self,
        actor: &CommandActor,
        identity: String,
        ip: String,
        display_name: String,
        minutes: i64,
        reason: &str,
    ) -> PendingBan {
        PendingBan {
            identity,
            ip,
            display_name,
            start_time: clock::now_unix(),
            duration_secs: minutes * 60,
            reason: reason.to_string(),
            actor_identity: actor.identity_for_record(),
            actor_ip: actor.ip_for_record(),
        }
    }

    fn kick_message(&self, duration_secs: i64, reason: &str) -> String {
        let base = if duration_secs == 0 {
            format!("You have been permanently banned. Reason: {}", reason)
        } else {
            let until = chrono::DateTime::from_timestamp(clock::now_unix() + duration_secs, 0)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "unknown time".to_string());
            format!("You have been banned until {}. Reason: {}", until, reason)
        };

        let website = self.config_snapshot().bans.website;
        if website.is_empty() {
            base
        } else {
            format!("{} Visit {} for more information.", base, website)
        }
    }
}

fn length_phrase(minutes: i64) -> String {
    if minutes == 0 {
        "permanently".to_string()
    } else {
        format!("for {} minute(s)", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::rig;

    fn admin_actor(flags: &str) -> CommandActor {
        CommandActor {
            identity: Some("STEAM_0:1:999".to_string()),
            ip: Some("10.0.0.2".to_string()),
            flags: AccessFlags::new(flags),
        }
    }

    #[test]
    fn test_parse_minutes() {
        assert_eq!(parse_minutes("60").unwrap(), 60);
        assert_eq!(parse_minutes("0").unwrap(), 0);
        assert!(parse_minutes("-5").is_err());
        assert!(parse_minutes("soon").is_err());
        assert!(parse_minutes("").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ban_kicks_target_and_records_write() {
        let rig = rig();
        rig.host.connect_player("STEAM_0:1:234", "10.0.0.1", "Cheater");

        let reply = rig
            .vigil
            .handle_ban(&admin_actor("d"), "Cheater", "60", "aimbot")
            .await
            .unwrap();

        assert!(reply.contains("Cheater"));
        let kicked = rig.host.kicked.lock().unwrap();
        assert_eq!(kicked.len(), 1);
        assert!(kicked[0].1.contains("banned until"));
        assert!(kicked[0].1.contains("bans.example.net"));

        let inserted = rig.backend.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].identity, "STEAM_0:1:234");
        assert_eq!(inserted[0].duration_secs, 3600);
        assert_eq!(inserted[0].reason, "aimbot");
        assert_eq!(inserted[0].actor_identity, "STEAM_0:1:999");
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_ban_requires_unban_flag() {
        let rig = rig();
        rig.host.connect_player("STEAM_0:1:234", "10.0.0.1", "Cheater");

        let result = rig
            .vigil
            .handle_ban(&admin_actor("d"), "Cheater", "0", "aimbot")
            .await;

        assert!(matches!(result, Err(CommandError::NotAuthorized(_))));
        assert!(rig.backend.inserted.lock().unwrap().is_empty());
        assert_eq!(rig.host.kick_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_ban_allowed_with_unban_flag() {
        let rig = rig();
        rig.host.connect_player("STEAM_0:1:234", "10.0.0.1", "Cheater");

        let reply = rig
            .vigil
            .handle_ban(&admin_actor("de"), "Cheater", "0", "aimbot")
            .await
            .unwrap();

        assert!(reply.contains("permanently"));
        let kicked = rig.host.kicked.lock().unwrap();
        assert!(kicked[0].1.contains("permanently"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_console_actor_records_sentinel_identity() {
        let rig = rig();
        rig.host.connect_player("STEAM_0:1:234", "10.0.0.1", "Cheater");

        rig.vigil
            .handle_ban(&CommandActor::console(), "Cheater", "0", "aimbot")
            .await
            .unwrap();

        let inserted = rig.backend.inserted.lock().unwrap();
        assert_eq!(inserted[0].actor_identity, CONSOLE_IDENTITY);
        assert_eq!(inserted[0].actor_ip, CONSOLE_IP);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ban_unresolvable_target_writes_nothing() {
        let rig = rig();

        let result = rig
            .vigil
            .handle_ban(&admin_actor("d"), "Ghost", "60", "aimbot")
            .await;

        assert!(matches!(result, Err(CommandError::InvalidArgument(_))));
        assert!(rig.backend.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_banip_with_literal_address() {
        let rig = rig();

        let reply = rig
            .vigil
            .handle_banip(&admin_actor("d"), "10.0.0.50", "30", "proxy")
            .await
            .unwrap();

        assert!(reply.contains("10.0.0.50"));
        let inserted = rig.backend.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        assert!(inserted[0].identity.is_empty());
        assert_eq!(inserted[0].ip, "10.0.0.50");
        assert_eq!(inserted[0].dedup_key(), "ip:10.0.0.50");
    }

    #[tokio::test(start_paused = true)]
    async fn test_banip_with_connected_player_uses_their_address() {
        let rig = rig();
        rig.host.connect_player("STEAM_0:1:234", "10.0.0.1", "Cheater");

        rig.vigil
            .handle_banip(&admin_actor("d"), "Cheater", "30", "proxy")
            .await
            .unwrap();

        let inserted = rig.backend.inserted.lock().unwrap();
        assert_eq!(inserted[0].ip, "10.0.0.1");
        assert_eq!(inserted[0].identity, "STEAM_0:1:234");
        assert_eq!(rig.host.kick_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_banip_rejects_garbage_target() {
        let rig = rig();

        let result = rig
            .vigil
            .handle_banip(&admin_actor("d"), "not-an-ip", "30", "proxy")
            .await;

        assert!(matches!(result, Err(CommandError::InvalidArgument(_))));
        assert!(rig.backend.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_addban_disabled_by_config() {
        let mut config = crate::testutil::test_config();
        config.bans.addban_enabled = false;
        let rig = crate::testutil::rig_with_config(config);

        let result = rig
            .vigil
            .handle_addban(&admin_actor("d"), "STEAM_0:1:234", "60", "ban evasion")
            .await;

        assert!(matches!(result, Err(CommandError::Disabled(_))));
        assert!(rig.backend.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_addban_offline_target_writes_without_kick() {
        let rig = rig();

        let reply = rig
            .vigil
            .handle_addban(&admin_actor("d"), "STEAM_0:1:234", "60", "ban evasion")
            .await
            .unwrap();

        assert!(reply.contains("STEAM_0:1:234"));
        assert_eq!(rig.host.kick_count(), 0);
        let inserted = rig.backend.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        assert!(inserted[0].ip.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_addban_connected_target_is_kicked() {
        let rig = rig();
        rig.host.connect_player("STEAM_0:1:234", "10.0.0.1", "Cheater");

        rig.vigil
            .handle_addban(&admin_actor("d"), "STEAM_0:1:234", "60", "ban evasion")
            .await
            .unwrap();

        assert_eq!(rig.host.kick_count(), 1);
        assert_eq!(rig.backend.inserted.lock().unwrap()[0].display_name, "Cheater");
    }

    #[tokio::test(start_paused = true)]
    async fn test_addban_rejects_malformed_identity() {
        let rig = rig();

        let result = rig
            .vigil
            .handle_addban(&admin_actor("d"), "not valid", "60", "ban evasion")
            .await;

        assert!(matches!(result, Err(CommandError::InvalidArgument(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unban_requires_flag() {
        let rig = rig();
        *rig.backend.active_ban_id.lock().unwrap() = Some(42);

        let result = rig
            .vigil
            .handle_unban(&admin_actor("d"), "STEAM_0:1:234", "appealed")
            .await;

        assert!(matches!(result, Err(CommandError::NotAuthorized(_))));
        assert!(rig.backend.removed.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unban_missing_ban_replies_neutrally() {
        let rig = rig();

        let reply = rig
            .vigil
            .handle_unban(&admin_actor("e"), "STEAM_0:1:234", "appealed")
            .await
            .unwrap();

        assert!(reply.contains("No active ban"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unban_backend_outage_reports_try_again() {
        let rig = rig();
        rig.backend
            .fail_reads
            .store(true, std::sync::atomic::Ordering::SeqCst);

        let result = rig
            .vigil
            .handle_unban(&admin_actor("e"), "STEAM_0:1:234", "appealed")
            .await;

        assert!(matches!(result, Err(CommandError::Unavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unban_disabled_by_config() {
        let mut config = crate::testutil::test_config();
        config.bans.unban_enabled = false;
        let rig = crate::testutil::rig_with_config(config);

        let result = rig
            .vigil
            .handle_unban(&admin_actor("e"), "STEAM_0:1:234", "appealed")
            .await;

        assert!(matches!(result, Err(CommandError::Disabled(_))));
    }
}
