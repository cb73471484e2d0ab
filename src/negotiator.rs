//! Registration handshake and nick ownership.
//!
//! Registration is a short dance: declare USER and NICK, wait for the
//! server's welcome, then identify with NickServ (when configured) and
//! join the configured channels. A 433 mid-handshake means the nick is
//! taken; we walk the candidate list in order and give up for good when
//! it runs out — retrying the same nick forever would just hammer the
//! server.
//!
//! Being kicked is handled here too: the rejoin is *scheduled* and fired
//! later from the session's periodic tick, so a kick never stalls the
//! receive loop.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::Config;
use crate::error::SessionError;

/// Drives the handshake for one connection cycle and owns the candidate
/// nick list. Fresh per session: the candidate index restarts at zero on
/// every connect.
#[derive(Debug)]
pub struct Negotiator {
    user: String,
    real_name: String,
    nicks: Vec<String>,
    channels: Vec<String>,
    nickserv_password: Option<String>,
    nick_index: usize,
    rejoin_delay: Duration,
    pending_rejoins: Vec<(Instant, String)>,
}

impl Negotiator {
    pub fn new(config: &Config, rejoin_delay: Duration) -> Self {
        Self {
            user: config.user.clone(),
            real_name: config.real_name.clone(),
            nicks: config.nicks.clone(),
            channels: config.channels.clone(),
            nickserv_password: config.nickserv_password.clone(),
            nick_index: 0,
            rejoin_delay,
            pending_rejoins: Vec::new(),
        }
    }

    /// The candidate currently being attempted (or held, once registered).
    pub fn current_nick(&self) -> &str {
        &self.nicks[self.nick_index]
    }

    /// True when `nick` is one of our own candidates. Traffic from these
    /// is never "a foreign handle seen".
    pub fn is_own_nick(&self, nick: &str) -> bool {
        self.nicks.iter().any(|n| n == nick)
    }

    /// Lines opening the handshake on a fresh connection.
    pub fn hello(&self) -> Vec<String> {
        vec![
            format!("USER {} 8 * :{}", self.user, self.real_name),
            format!("NICK {}", self.current_nick()),
        ]
    }

    /// RPL_WELCOME: registration is complete. Returns the follow-up lines:
    /// the optional NickServ identify, then a JOIN per configured channel.
    pub fn on_welcome(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(password) = self.nickserv_password.as_deref()
            && !password.is_empty()
        {
            lines.push(format!("PRIVMSG NickServ :IDENTIFY {password}"));
        }
        lines.extend(self.channels.iter().map(|c| format!("JOIN {c}")));
        lines
    }

    /// ERR_NICKNAMEINUSE before registration: advance to the next
    /// candidate, or give up when the list is exhausted. Never cycles
    /// back to the first candidate.
    pub fn on_nick_rejected(&mut self) -> Result<String, SessionError> {
        if self.nick_index + 1 >= self.nicks.len() {
            return Err(SessionError::NicksExhausted);
        }
        self.nick_index += 1;
        Ok(format!("NICK {}", self.current_nick()))
    }

    /// We were kicked from `channel`: rejoin after the cooldown.
    pub fn schedule_rejoin(&mut self, channel: &str, now: Instant) {
        self.pending_rejoins
            .push((now + self.rejoin_delay, channel.to_string()));
    }

    /// JOIN lines whose cooldown has passed, drained in schedule order.
    pub fn due_rejoins(&mut self, now: Instant) -> Vec<String> {
        let mut due = Vec::new();
        self.pending_rejoins.retain(|(deadline, channel)| {
            if *deadline <= now {
                due.push(format!("JOIN {channel}"));
                false
            } else {
                true
            }
        });
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            address: "irc.example.net".into(),
            port: 6667,
            user: "bot".into(),
            real_name: "A Bot".into(),
            nicks: vec!["alpha".into(), "beta".into(), "gamma".into()],
            nickserv_password: None,
            channels: vec!["#one".into(), "#two".into()],
            quit_message: "bye".into(),
            logging: false,
        }
    }

    fn negotiator() -> Negotiator {
        Negotiator::new(&test_config(), Duration::from_secs(2))
    }

    #[test]
    fn hello_declares_identity_and_first_candidate() {
        assert_eq!(
            negotiator().hello(),
            vec!["USER bot 8 * :A Bot", "NICK alpha"]
        );
    }

    #[test]
    fn collision_walks_candidates_in_order_then_fails() {
        let mut n = negotiator();
        assert_eq!(n.on_nick_rejected().unwrap(), "NICK beta");
        assert_eq!(n.on_nick_rejected().unwrap(), "NICK gamma");
        assert!(matches!(
            n.on_nick_rejected(),
            Err(SessionError::NicksExhausted)
        ));
    }

    #[test]
    fn welcome_joins_all_channels_in_order() {
        assert_eq!(negotiator().on_welcome(), vec!["JOIN #one", "JOIN #two"]);
    }

    #[test]
    fn welcome_identifies_before_joining_when_configured() {
        let mut config = test_config();
        config.nickserv_password = Some("hunter2".into());
        let n = Negotiator::new(&config, Duration::from_secs(2));
        assert_eq!(
            n.on_welcome(),
            vec![
                "PRIVMSG NickServ :IDENTIFY hunter2",
                "JOIN #one",
                "JOIN #two"
            ]
        );
    }

    #[test]
    fn own_nicks_cover_every_candidate() {
        let n = negotiator();
        assert!(n.is_own_nick("alpha"));
        assert!(n.is_own_nick("gamma"));
        assert!(!n.is_own_nick("carol"));
    }

    #[test]
    fn rejoin_fires_only_after_the_cooldown() {
        let mut n = negotiator();
        let t0 = Instant::now();
        n.schedule_rejoin("#one", t0);

        assert!(n.due_rejoins(t0).is_empty());
        assert!(n.due_rejoins(t0 + Duration::from_secs(1)).is_empty());
        assert_eq!(
            n.due_rejoins(t0 + Duration::from_secs(2)),
            vec!["JOIN #one"]
        );
        // Drained: a rejoin fires once.
        assert!(n.due_rejoins(t0 + Duration::from_secs(3)).is_empty());
    }
}
