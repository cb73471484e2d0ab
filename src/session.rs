//! One connection cycle: socket ownership, the receive loop, and protocol
//! command interpretation.
//!
//! A session runs from connect to disconnect and is then spent; the
//! supervisor constructs a fresh one for every cycle, so the framer,
//! candidate-nick index, and liveness clock can never leak state from a
//! dead connection into the next one.
//!
//! Exactly one task drives the session. The `select!` loop alternates
//! between a cancel-safe socket read, the serialized outbound command
//! channel, a periodic tick that bounds dispatch latency, and the
//! interrupt signal — so no two protocol operations are ever concurrent
//! and no locking is needed.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::{Config, Tuning};
use crate::dispatch::{Command, Dispatch, SessionHandle};
use crate::error::SessionError;
use crate::framing::LineFramer;
use crate::liveness::{Liveness, LivenessTick};
use crate::negotiator::Negotiator;
use crate::wire::{self, Message};

/// Token carried by our liveness probes.
const PROBE_TOKEN: &str = "keepalive";

/// Size of one socket read.
const READ_BUF: usize = 4096;

/// How a session ended when it did not fail.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// Clean, operator-requested exit. Do not reconnect.
    Shutdown,
}

/// Connection lifecycle. `Registered` gates collision handling: a 433
/// after registration is somebody else's problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Connecting,
    Connected,
    Registered,
    Disconnected,
}

/// Write side of the connection. The `Option` is what makes disconnect
/// idempotent: the first call takes the writer, later calls find nothing.
struct Conn {
    writer: Option<OwnedWriteHalf>,
}

impl Conn {
    fn closed() -> Self {
        Self { writer: None }
    }

    /// Send one line, appending the delimiter. Sends on a closed
    /// connection are logged and dropped, not raised — the teardown path
    /// already owns the error.
    async fn send_line(&mut self, line: &str) -> Result<(), SessionError> {
        let Some(writer) = self.writer.as_mut() else {
            tracing::debug!(line, "dropping send on closed connection");
            return Ok(());
        };
        tracing::trace!(line, "send");
        writer
            .write_all(format!("{line}{}", wire::CRLF).as_bytes())
            .await?;
        Ok(())
    }

    async fn send_lines(&mut self, lines: &[String]) -> Result<(), SessionError> {
        for line in lines {
            self.send_line(line).await?;
        }
        Ok(())
    }

    /// Best-effort farewell and close. Safe to call any number of times.
    async fn disconnect(&mut self, reason: &str) {
        let Some(mut writer) = self.writer.take() else {
            return;
        };
        let farewell = format!("QUIT :{reason}{}", wire::CRLF);
        if let Err(e) = writer.write_all(farewell.as_bytes()).await {
            tracing::warn!(error = %e, "failed to send farewell");
        }
        let _ = writer.shutdown().await;
    }
}

/// State machine for one connection cycle.
pub struct Session {
    config: Config,
    tuning: Tuning,
    state: SessionState,
    framer: LineFramer,
    liveness: Liveness,
    negotiator: Negotiator,
    conn: Conn,
    /// Sends queued before registration; servers drop traffic from
    /// unregistered clients, so we hold it and flush on welcome.
    pending: Vec<Command>,
}

impl Session {
    pub fn new(config: Config, tuning: Tuning) -> Self {
        let negotiator = Negotiator::new(&config, tuning.rejoin_delay);
        let liveness = Liveness::new(
            tuning.probe_interval,
            tuning.probe_timeout,
            Instant::now(),
        );
        Self {
            config,
            tuning,
            state: SessionState::Connecting,
            framer: LineFramer::new(),
            liveness,
            negotiator,
            conn: Conn::closed(),
            pending: Vec::new(),
        }
    }

    /// Run one full connect → receive → disconnect cycle.
    ///
    /// `Ok(SessionEnd::Shutdown)` means the operator asked to stop and the
    /// farewell has been sent. Any `Err` leaves the socket closed and the
    /// reconnect decision to the supervisor.
    pub async fn run<D: Dispatch>(
        mut self,
        dispatch: &mut D,
        handle: &SessionHandle,
        commands: &mut mpsc::UnboundedReceiver<Command>,
    ) -> Result<SessionEnd, SessionError> {
        let result = self.drive(dispatch, handle, commands).await;
        if result.is_err() {
            self.conn.disconnect("error encountered, reconnecting").await;
        }
        self.state = SessionState::Disconnected;
        result
    }

    async fn drive<D: Dispatch>(
        &mut self,
        dispatch: &mut D,
        handle: &SessionHandle,
        commands: &mut mpsc::UnboundedReceiver<Command>,
    ) -> Result<SessionEnd, SessionError> {
        let addr = self.config.server_addr();
        tracing::info!(server = %addr, nick = %self.negotiator.current_nick(), "connecting");
        let stream = TcpStream::connect(&addr).await?;
        let (mut reader, writer) = stream.into_split();
        self.conn.writer = Some(writer);
        self.state = SessionState::Connected;
        self.liveness.traffic(Instant::now());

        let hello = self.negotiator.hello();
        self.conn.send_lines(&hello).await?;

        let mut buf = vec![0u8; READ_BUF];
        let mut tick = tokio::time::interval(self.tuning.read_timeout);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let interrupt = tokio::signal::ctrl_c();
        tokio::pin!(interrupt);

        loop {
            tokio::select! {
                read = reader.read(&mut buf) => {
                    let n = read?;
                    if n == 0 {
                        return Err(SessionError::ConnectionClosed);
                    }
                    self.liveness.traffic(Instant::now());
                    for line in self.framer.feed(&buf[..n]) {
                        self.handle_line(dispatch, handle, &line).await?;
                    }
                }
                Some(command) = commands.recv() => {
                    if let Some(end) = self.handle_command(command).await? {
                        return Ok(end);
                    }
                }
                _ = tick.tick() => {
                    let now = Instant::now();
                    match self.liveness.tick(now) {
                        LivenessTick::SendProbe => {
                            tracing::debug!("link quiet, probing");
                            self.conn.send_line(&format!("PING :{PROBE_TOKEN}")).await?;
                        }
                        LivenessTick::Failed => {
                            return Err(SessionError::LivenessTimeout(self.tuning.probe_timeout));
                        }
                        LivenessTick::Idle => {}
                    }
                    let rejoins = self.negotiator.due_rejoins(now);
                    self.conn.send_lines(&rejoins).await?;
                    guard(dispatch.on_periodic_tick(handle));
                }
                _ = &mut interrupt => {
                    tracing::info!("interrupt received, shutting down");
                    self.conn.disconnect(&self.config.quit_message).await;
                    return Ok(SessionEnd::Shutdown);
                }
            }
        }
    }

    /// Interpret one complete inbound line.
    async fn handle_line<D: Dispatch>(
        &mut self,
        dispatch: &mut D,
        handle: &SessionHandle,
        line: &str,
    ) -> Result<(), SessionError> {
        tracing::debug!(line, "recv");
        let Some(msg) = Message::parse(line) else {
            return Ok(());
        };

        // Anything with a foreign user hostmask on it counts as that
        // handle being seen.
        if msg.is_user_source()
            && let Some(nick) = msg.source_nick()
            && !self.negotiator.is_own_nick(nick)
        {
            let nick = nick.to_string();
            guard(dispatch.on_handle_seen(handle, &nick));
        }

        match msg.command.as_str() {
            "PING" => {
                let token = msg.params.first().map(String::as_str).unwrap_or_default();
                self.conn.send_line(&format!("PONG :{token}")).await?;
            }
            "PONG" => {
                self.liveness.ack();
            }
            "ERROR" => {
                return Err(SessionError::Remote(msg.raw));
            }
            // RPL_WELCOME: registration complete.
            "001" => {
                tracing::info!(nick = %self.negotiator.current_nick(), "registered");
                let follow_up = self.negotiator.on_welcome();
                self.conn.send_lines(&follow_up).await?;
                self.state = SessionState::Registered;
                // Flush sends that were queued before registration. Only
                // Send commands are ever queued, so no SessionEnd here.
                for command in std::mem::take(&mut self.pending) {
                    self.handle_command(command).await?;
                }
                guard(dispatch.on_registered(handle));
            }
            // ERR_NICKNAMEINUSE: try the next candidate.
            "433" if self.state != SessionState::Registered => {
                let retry = self.negotiator.on_nick_rejected()?;
                tracing::warn!(
                    nick = %self.negotiator.current_nick(),
                    "nick in use, trying next candidate"
                );
                self.conn.send_line(&retry).await?;
            }
            "KICK" => {
                if let [channel, kicked, ..] = &msg.params[..]
                    && kicked.as_str() == self.negotiator.current_nick()
                {
                    tracing::warn!(channel = %channel, "kicked, rejoining after cooldown");
                    self.negotiator.schedule_rejoin(channel, Instant::now());
                }
            }
            "PRIVMSG" => {
                if let [target, text, ..] = &msg.params[..]
                    && let Some(sender) = msg.source_nick()
                {
                    // Channel traffic is answered in the channel; a direct
                    // message is answered to its sender.
                    let reply_target = if wire::is_channel(target) {
                        target.as_str()
                    } else {
                        sender
                    };
                    guard(dispatch.on_chat_message(handle, text, reply_target, sender));
                }
            }
            _ => {} // everything else is noise to the engine
        }

        Ok(())
    }

    /// Execute one queued outbound command.
    async fn handle_command(
        &mut self,
        command: Command,
    ) -> Result<Option<SessionEnd>, SessionError> {
        match command {
            Command::Send { target, text } => {
                if self.state != SessionState::Registered {
                    self.pending.push(Command::Send { target, text });
                    return Ok(None);
                }
                let lines = wire::format_privmsg(&target, &text);
                if !lines.is_empty() {
                    tracing::debug!(to = %target, "sending message");
                }
                self.conn.send_lines(&lines).await?;
                Ok(None)
            }
            Command::Quit => {
                tracing::info!("shutdown requested");
                self.conn.disconnect(&self.config.quit_message).await;
                Ok(Some(SessionEnd::Shutdown))
            }
        }
    }
}

/// Dispatch boundary: business-layer failures are logged, never allowed
/// to interrupt the read loop or corrupt engine state.
fn guard(result: anyhow::Result<()>) {
    if let Err(e) = result {
        tracing::error!(error = %e, "dispatch callback failed");
    }
}
