//! Keepalive liveness tracking.
//!
//! A TCP connection can die without either end noticing: the read loop
//! cannot tell "the server has nothing to say" from "the server is gone".
//! When the link has been quiet for too long we send a PING; an unanswered
//! PING means the connection is half-dead and must be torn down.

use std::time::Duration;

use tokio::time::Instant;

/// What the monitor wants done after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessTick {
    /// Nothing to do.
    Idle,
    /// The link has been quiet past the probe interval: send a PING now.
    SendProbe,
    /// An outstanding probe went unanswered past the timeout. Fatal.
    Failed,
}

/// Tracks traffic recency and the one outstanding probe, if any.
#[derive(Debug)]
pub struct Liveness {
    probe_interval: Duration,
    probe_timeout: Duration,
    last_traffic: Instant,
    last_probe: Instant,
    probe_outstanding: bool,
    failed: bool,
}

impl Liveness {
    pub fn new(probe_interval: Duration, probe_timeout: Duration, now: Instant) -> Self {
        Self {
            probe_interval,
            probe_timeout,
            last_traffic: now,
            last_probe: now,
            probe_outstanding: false,
            failed: false,
        }
    }

    /// Record inbound traffic of any kind. A talking server is a live
    /// server, so this defers the next probe.
    pub fn traffic(&mut self, now: Instant) {
        self.last_traffic = now;
    }

    /// A PONG arrived. Clears the outstanding probe; a stale ack with no
    /// probe in flight is ignored.
    pub fn ack(&mut self) {
        if self.probe_outstanding {
            self.probe_outstanding = false;
        }
    }

    /// Advance the state machine. `Failed` is reported at most once per
    /// connection; the session treats it as fatal immediately.
    pub fn tick(&mut self, now: Instant) -> LivenessTick {
        if self.failed {
            return LivenessTick::Idle;
        }

        if self.probe_outstanding {
            if now.duration_since(self.last_probe) > self.probe_timeout {
                self.failed = true;
                return LivenessTick::Failed;
            }
            LivenessTick::Idle
        } else if now.duration_since(self.last_traffic) > self.probe_interval {
            self.probe_outstanding = true;
            self.last_probe = now;
            LivenessTick::SendProbe
        } else {
            LivenessTick::Idle
        }
    }
}
