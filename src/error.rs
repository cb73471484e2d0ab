//! Session error taxonomy.
//!
//! Everything that ends a connection cycle funnels into [`SessionError`].
//! Most variants are recoverable: the supervisor tears the session down
//! and dials again after a pause. Nick exhaustion is not — the same
//! configuration would fail the same way forever, so it shuts the process
//! down instead of looping.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Socket-level failure: connect refused, reset mid-session, write to
    /// a dead peer.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The server closed the stream (EOF on read).
    #[error("server closed the connection")]
    ConnectionClosed,

    /// The server sent an `ERROR` line — its way of saying goodbye.
    #[error("server error: {0}")]
    Remote(String),

    /// Our liveness probe went unanswered.
    #[error("no PONG within {0:?} of our PING")]
    LivenessTimeout(Duration),

    /// Every candidate nick was rejected with ERR_NICKNAMEINUSE.
    #[error("all candidate nicks are in use")]
    NicksExhausted,
}

impl SessionError {
    /// Recoverable errors trigger a reconnect cycle; the rest are
    /// shutdown triggers.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SessionError::NicksExhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_nick_exhaustion_is_unrecoverable() {
        assert!(SessionError::ConnectionClosed.is_recoverable());
        assert!(SessionError::Remote("ERROR :bye".into()).is_recoverable());
        assert!(SessionError::LivenessTimeout(Duration::from_secs(10)).is_recoverable());
        assert!(!SessionError::NicksExhausted.is_recoverable());
    }
}
