//! The seam between the engine and bot behavior.
//!
//! The engine interprets protocol traffic; everything a bot *does* about
//! it lives behind [`Dispatch`]. Implementations get a [`SessionHandle`]
//! for queueing replies and never touch the socket, framing, or liveness
//! state.

use anyhow::Result;
use tokio::sync::mpsc;

use crate::error::SessionError;

/// Outbound requests queued by the business layer.
#[derive(Debug)]
pub enum Command {
    /// Deliver `text` to a channel or nick, chunked as needed.
    Send { target: String, text: String },
    /// Say goodbye, disconnect, and stop reconnecting.
    Quit,
}

/// Cloneable handle for queueing outbound traffic onto the session.
///
/// Sends are serialized onto the socket in submission order, whole lines
/// at a time. The methods are sync on purpose: callbacks can queue replies
/// without an executor, and spawned tasks can hold a clone. A handle
/// outliving its session drops sends silently — the connection it named
/// is gone.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SessionHandle {
    /// A fresh handle/receiver pair, one per session cycle.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue one message. Empty text sends nothing.
    pub fn send_message(&self, target: &str, text: &str) {
        let _ = self.tx.send(Command::Send {
            target: target.to_string(),
            text: text.to_string(),
        });
    }

    /// Queue several messages to the same target, in order.
    pub fn send_messages<I, S>(&self, target: &str, texts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for text in texts {
            let _ = self.tx.send(Command::Send {
                target: target.to_string(),
                text: text.into(),
            });
        }
    }

    /// Ask the engine to send its farewell and exit instead of
    /// reconnecting.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Quit);
    }
}

/// Callbacks the engine invokes as traffic arrives.
///
/// Every method defaults to a no-op, so implementations pick only the
/// events they care about. Errors returned here are logged at the dispatch
/// boundary and never disturb the read loop: the business layer is
/// untrusted relative to the engine's own liveness.
pub trait Dispatch: Send {
    /// Registration finished and the configured channels have been
    /// joined.
    fn on_registered(&mut self, _handle: &SessionHandle) -> Result<()> {
        Ok(())
    }

    /// A chat line arrived. `reply_target` is the channel it was said in,
    /// or the sender's nick for a direct message — answer there.
    fn on_chat_message(
        &mut self,
        _handle: &SessionHandle,
        _text: &str,
        _reply_target: &str,
        _sender: &str,
    ) -> Result<()> {
        Ok(())
    }

    /// A foreign nick showed signs of life (spoke, joined, anything with
    /// a user hostmask on it).
    fn on_handle_seen(&mut self, _handle: &SessionHandle, _nick: &str) -> Result<()> {
        Ok(())
    }

    /// Fires roughly once per read-timeout interval, data or not.
    /// Periodic work (scheduled announcements, queue draining) goes here;
    /// implementations throttle themselves.
    fn on_periodic_tick(&mut self, _handle: &SessionHandle) -> Result<()> {
        Ok(())
    }

    /// The session died. The supervisor decides reconnect vs shutdown;
    /// this is notification only.
    fn on_fatal_error(&mut self, _error: &SessionError) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sends_preserve_submission_order() {
        let (handle, mut rx) = SessionHandle::pair();
        handle.send_message("#a", "one");
        handle.send_messages("#a", ["two", "three"]);
        handle.shutdown();

        let mut got = Vec::new();
        while let Ok(cmd) = rx.try_recv() {
            got.push(match cmd {
                Command::Send { text, .. } => text,
                Command::Quit => "quit".to_string(),
            });
        }
        assert_eq!(got, vec!["one", "two", "three", "quit"]);
    }

    #[test]
    fn send_after_session_death_is_dropped_quietly() {
        let (handle, rx) = SessionHandle::pair();
        drop(rx);
        handle.send_message("#a", "into the void");
        handle.shutdown();
    }
}
