//! The outermost control loop: keep a session alive until told to stop.
//!
//! Sessions die for all sorts of reasons — the server restarts, a NAT
//! mapping expires, a probe goes unanswered. The supervisor's only job is
//! to decide whether an exit is final (operator shutdown, nick
//! exhaustion) or worth dialing again after a pause. Every cycle gets a
//! fresh session and a fresh command channel; the dispatch implementation
//! is the one thing that survives reconnects.

use anyhow::Result;
use tokio::time::sleep;

use crate::config::{Config, Tuning};
use crate::dispatch::{Dispatch, SessionHandle};
use crate::session::{Session, SessionEnd};

pub struct Supervisor<D> {
    config: Config,
    tuning: Tuning,
    dispatch: D,
}

impl<D: Dispatch> Supervisor<D> {
    pub fn new(config: Config, dispatch: D) -> Self {
        Self {
            config,
            tuning: Tuning::default(),
            dispatch,
        }
    }

    /// Override the default timings. Embedders and tests shrink these.
    pub fn with_tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Run until shutdown. Recoverable session errors reconnect forever;
    /// only an operator shutdown or a registration-fatal error returns.
    pub async fn run(mut self) -> Result<()> {
        loop {
            let (handle, mut commands) = SessionHandle::pair();
            let session = Session::new(self.config.clone(), self.tuning.clone());

            match session.run(&mut self.dispatch, &handle, &mut commands).await {
                Ok(SessionEnd::Shutdown) => {
                    tracing::info!("shutdown requested, exiting");
                    return Ok(());
                }
                Err(e) => {
                    tracing::error!(error = %e, "session ended");
                    self.dispatch.on_fatal_error(&e);
                    if !e.is_recoverable() {
                        // The same configuration would fail the same way;
                        // reconnecting would loop on the server forever.
                        return Err(e.into());
                    }
                }
            }

            tracing::info!(
                delay = ?self.tuning.reconnect_delay,
                "reconnecting after backoff"
            );
            tokio::select! {
                _ = sleep(self.tuning.reconnect_delay) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("interrupt during backoff, exiting");
                    return Ok(());
                }
            }
        }
    }
}
