//! botline: a reconnecting IRC bot engine.
//!
//! The engine owns the socket, CRLF framing over partial reads,
//! registration with nick-collision fallback, ping/pong liveness, and the
//! reconnect loop. Bot behavior plugs in behind [`dispatch::Dispatch`]
//! and never touches protocol internals.
//!
//! ```rust,no_run
//! use botline::config::Config;
//! use botline::dispatch::{Dispatch, SessionHandle};
//! use botline::supervisor::Supervisor;
//!
//! struct Greeter;
//!
//! impl Dispatch for Greeter {
//!     fn on_chat_message(
//!         &mut self,
//!         handle: &SessionHandle,
//!         text: &str,
//!         reply_target: &str,
//!         sender: &str,
//!     ) -> anyhow::Result<()> {
//!         if text == "!hi" {
//!             handle.send_message(reply_target, &format!("hi {sender}"));
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::load("botline.json".as_ref())?;
//! Supervisor::new(config, Greeter).run().await
//! # }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod framing;
pub mod liveness;
pub mod negotiator;
pub mod session;
pub mod supervisor;
pub mod wire;
