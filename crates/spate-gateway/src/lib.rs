//! Gateway session: the poll-and-diff engine between one daemon and its
//! subscribers.
//!
//! Layout: `session.rs` (the session actor owning store, history, and
//! timers), `stream.rs` (subscriber registry and change propagation),
//! `command.rs` (the command protocol behind [`GatewayHandle`]).
//!
//! There are no process-wide singletons: each [`GatewaySession`] owns
//! its own timers and connections and is constructed per daemon-user
//! pair, then torn down explicitly.

pub mod command;
pub mod error;
pub mod session;
pub mod stream;

pub use error::GatewayError;
pub use session::{GatewayHandle, GatewaySession, SessionOptions};
