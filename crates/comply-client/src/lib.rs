//! Protocol Client for Compliant Applications.
//!
//! [`ConnectionManager`] performs the handshake and executes the command-style
//! endpoints, classifying every failure into the taxonomy of
//! [`comply_core::error`]. Commands and actions go through the
//! [`RetryExecutor`]. [`Dispatcher`] runs calls as tasks and reports results
//! over a channel.

pub mod connection;
pub mod dispatch;
mod http;
pub mod retry;
pub mod state;

pub use connection::{fallback_suggestions, ConnectionManager};
pub use dispatch::{ClientEvent, Dispatcher};
pub use retry::RetryExecutor;
pub use state::{ConnectionState, ConnectionStats};
