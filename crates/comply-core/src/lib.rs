//! Shared types of the Comply console: the error taxonomy, retry policy,
//! request validation, protocol wire types, auth and configuration.

pub mod auth;
pub mod config;
pub mod error;
pub mod protocol;
pub mod retry;
pub mod validation;

// Re-export common types
pub use auth::{AuthConfig, AuthManager, AuthType};
pub use config::{ClientConfig, Profile};
pub use error::{ConsoleError, ErrorDetail, ErrorKind, ProtocolError, Result, ValidationError};
pub use retry::RetryPolicy;
