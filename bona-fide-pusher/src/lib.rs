//! Bona Fide Pusher - REMS to Elixir bona fide relay.
//!
//! REMS notifies the relay of application events. When an application is
//! approved, the applicant's user id is pushed to Elixir so the user is
//! granted bona fide researcher status.
//!
//! ## Flow
//!
//! ```text
//! REMS --PUT event--> Relay --POST elixirid--> Elixir
//! ```

pub mod config;
pub mod elixir;
pub mod event;
pub mod web;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use elixir::{ElixirClient, ForwardError, ForwardResult};
pub use event::{EventId, EventKind, InboundEvent, ValidationError, APPROVED_EVENT};
pub use web::{router, serve, AppState, ConnectionFault};
