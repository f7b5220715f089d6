//! Edge Gateway - prefix-routing reverse proxy
//!
//! Each request is rate-limited per client IP and given a deadline. It is then
//! matched against an ordered table of path prefixes and forwarded to the
//! backend for that prefix with the prefix stripped. Responses the gateway
//! writes itself use a small JSON envelope.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod proxy;
pub mod rate_limit;
pub mod routes;
pub mod server;
pub mod state;
pub mod timeout;

pub use config::Args;
pub use error::{GatewayError, Result};
pub use models::{Envelope, EnvelopeStatus};
pub use server::{build_router, build_state, start_server};
pub use state::AppState;
