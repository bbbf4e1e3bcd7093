//! HTTP API handlers
//!
//! Routes are organized by domain and split into public (no auth) and
//! protected (auth required) routers.

pub mod flags;
pub mod health;
pub mod resolve;
pub mod router;
pub mod substitute;
pub mod types;

pub use router::AppState;
