//! HTTP shell for the PingPong agent: routing, CORS, and translation of agent
//! outcomes into JSON responses.

pub mod api;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::build_router;
pub use server::{HttpServer, shutdown_signal};
