//! HTTP surface of the translation gateway
//!
//! - GET /ws/live - Live translation session (WebSocket upgrade)
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
