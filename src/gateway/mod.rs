//! HTTP surface: application state, router, and server lifecycle.

pub mod router;
pub mod server;

pub use router::{AppState, create_router};
pub use server::Server;
