pub mod handlers;
pub mod server;

pub use server::{AppState, build_router, serve, serve_listener};
