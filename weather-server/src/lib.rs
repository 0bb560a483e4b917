//! HTTP front end for the weather proxy.
//!
//! The binary in `main.rs` only parses arguments and sets up logging; the
//! router and handlers live here so they can be driven from tests.

pub mod cli;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
