//! REST API for the client app and the admin panel

pub mod error;
pub mod extract;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{router, serve, shutdown_signal, AppState};
