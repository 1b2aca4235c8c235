//! TCP chat server implementation.

pub mod protocol;
mod server;
pub mod session;
pub mod signal;
pub mod state;
mod writer;

pub use server::ChatServer;
pub use signal::shutdown_signal;
