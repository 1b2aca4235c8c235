//! Multi-client line-based TCP chat server library.
//!
//! Clients connect with any line-oriented TCP tool (e.g. `nc`), pick a display
//! name and exchange messages that are broadcast to every participant.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;

pub use config::ServerConfig;
pub use ui::ChatServer;
