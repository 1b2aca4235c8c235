//! Utilities shared by the tcpchat binaries: logging setup and clocks.

pub mod logger;
pub mod time;
