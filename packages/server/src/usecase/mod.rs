//! UseCase layer.

pub mod broadcast;

pub use broadcast::{Broadcaster, Delivery};
