#![warn(clippy::all)]

pub mod core;
pub mod notify;
pub mod server;
