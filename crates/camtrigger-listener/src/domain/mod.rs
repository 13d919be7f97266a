//! Domain layer for camtrigger-listener.
//!
//! Plain settings only; no sockets or async here.

pub mod config;

pub use config::ListenerConfig;
