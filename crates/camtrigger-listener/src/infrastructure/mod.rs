//! Infrastructure layer for camtrigger-listener.
//!
//! Binds the TCP listener, runs the accept loop, and drains each accepted
//! connection on its own Tokio task.

pub mod server;

pub use server::{
    bind_listener, drain_connection, run_listener, serve, DrainEnd, DrainReport, ListenerError,
};
