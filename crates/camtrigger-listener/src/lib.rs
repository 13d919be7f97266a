//! camtrigger-listener library crate.
//!
//! A companion TCP service for the monitored port.  Devices that open a
//! connection expect somebody to answer; this service completes the
//! handshake, reads and discards whatever the device sends, and closes the
//! connection when the peer does or when it goes quiet.
//!
//! ```text
//! device ──SYN──► [camtrigger-listener]  accept → drain → close
//!            └──► (camtrigger-correlator sees the same SYN passively)
//! ```
//!
//! The listener never writes application data and never looks at what it
//! reads.

/// Domain layer: listener settings.
pub mod domain;

/// Infrastructure layer: socket binding, accept loop, connection draining.
pub mod infrastructure;
