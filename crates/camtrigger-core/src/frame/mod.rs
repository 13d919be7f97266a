//! Link-layer frame decoding.
//!
//! The capture facility hands us raw frames; this module walks the headers
//! (link layer → IPv4/IPv6 → TCP) far enough to decide whether a frame is a
//! connection-initiation segment for the monitored port, and to pull out the
//! sender's hardware address.  No payload is ever inspected.

pub mod decode;
