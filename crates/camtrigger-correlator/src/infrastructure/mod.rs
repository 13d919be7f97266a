//! Infrastructure layer for the correlator.
//!
//! Everything that touches the outside world lives here:
//!
//! - **`capture`**   – Packet sources (libpcap, scripted mock) and the
//!   dedicated capture thread that feeds events to the async runtime.
//! - **`actuation`** – The HTTP client that calls the automation hub, plus a
//!   recording mock.
//! - **`storage`**   – TOML configuration loading.

pub mod actuation;
pub mod capture;
pub mod storage;
