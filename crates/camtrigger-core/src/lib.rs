//! # camtrigger-core
//!
//! Shared library for camtrigger containing the device registry, the trigger
//! matching policy, and the decoder that turns captured link-layer frames into
//! connection-initiation (SYN) sightings.
//!
//! This crate is used by the correlator service.  It has zero dependencies on
//! packet-capture libraries, sockets, or HTTP clients, so everything here can
//! be tested with plain byte arrays.
//!
//! # Architecture overview
//!
//! camtrigger watches a network for TCP SYN segments sent by known devices
//! (typically IP cameras configured to deliver alerts to a dummy mail server)
//! and turns each sighting into exactly one call to a home-automation hub.
//!
//! - **`domain`** – Hardware identifiers, device profiles, the immutable
//!   registry, and the first-match-wins lookup used for every captured event.
//!
//! - **`frame`** – Decoding of Ethernet / Linux cooked-capture frames down to
//!   the TCP flags, producing a [`SynSegment`] only for connection-initiation
//!   segments addressed to the monitored port.

pub mod domain;
pub mod frame;

pub use domain::device::{DeviceProfile, DeviceRegistry, RegistryError};
pub use domain::event::CapturedEvent;
pub use domain::hardware_id::{HardwareId, HardwareIdError};
pub use frame::decode::{decode_syn, FrameError, LinkType, SynSegment};
