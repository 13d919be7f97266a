//! Transient capture records.

use std::net::IpAddr;
use std::time::SystemTime;

use crate::domain::hardware_id::HardwareId;
use crate::frame::decode::SynSegment;

/// One observed connection-initiation packet.
///
/// Created by the capture facility and consumed immediately by the
/// correlator; never persisted.  `hardware_field` is the text the matching
/// policy searches for registered identifiers.  For live captures it holds
/// the canonical source MAC of the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    /// Text summary of the frame's hardware addressing.
    pub hardware_field: String,
    /// Source IP address, when the frame carried one.
    pub source_ip: Option<IpAddr>,
    /// TCP source port of the SYN.
    pub source_port: u16,
    /// TCP destination port of the SYN (the monitored port).
    pub destination_port: u16,
    /// Captured length of the frame in bytes.
    pub frame_len: usize,
    /// When the capture facility saw the frame.
    pub timestamp: SystemTime,
}

impl CapturedEvent {
    /// Builds an event from a decoded SYN segment.
    pub fn from_syn(segment: &SynSegment, frame_len: usize, timestamp: SystemTime) -> Self {
        Self {
            hardware_field: segment.source_mac.to_string(),
            source_ip: Some(segment.source_ip),
            source_port: segment.source_port,
            destination_port: segment.destination_port,
            frame_len,
            timestamp,
        }
    }

    /// Builds an event carrying only a hardware field.
    ///
    /// Used by replayed or synthetic sources that have no IP-level details.
    pub fn with_hardware_field(hardware_field: impl Into<String>, destination_port: u16) -> Self {
        Self {
            hardware_field: hardware_field.into(),
            source_ip: None,
            source_port: 0,
            destination_port,
            frame_len: 0,
            timestamp: SystemTime::now(),
        }
    }

    /// Builds an event for a single source hardware address.
    pub fn from_hardware_id(id: HardwareId, destination_port: u16) -> Self {
        Self::with_hardware_field(id.to_string(), destination_port)
    }
}
