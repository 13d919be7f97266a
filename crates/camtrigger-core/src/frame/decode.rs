//! SYN segment decoder.
//!
//! # Supported encapsulations
//!
//! ```text
//! Ethernet II (DLT 1)
//! ┌──────────┬──────────┬───────────┬ ─ ─ ─ ─ ─ ─ ┬───────────┬─────────
//! │ dst (6)  │ src (6)  │ type (2)  │ 802.1Q (4)  │ type (2)  │ IP ...
//! └──────────┴──────────┴───────────┴ ─ ─ ─ ─ ─ ─ ┴───────────┴─────────
//!
//! Linux cooked capture, SLL (DLT 113), used by the "any" pseudo-device
//! ┌──────────┬──────────┬──────────┬──────────────┬───────────┬─────────
//! │ pkt (2)  │ hatype(2)│ alen (2) │ addr (8)     │ proto (2) │ IP ...
//! └──────────┴──────────┴──────────┴──────────────┴───────────┴─────────
//! ```
//!
//! # Result convention
//!
//! - `Err(FrameError)` – a header the frame claims to have is cut short.
//! - `Ok(None)`        – a well-formed frame that is not a SYN to the port
//!   (ARP, UDP, SYN-ACK, another port, a non-first IPv4 fragment, ...).
//! - `Ok(Some(_))`     – a connection-initiation segment for the port.
//!
//! A connection-initiation segment has SYN set and ACK clear.  The listener's
//! own SYN-ACK replies therefore never count as sightings.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use thiserror::Error;
use tracing::trace;

use crate::domain::hardware_id::HardwareId;

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_IPV6: u16 = 0x86DD;
const ETHERTYPE_VLAN: u16 = 0x8100;

const ETHERNET_HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;
const SLL_HEADER_LEN: usize = 16;
const IPV4_MIN_HEADER_LEN: usize = 20;
const IPV6_HEADER_LEN: usize = 40;
const TCP_MIN_HEADER_LEN: usize = 14;

const IP_PROTO_TCP: u8 = 6;

const TCP_FLAG_SYN: u8 = 0x02;
const TCP_FLAG_ACK: u8 = 0x10;

/// pcap data-link type numbers for the supported encapsulations.
const DLT_EN10MB: i32 = 1;
const DLT_LINUX_SLL: i32 = 113;

/// Error returned when a frame is shorter than the headers it announces.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// A header was cut short.
    #[error("truncated {layer} header: need {needed} bytes, have {available}")]
    Truncated {
        layer: &'static str,
        needed: usize,
        available: usize,
    },

    /// The IPv4 header length field is below the 20-byte minimum.
    #[error("invalid IPv4 header length {0} bytes")]
    BadIpv4HeaderLength(usize),
}

/// Link-layer encapsulation of captured frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    /// Ethernet II, optionally with one 802.1Q tag.
    Ethernet,
    /// Linux cooked capture v1.
    LinuxSll,
}

impl LinkType {
    /// Maps a pcap data-link type number to a supported encapsulation.
    pub fn from_dlt(dlt: i32) -> Option<Self> {
        match dlt {
            DLT_EN10MB => Some(Self::Ethernet),
            DLT_LINUX_SLL => Some(Self::LinuxSll),
            _ => None,
        }
    }
}

/// The addressing of one connection-initiation segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynSegment {
    pub source_mac: HardwareId,
    pub source_ip: IpAddr,
    pub destination_ip: IpAddr,
    pub source_port: u16,
    pub destination_port: u16,
}

/// Decodes `frame` and returns its addressing if it is a SYN to `port`.
///
/// # Errors
///
/// Returns [`FrameError`] when a header is truncated or malformed.
pub fn decode_syn(
    link: LinkType,
    frame: &[u8],
    port: u16,
) -> Result<Option<SynSegment>, FrameError> {
    let Some((source_mac, ethertype, network)) = split_link_layer(link, frame)? else {
        return Ok(None);
    };

    let (source_ip, destination_ip, transport) = match ethertype {
        ETHERTYPE_IPV4 => match split_ipv4(network)? {
            Some(parts) => parts,
            None => return Ok(None),
        },
        ETHERTYPE_IPV6 => match split_ipv6(network)? {
            Some(parts) => parts,
            None => return Ok(None),
        },
        _ => return Ok(None),
    };

    require("TCP", transport, TCP_MIN_HEADER_LEN)?;
    let source_port = u16::from_be_bytes([transport[0], transport[1]]);
    let destination_port = u16::from_be_bytes([transport[2], transport[3]]);
    let flags = transport[13];

    if destination_port != port || flags & (TCP_FLAG_SYN | TCP_FLAG_ACK) != TCP_FLAG_SYN {
        return Ok(None);
    }

    Ok(Some(SynSegment {
        source_mac,
        source_ip,
        destination_ip,
        source_port,
        destination_port,
    }))
}

// ── Layer helpers ─────────────────────────────────────────────────────────────

/// Returns `(source MAC, ethertype, network-layer bytes)`.
///
/// `Ok(None)` when the frame has no six-byte source address (e.g. loopback
/// traffic seen through the "any" device).
fn split_link_layer(
    link: LinkType,
    frame: &[u8],
) -> Result<Option<(HardwareId, u16, &[u8])>, FrameError> {
    match link {
        LinkType::Ethernet => {
            require("Ethernet", frame, ETHERNET_HEADER_LEN)?;
            let source = HardwareId::from_slice(&frame[6..12]);
            let mut ethertype = u16::from_be_bytes([frame[12], frame[13]]);
            let mut offset = ETHERNET_HEADER_LEN;

            if ethertype == ETHERTYPE_VLAN {
                require("802.1Q", frame, ETHERNET_HEADER_LEN + VLAN_TAG_LEN)?;
                ethertype = u16::from_be_bytes([frame[16], frame[17]]);
                offset += VLAN_TAG_LEN;
            }

            Ok(source.map(|mac| (mac, ethertype, &frame[offset..])))
        }
        LinkType::LinuxSll => {
            require("SLL", frame, SLL_HEADER_LEN)?;
            let address_len = u16::from_be_bytes([frame[4], frame[5]]);
            if address_len != 6 {
                return Ok(None);
            }
            let source = HardwareId::from_slice(&frame[6..12]);
            let ethertype = u16::from_be_bytes([frame[14], frame[15]]);
            Ok(source.map(|mac| (mac, ethertype, &frame[SLL_HEADER_LEN..])))
        }
    }
}

/// Returns `(source, destination, TCP bytes)` for a first-fragment TCP packet.
fn split_ipv4(packet: &[u8]) -> Result<Option<(IpAddr, IpAddr, &[u8])>, FrameError> {
    require("IPv4", packet, IPV4_MIN_HEADER_LEN)?;

    let header_len = usize::from(packet[0] & 0x0f) * 4;
    if header_len < IPV4_MIN_HEADER_LEN {
        return Err(FrameError::BadIpv4HeaderLength(header_len));
    }
    require("IPv4", packet, header_len)?;

    if packet[9] != IP_PROTO_TCP {
        return Ok(None);
    }

    let fragment_offset = u16::from_be_bytes([packet[6], packet[7]]) & 0x1fff;
    if fragment_offset != 0 {
        trace!("skipping non-first IPv4 fragment (offset {fragment_offset})");
        return Ok(None);
    }

    let source = Ipv4Addr::new(packet[12], packet[13], packet[14], packet[15]);
    let destination = Ipv4Addr::new(packet[16], packet[17], packet[18], packet[19]);
    Ok(Some((
        IpAddr::V4(source),
        IpAddr::V4(destination),
        &packet[header_len..],
    )))
}

/// Returns `(source, destination, TCP bytes)` when TCP directly follows the
/// fixed IPv6 header.  Extension headers are not walked.
fn split_ipv6(packet: &[u8]) -> Result<Option<(IpAddr, IpAddr, &[u8])>, FrameError> {
    require("IPv6", packet, IPV6_HEADER_LEN)?;

    if packet[6] != IP_PROTO_TCP {
        return Ok(None);
    }

    let mut source = [0u8; 16];
    source.copy_from_slice(&packet[8..24]);
    let mut destination = [0u8; 16];
    destination.copy_from_slice(&packet[24..40]);

    Ok(Some((
        IpAddr::V6(Ipv6Addr::from(source)),
        IpAddr::V6(Ipv6Addr::from(destination)),
        &packet[IPV6_HEADER_LEN..],
    )))
}

fn require(layer: &'static str, bytes: &[u8], needed: usize) -> Result<(), FrameError> {
    if bytes.len() < needed {
        return Err(FrameError::Truncated {
            layer,
            needed,
            available: bytes.len(),
        });
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
