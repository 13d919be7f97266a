//! Live capture through libpcap.
//!
//! The capture handle is opened with a kernel-side BPF filter for the
//! monitored TCP port so that the decoder only ever sees a trickle of frames.
//! The SYN-without-ACK test is done by the decoder rather than in BPF,
//! because `tcp[tcpflags]` expressions only match IPv4.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use camtrigger_core::{decode_syn, CapturedEvent, LinkType};
use pcap::{Active, Capture};
use tracing::{debug, info};

use super::{CaptureError, PacketSource};
use crate::infrastructure::storage::config::CaptureConfig;

/// Returns the BPF program text used for `port`.
pub fn bpf_filter(port: u16) -> String {
    format!("tcp dst port {port}")
}

/// A [`PacketSource`] backed by a libpcap capture handle.
pub struct PcapSource {
    capture: Capture<Active>,
    link: LinkType,
    port: u16,
    interface: String,
}

impl PcapSource {
    /// Opens `config.interface` and installs the port filter.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Unavailable`] when the device cannot be opened
    /// (missing privileges, unknown interface) or the filter is rejected, and
    /// [`CaptureError::UnsupportedLinkType`] for link layers the decoder does
    /// not understand.
    pub fn open(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let interface = config.interface.clone();
        let unavailable = |e: pcap::Error| CaptureError::Unavailable {
            interface: interface.clone(),
            reason: e.to_string(),
        };

        let read_timeout_ms = i32::try_from(config.idle_timeout_ms).unwrap_or(i32::MAX);
        let mut capture = Capture::from_device(interface.as_str())
            .map_err(unavailable)?
            .promisc(config.promiscuous)
            .snaplen(config.snaplen)
            .timeout(read_timeout_ms)
            .open()
            .map_err(unavailable)?;

        capture
            .filter(&bpf_filter(config.port), true)
            .map_err(unavailable)?;

        let link = link_type_for(&interface, capture.get_datalink().0)?;

        info!(
            "opened capture on '{interface}' ({link:?}) with filter '{}'",
            bpf_filter(config.port)
        );

        Ok(Self {
            capture,
            link,
            port: config.port,
            interface,
        })
    }
}

impl PacketSource for PcapSource {
    fn describe(&self) -> String {
        format!("interface '{}' port {}", self.interface, self.port)
    }

    fn observe_next(&mut self) -> Result<Option<CapturedEvent>, CaptureError> {
        loop {
            match self.capture.next_packet() {
                Ok(packet) => {
                    let timestamp = timeval_to_system_time(
                        packet.header.ts.tv_sec as i64,
                        packet.header.ts.tv_usec as i64,
                    );
                    let frame_len = packet.header.len as usize;
                    if let Some(event) = event_from_frame(
                        self.link,
                        self.port,
                        packet.data,
                        frame_len,
                        timestamp,
                        &self.interface,
                    ) {
                        return Ok(Some(event));
                    }
                }
                Err(e) => return idle_or_lost(&self.interface, e),
            }
        }
    }
}

/// Maps a pcap data link type to the decoder's [`LinkType`].
fn link_type_for(interface: &str, dlt: i32) -> Result<LinkType, CaptureError> {
    LinkType::from_dlt(dlt).ok_or_else(|| CaptureError::UnsupportedLinkType {
        interface: interface.to_string(),
        dlt,
    })
}

/// Decodes one captured frame.
///
/// `None` for frames that are not a SYN to `port`, and for frames the
/// decoder rejects; those are logged and skipped.
fn event_from_frame(
    link: LinkType,
    port: u16,
    frame: &[u8],
    frame_len: usize,
    timestamp: SystemTime,
    interface: &str,
) -> Option<CapturedEvent> {
    match decode_syn(link, frame, port) {
        Ok(Some(segment)) => Some(CapturedEvent::from_syn(&segment, frame_len, timestamp)),
        Ok(None) => None,
        Err(e) => {
            debug!("skipping undecodable frame on '{interface}': {e}");
            None
        }
    }
}

/// A read timeout is an idle observation; any other pcap error ends the
/// capture.
fn idle_or_lost(
    interface: &str,
    error: pcap::Error,
) -> Result<Option<CapturedEvent>, CaptureError> {
    match error {
        pcap::Error::TimeoutExpired => Ok(None),
        e => Err(CaptureError::Lost {
            interface: interface.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn timeval_to_system_time(sec: i64, usec: i64) -> SystemTime {
    if sec < 0 || usec < 0 {
        return SystemTime::now();
    }
    UNIX_EPOCH + Duration::from_secs(sec as u64) + Duration::from_micros(usec as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAMERA_MAC: [u8; 6] = [0x22, 0x22, 0x22, 0x22, 0x22, 0x22];

    /// Ethernet + IPv4 + TCP frame from the camera to `dst_port`.
    fn ethernet_tcp_frame(dst_port: u16, flags: u8) -> Vec<u8> {
        let mut frame = vec![0x02, 0x00, 0x00, 0x00, 0x00, 0x01];
        frame.extend_from_slice(&CAMERA_MAC);
        frame.extend_from_slice(&[0x08, 0x00]);

        let mut ip = vec![0u8; 20];
        ip[0] = 0x45;
        ip[8] = 64;
        ip[9] = 6;
        ip[12..16].copy_from_slice(&[192, 168, 1, 50]);
        ip[16..20].copy_from_slice(&[192, 168, 1, 2]);
        frame.extend_from_slice(&ip);

        let mut tcp = vec![0u8; 20];
        tcp[0..2].copy_from_slice(&40000u16.to_be_bytes());
        tcp[2..4].copy_from_slice(&dst_port.to_be_bytes());
        tcp[12] = 5 << 4;
        tcp[13] = flags;
        frame.extend_from_slice(&tcp);
        frame
    }

    #[test]
    fn test_bpf_filter_names_port() {
        assert_eq!(bpf_filter(2525), "tcp dst port 2525");
    }

    #[test]
    fn test_timeval_conversion() {
        let ts = timeval_to_system_time(10, 500_000);
        assert_eq!(
            ts.duration_since(UNIX_EPOCH).unwrap(),
            Duration::from_millis(10_500)
        );
    }

    #[test]
    fn test_link_type_for_supported_dlts() {
        assert_eq!(link_type_for("eth0", 1).unwrap(), LinkType::Ethernet);
        assert_eq!(link_type_for("any", 113).unwrap(), LinkType::LinuxSll);
    }

    #[test]
    fn test_link_type_for_unsupported_dlt_names_interface() {
        // Act: DLT_NULL (BSD loopback)
        let result = link_type_for("lo0", 0);

        // Assert
        assert!(matches!(
            result,
            Err(CaptureError::UnsupportedLinkType { ref interface, dlt: 0 }) if interface == "lo0"
        ));
    }

    #[test]
    fn test_event_from_syn_frame() {
        // Arrange
        let frame = ethernet_tcp_frame(2525, 0x02);
        let ts = UNIX_EPOCH + Duration::from_secs(42);

        // Act
        let event = event_from_frame(LinkType::Ethernet, 2525, &frame, 74, ts, "eth0");

        // Assert
        let event = event.expect("SYN to the monitored port must yield an event");
        assert_eq!(event.source_port, 40000);
        assert_eq!(event.destination_port, 2525);
        assert_eq!(event.frame_len, 74);
        assert_eq!(event.timestamp, ts);
    }

    #[test]
    fn test_event_from_syn_ack_frame_is_skipped() {
        let frame = ethernet_tcp_frame(2525, 0x12);
        let event = event_from_frame(LinkType::Ethernet, 2525, &frame, 74, UNIX_EPOCH, "eth0");
        assert!(event.is_none());
    }

    #[test]
    fn test_event_from_syn_to_other_port_is_skipped() {
        let frame = ethernet_tcp_frame(80, 0x02);
        let event = event_from_frame(LinkType::Ethernet, 2525, &frame, 74, UNIX_EPOCH, "eth0");
        assert!(event.is_none());
    }

    #[test]
    fn test_event_from_truncated_frame_is_skipped() {
        let event = event_from_frame(LinkType::Ethernet, 2525, &[0u8; 10], 10, UNIX_EPOCH, "eth0");
        assert!(event.is_none());
    }

    #[test]
    fn test_read_timeout_is_an_idle_observation() {
        let result = idle_or_lost("eth0", pcap::Error::TimeoutExpired);
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn test_other_pcap_errors_lose_the_capture() {
        // Act
        let result = idle_or_lost("eth0", pcap::Error::NoMorePackets);

        // Assert
        assert!(matches!(
            result,
            Err(CaptureError::Lost { ref interface, .. }) if interface == "eth0"
        ));
    }
}
