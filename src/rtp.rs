//! RTP packet primitives shared by the codec encoders.

use std::time::Duration;

use rand::Rng;

/// RTP version emitted in every header.
pub const RTP_VERSION: u8 = 2;

/// Default payload ceiling:
/// 1500 (UDP MTU) - 20 (IP header) - 8 (UDP header) - 12 (RTP header).
pub const DEFAULT_PAYLOAD_MAX_SIZE: usize = 1460;

/// RTP fixed header (RFC 3550 §5.1) field values.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             SSRC                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The encoders fill every field with its exact wire value; padding,
/// extension, and CSRC count are always 0. The `marker` bit is set on the
/// last packet of an access unit or frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpHeader {
    /// Always [`RTP_VERSION`].
    pub version: u8,
    /// End-of-access-unit / end-of-frame flag (RFC 3550 §5.1).
    pub marker: bool,
    /// RTP payload type (7-bit, RFC 3551).
    pub payload_type: u8,
    /// 16-bit sequence number, wrapping.
    pub sequence_number: u16,
    /// 32-bit media-clock timestamp.
    pub timestamp: u32,
    /// Synchronization source identifier (RFC 3550 §8.1).
    pub ssrc: u32,
}

impl RtpHeader {
    /// Serialize the 12-byte RTP fixed header.
    pub fn marshal(&self) -> [u8; 12] {
        let mut header = [0u8; 12];
        header[0] = self.version << 6;
        header[1] = ((self.marker as u8) << 7) | self.payload_type;
        header[2..4].copy_from_slice(&self.sequence_number.to_be_bytes());
        header[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        header[8..12].copy_from_slice(&self.ssrc.to_be_bytes());
        header
    }
}

/// One outgoing RTP packet: exact header field values plus an owned payload.
///
/// Payload buffers are independently allocated; they never alias other
/// packets or the caller's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    pub header: RtpHeader,
    pub payload: Vec<u8>,
}

impl RtpPacket {
    /// Serialize header and payload into one wire-ready buffer.
    pub fn marshal(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(12 + self.payload.len());
        buf.extend_from_slice(&self.header.marshal());
        buf.extend_from_slice(&self.payload);
        buf
    }
}

/// 32-bit random used for unset defaults.
///
/// Per RFC 3550 §8.1 the SSRC should be chosen randomly to minimize the
/// probability of collisions between independent sessions; sequence numbers
/// and timestamps start random per §5.1.
pub(crate) fn random_u32() -> u32 {
    rand::rng().random::<u32>()
}

/// Map a presentation timestamp onto the 32-bit RTP media clock.
///
/// `timestamp = initial_timestamp + round(pts_seconds * clock_rate)`,
/// wrapping modulo 2^32.
pub(crate) fn encode_timestamp(initial_timestamp: u32, clock_rate: u32, pts: Duration) -> u32 {
    let ticks = (pts.as_secs_f64() * f64::from(clock_rate)).round() as u64;
    initial_timestamp.wrapping_add(ticks as u32)
}

/// Assemble one outgoing packet and post-increment the sequence counter.
///
/// Encoders allocate sequence numbers through this helper from a local
/// counter and commit the counter back only when the whole call succeeds.
pub(crate) fn next_packet(
    payload_type: u8,
    ssrc: u32,
    sequence_number: &mut u16,
    timestamp: u32,
    marker: bool,
    payload: Vec<u8>,
) -> RtpPacket {
    let packet = RtpPacket {
        header: RtpHeader {
            version: RTP_VERSION,
            marker,
            payload_type,
            sequence_number: *sequence_number,
            timestamp,
            ssrc,
        },
        payload,
    };
    *sequence_number = sequence_number.wrapping_add(1);
    packet
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_header(marker: bool) -> RtpHeader {
        RtpHeader {
            version: RTP_VERSION,
            marker,
            payload_type: 96,
            sequence_number: 0x1234,
            timestamp: 0x0102_0304,
            ssrc: 0xAABB_CCDD,
        }
    }

    #[test]
    fn version_is_2() {
        let buf = make_header(false).marshal();
        assert_eq!(buf[0] >> 6, 2);
    }

    #[test]
    fn marker_bit() {
        let no_marker = make_header(false).marshal();
        assert_eq!(no_marker[1] & 0x80, 0);

        let with_marker = make_header(true).marshal();
        assert_eq!(with_marker[1] & 0x80, 0x80);
    }

    #[test]
    fn payload_type() {
        let buf = make_header(false).marshal();
        assert_eq!(buf[1] & 0x7f, 96);
    }

    #[test]
    fn sequence_big_endian() {
        let buf = make_header(false).marshal();
        assert_eq!(u16::from_be_bytes([buf[2], buf[3]]), 0x1234);
    }

    #[test]
    fn timestamp_big_endian() {
        let buf = make_header(false).marshal();
        assert_eq!(u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]), 0x0102_0304);
    }

    #[test]
    fn ssrc_written() {
        let buf = make_header(false).marshal();
        assert_eq!(u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]), 0xAABB_CCDD);
    }

    #[test]
    fn packet_marshal_appends_payload() {
        let packet = RtpPacket {
            header: make_header(true),
            payload: vec![0xDE, 0xAD, 0xBE, 0xEF],
        };
        let buf = packet.marshal();
        assert_eq!(buf.len(), 16);
        assert_eq!(&buf[12..], &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn timestamp_at_zero_pts_is_initial() {
        assert_eq!(encode_timestamp(0x8877_6655, 90_000, Duration::ZERO), 0x8877_6655);
    }

    #[test]
    fn timestamp_advances_with_clock_rate() {
        assert_eq!(encode_timestamp(1000, 90_000, Duration::from_secs(1)), 91_000);
        assert_eq!(encode_timestamp(1000, 90_000, Duration::from_millis(500)), 46_000);
        assert_eq!(encode_timestamp(0, 48_000, Duration::from_secs(2)), 96_000);
    }

    #[test]
    fn timestamp_wraps_modulo_32_bits() {
        let ts = encode_timestamp(u32::MAX - 10, 90_000, Duration::from_secs(1));
        assert_eq!(ts, 90_000u32.wrapping_sub(11));
    }

    #[test]
    fn next_packet_advances_sequence() {
        let mut seq = u16::MAX;
        let first = next_packet(96, 1, &mut seq, 0, false, vec![]);
        let second = next_packet(96, 1, &mut seq, 0, true, vec![]);
        assert_eq!(first.header.sequence_number, u16::MAX);
        assert_eq!(second.header.sequence_number, 0);
        assert_eq!(seq, 1);
    }

    #[test]
    fn random_values_differ() {
        assert_ne!(random_u32(), random_u32());
    }
}
