//! VP9 RTP payload encoder — draft-ietf-payload-vp9.
//!
//! Each packet payload starts with a 3-byte descriptor: a flags octet and
//! a 15-bit extended picture ID. The frame bytes follow, split across as
//! many packets as the payload ceiling requires; the B and E flags delimit
//! the first and last packet of the frame.

use std::time::Duration;

use crate::error::{PayloadError, Result};
use crate::rtp::{self, RtpPacket, DEFAULT_PAYLOAD_MAX_SIZE};

/// RTP clock rate for VP9.
pub const CLOCK_RATE: u32 = 90_000;

/// Flags octet + 2-byte extended picture ID.
const DESCRIPTOR_SIZE: usize = 3;

/// Configuration for a [`Vp9Encoder`].
///
/// Unset fields are filled with defaults by [`init`](Self::init); set
/// fields are preserved byte-exact.
#[derive(Debug, Clone)]
pub struct Vp9EncoderConfig {
    /// RTP payload type (dynamic range, typically 96-127).
    pub payload_type: u8,
    /// SSRC of emitted packets. Defaults to a random value.
    pub ssrc: Option<u32>,
    /// Sequence number of the first emitted packet. Defaults to a random value.
    pub initial_sequence_number: Option<u16>,
    /// RTP timestamp corresponding to a zero PTS. Defaults to a random value.
    pub initial_timestamp: Option<u32>,
    /// Picture ID of the first frame, reduced to the 15-bit field width.
    /// Defaults to a random value.
    pub initial_picture_id: Option<u16>,
    /// Maximum bytes of RTP payload per packet.
    /// Defaults to [`DEFAULT_PAYLOAD_MAX_SIZE`].
    pub payload_max_size: Option<usize>,
}

impl Vp9EncoderConfig {
    /// Configuration with the given payload type and every optional field unset.
    pub fn new(payload_type: u8) -> Self {
        Self {
            payload_type,
            ssrc: None,
            initial_sequence_number: None,
            initial_timestamp: None,
            initial_picture_id: None,
            payload_max_size: None,
        }
    }

    /// Materialize an encoder, filling unset fields and priming the
    /// sequence counter and picture ID.
    pub fn init(&self) -> Vp9Encoder {
        let ssrc = self.ssrc.unwrap_or_else(rtp::random_u32);
        let initial_sequence_number = self
            .initial_sequence_number
            .unwrap_or_else(|| rtp::random_u32() as u16);
        let picture_id = self
            .initial_picture_id
            .unwrap_or_else(|| rtp::random_u32() as u16)
            & 0x7fff;

        tracing::debug!(
            payload_type = self.payload_type,
            ssrc = format_args!("{:#010X}", ssrc),
            picture_id,
            "VP9 encoder initialized"
        );

        Vp9Encoder {
            payload_type: self.payload_type,
            ssrc,
            initial_timestamp: self.initial_timestamp.unwrap_or_else(rtp::random_u32),
            payload_max_size: self.payload_max_size.unwrap_or(DEFAULT_PAYLOAD_MAX_SIZE),
            picture_id,
            sequence_number: initial_sequence_number,
        }
    }
}

/// Stateful VP9 packetizer.
///
/// One instance per stream; the owner must serialize `encode` calls.
#[derive(Debug)]
pub struct Vp9Encoder {
    payload_type: u8,
    ssrc: u32,
    initial_timestamp: u32,
    payload_max_size: usize,
    picture_id: u16,
    sequence_number: u16,
}

impl Vp9Encoder {
    /// Packetize one VP9 frame into RTP packets.
    ///
    /// All packets share the timestamp derived from `pts`; the marker bit
    /// and the E flag are set on the last packet, the B flag on the first.
    /// The picture ID advances by one per successful call, modulo 2^15.
    /// On error, nothing is emitted and no state advances.
    pub fn encode(&mut self, frame: &[u8], pts: Duration) -> Result<Vec<RtpPacket>> {
        if frame.is_empty() {
            return Err(PayloadError::EmptyFrame);
        }
        if self.payload_max_size <= DESCRIPTOR_SIZE {
            return Err(PayloadError::PayloadSizeTooSmall {
                limit: self.payload_max_size,
                min: DESCRIPTOR_SIZE + 1,
            });
        }

        let timestamp = rtp::encode_timestamp(self.initial_timestamp, CLOCK_RATE, pts);
        let max_chunk = self.payload_max_size - DESCRIPTOR_SIZE;
        let mut packets = Vec::with_capacity(frame.len().div_ceil(max_chunk));
        let mut seq = self.sequence_number;

        let mut chunks = frame.chunks(max_chunk).peekable();
        let mut first = true;
        while let Some(chunk) = chunks.next() {
            let last_chunk = chunks.peek().is_none();

            // I=1: 15-bit picture ID follows. F=1: flexible mode, with no
            // reference indices since P=0. B and E delimit the frame.
            let mut flags = 0x90u8;
            if first {
                flags |= 0x08;
            }
            if last_chunk {
                flags |= 0x04;
            }

            let mut payload = Vec::with_capacity(DESCRIPTOR_SIZE + chunk.len());
            payload.push(flags);
            payload.push(0x80 | (self.picture_id >> 8) as u8);
            payload.push(self.picture_id as u8);
            payload.extend_from_slice(chunk);

            packets.push(rtp::next_packet(
                self.payload_type,
                self.ssrc,
                &mut seq,
                timestamp,
                last_chunk,
                payload,
            ));
            first = false;
        }

        tracing::trace!(
            frame_size = frame.len(),
            packets = packets.len(),
            picture_id = self.picture_id,
            "frame packetized"
        );

        self.sequence_number = seq;
        self.picture_id = (self.picture_id + 1) & 0x7fff;
        Ok(packets)
    }
}
