//! H.264 RTP payload encoder — RFC 6184.
//!
//! Converts an ordered list of NAL units into RTP packets, choosing among
//! three framing modes per batch:
//!
//! - **Single NAL unit** (§5.6): the payload is the NAL unit verbatim.
//! - **STAP-A** (§5.7.1, type 24): several NAL units aggregated into one
//!   packet, each prefixed with a big-endian 16-bit size.
//! - **FU-A** (§5.8, type 28): one NAL unit split across packets, the
//!   original header byte replaced by an FU indicator + FU header pair.
//!
//! NAL units are accumulated greedily: a unit joins the pending batch as
//! long as the STAP-A rendition of the batch stays within the payload
//! ceiling, otherwise the batch is flushed and a new one starts.

use std::time::Duration;

use crate::error::{PayloadError, Result};
use crate::rtp::{self, RtpPacket, DEFAULT_PAYLOAD_MAX_SIZE};

/// RTP clock rate for H.264 (RFC 6184 §8.2.1).
pub const CLOCK_RATE: u32 = 90_000;

const STAP_A: u8 = 24;
const FU_A: u8 = 28;

/// Smallest accepted payload ceiling: FU indicator, FU header, and at
/// least one fragment byte per packet.
const MIN_PAYLOAD_MAX_SIZE: usize = 4;

/// Configuration for an [`H264Encoder`].
///
/// Unset fields are filled with defaults by [`init`](Self::init); set
/// fields are preserved byte-exact.
#[derive(Debug, Clone)]
pub struct H264EncoderConfig {
    /// RTP payload type (dynamic range, typically 96-127).
    pub payload_type: u8,
    /// SSRC of emitted packets. Defaults to a random value.
    pub ssrc: Option<u32>,
    /// Sequence number of the first emitted packet. Defaults to a random value.
    pub initial_sequence_number: Option<u16>,
    /// RTP timestamp corresponding to a zero PTS. Defaults to a random value.
    pub initial_timestamp: Option<u32>,
    /// Maximum bytes of RTP payload per packet.
    /// Defaults to [`DEFAULT_PAYLOAD_MAX_SIZE`].
    pub payload_max_size: Option<usize>,
}

impl H264EncoderConfig {
    /// Configuration with the given payload type and every optional field unset.
    pub fn new(payload_type: u8) -> Self {
        Self {
            payload_type,
            ssrc: None,
            initial_sequence_number: None,
            initial_timestamp: None,
            payload_max_size: None,
        }
    }

    /// Materialize an encoder, filling unset fields and priming the
    /// sequence counter.
    pub fn init(&self) -> H264Encoder {
        let ssrc = self.ssrc.unwrap_or_else(rtp::random_u32);
        let initial_sequence_number = self
            .initial_sequence_number
            .unwrap_or_else(|| rtp::random_u32() as u16);

        tracing::debug!(
            payload_type = self.payload_type,
            ssrc = format_args!("{:#010X}", ssrc),
            "H.264 encoder initialized"
        );

        H264Encoder {
            payload_type: self.payload_type,
            ssrc,
            initial_timestamp: self.initial_timestamp.unwrap_or_else(rtp::random_u32),
            payload_max_size: self.payload_max_size.unwrap_or(DEFAULT_PAYLOAD_MAX_SIZE),
            sequence_number: initial_sequence_number,
        }
    }
}

/// Stateful H.264 packetizer.
///
/// One instance per stream; the owner must serialize `encode` calls.
#[derive(Debug)]
pub struct H264Encoder {
    payload_type: u8,
    ssrc: u32,
    initial_timestamp: u32,
    payload_max_size: usize,
    sequence_number: u16,
}

impl H264Encoder {
    /// Packetize one access unit's NAL units into RTP packets.
    ///
    /// All packets share the timestamp derived from `pts`; the marker bit
    /// is set on the last packet only. An empty `nalus` list yields no
    /// packets. On error, nothing is emitted and the sequence counter does
    /// not advance.
    pub fn encode(&mut self, nalus: &[&[u8]], pts: Duration) -> Result<Vec<RtpPacket>> {
        if nalus.is_empty() {
            return Ok(Vec::new());
        }
        if self.payload_max_size < MIN_PAYLOAD_MAX_SIZE {
            return Err(PayloadError::PayloadSizeTooSmall {
                limit: self.payload_max_size,
                min: MIN_PAYLOAD_MAX_SIZE,
            });
        }
        if nalus.iter().any(|nalu| nalu.is_empty()) {
            return Err(PayloadError::EmptyNalu);
        }

        let timestamp = rtp::encode_timestamp(self.initial_timestamp, CLOCK_RATE, pts);
        let mut packets = Vec::new();
        let mut seq = self.sequence_number;

        let mut batch: Vec<&[u8]> = Vec::new();
        for &nalu in nalus {
            if batch.is_empty()
                || self.aggregated_len(&batch) + 2 + nalu.len() <= self.payload_max_size
            {
                batch.push(nalu);
            } else {
                self.write_batch(&batch, timestamp, false, &mut seq, &mut packets);
                batch.clear();
                batch.push(nalu);
            }
        }
        self.write_batch(&batch, timestamp, true, &mut seq, &mut packets);

        self.sequence_number = seq;

        tracing::trace!(
            nalus = nalus.len(),
            packets = packets.len(),
            "access unit packetized"
        );

        Ok(packets)
    }

    /// STAP-A encoded length of `batch`: type octet plus a 16-bit size
    /// prefix per contained unit.
    fn aggregated_len(&self, batch: &[&[u8]]) -> usize {
        1 + batch.iter().map(|nalu| 2 + nalu.len()).sum::<usize>()
    }

    fn write_batch(
        &self,
        batch: &[&[u8]],
        timestamp: u32,
        last: bool,
        seq: &mut u16,
        out: &mut Vec<RtpPacket>,
    ) {
        match batch {
            [nalu] if nalu.len() <= self.payload_max_size => {
                self.write_single(nalu, timestamp, last, seq, out)
            }
            [nalu] => self.write_fragmented(nalu, timestamp, last, seq, out),
            _ => self.write_aggregated(batch, timestamp, last, seq, out),
        }
    }

    fn write_single(
        &self,
        nalu: &[u8],
        timestamp: u32,
        last: bool,
        seq: &mut u16,
        out: &mut Vec<RtpPacket>,
    ) {
        out.push(self.packet(seq, timestamp, last, nalu.to_vec()));
    }

    /// Split one oversized NAL unit into an FU-A sequence (RFC 6184 §5.8).
    ///
    /// The original 1-byte header is consumed: its F/NRI bits move into the
    /// FU indicator, its type into every FU header.
    fn write_fragmented(
        &self,
        nalu: &[u8],
        timestamp: u32,
        last: bool,
        seq: &mut u16,
        out: &mut Vec<RtpPacket>,
    ) {
        let fu_indicator = (nalu[0] & 0xe0) | FU_A;
        let nal_type = nalu[0] & 0x1f;
        let body = &nalu[1..];

        let max_fragment = self.payload_max_size - 2;
        let mut chunks = body.chunks(max_fragment).peekable();
        let mut first = true;
        while let Some(chunk) = chunks.next() {
            let last_fragment = chunks.peek().is_none();

            let mut fu_header = nal_type;
            if first {
                fu_header |= 0x80; // S
            }
            if last_fragment {
                fu_header |= 0x40; // E
            }

            let mut payload = Vec::with_capacity(2 + chunk.len());
            payload.push(fu_indicator);
            payload.push(fu_header);
            payload.extend_from_slice(chunk);

            out.push(self.packet(seq, timestamp, last && last_fragment, payload));
            first = false;
        }

        tracing::trace!(
            nal_type,
            nal_size = nalu.len(),
            fragments = body.len().div_ceil(max_fragment),
            "FU-A fragmented NAL unit"
        );
    }

    /// Aggregate a batch of NAL units into one STAP-A packet (RFC 6184 §5.7.1).
    fn write_aggregated(
        &self,
        batch: &[&[u8]],
        timestamp: u32,
        last: bool,
        seq: &mut u16,
        out: &mut Vec<RtpPacket>,
    ) {
        let mut payload = Vec::with_capacity(self.aggregated_len(batch));
        // Type octet: F=0, NRI=0.
        payload.push(STAP_A);
        for nalu in batch {
            payload.extend_from_slice(&(nalu.len() as u16).to_be_bytes());
            payload.extend_from_slice(nalu);
        }

        out.push(self.packet(seq, timestamp, last, payload));
    }

    fn packet(&self, seq: &mut u16, timestamp: u32, marker: bool, payload: Vec<u8>) -> RtpPacket {
        rtp::next_packet(self.payload_type, self.ssrc, seq, timestamp, marker, payload)
    }
}
