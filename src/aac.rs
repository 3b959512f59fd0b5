//! AAC RTP payload encoder — RFC 3640, AAC-hbr mode.
//!
//! Packet payload layout:
//!
//! ```text
//! [AU-headers-length: 16-bit big-endian bit count of the AU-headers region]
//! [AU-headers: bit-packed, zero-padded to a byte boundary]
//!   first header : [AU-size : size_length bits] [AU-index : index_length bits]
//!   subsequent   : [AU-size : size_length bits] [AU-index-delta : index_delta_length bits]
//! [access units, concatenated in order]
//! ```
//!
//! Access units are accumulated greedily into aggregation batches; a single
//! access unit that cannot fit one packet is split into fixed-size chunks,
//! each fragment carrying its own AU-headers region whose AU-size field
//! holds the chunk size.

use std::time::Duration;

use bitstream_io::{BigEndian, BitWrite, BitWriter};

use crate::error::{PayloadError, Result};
use crate::rtp::{self, RtpPacket, DEFAULT_PAYLOAD_MAX_SIZE};

const DEFAULT_SIZE_LENGTH: u32 = 13;
const DEFAULT_INDEX_LENGTH: u32 = 3;
const DEFAULT_INDEX_DELTA_LENGTH: u32 = 3;

/// Configuration for an [`AacEncoder`].
///
/// Unset fields are filled with defaults by [`init`](Self::init); set
/// fields are preserved byte-exact.
#[derive(Debug, Clone)]
pub struct AacEncoderConfig {
    /// RTP payload type (dynamic range, typically 96-127).
    pub payload_type: u8,
    /// Sample rate of the stream; doubles as the RTP clock rate.
    pub sample_rate: u32,
    /// SSRC of emitted packets. Defaults to a random value.
    pub ssrc: Option<u32>,
    /// Sequence number of the first emitted packet. Defaults to a random value.
    pub initial_sequence_number: Option<u16>,
    /// RTP timestamp corresponding to a zero PTS. Defaults to a random value.
    pub initial_timestamp: Option<u32>,
    /// Maximum bytes of RTP payload per packet.
    /// Defaults to [`DEFAULT_PAYLOAD_MAX_SIZE`].
    pub payload_max_size: Option<usize>,
    /// Bits of the AU-size field in every AU-header. Defaults to 13.
    pub size_length: Option<u32>,
    /// Bits of the AU-Index field in the first AU-header. Defaults to 3.
    pub index_length: Option<u32>,
    /// Bits of the AU-Index-delta field in non-first AU-headers. Defaults to 3.
    pub index_delta_length: Option<u32>,
}

impl AacEncoderConfig {
    /// Configuration with the given payload type and sample rate, every
    /// optional field unset.
    pub fn new(payload_type: u8, sample_rate: u32) -> Self {
        Self {
            payload_type,
            sample_rate,
            ssrc: None,
            initial_sequence_number: None,
            initial_timestamp: None,
            payload_max_size: None,
            size_length: None,
            index_length: None,
            index_delta_length: None,
        }
    }

    /// Materialize an encoder, filling unset fields and priming the
    /// sequence counter.
    pub fn init(&self) -> AacEncoder {
        let ssrc = self.ssrc.unwrap_or_else(rtp::random_u32);
        let initial_sequence_number = self
            .initial_sequence_number
            .unwrap_or_else(|| rtp::random_u32() as u16);

        tracing::debug!(
            payload_type = self.payload_type,
            sample_rate = self.sample_rate,
            ssrc = format_args!("{:#010X}", ssrc),
            "AAC encoder initialized"
        );

        AacEncoder {
            payload_type: self.payload_type,
            sample_rate: self.sample_rate,
            ssrc,
            initial_timestamp: self.initial_timestamp.unwrap_or_else(rtp::random_u32),
            payload_max_size: self.payload_max_size.unwrap_or(DEFAULT_PAYLOAD_MAX_SIZE),
            size_length: self.size_length.unwrap_or(DEFAULT_SIZE_LENGTH),
            index_length: self.index_length.unwrap_or(DEFAULT_INDEX_LENGTH),
            index_delta_length: self.index_delta_length.unwrap_or(DEFAULT_INDEX_DELTA_LENGTH),
            sequence_number: initial_sequence_number,
        }
    }
}

/// Stateful AAC packetizer.
///
/// One instance per stream; the owner must serialize `encode` calls.
#[derive(Debug)]
pub struct AacEncoder {
    payload_type: u8,
    sample_rate: u32,
    ssrc: u32,
    initial_timestamp: u32,
    payload_max_size: usize,
    size_length: u32,
    index_length: u32,
    index_delta_length: u32,
    sequence_number: u16,
}

impl AacEncoder {
    /// Packetize access units into RTP packets, starting at `pts`.
    ///
    /// Each aggregation batch becomes one packet; an access unit larger
    /// than the payload ceiling becomes a fragment sequence. Packets of a
    /// later batch carry a timestamp advanced by the number of access
    /// units already emitted. The marker bit is set on the last packet
    /// only. On error, nothing is emitted and the sequence counter does
    /// not advance.
    pub fn encode(&mut self, aus: &[&[u8]], pts: Duration) -> Result<Vec<RtpPacket>> {
        if self.sample_rate == 0 {
            return Err(PayloadError::MissingSampleRate);
        }
        if aus.is_empty() {
            return Ok(Vec::new());
        }

        let mut packets = Vec::new();
        let mut seq = self.sequence_number;
        let mut pts = pts;

        let mut batch: Vec<&[u8]> = Vec::new();
        for &au in aus {
            if batch.is_empty() || self.aggregated_len(&batch, Some(au)) <= self.payload_max_size {
                batch.push(au);
            } else {
                self.write_batch(&batch, pts, false, &mut seq, &mut packets)?;
                pts += Duration::from_secs_f64(batch.len() as f64 / f64::from(self.sample_rate));
                batch.clear();
                batch.push(au);
            }
        }
        self.write_batch(&batch, pts, true, &mut seq, &mut packets)?;

        self.sequence_number = seq;

        tracing::trace!(
            aus = aus.len(),
            packets = packets.len(),
            "access units packetized"
        );

        Ok(packets)
    }

    /// Projected packet length of `aus` (plus optionally one more unit)
    /// encoded as a single aggregation packet.
    fn aggregated_len(&self, aus: &[&[u8]], add: Option<&[u8]>) -> usize {
        let mut header_bits = 0usize;
        let mut data_len = 0usize;
        for (i, au) in aus.iter().copied().chain(add).enumerate() {
            header_bits += if i == 0 {
                (self.size_length + self.index_length) as usize
            } else {
                (self.size_length + self.index_delta_length) as usize
            };
            data_len += au.len();
        }
        2 + header_bits.div_ceil(8) + data_len
    }

    fn write_batch(
        &self,
        aus: &[&[u8]],
        pts: Duration,
        last: bool,
        seq: &mut u16,
        out: &mut Vec<RtpPacket>,
    ) -> Result<()> {
        if let [au] = aus {
            if self.aggregated_len(aus, None) > self.payload_max_size {
                return self.write_fragmented(au, pts, last, seq, out);
            }
        }
        self.write_aggregated(aus, pts, last, seq, out)
    }

    /// One packet carrying the whole batch behind a shared AU-headers region.
    fn write_aggregated(
        &self,
        aus: &[&[u8]],
        pts: Duration,
        last: bool,
        seq: &mut u16,
        out: &mut Vec<RtpPacket>,
    ) -> Result<()> {
        let sizes: Vec<usize> = aus.iter().map(|au| au.len()).collect();
        let (header_bits, headers) = self.au_headers(&sizes)?;

        let mut payload = Vec::with_capacity(self.aggregated_len(aus, None));
        payload.extend_from_slice(&header_bits.to_be_bytes());
        payload.extend_from_slice(&headers);
        for au in aus {
            payload.extend_from_slice(au);
        }

        let timestamp = rtp::encode_timestamp(self.initial_timestamp, self.sample_rate, pts);
        out.push(self.packet(seq, timestamp, last, payload));
        Ok(())
    }

    /// Split one oversized access unit into equal chunks, each behind its
    /// own single-entry AU-headers region. The AU-size field of every
    /// fragment holds the chunk size, index 0.
    fn write_fragmented(
        &self,
        au: &[u8],
        pts: Duration,
        last: bool,
        seq: &mut u16,
        out: &mut Vec<RtpPacket>,
    ) -> Result<()> {
        let header_len = ((self.size_length + self.index_length) as usize).div_ceil(8);
        let max_chunk = match self.payload_max_size.checked_sub(2 + header_len) {
            Some(n) if n > 0 => n,
            _ => {
                return Err(PayloadError::PayloadSizeTooSmall {
                    limit: self.payload_max_size,
                    min: 2 + header_len + 1,
                })
            }
        };

        let timestamp = rtp::encode_timestamp(self.initial_timestamp, self.sample_rate, pts);

        let mut chunks = au.chunks(max_chunk).peekable();
        while let Some(chunk) = chunks.next() {
            let (header_bits, headers) = self.au_headers(&[chunk.len()])?;

            let mut payload = Vec::with_capacity(2 + headers.len() + chunk.len());
            payload.extend_from_slice(&header_bits.to_be_bytes());
            payload.extend_from_slice(&headers);
            payload.extend_from_slice(chunk);

            let last_fragment = chunks.peek().is_none();
            out.push(self.packet(seq, timestamp, last && last_fragment, payload));
        }

        tracing::trace!(
            au_size = au.len(),
            fragments = au.len().div_ceil(max_chunk),
            "fragmented access unit"
        );

        Ok(())
    }

    /// Bit-pack the AU-headers region for the given AU sizes.
    ///
    /// Returns the region's bit count (the AU-headers-length field value)
    /// and its byte-padded encoding. AU-index and AU-index-delta are always
    /// 0: units are consecutive and never interleaved.
    fn au_headers(&self, sizes: &[usize]) -> Result<(u16, Vec<u8>)> {
        let mut writer = BitWriter::endian(Vec::new(), BigEndian);
        let mut bits = 0u32;
        for (i, &size) in sizes.iter().enumerate() {
            if size >= 1usize << self.size_length {
                return Err(PayloadError::OversizedAccessUnit {
                    size,
                    bits: self.size_length,
                });
            }
            writer.write(self.size_length, size as u32)?;

            let index_bits = if i == 0 {
                self.index_length
            } else {
                self.index_delta_length
            };
            writer.write(index_bits, 0u32)?;
            bits += self.size_length + index_bits;
        }
        writer.byte_align()?;
        Ok((bits as u16, writer.into_writer()))
    }

    fn packet(&self, seq: &mut u16, timestamp: u32, marker: bool, payload: Vec<u8>) -> RtpPacket {
        rtp::next_packet(self.payload_type, self.ssrc, seq, timestamp, marker, payload)
    }
}
