//! # rtp-payload — RTP payload-format packetizers
//!
//! A library of per-codec RTP payload encoders for live media servers.
//! Each encoder turns codec-level units (H.264 NAL units, AAC access
//! units, VP9 frames) into an ordered list of RTP packets that conforms
//! to the codec's payload-format specification, handling MTU-bounded
//! fragmentation, aggregation, and sequence/timestamp bookkeeping.
//!
//! ## Protocol references
//!
//! | Document | Topic | How this crate uses it |
//! |----------|-------|------------------------|
//! | [RFC 3550](https://tools.ietf.org/html/rfc3550) | RTP | Header field semantics, SSRC generation, sequence/timestamp rules |
//! | [RFC 6184](https://tools.ietf.org/html/rfc6184) | H.264 RTP payload | Single NAL unit, STAP-A aggregation, FU-A fragmentation |
//! | [RFC 3640](https://tools.ietf.org/html/rfc3640) | MPEG-4 elementary streams | AU-headers region, AAC-hbr aggregation and fragmentation |
//! | [draft-ietf-payload-vp9](https://datatracker.ietf.org/doc/draft-ietf-payload-vp9/) | VP9 RTP payload | Payload descriptor, picture ID, frame boundary flags |
//!
//! ## Usage
//!
//! Encoders are created from a configuration record whose unset fields
//! are filled with defaults (random SSRC/sequence/timestamp, 1460-byte
//! payload ceiling) at [`init`](H264EncoderConfig::init) time:
//!
//! ```
//! use std::time::Duration;
//! use rtp_payload::H264EncoderConfig;
//!
//! let mut encoder = H264EncoderConfig::new(96).init();
//! let nalus: &[&[u8]] = &[&[0x65, 0x88, 0x84, 0x00]];
//! let packets = encoder.encode(nalus, Duration::ZERO).unwrap();
//! for packet in &packets {
//!     // hand packet.marshal() to the transport
//!     let _wire = packet.marshal();
//! }
//! ```
//!
//! Encoders are single-owner stateful objects: a concurrent server wraps
//! each one in a per-stream owner and serializes `encode` calls. Within
//! one call, packets are returned in transmission order, share one
//! timestamp, and carry the marker bit on the last packet only; across
//! calls, sequence numbers are strictly monotonic modulo 2^16.
//!
//! ## Crate layout
//!
//! - [`rtp`] — [`RtpHeader`] / [`RtpPacket`] value types and header serialization.
//! - [`h264`] — [`H264Encoder`] and its configuration.
//! - [`aac`] — [`AacEncoder`] and its configuration.
//! - [`vp9`] — [`Vp9Encoder`] and its configuration.
//! - [`error`] — [`PayloadError`] enum and [`Result`] alias.

pub mod aac;
pub mod error;
pub mod h264;
pub mod rtp;
pub mod vp9;

pub use aac::{AacEncoder, AacEncoderConfig};
pub use error::{PayloadError, Result};
pub use h264::{H264Encoder, H264EncoderConfig};
pub use rtp::{RtpHeader, RtpPacket, DEFAULT_PAYLOAD_MAX_SIZE};
pub use vp9::{Vp9Encoder, Vp9EncoderConfig};
