//! Error types for the payload packetization library.

/// Errors that can occur while packetizing codec units into RTP packets.
///
/// Variants map to specific failure modes across the encoders:
///
/// - **Configuration**: [`MissingSampleRate`](Self::MissingSampleRate),
///   [`PayloadSizeTooSmall`](Self::PayloadSizeTooSmall).
/// - **Input**: [`EmptyNalu`](Self::EmptyNalu),
///   [`EmptyFrame`](Self::EmptyFrame),
///   [`OversizedAccessUnit`](Self::OversizedAccessUnit).
///
/// An error aborts the current `encode` call before any packet is committed:
/// nothing is emitted and the encoder's sequence counter is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// Underlying writer error while bit-packing header regions.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A zero-length NAL unit was passed to the H.264 encoder; the first
    /// byte must carry the F/NRI/type fields.
    #[error("NAL unit is empty")]
    EmptyNalu,

    /// A zero-length frame was passed to the VP9 encoder.
    #[error("frame is empty")]
    EmptyFrame,

    /// The AAC encoder requires a non-zero sample rate.
    #[error("sample rate is not set")]
    MissingSampleRate,

    /// `payload_max_size` is below the minimum framing overhead of the
    /// chosen payload format.
    #[error("payload size limit {limit} is below the format minimum of {min}")]
    PayloadSizeTooSmall { limit: usize, min: usize },

    /// An access unit is too large for the configured AU-size field width.
    #[error("access unit of {size} bytes does not fit in a {bits}-bit AU-size field")]
    OversizedAccessUnit { size: usize, bits: u32 },
}

/// Convenience alias for `Result<T, PayloadError>`.
pub type Result<T> = std::result::Result<T, PayloadError>;
