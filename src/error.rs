//! Error types for the GPR codec core.

use thiserror::Error;

/// Result type for GPR codec operations.
pub type Result<T> = std::result::Result<T, GprError>;

/// Errors that can occur while encoding or decoding a GPR/VC-5 bitstream.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum GprError {
  /// The injected allocator reported failure.
  #[error("allocator failed to satisfy a request for {0} bytes")]
  Memory(usize),

  /// A bit- or byte-level read ran past the end of the underlying buffer.
  #[error("bitstream underflow while performing {0}")]
  BitstreamUnderflow(&'static str),

  /// A write could not be satisfied because the output buffer could not grow.
  #[error("bitstream overflow while performing {0}")]
  BitstreamOverflow(&'static str),

  /// The first 32 bits of a decode input were not the VC-5 start marker.
  #[error("missing VC-5 start marker")]
  MissingStartMarker,

  /// An unknown required tag, or an optional tag with an implausible length.
  #[error("bad segment: tag {0}")]
  BadSegment(i16),

  /// A header parameter tag was seen twice in one bitstream.
  #[error("duplicate header parameter: tag {0}")]
  DuplicateHeaderParameter(i16),

  /// A non-header tag was seen before all required header tags.
  #[error("missing header parameter before tag {0}")]
  MissingHeaderParameter(i16),

  /// ImageFormat/pattern/components-per-sample didn't match the Bayer RAW profile.
  #[error("bad image format: {0}")]
  BadImageFormat(&'static str),

  /// Lowpass precision outside [8, 16].
  #[error("bad lowpass precision: {0}")]
  BadLowpassPrecision(u32),

  /// VLC parse failed to match any codebook entry.
  #[error("no codebook entry matched the bit pattern")]
  NotFoundInCodebook,

  /// A highpass subband ended without its band-end marker.
  #[error("highpass subband ended without a band-end marker")]
  MissingBandEnd,

  /// Unknown/unsupported packed Bayer pixel format.
  #[error("unsupported pixel format")]
  UnsupportedPixelFormat,

  /// Requested RGB output resolution isn't one of the five supported steps.
  #[error("unsupported output resolution")]
  UnsupportedResolution,
}
