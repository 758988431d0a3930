//! Codec state: the set of header and per-subband parameters carried
//! across tag-value segments.
//!
//! Header parameters (image geometry, pixel format, precision, camera
//! gains) are required exactly once per bitstream; a repeat is a
//! `DuplicateHeaderParameter` error and a missing one at the point it's
//! needed is a `MissingHeaderParameter` error. Per-subband parameters
//! (subband number, band size, quantization divisor) are expected to
//! repeat once per `LargeCodeblock` and simply overwrite the previous
//! value — the decoder reads them fresh out of each chunk's header
//! rather than inheriting them, but the encoder still routes them
//! through the same struct so both sides agree on field names.

use crate::error::{GprError, Result};
use crate::tagvalue::Tag;

const REQUIRED_HEADER_TAGS: &[Tag] = &[
  Tag::ImageWidth,
  Tag::ImageHeight,
  Tag::PatternWidth,
  Tag::PatternHeight,
  Tag::ComponentsPerSample,
  Tag::BitsPerComponent,
  Tag::PixelFormat,
  Tag::LowpassPrecision,
];

#[derive(Debug, Clone, Copy, Default)]
struct HeaderSeenMask(u32);

impl HeaderSeenMask {
  fn bit(tag: Tag) -> u32 {
    1 << ((tag as i16) as u32 - 1)
  }

  fn mark(&mut self, tag: Tag) -> Result<()> {
    let bit = Self::bit(tag);
    if self.0 & bit != 0 {
      return Err(GprError::DuplicateHeaderParameter(tag as i16));
    }
    self.0 |= bit;
    Ok(())
  }

  fn has(&self, tag: Tag) -> bool {
    self.0 & Self::bit(tag) != 0
  }
}

#[derive(Debug, Clone, Default)]
pub struct CodecState {
  pub image_width: Option<u16>,
  pub image_height: Option<u16>,
  pub pattern_width: Option<u16>,
  pub pattern_height: Option<u16>,
  pub components_per_sample: Option<u16>,
  pub bits_per_component: Option<u16>,
  pub pixel_format: Option<u16>,
  pub lowpass_precision: Option<u16>,
  pub camera_gains: Option<[u16; 3]>,

  pub subband_number: Option<u16>,
  pub band_width: Option<u16>,
  pub band_height: Option<u16>,
  pub quantization: Option<u16>,
  pub lowpass_width: Option<u16>,
  pub lowpass_height: Option<u16>,

  seen: HeaderSeenMask,
  camera_gains_scratch: [u16; 3],
  camera_gains_filled: u8,

  /// Set once any per-subband or chunk-framing tag has been applied.
  /// Header tags are only legal before this point, even on their first
  /// occurrence — a decoder that sees `ImageWidth` after subband data
  /// has already started is reading a corrupt or adversarial stream,
  /// not a legitimately reordered header.
  header_complete: bool,
}

impl CodecState {
  pub fn new() -> Self {
    Self::default()
  }

  /// Apply a decoded (or about-to-be-written) tag-value pair to the
  /// state, enforcing the once-per-bitstream rule for header tags.
  pub fn apply(&mut self, tag: Tag, value: u16) -> Result<()> {
    match tag {
      Tag::ImageWidth => {
        self.check_header_window(tag)?;
        self.seen.mark(tag)?;
        self.image_width = Some(value);
      }
      Tag::ImageHeight => {
        self.check_header_window(tag)?;
        self.seen.mark(tag)?;
        self.image_height = Some(value);
      }
      Tag::PatternWidth => {
        self.check_header_window(tag)?;
        self.seen.mark(tag)?;
        self.pattern_width = Some(value);
      }
      Tag::PatternHeight => {
        self.check_header_window(tag)?;
        self.seen.mark(tag)?;
        self.pattern_height = Some(value);
      }
      Tag::ComponentsPerSample => {
        self.check_header_window(tag)?;
        self.seen.mark(tag)?;
        self.components_per_sample = Some(value);
      }
      Tag::BitsPerComponent => {
        self.check_header_window(tag)?;
        self.seen.mark(tag)?;
        self.bits_per_component = Some(value);
      }
      Tag::PixelFormat => {
        self.check_header_window(tag)?;
        self.seen.mark(tag)?;
        self.pixel_format = Some(value);
      }
      Tag::LowpassPrecision => {
        self.check_header_window(tag)?;
        if !(8..=16).contains(&value) {
          return Err(GprError::BadLowpassPrecision(value as u32));
        }
        self.seen.mark(tag)?;
        self.lowpass_precision = Some(value);
      }
      // CameraGains is carried as three consecutive segments (r, g, b);
      // the header-seen check fires once the third fills the triple.
      Tag::CameraGains => {
        self.check_header_window(tag)?;
        self.camera_gains_scratch[self.camera_gains_filled as usize % 3] = value;
        self.camera_gains_filled += 1;
        if self.camera_gains_filled % 3 == 0 {
          self.seen.mark(tag)?;
          self.camera_gains = Some(self.camera_gains_scratch);
        }
      }
      Tag::SubbandNumber => {
        self.header_complete = true;
        self.subband_number = Some(value);
      }
      Tag::BandWidth => self.band_width = Some(value),
      Tag::BandHeight => self.band_height = Some(value),
      Tag::QuantizationTable => self.quantization = Some(value),
      Tag::LowpassWidth => self.lowpass_width = Some(value),
      Tag::LowpassHeight => self.lowpass_height = Some(value),
      Tag::UniqueImageIdentifier | Tag::ExtensionData | Tag::LargeCodeblock => {
        // Handled by the chunk framing layer, not state.
      }
    }
    Ok(())
  }

  /// Header tags are only legal before the first per-subband tag; once
  /// that latch trips, even a tag's first occurrence is out of place.
  fn check_header_window(&self, tag: Tag) -> Result<()> {
    if self.header_complete {
      return Err(GprError::DuplicateHeaderParameter(tag as i16));
    }
    Ok(())
  }

  /// Confirm every required header tag has been seen. Returns the first
  /// missing one in declaration order, which is what a single-pass
  /// decoder will naturally hit first.
  pub fn check_required_headers(&self) -> Result<()> {
    for &tag in REQUIRED_HEADER_TAGS {
      if !self.seen.has(tag) {
        return Err(GprError::MissingHeaderParameter(tag as i16));
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn repeated_header_tag_is_rejected() {
    let mut s = CodecState::new();
    s.apply(Tag::ImageWidth, 4000).unwrap();
    let err = s.apply(Tag::ImageWidth, 4000).unwrap_err();
    assert_eq!(err, GprError::DuplicateHeaderParameter(Tag::ImageWidth as i16));
  }

  #[test]
  fn missing_header_tag_is_reported_in_declaration_order() {
    let s = CodecState::new();
    let err = s.check_required_headers().unwrap_err();
    assert_eq!(err, GprError::MissingHeaderParameter(Tag::ImageWidth as i16));
  }

  #[test]
  fn header_tag_after_subband_data_is_rejected_even_on_first_occurrence() {
    let mut s = CodecState::new();
    s.apply(Tag::SubbandNumber, 0).unwrap();
    let err = s.apply(Tag::PixelFormat, 0).unwrap_err();
    assert_eq!(err, GprError::DuplicateHeaderParameter(Tag::PixelFormat as i16));
  }

  #[test]
  fn lowpass_precision_outside_8_to_16_is_rejected() {
    let mut s = CodecState::new();
    let err = s.apply(Tag::LowpassPrecision, 4).unwrap_err();
    assert_eq!(err, GprError::BadLowpassPrecision(4));
    let err = s.apply(Tag::LowpassPrecision, 17).unwrap_err();
    assert_eq!(err, GprError::BadLowpassPrecision(17));
  }

  #[test]
  fn per_subband_tags_may_repeat_freely() {
    let mut s = CodecState::new();
    s.apply(Tag::SubbandNumber, 0).unwrap();
    s.apply(Tag::BandWidth, 1000).unwrap();
    s.apply(Tag::SubbandNumber, 1).unwrap();
    s.apply(Tag::BandWidth, 500).unwrap();
    assert_eq!(s.subband_number, Some(1));
    assert_eq!(s.band_width, Some(500));
  }

  #[test]
  fn camera_gains_assembles_from_three_segments() {
    let mut s = CodecState::new();
    s.apply(Tag::CameraGains, 256).unwrap();
    assert!(s.camera_gains.is_none());
    s.apply(Tag::CameraGains, 300).unwrap();
    s.apply(Tag::CameraGains, 280).unwrap();
    assert_eq!(s.camera_gains, Some([256, 300, 280]));
  }

  #[test]
  fn all_required_headers_present_passes() {
    let mut s = CodecState::new();
    for (tag, value) in [
      (Tag::ImageWidth, 4000),
      (Tag::ImageHeight, 3000),
      (Tag::PatternWidth, 2),
      (Tag::PatternHeight, 2),
      (Tag::ComponentsPerSample, 1),
      (Tag::BitsPerComponent, 12),
      (Tag::PixelFormat, 0),
      (Tag::LowpassPrecision, 16),
    ] {
      s.apply(tag, value).unwrap();
    }
    assert!(s.check_required_headers().is_ok());
  }
}
