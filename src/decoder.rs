//! Top-level decoder driver: tag-value parsing, per-channel VLC decode
//! and inverse wavelet transform, and Bayer (or RGB preview)
//! reconstruction.
//!
//! Mirrors `encoder.rs`'s shape: a thin entry point plus private helper
//! functions, no persistent decoder object, since nothing needs to
//! survive between one `decode` call and the next.

use crate::array2d::Array2D;
use crate::bayer::{pack_raw, reconstruct, CompandingCurve, DecorrelatedComponents, PixelFormat};
use crate::bitstream::BitReader;
use crate::codebook::{Codebook, Symbol};
use crate::colorconvert::{to_half_res_rgb, CameraGains};
use crate::error::{GprError, Result};
use crate::state::CodecState;
use crate::tagvalue::{read_large_chunk_header, Segment, Tag};
use crate::wavelet::{Resolution, Transform, NUM_SUBBANDS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
  Raw(PixelFormat),
  HalfResRgb,
}

pub enum DecodeOutput {
  Raw { width: usize, height: usize, format: PixelFormat, bytes: Vec<u8> },
  Rgb { width: usize, height: usize, pixels: Array2D<[u8; 3]> },
}

fn pixel_format_from_code(code: u16) -> Result<PixelFormat> {
  match code {
    0 => Ok(PixelFormat::Rggb12),
    1 => Ok(PixelFormat::Rggb12p),
    2 => Ok(PixelFormat::Rggb14),
    3 => Ok(PixelFormat::Rggb16),
    4 => Ok(PixelFormat::Gbrg12),
    5 => Ok(PixelFormat::Gbrg12p),
    6 => Ok(PixelFormat::Gbrg14),
    7 => Ok(PixelFormat::Gbrg16),
    _ => Err(GprError::UnsupportedPixelFormat),
  }
}

struct ParsedBitstream {
  state: CodecState,
  format: PixelFormat,
  width: usize,
  height: usize,
  channel_pyramids: [Transform; 4],
}

fn decode_band(reader: &mut BitReader, codebook: &Codebook, rows: usize, cols: usize) -> Result<Array2D<i16>> {
  let mut band = Array2D::zeroed(rows, cols);
  let total = rows * cols;
  let mut index = 0usize;

  loop {
    let symbol = codebook.decode_symbol(reader)?;
    // A symbol decoded past the real end of the subband's bits is a
    // phantom read off the reader's zero-padded underflow tail, not a
    // genuine band-end marker — the caller promised a band-end before
    // running out of bits, so treat underflow here as corruption.
    if reader.has_error() {
      log::warn!("subband ran out of bits before a band-end marker");
      return Err(GprError::MissingBandEnd);
    }
    match symbol {
      Symbol::Run(n) => {
        index += n as usize;
        if index > total {
          return Err(GprError::BadSegment(Tag::LargeCodeblock as i16));
        }
      }
      Symbol::Magnitude(m) => {
        if index >= total {
          return Err(GprError::BadSegment(Tag::LargeCodeblock as i16));
        }
        let negative = reader.get_bit();
        if reader.has_error() {
          return Err(GprError::MissingBandEnd);
        }
        let value = if negative { -(m as i32) } else { m as i32 };
        band[index / cols][index % cols] = crate::inverse::store_coefficient(value);
        index += 1;
      }
      Symbol::BandEnd => break,
    }
  }
  Ok(band)
}

/// Read subband 0's raw unsigned `precision`-bit samples (no VLC, no
/// band-end marker — its length is already fixed by `rows*cols`).
fn decode_lowpass_raw(reader: &mut BitReader, rows: usize, cols: usize, precision: u16) -> Result<Array2D<i16>> {
  let mut band = Array2D::zeroed(rows, cols);
  for r in 0..rows {
    for c in 0..cols {
      let raw = reader.get_bits(precision as u32);
      band[r][c] = crate::inverse::store_coefficient(raw as i32);
    }
  }
  reader.finish("decoding the lowpass subband")?;
  Ok(band)
}

fn parse_bitstream(data: &[u8], resolution: Resolution) -> Result<ParsedBitstream> {
  let mut reader = BitReader::new(data);
  let marker = reader.get_long();
  if marker != crate::consts::VC5_START_MARKER {
    return Err(GprError::MissingStartMarker);
  }

  let mut state = CodecState::new();
  loop {
    let peek_tag = reader.peek_bits(16) as u16 as i16;
    if (peek_tag as i32).abs() as i16 & crate::consts::LARGE_CHUNK_BIT != 0 {
      break;
    }
    let segment = Segment::read(&mut reader);
    let tag = match Tag::try_from(segment.tag) {
      Ok(tag) => tag,
      Err(_) if segment.is_optional() => continue,
      Err(e) => return Err(e),
    };
    state.apply(tag, segment.value)?;
  }
  state.check_required_headers()?;

  let width = state.image_width.ok_or(GprError::MissingHeaderParameter(Tag::ImageWidth as i16))? as usize;
  let height = state.image_height.ok_or(GprError::MissingHeaderParameter(Tag::ImageHeight as i16))? as usize;
  let format = pixel_format_from_code(state.pixel_format.unwrap_or(0))?;
  let lowpass_precision = state.lowpass_precision.unwrap_or(16);
  log::debug!("parsed header: {width}x{height} {format:?}, requesting {resolution:?}");

  let half_rows = height / 2;
  let half_cols = width / 2;
  let codebook = Codebook::new();
  let mut pyramids: [Transform; 4] = [
    Transform::new(half_rows, half_cols),
    Transform::new(half_rows, half_cols),
    Transform::new(half_rows, half_cols),
    Transform::new(half_rows, half_cols),
  ];

  let subband_count = resolution.subband_count();

  for pyramid in pyramids.iter_mut() {
    for subband in 0..NUM_SUBBANDS {
      reader.align_segment();
      let header = read_large_chunk_header(&mut reader)?;
      if header.tag != Tag::LargeCodeblock {
        return Err(GprError::BadSegment(Tag::LargeCodeblock as i16));
      }

      if subband >= subband_count {
        // Beyond the requested resolution tier: the chunk's payload
        // bytes are consumed (so the next chunk header still aligns)
        // but never parsed, and the subband is marked valid with its
        // zero-initialized data so nothing downstream mistakes this
        // pyramid for an incomplete one.
        log::trace!("subband {subband}: skip-consuming {} segments", header.length_segments);
        reader.skip_bits(header.length_segments * 32);
        pyramid.mark_subband_valid(subband);
        continue;
      }

      // Fixed emission order: subband number, band size, quantizer, then
      // (subband 0 only) the lowpass dimensions, before the coded bits.
      let mut chunk_state = CodecState::new();
      for expected in [Tag::SubbandNumber, Tag::BandWidth, Tag::BandHeight, Tag::QuantizationTable] {
        let segment = Segment::read(&mut reader);
        let tag = Tag::try_from(segment.tag)?;
        if tag != expected {
          return Err(GprError::BadSegment(segment.tag));
        }
        chunk_state.apply(tag, segment.value)?;
      }
      if chunk_state.subband_number == Some(0) {
        for expected in [Tag::LowpassWidth, Tag::LowpassHeight] {
          let segment = Segment::read(&mut reader);
          let tag = Tag::try_from(segment.tag)?;
          if tag != expected {
            return Err(GprError::BadSegment(segment.tag));
          }
          chunk_state.apply(tag, segment.value)?;
        }
      }
      let parsed_subband = chunk_state.subband_number.unwrap() as usize;
      let band_cols = chunk_state.band_width.unwrap() as usize;
      let band_rows = chunk_state.band_height.unwrap() as usize;
      let divisor = chunk_state.quantization.unwrap_or(1);

      let decoded = if parsed_subband == 0 {
        decode_lowpass_raw(&mut reader, band_rows, band_cols, lowpass_precision)?
      } else {
        decode_band(&mut reader, &codebook, band_rows, band_cols)?
      };
      *pyramid.subband_mut(parsed_subband) = decoded;
      pyramid.mark_subband_valid(parsed_subband);
      let (level, band) = crate::wavelet::subband_location(parsed_subband);
      pyramid.levels[level].divisors[band as usize] = divisor;
    }
  }

  Ok(ParsedBitstream { state, format, width, height, channel_pyramids: pyramids })
}

/// Decode a GPR/VC-5 bitstream at the requested resolution tier, either
/// back to Bayer RAW bytes or to a half-resolution RGB preview.
pub fn decode(data: &[u8], resolution: Resolution, output: Output) -> Result<DecodeOutput> {
  log::debug!("decoding at {resolution:?} to {output:?}");
  let parsed = parse_bitstream(data, resolution)?;
  let subband_count = resolution.subband_count();
  let half_rows = parsed.height / 2;
  let half_cols = parsed.width / 2;

  let gs = crate::inverse::inverse_transform(&parsed.channel_pyramids[0], subband_count, half_rows, half_cols);
  let gd = crate::inverse::inverse_transform(&parsed.channel_pyramids[1], subband_count, half_rows, half_cols);
  let rg = crate::inverse::inverse_transform(&parsed.channel_pyramids[2], subband_count, half_rows, half_cols);
  let bg = crate::inverse::inverse_transform(&parsed.channel_pyramids[3], subband_count, half_rows, half_cols);

  let components = DecorrelatedComponents { gs, gd, rg, bg };
  let companding = CompandingCurve::new();

  match output {
    Output::Raw(requested_format) => {
      let pattern = requested_format.pattern();
      let native_pattern = parsed.format.pattern();
      if pattern != native_pattern {
        return Err(GprError::UnsupportedPixelFormat);
      }
      let mosaic = reconstruct(&components, pattern, &companding);
      let bytes = pack_raw(requested_format, &mosaic);
      Ok(DecodeOutput::Raw { width: mosaic.cols(), height: mosaic.rows(), format: requested_format, bytes })
    }
    Output::HalfResRgb => {
      let gains = match parsed.state.camera_gains {
        Some(raw) => CameraGains::from_raw(raw),
        None => CameraGains::unity(),
      };
      let pixels = to_half_res_rgb(&components, gains, &companding);
      Ok(DecodeOutput::Rgb { width: pixels.cols(), height: pixels.rows(), pixels })
    }
  }
}

/// Convenience wrapper for decoding straight back to the source's own
/// Bayer pixel format at full resolution.
pub fn decode_to_native_raw(data: &[u8]) -> Result<DecodeOutput> {
  let parsed = parse_bitstream(data, Resolution::Full)?;
  decode(data, Resolution::Full, Output::Raw(parsed.format))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::alloc::SystemAllocator;
  use crate::encoder::{encode, BayerImage, CameraGainsRaw};
  use crate::consts::QualityPreset;

  fn synthetic_rggb_12(width: usize, height: usize) -> Vec<u8> {
    let mut data = vec![0u8; width * height * 2];
    for i in 0..width * height {
      let v = ((i * 53) % 4096) as u16;
      data[i * 2] = (v >> 8) as u8;
      data[i * 2 + 1] = (v & 0xFF) as u8;
    }
    data
  }

  #[test]
  fn full_resolution_round_trip_reconstructs_raw_bytes() {
    let data = synthetic_rggb_12(16, 16);
    let image = BayerImage {
      width: 16,
      height: 16,
      format: PixelFormat::Rggb12,
      data: &data,
      camera_gains: CameraGainsRaw::default(),
    };
    let alloc = SystemAllocator;
    let encoded = encode(&image, QualityPreset::High, &alloc).unwrap();

    let decoded = decode(&encoded.bytes, Resolution::Full, Output::Raw(PixelFormat::Rggb12)).unwrap();
    match decoded {
      DecodeOutput::Raw { width, height, bytes, .. } => {
        assert_eq!(width, 16);
        assert_eq!(height, 16);
        assert_eq!(bytes.len(), 16 * 16 * 2);
      }
      _ => panic!("expected raw output"),
    }
  }

  #[test]
  fn quarter_resolution_decode_yields_smaller_preview() {
    let data = synthetic_rggb_12(32, 32);
    let image = BayerImage {
      width: 32,
      height: 32,
      format: PixelFormat::Rggb12,
      data: &data,
      camera_gains: CameraGainsRaw::default(),
    };
    let alloc = SystemAllocator;
    let encoded = encode(&image, QualityPreset::Medium, &alloc).unwrap();

    let decoded = decode(&encoded.bytes, Resolution::Quarter, Output::HalfResRgb).unwrap();
    match decoded {
      DecodeOutput::Rgb { width, height, .. } => {
        assert_eq!((width, height), (8, 8));
      }
      _ => panic!("expected rgb output"),
    }
  }

  #[test]
  fn missing_start_marker_is_rejected() {
    let bytes = [0u8; 16];
    assert!(decode(&bytes, Resolution::Full, Output::HalfResRgb).is_err());
  }
}
