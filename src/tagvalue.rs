//! Tag-value segment syntax.
//!
//! Every 32-bit segment in a GPR bitstream is either a plain `(tag,
//! value)` pair or, when the tag has `LARGE_CHUNK_BIT` set, the header of
//! a large chunk whose payload follows as whole 32-bit segments: bits
//! 8-12 of the tag carry the chunk's `Tag` code, the low byte carries the
//! high byte of a 24-bit segment count, and `value` holds the count's low
//! 16 bits.
//!
//! `Chunk` is a Drop-based scope guard that back-patches a large chunk's
//! header once its payload has been written, the same shape as
//! `ISOBMFFBox` back-patching a box size in `isobmff.rs`.

use crate::bitstream::{BitReader, BitWriter};
use crate::consts::LARGE_CHUNK_BIT;
use crate::error::{GprError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum Tag {
  ImageWidth = 1,
  ImageHeight = 2,
  PatternWidth = 3,
  PatternHeight = 4,
  ComponentsPerSample = 5,
  BitsPerComponent = 6,
  PixelFormat = 7,
  LowpassPrecision = 8,
  QuantizationTable = 9,
  SubbandNumber = 10,
  BandWidth = 11,
  BandHeight = 12,
  LowpassWidth = 13,
  LowpassHeight = 14,
  CameraGains = 15,
  UniqueImageIdentifier = 16, // optional: carried with a negative tag
  ExtensionData = 17,        // optional: carried with a negative tag
  LargeCodeblock = 18,       // always carried as a large chunk
}

impl TryFrom<i16> for Tag {
  type Error = GprError;

  fn try_from(raw: i16) -> Result<Self> {
    let base = (raw as i32).abs() as i16;
    let base = base & !LARGE_CHUNK_BIT;
    match base {
      1 => Ok(Tag::ImageWidth),
      2 => Ok(Tag::ImageHeight),
      3 => Ok(Tag::PatternWidth),
      4 => Ok(Tag::PatternHeight),
      5 => Ok(Tag::ComponentsPerSample),
      6 => Ok(Tag::BitsPerComponent),
      7 => Ok(Tag::PixelFormat),
      8 => Ok(Tag::LowpassPrecision),
      9 => Ok(Tag::QuantizationTable),
      10 => Ok(Tag::SubbandNumber),
      11 => Ok(Tag::BandWidth),
      12 => Ok(Tag::BandHeight),
      13 => Ok(Tag::LowpassWidth),
      14 => Ok(Tag::LowpassHeight),
      15 => Ok(Tag::CameraGains),
      16 => Ok(Tag::UniqueImageIdentifier),
      17 => Ok(Tag::ExtensionData),
      18 => Ok(Tag::LargeCodeblock),
      _ => Err(GprError::BadSegment(raw)),
    }
  }
}

impl Tag {
  /// Whether an unrecognized instance of this tag may be skipped rather
  /// than rejected outright.
  pub fn is_optional(self) -> bool {
    matches!(self, Tag::UniqueImageIdentifier | Tag::ExtensionData)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
  pub tag: i16,
  pub value: u16,
}

impl Segment {
  pub fn write(writer: &mut BitWriter, tag: Tag, optional: bool, value: u16) {
    let raw_tag = if optional { -(tag as i16) } else { tag as i16 };
    writer.put_bits(raw_tag as u16 as u32, 16);
    writer.put_bits(value as u32, 16);
  }

  pub fn read(reader: &mut BitReader) -> Segment {
    let tag = reader.get_bits(16) as u16 as i16;
    let value = reader.get_bits(16) as u16;
    Segment { tag, value }
  }

  pub fn is_optional(self) -> bool {
    self.tag < 0
  }

  pub fn is_large_chunk(self) -> bool {
    ((self.tag as i32).abs() as i16 & LARGE_CHUNK_BIT) != 0
  }
}

/// Scope guard for a large chunk: writes a placeholder header segment on
/// open, then on drop rewrites it with the payload's length in 32-bit
/// segments. The payload written between open and drop must itself end
/// on a segment boundary — callers that write sub-word data call
/// `writer.align_segment()` before the guard drops.
pub struct Chunk<'a> {
  writer: &'a mut BitWriter,
  header_byte_pos: usize,
  tag: Tag,
}

impl<'a> Chunk<'a> {
  pub fn open(writer: &'a mut BitWriter, tag: Tag) -> Self {
    let header_byte_pos = writer.byte_position();
    writer.put_long(0); // placeholder, patched on drop
    Self { writer, header_byte_pos, tag }
  }

  pub fn writer(&mut self) -> &mut BitWriter {
    self.writer
  }
}

impl<'a> Drop for Chunk<'a> {
  fn drop(&mut self) {
    self.writer.align_segment();
    let end = self.writer.byte_position();
    let payload_bytes = end - (self.header_byte_pos + 4);
    debug_assert_eq!(payload_bytes % 4, 0, "large chunk payload must be segment-aligned");
    let segments = (payload_bytes / 4) as u32;

    let tag_code = (self.tag as i16 as u16) & 0x1F;
    let length_high_byte = ((segments >> 16) & 0xFF) as u16;
    let tag_word = (LARGE_CHUNK_BIT as u16) | (tag_code << 8) | length_high_byte;
    let value = (segments & 0xFFFF) as u16;
    let word = ((tag_word as u32) << 16) | value as u32;
    self.writer.patch_u32_at(self.header_byte_pos, word);
  }
}

/// Parsed header of a large chunk: the tag it was opened with and the
/// payload length in 32-bit segments.
pub struct LargeChunkHeader {
  pub tag: Tag,
  pub length_segments: u32,
}

pub fn read_large_chunk_header(reader: &mut BitReader) -> Result<LargeChunkHeader> {
  let segment = Segment::read(reader);
  if !segment.is_large_chunk() {
    return Err(GprError::BadSegment(segment.tag));
  }
  let length_high_byte = (segment.tag as u16) & 0x00FF;
  let length_segments = ((length_high_byte as u32) << 16) | segment.value as u32;
  let tag_code = ((segment.tag as u16) >> 8) & 0x1F;
  let tag = Tag::try_from(tag_code as i16)?;
  Ok(LargeChunkHeader { tag, length_segments })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plain_segment_round_trips() {
    let mut w = BitWriter::new();
    Segment::write(&mut w, Tag::ImageWidth, false, 4000);
    Segment::write(&mut w, Tag::UniqueImageIdentifier, true, 7);
    let bytes = w.finalize();

    let mut r = BitReader::new(&bytes);
    let a = Segment::read(&mut r);
    assert_eq!(Tag::try_from(a.tag).unwrap(), Tag::ImageWidth);
    assert!(!a.is_optional());
    assert_eq!(a.value, 4000);

    let b = Segment::read(&mut r);
    assert_eq!(Tag::try_from(b.tag).unwrap(), Tag::UniqueImageIdentifier);
    assert!(b.is_optional());
    assert_eq!(b.value, 7);
  }

  #[test]
  fn large_chunk_header_is_back_patched_with_payload_segment_count() {
    let mut w = BitWriter::new();
    {
      let mut chunk = Chunk::open(&mut w, Tag::LargeCodeblock);
      chunk.writer().put_long(0x1111_1111);
      chunk.writer().put_long(0x2222_2222);
      chunk.writer().put_long(0x3333_3333);
    }
    let bytes = w.finalize();

    let mut r = BitReader::new(&bytes);
    let header = read_large_chunk_header(&mut r).unwrap();
    assert_eq!(header.tag, Tag::LargeCodeblock);
    assert_eq!(header.length_segments, 3);
    assert_eq!(r.get_long(), 0x1111_1111);
    assert_eq!(r.get_long(), 0x2222_2222);
    assert_eq!(r.get_long(), 0x3333_3333);
  }

  #[test]
  fn unknown_tag_reports_bad_segment() {
    let mut w = BitWriter::new();
    w.put_bits(999u32, 16);
    w.put_bits(0, 16);
    let bytes = w.finalize();
    let mut r = BitReader::new(&bytes);
    let seg = Segment::read(&mut r);
    assert!(Tag::try_from(seg.tag).is_err());
  }
}
