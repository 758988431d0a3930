// Shared static tables: the VC-5 quantization table presets and the
// length assignment used to build codebook 17.
//
// Neither of these are process-wide globals (see Design Notes): they're
// plain data, and the structures that use them (`Codebook`) are built
// once per codec instance from this data in their own `new()`.

pub const MIDPOINT: i32 = 1 << 11; // 2048

pub const VC5_START_MARKER: u32 = 0x5643_2D35; // "VC-5" as bytes V, C, -, 5

pub const LARGE_CHUNK_BIT: i16 = 0x2000;

/// Raw (pre-canonical-assignment) length entry for codebook 17.
/// `value == BAND_END_VALUE && count == 0` marks the special band-end
/// marker; `value == 0 && count >= 1` marks a zero-run entry of that
/// count; `value > 0 && count == 1` marks a magnitude entry.
#[derive(Debug, Clone, Copy)]
pub struct RawCodebookLength {
  pub size: u8,
  pub count: u16,
  pub value: i32,
}

pub const BAND_END_VALUE: i32 = i32::MIN;

/// Sentinel `value` marking the escape codeword: magnitudes outside the
/// companding curve's domain are written as this codeword followed by
/// `ESCAPE_BITS` raw bits holding the exact value.
pub const ESCAPE_VALUE: i32 = i32::MIN + 1;

/// Largest magnitude (in the codebook's own compressed magnitude domain)
/// that has its own codeword. Coefficient magnitudes are run through a
/// cubic companding curve before lookup; this is the top of the curve's
/// output range, not a clamp on the raw coefficient value.
pub const MAX_CODEBOOK_MAGNITUDE: i32 = 64;

/// Width of the companding curve's input domain (`0..=2^10-1`): a
/// coefficient magnitude at or past this is escaped uncompanded instead
/// of being run through the curve.
pub const MAGNITUDE_COMPANDING_DOMAIN: u32 = 1 << 10;

/// Zero-run lengths that get their own codeword. An arbitrary run length
/// up to `MAX_RUN_LENGTH` is covered by greedily concatenating these.
pub const RUN_LENGTHS: &[u16] = &[
  1, 2, 3, 4, 6, 8, 12, 16, 24, 32, 48, 64, 96, 128, 192, 256,
  384, 512, 768, 1024, 1536, 2048, 3072,
];

pub const MAX_RUN_LENGTH: usize = 3071;

fn bit_length(v: u32) -> u32 {
  32 - v.leading_zeros()
}

/// Build the length (not yet bit-pattern-assigned) table for codebook 17:
/// one entry per magnitude 1..=MAX_CODEBOOK_MAGNITUDE, one per run length
/// in RUN_LENGTHS, and one band-end marker. Code length grows with
/// roughly 2*log2(value), which is what keeps small/likely values cheap.
pub fn codebook17_lengths() -> Vec<RawCodebookLength> {
  let mut entries = Vec::with_capacity(RUN_LENGTHS.len() + MAX_CODEBOOK_MAGNITUDE as usize + 1);

  for m in 1..=MAX_CODEBOOK_MAGNITUDE {
    let size = 2 * bit_length(m as u32);
    entries.push(RawCodebookLength { size: size as u8, count: 1, value: m });
  }

  for &r in RUN_LENGTHS {
    let size = 2 * bit_length(r as u32) + 1;
    entries.push(RawCodebookLength { size: size as u8, count: r, value: 0 });
  }

  entries.push(RawCodebookLength { size: 2, count: 0, value: BAND_END_VALUE });
  // One bit longer than the codeword for the curve's own top magnitude,
  // since falling off the companding domain is rarer than landing at it.
  entries.push(RawCodebookLength { size: (2 * bit_length(MAX_CODEBOOK_MAGNITUDE as u32) + 1) as u8, count: 0, value: ESCAPE_VALUE });

  entries
}

/// Quantization table presets from the VC-5 GPR quality profiles, indexed
/// by subband 0..9 (subband 0, the top-level LL, is always 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityPreset {
  Low,
  Medium,
  High,
  FilmScan1,
  FilmScanX,
  FilmScan2,
}

impl QualityPreset {
  pub fn quant_table(self) -> [u16; 10] {
    match self {
      QualityPreset::Low       => [1, 24, 24, 12, 64, 64, 48, 512, 512, 768],
      QualityPreset::Medium    => [1, 24, 24, 12, 48, 48, 32, 256, 256, 384],
      QualityPreset::High      => [1, 24, 24, 12, 32, 32, 24, 128, 128, 192],
      QualityPreset::FilmScan1 => [1, 24, 24, 12, 24, 24, 12, 96, 96, 144],
      QualityPreset::FilmScanX => [1, 24, 24, 12, 24, 24, 12, 64, 64, 96],
      QualityPreset::FilmScan2 => [1, 24, 24, 12, 24, 24, 12, 32, 32, 48],
    }
  }
}

/// Global bias added to the quantizer midpoint; see §4.7 "Quantization".
pub const MIDPOINT_PREQUANT: i32 = 2;

/// Prescale shift applied at each wavelet level before horizontal
/// filtering: level 0 (the Bayer component plane) needs no extra
/// headroom; levels 1 and 2 run on already-compressed LL data and are
/// prescaled by 2 bits to keep the lifting arithmetic inside 16 bits.
pub const PRESCALE_SHIFTS: [u32; 3] = [0, 2, 2];

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn codebook_lengths_cover_every_declared_run_and_magnitude() {
    let entries = codebook17_lengths();
    let magnitudes = entries.iter().filter(|e| e.value > 0).count();
    let runs = entries.iter().filter(|e| e.value == 0 && e.count > 0).count();
    let markers = entries.iter().filter(|e| e.value == BAND_END_VALUE).count();
    assert_eq!(magnitudes, MAX_CODEBOOK_MAGNITUDE as usize);
    assert_eq!(runs, RUN_LENGTHS.len());
    assert_eq!(markers, 1);
  }

  #[test]
  fn quant_table_ll_is_always_unit() {
    for preset in [
      QualityPreset::Low, QualityPreset::Medium, QualityPreset::High,
      QualityPreset::FilmScan1, QualityPreset::FilmScanX, QualityPreset::FilmScan2,
    ] {
      assert_eq!(preset.quant_table()[0], 1);
    }
  }
}
