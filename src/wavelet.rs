//! Wavelet pyramid storage.
//!
//! Each Bayer-derived component plane (GS, GD, RG, BG) decomposes into a
//! 3-level pyramid; at every level the incoming plane splits into four
//! quarter-size bands (LL, LH, HL, HH), and levels 1 and 2 operate on the
//! previous level's LL. That gives 10 subbands per component, numbered
//! so resolution-scalable decode can stop partway through: subband 0 is
//! the final LL (the "lowpass image"), subbands 1-3 are level 2's
//! highpass bands, 4-6 are level 1's, and 7-9 are level 0's — dropping
//! the low-order subbands cuts the output resolution in powers of two
//! without touching the bitstream syntax.
//!
//! This generalizes `frame.rs`'s `Plane`/`Frame` split: a fixed handful
//! of same-shaped buffers addressed by name, built on `Array2D` instead
//! of a flat byte plane.

use crate::array2d::Array2D;

pub const LEVELS: usize = 3;
pub const BANDS_PER_LEVEL: usize = 4;
pub const NUM_SUBBANDS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
  LL = 0,
  LH = 1,
  HL = 2,
  HH = 3,
}

/// Output resolution a decode can be requested at; each step drops the
/// highest-frequency subbands instead of decoding and then downscaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
  Full,
  Half,
  Quarter,
  Eighth,
  Sixteenth,
}

impl Resolution {
  pub fn subband_count(self) -> usize {
    match self {
      Resolution::Full | Resolution::Half => 10,
      Resolution::Quarter => 7,
      Resolution::Eighth => 4,
      Resolution::Sixteenth => 1,
    }
  }
}

/// Map a subband index (0..NUM_SUBBANDS) to the (pyramid level, band)
/// that holds it.
pub fn subband_location(subband: usize) -> (usize, Band) {
  match subband {
    0 => (2, Band::LL),
    1 => (2, Band::LH),
    2 => (2, Band::HL),
    3 => (2, Band::HH),
    4 => (1, Band::LH),
    5 => (1, Band::HL),
    6 => (1, Band::HH),
    7 => (0, Band::LH),
    8 => (0, Band::HL),
    9 => (0, Band::HH),
    _ => panic!("subband index out of range: {}", subband),
  }
}

pub struct WaveletLevel {
  bands: [Array2D<i16>; BANDS_PER_LEVEL],
  pub divisors: [u16; BANDS_PER_LEVEL],
  valid_mask: u8,
}

impl WaveletLevel {
  pub fn new(rows: usize, cols: usize) -> Self {
    Self {
      bands: [
        Array2D::zeroed(rows, cols),
        Array2D::zeroed(rows, cols),
        Array2D::zeroed(rows, cols),
        Array2D::zeroed(rows, cols),
      ],
      divisors: [1; BANDS_PER_LEVEL],
      valid_mask: 0,
    }
  }

  pub fn rows(&self) -> usize {
    self.bands[0].rows()
  }

  pub fn cols(&self) -> usize {
    self.bands[0].cols()
  }

  pub fn band(&self, band: Band) -> &Array2D<i16> {
    &self.bands[band as usize]
  }

  pub fn band_mut(&mut self, band: Band) -> &mut Array2D<i16> {
    &mut self.bands[band as usize]
  }

  pub fn mark_valid(&mut self, band: Band) {
    self.valid_mask |= 1 << (band as u8);
  }

  pub fn is_valid(&self, band: Band) -> bool {
    self.valid_mask & (1 << (band as u8)) != 0
  }

  pub fn all_valid(&self) -> bool {
    self.valid_mask == 0b1111
  }
}

/// The full 3-level pyramid for one decorrelated component plane.
pub struct Transform {
  pub levels: [WaveletLevel; LEVELS],
}

impl Transform {
  /// Build the pyramid's storage for a component plane of `rows x cols`
  /// samples. Odd dimensions round up at each halving, matching the
  /// lifting filters' treatment of a trailing unpaired sample.
  pub fn new(rows: usize, cols: usize) -> Self {
    let (r0, c0) = ((rows + 1) / 2, (cols + 1) / 2);
    let (r1, c1) = ((r0 + 1) / 2, (c0 + 1) / 2);
    let (r2, c2) = ((r1 + 1) / 2, (c1 + 1) / 2);
    Self {
      levels: [WaveletLevel::new(r0, c0), WaveletLevel::new(r1, c1), WaveletLevel::new(r2, c2)],
    }
  }

  pub fn subband(&self, subband: usize) -> &Array2D<i16> {
    let (level, band) = subband_location(subband);
    self.levels[level].band(band)
  }

  pub fn subband_mut(&mut self, subband: usize) -> &mut Array2D<i16> {
    let (level, band) = subband_location(subband);
    self.levels[level].band_mut(band)
  }

  pub fn mark_subband_valid(&mut self, subband: usize) {
    let (level, band) = subband_location(subband);
    self.levels[level].mark_valid(band);
  }

  pub fn is_subband_valid(&self, subband: usize) -> bool {
    let (level, band) = subband_location(subband);
    self.levels[level].is_valid(band)
  }

  /// Lowest-frequency band: what `LowpassWidth`/`LowpassHeight` describe.
  pub fn lowpass(&self) -> &Array2D<i16> {
    self.levels[LEVELS - 1].band(Band::LL)
  }

  pub fn lowpass_mut(&mut self) -> &mut Array2D<i16> {
    self.levels[LEVELS - 1].band_mut(Band::LL)
  }
}
