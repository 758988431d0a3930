//! Inverse wavelet transform, dequantization, and resolution-scaled
//! partial reconstruction.
//!
//! Mirrors `forward.rs` axis for axis: vertical reconstruction first
//! (LL/LH -> lowpass row-pairs, HL/HH -> highpass row-pairs), then
//! horizontal reconstruction of the two row buffers into the final
//! plane, matching the order the forward transform split them in.

use crate::array2d::Array2D;
use crate::consts::PRESCALE_SHIFTS;
use crate::forward::{border_tap, H_LEFT, H_RIGHT};
use crate::util::{clamp16, round2};
use crate::wavelet::{Band, Transform};

fn low_at(low: &[i32], i: i64) -> i32 {
  low[i.clamp(0, low.len() as i64 - 1) as usize]
}

/// Inverse of the vertical lifting pass: top/bottom edges use their own
/// 3-tap even/odd coefficient pairs against the nearest three lowpass
/// rows; interior positions recover the sum/difference split exactly
/// from the neighboring lowpass entries.
pub fn inverse_vertical_1d(low: &[i32], high: &[i32], n: usize) -> Vec<i32> {
  let n_high = high.len();
  let mut out = vec![0i32; n];

  for k in 0..n_high {
    let k64 = k as i64;
    let (even_base, odd_base) = if k == 0 {
      let (l0, l1, l2) = (low_at(low, 0), low_at(low, 1), low_at(low, 2));
      (round2(11 * l0 - 4 * l1 + l2, 3), round2(5 * l0 + 4 * l1 - l2, 3))
    } else if k == n_high - 1 {
      let (l0, l1, l2) = (low_at(low, k64), low_at(low, k64 - 1), low_at(low, k64 - 2));
      (round2(5 * l0 + 4 * l1 - l2, 3), round2(11 * l0 - 4 * l1 + l2, 3))
    } else {
      let corr = round2(low_at(low, k64 - 1) - low_at(low, k64 + 1), 3);
      (low_at(low, k64) + corr, low_at(low, k64) - corr)
    };
    let even = clamp16(even_base + high[k]) >> 1;
    let odd = clamp16(odd_base - high[k]) >> 1;
    out[2 * k] = even;
    if 2 * k + 1 < n {
      out[2 * k + 1] = odd;
    }
  }
  if n % 2 == 1 {
    out[n - 1] = low_at(low, (low.len() - 1) as i64) >> 1;
  }
  out
}

/// Inverse of the horizontal lifting pass: left/right borders reuse the
/// same 6-tap coefficients the forward pass used on that edge, applied
/// to the lowpass band instead of the raw samples; interior positions
/// use the documented three-tap `LP[c-1]-LP[c+1]` correction.
pub fn inverse_horizontal_1d(low: &[i32], high: &[i32], n: usize) -> Vec<i32> {
  let n_low = low.len();
  let n_high = high.len();
  let mut out = vec![0i32; n];

  for k in 0..n_high {
    let k64 = k as i64;
    let corr = if k == 0 {
      let s: [i32; 6] = core::array::from_fn(|j| low_at(low, j as i64));
      border_tap(&H_LEFT, &s)
    } else if k == n_high - 1 {
      let s: [i32; 6] = core::array::from_fn(|j| low_at(low, n_low as i64 - 1 - j as i64));
      border_tap(&H_RIGHT, &s)
    } else {
      round2(low_at(low, k64 - 1) - low_at(low, k64 + 1), 3)
    };
    let even_base = low_at(low, k64) + corr;
    let odd_base = low_at(low, k64) - corr;
    let even = clamp16(even_base + high[k]) >> 1;
    let odd = clamp16(odd_base - high[k]) >> 1;
    out[2 * k] = even;
    if 2 * k + 1 < n {
      out[2 * k + 1] = odd;
    }
  }
  if n % 2 == 1 {
    out[n - 1] = low_at(low, (n_low - 1) as i64) >> 1;
  }
  out
}

fn inverse_vertical(low: &Array2D<i32>, high: &Array2D<i32>, rows: usize) -> Array2D<i32> {
  let cols = low.cols();
  let mut out = Array2D::zeroed(rows, cols);
  for c in 0..cols {
    let l: Vec<i32> = (0..low.rows()).map(|r| low[r][c]).collect();
    let h: Vec<i32> = (0..high.rows()).map(|r| high[r][c]).collect();
    let column = inverse_vertical_1d(&l, &h, rows);
    for r in 0..rows {
      out[r][c] = column[r];
    }
  }
  out
}

fn inverse_horizontal(low: &Array2D<i32>, high: &Array2D<i32>, cols: usize) -> Array2D<i32> {
  let rows = low.rows();
  let mut out = Array2D::zeroed(rows, cols);
  for r in 0..rows {
    let row = inverse_horizontal_1d(low.row(r), high.row(r), cols);
    out.row_mut(r).copy_from_slice(&row);
  }
  out
}

/// Invert one pyramid level back to its `rows x cols` pre-transform
/// plane, given its four (already dequantized) bands.
pub fn inverse_level(
  ll: &Array2D<i32>,
  lh: &Array2D<i32>,
  hl: &Array2D<i32>,
  hh: &Array2D<i32>,
  rows: usize,
  cols: usize,
) -> Array2D<i32> {
  let l = inverse_vertical(ll, lh, rows);
  let h = inverse_vertical(hl, hh, rows);
  inverse_horizontal(&l, &h, cols)
}

pub fn dequantize(value: i16, divisor: u16) -> i32 {
  value as i32 * divisor as i32
}

fn dequantized_band(pyramid: &Transform, level: usize, band: Band) -> Array2D<i32> {
  let src = pyramid.levels[level].band(band);
  let divisor = pyramid.levels[level].divisors[band as usize];
  Array2D::new_with(src.rows(), src.cols(), |r, c| dequantize(src[r][c], divisor))
}

/// Undo a level's prescale: the forward pass right-shifted every sample
/// before filtering, so reconstruction left-shifts back by the same
/// amount once the filter has run.
fn postscale(plane: &mut Array2D<i32>, shift: u32) {
  if shift == 0 {
    return;
  }
  plane.map(|_, _, v| v << shift);
}

/// Reconstruct a component plane from as many subbands as are present,
/// per the resolution tiers in `wavelet::Resolution`:
/// 1 subband -> the level-2 lowpass only (eighth-of-eighth scale,
/// i.e. 1/16 linear), 4 -> through level 2, 7 -> through level 1, 10 ->
/// the full-resolution plane at `(original_rows, original_cols)`.
pub fn inverse_transform(pyramid: &Transform, subband_count: usize, original_rows: usize, original_cols: usize) -> Array2D<i32> {
  let mut level2_ll = dequantized_band(pyramid, 2, Band::LL);

  if subband_count <= 1 {
    postscale(&mut level2_ll, PRESCALE_SHIFTS[2]);
    return level2_ll;
  }

  let level2_lh = dequantized_band(pyramid, 2, Band::LH);
  let level2_hl = dequantized_band(pyramid, 2, Band::HL);
  let level2_hh = dequantized_band(pyramid, 2, Band::HH);
  let (r1, c1) = (pyramid.levels[1].rows(), pyramid.levels[1].cols());
  let mut level1_ll = inverse_level(&level2_ll, &level2_lh, &level2_hl, &level2_hh, r1, c1);
  postscale(&mut level1_ll, PRESCALE_SHIFTS[2]);

  if subband_count <= 4 {
    return level1_ll;
  }

  let level1_lh = dequantized_band(pyramid, 1, Band::LH);
  let level1_hl = dequantized_band(pyramid, 1, Band::HL);
  let level1_hh = dequantized_band(pyramid, 1, Band::HH);
  let (r0, c0) = (pyramid.levels[0].rows(), pyramid.levels[0].cols());
  let mut level0_ll = inverse_level(&level1_ll, &level1_lh, &level1_hl, &level1_hh, r0, c0);
  postscale(&mut level0_ll, PRESCALE_SHIFTS[1]);

  if subband_count <= 7 {
    return level0_ll;
  }

  let level0_lh = dequantized_band(pyramid, 0, Band::LH);
  let level0_hl = dequantized_band(pyramid, 0, Band::HL);
  let level0_hh = dequantized_band(pyramid, 0, Band::HH);
  let mut component = inverse_level(&level0_ll, &level0_lh, &level0_hl, &level0_hh, original_rows, original_cols);
  postscale(&mut component, PRESCALE_SHIFTS[0]);
  component
}

/// Clamp a dequantized coefficient back into the `i16` range a
/// bitstream-fed pyramid must already respect; used when the decoder
/// builds a `Transform` straight from decoded VLC symbols.
pub fn store_coefficient(value: i32) -> i16 {
  clamp16(value) as i16
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::forward::forward_transform;

  fn sample_plane(rows: usize, cols: usize) -> Array2D<i32> {
    Array2D::new_with(rows, cols, |r, c| (((r * 37 + c * 101) % 4096) - 2048) as i32)
  }

  #[test]
  fn full_resolution_round_trip_is_close_after_unit_quantization() {
    let plane = sample_plane(32, 32);
    let quant = [1u16; 10];
    let pyramid = forward_transform(&plane, &quant);
    let back = inverse_transform(&pyramid, 10, 32, 32);
    for r in 0..32 {
      for c in 0..32 {
        assert!((back[r][c] - plane[r][c]).abs() <= 8, "mismatch at ({}, {}): {} vs {}", r, c, back[r][c], plane[r][c]);
      }
    }
  }

  #[test]
  fn lower_resolution_reconstructions_shrink_by_powers_of_two() {
    let plane = sample_plane(32, 32);
    let quant = [1u16; 10];
    let pyramid = forward_transform(&plane, &quant);

    let full = inverse_transform(&pyramid, 10, 32, 32);
    let quarter = inverse_transform(&pyramid, 7, 32, 32);
    let sixteenth = inverse_transform(&pyramid, 4, 32, 32);
    let sixtyfourth = inverse_transform(&pyramid, 1, 32, 32);

    assert_eq!((full.rows(), full.cols()), (32, 32));
    assert_eq!((quarter.rows(), quarter.cols()), (16, 16));
    assert_eq!((sixteenth.rows(), sixteenth.cols()), (8, 8));
    assert_eq!((sixtyfourth.rows(), sixtyfourth.cols()), (4, 4));
  }

  #[test]
  fn lossy_quantization_keeps_reconstruction_within_divisor_bound() {
    let plane = sample_plane(16, 16);
    let quant = [1u16, 24, 24, 12, 48, 48, 32, 256, 256, 384];
    let pyramid = forward_transform(&plane, &quant);
    let back = inverse_transform(&pyramid, 10, 16, 16);
    // Quantization error should stay on the order of the coarsest
    // divisor used; this is a sanity bound, not an exact reconstruction.
    for r in 0..16 {
      for c in 0..16 {
        assert!((back[r][c] - plane[r][c]).abs() < 4096, "unbounded drift at ({}, {})", r, c);
      }
    }
  }
}
