//! Forward wavelet transform and quantization.
//!
//! The per-axis filter is the explicit 2/6-tap lifting filter this codec
//! specifies: a plain pairwise sum for the lowpass band, and a 6-tap
//! highpass band with distinct border taps at each edge (the horizontal
//! and vertical axes use different border coefficients — this isn't a
//! style variant of a generic wavelet, it's the literal filter).
//! Borders replicate the edge sample outward rather than mirroring, so
//! `samp()` below just clamps the index.
//!
//! Shaped like `txfm.rs`'s plain-function row/column transform pair,
//! working over `i32` until quantization narrows the result into the
//! `i16` bands `wavelet.rs` stores.

use crate::array2d::Array2D;
use crate::consts::{MIDPOINT_PREQUANT, PRESCALE_SHIFTS};
use crate::util::{clamp16, round2};
use crate::wavelet::{Band, Transform};

/// Horizontal border taps (left edge, and its sign-inverted mirror for
/// the right edge), applied to six consecutive source samples.
pub(crate) const H_LEFT: [i32; 6] = [11, -11, -4, 4, 1, -1];
pub(crate) const H_RIGHT: [i32; 6] = [-11, 11, 4, -4, -1, 1];

/// Vertical border taps (top edge, bottom edge) — a different shape
/// than the horizontal ones, not a reuse.
const V_TOP: [i32; 6] = [5, -11, 4, 4, -1, -1];
const V_BOTTOM: [i32; 6] = [1, 1, -4, -4, 11, -5];

fn samp(src: &[i32], i: i64) -> i32 {
  let idx = i.clamp(0, src.len() as i64 - 1);
  src[idx as usize]
}

pub(crate) fn border_tap(coeffs: &[i32; 6], samples: &[i32; 6]) -> i32 {
  let sum: i32 = coeffs.iter().zip(samples.iter()).map(|(c, s)| c * s).sum();
  round2(sum, 3)
}

/// Split one row/column of length `n` into a lowpass band (pairwise
/// sums, length `(n+1)/2`) and a highpass band (length `n/2`), using
/// `left`/`right` as the two border coefficient sets.
fn lift_forward(src: &[i32], left: &[i32; 6], right: &[i32; 6]) -> (Vec<i32>, Vec<i32>) {
  let n = src.len();
  let n_low = (n + 1) / 2;
  let n_high = n / 2;

  let mut low = vec![0i32; n_low];
  for (k, slot) in low.iter_mut().enumerate() {
    *slot = samp(src, 2 * k as i64) + samp(src, 2 * k as i64 + 1);
  }

  let mut high = vec![0i32; n_high];
  for k in 0..n_high {
    let k64 = k as i64;
    let value = if k == 0 {
      let s: [i32; 6] = core::array::from_fn(|j| samp(src, j as i64));
      border_tap(left, &s)
    } else if k == n_high - 1 {
      let s: [i32; 6] = core::array::from_fn(|j| samp(src, n as i64 - 1 - j as i64));
      border_tap(right, &s)
    } else {
      let a = samp(src, 2 * k64 - 2);
      let b = samp(src, 2 * k64 - 1);
      let c = samp(src, 2 * k64);
      let d = samp(src, 2 * k64 + 1);
      let e = samp(src, 2 * k64 + 2);
      let f = samp(src, 2 * k64 + 3);
      round2(-a - b + e + f, 3) + (c - d)
    };
    high[k] = clamp16(value);
  }

  (low, high)
}

fn forward_horizontal(plane: &Array2D<i32>) -> (Array2D<i32>, Array2D<i32>) {
  let rows = plane.rows();
  let cols = plane.cols();
  let half_cols = (cols + 1) / 2;
  let mut low = Array2D::zeroed(rows, half_cols);
  let mut high = Array2D::zeroed(rows, cols / 2);

  for r in 0..rows {
    let (l, h) = lift_forward(plane.row(r), &H_LEFT, &H_RIGHT);
    low.row_mut(r).copy_from_slice(&l);
    high.row_mut(r).copy_from_slice(&h);
  }
  (low, high)
}

fn forward_vertical(plane: &Array2D<i32>) -> (Array2D<i32>, Array2D<i32>) {
  let rows = plane.rows();
  let cols = plane.cols();
  let half_rows = (rows + 1) / 2;
  let mut low = Array2D::zeroed(half_rows, cols);
  let mut high = Array2D::zeroed(rows / 2, cols);

  for c in 0..cols {
    let column: Vec<i32> = (0..rows).map(|r| plane[r][c]).collect();
    let (l, h) = lift_forward(&column, &V_TOP, &V_BOTTOM);
    for r in 0..half_rows {
      low[r][c] = l[r];
    }
    for r in 0..rows / 2 {
      high[r][c] = h[r];
    }
  }
  (low, high)
}

/// One level of the pyramid: horizontal split, then a vertical split of
/// each half. Band naming is (horizontal result)(vertical result), so
/// `LL` is low-low, `HH` is high-high.
pub fn forward_level(plane: &Array2D<i32>) -> (Array2D<i32>, Array2D<i32>, Array2D<i32>, Array2D<i32>) {
  let (l, h) = forward_horizontal(plane);
  let (ll, lh) = forward_vertical(&l);
  let (hl, hh) = forward_vertical(&h);
  (ll, lh, hl, hh)
}

/// Right-shift with rounding, applied to every sample before a level's
/// filtering to keep the lifting arithmetic inside 16-bit accumulators.
fn prescale(plane: &Array2D<i32>, shift: u32) -> Array2D<i32> {
  if shift == 0 {
    return plane.clone();
  }
  let bias = (1i32 << shift) - 1;
  let mut scaled = plane.clone();
  scaled.map(|_, _, v| (v + bias) >> shift);
  scaled
}

/// Quantizer divisor via a 16.16 fixed-point reciprocal multiply: cheap
/// to apply per-coefficient and exactly matches `round(value / divisor)`
/// for the small divisor range the quality presets use.
pub fn reciprocal(divisor: u16) -> u32 {
  debug_assert!(divisor >= 1);
  (((1u64 << 16) + (divisor as u64) / 2) / divisor as u64) as u32
}

/// Quantizer midpoint bias: `(q-1)/prequant`, with a one-step decrement
/// when `prequant == 2` to match the reference rounding behavior.
fn midpoint(divisor: u16, prequant: i32) -> i32 {
  let q = divisor as i32;
  let mut m = (q - 1) / prequant;
  if prequant == 2 {
    m -= 1;
  }
  m.max(0)
}

pub fn quantize(value: i32, divisor: u16) -> i32 {
  if divisor <= 1 {
    return value;
  }
  let recip = reciprocal(divisor) as i64;
  let bias = midpoint(divisor, MIDPOINT_PREQUANT) as i64;
  let sign: i64 = if value < 0 { -1 } else { 1 };
  let magnitude = (value as i64).abs();
  let scaled = sign * (((magnitude + bias) * recip) >> 16);
  clamp16(scaled as i32)
}

/// Run the full 3-level forward transform over one decorrelated
/// component plane, quantizing each band with the divisors from
/// `quant_table` (indexed by subband number 0..10) into the pyramid's
/// `i16` storage.
pub fn forward_transform(component: &Array2D<i32>, quant_table: &[u16; 10]) -> Transform {
  let mut pyramid = Transform::new(component.rows(), component.cols());

  let mut current = prescale(component, PRESCALE_SHIFTS[0]);

  for level in 0..3 {
    let (ll, lh, hl, hh) = forward_level(&current);

    let (lh_sub, hl_sub, hh_sub) = if level == 0 {
      (7, 8, 9)
    } else if level == 1 {
      (4, 5, 6)
    } else {
      (1, 2, 3)
    };

    store_band(&mut pyramid, level, Band::LH, &lh, quant_table[lh_sub]);
    store_band(&mut pyramid, level, Band::HL, &hl, quant_table[hl_sub]);
    store_band(&mut pyramid, level, Band::HH, &hh, quant_table[hh_sub]);

    if level == 2 {
      store_band(&mut pyramid, level, Band::LL, &ll, quant_table[0]);
    } else {
      current = prescale(&ll, PRESCALE_SHIFTS[level + 1]);
    }
  }

  pyramid
}

fn store_band(pyramid: &mut Transform, level: usize, band: Band, data: &Array2D<i32>, divisor: u16) {
  let dest = pyramid.levels[level].band_mut(band);
  debug_assert_eq!((dest.rows(), dest.cols()), (data.rows(), data.cols()));
  for r in 0..data.rows() {
    for c in 0..data.cols() {
      let q = quantize(data[r][c], divisor);
      dest[r][c] = crate::util::clamp16(q) as i16;
    }
  }
  pyramid.levels[level].divisors[band as usize] = divisor;
  pyramid.levels[level].mark_valid(band);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lifting_1d_is_reversible_within_rounding_error() {
    let input: Vec<i32> = vec![10, 20, 15, 25, 12, 30, 8, 18];
    let (low, high) = lift_forward(&input, &H_LEFT, &H_RIGHT);
    let reconstructed = crate::inverse::inverse_horizontal_1d(&low, &high, input.len());
    for (a, b) in input.iter().zip(reconstructed.iter()) {
      assert!((a - b).abs() <= 2, "{} vs {}", a, b);
    }
  }

  #[test]
  fn lifting_1d_handles_odd_length() {
    let input: Vec<i32> = vec![10, 20, 15, 25, 12];
    let (low, high) = lift_forward(&input, &H_LEFT, &H_RIGHT);
    let reconstructed = crate::inverse::inverse_horizontal_1d(&low, &high, input.len());
    assert_eq!(reconstructed.len(), input.len());
  }

  #[test]
  fn quantize_with_unit_divisor_is_identity() {
    for v in [-1000, 0, 1, 4095] {
      assert_eq!(quantize(v, 1), v);
    }
  }

  #[test]
  fn quantize_rounds_toward_nearest() {
    assert_eq!(quantize(100, 24), 4); // 100/24 = 4.1666...
    assert_eq!(quantize(-100, 24), -4);
  }

  #[test]
  fn forward_transform_produces_all_ten_valid_subbands() {
    let plane: Array2D<i32> = Array2D::new_with(16, 16, |r, c| ((r * 16 + c) % 4096) as i32);
    let quant = [1u16, 24, 24, 12, 48, 48, 32, 256, 256, 384];
    let pyramid = forward_transform(&plane, &quant);
    for subband in 0..10 {
      assert!(pyramid.is_subband_valid(subband), "subband {} not valid", subband);
    }
  }
}
