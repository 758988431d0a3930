//! RGB thumbnail conversion.
//!
//! A GPR file's decorrelated planes already hold one red, one blue, and
//! one averaged-green sample per 2x2 Bayer block, so a half-resolution
//! RGB preview needs no demosaic interpolation: it's a straight
//! per-block read of GS/RG/BG (undoing the decorrelation bias), scaled
//! by the white-balance gains carried in the `CameraGains` header tag.

use crate::array2d::Array2D;
use crate::bayer::{CompandingCurve, DecorrelatedComponents};
use crate::consts::MIDPOINT;
use crate::util::clamp;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraGains {
  pub r: f32,
  pub g: f32,
  pub b: f32,
}

impl CameraGains {
  /// Header tag values are 8.8 fixed point (256 == unity gain).
  pub fn from_raw(raw: [u16; 3]) -> Self {
    Self { r: raw[0] as f32 / 256.0, g: raw[1] as f32 / 256.0, b: raw[2] as f32 / 256.0 }
  }

  pub fn unity() -> Self {
    Self { r: 1.0, g: 1.0, b: 1.0 }
  }
}

/// Half-resolution 8-bit-per-channel RGB preview, one pixel per
/// original 2x2 Bayer block.
pub fn to_half_res_rgb(components: &DecorrelatedComponents, gains: CameraGains, companding: &CompandingCurve) -> Array2D<[u8; 3]> {
  let rows = components.gs.rows();
  let cols = components.gs.cols();
  let mut out: Array2D<[u8; 3]> = Array2D::zeroed(rows, cols);

  for i in 0..rows {
    for j in 0..cols {
      let avg_green = companding.decompand(components.gs[i][j]);
      let r = (components.rg[i][j] - MIDPOINT) + avg_green;
      let b = (components.bg[i][j] - MIDPOINT) + avg_green;

      let r = clamp((r as f32 * gains.r) as i32, 0, 4095);
      let g = clamp((avg_green as f32 * gains.g) as i32, 0, 4095);
      let b = clamp((b as f32 * gains.b) as i32, 0, 4095);

      out[i][j] = [(r >> 4) as u8, (g >> 4) as u8, (b >> 4) as u8];
    }
  }

  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::array2d::Array2D;
  use crate::bayer::{decorrelate, BayerPattern};

  #[test]
  fn unity_gain_preserves_relative_brightness_order() {
    let curve = CompandingCurve::new();
    let mosaic = Array2D::new_with(4, 4, |r, c| {
      // Make the top-left block bright and the bottom-right block dark.
      if r < 2 && c < 2 { 3500 } else { 500 }
    });
    let components = decorrelate(&mosaic, BayerPattern::Rggb, &curve).unwrap();
    let rgb = to_half_res_rgb(&components, CameraGains::unity(), &curve);
    assert!(rgb[0][0][1] > rgb[1][1][1]);
  }

  #[test]
  fn raw_gains_scale_from_8_8_fixed_point() {
    let gains = CameraGains::from_raw([256, 512, 128]);
    assert_eq!(gains.r, 1.0);
    assert_eq!(gains.g, 2.0);
    assert_eq!(gains.b, 0.5);
  }
}
