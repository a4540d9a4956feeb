//! Signed distance fields built from silhouette masks.
//!
//! # Sign Convention
//!
//! ```text
//!   mask          sdf (untruncated)
//!
//!   0 0 0 0 0     3  2  1  2  3
//!   0 0 1 0 0     2  1 -1  1  2
//!   0 1 1 1 0     1 -1 -2 -1  1
//!   0 0 1 0 0     2  1 -1  1  2
//! ```
//!
//! Set pixels are negative (inside the silhouette), unset pixels positive.
//! Magnitudes are L1 distances to the nearest pixel of the other kind, so
//! the sign flips exactly across the mask boundary and `|sdf| >= 1`.

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::distance_transform::{distance_transform_l1, distance_transform_l1_inverted};
use crate::types::SdfImage;

/// Post-processing applied after the raw signed distances are computed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SdfOptions {
  /// Scale negative values by `1 / |min|` and positive ones by `1 / max`.
  pub minmax_normalize: bool,
  /// Clamp to `[-band, band]` before normalizing.
  pub truncation_band: Option<f32>,
}

impl Default for SdfOptions {
  fn default() -> Self {
    Self {
      minmax_normalize: true,
      truncation_band: Some(crate::constants::DEFAULT_TRUNCATION_BAND),
    }
  }
}

/// Build the signed distance field of `mask` (non-zero = inside).
pub fn make_signed_distance_field(mask: &GrayImage, options: &SdfOptions) -> SdfImage {
  let outer = distance_transform_l1(mask);
  let inner = distance_transform_l1_inverted(mask);

  let mut sdf = SdfImage::from_fn(mask.width(), mask.height(), |x, y| {
    if mask.get_pixel(x, y).0[0] != 0 {
      Luma([-inner.get_pixel(x, y).0[0]])
    } else {
      Luma([outer.get_pixel(x, y).0[0]])
    }
  });

  if let Some(band) = options.truncation_band {
    for d in sdf.iter_mut() {
      *d = d.clamp(-band, band);
    }
  }

  if options.minmax_normalize {
    minmax_normalize(&mut sdf);
  }

  sdf
}

/// Map negative values to `[-1, 0)` and positive values to `(0, 1]`
/// independently. A side without values is left as is.
fn minmax_normalize(sdf: &mut SdfImage) {
  let (min, max) = sdf
    .iter()
    .fold((0.0f32, 0.0f32), |(lo, hi), &d| (lo.min(d), hi.max(d)));

  for d in sdf.iter_mut() {
    if *d < 0.0 && min < 0.0 {
      *d /= -min;
    } else if *d > 0.0 && max > 0.0 {
      *d /= max;
    }
  }
}

/// Visualize a signed distance field.
///
/// Positive distances are drawn in red, scaled so `max_positive_d` is full
/// intensity; negative distances in blue, scaled by `min_negative_d`.
/// Values past the scale saturate. A non-positive `max_positive_d` (or
/// non-negative `min_negative_d`) leaves that side black.
pub fn signed_distance_to_color(
  sdf: &SdfImage,
  min_negative_d: f32,
  max_positive_d: f32,
) -> RgbImage {
  let intensity = |ratio: f32| (255.0 * ratio.clamp(0.0, 1.0)).round() as u8;

  RgbImage::from_fn(sdf.width(), sdf.height(), |x, y| {
    let d = sdf.get_pixel(x, y).0[0];
    if d > 0.0 && max_positive_d > 0.0 {
      Rgb([intensity(d / max_positive_d), 0, 0])
    } else if d < 0.0 && min_negative_d < 0.0 {
      Rgb([0, 0, intensity(d / min_negative_d)])
    } else {
      Rgb([0, 0, 0])
    }
  })
}

#[cfg(test)]
#[path = "sdf_test.rs"]
mod sdf_test;
