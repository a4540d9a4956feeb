use image::{GrayImage, Luma};

use super::*;
use crate::distance_transform::l1_sentinel;

const RAW: SdfOptions = SdfOptions {
  minmax_normalize: false,
  truncation_band: None,
};

/// 20x20 mask with a filled square over pixels 5..=14.
fn square_mask() -> GrayImage {
  GrayImage::from_fn(20, 20, |x, y| {
    if (5..=14).contains(&x) && (5..=14).contains(&y) {
      Luma([255])
    } else {
      Luma([0])
    }
  })
}

#[test]
fn test_sign_flips_across_boundary() {
  let mask = square_mask();
  let sdf = make_signed_distance_field(&mask, &RAW);

  assert_eq!(sdf.dimensions(), mask.dimensions());
  for (m, d) in mask.pixels().zip(sdf.pixels()) {
    if m.0[0] != 0 {
      assert!(d.0[0] <= -1.0);
    } else {
      assert!(d.0[0] >= 1.0);
    }
  }

  // Row through the middle of the square: -1 | +1 at both edges
  assert_eq!(sdf.get_pixel(4, 10).0[0], 1.0);
  assert_eq!(sdf.get_pixel(5, 10).0[0], -1.0);
  assert_eq!(sdf.get_pixel(14, 10).0[0], -1.0);
  assert_eq!(sdf.get_pixel(15, 10).0[0], 1.0);
  assert_eq!(sdf.get_pixel(9, 9).0[0], -5.0);
  assert_eq!(sdf.get_pixel(0, 10).0[0], 5.0);
}

#[test]
fn test_truncation_clamps_to_band() {
  let mask = square_mask();
  let options = SdfOptions {
    minmax_normalize: false,
    truncation_band: Some(3.0),
  };
  let sdf = make_signed_distance_field(&mask, &options);

  assert!(sdf.iter().all(|d| (-3.0..=3.0).contains(d)));
  assert_eq!(sdf.get_pixel(9, 9).0[0], -3.0);
  assert_eq!(sdf.get_pixel(0, 0).0[0], 3.0);
  assert_eq!(sdf.get_pixel(4, 10).0[0], 1.0);
}

#[test]
fn test_normalization_hits_both_extremes() {
  let mask = square_mask();
  let options = SdfOptions {
    minmax_normalize: true,
    truncation_band: None,
  };
  let sdf = make_signed_distance_field(&mask, &options);

  let min = sdf.iter().cloned().fold(f32::INFINITY, f32::min);
  let max = sdf.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
  assert_eq!(min, -1.0);
  assert_eq!(max, 1.0);

  // Sign is preserved
  assert!(sdf.get_pixel(5, 10).0[0] < 0.0);
  assert!(sdf.get_pixel(4, 10).0[0] > 0.0);
}

#[test]
fn test_normalization_sides_scale_independently() {
  let mask = square_mask();
  let raw = make_signed_distance_field(&mask, &RAW);
  let normalized = make_signed_distance_field(
    &mask,
    &SdfOptions {
      minmax_normalize: true,
      truncation_band: None,
    },
  );

  // Deepest inside is 5, farthest outside is 10 (corner to corner of square)
  let raw_min = raw.iter().cloned().fold(0.0, f32::min);
  let raw_max = raw.iter().cloned().fold(0.0, f32::max);
  assert_eq!(raw_min, -5.0);
  assert_eq!(raw_max, 10.0);

  assert_eq!(normalized.get_pixel(5, 10).0[0], -1.0 / 5.0);
  assert_eq!(normalized.get_pixel(4, 10).0[0], 1.0 / 10.0);
}

#[test]
fn test_uniform_masks_use_sentinel() {
  let sentinel = l1_sentinel(20, 20);
  let full = GrayImage::from_pixel(20, 20, Luma([255]));
  let empty = GrayImage::new(20, 20);

  let inside = make_signed_distance_field(&full, &RAW);
  let outside = make_signed_distance_field(&empty, &RAW);

  assert!(inside.iter().all(|&d| d == -sentinel));
  assert!(outside.iter().all(|&d| d == sentinel));

  // One-sided normalization leaves no zero crossing
  let normalized = make_signed_distance_field(&full, &SdfOptions::default());
  assert!(normalized.iter().all(|&d| d == -1.0));
}

#[test]
fn test_default_options() {
  let options = SdfOptions::default();
  assert!(options.minmax_normalize);
  assert_eq!(options.truncation_band, Some(10.0));
}

#[test]
fn test_signed_distance_to_color() {
  let sdf = SdfImage::from_raw(4, 1, vec![2.0, -1.0, 0.0, 10.0]).unwrap();

  let color = signed_distance_to_color(&sdf, -2.0, 4.0);

  assert_eq!(color.get_pixel(0, 0).0, [128, 0, 0]);
  assert_eq!(color.get_pixel(1, 0).0, [0, 0, 128]);
  assert_eq!(color.get_pixel(2, 0).0, [0, 0, 0]);
  assert_eq!(color.get_pixel(3, 0).0, [255, 0, 0]);
}

#[test]
fn test_signed_distance_to_color_disabled_side() {
  let sdf = SdfImage::from_raw(2, 1, vec![3.0, -3.0]).unwrap();

  let color = signed_distance_to_color(&sdf, 0.0, 0.0);

  assert!(color.pixels().all(|p| p.0 == [0, 0, 0]));
}
