//! Lookup of projected voxel centres in a view's SDF image.
//!
//! Pixel centres sit at integer coordinates. A projection is visible when the
//! pixel containing it, `floor(uv + 0.5)`, lies inside the image; both
//! sampling modes share that test so switching modes never changes which
//! voxels a view updates.

use glam::Vec2;

use crate::types::{ImageSampling, SdfImage};

/// Sample `sdf` at continuous image coordinates, or `None` outside the image.
#[inline]
pub fn sample(sdf: &SdfImage, uv: Vec2, mode: ImageSampling) -> Option<f32> {
  let (px, py) = containing_pixel(sdf, uv)?;
  Some(match mode {
    ImageSampling::Nearest => sdf.get_pixel(px, py).0[0],
    ImageSampling::Bilinear => bilinear(sdf, uv),
  })
}

#[inline]
fn containing_pixel(sdf: &SdfImage, uv: Vec2) -> Option<(u32, u32)> {
  let p = (uv + 0.5).floor();
  if !p.is_finite() || p.x < 0.0 || p.y < 0.0 {
    return None;
  }
  let (px, py) = (p.x as u32, p.y as u32);
  (px < sdf.width() && py < sdf.height()).then_some((px, py))
}

/// Blend of the 4 surrounding pixel centres, coordinates clamped to the
/// image.
fn bilinear(sdf: &SdfImage, uv: Vec2) -> f32 {
  let max = Vec2::new(sdf.width() as f32 - 1.0, sdf.height() as f32 - 1.0);
  let uv = uv.clamp(Vec2::ZERO, max);

  let x0 = uv.x.floor() as u32;
  let y0 = uv.y.floor() as u32;
  let x1 = (x0 + 1).min(sdf.width() - 1);
  let y1 = (y0 + 1).min(sdf.height() - 1);
  let tx = uv.x - x0 as f32;
  let ty = uv.y - y0 as f32;

  let at = |x: u32, y: u32| sdf.get_pixel(x, y).0[0];
  let top = at(x0, y0) * (1.0 - tx) + at(x1, y0) * tx;
  let bottom = at(x0, y1) * (1.0 - tx) + at(x1, y1) * tx;
  top * (1.0 - ty) + bottom * ty
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ramp() -> SdfImage {
    // value = x + 10 * y
    SdfImage::from_fn(4, 3, |x, y| image::Luma([x as f32 + 10.0 * y as f32]))
  }

  #[test]
  fn test_nearest_rounds_to_pixel_centre() {
    let sdf = ramp();

    assert_eq!(sample(&sdf, Vec2::new(1.0, 1.0), ImageSampling::Nearest), Some(11.0));
    assert_eq!(sample(&sdf, Vec2::new(1.49, 0.51), ImageSampling::Nearest), Some(11.0));
    assert_eq!(sample(&sdf, Vec2::new(1.5, 0.0), ImageSampling::Nearest), Some(2.0));
    assert_eq!(sample(&sdf, Vec2::new(-0.5, -0.5), ImageSampling::Nearest), Some(0.0));
  }

  #[test]
  fn test_outside_image_is_invisible() {
    let sdf = ramp();

    for uv in [
      Vec2::new(-0.51, 0.0),
      Vec2::new(0.0, -0.6),
      Vec2::new(3.5, 0.0),
      Vec2::new(0.0, 2.5),
      Vec2::new(f32::NAN, 1.0),
    ] {
      assert_eq!(sample(&sdf, uv, ImageSampling::Nearest), None, "uv {:?}", uv);
      assert_eq!(sample(&sdf, uv, ImageSampling::Bilinear), None, "uv {:?}", uv);
    }
  }

  #[test]
  fn test_bilinear_interpolates_and_clamps() {
    let sdf = ramp();

    let mid = sample(&sdf, Vec2::new(1.5, 0.5), ImageSampling::Bilinear).unwrap();
    assert!((mid - 6.5).abs() < 1e-5);

    let exact = sample(&sdf, Vec2::new(2.0, 1.0), ImageSampling::Bilinear).unwrap();
    assert!((exact - 12.0).abs() < 1e-5);

    // Inside the border pixel but past the last centre
    let edge = sample(&sdf, Vec2::new(3.4, 2.4), ImageSampling::Bilinear).unwrap();
    assert!((edge - 23.0).abs() < 1e-5);
  }
}
