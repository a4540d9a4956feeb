//! Exact L1 (city block) distance transform of a binary mask.
//!
//! Two raster passes over a 4-neighbourhood propagate distances from the set
//! pixels:
//!
//! ```text
//! forward (top-left → bottom-right)    backward (bottom-right → top-left)
//!
//!        . [y-1] .                            .   p   [x+1]
//!     [x-1]  p   .                            . [y+1]  .
//! ```
//!
//! Each pass is a single linear sweep, so the whole transform is `O(w * h)`.

use image::{GrayImage, Luma};

use crate::types::SdfImage;

/// Value written everywhere when a mask has no boundary (all set or all
/// unset). Strictly larger than any L1 distance between two pixels.
#[inline]
pub fn l1_sentinel(width: u32, height: u32) -> f32 {
  (width + height) as f32
}

/// L1 distance from each pixel to the nearest set (non-zero) pixel.
///
/// Set pixels get `0`. A uniform mask gets [`l1_sentinel`] everywhere.
pub fn distance_transform_l1(mask: &GrayImage) -> SdfImage {
  distance_transform_l1_by(mask, |luma| luma != 0)
}

/// Same as [`distance_transform_l1`] but with the roles of set and unset
/// pixels swapped, without materializing the complement mask.
pub fn distance_transform_l1_inverted(mask: &GrayImage) -> SdfImage {
  distance_transform_l1_by(mask, |luma| luma == 0)
}

fn distance_transform_l1_by(mask: &GrayImage, is_seed: impl Fn(u8) -> bool) -> SdfImage {
  let (width, height) = mask.dimensions();
  let sentinel = l1_sentinel(width, height);
  let (w, h) = (width as usize, height as usize);

  let mut out = SdfImage::from_pixel(width, height, Luma([sentinel]));
  let dist: &mut [f32] = &mut out;

  let mut seeds = 0usize;
  for (d, &luma) in dist.iter_mut().zip(mask.as_raw().iter()) {
    if is_seed(luma) {
      *d = 0.0;
      seeds += 1;
    }
  }

  if seeds == 0 || seeds == w * h {
    dist.fill(sentinel);
    return out;
  }

  // Forward pass
  for y in 0..h {
    let row = y * w;
    for x in 0..w {
      let i = row + x;
      let mut d = dist[i];
      if x > 0 {
        d = d.min(dist[i - 1] + 1.0);
      }
      if y > 0 {
        d = d.min(dist[i - w] + 1.0);
      }
      dist[i] = d;
    }
  }

  // Backward pass
  for y in (0..h).rev() {
    let row = y * w;
    for x in (0..w).rev() {
      let i = row + x;
      let mut d = dist[i];
      if x + 1 < w {
        d = d.min(dist[i + 1] + 1.0);
      }
      if y + 1 < h {
        d = d.min(dist[i + w] + 1.0);
      }
      dist[i] = d;
    }
  }

  out
}

#[cfg(test)]
#[path = "distance_transform_test.rs"]
mod distance_transform_test;
