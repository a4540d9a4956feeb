//! Camera models used to project voxel centres into silhouette images.
//!
//! # Conventions
//!
//! ```text
//! Camera space:            Image space:
//!
//!        +Z (forward)       (0,0)───────── +u
//!       /                     │
//!      /                      │
//!     └───── +X (right)       +v
//!     │
//!     +Y (down)
//! ```
//!
//! Pixel centres sit at integer coordinates, so pixel `(i, j)` covers
//! `[i - 0.5, i + 0.5) x [j - 0.5, j + 0.5)`. Poses are camera-to-world
//! transforms.

use glam::{Affine3A, Mat3, Vec2, Vec3};

/// Projection of world-space points into a fixed-size image.
pub trait Camera: Send + Sync {
  /// Image width in pixels.
  fn width(&self) -> u32;

  /// Image height in pixels.
  fn height(&self) -> u32;

  /// Project a world-space point to continuous image coordinates.
  ///
  /// Returns `None` when the point is outside the camera's valid field of
  /// view (for example behind a pinhole camera). The result may still fall
  /// outside the image rectangle; bounds are checked by the caller.
  fn project(&self, point: Vec3) -> Option<Vec2>;
}

impl<T: Camera + ?Sized> Camera for &T {
  fn width(&self) -> u32 {
    (**self).width()
  }

  fn height(&self) -> u32 {
    (**self).height()
  }

  fn project(&self, point: Vec3) -> Option<Vec2> {
    (**self).project(point)
  }
}

impl<T: Camera + ?Sized> Camera for Box<T> {
  fn width(&self) -> u32 {
    (**self).width()
  }

  fn height(&self) -> u32 {
    (**self).height()
  }

  fn project(&self, point: Vec3) -> Option<Vec2> {
    (**self).project(point)
  }
}

/// Camera-to-world pose looking from `eye` towards `target`.
///
/// The camera's +Y axis is aligned with `-up`, matching the image-down
/// convention. `up` must not be parallel to the viewing direction.
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Affine3A {
  let forward = (target - eye).normalize();
  let right = forward.cross(up).normalize();
  let down = forward.cross(right);
  Affine3A::from_mat3_translation(Mat3::from_cols(right, down, forward), eye)
}

/// Pinhole (perspective) camera.
#[derive(Clone, Debug, PartialEq)]
pub struct PinholeCamera {
  width: u32,
  height: u32,
  c2w: Affine3A,
  w2c: Affine3A,
  /// Focal length in pixels (x, y).
  focal: Vec2,
  /// Principal point in pixels.
  principal: Vec2,
}

impl PinholeCamera {
  pub fn new(width: u32, height: u32, c2w: Affine3A, focal: Vec2, principal: Vec2) -> Self {
    Self {
      width,
      height,
      c2w,
      w2c: c2w.inverse(),
      focal,
      principal,
    }
  }

  /// Camera with square pixels, a vertical field of view in radians and the
  /// principal point at the image centre.
  pub fn from_fov_y(width: u32, height: u32, c2w: Affine3A, fov_y: f32) -> Self {
    let f = 0.5 * height as f32 / (0.5 * fov_y).tan();
    let principal = Vec2::new(width as f32 - 1.0, height as f32 - 1.0) * 0.5;
    Self::new(width, height, c2w, Vec2::splat(f), principal)
  }

  pub fn c2w(&self) -> &Affine3A {
    &self.c2w
  }

  pub fn focal(&self) -> Vec2 {
    self.focal
  }

  pub fn principal(&self) -> Vec2 {
    self.principal
  }
}

impl Camera for PinholeCamera {
  fn width(&self) -> u32 {
    self.width
  }

  fn height(&self) -> u32 {
    self.height
  }

  #[inline]
  fn project(&self, point: Vec3) -> Option<Vec2> {
    let p = self.w2c.transform_point3(point);
    if p.z <= f32::EPSILON {
      return None;
    }
    Some(self.focal * Vec2::new(p.x, p.y) / p.z + self.principal)
  }
}

/// Orthographic camera. `scale` is pixels per world unit.
#[derive(Clone, Debug, PartialEq)]
pub struct OrthoCamera {
  width: u32,
  height: u32,
  c2w: Affine3A,
  w2c: Affine3A,
  scale: Vec2,
  principal: Vec2,
}

impl OrthoCamera {
  pub fn new(width: u32, height: u32, c2w: Affine3A, scale: Vec2, principal: Vec2) -> Self {
    Self {
      width,
      height,
      c2w,
      w2c: c2w.inverse(),
      scale,
      principal,
    }
  }

  pub fn c2w(&self) -> &Affine3A {
    &self.c2w
  }

  pub fn scale(&self) -> Vec2 {
    self.scale
  }

  pub fn principal(&self) -> Vec2 {
    self.principal
  }
}

impl Camera for OrthoCamera {
  fn width(&self) -> u32 {
    self.width
  }

  fn height(&self) -> u32 {
    self.height
  }

  #[inline]
  fn project(&self, point: Vec3) -> Option<Vec2> {
    let p = self.w2c.transform_point3(point);
    Some(self.scale * Vec2::new(p.x, p.y) + self.principal)
  }
}

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;
