//! Dense voxel storage over an axis-aligned bounding box.
//!
//! The grid owns one [`Voxel`] per cell in X-fastest order (see
//! [`crate::constants`]). Geometry (`voxel_num`, `pos`) is fixed at
//! [`VoxelGrid::init`]; carving only ever touches `sdf` and `update_num`,
//! extraction only `outside` and `on_surface`.

use glam::{UVec3, Vec3};

use crate::error::CarveError;

/// One cell of the carving volume.
#[derive(Clone, Debug, PartialEq)]
pub struct Voxel {
  /// Grid coordinate.
  pub index: UVec3,
  /// Linear index, `z * nx * ny + y * nx + x`.
  pub id: usize,
  /// World-space centre.
  pub pos: Vec3,
  /// Fused signed distance (negative = inside every silhouette seen so far).
  pub sdf: f32,
  /// Number of samples fused into `sdf`.
  pub update_num: u32,
  pub outside: bool,
  pub on_surface: bool,
}

impl Default for Voxel {
  fn default() -> Self {
    Self {
      index: UVec3::ZERO,
      id: 0,
      pos: Vec3::ZERO,
      sdf: 0.0,
      update_num: 0,
      outside: false,
      on_surface: false,
    }
  }
}

/// Regular grid of voxels.
#[derive(Clone, Debug, Default)]
pub struct VoxelGrid {
  voxels: Vec<Voxel>,
  bb_min: Vec3,
  bb_max: Vec3,
  resolution: f32,
  voxel_num: UVec3,
  xy_slice_num: usize,
}

impl VoxelGrid {
  /// Empty, uninitialized grid.
  pub fn new() -> Self {
    Self::default()
  }

  /// Allocate `ceil((bb_max - bb_min) / resolution)` voxels per axis.
  ///
  /// When the extent is not a multiple of `resolution` the last layer pokes
  /// past `bb_max`: centres lie in `[bb_min + resolution / 2,
  /// bb_max + resolution / 2)`.
  ///
  /// Any previous voxel state is discarded, including when validation fails:
  /// a failed `init` leaves the grid uninitialized.
  pub fn init(&mut self, bb_max: Vec3, bb_min: Vec3, resolution: f32) -> Result<(), CarveError> {
    *self = Self::default();

    if !(resolution.is_finite() && resolution > 0.0) {
      tracing::warn!(resolution, "rejecting voxel resolution");
      return Err(CarveError::InvalidResolution(resolution));
    }
    if !(bb_min.is_finite() && bb_max.is_finite() && bb_max.cmpgt(bb_min).all()) {
      tracing::warn!(?bb_min, ?bb_max, "rejecting bounding box");
      return Err(CarveError::InvalidBoundingBox {
        min: bb_min,
        max: bb_max,
      });
    }

    let extent = (bb_max - bb_min) / resolution;
    let voxel_num = extent.ceil().as_uvec3().max(UVec3::ONE);
    let xy_slice_num = voxel_num.x as usize * voxel_num.y as usize;
    let total = xy_slice_num * voxel_num.z as usize;

    let mut voxels = Vec::with_capacity(total);
    for z in 0..voxel_num.z {
      for y in 0..voxel_num.y {
        for x in 0..voxel_num.x {
          let index = UVec3::new(x, y, z);
          voxels.push(Voxel {
            index,
            id: voxels.len(),
            pos: bb_min + (index.as_vec3() + 0.5) * resolution,
            ..Default::default()
          });
        }
      }
    }

    tracing::debug!(
      nx = voxel_num.x,
      ny = voxel_num.y,
      nz = voxel_num.z,
      total,
      bytes = total * std::mem::size_of::<Voxel>(),
      "voxel grid initialized"
    );

    *self = Self {
      voxels,
      bb_min,
      bb_max,
      resolution,
      voxel_num,
      xy_slice_num,
    };
    Ok(())
  }

  #[inline]
  pub fn initialized(&self) -> bool {
    !self.voxels.is_empty()
  }

  #[inline]
  pub fn voxel_num(&self) -> UVec3 {
    self.voxel_num
  }

  #[inline]
  pub fn resolution(&self) -> f32 {
    self.resolution
  }

  #[inline]
  pub fn bb_min(&self) -> Vec3 {
    self.bb_min
  }

  #[inline]
  pub fn bb_max(&self) -> Vec3 {
    self.bb_max
  }

  #[inline]
  pub fn voxels(&self) -> &[Voxel] {
    &self.voxels
  }

  #[inline]
  pub fn voxels_mut(&mut self) -> &mut [Voxel] {
    &mut self.voxels
  }

  /// Linear index of `(x, y, z)`. Does not bounds-check.
  #[inline(always)]
  pub fn linear_index(&self, x: u32, y: u32, z: u32) -> usize {
    z as usize * self.xy_slice_num + y as usize * self.voxel_num.x as usize + x as usize
  }

  /// Whether a signed coordinate lies inside the grid.
  #[inline]
  pub fn contains(&self, x: i64, y: i64, z: i64) -> bool {
    x >= 0
      && y >= 0
      && z >= 0
      && x < self.voxel_num.x as i64
      && y < self.voxel_num.y as i64
      && z < self.voxel_num.z as i64
  }

  /// # Panics
  ///
  /// Panics if the coordinate is out of range.
  #[inline]
  pub fn get(&self, x: u32, y: u32, z: u32) -> &Voxel {
    self.check_bounds(x, y, z);
    &self.voxels[self.linear_index(x, y, z)]
  }

  /// # Panics
  ///
  /// Panics if the coordinate is out of range.
  #[inline]
  pub fn get_mut(&mut self, x: u32, y: u32, z: u32) -> &mut Voxel {
    self.check_bounds(x, y, z);
    let id = self.linear_index(x, y, z);
    &mut self.voxels[id]
  }

  /// Apply `f` to a single voxel.
  pub fn update<F: FnOnce(&mut Voxel)>(&mut self, x: u32, y: u32, z: u32, f: F) {
    f(self.get_mut(x, y, z));
  }

  /// Clear `on_surface` on every voxel, leaving everything else as is.
  pub fn reset_on_surface(&mut self) {
    for voxel in &mut self.voxels {
      voxel.on_surface = false;
    }
  }

  #[inline]
  fn check_bounds(&self, x: u32, y: u32, z: u32) {
    assert!(
      x < self.voxel_num.x && y < self.voxel_num.y && z < self.voxel_num.z,
      "voxel ({}, {}, {}) out of range {:?}",
      x,
      y,
      z,
      self.voxel_num
    );
  }
}

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;
