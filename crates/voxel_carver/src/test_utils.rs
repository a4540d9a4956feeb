//! Test utilities shared by carving and extraction tests.
//!
//! Provides synthetic silhouettes, axis-aligned orthographic rigs and mesh
//! topology checks.

use std::collections::HashMap;

use glam::{Vec2, Vec3};
use image::{GrayImage, Luma};

use crate::camera::{look_at, OrthoCamera};
use crate::grid::VoxelGrid;
use crate::types::Mesh;

// =============================================================================
// Silhouettes & cameras
// =============================================================================

/// Image size of the orthographic test rig.
pub const RIG_SIZE: u32 = 40;

/// Pixels per world unit of the orthographic test rig.
pub const RIG_SCALE: f32 = 8.0;

/// Filled square covering pixels `lo..=hi` on both axes.
pub fn square_silhouette(size: u32, lo: u32, hi: u32) -> GrayImage {
  GrayImage::from_fn(size, size, |x, y| {
    if (lo..=hi).contains(&x) && (lo..=hi).contains(&y) {
      Luma([255])
    } else {
      Luma([0])
    }
  })
}

/// Silhouette of the cube `[-1, 1]^3` as seen by the rig cameras.
///
/// Pixels 12..=27 span world coordinates `[-1, 1]` at 8 px per unit.
pub fn unit_cube_silhouette() -> GrayImage {
  square_silhouette(RIG_SIZE, 12, 27)
}

/// Orthographic camera at `eye` looking at the origin with +Y up.
pub fn rig_camera(eye: Vec3) -> OrthoCamera {
  let centre = (RIG_SIZE as f32 - 1.0) * 0.5;
  OrthoCamera::new(
    RIG_SIZE,
    RIG_SIZE,
    look_at(eye, Vec3::ZERO, Vec3::Y),
    Vec2::splat(RIG_SCALE),
    Vec2::splat(centre),
  )
}

/// Two orthogonal rig cameras, looking down -Z and -X.
pub fn orthogonal_rig() -> Vec<OrthoCamera> {
  vec![
    rig_camera(Vec3::new(0.0, 0.0, 5.0)),
    rig_camera(Vec3::new(5.0, 0.0, 0.0)),
  ]
}

/// Snapshot of every voxel's fused state.
pub fn fused_state(grid: &VoxelGrid) -> Vec<(f32, u32)> {
  grid.voxels().iter().map(|v| (v.sdf, v.update_num)).collect()
}

// =============================================================================
// Mesh checks
// =============================================================================

/// True when every undirected edge is shared by exactly two triangles and
/// each directed edge appears once (closed and consistently oriented).
pub fn is_closed_and_oriented(mesh: &Mesh) -> bool {
  let mut directed: HashMap<(u32, u32), usize> = HashMap::new();
  for &[a, b, c] in mesh.triangles() {
    for edge in [(a, b), (b, c), (c, a)] {
      *directed.entry(edge).or_default() += 1;
    }
  }
  directed
    .iter()
    .all(|(&(a, b), &count)| count == 1 && directed.get(&(b, a)) == Some(&1))
}

/// Signed volume enclosed by the mesh; positive for outward winding.
pub fn signed_volume(mesh: &Mesh) -> f32 {
  let v = mesh.vertices();
  mesh
    .triangles()
    .iter()
    .map(|&[a, b, c]| {
      v[a as usize].dot(v[b as usize].cross(v[c as usize])) / 6.0
    })
    .sum()
}
