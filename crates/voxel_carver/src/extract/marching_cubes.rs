//! Iso-surface extraction with marching cubes.
//!
//! # Cells
//!
//! ```text
//!  x   x   x   x   x        o  voxel centre (fused sdf)
//!    ┌───────────┐          x  virtual corner one voxel beyond the grid,
//!  x │ o   o   o │ x           valued iso_level + BORDER_OFFSET
//!    │           │
//!  x │ o   o   o │ x        Cells span 2x2x2 neighbouring corners of the
//!    └───────────┘          padded lattice, so an n-voxel axis has n + 1
//!  x   x   x   x   x        cells and the surface closes at the grid box.
//! ```
//!
//! # Vertex Sharing
//!
//! Every cell edge joins two neighbouring lattice corners. The crossing
//! vertex is keyed by the lower corner's padded index and the edge axis
//! (`id * 3 + axis`), so the 4 cells around an edge reuse one mesh vertex.

use std::collections::HashMap;

use glam::{UVec3, Vec3};

use super::tables::{EDGE_CORNERS, EDGE_TABLE, TRI_TABLE};
use crate::constants::CELL_CORNER_OFFSETS;
use crate::grid::VoxelGrid;
use crate::types::Mesh;

/// Values closer than this are treated as equal during interpolation.
const INTERPOLATION_EPSILON: f32 = 1e-12;

/// How far above the iso level corners outside the grid sit.
const BORDER_OFFSET: f32 = 1.0;

/// Append the `iso_level` surface of `grid`'s fused field to `mesh`.
///
/// Space outside the grid counts as outside the shape, so an occupied
/// region touching the grid border is capped half a voxel beyond the
/// border centres. Triangles face towards increasing values (out of the
/// carved shape). Returns the number of triangles added.
#[tracing::instrument(skip_all, name = "extract::iso_surface")]
pub fn extract_iso_surface(grid: &VoxelGrid, mesh: &mut Mesh, iso_level: f32) -> usize {
  if !grid.initialized() {
    return 0;
  }

  let lattice = PaddedLattice::new(grid, iso_level + BORDER_OFFSET);
  let n = grid.voxel_num();
  let mut edge_vertices: HashMap<usize, u32> = HashMap::new();
  let triangles_before = mesh.triangle_count();

  for z in -1..n.z as i64 {
    for y in -1..n.y as i64 {
      for x in -1..n.x as i64 {
        let corners: [[i64; 3]; 8] = CELL_CORNER_OFFSETS
          .map(|[dx, dy, dz]| [x + dx as i64, y + dy as i64, z + dz as i64]);
        let values = corners.map(|corner| lattice.value(corner));

        let mut case = 0usize;
        for (bit, &value) in values.iter().enumerate() {
          if value < iso_level {
            case |= 1 << bit;
          }
        }

        if EDGE_TABLE[case] == 0 {
          continue;
        }

        let row = &TRI_TABLE[case];
        for tri in row.chunks_exact(3).take_while(|tri| tri[0] >= 0) {
          let [a, b, c] = [tri[0], tri[1], tri[2]].map(|edge| {
            lattice.edge_vertex(
              mesh,
              &mut edge_vertices,
              &corners,
              &values,
              edge as usize,
              iso_level,
            )
          });
          // Table winding faces the inside corners
          mesh.add_triangle([a, c, b]);
        }
      }
    }
  }

  let added = mesh.triangle_count() - triangles_before;
  tracing::debug!(
    triangles = added,
    vertices = edge_vertices.len(),
    iso_level,
    "iso surface extracted"
  );
  added
}

/// Voxel centres plus a one-voxel ring of constant-valued corners.
struct PaddedLattice<'a> {
  grid: &'a VoxelGrid,
  border_value: f32,
  dims: UVec3,
}

impl<'a> PaddedLattice<'a> {
  fn new(grid: &'a VoxelGrid, border_value: f32) -> Self {
    Self {
      grid,
      border_value,
      dims: grid.voxel_num() + UVec3::splat(2),
    }
  }

  #[inline]
  fn value(&self, [x, y, z]: [i64; 3]) -> f32 {
    if self.grid.contains(x, y, z) {
      self.grid.voxels()[self.grid.linear_index(x as u32, y as u32, z as u32)].sdf
    } else {
      self.border_value
    }
  }

  /// Same formula as the voxel centres, extended past the grid.
  #[inline]
  fn position(&self, [x, y, z]: [i64; 3]) -> Vec3 {
    let index = Vec3::new(x as f32, y as f32, z as f32);
    self.grid.bb_min() + (index + 0.5) * self.grid.resolution()
  }

  #[inline]
  fn padded_id(&self, [x, y, z]: [i64; 3]) -> usize {
    let [x, y, z] = [x + 1, y + 1, z + 1].map(|v| v as usize);
    (z * self.dims.y as usize + y) * self.dims.x as usize + x
  }

  /// Mesh vertex where `edge` of the cell crosses the iso level, created
  /// on first use.
  fn edge_vertex(
    &self,
    mesh: &mut Mesh,
    cache: &mut HashMap<usize, u32>,
    corners: &[[i64; 3]; 8],
    values: &[f32; 8],
    edge: usize,
    iso_level: f32,
  ) -> u32 {
    let [c0, c1] = EDGE_CORNERS[edge].map(usize::from);
    let (lo, hi) = if corners[c0] <= corners[c1] {
      (c0, c1)
    } else {
      (c1, c0)
    };
    let axis = (0..3)
      .position(|i| corners[lo][i] != corners[hi][i])
      .unwrap_or(0);

    *cache
      .entry(self.padded_id(corners[lo]) * 3 + axis)
      .or_insert_with(|| {
        mesh.add_vertex(interpolate(
          self.position(corners[lo]),
          self.position(corners[hi]),
          values[lo],
          values[hi],
          iso_level,
        ))
      })
  }
}

/// Point on `p0..p1` where the linear interpolation of `v0..v1` hits `iso`.
#[inline]
fn interpolate(p0: Vec3, p1: Vec3, v0: f32, v1: f32, iso: f32) -> Vec3 {
  let delta = v1 - v0;
  let t = if delta.abs() < INTERPOLATION_EPSILON {
    0.5
  } else {
    ((iso - v0) / delta).clamp(0.0, 1.0)
  };
  p0 + (p1 - p0) * t
}

#[cfg(test)]
#[path = "marching_cubes_test.rs"]
mod marching_cubes_test;
