//! Blocky extraction: one axis-aligned cube per qualifying voxel.

use glam::Vec3;

use super::surface::classify;
use crate::constants::{CUBE_CORNERS, CUBE_TRIANGLES};
use crate::grid::VoxelGrid;
use crate::types::Mesh;

/// Classify the grid and append a cube for every surface voxel, plus every
/// non-outside voxel when `inside_empty` is false. Returns the cube count.
#[tracing::instrument(skip_all, name = "extract::voxel_shell")]
pub fn extract_voxel(
  grid: &mut VoxelGrid,
  mesh: &mut Mesh,
  inside_empty: bool,
  with_pseudo_surface: bool,
) -> usize {
  classify(grid, with_pseudo_surface);

  let size = grid.resolution();
  let mut cubes = 0;
  for voxel in grid.voxels() {
    let emit = if inside_empty {
      voxel.on_surface
    } else {
      !voxel.outside
    };
    if emit {
      push_cube(mesh, voxel.pos, size);
      cubes += 1;
    }
  }

  tracing::debug!(cubes, inside_empty, with_pseudo_surface, "voxel shell extracted");
  cubes
}

fn push_cube(mesh: &mut Mesh, center: Vec3, size: f32) {
  let base = mesh.vertex_count() as u32;
  for corner in &CUBE_CORNERS {
    mesh.add_vertex(center + Vec3::from_array(*corner) * size);
  }
  for [a, b, c] in CUBE_TRIANGLES {
    mesh.add_triangle([base + a, base + b, base + c]);
  }
}
