//! Outside / on-surface classification of a fused grid.
//!
//! A voxel is *observed* once any view fused a sample into it and *solid*
//! when its fused value is negative.
//!
//! ```text
//!                     observed & solid   observed & !solid   unobserved
//! outside (default)         no                 yes               yes
//! outside (pseudo)          no                 yes               no
//! ```
//!
//! A non-outside voxel is on the surface when it touches the grid border or
//! has an outside face neighbour.

use rayon::prelude::*;

use crate::constants::FACE_OFFSETS;
use crate::grid::{Voxel, VoxelGrid};

#[inline]
fn is_outside(voxel: &Voxel, with_pseudo_surface: bool) -> bool {
  let observed = voxel.update_num > 0;
  let solid = voxel.sdf < 0.0;
  if with_pseudo_surface {
    observed && !solid
  } else {
    !(observed && solid)
  }
}

/// Recompute `outside` and `on_surface` for every voxel.
pub fn classify(grid: &mut VoxelGrid, with_pseudo_surface: bool) {
  grid.reset_on_surface();
  for voxel in grid.voxels_mut() {
    voxel.outside = is_outside(voxel, with_pseudo_surface);
  }

  let on_surface: Vec<bool> = {
    let grid = &*grid;
    grid
      .voxels()
      .par_iter()
      .map(|voxel| !voxel.outside && touches_outside(grid, voxel))
      .collect()
  };

  for (voxel, on_surface) in grid.voxels_mut().iter_mut().zip(on_surface) {
    voxel.on_surface = on_surface;
  }
}

/// Whether any face neighbour is outside or missing (grid border).
fn touches_outside(grid: &VoxelGrid, voxel: &Voxel) -> bool {
  let (x, y, z) = (
    voxel.index.x as i64,
    voxel.index.y as i64,
    voxel.index.z as i64,
  );
  FACE_OFFSETS.iter().any(|[dx, dy, dz]| {
    let (nx, ny, nz) = (x + dx, y + dy, z + dz);
    !grid.contains(nx, ny, nz) || grid.get(nx as u32, ny as u32, nz as u32).outside
  })
}
