//! Grid layout constants shared by carving and extraction.
//!
//! # Voxel Layout
//!
//! ```text
//! Voxel memory layout (row-major, X innermost):
//!
//! Address:  0        1        ...  nx-1        nx       ...  nx*ny   ...
//! Content: [0,0,0]  [1,0,0]   ... [nx-1,0,0]  [0,1,0]  ... [0,0,1] ...
//!          └──────────── X ──────────────┘    └── X ──┘
//!
//! id = z * (nx * ny) + y * nx + x
//! ```
//!
//! # Coordinate System
//!
//! ```text
//!         +Y
//!          │
//!          │
//!          └───────── +X
//!         /
//!        /
//!       +Z
//! ```
//!
//! Voxel centres sit at `bb_min + (index + 0.5) * resolution`, so a grid of
//! `n` voxels along an axis forms `n - 1` marching cubes cells.

/// Start value of `sdf` in `Max` mode: a voxel nothing has carved yet.
///
/// Max fusion never lowers a value, so the lowest finite float lets the first
/// observation win unconditionally.
pub const MAX_MODE_SENTINEL: f32 = f32::MIN;

/// Default voxel edge length in world units.
pub const DEFAULT_RESOLUTION: f32 = 0.001;

/// Default cap on fused samples per voxel in weighted-average mode.
pub const DEFAULT_MAX_UPDATE_NUM: u32 = 255;

/// Default weight of a new sample in weighted-average mode.
pub const DEFAULT_UPDATE_WEIGHT: f32 = 1.0;

/// Default truncation band, in SDF image units (pixels).
pub const DEFAULT_TRUNCATION_BAND: f32 = 10.0;

/// Unit offsets of the 6 face neighbours (-X, +X, -Y, +Y, -Z, +Z).
pub const FACE_OFFSETS: [[i64; 3]; 6] = [
  [-1, 0, 0], // -X
  [1, 0, 0],  // +X
  [0, -1, 0], // -Y
  [0, 1, 0],  // +Y
  [0, 0, -1], // -Z
  [0, 0, 1],  // +Z
];

/// Offsets of the 8 corners of a marching cubes cell, in the classic
/// Lorensen/Bourke order:
///
/// ```text
///       7──────6
///      /│     /│
///     4─┼────5 │
///     │ 3────┼─2
///     │/     │/
///     0──────1
/// ```
pub const CELL_CORNER_OFFSETS: [[usize; 3]; 8] = [
  [0, 0, 0], // 0
  [1, 0, 0], // 1
  [1, 1, 0], // 2
  [0, 1, 0], // 3
  [0, 0, 1], // 4
  [1, 0, 1], // 5
  [1, 1, 1], // 6
  [0, 1, 1], // 7
];

/// Unit cube corner positions for voxel-shell cubes (binary ZYX).
///
/// Corner i = (x=bit0, y=bit1, z=bit2), scaled around the voxel centre.
pub const CUBE_CORNERS: [[f32; 3]; 8] = [
  [-0.5, -0.5, -0.5], // 0b000
  [0.5, -0.5, -0.5],  // 0b001
  [-0.5, 0.5, -0.5],  // 0b010
  [0.5, 0.5, -0.5],   // 0b011
  [-0.5, -0.5, 0.5],  // 0b100
  [0.5, -0.5, 0.5],   // 0b101
  [-0.5, 0.5, 0.5],   // 0b110
  [0.5, 0.5, 0.5],    // 0b111
];

/// Triangles of a cube over [`CUBE_CORNERS`], counter-clockwise seen from
/// outside.
pub const CUBE_TRIANGLES: [[u32; 3]; 12] = [
  [0, 2, 1], // -Z
  [1, 2, 3],
  [4, 5, 6], // +Z
  [5, 7, 6],
  [0, 4, 2], // -X
  [2, 4, 6],
  [1, 3, 5], // +X
  [3, 7, 5],
  [0, 1, 4], // -Y
  [1, 5, 4],
  [2, 6, 3], // +Y
  [3, 6, 7],
];

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
