//! voxel_carver - silhouette space carving with signed distance fusion
//!
//! Reconstructs a shape from calibrated silhouettes: every view's mask is
//! turned into a 2D signed distance field, projected voxel centres sample it,
//! and the samples are fused per voxel. The fused grid can be turned into a
//! blocky voxel shell or a smooth marching cubes surface.
//!
//! # Features
//!
//! - **Exact L1 distance transform**: two raster passes, linear time
//! - **Fusion policies**: order-independent `Max` carving or capped
//!   weighted averaging
//! - **Parallel carving**: per-voxel fusion runs on rayon
//! - **Watertight iso-surfaces**: marching cubes with shared edge vertices
//!
//! # Example
//!
//! ```ignore
//! use glam::Vec3;
//! use voxel_carver::{Mesh, VoxelCarver, VoxelCarverOption};
//!
//! let option = VoxelCarverOption::new(Vec3::splat(-1.0), Vec3::splat(1.0), 0.01);
//! let mut carver = VoxelCarver::new(option);
//! carver.init()?;
//! carver.carve_all(&cameras, &silhouettes)?;
//!
//! let mut mesh = Mesh::new();
//! carver.extract_iso_surface(&mut mesh, 0.0)?;
//! println!("{} vertices, {} triangles", mesh.vertex_count(), mesh.triangle_count());
//! ```

pub mod camera;
pub mod carver;
pub mod constants;
pub mod distance_transform;
pub mod error;
pub mod extract;
pub mod grid;
pub mod sdf;
pub mod types;

// Re-export commonly used items
pub use camera::{look_at, Camera, OrthoCamera, PinholeCamera};
pub use carver::{
  CarveObserver, CarveStats, VoxelCarver, VoxelCarverOption, VoxelUpdate, VoxelUpdateOption,
};
pub use distance_transform::{distance_transform_l1, l1_sentinel};
pub use error::CarveError;
pub use grid::{Voxel, VoxelGrid};
pub use sdf::{make_signed_distance_field, signed_distance_to_color, SdfOptions};
pub use types::{Aabb, ImageSampling, Mesh, SdfImage};

#[cfg(test)]
mod test_utils;
