//! Surface extraction from a fused voxel grid.
//!
//! - [`extract_voxel`]: blocky cubes for surface (or all occupied) voxels
//! - [`extract_iso_surface`]: smooth marching cubes surface at an iso level
//!
//! Both only read the fused `sdf` / `update_num`; the voxel shell also
//! rewrites the derived `outside` / `on_surface` flags.

mod marching_cubes;
mod surface;
pub mod tables;
mod voxel_shell;

pub use marching_cubes::extract_iso_surface;
pub use surface::classify;
pub use voxel_shell::extract_voxel;
