//! Error type shared by the grid, the carver and the extractors.

use glam::Vec3;

/// Everything that can make a carving session refuse its input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CarveError {
  /// Voxel edge length is zero, negative or not finite.
  #[error("voxel resolution must be positive and finite, got {0}")]
  InvalidResolution(f32),

  /// `bb_max` is not strictly greater than `bb_min` on every axis.
  #[error("bounding box max {max} must be strictly greater than min {min} on every axis")]
  InvalidBoundingBox { min: Vec3, max: Vec3 },

  /// Fusion policy or truncation band carries an unusable value.
  #[error("invalid voxel update option: {0}")]
  InvalidUpdateOption(String),

  /// Silhouette size differs from the camera's image size.
  #[error("silhouette is {silhouette:?} but camera image is {camera:?}")]
  DimensionMismatch {
    camera: (u32, u32),
    silhouette: (u32, u32),
  },

  /// `carve_all` got a different number of cameras and silhouettes.
  #[error("got {cameras} cameras but {silhouettes} silhouettes")]
  ViewCountMismatch { cameras: usize, silhouettes: usize },

  /// Carving or extraction before a successful `init`.
  #[error("voxel grid is not initialized")]
  Uninitialized,
}
