//! Core data types shared by carving and mesh extraction.

use glam::Vec3;
use image::{ImageBuffer, Luma};

/// Single-channel float image holding signed distances (or plain distances
/// for the L1 transform). Same width/height as the mask it came from.
pub type SdfImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// How a voxel centre's projection is looked up in a view's SDF image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ImageSampling {
  /// Value of the pixel whose centre is closest to the projection.
  #[default]
  Nearest,

  /// Bilinear blend of the 4 surrounding pixel centres, clamped at the image
  /// border.
  Bilinear,
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
  pub min: Vec3,
  pub max: Vec3,
}

impl Aabb {
  /// Create AABB with inverted extents (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min: Vec3::splat(f32::INFINITY),
      max: Vec3::splat(f32::NEG_INFINITY),
    }
  }

  /// Create AABB from min/max corners.
  pub fn new(min: Vec3, max: Vec3) -> Self {
    Self { min, max }
  }

  /// Expand AABB to include a point.
  #[inline]
  pub fn encapsulate(&mut self, point: Vec3) {
    self.min = self.min.min(point);
    self.max = self.max.max(point);
  }

  /// Check if AABB is valid (min <= max on all axes).
  pub fn is_valid(&self) -> bool {
    self.min.cmple(self.max).all()
  }

  /// Get the size of the AABB (max - min).
  #[inline]
  pub fn size(&self) -> Vec3 {
    self.max - self.min
  }

  /// Get the center of the AABB.
  #[inline]
  pub fn center(&self) -> Vec3 {
    (self.min + self.max) * 0.5
  }
}

impl Default for Aabb {
  fn default() -> Self {
    Self::empty()
  }
}

/// Append-only triangle mesh produced by the extractors.
///
/// Extractors only ever push; nothing is removed or reordered, so indices
/// handed out by [`Mesh::add_vertex`] stay valid.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
  vertices: Vec<Vec3>,
  triangles: Vec<[u32; 3]>,
  bounds: Aabb,
}

impl Mesh {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append a vertex and return its index.
  #[inline]
  pub fn add_vertex(&mut self, position: Vec3) -> u32 {
    let index = self.vertices.len() as u32;
    self.vertices.push(position);
    self.bounds.encapsulate(position);
    index
  }

  /// Append a triangle referencing previously added vertices.
  #[inline]
  pub fn add_triangle(&mut self, triangle: [u32; 3]) {
    debug_assert!(
      triangle.iter().all(|&i| (i as usize) < self.vertices.len()),
      "triangle {:?} references a missing vertex ({} vertices)",
      triangle,
      self.vertices.len()
    );
    self.triangles.push(triangle);
  }

  pub fn vertices(&self) -> &[Vec3] {
    &self.vertices
  }

  pub fn triangles(&self) -> &[[u32; 3]] {
    &self.triangles
  }

  /// Bounding box of all vertices, `None` for an empty mesh.
  pub fn bounds(&self) -> Option<Aabb> {
    self.bounds.is_valid().then_some(self.bounds)
  }

  /// Clear all buffers, preserving capacity.
  pub fn clear(&mut self) {
    self.vertices.clear();
    self.triangles.clear();
    self.bounds = Aabb::empty();
  }

  /// Returns true if no geometry was generated.
  pub fn is_empty(&self) -> bool {
    self.vertices.is_empty()
  }

  pub fn vertex_count(&self) -> usize {
    self.vertices.len()
  }

  pub fn triangle_count(&self) -> usize {
    self.triangles.len()
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
