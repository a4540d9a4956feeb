//! Silhouette carving: per-view SDF construction and fusion into the grid.
//!
//! # Flow
//!
//! ```text
//! silhouette ──► make_signed_distance_field ──► SdfImage ──┬──► observer / sdf_out
//!                                                          │
//! voxel.pos ──► camera.project ──► sample ──► fuse ◄───────┘
//!                                               │
//!                                               ▼
//!                                       voxel.sdf, voxel.update_num
//! ```
//!
//! Views are applied in the order they are given. Inside one view every voxel
//! is independent and written by exactly one rayon task.

mod fusion;
mod sampling;

pub use fusion::{fuse, FuseOutcome, VoxelState};
pub use sampling::sample;

use glam::Vec3;
use image::GrayImage;
use rayon::prelude::*;
use web_time::Instant;

use crate::camera::Camera;
use crate::constants::{
  DEFAULT_MAX_UPDATE_NUM, DEFAULT_RESOLUTION, DEFAULT_TRUNCATION_BAND, DEFAULT_UPDATE_WEIGHT,
  MAX_MODE_SENTINEL,
};
use crate::error::CarveError;
use crate::extract;
use crate::grid::VoxelGrid;
use crate::sdf::{make_signed_distance_field, SdfOptions};
use crate::types::{ImageSampling, Mesh, SdfImage};

// =============================================================================
// Options
// =============================================================================

/// How a new sample is folded into a voxel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum VoxelUpdate {
  /// Keep the largest sample. Order independent.
  #[default]
  Max,
  /// Running mean of the first `max_update_num` samples; later samples are
  /// ignored. Order dependent.
  ///
  /// Each step computes `(sdf * n + weight * sample) / (n + weight)` with
  /// `n = update_num`: the history counts once per sample and only the
  /// newest sample carries `weight`. `weight > 1` favours recent views,
  /// `weight = 1` is the plain mean.
  WeightedAverage { weight: f32, max_update_num: u32 },
}

impl VoxelUpdate {
  /// Weighted average with the default weight and cap.
  pub fn weighted_average() -> Self {
    Self::WeightedAverage {
      weight: DEFAULT_UPDATE_WEIGHT,
      max_update_num: DEFAULT_MAX_UPDATE_NUM,
    }
  }

  /// `sdf` of a voxel no view has touched yet.
  #[inline]
  pub fn initial_sdf(&self) -> f32 {
    match self {
      Self::Max => MAX_MODE_SENTINEL,
      Self::WeightedAverage { .. } => 0.0,
    }
  }
}

/// Fusion policy plus optional truncation of each view's SDF.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelUpdateOption {
  pub update: VoxelUpdate,
  /// Clamp view SDFs to `[-band, band]` (pixels) before normalization.
  pub truncation_band: Option<f32>,
}

impl Default for VoxelUpdateOption {
  fn default() -> Self {
    Self {
      update: VoxelUpdate::Max,
      truncation_band: Some(DEFAULT_TRUNCATION_BAND),
    }
  }
}

impl VoxelUpdateOption {
  fn validate(&self) -> Result<(), CarveError> {
    if let VoxelUpdate::WeightedAverage {
      weight,
      max_update_num,
    } = self.update
    {
      if !(weight.is_finite() && weight > 0.0) {
        return Err(CarveError::InvalidUpdateOption(format!(
          "weight must be positive and finite, got {weight}"
        )));
      }
      if max_update_num == 0 {
        return Err(CarveError::InvalidUpdateOption(
          "max_update_num must be at least 1".into(),
        ));
      }
    }
    if let Some(band) = self.truncation_band {
      if !(band.is_finite() && band > 0.0) {
        return Err(CarveError::InvalidUpdateOption(format!(
          "truncation band must be positive and finite, got {band}"
        )));
      }
    }
    Ok(())
  }
}

/// Configuration of a carving session.
///
/// The bounding box defaults to empty and must be set before
/// [`VoxelCarver::init`].
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelCarverOption {
  pub bb_max: Vec3,
  pub bb_min: Vec3,
  /// Voxel edge length in world units.
  pub resolution: f32,
  pub sdf_minmax_normalize: bool,
  pub sampling: ImageSampling,
  pub update_option: VoxelUpdateOption,
}

impl Default for VoxelCarverOption {
  fn default() -> Self {
    Self {
      bb_max: Vec3::ZERO,
      bb_min: Vec3::ZERO,
      resolution: DEFAULT_RESOLUTION,
      sdf_minmax_normalize: true,
      sampling: ImageSampling::Nearest,
      update_option: VoxelUpdateOption::default(),
    }
  }
}

impl VoxelCarverOption {
  pub fn new(bb_min: Vec3, bb_max: Vec3, resolution: f32) -> Self {
    Self {
      bb_min,
      bb_max,
      resolution,
      ..Default::default()
    }
  }

  pub fn with_bounds(mut self, bb_min: Vec3, bb_max: Vec3) -> Self {
    self.bb_min = bb_min;
    self.bb_max = bb_max;
    self
  }

  pub fn with_resolution(mut self, resolution: f32) -> Self {
    self.resolution = resolution;
    self
  }

  pub fn with_minmax_normalize(mut self, normalize: bool) -> Self {
    self.sdf_minmax_normalize = normalize;
    self
  }

  pub fn with_sampling(mut self, sampling: ImageSampling) -> Self {
    self.sampling = sampling;
    self
  }

  pub fn with_update(mut self, update: VoxelUpdate) -> Self {
    self.update_option.update = update;
    self
  }

  pub fn with_truncation_band(mut self, band: Option<f32>) -> Self {
    self.update_option.truncation_band = band;
    self
  }

  /// SDF construction settings shared by every view.
  pub fn sdf_options(&self) -> SdfOptions {
    SdfOptions {
      minmax_normalize: self.sdf_minmax_normalize,
      truncation_band: self.update_option.truncation_band,
    }
  }
}

// =============================================================================
// Observer & stats
// =============================================================================

/// Diagnostic sink notified with every view's SDF image.
///
/// Observers see data only; they cannot influence the reconstruction.
pub trait CarveObserver: Send {
  /// Called once per carved view, before fusion. `view_index` counts views
  /// since the last [`VoxelCarver::init`].
  fn on_view_sdf(&mut self, view_index: usize, sdf: &SdfImage);
}

/// Per-view (or summed) fusion counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CarveStats {
  /// Voxels whose state changed.
  pub updated: usize,
  /// Visible voxels ignored because their update cap was reached.
  pub capped: usize,
  /// Voxels outside the view (failed projection or outside the image).
  pub not_visible: usize,
  /// Wall time in microseconds.
  pub elapsed_us: u64,
}

impl CarveStats {
  fn visit(outcome: Visit) -> Self {
    let mut stats = Self::default();
    match outcome {
      Visit::Updated => stats.updated = 1,
      Visit::Capped => stats.capped = 1,
      Visit::NotVisible => stats.not_visible = 1,
    }
    stats
  }

  /// Sum two sets of counters.
  pub fn combine(self, other: Self) -> Self {
    Self {
      updated: self.updated + other.updated,
      capped: self.capped + other.capped,
      not_visible: self.not_visible + other.not_visible,
      elapsed_us: self.elapsed_us + other.elapsed_us,
    }
  }
}

#[derive(Clone, Copy)]
enum Visit {
  Updated,
  Capped,
  NotVisible,
}

// =============================================================================
// VoxelCarver
// =============================================================================

/// Owns a voxel grid and carves silhouettes into it.
pub struct VoxelCarver {
  option: VoxelCarverOption,
  grid: Option<VoxelGrid>,
  observer: Option<Box<dyn CarveObserver>>,
  views_carved: usize,
}

impl Default for VoxelCarver {
  fn default() -> Self {
    Self::new(VoxelCarverOption::default())
  }
}

impl VoxelCarver {
  pub fn new(option: VoxelCarverOption) -> Self {
    Self {
      option,
      grid: None,
      observer: None,
      views_carved: 0,
    }
  }

  pub fn option(&self) -> &VoxelCarverOption {
    &self.option
  }

  /// Replace the option. Drops the grid; call [`init`](Self::init) again.
  pub fn set_option(&mut self, option: VoxelCarverOption) {
    self.option = option;
    self.grid = None;
    self.views_carved = 0;
  }

  pub fn set_observer(&mut self, observer: Box<dyn CarveObserver>) {
    self.observer = Some(observer);
  }

  /// The grid, once [`init`](Self::init) has succeeded.
  pub fn grid(&self) -> Option<&VoxelGrid> {
    self.grid.as_ref()
  }

  /// Validate the option and allocate a fresh grid in the start state of
  /// the configured update mode.
  pub fn init(&mut self) -> Result<(), CarveError> {
    self.grid = None;
    self.views_carved = 0;

    self.option.update_option.validate().inspect_err(|err| {
      tracing::warn!(%err, "rejecting voxel update option");
    })?;

    let mut grid = VoxelGrid::new();
    grid.init(self.option.bb_max, self.option.bb_min, self.option.resolution)?;

    let initial = self.option.update_option.update.initial_sdf();
    for voxel in grid.voxels_mut() {
      voxel.sdf = initial;
      voxel.update_num = 0;
    }

    self.grid = Some(grid);
    Ok(())
  }

  /// Carve one view and optionally hand back its SDF image.
  ///
  /// Fails before touching any voxel when the carver is not initialized or
  /// the silhouette size differs from the camera's image size.
  #[tracing::instrument(skip_all, name = "carver::carve_view")]
  pub fn carve_view<C: Camera + ?Sized>(
    &mut self,
    camera: &C,
    silhouette: &GrayImage,
    sdf_out: Option<&mut SdfImage>,
  ) -> Result<CarveStats, CarveError> {
    let start = Instant::now();

    let grid = self.grid.as_mut().ok_or(CarveError::Uninitialized)?;
    check_dimensions(camera, silhouette)?;

    let sdf = make_signed_distance_field(silhouette, &self.option.sdf_options());

    let view_index = self.views_carved;
    self.views_carved += 1;
    if let Some(observer) = self.observer.as_mut() {
      observer.on_view_sdf(view_index, &sdf);
    }

    let sampling = self.option.sampling;
    let update = self.option.update_option.update;

    let mut stats = grid
      .voxels_mut()
      .par_iter_mut()
      .map(|voxel| {
        let Some(sampled) = camera
          .project(voxel.pos)
          .and_then(|uv| sample(&sdf, uv, sampling))
        else {
          return CarveStats::visit(Visit::NotVisible);
        };

        let state = VoxelState {
          sdf: voxel.sdf,
          update_num: voxel.update_num,
        };
        match fuse(state, sampled, &update) {
          FuseOutcome::Updated(next) => {
            voxel.sdf = next.sdf;
            voxel.update_num = next.update_num;
            CarveStats::visit(Visit::Updated)
          }
          FuseOutcome::Capped => CarveStats::visit(Visit::Capped),
        }
      })
      .reduce(CarveStats::default, CarveStats::combine);

    if let Some(out) = sdf_out {
      *out = sdf;
    }

    stats.elapsed_us = start.elapsed().as_micros() as u64;
    tracing::debug!(
      view = view_index,
      updated = stats.updated,
      capped = stats.capped,
      not_visible = stats.not_visible,
      elapsed_us = stats.elapsed_us,
      "view carved"
    );

    Ok(stats)
  }

  /// [`carve_view`](Self::carve_view) without the SDF image.
  pub fn carve<C: Camera + ?Sized>(
    &mut self,
    camera: &C,
    silhouette: &GrayImage,
  ) -> Result<CarveStats, CarveError> {
    self.carve_view(camera, silhouette, None)
  }

  /// Carve every `(camera, silhouette)` pair in order.
  ///
  /// All inputs are validated before the first view is fused, so a failing
  /// call leaves the grid untouched.
  pub fn carve_all<C: Camera>(
    &mut self,
    cameras: &[C],
    silhouettes: &[GrayImage],
  ) -> Result<CarveStats, CarveError> {
    if self.grid.is_none() {
      return Err(CarveError::Uninitialized);
    }
    if cameras.len() != silhouettes.len() {
      tracing::warn!(
        cameras = cameras.len(),
        silhouettes = silhouettes.len(),
        "view count mismatch"
      );
      return Err(CarveError::ViewCountMismatch {
        cameras: cameras.len(),
        silhouettes: silhouettes.len(),
      });
    }
    for (camera, silhouette) in cameras.iter().zip(silhouettes) {
      check_dimensions(camera, silhouette)?;
    }

    let mut total = CarveStats::default();
    for (camera, silhouette) in cameras.iter().zip(silhouettes) {
      total = total.combine(self.carve(camera, silhouette)?);
    }
    Ok(total)
  }

  /// Append cube geometry for surface voxels (and, unless `inside_empty`,
  /// every occupied voxel). Returns the number of cubes emitted.
  pub fn extract_voxel(
    &mut self,
    mesh: &mut Mesh,
    inside_empty: bool,
    with_pseudo_surface: bool,
  ) -> Result<usize, CarveError> {
    let grid = self.grid.as_mut().ok_or(CarveError::Uninitialized)?;
    Ok(extract::extract_voxel(grid, mesh, inside_empty, with_pseudo_surface))
  }

  /// Append the `iso_level` surface of the fused field. Returns the number
  /// of triangles added.
  pub fn extract_iso_surface(&self, mesh: &mut Mesh, iso_level: f32) -> Result<usize, CarveError> {
    let grid = self.grid.as_ref().ok_or(CarveError::Uninitialized)?;
    Ok(extract::extract_iso_surface(grid, mesh, iso_level))
  }
}

fn check_dimensions<C: Camera + ?Sized>(camera: &C, silhouette: &GrayImage) -> Result<(), CarveError> {
  let camera_dims = (camera.width(), camera.height());
  let silhouette_dims = silhouette.dimensions();
  if camera_dims != silhouette_dims {
    tracing::warn!(?camera_dims, ?silhouette_dims, "silhouette size mismatch");
    return Err(CarveError::DimensionMismatch {
      camera: camera_dims,
      silhouette: silhouette_dims,
    });
  }
  Ok(())
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
