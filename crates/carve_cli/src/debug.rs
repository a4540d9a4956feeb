//! Per-view SDF dumps for inspecting silhouettes and calibration.

use std::path::PathBuf;
use tracing::{debug, warn};
use voxel_carver::{signed_distance_to_color, CarveObserver, SdfImage};

/// Writes every view's SDF as `sdf_NNN.png` into a directory.
pub struct DebugDirSink {
	dir: PathBuf,
}

impl DebugDirSink {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	pub fn path_for(&self, view_index: usize) -> PathBuf {
		self.dir.join(format!("sdf_{view_index:03}.png"))
	}
}

/// Smallest and largest distance in the image (0 when no pixel is below or above).
fn distance_range(sdf: &SdfImage) -> (f32, f32) {
	sdf.pixels()
		.map(|p| p.0[0])
		.fold((0.0f32, 0.0f32), |(lo, hi), d| (lo.min(d), hi.max(d)))
}

impl CarveObserver for DebugDirSink {
	fn on_view_sdf(&mut self, view_index: usize, sdf: &SdfImage) {
		let (min_negative, max_positive) = distance_range(sdf);
		let color = signed_distance_to_color(sdf, min_negative, max_positive);

		let path = self.path_for(view_index);
		match color.save(&path) {
			Ok(()) => debug!(view = view_index, path = %path.display(), "sdf image written"),
			Err(err) => warn!(view = view_index, path = %path.display(), %err, "failed to write sdf image"),
		}
	}
}
