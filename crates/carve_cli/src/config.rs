//! Configuration parsing for silhouette carving runs.

use anyhow::{bail, Context, Result};
use glam::{Affine3A, Mat3, Vec2, Vec3};
use serde::Deserialize;
use std::path::Path;
use voxel_carver::{
	look_at, Camera, ImageSampling, OrthoCamera, PinholeCamera, VoxelCarverOption, VoxelUpdate,
	VoxelUpdateOption,
};

/// Root configuration for a carving run.
#[derive(Debug, Deserialize)]
pub struct Config {
	/// Output directory relative to the config file.
	#[serde(default = "default_output_dir")]
	pub output_dir: String,
	/// Directory for per-view SDF visualizations (optional).
	pub debug_dir: Option<String>,
	/// Iso level for surface extraction.
	#[serde(default)]
	pub iso_level: f32,
	/// Carving volume.
	pub volume: VolumeConfig,
	/// Per-view SDF construction.
	#[serde(default)]
	pub sdf: SdfConfig,
	/// Fusion policy.
	#[serde(default)]
	pub update: UpdateConfig,
	/// Which meshes to write.
	#[serde(default)]
	pub extract: ExtractConfig,
	/// Calibrated views, carved in order.
	pub views: Vec<ViewConfig>,
}

/// Axis-aligned carving volume.
#[derive(Debug, Deserialize)]
pub struct VolumeConfig {
	pub bb_min: [f32; 3],
	pub bb_max: [f32; 3],
	/// Voxel edge length in world units.
	pub resolution: f32,
}

/// Signed distance field settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SdfConfig {
	pub minmax_normalize: bool,
	pub use_truncation: bool,
	/// Truncation band in pixels.
	pub truncation_band: f32,
	pub sampling: SamplingConfig,
}

impl Default for SdfConfig {
	fn default() -> Self {
		Self {
			minmax_normalize: true,
			use_truncation: true,
			truncation_band: voxel_carver::constants::DEFAULT_TRUNCATION_BAND,
			sampling: SamplingConfig::Nearest,
		}
	}
}

/// SDF lookup mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingConfig {
	#[default]
	Nearest,
	Bilinear,
}

/// Fusion policy, selected by `mode`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum UpdateConfig {
	#[default]
	Max,
	WeightedAverage {
		#[serde(default = "default_weight")]
		weight: f32,
		#[serde(default = "default_max_update_num")]
		max_update_num: u32,
	},
}

/// Mesh outputs.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
	/// Write `voxel_shell.<format>`.
	pub voxel_shell: bool,
	/// Only the surface voxels of the shell (hollow).
	pub inside_empty: bool,
	/// Keep unobserved voxels next to carved space.
	pub pseudo_surface: bool,
	/// Write `iso_surface.<format>`.
	pub iso_surface: bool,
	pub format: MeshFormat,
}

impl Default for ExtractConfig {
	fn default() -> Self {
		Self {
			voxel_shell: true,
			inside_empty: true,
			pseudo_surface: false,
			iso_surface: true,
			format: MeshFormat::Obj,
		}
	}
}

/// Mesh file format.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshFormat {
	#[default]
	Obj,
	Ply,
}

impl MeshFormat {
	pub fn extension(self) -> &'static str {
		match self {
			MeshFormat::Obj => "obj",
			MeshFormat::Ply => "ply",
		}
	}
}

/// One calibrated view.
#[derive(Debug, Deserialize)]
pub struct ViewConfig {
	/// Path to the silhouette mask, relative to the config file.
	pub silhouette: String,
	pub camera: CameraConfig,
	pub pose: PoseConfig,
}

/// Camera intrinsics, selected by `model`.
///
/// For `ortho`, `fx` / `fy` are pixels per world unit.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum CameraConfig {
	Pinhole { fx: f32, fy: f32, cx: f32, cy: f32 },
	Ortho { fx: f32, fy: f32, cx: f32, cy: f32 },
}

/// Camera-to-world pose.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PoseConfig {
	/// Looking from `eye` at `target`.
	LookAt {
		eye: [f32; 3],
		target: [f32; 3],
		#[serde(default = "default_up")]
		up: [f32; 3],
	},
	/// Row-major 3x4 `[R | t]` matrix.
	Matrix { c2w: [[f32; 4]; 3] },
}

fn default_output_dir() -> String {
	"out".to_string()
}

fn default_weight() -> f32 {
	voxel_carver::constants::DEFAULT_UPDATE_WEIGHT
}

fn default_max_update_num() -> u32 {
	voxel_carver::constants::DEFAULT_MAX_UPDATE_NUM
}

fn default_up() -> [f32; 3] {
	[0.0, 1.0, 0.0]
}

impl Config {
	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		Self::parse(&content)
	}

	/// Parse and validate configuration text.
	pub fn parse(content: &str) -> Result<Self> {
		let config: Config = toml::from_str(content).with_context(|| "Failed to parse config TOML")?;

		if config.views.is_empty() {
			bail!("Config must have at least one view");
		}
		let volume = &config.volume;
		if !(volume.resolution.is_finite() && volume.resolution > 0.0) {
			bail!("resolution must be positive, got {}", volume.resolution);
		}
		if (0..3).any(|i| volume.bb_max[i] <= volume.bb_min[i]) {
			bail!(
				"bb_max {:?} must be greater than bb_min {:?} on every axis",
				volume.bb_max,
				volume.bb_min
			);
		}
		for (i, view) in config.views.iter().enumerate() {
			let (fx, fy) = view.camera.focal();
			if !(fx > 0.0 && fy > 0.0) {
				bail!("View {}: fx and fy must be positive, got ({}, {})", i, fx, fy);
			}
			view.pose
				.validate()
				.with_context(|| format!("View {}: invalid pose", i))?;
		}

		Ok(config)
	}

	/// Carver option described by this config.
	pub fn carver_option(&self) -> VoxelCarverOption {
		let update = match self.update {
			UpdateConfig::Max => VoxelUpdate::Max,
			UpdateConfig::WeightedAverage {
				weight,
				max_update_num,
			} => VoxelUpdate::WeightedAverage {
				weight,
				max_update_num,
			},
		};
		let sampling = match self.sdf.sampling {
			SamplingConfig::Nearest => ImageSampling::Nearest,
			SamplingConfig::Bilinear => ImageSampling::Bilinear,
		};

		VoxelCarverOption {
			bb_min: Vec3::from_array(self.volume.bb_min),
			bb_max: Vec3::from_array(self.volume.bb_max),
			resolution: self.volume.resolution,
			sdf_minmax_normalize: self.sdf.minmax_normalize,
			sampling,
			update_option: VoxelUpdateOption {
				update,
				truncation_band: self.sdf.use_truncation.then_some(self.sdf.truncation_band),
			},
		}
	}
}

impl CameraConfig {
	fn focal(&self) -> (f32, f32) {
		match *self {
			CameraConfig::Pinhole { fx, fy, .. } | CameraConfig::Ortho { fx, fy, .. } => (fx, fy),
		}
	}
}

/// Smallest accepted length or determinant when checking poses.
const POSE_EPSILON: f32 = 1e-6;

impl PoseConfig {
	/// Reject poses that cannot produce a finite camera frame.
	fn validate(&self) -> Result<()> {
		match *self {
			PoseConfig::LookAt { eye, target, up } => {
				let (eye, target, up) = (
					Vec3::from_array(eye),
					Vec3::from_array(target),
					Vec3::from_array(up),
				);
				if !(eye.is_finite() && target.is_finite() && up.is_finite()) {
					bail!("eye, target and up must be finite");
				}
				let forward = target - eye;
				if forward.length() < POSE_EPSILON {
					bail!("eye and target coincide at {:?}", eye.to_array());
				}
				if up.length() < POSE_EPSILON
					|| forward.normalize().cross(up.normalize()).length() < POSE_EPSILON
				{
					bail!("up {:?} is parallel to the view direction", up.to_array());
				}
			}
			PoseConfig::Matrix { c2w } => {
				if c2w.iter().flatten().any(|v| !v.is_finite()) {
					bail!("c2w must be finite");
				}
				let rotation = Mat3::from_cols_array_2d(&[
					[c2w[0][0], c2w[1][0], c2w[2][0]],
					[c2w[0][1], c2w[1][1], c2w[2][1]],
					[c2w[0][2], c2w[1][2], c2w[2][2]],
				]);
				if rotation.determinant().abs() < POSE_EPSILON {
					bail!("c2w rotation is singular");
				}
			}
		}
		Ok(())
	}

	/// Camera-to-world transform.
	pub fn c2w(&self) -> Affine3A {
		match *self {
			PoseConfig::LookAt { eye, target, up } => {
				look_at(Vec3::from_array(eye), Vec3::from_array(target), Vec3::from_array(up))
			}
			PoseConfig::Matrix { c2w: m } => {
				let rotation = Mat3::from_cols(
					Vec3::new(m[0][0], m[1][0], m[2][0]),
					Vec3::new(m[0][1], m[1][1], m[2][1]),
					Vec3::new(m[0][2], m[1][2], m[2][2]),
				);
				let translation = Vec3::new(m[0][3], m[1][3], m[2][3]);
				Affine3A::from_mat3_translation(rotation, translation)
			}
		}
	}
}

impl ViewConfig {
	/// Build the camera for a silhouette of the given size.
	pub fn camera(&self, width: u32, height: u32) -> Box<dyn Camera> {
		let c2w = self.pose.c2w();
		match self.camera {
			CameraConfig::Pinhole { fx, fy, cx, cy } => Box::new(PinholeCamera::new(
				width,
				height,
				c2w,
				Vec2::new(fx, fy),
				Vec2::new(cx, cy),
			)),
			CameraConfig::Ortho { fx, fy, cx, cy } => Box::new(OrthoCamera::new(
				width,
				height,
				c2w,
				Vec2::new(fx, fy),
				Vec2::new(cx, cy),
			)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
[volume]
bb_min = [-1.0, -1.0, -1.0]
bb_max = [1.0, 1.0, 1.0]
resolution = 0.05

[[views]]
silhouette = "mask_000.png"
[views.camera]
model = "ortho"
fx = 8.0
fy = 8.0
cx = 19.5
cy = 19.5
[views.pose]
eye = [0.0, 0.0, 5.0]
target = [0.0, 0.0, 0.0]
"#;

	#[test]
	fn test_minimal_config_uses_defaults() {
		let config = Config::parse(MINIMAL).unwrap();

		assert_eq!(config.output_dir, "out");
		assert!(config.debug_dir.is_none());
		assert_eq!(config.iso_level, 0.0);
		assert_eq!(config.update, UpdateConfig::Max);
		assert!(config.extract.voxel_shell && config.extract.iso_surface);
		assert_eq!(config.extract.format, MeshFormat::Obj);

		let option = config.carver_option();
		assert_eq!(option.resolution, 0.05);
		assert_eq!(option.bb_min, Vec3::splat(-1.0));
		assert!(option.sdf_minmax_normalize);
		assert_eq!(option.sampling, ImageSampling::Nearest);
		assert_eq!(option.update_option.truncation_band, Some(10.0));
		assert_eq!(option.update_option.update, VoxelUpdate::Max);
	}

	#[test]
	fn test_full_config() {
		let text = r#"
output_dir = "meshes"
debug_dir = "debug"
iso_level = 0.1

[volume]
bb_min = [0.0, 0.0, 0.0]
bb_max = [2.0, 1.0, 1.0]
resolution = 0.5

[sdf]
minmax_normalize = false
use_truncation = false
sampling = "bilinear"

[update]
mode = "weighted_average"
max_update_num = 3

[extract]
voxel_shell = false
format = "ply"

[[views]]
silhouette = "a.png"
[views.camera]
model = "pinhole"
fx = 500.0
fy = 510.0
cx = 319.5
cy = 239.5
[views.pose]
c2w = [[1.0, 0.0, 0.0, 0.5], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, -3.0]]

[[views]]
silhouette = "b.png"
[views.camera]
model = "ortho"
fx = 10.0
fy = 10.0
cx = 20.0
cy = 20.0
[views.pose]
eye = [3.0, 0.0, 0.0]
target = [0.0, 0.0, 0.0]
up = [0.0, 0.0, 1.0]
"#;
		let config = Config::parse(text).unwrap();

		assert_eq!(config.output_dir, "meshes");
		assert_eq!(config.debug_dir.as_deref(), Some("debug"));
		assert_eq!(config.views.len(), 2);
		assert_eq!(
			config.update,
			UpdateConfig::WeightedAverage {
				weight: 1.0,
				max_update_num: 3
			}
		);
		assert!(!config.extract.voxel_shell);
		assert_eq!(config.extract.format, MeshFormat::Ply);

		let option = config.carver_option();
		assert_eq!(option.update_option.truncation_band, None);
		assert_eq!(option.sampling, ImageSampling::Bilinear);
		assert!(!option.sdf_minmax_normalize);

		assert!(matches!(config.views[0].pose, PoseConfig::Matrix { .. }));
		match config.views[1].pose {
			PoseConfig::LookAt { up, .. } => assert_eq!(up, [0.0, 0.0, 1.0]),
			PoseConfig::Matrix { .. } => panic!("Expected a look-at pose"),
		}
	}

	#[test]
	fn test_matrix_pose_is_row_major() {
		let pose = PoseConfig::Matrix {
			c2w: [
				[0.0, -1.0, 0.0, 1.0],
				[1.0, 0.0, 0.0, 2.0],
				[0.0, 0.0, 1.0, 3.0],
			],
		};

		let c2w = pose.c2w();

		assert_eq!(Vec3::from(c2w.translation), Vec3::new(1.0, 2.0, 3.0));
		// Camera +X maps to world +Y
		assert_eq!(c2w.transform_vector3(Vec3::X), Vec3::Y);
	}

	#[test]
	fn test_view_builds_camera_with_silhouette_size() {
		let config = Config::parse(MINIMAL).unwrap();
		let camera = config.views[0].camera(40, 30);

		assert_eq!((camera.width(), camera.height()), (40, 30));
		let uv = camera.project(Vec3::new(1.0, 0.0, 0.0)).unwrap();
		assert!((uv - Vec2::new(27.5, 19.5)).length() < 1e-4);
	}

	#[test]
	fn test_rejects_invalid_configs() {
		let no_views = "views = []\n".to_string() + MINIMAL.split("[[views]]").next().unwrap();
		assert!(Config::parse(&no_views).is_err());

		let bad_resolution = MINIMAL.replace("resolution = 0.05", "resolution = 0.0");
		assert!(Config::parse(&bad_resolution).is_err());

		let inverted = MINIMAL.replace("bb_max = [1.0, 1.0, 1.0]", "bb_max = [1.0, -1.0, 1.0]");
		assert!(Config::parse(&inverted).is_err());

		let bad_focal = MINIMAL.replace("fx = 8.0", "fx = 0.0");
		assert!(Config::parse(&bad_focal).is_err());

		let unknown_mode = MINIMAL.to_string() + "\n[update]\nmode = \"median\"\n";
		assert!(Config::parse(&unknown_mode).is_err());
	}

	#[test]
	fn test_rejects_degenerate_poses() {
		let same_point = MINIMAL.replace("eye = [0.0, 0.0, 5.0]", "eye = [0.0, 0.0, 0.0]");
		let err = Config::parse(&same_point).unwrap_err();
		assert!(format!("{:#}", err).contains("coincide"), "{:#}", err);

		let parallel_up = MINIMAL.to_string() + "up = [0.0, 0.0, 2.0]\n";
		let err = Config::parse(&parallel_up).unwrap_err();
		assert!(format!("{:#}", err).contains("parallel"), "{:#}", err);

		let matrix = |rows: &str| {
			MINIMAL.replace(
				"eye = [0.0, 0.0, 5.0]\ntarget = [0.0, 0.0, 0.0]",
				&format!("c2w = {}", rows),
			)
		};

		let singular = matrix("[[1.0, 0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 0.0], [0.0, 0.0, 1.0, 5.0]]");
		let err = Config::parse(&singular).unwrap_err();
		assert!(format!("{:#}", err).contains("singular"), "{:#}", err);

		let not_finite = matrix("[[nan, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 5.0]]");
		assert!(Config::parse(&not_finite).is_err());

		let rotated = matrix("[[0.0, 0.0, -1.0, 3.0], [0.0, 1.0, 0.0, 0.0], [1.0, 0.0, 0.0, 0.0]]");
		assert!(Config::parse(&rotated).is_ok());
	}
}
