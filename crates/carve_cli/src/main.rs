//! Silhouette carving tool.
//!
//! Reads calibrated silhouette views from a TOML config, fuses them into a
//! signed distance voxel grid and writes the results as meshes:
//! - voxel_shell.<ext>: one cube per surface voxel
//! - iso_surface.<ext>: marching cubes surface at `iso_level`

mod config;
mod debug;
mod export;

use anyhow::{Context, Result};
use clap::Parser;
use image::GrayImage;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use voxel_carver::{Camera, Mesh, VoxelCarver};

use config::Config;
use debug::DebugDirSink;
use export::save_mesh;

/// Shape-from-silhouette carving with signed distance fusion.
#[derive(Parser, Debug)]
#[command(name = "carve")]
#[command(about = "Carves a voxel volume from calibrated silhouettes")]
struct Args {
	/// Path to configuration TOML file.
	#[arg(short, long)]
	config: PathBuf,

	/// Output directory (default: `output_dir` from the config).
	#[arg(short, long)]
	output_dir: Option<PathBuf>,

	/// Write per-view SDF images here (overrides `debug_dir`).
	#[arg(long)]
	debug_dir: Option<PathBuf>,

	/// Increase log verbosity.
	#[arg(short, long, action = clap::ArgAction::Count)]
	verbose: u8,
}

fn init_tracing(verbose: u8) {
	let default_level = match verbose {
		0 => "info",
		1 => "debug",
		_ => "trace",
	};
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
	tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_silhouette(path: &Path) -> Result<GrayImage> {
	let image =
		image::open(path).with_context(|| format!("Failed to load silhouette: {}", path.display()))?;
	Ok(image.to_luma8())
}

fn main() -> Result<()> {
	let args = Args::parse();
	init_tracing(args.verbose);

	// Relative paths in the config resolve against its directory
	let base_dir = args
		.config
		.parent()
		.unwrap_or(Path::new("."))
		.to_path_buf();

	info!(config = %args.config.display(), "loading config");
	let config = Config::load(&args.config)?;

	let mut silhouettes = Vec::with_capacity(config.views.len());
	let mut cameras: Vec<Box<dyn Camera>> = Vec::with_capacity(config.views.len());
	for view in &config.views {
		let silhouette = load_silhouette(&base_dir.join(&view.silhouette))?;
		cameras.push(view.camera(silhouette.width(), silhouette.height()));
		silhouettes.push(silhouette);
	}

	let mut carver = VoxelCarver::new(config.carver_option());

	let debug_dir = args
		.debug_dir
		.or_else(|| config.debug_dir.as_ref().map(|dir| base_dir.join(dir)));
	if let Some(dir) = debug_dir {
		std::fs::create_dir_all(&dir)
			.with_context(|| format!("Failed to create debug dir: {}", dir.display()))?;
		carver.set_observer(Box::new(DebugDirSink::new(dir)));
	}

	carver.init().context("Failed to initialize voxel grid")?;
	if let Some(grid) = carver.grid() {
		let [x, y, z] = grid.voxel_num().to_array();
		info!(x, y, z, resolution = grid.resolution(), "voxel grid ready");
	}

	let stats = carver
		.carve_all(&cameras, &silhouettes)
		.context("Failed to carve views")?;
	info!(
		views = cameras.len(),
		updated = stats.updated,
		capped = stats.capped,
		not_visible = stats.not_visible,
		elapsed_ms = stats.elapsed_us / 1000,
		"carving done"
	);

	let output_dir = args
		.output_dir
		.unwrap_or_else(|| base_dir.join(&config.output_dir));
	std::fs::create_dir_all(&output_dir)
		.with_context(|| format!("Failed to create output dir: {}", output_dir.display()))?;

	let extension = config.extract.format.extension();

	if config.extract.voxel_shell {
		let mut mesh = Mesh::new();
		let cubes = carver.extract_voxel(
			&mut mesh,
			config.extract.inside_empty,
			config.extract.pseudo_surface,
		)?;
		let path = output_dir.join(format!("voxel_shell.{extension}"));
		save_mesh(&mesh, &path, config.extract.format)?;
		info!(cubes, path = %path.display(), "voxel shell written");
	}

	if config.extract.iso_surface {
		let mut mesh = Mesh::new();
		let triangles = carver.extract_iso_surface(&mut mesh, config.iso_level)?;
		let path = output_dir.join(format!("iso_surface.{extension}"));
		save_mesh(&mesh, &path, config.extract.format)?;
		info!(
			triangles,
			vertices = mesh.vertex_count(),
			path = %path.display(),
			"iso surface written"
		);
	}

	Ok(())
}
