//! Mesh writers (Wavefront OBJ and ASCII PLY).

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use voxel_carver::Mesh;

use crate::config::MeshFormat;

/// Write `mesh` to `path` in the given format.
pub fn save_mesh(mesh: &Mesh, path: &Path, format: MeshFormat) -> Result<()> {
	let file =
		File::create(path).with_context(|| format!("Failed to create: {}", path.display()))?;
	let mut writer = BufWriter::new(file);
	match format {
		MeshFormat::Obj => write_obj(mesh, &mut writer),
		MeshFormat::Ply => write_ply(mesh, &mut writer),
	}
	.and_then(|_| writer.flush())
	.with_context(|| format!("Failed to write: {}", path.display()))
}

/// Wavefront OBJ: `v x y z` lines followed by 1-based `f a b c` lines.
pub fn write_obj<W: Write>(mesh: &Mesh, writer: &mut W) -> std::io::Result<()> {
	for v in mesh.vertices() {
		writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
	}
	for [a, b, c] in mesh.triangles() {
		writeln!(writer, "f {} {} {}", a + 1, b + 1, c + 1)?;
	}
	Ok(())
}

/// ASCII PLY with float vertices and triangle faces.
pub fn write_ply<W: Write>(mesh: &Mesh, writer: &mut W) -> std::io::Result<()> {
	writeln!(writer, "ply")?;
	writeln!(writer, "format ascii 1.0")?;
	writeln!(writer, "element vertex {}", mesh.vertex_count())?;
	writeln!(writer, "property float x")?;
	writeln!(writer, "property float y")?;
	writeln!(writer, "property float z")?;
	writeln!(writer, "element face {}", mesh.triangle_count())?;
	writeln!(writer, "property list uchar int vertex_indices")?;
	writeln!(writer, "end_header")?;
	for v in mesh.vertices() {
		writeln!(writer, "{} {} {}", v.x, v.y, v.z)?;
	}
	for [a, b, c] in mesh.triangles() {
		writeln!(writer, "3 {} {} {}", a, b, c)?;
	}
	Ok(())
}
