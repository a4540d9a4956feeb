use std::sync::{Arc, Mutex};

use glam::{Vec2, Vec3};
use image::GrayImage;

use super::*;
use crate::camera::{look_at, PinholeCamera};
use crate::test_utils::*;

/// Carver over `[-2, 2]^3` at 32 voxels per axis.
fn rig_carver(update: VoxelUpdate) -> VoxelCarver {
  let option = VoxelCarverOption::new(Vec3::splat(-2.0), Vec3::splat(2.0), 0.125).with_update(update);
  let mut carver = VoxelCarver::new(option);
  carver.init().expect("valid rig option");
  carver
}

fn grid(carver: &VoxelCarver) -> &VoxelGrid {
  carver.grid().expect("initialized")
}

struct Recorder(Arc<Mutex<Vec<(usize, u32, u32)>>>);

impl CarveObserver for Recorder {
  fn on_view_sdf(&mut self, view_index: usize, sdf: &SdfImage) {
    self
      .0
      .lock()
      .unwrap()
      .push((view_index, sdf.width(), sdf.height()));
  }
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_calls_before_init_fail() {
  let mut carver = VoxelCarver::new(VoxelCarverOption::new(Vec3::splat(-1.0), Vec3::ONE, 0.5));
  let camera = rig_camera(Vec3::new(0.0, 0.0, 5.0));
  let mut mesh = Mesh::new();

  assert!(carver.grid().is_none());
  assert_eq!(
    carver.carve(&camera, &unit_cube_silhouette()),
    Err(CarveError::Uninitialized)
  );
  assert_eq!(
    carver.carve_all(&orthogonal_rig(), &[]),
    Err(CarveError::Uninitialized)
  );
  assert_eq!(
    carver.extract_voxel(&mut mesh, true, false),
    Err(CarveError::Uninitialized)
  );
  assert_eq!(
    carver.extract_iso_surface(&mut mesh, 0.0),
    Err(CarveError::Uninitialized)
  );
}

#[test]
fn test_init_sets_start_state_per_mode() {
  let max = rig_carver(VoxelUpdate::Max);
  assert!(grid(&max)
    .voxels()
    .iter()
    .all(|v| v.sdf == MAX_MODE_SENTINEL && v.update_num == 0));

  let average = rig_carver(VoxelUpdate::weighted_average());
  assert!(grid(&average)
    .voxels()
    .iter()
    .all(|v| v.sdf == 0.0 && v.update_num == 0));
}

#[test]
fn test_init_rejects_bad_options() {
  let base = VoxelCarverOption::new(Vec3::splat(-1.0), Vec3::ONE, 0.5);

  let bad = [
    base.clone().with_update(VoxelUpdate::WeightedAverage {
      weight: 0.0,
      max_update_num: 10,
    }),
    base.clone().with_update(VoxelUpdate::WeightedAverage {
      weight: f32::NAN,
      max_update_num: 10,
    }),
    base.clone().with_update(VoxelUpdate::WeightedAverage {
      weight: 1.0,
      max_update_num: 0,
    }),
    base.clone().with_truncation_band(Some(0.0)),
    base.clone().with_truncation_band(Some(f32::INFINITY)),
  ];
  for option in bad {
    let mut carver = VoxelCarver::new(option.clone());
    assert!(
      matches!(carver.init(), Err(CarveError::InvalidUpdateOption(_))),
      "{:?} should be rejected",
      option
    );
    assert!(carver.grid().is_none());
  }

  let mut carver = VoxelCarver::new(base.clone().with_resolution(-1.0));
  assert_eq!(carver.init(), Err(CarveError::InvalidResolution(-1.0)));
  assert!(carver.grid().is_none());

  let mut carver = VoxelCarver::new(VoxelCarverOption::default());
  assert!(matches!(
    carver.init(),
    Err(CarveError::InvalidBoundingBox { .. })
  ));
}

#[test]
fn test_set_option_drops_grid() {
  let mut carver = rig_carver(VoxelUpdate::Max);
  let option = carver.option().clone().with_resolution(0.25);

  carver.set_option(option);

  assert!(carver.grid().is_none());
  assert_eq!(carver.option().resolution, 0.25);
  carver.init().unwrap();
  assert_eq!(grid(&carver).voxel_num(), glam::UVec3::splat(16));
}

// =============================================================================
// Validation leaves the grid untouched
// =============================================================================

#[test]
fn test_dimension_mismatch_leaves_grid_unchanged() {
  let mut carver = rig_carver(VoxelUpdate::Max);
  let camera = rig_camera(Vec3::new(0.0, 0.0, 5.0));
  carver.carve(&camera, &unit_cube_silhouette()).unwrap();
  let before = fused_state(grid(&carver));

  let wrong = GrayImage::new(RIG_SIZE, RIG_SIZE + 1);
  assert_eq!(
    carver.carve(&camera, &wrong),
    Err(CarveError::DimensionMismatch {
      camera: (RIG_SIZE, RIG_SIZE),
      silhouette: (RIG_SIZE, RIG_SIZE + 1),
    })
  );

  assert_eq!(fused_state(grid(&carver)), before);
}

#[test]
fn test_carve_all_count_mismatch_leaves_grid_unchanged() {
  let mut carver = rig_carver(VoxelUpdate::weighted_average());
  let before = fused_state(grid(&carver));

  let result = carver.carve_all(&orthogonal_rig(), &[unit_cube_silhouette()]);

  assert_eq!(
    result,
    Err(CarveError::ViewCountMismatch {
      cameras: 2,
      silhouettes: 1
    })
  );
  assert_eq!(fused_state(grid(&carver)), before);
}

#[test]
fn test_carve_all_checks_every_view_first() {
  let mut carver = rig_carver(VoxelUpdate::Max);
  let before = fused_state(grid(&carver));

  // First view is fine, second is the wrong size
  let silhouettes = vec![unit_cube_silhouette(), GrayImage::new(8, 8)];
  let result = carver.carve_all(&orthogonal_rig(), &silhouettes);

  assert!(matches!(result, Err(CarveError::DimensionMismatch { .. })));
  assert_eq!(fused_state(grid(&carver)), before);
}

// =============================================================================
// Fusion through the carver
// =============================================================================

#[test]
fn test_max_repeated_view_is_idempotent() {
  let mut carver = rig_carver(VoxelUpdate::Max);
  let camera = rig_camera(Vec3::new(0.0, 0.0, 5.0));
  let silhouette = unit_cube_silhouette();

  carver.carve(&camera, &silhouette).unwrap();
  let first: Vec<f32> = grid(&carver).voxels().iter().map(|v| v.sdf).collect();
  carver.carve(&camera, &silhouette).unwrap();
  let second: Vec<f32> = grid(&carver).voxels().iter().map(|v| v.sdf).collect();

  assert_eq!(first, second);
  assert!(grid(&carver).voxels().iter().all(|v| v.update_num == 2));
}

#[test]
fn test_max_never_decreases_across_views() {
  let mut carver = rig_carver(VoxelUpdate::Max);
  let views = [
    (Vec3::new(0.0, 0.0, 5.0), square_silhouette(RIG_SIZE, 8, 31)),
    (Vec3::new(5.0, 0.0, 0.0), unit_cube_silhouette()),
    (Vec3::new(0.0, 0.0, 5.0), square_silhouette(RIG_SIZE, 14, 25)),
  ];

  let mut previous: Vec<f32> = grid(&carver).voxels().iter().map(|v| v.sdf).collect();
  for (eye, silhouette) in &views {
    carver.carve(&rig_camera(*eye), silhouette).unwrap();
    let current: Vec<f32> = grid(&carver).voxels().iter().map(|v| v.sdf).collect();
    for (before, after) in previous.iter().zip(&current) {
      assert!(after >= before, "sdf decreased from {} to {}", before, after);
    }
    previous = current;
  }
}

#[test]
fn test_weighted_average_cap_of_one() {
  let mut carver = rig_carver(VoxelUpdate::WeightedAverage {
    weight: 1.0,
    max_update_num: 1,
  });
  let camera = rig_camera(Vec3::new(0.0, 0.0, 5.0));

  let stats = carver.carve(&camera, &unit_cube_silhouette()).unwrap();
  assert_eq!(stats.updated, grid(&carver).voxels().len());
  let before = fused_state(grid(&carver));

  let stats = carver
    .carve(&camera, &square_silhouette(RIG_SIZE, 4, 35))
    .unwrap();

  assert_eq!(stats.updated, 0);
  assert_eq!(stats.capped, grid(&carver).voxels().len());
  assert_eq!(fused_state(grid(&carver)), before);
}

#[test]
fn test_weighted_average_follows_view_order() {
  let update = VoxelUpdate::WeightedAverage {
    weight: 1.0,
    max_update_num: 1,
  };
  let camera = rig_camera(Vec3::new(0.0, 0.0, 5.0));
  let narrow = unit_cube_silhouette();
  let wide = square_silhouette(RIG_SIZE, 4, 35);

  let mut a = rig_carver(update);
  a.carve_all(&[camera.clone(), camera.clone()], &[narrow.clone(), wide.clone()])
    .unwrap();
  let mut b = rig_carver(update);
  b.carve_all(&[camera.clone(), camera], &[wide, narrow]).unwrap();

  assert_ne!(fused_state(grid(&a)), fused_state(grid(&b)));
}

// =============================================================================
// Visibility, stats and diagnostics
// =============================================================================

#[test]
fn test_voxels_outside_image_are_not_visible() {
  let option = VoxelCarverOption::new(Vec3::splat(-4.0), Vec3::splat(4.0), 0.5);
  let mut carver = VoxelCarver::new(option);
  carver.init().unwrap();

  let stats = carver
    .carve(&rig_camera(Vec3::new(0.0, 0.0, 5.0)), &unit_cube_silhouette())
    .unwrap();

  assert_eq!(stats.updated, 10 * 10 * 16);
  assert_eq!(stats.not_visible, 16 * 16 * 16 - 10 * 10 * 16);
  assert_eq!(stats.capped, 0);

  let untouched = grid(&carver)
    .voxels()
    .iter()
    .filter(|v| v.update_num == 0 && v.sdf == MAX_MODE_SENTINEL)
    .count();
  assert_eq!(untouched, stats.not_visible);
}

#[test]
fn test_points_behind_pinhole_are_not_visible() {
  let mut carver = rig_carver(VoxelUpdate::Max);
  let pose = look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 10.0), Vec3::Y);
  let camera = PinholeCamera::new(RIG_SIZE, RIG_SIZE, pose, Vec2::splat(20.0), Vec2::splat(19.5));

  let stats = carver.carve(&camera, &unit_cube_silhouette()).unwrap();

  assert_eq!(stats.updated, 0);
  assert_eq!(stats.not_visible, grid(&carver).voxels().len());
}

#[test]
fn test_sdf_out_and_observer_receive_view_field() {
  let mut carver = rig_carver(VoxelUpdate::Max);
  let seen = Arc::new(Mutex::new(Vec::new()));
  carver.set_observer(Box::new(Recorder(seen.clone())));

  let silhouette = unit_cube_silhouette();
  let mut sdf = SdfImage::new(1, 1);
  carver
    .carve_view(&rig_camera(Vec3::new(0.0, 0.0, 5.0)), &silhouette, Some(&mut sdf))
    .unwrap();
  carver
    .carve(&rig_camera(Vec3::new(5.0, 0.0, 0.0)), &silhouette)
    .unwrap();

  assert_eq!(sdf.dimensions(), (RIG_SIZE, RIG_SIZE));
  let expected = make_signed_distance_field(&silhouette, &carver.option().sdf_options());
  assert_eq!(sdf.as_raw(), expected.as_raw());
  assert_eq!(
    *seen.lock().unwrap(),
    vec![(0, RIG_SIZE, RIG_SIZE), (1, RIG_SIZE, RIG_SIZE)]
  );
}

#[test]
fn test_carve_all_sums_stats() {
  let mut carver = rig_carver(VoxelUpdate::Max);
  let silhouettes = vec![unit_cube_silhouette(), unit_cube_silhouette()];

  let stats = carver.carve_all(&orthogonal_rig(), &silhouettes).unwrap();

  assert_eq!(stats.updated, 2 * grid(&carver).voxels().len());
  assert_eq!(stats.not_visible, 0);
}

// =============================================================================
// End to end
// =============================================================================

fn carved_unit_cube() -> VoxelCarver {
  let mut carver = rig_carver(VoxelUpdate::Max);
  let silhouettes = vec![unit_cube_silhouette(), unit_cube_silhouette()];
  carver.carve_all(&orthogonal_rig(), &silhouettes).unwrap();
  carver
}

#[test]
fn test_end_to_end_iso_surface_is_closed_unit_cube() {
  let carver = carved_unit_cube();
  let mut mesh = Mesh::new();

  let triangles = carver.extract_iso_surface(&mut mesh, 0.0).unwrap();

  assert!(triangles > 0);
  assert!(is_closed_and_oriented(&mesh), "Carved surface must be closed");
  assert!(signed_volume(&mesh) > 0.0);

  let bounds = mesh.bounds().unwrap();
  for axis in 0..3 {
    assert!((bounds.min[axis] + 1.0).abs() < 0.1, "min {:?}", bounds.min);
    assert!((bounds.max[axis] - 1.0).abs() < 0.1, "max {:?}", bounds.max);
  }
}

#[test]
fn test_end_to_end_voxel_shell() {
  let mut carver = carved_unit_cube();

  // 16^3 voxel centres fall inside [-1, 1]^3
  let mut solid = Mesh::new();
  assert_eq!(carver.extract_voxel(&mut solid, false, false), Ok(4096));

  let mut shell = Mesh::new();
  assert_eq!(carver.extract_voxel(&mut shell, true, false), Ok(16 * 16 * 16 - 14 * 14 * 14));
  assert_eq!(shell.triangle_count(), 1352 * 12);

  // Every voxel was observed, so the pseudo surface adds nothing
  let mut pseudo = Mesh::new();
  assert_eq!(carver.extract_voxel(&mut pseudo, true, true), Ok(1352));

  let bounds = shell.bounds().unwrap();
  assert_eq!(bounds.min, Vec3::splat(-1.0));
  assert_eq!(bounds.max, Vec3::splat(1.0));
}

#[test]
fn test_full_frame_silhouettes_fill_the_grid() {
  // Both silhouettes cover the whole image, so the frustum intersection
  // contains the grid and the surface is capped at the grid box.
  let option = VoxelCarverOption::new(Vec3::splat(-1.0), Vec3::splat(1.0), 0.125);
  let mut carver = VoxelCarver::new(option);
  carver.init().unwrap();
  let full = square_silhouette(RIG_SIZE, 0, RIG_SIZE - 1);

  carver
    .carve_all(&orthogonal_rig(), &[full.clone(), full])
    .unwrap();
  assert!(grid(&carver).voxels().iter().all(|v| v.sdf < 0.0));

  let mut mesh = Mesh::new();
  let triangles = carver.extract_iso_surface(&mut mesh, 0.0).unwrap();

  assert!(triangles > 0);
  assert!(is_closed_and_oriented(&mesh), "Capped surface must be closed");
  assert!(signed_volume(&mesh) > 0.0);

  let bounds = mesh.bounds().unwrap();
  assert!(bounds.min.abs_diff_eq(Vec3::splat(-1.0), 1e-4), "min {:?}", bounds.min);
  assert!(bounds.max.abs_diff_eq(Vec3::splat(1.0), 1e-4), "max {:?}", bounds.max);
}
