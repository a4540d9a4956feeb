//! Per-voxel fusion rule.
//!
//! Fusion is a pure function of the voxel's current state, one SDF sample
//! and the update policy.

use super::VoxelUpdate;

/// The part of a voxel that fusion reads and writes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelState {
  pub sdf: f32,
  pub update_num: u32,
}

/// Result of fusing one sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FuseOutcome {
  /// The sample was folded into the state.
  Updated(VoxelState),
  /// Weighted-average cap reached; state unchanged.
  Capped,
}

/// Fuse `sample` into `state` according to `update`.
#[inline]
pub fn fuse(state: VoxelState, sample: f32, update: &VoxelUpdate) -> FuseOutcome {
  match *update {
    VoxelUpdate::Max => FuseOutcome::Updated(VoxelState {
      sdf: state.sdf.max(sample),
      update_num: state.update_num.saturating_add(1),
    }),
    VoxelUpdate::WeightedAverage {
      weight,
      max_update_num,
    } => {
      if state.update_num >= max_update_num {
        return FuseOutcome::Capped;
      }
      let n = state.update_num as f32;
      FuseOutcome::Updated(VoxelState {
        sdf: (state.sdf * n + weight * sample) / (n + weight),
        update_num: state.update_num + 1,
      })
    }
  }
}

#[cfg(test)]
#[path = "fusion_test.rs"]
mod fusion_test;
