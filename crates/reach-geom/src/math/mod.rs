// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Float32 math helpers: vectors and quaternions.
//!
//! All operations round to `f32`; no fused multiply-add is used so results are
//! identical across targets.

mod quat;
mod vec3;

pub use quat::Quat;
pub use vec3::Vec3;

/// Degeneracy threshold used when normalising vectors and quaternions.
pub const EPSILON: f32 = 1e-6;
