// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Core geometry types (pose, AABB, collider).
//!
//! Overlap semantics are inclusive on faces so that touching boxes pair up;
//! this avoids activation churn when an object rests exactly on a boundary.

#[doc = "Axis-aligned bounding boxes (world space)."]
pub mod aabb;
#[doc = "Primitive collider shapes with closest-point queries."]
pub mod collider;
#[doc = "Rigid poses (translation + rotation)."]
pub mod pose;
