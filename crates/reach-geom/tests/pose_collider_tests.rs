// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]

use core::f32::consts::FRAC_PI_2;

use reach_geom::{Collider, Pose, Quat, Vec3};

fn approx(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < 1e-5
}

#[test]
fn pose_round_trips_points_through_inverse() {
    let pose = Pose::new(
        Vec3::new(1.0, 2.0, 3.0),
        Quat::from_axis_angle(Vec3::UNIT_Y, FRAC_PI_2),
    );
    let local = Vec3::new(0.5, -0.25, 2.0);
    let world = pose.transform_point(local);
    assert!(approx(pose.inverse_transform_point(world), local));
    assert!(approx(pose.inverse().transform_point(world), local));
}

#[test]
fn relative_pose_recomposes_to_child() {
    let parent = Pose::new(
        Vec3::new(0.0, 1.0, 0.0),
        Quat::from_axis_angle(Vec3::UNIT_Z, 0.3),
    );
    let child = Pose::new(
        Vec3::new(0.4, 1.2, -0.1),
        Quat::from_axis_angle(Vec3::UNIT_X, 1.1),
    );
    let offset = parent.relative(&child);
    let back = parent.compose(&offset);
    assert!(approx(back.position, child.position));
    assert!(back.rotation.angle_to(child.rotation) < 1e-2);
}

#[test]
fn from_to_aligns_directions() {
    let q = Quat::from_to(Vec3::UNIT_Y, Vec3::new(1.0, 1.0, 0.0));
    assert!(approx(q.rotate(Vec3::UNIT_Y), Vec3::new(1.0, 1.0, 0.0).normalize()));
    let flip = Quat::from_to(Vec3::UNIT_Y, -Vec3::UNIT_Y);
    assert!(approx(flip.rotate(Vec3::UNIT_Y), -Vec3::UNIT_Y));
}

#[test]
fn box_distance_respects_orientation() {
    let c = Collider::Box {
        half_extents: Vec3::new(1.0, 0.1, 0.1),
    };
    let flat = Pose::IDENTITY;
    let upright = Pose::new(Vec3::ZERO, Quat::from_axis_angle(Vec3::UNIT_Z, FRAC_PI_2));
    let p = Vec3::new(0.0, 0.9, 0.0);
    assert!((c.distance(&flat, p) - 0.8).abs() < 1e-5);
    assert!(c.distance(&upright, p) < 1e-5);
}

#[test]
fn sphere_closest_point_lies_on_surface() {
    let c = Collider::Sphere { radius: 0.5 };
    let pose = Pose::from_position(Vec3::new(1.0, 0.0, 0.0));
    let q = c.closest_point(&pose, Vec3::new(3.0, 0.0, 0.0));
    assert!(approx(q, Vec3::new(1.5, 0.0, 0.0)));
    assert!((c.distance(&pose, Vec3::new(3.0, 0.0, 0.0)) - 1.5).abs() < 1e-6);
}

#[cfg(feature = "serde")]
#[test]
fn pose_serializes_as_arrays() {
    let pose = Pose::from_position(Vec3::new(1.0, 2.0, 3.0));
    let json = serde_json::to_string(&pose).unwrap();
    assert_eq!(json, r#"{"position":[1.0,2.0,3.0],"rotation":[0.0,0.0,0.0,1.0]}"#);
    let back: Pose = serde_json::from_str(r#"{"position":[1,2,3]}"#).unwrap();
    assert_eq!(back, pose);
}
