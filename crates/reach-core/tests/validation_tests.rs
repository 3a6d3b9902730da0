// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]

mod common;

use common::{ball_and_vr, BALL, DT};
use reach_core::{InteractionEvent, PhysicsPort, Vec3, ViolationKind};
use reach_dry_tests::{Scene, SceneBuilder};

fn hovered_ball(validation: bool) -> Scene {
    let mut scene = ball_and_vr(
        SceneBuilder::new().configure(|s| s.validation.enabled = validation),
        (0.1, 1.0, 0.0),
        0.0,
    );
    scene.step(DT);
    assert!(scene.behaviour(0).unwrap().is_hovered());
    scene
}

fn tamper_kinematic(scene: &mut Scene) {
    let body = scene.behaviour(0).unwrap().body();
    scene.manager.physics_mut().set_kinematic(body, true);
}

fn count(scene: &Scene, name: &str) -> usize {
    scene
        .manager
        .events()
        .iter()
        .filter(|e| e.name() == name)
        .count()
}

#[test]
fn shadow_drift_marks_the_behaviour_misbehaving_once() {
    let mut scene = hovered_ball(true);
    let id = scene.objects[0];
    tamper_kinematic(&mut scene);

    let summary = scene.step(DT);
    assert_eq!(summary.misbehaving, 1);
    assert!(scene.manager.events().contains(&InteractionEvent::Misbehaving {
        behaviour: id,
        violations: vec![ViolationKind::ShadowKinematicMismatch {
            shadow: false,
            physical: Some(true),
        }],
    }));
    assert!(scene.manager.activity().is_misbehaving(id));

    scene.step(DT);
    assert_eq!(count(&scene, "misbehaving"), 0);
    // existing hover survives, new interactions do not begin
    assert!(scene.behaviour(0).unwrap().is_hovered());
}

#[test]
fn misbehaving_objects_cannot_be_grasped_or_contacted() {
    let mut scene = hovered_ball(true);
    tamper_kinematic(&mut scene);
    scene.step(DT);

    scene.set_grasp(1, 1.0);
    scene.run(2, DT);
    assert!(!scene.behaviour(0).unwrap().is_grasped());

    scene.set_grasp(1, 0.0);
    scene.move_controller(1, Vec3::new(BALL.0, BALL.1, BALL.2));
    scene.run(3, DT);
    assert!(!scene.behaviour(0).unwrap().is_contacted());
}

#[test]
fn resyncing_the_shadow_recovers_the_behaviour() {
    let mut scene = hovered_ball(true);
    let id = scene.objects[0];
    tamper_kinematic(&mut scene);
    scene.step(DT);
    scene.set_grasp(1, 1.0);
    scene.step(DT);

    assert_eq!(scene.manager.resync_shadow(id), Ok(true));
    assert!(scene.behaviour(0).unwrap().shadow_kinematic());
    scene.step(DT);
    assert!(scene
        .manager
        .events()
        .contains(&InteractionEvent::Recovered { behaviour: id }));
    assert!(!scene.manager.activity().is_misbehaving(id));

    // the grasp stage runs before validation, so the grasp lands one tick later
    scene.step(DT);
    assert!(scene.behaviour(0).unwrap().is_grasped());
}

#[test]
fn resync_is_refused_while_held() {
    let mut scene = ball_and_vr(SceneBuilder::new(), BALL, 1.0);
    scene.step(DT);
    assert!(scene.behaviour(0).unwrap().is_grasped());
    assert_eq!(scene.manager.resync_shadow(scene.objects[0]), Ok(false));
}

#[test]
fn disabled_validation_reports_without_marking() {
    let mut scene = hovered_ball(false);
    let id = scene.objects[0];
    tamper_kinematic(&mut scene);
    scene.run(2, DT);

    assert!(!scene.manager.activity().is_misbehaving(id));
    let violations = scene.manager.validate();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].behaviour, id);
}

#[test]
fn shadow_setters_keep_physics_and_cache_in_step() {
    let mut scene = hovered_ball(true);
    let id = scene.objects[0];
    let body = scene.behaviour(0).unwrap().body();

    scene.manager.set_object_gravity(id, true).unwrap();
    assert!(scene.behaviour(0).unwrap().shadow_gravity());
    assert_eq!(scene.manager.physics().uses_gravity(body), Some(true));
    scene.step(DT);
    assert!(scene.manager.validate().is_empty());
    assert_eq!(count(&scene, "misbehaving"), 0);
}
