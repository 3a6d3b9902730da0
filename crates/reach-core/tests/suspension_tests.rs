// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]

mod common;

use common::{holding_ball, DT};
use reach_core::{
    ControllerId, GraspEndReason, InteractionEvent, PhysicsPort, SuspensionOutcome, Vec3,
};
use reach_dry_tests::{EventRecorder, SceneBuilder};

#[test]
fn losing_tracking_suspends_and_regaining_resumes() {
    let mut scene = holding_ball(SceneBuilder::new());
    let id = scene.objects[0];
    let body = scene.behaviour(0).unwrap().body();
    let recorder = EventRecorder::new();
    scene.manager.add_listener(recorder.clone());

    scene.set_tracked(1, false);
    scene.step(DT);
    let ball = scene.behaviour(0).unwrap();
    assert!(ball.is_suspended());
    assert!(ball.is_grasped());
    assert!(ball.is_untracked_grasper(ControllerId(1)));
    assert!(recorder.events().contains(&InteractionEvent::TrackingLost {
        controller: ControllerId(1)
    }));
    assert!(recorder.events().contains(&InteractionEvent::SuspensionBegin {
        behaviour: id,
        controller: ControllerId(1),
    }));
    assert_eq!(scene.manager.physics().is_kinematic(body), Some(true));
    assert!(scene.manager.is_active(id), "held objects stay active");
    assert!(scene.manager.validate().is_empty());

    // a suspended object stays put while the controller is away
    scene.move_controller(1, Vec3::new(0.4, 1.0, 0.0));
    scene.run(5, DT);
    assert!(scene.behaviour(0).unwrap().pose().position.distance(Vec3::new(0.0, 1.0, 0.0)) < 1e-6);

    recorder.clear();
    scene.set_tracked(1, true);
    scene.step(DT);
    let ball = scene.behaviour(0).unwrap();
    assert!(!ball.is_suspended());
    assert!(ball.is_grasped());
    assert!(!ball.is_untracked_grasper(ControllerId(1)));
    let events = recorder.events();
    assert!(events.contains(&InteractionEvent::TrackingRegained {
        controller: ControllerId(1)
    }));
    assert!(events.contains(&InteractionEvent::SuspensionEnd {
        behaviour: id,
        outcome: SuspensionOutcome::Resumed,
    }));

    // the hold offset is recaptured, so the object does not jump
    scene.step(DT);
    assert!(scene.behaviour(0).unwrap().pose().position.distance(Vec3::new(0.0, 1.0, 0.0)) < 1e-5);
    assert!(scene.manager.validate().is_empty());
}

#[test]
fn suspension_times_out_into_a_release() {
    let mut scene = holding_ball(
        SceneBuilder::new().configure(|s| s.suspension.max_suspension_time = 0.25),
    );
    let id = scene.objects[0];
    let body = scene.behaviour(0).unwrap().body();
    let recorder = EventRecorder::new();
    scene.manager.add_listener(recorder.clone());

    scene.set_tracked(1, false);
    scene.run(20, DT);
    assert!(scene.behaviour(0).unwrap().is_suspended(), "0.2 s is within the limit");

    scene.run(10, DT);
    let ball = scene.behaviour(0).unwrap();
    assert!(!ball.is_suspended());
    assert!(!ball.is_grasped());
    assert!(scene.manager.controller(ControllerId(1)).unwrap().grasped().is_none());

    let events = recorder.events();
    let end = events
        .iter()
        .position(|e| {
            *e == InteractionEvent::GraspEnd {
                behaviour: id,
                controller: ControllerId(1),
                reason: GraspEndReason::TimedOut,
            }
        })
        .unwrap();
    let suspension_end = events
        .iter()
        .position(|e| {
            *e == InteractionEvent::SuspensionEnd {
                behaviour: id,
                outcome: SuspensionOutcome::TimedOut,
            }
        })
        .unwrap();
    assert!(end < suspension_end);
    assert!(events.contains(&InteractionEvent::ObjectGraspEnd {
        behaviour: id,
        release_velocity: None,
    }));
    assert_eq!(scene.manager.physics().is_kinematic(body), Some(false));
    assert!(scene.manager.validate().is_empty());
}

#[test]
fn first_tracked_frame_is_not_a_regain() {
    let mut scene = SceneBuilder::new()
        .with_sphere(0.0, 1.0, 0.0, 0.05)
        .with_vr(1)
        .build()
        .unwrap();
    scene.step(DT);
    assert!(!scene.manager.controller(ControllerId(1)).unwrap().is_tracked());

    let recorder = EventRecorder::new();
    scene.manager.add_listener(recorder.clone());
    scene.set_frame(reach_dry_tests::FrameBuilder::vr(1).at(3.0, 0.0, 0.0).build());
    scene.step(DT);
    assert!(scene.manager.controller(ControllerId(1)).unwrap().is_tracked());
    assert!(recorder.names().iter().all(|n| *n != "tracking_regained"));
}

#[test]
fn non_finite_poses_count_as_untracked() {
    let mut scene = holding_ball(SceneBuilder::new());
    scene.move_controller(1, Vec3::new(f32::NAN, 1.0, 0.0));
    scene.step(DT);
    assert!(!scene.manager.controller(ControllerId(1)).unwrap().is_tracked());
    assert!(scene.behaviour(0).unwrap().is_suspended());
}

#[test]
fn untracked_second_grasper_does_not_suspend() {
    let mut scene = SceneBuilder::new()
        .with_object(
            Vec3::new(0.0, 1.0, 0.0),
            reach_core::Collider::Sphere { radius: 0.05 },
            Some(reach_core::GroupId::DEFAULT),
            |d| d.multi_grasp(true),
        )
        .with_vr(1)
        .with_vr(2)
        .with_frame(reach_dry_tests::FrameBuilder::vr(1).at(0.0, 1.0, 0.0).grasp(1.0).build())
        .with_frame(reach_dry_tests::FrameBuilder::vr(2).at(0.0, 1.0, 0.0).grasp(1.0).build())
        .configure(|s| s.suspension.max_suspension_time = 0.05)
        .build()
        .unwrap();
    scene.step(DT);
    assert_eq!(scene.behaviour(0).unwrap().grasp_count(), 2);

    scene.set_tracked(2, false);
    scene.step(DT);
    let ball = scene.behaviour(0).unwrap();
    assert!(!ball.is_suspended());
    assert!(ball.is_untracked_grasper(ControllerId(2)));

    scene.run(10, DT);
    let ball = scene.behaviour(0).unwrap();
    assert_eq!(ball.grasping_controllers().collect::<Vec<_>>(), vec![ControllerId(1)]);
    assert!(!ball.is_suspended());
    assert!(scene.manager.validate().is_empty());
}
