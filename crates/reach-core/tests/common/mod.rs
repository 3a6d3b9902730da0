// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use reach_core::{BehaviourId, InteractionEvent, LifecycleStage};
use reach_dry_tests::{EventRecorder, FrameBuilder, Scene, SceneBuilder};

/// Fixed step used by most tests.
pub const DT: f32 = 0.01;

/// Ball centre shared by the single-object scenes.
pub const BALL: (f32, f32, f32) = (0.0, 1.0, 0.0);

/// Ball radius shared by the single-object scenes.
pub const BALL_RADIUS: f32 = 0.05;

/// One floating ball and VR controller 1, placed at `(x, y, z)` with grasp
/// strength `grasp`.
pub fn ball_and_vr(builder: SceneBuilder, at: (f32, f32, f32), grasp: f32) -> Scene {
    builder
        .with_sphere(BALL.0, BALL.1, BALL.2, BALL_RADIUS)
        .with_vr(1)
        .with_frame(FrameBuilder::vr(1).at(at.0, at.1, at.2).grasp(grasp).build())
        .build()
        .expect("scene")
}

/// VR controller 1 holding the ball after one step.
pub fn holding_ball(builder: SceneBuilder) -> Scene {
    let mut scene = ball_and_vr(builder, BALL, 1.0);
    scene.step(DT);
    assert!(scene.behaviour(0).expect("ball").is_grasped());
    scene
}

/// Lifecycle stages recorded for `id`, in order.
pub fn stages_of(recorder: &EventRecorder, id: BehaviourId) -> Vec<LifecycleStage> {
    recorder
        .events()
        .iter()
        .filter_map(|e| match e {
            InteractionEvent::Lifecycle {
                behaviour, stage, ..
            } if *behaviour == id => Some(*stage),
            _ => None,
        })
        .collect()
}

/// Names of the manager's events for the last tick.
pub fn tick_names(scene: &Scene) -> Vec<&'static str> {
    scene
        .manager
        .events()
        .iter()
        .map(InteractionEvent::name)
        .collect()
}
