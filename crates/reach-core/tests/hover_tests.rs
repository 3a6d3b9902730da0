// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]

mod common;

use common::{ball_and_vr, tick_names, BALL, DT};
use reach_core::{Chirality, Collider, ControllerId, GroupId, GroupSettings, InteractionEvent, Vec3};
use reach_dry_tests::{FrameBuilder, SceneBuilder};

#[test]
fn hover_reports_the_collider_distance() {
    let mut scene = ball_and_vr(SceneBuilder::new(), (0.12, 1.0, 0.0), 0.0);
    let id = scene.objects[0];
    scene.step(DT);

    let ball = scene.behaviour(0).unwrap();
    assert!(ball.is_hovered());
    let d = ball.hover_distance(ControllerId(1)).unwrap();
    assert!((d - 0.07).abs() < 1e-5, "{d}");
    assert_eq!(ball.closest_hovering_controller(), Some(ControllerId(1)));
    assert_eq!(
        tick_names(&scene),
        vec![
            "lifecycle",
            "activated",
            "hover_begin",
            "object_hover_begin",
            "primary_hover_begin"
        ]
    );

    scene.move_controller(1, Vec3::new(0.1, 1.0, 0.0));
    scene.step(DT);
    assert!(scene.manager.events().contains(&InteractionEvent::HoverStay {
        behaviour: id,
        controller: ControllerId(1),
        distance: scene.behaviour(0).unwrap().hover_distance(ControllerId(1)).unwrap(),
    }));
    let d = scene.behaviour(0).unwrap().hover_distance(ControllerId(1)).unwrap();
    assert!((d - 0.05).abs() < 1e-5, "{d}");

    // just beyond the hover radius, but still close enough to stay active
    scene.move_controller(1, Vec3::new(0.21, 1.0, 0.0));
    scene.step(DT);
    let ball = scene.behaviour(0).unwrap();
    assert!(!ball.is_hovered());
    assert!(!ball.is_primary_hovered());
    assert!(scene.manager.is_active(id));
    let names = tick_names(&scene);
    assert_eq!(
        names,
        vec!["primary_hover_end", "hover_end", "object_hover_end"]
    );
}

#[test]
fn stay_events_can_be_silenced() {
    let mut scene = ball_and_vr(
        SceneBuilder::new().configure(|s| s.events.emit_stay_events = false),
        (0.1, 1.0, 0.0),
        0.0,
    );
    scene.run(3, DT);
    assert!(scene.behaviour(0).unwrap().is_hovered());
    assert!(scene.manager.events().is_empty(), "{:?}", tick_names(&scene));
}

#[test]
fn vr_controllers_win_primary_hover_over_hands() {
    let mut scene = SceneBuilder::new()
        .with_sphere(BALL.0, BALL.1, BALL.2, 0.05)
        .with_hand(1, Chirality::Left)
        .with_vr(2)
        .with_frame(FrameBuilder::hand(1).at(0.0, 1.1, 0.0).build())
        .with_frame(FrameBuilder::vr(2).at(0.1, 1.0, 0.0).build())
        .build()
        .unwrap();
    let id = scene.objects[0];
    scene.step(DT);

    let ball = scene.behaviour(0).unwrap();
    assert_eq!(
        ball.hovering_controllers().collect::<Vec<_>>(),
        vec![ControllerId(1), ControllerId(2)]
    );
    assert_eq!(ball.primary_hovering_controller(), Some(ControllerId(2)));
    let hand = scene.manager.controller(ControllerId(1)).unwrap();
    assert!(hand.is_hovering(id));
    assert_eq!(hand.primary_hovered(), None);

    // the hand picks it up once the controller leaves
    scene.move_controller(2, Vec3::new(5.0, 1.0, 0.0));
    scene.step(DT);
    assert_eq!(
        scene.behaviour(0).unwrap().primary_hovering_controller(),
        Some(ControllerId(1))
    );
    assert!(scene.manager.validate().is_empty());
}

#[test]
fn primary_hover_prefers_the_closest_object() {
    let mut scene = SceneBuilder::new()
        .with_sphere(0.0, 1.0, 0.0, 0.05)
        .with_sphere(0.15, 1.0, 0.0, 0.05)
        .with_vr(1)
        .with_frame(FrameBuilder::vr(1).at(0.09, 1.0, 0.0).build())
        .build()
        .unwrap();
    scene.step(DT);
    let (left, right) = (scene.objects[0], scene.objects[1]);
    let ctrl = scene.manager.controller(ControllerId(1)).unwrap();
    assert!(ctrl.is_hovering(left) && ctrl.is_hovering(right));
    assert_eq!(ctrl.primary_hovered(), Some(right));

    scene.move_controller(1, Vec3::new(0.06, 1.0, 0.0));
    scene.step(DT);
    assert_eq!(
        scene.manager.controller(ControllerId(1)).unwrap().primary_hovered(),
        Some(left)
    );
    assert!(!scene.manager.behaviour(right).unwrap().is_primary_hovered());
}

#[test]
fn ignore_flags_and_group_switches_suppress_hover() {
    let mut scene = SceneBuilder::new()
        .with_object(
            Vec3::new(0.0, 1.0, 0.0),
            Collider::Sphere { radius: 0.05 },
            Some(GroupId::DEFAULT),
            |mut d| {
                d.ignore_primary_hover = true;
                d
            },
        )
        .with_object(
            Vec3::new(0.0, 1.0, 0.1),
            Collider::Sphere { radius: 0.05 },
            Some(GroupId::DEFAULT),
            |mut d| {
                d.ignore_hover = true;
                d
            },
        )
        .with_vr(1)
        .with_frame(FrameBuilder::vr(1).at(0.1, 1.0, 0.0).build())
        .build()
        .unwrap();
    scene.step(DT);
    let a = scene.behaviour(0).unwrap();
    assert!(a.is_hovered());
    assert!(!a.is_primary_hovered());
    assert!(!scene.behaviour(1).unwrap().is_hovered());

    let quiet = scene.manager.create_group(GroupSettings {
        hover_enabled: false,
        ..GroupSettings::named("quiet")
    });
    let id = scene.objects[0];
    scene.manager.try_detach(id).unwrap();
    scene.manager.try_attach(id, quiet).unwrap();
    scene.run(2, DT);
    assert!(!scene.behaviour(0).unwrap().is_hovered());
}
