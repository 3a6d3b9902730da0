// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Grasped motion and release velocity.

use std::collections::VecDeque;

use reach_geom::{Pose, Vec3};

/// Target pose for an object held by one or more controllers.
///
/// `holds` are the per-grasper targets (controller pose composed with the
/// grasp offset captured at grasp begin). Position is their mean; rotation
/// follows the first grasper.
pub fn grasp_target(holds: &[Pose]) -> Option<Pose> {
    let first = holds.first()?;
    let sum = holds
        .iter()
        .fold(Vec3::ZERO, |acc, p| acc + p.position);
    #[allow(clippy::cast_precision_loss)]
    let n = holds.len() as f32;
    Some(Pose::new(sum * (1.0 / n), first.rotation))
}

/// Recent positions of a grasped object.
#[derive(Debug, Clone, Default)]
pub struct ThrowHistory {
    samples: VecDeque<(f64, Vec3)>,
}

impl ThrowHistory {
    /// Records a sample and drops those older than `window` seconds.
    ///
    /// The newest sample older than the window is kept so the estimate always
    /// spans the full window once enough history exists.
    pub fn record(&mut self, time: f64, position: Vec3, window: f32) {
        self.samples.push_back((time, position));
        let horizon = time - f64::from(window);
        while self.samples.len() > 2 && self.samples[1].0 <= horizon {
            self.samples.pop_front();
        }
    }

    /// Mean velocity across the retained samples.
    #[allow(clippy::cast_possible_truncation)]
    pub fn velocity(&self) -> Option<Vec3> {
        let (t0, p0) = *self.samples.front()?;
        let (t1, p1) = *self.samples.back()?;
        let span = t1 - t0;
        if span <= f64::EPSILON {
            return None;
        }
        Some((p1 - p0) * (1.0 / span as f32))
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// No samples recorded.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drops all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
