// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Listener that records every dispatched event.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reach_core::{BehaviourId, Commands, InteractionEvent, InteractionListener};

/// Shared event log; register one clone, inspect another.
///
/// # Example
///
/// ```
/// use reach_dry_tests::{EventRecorder, SceneBuilder};
///
/// let recorder = EventRecorder::new();
/// let mut scene = SceneBuilder::new().with_sphere(0.0, 1.0, 0.0, 0.05).build().unwrap();
/// scene.manager.add_listener(recorder.clone());
/// scene.step(0.01);
/// assert_eq!(recorder.names(), vec!["lifecycle"]);
/// ```
#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<InteractionEvent>>>,
}

impl EventRecorder {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<InteractionEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<InteractionEvent> {
        self.lock().clone()
    }

    /// Event names in dispatch order.
    pub fn names(&self) -> Vec<&'static str> {
        self.lock().iter().map(InteractionEvent::name).collect()
    }

    /// Names of events concerning `behaviour`.
    pub fn names_for(&self, behaviour: BehaviourId) -> Vec<&'static str> {
        self.lock()
            .iter()
            .filter(|e| e.behaviour() == Some(behaviour))
            .map(InteractionEvent::name)
            .collect()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Nothing recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl InteractionListener for EventRecorder {
    fn on_event(&mut self, event: &InteractionEvent, _commands: &mut Commands<'_>) {
        self.lock().push(event.clone());
    }
}
