// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for Reach crates.
#![forbid(unsafe_code)]
//!
//! This crate provides commonly used test utilities to reduce duplication
//! across the Reach test suite.
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`frames`] - Controller frame builders (VR controllers, articulated hands)
//! - [`recorder`] - Listener that records dispatched events
//! - [`scene`] - Headless manager setup and a host-style step loop

pub mod config;
pub mod frames;
pub mod recorder;
pub mod scene;

// Re-export commonly used items at crate root for convenience
pub use config::InMemoryConfigStore;
pub use frames::FrameBuilder;
pub use recorder::EventRecorder;
pub use scene::{Scene, SceneBuilder, SceneError, TestManager};
