// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for Reach tools.
//! Storage adapters implement [`config::ConfigStore`]; tools go through
//! [`SettingsService`] so only validated settings reach disk.

pub mod config;
pub mod settings;

pub use settings::{SettingsService, SettingsStoreError};
