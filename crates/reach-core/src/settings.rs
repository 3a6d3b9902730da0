// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Interaction settings.
//!
//! Every tunable policy constant lives here so hosts can load it through
//! `reach-app-core`'s `ConfigService` (key [`SETTINGS_KEY`]). All sections use
//! `#[serde(default)]`, so a partial JSON document fills the rest from
//! `Default`.

use reach_geom::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Config key under which hosts persist [`InteractionSettings`].
pub const SETTINGS_KEY: &str = "interaction";

/// Complete settings for one [`crate::InteractionManager`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InteractionSettings {
    /// Broadphase activation.
    pub activity: ActivitySettings,
    /// Hover detection.
    pub hover: HoverSettings,
    /// Grasp intent thresholds.
    pub grasp: GraspSettings,
    /// Contact skeleton and contact-force policy.
    pub contact: ContactSettings,
    /// Tracking-loss suspension.
    pub suspension: SuspensionSettings,
    /// Release velocity estimation.
    pub throw: ThrowSettings,
    /// Per-tick invariant validation.
    pub validation: ValidationSettings,
    /// Event emission.
    pub events: EventSettings,
}

/// Broadphase activation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivitySettings {
    /// Radius around each tracked controller inside which objects activate.
    pub overlap_radius: f32,
    /// Maximum activation depth; 1 = only objects directly in range.
    pub max_depth: u32,
    /// Consecutive out-of-range ticks a monitor survives before tear-down.
    pub deactivation_grace_ticks: u32,
    /// Cell edge of the spatial grid.
    pub grid_cell_size: f32,
}

impl Default for ActivitySettings {
    fn default() -> Self {
        Self {
            overlap_radius: 0.25,
            max_depth: 3,
            deactivation_grace_ticks: 0,
            grid_cell_size: 0.5,
        }
    }
}

/// Hover detection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoverSettings {
    /// Maximum distance from the hover point to an object's collider.
    pub hover_radius: f32,
}

impl Default for HoverSettings {
    fn default() -> Self {
        Self { hover_radius: 0.15 }
    }
}

/// Grasp intent hysteresis per controller kind.
///
/// A grasp begins when strength rises to the grasp threshold and ends when it
/// falls below the release threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraspSettings {
    /// Hand grab strength that begins a grasp.
    pub hand_grasp_threshold: f32,
    /// Hand grab strength below which a grasp ends.
    pub hand_release_threshold: f32,
    /// Controller trigger value that begins a grasp.
    pub vr_grasp_threshold: f32,
    /// Controller trigger value below which a grasp ends.
    pub vr_release_threshold: f32,
}

impl Default for GraspSettings {
    fn default() -> Self {
        Self {
            hand_grasp_threshold: 0.8,
            hand_release_threshold: 0.6,
            vr_grasp_threshold: 0.7,
            vr_release_threshold: 0.3,
        }
    }
}

/// Contact skeleton geometry and contact-force policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactSettings {
    /// Effective-mass multiplier for objects in [`crate::ContactForceMode::Object`].
    pub object_mass_multiplier: f32,
    /// Effective-mass multiplier for objects in [`crate::ContactForceMode::Ui`].
    pub ui_mass_multiplier: f32,
    /// Mass assumed when the physics port cannot report one.
    pub default_partner_mass: f32,
    /// Bone lag beyond which the skeleton switches to soft contact.
    pub soft_contact_distance: f32,
    /// Bone lag beyond which bones teleport instead of sweeping.
    pub teleport_distance: f32,
    /// Radius of finger bone capsules.
    pub finger_radius: f32,
    /// Half-extents of the palm bone box.
    pub palm_half_extents: Vec3,
    /// Radius of the single VR controller tip bone.
    pub vr_tip_radius: f32,
}

impl Default for ContactSettings {
    fn default() -> Self {
        Self {
            object_mass_multiplier: 1.0,
            ui_mass_multiplier: 0.25,
            default_partner_mass: 1.0,
            soft_contact_distance: 0.03,
            teleport_distance: 0.1,
            finger_radius: 0.008,
            palm_half_extents: Vec3::new(0.04, 0.01, 0.045),
            vr_tip_radius: 0.02,
        }
    }
}

/// Tracking-loss suspension policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuspensionSettings {
    /// Seconds an untracked grasp may persist before it is force-released.
    pub max_suspension_time: f32,
}

impl Default for SuspensionSettings {
    fn default() -> Self {
        Self {
            max_suspension_time: 3.0,
        }
    }
}

/// Release velocity estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrowSettings {
    /// Apply an estimated velocity when the last grasp is released.
    pub enabled: bool,
    /// Seconds of grasped motion history averaged into the release velocity.
    pub window: f32,
}

impl Default for ThrowSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            window: 0.05,
        }
    }
}

/// Per-tick invariant validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Run validation at the end of every tick (defaults to debug builds only).
    pub enabled: bool,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            enabled: cfg!(debug_assertions),
        }
    }
}

/// Event emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    /// Emit hover/contact/grasp stay events every tick.
    pub emit_stay_events: bool,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            emit_stay_events: true,
        }
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), SettingsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SettingsError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), SettingsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SettingsError::Negative { field, value })
    }
}

fn thresholds(field: &'static str, grasp: f32, release: f32) -> Result<(), SettingsError> {
    let unit = |v: f32| (0.0..=1.0).contains(&v);
    if unit(grasp) && unit(release) && release <= grasp {
        Ok(())
    } else {
        Err(SettingsError::Thresholds {
            field,
            grasp,
            release,
        })
    }
}

impl ActivitySettings {
    /// Checks radius, depth and cell size.
    pub fn validate(&self) -> Result<(), SettingsError> {
        positive("activity.overlap_radius", self.overlap_radius)?;
        if self.max_depth < 1 {
            return Err(SettingsError::MaxDepth(self.max_depth));
        }
        positive("activity.grid_cell_size", self.grid_cell_size)
    }
}

impl InteractionSettings {
    /// Checks every section; returns the first problem found.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.activity.validate()?;
        positive("hover.hover_radius", self.hover.hover_radius)?;
        if self.hover.hover_radius > self.activity.overlap_radius {
            return Err(SettingsError::HoverExceedsOverlap {
                hover: self.hover.hover_radius,
                overlap: self.activity.overlap_radius,
            });
        }
        thresholds(
            "grasp.hand",
            self.grasp.hand_grasp_threshold,
            self.grasp.hand_release_threshold,
        )?;
        thresholds(
            "grasp.vr",
            self.grasp.vr_grasp_threshold,
            self.grasp.vr_release_threshold,
        )?;
        non_negative(
            "contact.object_mass_multiplier",
            self.contact.object_mass_multiplier,
        )?;
        non_negative("contact.ui_mass_multiplier", self.contact.ui_mass_multiplier)?;
        positive(
            "contact.default_partner_mass",
            self.contact.default_partner_mass,
        )?;
        positive(
            "contact.soft_contact_distance",
            self.contact.soft_contact_distance,
        )?;
        positive("contact.teleport_distance", self.contact.teleport_distance)?;
        positive("contact.finger_radius", self.contact.finger_radius)?;
        positive("contact.vr_tip_radius", self.contact.vr_tip_radius)?;
        non_negative(
            "suspension.max_suspension_time",
            self.suspension.max_suspension_time,
        )?;
        positive("throw.window", self.throw.window)
    }
}
