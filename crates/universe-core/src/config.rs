//! Universe configuration.
//!
//! Every tunable of the generator, the kinematics step and the avatar lives
//! here so a host can load one JSON document and hand it to [`Universe::new`].
//!
//! [`Universe::new`]: crate::universe::Universe::new

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::thing::MAX_THINGS;

/// Top-level configuration for a loaded universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    /// Slots in the thing store. Generation fails rather than exceed this.
    pub capacity: usize,

    /// Largest time step handed to the kinematics of tile-bound entities.
    /// Orbital time always advances by the full frame delta.
    pub max_step_dt: f32,

    pub generator: GeneratorConfig,
    pub kinematics: KinematicsConfig,
    pub avatar: AvatarConfig,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            capacity: MAX_THINGS,
            max_step_dt: 0.1,
            generator: GeneratorConfig::default(),
            kinematics: KinematicsConfig::default(),
            avatar: AvatarConfig::default(),
        }
    }
}

impl UniverseConfig {
    /// A handful of solar systems. Fast to generate, used by tests and demos.
    pub fn small() -> Self {
        Self {
            generator: GeneratorConfig {
                min_solar_systems: 2,
                max_solar_systems: 4,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Parse a JSON document. Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Parameters of [`DefaultPolicy`](crate::generator::DefaultPolicy).
///
/// Distances and radii are in universe units, periods in seconds. A period's
/// sign is picked at random so bodies orbit and spin both ways.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    // ========================================================================
    // Solar systems
    // ========================================================================
    pub min_solar_systems: u16,
    pub max_solar_systems: u16,
    pub min_solar_system_radius: u16,
    pub max_solar_system_radius: u16,
    /// Gap left between the safe radii of neighbouring solar systems.
    pub solar_system_spacing: u16,

    // ========================================================================
    // Suns
    // ========================================================================
    /// Probability that a solar system gets two suns instead of one.
    pub binary_sun_chance: f32,
    pub min_sun_radius: u16,
    pub max_sun_radius: u16,

    // ========================================================================
    // Planets
    // ========================================================================
    pub min_planets: u16,
    pub max_planets: u16,
    pub min_planet_radius: u16,
    pub max_planet_radius: u16,
    /// Gap left between neighbouring planet orbits.
    pub planet_spacing: u16,
    pub min_orbital_period: i16,
    pub max_orbital_period: i16,
    pub min_rotation_period: i16,
    pub max_rotation_period: i16,

    // ========================================================================
    // Moons
    // ========================================================================
    pub min_moons: u16,
    pub max_moons: u16,
    pub min_moon_radius: u16,
    pub max_moon_radius: u16,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_solar_systems: 40,
            max_solar_systems: 120,
            min_solar_system_radius: 1200,
            max_solar_system_radius: 2400,
            solar_system_spacing: 200,

            binary_sun_chance: 0.2,
            min_sun_radius: 60,
            max_sun_radius: 120,

            min_planets: 1,
            max_planets: 8,
            min_planet_radius: 20,
            max_planet_radius: 60,
            planet_spacing: 40,
            min_orbital_period: 60,
            max_orbital_period: 600,
            min_rotation_period: 20,
            max_rotation_period: 200,

            min_moons: 0,
            max_moons: 3,
            min_moon_radius: 6,
            max_moon_radius: 14,
        }
    }
}

/// Tunables of the curved-tilemap movement step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicsConfig {
    /// Default gravity for generic tile-bound objects (units/second²).
    pub gravity: f32,

    /// Nudge along "up" applied before sampling tiles in `can_move_to`, so a
    /// body resting exactly on a tile boundary is not classified as inside it.
    pub placement_epsilon: f32,

    /// How far below a freshly spawned body the floor is searched for.
    pub snap_distance: f32,
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            gravity: 10.0,
            placement_epsilon: 0.05,
            snap_distance: 64.0,
        }
    }
}

/// The player-controlled body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    pub half_extents: Vec2,
    /// Horizontal speed at full input deflection (tiles/second).
    pub speed: f32,
    pub jump_speed: f32,
    pub gravity: f32,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            half_extents: Vec2::new(0.375, 0.525),
            speed: 3.0,
            jump_speed: 7.0,
            gravity: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let config = UniverseConfig::default();
        assert_eq!(config.capacity, MAX_THINGS);
        assert!(config.generator.min_solar_systems <= config.generator.max_solar_systems);
        assert!(config.kinematics.placement_epsilon > 0.0);
        assert!(config.avatar.jump_speed > 0.0);
    }

    #[test]
    fn json_round_trip_preserves_values() {
        let mut config = UniverseConfig::small();
        config.avatar.speed = 5.5;
        let json = config.to_json().unwrap();
        let parsed = UniverseConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let parsed = UniverseConfig::from_json(r#"{ "kinematics": { "gravity": 3.0 } }"#).unwrap();
        assert_eq!(parsed.kinematics.gravity, 3.0);
        assert_eq!(parsed.kinematics.placement_epsilon, 0.05);
        assert_eq!(parsed.capacity, MAX_THINGS);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = UniverseConfig::from_json("{ capacity: ").unwrap_err();
        assert!(matches!(err, crate::error::UniverseError::Config(_)));
    }
}
