//! Controller configuration components.
//!
//! This module defines the tuning for the gravity rotation, the player ball,
//! the rope chain, and the physics world the controller runs in.

use std::f32::consts::PI;
use std::time::Duration;

use bevy::prelude::*;

/// Lowest rotation rate accepted by [`GravityConfig::with_rotation_rate`].
pub const MIN_ROTATION_RATE: f32 = 0.5;
/// Highest rotation rate accepted by [`GravityConfig::with_rotation_rate`].
pub const MAX_ROTATION_RATE: f32 = 2.0;

/// Rotation limit used when the configured one is not a finite angle.
pub const DEFAULT_ROTATION_LIMIT: f32 = 90.0;

/// Source of the gravity rotation.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RotationMode {
    /// Rotation accumulates while the rotate-left/right inputs are held.
    #[default]
    Keys,
    /// Rotation follows the tilt sensor reading directly.
    Tilt,
}

/// Tuning for the gravity vector controller.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct GravityConfig {
    /// Maximum absolute rotation of gravity away from the world base, in degrees.
    pub rotation_limit_degrees: f32,
    /// Degrees added per tick while a rotate input is held.
    pub rotation_rate: f32,
    /// Multiplier from a raw tilt reading to degrees (±10 maps to ±90).
    pub tilt_scale: f32,
    /// Which input drives the rotation.
    pub mode: RotationMode,
}

impl Default for GravityConfig {
    fn default() -> Self {
        Self {
            rotation_limit_degrees: DEFAULT_ROTATION_LIMIT,
            rotation_rate: 1.0,
            tilt_scale: 9.0,
            mode: RotationMode::Keys,
        }
    }
}

impl GravityConfig {
    /// Config driven by the tilt sensor instead of the keys.
    pub fn tilt() -> Self {
        Self {
            mode: RotationMode::Tilt,
            ..default()
        }
    }

    /// Builder: set the rotation rate (sensitivity), clamped to the supported range.
    pub fn with_rotation_rate(mut self, rate: f32) -> Self {
        self.rotation_rate = rate.clamp(MIN_ROTATION_RATE, MAX_ROTATION_RATE);
        self
    }

    /// Builder: set the rotation limit in degrees.
    pub fn with_rotation_limit(mut self, degrees: f32) -> Self {
        self.rotation_limit_degrees = degrees;
        self.rotation_limit_degrees = self.rotation_limit();
        self
    }

    /// The rotation limit as a usable bound: its magnitude, or
    /// [`DEFAULT_ROTATION_LIMIT`] when it is not finite.
    pub fn rotation_limit(&self) -> f32 {
        if self.rotation_limit_degrees.is_finite() {
            self.rotation_limit_degrees.abs()
        } else {
            DEFAULT_ROTATION_LIMIT
        }
    }

    /// Builder: set the tilt scale factor.
    pub fn with_tilt_scale(mut self, scale: f32) -> Self {
        self.tilt_scale = scale;
        self
    }

    /// Builder: set the rotation mode.
    pub fn with_mode(mut self, mode: RotationMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Tuning for the player ball.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct PlayerConfig {
    /// Radius of the solid ball.
    pub radius: f32,
    /// How far the ground sensor extends beyond the ball surface.
    pub sensor_margin: f32,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    /// Jump impulse = gravity force rotated 180° times this multiplier.
    pub jump_multiplier: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            radius: 10.0,
            sensor_margin: 4.0,
            density: 6.0,
            friction: 0.4,
            restitution: 0.2,
            jump_multiplier: 2.0,
        }
    }
}

impl PlayerConfig {
    /// Radius of the ground sensor shape.
    #[inline]
    pub fn sensor_radius(&self) -> f32 {
        self.radius + self.sensor_margin
    }

    /// Mass of the ball as the physics engine computes it from density and area.
    ///
    /// Used until the engine reports the real mass.
    pub fn nominal_mass(&self) -> f32 {
        self.density * PI * self.radius * self.radius
    }

    /// Builder: set the radius.
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    /// Builder: set the sensor margin.
    pub fn with_sensor_margin(mut self, margin: f32) -> Self {
        self.sensor_margin = margin;
        self
    }

    /// Builder: set the jump multiplier.
    pub fn with_jump_multiplier(mut self, multiplier: f32) -> Self {
        self.jump_multiplier = multiplier;
        self
    }

    /// Builder: set the material parameters.
    pub fn with_material(mut self, density: f32, friction: f32, restitution: f32) -> Self {
        self.density = density;
        self.friction = friction;
        self.restitution = restitution;
        self
    }
}

/// Tuning for the rope chain.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct RopeConfig {
    /// Distance between consecutive segment bodies (the rope resolution).
    pub segment_spacing: f32,
    /// Maximum distance of the anchor cast.
    pub max_range: f32,

    // === Segment bodies ===
    pub segment_radius: f32,
    pub segment_density: f32,
    pub segment_friction: f32,
    pub segment_restitution: f32,
    pub segment_linear_damping: f32,

    // === Joints ===
    /// Oscillation frequency of the spring joints, in Hz.
    pub spring_frequency_hz: f32,
    /// Damping ratio of the spring joints (1.0 = critical).
    pub spring_damping_ratio: f32,
    /// Rope joint max length as a multiple of the creation-time distance.
    pub max_length_factor: f32,
}

impl Default for RopeConfig {
    fn default() -> Self {
        Self {
            segment_spacing: 6.0,
            max_range: 300.0,
            segment_radius: 6.0,
            segment_density: 0.05,
            segment_friction: 0.5,
            segment_restitution: 0.5,
            segment_linear_damping: 1.0,
            spring_frequency_hz: 15.0,
            spring_damping_ratio: 1.0,
            max_length_factor: 1.1,
        }
    }
}

impl RopeConfig {
    /// Builder: set the segment spacing.
    pub fn with_segment_spacing(mut self, spacing: f32) -> Self {
        self.segment_spacing = spacing;
        self
    }

    /// Builder: set the cast range.
    pub fn with_max_range(mut self, range: f32) -> Self {
        self.max_range = range;
        self
    }

    /// Builder: set the spring parameters.
    pub fn with_spring(mut self, frequency_hz: f32, damping_ratio: f32) -> Self {
        self.spring_frequency_hz = frequency_hz;
        self.spring_damping_ratio = damping_ratio;
        self
    }

    /// Builder: set the max-length factor of the rope joints.
    pub fn with_max_length_factor(mut self, factor: f32) -> Self {
        self.max_length_factor = factor;
        self
    }

    /// Builder: set the segment collision radius.
    pub fn with_segment_radius(mut self, radius: f32) -> Self {
        self.segment_radius = radius;
        self
    }

    /// Builder: set the segment linear damping.
    pub fn with_segment_damping(mut self, damping: f32) -> Self {
        self.segment_linear_damping = damping;
        self
    }
}

/// World-level settings shared by every controller.
#[derive(Resource, Reflect, Debug, Clone, Copy)]
#[reflect(Resource)]
pub struct TetherWorldConfig {
    /// Gravity of the physics world before any rotation is applied.
    pub base_gravity: Vec2,
    /// Physics steps per second.
    pub step_hz: f64,
    /// Constraint solver (velocity) iterations per step.
    pub velocity_iterations: usize,
    /// Internal stabilization (position) iterations per step.
    pub position_iterations: usize,
}

impl Default for TetherWorldConfig {
    fn default() -> Self {
        Self {
            base_gravity: Vec2::new(0.0, -10.0),
            step_hz: 30.0,
            velocity_iterations: 6,
            position_iterations: 2,
        }
    }
}

impl TetherWorldConfig {
    /// Length of one physics step in seconds.
    #[inline]
    pub fn step_seconds(&self) -> f32 {
        (1.0 / self.step_hz) as f32
    }

    /// Length of one physics step, as `Time<Fixed>` stores it.
    pub fn step_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.step_hz)
    }

    /// Builder: set the base gravity.
    pub fn with_base_gravity(mut self, gravity: Vec2) -> Self {
        self.base_gravity = gravity;
        self
    }

    /// Builder: set the step rate.
    pub fn with_step_hz(mut self, hz: f64) -> Self {
        self.step_hz = hz;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gravity_config_defaults() {
        let config = GravityConfig::default();
        assert_eq!(config.rotation_limit_degrees, 90.0);
        assert_eq!(config.rotation_rate, 1.0);
        assert_eq!(config.tilt_scale, 9.0);
        assert_eq!(config.mode, RotationMode::Keys);
    }

    #[test]
    fn rotation_rate_is_clamped() {
        assert_eq!(GravityConfig::default().with_rotation_rate(10.0).rotation_rate, MAX_ROTATION_RATE);
        assert_eq!(GravityConfig::default().with_rotation_rate(0.0).rotation_rate, MIN_ROTATION_RATE);
        assert_eq!(GravityConfig::default().with_rotation_rate(1.5).rotation_rate, 1.5);
    }

    #[test]
    fn rotation_limit_is_sanitised() {
        assert_eq!(GravityConfig::default().with_rotation_limit(-45.0).rotation_limit_degrees, 45.0);
        assert_eq!(
            GravityConfig::default().with_rotation_limit(f32::NAN).rotation_limit_degrees,
            DEFAULT_ROTATION_LIMIT
        );

        let written = GravityConfig {
            rotation_limit_degrees: f32::INFINITY,
            ..default()
        };
        assert_eq!(written.rotation_limit(), DEFAULT_ROTATION_LIMIT);
    }

    #[test]
    fn tilt_preset_switches_mode() {
        assert_eq!(GravityConfig::tilt().mode, RotationMode::Tilt);
    }

    #[test]
    fn player_sensor_is_larger_than_ball() {
        let config = PlayerConfig::default();
        assert_eq!(config.sensor_radius(), 14.0);
    }

    #[test]
    fn player_nominal_mass_matches_circle_area() {
        let config = PlayerConfig::default().with_radius(1.0).with_material(2.0, 0.4, 0.2);
        assert!((config.nominal_mass() - 2.0 * PI).abs() < 1e-5);
    }

    #[test]
    fn rope_defaults() {
        let config = RopeConfig::default();
        assert_eq!(config.segment_spacing, 6.0);
        assert_eq!(config.max_range, 300.0);
        assert_eq!(config.max_length_factor, 1.1);
    }

    #[test]
    fn world_step_seconds() {
        let config = TetherWorldConfig::default();
        assert!((config.step_seconds() - 1.0 / 30.0).abs() < 1e-6);
        assert_eq!(config.step_duration(), Time::<Fixed>::from_hz(30.0).timestep());
    }
}
