//! Gravity vector controller.
//!
//! Every tick the accumulated rotation is updated from the player's input,
//! clamped to the configured limit, and used to rotate the world's base
//! gravity. The result, scaled by the body mass, is the force applied to the
//! player for that tick. The same vector decides which way is "up" for jumps,
//! for the rope cast, and for the camera.

use bevy::prelude::*;

use crate::config::GravityConfig;

/// Rotation input for a single tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RotationInput {
    /// Keyboard-style input: rotation accumulates while a direction is held.
    Manual { left: bool, right: bool },
    /// Raw tilt sensor reading; replaces the accumulated rotation.
    Tilt(f32),
}

impl RotationInput {
    /// No rotation this tick.
    pub const NONE: Self = Self::Manual {
        left: false,
        right: false,
    };
}

/// Rotate `v` counter-clockwise by `degrees`.
#[inline]
pub fn rotate_degrees(v: Vec2, degrees: f32) -> Vec2 {
    Vec2::from_angle(degrees.to_radians()).rotate(v)
}

/// Per-player gravity state.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct GravityController {
    /// Accumulated rotation in degrees, always within the configured limit.
    rotation_degrees: f32,
    /// Gravity force computed on the last tick.
    current_force: Vec2,
    /// Force written to the physics body on the last tick.
    pub(crate) applied_force: Vec2,
}

impl GravityController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one tick and return the gravity force to apply.
    pub fn advance(
        &mut self,
        config: &GravityConfig,
        input: RotationInput,
        base_gravity: Vec2,
        mass: f32,
    ) -> Vec2 {
        match input {
            RotationInput::Manual { left, right } => {
                let direction = right as i8 - left as i8;
                let step = config.rotation_rate * f32::from(direction);
                if step.is_finite() {
                    self.rotation_degrees += step;
                }
            }
            RotationInput::Tilt(reading) => {
                // A broken sensor sample keeps the previous orientation.
                let degrees = reading * config.tilt_scale;
                if degrees.is_finite() {
                    self.rotation_degrees = degrees;
                }
            }
        }

        let limit = config.rotation_limit();
        self.rotation_degrees = self.rotation_degrees.clamp(-limit, limit);
        self.current_force = rotate_degrees(base_gravity, self.rotation_degrees) * mass;
        self.current_force
    }

    /// Accumulated rotation in degrees.
    #[inline]
    pub fn rotation_degrees(&self) -> f32 {
        self.rotation_degrees
    }

    /// Gravity force computed on the last tick.
    #[inline]
    pub fn current_force(&self) -> Vec2 {
        self.current_force
    }

    /// Unit vector along the current gravity, or `None` before the first tick.
    pub fn down(&self) -> Option<Vec2> {
        self.current_force.try_normalize()
    }

    /// Unit vector opposite to the current gravity; world up before the first tick.
    pub fn up(&self) -> Vec2 {
        self.down().map(|down| -down).unwrap_or(Vec2::Y)
    }

    /// Reset the rotation back to the base gravity direction.
    pub fn reset(&mut self) {
        self.rotation_degrees = 0.0;
        self.current_force = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BASE: Vec2 = Vec2::new(0.0, -10.0);

    fn held(left: bool, right: bool) -> RotationInput {
        RotationInput::Manual { left, right }
    }

    #[test]
    fn no_input_keeps_base_gravity_scaled_by_mass() {
        let mut gravity = GravityController::new();
        let force = gravity.advance(&GravityConfig::default(), RotationInput::NONE, BASE, 3.0);
        assert!((force - Vec2::new(0.0, -30.0)).length() < 1e-4);
        assert_eq!(gravity.rotation_degrees(), 0.0);
    }

    #[test]
    fn right_rotates_counter_clockwise() {
        let mut gravity = GravityController::new();
        let config = GravityConfig::default().with_rotation_limit(180.0);
        for _ in 0..90 {
            gravity.advance(&config, held(false, true), BASE, 1.0);
        }
        assert!((gravity.rotation_degrees() - 90.0).abs() < 1e-3);
        // (0, -10) rotated +90° counter-clockwise is (10, 0).
        assert!((gravity.current_force() - Vec2::new(10.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn left_and_right_cancel() {
        let mut gravity = GravityController::new();
        gravity.advance(&GravityConfig::default(), held(true, true), BASE, 1.0);
        assert_eq!(gravity.rotation_degrees(), 0.0);
    }

    #[test]
    fn rotation_clamps_at_limit() {
        let mut gravity = GravityController::new();
        let config = GravityConfig::default().with_rotation_rate(2.0);
        for _ in 0..200 {
            gravity.advance(&config, held(true, false), BASE, 1.0);
        }
        assert_eq!(gravity.rotation_degrees(), -90.0);
    }

    #[test]
    fn tilt_replaces_accumulated_rotation() {
        let mut gravity = GravityController::new();
        let config = GravityConfig::tilt();
        gravity.advance(&config, held(false, true), BASE, 1.0);
        gravity.advance(&config, RotationInput::Tilt(5.0), BASE, 1.0);
        assert_eq!(gravity.rotation_degrees(), 45.0);

        gravity.advance(&config, RotationInput::Tilt(-10.0), BASE, 1.0);
        assert_eq!(gravity.rotation_degrees(), -90.0);

        gravity.advance(&config, RotationInput::Tilt(20.0), BASE, 1.0);
        assert_eq!(gravity.rotation_degrees(), 90.0);
    }

    #[test]
    fn non_finite_tilt_is_ignored() {
        let mut gravity = GravityController::new();
        let config = GravityConfig::tilt();
        gravity.advance(&config, RotationInput::Tilt(2.0), BASE, 1.0);
        gravity.advance(&config, RotationInput::Tilt(f32::NAN), BASE, 1.0);
        assert_eq!(gravity.rotation_degrees(), 18.0);
    }

    #[test]
    fn bad_limit_written_to_config_falls_back_to_default() {
        let mut gravity = GravityController::new();
        let config = GravityConfig {
            rotation_limit_degrees: f32::NAN,
            rotation_rate: 2.0,
            ..default()
        };
        for _ in 0..100 {
            gravity.advance(&config, held(false, true), BASE, 1.0);
        }
        assert_eq!(gravity.rotation_degrees(), 90.0);

        let negative = GravityConfig {
            rotation_limit_degrees: -30.0,
            ..default()
        };
        gravity.advance(&negative, RotationInput::NONE, BASE, 1.0);
        assert_eq!(gravity.rotation_degrees(), 30.0);
    }

    #[test]
    fn non_finite_rate_keeps_rotation() {
        let mut gravity = GravityController::new();
        let config = GravityConfig {
            rotation_rate: f32::NAN,
            ..default()
        };
        gravity.advance(&config, held(true, false), BASE, 1.0);
        assert_eq!(gravity.rotation_degrees(), 0.0);
        assert!(gravity.current_force().is_finite());
    }

    #[test]
    fn up_is_opposite_of_gravity() {
        let mut gravity = GravityController::new();
        assert_eq!(gravity.up(), Vec2::Y);
        gravity.advance(&GravityConfig::default(), RotationInput::NONE, BASE, 2.0);
        assert!((gravity.up() - Vec2::Y).length() < 1e-5);
        assert!((gravity.down().unwrap() - Vec2::NEG_Y).length() < 1e-5);
    }

    fn input_strategy() -> impl Strategy<Value = RotationInput> {
        prop_oneof![
            (any::<bool>(), any::<bool>()).prop_map(|(left, right)| RotationInput::Manual { left, right }),
            (-50.0f32..50.0).prop_map(RotationInput::Tilt),
        ]
    }

    proptest! {
        #[test]
        fn rotation_never_exceeds_limit(
            inputs in prop::collection::vec(input_strategy(), 0..400),
            rate in 0.5f32..2.0,
            limit in 1.0f32..180.0,
        ) {
            let config = GravityConfig::default()
                .with_rotation_rate(rate)
                .with_rotation_limit(limit);
            let mut gravity = GravityController::new();
            for input in inputs {
                gravity.advance(&config, input, BASE, 1.0);
                prop_assert!(gravity.rotation_degrees().abs() <= limit);
                prop_assert!((gravity.current_force().length() - BASE.length()).abs() < 1e-3);
            }
        }
    }
}
