//! Player intent components.
//!
//! Intents carry what the player wants this tick. Input handling lives in the
//! application: it writes into [`TetherIntent`] and the controller systems
//! consume it on the next fixed tick.

use bevy::prelude::*;

use crate::config::RotationMode;
use crate::gravity::RotationInput;

/// Per-player input state read by the controller systems.
///
/// Rotation and aiming are held states, set every frame. Jump and rope toggle
/// are one-shot requests that stay pending until a fixed tick consumes them.
///
/// # Example
///
/// ```rust
/// use tether_controller::prelude::*;
///
/// let mut intent = TetherIntent::new();
/// intent.set_rotation(false, true);
/// intent.request_jump();
///
/// assert!(intent.has_jump_request());
/// assert!(intent.take_jump_request());
/// assert!(!intent.take_jump_request());
/// ```
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct TetherIntent {
    /// Rotate-left input is held.
    pub rotate_left: bool,
    /// Rotate-right input is held.
    pub rotate_right: bool,
    /// Latest raw tilt sensor reading, used in tilt mode.
    pub tilt: Option<f32>,
    /// The throw input is held; drives the aim preview.
    pub aiming: bool,
    pub(crate) jump_requested: bool,
    pub(crate) rope_toggle_requested: bool,
}

impl TetherIntent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both rotate inputs at once.
    pub fn set_rotation(&mut self, left: bool, right: bool) {
        self.rotate_left = left;
        self.rotate_right = right;
    }

    /// Store a tilt sensor reading.
    pub fn set_tilt(&mut self, reading: f32) {
        self.tilt = Some(reading);
    }

    /// Set whether the throw input is held.
    pub fn set_aiming(&mut self, aiming: bool) {
        self.aiming = aiming;
    }

    /// Ask for a jump on the next tick.
    ///
    /// The request is dropped if the player is not grounded when it is consumed.
    pub fn request_jump(&mut self) {
        self.jump_requested = true;
    }

    /// Ask the rope to be thrown if idle, or released if attached.
    pub fn request_rope_toggle(&mut self) {
        self.rope_toggle_requested = true;
    }

    pub fn has_jump_request(&self) -> bool {
        self.jump_requested
    }

    pub fn has_rope_toggle_request(&self) -> bool {
        self.rope_toggle_requested
    }

    /// Consume the pending jump request.
    pub fn take_jump_request(&mut self) -> bool {
        std::mem::take(&mut self.jump_requested)
    }

    /// Consume the pending rope toggle request.
    pub fn take_rope_toggle_request(&mut self) -> bool {
        std::mem::take(&mut self.rope_toggle_requested)
    }

    /// Rotation input for this tick under the given mode.
    pub fn rotation_input(&self, mode: RotationMode) -> RotationInput {
        match mode {
            RotationMode::Keys => RotationInput::Manual {
                left: self.rotate_left,
                right: self.rotate_right,
            },
            RotationMode::Tilt => self.tilt.map_or(RotationInput::NONE, RotationInput::Tilt),
        }
    }
}
