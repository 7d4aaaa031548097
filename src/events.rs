//! Gameplay events emitted by the controller.
//!
//! These are hooks for sound, UI and level flow. The controller never reads
//! them back.

use bevy::prelude::*;

/// A grounded jump impulse was applied.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct JumpPerformed {
    pub player: Entity,
    pub impulse: Vec2,
}

/// A rope chain was built.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct RopeThrown {
    pub player: Entity,
    /// Anchor point the chain hangs from.
    pub anchor: Vec2,
    pub segments: usize,
}

/// A rope chain was torn down.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RopeReleased {
    pub player: Entity,
}

/// The player's sensor touched the level exit.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReached {
    pub player: Entity,
    pub exit: Entity,
}

/// The player's sensor started touching a sign.
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct SignTouched {
    pub player: Entity,
    pub sign: Entity,
    pub text: String,
}

/// The player's sensor stopped touching a sign.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignLeft {
    pub player: Entity,
    pub sign: Entity,
}
