//! State marker components.
//!
//! These components mirror the player's state for convenient querying.
//! They are added and removed by the controller at the end of each tick.

use bevy::prelude::*;

/// Marker component indicating the ground sensor touches the map.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use tether_controller::prelude::*;
///
/// fn can_jump(grounded: Option<&Grounded>) -> bool {
///     grounded.is_some()
/// }
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the player is not grounded.
///
/// Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Marker component present while the player hangs on a rope.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct RopeAttached;
