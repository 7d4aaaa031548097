//! Player ball state.

use bevy::prelude::*;

use crate::contact::GroundContacts;

/// The controlled ball.
///
/// Lives on the player's dynamic body. The ground sensor is a child collider
/// whose contacts feed [`Player::ground_contacts`].
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct Player {
    /// Radius of the solid ball.
    pub radius: f32,
    /// Map colliders currently under the ground sensor.
    pub ground_contacts: GroundContacts,
}

impl Default for Player {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl Player {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            ground_contacts: GroundContacts::default(),
        }
    }

    /// True while the ground sensor overlaps at least one map collider.
    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.ground_contacts.can_jump()
    }

    /// Impulse for a jump against the given gravity force.
    ///
    /// The impulse points opposite to gravity, scaled by `multiplier`.
    /// Returns `None` when the player is not grounded.
    pub fn jump_impulse(&self, gravity_force: Vec2, multiplier: f32) -> Option<Vec2> {
        self.is_grounded().then(|| -gravity_force * multiplier)
    }
}
