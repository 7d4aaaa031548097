//! # `tether_controller`
//!
//! A 2D rotating-gravity ball controller with a physics-driven grappling rope,
//! built on a physics backend abstraction.
//!
//! This crate provides:
//! - A gravity vector the player rotates with keys or a tilt sensor
//! - Ground detection from a sensor collider, counted per contact
//! - Jumps that push against the current gravity
//! - A rope thrown opposite to gravity and built as a chain of spring- and
//!   rope-jointed bodies
//! - Level exit and sign events from the same sensor
//! - A physics backend abstraction (Rapier2D included)
//!
//! ## Frame order
//!
//! All controller systems run in `FixedUpdate`, chained through [`TetherSet`]:
//! 1. `Sensors`: contact events update the ground counter
//! 2. `Gravity`: the gravity rotation advances
//! 3. `Actions`: jumps, rope throw/release, aim preview
//! 4. `Forces`: the gravity force is written to the body
//! 5. `Sync`: state markers are refreshed
//!
//! The physics step runs after them, once per tick, so it is always the last
//! thing to touch the bodies in a tick. `Time<Fixed>` follows
//! [`TetherWorldConfig::step_hz`](config::TetherWorldConfig::step_hz).
//!
//! ## Usage
//!
//! ```rust
//! use tether_controller::prelude::*;
//!
//! let gravity = GravityConfig::default().with_rotation_rate(1.5);
//! let mut intent = TetherIntent::new();
//! intent.set_rotation(false, true);
//! intent.request_rope_toggle();
//! # let _ = gravity;
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod collision;
pub mod config;
pub mod contact;
pub mod events;
pub mod gravity;
pub mod intent;
pub mod player;
pub mod rope;
pub mod state;
pub mod systems;

#[cfg(feature = "rapier2d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::TetherPhysicsBackend;
    pub use crate::collision::CollisionData;
    pub use crate::config::{GravityConfig, PlayerConfig, RopeConfig, RotationMode, TetherWorldConfig};
    pub use crate::contact::{FixtureRole, Sign};
    pub use crate::events::{ExitReached, JumpPerformed, RopeReleased, RopeThrown, SignLeft, SignTouched};
    pub use crate::gravity::{GravityController, RotationInput};
    pub use crate::intent::TetherIntent;
    pub use crate::player::Player;
    pub use crate::rope::{rope_segment_poses, Rope, RopeAimPreview, RopeError, RopePhase};
    pub use crate::state::{Airborne, Grounded, RopeAttached};
    pub use crate::{TetherControllerPlugin, TetherSet};

    #[cfg(feature = "rapier2d")]
    pub use crate::rapier::{spawn_player, Rapier2dBackend};
}

/// Per-tick phases of the controller, run in this order in `FixedUpdate`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TetherSet {
    /// Backend contact reporting.
    Sensors,
    /// Gravity rotation.
    Gravity,
    /// Jump, rope toggle and aim preview.
    Actions,
    /// Writing forces to the bodies.
    Forces,
    /// State marker sync.
    Sync,
}

/// Main plugin for the controller.
///
/// This plugin is generic over a physics backend `B` which provides the actual
/// physics operations (ray casts, forces, rope bodies and joints).
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `Rapier2dBackend`)
///
/// # Examples
///
/// With Rapier2D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier2d::prelude::*;
/// use tether_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule())
///     .add_plugins(TetherControllerPlugin::<Rapier2dBackend>::default())
///     .run();
/// ```
pub struct TetherControllerPlugin<B: backend::TetherPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::TetherPhysicsBackend> Default for TetherControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::TetherPhysicsBackend> Plugin for TetherControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::GravityConfig>();
        app.register_type::<config::PlayerConfig>();
        app.register_type::<config::RopeConfig>();
        app.register_type::<config::TetherWorldConfig>();
        app.register_type::<gravity::GravityController>();
        app.register_type::<intent::TetherIntent>();
        app.register_type::<contact::FixtureRole>();
        app.register_type::<contact::Sign>();
        app.register_type::<player::Player>();
        app.register_type::<rope::Rope>();
        app.register_type::<rope::RopeSegment>();
        app.register_type::<rope::RopePin>();
        app.register_type::<rope::RopeLink>();
        app.register_type::<rope::RopeAimPreview>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::RopeAttached>();

        app.init_resource::<config::TetherWorldConfig>();

        app.add_event::<events::JumpPerformed>();
        app.add_event::<events::RopeThrown>();
        app.add_event::<events::RopeReleased>();
        app.add_event::<events::ExitReached>();
        app.add_event::<events::SignTouched>();
        app.add_event::<events::SignLeft>();

        app.configure_sets(
            FixedUpdate,
            (
                TetherSet::Sensors,
                TetherSet::Gravity,
                TetherSet::Actions,
                TetherSet::Forces,
                TetherSet::Sync,
            )
                .chain(),
        );

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.add_systems(PreUpdate, systems::sync_fixed_timestep);
        app.add_observer(systems::despawn_orphaned_rope::<B>);

        app.add_systems(
            FixedUpdate,
            (
                systems::update_gravity::<B>.in_set(TetherSet::Gravity),
                (
                    systems::apply_jump::<B>,
                    systems::handle_rope_toggle::<B>,
                    systems::update_aim_preview::<B>,
                )
                    .chain()
                    .in_set(TetherSet::Actions),
                systems::apply_gravity_force::<B>.in_set(TetherSet::Forces),
                systems::sync_state_markers.in_set(TetherSet::Sync),
            ),
        );
    }
}
