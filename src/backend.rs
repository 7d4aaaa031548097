//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement to
//! drive the controller. The controller systems only talk to the engine
//! through these calls, so the gravity, contact and rope logic stays
//! engine-agnostic.

use bevy::prelude::*;

use crate::collision::CollisionData;
use crate::config::RopeConfig;
use crate::rope::{ChainPlan, RopeChain};

/// Trait for physics backend implementations.
///
/// Implement this trait to integrate a physics engine with the controller.
/// Besides the per-body queries and forces, a backend owns the engine side of
/// the rope: turning a [`ChainPlan`] into bodies and joints, and tearing them
/// down again.
///
/// Contact reporting is done by systems the backend plugin installs in
/// [`TetherSet::Sensors`](crate::TetherSet::Sensors).
///
/// For an example implementation, see the `rapier` module's `Rapier2dBackend`.
pub trait TetherPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Cast a ray and return the closest non-sensor hit.
    ///
    /// # Arguments
    /// * `world` - The ECS world for queries
    /// * `origin` - Ray origin in world space
    /// * `direction` - Cast direction (normalized)
    /// * `max_distance` - Maximum cast distance
    /// * `exclude_entity` - Body to exclude from the cast (usually the player)
    fn raycast(
        world: &mut World,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        exclude_entity: Entity,
    ) -> Option<CollisionData>;

    /// Get the current position of an entity.
    fn get_position(world: &World, entity: Entity) -> Vec2;

    /// Get the mass of an entity, if the engine has computed it yet.
    fn get_mass(world: &World, entity: Entity) -> Option<f32>;

    /// Apply an impulse to an entity.
    ///
    /// Impulse is an instantaneous change in momentum.
    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec2);

    /// Add a persistent force to an entity.
    ///
    /// The force stays applied on every step until it is removed again by
    /// adding its negation.
    fn apply_force(world: &mut World, entity: Entity, force: Vec2);

    /// Build the bodies and joints of a rope chain hung between the plan's
    /// anchor and `player`.
    fn spawn_chain(world: &mut World, player: Entity, plan: &ChainPlan, config: &RopeConfig) -> RopeChain;

    /// Destroy every joint, then every segment, then the pin of a chain.
    fn despawn_chain(world: &mut World, chain: RopeChain);
}

/// Despawn chain entities in teardown order.
///
/// Shared by backends whose joints are plain entities. Missing entities are
/// logged; teardown always continues.
pub fn despawn_chain_entities(world: &mut World, chain: &RopeChain) -> usize {
    let mut despawned = 0;
    for entity in chain.entities() {
        if world.despawn(entity) {
            despawned += 1;
        } else {
            error!("rope entity {entity} was already despawned during teardown");
        }
    }
    despawned
}
