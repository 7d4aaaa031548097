//! Core controller systems.
//!
//! These systems implement the per-tick controller behavior. They are generic
//! over the physics backend so the same logic drives any engine. All of them
//! run in `FixedUpdate`, before the engine step.

use bevy::prelude::*;

use crate::backend::TetherPhysicsBackend;
use crate::config::{GravityConfig, PlayerConfig, RopeConfig, TetherWorldConfig};
use crate::events::{JumpPerformed, RopeReleased, RopeThrown};
use crate::gravity::{GravityController, RotationInput};
use crate::intent::TetherIntent;
use crate::player::Player;
use crate::rope::{cast_direction, resolve_anchor, ChainPlan, Rope, RopeAimPreview, RopeError};
use crate::state::{Airborne, Grounded, RopeAttached};

/// Advance every gravity controller by one tick.
///
/// Reads the rotation input from [`TetherIntent`] and scales the rotated base
/// gravity by the body mass reported by the backend.
pub fn update_gravity<B: TetherPhysicsBackend>(world: &mut World) {
    let base_gravity = world
        .get_resource::<TetherWorldConfig>()
        .copied()
        .unwrap_or_default()
        .base_gravity;

    let entities: Vec<(Entity, GravityConfig, PlayerConfig, Option<TetherIntent>)> = world
        .query_filtered::<(
            Entity,
            Option<&GravityConfig>,
            Option<&PlayerConfig>,
            Option<&TetherIntent>,
        ), With<GravityController>>()
        .iter(world)
        .map(|(e, gravity, player, intent)| {
            (
                e,
                gravity.copied().unwrap_or_default(),
                player.copied().unwrap_or_default(),
                intent.cloned(),
            )
        })
        .collect();

    for (entity, gravity_config, player_config, intent) in entities {
        let mass = B::get_mass(world, entity).unwrap_or_else(|| player_config.nominal_mass());
        let input = intent
            .map(|intent| intent.rotation_input(gravity_config.mode))
            .unwrap_or(RotationInput::NONE);

        if let Some(mut controller) = world.get_mut::<GravityController>(entity) {
            controller.advance(&gravity_config, input, base_gravity, mass);
        }
    }
}

/// Apply a jump impulse for every pending jump request.
///
/// Requests are always consumed. Only grounded players actually jump.
pub fn apply_jump<B: TetherPhysicsBackend>(world: &mut World) {
    let jumps: Vec<(Entity, Option<Vec2>)> = world
        .query::<(
            Entity,
            &Player,
            &GravityController,
            Option<&PlayerConfig>,
            &mut TetherIntent,
        )>()
        .iter_mut(world)
        .filter_map(|(e, player, gravity, config, mut intent)| {
            if !intent.has_jump_request() {
                return None;
            }
            intent.take_jump_request();
            let multiplier = config.copied().unwrap_or_default().jump_multiplier;
            Some((e, player.jump_impulse(gravity.current_force(), multiplier)))
        })
        .collect();

    for (entity, impulse) in jumps {
        let Some(impulse) = impulse else {
            debug!("jump ignored, player {entity} is not grounded");
            continue;
        };

        B::apply_impulse(world, entity, impulse);
        world.send_event(JumpPerformed {
            player: entity,
            impulse,
        });
    }
}

/// Throw or release the rope for every pending toggle request.
pub fn handle_rope_toggle<B: TetherPhysicsBackend>(world: &mut World) {
    let requests: Vec<(Entity, bool, Vec2, RopeConfig)> = world
        .query::<(
            Entity,
            &Rope,
            &GravityController,
            Option<&RopeConfig>,
            &mut TetherIntent,
        )>()
        .iter_mut(world)
        .filter_map(|(e, rope, gravity, config, mut intent)| {
            if !intent.has_rope_toggle_request() {
                return None;
            }
            intent.take_rope_toggle_request();
            Some((
                e,
                rope.is_attached(),
                gravity.current_force(),
                config.copied().unwrap_or_default(),
            ))
        })
        .collect();

    for (entity, attached, gravity_force, config) in requests {
        if attached {
            release_rope::<B>(world, entity);
            continue;
        }

        if let Err(err) = throw_rope::<B>(world, entity, gravity_force, &config) {
            debug!("rope throw from {entity} failed: {err}");
        }
    }
}

/// Cast for an anchor and build a rope chain to `player`.
///
/// On any failure nothing is allocated and the rope stays idle. Returns the
/// number of segments built.
pub fn throw_rope<B: TetherPhysicsBackend>(
    world: &mut World,
    player: Entity,
    gravity_force: Vec2,
    config: &RopeConfig,
) -> Result<usize, RopeError> {
    let direction = cast_direction(gravity_force)?;
    let origin = B::get_position(world, player);
    let hit = B::raycast(world, origin, direction, config.max_range, player);
    let anchor = resolve_anchor(hit, config.max_range)?.point;
    let plan = ChainPlan::build(anchor, origin, gravity_force, config)?;

    let chain = B::spawn_chain(world, player, &plan, config);
    let segments = chain.segments.len();
    debug!(
        "rope thrown from {player}: anchor {anchor}, {segments} segments, {} joints",
        chain.joints.len()
    );

    if let Some(mut rope) = world.get_mut::<Rope>(player) {
        rope.attach(chain);
    } else {
        let mut rope = Rope::default();
        rope.attach(chain);
        world.entity_mut(player).insert(rope);
    }

    world.send_event(RopeThrown {
        player,
        anchor,
        segments,
    });
    Ok(segments)
}

/// Tear down the player's rope chain, if any.
///
/// Returns `false` when the rope was already idle.
pub fn release_rope<B: TetherPhysicsBackend>(world: &mut World, player: Entity) -> bool {
    let Some(chain) = world.get_mut::<Rope>(player).and_then(|mut rope| rope.detach()) else {
        return false;
    };

    debug!("rope released from {player}: {} segments", chain.segments.len());
    B::despawn_chain(world, chain);
    world.send_event(RopeReleased { player });
    true
}

/// Tear down the chain of a [`Rope`] that is being removed or replaced.
///
/// Covers players despawned, or stripped of their rope, while it is attached.
pub fn despawn_orphaned_rope<B: TetherPhysicsBackend>(
    trigger: Trigger<OnReplace, Rope>,
    mut ropes: Query<&mut Rope>,
    mut commands: Commands,
) {
    let player = trigger.target();
    let Some(chain) = ropes.get_mut(player).ok().and_then(|mut rope| rope.detach()) else {
        return;
    };

    debug!("rope of {player} removed while attached, tearing down {} segments", chain.segments.len());
    commands.queue(move |world: &mut World| B::despawn_chain(world, chain));
}

/// Keep `Time<Fixed>` at the configured physics step rate.
pub fn sync_fixed_timestep(world_config: Res<TetherWorldConfig>, fixed: Option<ResMut<Time<Fixed>>>) {
    if !world_config.is_changed() {
        return;
    }
    let Some(mut fixed) = fixed else {
        warn!("no Time<Fixed> resource, the controller will not tick");
        return;
    };

    let hz = world_config.step_hz;
    if hz.is_finite() && hz > 0.0 {
        fixed.set_timestep_hz(hz);
    } else {
        error!("invalid physics step rate {hz} Hz, keeping {:?}", fixed.timestep());
    }
}

/// Refresh the aim preview while the throw input is held and the rope is idle.
///
/// The preview cast is visual only and never builds anything.
pub fn update_aim_preview<B: TetherPhysicsBackend>(world: &mut World) {
    let entities: Vec<(Entity, bool, Vec2, f32)> = world
        .query_filtered::<(
            Entity,
            &Rope,
            &GravityController,
            &TetherIntent,
            Option<&RopeConfig>,
        ), With<RopeAimPreview>>()
        .iter(world)
        .map(|(e, rope, gravity, intent, config)| {
            (
                e,
                intent.aiming && !rope.is_attached(),
                gravity.current_force(),
                config.copied().unwrap_or_default().max_range,
            )
        })
        .collect();

    for (entity, aiming, gravity_force, range) in entities {
        let preview = match cast_direction(gravity_force) {
            Ok(direction) if aiming => {
                let origin = B::get_position(world, entity);
                match B::raycast(world, origin, direction, range, entity) {
                    Some(hit) => RopeAimPreview {
                        target: Some(hit.point),
                        hit: true,
                    },
                    None => RopeAimPreview {
                        target: Some(origin + direction * range),
                        hit: false,
                    },
                }
            }
            _ => RopeAimPreview::default(),
        };

        if let Some(mut current) = world.get_mut::<RopeAimPreview>(entity) {
            if *current != preview {
                *current = preview;
            }
        }
    }
}

/// Write the current gravity force into each player body.
///
/// Only the change since the last tick is applied, so forces added to the
/// body by other code are left untouched.
pub fn apply_gravity_force<B: TetherPhysicsBackend>(world: &mut World) {
    let entities: Vec<(Entity, Vec2)> = world
        .query::<(Entity, &mut GravityController)>()
        .iter_mut(world)
        .filter_map(|(e, mut gravity)| {
            let delta = gravity.current_force() - gravity.applied_force;
            gravity.applied_force = gravity.current_force();
            (delta != Vec2::ZERO).then_some((e, delta))
        })
        .collect();

    for (entity, delta) in entities {
        B::apply_force(world, entity, delta);
    }
}

/// Sync state marker components from the player state.
pub fn sync_state_markers(
    mut commands: Commands,
    q_players: Query<(
        Entity,
        &Player,
        Option<&Rope>,
        Has<Grounded>,
        Has<Airborne>,
        Has<RopeAttached>,
    )>,
) {
    for (entity, player, rope, has_grounded, has_airborne, has_rope) in &q_players {
        let grounded = player.is_grounded();
        if grounded && !has_grounded {
            commands.entity(entity).insert(Grounded).remove::<Airborne>();
        } else if !grounded && (has_grounded || !has_airborne) {
            commands.entity(entity).insert(Airborne).remove::<Grounded>();
        }

        let attached = rope.is_some_and(Rope::is_attached);
        if attached && !has_rope {
            commands.entity(entity).insert(RopeAttached);
        } else if !attached && has_rope {
            commands.entity(entity).remove::<RopeAttached>();
        }
    }
}
