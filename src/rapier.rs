//! Rapier2D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier2D.
//! Enable with the `rapier2d` feature.

use std::num::NonZeroUsize;

use bevy::ecs::system::SystemState;
use bevy::platform::collections::HashMap;
use bevy::prelude::*;
use bevy_rapier2d::geometry::Group;
use bevy_rapier2d::plugin::context::RapierContextSimulation;
use bevy_rapier2d::prelude::*;
use bevy_rapier2d::rapier::dynamics::MotorModel;
use bevy_rapier2d::rapier::geometry::CollisionEventFlags;

use crate::backend::{despawn_chain_entities, TetherPhysicsBackend};
use crate::collision::CollisionData;
use crate::config::{GravityConfig, PlayerConfig, RopeConfig, TetherWorldConfig};
use crate::contact::{classify_contact, ContactPhase, FixtureRole, SensorContactKind, Sign};
use crate::events::{ExitReached, SignLeft, SignTouched};
use crate::gravity::GravityController;
use crate::intent::TetherIntent;
use crate::player::Player;
use crate::rope::{
    spring_coefficients, ChainPlan, LinkEnd, Rope, RopeAimPreview, RopeChain, RopeJointKind, RopeLink,
    RopePin, RopeSegment,
};

/// Collision group of level geometry.
pub const WORLD_GROUP: Group = Group::GROUP_1;
/// Collision group of the player ball and its sensor.
pub const PLAYER_GROUP: Group = Group::GROUP_2;
/// Collision group of rope segments.
pub const ROPE_GROUP: Group = Group::GROUP_3;

/// Rapier2D physics backend for the controller.
///
/// Body queries and forces go through the usual bevy_rapier components.
/// Ray casts build a [`ReadRapierContext`] on demand. Rope chains are plain
/// entities: bodies for the pin and segments, and one child entity per joint
/// so a body can carry several joints.
pub struct Rapier2dBackend;

impl TetherPhysicsBackend for Rapier2dBackend {
    fn plugin() -> impl Plugin {
        Rapier2dBackendPlugin
    }

    fn raycast(
        world: &mut World,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        exclude_entity: Entity,
    ) -> Option<CollisionData> {
        let mut state = SystemState::<ReadRapierContext>::new(world);
        let rapier_context = state.get(world);
        let Ok(context) = rapier_context.single() else {
            return None;
        };
        rapier_raycast(&context, origin, direction, max_distance, exclude_entity)
    }

    fn get_position(world: &World, entity: Entity) -> Vec2 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation.xy())
            .or_else(|| {
                world
                    .get::<GlobalTransform>(entity)
                    .map(|t| t.translation().xy())
            })
            .unwrap_or(Vec2::ZERO)
    }

    fn get_mass(world: &World, entity: Entity) -> Option<f32> {
        world
            .get::<ReadMassProperties>(entity)
            .map(|props| props.mass)
            .filter(|mass| *mass > 0.0 && mass.is_finite())
    }

    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec2) {
        if let Some(mut ext_impulse) = world.get_mut::<ExternalImpulse>(entity) {
            ext_impulse.impulse += impulse;
        } else {
            warn!("cannot apply impulse to {entity}: no ExternalImpulse component");
        }
    }

    fn apply_force(world: &mut World, entity: Entity, force: Vec2) {
        if let Some(mut ext_force) = world.get_mut::<ExternalForce>(entity) {
            ext_force.force += force;
        } else {
            warn!("cannot apply force to {entity}: no ExternalForce component");
        }
    }

    fn spawn_chain(world: &mut World, player: Entity, plan: &ChainPlan, config: &RopeConfig) -> RopeChain {
        let pin = world
            .spawn((
                RopePin,
                RigidBody::Fixed,
                Transform::from_translation(plan.anchor.extend(0.0)),
            ))
            .id();

        let segments: Vec<Entity> = plan
            .segments
            .iter()
            .map(|segment| {
                let body = if segment.fixed {
                    RigidBody::Fixed
                } else {
                    RigidBody::Dynamic
                };
                world
                    .spawn((
                        RopeSegment {
                            index: segment.index,
                        },
                        Transform::from_translation(segment.position.extend(0.0)),
                        Rapier2dRopeSegmentBundle::new(body, config),
                    ))
                    .id()
            })
            .collect();

        let body_of = |end: LinkEnd| match end {
            LinkEnd::Pin => pin,
            LinkEnd::Segment(k) => segments[k],
            LinkEnd::Player => player,
        };

        let spring = spring_coefficients(config.spring_frequency_hz, config.spring_damping_ratio);
        let mut joints = Vec::with_capacity(plan.joint_count());
        for link in &plan.links {
            let (body_a, body_b) = (body_of(link.from), body_of(link.to));

            let spring_joint = SpringJointBuilder::new(link.rest_length, spring.stiffness, spring.damping)
                .spring_model(MotorModel::AccelerationBased)
                .build();
            let rope_joint = RopeJointBuilder::new(link.max_length).build();

            // Joints hang off the anchor-side body, so the player carries none
            // and one body can host several.
            joints.push(
                world
                    .spawn((
                        RopeLink {
                            kind: RopeJointKind::Spring,
                        },
                        ImpulseJoint::new(body_b, spring_joint),
                        ChildOf(body_a),
                    ))
                    .id(),
            );
            joints.push(
                world
                    .spawn((
                        RopeLink {
                            kind: RopeJointKind::MaxLength,
                        },
                        ImpulseJoint::new(body_b, rope_joint),
                        ChildOf(body_a),
                    ))
                    .id(),
            );
        }

        RopeChain {
            anchor: plan.anchor,
            pin,
            segments,
            joints,
        }
    }

    fn despawn_chain(world: &mut World, chain: RopeChain) {
        let expected = chain.joints.len() + chain.segments.len() + 1;
        let despawned = despawn_chain_entities(world, &chain);
        if despawned != expected {
            error!("rope teardown removed {despawned} of {expected} entities");
        }
    }
}

/// Plugin that sets up Rapier2D-specific systems for the controller.
///
/// Rapier has to step once per controller tick, so add it with
/// `RapierPhysicsPlugin::in_fixed_schedule()`. The step then runs in
/// `FixedPostUpdate`, right after the controller's `FixedUpdate` systems.
pub struct Rapier2dBackendPlugin;

impl Plugin for Rapier2dBackendPlugin {
    fn build(&self, app: &mut App) {
        use crate::TetherSet;

        app.add_systems(PreUpdate, configure_rapier_world);
        app.add_systems(FixedUpdate, rapier_contact_events.in_set(TetherSet::Sensors));
    }
}

/// Push [`TetherWorldConfig`] into the Rapier context.
///
/// Runs whenever the config changes or a new context appears. Every Rapier
/// step advances the world by exactly one controller tick.
pub fn configure_rapier_world(
    mut commands: Commands,
    world_config: Res<TetherWorldConfig>,
    mut contexts: Query<(&mut RapierConfiguration, &mut RapierContextSimulation)>,
) {
    let mut configured = false;
    for (mut configuration, mut simulation) in &mut contexts {
        if !world_config.is_changed() && !configuration.is_added() {
            continue;
        }
        configuration.gravity = world_config.base_gravity;
        let parameters = &mut simulation.integration_parameters;
        parameters.num_solver_iterations =
            NonZeroUsize::new(world_config.velocity_iterations).unwrap_or(NonZeroUsize::MIN);
        parameters.num_internal_stabilization_iterations = world_config.position_iterations;
        configured = true;
    }

    if configured || world_config.is_changed() {
        commands.insert_resource(TimestepMode::Fixed {
            dt: world_config.step_seconds(),
            substeps: 1,
        });
    }
}

/// Perform a raycast using RapierContext.
///
/// Only level geometry is considered: sensors, the excluded body and
/// anything outside [`WORLD_GROUP`] are ignored.
fn rapier_raycast(
    context: &RapierContext,
    origin: Vec2,
    direction: Vec2,
    max_distance: f32,
    exclude_entity: Entity,
) -> Option<CollisionData> {
    let filter = QueryFilter::default()
        .exclude_rigid_body(exclude_entity)
        .exclude_sensors()
        .groups(CollisionGroups::new(ROPE_GROUP, WORLD_GROUP));

    context
        .cast_ray_and_get_normal(origin, direction, max_distance, true, filter)
        .map(|(hit_entity, hit)| {
            CollisionData::new(hit.time_of_impact, hit.normal, hit.point, Some(hit_entity))
        })
}

/// Sensor contacts currently open, keyed by the unordered collider pair.
///
/// A `Stopped` event for a despawned collider can no longer be classified
/// through its [`FixtureRole`], so the end of a contact is resolved from the
/// record its begin left here.
#[derive(Debug, Default)]
pub struct OpenSensorContacts {
    contacts: HashMap<(Entity, Entity), (SensorContactKind, Entity, Entity)>,
}

impl OpenSensorContacts {
    fn key(a: Entity, b: Entity) -> (Entity, Entity) {
        if a <= b { (a, b) } else { (b, a) }
    }

    /// Record a begun contact as `(kind, sensor, other)`.
    fn open(&mut self, kind: SensorContactKind, sensor: Entity, other: Entity) {
        self.contacts.insert(Self::key(sensor, other), (kind, sensor, other));
    }

    /// Close the contact between `a` and `b`, if one was open.
    fn close(&mut self, a: Entity, b: Entity) -> Option<(SensorContactKind, Entity, Entity)> {
        self.contacts.remove(&Self::key(a, b))
    }
}

/// Translate Rapier collision events into ground contact updates and events.
///
/// The sensor collider is a child of the player body, so the player is found
/// through [`ChildOf`].
pub fn rapier_contact_events(
    mut collisions: EventReader<CollisionEvent>,
    mut open_contacts: Local<OpenSensorContacts>,
    roles: Query<&FixtureRole>,
    parents: Query<&ChildOf>,
    signs: Query<&Sign>,
    mut players: Query<&mut Player>,
    mut exits: EventWriter<ExitReached>,
    mut signs_touched: EventWriter<SignTouched>,
    mut signs_left: EventWriter<SignLeft>,
) {
    for event in collisions.read() {
        let (kind, sensor, other, phase) = match *event {
            CollisionEvent::Started(a, b, _) => {
                let (Ok(role_a), Ok(role_b)) = (roles.get(a), roles.get(b)) else {
                    continue;
                };
                let Some(contact) = classify_contact(*role_a, *role_b) else {
                    continue;
                };
                let (sensor, other) = contact.split(a, b);
                open_contacts.open(contact.kind, sensor, other);
                (contact.kind, sensor, other, ContactPhase::Begin)
            }
            CollisionEvent::Stopped(a, b, flags) => {
                let Some((kind, sensor, other)) = open_contacts.close(a, b) else {
                    continue;
                };
                if flags.contains(CollisionEventFlags::REMOVED) {
                    debug!("sensor contact {sensor} / {other} ended by collider removal");
                }
                (kind, sensor, other, ContactPhase::End)
            }
        };

        let player = parents.get(sensor).map(ChildOf::parent).unwrap_or(sensor);

        match kind {
            SensorContactKind::Ground => {
                let Ok(mut state) = players.get_mut(player) else {
                    warn!("ground sensor {sensor} does not belong to a player");
                    continue;
                };
                if !state.ground_contacts.apply(phase) {
                    error!("ground contact ended for {player} with no contact recorded");
                    debug_assert!(false, "ground contact count underflow");
                }
            }
            SensorContactKind::Exit => {
                if phase == ContactPhase::Begin {
                    exits.write(ExitReached { player, exit: other });
                }
            }
            SensorContactKind::Sign => match phase {
                ContactPhase::Begin => {
                    let text = signs.get(other).map(|s| s.text.clone()).unwrap_or_default();
                    signs_touched.write(SignTouched {
                        player,
                        sign: other,
                        text,
                    });
                }
                ContactPhase::End => {
                    signs_left.write(SignLeft { player, sign: other });
                }
            },
        }
    }
}

/// Bundle for creating the player ball with Rapier2D physics.
///
/// Rapier's own gravity is disabled on the ball: the controller applies the
/// rotated gravity as an external force instead.
#[derive(Bundle)]
pub struct Rapier2dPlayerBundle {
    pub rigid_body: RigidBody,
    pub velocity: Velocity,
    /// Gravity force written by the controller each tick.
    pub external_force: ExternalForce,
    /// Jump impulses.
    pub external_impulse: ExternalImpulse,
    pub gravity_scale: GravityScale,
    /// Computed mass properties. Rapier updates this based on the collider.
    pub mass_properties: ReadMassProperties,
    pub collider: Collider,
    pub collider_mass: ColliderMassProperties,
    pub friction: Friction,
    pub restitution: Restitution,
    pub collision_groups: CollisionGroups,
    pub role: FixtureRole,
}

impl Rapier2dPlayerBundle {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            external_force: ExternalForce::default(),
            external_impulse: ExternalImpulse::default(),
            gravity_scale: GravityScale(0.0),
            mass_properties: ReadMassProperties::default(),
            collider: Collider::ball(config.radius),
            collider_mass: ColliderMassProperties::Density(config.density),
            friction: Friction::coefficient(config.friction),
            restitution: Restitution::coefficient(config.restitution),
            collision_groups: CollisionGroups::new(PLAYER_GROUP, WORLD_GROUP),
            role: FixtureRole::PlayerBody,
        }
    }
}

impl Default for Rapier2dPlayerBundle {
    fn default() -> Self {
        Self::new(&PlayerConfig::default())
    }
}

/// Components of the ground sensor, spawned as a child of the player body.
///
/// Zero density keeps it from changing the body mass.
pub fn player_sensor_bundle(config: &PlayerConfig) -> impl Bundle {
    (
        Transform::default(),
        Collider::ball(config.sensor_radius()),
        Sensor,
        ColliderMassProperties::Density(0.0),
        ActiveEvents::COLLISION_EVENTS,
        CollisionGroups::new(PLAYER_GROUP, WORLD_GROUP),
        FixtureRole::PlayerSensor,
    )
}

/// Every component a controlled player needs, except the sensor child.
pub fn tether_player_bundle(position: Vec2, config: &PlayerConfig) -> impl Bundle {
    (
        Transform::from_translation(position.extend(0.0)),
        Player::new(config.radius),
        GravityController::new(),
        GravityConfig::default(),
        *config,
        RopeConfig::default(),
        TetherIntent::default(),
        Rope::default(),
        RopeAimPreview::default(),
        Rapier2dPlayerBundle::new(config),
    )
}

/// Spawn a player ball with its ground sensor.
///
/// # Example
///
/// ```ignore
/// fn setup(mut commands: Commands) {
///     let player = spawn_player(&mut commands, Vec2::new(100.0, 300.0), &PlayerConfig::default());
///     commands.entity(player).insert(GravityConfig::tilt());
/// }
/// ```
pub fn spawn_player(commands: &mut Commands, position: Vec2, config: &PlayerConfig) -> Entity {
    commands
        .spawn(tether_player_bundle(position, config))
        .with_children(|parent| {
            parent.spawn(player_sensor_bundle(config));
        })
        .id()
}

/// Fixed solid collider for level geometry.
pub fn map_fixture_bundle(role: FixtureRole, collider: Collider, position: Vec2) -> impl Bundle {
    debug_assert!(!role.is_trigger(), "{role:?} fixtures are sensors, use map_trigger_bundle");
    (
        Transform::from_translation(position.extend(0.0)),
        RigidBody::Fixed,
        collider,
        CollisionGroups::new(WORLD_GROUP, Group::ALL),
        role,
    )
}

/// Fixed sensor collider for exits and signs.
///
/// The ball passes through it and rope casts ignore it.
pub fn map_trigger_bundle(role: FixtureRole, collider: Collider, position: Vec2) -> impl Bundle {
    (
        Transform::from_translation(position.extend(0.0)),
        RigidBody::Fixed,
        collider,
        Sensor,
        ActiveEvents::COLLISION_EVENTS,
        CollisionGroups::new(WORLD_GROUP, Group::ALL),
        role,
    )
}

/// Spawn a map collider, as a sensor when its role is a trigger.
pub fn spawn_map_fixture(commands: &mut Commands, role: FixtureRole, collider: Collider, position: Vec2) -> Entity {
    if role.is_trigger() {
        commands.spawn(map_trigger_bundle(role, collider, position)).id()
    } else {
        commands.spawn(map_fixture_bundle(role, collider, position)).id()
    }
}

/// Physics components of one rope segment body.
#[derive(Bundle)]
pub struct Rapier2dRopeSegmentBundle {
    pub rigid_body: RigidBody,
    pub velocity: Velocity,
    pub collider: Collider,
    pub collider_mass: ColliderMassProperties,
    pub friction: Friction,
    pub restitution: Restitution,
    pub damping: Damping,
    pub locked_axes: LockedAxes,
    pub ccd: Ccd,
    /// Segments only touch level geometry.
    pub collision_groups: CollisionGroups,
    pub role: FixtureRole,
}

impl Rapier2dRopeSegmentBundle {
    pub fn new(rigid_body: RigidBody, config: &RopeConfig) -> Self {
        Self {
            rigid_body,
            velocity: Velocity::default(),
            collider: Collider::ball(config.segment_radius),
            collider_mass: ColliderMassProperties::Density(config.segment_density),
            friction: Friction::coefficient(config.segment_friction),
            restitution: Restitution::coefficient(config.segment_restitution),
            damping: Damping {
                linear_damping: config.segment_linear_damping,
                angular_damping: 0.0,
            },
            locked_axes: LockedAxes::ROTATION_LOCKED,
            ccd: Ccd::enabled(),
            collision_groups: CollisionGroups::new(ROPE_GROUP, WORLD_GROUP),
            role: FixtureRole::RopeSegment,
        }
    }
}
