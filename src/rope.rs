//! Grappling rope built from a chain of constrained bodies.
//!
//! A throw casts a ray opposite to the current gravity. On a hit, a
//! [`ChainPlan`] lays segment bodies from the anchor down to the player, each
//! pair joined by a spring joint and a max-length rope joint. The backend
//! turns the plan into real bodies and joints and records them in a
//! [`RopeChain`] owned by the player's [`Rope`] component.
//!
//! ## Chain layout
//!
//! ```text
//!   pin (fixed, no collider, at the anchor)
//!    │  link 0
//!   segment 0 (fixed)
//!    │  link 1
//!   segment 1 ... segment n-1 (dynamic)
//!    │  link n
//!   player
//! ```
//!
//! Every link is two joints, so a chain of `n` segments has `2n + 2` joints.

use std::f32::consts::TAU;

use bevy::prelude::*;
use thiserror::Error;

use crate::backend::TetherPhysicsBackend;
use crate::collision::CollisionData;
use crate::config::RopeConfig;

/// Hits closer than this to the player are not usable anchors.
pub const MIN_ANCHOR_DISTANCE: f32 = 1e-3;

/// Why a throw did not produce a rope.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RopeError {
    #[error("gravity force is zero, no direction to throw the rope")]
    NoGravity,
    #[error("rope cast found nothing within {range} units")]
    CastMissed { range: f32 },
    #[error("rope anchor coincides with the player")]
    DegenerateAnchor,
}

/// Rope lifecycle.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RopePhase {
    #[default]
    Idle,
    Active,
}

/// Physics objects of a live rope.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct RopeChain {
    /// Point the chain hangs from.
    pub anchor: Vec2,
    /// Fixed collider-less body at the anchor.
    pub pin: Entity,
    /// Segment bodies, ordered from the anchor to the player.
    pub segments: Vec<Entity>,
    /// Joint entities, two per link.
    pub joints: Vec<Entity>,
}

impl RopeChain {
    /// Every entity owned by the chain, in teardown order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.joints
            .iter()
            .chain(self.segments.iter())
            .chain(std::iter::once(&self.pin))
            .copied()
    }
}

/// The player's rope. Holds at most one chain.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct Rope {
    chain: Option<RopeChain>,
}

impl Rope {
    pub fn phase(&self) -> RopePhase {
        if self.chain.is_some() {
            RopePhase::Active
        } else {
            RopePhase::Idle
        }
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.chain.is_some()
    }

    pub fn chain(&self) -> Option<&RopeChain> {
        self.chain.as_ref()
    }

    pub(crate) fn attach(&mut self, chain: RopeChain) {
        debug_assert!(self.chain.is_none(), "rope already has a chain");
        self.chain = Some(chain);
    }

    pub(crate) fn detach(&mut self) -> Option<RopeChain> {
        self.chain.take()
    }
}

/// Marker on a rope segment body.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct RopeSegment {
    /// Position in the chain, 0 at the anchor.
    pub index: usize,
}

/// Marker on the fixed body a chain hangs from.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct RopePin;

/// The two joints that make up a link.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RopeJointKind {
    /// Soft spring holding the rest length.
    Spring,
    /// Hard limit on the separation.
    MaxLength,
}

/// Marker on a rope joint entity.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct RopeLink {
    pub kind: RopeJointKind,
}

/// Visual-only aim feedback while the throw input is held.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct RopeAimPreview {
    /// Where the rope would attach, or the end of the range on a miss.
    /// `None` while not aiming.
    pub target: Option<Vec2>,
    /// Whether the preview cast found an anchor.
    pub hit: bool,
}

/// Direction of the rope cast: opposite to gravity.
pub fn cast_direction(gravity_force: Vec2) -> Result<Vec2, RopeError> {
    (-gravity_force).try_normalize().ok_or(RopeError::NoGravity)
}

/// Accept or reject a cast result as an anchor.
pub fn resolve_anchor(hit: Option<CollisionData>, range: f32) -> Result<CollisionData, RopeError> {
    match hit {
        None => Err(RopeError::CastMissed { range }),
        Some(hit) if hit.distance <= MIN_ANCHOR_DISTANCE => Err(RopeError::DegenerateAnchor),
        Some(hit) => Ok(hit),
    }
}

/// Acceleration-based spring parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringCoefficients {
    pub stiffness: f32,
    pub damping: f32,
}

/// Convert a frequency and damping ratio to mass-independent spring gains.
///
/// `ω = 2πf`, stiffness `ω²`, damping `2ζω`.
pub fn spring_coefficients(frequency_hz: f32, damping_ratio: f32) -> SpringCoefficients {
    let omega = TAU * frequency_hz;
    SpringCoefficients {
        stiffness: omega * omega,
        damping: 2.0 * damping_ratio * omega,
    }
}

/// One end of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEnd {
    Pin,
    Segment(usize),
    Player,
}

/// A planned segment body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentPlan {
    pub index: usize,
    pub position: Vec2,
    /// Only the first segment is fixed.
    pub fixed: bool,
}

/// A planned pair of joints between two bodies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkPlan {
    pub from: LinkEnd,
    pub to: LinkEnd,
    /// Spring rest length: the distance between the bodies at creation.
    pub rest_length: f32,
    /// Rope joint limit.
    pub max_length: f32,
}

/// Layout of a rope chain, computed before anything is spawned.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainPlan {
    pub anchor: Vec2,
    /// Unit vector along gravity; segments are laid out in this direction.
    pub direction: Vec2,
    pub segments: Vec<SegmentPlan>,
    pub links: Vec<LinkPlan>,
}

impl ChainPlan {
    /// Lay out a chain from `anchor` toward the player.
    pub fn build(
        anchor: Vec2,
        player_position: Vec2,
        gravity_force: Vec2,
        config: &RopeConfig,
    ) -> Result<Self, RopeError> {
        let direction = gravity_force.try_normalize().ok_or(RopeError::NoGravity)?;
        let distance = anchor.distance(player_position);
        if distance <= MIN_ANCHOR_DISTANCE {
            return Err(RopeError::DegenerateAnchor);
        }

        let spacing = config.segment_spacing.max(MIN_ANCHOR_DISTANCE);
        let count = (distance / spacing).floor() as usize;

        let segments: Vec<SegmentPlan> = (0..count)
            .map(|index| SegmentPlan {
                index,
                position: anchor + direction * (index as f32 * spacing),
                fixed: index == 0,
            })
            .collect();

        let position_of = |end: LinkEnd| match end {
            LinkEnd::Pin => anchor,
            LinkEnd::Segment(k) => segments[k].position,
            LinkEnd::Player => player_position,
        };

        let mut ends = Vec::with_capacity(count + 2);
        ends.push(LinkEnd::Pin);
        ends.extend((0..count).map(LinkEnd::Segment));
        ends.push(LinkEnd::Player);

        let links = ends
            .windows(2)
            .map(|pair| {
                let rest_length = position_of(pair[0]).distance(position_of(pair[1]));
                LinkPlan {
                    from: pair[0],
                    to: pair[1],
                    rest_length,
                    max_length: rest_length * config.max_length_factor,
                }
            })
            .collect();

        Ok(Self {
            anchor,
            direction,
            segments,
            links,
        })
    }

    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Number of joints the chain needs, two per link.
    #[inline]
    pub fn joint_count(&self) -> usize {
        self.links.len() * 2
    }
}

/// Position and angle of every segment of the player's rope, for drawing.
///
/// The angle points from each segment toward the next body in the chain, the
/// player for the last one. Empty when the rope is idle.
pub fn rope_segment_poses<B: TetherPhysicsBackend>(world: &World, player: Entity) -> Vec<(Vec2, f32)> {
    let Some(chain) = world.get::<Rope>(player).and_then(Rope::chain) else {
        return Vec::new();
    };

    let positions: Vec<Vec2> = chain
        .segments
        .iter()
        .map(|&segment| B::get_position(world, segment))
        .collect();
    let player_position = B::get_position(world, player);

    positions
        .iter()
        .enumerate()
        .map(|(k, &position)| {
            let next = positions.get(k + 1).copied().unwrap_or(player_position);
            let angle = (next - position).try_normalize().map_or(0.0, Vec2::to_angle);
            (position, angle)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOWN: Vec2 = Vec2::new(0.0, -10.0);

    #[test]
    fn cast_goes_against_gravity() {
        assert_eq!(cast_direction(DOWN), Ok(Vec2::Y));
        assert_eq!(cast_direction(Vec2::new(30.0, 0.0)), Ok(Vec2::NEG_X));
        assert_eq!(cast_direction(Vec2::ZERO), Err(RopeError::NoGravity));
    }

    #[test]
    fn resolve_anchor_rejects_misses_and_zero_distance() {
        assert_eq!(resolve_anchor(None, 300.0), Err(RopeError::CastMissed { range: 300.0 }));

        let touching = CollisionData::new(0.0, Vec2::NEG_Y, Vec2::ZERO, None);
        assert_eq!(resolve_anchor(Some(touching), 300.0), Err(RopeError::DegenerateAnchor));

        let hit = CollisionData::new(100.0, Vec2::NEG_Y, Vec2::new(0.0, 100.0), None);
        assert_eq!(resolve_anchor(Some(hit), 300.0), Ok(hit));
    }

    #[test]
    fn spring_coefficients_from_frequency() {
        let coefficients = spring_coefficients(1.0, 1.0);
        assert!((coefficients.stiffness - TAU * TAU).abs() < 1e-3);
        assert!((coefficients.damping - 2.0 * TAU).abs() < 1e-4);

        let undamped = spring_coefficients(15.0, 0.0);
        assert_eq!(undamped.damping, 0.0);
    }

    #[test]
    fn hundred_unit_throw_builds_sixteen_segments() {
        let config = RopeConfig::default();
        let plan = ChainPlan::build(Vec2::new(100.0, 200.0), Vec2::new(100.0, 300.0), DOWN, &config)
            .unwrap();

        assert_eq!(plan.segment_count(), 16);
        assert_eq!(plan.joint_count(), 34);

        let positions: Vec<Vec2> = plan.segments.iter().map(|s| s.position).collect();
        assert_eq!(positions[0], Vec2::new(100.0, 200.0));
        assert_eq!(positions[1], Vec2::new(100.0, 194.0));
        assert_eq!(positions[15], Vec2::new(100.0, 110.0));

        assert!(plan.segments[0].fixed);
        assert!(plan.segments[1..].iter().all(|s| !s.fixed));
    }

    #[test]
    fn links_run_from_pin_to_player() {
        let config = RopeConfig::default();
        let plan = ChainPlan::build(Vec2::new(0.0, 100.0), Vec2::ZERO, DOWN, &config).unwrap();
        let n = plan.segment_count();

        assert_eq!(plan.links.first().map(|l| (l.from, l.to)), Some((LinkEnd::Pin, LinkEnd::Segment(0))));
        assert_eq!(plan.links.last().map(|l| (l.from, l.to)), Some((LinkEnd::Segment(n - 1), LinkEnd::Player)));

        for link in &plan.links[1..n] {
            assert!((link.rest_length - config.segment_spacing).abs() < 1e-4);
            assert!((link.max_length - config.segment_spacing * config.max_length_factor).abs() < 1e-4);
        }
        // 100 / 6 leaves a 10 unit gap between the last segment and the player.
        assert!((plan.links[n].rest_length - 10.0).abs() < 1e-3);
    }

    #[test]
    fn short_throw_links_pin_to_player() {
        let config = RopeConfig::default();
        let plan = ChainPlan::build(Vec2::new(0.0, 4.0), Vec2::ZERO, DOWN, &config).unwrap();

        assert_eq!(plan.segment_count(), 0);
        assert_eq!(plan.joint_count(), 2);
        assert_eq!((plan.links[0].from, plan.links[0].to), (LinkEnd::Pin, LinkEnd::Player));
        assert!((plan.links[0].rest_length - 4.0).abs() < 1e-5);
    }

    #[test]
    fn plan_rejects_degenerate_input() {
        let config = RopeConfig::default();
        assert_eq!(
            ChainPlan::build(Vec2::ZERO, Vec2::ZERO, DOWN, &config),
            Err(RopeError::DegenerateAnchor)
        );
        assert_eq!(
            ChainPlan::build(Vec2::Y, Vec2::ZERO, Vec2::ZERO, &config),
            Err(RopeError::NoGravity)
        );
    }

    #[test]
    fn rope_phase_follows_chain() {
        let mut rope = Rope::default();
        assert_eq!(rope.phase(), RopePhase::Idle);
        assert!(rope.detach().is_none());

        rope.attach(RopeChain {
            anchor: Vec2::ZERO,
            pin: Entity::from_raw(1),
            segments: vec![Entity::from_raw(2)],
            joints: vec![Entity::from_raw(3), Entity::from_raw(4)],
        });
        assert_eq!(rope.phase(), RopePhase::Active);

        let chain = rope.detach().unwrap();
        let order: Vec<Entity> = chain.entities().collect();
        assert_eq!(
            order,
            vec![Entity::from_raw(3), Entity::from_raw(4), Entity::from_raw(2), Entity::from_raw(1)]
        );
        assert_eq!(rope.phase(), RopePhase::Idle);
    }
}
