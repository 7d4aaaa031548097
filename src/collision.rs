//! Ray cast result data.
//!
//! Backends translate their engine-specific ray hits into [`CollisionData`]
//! so the rope logic never touches engine types.

use bevy::prelude::*;

/// Information about a ray cast hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionData {
    /// Distance from the ray origin to the hit point.
    pub distance: f32,
    /// Outward normal of the hit surface.
    pub normal: Vec2,
    /// World position of the hit point.
    pub point: Vec2,
    /// Entity that was hit (if any).
    pub entity: Option<Entity>,
}

impl CollisionData {
    /// Create a hit result.
    pub fn new(distance: f32, normal: Vec2, point: Vec2, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            entity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_keeps_fields() {
        let hit = CollisionData::new(5.0, Vec2::Y, Vec2::new(10.0, 0.0), None);

        assert_eq!(hit.distance, 5.0);
        assert_eq!(hit.normal, Vec2::Y);
        assert_eq!(hit.point, Vec2::new(10.0, 0.0));
    }
}
