//! Fixture roles and ground contact tracking.
//!
//! Every collider the controller cares about is tagged with a [`FixtureRole`].
//! The backend reports begin/end contacts between tagged colliders, and
//! [`classify_contact`] decides what a contact means for the player.

use bevy::prelude::*;

/// What a collider represents. Attached to colliders at creation time.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[reflect(Component)]
pub enum FixtureRole {
    /// The player's ground sensor.
    PlayerSensor,
    /// The player's solid ball.
    PlayerBody,
    /// Static level geometry.
    MapPart,
    /// Level exit trigger.
    Exit,
    /// Sign trigger, carries a [`Sign`] component with its text.
    Sign,
    /// A body of the rope chain.
    RopeSegment,
}

impl FixtureRole {
    /// Whether colliders of this role are sensors the ball passes through.
    #[inline]
    pub fn is_trigger(self) -> bool {
        matches!(self, Self::Exit | Self::Sign)
    }
}

/// Text shown when the player touches a sign.
#[derive(Component, Reflect, Debug, Clone, Default, PartialEq, Eq)]
#[reflect(Component)]
pub struct Sign {
    pub text: String,
}

impl Sign {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Begin or end of a contact between two colliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    Begin,
    End,
}

/// Meaning of a contact involving the player sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorContactKind {
    Ground,
    Exit,
    Sign,
}

/// A classified player sensor contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorContact {
    pub kind: SensorContactKind,
    /// Whether the sensor was the first collider of the pair.
    pub sensor_is_first: bool,
}

impl SensorContact {
    /// Reorder a pair as `(sensor, other)`.
    pub fn split<T>(&self, a: T, b: T) -> (T, T) {
        if self.sensor_is_first { (a, b) } else { (b, a) }
    }
}

/// Classify a contact between two tagged colliders, in either order.
///
/// Only the player sensor produces contacts of interest. The solid ball never
/// counts toward ground detection.
pub fn classify_contact(a: FixtureRole, b: FixtureRole) -> Option<SensorContact> {
    let (other, sensor_is_first) = match (a, b) {
        (FixtureRole::PlayerSensor, FixtureRole::PlayerSensor) => return None,
        (FixtureRole::PlayerSensor, other) => (other, true),
        (other, FixtureRole::PlayerSensor) => (other, false),
        _ => return None,
    };

    let kind = match other {
        FixtureRole::MapPart => SensorContactKind::Ground,
        FixtureRole::Exit => SensorContactKind::Exit,
        FixtureRole::Sign => SensorContactKind::Sign,
        FixtureRole::PlayerSensor | FixtureRole::PlayerBody | FixtureRole::RopeSegment => {
            return None;
        }
    };

    Some(SensorContact {
        kind,
        sensor_is_first,
    })
}

/// Number of map colliders currently overlapping the player's ground sensor.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroundContacts {
    count: u32,
}

impl GroundContacts {
    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[inline]
    pub fn can_jump(&self) -> bool {
        self.count > 0
    }

    pub fn begin(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    /// Record the end of a ground contact.
    ///
    /// Returns `false` if there was no contact to end; the count stays at zero.
    pub fn end(&mut self) -> bool {
        match self.count.checked_sub(1) {
            Some(count) => {
                self.count = count;
                true
            }
            None => false,
        }
    }

    /// Apply a begin or end, returning `false` on an unmatched end.
    pub fn apply(&mut self, phase: ContactPhase) -> bool {
        match phase {
            ContactPhase::Begin => {
                self.begin();
                true
            }
            ContactPhase::End => self.end(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(FixtureRole::PlayerSensor, FixtureRole::MapPart, Some(SensorContactKind::Ground))]
    #[case(FixtureRole::MapPart, FixtureRole::PlayerSensor, Some(SensorContactKind::Ground))]
    #[case(FixtureRole::PlayerSensor, FixtureRole::Exit, Some(SensorContactKind::Exit))]
    #[case(FixtureRole::Sign, FixtureRole::PlayerSensor, Some(SensorContactKind::Sign))]
    #[case(FixtureRole::PlayerBody, FixtureRole::MapPart, None)]
    #[case(FixtureRole::PlayerSensor, FixtureRole::PlayerBody, None)]
    #[case(FixtureRole::PlayerSensor, FixtureRole::RopeSegment, None)]
    #[case(FixtureRole::RopeSegment, FixtureRole::MapPart, None)]
    #[case(FixtureRole::PlayerSensor, FixtureRole::PlayerSensor, None)]
    fn classifies_pairs(
        #[case] a: FixtureRole,
        #[case] b: FixtureRole,
        #[case] expected: Option<SensorContactKind>,
    ) {
        assert_eq!(classify_contact(a, b).map(|c| c.kind), expected);
    }

    #[test]
    fn split_puts_sensor_first() {
        let contact = classify_contact(FixtureRole::Sign, FixtureRole::PlayerSensor).unwrap();
        assert_eq!(contact.split("sign", "sensor"), ("sensor", "sign"));

        let contact = classify_contact(FixtureRole::PlayerSensor, FixtureRole::Sign).unwrap();
        assert_eq!(contact.split("sensor", "sign"), ("sensor", "sign"));
    }

    #[test]
    fn overlapping_contacts_keep_player_grounded() {
        let mut contacts = GroundContacts::default();
        contacts.begin();
        contacts.begin();
        assert!(contacts.end());
        assert!(contacts.can_jump());
        assert!(contacts.end());
        assert!(!contacts.can_jump());
    }

    #[test]
    fn unmatched_end_is_reported_and_clamped() {
        let mut contacts = GroundContacts::default();
        assert!(!contacts.end());
        assert_eq!(contacts.count(), 0);
        assert!(contacts.apply(ContactPhase::Begin));
        assert_eq!(contacts.count(), 1);
    }

    #[rstest]
    #[case(FixtureRole::Exit, true)]
    #[case(FixtureRole::Sign, true)]
    #[case(FixtureRole::MapPart, false)]
    #[case(FixtureRole::PlayerSensor, false)]
    fn only_exits_and_signs_are_triggers(#[case] role: FixtureRole, #[case] trigger: bool) {
        assert_eq!(role.is_trigger(), trigger);
    }
}
