//! # Equipment Interface
//!
//! This module defines the vocabulary shared between the motion controller
//! and the equipment drivers it commands.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Position of a drivetrain unit (motor or servo) on the robot.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum Orientation {
    /// All port side units
    Port,

    /// The robot as a whole
    Cntr,

    /// All starboard side units
    Stbd,

    /// Port fore
    Pfor,

    /// Starboard fore
    Sfor,

    /// Port aft
    Paft,

    /// Starboard aft
    Saft,
}

/// The side of the robot a unit is mounted on.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum Side {
    Port,
    Cntr,
    Stbd,
}

/// Sense of an in-place rotation.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
    Stopped,
}

/// Mechanical steering mode of the drivetrain.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum SteeringMode {
    /// All-wheel steering, inner and outer wheels at different angles and
    /// speeds.
    Afrs,

    /// Wheels turned tangentially for rotation on the spot.
    Rotate,

    /// Wheels straight, steering by differential speed.
    Skid,
}

/// A compass direction used as a heading target.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum Cardinal {
    North,
    East,
    South,
    West,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Orientation {
    /// The individual drive units, fore to aft.
    pub const UNITS: [Orientation; 4] = [
        Orientation::Pfor,
        Orientation::Sfor,
        Orientation::Paft,
        Orientation::Saft,
    ];

    /// Get the side of the robot this orientation is on.
    pub fn side(&self) -> Side {
        match self {
            Orientation::Port | Orientation::Pfor | Orientation::Paft => Side::Port,
            Orientation::Stbd | Orientation::Sfor | Orientation::Saft => Side::Stbd,
            Orientation::Cntr => Side::Cntr,
        }
    }

    /// Returns true if this orientation selects the given unit.
    ///
    /// `Port` and `Stbd` select every unit on their side, `Cntr` selects
    /// every unit, and a unit orientation selects only itself.
    pub fn selects(&self, unit: Orientation) -> bool {
        match self {
            Orientation::Cntr => true,
            Orientation::Port | Orientation::Stbd => self.side() == unit.side(),
            o => *o == unit,
        }
    }

    /// Short lowercase label
    pub fn label(&self) -> &'static str {
        match self {
            Orientation::Port => "port",
            Orientation::Cntr => "cntr",
            Orientation::Stbd => "stbd",
            Orientation::Pfor => "pfor",
            Orientation::Sfor => "sfor",
            Orientation::Paft => "paft",
            Orientation::Saft => "saft",
        }
    }
}

impl Rotation {
    /// Sign of the heading change produced by this rotation, clockwise
    /// positive.
    pub fn sign(&self) -> f64 {
        match self {
            Rotation::Clockwise => 1.0,
            Rotation::CounterClockwise => -1.0,
            Rotation::Stopped => 0.0,
        }
    }
}

impl SteeringMode {
    /// Returns true if the servos are turned for rotation in this mode.
    pub fn is_rotated(&self) -> bool {
        *self == SteeringMode::Rotate
    }
}

impl Cardinal {
    /// Reference compass heading of this direction in degrees.
    pub fn degrees(&self) -> f64 {
        match self {
            Cardinal::North => 0.0,
            Cardinal::East => 90.0,
            Cardinal::South => 180.0,
            Cardinal::West => 270.0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_orientation_selection() {
        assert!(Orientation::Port.selects(Orientation::Pfor));
        assert!(Orientation::Port.selects(Orientation::Paft));
        assert!(!Orientation::Port.selects(Orientation::Sfor));
        assert!(Orientation::Cntr.selects(Orientation::Saft));
        assert!(Orientation::Saft.selects(Orientation::Saft));
        assert!(!Orientation::Saft.selects(Orientation::Sfor));
        assert_eq!(Orientation::Sfor.side(), Side::Stbd);
    }

    #[test]
    fn test_cardinal_degrees() {
        assert_eq!(Cardinal::East.degrees(), 90.0);
        assert_eq!(Cardinal::West.degrees(), 270.0);
    }
}
