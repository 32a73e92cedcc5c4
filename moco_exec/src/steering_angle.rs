//! # Steering angle presets
//!
//! Discrete inner steering angles selected with the d-pad, from 45° counter
//! clockwise to 45° clockwise in 10° steps either side of a 5° first step.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const PRESETS: [(SteeringAngle, &str, i32); 11] = [
    (SteeringAngle::CounterClockwise45, "counter-clockwise-45", -45),
    (SteeringAngle::CounterClockwise35, "counter-clockwise-35", -35),
    (SteeringAngle::CounterClockwise25, "counter-clockwise-25", -25),
    (SteeringAngle::CounterClockwise15, "counter-clockwise-15", -15),
    (SteeringAngle::CounterClockwise5,  "counter-clockwise-5",   -5),
    (SteeringAngle::StraightAhead,      "straight-ahead",         0),
    (SteeringAngle::Clockwise5,         "clockwise-5",            5),
    (SteeringAngle::Clockwise15,        "clockwise-15",          15),
    (SteeringAngle::Clockwise25,        "clockwise-25",          25),
    (SteeringAngle::Clockwise35,        "clockwise-35",          35),
    (SteeringAngle::Clockwise45,        "clockwise-45",          45),
];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A steering angle preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SteeringAngle {
    CounterClockwise45,
    CounterClockwise35,
    CounterClockwise25,
    CounterClockwise15,
    CounterClockwise5,
    StraightAhead,
    Clockwise5,
    Clockwise15,
    Clockwise25,
    Clockwise35,
    Clockwise45,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SteeringAngle {
    /// Position of the preset, `StraightAhead` is zero and clockwise is
    /// positive.
    pub fn num(&self) -> i32 {
        *self as i32 - SteeringAngle::StraightAhead as i32
    }

    /// Get the preset at the given position, `None` if out of range.
    pub fn from_num(num: i32) -> Option<Self> {
        let idx = num + SteeringAngle::StraightAhead as i32;
        if idx < 0 {
            return None;
        }
        PRESETS.get(idx as usize).map(|p| p.0)
    }

    pub fn label(&self) -> &'static str {
        PRESETS[*self as usize].1
    }

    /// Signed inner steering angle of the preset.
    ///
    /// Units: degrees, clockwise positive
    pub fn degrees(&self) -> i32 {
        PRESETS[*self as usize].2
    }

    /// Step to the neighbouring preset in `direction` (positive is
    /// clockwise). Returns `None` if the step would leave the range.
    pub fn step(&self, direction: i32) -> Option<Self> {
        SteeringAngle::from_num(self.num() + direction.signum())
    }
}

impl Default for SteeringAngle {
    fn default() -> Self {
        SteeringAngle::StraightAhead
    }
}

impl std::fmt::Display for SteeringAngle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
