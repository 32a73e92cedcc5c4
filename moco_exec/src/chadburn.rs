//! # Chadburn speed ladder
//!
//! The Chadburn is a fixed, ordered set of named speed levels running from
//! `MaximumAstern` to `MaximumAhead`. Stepping through the ladder is clamped
//! to `[FullAstern, FullAhead]`, the maximum levels are only reachable by
//! setting them directly.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The ladder, in order, with each level's label and speed fraction.
const LADDER: [(Chadburn, &str, f64); 13] = [
    (Chadburn::MaximumAstern,      "maximum-astern",      -1.00),
    (Chadburn::FullAstern,         "full-astern",         -0.85),
    (Chadburn::ThreeQuarterAstern, "three-quarter-astern", -0.64),
    (Chadburn::HalfAstern,         "half-astern",         -0.43),
    (Chadburn::SlowAstern,         "slow-astern",         -0.21),
    (Chadburn::DeadSlowAstern,     "dead-slow-astern",    -0.07),
    (Chadburn::Stop,               "stop",                 0.00),
    (Chadburn::DeadSlowAhead,      "dead-slow-ahead",      0.07),
    (Chadburn::SlowAhead,          "slow-ahead",           0.21),
    (Chadburn::HalfAhead,          "half-ahead",           0.43),
    (Chadburn::ThreeQuarterAhead,  "three-quarter-ahead",  0.64),
    (Chadburn::FullAhead,          "full-ahead",           0.85),
    (Chadburn::MaximumAhead,       "maximum-ahead",        1.00),
];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A speed level on the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Chadburn {
    MaximumAstern,
    FullAstern,
    ThreeQuarterAstern,
    HalfAstern,
    SlowAstern,
    DeadSlowAstern,
    Stop,
    DeadSlowAhead,
    SlowAhead,
    HalfAhead,
    ThreeQuarterAhead,
    FullAhead,
    MaximumAhead,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Chadburn {
    /// Position of the level in the ladder, `Stop` is zero, ahead is
    /// positive.
    pub fn num(&self) -> i32 {
        self.index() as i32 - Chadburn::Stop.index() as i32
    }

    /// Get the level at the given position, `None` if off the ladder.
    pub fn from_num(num: i32) -> Option<Self> {
        let idx = num + Chadburn::Stop.index() as i32;
        if idx < 0 {
            return None;
        }
        LADDER.get(idx as usize).map(|l| l.0)
    }

    pub fn label(&self) -> &'static str {
        LADDER[self.index()].1
    }

    /// Speed fraction of this level, in [-1, 1].
    pub fn speed(&self) -> f64 {
        LADDER[self.index()].2
    }

    /// Find the level whose speed is closest to `speed`.
    ///
    /// Ties resolve towards the level nearer `MaximumAstern`.
    pub fn closest(speed: f64) -> Self {
        let mut best = Chadburn::Stop;
        let mut best_diff = std::f64::INFINITY;

        for (level, _, level_speed) in LADDER.iter() {
            let diff = (level_speed - speed).abs();
            if diff < best_diff {
                best = *level;
                best_diff = diff;
            }
        }

        best
    }

    /// Step the level by `direction` (positive is ahead), clamping at
    /// `FullAstern` and `FullAhead`.
    ///
    /// Returns the new level and whether a step was taken. A level already
    /// outside the steppable range is first brought back inside it.
    pub fn step(&self, direction: i32) -> (Self, bool) {
        let current = self.clamp_steppable();
        let target = (current.num() + direction.signum())
            .max(Chadburn::FullAstern.num())
            .min(Chadburn::FullAhead.num());

        match Chadburn::from_num(target) {
            Some(c) => (c, c != current),
            None => (current, false)
        }
    }

    /// Clamp the level into `[FullAstern, FullAhead]`.
    pub fn clamp_steppable(&self) -> Self {
        if *self < Chadburn::FullAstern {
            Chadburn::FullAstern
        }
        else if *self > Chadburn::FullAhead {
            Chadburn::FullAhead
        }
        else {
            *self
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl Default for Chadburn {
    fn default() -> Self {
        Chadburn::Stop
    }
}

impl std::fmt::Display for Chadburn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_table_order() {
        for (i, (level, _, _)) in LADDER.iter().enumerate() {
            assert_eq!(level.index(), i);
        }
        for pair in LADDER.windows(2) {
            assert!(pair[0].2 < pair[1].2);
        }
        assert_eq!(Chadburn::Stop.num(), 0);
        assert_eq!(Chadburn::FullAhead.num(), 5);
        assert_eq!(Chadburn::from_num(-5), Some(Chadburn::FullAstern));
        assert_eq!(Chadburn::from_num(7), None);
    }

    #[test]
    fn test_closest() {
        assert_eq!(Chadburn::closest(0.19), Chadburn::SlowAhead);
        assert_eq!(Chadburn::closest(0.0), Chadburn::Stop);
        assert_eq!(Chadburn::closest(-0.5), Chadburn::HalfAstern);
        assert_eq!(Chadburn::closest(2.0), Chadburn::MaximumAhead);
    }

    #[test]
    fn test_step_stays_in_range() {
        let mut level = Chadburn::Stop;
        let pattern = [1, 1, 1, 1, 1, 1, 1, 1, -1, 1, 1];
        for d in pattern.iter() {
            level = level.step(*d).0;
            assert!(level >= Chadburn::FullAstern && level <= Chadburn::FullAhead);
        }
        assert_eq!(level, Chadburn::FullAhead);
        assert_eq!(level.step(1), (Chadburn::FullAhead, false));

        for _ in 0..20 {
            level = level.step(-1).0;
            assert!(level >= Chadburn::FullAstern && level <= Chadburn::FullAhead);
        }
        assert_eq!(level, Chadburn::FullAstern);

        // Maximum levels are pulled back into range before stepping
        assert_eq!(Chadburn::MaximumAhead.step(1), (Chadburn::FullAhead, false));
        assert_eq!(Chadburn::MaximumAstern.step(1), (Chadburn::ThreeQuarterAstern, true));
    }
}
