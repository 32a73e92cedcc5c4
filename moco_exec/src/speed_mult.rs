//! # Speed multipliers
//!
//! Each motor carries a registry of named multipliers. The motor's output
//! speed is its target speed multiplied by every installed multiplier.
//! Names are unique within a registry, installing a name twice is rejected
//! and removing an absent name does nothing.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::MotionError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Multiplier installed by a rotation command
pub const STEERING: &str = "steering";

/// Multiplier installed by a stop
pub const STOP: &str = "stop";

/// Multiplier installed by a halt
pub const HALT: &str = "halt";

/// AFRS ratio for port side motors
pub const PORT_RATIO: &str = "port_ratio";

/// AFRS ratio for starboard side motors
pub const STBD_RATIO: &str = "stbd_ratio";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A ratio shared between its owner and any number of registries.
///
/// The owner updates the value in place, every registry holding a clone sees
/// the new value on its next application.
#[derive(Debug, Clone)]
pub struct RatioSlot(Arc<AtomicU64>);

/// A registry of named speed multipliers.
#[derive(Debug, Clone, Default)]
pub struct SpeedMultiplierRegistry {
    multipliers: BTreeMap<String, MultiplierSource>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Where a multiplier gets its ratio from.
#[derive(Debug, Clone)]
pub enum MultiplierSource {
    /// A fixed ratio
    Static(f64),

    /// The current value of a shared slot
    Slot(RatioSlot)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RatioSlot {
    pub fn new(ratio: f64) -> Self {
        Self(Arc::new(AtomicU64::new(ratio.to_bits())))
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, ratio: f64) {
        self.0.store(ratio.to_bits(), Ordering::SeqCst)
    }
}

impl Default for RatioSlot {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl MultiplierSource {
    /// The ratio this source currently applies.
    pub fn ratio(&self) -> f64 {
        match self {
            MultiplierSource::Static(r) => *r,
            MultiplierSource::Slot(s) => s.get()
        }
    }
}

impl SpeedMultiplierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a multiplier under `name`.
    pub fn install(
        &mut self,
        name: &str,
        source: MultiplierSource
    ) -> Result<(), MotionError> {
        if self.multipliers.contains_key(name) {
            return Err(MotionError::DuplicateRegistration {
                kind: "speed multiplier",
                name: name.to_string()
            });
        }

        self.multipliers.insert(name.to_string(), source);
        Ok(())
    }

    /// Remove the multiplier called `name`, returning it if it was
    /// installed.
    pub fn remove(&mut self, name: &str) -> Option<MultiplierSource> {
        self.multipliers.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.multipliers.contains_key(name)
    }

    pub fn clear(&mut self) {
        self.multipliers.clear()
    }

    pub fn is_empty(&self) -> bool {
        self.multipliers.is_empty()
    }

    /// Names of all installed multipliers, in order.
    pub fn names(&self) -> Vec<String> {
        self.multipliers.keys().cloned().collect()
    }

    /// Apply every installed multiplier to `base`.
    pub fn apply(&self, base: f64) -> f64 {
        self.multipliers
            .values()
            .fold(base, |speed, source| speed * source.ratio())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duplicate_install() {
        let mut reg = SpeedMultiplierRegistry::new();
        reg.install(STEERING, MultiplierSource::Static(0.5)).unwrap();

        match reg.install(STEERING, MultiplierSource::Static(-1.0)) {
            Err(MotionError::DuplicateRegistration { name, .. }) => {
                assert_eq!(name, STEERING)
            },
            r => panic!("Expected a duplicate registration, got {:?}", r)
        }

        // The first multiplier is untouched
        assert_eq!(reg.apply(1.0), 0.5);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut reg = SpeedMultiplierRegistry::new();
        assert!(reg.remove(STOP).is_none());
        reg.install(STOP, MultiplierSource::Static(0.0)).unwrap();
        assert!(reg.remove(STOP).is_some());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_apply_composes_slots() {
        let slot = RatioSlot::new(1.0);
        let mut reg = SpeedMultiplierRegistry::new();
        reg.install(PORT_RATIO, MultiplierSource::Slot(slot.clone())).unwrap();
        reg.install(STEERING, MultiplierSource::Static(-1.0)).unwrap();

        assert_eq!(reg.apply(0.5), -0.5);

        slot.set(0.5);
        assert_eq!(reg.apply(0.5), -0.25);

        assert_eq!(reg.names(), vec![PORT_RATIO.to_string(), STEERING.to_string()]);
    }
}
