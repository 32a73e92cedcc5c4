//! Motor state shared between the motion controller and the motor driver

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{Mutex, MutexGuard};

use comms_if::eqpt::Orientation;
use log::{debug, info};

use crate::speed_mult::{MultiplierSource, SpeedMultiplierRegistry};
use crate::MotionError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Output speeds smaller than this are considered stopped.
pub const STOPPED_SPEED_TOL: f64 = 1e-2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single drive motor.
///
/// Target speed and multipliers are held under one lock so the output speed
/// never sees a half updated multiplier set.
#[derive(Debug)]
pub struct Motor {
    orientation: Orientation,
    state: Mutex<MotorState>
}

/// Snapshot of a motor's speed state.
#[derive(Debug, Clone, Default)]
pub struct MotorState {
    /// Base speed demand in [-1, 1] before multipliers
    pub target_speed: f64,

    pub multipliers: SpeedMultiplierRegistry
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Motor {
    pub fn new(orientation: Orientation) -> Self {
        Self {
            orientation,
            state: Mutex::new(MotorState::default())
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn target_speed(&self) -> f64 {
        self.lock().target_speed
    }

    /// Set the target speed, clamped to [-1, 1].
    pub fn set_target_speed(&self, speed: f64) {
        let speed = if speed.is_finite() {
            speed.max(-1.0).min(1.0)
        }
        else {
            0.0
        };
        self.lock().target_speed = speed;
    }

    /// The speed the motor is actually driven at, target speed times all
    /// multipliers.
    pub fn output_speed(&self) -> f64 {
        let state = self.lock();
        state.multipliers.apply(state.target_speed).max(-1.0).min(1.0)
    }

    pub fn is_stopped(&self) -> bool {
        self.output_speed().abs() < STOPPED_SPEED_TOL
    }

    pub fn add_speed_multiplier(
        &self,
        name: &str,
        source: MultiplierSource
    ) -> Result<(), MotionError> {
        info!("Adding \"{}\" multiplier to the {} motor", name, self.orientation.label());
        self.lock().multipliers.install(name, source)
    }

    /// Remove a multiplier, returning it if it was installed.
    pub fn remove_speed_multiplier(&self, name: &str) -> Option<MultiplierSource> {
        let removed = self.lock().multipliers.remove(name);

        match removed {
            Some(_) => info!(
                "Removed \"{}\" multiplier from the {} motor", 
                name, self.orientation.label()
            ),
            None => debug!(
                "The {} motor has no \"{}\" multiplier", 
                self.orientation.label(), name
            )
        }

        removed
    }

    pub fn has_speed_multiplier(&self, name: &str) -> bool {
        self.lock().multipliers.contains(name)
    }

    pub fn speed_multiplier_names(&self) -> Vec<String> {
        self.lock().multipliers.names()
    }

    pub fn clear_speed_multipliers(&self) {
        self.lock().multipliers.clear()
    }

    /// Run `f` with exclusive access to the motor's state.
    pub fn with_state<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut MotorState) -> R
    {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, MotorState> {
        // State is plain data, poisoning is ignored
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::speed_mult::{RatioSlot, PORT_RATIO, STOP};

    #[test]
    fn test_output_speed() {
        let m = Motor::new(Orientation::Pfor);
        m.set_target_speed(0.5);
        assert_eq!(m.output_speed(), 0.5);

        let slot = RatioSlot::new(0.5);
        m.add_speed_multiplier(PORT_RATIO, MultiplierSource::Slot(slot.clone())).unwrap();
        assert_eq!(m.output_speed(), 0.25);
        assert!(!m.is_stopped());

        m.add_speed_multiplier(STOP, MultiplierSource::Static(0.0)).unwrap();
        assert!(m.is_stopped());
        assert!(m.remove_speed_multiplier(STOP).is_some());
        assert!(m.remove_speed_multiplier(STOP).is_none());

        m.set_target_speed(4.0);
        assert_eq!(m.target_speed(), 1.0);
    }
}
