//! Simulated motor driver

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use comms_if::eqpt::{Orientation, Rotation, Side, SteeringMode};
use log::{debug, trace, warn};

use crate::eqpt::{Motor, MotorCtrl, StateChangeCallback};
use crate::speed_mult::{MultiplierSource, STEERING};
use crate::MotionError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Four motor drivetrain.
///
/// Speeds are accepted whether or not the drivetrain is enabled, the enable
/// flag is only tracked.
pub struct SimDrivetrain {
    motors: Vec<Arc<Motor>>,

    enabled: AtomicBool,

    /// Mode of the reposition in progress
    repositioning: Mutex<Option<SteeringMode>>,
    reposition_count: AtomicUsize,

    callbacks: Mutex<BTreeMap<String, StateChangeCallback>>,
    was_stopped: AtomicBool,

    /// One-shot fault armed by `inject_fault`
    fault: Mutex<Option<DrivetrainFault>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Faults the simulated drivetrain can be made to raise once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrivetrainFault {
    /// The next reposition start is refused
    RepositionRefused,

    /// The next non-zero speed commanded during a reposition fails
    RampSpeed,

    /// The next non-zero speed commanded during a reposition panics
    RampPanic,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimDrivetrain {
    pub fn new() -> Self {
        Self {
            motors: Orientation::UNITS
                .iter()
                .map(|o| Arc::new(Motor::new(*o)))
                .collect(),
            enabled: AtomicBool::new(false),
            repositioning: Mutex::new(None),
            reposition_count: AtomicUsize::new(0),
            callbacks: Mutex::new(BTreeMap::new()),
            was_stopped: AtomicBool::new(true),
            fault: Mutex::new(None),
        }
    }

    /// Arm a fault, raised the next time its trigger is reached.
    pub fn inject_fault(&self, fault: DrivetrainFault) {
        *self.fault.lock().unwrap_or_else(|e| e.into_inner()) = Some(fault);
    }

    /// Disarm and return the armed fault if it is one of `faults`.
    fn take_fault(&self, faults: &[DrivetrainFault]) -> Option<DrivetrainFault> {
        let mut fault = self.fault.lock().unwrap_or_else(|e| e.into_inner());

        match *fault {
            Some(f) if faults.contains(&f) => fault.take(),
            _ => None
        }
    }

    /// Number of repositions started on the drivetrain.
    pub fn reposition_count(&self) -> usize {
        self.reposition_count.load(Ordering::SeqCst)
    }

    /// Mode of the reposition in progress, if any.
    pub fn repositioning(&self) -> Option<SteeringMode> {
        *self.repositioning.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fire the state change callbacks if the stopped state has changed.
    fn notify_state_change(&self) {
        let stopped = self.is_stopped();

        if self.was_stopped.swap(stopped, Ordering::SeqCst) != stopped {
            trace!("Drivetrain {}", if stopped { "stopped" } else { "moving" });

            let callbacks = self.callbacks.lock().unwrap_or_else(|e| e.into_inner());
            for cb in callbacks.values() {
                cb(stopped);
            }
        }
    }
}

impl Default for SimDrivetrain {
    fn default() -> Self {
        Self::new()
    }
}

impl MotorCtrl for SimDrivetrain {
    fn motors(&self) -> Vec<Arc<Motor>> {
        self.motors.clone()
    }

    fn set_speed(&self, orientation: Orientation, speed: f64) -> Result<(), MotionError> {
        if speed != 0.0 && self.repositioning().is_some() {
            match self.take_fault(&[DrivetrainFault::RampSpeed, DrivetrainFault::RampPanic]) {
                Some(DrivetrainFault::RampPanic) => panic!("Simulated drivetrain crash"),
                Some(_) => {
                    warn!("Simulated drivetrain fault at speed {:.2}", speed);
                    return Err(MotionError::Equipment(format!(
                        "drivetrain rejected speed {:.2} during reposition", speed
                    )));
                },
                None => ()
            }
        }

        for m in self.motors.iter().filter(|m| orientation.selects(m.orientation())) {
            m.set_target_speed(speed);
        }

        self.notify_state_change();
        Ok(())
    }

    fn set_motor_speed(&self, orientation: Orientation, speed: f64) -> Result<(), MotionError> {
        match self.get_motor(orientation) {
            Some(m) => m.set_target_speed(speed),
            None => return Err(MotionError::UnknownCollaborator(format!(
                "no motor at {:?}", orientation
            )))
        }

        self.notify_state_change();
        Ok(())
    }

    /// Rotation is done by running the two sides in opposite directions,
    /// through the `steering` multiplier.
    fn rotate(&self, rotation: Rotation) -> Result<(), MotionError> {
        match rotation {
            Rotation::Stopped => {
                for m in self.motors.iter() {
                    m.with_state(|s| {
                        s.multipliers.remove(STEERING);
                        s.target_speed = 0.0;
                    });
                }
            },
            _ => {
                let sign = rotation.sign();

                for m in self.motors.iter() {
                    let ratio = match m.orientation().side() {
                        Side::Port => sign,
                        Side::Stbd => -sign,
                        Side::Cntr => 0.0
                    };

                    m.with_state(|s| {
                        s.multipliers.remove(STEERING);
                        s.multipliers.install(STEERING, MultiplierSource::Static(ratio))
                    })?;
                }
            }
        }

        debug!("Drivetrain rotation: {:?}", rotation);
        self.notify_state_change();
        Ok(())
    }

    fn reposition(&self, mode: Option<SteeringMode>) -> Result<(), MotionError> {
        let mut repositioning = self.repositioning
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        match (*repositioning, mode) {
            (Some(current), Some(new)) => return Err(MotionError::RepositionFailed(format!(
                "already repositioning for {:?}, cannot start {:?}", current, new
            ))),
            (_, Some(new)) if self.take_fault(&[DrivetrainFault::RepositionRefused]).is_some() => {
                warn!("Simulated drivetrain refused the {:?} reposition", new);
                return Err(MotionError::Equipment(format!(
                    "drivetrain refused to reposition for {:?}", new
                )));
            },
            (_, Some(_)) => {
                self.reposition_count.fetch_add(1, Ordering::SeqCst);
            },
            _ => ()
        }

        *repositioning = mode;
        Ok(())
    }

    fn add_state_change_callback(
        &self,
        name: &str,
        callback: StateChangeCallback
    ) -> Result<(), MotionError> {
        let mut callbacks = self.callbacks.lock().unwrap_or_else(|e| e.into_inner());

        if callbacks.contains_key(name) {
            return Err(MotionError::DuplicateRegistration {
                kind: "state change callback",
                name: name.to_string()
            });
        }

        callbacks.insert(name.to_string(), callback);
        Ok(())
    }

    fn enable(&self) -> Result<(), MotionError> {
        self.enabled.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disable(&self) -> Result<(), MotionError> {
        for m in self.motors.iter() {
            m.set_target_speed(0.0);
        }
        self.enabled.store(false, Ordering::SeqCst);
        self.notify_state_change();
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_rotate() {
        let dt = SimDrivetrain::new();
        dt.rotate(Rotation::Clockwise).unwrap();
        dt.set_speed(Orientation::Cntr, 0.4).unwrap();

        assert_eq!(dt.mean_speed(Orientation::Port), 0.4);
        assert_eq!(dt.mean_speed(Orientation::Stbd), -0.4);
        assert_eq!(dt.mean_speed(Orientation::Cntr), 0.0);

        // Changing sense replaces the multiplier
        dt.rotate(Rotation::CounterClockwise).unwrap();
        assert_eq!(dt.mean_speed(Orientation::Port), -0.4);

        dt.rotate(Rotation::Stopped).unwrap();
        assert!(dt.is_stopped());
        assert!(dt.motors().iter().all(|m| !m.has_speed_multiplier(STEERING)));
    }

    #[test]
    fn test_state_change_callbacks() {
        let dt = SimDrivetrain::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_cb = count.clone();

        dt.add_state_change_callback("count", Box::new(move |_| {
            count_cb.fetch_add(1, Ordering::SeqCst);
        })).unwrap();

        assert!(matches!(
            dt.add_state_change_callback("count", Box::new(|_| ())),
            Err(MotionError::DuplicateRegistration { .. })
        ));

        dt.set_speed(Orientation::Cntr, 0.5).unwrap();
        dt.set_speed(Orientation::Cntr, 0.6).unwrap();
        dt.set_speed(Orientation::Cntr, 0.0).unwrap();

        // Moving then stopped
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_overlapping_reposition_rejected() {
        let dt = SimDrivetrain::new();
        dt.reposition(Some(SteeringMode::Rotate)).unwrap();
        assert!(dt.reposition(Some(SteeringMode::Afrs)).is_err());
        dt.reposition(None).unwrap();
        assert_eq!(dt.reposition_count(), 1);
        assert_eq!(dt.repositioning(), None);
    }
}
