//! # Equipment interfaces
//!
//! Traits for every collaborator the motion controller drives or polls. All
//! collaborators are shared between threads (the reposition ramp runs on its
//! own thread) so every trait is `Send + Sync` and takes `&self`.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod motor;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Arc;

use comms_if::eqpt::{Orientation, Rotation, SteeringMode};
use comms_if::evt::Message;

use crate::motion_ctrl::Task;
use crate::MotionError;

pub use motor::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One IMU reading. Heading and calibration state are read together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuSample {
    /// Compass heading
    ///
    /// Units: degrees, [0, 360)
    pub heading_deg: f64,

    pub calibrated: bool
}

/// The set of collaborators handed to the motion controller.
#[derive(Clone)]
pub struct Equipment {
    pub motors: Arc<dyn MotorCtrl>,
    pub servos: Arc<dyn ServoCtrl>,
    pub stop_handler: Arc<dyn StopHandler>,
    pub imu: Option<Arc<dyn Imu>>,
    pub manual_speed: Option<Arc<dyn ManualSpeedSource>>,
    pub push_button: Option<Arc<dyn PushButton>>,
    pub task_selector: Option<Arc<dyn TaskSelector>>,
    pub forwarder: Option<Arc<dyn MessageForwarder>>
}

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

/// Called with `true` when the drivetrain comes to a stop and `false` when it
/// starts moving.
pub type StateChangeCallback = Box<dyn Fn(bool) + Send + Sync>;

/// Called once a stop handler action has completed.
pub type CompletionCallback = Box<dyn FnOnce() + Send>;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// The motor driver.
pub trait MotorCtrl: Send + Sync {
    /// All motors, fore to aft.
    fn motors(&self) -> Vec<Arc<Motor>>;

    /// Set the target speed of every motor selected by `orientation`.
    fn set_speed(&self, orientation: Orientation, speed: f64) -> Result<(), MotionError>;

    /// Command a rotation on the spot, or stop rotating.
    fn rotate(&self, rotation: Rotation) -> Result<(), MotionError>;

    /// Prepare the motors for a reposition to `mode`, `None` once the
    /// reposition has finished.
    fn reposition(&self, mode: Option<SteeringMode>) -> Result<(), MotionError>;

    /// Register a callback fired on stopped/moving transitions.
    fn add_state_change_callback(
        &self,
        name: &str,
        callback: StateChangeCallback
    ) -> Result<(), MotionError>;

    fn enable(&self) -> Result<(), MotionError>;

    fn disable(&self) -> Result<(), MotionError>;

    fn is_enabled(&self) -> bool;

    /// Get the motor at a single unit orientation.
    fn get_motor(&self, orientation: Orientation) -> Option<Arc<Motor>> {
        self.motors()
            .into_iter()
            .find(|m| m.orientation() == orientation)
    }

    /// Set the target speed of exactly one motor.
    fn set_motor_speed(&self, orientation: Orientation, speed: f64) -> Result<(), MotionError> {
        match self.get_motor(orientation) {
            Some(m) => {
                m.set_target_speed(speed);
                Ok(())
            },
            None => Err(MotionError::UnknownCollaborator(format!(
                "no motor at {:?}", orientation
            )))
        }
    }

    /// Mean output speed of the motors selected by `orientation`.
    fn mean_speed(&self, orientation: Orientation) -> f64 {
        let speeds: Vec<f64> = self.motors()
            .iter()
            .filter(|m| orientation.selects(m.orientation()))
            .map(|m| m.output_speed())
            .collect();

        if speeds.is_empty() {
            0.0
        }
        else {
            speeds.iter().sum::<f64>() / speeds.len() as f64
        }
    }

    /// True if every motor is stopped.
    fn is_stopped(&self) -> bool {
        self.motors().iter().all(|m| m.is_stopped())
    }

    /// Remove the named multiplier from every motor.
    fn remove_speed_multiplier(&self, name: &str) {
        for m in self.motors() {
            m.remove_speed_multiplier(name);
        }
    }

    fn clear_speed_multipliers(&self) {
        for m in self.motors() {
            m.clear_speed_multipliers();
        }
    }
}

/// The steering servo driver.
pub trait ServoCtrl: Send + Sync {
    /// Move the servos to the position for `mode`.
    fn set_mode(&self, mode: SteeringMode) -> Result<(), MotionError>;

    /// Set the AFRS angles of the port and starboard servos.
    ///
    /// Units: degrees, clockwise positive
    fn set_afrs_angle(&self, port_deg: f64, stbd_deg: f64) -> Result<(), MotionError>;

    /// Return all servos to straight ahead.
    fn recenter(&self) -> Result<(), MotionError>;

    /// True if the servos are in the rotate position.
    fn is_rotated(&self) -> bool;

    fn enable(&self) -> Result<(), MotionError>;

    fn disable(&self) -> Result<(), MotionError>;
}

/// The inertial measurement unit.
pub trait Imu: Send + Sync {
    /// Take a new reading.
    fn poll(&self) -> Result<ImuSample, MotionError>;

    /// Start calibration.
    fn calibrate(&self) -> Result<(), MotionError>;

    /// Calibration verdict, `None` while undecided.
    fn calibration_state(&self) -> Option<bool>;

    fn is_calibrated(&self) -> bool {
        self.calibration_state() == Some(true)
    }
}

/// Manually set speed scale (a potentiometer on the robot).
pub trait ManualSpeedSource: Send + Sync {
    /// Current value in [0, 1].
    fn scaled_value(&self) -> f64;
}

/// Handles the different grades of stopping.
pub trait StopHandler: Send + Sync {
    fn stop(&self, on_complete: Option<CompletionCallback>) -> Result<(), MotionError>;

    fn halt(&self, on_complete: Option<CompletionCallback>) -> Result<(), MotionError>;

    fn brake(&self, on_complete: Option<CompletionCallback>) -> Result<(), MotionError>;

    fn emergency_stop(&self) -> Result<(), MotionError>;
}

/// A push button on the robot.
pub trait PushButton: Send + Sync {
    fn is_pushed(&self) -> bool;
}

/// Selects the task run by the task button.
pub trait TaskSelector: Send + Sync {
    /// The currently selected task.
    fn selection(&self) -> Task;

    /// All selectable tasks.
    fn tasks(&self) -> Vec<Task>;
}

/// Downstream consumer of every dispatched message.
pub trait MessageForwarder: Send + Sync {
    fn forward(&self, msg: &Message);
}
