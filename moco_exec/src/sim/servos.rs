//! Simulated steering servos

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{Mutex, MutexGuard};

use comms_if::eqpt::SteeringMode;
use log::{debug, warn};
use serde::Serialize;

use crate::eqpt::ServoCtrl;
use crate::MotionError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Mechanical limit of the AFRS servos.
///
/// Units: degrees
pub const SERVO_LIMIT_DEG: f64 = 90.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Servo bank recording every command it accepts.
#[derive(Debug, Default)]
pub struct SimServos {
    state: Mutex<ServoState>
}

#[derive(Debug, Default)]
struct ServoState {
    rotated: bool,
    enabled: bool,
    fail_next_mode_change: bool,
    commands: Vec<ServoCommand>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A command accepted by the simulated servos.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ServoCommand {
    Mode(SteeringMode),
    Afrs {
        port_deg: f64,
        stbd_deg: f64
    },
    Recenter
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimServos {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next mode change fail, as a jammed servo would.
    pub fn fail_next_mode_change(&self) {
        self.lock().fail_next_mode_change = true;
    }

    pub fn commands(&self) -> Vec<ServoCommand> {
        self.lock().commands.clone()
    }

    pub fn last_command(&self) -> Option<ServoCommand> {
        self.lock().commands.last().copied()
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    fn lock(&self) -> MutexGuard<'_, ServoState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ServoCtrl for SimServos {
    fn set_mode(&self, mode: SteeringMode) -> Result<(), MotionError> {
        let mut state = self.lock();

        if state.fail_next_mode_change {
            state.fail_next_mode_change = false;
            warn!("Simulated servo fault while moving to {:?}", mode);
            return Err(MotionError::Equipment(format!(
                "servos failed to reach the {:?} position", mode
            )));
        }

        state.rotated = mode.is_rotated();
        state.commands.push(ServoCommand::Mode(mode));
        debug!("Servos in the {:?} position", mode);

        Ok(())
    }

    fn set_afrs_angle(&self, port_deg: f64, stbd_deg: f64) -> Result<(), MotionError> {
        let mut state = self.lock();

        if state.rotated {
            return Err(MotionError::Equipment(
                "cannot apply an AFRS angle while the servos are rotated".into()
            ));
        }

        if port_deg.abs() > SERVO_LIMIT_DEG || stbd_deg.abs() > SERVO_LIMIT_DEG {
            return Err(MotionError::Equipment(format!(
                "AFRS angles ({}, {}) beyond the servo limit", port_deg, stbd_deg
            )));
        }

        state.commands.push(ServoCommand::Afrs { port_deg, stbd_deg });
        Ok(())
    }

    fn recenter(&self) -> Result<(), MotionError> {
        self.lock().commands.push(ServoCommand::Recenter);
        Ok(())
    }

    fn is_rotated(&self) -> bool {
        self.lock().rotated
    }

    fn enable(&self) -> Result<(), MotionError> {
        self.lock().enabled = true;
        Ok(())
    }

    fn disable(&self) -> Result<(), MotionError> {
        self.lock().enabled = false;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_afrs_rejected_when_rotated() {
        let servos = SimServos::new();
        servos.set_mode(SteeringMode::Rotate).unwrap();
        assert!(servos.set_afrs_angle(10.0, 8.0).is_err());

        servos.set_mode(SteeringMode::Skid).unwrap();
        servos.set_afrs_angle(10.0, 8.0).unwrap();
        assert_eq!(
            servos.last_command(), 
            Some(ServoCommand::Afrs { port_deg: 10.0, stbd_deg: 8.0 })
        );
    }
}
