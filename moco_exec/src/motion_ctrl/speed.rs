//! Speed commands: the speed ladder, analog speed nudging, manual speed,
//! stopping and rotation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::{Orientation, Rotation};
use log::{debug, info, warn};
use util::maths::clamp;

use super::{
    MotionCtrl, MAX_SPEED_INCREMENT, RAW_AXIS_CENTRE, RAW_AXIS_PER_INCREMENT, 
    SPEED_DELTA_TOL
};
use crate::chadburn::Chadburn;
use crate::speed_mult::{HALT, STOP};
use crate::MotionError;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionCtrl {
    /// Step the speed ladder from a d-pad value: -1 (up) steps ahead, 1
    /// (down) steps astern. Other values are ignored.
    ///
    /// The ladder is first resynchronised to the level closest to the
    /// drivetrain's measured mean speed, then stepped, and the new level's
    /// speed is sent to both sides.
    pub fn increment_speed(&mut self, value: i32) -> Result<(), MotionError> {
        let direction = match value {
            -1 => 1,
            1 => -1,
            _ => {
                debug!("Ignoring speed increment value {}", value);
                return Ok(());
            }
        };

        self.prepare_to_move();

        let mean_speed = self.eqpt.motors.mean_speed(Orientation::Cntr);
        let closest = Chadburn::closest(mean_speed).clamp_steppable();
        info!("Closest speed level to {:.2}: {}", mean_speed, closest);
        self.chadburn = closest;

        let (level, stepped) = self.chadburn.step(direction);
        if !stepped {
            info!("Speed already at the {} limit", level);
        }
        self.chadburn = level;

        info!("Speed level: {} ({:.2})", level, level.speed());

        self.eqpt.motors.set_speed(Orientation::Port, level.speed())?;
        self.eqpt.motors.set_speed(Orientation::Stbd, level.speed())
    }

    /// Nudge every motor's target speed from a raw analog stick value (0 to
    /// 255, rest at 127).
    ///
    /// The deflection is converted into an increment in [-7, 7], scaled,
    /// and added to each motor's own target speed. Negligible changes are
    /// ignored.
    pub fn change_speed(&mut self, raw_value: i32) -> Result<(), MotionError> {
        self.prepare_to_move();

        let deflection = (RAW_AXIS_CENTRE - raw_value) as f64;
        let increment = clamp(
            &(deflection / RAW_AXIS_PER_INCREMENT).round(),
            &-MAX_SPEED_INCREMENT,
            &MAX_SPEED_INCREMENT
        );
        let delta = increment * self.params.speed_nudge_scale;

        if delta.abs() <= SPEED_DELTA_TOL {
            debug!(
                "Ignoring negligible speed change {:.4} from raw value {}", 
                delta, raw_value
            );
            return Ok(());
        }

        for motor in self.eqpt.motors.motors() {
            let target = motor.target_speed() + delta;
            debug!(
                "{} motor speed {:.2} -> {:.2}", 
                motor.orientation().label(), motor.target_speed(), target
            );
            self.eqpt.motors.set_motor_speed(motor.orientation(), target)?;
        }

        Ok(())
    }

    /// Drive both sides at the manual speed source's value, or at the
    /// default manual speed if there is no source.
    pub fn set_manual_speed(&mut self) -> Result<(), MotionError> {
        self.prepare_to_move();

        let speed = match self.eqpt.manual_speed {
            Some(ref source) => source.scaled_value(),
            None => {
                warn!(
                    "No manual speed source, using the default speed {:.2}", 
                    self.params.default_manual_speed
                );
                self.params.default_manual_speed
            }
        };

        info!("Manual speed: {:.2}", speed);

        self.eqpt.motors.set_speed(Orientation::Port, speed)?;
        self.eqpt.motors.set_speed(Orientation::Stbd, speed)
    }

    pub fn stop(&mut self) -> Result<(), MotionError> {
        info!("Stopping");
        self.eqpt.stop_handler.stop(Some(Box::new(|| info!("Stop complete"))))
    }

    pub fn halt(&mut self) -> Result<(), MotionError> {
        info!("Halting");
        self.eqpt.stop_handler.halt(Some(Box::new(|| info!("Halt complete"))))
    }

    pub fn brake(&mut self) -> Result<(), MotionError> {
        info!("Braking");
        self.eqpt.stop_handler.brake(Some(Box::new(|| info!("Brake complete"))))
    }

    pub fn emergency_stop(&mut self) -> Result<(), MotionError> {
        warn!("Emergency stop");
        self.eqpt.stop_handler.emergency_stop()
    }

    /// Rotate on the spot, or stop rotating.
    pub fn rotate(&mut self, rotation: Rotation) -> Result<(), MotionError> {
        self.prepare_to_move();
        info!("Rotation: {:?}", rotation);
        self.eqpt.motors.rotate(rotation)
    }

    /// List then clear every motor's multipliers, and reinstall those of the
    /// current steering mode.
    pub fn home(&mut self) -> Result<(), MotionError> {
        for motor in self.eqpt.motors.motors() {
            info!(
                "{} motor multipliers: {:?}", 
                motor.orientation().label(), motor.speed_multiplier_names()
            );
        }

        self.eqpt.motors.clear_speed_multipliers();
        self.steer.recommit_multipliers()
    }

    /// Release the motors from any stop or halt so they can be driven.
    pub(crate) fn prepare_to_move(&self) {
        self.eqpt.motors.remove_speed_multiplier(STOP);
        self.eqpt.motors.remove_speed_multiplier(HALT);
        debug!("Prepared to move");
    }
}
