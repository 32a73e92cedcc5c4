//! Reposition protocol
//!
//! The motors are ramped from the minimum moving speed up to the ramp maximum
//! and back down on a background thread. After the initial delay the calling
//! thread moves the servos, then waits for the ramp to finish.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use comms_if::eqpt::{Orientation, SteeringMode};
use log::{debug, info, warn};
use util::time::secs_to_duration;

use super::{Params, SteerCtrl};
use crate::eqpt::MotorCtrl;
use crate::MotionError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The speeds and timing of one reposition ramp.
#[derive(Debug, Clone, PartialEq)]
pub struct RampPlan {
    /// Speeds commanded in order, up then down
    pub speeds: Vec<f64>,

    /// Time each speed is held for
    pub step_delay: Duration,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RampPlan {
    /// Build the ramp from the steering parameters.
    pub fn from_params(params: &Params) -> Self {
        let steps = params.reposition_steps.max(1);
        let min = params.reposition_min_speed;
        let max = params.reposition_max_speed;
        let speed_step = (max - min) / steps as f64;

        let up = (0..steps).map(|i| min + i as f64 * speed_step);
        let down = (0..steps).map(|i| max - i as f64 * speed_step);

        Self {
            speeds: up.chain(down).collect(),
            step_delay: secs_to_duration(
                params.reposition_duration_s / (2 * steps) as f64
            ),
        }
    }
}

impl SteerCtrl {
    /// Run the reposition protocol for a change to `mode`.
    ///
    /// Blocks until both the servo move and the motor ramp are complete. A
    /// failure on either side is returned once the ramp thread has been
    /// joined.
    pub(crate) fn reposition(&mut self, mode: SteeringMode) -> Result<(), MotionError> {
        info!("Repositioning for {:?}", mode);

        let plan = RampPlan::from_params(&self.params);
        let motors = self.motors.clone();

        let ramp = thread::Builder::new()
            .name("reposition".into())
            .spawn(move || ramp_motors(motors, mode, plan))
            .map_err(|e| MotionError::RepositionFailed(
                format!("could not start the ramp thread: {}", e)
            ))?;

        // Let the wheels start turning before moving the servos
        thread::sleep(secs_to_duration(self.params.initial_reposition_delay_s));

        let servo_mode = match mode {
            SteeringMode::Rotate => SteeringMode::Rotate,
            _ => SteeringMode::Skid
        };
        debug!("Moving servos to the {:?} position", servo_mode);
        let servo_result = self.servos.set_mode(servo_mode);

        let ramp_result = match ramp.join() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e @ MotionError::RepositionFailed(_))) => Err(e),
            Ok(Err(e)) => Err(MotionError::RepositionFailed(
                format!("motor ramp failed: {}", e)
            )),
            Err(_) => {
                self.release_after_panic();
                Err(MotionError::RepositionFailed("the ramp thread panicked".into()))
            }
        };

        servo_result?;
        ramp_result?;

        self.reposition_count += 1;
        info!("Repositioning complete");

        Ok(())
    }

    /// Bring the motors to rest and end the reposition when the ramp thread
    /// died before it could.
    fn release_after_panic(&self) {
        warn!("Reposition ramp thread panicked, releasing the motors");

        if let Err(e) = self.motors.set_speed(Orientation::Cntr, 0.0) {
            warn!("Could not zero the motors: {}", e);
        }
        if let Err(e) = self.motors.reposition(None) {
            warn!("Could not end the reposition: {}", e);
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Body of the ramp thread.
///
/// The motors are always brought back to zero and released from the
/// reposition, even if the ramp itself fails part way through.
fn ramp_motors(
    motors: Arc<dyn MotorCtrl>,
    mode: SteeringMode,
    plan: RampPlan
) -> Result<(), MotionError> {
    motors.reposition(Some(mode))?;

    let ramp_result = run_ramp(motors.as_ref(), &plan);

    let zero_result = motors
        .set_speed(Orientation::Port, 0.0)
        .and_then(|_| motors.set_speed(Orientation::Stbd, 0.0));
    let release_result = motors.reposition(None);

    if let Err(ref e) = ramp_result {
        warn!("Reposition ramp failed: {}", e);
    }

    ramp_result?;
    zero_result?;
    release_result
}

/// Command each speed of the plan to both sides in turn.
fn run_ramp(motors: &dyn MotorCtrl, plan: &RampPlan) -> Result<(), MotionError> {
    for speed in plan.speeds.iter() {
        motors.set_speed(Orientation::Port, *speed)?;
        motors.set_speed(Orientation::Stbd, *speed)?;
        thread::sleep(plan.step_delay);
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ramp_plan() {
        let params = Params {
            reposition_duration_s: 2.0,
            reposition_steps: 10,
            reposition_min_speed: 0.09,
            reposition_max_speed: 0.21,
            ..Default::default()
        };
        let plan = RampPlan::from_params(&params);

        assert_eq!(plan.speeds.len(), 20);
        assert_eq!(plan.step_delay, Duration::from_millis(100));
        assert!((plan.speeds[0] - 0.09).abs() < 1e-12);
        assert!((plan.speeds[10] - 0.21).abs() < 1e-12);

        // Up then down, never outside [min, max]
        for pair in plan.speeds[..10].windows(2) {
            assert!(pair[1] > pair[0]);
        }
        for pair in plan.speeds[10..].windows(2) {
            assert!(pair[1] < pair[0]);
        }
        assert!(plan.speeds.iter().all(|s| *s >= 0.09 - 1e-12 && *s <= 0.21 + 1e-12));
    }
}
