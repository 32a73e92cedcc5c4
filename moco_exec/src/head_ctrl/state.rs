//! Implementations for the HeadCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::sync::Arc;
use std::thread;

use comms_if::eqpt::{Cardinal, Orientation, Rotation, SteeringMode};
use log::{debug, info, trace, warn};
use serde::Serialize;
use util::maths::get_ang_dist_deg;
use util::time::{secs_to_duration, Rate};

// Internal
use super::{CancelToken, Params};
use crate::eqpt::{Equipment, Imu, ManualSpeedSource};
use crate::speed_mult::{HALT, STOP};
use crate::steer_ctrl::SteerCtrl;
use crate::MotionError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Heading control module state
pub struct HeadCtrl {
    params: Params,

    imu: Option<Arc<dyn Imu>>,
    manual_speed: Option<Arc<dyn ManualSpeedSource>>,

    cancel: CancelToken,
}

/// Summary of one `set_heading` run.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct HeadingReport {
    pub outcome: HeadingOutcome,

    /// Units: degrees
    pub target_deg: f64,

    /// Heading when the loop started
    ///
    /// Units: degrees
    pub start_heading_deg: f64,

    /// Last heading polled in the loop
    ///
    /// Units: degrees
    pub final_heading_deg: f64,

    /// Signed heading error when the loop ended, clockwise positive
    ///
    /// Units: degrees
    pub final_error_deg: f64,

    /// Number of control loop cycles run
    pub iterations: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How the heading loop ended.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum HeadingOutcome {
    /// Heading within tolerance of the target
    Converged,

    /// Stopped through the cancellation token
    Cancelled
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HeadCtrl {
    /// Create a new heading controller using the IMU and manual speed source
    /// from `eqpt`.
    pub fn new(params: Params, eqpt: &Equipment) -> Result<Self, MotionError> {
        params.validate()?;

        Ok(Self {
            params,
            imu: eqpt.imu.clone(),
            manual_speed: eqpt.manual_speed.clone(),
            cancel: CancelToken::new(),
        })
    }

    /// A handle which cancels a running `set_heading`.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Rotate on the spot in `rotation` sense until the heading is within
    /// tolerance of `cardinal`.
    ///
    /// Blocks until the loop converges or the cancellation token is
    /// triggered. Any cancellation requested before the call is discarded.
    /// On every exit path, including errors raised while running, the
    /// rotation is stopped, the motors zeroed and the steering returned to
    /// AFRS.
    pub fn set_heading(
        &mut self,
        steer: &mut SteerCtrl,
        rotation: Rotation,
        cardinal: Cardinal
    ) -> Result<HeadingReport, MotionError> {
        let (imu, pot) = self.check_preconditions(rotation)?;

        self.cancel.reset();

        let target_deg = cardinal.degrees();
        let start_heading_deg = imu.poll()?.heading_deg;

        info!(
            "Aligning to {:?} ({}°) from {:.1}°, rotating {:?}",
            cardinal, target_deg, start_heading_deg, rotation
        );

        let run_result = self.run(
            steer, 
            imu.as_ref(), 
            pot.as_ref(), 
            rotation, 
            target_deg, 
            start_heading_deg
        );

        let restore_result = self.restore(steer);

        let report = run_result?;
        restore_result?;

        match report.outcome {
            HeadingOutcome::Converged => info!(
                "Heading aligned to {:.1}° (error {:.2}°) after {} cycles",
                report.final_heading_deg, report.final_error_deg, report.iterations
            ),
            HeadingOutcome::Cancelled => warn!(
                "Heading alignment cancelled at {:.1}° (error {:.2}°)",
                report.final_heading_deg, report.final_error_deg
            )
        }

        Ok(report)
    }

    fn check_preconditions(
        &self,
        rotation: Rotation
    ) -> Result<(Arc<dyn Imu>, Arc<dyn ManualSpeedSource>), MotionError> {
        let imu = match self.imu {
            Some(ref i) => i.clone(),
            None => return Err(MotionError::PreconditionFailed(
                "heading control requires an IMU".into()
            ))
        };

        if !imu.is_calibrated() {
            return Err(MotionError::PreconditionFailed(
                "heading control requires a calibrated IMU".into()
            ));
        }

        let pot = match self.manual_speed {
            Some(ref p) => p.clone(),
            None => return Err(MotionError::PreconditionFailed(
                "heading control requires a manual speed source".into()
            ))
        };

        if rotation == Rotation::Stopped {
            return Err(MotionError::PreconditionFailed(
                "heading control requires a rotation sense".into()
            ));
        }

        Ok((imu, pot))
    }

    /// The control loop itself.
    fn run(
        &self,
        steer: &mut SteerCtrl,
        imu: &dyn Imu,
        pot: &dyn ManualSpeedSource,
        rotation: Rotation,
        target_deg: f64,
        start_heading_deg: f64
    ) -> Result<HeadingReport, MotionError> {
        let mut heading_deg = start_heading_deg;
        let mut diff_deg = get_ang_dist_deg(heading_deg, target_deg);
        let mut iterations = 0;

        // A leftover stop or halt would hold every command below at zero
        steer.motors.remove_speed_multiplier(STOP);
        steer.motors.remove_speed_multiplier(HALT);

        steer.set_steering_mode(SteeringMode::Rotate)?;
        thread::sleep(secs_to_duration(self.params.settle_delay_s));

        let motors = steer.motors.clone();
        motors.rotate(rotation)?;

        let mut rate = Rate::new(self.params.loop_rate_hz);

        let outcome = loop {
            if self.cancel.is_cancelled() {
                break HeadingOutcome::Cancelled;
            }

            if diff_deg.abs() < self.params.tolerance_deg {
                break HeadingOutcome::Converged;
            }

            heading_deg = imu.poll()?.heading_deg;
            diff_deg = get_ang_dist_deg(heading_deg, target_deg);

            // Rotation sense is fixed by the rotate command, only the
            // magnitude is commanded here.
            let speed = pot.scaled_value() * diff_deg / 180.0;
            let cmd = if speed.abs() < self.params.zero_speed_tol {
                0.0
            }
            else {
                speed.abs()
            };

            motors.set_speed(Orientation::Port, cmd)?;
            motors.set_speed(Orientation::Stbd, cmd)?;

            trace!(
                "Heading {:.2}°, error {:.2}°, speed {:.3}", 
                heading_deg, diff_deg, cmd
            );

            iterations += 1;
            rate.wait();
        };

        Ok(HeadingReport {
            outcome,
            target_deg,
            start_heading_deg,
            final_heading_deg: heading_deg,
            final_error_deg: diff_deg,
            iterations,
        })
    }

    /// Stop rotating and return to AFRS.
    ///
    /// Every step is attempted, the first failure is returned.
    fn restore(&self, steer: &mut SteerCtrl) -> Result<(), MotionError> {
        debug!("Restoring steering after heading control");

        let motors = steer.motors.clone();

        let stop_result = motors.rotate(Rotation::Stopped);
        let zero_result = motors
            .set_speed(Orientation::Port, 0.0)
            .and_then(|_| motors.set_speed(Orientation::Stbd, 0.0));
        let mode_result = steer.set_steering_mode(SteeringMode::Afrs);

        thread::sleep(secs_to_duration(self.params.settle_delay_s));

        stop_result?;
        zero_result?;
        mode_result
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::eqpt::{Imu, MotorCtrl, ServoCtrl};
    use crate::sim::{self, SimEquipment};
    use crate::speed_mult::MultiplierSource;
    use crate::steer_ctrl;
    use std::time::Duration;

    fn head_params() -> Params {
        Params {
            settle_delay_s: 0.0,
            loop_rate_hz: 500.0,
            ..Default::default()
        }
    }

    fn steer_params() -> steer_ctrl::Params {
        steer_ctrl::Params {
            initial_reposition_delay_s: 0.0,
            reposition_duration_s: 0.01,
            reposition_steps: 2,
            ..Default::default()
        }
    }

    fn build(sim_params: sim::Params) -> (SimEquipment, SteerCtrl, HeadCtrl) {
        let sim = SimEquipment::new(&sim_params);
        let steer = SteerCtrl::new(
            steer_params(), 
            sim.drivetrain.clone(), 
            sim.servos.clone()
        ).unwrap();
        let head = HeadCtrl::new(head_params(), &sim.equipment()).unwrap();

        (sim, steer, head)
    }

    #[test]
    fn test_heading_converges() {
        let (sim, mut steer, mut head) = build(sim::Params {
            imu_initial_heading_deg: 10.0,
            imu_rotation_rate_deg_s: 900.0,
            imu_poll_dt_s: 0.05,
            manual_speed: 1.0,
            ..Default::default()
        });
        sim.imu.calibrate().unwrap();

        let report = head
            .set_heading(&mut steer, Rotation::Clockwise, Cardinal::East)
            .unwrap();

        assert_eq!(report.outcome, HeadingOutcome::Converged);
        assert!(report.final_error_deg.abs() < 1.0);
        assert!((sim.imu.heading_deg() - 90.0).abs() < 1.0);
        assert!(report.iterations > 1);

        // Back in AFRS and at rest
        assert_eq!(steer.mode(), Some(SteeringMode::Afrs));
        assert!(!sim.servos.is_rotated());
        assert!(sim.drivetrain.motors().iter().all(|m| m.target_speed() == 0.0));
        assert!(sim.drivetrain.is_stopped());
        assert_eq!(steer.reposition_count(), 2);
    }

    #[test]
    fn test_heading_converges_after_halt() {
        let (sim, mut steer, mut head) = build(sim::Params {
            imu_initial_heading_deg: 10.0,
            imu_rotation_rate_deg_s: 900.0,
            imu_poll_dt_s: 0.05,
            manual_speed: 1.0,
            ..Default::default()
        });
        sim.imu.calibrate().unwrap();

        // Robot previously halted, with zero holds left on every motor
        for m in sim.drivetrain.motors() {
            m.add_speed_multiplier(HALT, MultiplierSource::Static(0.0)).unwrap();
            m.add_speed_multiplier(STOP, MultiplierSource::Static(0.0)).unwrap();
        }

        let token = head.cancel_token();
        let _watchdog = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs(5));
            token.cancel();
        });

        let report = head
            .set_heading(&mut steer, Rotation::Clockwise, Cardinal::East)
            .unwrap();

        assert_eq!(report.outcome, HeadingOutcome::Converged);
        assert!((sim.imu.heading_deg() - 90.0).abs() < 1.0);
        assert!(sim
            .drivetrain
            .motors()
            .iter()
            .all(|m| !m.has_speed_multiplier(HALT) && !m.has_speed_multiplier(STOP)));
        assert_eq!(steer.mode(), Some(SteeringMode::Afrs));
    }

    #[test]
    fn test_heading_cancelled() {
        let (sim, mut steer, mut head) = build(sim::Params {
            imu_initial_heading_deg: 10.0,
            // Heading never changes so only cancellation ends the loop
            imu_rotation_rate_deg_s: 0.0,
            ..Default::default()
        });
        sim.imu.calibrate().unwrap();

        let token = head.cancel_token();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            token.cancel();
        });

        let report = head
            .set_heading(&mut steer, Rotation::CounterClockwise, Cardinal::South)
            .unwrap();
        canceller.join().unwrap();

        assert_eq!(report.outcome, HeadingOutcome::Cancelled);
        assert_eq!(steer.mode(), Some(SteeringMode::Afrs));
        assert!(sim.drivetrain.is_stopped());
    }

    #[test]
    fn test_preconditions() {
        // Uncalibrated IMU
        let (sim, mut steer, mut head) = build(sim::Params::default());
        assert!(matches!(
            head.set_heading(&mut steer, Rotation::Clockwise, Cardinal::North),
            Err(MotionError::PreconditionFailed(_))
        ));
        assert_eq!(steer.mode(), None);
        assert_eq!(steer.reposition_count(), 0);

        // No IMU at all
        let mut eqpt = sim.equipment();
        eqpt.imu = None;
        let mut head = HeadCtrl::new(head_params(), &eqpt).unwrap();
        assert!(matches!(
            head.set_heading(&mut steer, Rotation::Clockwise, Cardinal::North),
            Err(MotionError::PreconditionFailed(_))
        ));

        // No manual speed source
        sim.imu.calibrate().unwrap();
        let mut eqpt = sim.equipment();
        eqpt.manual_speed = None;
        let mut head = HeadCtrl::new(head_params(), &eqpt).unwrap();
        assert!(matches!(
            head.set_heading(&mut steer, Rotation::Clockwise, Cardinal::North),
            Err(MotionError::PreconditionFailed(_))
        ));
    }
}
