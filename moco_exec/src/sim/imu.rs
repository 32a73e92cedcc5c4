//! Simulated IMU

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{Arc, Mutex, MutexGuard};

use comms_if::eqpt::Orientation;
use log::info;
use util::maths::wrap_deg;

use super::{Params, SimDrivetrain};
use crate::eqpt::{Imu, ImuSample, MotorCtrl};
use crate::MotionError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// IMU whose heading follows the drivetrain.
pub struct SimImu {
    drivetrain: Arc<SimDrivetrain>,

    /// Units: degrees/second
    rotation_rate_deg_s: f64,

    /// Units: seconds
    poll_dt_s: f64,

    calibrates: bool,
    calibration_polls: usize,

    state: Mutex<ImuState>
}

#[derive(Debug)]
struct ImuState {
    heading_deg: f64,
    calibration: Option<bool>,

    /// Calibration state queries left before the verdict, `None` when not
    /// calibrating
    polls_left: Option<usize>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimImu {
    pub fn new(params: &Params, drivetrain: Arc<SimDrivetrain>) -> Self {
        Self {
            drivetrain,
            rotation_rate_deg_s: params.imu_rotation_rate_deg_s,
            poll_dt_s: params.imu_poll_dt_s,
            calibrates: params.imu_calibrates,
            calibration_polls: params.imu_calibration_polls,
            state: Mutex::new(ImuState {
                heading_deg: wrap_deg(params.imu_initial_heading_deg),
                calibration: None,
                polls_left: None
            })
        }
    }

    /// Heading without advancing the simulation.
    pub fn heading_deg(&self) -> f64 {
        self.lock().heading_deg
    }

    pub fn set_heading_deg(&self, heading_deg: f64) {
        self.lock().heading_deg = wrap_deg(heading_deg);
    }

    fn lock(&self) -> MutexGuard<'_, ImuState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Imu for SimImu {
    /// Advance the heading by one poll period of the current rotation.
    fn poll(&self) -> Result<ImuSample, MotionError> {
        let port = self.drivetrain.mean_speed(Orientation::Port);
        let stbd = self.drivetrain.mean_speed(Orientation::Stbd);
        let rate = (port - stbd) / 2.0 * self.rotation_rate_deg_s;

        let mut state = self.lock();
        state.heading_deg = wrap_deg(state.heading_deg + rate * self.poll_dt_s);

        Ok(ImuSample {
            heading_deg: state.heading_deg,
            calibrated: state.calibration == Some(true)
        })
    }

    fn calibrate(&self) -> Result<(), MotionError> {
        let mut state = self.lock();
        info!("Simulated IMU calibrating");

        if self.calibration_polls == 0 {
            state.calibration = Some(self.calibrates);
            state.polls_left = None;
        }
        else {
            state.calibration = None;
            state.polls_left = Some(self.calibration_polls);
        }

        Ok(())
    }

    fn calibration_state(&self) -> Option<bool> {
        let mut state = self.lock();

        match state.polls_left {
            Some(n) if n <= 1 => {
                state.polls_left = None;
                state.calibration = Some(self.calibrates);
            },
            Some(n) => state.polls_left = Some(n - 1),
            None => ()
        }

        state.calibration
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::Rotation;

    #[test]
    fn test_heading_follows_rotation() {
        let dt = Arc::new(SimDrivetrain::new());
        let params = Params {
            imu_initial_heading_deg: 350.0,
            imu_rotation_rate_deg_s: 100.0,
            imu_poll_dt_s: 0.1,
            ..Default::default()
        };
        let imu = SimImu::new(&params, dt.clone());

        // Straight driving leaves the heading alone
        dt.set_speed(Orientation::Cntr, 1.0).unwrap();
        assert_eq!(imu.poll().unwrap().heading_deg, 350.0);

        dt.rotate(Rotation::Clockwise).unwrap();
        dt.set_speed(Orientation::Cntr, 0.5).unwrap();
        let sample = imu.poll().unwrap();
        assert!((sample.heading_deg - 355.0).abs() < 1e-9);
        assert!(!sample.calibrated);

        imu.poll().unwrap();
        assert!(imu.poll().unwrap().heading_deg < 10.0);
    }

    #[test]
    fn test_delayed_calibration() {
        let dt = Arc::new(SimDrivetrain::new());
        let params = Params {
            imu_calibration_polls: 2,
            ..Default::default()
        };
        let imu = SimImu::new(&params, dt);

        assert_eq!(imu.calibration_state(), None);
        imu.calibrate().unwrap();
        assert_eq!(imu.calibration_state(), None);
        assert_eq!(imu.calibration_state(), Some(true));
        assert!(imu.is_calibrated());
    }
}
