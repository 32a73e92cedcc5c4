//! Implementations for the MotionCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::thread;
use std::time::Instant;

use comms_if::eqpt::{Cardinal, Orientation, Rotation, SteeringMode};
use log::{info, warn};
use serde::Serialize;
use util::archive::{ArchiveError, Archived, Archiver};
use util::session::{self, Session};
use util::time::{secs_to_duration, Rate};

// Internal
use super::{
    Params, PUSH_BUTTON_PRESS_POLL, PUSH_BUTTON_RELEASE_POLL, STATE_CHANGE_CALLBACK
};
use crate::chadburn::Chadburn;
use crate::eqpt::Equipment;
use crate::head_ctrl::{self, CancelToken, HeadCtrl, HeadingReport};
use crate::steer_ctrl::{self, parse_steering_mode, SteerCtrl};
use crate::steering_angle::SteeringAngle;
use crate::MotionError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Motion control module state
pub struct MotionCtrl {
    pub(crate) params: Params,

    pub(crate) steer: SteerCtrl,
    pub(crate) head: HeadCtrl,
    pub(crate) eqpt: Equipment,

    /// Current speed ladder level
    pub(crate) chadburn: Chadburn,

    /// Last raw value of the left stick's vertical axis
    pub(crate) last_l3_vertical: Option<i32>,

    enabled: bool,
    closed: bool,

    /// IMU calibration verdict from the last check
    calibrated: Option<bool>,

    pub(crate) num_dispatched: usize,

    arch: Archiver,
}

/// Status record archived after each dispatched message.
#[derive(Debug, Clone, Serialize)]
pub struct MotionStatus {
    /// Units: seconds since the session epoch
    pub time_s: f64,

    pub num_dispatched: usize,
    pub steering_mode: Option<SteeringMode>,
    pub steering_angle: SteeringAngle,
    pub afrs_angle_deg: i32,
    pub port_ratio: f64,
    pub stbd_ratio: f64,
    pub chadburn: Chadburn,
    pub port_speed: f64,
    pub stbd_speed: f64,
    pub stopped: bool,
    pub reposition_count: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionCtrl {
    /// Create a new motion controller from its parameters and collaborators.
    ///
    /// Registers the controller's state change callback with the motor
    /// driver, which fails if another controller was already built on the
    /// same driver.
    pub fn new(
        params: Params,
        steer_params: steer_ctrl::Params,
        head_params: head_ctrl::Params,
        eqpt: Equipment
    ) -> Result<Self, MotionError> {
        params.validate()?;

        let initial_mode = match params.initial_steering_mode {
            Some(ref m) => Some(parse_steering_mode(m)?),
            None => None
        };

        let steer = SteerCtrl::new(
            steer_params, 
            eqpt.motors.clone(), 
            eqpt.servos.clone()
        )?;
        let head = HeadCtrl::new(head_params, &eqpt)?;

        eqpt.motors.add_state_change_callback(
            STATE_CHANGE_CALLBACK,
            Box::new(|stopped| {
                if stopped {
                    info!("State: stopped");
                }
                else {
                    info!("State: moving");
                }
            })
        )?;

        let mut ctrl = Self {
            params,
            steer,
            head,
            eqpt,
            chadburn: Chadburn::default(),
            last_l3_vertical: None,
            enabled: false,
            closed: false,
            calibrated: None,
            num_dispatched: 0,
            arch: Archiver::default(),
        };

        if let Some(mode) = initial_mode {
            ctrl.steer.set_steering_mode(mode)?;
        }

        info!("Motion control ready");

        Ok(ctrl)
    }

    /// Initialise the status archive in the session's archive directory.
    pub fn init_archive(&mut self, session: &Session) -> Result<(), ArchiveError> {
        self.arch = Archiver::from_path(session, "motion_ctrl.csv")?;
        Ok(())
    }

    pub fn steer(&self) -> &SteerCtrl {
        &self.steer
    }

    pub fn steer_mut(&mut self) -> &mut SteerCtrl {
        &mut self.steer
    }

    pub fn chadburn(&self) -> Chadburn {
        self.chadburn
    }

    pub fn equipment(&self) -> &Equipment {
        &self.eqpt
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn calibrated(&self) -> Option<bool> {
        self.calibrated
    }

    /// Token cancelling a running heading alignment.
    pub fn cancel_token(&self) -> CancelToken {
        self.head.cancel_token()
    }

    /// Rotate on the spot to face `cardinal`. See `HeadCtrl::set_heading`.
    pub fn set_heading(
        &mut self, 
        rotation: Rotation, 
        cardinal: Cardinal
    ) -> Result<HeadingReport, MotionError> {
        self.head.set_heading(&mut self.steer, rotation, cardinal)
    }

    /// Current status of the controller.
    pub fn status(&self) -> MotionStatus {
        let steer = self.steer.report();
        let motors = &self.eqpt.motors;

        MotionStatus {
            time_s: session::get_elapsed_seconds().unwrap_or(0.0),
            num_dispatched: self.num_dispatched,
            steering_mode: steer.mode,
            steering_angle: steer.steering_angle,
            afrs_angle_deg: steer.afrs_angle_deg,
            port_ratio: steer.port_ratio,
            stbd_ratio: steer.stbd_ratio,
            chadburn: self.chadburn,
            port_speed: motors.mean_speed(Orientation::Port),
            stbd_speed: motors.mean_speed(Orientation::Stbd),
            stopped: motors.is_stopped(),
            reposition_count: steer.reposition_count,
        }
    }

    /// Enable the motors and servos.
    ///
    /// If initial calibration is configured this then blocks until the push
    /// button has been pressed and released, calibrates the IMU and waits
    /// for the calibration verdict.
    pub fn enable(&mut self) -> Result<(), MotionError> {
        if self.closed {
            warn!("Motion control closed, cannot enable");
            return Ok(());
        }

        if self.enabled {
            warn!("Motion control already enabled");
            return Ok(());
        }

        info!("Enabling motion control");

        if !self.eqpt.motors.is_enabled() {
            self.eqpt.motors.enable()?;
        }
        self.eqpt.servos.enable()?;
        self.enabled = true;

        info!("Motion control enabled");

        if self.params.initial_calibration {
            if self.eqpt.imu.is_none() {
                warn!("Initial calibration requested but there is no IMU");
                return Ok(());
            }

            self.wait_for_push_button()?;
            self.calibrate_imu()?;
            self.check_calibration()?;
        }

        Ok(())
    }

    /// Disable the motors and servos, halting first if slow to stop is set.
    pub fn disable(&mut self) -> Result<(), MotionError> {
        if self.closed {
            warn!("Motion control already closed");
            return Ok(());
        }

        if !self.enabled {
            warn!("Motion control already disabled");
            return Ok(());
        }

        if self.params.slow_to_stop {
            self.halt()?;
        }

        info!("Disabling motion control");
        self.eqpt.motors.disable()?;
        self.eqpt.servos.disable()?;
        self.enabled = false;
        info!("Motion control disabled");

        Ok(())
    }

    /// Disable if needed then close the controller. A closed controller
    /// cannot be enabled again.
    pub fn close(&mut self) -> Result<(), MotionError> {
        if self.closed {
            warn!("Motion control already closed");
            return Ok(());
        }

        if self.enabled {
            self.disable()?;
        }

        self.closed = true;
        info!("Motion control closed");

        Ok(())
    }

    /// Start IMU calibration if the IMU is not already calibrated.
    pub fn calibrate_imu(&mut self) -> Result<(), MotionError> {
        match self.eqpt.imu {
            Some(ref imu) if imu.is_calibrated() => {
                info!("IMU already calibrated");
                Ok(())
            },
            Some(ref imu) => {
                info!("Calibrating IMU");
                imu.calibrate()
            },
            None => Err(MotionError::PreconditionFailed(
                "there is no IMU to calibrate".into()
            ))
        }
    }

    /// Poll the IMU until it reports a calibration verdict, returning it.
    ///
    /// Waits forever unless a calibration timeout is configured.
    pub fn check_calibration(&mut self) -> Result<bool, MotionError> {
        let imu = match self.eqpt.imu {
            Some(ref i) => i.clone(),
            None => return Err(MotionError::PreconditionFailed(
                "there is no IMU to check".into()
            ))
        };

        self.calibrated = None;

        let start = Instant::now();
        let mut rate = Rate::new(self.params.calibration_poll_hz);

        let verdict = loop {
            if let Some(v) = imu.calibration_state() {
                break v;
            }

            if let Some(timeout_s) = self.params.calibration_timeout_s {
                if start.elapsed().as_secs_f64() >= timeout_s {
                    return Err(MotionError::CalibrationTimeout(timeout_s));
                }
            }

            rate.wait();
        };

        if verdict {
            info!("IMU calibrated");
        }
        else {
            warn!("IMU calibration failed");
        }

        self.calibrated = Some(verdict);
        Ok(verdict)
    }

    /// Block until the push button has been pressed and released.
    ///
    /// The wait runs on its own thread, joined here.
    fn wait_for_push_button(&self) -> Result<(), MotionError> {
        let button = match self.eqpt.push_button {
            Some(ref b) => b.clone(),
            None => {
                warn!("No push button, continuing without waiting");
                return Ok(());
            }
        };

        let debounce = secs_to_duration(self.params.push_button_debounce_s);

        info!("Waiting for the push button");

        let handle = thread::Builder::new()
            .name("wait-for-push-button".into())
            .spawn(move || {
                while !button.is_pushed() {
                    thread::sleep(PUSH_BUTTON_PRESS_POLL);
                }
                while button.is_pushed() {
                    thread::sleep(PUSH_BUTTON_RELEASE_POLL);
                }
                thread::sleep(debounce);
            })
            .map_err(|e| MotionError::Equipment(format!(
                "could not start the push button thread: {}", e
            )))?;

        handle.join().map_err(|_| MotionError::Equipment(
            "the push button thread panicked".into()
        ))?;

        info!("Push button released");

        Ok(())
    }
}

impl Archived for MotionCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        let status = self.status();
        self.arch.serialise(status)
    }
}
