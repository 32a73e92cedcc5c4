//! Implementations for the SteerCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::cmp::Ordering;
use std::sync::Arc;

use comms_if::eqpt::{Side, SteeringMode};
use log::{debug, error, info};
use serde::Serialize;
use util::maths::{clamp, lin_map};

// Internal
use super::{calc_outer_angle, steering_translation, Params, RAW_AXIS_RANGE, TRANSLATION_RANGE_DEG};
use crate::eqpt::{Motor, MotorCtrl, ServoCtrl};
use crate::speed_mult::{
    MultiplierSource, RatioSlot, PORT_RATIO, STBD_RATIO, STEERING, STOP
};
use crate::steering_angle::SteeringAngle;
use crate::MotionError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Multipliers removed before the servos are repositioned.
const REPOSITION_STRIPPED: [&str; 4] = [STEERING, STOP, PORT_RATIO, STBD_RATIO];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Steering control module state
pub struct SteerCtrl {
    pub(crate) params: Params,

    pub(crate) motors: Arc<dyn MotorCtrl>,
    pub(crate) servos: Arc<dyn ServoCtrl>,

    /// Current steering mode, `None` until the first mode is set
    pub(crate) mode: Option<SteeringMode>,

    /// Preset selected with the d-pad
    pub(crate) steering_angle: SteeringAngle,

    /// Last inner angle applied to the servos
    ///
    /// Units: degrees, clockwise positive
    pub(crate) afrs_angle_deg: i32,

    pub(crate) port_ratio: RatioSlot,
    pub(crate) stbd_ratio: RatioSlot,

    pub(crate) reposition_count: usize,
}

/// Status report for SteerCtrl.
#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
pub struct StatusReport {
    pub mode: Option<SteeringMode>,
    pub steering_angle: SteeringAngle,
    pub afrs_angle_deg: i32,
    pub port_ratio: f64,
    pub stbd_ratio: f64,
    pub reposition_count: usize,
}

/// Multipliers taken off one motor, kept so they can be put back.
type Stripped = Vec<(Arc<Motor>, Vec<(String, MultiplierSource)>)>;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SteerCtrl {
    /// Create a new steering controller.
    ///
    /// The steering mode starts unset, the first call to `set_steering_mode`
    /// decides it.
    pub fn new(
        params: Params,
        motors: Arc<dyn MotorCtrl>,
        servos: Arc<dyn ServoCtrl>
    ) -> Result<Self, MotionError> {
        params.validate()?;

        Ok(Self {
            params,
            motors,
            servos,
            mode: None,
            steering_angle: SteeringAngle::StraightAhead,
            afrs_angle_deg: 0,
            port_ratio: RatioSlot::new(1.0),
            stbd_ratio: RatioSlot::new(1.0),
            reposition_count: 0,
        })
    }

    pub fn mode(&self) -> Option<SteeringMode> {
        self.mode
    }

    pub fn steering_angle(&self) -> SteeringAngle {
        self.steering_angle
    }

    pub fn afrs_angle_deg(&self) -> i32 {
        self.afrs_angle_deg
    }

    pub fn port_ratio(&self) -> f64 {
        self.port_ratio.get()
    }

    pub fn stbd_ratio(&self) -> f64 {
        self.stbd_ratio.get()
    }

    /// Number of completed repositions.
    pub fn reposition_count(&self) -> usize {
        self.reposition_count
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn report(&self) -> StatusReport {
        StatusReport {
            mode: self.mode,
            steering_angle: self.steering_angle,
            afrs_angle_deg: self.afrs_angle_deg,
            port_ratio: self.port_ratio(),
            stbd_ratio: self.stbd_ratio(),
            reposition_count: self.reposition_count,
        }
    }

    /// Change the steering mode.
    ///
    /// Does nothing if already in `target`. If the servos are already in the
    /// right mechanical position (rotated or not) the mode is committed
    /// without a reposition. Otherwise the steering, stop and AFRS ratio
    /// multipliers are removed and the reposition protocol is run. If the
    /// reposition fails the removed multipliers are put back and the
    /// previous mode is kept.
    pub fn set_steering_mode(&mut self, target: SteeringMode) -> Result<(), MotionError> {
        if self.mode == Some(target) {
            debug!("No change, already in steering mode {:?}", target);
            return Ok(());
        }

        if target.is_rotated() == self.servos.is_rotated() {
            info!(
                "Servos already positioned for {:?}, no reposition required",
                target
            );
        }
        else {
            info!("Changing steering mode from {:?} to {:?}", self.mode, target);

            let stripped = self.strip_multipliers();

            if let Err(e) = self.reposition(target) {
                error!("Could not change steering mode to {:?}: {}", target, e);
                restore_multipliers(stripped);
                return Err(e);
            }

            // The servos are now straight or rotated, whatever was steered
            // before is gone.
            self.reset_afrs();
        }

        self.commit_multipliers(target)?;
        self.mode = Some(target);

        info!("Steering mode: {:?}", target);

        Ok(())
    }

    /// Reinstall the current mode's multipliers, for instance after all
    /// multipliers have been cleared.
    pub fn recommit_multipliers(&mut self) -> Result<(), MotionError> {
        match self.mode {
            Some(m) => self.commit_multipliers(m),
            None => Ok(())
        }
    }

    /// Step the steering angle preset by one in `direction` (-1 counter
    /// clockwise, +1 clockwise), switching to AFRS if needed.
    ///
    /// Steps beyond the end presets are ignored.
    pub fn increment_steering_angle(&mut self, direction: i32) -> Result<(), MotionError> {
        if direction != 1 && direction != -1 {
            debug!("Ignoring steering angle increment of {}", direction);
            return Ok(());
        }

        if self.mode != Some(SteeringMode::Afrs) {
            self.set_steering_mode(SteeringMode::Afrs)?;
        }

        match self.steering_angle.step(direction) {
            Some(angle) => {
                info!(
                    "Steering angle {} -> {} ({}°)", 
                    self.steering_angle, angle, angle.degrees()
                );
                self.apply_inner_angle(angle.degrees())?;
                self.steering_angle = angle;
            },
            None => info!(
                "Ignoring steering angle step past {} ({}°)",
                self.steering_angle, self.steering_angle.degrees()
            )
        }

        Ok(())
    }

    /// Set the AFRS inner angle from a raw analog axis value (0 to 255),
    /// mapped linearly onto -45° to 45°.
    pub fn set_afrs_steering_angle(&mut self, raw_value: i32) -> Result<(), MotionError> {
        let inner = lin_map(
            RAW_AXIS_RANGE,
            (-TRANSLATION_RANGE_DEG, TRANSLATION_RANGE_DEG),
            raw_value as f64
        ).trunc() as i32;

        if self.mode != Some(SteeringMode::Afrs) {
            self.set_steering_mode(SteeringMode::Afrs)?;
        }

        self.apply_inner_angle(inner)
    }

    /// Apply an inner steering angle.
    ///
    /// The angle is clamped to the configured maximum. Negative angles turn
    /// counter clockwise with the port side on the inside, positive angles
    /// turn clockwise with starboard inside. The inner side's speed ratio
    /// follows `steering_translation` and the outer side runs at 1.0.
    ///
    /// Applying the same angle again changes nothing except resetting both
    /// ratios to 1.0.
    pub fn apply_inner_angle(&mut self, inner_angle_deg: i32) -> Result<(), MotionError> {
        let max = self.params.afrs_max_angle_deg;
        let inner = clamp(&(inner_angle_deg as f64), &-max, &max).trunc() as i32;

        if inner == self.afrs_angle_deg {
            debug!("Inner angle unchanged at {}°, ratios reset", inner);
            self.port_ratio.set(1.0);
            self.stbd_ratio.set(1.0);
            return Ok(());
        }

        self.set_steering_mode(SteeringMode::Afrs)?;

        let inner_abs = inner.abs() as f64;
        let outer = calc_outer_angle(&self.params, inner_abs).trunc();

        let (port_angle, stbd_angle, port_ratio, stbd_ratio, direction) = 
            match inner.cmp(&0) {
                Ordering::Equal => (0.0, 0.0, 1.0, 1.0, "ahead"),
                Ordering::Less => (
                    inner as f64, 
                    outer, 
                    steering_translation(&self.params, inner_abs), 
                    1.0, 
                    "counter-clockwise"
                ),
                Ordering::Greater => (
                    outer, 
                    inner as f64, 
                    1.0, 
                    steering_translation(&self.params, inner_abs), 
                    "clockwise"
                )
            };

        self.servos.set_afrs_angle(port_angle, stbd_angle)?;

        self.port_ratio.set(port_ratio);
        self.stbd_ratio.set(stbd_ratio);
        self.afrs_angle_deg = inner;

        info!(
            "Turning {}: inner {}°, port {}° (ratio {:.2}), stbd {}° (ratio {:.2})",
            direction, inner, port_angle, port_ratio, stbd_angle, stbd_ratio
        );

        Ok(())
    }

    /// Install or remove the multipliers belonging to `mode`.
    ///
    /// AFRS puts each motor's side ratio on it, the other modes carry no
    /// ratios.
    fn commit_multipliers(&self, mode: SteeringMode) -> Result<(), MotionError> {
        for motor in self.motors.motors() {
            match mode {
                SteeringMode::Afrs => {
                    let (name, slot) = match motor.orientation().side() {
                        Side::Port => (PORT_RATIO, self.port_ratio.clone()),
                        Side::Stbd => (STBD_RATIO, self.stbd_ratio.clone()),
                        Side::Cntr => return Err(MotionError::InvalidConfiguration(
                            format!(
                                "motor at {:?} has no side for AFRS steering", 
                                motor.orientation()
                            )
                        ))
                    };

                    if !motor.has_speed_multiplier(name) {
                        motor.add_speed_multiplier(name, MultiplierSource::Slot(slot))?;
                    }
                },
                SteeringMode::Rotate | SteeringMode::Skid => {
                    motor.remove_speed_multiplier(PORT_RATIO);
                    motor.remove_speed_multiplier(STBD_RATIO);
                }
            }
        }

        Ok(())
    }

    /// Take the mode specific multipliers off every motor.
    ///
    /// Each motor is stripped under its own lock, so a speed command never
    /// sees a partly stripped motor.
    fn strip_multipliers(&self) -> Stripped {
        self.motors.motors()
            .into_iter()
            .map(|motor| {
                let removed = motor.with_state(|s| {
                    REPOSITION_STRIPPED
                        .iter()
                        .filter_map(|name| {
                            s.multipliers.remove(name).map(|src| (name.to_string(), src))
                        })
                        .collect::<Vec<_>>()
                });

                if !removed.is_empty() {
                    info!(
                        "Removed {:?} multipliers from the {} motor", 
                        removed.iter().map(|r| r.0.as_str()).collect::<Vec<_>>(),
                        motor.orientation().label()
                    );
                }

                (motor, removed)
            })
            .collect()
    }

    fn reset_afrs(&mut self) {
        self.afrs_angle_deg = 0;
        self.steering_angle = SteeringAngle::StraightAhead;
        self.port_ratio.set(1.0);
        self.stbd_ratio.set(1.0);
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Put stripped multipliers back on their motors.
///
/// A multiplier installed in the meantime under the same name is kept.
fn restore_multipliers(stripped: Stripped) {
    for (motor, removed) in stripped {
        motor.with_state(|s| {
            for (name, src) in removed {
                if !s.multipliers.contains(&name) {
                    // Cannot clash, the name is absent
                    let _ = s.multipliers.install(&name, src);
                }
            }
        });

        debug!(
            "Restored multipliers on the {} motor: {:?}", 
            motor.orientation().label(), motor.speed_multiplier_names()
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::{self, DrivetrainFault, ServoCommand, SimEquipment};
    use comms_if::eqpt::Orientation;

    fn test_params() -> Params {
        Params {
            initial_reposition_delay_s: 0.0,
            reposition_duration_s: 0.02,
            reposition_steps: 2,
            ..Default::default()
        }
    }

    fn build() -> (SimEquipment, SteerCtrl) {
        let sim = SimEquipment::new(&sim::Params::default());
        let sc = SteerCtrl::new(
            test_params(), 
            sim.drivetrain.clone(), 
            sim.servos.clone()
        ).unwrap();

        (sim, sc)
    }

    #[test]
    fn test_invalid_params() {
        let sim = SimEquipment::new(&sim::Params::default());
        let params = Params { wheel_base_mm: -1.0, ..test_params() };

        assert!(matches!(
            SteerCtrl::new(params, sim.drivetrain.clone(), sim.servos.clone()),
            Err(MotionError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_set_mode_is_idempotent() {
        let (sim, mut sc) = build();

        sc.set_steering_mode(SteeringMode::Rotate).unwrap();
        sc.set_steering_mode(SteeringMode::Rotate).unwrap();

        assert_eq!(sc.reposition_count(), 1);
        assert_eq!(sc.mode(), Some(SteeringMode::Rotate));
        assert!(sim.servos.is_rotated());
        assert_eq!(sim.drivetrain.reposition_count(), 1);

        // Motors are left at rest after the ramp
        assert!(sim.drivetrain.is_stopped());
    }

    #[test]
    fn test_no_reposition_when_already_positioned() {
        let (sim, mut sc) = build();

        // Servos start straight so AFRS needs no reposition
        sc.set_steering_mode(SteeringMode::Afrs).unwrap();
        assert_eq!(sc.reposition_count(), 0);

        for m in sim.drivetrain.motors() {
            let expected = match m.orientation().side() {
                Side::Port => PORT_RATIO,
                _ => STBD_RATIO
            };
            assert_eq!(m.speed_multiplier_names(), vec![expected.to_string()]);
        }

        // Skid is also straight, ratios come off without a reposition
        sc.set_steering_mode(SteeringMode::Skid).unwrap();
        assert_eq!(sc.reposition_count(), 0);
        assert!(sim.drivetrain.motors().iter().all(|m| m.speed_multiplier_names().is_empty()));
    }

    #[test]
    fn test_transition_strips_multipliers() {
        let (sim, mut sc) = build();
        sc.set_steering_mode(SteeringMode::Afrs).unwrap();

        for m in sim.drivetrain.motors() {
            m.add_speed_multiplier(STOP, MultiplierSource::Static(0.0)).unwrap();
            m.add_speed_multiplier(STEERING, MultiplierSource::Static(1.0)).unwrap();
        }

        sc.set_steering_mode(SteeringMode::Rotate).unwrap();

        for m in sim.drivetrain.motors() {
            assert!(m.speed_multiplier_names().is_empty());
        }
    }

    #[test]
    fn test_failed_reposition_keeps_mode() {
        let (sim, mut sc) = build();
        sc.set_steering_mode(SteeringMode::Afrs).unwrap();
        sc.apply_inner_angle(15).unwrap();
        let ratio = sc.stbd_ratio();

        sim.servos.fail_next_mode_change();
        assert!(sc.set_steering_mode(SteeringMode::Rotate).is_err());

        assert_eq!(sc.mode(), Some(SteeringMode::Afrs));
        assert_eq!(sc.afrs_angle_deg(), 15);
        assert_eq!(sc.stbd_ratio(), ratio);
        assert!(!sim.servos.is_rotated());

        for m in sim.drivetrain.motors() {
            assert_eq!(m.speed_multiplier_names().len(), 1);
        }

        // And the motors were still brought to rest
        assert!(sim.drivetrain.is_stopped());
    }

    #[test]
    fn test_failed_ramp_keeps_mode() {
        let faults = [
            DrivetrainFault::RepositionRefused,
            DrivetrainFault::RampSpeed,
            DrivetrainFault::RampPanic,
        ];

        for fault in faults.iter() {
            let (sim, mut sc) = build();
            sc.set_steering_mode(SteeringMode::Afrs).unwrap();
            sc.apply_inner_angle(-15).unwrap();
            let ratio = sc.port_ratio();

            for m in sim.drivetrain.motors() {
                m.add_speed_multiplier(STOP, MultiplierSource::Static(0.0)).unwrap();
            }

            sim.drivetrain.inject_fault(*fault);
            assert!(
                matches!(
                    sc.set_steering_mode(SteeringMode::Rotate),
                    Err(MotionError::RepositionFailed(_))
                ),
                "{:?} not reported as a failed reposition", fault
            );

            assert_eq!(sc.mode(), Some(SteeringMode::Afrs));
            assert_eq!(sc.afrs_angle_deg(), -15);
            assert_eq!(sc.port_ratio(), ratio);
            assert_eq!(sc.reposition_count(), 0);

            // Stripped multipliers are back in place
            for m in sim.drivetrain.motors() {
                let ratio_name = match m.orientation().side() {
                    Side::Port => PORT_RATIO,
                    _ => STBD_RATIO
                };
                assert!(m.has_speed_multiplier(STOP));
                assert!(m.has_speed_multiplier(ratio_name));
            }

            // Motors at rest and the drivetrain free for the next reposition
            assert!(sim.drivetrain.is_stopped());
            assert_eq!(sim.drivetrain.repositioning(), None);
        }
    }

    #[test]
    fn test_counter_clockwise_turn() {
        let (sim, mut sc) = build();
        sc.set_steering_mode(SteeringMode::Afrs).unwrap();

        sc.apply_inner_angle(-20).unwrap();

        let expected_ratio = steering_translation(&sc.params, 20.0);
        assert!(expected_ratio < 1.0);
        assert_eq!(sc.port_ratio(), expected_ratio);
        assert_eq!(sc.stbd_ratio(), 1.0);

        let outer = calc_outer_angle(&sc.params, 20.0).trunc();
        assert_eq!(
            sim.servos.last_command(),
            Some(ServoCommand::Afrs { port_deg: -20.0, stbd_deg: outer })
        );

        // The port motors run slower than starboard
        sim.drivetrain.set_speed(Orientation::Cntr, 0.5).unwrap();
        let pfor = sim.drivetrain.get_motor(Orientation::Pfor).unwrap();
        let sfor = sim.drivetrain.get_motor(Orientation::Sfor).unwrap();
        assert!((pfor.output_speed() - 0.5 * expected_ratio).abs() < 1e-12);
        assert_eq!(sfor.output_speed(), 0.5);
    }

    #[test]
    fn test_repeated_angle_resets_ratios() {
        let (_sim, mut sc) = build();
        sc.apply_inner_angle(25).unwrap();
        assert!(sc.stbd_ratio() < 1.0);

        sc.apply_inner_angle(25).unwrap();
        assert_eq!(sc.port_ratio(), 1.0);
        assert_eq!(sc.stbd_ratio(), 1.0);
        assert_eq!(sc.afrs_angle_deg(), 25);
    }

    #[test]
    fn test_inner_angle_clamped() {
        let sim = SimEquipment::new(&sim::Params::default());
        let params = Params { afrs_max_angle_deg: 30.0, ..test_params() };
        let mut sc = SteerCtrl::new(params, sim.drivetrain.clone(), sim.servos.clone()).unwrap();

        sc.apply_inner_angle(-45).unwrap();
        assert_eq!(sc.afrs_angle_deg(), -30);
    }

    #[test]
    fn test_analog_steering() {
        let (sim, mut sc) = build();

        sc.set_afrs_steering_angle(255).unwrap();
        assert_eq!(sc.mode(), Some(SteeringMode::Afrs));
        assert_eq!(sc.afrs_angle_deg(), 45);

        sc.set_afrs_steering_angle(0).unwrap();
        assert_eq!(sc.afrs_angle_deg(), -45);
        match sim.servos.last_command() {
            Some(ServoCommand::Afrs { port_deg, .. }) => assert_eq!(port_deg, -45.0),
            c => panic!("Expected an AFRS command, got {:?}", c)
        }
    }

    #[test]
    fn test_increment_steering_angle_clamps() {
        let (sim, mut sc) = build();
        sc.set_steering_mode(SteeringMode::Rotate).unwrap();

        // Switches back to AFRS before stepping
        sc.increment_steering_angle(1).unwrap();
        assert_eq!(sc.mode(), Some(SteeringMode::Afrs));
        assert_eq!(sc.steering_angle(), SteeringAngle::Clockwise5);
        assert_eq!(sc.afrs_angle_deg(), 5);

        for _ in 0..10 {
            sc.increment_steering_angle(1).unwrap();
        }
        assert_eq!(sc.steering_angle(), SteeringAngle::Clockwise45);
        assert_eq!(sc.afrs_angle_deg(), 45);

        for _ in 0..20 {
            sc.increment_steering_angle(-1).unwrap();
        }
        assert_eq!(sc.steering_angle(), SteeringAngle::CounterClockwise45);

        // Values other than -1/+1 are ignored
        let commands = sim.servos.commands().len();
        sc.increment_steering_angle(0).unwrap();
        assert_eq!(sim.servos.commands().len(), commands);
    }
}
