//! Message dispatch
//!
//! Each message goes to exactly one handler, chosen from its event group
//! first and then from the event itself. Button events act on release
//! (value 0). After handling, successful or not, the message is forwarded.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::Rotation;
use comms_if::evt::{Event, EventGroup, EventValue, Message, CRITICAL_CONTACT_PRIORITY};
use log::{debug, info, trace, warn};

use super::MotionCtrl;
use crate::MotionError;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionCtrl {
    /// Handle a message then pass it on to the forwarder.
    ///
    /// The forwarder always receives the message once local handling has
    /// finished. Any handling error is returned after forwarding.
    pub fn dispatch(&mut self, msg: &Message) -> Result<(), MotionError> {
        debug!("Dispatching {:?} ({:?})", msg.event, msg.value);

        let result = self.handle(msg);
        self.num_dispatched += 1;

        if let Some(ref forwarder) = self.eqpt.forwarder {
            forwarder.forward(msg);
        }

        result
    }

    fn handle(&mut self, msg: &Message) -> Result<(), MotionError> {
        if msg.event.group() == EventGroup::Bumper {
            return self.handle_bumper(msg);
        }

        let value = match msg.int_value() {
            Some(v) => v,
            None => {
                warn!("{:?} event carries no value, ignored", msg.event);
                return Ok(());
            }
        };

        match msg.event.group() {
            EventGroup::Stop => return self.handle_stop(msg.event, value),
            EventGroup::Imu => return self.handle_imu(msg.event),
            _ => ()
        }

        match msg.event {
            Event::Shutdown
            | Event::ButtonA
            | Event::ButtonB
            | Event::ButtonL1
            | Event::ButtonR1
            | Event::ButtonL2
            | Event::ButtonR2
            | Event::ButtonHome if value != 0 => {
                trace!("{:?} pressed, waiting for release", msg.event);
                Ok(())
            },
            Event::Shutdown => {
                info!("Shutting down");
                self.disable()?;
                self.close()
            },
            Event::ButtonA => self.execute_task(),
            Event::ButtonB => self.halt(),
            Event::ButtonL1 => self.rotate(Rotation::CounterClockwise),
            Event::ButtonR1 => self.rotate(Rotation::Clockwise),
            Event::ButtonL2 => {
                info!("Recentering servos");
                self.eqpt.servos.recenter()
            },
            Event::ButtonR2 => self.brake(),
            Event::ButtonHome => self.home(),
            Event::ButtonStart | Event::ButtonSelect => {
                info!("Handling {:?}, value {}", msg.event, value);
                Ok(())
            },
            Event::DpadLeft | Event::DpadRight => self.steer.increment_steering_angle(value),
            Event::DpadUp | Event::DpadDown => self.increment_speed(value),
            Event::L3Vertical => {
                if self.last_l3_vertical == Some(value) {
                    return Ok(());
                }
                self.change_speed(value)?;
                self.last_l3_vertical = Some(value);
                Ok(())
            },
            Event::L3Horizontal => {
                warn!("Unexpected L3 horizontal event, value {}", value);
                Ok(())
            },
            Event::R3Vertical => {
                debug!("Ignoring R3 vertical, value {}", value);
                Ok(())
            },
            Event::R3Horizontal => self.steer.set_afrs_steering_angle(value),
            _ => {
                warn!("Unrecognised event {:?}, value {}", msg.event, value);
                Ok(())
            }
        }
    }

    /// Stop group events act on value 0, and only when moving.
    fn handle_stop(&mut self, event: Event, value: i32) -> Result<(), MotionError> {
        if value != 0 {
            trace!("Ignoring {:?} with value {}", event, value);
            return Ok(());
        }

        if self.eqpt.motors.is_stopped() {
            info!("Already stopped, ignoring {:?}", event);
            return Ok(());
        }

        match event {
            Event::EmergencyStop => self.emergency_stop(),
            Event::Halt => self.halt(),
            Event::Brake => self.brake(),
            _ => self.stop()
        }
    }

    /// Any critical contact halts, other contacts stop.
    fn handle_bumper(&mut self, msg: &Message) -> Result<(), MotionError> {
        let contacts = match msg.value {
            EventValue::Bumper(ref c) => c,
            EventValue::Value(v) => {
                warn!("Bumper event without contacts, value {}", v);
                return Ok(());
            }
        };

        if contacts.contacts.is_empty() {
            debug!("Empty bumper event");
            return Ok(());
        }

        // Most severe contact of the batch decides
        let severity = contacts.contacts
            .iter()
            .map(|c| c.priority())
            .max()
            .unwrap_or(0);

        info!(
            "Bumper contacts {:?}, fop {} cm, fos {} cm, severity {}",
            contacts.contacts, contacts.fop_cm, contacts.fos_cm, severity
        );

        if severity >= CRITICAL_CONTACT_PRIORITY {
            self.halt()
        }
        else {
            self.stop()
        }
    }

    /// IMU alerts stop a moving robot. A stopped robot is presumed to be
    /// handled by someone.
    fn handle_imu(&mut self, event: Event) -> Result<(), MotionError> {
        if self.eqpt.motors.is_stopped() {
            info!("Already stopped, ignoring {:?}", event);
            return Ok(());
        }

        warn!("IMU alert {:?}, stopping", event);
        self.stop()
    }
}

#[cfg(test)]
mod test {
    use super::super::test_util::build;
    use super::super::Task;
    use super::*;
    use crate::chadburn::Chadburn;
    use crate::eqpt::{Imu, MotorCtrl};
    use crate::sim::{self, ServoCommand, StopAction};
    use crate::speed_mult::STEERING;
    use comms_if::eqpt::{Cardinal, Orientation, SteeringMode};
    use comms_if::evt::BumperContact;

    #[test]
    fn test_bumper_priority() {
        let (sim, mut ctrl) = build(sim::Params::default());

        ctrl.dispatch(&Message::bumper(vec![
            BumperContact::PortFwd,
            BumperContact::FwdObliquePort,
            BumperContact::Cntr,
        ])).unwrap();
        assert_eq!(sim.stop_handler.actions(), vec![StopAction::Halt]);

        ctrl.dispatch(&Message::bumper(vec![
            BumperContact::PortFwd, 
            BumperContact::Mast
        ])).unwrap();
        assert_eq!(
            sim.stop_handler.actions(), 
            vec![StopAction::Halt, StopAction::Stop]
        );

        // A lone critical contact is enough
        ctrl.dispatch(&Message::bumper(vec![BumperContact::FwdObliqueStbd])).unwrap();
        assert_eq!(
            sim.stop_handler.actions(), 
            vec![StopAction::Halt, StopAction::Stop, StopAction::Halt]
        );
    }

    #[test]
    fn test_stop_group() {
        let (sim, mut ctrl) = build(sim::Params::default());

        // Already stopped
        ctrl.dispatch(&Message::new(Event::Stop, 0)).unwrap();
        assert!(sim.stop_handler.actions().is_empty());

        sim.drivetrain.set_speed(Orientation::Cntr, 0.5).unwrap();

        // Non-zero value ignored
        ctrl.dispatch(&Message::new(Event::Brake, 1)).unwrap();
        assert!(sim.stop_handler.actions().is_empty());

        ctrl.dispatch(&Message::new(Event::Brake, 0)).unwrap();
        assert_eq!(sim.stop_handler.actions(), vec![StopAction::Brake]);
    }

    #[test]
    fn test_imu_alert() {
        let (sim, mut ctrl) = build(sim::Params::default());

        ctrl.dispatch(&Message::new(Event::ImuOverPitch, 1)).unwrap();
        assert!(sim.stop_handler.actions().is_empty());

        sim.drivetrain.set_speed(Orientation::Cntr, 0.5).unwrap();
        ctrl.dispatch(&Message::new(Event::ImuOverRoll, 1)).unwrap();
        assert_eq!(sim.stop_handler.actions(), vec![StopAction::Stop]);
    }

    #[test]
    fn test_every_message_forwarded() {
        let (sim, mut ctrl) = build(sim::Params::default());
        let msgs = vec![
            Message::new(Event::Noop, 3),
            Message::new(Event::L3Horizontal, 12),
            Message::new(Event::DpadUp, -1),
            Message::new(Event::ButtonStart, 0),
        ];

        for m in msgs.iter() {
            ctrl.dispatch(m).unwrap();
        }

        assert_eq!(sim.forwarder.messages(), msgs);
        assert_eq!(ctrl.status().num_dispatched, 4);
    }

    #[test]
    fn test_failed_handling_still_forwarded() {
        let (sim, mut ctrl) = build(sim::Params::default());
        ctrl.steer_mut().set_steering_mode(SteeringMode::Rotate).unwrap();

        // Stepping the steering angle needs a reposition back to AFRS
        sim.servos.fail_next_mode_change();
        let msg = Message::new(Event::DpadRight, 1);
        assert!(ctrl.dispatch(&msg).is_err());

        assert_eq!(ctrl.steer().mode(), Some(SteeringMode::Rotate));
        assert_eq!(sim.forwarder.messages(), vec![msg]);
    }

    #[test]
    fn test_dpad_and_sticks() {
        let (sim, mut ctrl) = build(sim::Params::default());

        ctrl.dispatch(&Message::new(Event::DpadRight, 1)).unwrap();
        assert_eq!(ctrl.steer().afrs_angle_deg(), 5);
        ctrl.dispatch(&Message::new(Event::DpadLeft, -1)).unwrap();
        ctrl.dispatch(&Message::new(Event::DpadLeft, -1)).unwrap();
        assert_eq!(ctrl.steer().afrs_angle_deg(), -5);

        ctrl.dispatch(&Message::new(Event::DpadUp, -1)).unwrap();
        assert_eq!(ctrl.chadburn(), Chadburn::DeadSlowAhead);
        ctrl.dispatch(&Message::new(Event::DpadDown, 1)).unwrap();
        assert_eq!(ctrl.chadburn(), Chadburn::Stop);

        ctrl.dispatch(&Message::new(Event::R3Horizontal, 0)).unwrap();
        assert_eq!(ctrl.steer().afrs_angle_deg(), -45);
        assert!(matches!(
            sim.servos.last_command(),
            Some(ServoCommand::Afrs { port_deg, .. }) if port_deg == -45.0
        ));

        // Only changes of the left stick are acted on
        let pfor = sim.drivetrain.get_motor(Orientation::Pfor).unwrap();
        ctrl.dispatch(&Message::new(Event::L3Vertical, 0)).unwrap();
        let after_first = pfor.target_speed();
        assert!(after_first > 0.0);
        ctrl.dispatch(&Message::new(Event::L3Vertical, 0)).unwrap();
        assert_eq!(pfor.target_speed(), after_first);
    }

    #[test]
    fn test_buttons() {
        let (sim, mut ctrl) = build(sim::Params::default());

        // Press is ignored, release acts
        ctrl.dispatch(&Message::new(Event::ButtonR1, 1)).unwrap();
        assert!(!sim.drivetrain.get_motor(Orientation::Pfor).unwrap().has_speed_multiplier(STEERING));
        ctrl.dispatch(&Message::new(Event::ButtonR1, 0)).unwrap();
        assert!(sim.drivetrain.get_motor(Orientation::Pfor).unwrap().has_speed_multiplier(STEERING));

        ctrl.dispatch(&Message::new(Event::ButtonB, 0)).unwrap();
        ctrl.dispatch(&Message::new(Event::ButtonR2, 0)).unwrap();
        assert_eq!(
            sim.stop_handler.actions(), 
            vec![StopAction::Halt, StopAction::Brake]
        );

        ctrl.dispatch(&Message::new(Event::ButtonL2, 0)).unwrap();
        assert_eq!(sim.servos.last_command(), Some(ServoCommand::Recenter));

        ctrl.enable().unwrap();
        ctrl.dispatch(&Message::new(Event::Shutdown, 0)).unwrap();
        assert!(ctrl.is_closed());
    }

    #[test]
    fn test_align_heading_task() {
        let (sim, mut ctrl) = build(sim::Params {
            imu_initial_heading_deg: 10.0,
            imu_rotation_rate_deg_s: 900.0,
            manual_speed: 1.0,
            selected_task: Task::AlignHeading(Cardinal::East),
            ..Default::default()
        });
        sim.imu.calibrate().unwrap();

        ctrl.dispatch(&Message::new(Event::ButtonA, 0)).unwrap();

        assert!((sim.imu.heading_deg() - 90.0).abs() < 1.0);
        assert_eq!(ctrl.steer().mode(), Some(SteeringMode::Afrs));
        assert!(sim.drivetrain.is_stopped());
    }
}
