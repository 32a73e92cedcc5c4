//! Simulated peripherals: manual speed, stop handling, push button, task
//! selection and message forwarding

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use comms_if::eqpt::Orientation;
use comms_if::evt::Message;
use log::debug;
use serde::Serialize;

use super::SimDrivetrain;
use crate::eqpt::{
    CompletionCallback, ManualSpeedSource, MessageForwarder, MotorCtrl, PushButton, 
    StopHandler, TaskSelector
};
use crate::motion_ctrl::Task;
use crate::speed_mult::{MultiplierSource, RatioSlot, HALT, STOP};
use crate::MotionError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Manual speed source holding a fixed, settable value.
#[derive(Debug)]
pub struct FixedManualSpeed(RatioSlot);

/// Stop handler acting directly on the simulated drivetrain.
pub struct SimStopHandler {
    drivetrain: Arc<SimDrivetrain>,
    actions: Mutex<Vec<StopAction>>
}

/// Button pressed after a fixed number of polls, held for a fixed number of
/// polls.
#[derive(Debug)]
pub struct SimPushButton {
    polls: AtomicUsize,
    press_after: usize,
    hold: usize
}

#[derive(Debug)]
pub struct FixedTaskSelector {
    selection: Mutex<Task>
}

/// Forwarder keeping every message it receives.
#[derive(Debug, Default)]
pub struct RecordingForwarder {
    messages: Mutex<Vec<Message>>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopAction {
    Stop,
    Halt,
    Brake,
    EmergencyStop
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FixedManualSpeed {
    pub fn new(value: f64) -> Self {
        Self(RatioSlot::new(value))
    }

    pub fn set(&self, value: f64) {
        self.0.set(value)
    }
}

impl ManualSpeedSource for FixedManualSpeed {
    fn scaled_value(&self) -> f64 {
        self.0.get().max(0.0).min(1.0)
    }
}

impl SimStopHandler {
    pub fn new(drivetrain: Arc<SimDrivetrain>) -> Self {
        Self {
            drivetrain,
            actions: Mutex::new(Vec::new())
        }
    }

    /// Every action taken so far, oldest first.
    pub fn actions(&self) -> Vec<StopAction> {
        self.actions.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Zero the motors and hold them with the named zero multipliers.
    fn act(
        &self, 
        action: StopAction, 
        holds: &[&str], 
        on_complete: Option<CompletionCallback>
    ) -> Result<(), MotionError> {
        debug!("Simulated {:?}", action);

        for m in self.drivetrain.motors() {
            m.with_state(|s| {
                s.target_speed = 0.0;
                for name in holds {
                    if !s.multipliers.contains(name) {
                        s.multipliers.install(name, MultiplierSource::Static(0.0))?;
                    }
                }
                Ok::<(), MotionError>(())
            })?;
        }

        // Goes through the driver so state change callbacks fire
        self.drivetrain.set_speed(Orientation::Cntr, 0.0)?;

        self.actions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(action);

        if let Some(cb) = on_complete {
            cb();
        }

        Ok(())
    }
}

impl StopHandler for SimStopHandler {
    fn stop(&self, on_complete: Option<CompletionCallback>) -> Result<(), MotionError> {
        self.act(StopAction::Stop, &[STOP], on_complete)
    }

    fn halt(&self, on_complete: Option<CompletionCallback>) -> Result<(), MotionError> {
        self.act(StopAction::Halt, &[HALT], on_complete)
    }

    fn brake(&self, on_complete: Option<CompletionCallback>) -> Result<(), MotionError> {
        self.act(StopAction::Brake, &[], on_complete)
    }

    fn emergency_stop(&self) -> Result<(), MotionError> {
        self.act(StopAction::EmergencyStop, &[STOP, HALT], None)
    }
}

impl SimPushButton {
    pub fn new(press_after: usize, hold: usize) -> Self {
        Self {
            polls: AtomicUsize::new(0),
            press_after,
            hold
        }
    }
}

impl PushButton for SimPushButton {
    fn is_pushed(&self) -> bool {
        let n = self.polls.fetch_add(1, Ordering::SeqCst);
        n >= self.press_after && n < self.press_after + self.hold
    }
}

impl FixedTaskSelector {
    pub fn new(selection: Task) -> Self {
        Self {
            selection: Mutex::new(selection)
        }
    }

    pub fn select(&self, task: Task) {
        *self.selection.lock().unwrap_or_else(|e| e.into_inner()) = task;
    }
}

impl TaskSelector for FixedTaskSelector {
    fn selection(&self) -> Task {
        *self.selection.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn tasks(&self) -> Vec<Task> {
        Task::defaults()
    }
}

impl RecordingForwarder {
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl MessageForwarder for RecordingForwarder {
    fn forward(&self, msg: &Message) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(msg.clone());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stop_holds_motors() {
        let dt = Arc::new(SimDrivetrain::new());
        let handler = SimStopHandler::new(dt.clone());

        dt.set_speed(Orientation::Cntr, 0.5).unwrap();
        handler.halt(None).unwrap();
        handler.halt(None).unwrap();

        // The halt multiplier holds the motors at rest
        dt.set_speed(Orientation::Cntr, 0.5).unwrap();
        assert!(dt.is_stopped());
        assert_eq!(handler.actions(), vec![StopAction::Halt, StopAction::Halt]);

        dt.remove_speed_multiplier(HALT);
        assert!(!dt.is_stopped());
    }

    #[test]
    fn test_push_button() {
        let button = SimPushButton::new(2, 2);
        let presses: Vec<bool> = (0..5).map(|_| button.is_pushed()).collect();
        assert_eq!(presses, vec![false, false, true, true, false]);
    }
}
