//! Tasks run from the task button

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::fmt;

use comms_if::eqpt::{Cardinal, Rotation};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::MotionCtrl;
use crate::MotionError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A task the motion controller can execute on request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    /// Log the controller's state
    Announce,

    /// Log the selectable tasks
    ListTasks,

    /// Rotate clockwise until facing the given direction
    AlignHeading(Cardinal),

    /// Do nothing
    Idle
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Task {
    /// The standard task list.
    pub fn defaults() -> Vec<Task> {
        vec![
            Task::Announce,
            Task::ListTasks,
            Task::AlignHeading(Cardinal::North),
            Task::AlignHeading(Cardinal::East),
            Task::AlignHeading(Cardinal::South),
            Task::AlignHeading(Cardinal::West),
        ]
    }
}

impl Default for Task {
    fn default() -> Self {
        Task::Idle
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Announce => write!(f, "announce"),
            Task::ListTasks => write!(f, "list tasks"),
            Task::AlignHeading(c) => write!(f, "align {:?}", c),
            Task::Idle => write!(f, "idle")
        }
    }
}

impl MotionCtrl {
    /// Execute the task currently selected on the task selector.
    pub fn execute_task(&mut self) -> Result<(), MotionError> {
        let task = match self.eqpt.task_selector {
            Some(ref s) => s.selection(),
            None => {
                warn!("No task selector, no task to execute");
                return Ok(());
            }
        };

        self.run_task(task)
    }

    pub fn run_task(&mut self, task: Task) -> Result<(), MotionError> {
        info!("Executing task: {}", task);

        match task {
            Task::Announce => {
                let status = self.status();
                info!(
                    "Steering mode {:?}, speed level {}, {}",
                    status.steering_mode, 
                    status.chadburn,
                    if status.stopped { "stopped" } else { "moving" }
                );
                match serde_json::to_string(&status) {
                    Ok(s) => debug!("Full status: {}", s),
                    Err(e) => warn!("Could not serialise the status: {}", e)
                }
            },
            Task::ListTasks => {
                let tasks = match self.eqpt.task_selector {
                    Some(ref s) => s.tasks(),
                    None => Task::defaults()
                };
                for (i, t) in tasks.iter().enumerate() {
                    info!("    {:2}: {}", i + 1, t);
                }
            },
            Task::AlignHeading(cardinal) => {
                self.set_heading(Rotation::Clockwise, cardinal)?;
            },
            Task::Idle => debug!("Idle task, nothing to do")
        }

        Ok(())
    }
}
