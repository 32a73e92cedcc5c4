//! # Event script interpreter module
//!
//! This module provides an interpreter for event scripts, allowing recorded or
//! hand written sequences of messages to be replayed into the motion
//! controller.
//!
//! A script is a list of `<time_s>: <json message>;` entries, for example:
//!
//! ```text
//! 0.5: {"event": "DpadUp", "value": -1};
//! 2.0: {"event": "Bumper", "value": {"contacts": ["PortFwd", "FwdObliquePort"]}};
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::fs;
use regex::RegexBuilder;
use thiserror::Error;

// Internal
use comms_if::evt::{Message, MessageParseError};
use crate::session::get_elapsed_seconds;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Matches one timestamped script entry.
const ENTRY_PATTERN: &str = r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A message which is scripted to occur at a specific time.
#[derive(Debug, Clone)]
pub struct ScriptedMessage {
    /// The time the message is supposed to be dispatched at
    exec_time_s: f64,

    /// The message to dispatch
    msg: Message
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use `.get_pending` to
/// acquire a list of messages that need dispatching.
pub struct ScriptInterpreter {
    _script_path: PathBuf,
    msgs: VecDeque<ScriptedMessage>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid message at {0} s: {1}")]
    InvalidMessage(f64, MessageParseError),

    #[error("The session has not been started, cannot get the script time")]
    NoSession
}

/// Messages which are due for dispatch.
#[derive(Debug)]
pub enum PendingMessages {
    None,
    Some(Vec<Message>),
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {

        // Get the path in a buffer
        let path = PathBuf::from(script_path.as_ref());
        
        // Check that the script file exists.
        if !path.exists() {
            return Err(
                ScriptError::ScriptNotFound(path.display().to_string()));
        }

        // Load the script into a string
        let script = fs::read_to_string(&path)
            .map_err(ScriptError::ScriptLoadError)?;

        let msgs = parse_script(&script)?;

        Ok(ScriptInterpreter {
            _script_path: path,
            msgs
        })
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_str(script: &str) -> Result<Self, ScriptError> {
        Ok(ScriptInterpreter {
            _script_path: PathBuf::new(),
            msgs: parse_script(script)?
        })
    }

    /// Return the messages due at the current session time.
    pub fn get_pending(&mut self) -> Result<PendingMessages, ScriptError> {
        let current_time_s = get_elapsed_seconds().ok_or(ScriptError::NoSession)?;

        Ok(self.get_pending_at(current_time_s))
    }

    /// Return the messages due at or before `current_time_s`.
    pub fn get_pending_at(&mut self, current_time_s: f64) -> PendingMessages {

        // If the queue is empty the script is over and we return the end of
        // script variant
        if self.msgs.is_empty() {
            return PendingMessages::EndOfScript
        }

        let mut msg_vec: Vec<Message> = vec![];

        // Keep popping from the head of the queue until the exec times are
        // later than the current time.
        while let Some(front) = self.msgs.front() {
            if front.exec_time_s > current_time_s {
                break;
            }
            if let Some(m) = self.msgs.pop_front() {
                msg_vec.push(m.msg);
            }
        }

        if msg_vec.is_empty() {
            PendingMessages::None
        }
        else {
            PendingMessages::Some(msg_vec)
        }
    }

    /// Get the number of messages remaining in the script
    pub fn get_num_msgs(&self) -> usize {
        self.msgs.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.msgs.back() {
            Some(m) => m.exec_time_s,
            None => 0f64
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn parse_script(script: &str) -> Result<VecDeque<ScriptedMessage>, ScriptError> {
    // Go through the script executing __the magic regex__.
    let re = RegexBuilder::new(ENTRY_PATTERN)
        .multi_line(true)
        .build()
        .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

    let mut queue: VecDeque<ScriptedMessage> = VecDeque::new();

    for cap in re.captures_iter(script) {
        let time_str = cap.get(1).map(|m| m.as_str()).unwrap_or("");
        let payload = cap.get(3).map(|m| m.as_str()).unwrap_or("");

        // Parse the exec time
        let exec_time_s: f64 = time_str.parse()
            .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

        // Parse the message from the payload. The scripts contain JSON only.
        let msg = Message::from_json(payload)
            .map_err(|e| ScriptError::InvalidMessage(exec_time_s, e))?;

        queue.push_back(ScriptedMessage {
            exec_time_s,
            msg
        });
    }

    if queue.is_empty() {
        return Err(ScriptError::ScriptEmpty)
    }

    // Entries are dispatched in time order regardless of how they were written
    queue.make_contiguous().sort_by(|a, b| {
        a.exec_time_s
            .partial_cmp(&b.exec_time_s)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(queue)
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::evt::{Event, EventValue};

    const SCRIPT: &str = "
        # comments are not matched
        1.0: {\"event\": \"DpadUp\", \"value\": -1};
        0.5: {\"event\": \"ButtonA\", \"value\": 0};
        3.0: {\"event\": \"Bumper\", \"value\": {\"contacts\": [\"PortFwd\", \"FwdObliquePort\"]}};
    ";

    #[test]
    fn test_parse_and_pending() {
        let mut si = ScriptInterpreter::from_str(SCRIPT).unwrap();
        assert_eq!(si.get_num_msgs(), 3);
        assert_eq!(si.get_duration(), 3.0);

        assert!(matches!(si.get_pending_at(0.1), PendingMessages::None));

        match si.get_pending_at(1.5) {
            PendingMessages::Some(v) => {
                assert_eq!(v.len(), 2);
                assert_eq!(v[0].event, Event::ButtonA);
                assert_eq!(v[1].event, Event::DpadUp);
                assert_eq!(v[1].value, EventValue::Value(-1));
            },
            p => panic!("Expected two pending messages, got {:?}", p)
        }

        match si.get_pending_at(5.0) {
            PendingMessages::Some(v) => assert_eq!(v[0].event, Event::Bumper),
            p => panic!("Expected the bumper message, got {:?}", p)
        }

        assert!(matches!(si.get_pending_at(6.0), PendingMessages::EndOfScript));
    }

    #[test]
    fn test_bad_scripts() {
        assert!(matches!(
            ScriptInterpreter::from_str("nothing to see here"),
            Err(ScriptError::ScriptEmpty)
        ));
        assert!(matches!(
            ScriptInterpreter::from_str("1.0: {\"event\": \"NotAnEvent\"};"),
            Err(ScriptError::InvalidMessage(_, _))
        ));
        assert!(matches!(
            ScriptInterpreter::new("/definitely/not/a/script.mcs"),
            Err(ScriptError::ScriptNotFound(_))
        ));
    }
}
