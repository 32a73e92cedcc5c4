//! # Event messages
//!
//! Inbound events from the gamepad, bumpers, IMU and stop sources. Each
//! message carries one event and its value.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Priority of a bumper contact which must halt the robot rather than stop
/// it.
pub const CRITICAL_CONTACT_PRIORITY: u8 = 10;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An inbound message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    /// The event this message reports
    pub event: Event,

    /// The value associated with the event
    #[serde(default)]
    pub value: EventValue,
}

/// A batch of bumper contacts, with the forward obstacle distances at the time
/// of contact.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct BumperContacts {
    pub contacts: Vec<BumperContact>,

    /// Forward obstacle distance on the port side
    /// 
    /// Units: centimeters
    #[serde(default)]
    pub fop_cm: u32,

    /// Forward obstacle distance on the starboard side
    /// 
    /// Units: centimeters
    #[serde(default)]
    pub fos_cm: u32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The group an event belongs to.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum EventGroup {
    Stop,
    Bumper,
    Imu,
    Gamepad,
    System,
}

/// All events the motion controller understands.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum Event {
    // ---- STOP ----
    EmergencyStop,
    Halt,
    Stop,
    Brake,

    // ---- BUMPER ----
    Bumper,

    // ---- IMU ----
    ImuOverPitch,
    ImuOverRoll,

    // ---- GAMEPAD ----
    Shutdown,
    ButtonA,
    ButtonB,
    ButtonL1,
    ButtonR1,
    ButtonL2,
    ButtonR2,
    ButtonStart,
    ButtonSelect,
    ButtonHome,
    DpadLeft,
    DpadRight,
    DpadUp,
    DpadDown,
    L3Vertical,
    L3Horizontal,
    R3Vertical,
    R3Horizontal,

    // ---- SYSTEM ----
    Noop,
}

/// Individual bumper switches.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum BumperContact {
    Mast,
    Port,
    Cntr,
    Stbd,
    PortFwd,
    PortAft,
    StbdFwd,
    StbdAft,
    FwdObliquePort,
    FwdObliqueStbd,
}

/// The value carried by a message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum EventValue {
    /// A plain integer value, for buttons (0 on release), d-pad steps and
    /// analog axes (0 to 255).
    Value(i32),

    /// Bumper contact data
    Bumper(BumperContacts),
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum MessageParseError {
    #[error("Message contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Event {0:?} cannot carry a bumper payload")]
    UnexpectedBumperPayload(Event),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Message {
    /// Create a new message with a plain value.
    pub fn new(event: Event, value: i32) -> Self {
        Self {
            event,
            value: EventValue::Value(value),
        }
    }

    /// Create a new bumper message.
    pub fn bumper(contacts: Vec<BumperContact>) -> Self {
        Self {
            event: Event::Bumper,
            value: EventValue::Bumper(BumperContacts {
                contacts,
                ..Default::default()
            }),
        }
    }

    /// Parse a message from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, MessageParseError> {
        let msg: Message =
            serde_json::from_str(json_str).map_err(MessageParseError::InvalidJson)?;

        if let EventValue::Bumper(_) = msg.value {
            if msg.event != Event::Bumper {
                return Err(MessageParseError::UnexpectedBumperPayload(msg.event));
            }
        }

        Ok(msg)
    }

    /// Serialise the message into a JSON string.
    pub fn to_json(&self) -> Result<String, MessageParseError> {
        serde_json::to_string(self).map_err(MessageParseError::InvalidJson)
    }

    /// Get the integer value of the message, if it carries one.
    pub fn int_value(&self) -> Option<i32> {
        match self.value {
            EventValue::Value(v) => Some(v),
            EventValue::Bumper(_) => None,
        }
    }
}

impl Event {
    /// Get the group this event belongs to.
    pub fn group(&self) -> EventGroup {
        use Event::*;

        match self {
            EmergencyStop | Halt | Stop | Brake => EventGroup::Stop,
            Bumper => EventGroup::Bumper,
            ImuOverPitch | ImuOverRoll => EventGroup::Imu,
            Noop => EventGroup::System,
            _ => EventGroup::Gamepad,
        }
    }

    /// Get the priority of the event, lower is more urgent.
    pub fn priority(&self) -> u8 {
        use Event::*;

        match self {
            EmergencyStop => 0,
            Halt | Stop | Brake => 1,
            Bumper => 4,
            ImuOverPitch | ImuOverRoll => 5,
            Noop => 255,
            _ => 10,
        }
    }
}

impl Default for EventValue {
    fn default() -> Self {
        EventValue::Value(0)
    }
}

impl BumperContact {
    /// Priority of the contact. The forward oblique bumpers report
    /// `CRITICAL_CONTACT_PRIORITY`, all others report 4.
    pub fn priority(&self) -> u8 {
        match self {
            BumperContact::FwdObliquePort | BumperContact::FwdObliqueStbd => {
                CRITICAL_CONTACT_PRIORITY
            }
            _ => 4,
        }
    }

    /// Returns true if this contact must halt the robot.
    pub fn is_critical(&self) -> bool {
        self.priority() == CRITICAL_CONTACT_PRIORITY
    }
}
