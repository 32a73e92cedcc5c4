//! # Motion control library.
//!
//! This library holds the motion control core: the speed ladder, steering
//! presets, AFRS steering geometry, per-motor speed multipliers, the steering
//! mode state machine, heading lock and the event dispatcher. Equipment is
//! reached through the traits in `eqpt`, and `sim` provides an in-process
//! implementation of all of them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Discrete speed ladder (engine order telegraph positions)
pub mod chadburn;

/// Errors raised by the motion control core
pub mod error;

/// Equipment interfaces - motors, servos, IMU and the other collaborators
pub mod eqpt;

/// Heading control - closed loop rotation to a compass heading
pub mod head_ctrl;

/// Motion control - lifecycle, event dispatch and speed commands
pub mod motion_ctrl;

/// Simulated equipment
pub mod sim;

/// Named, composable speed multipliers
pub mod speed_mult;

/// Discrete steering angle presets
pub mod steering_angle;

/// Steering control - steering mode state machine and AFRS geometry
pub mod steer_ctrl;

// ------------------------------------------------------------------------------------------------
// REEXPORTS
// ------------------------------------------------------------------------------------------------

pub use error::MotionError;
