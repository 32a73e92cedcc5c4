//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the motion control
//! software: the inbound event messages and the equipment vocabulary shared
//! between the controller and its drivers.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Inbound events and messages
pub mod evt;

/// Shared equipment vocabulary (orientations, rotations, steering modes)
pub mod eqpt;
