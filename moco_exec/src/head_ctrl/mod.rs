//! # Heading control module
//!
//! Heading control spins the robot on the spot until its compass heading
//! matches a cardinal direction. The steering is moved to the rotate
//! position, the motors are set rotating in the requested sense and the
//! rotation speed is then driven by a proportional controller on the heading
//! error, scaled by the manual speed source. The loop runs at a fixed rate.
//!
//! Whether the loop converges, is cancelled or fails, the motors are stopped
//! and the steering is returned to AFRS before `set_heading` returns.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cancel;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use cancel::CancelToken;
pub use params::Params;
pub use state::*;
