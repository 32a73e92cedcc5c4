//! Motion control errors

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during motion control.
///
/// Removing a multiplier or callback which was never installed is not an
/// error, it is logged and ignored.
#[derive(Debug, thiserror::Error)]
pub enum MotionError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("A {kind} named \"{name}\" is already registered")]
    DuplicateRegistration {
        kind: &'static str,
        name: String
    },

    #[error("Unknown collaborator: {0}")]
    UnknownCollaborator(String),

    #[error("Reposition failed: {0}")]
    RepositionFailed(String),

    #[error("IMU calibration verdict not reached within {0:.1} s")]
    CalibrationTimeout(f64),

    #[error("Equipment error: {0}")]
    Equipment(String),
}
