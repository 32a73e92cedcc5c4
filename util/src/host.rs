//! Host platform utility functions

use std::env;
use std::path::PathBuf;

/// Name of the environment variable pointing at the root of the software tree.
pub const SW_ROOT_ENV_VAR: &str = "MOCO_SW_ROOT";

/// Get the root directory of the software tree from the environment.
pub fn get_moco_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
