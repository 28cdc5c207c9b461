mod r#impl;
mod structs;

pub use r#impl::{LEGACY_ENV_OVERRIDES, system_env};
pub use structs::*;
