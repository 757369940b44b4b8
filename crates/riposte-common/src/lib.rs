//! # Riposte Common
//!
//! Common types and utilities shared by the Riposte crates:
//! - Entity handles and layer masks
//! - Horizontal-plane vector math
//! - Configuration error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod math;

pub use glam;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use glam::{Quat, Vec3};
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("lock_on_radius", "must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid value for `lock_on_radius`: must be positive"
        );
    }
}
