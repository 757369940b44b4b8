//! # Riposte Gameplay
//!
//! Engine-agnostic combat simulation for a third-person action character.
//!
//! This crate provides the per-character state machines and the interfaces
//! a host engine implements to drive them:
//! - Melee combo timing with guarded damage dispatch
//! - Lock-on target selection, cycling, and revalidation
//! - Health, invincibility frames, and charge-based healing
//! - Camera-relative walking and dash/dodge
//! - Chase-and-strike enemy AI
//! - Camera framing for locked and free modes
//! - Deferred effects, configuration loading, and an event bus

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod camera;
pub mod character;
pub mod collaborators;
pub mod combat;
pub mod config;
pub mod deferred;
pub mod enemy;
pub mod events;
pub mod health;
pub mod movement;
pub mod targeting;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::camera::*;
    pub use crate::character::*;
    pub use crate::collaborators::*;
    pub use crate::combat::*;
    pub use crate::config::{
        CameraConfig, CharacterConfig, CombatConfig, EnemyConfig, HealthConfig, LockOnConfig,
        MovementConfig, Validate,
    };
    pub use crate::deferred::*;
    pub use crate::enemy::*;
    pub use crate::events::*;
    pub use crate::health::*;
    pub use crate::movement::*;
    pub use crate::targeting::*;
}

pub use prelude::*;
