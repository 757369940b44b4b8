//! Walking and dashing.
//!
//! Input is camera-relative while free and facing-relative (strafing) while
//! locked on. Facing follows movement only when no lock-on owns it.

use glam::{Quat, Vec2, Vec3};
use riposte_common::math::{
    flatten, forward, look_rotation, move_towards, right, turn_towards, DIRECTION_EPSILON,
};
use serde::{Deserialize, Serialize};

use crate::collaborators::{Locomotion, Pose};
use crate::config::MovementConfig;

/// Result of [`MovementController::try_dash`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DashOutcome {
    /// Dash started along `direction`.
    Started {
        /// Horizontal unit direction.
        direction: Vec3,
    },
    /// A dash is already running.
    AlreadyDashing,
    /// Dash cooldown has not elapsed.
    OnCooldown {
        /// Seconds until the next dash.
        remaining: f32,
    },
}

/// Output of [`MovementController::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementTick {
    /// World displacement requested this tick.
    pub displacement: Vec3,
    /// New facing, when movement owns it.
    pub facing: Option<Quat>,
    /// Horizontal speed after this tick.
    pub speed: f32,
    /// The dash ended this tick.
    pub dash_finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Dash {
    direction: Vec3,
    remaining: f32,
}

/// Locomotion intent for the player character.
#[derive(Debug, Clone)]
pub struct MovementController {
    config: MovementConfig,
    move_direction: Vec3,
    velocity: Vec3,
    dash: Option<Dash>,
    dash_cooldown: f32,
}

impl MovementController {
    /// Create a controller at rest.
    #[must_use]
    pub fn new(config: MovementConfig) -> Self {
        Self {
            config,
            move_direction: Vec3::ZERO,
            velocity: Vec3::ZERO,
            dash: None,
            dash_cooldown: 0.0,
        }
    }

    /// Tuning in use.
    #[must_use]
    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    /// Desired horizontal direction (zero when idle).
    #[must_use]
    pub fn move_direction(&self) -> Vec3 {
        self.move_direction
    }

    /// Current walking velocity.
    #[must_use]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Whether a dash is running.
    #[must_use]
    pub fn is_dashing(&self) -> bool {
        self.dash.is_some()
    }

    /// Seconds until another dash is allowed.
    #[must_use]
    pub fn dash_cooldown_remaining(&self) -> f32 {
        self.dash_cooldown.max(0.0)
    }

    /// Set the stick input. `axis.y` is forward, `axis.x` is right, both
    /// relative to `basis` (the camera, or the character while strafing).
    pub fn set_move_input(&mut self, axis: Vec2, basis: Quat) {
        let fwd = flatten(forward(basis)).try_normalize().unwrap_or(Vec3::Z);
        let side = flatten(right(basis)).try_normalize().unwrap_or(Vec3::X);
        self.move_direction = (fwd * axis.y + side * axis.x)
            .try_normalize()
            .unwrap_or(Vec3::ZERO);
    }

    /// Stop walking immediately.
    pub fn halt(&mut self) {
        self.move_direction = Vec3::ZERO;
        self.velocity = Vec3::ZERO;
    }

    /// Start a dash along the move direction, or `facing` when standing still.
    pub fn try_dash(&mut self, facing: Vec3) -> DashOutcome {
        if self.dash.is_some() {
            return DashOutcome::AlreadyDashing;
        }
        if self.dash_cooldown > 0.0 {
            return DashOutcome::OnCooldown {
                remaining: self.dash_cooldown,
            };
        }

        let direction = if self.move_direction.length_squared() > 0.1 {
            self.move_direction
        } else {
            flatten(facing).try_normalize().unwrap_or(Vec3::Z)
        };
        self.dash = Some(Dash {
            direction,
            remaining: self.config.dash_duration,
        });
        self.dash_cooldown = self.config.dash_cooldown;
        DashOutcome::Started { direction }
    }

    /// Advance by `dt`. `strafing` leaves facing to the lock-on controller.
    pub fn tick(
        &mut self,
        dt: f32,
        pose: &Pose,
        strafing: bool,
        locomotion: Option<&mut dyn Locomotion>,
    ) -> MovementTick {
        let dt = dt.max(0.0);
        let mut out = MovementTick::default();
        self.dash_cooldown = (self.dash_cooldown - dt).max(0.0);

        if let Some(mut dash) = self.dash {
            let step = dt.min(dash.remaining);
            dash.remaining -= step;
            out.displacement = dash.direction * self.config.dash_speed * step;
            out.speed = if step > 0.0 { self.config.dash_speed } else { 0.0 };
            if dash.remaining <= 0.0 {
                self.dash = None;
                out.dash_finished = true;
            } else {
                self.dash = Some(dash);
            }
        } else {
            let target = self.move_direction * self.config.move_speed;
            let rate = if target.length_squared() > DIRECTION_EPSILON {
                self.config.acceleration
            } else {
                self.config.deceleration
            };
            self.velocity = move_towards(self.velocity, target, rate * dt);
            out.displacement = self.velocity * dt;
            out.speed = self.velocity.length();
        }

        if !strafing {
            out.facing = look_rotation(self.move_direction)
                .map(|desired| turn_towards(pose.rotation, desired, self.config.rotation_speed, dt));
        }

        if let Some(locomotion) = locomotion {
            if out.displacement.length_squared() > 0.0 {
                locomotion.request_displacement(out.displacement, dt);
            }
            if let Some(facing) = out.facing {
                if dt > 0.0 {
                    locomotion.set_facing(facing);
                }
            }
        }

        out
    }
}
