//! Camera framing parameters.
//!
//! The host camera solves its own transform; this only decides where it
//! should look, where it should sit while locked on, and how stiffly it
//! tracks.

use glam::Vec3;

use crate::config::CameraConfig;

/// Framing requested for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    /// Point the camera should aim at.
    pub look_at: Vec3,
    /// Fixed camera position while locked on; `None` leaves the host's
    /// free orbit in charge.
    pub position: Option<Vec3>,
    /// Tracking damping (lower is stiffer).
    pub damping: f32,
}

/// Lock-aware framing for the player camera.
#[derive(Debug, Clone)]
pub struct CameraFraming {
    config: CameraConfig,
    target_offset: Vec3,
    damping: f32,
}

impl CameraFraming {
    /// `target_offset` is added to the locked target's position, matching
    /// the lock-on aim point.
    #[must_use]
    pub fn new(config: CameraConfig, target_offset: Vec3) -> Self {
        Self {
            damping: config.normal_damping,
            config,
            target_offset,
        }
    }

    /// Current damping.
    #[must_use]
    pub fn damping(&self) -> f32 {
        self.damping
    }

    /// Advance the damping blend and frame `player`, optionally against a
    /// locked target.
    pub fn update(&mut self, dt: f32, player: Vec3, target: Option<Vec3>) -> CameraRig {
        let goal = if target.is_some() {
            self.config.locked_damping
        } else {
            self.config.normal_damping
        };
        let t = (self.config.damping_blend_speed * dt.max(0.0)).clamp(0.0, 1.0);
        self.damping += (goal - self.damping) * t;

        match target {
            Some(target) => CameraRig {
                look_at: (player + target + self.target_offset) * 0.5,
                position: Some(player + self.config.locked_offset),
                damping: self.damping,
            },
            None => CameraRig {
                look_at: player + Vec3::Y * self.config.follow_height,
                position: None,
                damping: self.damping,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framing() -> CameraFraming {
        CameraFraming::new(CameraConfig::default(), Vec3::new(0.0, 1.5, 0.0))
    }

    #[test]
    fn test_free_follow() {
        let mut camera = framing();
        let rig = camera.update(0.016, Vec3::new(1.0, 0.0, 2.0), None);
        assert_eq!(rig.look_at, Vec3::new(1.0, 1.5, 2.0));
        assert!(rig.position.is_none());
        assert!((rig.damping - 0.5).abs() < 1.0e-6);
    }

    #[test]
    fn test_locked_midpoint_and_offset() {
        let mut camera = framing();
        let rig = camera.update(0.0, Vec3::ZERO, Some(Vec3::new(0.0, 0.0, 4.0)));
        assert_eq!(rig.look_at, Vec3::new(0.0, 0.75, 2.0));
        assert_eq!(rig.position, Some(Vec3::new(0.0, 2.0, -5.0)));
    }

    #[test]
    fn test_damping_blends_toward_locked() {
        let mut camera = framing();
        let target = Some(Vec3::Z);

        let first = camera.update(0.05, Vec3::ZERO, target).damping;
        assert!((first - 0.34).abs() < 1.0e-5);

        camera.update(1.0, Vec3::ZERO, target);
        assert!((camera.damping() - 0.1).abs() < 1.0e-6);

        camera.update(1.0, Vec3::ZERO, None);
        assert!((camera.damping() - 0.5).abs() < 1.0e-6);
    }
}
