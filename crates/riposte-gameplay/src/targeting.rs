//! Lock-on target selection.
//!
//! This module provides:
//! - Candidate scanning filtered by range, line of sight, and facing cone
//! - Nearest and alignment-weighted acquisition
//! - Directional target cycling
//! - Per-tick revalidation of the held target

use glam::{Quat, Vec3};
use riposte_common::math::{flatten, look_rotation, signed_angle_deg, turn_towards};
use riposte_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collaborators::{Pose, SpatialQuery};
use crate::config::LockOnConfig;

// ============================================================================
// Types
// ============================================================================

/// How the first target is picked when locking on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMode {
    /// Nearest valid candidate.
    #[default]
    Nearest,
    /// Highest [`lock_on_score`].
    Scored,
}

/// Look-axis magnitude a flick must exceed to cycle targets.
pub const CYCLE_DEAD_ZONE: f32 = 0.5;

/// Rotational direction for cycling targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CycleDirection {
    /// Counter-clockwise seen from above.
    Left,
    /// Clockwise seen from above.
    Right,
}

impl CycleDirection {
    /// Direction of a horizontal look flick, or `None` inside the dead zone.
    #[must_use]
    pub fn from_axis(axis: f32) -> Option<Self> {
        if axis > CYCLE_DEAD_ZONE {
            Some(Self::Right)
        } else if axis < -CYCLE_DEAD_ZONE {
            Some(Self::Left)
        } else {
            None
        }
    }

    fn matches(self, signed_angle: f32) -> bool {
        match self {
            Self::Left => signed_angle < 0.0,
            Self::Right => signed_angle > 0.0,
        }
    }
}

/// Lock state. The target only exists while locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockState {
    /// No target.
    Unlocked,
    /// Holding a target.
    Locked {
        /// The held target.
        target: EntityId,
    },
}

/// Why a lock ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReleaseReason {
    /// The player toggled lock-on off.
    Toggled,
    /// The target handle no longer resolves.
    TargetInvalid,
    /// The target moved beyond the maximum distance.
    OutOfRange,
    /// Line of sight to the target is blocked.
    Obstructed,
    /// The owner died or was otherwise interrupted.
    Interrupted,
}

/// Result of a lock-on input or tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOnEvent {
    /// Locked onto a target.
    Acquired(EntityId),
    /// Moved the lock to another target.
    Switched {
        /// Previous target.
        from: EntityId,
        /// New target.
        to: EntityId,
    },
    /// Lock ended.
    Released {
        /// Target that was held.
        target: EntityId,
        /// Why.
        reason: ReleaseReason,
    },
    /// No valid candidate was found.
    NoTarget,
    /// Nothing changed.
    Unchanged,
}

/// A scanned candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Candidate entity.
    pub entity: EntityId,
    /// Its position.
    pub position: Vec3,
    /// Distance from the scanning character.
    pub distance: f32,
    /// `dot(forward, direction)` on the horizontal plane.
    pub alignment: f32,
    /// Signed horizontal angle from forward in degrees (right positive).
    pub signed_angle: f32,
}

/// Per-tick output of the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LockOnUpdate {
    /// Lock change caused by revalidation, if any.
    pub event: LockOnEvent,
    /// The held target after this tick.
    pub target: Option<EntityId>,
    /// Position of the held target.
    pub target_position: Option<Vec3>,
    /// Facing turned toward the target.
    pub facing: Option<Quat>,
}

impl LockOnUpdate {
    fn unlocked(event: LockOnEvent) -> Self {
        Self {
            event,
            target: None,
            target_position: None,
            facing: None,
        }
    }
}

// ============================================================================
// Scoring
// ============================================================================

/// Weighs facing alignment twice as heavily as proximity.
#[must_use]
pub fn lock_on_score(alignment: f32, distance: f32, radius: f32) -> f32 {
    let proximity = if radius > 0.0 {
        1.0 - distance / radius
    } else {
        0.0
    };
    2.0 * alignment + proximity
}

/// Highest-scoring candidate; ties go to the one scanned first.
#[must_use]
pub fn select_by_score(candidates: &[Candidate], radius: f32) -> Option<&Candidate> {
    let mut best: Option<(&Candidate, f32)> = None;
    for candidate in candidates {
        let score = lock_on_score(candidate.alignment, candidate.distance, radius);
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((candidate, score));
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// Nearest candidate; ties go to the one scanned first.
#[must_use]
pub fn select_nearest(candidates: &[Candidate]) -> Option<&Candidate> {
    let mut best: Option<&Candidate> = None;
    for candidate in candidates {
        if best.map_or(true, |b| candidate.distance < b.distance) {
            best = Some(candidate);
        }
    }
    best
}

/// Candidate closest to facing on the `direction` side.
#[must_use]
pub fn select_in_direction(
    candidates: &[Candidate],
    direction: CycleDirection,
) -> Option<&Candidate> {
    let mut best: Option<&Candidate> = None;
    for candidate in candidates {
        if !direction.matches(candidate.signed_angle) {
            continue;
        }
        if best.map_or(true, |b| candidate.signed_angle.abs() < b.signed_angle.abs()) {
            best = Some(candidate);
        }
    }
    best
}

// ============================================================================
// Target Lock Controller
// ============================================================================

/// Current-target lifecycle for one character.
#[derive(Debug, Clone)]
pub struct TargetLockController {
    owner: EntityId,
    config: LockOnConfig,
    state: LockState,
}

impl TargetLockController {
    /// Create an unlocked controller for `owner`.
    #[must_use]
    pub fn new(owner: EntityId, config: LockOnConfig) -> Self {
        Self {
            owner,
            config,
            state: LockState::Unlocked,
        }
    }

    /// Current lock state.
    #[must_use]
    pub fn state(&self) -> LockState {
        self.state
    }

    /// Whether a target is held.
    #[must_use]
    pub fn is_locked_on(&self) -> bool {
        matches!(self.state, LockState::Locked { .. })
    }

    /// The held target.
    #[must_use]
    pub fn current_target(&self) -> Option<EntityId> {
        match self.state {
            LockState::Locked { target } => Some(target),
            LockState::Unlocked => None,
        }
    }

    /// Tuning in use.
    #[must_use]
    pub fn config(&self) -> &LockOnConfig {
        &self.config
    }

    fn eye(&self, pose: &Pose) -> Vec3 {
        pose.position + Vec3::Y * self.config.eye_height
    }

    fn sight_blocked(&self, pose: &Pose, spatial: &dyn SpatialQuery, position: Vec3) -> bool {
        spatial.line_of_sight_blocked(
            self.eye(pose),
            position + self.config.target_offset,
            self.config.obstruction_layers,
        )
    }

    /// Scan for candidates in range with clear line of sight.
    ///
    /// `exclude` skips the held target; `within_cone` drops candidates
    /// outside `max_acquire_angle` of facing.
    pub fn scan(
        &self,
        pose: &Pose,
        spatial: &dyn SpatialQuery,
        exclude: Option<EntityId>,
        within_cone: bool,
    ) -> Vec<Candidate> {
        let forward = pose.forward();
        let mut candidates: Vec<Candidate> = Vec::new();

        let found = spatial.query_in_radius(
            pose.position,
            self.config.lock_on_radius,
            self.config.target_layers,
        );
        for entity in found {
            if entity == self.owner
                || !entity.is_valid()
                || exclude == Some(entity)
                || candidates.iter().any(|c| c.entity == entity)
            {
                continue;
            }
            let Some(position) = spatial.position(entity) else {
                continue;
            };

            let offset = position - pose.position;
            let direction = flatten(offset).try_normalize().unwrap_or(forward);
            let signed_angle = signed_angle_deg(forward, direction);

            if within_cone && signed_angle.abs() > self.config.max_acquire_angle {
                continue;
            }
            if self.sight_blocked(pose, spatial, position) {
                continue;
            }

            candidates.push(Candidate {
                entity,
                position,
                distance: offset.length(),
                alignment: forward.dot(direction),
                signed_angle,
            });
        }

        candidates
    }

    /// Handle the lock-on toggle input.
    pub fn on_toggle_lock_on(&mut self, pose: &Pose, spatial: &dyn SpatialQuery) -> LockOnEvent {
        if self.is_locked_on() {
            return self.release(ReleaseReason::Toggled);
        }

        let candidates = self.scan(pose, spatial, None, true);
        let selected = match self.config.acquisition {
            AcquisitionMode::Nearest => select_nearest(&candidates),
            AcquisitionMode::Scored => select_by_score(&candidates, self.config.lock_on_radius),
        };

        match selected {
            Some(candidate) => {
                self.state = LockState::Locked {
                    target: candidate.entity,
                };
                debug!(
                    "Locked onto {} at {:.1}m",
                    candidate.entity, candidate.distance
                );
                LockOnEvent::Acquired(candidate.entity)
            },
            None => {
                debug!("No valid lock-on targets");
                LockOnEvent::NoTarget
            },
        }
    }

    /// Move the lock to the nearest target in `direction`.
    pub fn on_cycle_target(
        &mut self,
        direction: CycleDirection,
        pose: &Pose,
        spatial: &dyn SpatialQuery,
    ) -> LockOnEvent {
        let LockState::Locked { target: current } = self.state else {
            return LockOnEvent::Unchanged;
        };

        let candidates = self.scan(pose, spatial, Some(current), false);
        match select_in_direction(&candidates, direction) {
            Some(candidate) => {
                self.state = LockState::Locked {
                    target: candidate.entity,
                };
                LockOnEvent::Switched {
                    from: current,
                    to: candidate.entity,
                }
            },
            None => LockOnEvent::Unchanged,
        }
    }

    /// Release the held target, if any.
    pub fn release(&mut self, reason: ReleaseReason) -> LockOnEvent {
        match std::mem::replace(&mut self.state, LockState::Unlocked) {
            LockState::Locked { target } => {
                if reason != ReleaseReason::Toggled {
                    debug!("Lock on {} released: {:?}", target, reason);
                }
                LockOnEvent::Released { target, reason }
            },
            LockState::Unlocked => LockOnEvent::Unchanged,
        }
    }

    /// Revalidate the held target and turn toward it.
    pub fn tick(&mut self, dt: f32, pose: &Pose, spatial: &dyn SpatialQuery) -> LockOnUpdate {
        let LockState::Locked { target } = self.state else {
            return LockOnUpdate::unlocked(LockOnEvent::Unchanged);
        };

        let Some(position) = spatial.position(target) else {
            return LockOnUpdate::unlocked(self.release(ReleaseReason::TargetInvalid));
        };
        if pose.position.distance(position) > self.config.max_lock_on_distance {
            return LockOnUpdate::unlocked(self.release(ReleaseReason::OutOfRange));
        }
        if self.sight_blocked(pose, spatial, position) {
            return LockOnUpdate::unlocked(self.release(ReleaseReason::Obstructed));
        }

        let facing = look_rotation(position - pose.position).map(|desired| {
            turn_towards(
                pose.rotation,
                desired,
                self.config.lock_on_rotation_speed,
                dt.max(0.0),
            )
        });

        LockOnUpdate {
            event: LockOnEvent::Unchanged,
            target: Some(target),
            target_position: Some(position),
            facing,
        }
    }
}
