//! Interfaces to the host engine.
//!
//! The state machines in this crate never touch engine objects. They ask
//! queries through these traits and hand requests back through the sink
//! traits; the host decides what a request means.

use glam::{Quat, Vec3};
use riposte_common::{EntityId, LayerMask};

// ============================================================================
// Time
// ============================================================================

/// Monotonic per-tick time source.
pub trait Clock {
    /// Seconds since the simulation started.
    fn now(&self) -> f32;
    /// Seconds elapsed during the current tick.
    fn delta_time(&self) -> f32;
}

/// Clock advanced explicitly by the caller once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimClock {
    now: f32,
    delta: f32,
}

impl SimClock {
    /// Create a clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock starting at `now`.
    #[must_use]
    pub fn starting_at(now: f32) -> Self {
        Self { now, delta: 0.0 }
    }

    /// Advance by `dt` seconds (negative values are treated as zero).
    pub fn advance(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        self.now += dt;
        self.delta = dt;
    }
}

impl Clock for SimClock {
    fn now(&self) -> f32 {
        self.now
    }

    fn delta_time(&self) -> f32 {
        self.delta
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Position and orientation of a character at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// World position (feet).
    pub position: Vec3,
    /// Orientation; forward is local +Z.
    pub rotation: Quat,
}

impl Pose {
    /// Create a pose.
    #[must_use]
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Horizontal forward direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        riposte_common::math::flatten(riposte_common::math::forward(self.rotation))
            .try_normalize()
            .unwrap_or(Vec3::Z)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY)
    }
}

/// Range and visibility queries against the host scene.
pub trait SpatialQuery {
    /// Entities on `layers` whose colliders overlap the sphere.
    fn query_in_radius(&self, origin: Vec3, radius: f32, layers: LayerMask) -> Vec<EntityId>;

    /// Whether anything on `obstruction` intersects the segment `from..to`.
    fn line_of_sight_blocked(&self, from: Vec3, to: Vec3, obstruction: LayerMask) -> bool;

    /// Current position of an entity, or `None` if the handle is stale.
    fn position(&self, entity: EntityId) -> Option<Vec3>;
}

/// Volume used for melee hit resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitShape {
    /// Sphere around a point.
    Sphere {
        /// Sphere center.
        center: Vec3,
        /// Sphere radius.
        radius: f32,
        /// Layers the sphere can strike.
        layers: LayerMask,
    },
}

/// Overlap test used to resolve melee hits.
pub trait HitQuery {
    /// Entities struck by `shape`. May contain the attacker or duplicates.
    fn query_volume(&self, shape: &HitShape) -> Vec<EntityId>;
}

// ============================================================================
// Sinks
// ============================================================================

/// Damage requests routed to the entity that owns the health value.
pub trait DamageSink {
    /// Ask `target` to take `amount` damage.
    fn apply_damage(&mut self, target: EntityId, amount: i32);
}

/// Movement requests for the controlled character.
pub trait Locomotion {
    /// Move by `displacement` spread over `duration` seconds.
    fn request_displacement(&mut self, displacement: Vec3, duration: f32);
    /// Set the character's facing.
    fn set_facing(&mut self, rotation: Quat);
}

/// Value written to an animation parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimParam {
    /// Boolean parameter.
    Bool(bool),
    /// Integer parameter.
    Int(i32),
    /// Float parameter.
    Float(f32),
}

/// Fire-and-forget animation requests.
pub trait AnimationSink {
    /// Fire a trigger.
    fn trigger(&mut self, name: &str);
    /// Set a parameter.
    fn set_parameter(&mut self, name: &str, value: AnimParam);
}

// ============================================================================
// Command buffer
// ============================================================================

/// A request recorded by [`CommandBuffer`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// See [`DamageSink::apply_damage`].
    Damage {
        /// Target entity.
        target: EntityId,
        /// Damage amount.
        amount: i32,
    },
    /// See [`Locomotion::request_displacement`].
    Displace {
        /// Displacement vector.
        displacement: Vec3,
        /// Spread over this many seconds.
        duration: f32,
    },
    /// See [`Locomotion::set_facing`].
    Face(Quat),
    /// See [`AnimationSink::trigger`].
    AnimTrigger(String),
    /// See [`AnimationSink::set_parameter`].
    AnimParam(String, AnimParam),
}

/// Records sink requests so the host can apply them after the tick.
///
/// Lets a host hand out `&World` for queries and `&mut CommandBuffer` for
/// requests at the same time.
#[derive(Debug, Clone, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded commands in issue order.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Take all recorded commands.
    pub fn drain(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Number of recorded commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Sum of damage requested against `target`.
    #[must_use]
    pub fn damage_to(&self, target: EntityId) -> i32 {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::Damage { target: t, amount } if *t == target => Some(*amount),
                _ => None,
            })
            .sum()
    }
}

impl DamageSink for CommandBuffer {
    fn apply_damage(&mut self, target: EntityId, amount: i32) {
        self.commands.push(Command::Damage { target, amount });
    }
}

impl Locomotion for CommandBuffer {
    fn request_displacement(&mut self, displacement: Vec3, duration: f32) {
        self.commands.push(Command::Displace {
            displacement,
            duration,
        });
    }

    fn set_facing(&mut self, rotation: Quat) {
        self.commands.push(Command::Face(rotation));
    }
}

impl AnimationSink for CommandBuffer {
    fn trigger(&mut self, name: &str) {
        self.commands.push(Command::AnimTrigger(name.to_string()));
    }

    fn set_parameter(&mut self, name: &str, value: AnimParam) {
        self.commands
            .push(Command::AnimParam(name.to_string(), value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_clock_advance() {
        let mut clock = SimClock::new();
        clock.advance(0.25);
        clock.advance(0.5);
        assert!((clock.now() - 0.75).abs() < 1.0e-6);
        assert!((clock.delta_time() - 0.5).abs() < 1.0e-6);

        clock.advance(-1.0);
        assert!((clock.now() - 0.75).abs() < 1.0e-6);
        assert_eq!(clock.delta_time(), 0.0);
    }

    #[test]
    fn test_command_buffer_records_in_order() {
        let mut buffer = CommandBuffer::new();
        let target = EntityId::from_raw(7);

        buffer.apply_damage(target, 10);
        buffer.trigger("attack");
        buffer.apply_damage(target, 5);

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.damage_to(target), 15);
        assert_eq!(buffer.commands()[1], Command::AnimTrigger("attack".into()));

        let drained = buffer.drain();
        assert_eq!(drained.len(), 3);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_pose_forward_ignores_pitch() {
        let pose = Pose::new(Vec3::ZERO, Quat::from_rotation_x(-0.5));
        let fwd = pose.forward();
        assert!((fwd - Vec3::Z).length() < 1.0e-4);
    }
}
