//! Chase-and-strike enemy AI.
//!
//! Each tick the enemy turns toward the player, strikes when in range and
//! off cooldown, and otherwise closes the distance.

use glam::{Quat, Vec3};
use riposte_common::math::{flatten, look_rotation, turn_towards};
use riposte_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::collaborators::{AnimParam, AnimationSink, Clock, DamageSink, Locomotion, Pose};
use crate::config::EnemyConfig;
use crate::health::{DamageOutcome, Health};

/// Animation parameter carrying normalised move speed.
pub const MOVE_SPEED_PARAM: &str = "moveSpeed";

/// Animation trigger fired on each strike.
pub const ATTACK_TRIGGER: &str = "attack";

/// Behaviour state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyState {
    /// No player, or player outside aggro radius / already adjacent.
    #[default]
    Idle,
    /// Moving toward the player.
    Chase,
    /// In attack range.
    Attack,
    /// Health reached zero. Terminal.
    Dead,
}

/// The player as seen by an enemy this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quarry {
    /// Player entity.
    pub entity: EntityId,
    /// Player position.
    pub position: Vec3,
}

/// Collaborators for one enemy tick.
pub struct EnemyContext<'a> {
    /// Time source.
    pub clock: &'a dyn Clock,
    /// Enemy pose at the start of the tick.
    pub pose: Pose,
    /// The player, if one exists.
    pub quarry: Option<Quarry>,
    /// Where strikes go.
    pub damage: &'a mut dyn DamageSink,
    /// Chase displacement and facing; skipped when unbound.
    pub locomotion: Option<&'a mut dyn Locomotion>,
    /// Animation requests; skipped when unbound.
    pub animation: Option<&'a mut dyn AnimationSink>,
}

/// What the enemy did this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyTick {
    /// State after the tick.
    pub state: EnemyState,
    /// Damage dealt to the player this tick.
    pub strike: Option<(EntityId, i32)>,
    /// Chase displacement.
    pub displacement: Vec3,
    /// Facing turned toward the player.
    pub facing: Option<Quat>,
}

/// AI and health for one enemy.
#[derive(Debug, Clone)]
pub struct EnemyBrain {
    id: EntityId,
    config: EnemyConfig,
    state: EnemyState,
    health: Health,
    last_attack: Option<f32>,
}

impl EnemyBrain {
    /// Create an idle enemy at full health.
    #[must_use]
    pub fn new(id: EntityId, config: EnemyConfig) -> Self {
        Self {
            id,
            health: Health::new(id, config.health.clone()),
            config,
            state: EnemyState::Idle,
            last_attack: None,
        }
    }

    /// Entity this brain drives.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> EnemyState {
        self.state
    }

    /// Health component.
    #[must_use]
    pub fn health(&self) -> &Health {
        &self.health
    }

    /// Whether the enemy is dead.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.state == EnemyState::Dead
    }

    /// Tuning in use.
    #[must_use]
    pub fn config(&self) -> &EnemyConfig {
        &self.config
    }

    /// Apply incoming damage.
    pub fn take_damage(&mut self, amount: i32) -> DamageOutcome {
        let outcome = self.health.take_damage(amount);
        if outcome == DamageOutcome::Killed {
            self.state = EnemyState::Dead;
            info!("Enemy {} defeated", self.id);
        }
        outcome
    }

    fn attack_ready(&self, now: f32) -> bool {
        self.last_attack
            .map_or(true, |last| now - last >= self.config.attack_cooldown)
    }

    fn in_aggro(&self, distance: f32) -> bool {
        self.config.aggro_radius.map_or(true, |radius| distance <= radius)
    }

    /// Advance the AI by `dt`.
    pub fn tick(&mut self, dt: f32, ctx: &mut EnemyContext<'_>) -> EnemyTick {
        let dt = dt.max(0.0);
        self.health.tick(dt);

        let mut out = EnemyTick {
            state: self.state,
            strike: None,
            displacement: Vec3::ZERO,
            facing: None,
        };

        if self.is_dead() {
            return out;
        }
        let Some(quarry) = ctx.quarry else {
            self.state = EnemyState::Idle;
            out.state = self.state;
            Self::publish_speed(ctx, 0.0);
            return out;
        };

        let offset = quarry.position - ctx.pose.position;
        let distance = offset.length();

        if !self.in_aggro(distance) {
            self.state = EnemyState::Idle;
            out.state = self.state;
            Self::publish_speed(ctx, 0.0);
            return out;
        }

        out.facing = look_rotation(offset)
            .map(|desired| turn_towards(ctx.pose.rotation, desired, self.config.rotation_speed, dt));

        let now = ctx.clock.now();
        let mut speed = 0.0;
        if distance <= self.config.attack_range {
            self.state = EnemyState::Attack;
            if self.attack_ready(now) {
                self.last_attack = Some(now);
                ctx.damage.apply_damage(quarry.entity, self.config.attack_damage);
                if let Some(animation) = ctx.animation.as_deref_mut() {
                    animation.trigger(ATTACK_TRIGGER);
                }
                debug!(
                    "Enemy {} struck {} for {}",
                    self.id, quarry.entity, self.config.attack_damage
                );
                out.strike = Some((quarry.entity, self.config.attack_damage));
            }
        } else if distance > self.config.stopping_distance {
            self.state = EnemyState::Chase;
            let direction = flatten(offset).try_normalize().unwrap_or(Vec3::ZERO);
            out.displacement = direction * self.config.move_speed * dt;
            if dt > 0.0 {
                speed = 1.0;
            }
        } else {
            self.state = EnemyState::Idle;
        }
        out.state = self.state;

        if let Some(locomotion) = ctx.locomotion.as_deref_mut() {
            if out.displacement.length_squared() > 0.0 {
                locomotion.request_displacement(out.displacement, dt);
            }
            if let Some(facing) = out.facing.filter(|_| dt > 0.0) {
                locomotion.set_facing(facing);
            }
        }
        Self::publish_speed(ctx, speed);

        out
    }

    fn publish_speed(ctx: &mut EnemyContext<'_>, speed: f32) {
        if let Some(animation) = ctx.animation.as_deref_mut() {
            animation.set_parameter(MOVE_SPEED_PARAM, AnimParam::Float(speed));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{Command, CommandBuffer, SimClock};

    fn player() -> EntityId {
        EntityId::from_raw(1)
    }

    struct Harness {
        clock: SimClock,
        pose: Pose,
        damage: CommandBuffer,
        motion: CommandBuffer,
        anim: CommandBuffer,
    }

    impl Harness {
        fn new(position: Vec3) -> Self {
            Self {
                clock: SimClock::new(),
                pose: Pose::new(position, Quat::IDENTITY),
                damage: CommandBuffer::new(),
                motion: CommandBuffer::new(),
                anim: CommandBuffer::new(),
            }
        }

        fn tick(&mut self, brain: &mut EnemyBrain, dt: f32, player_at: Option<Vec3>) -> EnemyTick {
            self.clock.advance(dt);
            let mut ctx = EnemyContext {
                clock: &self.clock,
                pose: self.pose,
                quarry: player_at.map(|position| Quarry {
                    entity: player(),
                    position,
                }),
                damage: &mut self.damage,
                locomotion: Some(&mut self.motion),
                animation: Some(&mut self.anim),
            };
            let out = brain.tick(dt, &mut ctx);
            self.pose.position += out.displacement;
            out
        }
    }

    fn brain() -> EnemyBrain {
        EnemyBrain::new(EntityId::from_raw(2), EnemyConfig::default())
    }

    #[test]
    fn test_chases_when_far() {
        let mut h = Harness::new(Vec3::new(0.0, 0.0, 10.0));
        let mut enemy = brain();

        let out = h.tick(&mut enemy, 0.5, Some(Vec3::ZERO));
        assert_eq!(out.state, EnemyState::Chase);
        assert!((out.displacement - Vec3::new(0.0, 0.0, -1.5)).length() < 1.0e-4);
        assert!(out.strike.is_none());
        assert!(h
            .anim
            .commands()
            .contains(&Command::AnimParam(MOVE_SPEED_PARAM.into(), AnimParam::Float(1.0))));
    }

    #[test]
    fn test_attacks_once_per_cooldown() {
        let mut h = Harness::new(Vec3::new(0.0, 0.0, 1.0));
        let mut enemy = brain();

        let first = h.tick(&mut enemy, 0.1, Some(Vec3::ZERO));
        assert_eq!(first.state, EnemyState::Attack);
        assert_eq!(first.strike, Some((player(), 10)));

        for _ in 0..10 {
            assert!(h.tick(&mut enemy, 0.1, Some(Vec3::ZERO)).strike.is_none());
        }
        assert_eq!(h.damage.damage_to(player()), 10);

        h.tick(&mut enemy, 1.5, Some(Vec3::ZERO));
        assert_eq!(h.damage.damage_to(player()), 20);
    }

    #[test]
    fn test_aggro_radius_limits_chase() {
        let config = EnemyConfig {
            aggro_radius: Some(5.0),
            ..EnemyConfig::default()
        };
        let mut enemy = EnemyBrain::new(EntityId::from_raw(2), config);
        let mut h = Harness::new(Vec3::new(0.0, 0.0, 8.0));

        let out = h.tick(&mut enemy, 0.5, Some(Vec3::ZERO));
        assert_eq!(out.state, EnemyState::Idle);
        assert_eq!(out.displacement, Vec3::ZERO);
    }

    #[test]
    fn test_idle_without_player() {
        let mut h = Harness::new(Vec3::ZERO);
        let mut enemy = brain();
        assert_eq!(h.tick(&mut enemy, 0.1, None).state, EnemyState::Idle);
    }

    #[test]
    fn test_dead_enemy_does_nothing() {
        let mut h = Harness::new(Vec3::new(0.0, 0.0, 1.0));
        let mut enemy = brain();

        assert!(enemy.take_damage(60).landed());
        assert_eq!(enemy.take_damage(60), DamageOutcome::Killed);
        assert!(enemy.is_dead());

        let out = h.tick(&mut enemy, 1.0, Some(Vec3::ZERO));
        assert_eq!(out.state, EnemyState::Dead);
        assert!(out.strike.is_none());
        assert!(h.damage.is_empty());
    }

    #[test]
    fn test_turns_toward_player() {
        let mut h = Harness::new(Vec3::new(-5.0, 0.0, 0.0));
        let mut enemy = brain();
        let out = h.tick(&mut enemy, 1.0, Some(Vec3::ZERO));
        let facing = out.facing.expect("facing");
        let fwd = riposte_common::math::forward(facing);
        assert!((fwd.x - 1.0).abs() < 1.0e-3);
    }
}
