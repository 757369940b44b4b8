//! Health, invincibility frames, and charge-based healing.

use riposte_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::HealthConfig;
use crate::deferred::DeferredScheduler;

/// Result of [`Health::take_damage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageOutcome {
    /// Damage was subtracted.
    Applied {
        /// Health after the hit.
        remaining: i32,
        /// A heal in progress was cancelled.
        interrupted_heal: bool,
    },
    /// The hit brought health to zero.
    Killed,
    /// Ignored because of i-frames.
    Invincible,
    /// Ignored because health was already zero.
    AlreadyDead,
}

impl DamageOutcome {
    /// Whether health changed.
    #[must_use]
    pub fn landed(self) -> bool {
        matches!(self, Self::Applied { .. } | Self::Killed)
    }
}

/// Result of [`Health::try_heal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealOutcome {
    /// A charge was spent and the heal is winding up.
    Started {
        /// Charges left after this one.
        charges_left: u32,
    },
    /// No charges left.
    NoCharges,
    /// A heal is already running.
    AlreadyHealing,
    /// Too soon after the previous heal.
    OnCooldown,
    /// Health is already full.
    FullHealth,
    /// Dead characters don't heal.
    Dead,
}

/// What changed during [`Health::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthTick {
    /// Health gained this tick.
    pub healed: i32,
    /// The windup ended and health started rising.
    pub heal_started: bool,
    /// The heal completed.
    pub heal_finished: bool,
    /// Invincibility ran out.
    pub invincibility_ended: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HealthDeferred {
    Heal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HealSpan {
    before: i32,
    target: i32,
}

/// Hit points for one entity.
#[derive(Debug, Clone)]
pub struct Health {
    owner: EntityId,
    config: HealthConfig,
    current: i32,
    charges: u32,
    invincibility: f32,
    last_heal: Option<f32>,
    deferred: DeferredScheduler<HealthDeferred, ()>,
    span: Option<HealSpan>,
}

impl Health {
    /// Full health and charges.
    #[must_use]
    pub fn new(owner: EntityId, config: HealthConfig) -> Self {
        Self {
            owner,
            current: config.max_health,
            charges: config.max_charges,
            config,
            invincibility: 0.0,
            last_heal: None,
            deferred: DeferredScheduler::new(),
            span: None,
        }
    }

    /// Current health.
    #[must_use]
    pub fn current(&self) -> i32 {
        self.current
    }

    /// Maximum health.
    #[must_use]
    pub fn max(&self) -> i32 {
        self.config.max_health
    }

    /// `current / max`.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        if self.config.max_health <= 0 {
            return 0.0;
        }
        self.current as f32 / self.config.max_health as f32
    }

    /// Healing charges left.
    #[must_use]
    pub fn charges(&self) -> u32 {
        self.charges
    }

    /// Whether health reached zero.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current <= 0
    }

    /// Whether incoming damage is currently ignored.
    #[must_use]
    pub fn is_invincible(&self) -> bool {
        self.invincibility > 0.0
    }

    /// Seconds of invincibility left.
    #[must_use]
    pub fn invincibility_remaining(&self) -> f32 {
        self.invincibility
    }

    /// Whether a heal is winding up or running.
    #[must_use]
    pub fn is_healing(&self) -> bool {
        self.deferred.is_pending(HealthDeferred::Heal)
    }

    /// Apply `amount` damage.
    pub fn take_damage(&mut self, amount: i32) -> DamageOutcome {
        if self.is_dead() {
            return DamageOutcome::AlreadyDead;
        }
        if self.is_invincible() {
            debug!("{} ignored {} damage during i-frames", self.owner, amount);
            return DamageOutcome::Invincible;
        }

        let interrupted_heal = self.interrupt_heal();
        self.current = self.current.saturating_sub(amount.max(0)).max(0);
        self.invincibility = self.config.invincibility_time;

        if self.is_dead() {
            info!("{} died", self.owner);
            DamageOutcome::Killed
        } else {
            DamageOutcome::Applied {
                remaining: self.current,
                interrupted_heal,
            }
        }
    }

    /// Extend invincibility to at least `seconds`.
    pub fn grant_invincibility(&mut self, seconds: f32) {
        self.invincibility = self.invincibility.max(seconds);
    }

    /// Spend a charge and start healing.
    pub fn try_heal(&mut self, now: f32) -> HealOutcome {
        if self.is_dead() {
            return HealOutcome::Dead;
        }
        if self.is_healing() {
            return HealOutcome::AlreadyHealing;
        }
        if self.charges == 0 {
            return HealOutcome::NoCharges;
        }
        if self
            .last_heal
            .is_some_and(|last| now - last <= self.config.heal_cooldown)
        {
            return HealOutcome::OnCooldown;
        }
        if self.current >= self.config.max_health {
            return HealOutcome::FullHealth;
        }

        self.charges -= 1;
        self.last_heal = Some(now);
        self.span = None;
        self.deferred.schedule(
            HealthDeferred::Heal,
            self.config.heal_windup,
            self.config.heal_duration,
            (),
        );
        HealOutcome::Started {
            charges_left: self.charges,
        }
    }

    /// Cancel a heal in progress. Health gained so far is kept.
    pub fn interrupt_heal(&mut self) -> bool {
        self.span = None;
        let cancelled = self.deferred.cancel(HealthDeferred::Heal).is_some();
        if cancelled {
            debug!("{} heal interrupted", self.owner);
        }
        cancelled
    }

    /// Restore every charge.
    pub fn refill_charges(&mut self) {
        self.charges = self.config.max_charges;
    }

    /// Advance i-frames and healing by `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> HealthTick {
        let dt = dt.max(0.0);
        let mut out = HealthTick::default();

        if self.invincibility > 0.0 {
            self.invincibility -= dt;
            if self.invincibility <= 0.0 {
                self.invincibility = 0.0;
                out.invincibility_ended = dt > 0.0;
            }
        }

        for (_, slice) in self.deferred.advance(dt) {
            if slice.started {
                self.span = Some(HealSpan {
                    before: self.current,
                    target: self
                        .current
                        .saturating_add(self.config.heal_amount)
                        .min(self.config.max_health),
                });
                out.heal_started = true;
            }
            if let Some(span) = self.span {
                let gained = (slice.progress * (span.target - span.before) as f32).round() as i32;
                let next = span.before + gained;
                out.healed += next - self.current;
                self.current = next;
            }
            if slice.finished {
                self.span = None;
                out.heal_finished = true;
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Validate;

    fn health() -> Health {
        Health::new(EntityId::from_raw(1), HealthConfig::default())
    }

    #[test]
    fn test_damage_starts_iframes() {
        let mut h = health();
        assert_eq!(
            h.take_damage(25),
            DamageOutcome::Applied {
                remaining: 75,
                interrupted_heal: false
            }
        );
        assert_eq!(h.take_damage(25), DamageOutcome::Invincible);
        assert_eq!(h.current(), 75);

        h.tick(1.0);
        assert!(!h.is_invincible());
        assert!(h.take_damage(25).landed());
        assert_eq!(h.current(), 50);
    }

    #[test]
    fn test_lethal_damage_then_ignored() {
        let config = HealthConfig {
            invincibility_time: 0.0,
            ..HealthConfig::default()
        };
        let mut h = Health::new(EntityId::from_raw(1), config);
        assert_eq!(h.take_damage(150), DamageOutcome::Killed);
        assert_eq!(h.current(), 0);
        assert!(h.is_dead());
        assert_eq!(h.take_damage(10), DamageOutcome::AlreadyDead);
        assert_eq!(h.try_heal(10.0), HealOutcome::Dead);
    }

    #[test]
    fn test_granted_iframes_block_damage() {
        let mut h = health();
        h.grant_invincibility(0.2);
        assert_eq!(h.take_damage(10), DamageOutcome::Invincible);
        h.tick(0.25);
        assert!(h.take_damage(10).landed());
    }

    #[test]
    fn test_heal_windup_then_linear() {
        let mut h = health();
        h.take_damage(50);
        h.tick(1.0);

        assert_eq!(h.try_heal(5.0), HealOutcome::Started { charges_left: 2 });
        assert!(h.is_healing());

        let windup = h.tick(0.5);
        assert!(windup.heal_started);
        assert_eq!(h.current(), 50);

        let halfway = h.tick(1.0);
        assert_eq!(halfway.healed, 15);
        assert_eq!(h.current(), 65);

        let done = h.tick(1.0);
        assert!(done.heal_finished);
        assert_eq!(h.current(), 80);
        assert!(!h.is_healing());
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut h = health();
        h.take_damage(10);
        h.try_heal(5.0);
        h.tick(3.0);
        assert_eq!(h.current(), 100);
    }

    #[test]
    fn test_heal_preconditions() {
        let mut h = health();
        assert_eq!(h.try_heal(5.0), HealOutcome::FullHealth);

        h.take_damage(90);
        assert!(matches!(h.try_heal(5.0), HealOutcome::Started { .. }));
        assert_eq!(h.try_heal(5.1), HealOutcome::AlreadyHealing);

        h.tick(3.0);
        assert_eq!(h.try_heal(5.5), HealOutcome::OnCooldown);
        assert!(matches!(h.try_heal(6.5), HealOutcome::Started { .. }));
        h.tick(3.0);
        assert!(matches!(h.try_heal(10.0), HealOutcome::Started { .. }));
        h.interrupt_heal();
        assert_eq!(h.charges(), 0);
        assert_eq!(h.try_heal(20.0), HealOutcome::NoCharges);

        h.refill_charges();
        assert_eq!(h.charges(), 3);
    }

    #[test]
    fn test_damage_interrupts_heal() {
        let mut h = health();
        h.take_damage(50);
        h.tick(1.0);
        h.try_heal(5.0);
        h.tick(1.5);
        assert_eq!(h.current(), 65);

        let outcome = h.take_damage(5);
        assert_eq!(
            outcome,
            DamageOutcome::Applied {
                remaining: 60,
                interrupted_heal: true
            }
        );
        assert!(!h.is_healing());

        h.tick(2.0);
        assert_eq!(h.current(), 60);
    }

    #[test]
    fn test_zero_tick_changes_nothing() {
        let mut h = health();
        h.take_damage(20);
        let before = (h.current(), h.invincibility_remaining());
        let out = h.tick(0.0);
        assert_eq!(out, HealthTick::default());
        assert_eq!((h.current(), h.invincibility_remaining()), before);
    }

    #[test]
    fn test_huge_heal_amount_caps_at_max() {
        let config = HealthConfig {
            heal_amount: i32::MAX,
            ..HealthConfig::default()
        };
        assert!(config.validate().is_ok());

        let mut h = Health::new(EntityId::from_raw(1), config);
        h.take_damage(10);
        h.tick(1.0);
        assert!(matches!(h.try_heal(5.0), HealOutcome::Started { .. }));
        let out = h.tick(0.6);
        assert!(out.heal_started);

        h.tick(3.0);
        assert_eq!(h.current(), h.max());
        assert!(!h.is_healing());
    }
}
