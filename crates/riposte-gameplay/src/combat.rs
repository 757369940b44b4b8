//! Melee combo logic.
//!
//! This module provides:
//! - Timer-driven attack chain (draw, idle, attacking, combo window)
//! - Guarded single damage dispatch per attack
//! - Deferred lunge displacement during an attack
//! - Interrupt and recovery-cancel hooks for dodge, healing, and death

use glam::Vec3;
use riposte_common::{ConfigResult, EntityId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collaborators::{
    AnimParam, AnimationSink, Clock, DamageSink, HitQuery, HitShape, Locomotion, Pose,
};
use crate::config::CombatConfig;
use crate::deferred::DeferredScheduler;

// ============================================================================
// Attack Definitions
// ============================================================================

/// One step of the combo chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackDefinition {
    /// Seconds into the attack when damage applies.
    pub hit_time: f32,
    /// Seconds until the attack concludes.
    pub recover_time: f32,
    /// Damage dealt to each struck entity.
    pub damage: i32,
}

impl AttackDefinition {
    /// Create an attack definition.
    #[must_use]
    pub fn new(hit_time: f32, recover_time: f32, damage: i32) -> Self {
        Self {
            hit_time,
            recover_time,
            damage,
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// Phase of the combat state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatState {
    /// Ready to attack.
    Idle,
    /// Drawing the weapon; input is ignored.
    DrawingWeapon,
    /// An attack is running.
    Attacking,
}

/// Result of an attack input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttackInputResult {
    /// A fresh chain started.
    Started {
        /// Always 0 for a fresh chain.
        combo_index: usize,
    },
    /// The running attack chained into the next one.
    Chained {
        /// Index of the new attack.
        combo_index: usize,
    },
    /// The weapon is being drawn instead of attacking.
    DrawingWeapon,
    /// Too soon after the last attack started.
    OnCooldown {
        /// Seconds until a fresh chain can start.
        remaining: f32,
    },
    /// Mid-attack and not eligible to chain.
    Busy,
}

impl AttackInputResult {
    /// Whether an attack started.
    #[must_use]
    pub fn started_attack(&self) -> bool {
        matches!(self, Self::Started { .. } | Self::Chained { .. })
    }
}

/// Damage applied to one entity by one attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeleeHit {
    /// Struck entity.
    pub target: EntityId,
    /// Damage requested.
    pub damage: i32,
    /// Combo step that dealt the hit.
    pub combo_index: usize,
}

/// What happened during one combat tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombatTick {
    /// Hits dispatched this tick.
    pub hits: Vec<MeleeHit>,
    /// Whether the hit window passed this tick (even with no targets).
    pub hit_window_passed: bool,
    /// The chain ended and the machine returned to idle.
    pub attack_finished: bool,
    /// The weapon finished drawing.
    pub weapon_drawn: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CombatDeferred {
    Lunge,
}

// ============================================================================
// Context
// ============================================================================

/// Collaborators handed to the machine for one call.
pub struct CombatContext<'a> {
    /// Time source.
    pub clock: &'a dyn Clock,
    /// Character pose at the start of the tick.
    pub pose: Pose,
    /// Melee overlap test.
    pub hits: &'a dyn HitQuery,
    /// Where damage requests go.
    pub damage: &'a mut dyn DamageSink,
    /// Lunge displacement; skipped when unbound.
    pub locomotion: Option<&'a mut dyn Locomotion>,
    /// Animation requests; skipped when unbound.
    pub animation: Option<&'a mut dyn AnimationSink>,
}

impl<'a> CombatContext<'a> {
    /// Create a context without locomotion or animation.
    pub fn new(
        clock: &'a dyn Clock,
        pose: Pose,
        hits: &'a dyn HitQuery,
        damage: &'a mut dyn DamageSink,
    ) -> Self {
        Self {
            clock,
            pose,
            hits,
            damage,
            locomotion: None,
            animation: None,
        }
    }

    /// Bind a locomotion sink.
    #[must_use]
    pub fn with_locomotion(mut self, locomotion: &'a mut dyn Locomotion) -> Self {
        self.locomotion = Some(locomotion);
        self
    }

    /// Bind an animation sink.
    #[must_use]
    pub fn with_animation(mut self, animation: &'a mut dyn AnimationSink) -> Self {
        self.animation = Some(animation);
        self
    }

    fn trigger(&mut self, name: &str) {
        if let Some(animation) = self.animation.as_deref_mut() {
            animation.trigger(name);
        }
    }

    fn set_parameter(&mut self, name: &str, value: AnimParam) {
        if let Some(animation) = self.animation.as_deref_mut() {
            animation.set_parameter(name, value);
        }
    }
}

// ============================================================================
// Combat State Machine
// ============================================================================

/// Attack and combo timing for one character.
#[derive(Debug, Clone)]
pub struct CombatStateMachine {
    owner: EntityId,
    attacks: Vec<AttackDefinition>,
    config: CombatConfig,
    state: CombatState,
    combo_index: usize,
    attack_timer: f32,
    draw_timer: f32,
    weapon_drawn: bool,
    last_attack_start: Option<f32>,
    hit_dispatched: bool,
    attacks_started: u64,
    deferred: DeferredScheduler<CombatDeferred, Vec3>,
}

impl CombatStateMachine {
    /// Create a machine for `owner`. Fails if the attack tables are invalid.
    pub fn new(owner: EntityId, config: CombatConfig) -> ConfigResult<Self> {
        let attacks = config.attacks()?;
        Ok(Self {
            owner,
            attacks,
            weapon_drawn: !config.starts_sheathed,
            config,
            state: CombatState::Idle,
            combo_index: 0,
            attack_timer: 0.0,
            draw_timer: 0.0,
            last_attack_start: None,
            hit_dispatched: false,
            attacks_started: 0,
            deferred: DeferredScheduler::new(),
        })
    }

    /// Current phase.
    #[must_use]
    pub fn state(&self) -> CombatState {
        self.state
    }

    /// Index of the current (or next) attack in the chain.
    #[must_use]
    pub fn combo_index(&self) -> usize {
        self.combo_index
    }

    /// Seconds since the current attack started.
    #[must_use]
    pub fn attack_timer(&self) -> f32 {
        self.attack_timer
    }

    /// Whether the current attack already dealt its damage.
    #[must_use]
    pub fn hit_dispatched(&self) -> bool {
        self.hit_dispatched
    }

    /// Whether the weapon is out.
    #[must_use]
    pub fn weapon_drawn(&self) -> bool {
        self.weapon_drawn
    }

    /// Clock time of the most recent attack start.
    #[must_use]
    pub fn last_attack_start(&self) -> Option<f32> {
        self.last_attack_start
    }

    /// Number of attacks started over the machine's lifetime.
    #[must_use]
    pub fn attacks_started(&self) -> u64 {
        self.attacks_started
    }

    /// The attack chain.
    #[must_use]
    pub fn attacks(&self) -> &[AttackDefinition] {
        &self.attacks
    }

    /// Whether an attack is running.
    #[must_use]
    pub fn is_attacking(&self) -> bool {
        self.state == CombatState::Attacking
    }

    /// Whether a lunge is waiting or running.
    #[must_use]
    pub fn lunge_pending(&self) -> bool {
        self.deferred.is_pending(CombatDeferred::Lunge)
    }

    fn current_attack(&self) -> AttackDefinition {
        self.attacks[self.combo_index]
    }

    fn is_final_attack(&self) -> bool {
        self.combo_index + 1 >= self.attacks.len()
    }

    fn since_last_attack(&self, now: f32) -> Option<f32> {
        self.last_attack_start.map(|start| now - start)
    }

    fn cooldown_remaining(&self, now: f32) -> f32 {
        self.since_last_attack(now)
            .map_or(0.0, |since| (self.config.attack_cooldown - since).max(0.0))
    }

    fn within_combo_window(&self, now: f32) -> bool {
        self.since_last_attack(now)
            .is_some_and(|since| since <= self.config.combo_reset_window)
    }

    /// Whether an attack input right now would chain.
    #[must_use]
    pub fn can_chain(&self, now: f32) -> bool {
        self.state == CombatState::Attacking
            && !self.is_final_attack()
            && self.attack_timer >= self.current_attack().hit_time
            && self.within_combo_window(now)
    }

    fn can_cancel_finisher(&self, now: f32) -> bool {
        self.config.finisher_cancelable
            && self.state == CombatState::Attacking
            && self.is_final_attack()
            && self.hit_dispatched
            && self.cooldown_remaining(now) <= 0.0
    }

    /// Handle an edge-triggered attack input.
    pub fn on_input_attack(&mut self, ctx: &mut CombatContext<'_>) -> AttackInputResult {
        let now = ctx.clock.now();

        match self.state {
            CombatState::DrawingWeapon => AttackInputResult::Busy,
            CombatState::Idle if !self.weapon_drawn => {
                self.start_drawing(ctx);
                if self.weapon_drawn {
                    // Zero draw time: the weapon is already out.
                    return self.on_input_attack(ctx);
                }
                AttackInputResult::DrawingWeapon
            },
            CombatState::Idle => {
                let remaining = self.cooldown_remaining(now);
                if remaining > 0.0 {
                    return AttackInputResult::OnCooldown { remaining };
                }
                self.start_attack(0, ctx);
                AttackInputResult::Started { combo_index: 0 }
            },
            CombatState::Attacking => {
                if self.can_chain(now) {
                    let next = self.combo_index + 1;
                    self.start_attack(next, ctx);
                    AttackInputResult::Chained { combo_index: next }
                } else if self.can_cancel_finisher(now) {
                    debug!("Finisher recovery cancelled into a fresh chain");
                    self.start_attack(0, ctx);
                    AttackInputResult::Started { combo_index: 0 }
                } else {
                    AttackInputResult::Busy
                }
            },
        }
    }

    fn start_drawing(&mut self, ctx: &mut CombatContext<'_>) {
        ctx.trigger("drawWeapon");
        if self.config.draw_time <= 0.0 {
            self.finish_drawing(ctx);
            return;
        }
        self.state = CombatState::DrawingWeapon;
        self.draw_timer = 0.0;
    }

    fn finish_drawing(&mut self, ctx: &mut CombatContext<'_>) {
        self.state = CombatState::Idle;
        self.draw_timer = 0.0;
        self.weapon_drawn = true;
        ctx.set_parameter("weaponDrawn", AnimParam::Bool(true));
    }

    fn start_attack(&mut self, combo_index: usize, ctx: &mut CombatContext<'_>) {
        self.state = CombatState::Attacking;
        self.combo_index = combo_index;
        self.attack_timer = 0.0;
        self.hit_dispatched = false;
        self.last_attack_start = Some(ctx.clock.now());
        self.attacks_started += 1;

        if self.config.lunge_distance > 0.0 {
            let displacement = ctx.pose.forward() * self.config.lunge_distance;
            let replaced = self.deferred.schedule(
                CombatDeferred::Lunge,
                self.config.lunge_delay,
                self.config.lunge_duration,
                displacement,
            );
            if replaced {
                debug!("Pending lunge replaced by attack {}", combo_index);
            }
        }

        ctx.set_parameter("comboStep", AnimParam::Int(combo_index as i32));
        ctx.trigger("attackTrigger");
    }

    /// Advance timers by `dt` seconds.
    pub fn tick(&mut self, dt: f32, ctx: &mut CombatContext<'_>) -> CombatTick {
        let dt = dt.max(0.0);
        let now = ctx.clock.now();
        let mut report = CombatTick::default();

        match self.state {
            CombatState::DrawingWeapon => {
                self.draw_timer += dt;
                if self.draw_timer >= self.config.draw_time {
                    self.finish_drawing(ctx);
                    report.weapon_drawn = true;
                }
            },
            CombatState::Attacking => {
                self.attack_timer += dt;
                let attack = self.current_attack();

                if !self.hit_dispatched && self.attack_timer >= attack.hit_time {
                    report.hits = self.dispatch_hit(attack, ctx);
                    report.hit_window_passed = true;
                    self.hit_dispatched = true;
                }

                if self.attack_timer >= attack.recover_time {
                    self.state = CombatState::Idle;
                    self.combo_index = 0;
                    self.attack_timer = 0.0;
                    report.attack_finished = true;
                    ctx.set_parameter("comboStep", AnimParam::Int(0));
                    ctx.trigger("attackReset");
                }
            },
            CombatState::Idle => {
                if self.combo_index != 0 && !self.within_combo_window(now) {
                    self.combo_index = 0;
                }
            },
        }

        self.advance_lunge(dt, ctx);
        report
    }

    /// The single damage-application point.
    fn dispatch_hit(
        &self,
        attack: AttackDefinition,
        ctx: &mut CombatContext<'_>,
    ) -> Vec<MeleeHit> {
        let forward = ctx.pose.forward();
        let center = ctx.pose.position
            + forward * self.config.attack_reach
            + Vec3::Y * self.config.attack_height;
        let shape = HitShape::Sphere {
            center,
            radius: self.config.attack_range,
            layers: self.config.hit_layers,
        };

        let mut struck: Vec<EntityId> = Vec::new();
        for entity in ctx.hits.query_volume(&shape) {
            if entity != self.owner && entity.is_valid() && !struck.contains(&entity) {
                struck.push(entity);
            }
        }

        for &target in &struck {
            ctx.damage.apply_damage(target, attack.damage);
        }

        debug!(
            "Attack {} struck {} target(s) for {} each",
            self.combo_index,
            struck.len(),
            attack.damage
        );

        struck
            .into_iter()
            .map(|target| MeleeHit {
                target,
                damage: attack.damage,
                combo_index: self.combo_index,
            })
            .collect()
    }

    fn advance_lunge(&mut self, dt: f32, ctx: &mut CombatContext<'_>) {
        let duration = self.config.lunge_duration;
        for (_, slice) in self.deferred.advance(dt) {
            let portion = if duration <= 0.0 {
                slice.action
            } else {
                slice.action * (slice.active_time / duration)
            };
            if portion == Vec3::ZERO {
                continue;
            }
            if let Some(locomotion) = ctx.locomotion.as_deref_mut() {
                locomotion.request_displacement(portion, slice.active_time);
            }
        }
    }

    /// Abort everything in progress and return to idle.
    ///
    /// Returns `true` if there was anything to abort.
    pub fn interrupt(&mut self) -> bool {
        let was_busy = self.state != CombatState::Idle || !self.deferred.is_empty();
        self.state = CombatState::Idle;
        self.combo_index = 0;
        self.attack_timer = 0.0;
        self.draw_timer = 0.0;
        self.deferred.clear();
        was_busy
    }

    /// Cut an attack's recovery short (e.g. for a dodge).
    ///
    /// Only allowed after the hit has dispatched; the last attack of the
    /// chain additionally needs `finisher_cancelable`.
    pub fn cancel_recovery(&mut self) -> bool {
        let allowed = self.state == CombatState::Attacking
            && self.hit_dispatched
            && (!self.is_final_attack() || self.config.finisher_cancelable);
        if allowed {
            self.interrupt();
        }
        allowed
    }
}

// ============================================================================
// Tests
// ============================================================================
