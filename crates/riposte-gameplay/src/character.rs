//! The player character: every controller wired together.
//!
//! `handle_input` reacts to one frame of buttons at the current clock time.
//! `tick` then advances the clock, health, movement, lock-on, combat, and
//! camera framing in that order. Cross-controller rules live here:
//! - death releases the lock and interrupts combat
//! - starting a heal interrupts combat
//! - a dash cuts attack recovery short, or is refused while an attack
//!   can't be cancelled

use glam::{Quat, Vec2};
use riposte_common::{ConfigResult, EntityId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::camera::{CameraFraming, CameraRig};
use crate::collaborators::{
    AnimationSink, Clock, CommandBuffer, HitQuery, Locomotion, Pose, SimClock, SpatialQuery,
};
use crate::combat::{
    AttackInputResult, CombatContext, CombatState, CombatStateMachine, CombatTick,
};
use crate::config::{CharacterConfig, Validate};
use crate::events::{EventBus, GameEvent};
use crate::health::{DamageOutcome, HealOutcome, Health};
use crate::movement::{DashOutcome, MovementController};
use crate::targeting::{
    CycleDirection, LockOnEvent, LockOnUpdate, ReleaseReason, TargetLockController,
};

/// Animation trigger for drinking a potion.
pub const HEAL_TRIGGER: &str = "HealingPotion";

/// Animation trigger for a dodge roll.
pub const DODGE_TRIGGER: &str = "dodge";

// ============================================================================
// Input
// ============================================================================

/// One frame of player input. Buttons are edge-triggered presses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputFrame {
    /// Stick: `x` right, `y` forward.
    pub move_axis: Vec2,
    /// Camera orientation the stick is relative to.
    pub camera_rotation: Quat,
    /// Attack pressed.
    pub attack: bool,
    /// Lock-on toggle pressed.
    pub toggle_lock_on: bool,
    /// Cycle target flicked.
    pub cycle_target: Option<CycleDirection>,
    /// Dash pressed.
    pub dash: bool,
    /// Heal pressed.
    pub heal: bool,
}

impl Default for InputFrame {
    fn default() -> Self {
        Self {
            move_axis: Vec2::ZERO,
            camera_rotation: Quat::IDENTITY,
            attack: false,
            toggle_lock_on: false,
            cycle_target: None,
            dash: false,
            heal: false,
        }
    }
}

/// Sinks filled during a call; the host applies them afterwards.
#[derive(Debug, Clone, Default)]
pub struct Requests {
    /// Damage requests.
    pub damage: CommandBuffer,
    /// Displacement and facing requests.
    pub motion: CommandBuffer,
    /// Animation requests.
    pub animation: CommandBuffer,
}

impl Requests {
    /// Create empty buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.damage.is_empty() && self.motion.is_empty() && self.animation.is_empty()
    }

    fn combat_context<'a>(
        &'a mut self,
        clock: &'a dyn Clock,
        pose: Pose,
        hits: &'a dyn HitQuery,
    ) -> CombatContext<'a> {
        CombatContext::new(clock, pose, hits, &mut self.damage)
            .with_locomotion(&mut self.motion)
            .with_animation(&mut self.animation)
    }
}

/// Everything that happened during [`Character::tick`].
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterTick {
    /// Combat report.
    pub combat: CombatTick,
    /// Lock-on report.
    pub lock: LockOnUpdate,
    /// Camera framing for this frame.
    pub camera: CameraRig,
}

// ============================================================================
// Character
// ============================================================================

/// A player-controlled character.
#[derive(Debug)]
pub struct Character {
    id: EntityId,
    clock: SimClock,
    combat: CombatStateMachine,
    lock: TargetLockController,
    health: Health,
    movement: MovementController,
    camera: CameraFraming,
    bus: EventBus,
}

impl Character {
    /// Build a character from validated config.
    pub fn new(id: EntityId, config: CharacterConfig, bus: EventBus) -> ConfigResult<Self> {
        config.validate()?;
        let camera = CameraFraming::new(config.camera, config.lock_on.target_offset);
        Ok(Self {
            id,
            clock: SimClock::new(),
            combat: CombatStateMachine::new(id, config.combat)?,
            lock: TargetLockController::new(id, config.lock_on),
            health: Health::new(id, config.health),
            movement: MovementController::new(config.movement),
            camera,
            bus,
        })
    }

    /// Entity ID.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Simulation clock.
    #[must_use]
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Combat state machine.
    #[must_use]
    pub fn combat(&self) -> &CombatStateMachine {
        &self.combat
    }

    /// Lock-on controller.
    #[must_use]
    pub fn lock(&self) -> &TargetLockController {
        &self.lock
    }

    /// Health.
    #[must_use]
    pub fn health(&self) -> &Health {
        &self.health
    }

    /// Movement controller.
    #[must_use]
    pub fn movement(&self) -> &MovementController {
        &self.movement
    }

    /// Event bus this character publishes to.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Whether health reached zero.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.health.is_dead()
    }

    fn publish(&self, event: GameEvent) {
        self.bus.publish(event);
    }

    fn publish_health(&self) {
        self.publish(GameEvent::HealthChanged {
            entity_id: self.id,
            current: self.health.current(),
            max: self.health.max(),
        });
    }

    fn publish_lock(&self, event: LockOnEvent) {
        let event = match event {
            LockOnEvent::Acquired(target) => GameEvent::TargetLocked {
                entity_id: self.id,
                target,
            },
            LockOnEvent::Switched { from, to } => GameEvent::TargetSwitched {
                entity_id: self.id,
                from,
                to,
            },
            LockOnEvent::Released { target, reason } => GameEvent::TargetReleased {
                entity_id: self.id,
                target,
                reason,
            },
            LockOnEvent::NoTarget | LockOnEvent::Unchanged => return,
        };
        self.publish(event);
    }

    /// Apply incoming damage and every consequence of it.
    pub fn take_damage(&mut self, amount: i32) -> DamageOutcome {
        let outcome = self.health.take_damage(amount);
        match outcome {
            DamageOutcome::Applied {
                interrupted_heal, ..
            } => {
                if interrupted_heal {
                    self.publish(GameEvent::HealInterrupted { entity_id: self.id });
                }
                self.publish_health();
            },
            DamageOutcome::Killed => {
                self.publish_health();
                self.on_death();
            },
            DamageOutcome::Invincible | DamageOutcome::AlreadyDead => {},
        }
        outcome
    }

    fn on_death(&mut self) {
        let released = self.lock.release(ReleaseReason::Interrupted);
        self.publish_lock(released);
        self.combat.interrupt();
        self.movement.halt();
        info!("Character {} died", self.id);
        self.publish(GameEvent::EntityDied { entity_id: self.id });
    }

    /// React to one frame of input at the current clock time.
    pub fn handle_input<W>(&mut self, input: &InputFrame, pose: &Pose, world: &W, out: &mut Requests)
    where
        W: SpatialQuery + HitQuery,
    {
        if self.is_dead() {
            self.movement.halt();
            return;
        }

        let basis = if self.lock.is_locked_on() {
            pose.rotation
        } else {
            input.camera_rotation
        };
        self.movement.set_move_input(input.move_axis, basis);

        if input.heal {
            self.try_heal(&mut out.animation);
        }
        if input.dash {
            self.try_dash(pose, &mut out.animation);
        }
        if input.toggle_lock_on {
            let event = self.lock.on_toggle_lock_on(pose, world);
            self.publish_lock(event);
        }
        if let Some(direction) = input.cycle_target {
            let event = self.lock.on_cycle_target(direction, pose, world);
            self.publish_lock(event);
        }
        if input.attack && !self.health.is_healing() && !self.movement.is_dashing() {
            let mut ctx = out.combat_context(&self.clock, *pose, world);
            let result = self.combat.on_input_attack(&mut ctx);
            if let AttackInputResult::Started { combo_index }
            | AttackInputResult::Chained { combo_index } = result
            {
                self.publish(GameEvent::AttackStarted {
                    entity_id: self.id,
                    combo_index,
                });
            }
        }
    }

    fn try_heal(&mut self, animation: &mut CommandBuffer) {
        if let HealOutcome::Started { charges_left } = self.health.try_heal(self.clock.now()) {
            self.combat.interrupt();
            animation.trigger(HEAL_TRIGGER);
            self.publish(GameEvent::HealStarted {
                entity_id: self.id,
                charges_left,
            });
        }
    }

    fn try_dash(&mut self, pose: &Pose, animation: &mut CommandBuffer) {
        if self.combat.state() == CombatState::Attacking && !self.combat.cancel_recovery() {
            return;
        }
        if let DashOutcome::Started { .. } = self.movement.try_dash(pose.forward()) {
            self.health
                .grant_invincibility(self.movement.config().dodge_iframes);
            animation.trigger(DODGE_TRIGGER);
            self.publish(GameEvent::DodgeStarted { entity_id: self.id });
        }
    }

    /// Advance every controller by `dt`.
    pub fn tick<W>(&mut self, dt: f32, pose: &Pose, world: &W, out: &mut Requests) -> CharacterTick
    where
        W: SpatialQuery + HitQuery,
    {
        let dt = dt.max(0.0);
        self.clock.advance(dt);

        let health = self.health.tick(dt);
        if health.healed != 0 {
            self.publish_health();
        }

        let alive = !self.is_dead();
        if alive {
            self.movement
                .tick(dt, pose, self.lock.is_locked_on(), Some(&mut out.motion));
        }

        let lock = self.lock.tick(dt, pose, world);
        self.publish_lock(lock.event);
        if let Some(facing) = lock.facing.filter(|_| dt > 0.0) {
            out.motion.set_facing(facing);
        }

        let combat = if alive {
            let mut ctx = out.combat_context(&self.clock, *pose, world);
            self.combat.tick(dt, &mut ctx)
        } else {
            CombatTick::default()
        };
        if combat.weapon_drawn {
            self.publish(GameEvent::WeaponDrawn { entity_id: self.id });
        }
        for hit in &combat.hits {
            self.publish(GameEvent::HitLanded {
                attacker: self.id,
                target: hit.target,
                damage: hit.damage,
            });
        }
        if combat.attack_finished {
            self.publish(GameEvent::ComboFinished { entity_id: self.id });
        }

        let camera = self.camera.update(dt, pose.position, lock.target_position);

        CharacterTick {
            combat,
            lock,
            camera,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{Command, HitShape};
    use glam::Vec3;
    use riposte_common::LayerMask;

    struct Arena {
        enemies: Vec<(EntityId, Vec3)>,
    }

    impl SpatialQuery for Arena {
        fn query_in_radius(&self, origin: Vec3, radius: f32, _layers: LayerMask) -> Vec<EntityId> {
            self.enemies
                .iter()
                .filter(|(_, p)| p.distance(origin) <= radius)
                .map(|(e, _)| *e)
                .collect()
        }

        fn line_of_sight_blocked(&self, _from: Vec3, _to: Vec3, _obstruction: LayerMask) -> bool {
            false
        }

        fn position(&self, entity: EntityId) -> Option<Vec3> {
            self.enemies
                .iter()
                .find(|(e, _)| *e == entity)
                .map(|(_, p)| *p)
        }
    }

    impl HitQuery for Arena {
        fn query_volume(&self, shape: &HitShape) -> Vec<EntityId> {
            let HitShape::Sphere { center, radius, .. } = *shape;
            self.enemies
                .iter()
                .filter(|(_, p)| (*p + Vec3::Y).distance(center) <= radius)
                .map(|(e, _)| *e)
                .collect()
        }
    }

    fn enemy() -> EntityId {
        EntityId::from_raw(20)
    }

    fn setup() -> (Character, Arena) {
        let character =
            Character::new(EntityId::from_raw(10), CharacterConfig::default(), EventBus::new(64))
                .expect("valid config");
        let arena = Arena {
            enemies: vec![(enemy(), Vec3::new(0.0, 0.0, 1.5))],
        };
        (character, arena)
    }

    fn press(apply: impl FnOnce(&mut InputFrame)) -> InputFrame {
        let mut input = InputFrame::default();
        apply(&mut input);
        input
    }

    #[test]
    fn test_attack_hits_enemy_in_front() {
        let (mut c, arena) = setup();
        let pose = Pose::default();
        let mut out = Requests::new();

        c.handle_input(&press(|i| i.attack = true), &pose, &arena, &mut out);
        c.tick(0.3, &pose, &arena, &mut out);

        assert_eq!(out.damage.damage_to(enemy()), 25);
        let events = c.bus().drain();
        assert!(events.contains(&GameEvent::AttackStarted {
            entity_id: c.id(),
            combo_index: 0
        }));
        assert!(events.contains(&GameEvent::HitLanded {
            attacker: c.id(),
            target: enemy(),
            damage: 25
        }));
    }

    #[test]
    fn test_death_releases_lock_and_interrupts_combat() {
        let (mut c, arena) = setup();
        let pose = Pose::default();
        let mut out = Requests::new();

        c.handle_input(
            &press(|i| {
                i.toggle_lock_on = true;
                i.attack = true;
            }),
            &pose,
            &arena,
            &mut out,
        );
        assert!(c.lock().is_locked_on());
        assert!(c.combat().is_attacking());

        assert_eq!(c.take_damage(500), DamageOutcome::Killed);
        assert!(!c.lock().is_locked_on());
        assert_eq!(c.combat().state(), CombatState::Idle);

        let events = c.bus().drain();
        assert!(events.contains(&GameEvent::TargetReleased {
            entity_id: c.id(),
            target: enemy(),
            reason: ReleaseReason::Interrupted
        }));
        assert_eq!(events.last(), Some(&GameEvent::EntityDied { entity_id: c.id() }));

        out.damage.drain();
        c.handle_input(&press(|i| i.attack = true), &pose, &arena, &mut out);
        c.tick(0.5, &pose, &arena, &mut out);
        assert!(out.damage.is_empty());
    }

    #[test]
    fn test_heal_interrupts_attack() {
        let (mut c, arena) = setup();
        let pose = Pose::default();
        let mut out = Requests::new();

        c.take_damage(50);
        c.tick(1.5, &pose, &arena, &mut out);

        c.handle_input(&press(|i| i.attack = true), &pose, &arena, &mut out);
        assert!(c.combat().is_attacking());

        c.handle_input(&press(|i| i.heal = true), &pose, &arena, &mut out);
        assert!(c.health().is_healing());
        assert_eq!(c.combat().state(), CombatState::Idle);
        assert!(out
            .animation
            .commands()
            .contains(&Command::AnimTrigger(HEAL_TRIGGER.into())));

        c.handle_input(&press(|i| i.attack = true), &pose, &arena, &mut out);
        assert!(!c.combat().is_attacking());
    }

    #[test]
    fn test_dash_cancels_recovery_after_hit() {
        let (mut c, arena) = setup();
        let pose = Pose::default();
        let mut out = Requests::new();

        c.handle_input(&press(|i| i.attack = true), &pose, &arena, &mut out);
        c.tick(0.35, &pose, &arena, &mut out);
        assert!(c.combat().hit_dispatched());

        c.handle_input(&press(|i| i.dash = true), &pose, &arena, &mut out);
        assert_eq!(c.combat().state(), CombatState::Idle);
        assert!(c.movement().is_dashing());
        assert!(c.health().is_invincible());
        assert_eq!(c.take_damage(10), DamageOutcome::Invincible);
    }

    #[test]
    fn test_dash_refused_before_hit() {
        let (mut c, arena) = setup();
        let pose = Pose::default();
        let mut out = Requests::new();

        c.handle_input(&press(|i| i.attack = true), &pose, &arena, &mut out);
        c.tick(0.1, &pose, &arena, &mut out);

        c.handle_input(&press(|i| i.dash = true), &pose, &arena, &mut out);
        assert!(c.combat().is_attacking());
        assert!(!c.movement().is_dashing());
    }

    #[test]
    fn test_zero_tick_is_idempotent() {
        let (mut c, arena) = setup();
        let pose = Pose::default();
        let mut out = Requests::new();

        c.handle_input(
            &press(|i| {
                i.toggle_lock_on = true;
                i.attack = true;
            }),
            &pose,
            &arena,
            &mut out,
        );
        let before = (
            c.combat().state(),
            c.combat().combo_index(),
            c.lock().state(),
            c.health().current(),
        );
        c.tick(0.0, &pose, &arena, &mut out);
        assert_eq!(
            before,
            (
                c.combat().state(),
                c.combat().combo_index(),
                c.lock().state(),
                c.health().current(),
            )
        );
    }

    #[test]
    fn test_lock_drives_facing_and_camera() {
        let (mut c, mut arena) = setup();
        arena.enemies[0].1 = Vec3::new(3.0, 0.0, 3.0);
        let pose = Pose::default();
        let mut out = Requests::new();

        c.handle_input(&press(|i| i.toggle_lock_on = true), &pose, &arena, &mut out);
        let tick = c.tick(0.016, &pose, &arena, &mut out);

        assert_eq!(tick.lock.target, Some(enemy()));
        assert!(tick.camera.position.is_some());
        assert!(out
            .motion
            .commands()
            .iter()
            .any(|cmd| matches!(cmd, Command::Face(_))));
    }
}
