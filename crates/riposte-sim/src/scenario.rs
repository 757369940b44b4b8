//! Scripted encounters.
//!
//! A [`Scenario`] describes the arena, the combatants' tuning, and a timed
//! list of player inputs. An [`Encounter`] plays it back at a fixed step.

use glam::{Quat, Vec2, Vec3};
use riposte_common::{ConfigError, ConfigResult, EntityId, LayerMask};
use riposte_gameplay::config::Validate;
use riposte_gameplay::{
    Character, CharacterConfig, Clock, Command, CommandBuffer, CycleDirection, DamageOutcome,
    EnemyBrain, EnemyConfig, EnemyContext, EventBus, GameEvent, InputFrame, Quarry, Requests,
    SimClock, SpatialQuery,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::arena::{Arena, Obstacle};

/// Collision radius of every combatant.
const BODY_RADIUS: f32 = 0.5;

// ============================================================================
// Scenario
// ============================================================================

/// A scripted player input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Press attack.
    Attack,
    /// Press lock-on.
    ToggleLockOn,
    /// Flick to the next target on the left.
    CycleLeft,
    /// Flick to the next target on the right.
    CycleRight,
    /// Flick the look stick horizontally; cycles target outside the dead zone.
    Look {
        /// Right.
        x: f32,
    },
    /// Press dash.
    Dash,
    /// Press heal.
    Heal,
    /// Hold the stick (`x` right, `y` forward) until changed.
    Move {
        /// Right.
        x: f32,
        /// Forward.
        y: f32,
    },
    /// Release the stick.
    Stop,
}

/// An action fired at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    /// Seconds since the encounter started.
    pub at: f32,
    /// What the player does.
    pub action: Action,
}

impl ScriptStep {
    /// Create a step.
    #[must_use]
    pub fn new(at: f32, action: Action) -> Self {
        Self { at, action }
    }
}

/// Everything needed to play an encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Seconds to simulate.
    pub duration: f32,
    /// Fixed step in seconds.
    pub time_step: f32,
    /// Player tuning.
    pub player: CharacterConfig,
    /// Tuning shared by every enemy.
    pub enemy: EnemyConfig,
    /// Enemy starting positions. The player starts at the origin facing +Z.
    pub enemy_spawns: Vec<Vec3>,
    /// Sight-blocking spheres.
    pub obstacles: Vec<Obstacle>,
    /// Player inputs, in any order.
    pub script: Vec<ScriptStep>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            duration: 8.0,
            time_step: 1.0 / 60.0,
            player: CharacterConfig::default(),
            enemy: EnemyConfig::default(),
            enemy_spawns: vec![Vec3::new(0.0, 0.0, 5.0), Vec3::new(4.0, 0.0, 6.0)],
            obstacles: Vec::new(),
            script: vec![
                ScriptStep::new(0.0, Action::ToggleLockOn),
                ScriptStep::new(1.3, Action::Attack),
                ScriptStep::new(1.7, Action::Attack),
                ScriptStep::new(2.6, Action::Attack),
                ScriptStep::new(3.0, Action::Attack),
                ScriptStep::new(3.4, Action::Dash),
                ScriptStep::new(4.0, Action::Heal),
                ScriptStep::new(6.5, Action::ToggleLockOn),
                ScriptStep::new(6.6, Action::Attack),
                ScriptStep::new(7.0, Action::Attack),
            ],
        }
    }
}

impl Validate for Scenario {
    fn validate(&self) -> ConfigResult<()> {
        if !(self.time_step.is_finite() && self.time_step > 0.0) {
            return Err(ConfigError::invalid("time_step", "must be > 0"));
        }
        if !(self.duration.is_finite() && self.duration >= 0.0) {
            return Err(ConfigError::invalid("duration", "must be >= 0"));
        }
        self.player.validate()?;
        self.enemy.validate()
    }
}

// ============================================================================
// Encounter
// ============================================================================

/// Outcome of an encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterSummary {
    /// Simulated seconds.
    pub elapsed: f32,
    /// Player health at the end.
    pub player_health: i32,
    /// Healing charges left.
    pub player_charges: u32,
    /// Enemies killed.
    pub enemies_defeated: usize,
    /// Enemies spawned.
    pub enemies_total: usize,
}

/// A running scenario.
#[derive(Debug)]
pub struct Encounter {
    scenario: Scenario,
    arena: Arena,
    clock: SimClock,
    player_id: EntityId,
    player: Character,
    enemies: Vec<EnemyBrain>,
    bus: EventBus,
    requests: Requests,
    move_axis: Vec2,
    next_step: usize,
}

impl Encounter {
    /// Spawn everything the scenario names.
    pub fn new(mut scenario: Scenario, bus: EventBus) -> ConfigResult<Self> {
        scenario.validate()?;
        scenario
            .script
            .sort_by(|a, b| a.at.total_cmp(&b.at));

        let mut arena = Arena::new();
        for obstacle in &scenario.obstacles {
            arena.add_obstacle(*obstacle);
        }

        let player_id = arena.spawn(Vec3::ZERO, BODY_RADIUS, LayerMask::PLAYER);
        let player = Character::new(player_id, scenario.player.clone(), bus.clone())?;

        let enemies: Vec<EnemyBrain> = scenario
            .enemy_spawns
            .iter()
            .map(|&position| {
                let id = arena.spawn(position, BODY_RADIUS, LayerMask::ENEMY);
                EnemyBrain::new(id, scenario.enemy.clone())
            })
            .collect();

        info!(
            "Encounter ready: {} enemies, {} scripted inputs",
            scenario.enemy_spawns.len(),
            scenario.script.len()
        );

        Ok(Self {
            scenario,
            arena,
            clock: SimClock::new(),
            player_id,
            player,
            enemies,
            bus,
            requests: Requests::new(),
            move_axis: Vec2::ZERO,
            next_step: 0,
        })
    }

    /// The arena.
    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// The player character.
    #[must_use]
    pub fn player(&self) -> &Character {
        &self.player
    }

    /// Enemy brains, including dead ones.
    #[must_use]
    pub fn enemies(&self) -> &[EnemyBrain] {
        &self.enemies
    }

    /// Seconds simulated so far.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.clock.now()
    }

    /// Whether time ran out or one side is wiped out.
    #[must_use]
    pub fn finished(&self) -> bool {
        self.elapsed() >= self.scenario.duration
            || self.player.is_dead()
            || self.enemies.iter().all(EnemyBrain::is_dead)
    }

    /// Current results.
    #[must_use]
    pub fn summary(&self) -> EncounterSummary {
        EncounterSummary {
            elapsed: self.elapsed(),
            player_health: self.player.health().current(),
            player_charges: self.player.health().charges(),
            enemies_defeated: self.enemies.iter().filter(|e| e.is_dead()).count(),
            enemies_total: self.enemies.len(),
        }
    }

    fn gather_input(&mut self, dt: f32) -> InputFrame {
        let mut input = InputFrame {
            camera_rotation: Quat::IDENTITY,
            ..InputFrame::default()
        };
        let horizon = self.elapsed() + dt;

        while let Some(step) = self.scenario.script.get(self.next_step) {
            if step.at >= horizon {
                break;
            }
            match step.action {
                Action::Attack => input.attack = true,
                Action::ToggleLockOn => input.toggle_lock_on = true,
                Action::CycleLeft => input.cycle_target = Some(CycleDirection::Left),
                Action::CycleRight => input.cycle_target = Some(CycleDirection::Right),
                Action::Look { x } => {
                    if let Some(direction) = CycleDirection::from_axis(x) {
                        input.cycle_target = Some(direction);
                    }
                },
                Action::Dash => input.dash = true,
                Action::Heal => input.heal = true,
                Action::Move { x, y } => self.move_axis = Vec2::new(x, y),
                Action::Stop => self.move_axis = Vec2::ZERO,
            }
            self.next_step += 1;
        }

        input.move_axis = self.move_axis;
        input
    }

    /// Advance one fixed step and return the events it produced.
    pub fn step(&mut self) -> Vec<GameEvent> {
        let dt = self.scenario.time_step;
        let input = self.gather_input(dt);

        let pose = self.arena.pose(self.player_id);
        self.player
            .handle_input(&input, &pose, &self.arena, &mut self.requests);
        self.player
            .tick(dt, &pose, &self.arena, &mut self.requests);

        self.arena
            .apply_motion(self.player_id, self.requests.motion.commands());
        for command in self.requests.damage.drain() {
            if let Command::Damage { target, amount } = command {
                self.damage_enemy(target, amount);
            }
        }
        self.requests = Requests::new();

        self.clock.advance(dt);
        self.tick_enemies(dt);

        self.bus.drain()
    }

    /// Step until [`Encounter::finished`], handing every event to `on_event`.
    pub fn run(&mut self, mut on_event: impl FnMut(&GameEvent)) -> EncounterSummary {
        while !self.finished() {
            for event in self.step() {
                on_event(&event);
            }
        }
        let summary = self.summary();
        info!(
            "Encounter over after {:.2}s: player at {} hp, {}/{} enemies defeated",
            summary.elapsed, summary.player_health, summary.enemies_defeated, summary.enemies_total
        );
        summary
    }

    fn damage_enemy(&mut self, target: EntityId, amount: i32) {
        let Some(enemy) = self.enemies.iter_mut().find(|e| e.id() == target) else {
            debug!("Damage for unknown entity {}", target);
            return;
        };

        let outcome = enemy.take_damage(amount);
        if outcome.landed() {
            self.bus.publish(GameEvent::HealthChanged {
                entity_id: target,
                current: enemy.health().current(),
                max: enemy.health().max(),
            });
        }
        if outcome == DamageOutcome::Killed {
            self.bus.publish(GameEvent::EntityDied { entity_id: target });
            self.arena.despawn(target);
        }
    }

    fn tick_enemies(&mut self, dt: f32) {
        let quarry = if self.player.is_dead() {
            None
        } else {
            self.arena.position(self.player_id).map(|position| Quarry {
                entity: self.player_id,
                position,
            })
        };

        for enemy in &mut self.enemies {
            if enemy.is_dead() {
                continue;
            }
            let mut damage = CommandBuffer::new();
            let mut motion = CommandBuffer::new();
            let mut ctx = EnemyContext {
                clock: &self.clock,
                pose: self.arena.pose(enemy.id()),
                quarry,
                damage: &mut damage,
                locomotion: Some(&mut motion),
                animation: None,
            };
            enemy.tick(dt, &mut ctx);
            self.arena.apply_motion(enemy.id(), motion.commands());

            for command in damage.drain() {
                let Command::Damage { target, amount } = command else {
                    continue;
                };
                if target != self.player_id {
                    continue;
                }
                if self.player.take_damage(amount).landed() {
                    self.bus.publish(GameEvent::HitLanded {
                        attacker: enemy.id(),
                        target,
                        damage: amount,
                    });
                }
            }
        }
    }
}
