//! Tuning data supplied at construction.
//!
//! Every section derives `Deserialize` with `#[serde(default)]`, so a config
//! file only has to name the values it changes. Files are TOML or RON and
//! are validated after parsing.

use std::fs;
use std::path::Path;

use glam::Vec3;
use riposte_common::{ConfigError, ConfigResult, LayerMask};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::combat::AttackDefinition;
use crate::targeting::AcquisitionMode;

/// Configuration sections that can check their own values.
pub trait Validate {
    /// Reject values the state machines cannot run with.
    fn validate(&self) -> ConfigResult<()>;
}

fn require_non_negative(field: &str, value: f32) -> ConfigResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be >= 0, got {value}")))
    }
}

fn require_positive(field: &str, value: f32) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be > 0, got {value}")))
    }
}

// ============================================================================
// Combat
// ============================================================================

/// Melee combo tuning.
///
/// The attack chain is described by three parallel tables; entry `i` of
/// each belongs to combo step `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Seconds into each attack when damage applies.
    pub hit_times: Vec<f32>,
    /// Seconds until each attack concludes.
    pub recover_times: Vec<f32>,
    /// Damage of each attack.
    pub damages: Vec<i32>,
    /// Maximum seconds between attack starts for a chain to continue.
    pub combo_reset_window: f32,
    /// Minimum seconds between starting fresh chains.
    pub attack_cooldown: f32,
    /// Radius of the hit sphere.
    pub attack_range: f32,
    /// Distance of the hit sphere center in front of the character.
    pub attack_reach: f32,
    /// Height of the hit sphere center.
    pub attack_height: f32,
    /// Layers the hit sphere can strike.
    pub hit_layers: LayerMask,
    /// Seconds to draw the weapon.
    pub draw_time: f32,
    /// Whether the weapon starts sheathed.
    pub starts_sheathed: bool,
    /// Seconds after an attack starts before the lunge begins.
    pub lunge_delay: f32,
    /// Seconds the lunge lasts.
    pub lunge_duration: f32,
    /// Distance covered by the lunge.
    pub lunge_distance: f32,
    /// Whether the last attack of the chain can be cancelled in recovery.
    pub finisher_cancelable: bool,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            hit_times: vec![0.3, 0.2],
            recover_times: vec![0.5, 0.6],
            damages: vec![25, 30],
            combo_reset_window: 0.8,
            attack_cooldown: 0.5,
            attack_range: 1.5,
            attack_reach: 1.0,
            attack_height: 1.0,
            hit_layers: LayerMask::ENEMY,
            draw_time: 0.5,
            starts_sheathed: false,
            lunge_delay: 0.1,
            lunge_duration: 0.15,
            lunge_distance: 0.8,
            finisher_cancelable: false,
        }
    }
}

impl CombatConfig {
    /// Build the attack chain from the parallel tables.
    pub fn attacks(&self) -> ConfigResult<Vec<AttackDefinition>> {
        if self.hit_times.len() != self.recover_times.len()
            || self.hit_times.len() != self.damages.len()
        {
            return Err(ConfigError::AttackTableMismatch {
                hit_times: self.hit_times.len(),
                recover_times: self.recover_times.len(),
                damages: self.damages.len(),
            });
        }
        if self.hit_times.is_empty() {
            return Err(ConfigError::invalid("hit_times", "attack chain is empty"));
        }

        self.hit_times
            .iter()
            .zip(&self.recover_times)
            .zip(&self.damages)
            .enumerate()
            .map(|(i, ((&hit_time, &recover_time), &damage))| {
                require_non_negative(&format!("hit_times[{i}]"), hit_time)?;
                require_positive(&format!("recover_times[{i}]"), recover_time)?;
                if hit_time > recover_time {
                    return Err(ConfigError::invalid(
                        format!("hit_times[{i}]"),
                        format!("hit time {hit_time} is after recover time {recover_time}"),
                    ));
                }
                if damage < 0 {
                    return Err(ConfigError::invalid(
                        format!("damages[{i}]"),
                        "must be >= 0",
                    ));
                }
                Ok(AttackDefinition::new(hit_time, recover_time, damage))
            })
            .collect()
    }
}

impl Validate for CombatConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.attacks()?;
        require_non_negative("combo_reset_window", self.combo_reset_window)?;
        require_non_negative("attack_cooldown", self.attack_cooldown)?;
        require_positive("attack_range", self.attack_range)?;
        require_non_negative("draw_time", self.draw_time)?;
        require_non_negative("lunge_delay", self.lunge_delay)?;
        require_non_negative("lunge_duration", self.lunge_duration)?;
        require_non_negative("lunge_distance", self.lunge_distance)
    }
}

// ============================================================================
// Lock-on
// ============================================================================

/// Target lock tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockOnConfig {
    /// Radius scanned for candidates.
    pub lock_on_radius: f32,
    /// Distance beyond which a locked target is released.
    pub max_lock_on_distance: f32,
    /// Rate at which the character turns toward the target.
    pub lock_on_rotation_speed: f32,
    /// Height of the line-of-sight origin above the character.
    pub eye_height: f32,
    /// Offset from a target's position to its line-of-sight point.
    pub target_offset: Vec3,
    /// Widest angle from facing at which a first target can be acquired.
    pub max_acquire_angle: f32,
    /// How the first target is chosen.
    pub acquisition: AcquisitionMode,
    /// Layers scanned for candidates.
    pub target_layers: LayerMask,
    /// Layers that block line of sight.
    pub obstruction_layers: LayerMask,
}

impl Default for LockOnConfig {
    fn default() -> Self {
        Self {
            lock_on_radius: 10.0,
            max_lock_on_distance: 15.0,
            lock_on_rotation_speed: 15.0,
            eye_height: 1.0,
            target_offset: Vec3::new(0.0, 1.5, 0.0),
            max_acquire_angle: 90.0,
            acquisition: AcquisitionMode::Nearest,
            target_layers: LayerMask::ENEMY,
            obstruction_layers: LayerMask::WORLD,
        }
    }
}

impl Validate for LockOnConfig {
    fn validate(&self) -> ConfigResult<()> {
        require_positive("lock_on_radius", self.lock_on_radius)?;
        if !(self.max_lock_on_distance >= self.lock_on_radius) {
            return Err(ConfigError::invalid(
                "max_lock_on_distance",
                format!(
                    "must be >= lock_on_radius ({}), got {}",
                    self.lock_on_radius, self.max_lock_on_distance
                ),
            ));
        }
        require_non_negative("lock_on_rotation_speed", self.lock_on_rotation_speed)?;
        if !(0.0..=180.0).contains(&self.max_acquire_angle) {
            return Err(ConfigError::invalid(
                "max_acquire_angle",
                "must be within 0..=180 degrees",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Health
// ============================================================================

/// Health, i-frame, and healing tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Maximum health.
    pub max_health: i32,
    /// Seconds of invincibility after taking a hit.
    pub invincibility_time: f32,
    /// Healing charges when full.
    pub max_charges: u32,
    /// Health restored per charge.
    pub heal_amount: i32,
    /// Seconds over which a charge restores health.
    pub heal_duration: f32,
    /// Minimum seconds between heals.
    pub heal_cooldown: f32,
    /// Seconds between starting a heal and health rising.
    pub heal_windup: f32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_health: 100,
            invincibility_time: 1.0,
            max_charges: 3,
            heal_amount: 30,
            heal_duration: 2.0,
            heal_cooldown: 1.0,
            heal_windup: 0.5,
        }
    }
}

impl Validate for HealthConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.max_health <= 0 {
            return Err(ConfigError::invalid("max_health", "must be > 0"));
        }
        if self.heal_amount < 0 {
            return Err(ConfigError::invalid("heal_amount", "must be >= 0"));
        }
        require_non_negative("invincibility_time", self.invincibility_time)?;
        require_non_negative("heal_duration", self.heal_duration)?;
        require_non_negative("heal_cooldown", self.heal_cooldown)?;
        require_non_negative("heal_windup", self.heal_windup)
    }
}

// ============================================================================
// Movement
// ============================================================================

/// Walk and dash tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Top walking speed.
    pub move_speed: f32,
    /// Rate at which facing follows the movement direction.
    pub rotation_speed: f32,
    /// Speed gained per second while input is held.
    pub acceleration: f32,
    /// Speed lost per second without input.
    pub deceleration: f32,
    /// Dash speed.
    pub dash_speed: f32,
    /// Seconds a dash lasts.
    pub dash_duration: f32,
    /// Seconds between dash starts.
    pub dash_cooldown: f32,
    /// Seconds of invincibility granted by a dash.
    pub dodge_iframes: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            move_speed: 6.0,
            rotation_speed: 15.0,
            acceleration: 20.0,
            deceleration: 25.0,
            dash_speed: 15.0,
            dash_duration: 0.2,
            dash_cooldown: 1.5,
            dodge_iframes: 0.2,
        }
    }
}

impl Validate for MovementConfig {
    fn validate(&self) -> ConfigResult<()> {
        require_non_negative("move_speed", self.move_speed)?;
        require_non_negative("rotation_speed", self.rotation_speed)?;
        require_positive("acceleration", self.acceleration)?;
        require_positive("deceleration", self.deceleration)?;
        require_non_negative("dash_speed", self.dash_speed)?;
        require_non_negative("dash_duration", self.dash_duration)?;
        require_non_negative("dash_cooldown", self.dash_cooldown)?;
        require_non_negative("dodge_iframes", self.dodge_iframes)
    }
}

// ============================================================================
// Camera
// ============================================================================

/// Camera framing tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Damping while free.
    pub normal_damping: f32,
    /// Damping while locked on.
    pub locked_damping: f32,
    /// Rate at which damping blends between the two.
    pub damping_blend_speed: f32,
    /// Camera offset from the player while locked on.
    pub locked_offset: Vec3,
    /// Height of the follow point above the player.
    pub follow_height: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            normal_damping: 0.5,
            locked_damping: 0.1,
            damping_blend_speed: 8.0,
            locked_offset: Vec3::new(0.0, 2.0, -5.0),
            follow_height: 1.5,
        }
    }
}

impl Validate for CameraConfig {
    fn validate(&self) -> ConfigResult<()> {
        require_non_negative("normal_damping", self.normal_damping)?;
        require_non_negative("locked_damping", self.locked_damping)?;
        require_non_negative("damping_blend_speed", self.damping_blend_speed)
    }
}

// ============================================================================
// Enemy
// ============================================================================

/// Chase/attack AI tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    /// Chase speed.
    pub move_speed: f32,
    /// Distance at which the enemy stops closing in.
    pub stopping_distance: f32,
    /// Rate at which the enemy turns toward the player.
    pub rotation_speed: f32,
    /// Damage per attack.
    pub attack_damage: i32,
    /// Seconds between attacks.
    pub attack_cooldown: f32,
    /// Distance at which the enemy can attack.
    pub attack_range: f32,
    /// Only chase inside this radius; `None` chases from anywhere.
    pub aggro_radius: Option<f32>,
    /// Health of the enemy.
    pub health: HealthConfig,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            move_speed: 3.0,
            stopping_distance: 1.5,
            rotation_speed: 5.0,
            attack_damage: 10,
            attack_cooldown: 2.0,
            attack_range: 1.5,
            aggro_radius: None,
            health: HealthConfig {
                invincibility_time: 0.0,
                max_charges: 0,
                ..HealthConfig::default()
            },
        }
    }
}

impl Validate for EnemyConfig {
    fn validate(&self) -> ConfigResult<()> {
        require_non_negative("move_speed", self.move_speed)?;
        require_non_negative("stopping_distance", self.stopping_distance)?;
        require_non_negative("rotation_speed", self.rotation_speed)?;
        require_non_negative("attack_cooldown", self.attack_cooldown)?;
        require_positive("attack_range", self.attack_range)?;
        if let Some(radius) = self.aggro_radius {
            require_positive("aggro_radius", radius)?;
        }
        self.health.validate()
    }
}

// ============================================================================
// Character
// ============================================================================

/// Everything a player-controlled character needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    /// Melee combo.
    pub combat: CombatConfig,
    /// Target lock.
    pub lock_on: LockOnConfig,
    /// Health and healing.
    pub health: HealthConfig,
    /// Walk and dash.
    pub movement: MovementConfig,
    /// Camera framing.
    pub camera: CameraConfig,
}

impl Validate for CharacterConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.combat.validate()?;
        self.lock_on.validate()?;
        self.health.validate()?;
        self.movement.validate()?;
        self.camera.validate()
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Parse and validate a TOML document.
pub fn from_toml_str<T: DeserializeOwned + Validate>(text: &str) -> ConfigResult<T> {
    let value: T = toml::from_str(text).map_err(|e| ConfigError::Parse {
        format: "toml",
        message: e.to_string(),
    })?;
    value.validate()?;
    Ok(value)
}

/// Parse and validate a RON document.
pub fn from_ron_str<T: DeserializeOwned + Validate>(text: &str) -> ConfigResult<T> {
    let value: T = ron::from_str(text).map_err(|e| ConfigError::Parse {
        format: "ron",
        message: e.to_string(),
    })?;
    value.validate()?;
    Ok(value)
}

/// Load a config file, choosing the format from its extension.
pub fn load<T: DeserializeOwned + Validate>(path: &Path) -> ConfigResult<T> {
    let text = fs::read_to_string(path)?;
    let value = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => from_toml_str(&text)?,
        Some("ron") => from_ron_str(&text)?,
        _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    };
    info!("Loaded config from {}", path.display());
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        assert!(CharacterConfig::default().validate().is_ok());
        assert!(EnemyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_attack_chain() {
        let attacks = CombatConfig::default().attacks().expect("valid defaults");
        assert_eq!(attacks.len(), 2);
        assert_eq!(attacks[0].damage, 25);
        assert_eq!(attacks[1].hit_time, 0.2);
    }

    #[test]
    fn test_mismatched_tables_rejected() {
        let config = CombatConfig {
            damages: vec![10],
            ..CombatConfig::default()
        };
        assert!(matches!(
            config.attacks(),
            Err(ConfigError::AttackTableMismatch { damages: 1, .. })
        ));
    }

    #[test]
    fn test_hit_after_recover_rejected() {
        let config = CombatConfig {
            hit_times: vec![0.9],
            recover_times: vec![0.5],
            damages: vec![10],
            ..CombatConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lock_on_distance_must_cover_radius() {
        let config = LockOnConfig {
            lock_on_radius: 10.0,
            max_lock_on_distance: 5.0,
            ..LockOnConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let text = r#"
            [combat]
            hit_times = [0.3, 0.25]
            recover_times = [0.5, 0.5]
            damages = [20, 30]
            combo_reset_window = 1.0

            [lock_on]
            lock_on_radius = 12.0
            acquisition = "scored"
        "#;
        let config: CharacterConfig = from_toml_str(text).expect("valid toml");
        assert_eq!(config.combat.damages, vec![20, 30]);
        assert_eq!(config.combat.attack_cooldown, 0.5);
        assert_eq!(config.lock_on.lock_on_radius, 12.0);
        assert_eq!(config.lock_on.acquisition, AcquisitionMode::Scored);
        assert_eq!(config.health, HealthConfig::default());
    }

    #[test]
    fn test_ron_round_trip() {
        let text = "(combat: (damages: [1, 2], hit_times: [0.1, 0.1], recover_times: [0.2, 0.2]), health: (max_health: 50))";
        let config: CharacterConfig = from_ron_str(text).expect("valid ron");
        assert_eq!(config.combat.damages, vec![1, 2]);
        assert_eq!(config.health.max_health, 50);
    }

    #[test]
    fn test_invalid_toml_reports_parse_error() {
        let result: ConfigResult<CharacterConfig> = from_toml_str("combat = 3");
        assert!(matches!(result, Err(ConfigError::Parse { format: "toml", .. })));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("character.yaml");
        fs::write(&path, "").expect("write");

        let result: ConfigResult<CharacterConfig> = load(&path);
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_load_toml_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("enemy.toml");
        fs::write(&path, "move_speed = 4.5\naggro_radius = 8.0\n").expect("write");

        let config: EnemyConfig = load(&path).expect("valid file");
        assert_eq!(config.move_speed, 4.5);
        assert_eq!(config.aggro_radius, Some(8.0));

        let missing: ConfigResult<EnemyConfig> = load(&dir.path().join("absent.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
