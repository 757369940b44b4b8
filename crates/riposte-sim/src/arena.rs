//! In-memory world implementing the gameplay queries.
//!
//! Bodies are spheres standing on the ground plane; obstacles are spheres
//! that block line of sight.

use glam::{Quat, Vec3};
use riposte_common::math::segment_intersects_sphere;
use riposte_common::{EntityId, LayerMask};
use riposte_gameplay::{Command, HitQuery, HitShape, Pose, SpatialQuery};
use serde::{Deserialize, Serialize};

/// A character standing in the arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    /// Handle.
    pub id: EntityId,
    /// Feet position.
    pub position: Vec3,
    /// Facing.
    pub rotation: Quat,
    /// Collision radius.
    pub radius: f32,
    /// Layer the body lives on.
    pub layer: LayerMask,
}

impl Body {
    /// Pose of the body.
    #[must_use]
    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.rotation)
    }

    /// Center of the body's collision sphere.
    fn center(&self) -> Vec3 {
        self.position + Vec3::Y
    }
}

/// Sight-blocking geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Sphere center.
    pub center: Vec3,
    /// Sphere radius.
    pub radius: f32,
}

/// Bodies and obstacles.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    bodies: Vec<Body>,
    obstacles: Vec<Obstacle>,
}

impl Arena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a body facing +Z and return its handle.
    pub fn spawn(&mut self, position: Vec3, radius: f32, layer: LayerMask) -> EntityId {
        let id = EntityId::new();
        self.bodies.push(Body {
            id,
            position,
            rotation: Quat::IDENTITY,
            radius,
            layer,
        });
        id
    }

    /// Add an obstacle.
    pub fn add_obstacle(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    /// Remove a body. Its handle stops resolving.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        let before = self.bodies.len();
        self.bodies.retain(|body| body.id != id);
        self.bodies.len() != before
    }

    /// Look up a body.
    #[must_use]
    pub fn body(&self, id: EntityId) -> Option<&Body> {
        self.bodies.iter().find(|body| body.id == id)
    }

    /// Pose of a body, or the default pose if it is gone.
    #[must_use]
    pub fn pose(&self, id: EntityId) -> Pose {
        self.body(id).map(Body::pose).unwrap_or_default()
    }

    /// Number of bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the arena has no bodies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Apply displacement and facing requests to `id`, keeping it on the
    /// ground. Other commands are ignored.
    pub fn apply_motion(&mut self, id: EntityId, commands: &[Command]) {
        let Some(body) = self.bodies.iter_mut().find(|body| body.id == id) else {
            return;
        };
        for command in commands {
            match command {
                Command::Displace { displacement, .. } => {
                    body.position += *displacement;
                    body.position.y = 0.0;
                },
                Command::Face(rotation) => body.rotation = *rotation,
                _ => {},
            }
        }
    }
}

impl SpatialQuery for Arena {
    fn query_in_radius(&self, origin: Vec3, radius: f32, layers: LayerMask) -> Vec<EntityId> {
        self.bodies
            .iter()
            .filter(|body| layers.intersects(body.layer))
            .filter(|body| body.position.distance(origin) <= radius + body.radius)
            .map(|body| body.id)
            .collect()
    }

    fn line_of_sight_blocked(&self, from: Vec3, to: Vec3, obstruction: LayerMask) -> bool {
        obstruction.intersects(LayerMask::WORLD)
            && self
                .obstacles
                .iter()
                .any(|o| segment_intersects_sphere(from, to, o.center, o.radius))
    }

    fn position(&self, entity: EntityId) -> Option<Vec3> {
        self.body(entity).map(|body| body.position)
    }
}

impl HitQuery for Arena {
    fn query_volume(&self, shape: &HitShape) -> Vec<EntityId> {
        let HitShape::Sphere {
            center,
            radius,
            layers,
        } = *shape;
        self.bodies
            .iter()
            .filter(|body| layers.intersects(body.layer))
            .filter(|body| body.center().distance(center) <= radius + body.radius)
            .map(|body| body.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queries_respect_layers() {
        let mut arena = Arena::new();
        let player = arena.spawn(Vec3::ZERO, 0.5, LayerMask::PLAYER);
        let enemy = arena.spawn(Vec3::new(0.0, 0.0, 4.0), 0.5, LayerMask::ENEMY);

        let found = arena.query_in_radius(Vec3::ZERO, 5.0, LayerMask::ENEMY);
        assert_eq!(found, vec![enemy]);

        let shape = HitShape::Sphere {
            center: Vec3::new(0.0, 1.0, 1.0),
            radius: 1.5,
            layers: LayerMask::ALL,
        };
        assert_eq!(arena.query_volume(&shape), vec![player]);
    }

    #[test]
    fn test_obstacle_blocks_sight() {
        let mut arena = Arena::new();
        arena.add_obstacle(Obstacle {
            center: Vec3::new(0.0, 1.0, 2.0),
            radius: 0.5,
        });
        let from = Vec3::Y;
        let to = Vec3::new(0.0, 1.0, 4.0);
        assert!(arena.line_of_sight_blocked(from, to, LayerMask::WORLD));
        assert!(!arena.line_of_sight_blocked(from, to, LayerMask::NONE));
    }

    #[test]
    fn test_apply_motion_and_despawn() {
        let mut arena = Arena::new();
        let id = arena.spawn(Vec3::ZERO, 0.5, LayerMask::PLAYER);
        let facing = Quat::from_rotation_y(1.0);
        arena.apply_motion(
            id,
            &[
                Command::Displace {
                    displacement: Vec3::new(1.0, 0.5, 2.0),
                    duration: 0.1,
                },
                Command::Face(facing),
            ],
        );

        let body = arena.body(id).expect("body");
        assert_eq!(body.position, Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(body.rotation, facing);

        assert!(arena.despawn(id));
        assert_eq!(arena.position(id), None);
        assert!(arena.is_empty());
    }
}
