//! Horizontal-plane helpers on top of `glam`.
//!
//! Convention: Y is up, a rotation's forward is its local +Z and its right
//! is local +X. Signed angles are positive to the right.

use glam::{Quat, Vec3};

/// Squared length below which a direction is treated as zero.
pub const DIRECTION_EPSILON: f32 = 1.0e-6;

/// Projects a vector onto the horizontal plane.
#[must_use]
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Forward direction of a rotation.
#[must_use]
pub fn forward(rotation: Quat) -> Vec3 {
    rotation * Vec3::Z
}

/// Right direction of a rotation.
#[must_use]
pub fn right(rotation: Quat) -> Vec3 {
    rotation * Vec3::X
}

/// Unsigned angle between two vectors in degrees (0..=180).
///
/// Returns 0 when either vector is degenerate.
#[must_use]
pub fn angle_deg(from: Vec3, to: Vec3) -> f32 {
    let (Some(a), Some(b)) = (from.try_normalize(), to.try_normalize()) else {
        return 0.0;
    };
    a.dot(b).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Signed horizontal angle from `forward` to `to` in degrees.
///
/// Negative when `to` lies to the left, positive to the right.
#[must_use]
pub fn signed_angle_deg(forward: Vec3, to: Vec3) -> f32 {
    let angle = angle_deg(forward, to);
    if forward.cross(to).y < 0.0 {
        -angle
    } else {
        angle
    }
}

/// Yaw-only rotation whose forward points along `direction`.
///
/// `None` when the horizontal part of `direction` is degenerate.
#[must_use]
pub fn look_rotation(direction: Vec3) -> Option<Quat> {
    let flat = flatten(direction);
    if flat.length_squared() < DIRECTION_EPSILON {
        return None;
    }
    Some(Quat::from_rotation_y(flat.x.atan2(flat.z)))
}

/// Spherically interpolates `current` toward `target` by `rate * dt`,
/// clamped so it never overshoots.
#[must_use]
pub fn turn_towards(current: Quat, target: Quat, rate: f32, dt: f32) -> Quat {
    let t = (rate * dt).clamp(0.0, 1.0);
    current.slerp(target, t).normalize()
}

/// Moves `current` toward `target` by at most `max_delta`.
#[must_use]
pub fn move_towards(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let delta = target - current;
    let distance = delta.length();
    if distance <= max_delta || distance < DIRECTION_EPSILON {
        target
    } else {
        current + delta / distance * max_delta
    }
}

/// Whether the segment `from..to` passes within `radius` of `center`.
#[must_use]
pub fn segment_intersects_sphere(from: Vec3, to: Vec3, center: Vec3, radius: f32) -> bool {
    let segment = to - from;
    let length_sq = segment.length_squared();
    let t = if length_sq < DIRECTION_EPSILON {
        0.0
    } else {
        ((center - from).dot(segment) / length_sq).clamp(0.0, 1.0)
    };
    let closest = from + segment * t;
    closest.distance_squared(center) <= radius * radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1.0e-3
    }

    #[test]
    fn test_signed_angle_sides() {
        assert!(approx(signed_angle_deg(Vec3::Z, Vec3::X), 90.0));
        assert!(approx(signed_angle_deg(Vec3::Z, -Vec3::X), -90.0));
        assert!(approx(signed_angle_deg(Vec3::Z, Vec3::Z), 0.0));
        assert!(approx(angle_deg(Vec3::Z, -Vec3::Z), 180.0));
    }

    #[test]
    fn test_look_rotation_matches_direction() {
        let dir = Vec3::new(1.0, 5.0, 1.0);
        let rotation = look_rotation(dir).expect("horizontal direction");
        let fwd = forward(rotation);
        assert!(approx(fwd.x, std::f32::consts::FRAC_1_SQRT_2));
        assert!(approx(fwd.z, std::f32::consts::FRAC_1_SQRT_2));
        assert!(look_rotation(Vec3::Y).is_none());
    }

    #[test]
    fn test_right_is_positive_x() {
        assert!(approx(right(Quat::IDENTITY).x, 1.0));
    }

    #[test]
    fn test_move_towards_clamps() {
        let moved = move_towards(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), 2.0);
        assert!(approx(moved.x, 2.0));
        let arrived = move_towards(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 2.0);
        assert_eq!(arrived, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_segment_sphere_intersection() {
        let from = Vec3::ZERO;
        let to = Vec3::new(10.0, 0.0, 0.0);
        assert!(segment_intersects_sphere(from, to, Vec3::new(5.0, 0.5, 0.0), 1.0));
        assert!(!segment_intersects_sphere(from, to, Vec3::new(5.0, 2.0, 0.0), 1.0));
        assert!(!segment_intersects_sphere(from, to, Vec3::new(12.0, 0.0, 0.0), 1.0));
    }

    #[test]
    fn test_turn_towards_full_step_reaches_target() {
        let target = Quat::from_rotation_y(1.0);
        let turned = turn_towards(Quat::IDENTITY, target, 100.0, 1.0);
        assert!(turned.angle_between(target) < 1.0e-3);
    }

    proptest! {
        #[test]
        fn prop_signed_angle_is_antisymmetric(yaw in -3.0f32..3.0, x in -5.0f32..5.0, z in -5.0f32..5.0) {
            let fwd = forward(Quat::from_rotation_y(yaw));
            let dir = Vec3::new(x, 0.0, z);
            prop_assume!(dir.length() > 0.1);
            let mirrored = Vec3::new(-dir.x, 0.0, dir.z);
            let a = signed_angle_deg(Vec3::Z, dir);
            let b = signed_angle_deg(Vec3::Z, mirrored);
            prop_assert!((a + b).abs() < 1.0e-2 || (a.abs() - 180.0).abs() < 1.0e-2);
            prop_assert!(signed_angle_deg(fwd, dir).abs() <= 180.0);
        }

        #[test]
        fn prop_turn_towards_never_overshoots(target_yaw in -3.0f32..3.0, rate in 0.0f32..50.0, dt in 0.0f32..0.1) {
            let target = Quat::from_rotation_y(target_yaw);
            let turned = turn_towards(Quat::IDENTITY, target, rate, dt);
            prop_assert!(turned.angle_between(target) <= Quat::IDENTITY.angle_between(target) + 1.0e-3);
        }
    }
}
