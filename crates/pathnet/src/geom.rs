use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

const NORMALIZE_EPSILON: f32 = 1.0e-6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    pub fn normalized(self) -> Vec2 {
        let length = self.length();
        if length <= NORMALIZE_EPSILON {
            return Vec2::ZERO;
        }
        self * length.recip()
    }

    pub fn angle_degrees(self, other: Vec2) -> f32 {
        let denominator = (self.length_squared() * other.length_squared()).sqrt();
        if denominator <= NORMALIZE_EPSILON * NORMALIZE_EPSILON {
            return 0.0;
        }
        let cosine = (self.dot(other) / denominator).clamp(-1.0, 1.0);
        cosine.acos().to_degrees()
    }

    pub fn lerp(self, target: Vec2, amount: f32) -> Vec2 {
        let amount = amount.clamp(0.0, 1.0);
        self + (target - self) * amount
    }

    pub fn move_towards(self, target: Vec2, max_step: f32) -> Vec2 {
        let delta = target - self;
        let distance_sq = delta.length_squared();
        if distance_sq == 0.0 || (max_step >= 0.0 && distance_sq <= max_step * max_step) {
            return target;
        }

        let distance = distance_sq.sqrt();
        self + delta * (max_step / distance)
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vec2 {
    type Output = Vec2;

    fn div(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;

    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec2_close(actual: Vec2, expected: Vec2) {
        assert!(
            (actual.x - expected.x).abs() < 0.0001 && (actual.y - expected.y).abs() < 0.0001,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn move_towards_lands_exactly_on_target_when_in_reach() {
        let start = Vec2::new(0.0, 0.0);
        let target = Vec2::new(3.0, 4.0);

        assert_eq!(start.move_towards(target, 5.0), target);
        assert_eq!(start.move_towards(target, 10.0), target);
    }

    #[test]
    fn move_towards_steps_along_direction() {
        let next = Vec2::new(0.0, 0.0).move_towards(Vec2::new(10.0, 0.0), 2.5);
        assert_vec2_close(next, Vec2::new(2.5, 0.0));
    }

    #[test]
    fn normalized_degenerate_vector_is_zero() {
        assert_eq!(Vec2::ZERO.normalized(), Vec2::ZERO);
        assert_vec2_close(Vec2::new(0.0, 7.0).normalized(), Vec2::new(0.0, 1.0));
    }

    #[test]
    fn angle_degrees_matches_quadrants() {
        let right = Vec2::new(1.0, 0.0);
        assert!((right.angle_degrees(Vec2::new(0.0, 2.0)) - 90.0).abs() < 0.001);
        assert!((right.angle_degrees(Vec2::new(-3.0, 0.0)) - 180.0).abs() < 0.001);
        assert!(right.angle_degrees(Vec2::new(5.0, 0.0)).abs() < 0.001);
        assert_eq!(right.angle_degrees(Vec2::ZERO), 0.0);
    }

    #[test]
    fn lerp_clamps_amount() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(4.0, 2.0);
        assert_vec2_close(a.lerp(b, 0.5), Vec2::new(2.0, 1.0));
        assert_eq!(a.lerp(b, 2.0), b);
    }
}
