//! Physics engine interface
//!
//! The narrow surface the game core consumes from a rigid-body engine. Any
//! engine that can create/remove boxes and soft links, report positions and
//! velocities, and list the contact pairs that started during a step can
//! drive a round.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine-assigned body handle (stable for the body's lifetime, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u32);

/// Engine-assigned constraint handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConstraintId(pub u32);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    #[error("unknown body {0:?}")]
    UnknownBody(BodyId),
    #[error("unknown constraint {0:?}")]
    UnknownConstraint(ConstraintId),
    #[error("invalid shape: half extents {0}")]
    InvalidShape(Vec2),
    #[error("non-finite value: {0}")]
    NonFinite(Vec2),
    #[error("engine capacity exhausted")]
    Capacity,
}

/// Rectangular body description
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub position: Vec2,
    pub half_extents: Vec2,
    pub friction: f32,
    pub restitution: f32,
    pub density: f32,
    /// Bodies sharing a negative group never collide; a shared positive group always does
    pub collision_group: i32,
    pub is_static: bool,
}

impl BodyDesc {
    /// Dynamic box with neutral surface response
    pub fn dynamic(position: Vec2, half_extents: Vec2) -> Self {
        Self {
            position,
            half_extents,
            friction: 0.1,
            restitution: 0.0,
            density: 0.001,
            collision_group: 0,
            is_static: false,
        }
    }

    /// Immovable box
    pub fn fixed(position: Vec2, half_extents: Vec2) -> Self {
        Self {
            is_static: true,
            ..Self::dynamic(position, half_extents)
        }
    }
}

/// Soft distance joint between two body centers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintDesc {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub length: f32,
    /// 0 = no pull, 1 = rigid
    pub stiffness: f32,
}

/// Two bodies whose contact started during the last step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollisionPair {
    pub a: BodyId,
    pub b: BodyId,
}

impl CollisionPair {
    /// Canonical ordering (lower id first)
    pub fn new(a: BodyId, b: BodyId) -> Self {
        if a <= b { Self { a, b } } else { Self { a: b, b: a } }
    }

    /// The body on the other side of the pair from `id`
    pub fn other(&self, id: BodyId) -> Option<BodyId> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Matter-style group filter
#[inline]
pub fn groups_collide(a: i32, b: i32) -> bool {
    if a == b && a != 0 { a > 0 } else { true }
}

pub trait PhysicsWorld {
    fn add_body(&mut self, desc: &BodyDesc) -> Result<BodyId, PhysicsError>;
    /// Removes the body and every constraint that references it
    fn remove_body(&mut self, id: BodyId) -> Result<(), PhysicsError>;
    fn add_constraint(&mut self, desc: &ConstraintDesc) -> Result<ConstraintId, PhysicsError>;
    fn remove_constraint(&mut self, id: ConstraintId) -> Result<(), PhysicsError>;

    fn set_velocity(&mut self, id: BodyId, velocity: Vec2) -> Result<(), PhysicsError>;
    fn set_static(&mut self, id: BodyId, is_static: bool) -> Result<(), PhysicsError>;
    fn set_collision_group(&mut self, id: BodyId, group: i32) -> Result<(), PhysicsError>;

    fn position(&self, id: BodyId) -> Result<Vec2, PhysicsError>;
    fn velocity(&self, id: BodyId) -> Result<Vec2, PhysicsError>;
    fn is_static(&self, id: BodyId) -> Result<bool, PhysicsError>;

    /// All live bodies in ascending id order
    fn body_ids(&self) -> Vec<BodyId>;

    /// Advance one tick; returns pairs whose contact began during this step
    fn step(&mut self) -> Vec<CollisionPair>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_is_canonical() {
        let p = CollisionPair::new(BodyId(9), BodyId(2));
        assert_eq!(p.a, BodyId(2));
        assert_eq!(p.other(BodyId(2)), Some(BodyId(9)));
        assert_eq!(p.other(BodyId(5)), None);
    }

    #[test]
    fn test_group_filter() {
        assert!(groups_collide(0, 0));
        assert!(groups_collide(-1, 0));
        assert!(!groups_collide(-3, -3));
        assert!(groups_collide(-3, -4));
        assert!(groups_collide(2, 2));
    }
}
