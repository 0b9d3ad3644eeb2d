//! Body registry / physics adapter
//!
//! Thin facade over a `PhysicsWorld`. Owns the side tables that tie engine
//! bodies to game meaning (letter blocks, boundary walls, chain links) and is
//! the error boundary of the core: engine failures are logged here and turned
//! into `None` / `false`, never propagated into the controller.

use std::collections::BTreeMap;

use glam::Vec2;

use super::state::{BlockHandle, Boundary, LetterBlock, WordId};
use super::world::{
    BodyDesc, BodyId, CollisionPair, ConstraintDesc, ConstraintId, PhysicsError, PhysicsWorld,
};
use crate::consts::*;
use crate::settings::GameConfig;

/// Log a failed engine call and degrade to `None`
fn guard<T>(op: &str, result: Result<T, PhysicsError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("physics {op} failed: {err}");
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LinkRecord {
    id: ConstraintId,
    a: BodyId,
    b: BodyId,
}

pub struct BodyRegistry<W: PhysicsWorld> {
    world: W,
    blocks: BTreeMap<BodyId, LetterBlock>,
    boundaries: BTreeMap<BodyId, Boundary>,
    links: Vec<LinkRecord>,
    block_size: f32,
    link_stiffness: f32,
    /// Next private collision group (negative groups never self-collide)
    next_group: i32,
}

impl<W: PhysicsWorld> BodyRegistry<W> {
    pub fn new(world: W, config: &GameConfig) -> Self {
        Self {
            world,
            blocks: BTreeMap::new(),
            boundaries: BTreeMap::new(),
            links: Vec::new(),
            block_size: config.block_size,
            link_stiffness: config.link_stiffness,
            next_group: -1,
        }
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    /// Create the four walls, each extending `BOUNDARY_DEPTH` outward from its inner edge.
    /// Returns how many walls exist afterwards.
    pub fn create_boundaries(&mut self, config: &GameConfig) -> usize {
        let w = config.field_width;
        let h = config.field_height;
        let depth = BOUNDARY_DEPTH;
        // Horizontal walls overhang the side walls so corners stay closed
        let span = w / 2.0 + depth;
        for boundary in Boundary::ALL {
            if self.boundary_body(boundary).is_some() {
                continue;
            }
            let (center, half) = match boundary {
                Boundary::Top => {
                    let edge = config.top_edge();
                    (Vec2::new(w / 2.0, edge - depth / 2.0), Vec2::new(span, depth / 2.0))
                }
                Boundary::Bottom => {
                    let edge = config.bottom_edge();
                    (Vec2::new(w / 2.0, edge + depth / 2.0), Vec2::new(span, depth / 2.0))
                }
                Boundary::Left => {
                    let edge = config.left_edge();
                    (Vec2::new(edge - depth / 2.0, h / 2.0), Vec2::new(depth / 2.0, h / 2.0))
                }
                Boundary::Right => {
                    let edge = config.right_edge();
                    (Vec2::new(edge + depth / 2.0, h / 2.0), Vec2::new(depth / 2.0, h / 2.0))
                }
            };
            let desc = BodyDesc {
                friction: BLOCK_FRICTION,
                ..BodyDesc::fixed(center, half)
            };
            if let Some(id) = guard("create boundary", self.world.add_body(&desc)) {
                self.boundaries.insert(id, boundary);
            }
        }
        self.boundaries.len()
    }

    pub fn boundary(&self, id: BodyId) -> Option<Boundary> {
        self.boundaries.get(&id).copied()
    }

    pub fn boundary_body(&self, boundary: Boundary) -> Option<BodyId> {
        self.boundaries
            .iter()
            .find(|(_, b)| **b == boundary)
            .map(|(id, _)| *id)
    }

    /// Reserve a fresh negative group, shared by every block of one spawned chain
    pub fn new_spawn_group(&mut self) -> i32 {
        let group = self.next_group;
        self.next_group = self.next_group.checked_sub(1).unwrap_or(-1);
        group
    }

    /// Allocate a dynamic letter block, optionally inside a spawn group it
    /// keeps until it freezes
    pub fn create_block(
        &mut self,
        position: Vec2,
        letter: char,
        word: WordId,
        spawn_group: Option<i32>,
    ) -> Option<BlockHandle> {
        let desc = BodyDesc {
            position,
            half_extents: Vec2::splat(self.block_size / 2.0),
            friction: BLOCK_FRICTION,
            restitution: BLOCK_RESTITUTION,
            density: BLOCK_DENSITY,
            collision_group: spawn_group.unwrap_or(0),
            is_static: false,
        };
        let body = guard("create block", self.world.add_body(&desc))?;
        self.blocks.insert(
            body,
            LetterBlock {
                body,
                letter,
                frozen: false,
                word,
                spawn_group,
                last_position: position,
            },
        );
        Some(body)
    }

    /// Link two blocks with a soft joint at block spacing
    pub fn create_constraint(&mut self, a: BlockHandle, b: BlockHandle) -> Option<ConstraintId> {
        let desc = ConstraintDesc {
            body_a: a,
            body_b: b,
            length: self.block_size,
            stiffness: self.link_stiffness,
        };
        let id = guard("create constraint", self.world.add_constraint(&desc))?;
        self.links.push(LinkRecord { id, a, b });
        Some(id)
    }

    /// Remove a single link; unknown ids are ignored
    pub fn remove_constraint(&mut self, id: ConstraintId) {
        if let Some(index) = self.links.iter().position(|l| l.id == id) {
            self.links.remove(index);
            guard("remove constraint", self.world.remove_constraint(id));
        }
    }

    pub fn links_of(&self, block: BlockHandle) -> Vec<ConstraintId> {
        self.links
            .iter()
            .filter(|l| l.a == block || l.b == block)
            .map(|l| l.id)
            .collect()
    }

    pub fn set_velocity(&mut self, block: BlockHandle, velocity: Vec2) -> bool {
        guard("set velocity", self.world.set_velocity(block, velocity)).is_some()
    }

    pub fn position(&self, block: BlockHandle) -> Option<Vec2> {
        guard("position", self.world.position(block))
    }

    pub fn velocity(&self, block: BlockHandle) -> Option<Vec2> {
        guard("velocity", self.world.velocity(block))
    }

    pub fn is_static(&self, block: BlockHandle) -> Option<bool> {
        guard("is_static", self.world.is_static(block))
    }

    /// Freeze a body in place (true static)
    pub fn mark_static(&mut self, block: BlockHandle) -> bool {
        guard("mark static", self.world.set_static(block, true)).is_some()
    }

    /// Drop a block out of its private spawn group so it collides with everything
    pub fn leave_spawn_group(&mut self, block: BlockHandle) {
        let Some(record) = self.blocks.get_mut(&block) else {
            return;
        };
        if record.spawn_group.take().is_some() {
            guard("set collision group", self.world.set_collision_group(block, 0));
        }
    }

    /// Remove a block, its links and its record. Returns the block's last known
    /// position, or `None` if it was already gone.
    pub fn destroy_body(&mut self, block: BlockHandle) -> Option<Vec2> {
        let record = self.blocks.remove(&block)?;
        let position = self
            .world
            .position(block)
            .unwrap_or(record.last_position);
        for link in self.links_of(block) {
            self.remove_constraint(link);
        }
        guard("remove body", self.world.remove_body(block));
        Some(position)
    }

    pub fn block(&self, block: BlockHandle) -> Option<&LetterBlock> {
        self.blocks.get(&block)
    }

    pub fn block_mut(&mut self, block: BlockHandle) -> Option<&mut LetterBlock> {
        self.blocks.get_mut(&block)
    }

    /// All live letter blocks in handle order
    pub fn blocks(&self) -> impl Iterator<Item = &LetterBlock> {
        self.blocks.values()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Top-most (minimum y) live body that is not a boundary wall
    pub fn find_highest_block(&self) -> Option<BlockHandle> {
        let mut highest: Option<(BodyId, f32)> = None;
        for id in self.world.body_ids() {
            if self.boundaries.contains_key(&id) {
                continue;
            }
            let Ok(pos) = self.world.position(id) else {
                continue;
            };
            if highest.is_none_or(|(_, y)| pos.y < y) {
                highest = Some((id, pos.y));
            }
        }
        highest.map(|(id, _)| id)
    }

    /// Advance the engine and refresh cached block positions
    pub fn step(&mut self) -> Vec<CollisionPair> {
        let pairs = self.world.step();
        for record in self.blocks.values_mut() {
            if let Ok(pos) = self.world.position(record.body) {
                record.last_position = pos;
            }
        }
        pairs
    }

    /// Blocks that left the field entirely (tunnelled through a wall)
    pub fn escaped_blocks(&self, config: &GameConfig) -> Vec<BlockHandle> {
        let slack = config.block_size;
        let min = Vec2::new(-slack, -slack);
        let max = Vec2::new(config.field_width + slack, config.field_height + slack);
        self.blocks
            .values()
            .filter(|b| {
                let p = b.last_position;
                p.x < min.x || p.x > max.x || p.y < min.y || p.y > max.y
            })
            .map(|b| b.body)
            .collect()
    }

    /// Remove every block and wall
    pub fn destroy_all(&mut self) {
        let handles: Vec<BlockHandle> = self.blocks.keys().copied().collect();
        for handle in handles {
            self.destroy_body(handle);
        }
        let walls: Vec<BodyId> = self.boundaries.keys().copied().collect();
        for wall in walls {
            self.boundaries.remove(&wall);
            guard("remove boundary", self.world.remove_body(wall));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::engine::RapierWorld;

    fn registry() -> BodyRegistry<RapierWorld> {
        let config = GameConfig::default();
        let mut registry = BodyRegistry::new(RapierWorld::new(config.gravity), &config);
        registry.create_boundaries(&config);
        registry
    }

    #[test]
    fn test_boundaries_tagged() {
        let registry = registry();
        for boundary in Boundary::ALL {
            let id = registry.boundary_body(boundary).unwrap();
            assert_eq!(registry.boundary(id), Some(boundary));
        }
        assert_eq!(registry.world().body_count(), 4);
    }

    #[test]
    fn test_spawn_groups_are_distinct() {
        let mut registry = registry();
        let first = registry.new_spawn_group();
        let second = registry.new_spawn_group();
        assert!(first < 0 && second < 0);
        assert_ne!(first, second);

        let block = registry
            .create_block(Vec2::new(100.0, 100.0), 'c', WordId(1), Some(first))
            .unwrap();
        assert_eq!(registry.block(block).unwrap().spawn_group, Some(first));
        registry.leave_spawn_group(block);
        assert!(registry.block(block).unwrap().spawn_group.is_none());
    }

    #[test]
    fn test_fresh_chain_neighbours_do_not_collide_until_released() {
        let config = GameConfig::default();
        let mut registry = BodyRegistry::new(RapierWorld::new(0.0), &config);
        let group = registry.new_spawn_group();
        let head = registry
            .create_block(Vec2::new(200.0, 200.0), 'c', WordId(1), Some(group))
            .unwrap();
        let next = registry
            .create_block(Vec2::new(220.0, 200.0), 'a', WordId(1), Some(group))
            .unwrap();
        assert!(registry.step().is_empty());

        registry.leave_spawn_group(head);
        assert_eq!(registry.step(), vec![CollisionPair::new(head, next)]);
    }

    #[test]
    fn test_destroy_body_is_idempotent() {
        let mut registry = registry();
        let a = registry
            .create_block(Vec2::new(100.0, 100.0), 'a', WordId(1), None)
            .unwrap();
        let b = registry
            .create_block(Vec2::new(140.0, 100.0), 'b', WordId(1), None)
            .unwrap();
        registry.create_constraint(a, b).unwrap();

        assert_eq!(registry.destroy_body(a), Some(Vec2::new(100.0, 100.0)));
        assert!(registry.links_of(b).is_empty());
        assert_eq!(registry.world().constraint_count(), 0);

        let bodies = registry.world().body_count();
        assert_eq!(registry.destroy_body(a), None);
        assert_eq!(registry.world().body_count(), bodies);
        assert!(registry.block(b).is_some());
    }

    #[test]
    fn test_highest_block_skips_boundaries() {
        let mut registry = registry();
        assert_eq!(registry.find_highest_block(), None);

        let low = registry
            .create_block(Vec2::new(100.0, 400.0), 'a', WordId(1), None)
            .unwrap();
        let high = registry
            .create_block(Vec2::new(300.0, 120.0), 'b', WordId(2), None)
            .unwrap();
        assert_eq!(registry.find_highest_block(), Some(high));
        registry.destroy_body(high);
        assert_eq!(registry.find_highest_block(), Some(low));
    }

    #[test]
    fn test_mark_static_stops_motion() {
        let mut registry = registry();
        let block = registry
            .create_block(Vec2::new(100.0, 200.0), 'a', WordId(1), None)
            .unwrap();
        assert!(registry.mark_static(block));
        registry.step();
        assert_eq!(registry.position(block), Some(Vec2::new(100.0, 200.0)));
        assert_eq!(registry.is_static(block), Some(true));
    }

    #[test]
    fn test_calls_on_missing_body_degrade() {
        let mut registry = registry();
        let ghost = BodyId(999);
        assert!(!registry.set_velocity(ghost, Vec2::ONE));
        assert_eq!(registry.position(ghost), None);
        assert!(!registry.mark_static(ghost));
        assert_eq!(registry.create_constraint(ghost, BodyId(998)), None);
    }

    #[test]
    fn test_destroy_all_clears_world() {
        let mut registry = registry();
        registry.create_block(Vec2::new(100.0, 100.0), 'a', WordId(1), None);
        registry.destroy_all();
        assert_eq!(registry.block_count(), 0);
        assert_eq!(registry.world().body_count(), 0);
    }
}
