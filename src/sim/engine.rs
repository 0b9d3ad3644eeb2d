//! rapier2d-backed physics world
//!
//! Adapts rapier's pipeline to the `PhysicsWorld` surface. The game speaks in
//! units per tick (velocities in units/tick, gravity in units/tick²) while
//! rapier integrates in seconds at the fixed 60 Hz step, so rates are scaled
//! on the way in and out. Rotations are locked: letter blocks stay upright.

use std::collections::BTreeMap;
use std::sync::Mutex;

use glam::Vec2;
use rapier2d::prelude::*;

use super::world::{
    BodyDesc, BodyId, CollisionPair, ConstraintDesc, ConstraintId, PhysicsError, PhysicsWorld,
    groups_collide,
};
use crate::consts::{BLOCK_SIZE, MAX_BODY_SPEED, SIM_DT, TICKS_PER_SECOND};

/// Maximum live bodies before `add_body` refuses
pub const DEFAULT_MAX_BODIES: usize = 4096;

const TPS: f32 = TICKS_PER_SECOND as f32;

fn check_finite(v: Vec2) -> Result<(), PhysicsError> {
    if v.is_finite() { Ok(()) } else { Err(PhysicsError::NonFinite(v)) }
}

fn to_rapier(v: Vec2) -> Vector<Real> {
    vector![v.x, v.y]
}

fn to_glam(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

/// Collision groups ride in the collider's user data
fn encode_group(group: i32) -> u128 {
    group as u32 as u128
}

fn decode_group(user_data: u128) -> i32 {
    user_data as u32 as i32
}

/// Contact filter for the negative/positive group rule
struct GroupFilter;

impl PhysicsHooks for GroupFilter {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        let group = |handle: ColliderHandle| {
            context
                .colliders
                .get(handle)
                .map_or(0, |c| decode_group(c.user_data))
        };
        if groups_collide(group(context.collider1), group(context.collider2)) {
            Some(SolverFlags::COMPUTE_IMPULSES)
        } else {
            None
        }
    }
}

/// Collects collider pairs whose contact began during a step
#[derive(Default)]
struct StartedContacts(Mutex<Vec<(ColliderHandle, ColliderHandle)>>);

impl StartedContacts {
    fn take(&mut self) -> Vec<(ColliderHandle, ColliderHandle)> {
        match self.0.get_mut() {
            Ok(started) => std::mem::take(started),
            Err(poisoned) => std::mem::take(poisoned.into_inner()),
        }
    }
}

impl EventHandler for StartedContacts {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if !event.started() {
            return;
        }
        let mut started = match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        started.push((event.collider1(), event.collider2()));
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

#[derive(Debug, Clone, Copy)]
struct BodyEntry {
    body: RigidBodyHandle,
    collider: ColliderHandle,
}

#[derive(Debug, Clone, Copy)]
struct JointEntry {
    handle: ImpulseJointHandle,
    a: BodyId,
    b: BodyId,
}

/// Physics world used by the demo binary and the tests
pub struct RapierWorld {
    gravity: Vector<Real>,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    hooks: GroupFilter,
    events: StartedContacts,
    /// Sorted by id (ids only ever increase)
    entries: BTreeMap<BodyId, BodyEntry>,
    joints: BTreeMap<ConstraintId, JointEntry>,
    max_speed: f32,
    max_bodies: usize,
    next_body: u32,
    next_joint: u32,
}

impl RapierWorld {
    /// World with downward gravity (units/tick²)
    pub fn new(gravity: f32) -> Self {
        let mut params = IntegrationParameters::default();
        params.dt = SIM_DT;
        params.length_unit = BLOCK_SIZE;
        Self {
            gravity: vector![0.0, gravity * TPS * TPS],
            params,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            hooks: GroupFilter,
            events: StartedContacts::default(),
            entries: BTreeMap::new(),
            joints: BTreeMap::new(),
            max_speed: MAX_BODY_SPEED,
            max_bodies: DEFAULT_MAX_BODIES,
            next_body: 1,
            next_joint: 1,
        }
    }

    pub fn with_max_bodies(mut self, max_bodies: usize) -> Self {
        self.max_bodies = max_bodies;
        self
    }

    pub fn body_count(&self) -> usize {
        self.entries.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.joints.len()
    }

    /// Teleport a body (test and setup helper)
    pub fn set_position(&mut self, id: BodyId, position: Vec2) -> Result<(), PhysicsError> {
        check_finite(position)?;
        self.body_mut(id)?.set_translation(to_rapier(position), true);
        Ok(())
    }

    fn entry(&self, id: BodyId) -> Result<BodyEntry, PhysicsError> {
        self.entries
            .get(&id)
            .copied()
            .ok_or(PhysicsError::UnknownBody(id))
    }

    fn body(&self, id: BodyId) -> Result<&RigidBody, PhysicsError> {
        let entry = self.entry(id)?;
        self.bodies
            .get(entry.body)
            .ok_or(PhysicsError::UnknownBody(id))
    }

    fn body_mut(&mut self, id: BodyId) -> Result<&mut RigidBody, PhysicsError> {
        let entry = self.entry(id)?;
        self.bodies
            .get_mut(entry.body)
            .ok_or(PhysicsError::UnknownBody(id))
    }

    /// Game id of the body a collider hangs off
    fn owner(&self, collider: ColliderHandle) -> Option<BodyId> {
        let parent = self.colliders.get(collider)?.parent()?;
        let body = self.bodies.get(parent)?;
        Some(BodyId(body.user_data as u32))
    }

    fn clamp_speeds(&mut self) {
        let max = self.max_speed * TPS;
        for (_, body) in self.bodies.iter_mut() {
            let speed = body.linvel().norm();
            if speed > max {
                let capped = *body.linvel() * (max / speed);
                body.set_linvel(capped, false);
            }
        }
    }
}

impl PhysicsWorld for RapierWorld {
    fn add_body(&mut self, desc: &BodyDesc) -> Result<BodyId, PhysicsError> {
        check_finite(desc.position)?;
        if !(desc.half_extents.is_finite() && desc.half_extents.min_element() > 0.0) {
            return Err(PhysicsError::InvalidShape(desc.half_extents));
        }
        if self.entries.len() >= self.max_bodies {
            return Err(PhysicsError::Capacity);
        }
        let id = BodyId(self.next_body);
        self.next_body += 1;

        let builder = if desc.is_static {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic().ccd_enabled(true)
        };
        let rigid_body = builder
            .translation(to_rapier(desc.position))
            .lock_rotations()
            .user_data(id.0 as u128)
            .build();
        let collider = ColliderBuilder::cuboid(desc.half_extents.x, desc.half_extents.y)
            .friction(desc.friction.clamp(0.0, 1.0))
            .restitution(desc.restitution.clamp(0.0, 1.0))
            .restitution_combine_rule(CoefficientCombineRule::Max)
            .density(desc.density.max(0.0))
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .active_hooks(ActiveHooks::FILTER_CONTACT_PAIRS)
            .user_data(encode_group(desc.collision_group))
            .build();

        let body = self.bodies.insert(rigid_body);
        let collider = self
            .colliders
            .insert_with_parent(collider, body, &mut self.bodies);
        self.entries.insert(id, BodyEntry { body, collider });
        Ok(id)
    }

    fn remove_body(&mut self, id: BodyId) -> Result<(), PhysicsError> {
        let entry = self.entries.remove(&id).ok_or(PhysicsError::UnknownBody(id))?;
        // rapier drops attached joints and colliders along with the body
        self.bodies.remove(
            entry.body,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        self.joints.retain(|_, j| j.a != id && j.b != id);
        Ok(())
    }

    fn add_constraint(&mut self, desc: &ConstraintDesc) -> Result<ConstraintId, PhysicsError> {
        let a = self.entry(desc.body_a)?;
        let b = self.entry(desc.body_b)?;
        if !desc.length.is_finite() || !desc.stiffness.is_finite() {
            return Err(PhysicsError::NonFinite(Vec2::new(desc.length, desc.stiffness)));
        }
        // Stiffness is the fraction of the stretch corrected per tick
        let stiffness = desc.stiffness.clamp(0.0, 1.0) * TPS * TPS;
        let damping = stiffness.sqrt();
        let joint = SpringJointBuilder::new(desc.length.max(0.0), stiffness, damping)
            .spring_model(MotorModel::AccelerationBased);
        let handle = self.impulse_joints.insert(a.body, b.body, joint, true);

        let id = ConstraintId(self.next_joint);
        self.next_joint += 1;
        self.joints.insert(
            id,
            JointEntry {
                handle,
                a: desc.body_a,
                b: desc.body_b,
            },
        );
        Ok(id)
    }

    fn remove_constraint(&mut self, id: ConstraintId) -> Result<(), PhysicsError> {
        let joint = self
            .joints
            .remove(&id)
            .ok_or(PhysicsError::UnknownConstraint(id))?;
        self.impulse_joints.remove(joint.handle, true);
        Ok(())
    }

    fn set_velocity(&mut self, id: BodyId, velocity: Vec2) -> Result<(), PhysicsError> {
        check_finite(velocity)?;
        let capped = velocity.clamp_length_max(self.max_speed) * TPS;
        let body = self.body_mut(id)?;
        if !body.is_fixed() {
            body.set_linvel(to_rapier(capped), true);
        }
        Ok(())
    }

    fn set_static(&mut self, id: BodyId, is_static: bool) -> Result<(), PhysicsError> {
        let body = self.body_mut(id)?;
        if is_static {
            body.set_body_type(RigidBodyType::Fixed, true);
            body.set_linvel(vector![0.0, 0.0], false);
        } else {
            body.set_body_type(RigidBodyType::Dynamic, true);
        }
        Ok(())
    }

    fn set_collision_group(&mut self, id: BodyId, group: i32) -> Result<(), PhysicsError> {
        let entry = self.entry(id)?;
        let collider = self
            .colliders
            .get_mut(entry.collider)
            .ok_or(PhysicsError::UnknownBody(id))?;
        collider.user_data = encode_group(group);
        self.body_mut(id)?.wake_up(true);
        Ok(())
    }

    fn position(&self, id: BodyId) -> Result<Vec2, PhysicsError> {
        self.body(id).map(|b| to_glam(b.translation()))
    }

    fn velocity(&self, id: BodyId) -> Result<Vec2, PhysicsError> {
        self.body(id).map(|b| to_glam(b.linvel()) / TPS)
    }

    fn is_static(&self, id: BodyId) -> Result<bool, PhysicsError> {
        self.body(id).map(|b| b.is_fixed())
    }

    fn body_ids(&self) -> Vec<BodyId> {
        self.entries.keys().copied().collect()
    }

    fn step(&mut self) -> Vec<CollisionPair> {
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &self.hooks,
            &self.events,
        );
        self.clamp_speeds();

        let mut started: Vec<CollisionPair> = self
            .events
            .take()
            .into_iter()
            .filter_map(|(c1, c2)| Some(CollisionPair::new(self.owner(c1)?, self.owner(c2)?)))
            .collect();
        started.sort_by_key(|p| (p.a, p.b));
        started.dedup();
        started
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor(world: &mut RapierWorld) -> BodyId {
        world
            .add_body(&BodyDesc::fixed(Vec2::new(0.0, 120.0), Vec2::new(500.0, 20.0)))
            .unwrap()
    }

    #[test]
    fn test_gravity_integrates_dynamic_only() {
        let mut world = RapierWorld::new(0.5);
        let wall = floor(&mut world);
        let block = world
            .add_body(&BodyDesc::dynamic(Vec2::ZERO, Vec2::splat(10.0)))
            .unwrap();
        world.step();
        assert!((world.velocity(block).unwrap().y - 0.5).abs() < 0.001);
        assert_eq!(world.position(wall).unwrap(), Vec2::new(0.0, 120.0));
    }

    #[test]
    fn test_block_lands_and_reports_contact() {
        let mut world = RapierWorld::new(0.5);
        let wall = floor(&mut world);
        let block = world
            .add_body(&BodyDesc::dynamic(Vec2::new(0.0, 60.0), Vec2::splat(10.0)))
            .unwrap();

        let mut starts = 0;
        for _ in 0..200 {
            for pair in world.step() {
                assert_eq!(pair, CollisionPair::new(wall, block));
                starts += 1;
            }
        }
        assert!(starts >= 1);
        let pos = world.position(block).unwrap();
        // Resting on the floor's top edge (y = 100)
        assert!((pos.y - 90.0).abs() < 1.0, "block at {pos}");
        assert!(world.velocity(block).unwrap().y.abs() < 0.5);
    }

    #[test]
    fn test_negative_group_members_pass_through() {
        let mut world = RapierWorld::new(0.0);
        let mut desc = BodyDesc::dynamic(Vec2::ZERO, Vec2::splat(10.0));
        desc.collision_group = -1;
        let a = world.add_body(&desc).unwrap();
        desc.position = Vec2::new(5.0, 0.0);
        let b = world.add_body(&desc).unwrap();
        assert!(world.step().is_empty());
        assert_eq!(world.position(a).unwrap(), Vec2::ZERO);
        assert_eq!(world.position(b).unwrap(), Vec2::new(5.0, 0.0));

        world.set_collision_group(a, 0).unwrap();
        assert_eq!(world.step(), vec![CollisionPair::new(a, b)]);
    }

    #[test]
    fn test_link_pulls_bodies_together() {
        let mut world = RapierWorld::new(0.0);
        let a = world
            .add_body(&BodyDesc::dynamic(Vec2::ZERO, Vec2::splat(5.0)))
            .unwrap();
        let b = world
            .add_body(&BodyDesc::dynamic(Vec2::new(100.0, 0.0), Vec2::splat(5.0)))
            .unwrap();
        world
            .add_constraint(&ConstraintDesc {
                body_a: a,
                body_b: b,
                length: 40.0,
                stiffness: 0.1,
            })
            .unwrap();
        world.step();
        let after = world.position(b).unwrap().x - world.position(a).unwrap().x;
        assert!(after < 100.0);
        assert!(after > 40.0, "soft link should not snap in one step");
    }

    #[test]
    fn test_remove_body_drops_links() {
        let mut world = RapierWorld::new(0.0);
        let a = world
            .add_body(&BodyDesc::dynamic(Vec2::ZERO, Vec2::splat(5.0)))
            .unwrap();
        let b = world
            .add_body(&BodyDesc::dynamic(Vec2::new(50.0, 0.0), Vec2::splat(5.0)))
            .unwrap();
        let link = world
            .add_constraint(&ConstraintDesc {
                body_a: a,
                body_b: b,
                length: 40.0,
                stiffness: 0.1,
            })
            .unwrap();
        world.remove_body(a).unwrap();
        assert_eq!(world.constraint_count(), 0);
        assert_eq!(
            world.remove_constraint(link),
            Err(PhysicsError::UnknownConstraint(link))
        );
        assert_eq!(world.remove_body(a), Err(PhysicsError::UnknownBody(a)));
        assert_eq!(world.body_ids(), vec![b]);
    }

    #[test]
    fn test_static_body_ignores_velocity() {
        let mut world = RapierWorld::new(0.5);
        let id = world
            .add_body(&BodyDesc::dynamic(Vec2::ZERO, Vec2::splat(5.0)))
            .unwrap();
        world.set_static(id, true).unwrap();
        world.set_velocity(id, Vec2::new(0.0, 9.0)).unwrap();
        world.step();
        assert_eq!(world.position(id).unwrap(), Vec2::ZERO);
        assert_eq!(world.velocity(id).unwrap(), Vec2::ZERO);
        assert_eq!(world.is_static(id), Ok(true));
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut world = RapierWorld::new(0.5).with_max_bodies(1);
        assert!(matches!(
            world.add_body(&BodyDesc::dynamic(Vec2::ZERO, Vec2::ZERO)),
            Err(PhysicsError::InvalidShape(_))
        ));
        assert!(matches!(
            world.add_body(&BodyDesc::dynamic(Vec2::NAN, Vec2::ONE)),
            Err(PhysicsError::NonFinite(_))
        ));
        let id = world
            .add_body(&BodyDesc::dynamic(Vec2::ZERO, Vec2::ONE))
            .unwrap();
        assert_eq!(
            world.add_body(&BodyDesc::dynamic(Vec2::ZERO, Vec2::ONE)),
            Err(PhysicsError::Capacity)
        );
        assert!(matches!(
            world.set_velocity(id, Vec2::new(f32::INFINITY, 0.0)),
            Err(PhysicsError::NonFinite(_))
        ));
    }

    #[test]
    fn test_speed_is_capped() {
        let mut world = RapierWorld::new(0.0);
        let id = world
            .add_body(&BodyDesc::dynamic(Vec2::ZERO, Vec2::ONE))
            .unwrap();
        world.set_velocity(id, Vec2::new(0.0, 1000.0)).unwrap();
        assert!(world.velocity(id).unwrap().length() <= MAX_BODY_SPEED + 0.001);
    }

    #[test]
    fn test_group_round_trips_through_user_data() {
        for group in [0, -1, -7, i32::MIN, 3] {
            assert_eq!(decode_group(encode_group(group)), group);
        }
    }
}
