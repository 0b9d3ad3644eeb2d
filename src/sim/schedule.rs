//! Tick-indexed task queue
//!
//! Delays (respawn cooldown, staggered explosions) are entries due on a future
//! tick rather than timers. The whole queue is cancelled as a set when a round
//! ends.

use super::state::BlockHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledTask {
    /// Cooldown over; the controller may spawn again
    EndCooldown,
    /// Destroy one block with an explosion effect
    Explode(BlockHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    due_tick: u64,
    seq: u64,
    task: ScheduledTask,
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    entries: Vec<Entry>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` to fire `delay` ticks after `now` (0 = next drain)
    pub fn schedule(&mut self, now: u64, delay: u64, task: ScheduledTask) {
        let entry = Entry {
            due_tick: now.saturating_add(delay),
            seq: self.next_seq,
            task,
        };
        self.next_seq += 1;
        self.entries.push(entry);
    }

    /// Remove and return every task due at or before `now`, in due order
    /// (ties keep scheduling order)
    pub fn drain_due(&mut self, now: u64) -> Vec<ScheduledTask> {
        let mut due: Vec<Entry> = Vec::new();
        self.entries.retain(|e| {
            if e.due_tick <= now {
                due.push(*e);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|e| (e.due_tick, e.seq));
        due.into_iter().map(|e| e.task).collect()
    }

    pub fn has_pending(&self, task: ScheduledTask) -> bool {
        self.entries.iter().any(|e| e.task == task)
    }

    /// Cancel everything; returns how many tasks were dropped
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::world::BodyId;

    #[test]
    fn test_tasks_fire_on_due_tick() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(10, 5, ScheduledTask::EndCooldown);
        assert!(scheduler.drain_due(14).is_empty());
        assert_eq!(scheduler.drain_due(15), vec![ScheduledTask::EndCooldown]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_due_order_then_insertion_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(0, 3, ScheduledTask::Explode(BodyId(3)));
        scheduler.schedule(0, 1, ScheduledTask::Explode(BodyId(1)));
        scheduler.schedule(0, 3, ScheduledTask::Explode(BodyId(4)));
        assert_eq!(
            scheduler.drain_due(10),
            vec![
                ScheduledTask::Explode(BodyId(1)),
                ScheduledTask::Explode(BodyId(3)),
                ScheduledTask::Explode(BodyId(4)),
            ]
        );
    }

    #[test]
    fn test_cancel_all() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(0, 30, ScheduledTask::EndCooldown);
        scheduler.schedule(0, 40, ScheduledTask::Explode(BodyId(1)));
        assert!(scheduler.has_pending(ScheduledTask::EndCooldown));
        assert_eq!(scheduler.cancel_all(), 2);
        assert!(scheduler.drain_due(100).is_empty());
    }
}
