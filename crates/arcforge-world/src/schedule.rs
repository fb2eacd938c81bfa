//! Cancellable deferred tasks.
//!
//! Tasks carry the identity of what they act on (chunk and load generation,
//! or entity) so they can be cancelled when that target goes away and
//! re-validated when they fire.

use std::time::Duration;

use arcforge_common::{ChunkCoord, EntityHandle};
use tracing::debug;

/// Identifier of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Returns the raw id.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Work to run later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    /// Spawn a replacement mob in a chunk, if it is still the same load
    RespawnMob {
        /// Home chunk of the dead mob
        chunk: ChunkCoord,
        /// Load generation of the chunk when the mob died
        generation: u64,
    },
    /// Remove the damage flash from a mob
    ClearTint {
        /// Target mob
        entity: EntityHandle,
    },
}

/// A task waiting in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask {
    /// Task id
    pub id: TaskId,
    /// Scheduler time at which the task fires
    pub due: Duration,
    /// What to do
    pub action: DeferredAction,
}

/// Time-ordered queue of deferred actions.
#[derive(Debug, Default)]
pub struct Scheduler {
    now: Duration,
    next_id: u64,
    tasks: Vec<ScheduledTask>,
}

impl Scheduler {
    /// Creates an empty scheduler at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current scheduler time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Advances the clock.
    pub fn advance(&mut self, dt: Duration) {
        self.now += dt;
    }

    /// Schedules an action `delay` from now.
    pub fn schedule(&mut self, delay: Duration, action: DeferredAction) -> TaskId {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        self.tasks.push(ScheduledTask {
            id,
            due: self.now + delay,
            action,
        });
        id
    }

    /// Cancels a task. Returns whether it was still pending.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }

    /// Cancels every respawn bound to a chunk. Returns how many were dropped.
    pub fn cancel_for_chunk(&mut self, chunk: ChunkCoord) -> usize {
        self.cancel_where(|action| {
            matches!(action, DeferredAction::RespawnMob { chunk: c, .. } if *c == chunk)
        })
    }

    /// Cancels every task targeting an entity. Returns how many were dropped.
    pub fn cancel_for_entity(&mut self, entity: EntityHandle) -> usize {
        self.cancel_where(|action| {
            matches!(action, DeferredAction::ClearTint { entity: e } if *e == entity)
        })
    }

    fn cancel_where(&mut self, predicate: impl Fn(&DeferredAction) -> bool) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| !predicate(&task.action));
        let dropped = before - self.tasks.len();
        if dropped > 0 {
            debug!("Cancelled {dropped} deferred tasks");
        }
        dropped
    }

    /// Removes and returns every task due at the current time, earliest first.
    pub fn drain_due(&mut self) -> Vec<ScheduledTask> {
        let now = self.now;
        let mut due: Vec<_> = self.tasks.iter().filter(|t| t.due <= now).copied().collect();
        self.tasks.retain(|t| t.due > now);
        due.sort_by_key(|t| (t.due, t.id));
        due
    }

    /// Number of pending tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_tasks_fire_in_due_order() {
        let mut scheduler = Scheduler::new();
        let late = scheduler.schedule(
            ms(200),
            DeferredAction::ClearTint {
                entity: EntityHandle::from_raw(1),
            },
        );
        let early = scheduler.schedule(
            ms(80),
            DeferredAction::ClearTint {
                entity: EntityHandle::from_raw(2),
            },
        );

        scheduler.advance(ms(50));
        assert!(scheduler.drain_due().is_empty());

        scheduler.advance(ms(200));
        let fired: Vec<_> = scheduler.drain_due().iter().map(|t| t.id).collect();
        assert_eq!(fired, vec![early, late]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_cancel_single_task() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.schedule(
            ms(10),
            DeferredAction::ClearTint {
                entity: EntityHandle::from_raw(1),
            },
        );
        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        scheduler.advance(ms(20));
        assert!(scheduler.drain_due().is_empty());
    }

    #[test]
    fn test_cancel_for_chunk_and_entity() {
        let mut scheduler = Scheduler::new();
        let chunk = ChunkCoord::new(3, 4);
        let mob = EntityHandle::from_raw(9);
        scheduler.schedule(
            ms(15_000),
            DeferredAction::RespawnMob {
                chunk,
                generation: 1,
            },
        );
        scheduler.schedule(
            ms(15_000),
            DeferredAction::RespawnMob {
                chunk: ChunkCoord::new(0, 0),
                generation: 2,
            },
        );
        scheduler.schedule(ms(80), DeferredAction::ClearTint { entity: mob });

        assert_eq!(scheduler.cancel_for_chunk(chunk), 1);
        assert_eq!(scheduler.cancel_for_entity(mob), 1);
        assert_eq!(scheduler.cancel_for_entity(mob), 0);
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn test_delay_is_relative_to_now() {
        let mut scheduler = Scheduler::new();
        scheduler.advance(ms(1_000));
        scheduler.schedule(
            ms(80),
            DeferredAction::ClearTint {
                entity: EntityHandle::from_raw(1),
            },
        );
        scheduler.advance(ms(79));
        assert!(scheduler.drain_due().is_empty());
        scheduler.advance(ms(1));
        assert_eq!(scheduler.drain_due().len(), 1);
    }
}
