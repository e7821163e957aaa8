//! Tick-keyed deferred actions
//!
//! Spawn timers and other "do this later" rules are stored as actions keyed
//! by the tick they become due. The driver pumps [`EventScheduler::process`]
//! once per tick. Due actions are pulled out under the lock and run after it
//! is released, so an action may schedule more work (itself included).

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::collections::binary_heap::PeekMut;

use parking_lot::Mutex;

/// A deferred action. It receives the scheduler that fired it, so it can
/// reschedule itself, and the caller's context.
pub type Action<C> = Box<dyn FnOnce(&EventScheduler<C>, &mut C) + Send>;

struct ScheduledAction<C> {
    due: u64,
    /// Insertion order, breaks ties between actions due on the same tick
    seq: u64,
    action: Action<C>,
}

impl<C> PartialEq for ScheduledAction<C> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<C> Eq for ScheduledAction<C> {}

impl<C> PartialOrd for ScheduledAction<C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<C> Ord for ScheduledAction<C> {
    // Reversed so the max-heap pops the earliest action first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Pending<C> {
    queue: BinaryHeap<ScheduledAction<C>>,
    next_seq: u64,
}

/// Priority queue of actions ordered by due tick
///
/// `C` is the context handed to every action when it fires, typically the
/// game state. Use `()` when actions need nothing.
pub struct EventScheduler<C = ()> {
    pending: Mutex<Pending<C>>,
}

impl<C> Default for EventScheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for EventScheduler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventScheduler")
            .field("pending", &self.len())
            .field("next_due", &self.next_due())
            .finish()
    }
}

impl<C> EventScheduler<C> {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Pending {
                queue: BinaryHeap::new(),
                next_seq: 0,
            }),
        }
    }

    /// Run `action` on the first `process` call with a tick `>= due`
    pub fn schedule_at<F>(&self, due: u64, action: F)
    where
        F: FnOnce(&EventScheduler<C>, &mut C) + Send + 'static,
    {
        let mut pending = self.pending.lock();
        let seq = pending.next_seq;
        pending.next_seq += 1;
        pending.queue.push(ScheduledAction {
            due,
            seq,
            action: Box::new(action),
        });
    }

    /// Run `action` `delta` ticks after `now`
    pub fn schedule_after<F>(&self, now: u64, delta: u64, action: F)
    where
        F: FnOnce(&EventScheduler<C>, &mut C) + Send + 'static,
    {
        self.schedule_at(now.saturating_add(delta), action);
    }

    /// Fire every action due at or before `current_tick`, earliest first.
    /// Returns how many fired.
    ///
    /// Actions scheduled while this call is running are not considered until
    /// the next call, even if they are already due.
    pub fn process(&self, current_tick: u64, ctx: &mut C) -> usize {
        let due = {
            let mut pending = self.pending.lock();
            let mut due = Vec::new();
            while let Some(top) = pending.queue.peek_mut() {
                if top.due > current_tick {
                    break;
                }
                due.push(PeekMut::pop(top));
            }
            due
        };

        let fired = due.len();
        if fired > 0 {
            log::trace!("Tick {current_tick}: firing {fired} scheduled actions");
        }
        for scheduled in due {
            (scheduled.action)(self, ctx);
        }
        fired
    }

    /// Drop every pending action without running it. Returns how many were
    /// discarded.
    pub fn clear(&self) -> usize {
        let mut pending = self.pending.lock();
        let discarded = pending.queue.len();
        pending.queue.clear();
        discarded
    }

    pub fn len(&self) -> usize {
        self.pending.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().queue.is_empty()
    }

    /// Tick of the earliest pending action
    pub fn next_due(&self) -> Option<u64> {
        self.pending.lock().queue.peek().map(|a| a.due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_fires_exactly_once_at_due_tick() {
        let scheduler: EventScheduler<Vec<&'static str>> = EventScheduler::new();
        scheduler.schedule_at(5, |_, log| log.push("a"));

        let mut log = Vec::new();
        assert_eq!(scheduler.process(4, &mut log), 0);
        assert!(log.is_empty());

        assert_eq!(scheduler.process(5, &mut log), 1);
        assert_eq!(log, vec!["a"]);

        assert_eq!(scheduler.process(5, &mut log), 0);
        assert_eq!(log, vec!["a"]);
    }

    #[test]
    fn test_same_tick_actions_both_fire() {
        let scheduler: EventScheduler<Vec<u32>> = EventScheduler::new();
        scheduler.schedule_at(10, |_, log| log.push(1));
        scheduler.schedule_at(10, |_, log| log.push(2));

        let mut log = Vec::new();
        assert_eq!(scheduler.process(10, &mut log), 2);
        log.sort_unstable();
        assert_eq!(log, vec![1, 2]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_late_process_fires_in_due_order() {
        let scheduler: EventScheduler<Vec<u64>> = EventScheduler::new();
        for due in [30, 10, 20] {
            scheduler.schedule_at(due, move |_, log| log.push(due));
        }
        scheduler.schedule_at(100, |_, log| log.push(100));

        let mut log = Vec::new();
        assert_eq!(scheduler.process(50, &mut log), 3);
        assert_eq!(log, vec![10, 20, 30]);
        assert_eq!(scheduler.next_due(), Some(100));
    }

    #[test]
    fn test_past_due_fires_on_next_process() {
        let scheduler: EventScheduler<u32> = EventScheduler::new();
        let mut fired = 0;
        scheduler.schedule_at(3, |_, n| *n += 1);
        scheduler.process(10, &mut fired);
        assert_eq!(fired, 1);
    }

    fn repeat_every(scheduler: &EventScheduler<Vec<u64>>, at: u64, interval: u64) {
        scheduler.schedule_at(at, move |s, log| {
            log.push(at);
            repeat_every(s, at + interval, interval);
        });
    }

    #[test]
    fn test_self_rescheduling_timer() {
        let scheduler = EventScheduler::new();
        repeat_every(&scheduler, 2, 3);

        let mut log = Vec::new();
        for tick in 0..=12 {
            scheduler.process(tick, &mut log);
        }
        assert_eq!(log, vec![2, 5, 8, 11]);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.next_due(), Some(14));
    }

    #[test]
    fn test_action_due_now_waits_for_next_process() {
        let scheduler: EventScheduler<Vec<&'static str>> = EventScheduler::new();
        scheduler.schedule_at(1, |s, log| {
            log.push("outer");
            s.schedule_at(0, |_, log| log.push("inner"));
        });

        let mut log = Vec::new();
        assert_eq!(scheduler.process(1, &mut log), 1);
        assert_eq!(log, vec!["outer"]);
        assert_eq!(scheduler.process(1, &mut log), 1);
        assert_eq!(log, vec!["outer", "inner"]);
    }

    #[test]
    fn test_clear_discards_without_running() {
        let scheduler: EventScheduler<u32> = EventScheduler::new();
        scheduler.schedule_at(1, |_, n| *n += 1);
        scheduler.schedule_after(1, 4, |_, n| *n += 1);
        assert_eq!(scheduler.clear(), 2);

        let mut n = 0;
        assert_eq!(scheduler.process(u64::MAX, &mut n), 0);
        assert_eq!(n, 0);
    }

    #[test]
    fn test_schedule_after_saturates() {
        let scheduler: EventScheduler = EventScheduler::new();
        scheduler.schedule_after(u64::MAX - 1, 10, |_, _| {});
        assert_eq!(scheduler.next_due(), Some(u64::MAX));
    }

    #[test]
    fn test_schedule_from_another_thread() {
        let scheduler: Arc<EventScheduler<u32>> = Arc::new(EventScheduler::new());
        let remote = Arc::clone(&scheduler);
        std::thread::spawn(move || {
            for due in 0..8 {
                remote.schedule_at(due, |_, n| *n += 1);
            }
        })
        .join()
        .unwrap();

        let mut n = 0;
        assert_eq!(scheduler.process(7, &mut n), 8);
        assert_eq!(n, 8);
    }
}
