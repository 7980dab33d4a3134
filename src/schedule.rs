//! Recurring timers for the event loop.
//!
//! The loop owns one [`Scheduler`] holding a deadline per [`Task`].  Each
//! iteration asks which tasks are [`due`](Scheduler::due) and sleeps in the
//! input poll until the next deadline.  A task fires at most once per call;
//! periods missed while the loop was busy are dropped, not replayed.
//!
//! Shutdown goes through the shared [`CancellationToken`]: once cancelled
//! nothing is due any more and the loop exits.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

/// Poll timeout used when no task is registered.
const IDLE_WAIT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Task {
    /// Move the marquee one step.
    Scroll,
    /// Advance the marquee colour.
    Color,
    /// Fetch the next feed in the cycle.
    Refresh,
}

#[derive(Debug)]
struct Recurring {
    task: Task,
    period: Duration,
    next_due: Instant,
}

#[derive(Debug)]
pub struct Scheduler {
    tasks: Vec<Recurring>,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            tasks: Vec::new(),
            cancel,
        }
    }

    /// Register `task` to run every `period`, first one period after `now`.
    pub fn every(&mut self, task: Task, period: Duration, now: Instant) -> &mut Self {
        self.every_from(task, period, now + period)
    }

    /// Register `task` to run every `period`, first at `first_due`.
    /// Re-registering a task replaces its schedule.
    pub fn every_from(&mut self, task: Task, period: Duration, first_due: Instant) -> &mut Self {
        let period = period.max(Duration::from_millis(1));
        self.tasks.retain(|r| r.task != task);
        self.tasks.push(Recurring {
            task,
            period,
            next_due: first_due,
        });
        self
    }

    /// Push `task`'s next deadline to one full period after `now`.
    pub fn reset(&mut self, task: Task, now: Instant) {
        if let Some(r) = self.tasks.iter_mut().find(|r| r.task == task) {
            r.next_due = now + r.period;
        }
    }

    /// Tasks whose deadline has passed, in registration order.
    pub fn due(&mut self, now: Instant) -> Vec<Task> {
        if self.cancel.is_cancelled() {
            return Vec::new();
        }

        let mut fired = Vec::new();
        for r in &mut self.tasks {
            if r.next_due > now {
                continue;
            }
            fired.push(r.task);
            r.next_due += r.period;
            if r.next_due <= now {
                r.next_due = now + r.period;
            }
        }
        fired
    }

    /// How long the loop may block before the next deadline.
    pub fn time_until_next(&self, now: Instant) -> Duration {
        self.tasks
            .iter()
            .map(|r| r.next_due.saturating_duration_since(now))
            .min()
            .unwrap_or(IDLE_WAIT)
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn scheduler() -> Scheduler {
        Scheduler::new(CancellationToken::new())
    }

    #[test]
    fn fires_on_period() {
        let t0 = Instant::now();
        let mut s = scheduler();
        s.every(Task::Scroll, ms(50), t0);

        assert!(s.due(t0).is_empty());
        assert!(s.due(t0 + ms(49)).is_empty());
        assert_eq!(s.due(t0 + ms(50)), vec![Task::Scroll]);
        assert!(s.due(t0 + ms(60)).is_empty());
        assert_eq!(s.due(t0 + ms(100)), vec![Task::Scroll]);
    }

    #[test]
    fn every_from_can_fire_immediately() {
        let t0 = Instant::now();
        let mut s = scheduler();
        s.every_from(Task::Refresh, ms(60_000), t0);

        assert_eq!(s.due(t0), vec![Task::Refresh]);
        assert!(s.due(t0 + ms(59_999)).is_empty());
        assert_eq!(s.due(t0 + ms(60_000)), vec![Task::Refresh]);
    }

    #[test]
    fn missed_periods_fire_once() {
        let t0 = Instant::now();
        let mut s = scheduler();
        s.every(Task::Scroll, ms(50), t0);

        assert_eq!(s.due(t0 + ms(500)), vec![Task::Scroll]);
        assert!(s.due(t0 + ms(520)).is_empty());
        assert_eq!(s.due(t0 + ms(550)), vec![Task::Scroll]);
    }

    #[test]
    fn independent_periods() {
        let t0 = Instant::now();
        let mut s = scheduler();
        s.every(Task::Scroll, ms(50), t0)
            .every(Task::Color, ms(1000), t0);

        let mut scrolls = 0;
        let mut colors = 0;
        for step in 1..=40u64 {
            for task in s.due(t0 + ms(step * 50)) {
                match task {
                    Task::Scroll => scrolls += 1,
                    Task::Color => colors += 1,
                    Task::Refresh => unreachable!(),
                }
            }
        }
        assert_eq!(scrolls, 40);
        assert_eq!(colors, 2);
    }

    #[test]
    fn time_until_next_is_nearest_deadline() {
        let t0 = Instant::now();
        let mut s = scheduler();
        assert_eq!(s.time_until_next(t0), IDLE_WAIT);

        s.every(Task::Scroll, ms(50), t0)
            .every(Task::Refresh, ms(60_000), t0);
        assert_eq!(s.time_until_next(t0 + ms(20)), ms(30));
        assert_eq!(s.time_until_next(t0 + ms(80)), Duration::ZERO);
    }

    #[test]
    fn reset_postpones_task() {
        let t0 = Instant::now();
        let mut s = scheduler();
        s.every(Task::Refresh, ms(1000), t0);

        s.reset(Task::Refresh, t0 + ms(900));

        assert!(s.due(t0 + ms(1000)).is_empty());
        assert_eq!(s.due(t0 + ms(1900)), vec![Task::Refresh]);
    }

    #[test]
    fn cancelled_scheduler_is_silent() {
        let t0 = Instant::now();
        let token = CancellationToken::new();
        let mut s = Scheduler::new(token.clone());
        s.every_from(Task::Refresh, ms(1000), t0);

        token.cancel();

        assert!(s.is_cancelled());
        assert!(s.due(t0 + ms(5000)).is_empty());
    }
}
