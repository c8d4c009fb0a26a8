use std::time::{Duration, Instant};

/// Identifies one round. Bumped on every start/reset so late timers and
/// speech signals from an earlier round can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    CountdownTick,
    AutoReset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub kind: TimerKind,
    pub deadline: Instant,
    pub generation: Generation,
}

/// Holds the engine's pending timers. The engine polls it; nothing here runs on its own.
#[derive(Debug, Default)]
pub struct Scheduler {
    pending: Vec<Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, kind: TimerKind, deadline: Instant, generation: Generation) {
        self.pending.push(Timer {
            kind,
            deadline,
            generation,
        });
    }

    pub fn schedule_after(
        &mut self,
        kind: TimerKind,
        from: Instant,
        delay: Duration,
        generation: Generation,
    ) {
        self.schedule(kind, from + delay, generation);
    }

    /// Removes and returns the earliest timer that is due at `now`.
    /// Timers from any generation other than `current` are discarded on the way.
    pub fn take_due(&mut self, now: Instant, current: Generation) -> Option<Timer> {
        self.pending.retain(|t| t.generation == current);

        let idx = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, t)| t.deadline <= now)
            .min_by_key(|(_, t)| t.deadline)
            .map(|(i, _)| i)?;

        Some(self.pending.swap_remove(idx))
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|t| t.deadline).min()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_due_before_deadline() {
        let mut s = Scheduler::new();
        let t0 = Instant::now();
        let g = Generation::default();
        s.schedule_after(TimerKind::CountdownTick, t0, Duration::from_secs(1), g);

        assert_eq!(s.take_due(t0 + Duration::from_millis(999), g), None);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn due_timer_is_removed() {
        let mut s = Scheduler::new();
        let t0 = Instant::now();
        let g = Generation::default();
        s.schedule_after(TimerKind::AutoReset, t0, Duration::from_secs(4), g);

        let fired = s.take_due(t0 + Duration::from_secs(4), g).unwrap();
        assert_eq!(fired.kind, TimerKind::AutoReset);
        assert_eq!(fired.deadline, t0 + Duration::from_secs(4));
        assert!(s.is_empty());
    }

    #[test]
    fn earliest_due_timer_fires_first() {
        let mut s = Scheduler::new();
        let t0 = Instant::now();
        let g = Generation::default();
        s.schedule(TimerKind::AutoReset, t0 + Duration::from_secs(2), g);
        s.schedule(TimerKind::CountdownTick, t0 + Duration::from_secs(1), g);

        let later = t0 + Duration::from_secs(5);
        assert_eq!(s.take_due(later, g).unwrap().kind, TimerKind::CountdownTick);
        assert_eq!(s.take_due(later, g).unwrap().kind, TimerKind::AutoReset);
        assert_eq!(s.take_due(later, g), None);
    }

    #[test]
    fn stale_generation_never_fires() {
        let mut s = Scheduler::new();
        let t0 = Instant::now();
        let old = Generation::default();
        let current = old.next();
        s.schedule(TimerKind::CountdownTick, t0, old);

        assert_eq!(s.take_due(t0 + Duration::from_secs(10), current), None);
        assert!(s.is_empty());
    }

    #[test]
    fn cancel_all_clears_pending() {
        let mut s = Scheduler::new();
        let t0 = Instant::now();
        s.schedule(TimerKind::CountdownTick, t0, Generation::default());
        s.cancel_all();

        assert!(s.is_empty());
        assert_eq!(s.next_deadline(), None);
    }

    #[test]
    fn generations_are_distinct() {
        let g = Generation::default();
        assert_ne!(g, g.next());
        assert!(g.next() > g);
    }
}
