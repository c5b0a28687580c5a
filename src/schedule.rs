//! Deferred work: fall timer, hard-drop burst, phase continuations, banner expiry.
//!
//! Fall, drop and phase each have exactly one slot. Arming a slot replaces whatever
//! was in it, so a second fall timer or a second resolve chain cannot coexist with
//! the first. Banner expiries are kept per pop and each one fires on its own.

use std::time::{Duration, Instant};

/// Continuation after a lock or a pop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Apply gravity, then move to `clearing`.
    Settle,
    /// Run the clear resolver.
    Resolve,
}

/// Something that came due. Ordered by priority for same-instant ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Event {
    Phase(Phase),
    Fall,
    DropTick,
    BannerExpired,
}

#[derive(Debug, Clone, Copy)]
struct Repeating {
    every: Duration,
    due: Instant,
}

#[derive(Debug, Clone, Copy)]
struct Burst {
    every: Duration,
    due: Instant,
    deadline: Instant,
}

#[derive(Debug, Default, Clone)]
pub struct Scheduler {
    fall: Option<Repeating>,
    drop: Option<Burst>,
    phase: Option<(Phase, Instant)>,
    banners: Vec<Instant>,
}

impl Scheduler {
    /// Cancel any running fall timer and start a new one; first tick at `now + every`.
    pub fn start_fall(&mut self, now: Instant, every: Duration) {
        self.cancel_fall();
        self.fall = Some(Repeating {
            every,
            due: now + every,
        });
    }

    pub fn cancel_fall(&mut self) {
        self.fall = None;
    }

    #[cfg(test)]
    pub fn fall_active(&self) -> bool {
        self.fall.is_some()
    }

    /// Tick every `every` until `window` has passed.
    pub fn start_drop(&mut self, now: Instant, every: Duration, window: Duration) {
        self.cancel_drop();
        self.drop = Some(Burst {
            every,
            due: now + every,
            deadline: now + window,
        });
    }

    pub fn cancel_drop(&mut self) {
        self.drop = None;
    }

    #[cfg(test)]
    pub fn drop_active(&self) -> bool {
        self.drop.is_some()
    }

    pub fn schedule_phase(&mut self, phase: Phase, due: Instant) {
        self.phase = Some((phase, due));
    }

    pub fn cancel_phase(&mut self) {
        self.phase = None;
    }

    #[cfg(test)]
    pub fn pending_phase(&self) -> Option<Phase> {
        self.phase.map(|(phase, _)| phase)
    }

    /// Add a banner expiry; earlier ones still fire at their own time.
    pub fn arm_banner(&mut self, due: Instant) {
        self.banners.push(due);
    }

    pub fn cancel_all(&mut self) {
        *self = Self::default();
    }

    /// Earliest armed event.
    pub fn next_due(&self) -> Option<(Instant, Event)> {
        let candidates = [
            self.phase.map(|(phase, due)| (due, Event::Phase(phase))),
            self.fall.map(|f| (f.due, Event::Fall)),
            self.drop
                .filter(|d| d.due < d.deadline)
                .map(|d| (d.due, Event::DropTick)),
            self.drop
                .filter(|d| d.due >= d.deadline)
                .map(|d| (d.deadline, Event::DropTick)),
            self.banners
                .iter()
                .min()
                .map(|&due| (due, Event::BannerExpired)),
        ];
        candidates.into_iter().flatten().min()
    }

    /// Consume `event`: repeating slots re-arm, one-shot slots empty.
    /// Returns false when the event should not run (burst past its window).
    pub fn fire(&mut self, event: Event) -> bool {
        match event {
            Event::Phase(_) => {
                self.phase = None;
                true
            }
            Event::Fall => {
                if let Some(fall) = self.fall.as_mut() {
                    fall.due += fall.every;
                }
                true
            }
            Event::DropTick => match self.drop.as_mut() {
                Some(burst) if burst.due < burst.deadline => {
                    burst.due += burst.every;
                    true
                }
                _ => {
                    self.drop = None;
                    false
                }
            },
            Event::BannerExpired => {
                if let Some(earliest) = self.banners.iter().min().copied() {
                    self.banners.retain(|&due| due != earliest);
                }
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn restarting_fall_timer_replaces_the_old_one() {
        let t0 = Instant::now();
        let mut s = Scheduler::default();
        s.start_fall(t0, 1000 * MS);
        s.start_fall(t0 + 400 * MS, 1000 * MS);
        assert_eq!(s.next_due(), Some((t0 + 1400 * MS, Event::Fall)));
    }

    #[test]
    fn fall_timer_rearms_after_firing() {
        let t0 = Instant::now();
        let mut s = Scheduler::default();
        s.start_fall(t0, 1000 * MS);
        assert!(s.fire(Event::Fall));
        assert_eq!(s.next_due(), Some((t0 + 2000 * MS, Event::Fall)));
    }

    #[test]
    fn burst_stops_at_its_window() {
        let t0 = Instant::now();
        let mut s = Scheduler::default();
        s.start_drop(t0, 50 * MS, 120 * MS);
        let mut ran = 0;
        while let Some((_, event)) = s.next_due() {
            if s.fire(event) {
                ran += 1;
            }
        }
        assert_eq!(ran, 2);
        assert!(!s.drop_active());
    }

    #[test]
    fn phase_wins_same_instant_ties() {
        let t0 = Instant::now();
        let mut s = Scheduler::default();
        s.start_fall(t0, 300 * MS);
        s.schedule_phase(Phase::Settle, t0 + 300 * MS);
        assert_eq!(
            s.next_due(),
            Some((t0 + 300 * MS, Event::Phase(Phase::Settle)))
        );
    }

    #[test]
    fn each_banner_expiry_fires_separately() {
        let t0 = Instant::now();
        let mut s = Scheduler::default();
        s.arm_banner(t0 + 1000 * MS);
        s.arm_banner(t0 + 1800 * MS);
        assert_eq!(s.next_due(), Some((t0 + 1000 * MS, Event::BannerExpired)));
        assert!(s.fire(Event::BannerExpired));
        assert_eq!(s.next_due(), Some((t0 + 1800 * MS, Event::BannerExpired)));
        assert!(s.fire(Event::BannerExpired));
        assert_eq!(s.next_due(), None);
    }

    #[test]
    fn cancel_all_empties_every_slot() {
        let t0 = Instant::now();
        let mut s = Scheduler::default();
        s.start_fall(t0, MS);
        s.start_drop(t0, MS, 10 * MS);
        s.schedule_phase(Phase::Resolve, t0);
        s.arm_banner(t0);
        s.cancel_all();
        assert_eq!(s.next_due(), None);
    }
}
