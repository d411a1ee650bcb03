//! Debounced, coalescing push scheduler.
//!
//! A small state machine with one pending-job slot:
//!
//! - **Idle**: nothing pending, nothing in flight
//! - **Armed**: a job is pending and the timer is running
//! - **Firing**: a push is in flight; a job may be waiting behind it
//!
//! Scheduling replaces the pending job and re-arms the timer, so a burst of
//! mutations produces one push carrying the last state. At most one push is
//! in flight. A job whose timer expires while another push is still running
//! stays in the slot, keeps coalescing, and goes out as soon as that push
//! completes, so the remote always ends on the newest job. Time is passed in,
//! which keeps the machine free of timers and fully deterministic.

use crate::Envelope;
use std::time::Duration;
use tokio::time::Instant;

/// Quiet period after the last mutation before pushing.
pub const DEBOUNCE: Duration = Duration::from_millis(900);

/// A push waiting for the timer.
#[derive(Debug, Clone, PartialEq)]
pub struct PushJob {
    pub envelope: Envelope,
}

/// Scheduler phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Armed,
    Firing,
}

/// The scheduler state.
#[derive(Debug)]
pub struct PushScheduler {
    delay: Duration,
    pending: Option<PushJob>,
    deadline: Option<Instant>,
    /// Timer expired but a push was still in flight
    due: bool,
    in_flight: bool,
}

impl Default for PushScheduler {
    fn default() -> Self {
        Self::new(DEBOUNCE)
    }
}

impl PushScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            deadline: None,
            due: false,
            in_flight: false,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.deadline.is_some() {
            Phase::Armed
        } else if self.in_flight {
            Phase::Firing
        } else {
            Phase::Idle
        }
    }

    /// When the timer expires, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn pending(&self) -> Option<&PushJob> {
        self.pending.as_ref()
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Replace the pending job and re-arm the timer. Returns the new deadline.
    pub fn schedule(&mut self, job: PushJob, now: Instant) -> Instant {
        if let Some(replaced) = self.pending.replace(job) {
            tracing::trace!(label = %replaced.envelope.label, "coalesced pending push");
        }
        let deadline = now + self.delay;
        self.deadline = Some(deadline);
        self.due = false;
        deadline
    }

    /// Take the pending job if its timer has expired and no push is in
    /// flight.
    ///
    /// An expired job behind an in-flight push is held until
    /// [`PushScheduler::complete`]. The caller owns the returned job's push
    /// and must report it through `complete`.
    pub fn fire(&mut self, now: Instant) -> Option<PushJob> {
        if self.deadline.is_some_and(|deadline| now >= deadline) {
            self.deadline = None;
            self.due = true;
        }
        if !self.due || self.in_flight {
            return None;
        }
        self.due = false;
        let job = self.pending.take()?;
        self.in_flight = true;
        Some(job)
    }

    /// The in-flight push has finished.
    ///
    /// Returns `true` when it carried the newest scheduled state, i.e. no
    /// job is waiting behind it.
    pub fn complete(&mut self) -> bool {
        self.in_flight = false;
        self.pending.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::Snapshot;

    fn job(label: &str) -> PushJob {
        PushJob {
            envelope: Envelope::new(Snapshot::default(), label, ManualClock::at_millis(0).now()),
        }
    }

    #[test]
    fn starts_idle() {
        let scheduler = PushScheduler::default();
        assert_eq!(scheduler.phase(), Phase::Idle);
        assert!(scheduler.deadline().is_none());
        assert!(scheduler.pending().is_none());
    }

    #[test]
    fn schedule_arms_timer() {
        let mut scheduler = PushScheduler::default();
        let now = Instant::now();
        let deadline = scheduler.schedule(job("a"), now);

        assert_eq!(deadline, now + DEBOUNCE);
        assert_eq!(scheduler.phase(), Phase::Armed);
    }

    #[test]
    fn does_not_fire_early() {
        let mut scheduler = PushScheduler::default();
        let now = Instant::now();
        scheduler.schedule(job("a"), now);

        assert!(scheduler.fire(now + Duration::from_millis(899)).is_none());
        assert_eq!(scheduler.phase(), Phase::Armed);
    }

    #[test]
    fn burst_coalesces_to_last_job() {
        let mut scheduler = PushScheduler::default();
        let start = Instant::now();

        scheduler.schedule(job("A"), start);
        scheduler.schedule(job("B"), start + Duration::from_millis(300));
        let deadline = scheduler.schedule(job("C"), start + Duration::from_millis(600));

        // Re-arming moved the deadline
        assert!(scheduler.fire(start + DEBOUNCE).is_none());

        let fired = scheduler.fire(deadline).unwrap();
        assert_eq!(fired.envelope.label, "C");
        assert!(scheduler.fire(deadline + DEBOUNCE).is_none());
        assert_eq!(scheduler.phase(), Phase::Firing);

        scheduler.complete();
        assert_eq!(scheduler.phase(), Phase::Idle);
    }

    #[test]
    fn expired_job_waits_for_in_flight_push() {
        let mut scheduler = PushScheduler::default();
        let start = Instant::now();

        scheduler.schedule(job("A"), start);
        let first = scheduler.fire(start + DEBOUNCE).unwrap();
        assert_eq!(first.envelope.label, "A");

        let later = start + DEBOUNCE + Duration::from_millis(10);
        scheduler.schedule(job("B"), later);
        assert_eq!(scheduler.phase(), Phase::Armed);
        assert!(scheduler.in_flight());

        // B's timer expires while A is still out
        assert!(scheduler.fire(later + DEBOUNCE).is_none());
        assert_eq!(scheduler.phase(), Phase::Firing);
        assert!(scheduler.deadline().is_none());

        // Still coalescing behind the in-flight push
        scheduler.schedule(job("C"), later + DEBOUNCE);
        assert!(scheduler.fire(later + DEBOUNCE * 2).is_none());

        // A was not the newest state
        assert!(!scheduler.complete());
        let next = scheduler.fire(later + DEBOUNCE * 2).unwrap();
        assert_eq!(next.envelope.label, "C");

        assert!(scheduler.complete());
        assert_eq!(scheduler.phase(), Phase::Idle);
        assert!(scheduler.fire(later + DEBOUNCE * 3).is_none());
    }

    #[test]
    fn rescheduling_a_held_job_restarts_the_timer() {
        let mut scheduler = PushScheduler::default();
        let start = Instant::now();

        scheduler.schedule(job("A"), start);
        scheduler.fire(start + DEBOUNCE).unwrap();
        scheduler.schedule(job("B"), start + DEBOUNCE);
        assert!(scheduler.fire(start + DEBOUNCE * 2).is_none());

        let rearmed = scheduler.schedule(job("C"), start + DEBOUNCE * 2);
        assert!(!scheduler.complete());

        // Held job was replaced and re-armed, so it waits again
        assert!(scheduler.fire(start + DEBOUNCE * 2).is_none());
        assert_eq!(scheduler.fire(rearmed).unwrap().envelope.label, "C");
    }

    #[test]
    fn custom_delay() {
        let mut scheduler = PushScheduler::new(Duration::from_millis(10));
        let now = Instant::now();
        scheduler.schedule(job("a"), now);
        assert!(scheduler.fire(now + Duration::from_millis(10)).is_some());
    }
}
