use std::time::{Duration, Instant};

use tracing::debug;

/// Default quiet period before a pending mutation is persisted
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Save-status signal exposed for UI feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    /// Nothing pending, nothing recently saved
    Idle,
    /// A mutation is waiting out the debounce window
    Pending,
    /// The last write succeeded
    Saved,
    /// The last write failed; the next edit re-arms the debounce
    Error,
}

/// Debounces title/text mutations into one persistence write per quiescent
/// period
///
/// Each mutation cancels and re-arms a single-shot deadline, so only the
/// last mutation in a burst triggers a write. The coordinator owns the
/// deadline; the driving loop polls [`AutosaveCoordinator::take_due`] and
/// performs the actual save, reporting back through
/// [`AutosaveCoordinator::record_result`]. Failed writes are not retried
/// automatically.
#[derive(Debug)]
pub struct AutosaveCoordinator {
    delay: Duration,
    deadline: Option<Instant>,
    status: SaveStatus,
}

impl AutosaveCoordinator {
    /// Coordinator with the given debounce delay
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            status: SaveStatus::Idle,
        }
    }

    /// Register a title/text mutation at `now`, re-arming the deadline
    pub fn note_mutation(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
        self.status = SaveStatus::Pending;
        debug!(delay = ?self.delay, "autosave armed");
    }

    /// Consume the deadline if it has expired at `now`
    ///
    /// Returns `true` exactly once per armed deadline; the caller then
    /// performs the write and calls [`Self::record_result`].
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Cancel any pending deadline without saving (manual save path, or the
    /// current note going away)
    pub fn cancel(&mut self) {
        self.deadline = None;
        if self.status == SaveStatus::Pending {
            self.status = SaveStatus::Idle;
        }
    }

    /// True if a mutation is waiting out the debounce window
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Record the outcome of a write
    pub fn record_result(&mut self, ok: bool) {
        self.status = if ok { SaveStatus::Saved } else { SaveStatus::Error };
    }

    /// Current save-status signal
    #[must_use]
    pub const fn status(&self) -> SaveStatus {
        self.status
    }

    /// Earliest instant at which the pending save becomes due, if any
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

impl Default for AutosaveCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> AutosaveCoordinator {
        AutosaveCoordinator::new(Duration::from_millis(1000))
    }

    #[test]
    fn test_idle_until_first_mutation() {
        let mut auto = coordinator();
        assert_eq!(auto.status(), SaveStatus::Idle);
        assert!(!auto.take_due(Instant::now()));
    }

    #[test]
    fn test_mutation_arms_then_fires_after_delay() {
        let mut auto = coordinator();
        let t0 = Instant::now();
        auto.note_mutation(t0);
        assert_eq!(auto.status(), SaveStatus::Pending);

        assert!(!auto.take_due(t0 + Duration::from_millis(999)));
        assert!(auto.take_due(t0 + Duration::from_millis(1000)));
        // Consumed: does not fire twice for one armed deadline.
        assert!(!auto.take_due(t0 + Duration::from_millis(2000)));
    }

    #[test]
    fn test_burst_of_mutations_yields_single_save() {
        let mut auto = coordinator();
        let t0 = Instant::now();

        // Five mutations inside the window keep pushing the deadline out.
        for i in 0..5_u64 {
            auto.note_mutation(t0 + Duration::from_millis(i * 200));
            assert!(!auto.take_due(t0 + Duration::from_millis(i * 200 + 100)));
        }

        let mut fired = 0;
        for ms in (800..4000).step_by(100) {
            if auto.take_due(t0 + Duration::from_millis(ms)) {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_cancel_suppresses_pending_save() {
        let mut auto = coordinator();
        let t0 = Instant::now();
        auto.note_mutation(t0);
        auto.cancel();
        assert!(!auto.take_due(t0 + Duration::from_millis(5000)));
        assert_eq!(auto.status(), SaveStatus::Idle);
    }

    #[test]
    fn test_cancel_preserves_terminal_status() {
        let mut auto = coordinator();
        auto.note_mutation(Instant::now());
        auto.record_result(true);
        auto.cancel();
        assert_eq!(auto.status(), SaveStatus::Saved);
    }

    #[test]
    fn test_record_result_status_transitions() {
        let mut auto = coordinator();
        let t0 = Instant::now();

        auto.note_mutation(t0);
        assert!(auto.take_due(t0 + Duration::from_millis(1500)));
        auto.record_result(true);
        assert_eq!(auto.status(), SaveStatus::Saved);

        auto.note_mutation(t0 + Duration::from_secs(2));
        assert!(auto.take_due(t0 + Duration::from_secs(4)));
        auto.record_result(false);
        assert_eq!(auto.status(), SaveStatus::Error);

        // Error is not retried; the next edit re-arms the debounce.
        assert!(!auto.take_due(t0 + Duration::from_secs(10)));
        auto.note_mutation(t0 + Duration::from_secs(11));
        assert_eq!(auto.status(), SaveStatus::Pending);
    }
}
