//! Execution coordination between the webhook path and the periodic
//! scheduler.
//!
//! One `ExecutionCoordinator` exists per process, constructed at startup and
//! handed to the ingestor and scheduler by `Arc` handle. Ownership rules:
//! the webhook path only ever sets the cancel flag and stores the alert
//! buffer; the scheduler is the only component that consumes the cancel flag
//! or flips the processing-active flag back to false.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Process-wide execution state shared by the webhook path and the scheduler
#[derive(Debug, Default)]
pub struct ExecutionCoordinator {
    processing_active: AtomicBool,
    cancel_requested: AtomicBool,
    last_alert: Mutex<Vec<u8>>,
}

impl ExecutionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal that an accepted alert should preempt the next scheduled pass.
    ///
    /// Unconditional and idempotent; never blocks, so the webhook response
    /// path stays low-latency.
    pub fn notify_alert(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
    }

    /// Consume the cancel signal (edge-triggered test-and-clear).
    ///
    /// Scheduler-only: returns true at most once per `notify_alert`.
    pub fn take_cancel(&self) -> bool {
        self.cancel_requested.swap(false, Ordering::SeqCst)
    }

    /// Peek at the cancel signal without consuming it
    pub fn cancel_pending(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    /// Whether a scheduled pass currently holds the processing window
    pub fn is_processing(&self) -> bool {
        self.processing_active.load(Ordering::SeqCst)
    }

    /// Store the raw body of the most recently accepted alert
    pub fn store_alert(&self, raw: &[u8]) {
        let mut buffer = self
            .last_alert
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        buffer.clear();
        buffer.extend_from_slice(raw);
    }

    /// Copy of the most recently accepted alert body (empty before the first)
    pub fn last_alert(&self) -> Vec<u8> {
        self.last_alert
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Mark a scheduled pass active; the guard resets the flag on every exit
    /// path, including drops during task cancellation.
    pub fn begin_processing(self: &Arc<Self>) -> ProcessingGuard {
        self.processing_active.store(true, Ordering::SeqCst);
        ProcessingGuard {
            coordinator: Arc::clone(self),
        }
    }
}

/// RAII guard for the processing-active flag
pub struct ProcessingGuard {
    coordinator: Arc<ExecutionCoordinator>,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.coordinator
            .processing_active
            .store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_with_no_pending_cancel() {
        let coordinator = ExecutionCoordinator::new();
        assert!(!coordinator.is_processing());
        assert!(!coordinator.cancel_pending());
        assert!(coordinator.last_alert().is_empty());
    }

    #[test]
    fn cancel_signal_is_edge_triggered() {
        let coordinator = ExecutionCoordinator::new();

        coordinator.notify_alert();
        assert!(coordinator.cancel_pending());
        assert!(coordinator.take_cancel());

        // Consumed: a second take observes nothing
        assert!(!coordinator.take_cancel());
        assert!(!coordinator.cancel_pending());
    }

    #[test]
    fn notify_alert_is_idempotent() {
        let coordinator = ExecutionCoordinator::new();
        coordinator.notify_alert();
        coordinator.notify_alert();
        coordinator.notify_alert();

        assert!(coordinator.take_cancel());
        assert!(!coordinator.take_cancel());
    }

    #[test]
    fn processing_guard_resets_flag_on_drop() {
        let coordinator = Arc::new(ExecutionCoordinator::new());

        {
            let _guard = coordinator.begin_processing();
            assert!(coordinator.is_processing());
        }
        assert!(!coordinator.is_processing());
    }

    #[test]
    fn alert_buffer_holds_latest_body() {
        let coordinator = ExecutionCoordinator::new();
        coordinator.store_alert(b"first");
        coordinator.store_alert(b"second");
        assert_eq!(coordinator.last_alert(), b"second");
    }
}
