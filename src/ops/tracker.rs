use std::sync::{Arc, Mutex, MutexGuard};

use crate::catalog::JobKind;

/// Serializes catalog-mutating operations within one process.
///
/// Clones share state, so every handle that writes to the same catalog
/// should be built from one tracker.
#[derive(Debug, Clone, Default)]
pub struct OperationTracker {
    active: Arc<Mutex<Option<JobKind>>>,
}

impl OperationTracker {
    /// Claim the tracker for `kind`. Returns `None` while another operation holds it.
    pub fn try_begin(&self, kind: JobKind) -> Option<OperationTicket> {
        let mut active = self.lock();
        if active.is_some() {
            return None;
        }
        *active = Some(kind);
        Some(OperationTicket {
            active: Arc::clone(&self.active),
            kind,
        })
    }

    /// The operation currently running, if any.
    pub fn active(&self) -> Option<JobKind> {
        *self.lock()
    }

    pub fn is_busy(&self) -> bool {
        self.active().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<JobKind>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Proof that an operation owns the tracker; releases it on drop, including on error paths.
#[derive(Debug)]
pub struct OperationTicket {
    active: Arc<Mutex<Option<JobKind>>>,
    kind: JobKind,
}

impl OperationTicket {
    pub fn kind(&self) -> JobKind {
        self.kind
    }
}

impl Drop for OperationTicket {
    fn drop(&mut self) {
        let mut active = self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prevents_overlapping_operations() {
        let tracker = OperationTracker::default();
        let ticket = tracker.try_begin(JobKind::Scan).unwrap();
        assert_eq!(ticket.kind(), JobKind::Scan);
        assert_eq!(tracker.active(), Some(JobKind::Scan));
        assert!(tracker.clone().try_begin(JobKind::Diff).is_none());
        drop(ticket);
        assert!(!tracker.is_busy());
        assert!(tracker.try_begin(JobKind::Diff).is_some());
    }

    #[test]
    fn releases_after_panicking_holder() {
        let tracker = OperationTracker::default();
        let shared = tracker.clone();
        let result = std::thread::spawn(move || {
            let _ticket = shared.try_begin(JobKind::Import).unwrap();
            panic!("operation failed");
        })
        .join();
        assert!(result.is_err());
        assert!(tracker.try_begin(JobKind::Import).is_some());
    }
}
