//! Outbound fragment queue shared by the capture thread and the worker.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::fragment::Fragment;

/// Priority queue of pending fragments.
///
/// Ordering rules:
/// - A transform fragment goes to the head and replaces any transform still
///   waiting; only the newest placement matters.
/// - Model fragments are appended and leave in FIFO order.
/// - An entry whose send failed goes back to the tail, so one bad entry
///   cannot block the head forever.
///
/// The lock is only held for queue bookkeeping, never across I/O.
pub struct SendQueue {
    entries: Mutex<VecDeque<Fragment>>,
    max_models: Option<usize>,
}

impl SendQueue {
    pub fn new(max_models: Option<usize>) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            max_models,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Enqueue a fresh fragment according to the priority rules.
    pub fn push(&self, fragment: Fragment) {
        let mut entries = self.entries.lock();
        match fragment {
            Fragment::Transform(_) => {
                let before = entries.len();
                entries.retain(|e| !e.is_transform());
                if entries.len() != before {
                    debug!("Transform fragment superseded a queued one");
                }
                entries.push_front(fragment);
            }
            Fragment::Model(_) => {
                entries.push_back(fragment);
                if let Some(max) = self.max_models {
                    Self::enforce_model_cap(&mut entries, max);
                }
            }
        }
    }

    /// Put back an entry whose send failed.
    ///
    /// Never subject to the model cap. A stale transform is discarded when
    /// a newer one arrived while it was in flight.
    pub fn requeue(&self, fragment: Fragment) {
        let mut entries = self.entries.lock();
        if fragment.is_transform() && entries.iter().any(Fragment::is_transform) {
            debug!("Dropping failed transform fragment, a newer one is queued");
            return;
        }
        entries.push_back(fragment);
    }

    pub fn pop(&self) -> Option<Fragment> {
        self.entries.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Number of queued model fragments.
    pub fn model_count(&self) -> usize {
        self.entries.lock().iter().filter(|e| !e.is_transform()).count()
    }

    /// Remove everything, returning the entries in send order.
    pub fn drain(&self) -> Vec<Fragment> {
        self.entries.lock().drain(..).collect()
    }

    fn enforce_model_cap(entries: &mut VecDeque<Fragment>, max: usize) {
        let mut models = entries.iter().filter(|e| !e.is_transform()).count();
        while models > max {
            let Some(oldest) = entries.iter().position(|e| !e.is_transform()) else {
                break;
            };
            entries.remove(oldest);
            models -= 1;
            warn!(
                "Send queue holds more than {} model fragments, dropped the oldest",
                max
            );
        }
    }
}

impl Default for SendQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}
