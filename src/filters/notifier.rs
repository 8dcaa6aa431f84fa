//! Change notification fan-out
//!
//! Subscribers receive the derived [`QueryParams`] together with the full
//! [`FilterSnapshot`]. Each callback runs in isolation: a panicking
//! subscriber is logged and skipped, the remaining ones still run.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use log::error;
use serde::{Deserialize, Serialize};

use super::options::OptionCache;
use super::params::QueryParams;
use super::state::FilterState;

/// Selection plus the option lists that match it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterSnapshot {
    pub filters: FilterState,
    pub options: OptionCache,
}

impl FilterSnapshot {
    pub fn query_params(&self) -> QueryParams {
        QueryParams::from_state(&self.filters)
    }
}

/// Callback invoked on every filter change
pub type FilterCallback = dyn Fn(&QueryParams, &FilterSnapshot) + Send + Sync;

/// Handle returned by [`Notifier::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Typed observer list with unsubscribe support
pub struct Notifier {
    subscribers: Mutex<Vec<(SubscriptionId, Arc<FilterCallback>)>>,
    next_id: AtomicU64,
}

impl Notifier {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Arc<FilterCallback>)>> {
        // Callbacks never run under this lock
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&QueryParams, &FilterSnapshot) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.subscribers().push((id, Arc::new(callback)));
        id
    }

    /// Returns `false` if the subscription was unknown
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscribers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every subscriber; returns how many completed without panicking
    pub fn notify(&self, snapshot: &FilterSnapshot) -> usize {
        let params = snapshot.query_params();
        // Snapshot the list so callbacks may subscribe or unsubscribe
        let callbacks: Vec<(SubscriptionId, Arc<FilterCallback>)> = self.subscribers().clone();

        let mut delivered = 0;
        for (id, callback) in callbacks {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(&params, snapshot))) {
                Ok(()) => delivered += 1,
                Err(_) => error!("Filter subscriber {:?} panicked; continuing", id),
            }
        }
        delivered
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_fan_out_reaches_every_subscriber() {
        let notifier = Notifier::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let hits = hits.clone();
            notifier.subscribe(move |params, _| {
                assert_eq!(params.date_preset.as_str(), "last_30d");
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(notifier.notify(&FilterSnapshot::default()), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_panicking_subscriber_does_not_block_others() {
        let notifier = Notifier::new();
        let hits = Arc::new(AtomicUsize::new(0));

        notifier.subscribe(|_, _| panic!("renderer failed"));
        let h = hits.clone();
        notifier.subscribe(move |_, _| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(notifier.notify(&FilterSnapshot::default()), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let notifier = Notifier::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let id = notifier.subscribe(move |_, _| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        assert!(notifier.is_empty());
        notifier.notify(&FilterSnapshot::default());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
