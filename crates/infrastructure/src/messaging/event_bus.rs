use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use domain::event::{EventListener, SensorEvent};

/// Outcome of one dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

struct ListenerEntry {
    order: u64,
    listener: Weak<dyn EventListener>,
}

#[derive(Default)]
struct ListenerSet {
    next_order: u64,
    entries: HashMap<usize, ListenerEntry>,
}

/// Fans driver events out to registered listeners.
///
/// Listeners are keyed by identity and held weakly, so registering does not
/// keep them alive. Each dispatch works on a snapshot of the set taken up
/// front: registrations made while it runs only affect later dispatches.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<ListenerSet>,
}

fn listener_key(listener: &Arc<dyn EventListener>) -> usize {
    Arc::as_ptr(listener) as *const () as usize
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the listener was already registered
    pub fn register(&self, listener: &Arc<dyn EventListener>) -> bool {
        let mut set = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let key = listener_key(listener);

        // A dead entry under the same address belongs to a dropped listener
        // whose allocation has been reused.
        if let Some(existing) = set.entries.get(&key) {
            if existing.listener.strong_count() > 0 {
                return false;
            }
        }

        let order = set.next_order;
        set.next_order += 1;
        set.entries.insert(
            key,
            ListenerEntry {
                order,
                listener: Arc::downgrade(listener),
            },
        );
        tracing::debug!(listener = %listener.listener_name(), "Listener registered");
        true
    }

    /// Returns `false` when the listener was not registered
    pub fn unregister(&self, listener: &Arc<dyn EventListener>) -> bool {
        let mut set = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        set.entries.remove(&listener_key(listener)).is_some()
    }

    pub fn is_registered(&self, listener: &Arc<dyn EventListener>) -> bool {
        let set = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        set.entries
            .get(&listener_key(listener))
            .is_some_and(|e| e.listener.strong_count() > 0)
    }

    /// Number of registered listeners that are still alive
    pub fn listener_count(&self) -> usize {
        let set = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        set.entries
            .values()
            .filter(|e| e.listener.strong_count() > 0)
            .count()
    }

    /// Live listeners in registration order. Dead entries are pruned.
    fn snapshot(&self) -> Vec<Arc<dyn EventListener>> {
        let mut ordered: Vec<(u64, Arc<dyn EventListener>)> = Vec::new();
        let mut has_dead = false;
        {
            let set = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
            for entry in set.entries.values() {
                match entry.listener.upgrade() {
                    Some(listener) => ordered.push((entry.order, listener)),
                    None => has_dead = true,
                }
            }
        }

        if has_dead {
            let mut set = self
                .listeners
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            set.entries.retain(|_, e| e.listener.strong_count() > 0);
        }

        ordered.sort_by_key(|(order, _)| *order);
        ordered.into_iter().map(|(_, listener)| listener).collect()
    }

    /// Deliver `event` to every listener in registration order.
    ///
    /// A failing listener is logged and skipped; the error never reaches
    /// the caller.
    pub async fn dispatch(&self, event: &SensorEvent) -> DispatchReport {
        let mut report = DispatchReport::default();

        for listener in self.snapshot() {
            match listener.handle_event(event).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        listener = %listener.listener_name(),
                        event = %event.event_type(),
                        error = %e,
                        "Listener failed to handle event"
                    );
                }
            }
        }

        report
    }
}
