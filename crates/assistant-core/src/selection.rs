//! Text-selection capture
//!
//! The host page owns a [`SelectionHub`] and publishes the current selection
//! every time the pointer is released. Widgets subscribe and get back a
//! [`SelectionSubscription`]; dropping it removes the listener.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::mpsc;

type Listeners = Mutex<HashMap<u64, mpsc::UnboundedSender<String>>>;

fn lock(listeners: &Listeners) -> MutexGuard<'_, HashMap<u64, mpsc::UnboundedSender<String>>> {
    listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Returns the trimmed selection if it is non-empty and longer than
/// `threshold` characters.
pub fn qualifying_selection(raw: &str, threshold: usize) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().count() <= threshold {
        return None;
    }
    Some(trimmed)
}

#[derive(Default)]
pub struct SelectionHub {
    listeners: Arc<Listeners>,
    next_id: AtomicU64,
}

impl SelectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> SelectionSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.listeners).insert(id, tx);
        tracing::debug!(listener = id, "selection listener attached");

        SelectionSubscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
            rx,
        }
    }

    /// Pointer released with `selected_text` currently selected on the page.
    pub fn pointer_released(&self, selected_text: &str) {
        let mut listeners = lock(&self.listeners);
        // Receivers that went away without unsubscribing are pruned here
        listeners.retain(|_, tx| tx.send(selected_text.to_string()).is_ok());
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }
}

/// Live subscription to pointer-release selections.
pub struct SelectionSubscription {
    id: u64,
    listeners: Weak<Listeners>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl SelectionSubscription {
    /// Next selection published since the last call, without waiting.
    pub fn try_next(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

impl Drop for SelectionSubscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            lock(&listeners).remove(&self.id);
            tracing::debug!(listener = self.id, "selection listener detached");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_exclusive() {
        assert_eq!(qualifying_selection("  hello ", 5), None);
        assert_eq!(qualifying_selection("  hello! ", 5), Some("hello!"));
    }

    #[test]
    fn test_zero_threshold_accepts_any_non_empty() {
        assert_eq!(qualifying_selection("a", 0), Some("a"));
        assert_eq!(qualifying_selection("   \n ", 0), None);
    }

    #[test]
    fn test_threshold_counts_characters_not_bytes() {
        // five characters, ten bytes
        assert_eq!(qualifying_selection("ééééé", 5), None);
    }

    #[test]
    fn test_subscriber_receives_releases() {
        let hub = SelectionHub::new();
        let mut sub = hub.subscribe();

        hub.pointer_released("inverse kinematics");
        hub.pointer_released("");

        assert_eq!(sub.try_next().as_deref(), Some("inverse kinematics"));
        assert_eq!(sub.try_next().as_deref(), Some(""));
        assert_eq!(sub.try_next(), None);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let hub = SelectionHub::new();
        let first = hub.subscribe();
        let second = hub.subscribe();
        assert_eq!(hub.listener_count(), 2);

        drop(first);
        assert_eq!(hub.listener_count(), 1);

        drop(second);
        assert_eq!(hub.listener_count(), 0);
        hub.pointer_released("nobody listening");
    }

    #[test]
    fn test_subscription_outliving_hub() {
        let hub = SelectionHub::new();
        let sub = hub.subscribe();
        drop(hub);
        drop(sub);
    }
}
