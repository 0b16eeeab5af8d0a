//! The capability every collector kind implements.

use cordsync_core::{CollectorError, Notification};
use indexmap::IndexMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::reason::EndReason;

/// Accumulated values, in first-collected order. A key collected again keeps
/// its position and takes the newer value.
pub type Collection<K, V> = IndexMap<K, V>;

/// What a handler made of one notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Handled<K, V, I> {
    /// A candidate for collection, still subject to the filter.
    Collect { key: K, value: V, item: I },
    /// Something this collector holds was removed. Only acted on when the
    /// collector disposes. `dispose` names the entry to drop; `notify` asks
    /// for a `Remove` event.
    Remove { item: I, dispose: Option<K>, notify: bool },
    /// Everything collected so far is gone.
    Empty,
    /// The collected subject no longer exists.
    End(EndReason),
}

/// A concrete collector kind, driven by [`Collector`](crate::Collector).
pub trait CollectorHandler: Send + 'static {
    type Key: Clone + Eq + Hash + Debug + Send + Sync + 'static;
    type Value: Clone + Debug + Send + Sync + 'static;
    /// What filters and event listeners see.
    type Item: Clone + Debug + Send + Sync + 'static;

    /// Map a notification to zero or more steps. Unrelated notifications
    /// produce nothing.
    fn handle(
        &mut self,
        notification: &Notification,
        collected: &Collection<Self::Key, Self::Value>,
    ) -> Vec<Handled<Self::Key, Self::Value, Self::Item>>;

    /// Ask whether to end after an event was handled.
    fn post_check(&self, collected: &Collection<Self::Key, Self::Value>, received: usize) -> Option<EndReason>;

    /// Reject invalid limits before the collector starts.
    fn validate(&self) -> Result<(), CollectorError> {
        Ok(())
    }

    fn on_collect(&mut self, _item: &Self::Item) {}

    fn on_remove(&mut self, _item: &Self::Item) {}

    fn on_empty(&mut self) {}

    /// Release what the handler holds. Runs exactly once, when the
    /// collector ends.
    fn cleanup(&mut self) {}
}
