//! Options shared by every collector kind.

use cordsync_core::CollectorError;
use std::sync::Arc;
use std::time::Duration;

use crate::handler::{Collection, CollectorHandler};

/// Predicate over the candidate item and the current accumulation.
pub type Filter<H> = Arc<
    dyn Fn(
            &<H as CollectorHandler>::Item,
            &Collection<<H as CollectorHandler>::Key, <H as CollectorHandler>::Value>,
        ) -> bool
        + Send
        + Sync,
>;

pub struct CollectorOptions<H: CollectorHandler> {
    pub filter: Filter<H>,
    /// End this long after the collector was created.
    pub time: Option<Duration>,
    /// End when nothing was collected for this long.
    pub idle: Option<Duration>,
    /// Act on removal notifications.
    pub dispose: bool,
}

impl<H: CollectorHandler> Default for CollectorOptions<H> {
    fn default() -> Self {
        Self {
            filter: Arc::new(|_, _| true),
            time: None,
            idle: None,
            dispose: false,
        }
    }
}

impl<H: CollectorHandler> Clone for CollectorOptions<H> {
    fn clone(&self) -> Self {
        Self {
            filter: Arc::clone(&self.filter),
            time: self.time,
            idle: self.idle,
            dispose: self.dispose,
        }
    }
}

impl<H: CollectorHandler> std::fmt::Debug for CollectorOptions<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorOptions")
            .field("time", &self.time)
            .field("idle", &self.idle)
            .field("dispose", &self.dispose)
            .finish_non_exhaustive()
    }
}

impl<H: CollectorHandler> CollectorOptions<H> {
    pub fn with_filter(
        mut self,
        filter: impl Fn(&H::Item, &Collection<H::Key, H::Value>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    pub fn with_time(mut self, time: Duration) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_idle(mut self, idle: Duration) -> Self {
        self.idle = Some(idle);
        self
    }

    pub fn with_dispose(mut self, dispose: bool) -> Self {
        self.dispose = dispose;
        self
    }

    pub fn validate(&self) -> Result<(), CollectorError> {
        if self.time == Some(Duration::ZERO) {
            return Err(CollectorError::InvalidOption {
                option: "time",
                reason: "must be greater than zero".into(),
            });
        }
        if self.idle == Some(Duration::ZERO) {
            return Err(CollectorError::InvalidOption {
                option: "idle",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

/// Reject a count limit of zero.
pub(crate) fn positive(option: &'static str, value: Option<usize>) -> Result<(), CollectorError> {
    match value {
        Some(0) => Err(CollectorError::InvalidOption {
            option,
            reason: "must be greater than zero".into(),
        }),
        _ => Ok(()),
    }
}
