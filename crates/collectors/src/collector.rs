//! The collector engine: lifecycle, timers and accumulation.
//!
//! A [`Collector`] is driven by [`Collector::run`], normally on its own task.
//! Everything else talks to it through a [`CollectorHandle`]: stopping,
//! resetting timers, reading the accumulation and awaiting results.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cordsync_core::{CollectorError, Notification};
use parking_lot::RwLock;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::handler::{Collection, CollectorHandler, Handled};
use crate::options::CollectorOptions;
use crate::reason::EndReason;

/// Buffered collector events per listener.
const EVENT_CAPACITY: usize = 64;

/// Final state of an ended collector.
#[derive(Debug, Clone)]
pub struct Outcome<K, V> {
    pub collected: Collection<K, V>,
    pub reason: EndReason,
}

/// Events a collector emits while it runs. `End` is emitted exactly once.
#[derive(Debug, Clone)]
pub enum CollectorEvent<K, V, I> {
    Collect { key: K, value: V, item: I },
    Dispose { key: K, value: V, item: I },
    Remove { item: I },
    Empty,
    End { collected: Collection<K, V>, reason: EndReason },
}

/// The collector ended before another value was collected.
#[derive(Debug, Clone)]
pub struct CollectorEnded<K, V> {
    pub collected: Collection<K, V>,
    pub reason: EndReason,
}

impl<K, V> fmt::Display for CollectorEnded<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "collector ended ({}) with {} collected", self.reason, self.collected.len())
    }
}

impl<K: fmt::Debug, V: fmt::Debug> std::error::Error for CollectorEnded<K, V> {}

#[derive(Debug)]
enum Control {
    Stop(EndReason),
    ResetTimer { time: Option<Duration>, idle: Option<Duration> },
}

#[derive(Debug)]
struct State<K, V> {
    collected: Collection<K, V>,
    received: usize,
    ended: bool,
}

enum Step {
    Control(Control),
    Expired(EndReason),
    Source(Result<Arc<Notification>, RecvError>),
}

type Events<H> = CollectorEvent<
    <H as CollectorHandler>::Key,
    <H as CollectorHandler>::Value,
    <H as CollectorHandler>::Item,
>;
type Final<H> = Outcome<<H as CollectorHandler>::Key, <H as CollectorHandler>::Value>;

pub struct Collector<H: CollectorHandler> {
    handler: H,
    options: CollectorOptions<H>,
    source: Option<broadcast::Receiver<Arc<Notification>>>,
    control_tx: mpsc::UnboundedSender<Control>,
    control: mpsc::UnboundedReceiver<Control>,
    state: Arc<RwLock<State<H::Key, H::Value>>>,
    events: broadcast::Sender<Events<H>>,
    outcome: watch::Sender<Option<Final<H>>>,
    deadline: Option<Instant>,
    idle_deadline: Option<Instant>,
    finished: bool,
}

impl<H: CollectorHandler> Collector<H> {
    /// Create a collector over `source`. Timers start now, not when the
    /// collector starts running.
    pub fn new(
        handler: H,
        options: CollectorOptions<H>,
        source: broadcast::Receiver<Arc<Notification>>,
    ) -> Result<Self, CollectorError> {
        options.validate()?;
        handler.validate()?;

        let now = Instant::now();
        let (control_tx, control) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (outcome, _) = watch::channel(None);
        Ok(Self {
            deadline: options.time.and_then(|time| deadline_after(now, time)),
            idle_deadline: options.idle.and_then(|idle| deadline_after(now, idle)),
            handler,
            options,
            source: Some(source),
            control_tx,
            control,
            state: Arc::new(RwLock::new(State {
                collected: Collection::new(),
                received: 0,
                ended: false,
            })),
            events,
            outcome,
            finished: false,
        })
    }

    pub fn handle(&self) -> CollectorHandle<H> {
        CollectorHandle {
            control: self.control_tx.clone(),
            state: Arc::clone(&self.state),
            events: self.events.clone(),
            outcome: self.outcome.subscribe(),
        }
    }

    /// Run on a new task.
    pub fn spawn(self) -> (CollectorHandle<H>, JoinHandle<Final<H>>) {
        let handle = self.handle();
        (handle, tokio::spawn(self.run()))
    }

    /// Process notifications until an end condition is met.
    pub async fn run(mut self) -> Final<H> {
        let reason = loop {
            let step = tokio::select! {
                biased;
                Some(control) = self.control.recv() => Step::Control(control),
                _ = sleep_until(self.deadline) => Step::Expired(EndReason::Time),
                _ = sleep_until(self.idle_deadline) => Step::Expired(EndReason::Idle),
                received = recv(&mut self.source) => Step::Source(received),
            };

            match step {
                Step::Control(Control::Stop(reason)) => break reason,
                Step::Control(Control::ResetTimer { time, idle }) => self.reset_timer(time, idle),
                Step::Expired(reason) => break reason,
                Step::Source(Ok(notification)) => {
                    if let Some(reason) = self.process(&notification) {
                        break reason;
                    }
                }
                Step::Source(Err(RecvError::Lagged(skipped))) => {
                    warn!(skipped, "Collector lagged behind the notification bus");
                }
                Step::Source(Err(RecvError::Closed)) => break EndReason::SourceClosed,
            }
        };
        self.finish(reason)
    }

    fn reset_timer(&mut self, time: Option<Duration>, idle: Option<Duration>) {
        let now = Instant::now();
        if let Some(time) = time.or(self.options.time) {
            self.deadline = deadline_after(now, time);
        }
        if let Some(idle) = idle.or(self.options.idle) {
            self.idle_deadline = deadline_after(now, idle);
        }
    }

    fn accepts(&self, item: &H::Item) -> bool {
        let state = self.state.read_recursive();
        (self.options.filter)(item, &state.collected)
    }

    fn process(&mut self, notification: &Notification) -> Option<EndReason> {
        let steps = {
            let state = self.state.read();
            self.handler.handle(notification, &state.collected)
        };
        if steps.is_empty() {
            return None;
        }

        for step in steps {
            match step {
                Handled::Collect { key, value, item } => {
                    self.state.write().received += 1;
                    if !self.accepts(&item) {
                        continue;
                    }
                    self.state.write().collected.insert(key.clone(), value.clone());
                    self.handler.on_collect(&item);
                    debug!(key = ?key, "Collected");
                    let _ = self.events.send(CollectorEvent::Collect { key, value, item });
                    if let Some(idle) = self.options.idle {
                        self.idle_deadline = deadline_after(Instant::now(), idle);
                    }
                }
                Handled::Remove { item, dispose, notify } => {
                    if !self.options.dispose {
                        continue;
                    }
                    if notify {
                        self.handler.on_remove(&item);
                        let _ = self.events.send(CollectorEvent::Remove { item: item.clone() });
                    }
                    let Some(key) = dispose else {
                        continue;
                    };
                    if !self.accepts(&item) {
                        continue;
                    }
                    let removed = self.state.write().collected.shift_remove(&key);
                    if let Some(value) = removed {
                        debug!(key = ?key, "Disposed");
                        let _ = self.events.send(CollectorEvent::Dispose { key, value, item });
                    }
                }
                Handled::Empty => {
                    self.state.write().collected.clear();
                    self.handler.on_empty();
                    let _ = self.events.send(CollectorEvent::Empty);
                }
                Handled::End(reason) => return Some(reason),
            }
        }

        let state = self.state.read();
        self.handler.post_check(&state.collected, state.received)
    }

    fn finish(&mut self, reason: EndReason) -> Final<H> {
        self.finished = true;
        self.deadline = None;
        self.idle_deadline = None;
        self.handler.cleanup();
        // Dropping the receiver detaches from the bus.
        self.source = None;

        let collected = {
            let mut state = self.state.write();
            state.ended = true;
            state.collected.clone()
        };
        info!(reason = %reason, collected = collected.len(), "Collector ended");

        let outcome = Outcome { collected, reason };
        let _ = self.events.send(CollectorEvent::End {
            collected: outcome.collected.clone(),
            reason: outcome.reason.clone(),
        });
        self.outcome.send_replace(Some(outcome.clone()));
        outcome
    }
}

impl<H: CollectorHandler> Drop for Collector<H> {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(EndReason::SourceClosed);
        }
    }
}

/// A deadline too far out to represent never fires.
fn deadline_after(now: Instant, duration: Duration) -> Option<Instant> {
    now.checked_add(duration)
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn recv(source: &mut Option<broadcast::Receiver<Arc<Notification>>>) -> Result<Arc<Notification>, RecvError> {
    match source {
        Some(source) => source.recv().await,
        None => Err(RecvError::Closed),
    }
}

/// Cheap, cloneable access to a running collector.
pub struct CollectorHandle<H: CollectorHandler> {
    control: mpsc::UnboundedSender<Control>,
    state: Arc<RwLock<State<H::Key, H::Value>>>,
    events: broadcast::Sender<Events<H>>,
    outcome: watch::Receiver<Option<Final<H>>>,
}

impl<H: CollectorHandler> Clone for CollectorHandle<H> {
    fn clone(&self) -> Self {
        Self {
            control: self.control.clone(),
            state: Arc::clone(&self.state),
            events: self.events.clone(),
            outcome: self.outcome.clone(),
        }
    }
}

impl<H: CollectorHandler> fmt::Debug for CollectorHandle<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read_recursive();
        f.debug_struct("CollectorHandle")
            .field("collected", &state.collected.len())
            .field("received", &state.received)
            .field("ended", &state.ended)
            .finish()
    }
}

impl<H: CollectorHandler> CollectorHandle<H> {
    /// Stop with reason `user`. Does nothing once ended.
    pub fn stop(&self) {
        self.stop_with(EndReason::User);
    }

    /// Stop with a custom reason. Never blocks, so it is safe to call from a
    /// filter.
    pub fn stop_with(&self, reason: impl Into<EndReason>) {
        if self.is_ended() {
            return;
        }
        let _ = self.control.send(Control::Stop(reason.into()));
    }

    /// Restart the timers; `None` reuses the configured duration.
    pub fn reset_timer(&self, time: Option<Duration>, idle: Option<Duration>) {
        let _ = self.control.send(Control::ResetTimer { time, idle });
    }

    pub fn is_ended(&self) -> bool {
        self.state.read_recursive().ended
    }

    pub fn collected(&self) -> Collection<H::Key, H::Value> {
        self.state.read_recursive().collected.clone()
    }

    /// How many events were recognized, whether or not the filter let them through.
    pub fn received(&self) -> usize {
        self.state.read_recursive().received
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.outcome.borrow().as_ref().map(|outcome| outcome.reason.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Events<H>> {
        self.events.subscribe()
    }

    /// Wait for the next collected value.
    ///
    /// Fails with the full accumulation when the collector ends first.
    pub async fn next(&self) -> Result<H::Value, CollectorEnded<H::Key, H::Value>> {
        let mut events = self.events.subscribe();
        if self.is_ended() {
            return Err(self.ended_error());
        }
        loop {
            match events.recv().await {
                Ok(CollectorEvent::Collect { value, .. }) => return Ok(value),
                Ok(CollectorEvent::End { collected, reason }) => return Err(CollectorEnded { collected, reason }),
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return Err(self.ended_error()),
            }
        }
    }

    /// Wait for the collector to end.
    pub async fn ended(&self) -> Final<H> {
        let mut outcome = self.outcome.clone();
        let finished = match outcome.wait_for(Option::is_some).await {
            Ok(value) => (*value).clone(),
            Err(_) => None,
        };
        finished.unwrap_or_else(|| Outcome {
            collected: self.collected(),
            reason: EndReason::SourceClosed,
        })
    }

    fn ended_error(&self) -> CollectorEnded<H::Key, H::Value> {
        let current = self.outcome.borrow().clone();
        match current {
            Some(Outcome { collected, reason }) => CollectorEnded { collected, reason },
            None => CollectorEnded {
                collected: self.collected(),
                reason: EndReason::SourceClosed,
            },
        }
    }
}
