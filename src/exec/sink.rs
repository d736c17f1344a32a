// src/exec/sink.rs

//! Outward delivery of run events.
//!
//! Relays and the completion monitor only ever call [`EventSink::submit`],
//! which must return immediately. [`ChannelSink`] is the default: an
//! unbounded Tokio mpsc queue, so a slow consumer never stalls a relay, and
//! each producer's events stay in the order it submitted them.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::trace;

use crate::event::RunEvent;

/// Consumer-facing boundary for run events.
///
/// Implementations must be safe to call concurrently from both relays and
/// the monitor, and must not block.
pub trait EventSink: Send + Sync {
    fn submit(&self, event: RunEvent);
}

/// The form in which relays and the monitor share one sink.
pub type SharedSink = Arc<dyn EventSink>;

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn submit(&self, event: RunEvent) {
        (**self).submit(event)
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn submit(&self, event: RunEvent) {
        (**self).submit(event)
    }
}

/// Sink backed by a closure, e.g. to forward events into a UI event bus.
pub struct FnSink<F>(pub F);

impl<F> EventSink for FnSink<F>
where
    F: Fn(RunEvent) + Send + Sync,
{
    fn submit(&self, event: RunEvent) {
        (self.0)(event)
    }
}

/// Sender half of an event queue; see [`event_channel`].
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl EventSink for ChannelSink {
    fn submit(&self, event: RunEvent) {
        // A dropped receiver only means nobody is listening any more.
        if self.tx.send(event).is_err() {
            trace!("event stream receiver dropped; discarding event");
        }
    }
}

/// Receiver half of an event queue.
///
/// Yields events in submission order and ends right after the terminal
/// event, even if senders are still alive.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<RunEvent>,
    finished: bool,
}

impl EventStream {
    pub async fn recv(&mut self) -> Option<RunEvent> {
        if self.finished {
            return None;
        }
        let event = self.rx.recv().await?;
        if event.is_terminal() {
            self.finished = true;
        }
        Some(event)
    }

    /// Drain the stream up to and including the terminal event.
    pub async fn collect(mut self) -> Vec<RunEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.recv().await {
            events.push(event);
        }
        events
    }
}

/// Create a connected sink/stream pair.
pub fn event_channel() -> (ChannelSink, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ChannelSink { tx },
        EventStream {
            rx,
            finished: false,
        },
    )
}
