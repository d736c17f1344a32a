use std::sync::{Arc, Mutex};

use procrelay::event::{RunEvent, TerminalEvent};
use procrelay::exec::EventSink;
use procrelay::types::Channel;

/// A sink that records every event in submission order.
///
/// Clones share the same buffer, so a test keeps one clone and hands the
/// other to the runner.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<RunEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Text of all line events on `channel`, in order.
    pub fn lines(&self, channel: Channel) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|ev| match ev {
                RunEvent::Line(line) if line.channel == channel => Some(line.text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn terminals(&self) -> Vec<TerminalEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|ev| match ev {
                RunEvent::Terminal(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn submit(&self, event: RunEvent) {
        self.events.lock().unwrap().push(event);
    }
}
