// src/exec/relay.rs

//! Stream relays: one per child output channel.

use std::collections::VecDeque;

use tokio::io::AsyncRead;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, warn};

use crate::errors::RelayError;
use crate::event::RunEvent;
use crate::exec::line_reader::LineReader;
use crate::exec::sink::SharedSink;
use crate::types::Channel;

/// What a relay reports back to the completion monitor once it is done.
#[derive(Debug, Clone, Default)]
pub struct RelayReport {
    /// Number of line events submitted.
    pub lines: u64,
    /// The most recent lines, oldest first.
    pub tail: Vec<String>,
    /// Text of the read error that ended the relay, if any.
    pub read_error: Option<String>,
    /// True if the relay was told to stop before reaching end-of-stream.
    pub stopped: bool,
}

/// Handle to a running relay.
///
/// `stop` asks the relay to drop its stream; it is only used once the child
/// is already dead and the drain grace period has run out.
pub struct RelayHandle {
    pub channel: Channel,
    pub(crate) stop: Option<oneshot::Sender<()>>,
    pub(crate) join: JoinHandle<RelayReport>,
}

impl RelayHandle {
    /// Ask the relay to stop reading. No-op if it already finished.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the relay task and return its report.
    pub async fn join(self) -> RelayReport {
        let channel = self.channel;
        match self.join.await {
            Ok(report) => report,
            Err(e) => {
                warn!(%channel, error = %e, "relay task did not complete cleanly");
                RelayReport {
                    read_error: Some(e.to_string()),
                    ..RelayReport::default()
                }
            }
        }
    }
}

/// Spawn a relay that drains `stream` line by line into `sink`.
///
/// Every line is submitted as a [`RunEvent::Line`] tagged with `channel`, in
/// the order it was read. A read error is submitted as a
/// [`RunEvent::Diagnostic`] and ends this relay only.
pub fn spawn_relay<R>(
    channel: Channel,
    stream: R,
    sink: SharedSink,
    tail_capacity: usize,
) -> RelayHandle
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let join = tokio::spawn(
        relay_loop(channel, stream, sink, tail_capacity, stop_rx).in_current_span(),
    );
    RelayHandle {
        channel,
        stop: Some(stop_tx),
        join,
    }
}

async fn relay_loop<R>(
    channel: Channel,
    stream: R,
    sink: SharedSink,
    tail_capacity: usize,
    mut stop_rx: oneshot::Receiver<()>,
) -> RelayReport
where
    R: AsyncRead + Unpin,
{
    let mut reader = LineReader::new(stream);
    let mut tail: VecDeque<String> = VecDeque::with_capacity(tail_capacity);
    let mut report = RelayReport::default();
    let mut listening = true;

    loop {
        let next = tokio::select! {
            biased;

            res = &mut stop_rx, if listening => {
                match res {
                    Ok(()) => {
                        debug!(%channel, "relay asked to stop before end-of-stream");
                        report.stopped = true;
                        break;
                    }
                    // Handle dropped without asking us to stop.
                    Err(_) => {
                        listening = false;
                        continue;
                    }
                }
            }

            next = reader.next_line() => next,
        };

        match next {
            Ok(Some(line)) => {
                if tail_capacity > 0 {
                    if tail.len() == tail_capacity {
                        tail.pop_front();
                    }
                    tail.push_back(line.clone());
                }
                report.lines += 1;
                sink.submit(RunEvent::line(channel, line));
            }
            Ok(None) => break,
            Err(source) => {
                let err = RelayError::Read { channel, source };
                warn!(%channel, error = %err, "stream read failed; relay stopping");
                let message = err.to_string();
                sink.submit(RunEvent::Diagnostic {
                    channel,
                    message: message.clone(),
                });
                report.read_error = Some(message);
                break;
            }
        }
    }

    debug!(%channel, lines = report.lines, "relay finished");
    report.tail = tail.into_iter().collect();
    report
}
