//! Step progress events for the presentation layer.
//!
//! The runner can be wired with a flume channel
//! ([`crate::runner::PipelineRunner::with_event_channel`]); every step start,
//! finish, suspension, and failure is published as a [`RunEvent`] so a
//! dashboard can render progress without polling run state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::StepKind;

/// One progress notification from a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    pub run_id: String,
    /// Superstep counter within the run (1-based).
    pub step_number: u64,
    /// The step this event concerns, if any (suspension/completion events
    /// carry `None`).
    pub step: Option<StepKind>,
    pub message: String,
    pub when: DateTime<Utc>,
}

impl RunEvent {
    pub(crate) fn new(
        run_id: impl Into<String>,
        step_number: u64,
        step: Option<StepKind>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            step_number,
            step,
            message: message.into(),
            when: Utc::now(),
        }
    }
}

/// Cloneable emitter handed to steps via their context.
///
/// Emission is best-effort: a missing or disconnected receiver is not an
/// error, so a run never fails because nobody is watching it.
#[derive(Clone, Debug, Default)]
pub struct EventEmitter {
    sender: Option<flume::Sender<RunEvent>>,
}

impl EventEmitter {
    /// An emitter that discards everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// An emitter paired with a receiver for the caller to consume.
    #[must_use]
    pub fn channel() -> (Self, flume::Receiver<RunEvent>) {
        let (tx, rx) = flume::unbounded();
        (Self { sender: Some(tx) }, rx)
    }

    pub fn emit(&self, event: RunEvent) {
        if let Some(sender) = &self.sender {
            if sender.send(event).is_err() {
                tracing::trace!("event receiver dropped; emission skipped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnected_receiver_is_not_an_error() {
        let (emitter, rx) = EventEmitter::channel();
        drop(rx);
        emitter.emit(RunEvent::new("run", 1, Some(StepKind::Validate), "start"));
    }

    #[test]
    fn events_arrive_in_order() {
        let (emitter, rx) = EventEmitter::channel();
        emitter.emit(RunEvent::new("run", 1, Some(StepKind::Validate), "start"));
        emitter.emit(RunEvent::new("run", 1, Some(StepKind::Validate), "done"));
        let first = rx.recv().unwrap();
        let second = rx.recv().unwrap();
        assert_eq!(first.message, "start");
        assert_eq!(second.message, "done");
    }
}
