//! `OutputSink` implementations.

use tilewall_common::ComponentKind;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::application::ports::OutputSink;

/// One chunk of component output.
pub type OutputEvent = (ComponentKind, String);

/// Forwards output chunks from reader threads to an async consumer.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<OutputEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver that drains it.
    #[must_use]
    pub fn channel() -> (Self, UnboundedReceiver<OutputEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }
}

impl OutputSink for ChannelSink {
    fn deliver(&self, kind: ComponentKind, text: &str) {
        // A closed receiver means the front end is shutting down.
        if self.tx.send((kind, text.to_string())).is_err() {
            tracing::trace!(%kind, "output receiver closed, dropping chunk");
        }
    }
}

/// Discards all output. Used by commands that never display it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

impl OutputSink for DiscardSink {
    fn deliver(&self, _kind: ComponentKind, _text: &str) {}
}
