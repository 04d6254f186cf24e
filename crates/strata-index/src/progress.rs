//! Extraction progress side channel.

use std::sync::mpsc::Sender;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A batch of `total` files is about to be extracted.
    Started { total: usize },
    /// One file finished (extracted or skipped). `current` counts completed
    /// files, so events may arrive out of path order.
    File {
        current: usize,
        total: usize,
        path: String,
    },
    Finished { extracted: usize, skipped: usize },
}

/// Optional progress channel.
///
/// Sending never blocks (the channel is unbounded) and a receiver that has
/// gone away is ignored, so attaching a sink cannot change any result.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    sender: Option<Sender<ProgressEvent>>,
}

impl ProgressSink {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn channel(sender: Sender<ProgressEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}
