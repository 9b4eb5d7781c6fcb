//! # Progress Channel
//!
//! Ordered, append-only event sequence for one run. Events are pushed to an
//! optional subscriber and kept in a local history. The channel is consumed
//! by [`ProgressChannel::close`], so it can only be closed once.

use thiserror::Error;
use tokio::sync::mpsc;

use super::events::{Progress, ProgressEvent};

/// The subscriber went away; the run should be cancelled
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("progress subscriber disconnected")]
pub struct Disconnected;

pub struct ProgressChannel {
    tx: Option<mpsc::Sender<ProgressEvent>>,
    history: Vec<ProgressEvent>,
    last_progress: Progress,
}

impl ProgressChannel {
    /// Channel with no subscriber; events only land in the history
    pub fn detached() -> Self {
        Self {
            tx: None,
            history: Vec::new(),
            last_progress: Progress::default(),
        }
    }

    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self {
            tx: Some(tx),
            ..Self::detached()
        }
    }

    /// Create a channel together with its subscriber end
    pub fn open(buffer: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(tx), rx)
    }

    pub fn last_progress(&self) -> Progress {
        self.last_progress
    }

    pub fn history(&self) -> &[ProgressEvent] {
        &self.history
    }

    /// Append a non-terminal event
    ///
    /// Progress never drops below the last emitted value.
    pub async fn emit(&mut self, mut event: ProgressEvent) -> Result<(), Disconnected> {
        event.progress = event.progress.max(self.last_progress);
        self.last_progress = event.progress;
        self.history.push(event.clone());

        if let Some(tx) = &self.tx {
            tx.send(event).await.map_err(|_| Disconnected)?;
        }
        Ok(())
    }

    /// Resolves once the subscriber has gone away. Never resolves when
    /// detached.
    pub async fn cancelled(&self) {
        match &self.tx {
            Some(tx) => tx.closed().await,
            None => std::future::pending().await,
        }
    }

    /// Emit the terminal event and close the channel. Returns the full
    /// history, terminal event included.
    pub async fn close(mut self, mut terminal: ProgressEvent) -> Vec<ProgressEvent> {
        debug_assert!(terminal.is_terminal());
        terminal.progress = terminal.progress.max(self.last_progress);
        self.history.push(terminal.clone());

        if let Some(tx) = self.tx.take() {
            if tx.send(terminal).await.is_err() {
                tracing::debug!("Subscriber left before the terminal event");
            }
        }
        self.history
    }

    /// Drop the subscriber without a terminal event (cancelled runs)
    pub fn abandon(self) -> Vec<ProgressEvent> {
        self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineStage;

    #[tokio::test]
    async fn test_progress_never_regresses() {
        let mut channel = ProgressChannel::detached();
        channel
            .emit(ProgressEvent::new(PipelineStage::ResearchingKnowledge, "b", 45.0))
            .await
            .unwrap();
        channel
            .emit(ProgressEvent::new(PipelineStage::ResearchingKnowledge, "a", 40.0))
            .await
            .unwrap();

        let history = channel.close(ProgressEvent::new(PipelineStage::Failed, "boom", 0.0)).await;
        let values: Vec<f64> = history.iter().map(|e| e.progress.value()).collect();
        assert_eq!(values, vec![45.0, 45.0, 45.0]);
    }

    #[tokio::test]
    async fn test_close_delivers_terminal_and_ends_stream() {
        let (mut channel, mut rx) = ProgressChannel::open(8);
        channel
            .emit(ProgressEvent::new(PipelineStage::Initializing, "start", 5.0))
            .await
            .unwrap();
        channel
            .close(ProgressEvent::new(PipelineStage::Completed, "done", 100.0))
            .await;

        assert_eq!(rx.recv().await.unwrap().step, PipelineStage::Initializing);
        assert_eq!(rx.recv().await.unwrap().step, PipelineStage::Completed);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_emit_after_receiver_drop_reports_disconnect() {
        let (mut channel, rx) = ProgressChannel::open(8);
        drop(rx);

        channel.cancelled().await;
        let result = channel
            .emit(ProgressEvent::new(PipelineStage::Initializing, "start", 5.0))
            .await;
        assert_eq!(result, Err(Disconnected));
    }
}
