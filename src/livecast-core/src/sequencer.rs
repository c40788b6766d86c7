//! Sequential chunk delivery with live commentary interleaving.
//!
//! The sequencer speaks one chunk at a time. After every script chunk it
//! drains pending comments and splices the resulting commentary directly
//! after the current position, so viewers hear answers between script
//! beats instead of at the end.

use std::collections::VecDeque;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::acknowledger::{AckSummary, Acknowledger};
use crate::batcher::{CommentBatcher, CommentaryBatch};
use crate::chunk::{Chunk, ChunkOrigin};
use crate::error::LivecastError;
use crate::presenter::Presenter;

/// Events emitted while a script is being delivered.
#[derive(Debug, Clone)]
pub enum SequencerEvent {
    /// A chunk is being handed to the presenter.
    ChunkStarted(Chunk),
    /// The presenter finished a chunk.
    ChunkDelivered(Chunk),
    /// A script chunk finished; pending comments are being drained.
    Draining,
    /// Commentary was spliced in after the current script chunk.
    CommentaryQueued { chunks: usize, comments: usize },
    /// The commentary window closed: the batch was spoken, or there was none.
    CommentaryFinished,
}

/// Callback for sequencer events.
pub type SequencerCallback = Box<dyn Fn(SequencerEvent) + Send + Sync>;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

/// Summary of one pass over a script.
#[derive(Debug, Clone)]
pub struct SequenceReport {
    /// Every chunk the presenter finished, in spoken order.
    pub delivered: Vec<Chunk>,
    pub commentary_delivered: usize,
    /// Acknowledgment requests issued.
    pub acks_issued: usize,
    pub outcome: RunOutcome,
}

impl SequenceReport {
    fn new() -> Self {
        Self {
            delivered: Vec::new(),
            commentary_delivered: 0,
            acks_issued: 0,
            outcome: RunOutcome::Completed,
        }
    }
}

#[derive(Debug)]
struct Delivery {
    chunk: Chunk,
    /// Comment ids to acknowledge once this chunk has been spoken.
    ack_ids: Vec<String>,
}

/// Chunks still to be spoken. The front is the cursor.
#[derive(Debug, Default)]
pub struct DeliveryQueue {
    pending: VecDeque<Delivery>,
}

impl DeliveryQueue {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self {
            pending: chunks
                .into_iter()
                .map(|chunk| Delivery {
                    chunk,
                    ack_ids: Vec::new(),
                })
                .collect(),
        }
    }

    fn pop_next(&mut self) -> Option<Delivery> {
        self.pending.pop_front()
    }

    /// Insert a batch's commentary at the cursor, keeping its order.
    /// The batch's ack ids ride on its last chunk.
    fn splice_next(&mut self, batch: CommentaryBatch) {
        let count = batch.result_chunks.len();
        let mut ack_ids = Some(batch.ack_ids);

        let deliveries: Vec<Delivery> = batch
            .result_chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| Delivery {
                chunk,
                ack_ids: if i + 1 == count {
                    ack_ids.take().unwrap_or_default()
                } else {
                    Vec::new()
                },
            })
            .collect();

        for delivery in deliveries.into_iter().rev() {
            self.pending.push_front(delivery);
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Texts still queued, front first.
    pub fn texts(&self) -> Vec<&str> {
        self.pending.iter().map(|d| d.chunk.text()).collect()
    }
}

/// Drives strictly sequential delivery of one script.
pub struct SpeechSequencer {
    batcher: CommentBatcher,
    acknowledger: Acknowledger,
    cancel: CancellationToken,
    callback: Option<SequencerCallback>,
}

impl SpeechSequencer {
    pub fn new(batcher: CommentBatcher, acknowledger: Acknowledger) -> Self {
        Self {
            batcher,
            acknowledger,
            cancel: CancellationToken::new(),
            callback: None,
        }
    }

    /// Stop when this token is cancelled.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Set a callback for sequencer events.
    pub fn with_callback(mut self, callback: SequencerCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn set_callback(&mut self, callback: SequencerCallback) {
        self.callback = Some(callback);
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Speak every script chunk in order, interleaving commentary.
    ///
    /// A presenter failure ends the run with [`LivecastError::DeliveryFailed`];
    /// nothing is spoken after it.
    pub async fn run(
        &self,
        script_chunks: Vec<Chunk>,
        presenter: &dyn Presenter,
    ) -> Result<SequenceReport, LivecastError> {
        let mut queue = DeliveryQueue::new(script_chunks);
        let mut report = SequenceReport::new();
        let mut pending_acks: Vec<JoinHandle<AckSummary>> = Vec::new();

        info!(chunks = queue.len(), "starting script delivery");

        while let Some(delivery) = queue.pop_next() {
            if self.cancel.is_cancelled() {
                report.outcome = RunOutcome::Cancelled;
                break;
            }

            let Delivery { chunk, ack_ids } = delivery;
            self.emit_event(SequencerEvent::ChunkStarted(chunk.clone()));
            debug!(origin = chunk.origin().display_name(), words = chunk.word_count(), "speaking chunk");

            let spoken = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                result = presenter.speak(chunk.text()) => Some(result),
            };

            match spoken {
                None => {
                    // Abandoned mid-utterance; the chunk does not count as delivered.
                    report.outcome = RunOutcome::Cancelled;
                    break;
                }
                Some(Err(e)) => {
                    return Err(LivecastError::DeliveryFailed {
                        chunk,
                        reason: e.to_string(),
                    });
                }
                Some(Ok(())) => {}
            }

            if chunk.is_commentary() {
                report.commentary_delivered += 1;
            }
            report.delivered.push(chunk.clone());
            self.emit_event(SequencerEvent::ChunkDelivered(chunk.clone()));

            if !ack_ids.is_empty() {
                // Drains after this one must not answer these again, even
                // while their acknowledgments are still in flight.
                self.batcher.mark_answered(&ack_ids);
                report.acks_issued += ack_ids.len();
                pending_acks.push(self.acknowledger.ack_all(ack_ids));
                self.emit_event(SequencerEvent::CommentaryFinished);
            }

            if chunk.origin() == ChunkOrigin::Script {
                self.emit_event(SequencerEvent::Draining);
                let batch = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => None,
                    batch = self.batcher.drain() => Some(batch),
                };

                match batch {
                    None => {
                        report.outcome = RunOutcome::Cancelled;
                        break;
                    }
                    Some(batch) if !batch.is_empty() => {
                        info!(
                            chunks = batch.result_chunks.len(),
                            comments = batch.source_comments.len(),
                            "interleaving commentary"
                        );
                        self.emit_event(SequencerEvent::CommentaryQueued {
                            chunks: batch.result_chunks.len(),
                            comments: batch.source_comments.len(),
                        });
                        queue.splice_next(batch);
                    }
                    Some(_) => self.emit_event(SequencerEvent::CommentaryFinished),
                }
            }
        }

        if report.outcome == RunOutcome::Completed {
            for handle in pending_acks {
                if let Err(e) = handle.await {
                    debug!(error = %e, "acknowledgment task did not finish");
                }
            }
        }

        info!(
            delivered = report.delivered.len(),
            commentary = report.commentary_delivered,
            outcome = ?report.outcome,
            "script delivery finished"
        );
        Ok(report)
    }

    /// Emit an event if a callback is registered.
    fn emit_event(&self, event: SequencerEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }
}
