//! Best-effort comment acknowledgment.

use std::sync::Arc;

use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::comments::CommentSource;

/// Outcome of one acknowledgment round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AckSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Marks consumed comments as handled. Failures are logged and dropped.
#[derive(Clone)]
pub struct Acknowledger {
    source: Arc<dyn CommentSource>,
}

impl Acknowledger {
    pub fn new(source: Arc<dyn CommentSource>) -> Self {
        Self { source }
    }

    /// Acknowledge one comment. Returns whether the service accepted it.
    pub async fn ack(&self, comment_id: &str) -> bool {
        ack_one(self.source.as_ref(), comment_id).await
    }

    /// Acknowledge every id concurrently on a background task.
    ///
    /// The caller may await the handle or drop it; nothing is retried.
    pub fn ack_all(&self, comment_ids: Vec<String>) -> JoinHandle<AckSummary> {
        let source = Arc::clone(&self.source);

        tokio::spawn(async move {
            let mut set = JoinSet::new();
            for comment_id in comment_ids {
                let source = Arc::clone(&source);
                set.spawn(async move { ack_one(source.as_ref(), &comment_id).await });
            }

            let mut summary = AckSummary::default();
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(true) => summary.succeeded += 1,
                    Ok(false) => summary.failed += 1,
                    Err(e) => {
                        warn!(error = %e, "acknowledgment task aborted");
                        summary.failed += 1;
                    }
                }
            }
            summary
        })
    }
}

async fn ack_one(source: &dyn CommentSource, comment_id: &str) -> bool {
    match source.acknowledge(comment_id).await {
        Ok(()) => {
            debug!(comment_id, "acknowledged comment");
            true
        }
        Err(e) => {
            warn!(comment_id, error = %e, "failed to acknowledge comment");
            false
        }
    }
}
