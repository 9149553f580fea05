//! Progress reporting for long-running ingestion operations.
//!
//! Ingestion (parsing, batched inserts) can take minutes for a full-size
//! WordNet distribution. Rather than a plain callback, progress flows over a
//! bounded `tokio::sync::mpsc` channel: the ingestion side never blocks on a
//! slow or absent consumer for long, and a caller that doesn't care about
//! progress can simply drop the receiver.

use tokio::sync::mpsc;

/// A snapshot of progress during a long-running operation.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Description of the current stage (e.g. "Pass 1/3: Inserting Lexicons").
    pub stage_description: String,
    /// Number of items processed in the current stage.
    pub current_item: u64,
    /// Total number of items expected in the current stage, if calculable.
    pub total_items: Option<u64>,
    /// Optional free-form context (e.g. "Lexicon: oewn").
    pub message: Option<String>,
}

impl ProgressUpdate {
    pub fn new(
        stage_description: String,
        current_item: u64,
        total_items: Option<u64>,
        message: Option<String>,
    ) -> Self {
        ProgressUpdate {
            stage_description,
            current_item,
            total_items,
            message,
        }
    }

    /// Creates a progress update for the start of a stage.
    pub fn new_stage(description: String, total_items: Option<u64>) -> Self {
        ProgressUpdate {
            stage_description: description,
            current_item: 0,
            total_items,
            message: None,
        }
    }

    /// Fraction of completion in `[0, 1]`, or `None` if the total is unknown.
    pub fn fraction(&self) -> Option<f64> {
        self.total_items.map(|total| {
            if total == 0 {
                1.0
            } else {
                (self.current_item as f64 / total as f64).min(1.0)
            }
        })
    }
}

/// Sending half of a progress channel. Cheap to clone; each clone shares the
/// same bounded channel.
#[derive(Clone)]
pub struct ProgressReporter {
    tx: mpsc::Sender<ProgressUpdate>,
}

/// Creates a bounded progress channel. `capacity` bounds how many unconsumed
/// updates may queue before the non-blocking reporter starts dropping them.
pub fn create_progress_channel(
    capacity: usize,
) -> (ProgressReporter, mpsc::Receiver<ProgressUpdate>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ProgressReporter { tx }, rx)
}

/// Sends an update without blocking. If the channel is full (a slow or
/// absent consumer), the update is silently dropped — progress reporting
/// must never slow down ingestion.
pub fn report_progress_non_blocking(reporter: &ProgressReporter, update: ProgressUpdate) {
    let _ = reporter.tx.try_send(update);
}

/// Sends an update, awaiting capacity if the channel is momentarily full.
pub async fn report_progress_async(reporter: &ProgressReporter, update: ProgressUpdate) {
    let _ = reporter.tx.send(update).await;
}
