//! Channel-backed progress provider

use cashier_core::progress::{ProgressProvider, ProgressUpdate};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// Channel-based progress provider for CLI rendering
///
/// Updates go through an unbounded channel to a separate rendering task, so
/// a slow terminal never drops a record's before/after lines.
pub struct ChannelProvider {
    tx: Mutex<Option<mpsc::UnboundedSender<ProgressUpdate>>>,
}

impl ChannelProvider {
    pub fn new(tx: mpsc::UnboundedSender<ProgressUpdate>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }
}

impl ProgressProvider for ChannelProvider {
    fn report(&self, update: ProgressUpdate) {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = guard.as_ref() {
            // Receiver gone means nobody is rendering
            let _ = tx.send(update);
        }
    }

    fn complete(&self) {
        // Drop our sender so the renderer can exit its loop
        let mut guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }
}

/// Create a progress provider and the receiving end for its renderer
pub fn create_progress_infrastructure() -> (
    Arc<dyn ProgressProvider>,
    mpsc::UnboundedReceiver<ProgressUpdate>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let provider = Arc::new(ChannelProvider::new(tx)) as Arc<dyn ProgressProvider>;
    (provider, rx)
}
