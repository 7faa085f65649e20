//! Console rendering of reconciliation progress

use cashier_core::progress::ProgressUpdate;
use colored::*;
use std::io::Write;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Render progress updates from a channel until every sender is gone
pub async fn render_progress<W: Write>(
    mut rx: mpsc::UnboundedReceiver<ProgressUpdate>,
    writer: W,
) -> W {
    let mut renderer = ProgressRenderer::new(writer);

    while let Some(update) = rx.recv().await {
        renderer.handle_update(update);
    }

    renderer.finish()
}

/// Wait for a renderer task, handing back its writer
///
/// A renderer that panicked or was cancelled is logged and yields `None`.
pub async fn join_renderer<W>(handle: JoinHandle<W>) -> Option<W> {
    match handle.await {
        Ok(writer) => Some(writer),
        Err(e) => {
            log::warn!("Progress renderer stopped abnormally: {e}");
            None
        }
    }
}

/// Writes one line per progress event
///
/// ```text
/// Processing chunk #1 / 3
///     Processing subscription #sub_123
///         Status before update = ''
///         Status after update = 'active'
/// ```
pub struct ProgressRenderer<W: Write> {
    writer: W,
}

impl<W: Write> ProgressRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn handle_update(&mut self, update: ProgressUpdate) {
        let result = match update {
            ProgressUpdate::BatchStarted { index, total } => {
                writeln!(self.writer, "Processing chunk #{index} / {total}")
            }
            ProgressUpdate::RecordStarted { stripe_id, status } => writeln!(
                self.writer,
                "    Processing subscription #{stripe_id}\n        Status before update = '{status}'"
            ),
            ProgressUpdate::RecordFinished { status, .. } => {
                writeln!(self.writer, "        Status after update = '{status}'")
            }
            ProgressUpdate::RecordFailed { stripe_id, message } => writeln!(
                self.writer,
                "        {} #{stripe_id}: {message}",
                "Skipped".red()
            ),
        };

        if let Err(e) = result {
            log::debug!("Failed to write progress line: {e}");
        }
    }

    /// Flush and hand back the writer
    pub fn finish(mut self) -> W {
        let _ = self.writer.flush();
        self.writer
    }
}
