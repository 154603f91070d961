use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Event emitted by the updater for each downloaded chunk.
pub const UPDATE_DOWNLOAD_PROGRESS: &str = "update-download-progress";

/// Payload of [`UPDATE_DOWNLOAD_PROGRESS`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    /// Fraction downloaded, 0 to 1.
    pub progress: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressBar {
    progress: Option<f64>,
}

/// What the window draws for one state of the bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressFrame {
    /// Text in the middle of the bar, e.g. `50%`.
    pub label: String,
    /// CSS width of the filled part, e.g. `50%`.
    pub width: String,
}

impl ProgressBar {
    /// Takes the new value, clamped to [0, 1]. NaN is ignored.
    pub fn apply(&mut self, event: DownloadProgress) {
        if event.progress.is_nan() {
            warn!("Ignoring NaN download progress");
            return;
        }
        self.progress = Some(event.progress.clamp(0.0, 1.0));
    }

    pub fn progress(&self) -> Option<f64> {
        self.progress
    }

    pub fn percent(&self) -> u32 {
        (self.progress.unwrap_or(0.0) * 100.0).round() as u32
    }

    pub fn label(&self) -> String {
        format!("{}%", self.percent())
    }

    pub fn bar_width(&self) -> String {
        format!("{}%", self.progress.unwrap_or(0.0) * 100.0)
    }

    pub fn frame(&self) -> ProgressFrame {
        ProgressFrame {
            label: self.label(),
            width: self.bar_width(),
        }
    }
}

/// Sending half, held by whatever reports download progress.
#[derive(Debug, Clone)]
pub struct ProgressEmitter {
    tx: mpsc::UnboundedSender<DownloadProgress>,
}

impl ProgressEmitter {
    pub fn emit(&self, event: DownloadProgress) {
        if self.tx.send(event).is_err() {
            debug!("Update progress window closed, dropping event");
        }
    }

    /// Emits a raw event payload such as `{"progress":0.5}`.
    pub fn emit_json(&self, payload: &str) -> Result<(), serde_json::Error> {
        let event: DownloadProgress = serde_json::from_str(payload)?;
        self.emit(event);
        Ok(())
    }
}

/// The single subscriber of a progress channel. Every emitted event is
/// queued and produces its own frame. Dropping the window unsubscribes.
#[derive(Debug)]
pub struct UpdateProgressWindow {
    bar: ProgressBar,
    rx: mpsc::UnboundedReceiver<DownloadProgress>,
}

impl UpdateProgressWindow {
    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }

    /// Waits for the next event and returns the redrawn frame, or `None` once
    /// every emitter is gone and the queue is drained.
    pub async fn next_frame(&mut self) -> Option<ProgressFrame> {
        let event = self.rx.recv().await?;
        self.bar.apply(event);
        debug!(progress = ?self.bar.progress(), "Update progress redrawn");
        Some(self.bar.frame())
    }
}

pub fn progress_channel() -> (ProgressEmitter, UpdateProgressWindow) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ProgressEmitter { tx },
        UpdateProgressWindow {
            bar: ProgressBar::default(),
            rx,
        },
    )
}
