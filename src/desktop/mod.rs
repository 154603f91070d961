//! State behind two widgets of the desktop admin application: the window
//! shown while an update downloads, and the numeric steppers.

pub mod progress;
pub mod stepper;

pub use progress::{
    progress_channel, DownloadProgress, ProgressBar, ProgressEmitter, ProgressFrame,
    UpdateProgressWindow, UPDATE_DOWNLOAD_PROGRESS,
};
pub use stepper::{StepMode, Stepper};
