//! Live capture status using indicatif.
//!
//! [`ScanProgress`] implements [`ScanObserver`] and renders the pipeline
//! status as a spinner line while frames are being captured. Transient
//! failures are printed above the spinner so the scan keeps running.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::scan::{ScanFailure, ScanObserver, ScanSnapshot, ScanStatus};

/// Spinner reflecting the state of a scan.
#[derive(Debug)]
pub struct ScanProgress {
    bar: Option<ProgressBar>,
}

impl ScanProgress {
    /// Create a reporter; `quiet` disables all output.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        if quiet {
            return Self { bar: None };
        }

        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
        );
        bar.set_message(status_message(ScanStatus::Idle));
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar: Some(bar) }
    }

    /// Remove the spinner line.
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

impl ScanObserver for ScanProgress {
    fn on_status(&self, snapshot: &ScanSnapshot) {
        if let Some(bar) = &self.bar {
            bar.set_message(status_message(snapshot.status));
        }
    }

    fn on_transient_error(&self, failure: &ScanFailure) {
        if let Some(bar) = &self.bar {
            bar.println(format!("warning: {}", failure));
        }
    }
}

/// Short user-facing line for a status.
#[must_use]
pub fn status_message(status: ScanStatus) -> &'static str {
    match status {
        ScanStatus::Idle => "Waiting for the camera",
        ScanStatus::Capturing => "Position the QR code in front of the camera",
        ScanStatus::Detected => "QR code detected",
        ScanStatus::Resolving => "Certificate recognized",
        ScanStatus::Failed => "Camera unavailable",
        ScanStatus::Stopped => "Scan stopped",
    }
}
