//! Frame-paced loop driving a pipeline until it settles.
//!
//! The loop replaces a per-frame callback that reschedules itself: it owns
//! the cadence, so cancellation is a plain check at the top of each tick.
//!
//! 1. Stop if a shutdown was requested or the timeout elapsed
//! 2. Return once the pipeline has settled
//! 3. Sample one frame
//! 4. Sleep out the rest of the frame interval

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{CaptureSource, Decoder, ScanFailure, ScanPipeline, ScanStatus, VerificationConsumer};

/// Default tick: ~60 FPS, matching a display refresh.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// How a driven session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveOutcome {
    /// A certificate identifier was handed to the consumer.
    Resolved(String),
    /// The source could not be used or the hand-off was rejected.
    Failed(ScanFailure),
    /// The pipeline was stopped (or left idle) without a result.
    Stopped,
    /// The timeout elapsed before a certificate was recognized.
    TimedOut,
    /// A shutdown signal interrupted the session.
    Interrupted,
}

/// Loop configuration.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Time between frame samples.
    pub frame_interval: Duration,
    /// Give up after this long.
    pub timeout: Option<Duration>,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            frame_interval: FRAME_INTERVAL,
            timeout: None,
            shutdown_flag: None,
        }
    }
}

impl DriverConfig {
    /// Set the frame interval.
    #[must_use]
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Set the overall timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Run `pipeline` until it resolves, fails, stops, times out or is interrupted.
///
/// Starts the pipeline first if it is not already capturing. Every exit path
/// leaves the capture source released.
pub fn drive<S, D, C>(pipeline: &mut ScanPipeline<S, D, C>, config: &DriverConfig) -> DriveOutcome
where
    S: CaptureSource,
    D: Decoder,
    C: VerificationConsumer,
{
    if pipeline.status().can_start() {
        pipeline.start();
    }

    let started = Instant::now();
    let mut ticks: u64 = 0;

    loop {
        if config.is_shutdown_requested() {
            log::info!("Scan interrupted after {} tick(s)", ticks);
            pipeline.stop();
            return DriveOutcome::Interrupted;
        }

        match pipeline.status() {
            ScanStatus::Resolving => {
                return DriveOutcome::Resolved(
                    pipeline
                        .resolved_certificate()
                        .map(str::to_string)
                        .unwrap_or_default(),
                );
            }
            ScanStatus::Failed => {
                let failure = pipeline.last_error().cloned().unwrap_or_else(|| {
                    ScanFailure::SourceUnavailable("capture failed".to_string())
                });
                return DriveOutcome::Failed(failure);
            }
            ScanStatus::Stopped | ScanStatus::Idle => return DriveOutcome::Stopped,
            ScanStatus::Capturing | ScanStatus::Detected => {}
        }

        if config.timeout.is_some_and(|t| started.elapsed() >= t) {
            log::info!("No certificate recognized within {:?}", config.timeout);
            pipeline.stop();
            return DriveOutcome::TimedOut;
        }

        let tick = Instant::now();
        pipeline.sample_frame();
        ticks += 1;

        if !pipeline.status().is_settled() {
            let spent = tick.elapsed();
            if spent < config.frame_interval {
                std::thread::sleep(config.frame_interval - spent);
            }
        }
    }
}
