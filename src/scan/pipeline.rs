//! The scan session state machine.
//!
//! # Overview
//!
//! A [`ScanPipeline`] owns its capture source, decoder and verification
//! consumer. It moves through the states of [`ScanStatus`]:
//!
//! ```text
//! Idle ──start──▶ Capturing ──code──▶ Detected ──valid──▶ Resolving (terminal)
//!                  ▲   │                 │
//!                  │   │ stop            └──invalid, after cool-down──▶ Capturing
//!                  │   ▼
//!  Failed ◀──acquire error    Stopped ──start──▶ Capturing
//! ```
//!
//! # Guarantees
//!
//! - The capture handle is released exactly once per acquisition, on every
//!   exit path, including drop.
//! - Entering `Detected` halts sampling: every frame read before the
//!   transition carries an older epoch and its decode result is discarded.
//! - At most one identifier is handed to the consumer per session.
//! - No operation returns an error; failures are reflected into
//!   [`ScanPipeline::status`] and [`ScanPipeline::last_error`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::{
    CaptureSource, Decoder, Facing, PixelBuffer, ScanFailure, ScanStatus, SourceError,
    SourceKind, VerificationConsumer,
};
use crate::payload::{PayloadError, VerificationPayload};

/// Pause before sampling resumes after a code with an unusable payload.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(2000);

/// Settings fixed for the lifetime of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Cool-down after a malformed payload before capture resumes.
    pub cooldown: Duration,
    /// Camera orientation requested from the source.
    pub facing: Facing,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            facing: Facing::Environment,
        }
    }
}

impl PipelineSettings {
    /// Set the cool-down interval.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Set the preferred camera orientation.
    #[must_use]
    pub fn with_facing(mut self, facing: Facing) -> Self {
        self.facing = facing;
        self
    }
}

/// Receives status changes from a pipeline, typically to render them.
pub trait ScanObserver: Send + Sync {
    /// Called after every status change.
    fn on_status(&self, _snapshot: &ScanSnapshot) {}

    /// Called for failures that leave the pipeline running.
    fn on_transient_error(&self, _failure: &ScanFailure) {}
}

/// Observable state of a pipeline at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanSnapshot {
    /// Current status.
    pub status: ScanStatus,
    /// What is feeding the session, if anything.
    pub source: Option<SourceKind>,
    /// Last failure, cleared when the user restarts.
    pub last_error: Option<ScanFailure>,
    /// Identifier handed to the consumer, once resolved.
    pub certificate_id: Option<String>,
}

/// A frame read from the source, stamped with the epoch it was read in.
///
/// Decode it anywhere, then feed the result back through
/// [`ScanPipeline::complete_sample`]; results from an older epoch are dropped.
#[derive(Debug, Clone)]
pub struct FrameTicket {
    /// Session epoch at read time.
    pub epoch: u64,
    /// The captured frame.
    pub buffer: PixelBuffer,
}

/// QR acquisition and resolution state machine.
pub struct ScanPipeline<S, D, C>
where
    S: CaptureSource,
    D: Decoder,
    C: VerificationConsumer,
{
    source: S,
    decoder: D,
    consumer: C,
    settings: PipelineSettings,
    status: ScanStatus,
    handle: Option<S::Handle>,
    source_kind: Option<SourceKind>,
    last_error: Option<ScanFailure>,
    certificate_id: Option<String>,
    epoch: u64,
    resume_at: Option<Instant>,
    observer: Option<Arc<dyn ScanObserver>>,
}

impl<S, D, C> std::fmt::Debug for ScanPipeline<S, D, C>
where
    S: CaptureSource,
    D: Decoder,
    C: VerificationConsumer,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanPipeline")
            .field("settings", &self.settings)
            .field("status", &self.status)
            .field("holds_source", &self.handle.is_some())
            .field("source_kind", &self.source_kind)
            .field("last_error", &self.last_error)
            .field("certificate_id", &self.certificate_id)
            .field("epoch", &self.epoch)
            .field("resume_at", &self.resume_at)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl<S, D, C> ScanPipeline<S, D, C>
where
    S: CaptureSource,
    D: Decoder,
    C: VerificationConsumer,
{
    /// Create an idle pipeline around its collaborators.
    #[must_use]
    pub fn new(source: S, decoder: D, consumer: C, settings: PipelineSettings) -> Self {
        Self {
            source,
            decoder,
            consumer,
            settings,
            status: ScanStatus::Idle,
            handle: None,
            source_kind: None,
            last_error: None,
            certificate_id: None,
            epoch: 0,
            resume_at: None,
            observer: None,
        }
    }

    /// Attach an observer notified on status changes and transient errors.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> ScanStatus {
        self.status
    }

    /// Last failure, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&ScanFailure> {
        self.last_error.as_ref()
    }

    /// What is feeding the session.
    #[must_use]
    pub fn source_kind(&self) -> Option<SourceKind> {
        self.source_kind
    }

    /// Identifier handed to the consumer, once resolved.
    #[must_use]
    pub fn resolved_certificate(&self) -> Option<&str> {
        self.certificate_id.as_deref()
    }

    /// Current session epoch.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether a capture handle is currently held.
    #[must_use]
    pub fn holds_source(&self) -> bool {
        self.handle.is_some()
    }

    /// Settings this pipeline was built with.
    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// The injected capture source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The injected verification consumer.
    #[must_use]
    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    /// Observable state for the host view.
    #[must_use]
    pub fn snapshot(&self) -> ScanSnapshot {
        ScanSnapshot {
            status: self.status,
            source: self.source_kind,
            last_error: self.last_error.clone(),
            certificate_id: self.certificate_id.clone(),
        }
    }

    /// Acquire the capture source and begin capturing.
    ///
    /// Only valid from `Idle`, `Failed` or `Stopped`; elsewhere it is a
    /// no-op. An acquisition error moves the pipeline to `Failed` with
    /// [`ScanFailure::SourceUnavailable`] and is not retried automatically.
    pub fn start(&mut self) -> ScanStatus {
        if !self.status.can_start() {
            log::debug!("start() ignored while {}", self.status);
            return self.status;
        }

        self.last_error = None;
        self.certificate_id = None;
        self.resume_at = None;
        self.epoch += 1;

        match self.source.acquire(self.settings.facing) {
            Ok(handle) => {
                self.handle = Some(handle);
                self.source_kind = Some(SourceKind::Camera);
                log::info!("Capture started ({} camera preferred)", self.settings.facing);
                self.set_status(ScanStatus::Capturing);
            }
            Err(e) => {
                log::error!("Cannot access the camera: {}", e);
                self.last_error = Some(ScanFailure::SourceUnavailable(e.to_string()));
                self.set_status(ScanStatus::Failed);
            }
        }
        self.status
    }

    /// Sample one frame: read, decode, and act on a detection.
    ///
    /// Call once per display tick. A source with no complete frame yet makes
    /// this a no-op. Also resumes capture once a cool-down has elapsed.
    pub fn sample_frame(&mut self) -> ScanStatus {
        let Some(ticket) = self.begin_sample() else {
            return self.status;
        };
        let decoded = self.decoder.decode(&ticket.buffer);
        self.complete_sample(ticket.epoch, decoded)
    }

    /// Read the next frame for decoding elsewhere.
    ///
    /// Returns `None` when not capturing or when the source has no frame ready.
    pub fn begin_sample(&mut self) -> Option<FrameTicket> {
        self.resume_if_cooled_down();
        if self.status != ScanStatus::Capturing {
            return None;
        }

        let handle = self.handle.as_mut()?;
        match self.source.read_frame(handle) {
            Ok(Some(buffer)) => Some(FrameTicket {
                epoch: self.epoch,
                buffer,
            }),
            Ok(None) => None,
            Err(e) => {
                self.fail_source(e);
                None
            }
        }
    }

    /// Apply a decode result produced for a frame read in `epoch`.
    ///
    /// Results from an older epoch, or arriving when not capturing, are
    /// discarded.
    pub fn complete_sample(&mut self, epoch: u64, decoded: Option<String>) -> ScanStatus {
        if epoch != self.epoch || self.status != ScanStatus::Capturing {
            if decoded.is_some() {
                log::trace!(
                    "Discarding decode result from epoch {} (current {}, {})",
                    epoch,
                    self.epoch,
                    self.status
                );
            }
            return self.status;
        }

        match decoded {
            Some(raw) => self.handle_detection(&raw),
            None => self.status,
        }
    }

    /// Handle the text of a code detected by the live capture.
    ///
    /// Only acts while `Capturing`, or while `Detected` during a cool-down;
    /// in any other state the result is dropped. A valid payload moves to
    /// `Resolving` and hands the identifier to the consumer. Anything else
    /// records [`ScanFailure::DecodeMalformed`] and resumes capture after
    /// the cool-down.
    pub fn on_detected(&mut self, raw: &str) -> ScanStatus {
        let live = match self.status {
            ScanStatus::Capturing => true,
            ScanStatus::Detected => self.resume_at.is_some(),
            _ => false,
        };
        if !live {
            log::debug!("Ignoring detection while {}", self.status);
            return self.status;
        }
        self.handle_detection(raw)
    }

    fn handle_detection(&mut self, raw: &str) -> ScanStatus {
        // Any frame still in flight now belongs to a stale epoch.
        self.epoch += 1;
        self.resume_at = None;
        self.set_status(ScanStatus::Detected);

        match VerificationPayload::parse(raw) {
            Ok(payload) => self.resolve(payload),
            Err(e) => self.reject_payload(e),
        }
    }

    /// Decode a single uploaded image, bypassing the camera.
    ///
    /// The image is decoded at native resolution and run through the decoder
    /// once. A found code is handled like a live detection, from any state
    /// but `Resolving`. An unreadable image or an image without a code is a
    /// transient failure.
    pub fn decode_static_image(&mut self, bytes: &[u8]) -> ScanStatus {
        if self.status == ScanStatus::Resolving {
            log::debug!("Ignoring image after hand-off");
            return self.status;
        }

        let buffer = match PixelBuffer::decode_image(bytes) {
            Ok(buffer) => buffer,
            Err(e) => {
                self.record_transient(ScanFailure::ImageUnreadable(e.to_string()));
                return self.status;
            }
        };
        if self.handle.is_none() {
            self.source_kind = Some(SourceKind::StaticImage);
        }

        log::debug!(
            "Decoding static image ({}x{})",
            buffer.width(),
            buffer.height()
        );
        match self.decoder.decode(&buffer) {
            Some(raw) => self.handle_detection(&raw),
            None => {
                self.record_transient(ScanFailure::NoCodeFound);
                self.status
            }
        }
    }

    /// Cancel sampling and release the capture source.
    ///
    /// Safe to call from any state and idempotent. `Capturing`, `Detected`
    /// and `Resolving` move to `Stopped`; other states keep their status.
    pub fn stop(&mut self) -> ScanStatus {
        self.resume_at = None;
        self.release_source();

        if matches!(
            self.status,
            ScanStatus::Capturing | ScanStatus::Detected | ScanStatus::Resolving
        ) {
            self.epoch += 1;
            self.set_status(ScanStatus::Stopped);
        }
        self.status
    }

    fn resolve(&mut self, payload: VerificationPayload) -> ScanStatus {
        log::info!("QR code detected: certificate {}", payload.certificate_id);

        // The live view is done once a certificate is recognized.
        self.release_source();
        self.certificate_id = Some(payload.certificate_id.clone());
        self.set_status(ScanStatus::Resolving);

        if let Err(e) = self.consumer.resolve(&payload.certificate_id) {
            log::error!("Verification hand-off rejected: {}", e);
            self.certificate_id = None;
            self.last_error = Some(ScanFailure::ConsumerHandoff(e.to_string()));
            self.set_status(ScanStatus::Failed);
        }
        self.status
    }

    fn reject_payload(&mut self, error: PayloadError) -> ScanStatus {
        self.record_transient(ScanFailure::DecodeMalformed(error.to_string()));

        if self.handle.is_none() {
            self.set_status(ScanStatus::Idle);
        } else if self.settings.cooldown.is_zero() {
            self.set_status(ScanStatus::Capturing);
        } else {
            log::debug!("Resuming capture in {:?}", self.settings.cooldown);
            self.resume_at = Some(Instant::now() + self.settings.cooldown);
        }
        self.status
    }

    fn resume_if_cooled_down(&mut self) {
        if self.status != ScanStatus::Detected {
            return;
        }
        if self
            .resume_at
            .is_some_and(|deadline| Instant::now() >= deadline)
        {
            self.resume_at = None;
            // The handle was kept through the cool-down; no new permission prompt.
            self.set_status(ScanStatus::Capturing);
        }
    }

    fn fail_source(&mut self, error: SourceError) {
        log::error!("Capture source lost: {}", error);
        self.epoch += 1;
        self.release_source();
        self.last_error = Some(ScanFailure::SourceUnavailable(error.to_string()));
        self.set_status(ScanStatus::Failed);
    }

    fn release_source(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.source.release(handle);
            log::debug!("Capture source released");
        }
        self.source_kind = None;
    }

    fn record_transient(&mut self, failure: ScanFailure) {
        log::warn!("{}", failure);
        if let Some(observer) = &self.observer {
            observer.on_transient_error(&failure);
        }
        self.last_error = Some(failure);
    }

    fn set_status(&mut self, status: ScanStatus) {
        if self.status == status {
            return;
        }
        log::debug!("Scan status {} -> {}", self.status, status);
        self.status = status;
        if let Some(observer) = &self.observer {
            observer.on_status(&self.snapshot());
        }
    }
}

impl<S, D, C> Drop for ScanPipeline<S, D, C>
where
    S: CaptureSource,
    D: Decoder,
    C: VerificationConsumer,
{
    fn drop(&mut self) {
        self.stop();
    }
}
