//! Scan module: QR acquisition and certificate hand-off.
//!
//! This module provides the pipeline that turns camera frames or a static
//! image into a certificate identifier:
//! - Frame capture from an injected [`CaptureSource`]
//! - QR decoding through an injected [`Decoder`]
//! - Payload validation (see [`crate::payload`])
//! - One-shot hand-off to a [`VerificationConsumer`]
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`pipeline`]: The [`ScanPipeline`] state machine
//! - [`driver`]: Frame-paced loop that drives a pipeline until it settles
//! - [`source`]: Capture sources (frame directory, no camera)
//! - [`decoder`]: rqrr-backed QR decoder
//! - [`pixels`]: RGBA pixel buffers handed to the decoder
//!
//! # Example
//!
//! ```no_run
//! use certscan::handoff::VerifyLinkConsumer;
//! use certscan::scan::{FrameDirSource, PipelineSettings, QrDecoder, ScanPipeline, ScanStatus};
//!
//! let source = FrameDirSource::new("/tmp/frames");
//! let consumer = VerifyLinkConsumer::new("https://etat-civil.example");
//! let mut pipeline =
//!     ScanPipeline::new(source, QrDecoder::new(), consumer, PipelineSettings::default());
//!
//! pipeline.start();
//! while pipeline.status() == ScanStatus::Capturing {
//!     pipeline.sample_frame();
//! }
//! ```

pub mod decoder;
pub mod driver;
pub mod pipeline;
pub mod pixels;
pub mod source;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// Re-export main types
pub use decoder::QrDecoder;
pub use driver::{drive, DriveOutcome, DriverConfig};
pub use pipeline::{
    FrameTicket, PipelineSettings, ScanObserver, ScanPipeline, ScanSnapshot, DEFAULT_COOLDOWN,
};
pub use pixels::PixelBuffer;
pub use source::{FrameDirSource, NoCamera};

/// Lifecycle status of a scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// No source acquired.
    #[default]
    Idle,
    /// Source acquired, frames are being sampled.
    Capturing,
    /// A code was found; sampling is halted while the payload is handled.
    Detected,
    /// The certificate identifier was handed to the verification consumer.
    Resolving,
    /// The source could not be acquired or the hand-off was rejected.
    Failed,
    /// The user stopped the scan and the source was released.
    Stopped,
}

impl ScanStatus {
    /// Whether `start()` is allowed from this status.
    #[must_use]
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Idle | Self::Failed | Self::Stopped)
    }

    /// Whether the session has settled and no further frames will be sampled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Resolving | Self::Failed | Self::Stopped)
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Capturing => write!(f, "capturing"),
            Self::Detected => write!(f, "detected"),
            Self::Resolving => write!(f, "resolving"),
            Self::Failed => write!(f, "failed"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Which kind of capture is feeding the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A live camera-like frame feed.
    Camera,
    /// A single image supplied by the user.
    StaticImage,
}

/// Preferred camera orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Rear-facing camera, the one pointed at documents.
    #[default]
    Environment,
    /// Front-facing camera.
    User,
}

impl std::fmt::Display for Facing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Environment => write!(f, "environment"),
            Self::User => write!(f, "user"),
        }
    }
}

/// Reasons recorded in a session's `last_error`.
///
/// These never escape the pipeline as `Err`; they are reflected into the
/// observable status instead.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ScanFailure {
    /// Camera permission denied, no device, or the feed went away.
    #[error("Capture source unavailable: {0}")]
    SourceUnavailable(String),

    /// A code was found but its payload is not a certificate reference.
    #[error("QR code payload not recognized: {0}")]
    DecodeMalformed(String),

    /// The verification consumer refused the identifier.
    #[error("Verification hand-off rejected: {0}")]
    ConsumerHandoff(String),

    /// The supplied image contains no decodable code.
    #[error("No QR code detected in the image")]
    NoCodeFound,

    /// The supplied bytes are not a supported image.
    #[error("Image could not be read: {0}")]
    ImageUnreadable(String),
}

impl ScanFailure {
    /// Transient failures keep the pipeline running; the rest stop it until
    /// the user retries.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::DecodeMalformed(_) | Self::NoCodeFound | Self::ImageUnreadable(_)
        )
    }
}

/// Errors reported by a [`CaptureSource`].
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    /// Access to the device or feed was refused.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The feed location does not exist.
    #[error("Capture feed not found: {0}")]
    NotFound(PathBuf),

    /// The feed location is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// No capture device is present.
    #[error("No camera available")]
    NoDevice,

    /// An I/O error occurred while reading the feed.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Error returned by a [`VerificationConsumer`] that refuses an identifier.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HandoffError {
    /// The identifier is empty once trimmed.
    #[error("certificate identifier is empty")]
    EmptyIdentifier,

    /// The consumer rejected the identifier for its own reasons.
    #[error("{0}")]
    Rejected(String),
}

/// A device or feed that produces frames.
///
/// The pipeline acquires exactly one handle per capture and hands it back
/// through [`CaptureSource::release`], which consumes it.
pub trait CaptureSource {
    /// Exclusive handle to an open source.
    type Handle;

    /// Open the source, preferring the given camera orientation.
    fn acquire(&mut self, facing: Facing) -> Result<Self::Handle, SourceError>;

    /// Read the current frame, or `Ok(None)` if no complete frame is ready yet.
    fn read_frame(&mut self, handle: &mut Self::Handle)
        -> Result<Option<PixelBuffer>, SourceError>;

    /// Close the source and stop any underlying tracks.
    fn release(&mut self, handle: Self::Handle);
}

/// Extracts the text of a machine-readable code from a frame.
///
/// Implementations must be deterministic and keep no state between calls.
pub trait Decoder {
    /// Decode at most one code from the buffer.
    fn decode(&self, buffer: &PixelBuffer) -> Option<String>;
}

/// Takes over once a certificate identifier has been recognized.
pub trait VerificationConsumer {
    /// Accept the identifier. The pipeline does not wait for the actual
    /// authenticity check.
    fn resolve(&mut self, certificate_id: &str) -> Result<(), HandoffError>;
}
