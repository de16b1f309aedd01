//! Test doubles for the scan pipeline's collaborators.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use certscan::scan::{
    CaptureSource, Decoder, Facing, HandoffError, PipelineSettings, PixelBuffer, ScanPipeline,
    SourceError, VerificationConsumer,
};

/// Counters shared between a [`CountingSource`] and the test.
#[derive(Debug, Default, Clone)]
pub struct SourceCounters {
    pub acquired: Arc<AtomicUsize>,
    pub released: Arc<AtomicUsize>,
    pub reads: Arc<AtomicUsize>,
    /// Whether acquisition is refused; flip it to simulate a granted retry.
    pub denied: Arc<AtomicBool>,
}

impl SourceCounters {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn set_denied(&self, denied: bool) {
        self.denied.store(denied, Ordering::SeqCst);
    }
}

/// Camera double: scripted frames, optional permission failure, counted
/// acquire/release calls.
pub struct CountingSource {
    pub counters: SourceCounters,
    pub frames: VecDeque<Option<PixelBuffer>>,
    /// Frame served once the script runs out.
    pub idle_frame: Option<PixelBuffer>,
}

impl CountingSource {
    /// A source that produces a blank frame on every read.
    pub fn endless() -> Self {
        Self {
            counters: SourceCounters::default(),
            frames: VecDeque::new(),
            idle_frame: Some(blank_frame()),
        }
    }

    /// A source that never produces a complete frame.
    pub fn not_ready() -> Self {
        Self {
            idle_frame: None,
            ..Self::endless()
        }
    }

    /// A source whose acquisition is refused.
    pub fn denied() -> Self {
        let source = Self::endless();
        source.counters.set_denied(true);
        source
    }
}

impl CaptureSource for CountingSource {
    type Handle = usize;

    fn acquire(&mut self, _facing: Facing) -> Result<usize, SourceError> {
        if self.counters.denied.load(Ordering::SeqCst) {
            return Err(SourceError::PermissionDenied("/dev/video0".into()));
        }
        Ok(self.counters.acquired.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn read_frame(&mut self, _handle: &mut usize) -> Result<Option<PixelBuffer>, SourceError> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        match self.frames.pop_front() {
            Some(frame) => Ok(frame),
            None => Ok(self.idle_frame.clone()),
        }
    }

    fn release(&mut self, _handle: usize) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Decoder returning scripted results in order, then `fallback`.
#[derive(Default)]
pub struct ScriptedDecoder {
    pub script: Mutex<VecDeque<Option<String>>>,
    pub fallback: Option<String>,
    pub calls: AtomicUsize,
}

impl ScriptedDecoder {
    pub fn new(script: Vec<Option<String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Decoder that finds `text` in every frame.
    pub fn always(text: &str) -> Self {
        Self {
            fallback: Some(text.to_string()),
            ..Self::default()
        }
    }

    /// Decoder that never finds a code.
    pub fn never() -> Self {
        Self::default()
    }
}

impl Decoder for ScriptedDecoder {
    fn decode(&self, _buffer: &PixelBuffer) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(result) => result,
            None => self.fallback.clone(),
        }
    }
}

/// Consumer recording every identifier it receives.
#[derive(Debug, Default, Clone)]
pub struct RecordingConsumer {
    pub resolved: Arc<Mutex<Vec<String>>>,
    pub reject: bool,
}

impl RecordingConsumer {
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.resolved.lock().unwrap().clone()
    }
}

impl VerificationConsumer for RecordingConsumer {
    fn resolve(&mut self, certificate_id: &str) -> Result<(), HandoffError> {
        self.resolved
            .lock()
            .unwrap()
            .push(certificate_id.to_string());
        if self.reject {
            return Err(HandoffError::Rejected("unknown certificate".into()));
        }
        Ok(())
    }
}

pub type TestPipeline = ScanPipeline<CountingSource, ScriptedDecoder, RecordingConsumer>;

/// Build a pipeline and keep handles on its counters and consumer log.
pub fn pipeline(
    source: CountingSource,
    decoder: ScriptedDecoder,
    consumer: RecordingConsumer,
    settings: PipelineSettings,
) -> (TestPipeline, SourceCounters, RecordingConsumer) {
    let counters = source.counters.clone();
    let log = consumer.clone();
    (
        ScanPipeline::new(source, decoder, consumer, settings),
        counters,
        log,
    )
}

pub fn blank_frame() -> PixelBuffer {
    PixelBuffer::from_rgba(4, 4, vec![255; 4 * 4 * 4]).unwrap()
}

/// PNG bytes of a small white image.
pub fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([255, 255, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// PNG bytes of a QR code encoding `text`.
pub fn qr_png(text: &str) -> Vec<u8> {
    let code = qrcode::QrCode::new(text.as_bytes()).unwrap();
    let img = code.render::<image::Luma<u8>>().build();
    let mut bytes = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

pub const VALID_PAYLOAD: &str = r#"{"certificateId":"SN-NAISS-20240315-ABC123","verifyUrl":"https://x/verify?id=SN-NAISS-20240315-ABC123"}"#;
