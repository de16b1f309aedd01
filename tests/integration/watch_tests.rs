//! Live capture over a directory frame feed.

use std::fs;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use certscan::handoff::VerifyLinkConsumer;
use certscan::scan::{
    drive, DriveOutcome, DriverConfig, FrameDirSource, PipelineSettings, QrDecoder, ScanFailure,
    ScanPipeline, ScanStatus,
};
use tempfile::TempDir;

use crate::common::{png_bytes, qr_png, ScriptedDecoder, VALID_PAYLOAD};

fn fast() -> DriverConfig {
    DriverConfig::default()
        .with_frame_interval(Duration::from_millis(1))
        .with_timeout(Some(Duration::from_millis(500)))
}

fn settings() -> PipelineSettings {
    PipelineSettings::default().with_cooldown(Duration::ZERO)
}

#[test]
fn test_feed_frame_with_code_resolves() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("0001.png"), png_bytes()).unwrap();

    let mut pipeline = ScanPipeline::new(
        FrameDirSource::new(dir.path()),
        ScriptedDecoder::always(VALID_PAYLOAD),
        VerifyLinkConsumer::new("https://etat-civil.example/"),
        settings(),
    );

    let outcome = drive(&mut pipeline, &fast());
    assert_eq!(
        outcome,
        DriveOutcome::Resolved("SN-NAISS-20240315-ABC123".into())
    );
    assert!(!pipeline.holds_source());

    let handoff = pipeline.consumer().last().unwrap();
    assert_eq!(
        handoff.verify_url,
        "https://etat-civil.example/verify?id=SN-NAISS-20240315-ABC123"
    );
    assert_eq!(pipeline.consumer().handoffs().len(), 1);
}

#[test]
fn test_feed_with_real_qr_frame_resolves() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("0001.png"), png_bytes()).unwrap();
    fs::write(dir.path().join("0002.png"), qr_png(VALID_PAYLOAD)).unwrap();

    let mut pipeline = ScanPipeline::new(
        FrameDirSource::new(dir.path()),
        QrDecoder::new(),
        VerifyLinkConsumer::new("http://localhost:5173"),
        settings(),
    );

    let outcome = drive(&mut pipeline, &fast());
    assert_eq!(
        outcome,
        DriveOutcome::Resolved("SN-NAISS-20240315-ABC123".into())
    );
    assert_eq!(pipeline.consumer().handoffs().len(), 1);
    assert_eq!(
        pipeline.consumer().last().unwrap().verify_url,
        "http://localhost:5173/verify?id=SN-NAISS-20240315-ABC123"
    );
}

#[test]
fn test_blank_frames_time_out() {
    let dir = TempDir::new().unwrap();
    for i in 0..3 {
        fs::write(dir.path().join(format!("{:04}.png", i)), png_bytes()).unwrap();
    }

    let mut pipeline = ScanPipeline::new(
        FrameDirSource::new(dir.path()),
        QrDecoder::new(),
        VerifyLinkConsumer::new("http://localhost:5173"),
        settings(),
    );

    let config = fast().with_timeout(Some(Duration::from_millis(50)));
    assert_eq!(drive(&mut pipeline, &config), DriveOutcome::TimedOut);
    assert_eq!(pipeline.status(), ScanStatus::Stopped);
    assert!(!pipeline.holds_source());
    assert!(pipeline.consumer().last().is_none());
}

#[test]
fn test_missing_feed_fails() {
    let dir = TempDir::new().unwrap();
    let mut pipeline = ScanPipeline::new(
        FrameDirSource::new(dir.path().join("nope")),
        QrDecoder::new(),
        VerifyLinkConsumer::new("http://localhost:5173"),
        settings(),
    );

    match drive(&mut pipeline, &fast()) {
        DriveOutcome::Failed(ScanFailure::SourceUnavailable(_)) => {}
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn test_shutdown_flag_interrupts() {
    let dir = TempDir::new().unwrap();
    let flag = Arc::new(AtomicBool::new(true));

    let mut pipeline = ScanPipeline::new(
        FrameDirSource::new(dir.path()),
        QrDecoder::new(),
        VerifyLinkConsumer::new("http://localhost:5173"),
        settings(),
    );

    let config = fast().with_shutdown_flag(flag);
    assert_eq!(drive(&mut pipeline, &config), DriveOutcome::Interrupted);
    assert_eq!(pipeline.status(), ScanStatus::Stopped);
    assert!(!pipeline.holds_source());
}

#[test]
fn test_consumer_rejects_blank_identifier() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("0001.png"), png_bytes()).unwrap();

    let mut pipeline = ScanPipeline::new(
        FrameDirSource::new(dir.path()),
        ScriptedDecoder::always(r#"{"certificateId":"   ","verifyUrl":"u"}"#),
        VerifyLinkConsumer::new("http://localhost:5173"),
        settings(),
    );

    match drive(&mut pipeline, &fast()) {
        DriveOutcome::Failed(ScanFailure::ConsumerHandoff(_)) => {}
        other => panic!("unexpected outcome: {:?}", other),
    }
}
