//! End-to-end runs of the CLI entry point.

use certscan::cli::Cli;
use certscan::error::ExitCode;
use certscan::run_app;
use clap::Parser;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::common::png_bytes;

/// Parse `args` with an isolated, empty config file.
fn cli(dir: &Path, args: &[&str]) -> Cli {
    let config = dir.join("config.toml");
    fs::write(&config, "").unwrap();
    let mut argv = vec!["certscan", "--quiet", "--no-color", "--config"];
    argv.push(config.to_str().unwrap());
    argv.extend_from_slice(args);
    Cli::parse_from(argv)
}

#[test]
fn test_image_without_code_is_not_resolved() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("blank.png");
    fs::write(&image, png_bytes()).unwrap();

    let code = run_app(cli(dir.path(), &["image", image.to_str().unwrap()])).unwrap();
    assert_eq!(code, ExitCode::NotResolved);
}

#[test]
fn test_image_json_output() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("blank.png");
    fs::write(&image, png_bytes()).unwrap();

    let code = run_app(cli(
        dir.path(),
        &["image", image.to_str().unwrap(), "--output", "json"],
    ))
    .unwrap();
    assert_eq!(code, ExitCode::NotResolved);
}

#[test]
fn test_image_not_an_image_is_not_resolved() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("notes.png");
    fs::write(&file, "certificate").unwrap();

    let code = run_app(cli(dir.path(), &["image", file.to_str().unwrap()])).unwrap();
    assert_eq!(code, ExitCode::NotResolved);
}

#[test]
fn test_missing_image_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.png");

    let err = run_app(cli(dir.path(), &["image", missing.to_str().unwrap()])).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to read image"));
}

#[test]
fn test_watch_missing_directory_reports_unavailable_source() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("frames");

    let code = run_app(cli(
        dir.path(),
        &["watch", missing.to_str().unwrap(), "--timeout", "1s"],
    ))
    .unwrap();
    assert_eq!(code, ExitCode::SourceUnavailable);
}

#[test]
fn test_watch_times_out_on_empty_feed() {
    let dir = TempDir::new().unwrap();
    let frames = dir.path().join("frames");
    fs::create_dir(&frames).unwrap();

    let code = run_app(cli(
        dir.path(),
        &[
            "watch",
            frames.to_str().unwrap(),
            "--timeout",
            "60ms",
            "--frame-interval",
            "5ms",
        ],
    ))
    .unwrap();
    assert_eq!(code, ExitCode::NotResolved);
}

#[test]
fn test_payload_command_succeeds() {
    let dir = TempDir::new().unwrap();
    let code = run_app(cli(
        dir.path(),
        &["payload", "--id", "SN-NAISS-20240315-ABC123"],
    ))
    .unwrap();
    assert_eq!(code, ExitCode::Success);

    let code = run_app(cli(dir.path(), &["payload", "--type", "Acte de Mariage"])).unwrap();
    assert_eq!(code, ExitCode::Success);
}
