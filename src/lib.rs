//! certscan - QR scanner for blockchain-recorded certificates
//!
//! Reads the QR code printed on an identity or civil-status certificate,
//! validates its payload, and hands the certificate identifier to the
//! verification site. The ledger lookup itself happens downstream.

pub mod cli;
pub mod config;
pub mod error;
pub mod handoff;
pub mod logging;
pub mod output;
pub mod payload;
pub mod progress;
pub mod scan;
pub mod signal;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::{Cli, Commands, ImageArgs, OutputFormat, PayloadArgs, WatchArgs};
use crate::config::Config;
use crate::error::ExitCode;
use crate::handoff::VerifyLinkConsumer;
use crate::output::ScanReport;
use crate::payload::{generate_certificate_id, VerificationPayload};
use crate::progress::ScanProgress;
use crate::scan::{
    drive, DriveOutcome, DriverConfig, FrameDirSource, NoCamera, QrDecoder, ScanFailure,
    ScanPipeline,
};

/// Run the application for parsed CLI arguments.
///
/// Returns the exit code for outcomes the scanner handled itself; `Err` is
/// reserved for failures outside the scan (unreadable files, bad output).
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let config = Config::load(cli.config.as_deref());
    log::debug!("Effective configuration: {:?}", config);

    match cli.command {
        Commands::Image(args) => run_image(args, &config),
        Commands::Watch(args) => run_watch(args, config, cli.quiet),
        Commands::Payload(args) => run_payload(args, &config),
    }
}

fn run_image(args: ImageArgs, config: &Config) -> Result<ExitCode> {
    let bytes = std::fs::read(&args.path)
        .with_context(|| format!("Failed to read image: {}", args.path.display()))?;

    let origin = args.origin.as_deref().unwrap_or(&config.verify_origin);
    let mut pipeline = ScanPipeline::new(
        NoCamera,
        QrDecoder::new(),
        VerifyLinkConsumer::new(origin),
        config.pipeline_settings(),
    );

    pipeline.decode_static_image(&bytes);
    let report = ScanReport::new(pipeline.snapshot(), pipeline.consumer().last());
    print_report(&report, args.output)?;

    Ok(exit_code_for(&report))
}

fn run_watch(args: WatchArgs, mut config: Config, quiet: bool) -> Result<ExitCode> {
    if let Some(cooldown) = args.cooldown {
        config.cooldown_ms = millis(cooldown);
    }
    if let Some(interval) = args.frame_interval {
        config.frame_interval_ms = millis(interval);
    }
    if let Some(facing) = args.facing {
        config.facing = facing.into();
    }
    if let Some(origin) = args.origin {
        config.verify_origin = origin;
    }
    let timeout = args.timeout.or_else(|| config.timeout());

    let handler = signal::install_handler().context("Failed to set up Ctrl+C handling")?;
    let progress = Arc::new(ScanProgress::new(quiet || args.output == OutputFormat::Json));

    let mut pipeline = ScanPipeline::new(
        FrameDirSource::new(&args.dir),
        QrDecoder::new(),
        VerifyLinkConsumer::new(config.verify_origin.clone()),
        config.pipeline_settings(),
    )
    .with_observer(progress.clone());

    let driver = DriverConfig::default()
        .with_frame_interval(config.frame_interval())
        .with_timeout(timeout)
        .with_shutdown_flag(handler.get_flag());

    log::info!("Watching {} for certificate QR codes", args.dir.display());
    let outcome = drive(&mut pipeline, &driver);
    progress.finish();

    let cut_short = matches!(outcome, DriveOutcome::TimedOut | DriveOutcome::Interrupted);
    let report =
        ScanReport::new(pipeline.snapshot(), pipeline.consumer().last()).with_cut_short(cut_short);
    print_report(&report, args.output)?;

    Ok(match outcome {
        DriveOutcome::Interrupted => ExitCode::Interrupted,
        _ => exit_code_for(&report),
    })
}

fn run_payload(args: PayloadArgs, config: &Config) -> Result<ExitCode> {
    let origin = args.origin.as_deref().unwrap_or(&config.verify_origin);
    let certificate_id = match args.certificate_id {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => generate_certificate_id(
            &args.certificate_type,
            chrono::Utc::now().date_naive(),
            &mut rand::thread_rng(),
        ),
    };

    let payload = VerificationPayload::issue(&certificate_id, origin);
    let json = payload
        .to_json()
        .context("Failed to serialize QR payload")?;
    println!("{}", json);
    Ok(ExitCode::Success)
}

fn print_report(report: &ScanReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = report
                .to_json_pretty()
                .context("Failed to serialize scan report")?;
            println!("{}", json);
        }
        OutputFormat::Text => println!("{}", report.to_text()),
    }
    Ok(())
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn exit_code_for(report: &ScanReport) -> ExitCode {
    if report.is_resolved() {
        return ExitCode::Success;
    }
    match report.error {
        Some(ScanFailure::SourceUnavailable(_)) => ExitCode::SourceUnavailable,
        _ => ExitCode::NotResolved,
    }
}
