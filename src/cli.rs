//! Command-line interface definitions for certscan.
//!
//! Global options (verbosity, color, config file) plus one subcommand per
//! entry point of the scanner.
//!
//! # Example
//!
//! ```bash
//! # Decode a certificate photo or screenshot
//! certscan image ~/Downloads/acte.png
//!
//! # Watch a directory that a camera snapshot tool writes frames into
//! certscan watch /run/camera/frames --timeout 2m
//!
//! # Print the payload an issuer would encode
//! certscan payload --type "Acte de Naissance" --origin https://etat-civil.example
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::scan::Facing;

/// Scan QR codes of blockchain-recorded certificates.
///
/// certscan reads the QR code printed on an identity or civil-status
/// certificate and hands its identifier to the verification site.
#[derive(Debug, Parser)]
#[command(name = "certscan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Report errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Decode the QR code in a single image
    Image(ImageArgs),
    /// Capture frames from a directory feed until a certificate is recognized
    Watch(WatchArgs),
    /// Print the QR payload an issuing authority encodes
    Payload(PayloadArgs),
}

/// Arguments for the image subcommand.
#[derive(Debug, Args)]
pub struct ImageArgs {
    /// Image containing a certificate QR code
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Origin of the verification site
    #[arg(long, value_name = "URL")]
    pub origin: Option<String>,
}

/// Arguments for the watch subcommand.
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Directory the camera writes frames into
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Give up after this long (e.g. 90s, 2m)
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Pause after an unrecognized QR code before scanning resumes
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub cooldown: Option<Duration>,

    /// Time between frame samples
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub frame_interval: Option<Duration>,

    /// Preferred camera orientation
    #[arg(long, value_enum)]
    pub facing: Option<FacingArg>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Origin of the verification site
    #[arg(long, value_name = "URL")]
    pub origin: Option<String>,
}

/// Arguments for the payload subcommand.
#[derive(Debug, Args)]
pub struct PayloadArgs {
    /// Certificate identifier (generated when omitted)
    #[arg(long = "id", value_name = "ID")]
    pub certificate_id: Option<String>,

    /// Certificate type, used for the generated identifier prefix
    #[arg(long = "type", value_name = "TYPE", default_value = "")]
    pub certificate_type: String,

    /// Origin of the verification site
    #[arg(long, value_name = "URL")]
    pub origin: Option<String>,
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Camera orientation as a CLI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FacingArg {
    /// Rear camera
    Environment,
    /// Front camera
    User,
}

impl From<FacingArg> for Facing {
    fn from(arg: FacingArg) -> Self {
        match arg {
            FacingArg::Environment => Facing::Environment,
            FacingArg::User => Facing::User,
        }
    }
}

/// Parse a human-readable duration.
///
/// Supports suffixes: ms, s, m. Case-insensitive. Numbers without suffix
/// are milliseconds.
///
/// # Examples
///
/// ```
/// use certscan::cli::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("1500").unwrap(), Duration::from_millis(1500));
/// assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
/// assert_eq!(parse_duration("1.5m").unwrap(), Duration::from_secs(90));
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown suffix.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Duration cannot be empty".to_string());
    }
    if s.starts_with('-') {
        return Err("Duration cannot be negative".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_lowercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let millis_per_unit: f64 = match suffix.as_str() {
        "" | "ms" => 1.0,
        "s" | "sec" => 1_000.0,
        "m" | "min" => 60_000.0,
        _ => return Err(format!("Unknown duration suffix: '{suffix}'")),
    };

    Ok(Duration::from_millis((num * millis_per_unit) as u64))
}
