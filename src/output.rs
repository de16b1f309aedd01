//! Scan result rendering.
//!
//! A [`ScanReport`] summarizes how a scan ended and is printed either as a
//! short colored summary or as JSON for scripting.

use chrono::{DateTime, Utc};
use serde::Serialize;
use yansi::Paint;

use crate::handoff::Handoff;
use crate::scan::{ScanFailure, ScanSnapshot, ScanStatus, SourceKind};

/// Final state of a scan, ready for output.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Status the pipeline ended in.
    pub status: ScanStatus,
    /// What fed the scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceKind>,
    /// Recognized certificate identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<String>,
    /// Verification link for the identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_url: Option<String>,
    /// When the identifier was handed off.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Why the scan did not resolve, if it did not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ScanFailure>,
    /// Whether the scan was cut short by timeout or interrupt.
    pub cut_short: bool,
}

impl ScanReport {
    /// Build a report from the pipeline's last snapshot and hand-off.
    #[must_use]
    pub fn new(snapshot: ScanSnapshot, handoff: Option<&Handoff>) -> Self {
        Self {
            status: snapshot.status,
            source: snapshot.source,
            certificate_id: handoff
                .map(|h| h.certificate_id.clone())
                .or(snapshot.certificate_id),
            verify_url: handoff.map(|h| h.verify_url.clone()),
            resolved_at: handoff.map(|h| h.resolved_at),
            error: snapshot.last_error,
            cut_short: false,
        }
    }

    /// Mark the report as ended by timeout or interrupt.
    #[must_use]
    pub fn with_cut_short(mut self, cut_short: bool) -> Self {
        self.cut_short = cut_short;
        self
    }

    /// Whether a certificate was handed off.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.status == ScanStatus::Resolving && self.certificate_id.is_some()
    }

    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable summary. Colors follow yansi's global switch.
    #[must_use]
    pub fn to_text(&self) -> String {
        if self.is_resolved() {
            let id = self.certificate_id.as_deref().unwrap_or_default();
            let mut out = format!("{} {}", "Certificate".green().bold(), id.bold());
            if let Some(url) = &self.verify_url {
                out.push_str(&format!("\n  verify: {}", url.cyan()));
            }
            return out;
        }

        let headline = if self.cut_short {
            "Scan ended before a certificate was recognized"
        } else {
            "No certificate recognized"
        };
        match &self.error {
            Some(error) => format!("{}\n  reason: {}", headline.yellow().bold(), error),
            None => headline.yellow().bold().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved() -> ScanReport {
        let handoff = Handoff {
            certificate_id: "SN-ACTE-1".into(),
            verify_url: "https://h/verify?id=SN-ACTE-1".into(),
            resolved_at: Utc::now(),
        };
        let snapshot = ScanSnapshot {
            status: ScanStatus::Resolving,
            source: None,
            last_error: None,
            certificate_id: Some("SN-ACTE-1".into()),
        };
        ScanReport::new(snapshot, Some(&handoff))
    }

    #[test]
    fn test_resolved_report_text() {
        yansi::disable();
        let text = resolved().to_text();
        assert!(text.contains("SN-ACTE-1"));
        assert!(text.contains("verify: https://h/verify?id=SN-ACTE-1"));
    }

    #[test]
    fn test_resolved_report_json() {
        let json = resolved().to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "resolving");
        assert_eq!(value["certificate_id"], "SN-ACTE-1");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_unresolved_report_has_reason() {
        yansi::disable();
        let snapshot = ScanSnapshot {
            status: ScanStatus::Idle,
            source: Some(SourceKind::StaticImage),
            last_error: Some(ScanFailure::NoCodeFound),
            certificate_id: None,
        };
        let report = ScanReport::new(snapshot, None);
        assert!(!report.is_resolved());
        assert!(report.to_text().contains("No QR code detected in the image"));

        let value: serde_json::Value =
            serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
        assert_eq!(value["error"]["kind"], "no_code_found");
        assert_eq!(value["source"], "static_image");
    }
}
