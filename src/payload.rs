//! Certificate QR payloads.
//!
//! Issuing authorities encode a small JSON document into each certificate's
//! QR code:
//!
//! ```json
//! {"certificateId":"SN-ACTE-20240315-ABC123","verifyUrl":"https://host/verify?id=SN-ACTE-20240315-ABC123","timestamp":1710460800000}
//! ```
//!
//! A payload is actionable only when `certificateId` is a non-empty string
//! and `verifyUrl` is a string. `timestamp` is carried along but never
//! checked against the current time.

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Country prefix on generated certificate identifiers.
pub const ID_COUNTRY_PREFIX: &str = "SN";

/// Prefix used when the certificate type yields no usable first word.
pub const DEFAULT_TYPE_PREFIX: &str = "CERT";

/// Length of the random suffix on generated identifiers.
pub const ID_SUFFIX_LEN: usize = 6;

const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Errors that make a decoded payload non-actionable.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The code text is not JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The JSON is valid but not an object.
    #[error("expected a JSON object")]
    NotAnObject,

    /// A required field is absent or not a string.
    #[error("missing or non-string field '{0}'")]
    MissingField(&'static str),

    /// `certificateId` is present but empty.
    #[error("field 'certificateId' is empty")]
    EmptyCertificateId,
}

/// The verification data carried by a certificate's QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationPayload {
    /// Ledger identifier of the certificate.
    pub certificate_id: String,
    /// Link to the verification page for this certificate.
    pub verify_url: String,
    /// Issue time in milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl VerificationPayload {
    /// Parse and validate the raw text of a decoded code.
    pub fn parse(raw: &str) -> Result<Self, PayloadError> {
        let value: Value = serde_json::from_str(raw)?;
        let object = value.as_object().ok_or(PayloadError::NotAnObject)?;

        let certificate_id = object
            .get("certificateId")
            .and_then(Value::as_str)
            .ok_or(PayloadError::MissingField("certificateId"))?;
        if certificate_id.is_empty() {
            return Err(PayloadError::EmptyCertificateId);
        }

        let verify_url = object
            .get("verifyUrl")
            .and_then(Value::as_str)
            .ok_or(PayloadError::MissingField("verifyUrl"))?;

        let timestamp = match object.get("timestamp") {
            None | Some(Value::Null) => None,
            Some(v) => {
                let ts = v.as_i64();
                if ts.is_none() {
                    log::debug!("Ignoring non-integer payload timestamp: {}", v);
                }
                ts
            }
        };

        Ok(Self {
            certificate_id: certificate_id.to_string(),
            verify_url: verify_url.to_string(),
            timestamp,
        })
    }

    /// Build the payload an issuer encodes for `certificate_id`, stamped now.
    #[must_use]
    pub fn issue(certificate_id: &str, origin: &str) -> Self {
        Self::issue_at(certificate_id, origin, Utc::now())
    }

    /// Build the payload an issuer encodes for `certificate_id` at `issued_at`.
    #[must_use]
    pub fn issue_at(certificate_id: &str, origin: &str, issued_at: DateTime<Utc>) -> Self {
        Self {
            certificate_id: certificate_id.to_string(),
            verify_url: verify_link(origin, certificate_id),
            timestamp: Some(issued_at.timestamp_millis()),
        }
    }

    /// Issue time, if the payload carries a representable one.
    #[must_use]
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(DateTime::from_timestamp_millis)
    }

    /// Compact JSON, as written into the QR code.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Link to the verification route for `certificate_id` under `origin`.
#[must_use]
pub fn verify_link(origin: &str, certificate_id: &str) -> String {
    format!(
        "{}/verify?id={}",
        origin.trim_end_matches('/'),
        certificate_id
    )
}

/// Generate an identifier of the form `SN-{PREFIX}-{YYYYMMDD}-{RAND6}`.
///
/// `PREFIX` is the first word of `certificate_type`, upper-cased.
pub fn generate_certificate_id<R: Rng + ?Sized>(
    certificate_type: &str,
    date: NaiveDate,
    rng: &mut R,
) -> String {
    let prefix = certificate_type
        .split(' ')
        .next()
        .map(str::to_uppercase)
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_TYPE_PREFIX.to_string());

    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();

    format!(
        "{}-{}-{}-{}",
        ID_COUNTRY_PREFIX,
        prefix,
        date.format("%Y%m%d"),
        suffix
    )
}
