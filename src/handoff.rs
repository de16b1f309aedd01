//! Verification hand-off for the command-line host.
//!
//! The consumer does not query the ledger itself; it turns the recognized
//! identifier into the verification route and records it for the caller to
//! present, the way the scanner view navigates to the verification page.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::payload::verify_link;
use crate::scan::{HandoffError, VerificationConsumer};

/// A completed hand-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Handoff {
    /// Trimmed certificate identifier.
    pub certificate_id: String,
    /// Verification route for the identifier.
    pub verify_url: String,
    /// When the identifier was handed over.
    pub resolved_at: DateTime<Utc>,
}

/// Consumer that builds verification links under a configured origin.
#[derive(Debug, Clone)]
pub struct VerifyLinkConsumer {
    origin: String,
    handoffs: Vec<Handoff>,
}

impl VerifyLinkConsumer {
    /// Create a consumer for the verification site at `origin`.
    #[must_use]
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            handoffs: Vec::new(),
        }
    }

    /// The most recent hand-off, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Handoff> {
        self.handoffs.last()
    }

    /// All hand-offs received, oldest first.
    #[must_use]
    pub fn handoffs(&self) -> &[Handoff] {
        &self.handoffs
    }
}

impl VerificationConsumer for VerifyLinkConsumer {
    fn resolve(&mut self, certificate_id: &str) -> Result<(), HandoffError> {
        let id = certificate_id.trim();
        if id.is_empty() {
            return Err(HandoffError::EmptyIdentifier);
        }

        let handoff = Handoff {
            certificate_id: id.to_string(),
            verify_url: verify_link(&self.origin, id),
            resolved_at: Utc::now(),
        };
        log::info!("Certificate {} ready for verification", handoff.certificate_id);
        self.handoffs.push(handoff);
        Ok(())
    }
}
