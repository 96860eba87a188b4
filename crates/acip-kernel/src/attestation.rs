//! Attestation client contract
//!
//! The verification authority attests high-tier frames after governance
//! has allowed them. The kernel only consults it when the frame's risk
//! tier is in the manifest's DVAP set. A successful attestation carries
//! `uva_hash`, the authority's opaque identifier for the verified action.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::frame::CanonicalActionFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttestationVerdict {
    #[serde(rename = "ATTESTED")]
    Attested,
    #[serde(rename = "REFUSED")]
    Refused,
}

/// Outcome of an attestation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationDecision {
    pub verdict: AttestationVerdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uva_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AttestationDecision {
    pub fn attested(uva_hash: impl Into<String>) -> Self {
        Self {
            verdict: AttestationVerdict::Attested,
            uva_hash: Some(uva_hash.into()),
            reason: None,
        }
    }

    pub fn refused(reason: impl Into<String>) -> Self {
        Self {
            verdict: AttestationVerdict::Refused,
            uva_hash: None,
            reason: Some(reason.into()),
        }
    }
}

#[async_trait]
pub trait AttestationClient: Send + Sync {
    /// Only invoked from inside the kernel pipeline, after governance ALLOW
    async fn attest(&self, frame: &CanonicalActionFrame) -> AttestationDecision;
}

/// Attestor that attests every frame it can hash. For tests and local
/// probes only.
#[derive(Debug, Default, Clone)]
pub struct LoopbackAttestor;

#[async_trait]
impl AttestationClient for LoopbackAttestor {
    async fn attest(&self, frame: &CanonicalActionFrame) -> AttestationDecision {
        match frame.canonical_hash() {
            Ok(hash) => AttestationDecision::attested(format!("uva_{}", &hash[..12])),
            Err(e) => AttestationDecision::refused(e.to_string()),
        }
    }
}
