//! Governance gate contract
//!
//! The gate judges a canonical frame against its pinned policy corpus and
//! answers ALLOW or DENY. It must be a pure function of the frame plus the
//! evaluator's policy state; implementations that fail internally must
//! answer DENY rather than leak an error past the gate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::frame::CanonicalActionFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GovernanceVerdict {
    #[serde(rename = "ALLOW")]
    Allow,
    #[serde(rename = "DENY")]
    Deny,
}

/// Outcome of a governance evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceDecision {
    pub verdict: GovernanceVerdict,
    /// Opaque to the kernel; surfaced verbatim in `GOV_DENY:<reason>`
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_hash: Option<String>,
}

impl GovernanceDecision {
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            verdict: GovernanceVerdict::Allow,
            reason: reason.into(),
            policy_hash: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            verdict: GovernanceVerdict::Deny,
            reason: reason.into(),
            policy_hash: None,
        }
    }
}

#[async_trait]
pub trait GovernanceGate: Send + Sync {
    async fn evaluate(&self, frame: &CanonicalActionFrame) -> GovernanceDecision;
}

/// Gate that allows every frame. For tests and local probes only.
#[derive(Debug, Default, Clone)]
pub struct PermissiveGate;

#[async_trait]
impl GovernanceGate for PermissiveGate {
    async fn evaluate(&self, _frame: &CanonicalActionFrame) -> GovernanceDecision {
        GovernanceDecision::allow("permissive gate")
    }
}
