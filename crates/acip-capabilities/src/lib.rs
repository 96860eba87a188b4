//! ACIP Capability Manifest - pinned declaration of what a satellite may do
//!
//! The manifest is the satellite's whole capability surface: federation
//! operations, assistance routes, update channels, and the governance pins
//! the kernel judges frames under. The schema is strict; unknown fields are
//! rejected at load so capabilities cannot drift in silently.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use acip_crypto::{canonical_hash_hex, CanonicalError};
use acip_types::{AssistanceRoute, RiskTier, UpdateChannel};

/// The only manifest schema version this kernel accepts
pub const MANIFEST_SCHEMA_VERSION: &str = "1.0.0";

/// Errors raised while loading or validating a manifest
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("unsupported manifest schema version: {found}")]
    SchemaVersionUnsupported { found: String },

    #[error("manifest agent_id {found} does not match kernel agent {expected}")]
    AgentIdMismatch { expected: String, found: String },

    #[error("invalid manifest field {field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("malformed manifest: {message}")]
    Malformed { message: String },
}

pub type Result<T> = std::result::Result<T, ManifestError>;

/// Federation section: which remote operations the satellite may invoke
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FederationPolicy {
    pub enabled: bool,
    pub sources: BTreeSet<String>,
    pub allowed_operations: BTreeSet<String>,
}

/// Assistance section: which escalation routes are open to the satellite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssistancePolicy {
    pub enabled: bool,
    pub routes: BTreeSet<AssistanceRoute>,
    /// Advisory retry budget for brokers and callers. The kernel itself
    /// makes at most one bounded attempt and never loops.
    pub max_attempts: u32,
}

/// Updates section: which data bundles may be installed, and under what
/// signature and attestation requirements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePolicy {
    pub enabled: bool,
    pub allowed_channels: BTreeSet<UpdateChannel>,
    pub require_signature: bool,
    pub require_governance_approval: bool,
    pub require_dvap_for_risk_tiers: BTreeSet<RiskTier>,
    pub trusted_signers: BTreeSet<String>,
}

/// Governance section: the pinned policy corpus frames are judged under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GovernancePolicy {
    pub sdc_version: String,
    pub invariant_keys_required: Vec<String>,
    pub dvap_required_for_risk_tiers: BTreeSet<RiskTier>,
}

/// The satellite's pinned, schema-versioned capability declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapabilityManifest {
    pub schema_version: String,
    pub agent_id: String,
    pub federation: FederationPolicy,
    pub assistance: AssistancePolicy,
    pub updates: UpdatePolicy,
    pub governance: GovernancePolicy,
}

impl CapabilityManifest {
    /// Baseline manifest: everything disabled, nothing allowed. Callers
    /// open capabilities up from here; the kernel never opens them itself.
    pub fn baseline(agent_id: impl Into<String>, sdc_version: impl Into<String>) -> Self {
        Self {
            schema_version: MANIFEST_SCHEMA_VERSION.to_string(),
            agent_id: agent_id.into(),
            federation: FederationPolicy {
                enabled: false,
                sources: BTreeSet::new(),
                allowed_operations: BTreeSet::new(),
            },
            assistance: AssistancePolicy {
                enabled: false,
                routes: BTreeSet::new(),
                max_attempts: 1,
            },
            updates: UpdatePolicy {
                enabled: false,
                allowed_channels: BTreeSet::new(),
                require_signature: true,
                require_governance_approval: true,
                require_dvap_for_risk_tiers: BTreeSet::new(),
                trusted_signers: BTreeSet::new(),
            },
            governance: GovernancePolicy {
                sdc_version: sdc_version.into(),
                invariant_keys_required: Vec::new(),
                dvap_required_for_risk_tiers: BTreeSet::new(),
            },
        }
    }

    /// Parse a manifest from JSON and validate it against the expected
    /// agent. Unknown fields fail the parse.
    pub fn from_json(raw: &str, expected_agent_id: &str) -> Result<Self> {
        let manifest: CapabilityManifest =
            serde_json::from_str(raw).map_err(|e| ManifestError::Malformed {
                message: e.to_string(),
            })?;
        manifest.validate(expected_agent_id)?;
        Ok(manifest)
    }

    /// Check the schema pin, the agent binding, and field sanity
    pub fn validate(&self, expected_agent_id: &str) -> Result<()> {
        if self.schema_version != MANIFEST_SCHEMA_VERSION {
            return Err(ManifestError::SchemaVersionUnsupported {
                found: self.schema_version.clone(),
            });
        }
        if self.agent_id != expected_agent_id {
            return Err(ManifestError::AgentIdMismatch {
                expected: expected_agent_id.to_string(),
                found: self.agent_id.clone(),
            });
        }
        if self.assistance.max_attempts == 0 {
            return Err(ManifestError::InvalidField {
                field: "assistance.max_attempts".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }
        Ok(())
    }

    /// Lowercase hex SHA-256 over the canonical serialization of the
    /// manifest. All set-typed fields are BTree collections, so the
    /// canonical form is order-stable by construction.
    pub fn canonical_hash(&self) -> std::result::Result<String, CanonicalError> {
        canonical_hash_hex(self)
    }
}
