//! Kernel error taxonomy
//!
//! Every refusal surfaces as a variant whose `Display` is the stable wire
//! tag callers and audit tooling key on. Tags never change shape:
//! `<KIND>` or `<KIND>:<subreason>`. Transport failures surface the
//! collaborator's error string verbatim, optionally augmented with an
//! assistance hint.

use thiserror::Error;

use acip_crypto::CanonicalError;
use acip_types::UpdateChannel;

use crate::storage::StorageError;

/// Errors that can escape a kernel entrypoint
#[derive(Error, Debug)]
pub enum KernelError {
    #[error("FEDERATION_DISABLED")]
    FederationDisabled,

    #[error("OP_NOT_ALLOWED")]
    OperationNotAllowed { operation: String },

    #[error("GOV_DENY:{reason}")]
    GovernanceDenied {
        reason: String,
        policy_hash: Option<String>,
    },

    #[error("DVAP_REFUSED:{reason}")]
    AttestationRefused {
        reason: String,
        /// Hash of the refused frame, so the caller can correlate the
        /// refusal with the audit record.
        input_frame_hash: String,
    },

    #[error("ASSISTANCE_DISABLED")]
    AssistanceDisabled,

    #[error("UPDATES_DISABLED")]
    UpdatesDisabled,

    #[error("UPDATE_CHANNEL_NOT_ALLOWED")]
    ChannelNotAllowed { channel: UpdateChannel },

    #[error("INVALID_SIGNATURE")]
    InvalidSignature,

    /// Transport failure from the federation client. `error` carries the
    /// collaborator's message verbatim, plus ` | assist:<route>` when the
    /// bounded assistance attempt produced a usable response.
    #[error("{error}")]
    FederationFailed {
        error: String,
        input_frame_hash: String,
    },

    /// Transport failure from the assistance broker on an explicit
    /// assistance request.
    #[error("{error}")]
    AssistanceFailed {
        error: String,
        input_frame_hash: String,
    },

    #[error("AGENT_ID_MISMATCH")]
    AgentIdMismatch { expected: String, found: String },

    #[error("kernel state for {agent_id} is corrupt: {message}")]
    StateCorrupted { agent_id: String, message: String },

    #[error("manifest rejected: {message}")]
    ManifestRejected { message: String },

    #[error("update apply failed: {message}")]
    UpdateApplyFailed { message: String },

    #[error("kernel has not booted")]
    NotBooted,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("canonicalization error: {0}")]
    Canonical(#[from] CanonicalError),
}

impl KernelError {
    /// Stable kind discriminator for the error lexicon
    pub fn kind(&self) -> &'static str {
        match self {
            KernelError::FederationDisabled => "FEDERATION_DISABLED",
            KernelError::OperationNotAllowed { .. } => "OP_NOT_ALLOWED",
            KernelError::GovernanceDenied { .. } => "GOV_DENY",
            KernelError::AttestationRefused { .. } => "DVAP_REFUSED",
            KernelError::AssistanceDisabled => "ASSISTANCE_DISABLED",
            KernelError::UpdatesDisabled => "UPDATES_DISABLED",
            KernelError::ChannelNotAllowed { .. } => "UPDATE_CHANNEL_NOT_ALLOWED",
            KernelError::InvalidSignature => "INVALID_SIGNATURE",
            KernelError::FederationFailed { .. } => "FEDERATION_ERROR",
            KernelError::AssistanceFailed { .. } => "FEDERATION_ERROR",
            KernelError::AgentIdMismatch { .. } => "AGENT_ID_MISMATCH",
            KernelError::StateCorrupted { .. } => "STATE_CORRUPT",
            KernelError::ManifestRejected { .. } => "MANIFEST_REJECTED",
            KernelError::UpdateApplyFailed { .. } => "UPDATE_APPLY_FAILED",
            KernelError::NotBooted => "NOT_BOOTED",
            KernelError::Storage(_) => "STORAGE_ERROR",
            KernelError::Canonical(_) => "CANONICAL_ERROR",
        }
    }

    /// Hash of the frame behind this refusal, when one was built
    pub fn input_frame_hash(&self) -> Option<&str> {
        match self {
            KernelError::AttestationRefused { input_frame_hash, .. }
            | KernelError::FederationFailed { input_frame_hash, .. }
            | KernelError::AssistanceFailed { input_frame_hash, .. } => {
                Some(input_frame_hash.as_str())
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_stable_tag() {
        assert_eq!(KernelError::FederationDisabled.to_string(), "FEDERATION_DISABLED");
        assert_eq!(
            KernelError::GovernanceDenied {
                reason: "INVARIANT_KEY_MISSING".to_string(),
                policy_hash: None,
            }
            .to_string(),
            "GOV_DENY:INVARIANT_KEY_MISSING"
        );
        assert_eq!(
            KernelError::AttestationRefused {
                reason: "NO_QUORUM".to_string(),
                input_frame_hash: "ab".repeat(32),
            }
            .to_string(),
            "DVAP_REFUSED:NO_QUORUM"
        );
        assert_eq!(
            KernelError::FederationFailed {
                error: "TIMEOUT | assist:HUMAN_ESCALATION".to_string(),
                input_frame_hash: "ab".repeat(32),
            }
            .to_string(),
            "TIMEOUT | assist:HUMAN_ESCALATION"
        );
    }

    #[test]
    fn kinds_cover_the_lexicon() {
        assert_eq!(
            KernelError::ChannelNotAllowed {
                channel: UpdateChannel::ConfigBundle
            }
            .kind(),
            "UPDATE_CHANNEL_NOT_ALLOWED"
        );
        assert_eq!(
            KernelError::AgentIdMismatch {
                expected: "a".to_string(),
                found: "b".to_string()
            }
            .kind(),
            "AGENT_ID_MISMATCH"
        );
    }
}
