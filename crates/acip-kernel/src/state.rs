//! Persisted kernel state
//!
//! The kernel's durable footprint: the pinned manifest, the last boot
//! stamp, the canonical manifest hash, and the boot-generation counter.
//! The counter is strictly increasing across boots; a kernel that cannot
//! read its prior counter fails rather than restarting at 1.

use serde::{Deserialize, Serialize};

use acip_capabilities::CapabilityManifest;
use acip_crypto::{canonical_string, CanonicalError};

/// Prefix of every kernel state key in durable storage
pub const STATE_KEY_PREFIX: &str = "acip.kernel.state.";

/// Storage key for a given agent's kernel state
pub fn state_key(agent_id: &str) -> String {
    format!("{STATE_KEY_PREFIX}{agent_id}")
}

/// Durable kernel state, stored under `acip.kernel.state.<agent_id>` as
/// its canonical serialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistedKernelState {
    pub manifest: CapabilityManifest,
    /// ISO-8601 UTC, second precision
    pub last_boot_utc: String,
    /// Lowercase hex SHA-256 of the canonical manifest
    pub last_manifest_hash: String,
    /// Boot-generation counter, strictly increasing
    pub monotonic_counter: u64,
}

impl PersistedKernelState {
    /// Canonical serialization (the stored representation)
    pub fn canonical_string(&self) -> Result<String, CanonicalError> {
        canonical_string(self)
    }

    /// Strict parse of a stored representation
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_key_embeds_the_agent() {
        assert_eq!(state_key("sat-7"), "acip.kernel.state.sat-7");
    }

    #[test]
    fn canonical_round_trip() {
        let manifest = CapabilityManifest::baseline("sat-1", "sdc-1");
        let state = PersistedKernelState {
            last_manifest_hash: manifest.canonical_hash().unwrap(),
            manifest,
            last_boot_utc: "2026-08-02T09:30:00Z".to_string(),
            monotonic_counter: 3,
        };
        let raw = state.canonical_string().unwrap();
        let back = PersistedKernelState::parse(&raw).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn unknown_fields_fail_the_parse() {
        let manifest = CapabilityManifest::baseline("sat-1", "sdc-1");
        let state = PersistedKernelState {
            last_manifest_hash: manifest.canonical_hash().unwrap(),
            manifest,
            last_boot_utc: "2026-08-02T09:30:00Z".to_string(),
            monotonic_counter: 1,
        };
        let mut value = serde_json::to_value(&state).unwrap();
        value["shadow_counter"] = serde_json::json!(0);
        assert!(PersistedKernelState::parse(&value.to_string()).is_err());
    }
}
