//! Canonical action frames
//!
//! A frame is the atomic unit of auditable intent: the sole input to
//! governance and attestation, hashed over its canonical serialization.
//! Frames are ephemeral; they live only across one entrypoint's pipeline.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use acip_crypto::{canonical_hash_hex, canonical_string, sha256_hex, CanonicalError};
use acip_types::{ExtensionValue, RiskTier};

/// The only hash algorithm frames declare
pub const HASH_ALGORITHM: &str = "SHA-256";

/// Deterministic, hashable representation of a single intended action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CanonicalActionFrame {
    pub action_id: String,
    pub agent_id: String,
    pub risk_tier: RiskTier,
    pub sdc_version: String,
    pub policy_verdict: bool,
    pub constraints_satisfied: bool,
    pub human_confirmation: bool,
    /// ISO-8601 UTC, second precision
    pub timestamp_utc: String,
    pub hash_algorithm: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, ExtensionValue>,
}

impl CanonicalActionFrame {
    /// Canonical serialization of this frame (the hash input)
    pub fn canonical_string(&self) -> Result<String, CanonicalError> {
        canonical_string(self)
    }

    /// Lowercase hex SHA-256 over the canonical serialization
    pub fn canonical_hash(&self) -> Result<String, CanonicalError> {
        canonical_hash_hex(self)
    }
}

/// Builder for canonical action frames
///
/// Frames are built after the manifest gates pass, so
/// `constraints_satisfied` starts true; `policy_verdict` starts false
/// because governance has not yet judged the frame it is about to receive.
pub struct FrameBuilder {
    action_id: String,
    agent_id: String,
    risk_tier: RiskTier,
    sdc_version: String,
    human_confirmation: bool,
    extensions: BTreeMap<String, ExtensionValue>,
}

impl FrameBuilder {
    pub fn new(
        action_id: impl Into<String>,
        agent_id: impl Into<String>,
        risk_tier: RiskTier,
        sdc_version: impl Into<String>,
    ) -> Self {
        Self {
            action_id: action_id.into(),
            agent_id: agent_id.into(),
            risk_tier,
            sdc_version: sdc_version.into(),
            human_confirmation: false,
            extensions: BTreeMap::new(),
        }
    }

    pub fn human_confirmation(mut self, confirmed: bool) -> Self {
        self.human_confirmation = confirmed;
        self
    }

    pub fn extension(mut self, key: impl Into<String>, value: impl Into<ExtensionValue>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    /// Build the frame stamped with the current time
    pub fn build(self) -> CanonicalActionFrame {
        self.build_at(Utc::now())
    }

    /// Build the frame stamped with an explicit time
    pub fn build_at(self, at: DateTime<Utc>) -> CanonicalActionFrame {
        CanonicalActionFrame {
            action_id: self.action_id,
            agent_id: self.agent_id,
            risk_tier: self.risk_tier,
            sdc_version: self.sdc_version,
            policy_verdict: false,
            constraints_satisfied: true,
            human_confirmation: self.human_confirmation,
            timestamp_utc: utc_second_stamp(at),
            hash_algorithm: HASH_ALGORITHM.to_string(),
            extensions: self.extensions,
        }
    }
}

/// Content-addressed action id for assistance frames:
/// `assist_` + first 12 hex chars of SHA-256(trace_id || query)
pub fn assistance_action_id(trace_id: &str, query: &str) -> String {
    let digest = sha256_hex(format!("{trace_id}{query}").as_bytes());
    format!("assist_{}", &digest[..12])
}

/// Action id for update frames: `update_` + package id
pub fn update_action_id(package_id: &str) -> String {
    format!("update_{package_id}")
}

/// ISO-8601 UTC stamp at second precision, e.g. `2026-08-02T09:30:00Z`
pub(crate) fn utc_second_stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn frame_with_extensions(pairs: &[(&str, ExtensionValue)]) -> CanonicalActionFrame {
        let mut builder = FrameBuilder::new("act-1", "sat-1", RiskTier::T1Standard, "sdc-1");
        for (key, value) in pairs {
            builder = builder.extension(*key, value.clone());
        }
        builder.build_at("2026-08-02T09:30:00Z".parse().unwrap())
    }

    #[test]
    fn extension_insertion_order_does_not_change_the_hash() {
        let forward = frame_with_extensions(&[
            ("channel", ExtensionValue::from("SKILL_CAPSULE")),
            ("version", ExtensionValue::from("1.2.0")),
            ("signer", ExtensionValue::from("key-9")),
        ]);
        let reverse = frame_with_extensions(&[
            ("signer", ExtensionValue::from("key-9")),
            ("version", ExtensionValue::from("1.2.0")),
            ("channel", ExtensionValue::from("SKILL_CAPSULE")),
        ]);
        assert_eq!(forward.canonical_string().unwrap(), reverse.canonical_string().unwrap());
        assert_eq!(forward.canonical_hash().unwrap(), reverse.canonical_hash().unwrap());
    }

    #[test]
    fn empty_extensions_serialize_like_absent_extensions() {
        let frame = frame_with_extensions(&[]);
        let canonical = frame.canonical_string().unwrap();
        assert!(!canonical.contains("extensions"));
    }

    #[test]
    fn assistance_action_ids_are_content_addressed() {
        let a = assistance_action_id("trace-1", "how do I rotate keys");
        let b = assistance_action_id("trace-1", "how do I rotate keys");
        let c = assistance_action_id("trace-2", "how do I rotate keys");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("assist_"));
        assert_eq!(a.len(), "assist_".len() + 12);
    }

    #[test]
    fn update_action_id_embeds_the_package_id() {
        assert_eq!(update_action_id("pkg-42"), "update_pkg-42");
    }

    #[test]
    fn timestamp_is_second_precision_utc() {
        let frame = frame_with_extensions(&[]);
        assert_eq!(frame.timestamp_utc, "2026-08-02T09:30:00Z");
    }

    fn tier() -> impl Strategy<Value = RiskTier> {
        prop_oneof![
            Just(RiskTier::T0Low),
            Just(RiskTier::T1Standard),
            Just(RiskTier::T2HighStakes),
            Just(RiskTier::T3Regulated),
        ]
    }

    proptest! {
        /// Property: any scalar field difference changes the hash.
        #[test]
        fn prop_distinct_frames_hash_differently(
            action_a in "[a-z0-9-]{4,16}",
            action_b in "[a-z0-9-]{4,16}",
            tier_a in tier(),
            tier_b in tier(),
        ) {
            let a = FrameBuilder::new(action_a.clone(), "sat-1", tier_a, "sdc-1")
                .build_at("2026-08-02T09:30:00Z".parse().unwrap());
            let b = FrameBuilder::new(action_b.clone(), "sat-1", tier_b, "sdc-1")
                .build_at("2026-08-02T09:30:00Z".parse().unwrap());

            if action_a != action_b || tier_a != tier_b {
                prop_assert_ne!(a.canonical_hash().unwrap(), b.canonical_hash().unwrap());
            } else {
                prop_assert_eq!(a.canonical_hash().unwrap(), b.canonical_hash().unwrap());
            }
        }

        /// Property: hashing is byte-stable for the same frame.
        #[test]
        fn prop_hash_is_stable(action in "[a-z0-9-]{4,16}", tier in tier()) {
            let frame = FrameBuilder::new(action, "sat-1", tier, "sdc-1")
                .build_at("2026-08-02T09:30:00Z".parse().unwrap());
            prop_assert_eq!(frame.canonical_hash().unwrap(), frame.canonical_hash().unwrap());
        }
    }
}
