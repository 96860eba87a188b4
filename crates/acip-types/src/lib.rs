//! ACIP shared types - the vocabulary of the satellite kernel
//!
//! Wire tags are fixed literals; every enum here serializes to the exact
//! tag the federation expects and parses back from it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised when a wire tag does not match any known variant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} tag: {value}")]
pub struct ParseTagError {
    pub kind: &'static str,
    pub value: String,
}

/// Risk tier of an action. Tiers are tags, not a scale: the kernel only
/// ever tests membership in manifest-declared sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    #[serde(rename = "T0_LOW")]
    T0Low,
    #[serde(rename = "T1_STANDARD")]
    T1Standard,
    #[serde(rename = "T2_HIGH_STAKES")]
    T2HighStakes,
    #[serde(rename = "T3_REGULATED")]
    T3Regulated,
}

impl RiskTier {
    pub fn as_tag(&self) -> &'static str {
        match self {
            RiskTier::T0Low => "T0_LOW",
            RiskTier::T1Standard => "T1_STANDARD",
            RiskTier::T2HighStakes => "T2_HIGH_STAKES",
            RiskTier::T3Regulated => "T3_REGULATED",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for RiskTier {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "T0_LOW" => Ok(RiskTier::T0Low),
            "T1_STANDARD" => Ok(RiskTier::T1Standard),
            "T2_HIGH_STAKES" => Ok(RiskTier::T2HighStakes),
            "T3_REGULATED" => Ok(RiskTier::T3Regulated),
            other => Err(ParseTagError {
                kind: "risk tier",
                value: other.to_string(),
            }),
        }
    }
}

/// Route an assistance request may take out of the satellite
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AssistanceRoute {
    #[serde(rename = "FEDERATION")]
    Federation,
    #[serde(rename = "HUMAN_ESCALATION")]
    HumanEscalation,
    #[serde(rename = "PEER_AGENT")]
    PeerAgent,
}

impl AssistanceRoute {
    pub fn as_tag(&self) -> &'static str {
        match self {
            AssistanceRoute::Federation => "FEDERATION",
            AssistanceRoute::HumanEscalation => "HUMAN_ESCALATION",
            AssistanceRoute::PeerAgent => "PEER_AGENT",
        }
    }
}

impl fmt::Display for AssistanceRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for AssistanceRoute {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FEDERATION" => Ok(AssistanceRoute::Federation),
            "HUMAN_ESCALATION" => Ok(AssistanceRoute::HumanEscalation),
            "PEER_AGENT" => Ok(AssistanceRoute::PeerAgent),
            other => Err(ParseTagError {
                kind: "assistance route",
                value: other.to_string(),
            }),
        }
    }
}

/// Update delivery channel. Both channels carry opaque data; the kernel
/// never interprets payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UpdateChannel {
    #[serde(rename = "SKILL_CAPSULE")]
    SkillCapsule,
    #[serde(rename = "CONFIG_BUNDLE")]
    ConfigBundle,
}

impl UpdateChannel {
    pub fn as_tag(&self) -> &'static str {
        match self {
            UpdateChannel::SkillCapsule => "SKILL_CAPSULE",
            UpdateChannel::ConfigBundle => "CONFIG_BUNDLE",
        }
    }
}

impl fmt::Display for UpdateChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for UpdateChannel {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SKILL_CAPSULE" => Ok(UpdateChannel::SkillCapsule),
            "CONFIG_BUNDLE" => Ok(UpdateChannel::ConfigBundle),
            other => Err(ParseTagError {
                kind: "update channel",
                value: other.to_string(),
            }),
        }
    }
}

/// A scalar value allowed inside frame extensions. Floats are
/// unrepresentable, which keeps every frame canonically hashable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtensionValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<bool> for ExtensionValue {
    fn from(value: bool) -> Self {
        ExtensionValue::Bool(value)
    }
}

impl From<i64> for ExtensionValue {
    fn from(value: i64) -> Self {
        ExtensionValue::Int(value)
    }
}

impl From<String> for ExtensionValue {
    fn from(value: String) -> Self {
        ExtensionValue::Str(value)
    }
}

impl From<&str> for ExtensionValue {
    fn from(value: &str) -> Self {
        ExtensionValue::Str(value.to_string())
    }
}

/// A data-only update bundle. `payload_b64` is opaque to the kernel and
/// handed verbatim to the injected applier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePackage {
    pub package_id: String,
    pub channel: UpdateChannel,
    pub version: String,
    pub created_utc: DateTime<Utc>,
    pub payload_b64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_b64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_tier_wire_tags_round_trip() {
        for tier in [
            RiskTier::T0Low,
            RiskTier::T1Standard,
            RiskTier::T2HighStakes,
            RiskTier::T3Regulated,
        ] {
            let json = serde_json::to_string(&tier).unwrap();
            assert_eq!(json, format!("\"{}\"", tier.as_tag()));
            let back: RiskTier = serde_json::from_str(&json).unwrap();
            assert_eq!(back, tier);
            assert_eq!(tier.as_tag().parse::<RiskTier>().unwrap(), tier);
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = "T9_IMAGINARY".parse::<RiskTier>().unwrap_err();
        assert_eq!(err.value, "T9_IMAGINARY");
        assert!("DIAL_A_FRIEND".parse::<AssistanceRoute>().is_err());
        assert!("FIRMWARE".parse::<UpdateChannel>().is_err());
    }

    #[test]
    fn extension_value_serializes_as_bare_scalar() {
        assert_eq!(
            serde_json::to_string(&ExtensionValue::from("capsule")).unwrap(),
            "\"capsule\""
        );
        assert_eq!(serde_json::to_string(&ExtensionValue::from(7i64)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&ExtensionValue::from(true)).unwrap(), "true");
    }

    #[test]
    fn update_package_rejects_unknown_fields() {
        let raw = r#"{
            "package_id": "pkg-1",
            "channel": "SKILL_CAPSULE",
            "version": "1.2.0",
            "created_utc": "2026-08-01T00:00:00Z",
            "payload_b64": "AAAA",
            "self_destruct": true
        }"#;
        assert!(serde_json::from_str::<UpdatePackage>(raw).is_err());
    }
}
