//! Federation client contract
//!
//! Transport-agnostic execution of a remote operation after the kernel has
//! cleared it. The kernel guarantees the request's risk tier matches the
//! frame it judged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use acip_types::RiskTier;

/// A cleared operation handed to the federation transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationRequest {
    pub trace_id: String,
    pub agent_id: String,
    pub operation: String,
    pub payload: serde_json::Value,
    pub risk_tier: RiskTier,
}

/// Successful federation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationReply {
    pub result: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Error, Debug, Clone)]
pub enum FederationClientError {
    #[error("{0}")]
    Failed(String),
}

#[async_trait]
pub trait FederationClient: Send + Sync {
    async fn request(
        &self,
        request: FederationRequest,
    ) -> Result<FederationReply, FederationClientError>;
}

/// Client that echoes the payload back. For tests and local probes only.
#[derive(Debug, Default, Clone)]
pub struct LoopbackFederation;

#[async_trait]
impl FederationClient for LoopbackFederation {
    async fn request(
        &self,
        request: FederationRequest,
    ) -> Result<FederationReply, FederationClientError> {
        Ok(FederationReply {
            result: serde_json::json!({
                "echo": request.payload,
                "operation": request.operation,
            }),
            source: Some("loopback".to_string()),
        })
    }
}
