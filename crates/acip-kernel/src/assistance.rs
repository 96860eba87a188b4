//! Assistance broker contract
//!
//! Routes a help request to the federation, a peer agent, or human
//! escalation. Which routes are open is declared in the manifest; the
//! broker reports the route it actually used.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use acip_types::{AssistanceRoute, RiskTier};

/// A help request on behalf of the satellite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistanceRequest {
    pub trace_id: String,
    pub agent_id: String,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    pub risk_tier: RiskTier,
}

/// Successful assistance response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistanceReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_used: Option<AssistanceRoute>,
}

#[derive(Error, Debug, Clone)]
pub enum AssistanceBrokerError {
    #[error("{0}")]
    Failed(String),
}

#[async_trait]
pub trait AssistanceBroker: Send + Sync {
    async fn request_assistance(
        &self,
        request: AssistanceRequest,
    ) -> Result<AssistanceReply, AssistanceBrokerError>;
}

/// Broker that acknowledges every request over the federation route.
/// For tests and local probes only.
#[derive(Debug, Default, Clone)]
pub struct LoopbackBroker;

#[async_trait]
impl AssistanceBroker for LoopbackBroker {
    async fn request_assistance(
        &self,
        request: AssistanceRequest,
    ) -> Result<AssistanceReply, AssistanceBrokerError> {
        Ok(AssistanceReply {
            response: Some(serde_json::json!({"ack": request.query})),
            route_used: Some(AssistanceRoute::Federation),
        })
    }
}
