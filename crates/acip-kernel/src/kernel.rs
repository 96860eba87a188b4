//! CapabilityKernel core runtime
//!
//! Every entrypoint runs the same pipeline: manifest gate, canonical
//! frame, governance evaluation, conditional attestation, effect. State is
//! persisted only after a successful terminal effect, so cancellation at
//! any earlier suspension point leaves no partial mutation.

use std::collections::BTreeSet;

use serde_json::json;
use uuid::Uuid;

use acip_capabilities::{CapabilityManifest, ManifestError};
use acip_types::{AssistanceRoute, RiskTier, UpdatePackage};

use crate::assistance::{AssistanceBroker, AssistanceRequest};
use crate::attestation::{AttestationClient, AttestationVerdict};
use crate::error::{KernelError, Result};
use crate::federation::{FederationClient, FederationRequest};
use crate::frame::{assistance_action_id, update_action_id, FrameBuilder};
use crate::governance::{GovernanceGate, GovernanceVerdict};
use crate::state::{state_key, PersistedKernelState};
use crate::storage::StorageAdapter;
use crate::trace::{KernelTrace, TraceStage};

/// Result of the injected bundle applier. `Some` replaces the pinned
/// manifest; `None` leaves it as is (the hash is recomputed either way).
pub type ApplyBundleResult = std::result::Result<Option<CapabilityManifest>, String>;

/// Wiring for a kernel instance
pub struct KernelConfig {
    pub agent_id: String,
    pub governance: Box<dyn GovernanceGate>,
    pub attestation: Box<dyn AttestationClient>,
    pub federation: Box<dyn FederationClient>,
    pub assistance: Box<dyn AssistanceBroker>,
    pub storage: Box<dyn StorageAdapter>,
    pub trace_max_entries: Option<usize>,
}

/// A governed remote operation
#[derive(Debug, Clone)]
pub struct FederationCall {
    pub operation: String,
    pub payload: serde_json::Value,
    pub risk_tier: RiskTier,
    /// Correlation id; generated when absent
    pub trace_id: Option<String>,
}

/// Successful governed federation call
#[derive(Debug, Clone)]
pub struct FederationOutcome {
    pub result: serde_json::Value,
    pub source: Option<String>,
    pub input_frame_hash: String,
    pub uva_hash: Option<String>,
}

/// An explicit governed request for help
#[derive(Debug, Clone)]
pub struct AssistanceCall {
    pub trace_id: String,
    pub query: String,
    pub context: Option<serde_json::Value>,
    pub risk_tier: RiskTier,
}

/// Successful governed assistance request
#[derive(Debug, Clone)]
pub struct AssistanceOutcome {
    pub response: Option<serde_json::Value>,
    pub route_used: Option<AssistanceRoute>,
    pub input_frame_hash: String,
    pub uva_hash: Option<String>,
}

/// Successful governed update application
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub package_id: String,
    pub input_frame_hash: String,
    pub uva_hash: Option<String>,
    /// Canonical manifest hash after the apply, durably persisted
    pub manifest_hash: String,
}

/// The per-agent, policy-gated execution core
pub struct CapabilityKernel {
    agent_id: String,
    governance: Box<dyn GovernanceGate>,
    attestation: Box<dyn AttestationClient>,
    federation: Box<dyn FederationClient>,
    assistance: Box<dyn AssistanceBroker>,
    storage: Box<dyn StorageAdapter>,
    state: Option<PersistedKernelState>,
    trace: KernelTrace,
}

impl CapabilityKernel {
    pub fn new(config: KernelConfig) -> Self {
        let trace = KernelTrace::new(&config.agent_id, config.trace_max_entries);
        Self {
            agent_id: config.agent_id,
            governance: config.governance,
            attestation: config.attestation,
            federation: config.federation,
            assistance: config.assistance,
            storage: config.storage,
            state: None,
            trace,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn trace(&self) -> &KernelTrace {
        &self.trace
    }

    /// The pinned manifest. Fails until `boot` has run.
    pub fn manifest(&self) -> Result<&CapabilityManifest> {
        self.state
            .as_ref()
            .map(|s| &s.manifest)
            .ok_or(KernelError::NotBooted)
    }

    pub fn state(&self) -> Option<&PersistedKernelState> {
        self.state.as_ref()
    }

    /// Load or initialize the agent's persisted state. Returns the boot
    /// generation. The counter never decreases; unreadable prior state is
    /// fatal rather than a silent restart at 1.
    pub async fn boot(&mut self, default_manifest: CapabilityManifest) -> Result<u64> {
        let key = state_key(&self.agent_id);

        let state = match self.storage.get(&key).await? {
            None => {
                default_manifest
                    .validate(&self.agent_id)
                    .map_err(manifest_rejection)?;
                let hash = default_manifest.canonical_hash()?;
                PersistedKernelState {
                    manifest: default_manifest,
                    last_boot_utc: crate::frame::utc_second_stamp(chrono::Utc::now()),
                    last_manifest_hash: hash,
                    monotonic_counter: 1,
                }
            }
            Some(raw) => {
                let mut state =
                    PersistedKernelState::parse(&raw).map_err(|e| KernelError::StateCorrupted {
                        agent_id: self.agent_id.clone(),
                        message: e.to_string(),
                    })?;
                if state.manifest.agent_id != self.agent_id {
                    return Err(KernelError::AgentIdMismatch {
                        expected: self.agent_id.clone(),
                        found: state.manifest.agent_id.clone(),
                    });
                }
                state.last_manifest_hash = state.manifest.canonical_hash()?;
                state.last_boot_utc = crate::frame::utc_second_stamp(chrono::Utc::now());
                state.monotonic_counter =
                    state
                        .monotonic_counter
                        .checked_add(1)
                        .ok_or_else(|| KernelError::StateCorrupted {
                            agent_id: self.agent_id.clone(),
                            message: "monotonic counter overflow".to_string(),
                        })?;
                state
            }
        };

        let counter = state.monotonic_counter;
        let canonical = state.canonical_string()?;
        self.storage.set(&key, &canonical).await?;
        self.state = Some(state);
        self.trace.record(
            TraceStage::Persist,
            "kernel booted",
            Some(json!({"monotonic_counter": counter})),
        );
        Ok(counter)
    }

    /// Execute a remote operation through the full pipeline
    pub async fn governed_federation_call(
        &mut self,
        call: FederationCall,
    ) -> Result<FederationOutcome> {
        let state = self.state.as_ref().ok_or(KernelError::NotBooted)?;
        let federation_enabled = state.manifest.federation.enabled;
        let operation_allowed = state
            .manifest
            .federation
            .allowed_operations
            .contains(&call.operation);
        let assistance_enabled = state.manifest.assistance.enabled;
        let dvap_required = state
            .manifest
            .governance
            .dvap_required_for_risk_tiers
            .contains(&call.risk_tier);
        let sdc_version = state.manifest.governance.sdc_version.clone();

        if !federation_enabled {
            self.trace.record(
                TraceStage::ManifestGate,
                "federation disabled",
                None,
            );
            return Err(KernelError::FederationDisabled);
        }
        if !operation_allowed {
            self.trace.record(
                TraceStage::ManifestGate,
                "operation not allowed",
                Some(json!({"operation": call.operation})),
            );
            return Err(KernelError::OperationNotAllowed {
                operation: call.operation,
            });
        }

        let trace_id = call
            .trace_id
            .clone()
            .unwrap_or_else(|| format!("trace_{}", Uuid::new_v4()));
        let action_id = format!("fed_{}", Uuid::new_v4());
        let frame = FrameBuilder::new(action_id, &self.agent_id, call.risk_tier, sdc_version).build();
        self.trace.record(
            TraceStage::Frame,
            "frame built",
            Some(json!({"action_id": frame.action_id})),
        );

        let decision = self.governance.evaluate(&frame).await;
        self.trace.record(
            TraceStage::Governance,
            "governance evaluated",
            Some(json!({"verdict": decision.verdict, "reason": decision.reason})),
        );
        if decision.verdict == GovernanceVerdict::Deny {
            return Err(KernelError::GovernanceDenied {
                reason: decision.reason,
                policy_hash: decision.policy_hash,
            });
        }

        let input_frame_hash = frame.canonical_hash()?;

        let uva_hash = if dvap_required {
            let attestation = self.attestation.attest(&frame).await;
            self.trace.record(
                TraceStage::Attestation,
                "attestation evaluated",
                Some(json!({"verdict": attestation.verdict})),
            );
            if attestation.verdict == AttestationVerdict::Refused {
                return Err(KernelError::AttestationRefused {
                    reason: attestation
                        .reason
                        .unwrap_or_else(|| "refused".to_string()),
                    input_frame_hash,
                });
            }
            attestation.uva_hash
        } else {
            None
        };

        let request = FederationRequest {
            trace_id: trace_id.clone(),
            agent_id: self.agent_id.clone(),
            operation: call.operation.clone(),
            payload: call.payload,
            risk_tier: call.risk_tier,
        };
        match self.federation.request(request).await {
            Ok(reply) => {
                self.trace.record(
                    TraceStage::Effect,
                    "federation call completed",
                    Some(json!({"operation": call.operation, "source": reply.source})),
                );
                Ok(FederationOutcome {
                    result: reply.result,
                    source: reply.source,
                    input_frame_hash,
                    uva_hash,
                })
            }
            Err(err) => {
                let original = err.to_string();
                let route = if assistance_enabled {
                    self.assist_after_failure(&trace_id, &call.operation, &original, call.risk_tier)
                        .await
                } else {
                    None
                };
                let error = match route {
                    Some(route) => format!("{original} | assist:{route}"),
                    None => original,
                };
                self.trace.record(
                    TraceStage::Error,
                    "federation call failed",
                    Some(json!({"operation": call.operation, "error": error})),
                );
                Err(KernelError::FederationFailed {
                    error,
                    input_frame_hash,
                })
            }
        }
    }

    /// Request help through the full pipeline. Assistance frames are
    /// content-addressed by trace id and query.
    pub async fn request_assistance(&mut self, call: AssistanceCall) -> Result<AssistanceOutcome> {
        let state = self.state.as_ref().ok_or(KernelError::NotBooted)?;
        let assistance_enabled = state.manifest.assistance.enabled;
        let dvap_required = state
            .manifest
            .governance
            .dvap_required_for_risk_tiers
            .contains(&call.risk_tier);
        let sdc_version = state.manifest.governance.sdc_version.clone();

        if !assistance_enabled {
            self.trace
                .record(TraceStage::ManifestGate, "assistance disabled", None);
            return Err(KernelError::AssistanceDisabled);
        }

        let action_id = assistance_action_id(&call.trace_id, &call.query);
        let frame = FrameBuilder::new(action_id, &self.agent_id, call.risk_tier, sdc_version).build();
        self.trace.record(
            TraceStage::Frame,
            "frame built",
            Some(json!({"action_id": frame.action_id})),
        );

        let decision = self.governance.evaluate(&frame).await;
        self.trace.record(
            TraceStage::Governance,
            "governance evaluated",
            Some(json!({"verdict": decision.verdict, "reason": decision.reason})),
        );
        if decision.verdict == GovernanceVerdict::Deny {
            return Err(KernelError::GovernanceDenied {
                reason: decision.reason,
                policy_hash: decision.policy_hash,
            });
        }

        let input_frame_hash = frame.canonical_hash()?;

        let uva_hash = if dvap_required {
            let attestation = self.attestation.attest(&frame).await;
            self.trace.record(
                TraceStage::Attestation,
                "attestation evaluated",
                Some(json!({"verdict": attestation.verdict})),
            );
            if attestation.verdict == AttestationVerdict::Refused {
                return Err(KernelError::AttestationRefused {
                    reason: attestation
                        .reason
                        .unwrap_or_else(|| "refused".to_string()),
                    input_frame_hash,
                });
            }
            attestation.uva_hash
        } else {
            None
        };

        let request = AssistanceRequest {
            trace_id: call.trace_id,
            agent_id: self.agent_id.clone(),
            query: call.query,
            context: call.context,
            risk_tier: call.risk_tier,
        };
        match self.assistance.request_assistance(request).await {
            Ok(reply) => {
                self.trace.record(
                    TraceStage::Effect,
                    "assistance routed",
                    Some(json!({"route_used": reply.route_used})),
                );
                Ok(AssistanceOutcome {
                    response: reply.response,
                    route_used: reply.route_used,
                    input_frame_hash,
                    uva_hash,
                })
            }
            Err(err) => {
                let error = err.to_string();
                self.trace.record(
                    TraceStage::Error,
                    "assistance failed",
                    Some(json!({"error": error})),
                );
                Err(KernelError::AssistanceFailed {
                    error,
                    input_frame_hash,
                })
            }
        }
    }

    /// Install a data-only update package. The signature verifier and the
    /// bundle applier are injected: the choice of signature algorithm is
    /// policy, and the kernel never interprets payloads. State is
    /// persisted only after the applier succeeds.
    pub async fn apply_update_package<V, A>(
        &mut self,
        package: UpdatePackage,
        risk_tier: RiskTier,
        verify_signature: V,
        apply_bundle: A,
    ) -> Result<UpdateOutcome>
    where
        V: Fn(&UpdatePackage, &BTreeSet<String>) -> bool,
        A: FnOnce(&UpdatePackage) -> ApplyBundleResult,
    {
        let state = self.state.as_ref().ok_or(KernelError::NotBooted)?;
        let updates = state.manifest.updates.clone();
        let sdc_version = state.manifest.governance.sdc_version.clone();

        if !updates.enabled {
            self.trace
                .record(TraceStage::ManifestGate, "updates disabled", None);
            return Err(KernelError::UpdatesDisabled);
        }
        if !updates.allowed_channels.contains(&package.channel) {
            self.trace.record(
                TraceStage::ManifestGate,
                "update channel not allowed",
                Some(json!({"channel": package.channel})),
            );
            return Err(KernelError::ChannelNotAllowed {
                channel: package.channel,
            });
        }
        if updates.require_signature && !verify_signature(&package, &updates.trusted_signers) {
            self.trace.record(
                TraceStage::ManifestGate,
                "signature rejected",
                Some(json!({"package_id": package.package_id})),
            );
            return Err(KernelError::InvalidSignature);
        }

        let frame = FrameBuilder::new(
            update_action_id(&package.package_id),
            &self.agent_id,
            risk_tier,
            sdc_version,
        )
        .extension("channel", package.channel.as_tag())
        .extension("version", package.version.clone())
        .extension("signer", package.signer_id.clone().unwrap_or_default())
        .build();
        self.trace.record(
            TraceStage::Frame,
            "frame built",
            Some(json!({"action_id": frame.action_id})),
        );

        let decision = self.governance.evaluate(&frame).await;
        self.trace.record(
            TraceStage::Governance,
            "governance evaluated",
            Some(json!({"verdict": decision.verdict, "reason": decision.reason})),
        );
        if decision.verdict == GovernanceVerdict::Deny {
            return Err(KernelError::GovernanceDenied {
                reason: decision.reason,
                policy_hash: decision.policy_hash,
            });
        }

        let input_frame_hash = frame.canonical_hash()?;

        let uva_hash = if updates.require_dvap_for_risk_tiers.contains(&risk_tier) {
            let attestation = self.attestation.attest(&frame).await;
            self.trace.record(
                TraceStage::Attestation,
                "attestation evaluated",
                Some(json!({"verdict": attestation.verdict})),
            );
            if attestation.verdict == AttestationVerdict::Refused {
                return Err(KernelError::AttestationRefused {
                    reason: attestation
                        .reason
                        .unwrap_or_else(|| "refused".to_string()),
                    input_frame_hash,
                });
            }
            attestation.uva_hash
        } else {
            None
        };

        let applied = apply_bundle(&package)
            .map_err(|message| KernelError::UpdateApplyFailed { message })?;
        self.trace.record(
            TraceStage::Effect,
            "bundle applied",
            Some(json!({"package_id": package.package_id})),
        );

        if let Some(manifest) = &applied {
            manifest
                .validate(&self.agent_id)
                .map_err(manifest_rejection)?;
        }

        let key = state_key(&self.agent_id);
        let state = self.state.as_mut().ok_or(KernelError::NotBooted)?;
        if let Some(manifest) = applied {
            state.manifest = manifest;
        }
        state.last_manifest_hash = state.manifest.canonical_hash()?;
        let manifest_hash = state.last_manifest_hash.clone();
        let canonical = state.canonical_string()?;
        self.storage.set(&key, &canonical).await?;
        self.trace.record(
            TraceStage::Persist,
            "state persisted after update",
            Some(json!({"manifest_hash": manifest_hash})),
        );

        Ok(UpdateOutcome {
            package_id: package.package_id,
            input_frame_hash,
            uva_hash,
            manifest_hash,
        })
    }

    /// One bounded assistance attempt after a failed federation call.
    /// Never propagates broker errors; any retry budget beyond this single
    /// attempt belongs to the broker or the caller.
    async fn assist_after_failure(
        &mut self,
        trace_id: &str,
        operation: &str,
        error: &str,
        risk_tier: RiskTier,
    ) -> Option<AssistanceRoute> {
        let request = AssistanceRequest {
            trace_id: trace_id.to_string(),
            agent_id: self.agent_id.clone(),
            query: format!("operation {operation} failed: {error}"),
            context: Some(json!({"operation": operation, "error": error})),
            risk_tier,
        };
        match self.assistance.request_assistance(request).await {
            Ok(reply) => {
                self.trace.record(
                    TraceStage::Effect,
                    "assistance after failure",
                    Some(json!({"route_used": reply.route_used})),
                );
                reply.route_used
            }
            Err(err) => {
                self.trace.record(
                    TraceStage::Error,
                    "assistance attempt failed",
                    Some(json!({"error": err.to_string()})),
                );
                None
            }
        }
    }
}

fn manifest_rejection(err: ManifestError) -> KernelError {
    match err {
        ManifestError::AgentIdMismatch { expected, found } => {
            KernelError::AgentIdMismatch { expected, found }
        }
        other => KernelError::ManifestRejected {
            message: other.to_string(),
        },
    }
}
