//! ACIP Federated Capability Kernel - policy-gated execution core
//!
//! One kernel per satellite agent. Every outbound action (federation call,
//! assistance request, update installation) runs the same pipeline: manifest
//! gate, canonical frame, governance evaluation, conditional attestation,
//! effect. Only the effect differs. The kernel owns the agent's persisted
//! state and records every pipeline stage into an audit trace.
//!
//! # Key Principle
//!
//! The kernel decides nothing on its own authority. Policy, attestation,
//! transport, assistance routing, and storage are collaborators behind
//! narrow contracts; the kernel's job is to make sure no effect happens
//! before the gates have spoken, and that what happened is hashable.

pub mod assistance;
pub mod attestation;
pub mod error;
pub mod federation;
pub mod frame;
pub mod governance;
pub mod kernel;
pub mod state;
pub mod storage;
pub mod trace;

pub use assistance::{AssistanceBroker, AssistanceBrokerError, AssistanceReply, AssistanceRequest, LoopbackBroker};
pub use attestation::{AttestationClient, AttestationDecision, AttestationVerdict, LoopbackAttestor};
pub use error::{KernelError, Result};
pub use federation::{FederationClient, FederationClientError, FederationReply, FederationRequest, LoopbackFederation};
pub use frame::{assistance_action_id, update_action_id, CanonicalActionFrame, FrameBuilder, HASH_ALGORITHM};
pub use governance::{GovernanceDecision, GovernanceGate, GovernanceVerdict, PermissiveGate};
pub use kernel::{
    ApplyBundleResult, AssistanceCall, AssistanceOutcome, CapabilityKernel, FederationCall,
    FederationOutcome, KernelConfig, UpdateOutcome,
};
pub use state::{state_key, PersistedKernelState, STATE_KEY_PREFIX};
pub use storage::{MemoryStorage, StorageAdapter, StorageError};
pub use trace::{KernelTrace, TraceEvent, TraceStage};
