//! ACIP Probe - one-command kernel smoke probe
//!
//! Boots a capability kernel against in-memory storage with permissive
//! loopback collaborators, optionally drives one governed federation call,
//! and prints the persisted state and pipeline trace as JSON.
//!
//! ```bash
//! # Boot and probe with defaults
//! acip-probe
//!
//! # Pick the agent and risk tier
//! acip-probe --agent-id sat-7 --risk-tier T3_REGULATED
//!
//! # Boot only, no federation call
//! acip-probe --skip-call
//! ```

use std::collections::BTreeSet;

use clap::Parser;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use acip_capabilities::CapabilityManifest;
use acip_kernel::{
    CapabilityKernel, FederationCall, KernelConfig, LoopbackAttestor, LoopbackBroker,
    LoopbackFederation, MemoryStorage, PermissiveGate,
};
use acip_types::{AssistanceRoute, RiskTier, UpdateChannel};

/// ACIP Probe - federated capability kernel smoke probe
#[derive(Parser, Debug)]
#[command(name = "acip-probe", about = "Boot an ACIP capability kernel and drive one governed call", version)]
struct Args {
    /// Agent to boot the kernel for
    #[arg(long, default_value = "satellite-1", env = "ACIP_AGENT_ID")]
    agent_id: String,

    /// Risk tier of the probe call
    #[arg(long, default_value = "T1_STANDARD", env = "ACIP_RISK_TIER")]
    risk_tier: RiskTier,

    /// Boot only; skip the governed federation call
    #[arg(long, default_value = "false")]
    skip_call: bool,
}

fn probe_manifest(agent_id: &str) -> CapabilityManifest {
    let mut manifest = CapabilityManifest::baseline(agent_id, "sdc-probe");
    manifest.federation.enabled = true;
    manifest.federation.sources.insert("loopback".to_string());
    manifest.federation.allowed_operations.insert("PING".to_string());
    manifest.assistance.enabled = true;
    manifest.assistance.routes = BTreeSet::from([
        AssistanceRoute::Federation,
        AssistanceRoute::HumanEscalation,
        AssistanceRoute::PeerAgent,
    ]);
    manifest.updates.enabled = true;
    manifest.updates.require_signature = false;
    manifest.updates.allowed_channels =
        BTreeSet::from([UpdateChannel::SkillCapsule, UpdateChannel::ConfigBundle]);
    manifest
        .governance
        .dvap_required_for_risk_tiers
        .extend([RiskTier::T2HighStakes, RiskTier::T3Regulated]);
    manifest
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("acip_probe=info,acip_kernel=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    tracing::info!(agent_id = %args.agent_id, "booting capability kernel");

    let mut kernel = CapabilityKernel::new(KernelConfig {
        agent_id: args.agent_id.clone(),
        governance: Box::new(PermissiveGate),
        attestation: Box::new(LoopbackAttestor),
        federation: Box::new(LoopbackFederation),
        assistance: Box::new(LoopbackBroker),
        storage: Box::new(MemoryStorage::new()),
        trace_max_entries: Some(256),
    });

    let generation = kernel.boot(probe_manifest(&args.agent_id)).await?;
    tracing::info!(generation, "kernel booted");

    if !args.skip_call {
        let outcome = kernel
            .governed_federation_call(FederationCall {
                operation: "PING".to_string(),
                payload: json!({"q": "hi"}),
                risk_tier: args.risk_tier,
                trace_id: None,
            })
            .await?;
        tracing::info!(
            input_frame_hash = %outcome.input_frame_hash,
            uva_hash = ?outcome.uva_hash,
            "governed call cleared"
        );
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "result": outcome.result,
                "source": outcome.source,
                "input_frame_hash": outcome.input_frame_hash,
                "uva_hash": outcome.uva_hash,
            }))?
        );
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "state": kernel.state(),
            "trace": kernel.trace(),
        }))?
    );

    Ok(())
}
