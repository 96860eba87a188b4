//! Kernel pipeline trace for audit and replay inspection
//!
//! Observational only: the trace holds no authoritative state and never
//! feeds back into a verdict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceStage {
    ManifestGate,
    Frame,
    Governance,
    Attestation,
    Effect,
    Persist,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub timestamp: DateTime<Utc>,
    pub stage: TraceStage,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelTrace {
    pub agent_id: String,
    pub created_at: DateTime<Utc>,
    pub events: Vec<TraceEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,
}

impl KernelTrace {
    pub fn new(agent_id: impl Into<String>, max_entries: Option<usize>) -> Self {
        Self {
            agent_id: agent_id.into(),
            created_at: Utc::now(),
            events: Vec::new(),
            max_entries,
        }
    }

    pub fn record(
        &mut self,
        stage: TraceStage,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) {
        self.events.push(TraceEvent {
            timestamp: Utc::now(),
            stage,
            message: message.into(),
            data,
        });
        if let Some(max) = self.max_entries {
            if self.events.len() > max {
                let overflow = self.events.len() - max;
                self.events.drain(0..overflow);
            }
        }
    }

    /// Count of recorded events at a given stage
    pub fn stage_count(&self, stage: TraceStage) -> usize {
        self.events.iter().filter(|e| e.stage == stage).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_is_bounded() {
        let mut trace = KernelTrace::new("sat-1", Some(3));
        for i in 0..5 {
            trace.record(TraceStage::Frame, format!("event {i}"), None);
        }
        assert_eq!(trace.events.len(), 3);
        assert_eq!(trace.events[0].message, "event 2");
    }

    #[test]
    fn stage_count_filters_by_stage() {
        let mut trace = KernelTrace::new("sat-1", None);
        trace.record(TraceStage::Governance, "evaluated", None);
        trace.record(TraceStage::Effect, "dispatched", None);
        trace.record(TraceStage::Governance, "evaluated", None);
        assert_eq!(trace.stage_count(TraceStage::Governance), 2);
        assert_eq!(trace.stage_count(TraceStage::Attestation), 0);
    }
}
