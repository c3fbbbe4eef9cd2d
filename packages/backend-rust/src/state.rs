use std::sync::Arc;
use std::time::{Instant, SystemTime};

use mastery_algo::{InterventionReport, InterventionScorer, PathSequencer};
use parking_lot::RwLock;

use crate::config::PolicyConfig;
use crate::store::MemoryStore;

/// Latest ranking produced by the refresh worker
#[derive(Debug, Clone)]
pub struct InterventionSnapshot {
    pub report: InterventionReport,
    pub refreshed_at: Instant,
}

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    store: Arc<MemoryStore>,
    policy: Arc<PolicyConfig>,
    sequencer: PathSequencer,
    scorer: Arc<InterventionScorer>,
    snapshot: Arc<RwLock<Option<InterventionSnapshot>>>,
}

impl AppState {
    pub fn new(policy: PolicyConfig) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            store: Arc::new(MemoryStore::new()),
            sequencer: PathSequencer::new(policy.mastery),
            scorer: Arc::new(InterventionScorer::new(policy.intervention.clone())),
            policy: Arc::new(policy),
            snapshot: Arc::new(RwLock::new(None)),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn sequencer(&self) -> &PathSequencer {
        &self.sequencer
    }

    pub fn scorer(&self) -> &InterventionScorer {
        &self.scorer
    }

    pub fn snapshot(&self) -> Option<InterventionSnapshot> {
        self.snapshot.read().clone()
    }

    pub fn set_snapshot(&self, report: InterventionReport) {
        *self.snapshot.write() = Some(InterventionSnapshot {
            report,
            refreshed_at: Instant::now(),
        });
    }
}
