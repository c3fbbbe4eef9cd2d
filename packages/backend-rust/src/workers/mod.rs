mod intervention_refresh;

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{broadcast, Mutex};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::state::AppState;

pub struct WorkerManager {
    scheduler: Mutex<JobScheduler>,
    shutdown_tx: broadcast::Sender<()>,
    state: AppState,
    running: AtomicBool,
}

impl WorkerManager {
    pub async fn new(state: AppState) -> Result<Self, WorkerError> {
        let scheduler = JobScheduler::new().await.map_err(WorkerError::Scheduler)?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            shutdown_tx,
            state,
            running: AtomicBool::new(false),
        })
    }

    pub async fn start(&self) -> Result<(), WorkerError> {
        let policy = self.state.policy();
        if !policy.intervention_worker_enabled {
            info!("ENABLE_INTERVENTION_WORKER is off, skipping worker startup");
            return Ok(());
        }

        let scheduler = self.scheduler.lock().await;

        let schedule = policy.intervention_schedule.clone();
        let state = self.state.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();
        let job = Job::new_async(schedule.as_str(), move |_uuid, _lock| {
            let state = state.clone();
            let mut rx = shutdown_rx.resubscribe();
            Box::pin(async move {
                tokio::select! {
                    _ = rx.recv() => {},
                    result = intervention_refresh::run(state) => {
                        if let Err(e) = result {
                            error!(error = %e, "Intervention refresh worker error");
                        }
                    }
                }
            })
        })
        .map_err(WorkerError::Scheduler)?;
        scheduler.add(job).await.map_err(WorkerError::Scheduler)?;
        info!(schedule = %schedule, "Intervention refresh worker scheduled");

        scheduler.start().await.map_err(WorkerError::Scheduler)?;
        self.running.store(true, Ordering::Relaxed);

        // Serve the urgent view from a warm snapshot right away.
        if let Err(e) = intervention_refresh::run(self.state.clone()).await {
            warn!(error = %e, "Initial intervention refresh failed");
        }

        info!("All workers started");
        Ok(())
    }

    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::Relaxed) {
            return;
        }

        info!("Stopping workers...");
        let _ = self.shutdown_tx.send(());

        let mut scheduler = self.scheduler.lock().await;
        if let Err(e) = scheduler.shutdown().await {
            warn!(error = %e, "Error shutting down scheduler");
        }
        info!("Workers stopped");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
