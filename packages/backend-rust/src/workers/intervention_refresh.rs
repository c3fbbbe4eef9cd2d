use std::time::Instant;

use tracing::debug;

use crate::services::{intervention, now_ms};
use crate::state::AppState;
use crate::workers::WorkerError;

/// Rebuild the cached intervention ranking off the async runtime
pub async fn run(state: AppState) -> Result<(), WorkerError> {
    let started = Instant::now();
    let students =
        tokio::task::spawn_blocking(move || intervention::refresh_snapshot(&state, now_ms()))
            .await?;
    debug!(
        students,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "intervention refresh finished"
    );
    Ok(())
}
