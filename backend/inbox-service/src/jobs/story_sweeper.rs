//! Story expiry sweeper.
//!
//! Periodically deactivates stories whose expiry has passed. The sweep is
//! an idempotent bulk transition, so the cadence is free to vary and an
//! external scheduler hitting the sweep endpoint in parallel is harmless.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::sleep;

use crate::services::story_service::StoryService;
use crate::store::EntityStore;

pub async fn start_story_sweeper(store: Arc<dyn EntityStore>, interval: Duration) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        "starting story expiry sweeper"
    );

    loop {
        sleep(interval).await;

        let cycle_start = Instant::now();
        match StoryService::sweep_expired(store.as_ref()).await {
            Ok(swept) => {
                tracing::debug!(
                    swept,
                    duration_ms = cycle_start.elapsed().as_millis() as u64,
                    "story sweep cycle completed"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "story sweep cycle failed");
            }
        }
    }
}
