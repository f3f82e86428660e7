//! Application state for the prediction server
//!
//! Built once at startup and shared read-only by every handler.

use std::sync::Arc;
use std::time::Instant;

use iris_lifecycle::inference::PredictionService;

/// Shared application state
pub struct AppState {
    pub service: PredictionService,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(service: PredictionService) -> Self {
        Self {
            service,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub type SharedState = Arc<AppState>;
