/// Shared application state
///
/// The file server hit counter lives here, passed explicitly through
/// `web::Data` rather than as a global. Atomic so concurrent request
/// handlers can bump it without locking.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct AppMetrics {
    hits: AtomicU64,
}

impl AppMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one file server hit.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
    }
}
