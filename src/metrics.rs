use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Write and query counters for `/metrics`.
#[derive(Clone)]
pub struct Metrics {
    pub regions_created: Arc<AtomicU64>,
    pub regions_updated: Arc<AtomicU64>,
    pub regions_deleted: Arc<AtomicU64>,
    pub walks_created: Arc<AtomicU64>,
    pub walks_updated: Arc<AtomicU64>,
    pub walks_deleted: Arc<AtomicU64>,
    pub walk_list_queries: Arc<AtomicU64>,
    pub images_uploaded: Arc<AtomicU64>,
    pub image_bytes_uploaded: Arc<AtomicU64>,
    pub start_time: Instant,
}

fn counter() -> Arc<AtomicU64> {
    Arc::new(AtomicU64::new(0))
}

fn bump(c: &AtomicU64) {
    c.fetch_add(1, Ordering::Relaxed);
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            regions_created: counter(),
            regions_updated: counter(),
            regions_deleted: counter(),
            walks_created: counter(),
            walks_updated: counter(),
            walks_deleted: counter(),
            walk_list_queries: counter(),
            images_uploaded: counter(),
            image_bytes_uploaded: counter(),
            start_time: Instant::now(),
        }
    }

    pub fn inc_regions_created(&self) {
        bump(&self.regions_created);
    }

    pub fn inc_regions_updated(&self) {
        bump(&self.regions_updated);
    }

    pub fn inc_regions_deleted(&self) {
        bump(&self.regions_deleted);
    }

    pub fn inc_walks_created(&self) {
        bump(&self.walks_created);
    }

    pub fn inc_walks_updated(&self) {
        bump(&self.walks_updated);
    }

    pub fn inc_walks_deleted(&self) {
        bump(&self.walks_deleted);
    }

    pub fn inc_walk_list_queries(&self) {
        bump(&self.walk_list_queries);
    }

    pub fn record_upload(&self, bytes: u64) {
        bump(&self.images_uploaded);
        self.image_bytes_uploaded.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            regions_created: load(&self.regions_created),
            regions_updated: load(&self.regions_updated),
            regions_deleted: load(&self.regions_deleted),
            walks_created: load(&self.walks_created),
            walks_updated: load(&self.walks_updated),
            walks_deleted: load(&self.walks_deleted),
            walk_list_queries: load(&self.walk_list_queries),
            images_uploaded: load(&self.images_uploaded),
            image_bytes_uploaded: load(&self.image_bytes_uploaded),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub regions_created: u64,
    pub regions_updated: u64,
    pub regions_deleted: u64,
    pub walks_created: u64,
    pub walks_updated: u64,
    pub walks_deleted: u64,
    pub walk_list_queries: u64,
    pub images_uploaded: u64,
    pub image_bytes_uploaded: u64,
    pub uptime_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_counters() {
        let m = Metrics::new();
        let clone = m.clone();
        clone.inc_walks_created();
        clone.record_upload(2048);
        m.inc_walk_list_queries();

        let snap = m.get_snapshot();
        assert_eq!(snap.walks_created, 1);
        assert_eq!(snap.images_uploaded, 1);
        assert_eq!(snap.image_bytes_uploaded, 2048);
        assert_eq!(snap.walk_list_queries, 1);
        assert_eq!(snap.regions_deleted, 0);
    }
}
