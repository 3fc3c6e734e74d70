//! Worker liveness (§C.2): consumed by an external HTTP façade, not served
//! here. Each spawned worker's `JoinHandle` is registered once; a
//! background sweep polls `is_finished()` and timestamps the last sweep
//! that found it alive. A dead worker's `alive` flag never recovers — the
//! process is expected to be restarted, not self-heal a worker.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::error;

#[derive(Debug, Clone, Serialize)]
pub struct WorkerHealth {
    pub alive: bool,
    pub last_checked_unix_sec: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub workers: HashMap<String, WorkerHealth>,
}

#[derive(Default)]
pub struct HealthRegistry {
    handles: DashMap<String, JoinHandle<()>>,
    status: DashMap<String, WorkerHealth>,
}

impl HealthRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, name: impl Into<String>, handle: JoinHandle<()>) {
        let name = name.into();
        self.status.insert(name.clone(), WorkerHealth { alive: true, last_checked_unix_sec: now_unix_sec() });
        self.handles.insert(name, handle);
    }

    pub fn report(&self) -> HealthReport {
        let workers = self.status.iter().map(|e| (e.key().clone(), e.value().clone())).collect();
        HealthReport { workers }
    }

    /// Sweeps every registered handle every `interval` until `token`
    /// cancels, logging and latching `alive = false` for any that finished.
    pub async fn run(self: Arc<Self>, sweep_interval: Duration, token: CancellationToken) {
        let mut ticker = interval(sweep_interval);
        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = ticker.tick() => self.sweep(),
            }
        }
    }

    fn sweep(&self) {
        let now = now_unix_sec();
        for mut entry in self.handles.iter_mut() {
            let name = entry.key().clone();
            let alive = !entry.value().is_finished();
            if !alive {
                error!(worker = %name, "worker task has exited");
            }
            self.status.insert(name, WorkerHealth { alive, last_checked_unix_sec: now });
        }
    }
}

fn now_unix_sec() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registered_worker_starts_alive() {
        let registry = HealthRegistry::new();
        let handle = tokio::spawn(async { std::future::pending::<()>().await });
        registry.register("poller", handle);
        let report = registry.report();
        assert!(report.workers["poller"].alive);
    }

    #[tokio::test]
    async fn sweep_marks_finished_worker_dead() {
        let registry = HealthRegistry::new();
        let handle = tokio::spawn(async {});
        registry.register("once", handle);
        tokio::task::yield_now().await;
        registry.sweep();
        let report = registry.report();
        assert!(!report.workers["once"].alive);
    }
}
