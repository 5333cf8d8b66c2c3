// ═══════════════════════════════════════════════════════════════════
// STATS MONITOR — assinatura ao vivo da coleção `users`
// ═══════════════════════════════════════════════════════════════════
//
// Mesmo padrão dos outros jobs: uma task tokio em background.
// Diferente deles, não roda por intervalo: cada snapshot do store
// recalcula os contadores e publica num canal `watch`.
// A assinatura é liberada em `stop()` ou quando o monitor é dropado.

use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::models::UserStats;
use crate::store::UserStore;

/// Latest counters plus subscription health
#[derive(Debug, Clone, Default, PartialEq, Serialize, utoipa::ToSchema)]
pub struct StatsState {
    #[serde(flatten)]
    pub stats: UserStats,
    /// `true` while the subscription is delivering snapshots
    pub live: bool,
    pub error: Option<String>,
    /// Unix timestamp of the last snapshot
    pub updated_at: Option<i64>,
}

pub struct StatsMonitor {
    state: watch::Receiver<StatsState>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl StatsMonitor {
    /// Subscribes and starts recomputing. A failed subscription is reported
    /// through `current().error`, not retried.
    pub async fn start(store: Arc<dyn UserStore>) -> Self {
        let (tx, state) = watch::channel(StatsState::default());
        let (shutdown, shutdown_rx) = oneshot::channel();

        log::info!("📊 Starting stats monitor on {} store", store.backend());
        let handle = tokio::spawn(run(store, tx, shutdown_rx));

        Self {
            state,
            shutdown: Some(shutdown),
            handle: Some(handle),
        }
    }

    pub fn current(&self) -> StatsState {
        self.state.borrow().clone()
    }

    /// Receiver that sees every new value; ends when the monitor stops
    pub fn watch(&self) -> watch::Receiver<StatsState> {
        self.state.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Ends the subscription and waits for the task to exit
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                log::warn!("⚠️  Stats monitor task ended abnormally: {}", e);
            }
        }
        log::info!("📊 Stats monitor stopped");
    }
}

impl Drop for StatsMonitor {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run(store: Arc<dyn UserStore>, tx: watch::Sender<StatsState>, mut shutdown: oneshot::Receiver<()>) {
    let mut snapshots = match store.subscribe().await {
        Ok(snapshots) => snapshots,
        Err(e) => {
            log::error!("❌ Stats subscription failed: {}", e);
            tx.send_modify(|state| {
                state.live = false;
                state.error = Some(e.public_message());
            });
            return;
        }
    };

    let mut snapshot_count: u64 = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            next = snapshots.next() => match next {
                Some(Ok(docs)) => {
                    snapshot_count += 1;
                    let stats = UserStats::tally_raw(docs.iter().map(|doc| doc.data.get_str("status").ok()));
                    log::debug!(
                        "📊 Snapshot #{}: {} total, {} active, {} pending",
                        snapshot_count, stats.total, stats.active, stats.pending
                    );
                    tx.send_replace(StatsState {
                        stats,
                        live: true,
                        error: None,
                        updated_at: Some(chrono::Utc::now().timestamp()),
                    });
                }
                Some(Err(e)) => {
                    log::error!("❌ Stats subscription error after {} snapshots: {}", snapshot_count, e);
                    tx.send_modify(|state| {
                        state.live = false;
                        state.error = Some(e.public_message());
                    });
                    break;
                }
                None => {
                    log::warn!("⚠️  Stats subscription closed by the store");
                    tx.send_modify(|state| state.live = false);
                    break;
                }
            }
        }
    }
}
