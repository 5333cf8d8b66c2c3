use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::jobs::{StatsMonitor, StatsState};
use crate::store::UserStore;
use crate::views::UserListView;

/// Everything the handlers share
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn UserStore>,
    pub users: UserListView,
    /// `None` once unmounted
    pub stats: Mutex<Option<StatsMonitor>>,
}

impl AppState {
    /// Mounts the dashboard: first load of the user list and the live counters
    pub async fn mount(config: AppConfig, store: Arc<dyn UserStore>) -> Self {
        let users = UserListView::new(Arc::clone(&store));
        if let Err(e) = users.load().await {
            log::warn!("⚠️  Initial users load failed, waiting for a manual reload: {}", e);
        }

        let stats = StatsMonitor::start(Arc::clone(&store)).await;

        Self {
            config,
            store,
            users,
            stats: Mutex::new(Some(stats)),
        }
    }

    /// Replaces the stats subscription with a fresh one
    pub async fn restart_stats(&self) {
        let fresh = StatsMonitor::start(Arc::clone(&self.store)).await;
        let previous = self.stats.lock().await.replace(fresh);
        if let Some(previous) = previous {
            previous.stop().await;
        }
    }

    pub async fn stats_snapshot(&self) -> StatsState {
        match self.stats.lock().await.as_ref() {
            Some(monitor) => monitor.current(),
            None => StatsState::default(),
        }
    }

    /// Tears down the views; late responses and subscription callbacks are dropped
    pub async fn unmount(&self) {
        self.users.unmount();
        let previous = self.stats.lock().await.take();
        if let Some(previous) = previous {
            previous.stop().await;
        }
    }
}
