use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::user_detail::format_join_date;
use crate::models::{normalize_all, UserRecord, UserStatus};
use crate::store::UserStore;
use crate::utils::{AppError, LOAD_FAILED_MESSAGE};

pub const NO_MATCHES_MESSAGE: &str = "No users found matching your search.";

#[derive(Debug, Clone, PartialEq)]
enum ListState {
    Loading,
    Ready(Vec<UserRecord>),
    Failed(String),
}

/// Result of a `load()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied { count: usize },
    /// A newer load started, or the view was unmounted, before this one returned
    Discarded,
}

/// What the table shows for one record
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub phone_number: String,
    pub status: UserStatus,
    pub status_variant: String,
    pub joined: String,
}

impl From<&UserRecord> for UserRow {
    fn from(user: &UserRecord) -> Self {
        UserRow {
            id: user.id.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
            status: user.status,
            status_variant: user.status.badge_variant().to_string(),
            joined: format_join_date(&user.join_date),
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ListSnapshot {
    Loading,
    Ready {
        users: Vec<UserRow>,
        total: usize,
        matched: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Failed {
        error: String,
    },
}

/// Case-insensitive substring match on display name or email. An empty term keeps everything.
pub fn filter_users<'a>(users: &'a [UserRecord], term: &str) -> Vec<&'a UserRecord> {
    if term.is_empty() {
        return users.iter().collect();
    }
    let term = term.to_lowercase();
    users.iter().filter(|user| user.matches_search(&term)).collect()
}

/// Searchable list of every applicant.
///
/// Loaded once from the store (no live subscription). Loads are tagged with a
/// generation so a slow response can never overwrite a newer one or land
/// after `unmount()`.
pub struct UserListView {
    store: Arc<dyn UserStore>,
    state: RwLock<ListState>,
    generation: AtomicU64,
    mounted: AtomicBool,
}

impl UserListView {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self {
            store,
            state: RwLock::new(ListState::Loading),
            generation: AtomicU64::new(0),
            mounted: AtomicBool::new(true),
        }
    }

    /// Fetches and normalizes the whole collection. On failure the list is
    /// cleared and replaced by the static error message.
    pub async fn load(&self) -> Result<LoadOutcome, AppError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.state.write().await = ListState::Loading;

        let result = self.store.fetch_all().await;

        let mut state = self.state.write().await;
        if !self.is_current(generation) {
            log::debug!("⏭️  Discarding users load #{} (superseded or unmounted)", generation);
            return Ok(LoadOutcome::Discarded);
        }

        match result {
            Ok(docs) => {
                let users = normalize_all(&docs);
                let count = users.len();
                *state = ListState::Ready(users);
                log::info!("✅ Loaded {} users from {}", count, self.store.backend());
                Ok(LoadOutcome::Applied { count })
            }
            Err(e) => {
                log::error!("❌ Error fetching users: {}", e);
                *state = ListState::Failed(LOAD_FAILED_MESSAGE.to_string());
                Err(AppError::LoadFailed(e.to_string()))
            }
        }
    }

    /// Manual retry after a failure: back to `Loading`, then a fresh fetch
    pub async fn reload(&self) -> Result<LoadOutcome, AppError> {
        log::info!("🔄 Reloading users");
        self.load().await
    }

    /// Any load still in flight will be discarded when it returns
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.mounted.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == generation
    }

    /// Filtered view of the current list; never mutates it
    pub async fn snapshot(&self, search: &str) -> ListSnapshot {
        match &*self.state.read().await {
            ListState::Loading => ListSnapshot::Loading,
            ListState::Failed(error) => ListSnapshot::Failed { error: error.clone() },
            ListState::Ready(users) => {
                let rows: Vec<UserRow> = filter_users(users, search).into_iter().map(UserRow::from).collect();
                let matched = rows.len();
                ListSnapshot::Ready {
                    total: users.len(),
                    matched,
                    message: (matched == 0).then(|| NO_MATCHES_MESSAGE.to_string()),
                    users: rows,
                }
            }
        }
    }

    pub async fn find(&self, id: &str) -> Result<UserRecord, AppError> {
        match &*self.state.read().await {
            ListState::Ready(users) => users
                .iter()
                .find(|user| user.id == id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("User {} not found", id))),
            ListState::Loading => Err(AppError::InvalidRequest("Users are still loading".into())),
            ListState::Failed(error) => Err(AppError::LoadFailed(error.clone())),
        }
    }

    /// Writes the new status to the store and, only once that succeeds,
    /// applies it to the one matching entry. A failed write leaves the list
    /// untouched.
    pub async fn change_status(&self, id: &str, status: UserStatus) -> Result<UserRecord, AppError> {
        let mut record = self.find(id).await?;

        if let Err(e) = self.store.update_status(id, status).await {
            log::error!("❌ Error updating user status for {}: {}", id, e);
            return Err(match e {
                AppError::NotFound(_) => e,
                other => AppError::UpdateFailed(other.to_string()),
            });
        }

        record.status = status;

        if let ListState::Ready(users) = &mut *self.state.write().await {
            if let Some(user) = users.iter_mut().find(|user| user.id == id) {
                user.status = status;
            }
        }

        log::info!("✅ User {} status set to {}", id, status);
        Ok(record)
    }

    #[cfg(test)]
    async fn records(&self) -> Vec<UserRecord> {
        match &*self.state.read().await {
            ListState::Ready(users) => users.clone(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawUserDocument;
    use crate::store::{InMemoryUserStore, SnapshotStream};
    use async_trait::async_trait;
    use mongodb::bson::doc;
    use tokio::sync::Notify;

    fn seeded() -> InMemoryUserStore {
        InMemoryUserStore::with_documents([
            RawUserDocument::new("u1", doc! { "displayName": "Bob", "email": "A.Smith@x.com", "status": "active" }),
            RawUserDocument::new("u2", doc! { "displayName": "Carol Jones", "email": "carol@y.org", "status": "pending" }),
            RawUserDocument::new("u3", doc! { "email": "dave@z.net" }),
        ])
    }

    fn ready_users(snapshot: ListSnapshot) -> Vec<UserRow> {
        match snapshot {
            ListSnapshot::Ready { users, .. } => users,
            other => panic!("expected ready list, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn load_normalizes_documents() {
        let view = UserListView::new(Arc::new(seeded()));
        assert!(matches!(view.snapshot("").await, ListSnapshot::Loading));

        assert_eq!(view.load().await.unwrap(), LoadOutcome::Applied { count: 3 });

        let dave = view.find("u3").await.unwrap();
        assert_eq!(dave.display_name, "Unknown");
        assert_eq!(dave.status, UserStatus::Pending);
    }

    #[tokio::test]
    async fn search_matches_email_alone() {
        let view = UserListView::new(Arc::new(seeded()));
        view.load().await.unwrap();

        let users = ready_users(view.snapshot("smith").await);
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].display_name, "Bob");

        let users = ready_users(view.snapshot("JONES").await);
        assert_eq!(users[0].id, "u2");
    }

    #[tokio::test]
    async fn empty_search_returns_everything_and_filtering_is_non_destructive() {
        let view = UserListView::new(Arc::new(seeded()));
        view.load().await.unwrap();

        assert!(ready_users(view.snapshot("nobody-here").await).is_empty());
        assert_eq!(ready_users(view.snapshot("").await).len(), 3);
    }

    #[tokio::test]
    async fn no_match_carries_message() {
        let view = UserListView::new(Arc::new(seeded()));
        view.load().await.unwrap();

        match view.snapshot("zzz").await {
            ListSnapshot::Ready { message, total, matched, .. } => {
                assert_eq!(message.as_deref(), Some(NO_MATCHES_MESSAGE));
                assert_eq!(total, 3);
                assert_eq!(matched, 0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn filter_users_keeps_order() {
        let now = chrono::Utc::now();
        let users: Vec<UserRecord> = ["Ann Smith", "Bo", "Cy Smithers"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                UserRecord::from_raw(&RawUserDocument::new(i.to_string(), doc! { "displayName": *name }), now)
            })
            .collect();

        let names: Vec<_> = filter_users(&users, "SMITH").iter().map(|u| u.display_name.as_str()).collect();
        assert_eq!(names, ["Ann Smith", "Cy Smithers"]);
        assert_eq!(filter_users(&users, "").len(), 3);
    }

    #[tokio::test]
    async fn load_failure_shows_static_message_and_no_data() {
        let store = seeded();
        let view = UserListView::new(Arc::new(store.clone()));
        view.load().await.unwrap();

        store.set_fail_reads(true);
        assert!(matches!(view.load().await, Err(AppError::LoadFailed(_))));

        match view.snapshot("").await {
            ListSnapshot::Failed { error } => assert_eq!(error, LOAD_FAILED_MESSAGE),
            other => panic!("unexpected {:?}", other),
        }
        assert!(view.find("u1").await.is_err());

        store.set_fail_reads(false);
        assert_eq!(view.reload().await.unwrap(), LoadOutcome::Applied { count: 3 });
    }

    #[tokio::test]
    async fn status_change_touches_only_the_target() {
        let store = seeded();
        let view = UserListView::new(Arc::new(store.clone()));
        view.load().await.unwrap();
        let before = view.records().await;

        let updated = view.change_status("u2", UserStatus::Active).await.unwrap();
        assert_eq!(updated.status, UserStatus::Active);

        let after = view.records().await;
        for (old, new) in before.iter().zip(after.iter()) {
            if old.id == "u2" {
                assert_eq!(new.status, UserStatus::Active);
                assert_eq!(UserRecord { status: old.status, ..new.clone() }, *old);
            } else {
                assert_eq!(old, new);
            }
        }
        assert_eq!(store.get("u2").await.unwrap().get_str("status").unwrap(), "active");
    }

    #[tokio::test]
    async fn failed_update_keeps_previous_status() {
        let store = seeded();
        let view = UserListView::new(Arc::new(store.clone()));
        view.load().await.unwrap();

        store.set_fail_writes(true);
        let err = view.change_status("u2", UserStatus::Inactive).await.unwrap_err();
        assert!(matches!(err, AppError::UpdateFailed(_)));

        assert_eq!(view.find("u2").await.unwrap().status, UserStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found_without_a_write() {
        let view = UserListView::new(Arc::new(seeded()));
        view.load().await.unwrap();

        assert!(matches!(
            view.change_status("ghost", UserStatus::Active).await,
            Err(AppError::NotFound(_))
        ));
    }

    /// Store whose reads block until released
    struct GatedStore {
        inner: InMemoryUserStore,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl UserStore for GatedStore {
        async fn fetch_all(&self) -> Result<Vec<RawUserDocument>, AppError> {
            self.gate.notified().await;
            self.inner.fetch_all().await
        }

        async fn update_status(&self, id: &str, status: UserStatus) -> Result<(), AppError> {
            self.inner.update_status(id, status).await
        }

        async fn subscribe(&self) -> Result<SnapshotStream, AppError> {
            self.inner.subscribe().await
        }

        async fn ping(&self) -> Result<(), AppError> {
            Ok(())
        }

        fn backend(&self) -> &'static str {
            "gated"
        }
    }

    #[tokio::test]
    async fn late_response_after_unmount_is_discarded() {
        let gate = Arc::new(Notify::new());
        let view = Arc::new(UserListView::new(Arc::new(GatedStore {
            inner: seeded(),
            gate: Arc::clone(&gate),
        })));

        let pending = tokio::spawn({
            let view = Arc::clone(&view);
            async move { view.load().await }
        });
        tokio::task::yield_now().await;

        view.unmount();
        gate.notify_one();

        assert_eq!(pending.await.unwrap().unwrap(), LoadOutcome::Discarded);
        assert!(matches!(view.snapshot("").await, ListSnapshot::Loading));
    }

    #[tokio::test]
    async fn superseded_load_is_discarded() {
        let gate = Arc::new(Notify::new());
        let view = Arc::new(UserListView::new(Arc::new(GatedStore {
            inner: seeded(),
            gate: Arc::clone(&gate),
        })));

        let first = tokio::spawn({
            let view = Arc::clone(&view);
            async move { view.load().await }
        });
        tokio::task::yield_now().await;

        let second = tokio::spawn({
            let view = Arc::clone(&view);
            async move { view.load().await }
        });
        tokio::task::yield_now().await;

        gate.notify_one();
        gate.notify_one();

        let outcomes = [first.await.unwrap().unwrap(), second.await.unwrap().unwrap()];
        assert!(outcomes.contains(&LoadOutcome::Discarded));
        assert!(outcomes.contains(&LoadOutcome::Applied { count: 3 }));
        assert_eq!(ready_users(view.snapshot("").await).len(), 3);
    }
}
