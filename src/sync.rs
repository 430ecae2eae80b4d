use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

pub type CategoryId = i32;

/// Transport seam for the interest endpoints, so the client logic can be
/// exercised against fakes.
#[async_trait]
pub trait PreferenceApi: Send + Sync {
    async fn fetch_interested(&self) -> anyhow::Result<Vec<CategoryId>>;
    async fn update(&self, category_id: CategoryId, is_interested: bool) -> anyhow::Result<()>;
}

/// `PreferenceApi` over the server's `/me/categories` endpoints.
pub struct HttpPreferenceApi {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpPreferenceApi {
    /// `base_url` is the API root, e.g. `http://localhost:3000/api/v1`.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            token: token.into(),
        }
    }
}

#[async_trait]
impl PreferenceApi for HttpPreferenceApi {
    async fn fetch_interested(&self) -> anyhow::Result<Vec<CategoryId>> {
        let ids = self
            .http
            .get(format!("{}/me/categories", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<CategoryId>>()
            .await?;
        Ok(ids)
    }

    async fn update(&self, category_id: CategoryId, is_interested: bool) -> anyhow::Result<()> {
        self.http
            .post(format!("{}/me/categories", self.base_url))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({
                "category_id": category_id,
                "is_interested": is_interested,
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Value copy of the cached set, taken before an optimistic write so a failed
/// send can put back exactly what was there. Restoring is a full replace,
/// never a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    interested: HashSet<CategoryId>,
}

impl Snapshot {
    fn capture(interested: &HashSet<CategoryId>) -> Self {
        Self {
            interested: interested.clone(),
        }
    }

    fn into_set(self) -> HashSet<CategoryId> {
        self.interested
    }
}

struct Inner {
    interested: HashSet<CategoryId>,
    /// Bumped on every local write. A background refresh only installs its
    /// result if the epoch it captured is still current, so a fetch that
    /// raced a newer write can never clobber it.
    epoch: u64,
    refresh: Option<JoinHandle<()>>,
}

/// Client-side cache of the user's interested categories with optimistic
/// updates. A toggle flips the cache immediately, then sends; on failure the
/// pre-toggle snapshot is restored verbatim. Once the send settles, either
/// way, a background refetch of the authoritative set reconciles the cache.
/// An older in-flight refetch is cancelled whenever a newer write or refetch
/// supersedes it.
#[derive(Clone)]
pub struct PreferenceSyncClient {
    api: Arc<dyn PreferenceApi>,
    inner: Arc<Mutex<Inner>>,
}

impl PreferenceSyncClient {
    pub fn new(api: Arc<dyn PreferenceApi>) -> Self {
        Self {
            api,
            inner: Arc::new(Mutex::new(Inner {
                interested: HashSet::new(),
                epoch: 0,
                refresh: None,
            })),
        }
    }

    pub fn is_interested(&self, id: CategoryId) -> bool {
        self.inner.lock().interested.contains(&id)
    }

    /// Sorted copy of the cached set.
    pub fn interested(&self) -> Vec<CategoryId> {
        let mut ids: Vec<_> = self.inner.lock().interested.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Optimistic toggle. Returns the send result; the local rollback on
    /// failure and the settle-refetch have already been handled either way.
    pub async fn toggle(&self, id: CategoryId, is_interested: bool) -> anyhow::Result<()> {
        let snapshot = {
            let mut inner = self.inner.lock();
            if let Some(handle) = inner.refresh.take() {
                handle.abort();
            }
            let snapshot = Snapshot::capture(&inner.interested);
            if is_interested {
                inner.interested.insert(id);
            } else {
                inner.interested.remove(&id);
            }
            inner.epoch += 1;
            snapshot
        };

        let sent = self.api.update(id, is_interested).await;

        if let Err(ref e) = sent {
            warn!(error = %e, category_id = id, "interest update failed, rolling back");
            let mut inner = self.inner.lock();
            inner.interested = snapshot.into_set();
            inner.epoch += 1;
        }

        self.spawn_refresh();
        sent
    }

    /// Schedules a background fetch of the authoritative set, cancelling any
    /// refetch already in flight.
    pub fn spawn_refresh(&self) {
        let api = self.api.clone();
        let shared = self.inner.clone();

        let mut inner = self.inner.lock();
        if let Some(handle) = inner.refresh.take() {
            handle.abort();
        }
        let spawned_at = inner.epoch;
        inner.refresh = Some(tokio::spawn(async move {
            match api.fetch_interested().await {
                Ok(ids) => {
                    let mut inner = shared.lock();
                    if inner.epoch == spawned_at {
                        inner.interested = ids.into_iter().collect();
                    }
                }
                Err(e) => warn!(error = %e, "interest refetch failed"),
            }
        }));
    }

    /// Fetches the authoritative set and waits for it to land. Used for the
    /// initial load.
    pub async fn refresh(&self) {
        self.spawn_refresh();
        self.settled().await;
    }

    /// Waits for the in-flight refetch, if any. Cancellation surfaces as a
    /// join error and is ignored.
    pub async fn settled(&self) {
        let handle = self.inner.lock().refresh.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}
