//! Caller-facing tracker operations
//!
//! Both transports (HTTP and CLI) go through [`Tracker`]. Listing reads all
//! repositories once and resolves every row's latest release and seen status
//! through the request's loaders, so a page of N repositories costs one bulk
//! call per lookup kind instead of 2N single-row calls.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, info, instrument};

use crate::context::RequestContext;
use crate::error::{Result, StorageError, TrackerError};
use crate::ingest::{Ingestor, RefreshSummary};
use crate::loader::DEFAULT_YIELD_COUNT;
use crate::models::{ReleaseId, Repository, RepositoryId, RepositoryView, SeenStatus, UserId};
use crate::provider::MetadataProvider;
use crate::seen;
use crate::store::Store;

pub struct Tracker {
    store: Arc<dyn Store>,
    ingestor: Ingestor,
    yield_count: usize,
}

impl Tracker {
    pub fn new(store: Arc<dyn Store>, provider: Arc<dyn MetadataProvider>) -> Self {
        Self {
            ingestor: Ingestor::new(Arc::clone(&store), provider),
            store,
            yield_count: DEFAULT_YIELD_COUNT,
        }
    }

    /// Collection window for the loaders of every context built from here.
    pub fn with_yield_count(mut self, yield_count: usize) -> Self {
        self.yield_count = yield_count;
        self
    }

    /// Fresh per-request context for `user_id` (`None` = anonymous).
    pub fn context(&self, user_id: Option<UserId>) -> RequestContext {
        RequestContext::new(Arc::clone(&self.store), user_id, self.yield_count)
    }

    /// All tracked repositories, most recently updated first, each with its
    /// latest release and the caller's seen status.
    #[instrument(skip_all, fields(user = ctx.user_id().map(UserId::as_str)))]
    pub async fn list_repositories(&self, ctx: &RequestContext) -> Result<Vec<RepositoryView>> {
        let repositories = self.store.get_all_repositories().await?;
        debug!(count = repositories.len(), "resolving repository rows");

        let rows = repositories.into_iter().map(|repo| async move {
            let (latest, seen) =
                tokio::try_join!(ctx.latest_release(repo.id), ctx.seen_status(repo.id))?;
            Ok::<_, StorageError>(RepositoryView::new(repo, latest, seen))
        });

        Ok(try_join_all(rows).await?)
    }

    #[instrument(skip(self, ctx))]
    pub async fn add_repository(&self, ctx: &RequestContext, url: &str) -> Result<RepositoryView> {
        let added = self.ingestor.add(url).await?;
        self.view(ctx, added.repository).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn refresh_repository(
        &self,
        ctx: &RequestContext,
        id: RepositoryId,
    ) -> Result<RepositoryView> {
        let refreshed = self.ingestor.refresh(id).await?;
        self.view(ctx, refreshed.repository).await
    }

    /// Refresh every tracked repository (used by the poller and `refresh --all`).
    pub async fn refresh_all(&self) -> Result<RefreshSummary> {
        self.ingestor.refresh_all().await
    }

    /// Record that the caller has seen `release_id`, and return the
    /// repository's seen status as it stands afterwards.
    #[instrument(skip(self, ctx), fields(user = ctx.user_id().map(UserId::as_str)))]
    pub async fn mark_release_seen(
        &self,
        ctx: &RequestContext,
        repository_id: RepositoryId,
        release_id: ReleaseId,
    ) -> Result<SeenStatus> {
        let (repository, release) = tokio::try_join!(
            self.store.get_repository_by_id(repository_id),
            self.store.get_release_by_id(release_id),
        )?;

        if repository.is_none() {
            return Err(TrackerError::not_found("repository", repository_id));
        }
        match release {
            Some(release) if release.repository_id == repository_id => {}
            _ => return Err(TrackerError::not_found("release", release_id)),
        }

        let event = self
            .store
            .mark_seen(ctx.user_id(), repository_id, release_id)
            .await?;
        info!(
            repository = %repository_id,
            release = %release_id,
            seen_at = %event.seen_at,
            "release marked seen"
        );

        self.current_status(ctx, repository_id).await
    }

    /// Status from current state, bypassing the context's loader cache so
    /// a mutation earlier in the same request is reflected.
    async fn current_status(&self, ctx: &RequestContext, id: RepositoryId) -> Result<SeenStatus> {
        let (latest, last_seen) = tokio::try_join!(
            self.store.get_latest_for_repository(id),
            self.store.get_last_seen(ctx.user_id(), id),
        )?;
        Ok(seen::resolve(latest.as_ref(), last_seen.as_ref()))
    }

    async fn view(&self, ctx: &RequestContext, repository: Repository) -> Result<RepositoryView> {
        let (latest, last_seen) = tokio::try_join!(
            self.store.get_latest_for_repository(repository.id),
            self.store.get_last_seen(ctx.user_id(), repository.id),
        )?;
        let status = seen::resolve(latest.as_ref(), last_seen.as_ref());
        Ok(RepositoryView::new(repository, latest, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::provider::{MockProvider, ReleaseMetadata};
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    struct Harness {
        store: MemoryStore,
        provider: Arc<MockProvider>,
        tracker: Tracker,
    }

    fn harness() -> Harness {
        let store = MemoryStore::new();
        let provider = Arc::new(MockProvider::new());
        let tracker = Tracker::new(Arc::new(store.clone()), provider.clone());
        Harness {
            store,
            provider,
            tracker,
        }
    }

    fn release(tag: &str, day: u32) -> ReleaseMetadata {
        ReleaseMetadata {
            tag_name: tag.into(),
            published_at: Some(Utc.with_ymd_and_hms(2024, 6, day, 0, 0, 0).unwrap()),
            html_url: None,
            notes: None,
        }
    }

    fn alice() -> Option<UserId> {
        UserId::from_raw(Some("alice"))
    }

    #[tokio::test]
    async fn new_release_after_seen_is_unseen() {
        let h = harness();
        h.provider.add_repo("foo", "bar", None);
        h.provider.set_latest_release("foo", "bar", release("v1.0", 1));

        let ctx = h.tracker.context(alice());
        let view = h
            .tracker
            .add_repository(&ctx, "https://github.com/foo/bar")
            .await
            .unwrap();
        assert!(view.seen.is_unseen);

        let v1 = view.latest_release.as_ref().unwrap().id;
        let status = h.tracker.mark_release_seen(&ctx, view.id, v1).await.unwrap();
        assert!(!status.is_unseen);
        assert_eq!(status.release_id, Some(v1));

        h.provider.set_latest_release("foo", "bar", release("v1.1", 2));
        h.tracker.refresh_repository(&ctx, view.id).await.unwrap();

        let rows = h
            .tracker
            .list_repositories(&h.tracker.context(alice()))
            .await
            .unwrap();
        let row = &rows[0];
        assert_eq!(
            row.latest_release.as_ref().map(|r| r.tag_name.as_str()),
            Some("v1.1")
        );
        assert!(row.seen.is_unseen);
        assert_eq!(row.seen.release_id, Some(v1));
    }

    #[tokio::test]
    async fn marking_an_older_release_stays_unseen() {
        let h = harness();
        h.provider.add_repo("foo", "bar", None);
        h.provider.set_latest_release("foo", "bar", release("v1.0", 1));

        let ctx = h.tracker.context(alice());
        let view = h
            .tracker
            .add_repository(&ctx, "https://github.com/foo/bar")
            .await
            .unwrap();
        let v1_0 = view.latest_release.as_ref().unwrap().id;

        h.provider.set_latest_release("foo", "bar", release("v1.1", 2));
        let refreshed = h.tracker.refresh_repository(&ctx, view.id).await.unwrap();
        let v1_1 = refreshed.latest_release.as_ref().unwrap().id;
        assert_ne!(v1_0, v1_1);

        let status = h.tracker.mark_release_seen(&ctx, view.id, v1_0).await.unwrap();
        assert_eq!(status.release_id, Some(v1_0));
        assert!(status.is_unseen);

        let status = h.tracker.mark_release_seen(&ctx, view.id, v1_1).await.unwrap();
        assert_eq!(status.release_id, Some(v1_1));
        assert!(!status.is_unseen);
    }

    #[tokio::test]
    async fn repository_without_releases_is_never_unseen() {
        let h = harness();
        h.provider.add_repo("foo", "bar", None);

        let ctx = h.tracker.context(None);
        let view = h
            .tracker
            .add_repository(&ctx, "https://github.com/foo/bar")
            .await
            .unwrap();

        assert!(view.latest_release.is_none());
        assert_eq!(view.seen, SeenStatus::default());
    }

    #[tokio::test]
    async fn invalid_url_touches_nothing() {
        let h = harness();
        let ctx = h.tracker.context(None);

        let err = h.tracker.add_repository(&ctx, "not-a-url").await.unwrap_err();

        assert!(matches!(err, TrackerError::InvalidUrl { .. }));
        assert_eq!(h.provider.call_count(), 0);
        assert_eq!(h.store.call_count("begin"), 0);
        assert_eq!(h.store.call_count("get_latest_for_repository"), 0);
    }

    #[tokio::test]
    async fn listing_uses_one_bulk_call_per_kind() {
        let h = harness();
        for i in 0..25 {
            let name = format!("repo{i}");
            h.provider.add_repo("foo", &name, None);
            if i % 2 == 0 {
                h.provider.set_latest_release("foo", &name, release("v1", 1));
            }
            let ctx = h.tracker.context(None);
            h.tracker
                .add_repository(&ctx, &format!("https://github.com/foo/{name}"))
                .await
                .unwrap();
        }

        let rows = h
            .tracker
            .list_repositories(&h.tracker.context(alice()))
            .await
            .unwrap();

        assert_eq!(rows.len(), 25);
        assert_eq!(rows.iter().filter(|r| r.latest_release.is_some()).count(), 13);
        assert_eq!(rows.iter().filter(|r| r.seen.is_unseen).count(), 13);
        // release loader + seen loader each fetch latest releases once
        assert_eq!(h.store.call_count("get_latest_for_repositories"), 2);
        assert_eq!(h.store.call_count("get_last_seen_for_repositories"), 1);
        assert_eq!(h.store.call_count("get_all_repositories"), 1);
    }

    #[tokio::test]
    async fn users_do_not_see_each_others_marks() {
        let h = harness();
        h.provider.add_repo("foo", "bar", None);
        h.provider.set_latest_release("foo", "bar", release("v1.0", 1));
        let view = h
            .tracker
            .add_repository(&h.tracker.context(None), "https://github.com/foo/bar")
            .await
            .unwrap();
        let v1 = view.latest_release.unwrap().id;

        h.tracker
            .mark_release_seen(&h.tracker.context(alice()), view.id, v1)
            .await
            .unwrap();

        let for_alice = h.tracker.list_repositories(&h.tracker.context(alice())).await.unwrap();
        let for_bob = h
            .tracker
            .list_repositories(&h.tracker.context(UserId::from_raw(Some("bob"))))
            .await
            .unwrap();
        let for_anon = h.tracker.list_repositories(&h.tracker.context(None)).await.unwrap();

        assert!(!for_alice[0].seen.is_unseen);
        assert!(for_bob[0].seen.is_unseen);
        assert!(for_anon[0].seen.is_unseen);
    }

    #[tokio::test]
    async fn marking_validates_repository_and_release() {
        let h = harness();
        for name in ["a", "b"] {
            h.provider.add_repo("foo", name, None);
            h.provider.set_latest_release("foo", name, release("v1", 1));
        }
        let ctx = h.tracker.context(alice());
        let a = h
            .tracker
            .add_repository(&ctx, "https://github.com/foo/a")
            .await
            .unwrap();
        let b = h
            .tracker
            .add_repository(&ctx, "https://github.com/foo/b")
            .await
            .unwrap();
        let b_release = b.latest_release.unwrap().id;

        let err = h
            .tracker
            .mark_release_seen(&ctx, RepositoryId(999), b_release)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::NotFound { resource: "repository", .. }));

        let err = h
            .tracker
            .mark_release_seen(&ctx, a.id, b_release)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::NotFound { resource: "release", .. }));
        assert_eq!(h.store.call_count("mark_seen"), 0);
    }

    #[tokio::test]
    async fn marking_twice_keeps_first_timestamp() {
        let h = harness();
        h.provider.add_repo("foo", "bar", None);
        h.provider.set_latest_release("foo", "bar", release("v1", 1));
        let ctx = h.tracker.context(alice());
        let view = h
            .tracker
            .add_repository(&ctx, "https://github.com/foo/bar")
            .await
            .unwrap();
        let v1 = view.latest_release.unwrap().id;

        let first = h.tracker.mark_release_seen(&ctx, view.id, v1).await.unwrap();
        let second = h.tracker.mark_release_seen(&ctx, view.id, v1).await.unwrap();

        assert_eq!(first.seen_at, second.seen_at);
    }

    #[tokio::test]
    async fn unavailable_store_fails_listing_but_not_refresh_all() {
        let h = harness();
        h.provider.add_repo("foo", "bar", None);
        h.tracker
            .add_repository(&h.tracker.context(None), "https://github.com/foo/bar")
            .await
            .unwrap();

        // refresh with upstream down leaves the store untouched
        h.provider.fail_latest_release(
            "foo",
            "bar",
            ProviderError::Api {
                status: 503,
                message: "unavailable".into(),
            },
        );
        let summary = h.tracker.refresh_all().await.unwrap();
        assert_eq!(summary.failed, 1);

        h.store.set_unavailable(true);
        let err = h
            .tracker
            .list_repositories(&h.tracker.context(None))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::Storage(_)));
    }
}
