//! Ingestion: adding and refreshing tracked repositories
//!
//! Adding runs these steps:
//!
//! ```text
//! ParseUrl -> FetchMetadata -> PersistRepository -> FetchLatestRelease -> PersistRelease -> Done
//!                              |<------------------ one transaction ------------------>|
//! ```
//!
//! `NotFound` from the latest-release lookup means "no releases yet": the
//! release step is skipped and the transaction still commits. Any other
//! failure inside the transaction rolls back the repository upsert too.
//!
//! Refreshing runs `FetchLatestRelease -> PersistRelease` for a repository
//! that is already tracked, outside any transaction.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::error::{ProviderError, Result, TrackerError};
use crate::models::{NewRelease, NewRepository, Release, Repository, RepositoryId};
use crate::provider::{MetadataProvider, ReleaseMetadata};
use crate::repo_url::{parse_github_url, RepoRef};
use crate::store::{Store, StoreTransaction};

/// Steps of an ingestion run, as they appear in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStep {
    ParseUrl,
    FetchMetadata,
    PersistRepository,
    FetchLatestRelease,
    PersistRelease,
    Done,
}

impl IngestStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ParseUrl => "parse_url",
            Self::FetchMetadata => "fetch_metadata",
            Self::PersistRepository => "persist_repository",
            Self::FetchLatestRelease => "fetch_latest_release",
            Self::PersistRelease => "persist_release",
            Self::Done => "done",
        }
    }

    fn enter(self, target: &dyn fmt::Display) {
        debug!(step = self.as_str(), repo = %target, "ingest step");
    }
}

impl fmt::Display for IngestStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one add or refresh
#[derive(Debug, Clone)]
pub struct Ingested {
    pub repository: Repository,
    /// Release persisted by this run, `None` if upstream has none.
    pub release: Option<Release>,
}

/// Totals from [`Ingestor::refresh_all`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    /// Repositories whose latest release was fetched and stored
    pub refreshed: usize,
    /// Repositories with no releases upstream
    pub without_release: usize,
    pub failed: usize,
}

impl RefreshSummary {
    pub fn total(&self) -> usize {
        self.refreshed + self.without_release + self.failed
    }
}

pub struct Ingestor {
    store: Arc<dyn Store>,
    provider: Arc<dyn MetadataProvider>,
}

impl Ingestor {
    pub fn new(store: Arc<dyn Store>, provider: Arc<dyn MetadataProvider>) -> Self {
        Self { store, provider }
    }

    /// Start tracking the repository at `url`, or update it if already tracked.
    #[instrument(skip(self))]
    pub async fn add(&self, url: &str) -> Result<Ingested> {
        IngestStep::ParseUrl.enter(&url);
        let repo_ref = parse_github_url(url)?;

        IngestStep::FetchMetadata.enter(&repo_ref);
        let metadata = self
            .provider
            .get_repo(&repo_ref.owner, &repo_ref.name)
            .await
            .map_err(|err| match err {
                ProviderError::NotFound => TrackerError::not_found("github repository", &repo_ref),
                other => other.into(),
            })?;

        let new_repo = NewRepository {
            owner: repo_ref.owner.clone(),
            name: repo_ref.name.clone(),
            description: metadata.description,
            url: metadata.url,
        };

        let mut tx = self.store.begin().await?;
        match self.persist(tx.as_mut(), &repo_ref, &new_repo).await {
            Ok(ingested) => {
                tx.commit().await?;
                IngestStep::Done.enter(&repo_ref);
                info!(
                    repo = %repo_ref,
                    id = %ingested.repository.id,
                    release = ingested.release.as_ref().map(|r| r.tag_name.as_str()),
                    "repository added"
                );
                Ok(ingested)
            }
            Err(err) => {
                warn!(repo = %repo_ref, error = %err, "add failed, rolling back");
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(repo = %repo_ref, error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn persist(
        &self,
        tx: &mut dyn StoreTransaction,
        repo_ref: &RepoRef,
        new_repo: &NewRepository,
    ) -> Result<Ingested> {
        IngestStep::PersistRepository.enter(repo_ref);
        let repository = tx.upsert_repository(new_repo).await?;

        let release = match self.fetch_latest(repo_ref).await? {
            Some(meta) => {
                IngestStep::PersistRelease.enter(repo_ref);
                Some(tx.upsert_release(&new_release(repository.id, meta)).await?)
            }
            None => None,
        };

        Ok(Ingested {
            repository,
            release,
        })
    }

    /// Fetch and store the latest upstream release of a tracked repository.
    #[instrument(skip(self))]
    pub async fn refresh(&self, id: RepositoryId) -> Result<Ingested> {
        let repository = self
            .store
            .get_repository_by_id(id)
            .await?
            .ok_or_else(|| TrackerError::not_found("repository", id))?;

        self.refresh_tracked(repository).await
    }

    async fn refresh_tracked(&self, repository: Repository) -> Result<Ingested> {
        let repo_ref = RepoRef {
            owner: repository.owner.clone(),
            name: repository.name.clone(),
        };

        let release = match self.fetch_latest(&repo_ref).await? {
            Some(meta) => {
                IngestStep::PersistRelease.enter(&repo_ref);
                Some(
                    self.store
                        .upsert_release(&new_release(repository.id, meta))
                        .await?,
                )
            }
            None => None,
        };
        IngestStep::Done.enter(&repo_ref);

        Ok(Ingested {
            repository,
            release,
        })
    }

    /// Refresh every tracked repository. Per-repository failures are logged
    /// and counted; only failing to list repositories aborts the run.
    #[instrument(skip(self))]
    pub async fn refresh_all(&self) -> Result<RefreshSummary> {
        let repositories = self.store.get_all_repositories().await?;
        let mut summary = RefreshSummary::default();

        for repository in repositories {
            let name = repository.full_name();
            match self.refresh_tracked(repository).await {
                Ok(Ingested {
                    release: Some(_), ..
                }) => summary.refreshed += 1,
                Ok(_) => summary.without_release += 1,
                Err(err) => {
                    warn!(repo = %name, error = %err, "refresh failed");
                    summary.failed += 1;
                }
            }
        }

        info!(
            refreshed = summary.refreshed,
            without_release = summary.without_release,
            failed = summary.failed,
            "refresh run complete"
        );
        Ok(summary)
    }

    /// `Ok(None)` when upstream has no releases.
    async fn fetch_latest(&self, repo_ref: &RepoRef) -> Result<Option<ReleaseMetadata>> {
        IngestStep::FetchLatestRelease.enter(repo_ref);
        match self
            .provider
            .get_latest_release(&repo_ref.owner, &repo_ref.name)
            .await
        {
            Ok(meta) => Ok(Some(meta)),
            Err(ProviderError::NotFound) => {
                debug!(repo = %repo_ref, "no releases upstream");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn new_release(repository_id: RepositoryId, meta: ReleaseMetadata) -> NewRelease {
    NewRelease {
        repository_id,
        tag_name: meta.tag_name,
        published_at: meta.published_at,
        notes: meta.notes,
        html_url: meta.html_url,
    }
}
