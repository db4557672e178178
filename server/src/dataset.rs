use std::{path::Path, sync::Arc};

use anyhow::Context;
use chrono::{DateTime, Utc};
use impact_shared::{merge, ActivityDataset, RawPullRequest};
use rocket::{fairing::AdHoc, tokio::sync::Mutex};
use tracing::{debug, info, instrument, warn};

use crate::{
    backfill::BackfillStore,
    cache::DatasetCache,
    github_pull::{PageOrder, PullRequestSource},
    retry::RetryPolicy,
};

pub fn load_snapshot(path: &Path) -> anyhow::Result<ActivityDataset> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let dataset = ActivityDataset::from_json(&json)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
    info!(
        "Loaded snapshot of {} with {} contributors and {} pull requests",
        dataset.repo,
        dataset.contributors.len(),
        dataset.prs.len()
    );
    Ok(dataset)
}

/// Materializes the merged dataset: snapshot, then the backfill overlay, then
/// pull requests newer than anything known. Results are cached for the TTL and
/// only one rebuild runs at a time.
pub struct DatasetService {
    base: Arc<ActivityDataset>,
    rebuild: Mutex<()>,
    backfill: Arc<BackfillStore>,
    cache: Arc<DatasetCache>,
    source: Option<Arc<dyn PullRequestSource>>,
    retry: RetryPolicy,
    recent_max_pages: u32,
}

impl DatasetService {
    pub fn new(
        base: ActivityDataset,
        backfill: Arc<BackfillStore>,
        cache: Arc<DatasetCache>,
        source: Option<Arc<dyn PullRequestSource>>,
        retry: RetryPolicy,
        recent_max_pages: u32,
    ) -> Self {
        Self {
            base: Arc::new(base),
            rebuild: Mutex::new(()),
            backfill,
            cache,
            source,
            retry,
            recent_max_pages,
        }
    }

    pub fn base(&self) -> &ActivityDataset {
        &self.base
    }

    /// Freshness of the dataset currently served, without triggering a rebuild.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.cache
            .get()
            .map_or(self.base.fetched_at, |dataset| dataset.fetched_at)
    }

    /// Never fails: when the recent overlay cannot be fetched the snapshot plus
    /// backfill is served instead.
    #[instrument(skip(self))]
    pub async fn dataset(&self) -> Arc<ActivityDataset> {
        if let Some(cached) = self.cache.get() {
            return cached;
        }
        let _rebuilding = self.rebuild.lock().await;
        // another caller may have rebuilt while we waited
        if let Some(cached) = self.cache.get() {
            return cached;
        }

        let mut dataset = (*self.base).clone();
        let backfill = self.backfill.state();
        if !backfill.pull_requests.is_empty() {
            let added = merge(&mut dataset, backfill.pull_requests.iter().cloned());
            debug!("Backfill overlay added {added} pull requests");
        }

        if let Some(source) = &self.source {
            match self.fetch_recent(source.as_ref(), &dataset).await {
                Ok(recent) => {
                    let added = merge(&mut dataset, recent);
                    dataset.fetched_at = Some(self.cache.now());
                    info!("Recent overlay added {added} pull requests");
                }
                Err(e) => warn!("Serving dataset without recent activity: {e:#}"),
            }
        }

        let dataset = Arc::new(dataset);
        self.cache.set(dataset.clone());
        dataset
    }

    async fn fetch_recent(
        &self,
        source: &dyn PullRequestSource,
        dataset: &ActivityDataset,
    ) -> anyhow::Result<Vec<RawPullRequest>> {
        let newest = dataset.newest_merge();
        let known = dataset.known_pull_requests();
        let mut recent = Vec::new();

        for number in 1..=self.recent_max_pages {
            let page = self
                .retry
                .run("recent pull request page", || {
                    source.page(PageOrder::NewestFirst, number)
                })
                .await?;

            for pr in page.pull_requests {
                if known.contains_raw(&pr) {
                    continue;
                }
                let is_newer = match (newest, pr.merged_at) {
                    (Some(newest), Some(merged_at)) => merged_at > newest,
                    _ => true,
                };
                if is_newer {
                    recent.push(pr);
                }
            }
            debug!("Recent page {number}: {} new so far", recent.len());
            // a merge is also an update, so nothing further down can be newer
            let reached_known_updates = match (newest, page.last_updated_at) {
                (Some(newest), Some(updated_at)) => updated_at <= newest,
                _ => false,
            };
            if reached_known_updates || page.exhausted {
                break;
            }
        }
        Ok(recent)
    }
}

pub fn stage(service: Arc<DatasetService>) -> AdHoc {
    AdHoc::on_ignite("Dataset service", |rocket| async move { rocket.manage(service) })
}
