use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, PoisonError, RwLock,
    },
    time::Duration,
};

use anyhow::Context;
use chrono::{DateTime, Utc};
use impact_shared::RawPullRequest;
use rocket::{fairing::AdHoc, tokio::sync::Mutex};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::{
    cache::{Clock, DatasetCache},
    github_pull::{PageOrder, PullRequestSource},
    retry::RetryPolicy,
};

/// Durable progress of the backward crawl plus the overlay it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackfillState {
    /// Once set, every later pass is a no-op, across restarts too.
    #[serde(default)]
    pub complete: bool,
    #[serde(default = "first_page")]
    pub next_page: u32,
    #[serde(default)]
    pub pull_requests: Vec<RawPullRequest>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn first_page() -> u32 {
    1
}

impl Default for BackfillState {
    fn default() -> Self {
        Self {
            complete: false,
            next_page: first_page(),
            pull_requests: vec![],
            updated_at: None,
        }
    }
}

/// JSON file holding the [`BackfillState`]. Readers get the last saved state
/// as a shared snapshot; saves write a temp file and rename it into place.
pub struct BackfillStore {
    path: PathBuf,
    state: RwLock<Arc<BackfillState>>,
}

impl BackfillStore {
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read backfill state {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse backfill state {}", path.display()))?
        } else {
            BackfillState::default()
        };

        Ok(Self {
            path,
            state: RwLock::new(Arc::new(state)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> Arc<BackfillState> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn save(&self, state: BackfillState) -> anyhow::Result<Arc<BackfillState>> {
        let json = serde_json::to_string_pretty(&state)?;
        let temp = self.path.with_extension("json.tmp");
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            rocket::tokio::fs::create_dir_all(parent).await?;
        }
        rocket::tokio::fs::write(&temp, json)
            .await
            .with_context(|| format!("Failed to write {}", temp.display()))?;
        rocket::tokio::fs::rename(&temp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        let state = Arc::new(state);
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state.clone();
        Ok(state)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackfillOutcome {
    AlreadyComplete,
    AlreadyRunning,
    /// No upstream credentials were configured.
    Unavailable,
    Progressed {
        pages_fetched: u32,
        pull_requests_added: usize,
        next_page: u32,
        complete: bool,
    },
}

/// Crawls closed pull requests oldest first, keeping the merged ones older
/// than the snapshot floor.
pub struct BackfillCrawler {
    store: Arc<BackfillStore>,
    cache: Arc<DatasetCache>,
    source: Option<Arc<dyn PullRequestSource>>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    floor: Option<DateTime<Utc>>,
    pages_per_run: u32,
    running: Mutex<()>,
}

impl BackfillCrawler {
    pub fn new(
        store: Arc<BackfillStore>,
        cache: Arc<DatasetCache>,
        source: Option<Arc<dyn PullRequestSource>>,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
        floor: Option<DateTime<Utc>>,
        pages_per_run: u32,
    ) -> Self {
        Self {
            store,
            cache,
            source,
            clock,
            retry,
            floor,
            pages_per_run: pages_per_run.max(1),
            running: Mutex::new(()),
        }
    }

    /// One bounded pass. Progress is saved, the overlay published and the
    /// dataset cache invalidated before returning.
    #[instrument(skip(self))]
    pub async fn run(&self) -> anyhow::Result<BackfillOutcome> {
        let Ok(_guard) = self.running.try_lock() else {
            return Ok(BackfillOutcome::AlreadyRunning);
        };
        let current = self.store.state();
        if current.complete {
            return Ok(BackfillOutcome::AlreadyComplete);
        }
        let Some(source) = &self.source else {
            return Ok(BackfillOutcome::Unavailable);
        };

        let mut state = (*current).clone();
        let mut seen: HashSet<u64> = state
            .pull_requests
            .iter()
            .filter_map(|pr| pr.number)
            .collect();
        let mut pages_fetched = 0;
        let mut pull_requests_added = 0;

        while pages_fetched < self.pages_per_run && !state.complete {
            let number = state.next_page;
            let page = match self
                .retry
                .run("backfill page", || source.page(PageOrder::OldestFirst, number))
                .await
            {
                Ok(page) => page,
                Err(e) if pages_fetched == 0 => return Err(e),
                Err(e) => {
                    warn!("Stopping backfill pass early at page {number}: {e:#}");
                    break;
                }
            };
            pages_fetched += 1;
            state.next_page += 1;

            let mut reached_floor = false;
            for pr in page.pull_requests {
                let (Some(created_at), Some(merged_at)) = (pr.created_at, pr.merged_at) else {
                    continue;
                };
                if let Some(floor) = self.floor {
                    // creation order: everything after this was opened inside the snapshot
                    if created_at >= floor {
                        reached_floor = true;
                    }
                    if merged_at >= floor {
                        continue;
                    }
                }
                if pr.number.is_some_and(|number| !seen.insert(number)) {
                    continue;
                }
                state.pull_requests.push(pr);
                pull_requests_added += 1;
            }
            state.complete = page.exhausted || reached_floor;
        }

        state.updated_at = Some(self.clock.now());
        let saved = self.store.save(state).await?;
        self.cache.invalidate();
        info!(
            "Backfill pass fetched {pages_fetched} pages, added {pull_requests_added}, overlay holds {}, complete: {}",
            saved.pull_requests.len(),
            saved.complete
        );

        Ok(BackfillOutcome::Progressed {
            pages_fetched,
            pull_requests_added,
            next_page: saved.next_page,
            complete: saved.complete,
        })
    }
}

/// Runs a pass every `interval` until shutdown, or until no further pass
/// could make progress.
pub async fn run_periodically(
    crawler: Arc<BackfillCrawler>,
    interval: Duration,
    running: Arc<AtomicBool>,
) {
    let mut interval = rocket::tokio::time::interval(interval);
    while running.load(Ordering::Relaxed) {
        interval.tick().await;

        match crawler.run().await {
            Ok(BackfillOutcome::AlreadyComplete) => {
                info!("Backfill complete, stopping periodic job");
                break;
            }
            Ok(BackfillOutcome::Unavailable) => {
                warn!("No GitHub source configured, stopping periodic backfill");
                break;
            }
            Ok(_) => {}
            Err(e) => error!("Failed to run backfill pass: {:#?}", e),
        }
    }
}

pub fn stage(
    crawler: Arc<BackfillCrawler>,
    interval: Option<Duration>,
    atomic_bool: Arc<AtomicBool>,
) -> AdHoc {
    AdHoc::on_ignite("Backfill crawler", move |rocket| async move {
        let rocket = rocket.manage(crawler.clone());
        let Some(interval) = interval else {
            return rocket;
        };
        let shutdown_flag = atomic_bool.clone();
        rocket
            .attach(AdHoc::on_liftoff(
                "Runs a backfill pass every X minutes",
                move |_| {
                    Box::pin(async move {
                        rocket::tokio::spawn(run_periodically(crawler, interval, atomic_bool));
                    })
                },
            ))
            .attach(AdHoc::on_shutdown("Stop backfill crawler", |_| {
                Box::pin(async move {
                    shutdown_flag.store(false, Ordering::Relaxed);
                })
            }))
    })
}
