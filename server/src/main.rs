#[macro_use]
extern crate rocket;

mod entrypoints;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use impact_server::backfill::{self, BackfillCrawler, BackfillStore};
use impact_server::cache::{Clock, DatasetCache, SystemClock};
use impact_server::dataset::{self, DatasetService};
use impact_server::github_pull::{GithubClient, PullRequestSource};
use impact_server::retry::RetryPolicy;
use impact_shared::github::RepoInfo;
use rocket::{Build, Rocket};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, serde::Deserialize)]
pub struct Env {
    snapshot_path: PathBuf,
    github_token: Option<String>,
    github_repo: Option<String>,
    backfill_state_path: Option<PathBuf>,
    cache_ttl_in_seconds: Option<u64>,
    fetch_timeout_in_seconds: Option<u64>,
    fetch_retries: Option<u32>,
    recent_max_pages: Option<u32>,
    backfill_pages_per_run: Option<u32>,
    backfill_interval_in_minutes: Option<u64>,
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().pretty());
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")?;

    let env = envy::from_env::<Env>().context("Failed to load environment variables")?;

    let _ = rocket(env)?.launch().await?;
    Ok(())
}

fn rocket(env: Env) -> anyhow::Result<Rocket<Build>> {
    let base = dataset::load_snapshot(&env.snapshot_path)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ttl = chrono::Duration::seconds(env.cache_ttl_in_seconds.unwrap_or(300) as i64);
    let cache = Arc::new(DatasetCache::new(ttl, clock.clone()));
    let retry = RetryPolicy::new(
        Duration::from_secs(env.fetch_timeout_in_seconds.unwrap_or(20)),
        env.fetch_retries.unwrap_or(2),
    );

    let state_path = env
        .backfill_state_path
        .unwrap_or_else(|| env.snapshot_path.with_file_name("backfill_state.json"));
    let store = Arc::new(BackfillStore::open(state_path)?);

    let source = match env.github_token.filter(|token| !token.is_empty()) {
        Some(token) => {
            let repo = RepoInfo::parse(env.github_repo.as_deref().unwrap_or(&base.repo))?;
            tracing::info!("Live fetches enabled for {}", repo.full_name());
            let client: Arc<dyn PullRequestSource> = Arc::new(GithubClient::new(token, repo)?);
            Some(client)
        }
        None => {
            tracing::warn!("GITHUB_TOKEN is not set, serving snapshot and backfill only");
            None
        }
    };

    let crawler = Arc::new(BackfillCrawler::new(
        store.clone(),
        cache.clone(),
        source.clone(),
        clock,
        retry,
        base.oldest_merge(),
        env.backfill_pages_per_run.unwrap_or(10),
    ));
    let service = Arc::new(DatasetService::new(
        base,
        store,
        cache,
        source,
        retry,
        env.recent_max_pages.unwrap_or(5),
    ));
    let backfill_interval = env
        .backfill_interval_in_minutes
        .map(|minutes| Duration::from_secs(minutes * 60));
    let atomic_bool = Arc::new(AtomicBool::new(true));

    let cors = rocket_cors::CorsOptions::default()
        .to_cors()
        .context("Failed to build CORS fairing")?;

    Ok(rocket::build()
        .attach(cors)
        .attach(dataset::stage(service))
        .attach(backfill::stage(crawler, backfill_interval, atomic_bool))
        .attach(entrypoints::stage()))
}
