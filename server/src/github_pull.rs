use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use impact_shared::{github::RepoInfo, RawPullRequest};
use octocrab::{
    params::{pulls::Sort, Direction, State},
    Octocrab,
};
use tracing::{debug, instrument};

pub const PAGE_SIZE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageOrder {
    /// Most recently updated first, for the recent overlay.
    NewestFirst,
    /// Oldest created first, for the backfill crawl.
    OldestFirst,
}

/// Merged pull requests from one listing page. `exhausted` is set when the
/// listing returned fewer entries than a full page, merged or not.
/// `last_updated_at` is the update time of the last listed entry, merged or not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PullRequestPage {
    pub pull_requests: Vec<RawPullRequest>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub exhausted: bool,
}

#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Pages are 1-based.
    async fn page(&self, order: PageOrder, page: u32) -> anyhow::Result<PullRequestPage>;
}

pub struct GithubClient {
    octocrab: Octocrab,
    repo: RepoInfo,
}

impl GithubClient {
    pub fn new(github_token: String, repo: RepoInfo) -> anyhow::Result<Self> {
        let octocrab = octocrab::Octocrab::builder()
            .personal_token(github_token)
            .build()?;
        Ok(Self { octocrab, repo })
    }

    /// List results lack size counters, so every merged pull request is
    /// fetched again in full alongside its reviews.
    #[instrument(skip(self), fields(repo = %self.repo.full_name()))]
    async fn pull_request(&self, number: u64) -> anyhow::Result<RawPullRequest> {
        let pulls = self.octocrab.pulls(&self.repo.owner, &self.repo.repo);
        let pull_request = pulls.get(number).await?;
        let reviews = pulls.list_reviews(number).per_page(100).send().await?;
        let reviews = self.octocrab.all_pages(reviews).await?;

        Ok(RawPullRequest::from_github(pull_request, reviews))
    }
}

#[async_trait]
impl PullRequestSource for GithubClient {
    #[instrument(skip(self), fields(repo = %self.repo.full_name()))]
    async fn page(&self, order: PageOrder, page: u32) -> anyhow::Result<PullRequestPage> {
        let (sort, direction) = match order {
            PageOrder::NewestFirst => (Sort::Updated, Direction::Descending),
            PageOrder::OldestFirst => (Sort::Created, Direction::Ascending),
        };
        let mut listing = self
            .octocrab
            .pulls(&self.repo.owner, &self.repo.repo)
            .list()
            .state(State::Closed)
            .sort(sort)
            .direction(direction)
            .per_page(PAGE_SIZE)
            .page(page)
            .send()
            .await?;
        let items = listing.take_items();
        let exhausted = items.len() < PAGE_SIZE as usize;
        let last_updated_at = items.last().and_then(|pr| pr.updated_at);

        let details = join_all(
            items
                .iter()
                .filter(|pr| pr.merged_at.is_some())
                .map(|pr| self.pull_request(pr.number)),
        )
        .await;
        let pull_requests = details.into_iter().collect::<anyhow::Result<Vec<_>>>()?;
        debug!(
            "Fetched page {page} with {} entries, {} merged",
            items.len(),
            pull_requests.len()
        );

        Ok(PullRequestPage {
            pull_requests,
            last_updated_at,
            exhausted,
        })
    }
}
