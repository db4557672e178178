use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::*;

/// Aggregate counters for one contributor over the observed history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ContributorActivity {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub prs_created: u32,
    #[serde(default)]
    pub total_files_changed: u64,
    #[serde(default)]
    pub total_additions: u64,
    #[serde(default)]
    pub total_deletions: u64,
    #[serde(default)]
    pub avg_time_to_merge_hours: f64,
    /// Review events authored.
    #[serde(default)]
    pub reviews_given: u32,
    /// Distinct pull requests reviewed, never above `reviews_given`.
    #[serde(default)]
    pub prs_reviewed: u32,
}

impl ContributorActivity {
    pub fn is_eligible(&self) -> bool {
        self.prs_created >= MIN_ELIGIBLE_PRS
    }

    pub fn avg_files_per_pr(&self) -> f64 {
        self.total_files_changed as f64 / self.prs_created.max(1) as f64
    }

    pub fn avg_change_size(&self) -> f64 {
        (self.total_additions + self.total_deletions) as f64 / self.prs_created.max(1) as f64
    }

    /// Fills empty display fields from the login.
    pub fn fill_identity(&mut self, login: &str) {
        if self.name.is_empty() {
            self.name = login.to_string();
        }
        if self.avatar_url.is_empty() {
            self.avatar_url = default_avatar(login);
        }
    }

    /// Adds `other`'s counters. The average merge time becomes the mean weighted
    /// by each side's pull request count.
    pub fn absorb(&mut self, other: &ContributorActivity) {
        let total_prs = self.prs_created + other.prs_created;
        if total_prs > 0 {
            self.avg_time_to_merge_hours = (self.avg_time_to_merge_hours
                * self.prs_created as f64
                + other.avg_time_to_merge_hours * other.prs_created as f64)
                / total_prs as f64;
        }
        self.prs_created = total_prs;
        self.total_files_changed += other.total_files_changed;
        self.total_additions += other.total_additions;
        self.total_deletions += other.total_deletions;
        self.reviews_given += other.reviews_given;
        self.prs_reviewed += other.prs_reviewed;

        if self.name.is_empty() {
            self.name = other.name.clone();
        }
        if self.avatar_url.is_empty() {
            self.avatar_url = other.avatar_url.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PullRequestRecord {
    /// Upstream pull request number, when the source carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    pub author_username: GithubHandle,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub files_changed: u64,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub time_to_merge_hours: f64,
    pub created_at: DateTime<Utc>,
    pub merged_at: DateTime<Utc>,
    #[serde(default)]
    pub comments_count: u64,
    #[serde(default)]
    pub reviews_count: u32,
    #[serde(default)]
    pub reviewers: BTreeSet<GithubHandle>,
}

impl PullRequestRecord {
    pub fn is_well_formed(&self) -> bool {
        !self.author_username.is_empty()
            && !is_bot(&self.author_username)
            && self.merged_at >= self.created_at
    }
}

/// Contributor activity plus pull request records, either loaded from the
/// historical snapshot or materialized by merging overlays into it.
///
/// Deserialization is lenient: pull request entries that fail to parse are
/// dropped instead of failing the whole document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(from = "SnapshotFile")]
pub struct ActivityDataset {
    pub fetched_at: Option<DateTime<Utc>>,
    pub repo: String,
    pub contributors: BTreeMap<GithubHandle, ContributorActivity>,
    /// Sorted by merge time, newest first.
    pub prs: Vec<PullRequestRecord>,
}

impl ActivityDataset {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn newest_merge(&self) -> Option<DateTime<Utc>> {
        self.prs.iter().map(|pr| pr.merged_at).max()
    }

    /// Merge time of the oldest known pull request: the coverage floor.
    pub fn oldest_merge(&self) -> Option<DateTime<Utc>> {
        self.prs.iter().map(|pr| pr.merged_at).min()
    }

    pub fn known_pull_requests(&self) -> KnownPullRequests {
        KnownPullRequests::from_records(&self.prs)
    }

    pub(crate) fn sort_prs(&mut self) {
        self.prs.sort_by(|a, b| b.merged_at.cmp(&a.merged_at));
    }
}

#[derive(Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    fetched_at: Option<String>,
    #[serde(default)]
    repo: String,
    #[serde(default)]
    contributors: BTreeMap<GithubHandle, ContributorActivity>,
    #[serde(default)]
    prs: Vec<serde_json::Value>,
}

impl From<SnapshotFile> for ActivityDataset {
    fn from(file: SnapshotFile) -> Self {
        let total = file.prs.len();
        let prs: Vec<PullRequestRecord> = file
            .prs
            .into_iter()
            .filter_map(|value| serde_json::from_value::<PullRequestRecord>(value).ok())
            .filter(PullRequestRecord::is_well_formed)
            .map(|mut pr| {
                pr.reviewers.retain(|reviewer| !is_bot(reviewer));
                pr
            })
            .collect();
        if prs.len() < total {
            tracing::warn!(
                "Dropped {} malformed pull request records out of {total}",
                total - prs.len()
            );
        }

        let contributors = file
            .contributors
            .into_iter()
            .filter(|(login, _)| !is_bot(login))
            .map(|(login, mut activity)| {
                activity.fill_identity(&login);
                (login, activity)
            })
            .collect();

        let mut dataset = Self {
            fetched_at: file.fetched_at.as_deref().and_then(parse_timestamp),
            repo: file.repo,
            contributors,
            prs,
        };
        dataset.sort_prs();
        dataset
    }
}
