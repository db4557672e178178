use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RawUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl RawUser {
    fn is_human(&self) -> bool {
        !self.login.is_empty() && !is_bot(&self.login)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RawReview {
    #[serde(default)]
    pub user: Option<RawUser>,
}

/// A merged pull request as the upstream hosting API describes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RawPullRequest {
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub author: Option<RawUser>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changed_files: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub reviews: Vec<RawReview>,
}

struct ParsedPullRequest {
    record: PullRequestRecord,
    author: RawUser,
    review_authors: Vec<RawUser>,
}

impl RawPullRequest {
    fn parse(self) -> Option<ParsedPullRequest> {
        let author = self.author.filter(RawUser::is_human)?;
        let created_at = self.created_at?;
        let merged_at = self.merged_at?;
        if merged_at < created_at {
            return None;
        }

        let review_authors: Vec<RawUser> = self
            .reviews
            .into_iter()
            .filter_map(|review| review.user)
            .filter(RawUser::is_human)
            .collect();
        let hours = (merged_at - created_at).num_seconds() as f64 / 3600.0;
        let title = self
            .title
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| match self.number {
                Some(number) => format!("PR #{number}"),
                None => "Untitled pull request".to_string(),
            });

        let record = PullRequestRecord {
            number: self.number,
            author_username: author.login.clone(),
            title,
            files_changed: self.changed_files,
            additions: self.additions,
            deletions: self.deletions,
            time_to_merge_hours: round_to(hours, 2),
            created_at,
            merged_at,
            comments_count: self.comments,
            reviews_count: review_authors.len() as u32,
            reviewers: review_authors.iter().map(|u| u.login.clone()).collect(),
        };

        Some(ParsedPullRequest {
            record,
            author,
            review_authors,
        })
    }
}

#[derive(Default)]
struct Tally {
    activity: ContributorActivity,
    merge_hours_total: f64,
}

impl Tally {
    fn adopt_identity(&mut self, user: &RawUser, overwrite: bool) {
        let activity = &mut self.activity;
        if overwrite || activity.name.is_empty() {
            activity.name = user.name.clone().unwrap_or_else(|| user.login.clone());
        }
        if overwrite || activity.avatar_url.is_empty() {
            if let Some(avatar) = &user.avatar_url {
                activity.avatar_url = avatar.clone();
            }
        }
    }
}

/// Folds raw pull requests into contributor activity and pull request records.
///
/// Records without an author, with a bot author, or with missing or inverted
/// timestamps are dropped. Bot reviewers are ignored.
pub fn aggregate(prs: impl IntoIterator<Item = RawPullRequest>) -> ActivityDataset {
    let mut tallies: BTreeMap<GithubHandle, Tally> = BTreeMap::new();
    let mut records = Vec::new();
    let mut dropped = 0usize;

    for pr in prs {
        let Some(parsed) = pr.parse() else {
            dropped += 1;
            continue;
        };
        let record = parsed.record;

        let tally = tallies.entry(parsed.author.login.clone()).or_default();
        tally.adopt_identity(&parsed.author, true);
        tally.activity.prs_created += 1;
        tally.activity.total_files_changed += record.files_changed;
        tally.activity.total_additions += record.additions;
        tally.activity.total_deletions += record.deletions;
        tally.merge_hours_total += record.time_to_merge_hours;

        for reviewer in &parsed.review_authors {
            let tally = tallies.entry(reviewer.login.clone()).or_default();
            tally.adopt_identity(reviewer, false);
            tally.activity.reviews_given += 1;
        }
        for reviewer in &record.reviewers {
            if let Some(tally) = tallies.get_mut(reviewer) {
                tally.activity.prs_reviewed += 1;
            }
        }

        records.push(record);
    }

    if dropped > 0 {
        tracing::warn!("Dropped {dropped} malformed pull requests during aggregation");
    }

    let contributors = tallies
        .into_iter()
        .map(|(login, tally)| {
            let mut activity = tally.activity;
            if activity.prs_created > 0 {
                activity.avg_time_to_merge_hours =
                    round_to(tally.merge_hours_total / activity.prs_created as f64, 2);
            }
            activity.fill_identity(&login);
            (login, activity)
        })
        .collect();

    let mut dataset = ActivityDataset {
        fetched_at: None,
        repo: String::new(),
        contributors,
        prs: records,
    };
    dataset.sort_prs();
    dataset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn aggregates_authors_and_reviewers() {
        let prs = vec![
            raw_pr(1, "alice", at(2024, 3, 1, 12), 10, &["bob", "bob", "carol"]),
            raw_pr(2, "alice", at(2024, 3, 2, 12), 20, &["bob"]),
            raw_pr(3, "bob", at(2024, 3, 3, 12), 4, &["alice"]),
        ];

        let dataset = aggregate(prs);
        let alice = &dataset.contributors["alice"];
        let bob = &dataset.contributors["bob"];
        let carol = &dataset.contributors["carol"];

        assert_eq!(alice.prs_created, 2);
        assert_eq!(alice.total_files_changed, 8);
        assert_eq!(alice.total_additions, 240);
        assert_eq!(alice.avg_time_to_merge_hours, 15.0);
        assert_eq!(alice.reviews_given, 1);

        // three review events across two distinct pull requests
        assert_eq!(bob.reviews_given, 3);
        assert_eq!(bob.prs_reviewed, 2);
        assert_eq!(bob.prs_created, 1);

        assert_eq!(carol.prs_created, 0);
        assert_eq!(carol.reviews_given, 1);
        assert_eq!(carol.name, "carol");

        assert_eq!(dataset.prs.len(), 3);
        assert_eq!(dataset.prs[0].number, Some(3));
        assert_eq!(dataset.prs[2].reviews_count, 3);
        assert_eq!(dataset.prs[2].reviewers.len(), 2);
    }

    #[test]
    fn bots_never_reach_activity() {
        let mut pr = raw_pr(1, "alice", at(2024, 3, 1, 12), 1, &["renovate[bot]"]);
        pr.reviews.push(RawReview { user: None });
        let bot_pr = raw_pr(2, "dependabot[bot]", at(2024, 3, 1, 13), 1, &["alice"]);

        let dataset = aggregate(vec![pr, bot_pr]);

        assert_eq!(dataset.contributors.len(), 1);
        assert_eq!(dataset.contributors["alice"].reviews_given, 0);
        assert!(dataset.prs[0].reviewers.is_empty());
        assert_eq!(dataset.prs.len(), 1);
    }

    #[test]
    fn malformed_records_are_dropped() {
        let mut no_author = raw_pr(1, "alice", at(2024, 3, 1, 12), 1, &[]);
        no_author.author = None;
        let mut unmerged = raw_pr(2, "alice", at(2024, 3, 1, 12), 1, &[]);
        unmerged.merged_at = None;
        let mut inverted = raw_pr(3, "alice", at(2024, 3, 1, 12), 1, &[]);
        inverted.created_at = Some(at(2024, 3, 2, 0));
        let fine = raw_pr(4, "alice", at(2024, 3, 1, 12), 1, &[]);

        let dataset = aggregate(vec![no_author, unmerged, inverted, fine]);

        assert_eq!(dataset.prs.len(), 1);
        assert_eq!(dataset.contributors["alice"].prs_created, 1);
    }

    #[test]
    fn missing_title_gets_placeholder() {
        let mut numbered = raw_pr(7, "alice", at(2024, 3, 1, 12), 1, &[]);
        numbered.title = None;
        let mut anonymous = raw_pr(8, "alice", at(2024, 3, 2, 12), 1, &[]);
        anonymous.title = Some("  ".to_string());
        anonymous.number = None;

        let dataset = aggregate(vec![numbered, anonymous]);

        assert_eq!(dataset.prs[1].title, "PR #7");
        assert_eq!(dataset.prs[0].title, "Untitled pull request");
    }

    #[test]
    fn merge_hours_rounded_to_two_decimals() {
        let mut pr = raw_pr(1, "alice", at(2024, 3, 1, 12), 0, &[]);
        pr.created_at = Some(at(2024, 3, 1, 12) - chrono::Duration::seconds(1000));

        let dataset = aggregate(vec![pr]);

        assert_eq!(dataset.prs[0].time_to_merge_hours, 0.28);
    }
}
