mod activity;
mod aggregate;
mod insights;
mod merge;
mod methodology;
mod scoring;
mod stats;
mod timeperiod;
mod trends;

#[cfg(feature = "github")]
pub mod github;

pub use activity::*;
pub use aggregate::*;
pub use insights::*;
pub use merge::*;
pub use methodology::*;
pub use scoring::*;
pub use stats::*;
pub use timeperiod::*;
pub use trends::*;

pub type GithubHandle = String;

/// Minimum number of authored pull requests for a contributor to be scored.
pub const MIN_ELIGIBLE_PRS: u32 = 2;

pub fn is_bot(login: &str) -> bool {
    login.ends_with("[bot]")
}

pub fn default_avatar(login: &str) -> String {
    format!("https://github.com/{}.png", login)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
pub(crate) mod test_utils {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::*;

    pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
    }

    pub fn user(login: &str) -> RawUser {
        RawUser {
            login: login.to_string(),
            name: None,
            avatar_url: None,
        }
    }

    pub fn review(login: &str) -> RawReview {
        RawReview {
            user: Some(user(login)),
        }
    }

    pub fn raw_pr(
        number: u64,
        author: &str,
        merged_at: DateTime<Utc>,
        hours_open: i64,
        reviewers: &[&str],
    ) -> RawPullRequest {
        RawPullRequest {
            number: Some(number),
            author: Some(user(author)),
            title: Some(format!("Change {number}")),
            created_at: Some(merged_at - Duration::hours(hours_open)),
            merged_at: Some(merged_at),
            additions: 120,
            deletions: 30,
            changed_files: 4,
            comments: 1,
            reviews: reviewers.iter().map(|r| review(r)).collect(),
        }
    }

    pub fn activity(
        prs_created: u32,
        total_files_changed: u64,
        avg_time_to_merge_hours: f64,
        reviews_given: u32,
        prs_reviewed: u32,
    ) -> ContributorActivity {
        ContributorActivity {
            prs_created,
            total_files_changed,
            total_additions: 200 * prs_created as u64,
            total_deletions: 50 * prs_created as u64,
            avg_time_to_merge_hours,
            reviews_given,
            prs_reviewed,
            ..Default::default()
        }
    }
}
