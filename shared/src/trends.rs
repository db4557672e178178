use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::*;

/// Which history decides the charted cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum CohortRanking {
    /// Full history, so the cohort stays put while the window narrows.
    #[default]
    AllTime,
    Window,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendEngineer {
    pub username: GithubHandle,
    pub name: String,
}

/// One week of activity, serialized flat as `{ "week": ..., "<login>": count }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub week: NaiveDate,
    #[serde(flatten)]
    pub counts: BTreeMap<GithubHandle, u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrendResult {
    pub engineers: Vec<TrendEngineer>,
    pub series: Vec<TrendPoint>,
}

/// Weekly merged pull request counts for the top `top` engineers.
///
/// Only weeks with at least one cohort pull request appear; inside a week
/// every cohort member has an entry, zero included.
pub fn weekly_trends(
    dataset: &ActivityDataset,
    top: usize,
    window: &DateWindow,
    ranking: CohortRanking,
) -> TrendResult {
    let windowed: Vec<&PullRequestRecord> = dataset
        .prs
        .iter()
        .filter(|pr| window.contains(pr.merged_at))
        .collect();

    let ranked = match ranking {
        CohortRanking::AllTime => rank_engineers(&dataset.contributors),
        CohortRanking::Window => rank_engineers(&window_activity(&windowed, &dataset.contributors)),
    };
    let engineers: Vec<TrendEngineer> = ranked
        .into_iter()
        .take(top)
        .map(|engineer| TrendEngineer {
            username: engineer.username,
            name: engineer.name,
        })
        .collect();
    let cohort: HashSet<&str> = engineers.iter().map(|e| e.username.as_str()).collect();

    let mut weekly: BTreeMap<NaiveDate, BTreeMap<GithubHandle, u32>> = BTreeMap::new();
    for pr in windowed {
        if !cohort.contains(pr.author_username.as_str()) {
            continue;
        }
        let counts = weekly.entry(week_start(pr.merged_at)).or_insert_with(|| {
            engineers
                .iter()
                .map(|engineer| (engineer.username.clone(), 0))
                .collect()
        });
        if let Some(count) = counts.get_mut(&pr.author_username) {
            *count += 1;
        }
    }

    TrendResult {
        engineers,
        series: weekly
            .into_iter()
            .map(|(week, counts)| TrendPoint { week, counts })
            .collect(),
    }
}

/// Rebuilds contributor activity from windowed records. Records only carry
/// the reviewer set, so every reviewer is credited one review event per
/// reviewed pull request.
pub fn window_activity(
    records: &[&PullRequestRecord],
    contributors: &BTreeMap<GithubHandle, ContributorActivity>,
) -> BTreeMap<GithubHandle, ContributorActivity> {
    let mut activity: BTreeMap<GithubHandle, ContributorActivity> = BTreeMap::new();
    let mut merge_hours: BTreeMap<GithubHandle, f64> = BTreeMap::new();

    for pr in records {
        let author = activity.entry(pr.author_username.clone()).or_default();
        author.prs_created += 1;
        author.total_files_changed += pr.files_changed;
        author.total_additions += pr.additions;
        author.total_deletions += pr.deletions;
        *merge_hours.entry(pr.author_username.clone()).or_default() += pr.time_to_merge_hours;

        for reviewer in &pr.reviewers {
            let reviewer = activity.entry(reviewer.clone()).or_default();
            reviewer.reviews_given += 1;
            reviewer.prs_reviewed += 1;
        }
    }

    for (login, entry) in activity.iter_mut() {
        if entry.prs_created > 0 {
            entry.avg_time_to_merge_hours = round_to(
                merge_hours.get(login).copied().unwrap_or_default() / entry.prs_created as f64,
                2,
            );
        }
        if let Some(known) = contributors.get(login) {
            entry.name = known.name.clone();
            entry.avatar_url = known.avatar_url.clone();
        }
        entry.fill_identity(login);
    }
    activity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn dataset() -> ActivityDataset {
        aggregate(vec![
            // alice: Tuesday 2024-01-16 and Sunday 2024-01-21 share one ISO week
            raw_pr(1, "alice", at(2024, 1, 16, 10), 5, &["bob"]),
            raw_pr(2, "alice", at(2024, 1, 21, 18), 5, &["bob"]),
            raw_pr(3, "alice", at(2024, 2, 6, 10), 5, &["bob"]),
            raw_pr(4, "bob", at(2024, 1, 17, 10), 5, &["alice"]),
            raw_pr(5, "bob", at(2024, 2, 20, 10), 5, &["alice"]),
            raw_pr(6, "carol", at(2024, 3, 5, 10), 5, &[]),
            raw_pr(7, "carol", at(2024, 3, 6, 10), 5, &[]),
            raw_pr(8, "carol", at(2024, 3, 7, 10), 5, &[]),
            // never eligible
            raw_pr(9, "dave", at(2024, 1, 30, 10), 5, &[]),
        ])
    }

    fn monday(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    #[test]
    fn buckets_by_iso_week_with_dense_zeros() {
        let trends = weekly_trends(&dataset(), 2, &DateWindow::all_time(), CohortRanking::AllTime);

        assert_eq!(trends.engineers.len(), 2);
        let cohort: Vec<&str> = trends.engineers.iter().map(|e| e.username.as_str()).collect();
        assert!(!cohort.contains(&"dave"));

        let first = &trends.series[0];
        assert_eq!(first.week, monday(1, 15));
        for login in &cohort {
            assert!(first.counts.contains_key(*login));
        }
        if cohort.contains(&"alice") {
            assert_eq!(first.counts["alice"], 2);
        }
        for point in &trends.series {
            assert_eq!(point.counts.len(), 2);
            assert!(point.counts.values().sum::<u32>() > 0);
        }
    }

    #[test]
    fn series_is_sparse_across_weeks() {
        let trends = weekly_trends(&dataset(), 3, &DateWindow::all_time(), CohortRanking::AllTime);

        let weeks: Vec<NaiveDate> = trends.series.iter().map(|point| point.week).collect();
        // dave's week of 2024-01-29 has no cohort activity
        assert_eq!(
            weeks,
            vec![monday(1, 15), monday(2, 5), monday(2, 19), monday(3, 4)]
        );
        assert_eq!(trends.series[3].counts["carol"], 3);
        assert_eq!(trends.series[3].counts["alice"], 0);
    }

    #[test]
    fn window_filters_charted_records_but_not_cohort() {
        let window = DateWindow::new(Some(monday(2, 1)), Some(monday(2, 29)));

        let trends = weekly_trends(&dataset(), 3, &window, CohortRanking::AllTime);

        assert_eq!(trends.engineers.len(), 3);
        let weeks: Vec<NaiveDate> = trends.series.iter().map(|point| point.week).collect();
        assert_eq!(weeks, vec![monday(2, 5), monday(2, 19)]);
    }

    #[test]
    fn window_ranking_uses_windowed_history() {
        let window = DateWindow::new(Some(monday(3, 1)), None);

        let trends = weekly_trends(&dataset(), 5, &window, CohortRanking::Window);

        let cohort: Vec<&str> = trends.engineers.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(cohort, vec!["carol"]);
        assert_eq!(trends.series.len(), 1);
    }

    #[test]
    fn flat_serialization() {
        let trends = weekly_trends(&dataset(), 1, &DateWindow::all_time(), CohortRanking::AllTime);

        let json = serde_json::to_value(&trends).unwrap();
        let first = &json["series"][0];
        assert!(first["week"].as_str().unwrap().starts_with("2024-"));
        let login = trends.engineers[0].username.as_str();
        assert!(first[login].is_u64());
    }

    #[test]
    fn empty_dataset_has_empty_trends() {
        let trends = weekly_trends(
            &ActivityDataset::default(),
            5,
            &DateWindow::all_time(),
            CohortRanking::AllTime,
        );

        assert_eq!(trends, TrendResult::default());
    }

    #[test]
    fn cohort_ranking_parses_from_query_values() {
        assert_eq!("all-time".parse::<CohortRanking>().unwrap(), CohortRanking::AllTime);
        assert_eq!("window".parse::<CohortRanking>().unwrap(), CohortRanking::Window);
        assert!("weekly".parse::<CohortRanking>().is_err());
    }
}
