use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use super::*;

/// Index of pull requests already present in a dataset.
///
/// Upstream numbers identify a pull request when available. Otherwise the
/// `(author, merged_at)` pair stands in for it; two records that both carry
/// numbers are distinct whenever the numbers differ, even if the pair matches.
#[derive(Debug, Clone, Default)]
pub struct KnownPullRequests {
    numbers: HashSet<u64>,
    by_merge_time: HashMap<DateTime<Utc>, Vec<(GithubHandle, Option<u64>)>>,
}

impl KnownPullRequests {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a PullRequestRecord>) -> Self {
        let mut known = Self::default();
        for record in records {
            known.insert(record.number, &record.author_username, record.merged_at);
        }
        known
    }

    pub fn insert(&mut self, number: Option<u64>, author: &str, merged_at: DateTime<Utc>) {
        if let Some(number) = number {
            self.numbers.insert(number);
        }
        self.by_merge_time
            .entry(merged_at)
            .or_default()
            .push((author.to_string(), number));
    }

    pub fn contains(&self, number: Option<u64>, author: &str, merged_at: DateTime<Utc>) -> bool {
        if number.is_some_and(|number| self.numbers.contains(&number)) {
            return true;
        }
        self.by_merge_time.get(&merged_at).is_some_and(|entries| {
            entries.iter().any(|(known_author, known_number)| {
                known_author == author && (known_number.is_none() || number.is_none())
            })
        })
    }

    /// Raw pull requests without an author or merge time are never known; they
    /// are dropped later during aggregation.
    pub fn contains_raw(&self, pr: &RawPullRequest) -> bool {
        match (&pr.author, pr.merged_at) {
            (Some(author), Some(merged_at)) => self.contains(pr.number, &author.login, merged_at),
            _ => false,
        }
    }

    fn insert_raw(&mut self, pr: &RawPullRequest) {
        if let (Some(author), Some(merged_at)) = (&pr.author, pr.merged_at) {
            self.insert(pr.number, &author.login, merged_at);
        }
    }
}

/// Merges an overlay of raw pull requests into `base`.
///
/// Overlay pull requests already known to `base` (or repeated inside the
/// overlay) are skipped before aggregation, so contributor counters are only
/// extended by new activity and an overlay made entirely of known pull
/// requests leaves `base` untouched. Returns how many pull requests were added.
pub fn merge(base: &mut ActivityDataset, overlay: impl IntoIterator<Item = RawPullRequest>) -> usize {
    let mut known = base.known_pull_requests();
    let fresh: Vec<RawPullRequest> = overlay
        .into_iter()
        .filter(|pr| {
            if known.contains_raw(pr) {
                false
            } else {
                known.insert_raw(pr);
                true
            }
        })
        .collect();
    if fresh.is_empty() {
        return 0;
    }

    let delta = aggregate(fresh);
    let added = delta.prs.len();
    for (login, activity) in &delta.contributors {
        base.contributors
            .entry(login.clone())
            .or_default()
            .absorb(activity);
    }
    base.prs.extend(delta.prs);
    base.sort_prs();
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn base() -> ActivityDataset {
        let mut dataset = aggregate(vec![
            raw_pr(1, "alice", at(2024, 3, 1, 12), 10, &["bob"]),
            raw_pr(2, "alice", at(2024, 3, 2, 12), 30, &["bob"]),
            raw_pr(3, "bob", at(2024, 3, 3, 12), 5, &[]),
        ]);
        dataset.repo = "acme/widgets".to_string();
        dataset
    }

    #[test]
    fn known_overlay_is_idempotent() {
        let mut dataset = base();
        let expected = dataset.clone();

        let added = merge(
            &mut dataset,
            vec![
                raw_pr(1, "alice", at(2024, 3, 1, 12), 10, &["bob"]),
                raw_pr(3, "bob", at(2024, 3, 3, 12), 5, &[]),
            ],
        );

        assert_eq!(added, 0);
        assert_eq!(dataset, expected);
    }

    #[test]
    fn fresh_overlay_extends_counters() {
        let mut dataset = base();

        let added = merge(
            &mut dataset,
            vec![
                raw_pr(2, "alice", at(2024, 3, 2, 12), 30, &["bob"]),
                raw_pr(4, "alice", at(2024, 3, 4, 12), 60, &["bob", "dave"]),
            ],
        );

        assert_eq!(added, 1);
        let alice = &dataset.contributors["alice"];
        assert_eq!(alice.prs_created, 3);
        // (20 * 2 + 60 * 1) / 3
        assert!((alice.avg_time_to_merge_hours - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(dataset.contributors["bob"].reviews_given, 3);
        assert_eq!(dataset.contributors["bob"].prs_reviewed, 3);
        assert_eq!(dataset.contributors["dave"].reviews_given, 1);
        assert_eq!(dataset.prs.len(), 4);
        assert_eq!(dataset.prs[0].number, Some(4));
    }

    #[test]
    fn repeated_overlay_entries_count_once() {
        let mut dataset = base();
        let pr = raw_pr(9, "carol", at(2024, 4, 1, 0), 2, &[]);

        let added = merge(&mut dataset, vec![pr.clone(), pr]);

        assert_eq!(added, 1);
        assert_eq!(dataset.contributors["carol"].prs_created, 1);
    }

    #[test]
    fn numbers_take_precedence_over_composite_key() {
        let mut dataset = base();
        // same author and merge time as #1 but a different number
        let twin = raw_pr(10, "alice", at(2024, 3, 1, 12), 10, &[]);
        // same number as #2, composite key differs
        let renumbered = raw_pr(2, "alice", at(2024, 5, 1, 12), 10, &[]);

        let added = merge(&mut dataset, vec![twin, renumbered]);

        assert_eq!(added, 1);
        assert_eq!(dataset.contributors["alice"].prs_created, 3);
    }

    #[test]
    fn composite_key_matches_when_number_missing() {
        let mut dataset = base();
        let mut unnumbered = raw_pr(0, "alice", at(2024, 3, 1, 12), 10, &[]);
        unnumbered.number = None;

        assert!(dataset.known_pull_requests().contains_raw(&unnumbered));
        assert_eq!(merge(&mut dataset, vec![unnumbered]), 0);
    }

    #[test]
    fn known_index_matches_number_or_composite_key() {
        let known = base().known_pull_requests();

        assert!(known.contains(Some(1), "nobody", at(2000, 1, 1, 0)));
        assert!(known.contains(None, "bob", at(2024, 3, 3, 12)));
        assert!(!known.contains(None, "alice", at(2024, 3, 3, 12)));
    }
}
