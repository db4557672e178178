use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::*;

/// Merge-time ceiling used when no eligible contributor has merge data.
pub const FALLBACK_P90_MERGE_HOURS: f64 = 72.0;

/// Cross-contributor maxima that every population-relative signal is
/// normalized against. Only eligible contributors are counted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopulationStatistics {
    pub max_prs: u32,
    pub max_reviews_given: u32,
    pub max_files_changed: u64,
    pub max_avg_files_per_pr: f64,
    pub max_combined: u32,
    pub p90_merge_hours: f64,
}

impl Default for PopulationStatistics {
    fn default() -> Self {
        Self {
            max_prs: 1,
            max_reviews_given: 1,
            max_files_changed: 1,
            max_avg_files_per_pr: 1.0,
            max_combined: 1,
            p90_merge_hours: FALLBACK_P90_MERGE_HOURS,
        }
    }
}

impl PopulationStatistics {
    pub fn from_contributors<'a>(
        contributors: impl IntoIterator<Item = &'a ContributorActivity>,
    ) -> Self {
        let eligible: Vec<&ContributorActivity> = contributors
            .into_iter()
            .filter(|c| c.is_eligible())
            .collect();
        if eligible.is_empty() {
            return Self::default();
        }

        let max_avg_files_per_pr = eligible
            .iter()
            .map(|c| c.avg_files_per_pr())
            .fold(0.0, f64::max);

        Self {
            max_prs: eligible.iter().map(|c| c.prs_created).max().unwrap_or(1),
            max_reviews_given: eligible.iter().map(|c| c.reviews_given).max().unwrap_or(1),
            max_files_changed: eligible
                .iter()
                .map(|c| c.total_files_changed)
                .max()
                .unwrap_or(1),
            max_avg_files_per_pr,
            max_combined: eligible
                .iter()
                .map(|c| c.prs_created + c.reviews_given)
                .max()
                .unwrap_or(1),
            p90_merge_hours: p90_merge_hours(&eligible),
        }
    }
}

// Zero merge hours means "no data"; counting them would drag the percentile down.
fn p90_merge_hours(eligible: &[&ContributorActivity]) -> f64 {
    let hours = eligible
        .iter()
        .map(|c| c.avg_time_to_merge_hours)
        .filter(|hours| hours.is_finite() && *hours > 0.0)
        .sorted_by(f64::total_cmp)
        .collect_vec();
    if hours.is_empty() {
        return FALLBACK_P90_MERGE_HOURS;
    }
    let index = ((0.9 * hours.len() as f64).floor() as usize).min(hours.len() - 1);
    hours[index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::activity;

    #[test]
    fn empty_population_uses_fallbacks() {
        let stats = PopulationStatistics::from_contributors(std::iter::empty());

        assert_eq!(stats.p90_merge_hours, 72.0);
        assert_eq!(stats.max_prs, 1);
        assert_eq!(stats.max_reviews_given, 1);
        assert_eq!(stats.max_files_changed, 1);
        assert_eq!(stats.max_avg_files_per_pr, 1.0);
        assert_eq!(stats.max_combined, 1);
    }

    #[test]
    fn ineligible_contributors_are_ignored() {
        let population = [activity(1, 500, 1.0, 90, 50), activity(2, 10, 8.0, 3, 2)];

        let stats = PopulationStatistics::from_contributors(&population);

        assert_eq!(stats.max_prs, 2);
        assert_eq!(stats.max_files_changed, 10);
        assert_eq!(stats.max_reviews_given, 3);
        assert_eq!(stats.max_combined, 5);
        assert_eq!(stats.max_avg_files_per_pr, 5.0);
        assert_eq!(stats.p90_merge_hours, 8.0);
    }

    #[test]
    fn only_ineligible_contributors_is_degenerate() {
        let population = [activity(1, 500, 1.0, 90, 50), activity(0, 0, 0.0, 12, 4)];

        assert_eq!(
            PopulationStatistics::from_contributors(&population),
            PopulationStatistics::default()
        );
    }

    #[test]
    fn percentile_skips_zero_merge_hours() {
        let mut population: Vec<ContributorActivity> = (1..=10)
            .map(|hours| activity(3, 10, hours as f64, 0, 0))
            .collect();
        population.push(activity(3, 10, 0.0, 0, 0));
        population.push(activity(3, 10, 0.0, 0, 0));

        let stats = PopulationStatistics::from_contributors(&population);

        // ten positive values, index floor(0.9 * 10) = 9
        assert_eq!(stats.p90_merge_hours, 10.0);
    }

    #[test]
    fn percentile_indexes_floor_of_ninety_percent() {
        let population: Vec<ContributorActivity> = [5.0, 1.0, 3.0, 2.0, 4.0]
            .into_iter()
            .map(|hours| activity(2, 4, hours, 0, 0))
            .collect();

        // sorted [1, 2, 3, 4, 5], index floor(4.5) = 4
        assert_eq!(
            PopulationStatistics::from_contributors(&population).p90_merge_hours,
            5.0
        );
    }

    #[test]
    fn no_merge_data_falls_back() {
        let population = [activity(4, 10, 0.0, 1, 1)];

        let stats = PopulationStatistics::from_contributors(&population);

        assert_eq!(stats.p90_merge_hours, FALLBACK_P90_MERGE_HOURS);
        assert_eq!(stats.max_prs, 4);
    }
}
