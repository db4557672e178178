use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use super::*;

// Weights are percentages. Each group must sum to 100.
pub const QUALITY_WEIGHT: u32 = 30;
pub const VELOCITY_WEIGHT: u32 = 30;
pub const COLLABORATION_WEIGHT: u32 = 20;
pub const LEADERSHIP_WEIGHT: u32 = 20;

pub const MERGE_SPEED_WEIGHT: u32 = 50;
pub const PR_SIZE_WEIGHT: u32 = 30;
pub const REVIEW_ACTIVITY_WEIGHT: u32 = 20;

pub const CONSISTENCY_WEIGHT: u32 = 40;
pub const COMPLEXITY_WEIGHT: u32 = 60;

pub const REVIEW_VOLUME_WEIGHT: u32 = 70;
pub const REVIEW_DEPTH_WEIGHT: u32 = 30;

pub const OWNERSHIP_WEIGHT: u32 = 60;
pub const BALANCE_WEIGHT: u32 = 40;

const _: () = assert!(
    QUALITY_WEIGHT + VELOCITY_WEIGHT + COLLABORATION_WEIGHT + LEADERSHIP_WEIGHT == 100
);
const _: () = assert!(MERGE_SPEED_WEIGHT + PR_SIZE_WEIGHT + REVIEW_ACTIVITY_WEIGHT == 100);
const _: () = assert!(CONSISTENCY_WEIGHT + COMPLEXITY_WEIGHT == 100);
const _: () = assert!(REVIEW_VOLUME_WEIGHT + REVIEW_DEPTH_WEIGHT == 100);
const _: () = assert!(OWNERSHIP_WEIGHT + BALANCE_WEIGHT == 100);

/// Average changed lines per pull request that earns a full size score.
pub const PR_SIZE_SWEET_SPOT: (f64, f64) = (200.0, 500.0);
/// Review events per reviewed pull request that earns a full depth score.
pub const REVIEW_DEPTH_TARGET: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Quality,
    Velocity,
    Collaboration,
    Leadership,
}

impl Dimension {
    pub fn weight(&self) -> u32 {
        match self {
            Dimension::Quality => QUALITY_WEIGHT,
            Dimension::Velocity => VELOCITY_WEIGHT,
            Dimension::Collaboration => COLLABORATION_WEIGHT,
            Dimension::Leadership => LEADERSHIP_WEIGHT,
        }
    }
}

fn weighted(weight: u32, score: f64) -> f64 {
    weight as f64 / 100.0 * score
}

/// `value / max` as a 0-100 score, saturating at 100. A non-positive maximum
/// scores zero.
fn normalized(value: f64, max: f64) -> f64 {
    if max <= 0.0 {
        return 0.0;
    }
    (value / max).clamp(0.0, 1.0) * 100.0
}

pub fn merge_speed_score(contributor: &ContributorActivity, stats: &PopulationStatistics) -> f64 {
    let ceiling = stats.p90_merge_hours;
    if ceiling <= 0.0 {
        return 0.0;
    }
    let hours = contributor.avg_time_to_merge_hours.clamp(0.0, ceiling);
    100.0 * (1.0 - hours / ceiling)
}

/// Fixed heuristic, deliberately not population-relative.
pub fn pr_size_score(contributor: &ContributorActivity) -> f64 {
    let (low, high) = PR_SIZE_SWEET_SPOT;
    let size = contributor.avg_change_size();
    if size < low {
        50.0 + (size / low) * 50.0
    } else if size <= high {
        100.0
    } else {
        (100.0 - (size - high) / 20.0).max(50.0)
    }
}

pub fn review_activity_score(
    contributor: &ContributorActivity,
    stats: &PopulationStatistics,
) -> f64 {
    normalized(
        contributor.reviews_given as f64,
        stats.max_reviews_given as f64,
    )
}

pub fn consistency_score(contributor: &ContributorActivity, stats: &PopulationStatistics) -> f64 {
    normalized(contributor.prs_created as f64, stats.max_prs as f64)
}

pub fn complexity_score(contributor: &ContributorActivity, stats: &PopulationStatistics) -> f64 {
    normalized(contributor.avg_files_per_pr(), stats.max_avg_files_per_pr)
}

pub fn review_volume_score(contributor: &ContributorActivity, stats: &PopulationStatistics) -> f64 {
    normalized(
        contributor.reviews_given as f64,
        stats.max_reviews_given as f64,
    )
}

pub fn review_depth_score(contributor: &ContributorActivity) -> f64 {
    if contributor.prs_reviewed == 0 {
        return 0.0;
    }
    let events_per_pr = contributor.reviews_given as f64 / contributor.prs_reviewed as f64;
    normalized(events_per_pr, REVIEW_DEPTH_TARGET)
}

pub fn ownership_score(contributor: &ContributorActivity, stats: &PopulationStatistics) -> f64 {
    normalized(
        contributor.total_files_changed as f64,
        stats.max_files_changed as f64,
    )
}

/// Zero unless the contributor both authors and reviews.
pub fn balance_score(contributor: &ContributorActivity, stats: &PopulationStatistics) -> f64 {
    if contributor.prs_created == 0 || contributor.reviews_given == 0 {
        return 0.0;
    }
    normalized(
        (contributor.prs_created + contributor.reviews_given) as f64,
        stats.max_combined as f64,
    )
}

pub fn quality_score(contributor: &ContributorActivity, stats: &PopulationStatistics) -> f64 {
    (weighted(MERGE_SPEED_WEIGHT, merge_speed_score(contributor, stats))
        + weighted(PR_SIZE_WEIGHT, pr_size_score(contributor))
        + weighted(
            REVIEW_ACTIVITY_WEIGHT,
            review_activity_score(contributor, stats),
        ))
    .clamp(0.0, 100.0)
}

pub fn velocity_score(contributor: &ContributorActivity, stats: &PopulationStatistics) -> f64 {
    (weighted(CONSISTENCY_WEIGHT, consistency_score(contributor, stats))
        + weighted(COMPLEXITY_WEIGHT, complexity_score(contributor, stats)))
    .clamp(0.0, 100.0)
}

pub fn collaboration_score(contributor: &ContributorActivity, stats: &PopulationStatistics) -> f64 {
    (weighted(REVIEW_VOLUME_WEIGHT, review_volume_score(contributor, stats))
        + weighted(REVIEW_DEPTH_WEIGHT, review_depth_score(contributor)))
    .clamp(0.0, 100.0)
}

pub fn leadership_score(contributor: &ContributorActivity, stats: &PopulationStatistics) -> f64 {
    (weighted(OWNERSHIP_WEIGHT, ownership_score(contributor, stats))
        + weighted(BALANCE_WEIGHT, balance_score(contributor, stats)))
    .clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DimensionScores {
    pub quality: f64,
    pub velocity: f64,
    pub collaboration: f64,
    pub leadership: f64,
}

impl DimensionScores {
    pub fn compute(contributor: &ContributorActivity, stats: &PopulationStatistics) -> Self {
        Self {
            quality: quality_score(contributor, stats),
            velocity: velocity_score(contributor, stats),
            collaboration: collaboration_score(contributor, stats),
            leadership: leadership_score(contributor, stats),
        }
    }

    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Quality => self.quality,
            Dimension::Velocity => self.velocity,
            Dimension::Collaboration => self.collaboration,
            Dimension::Leadership => self.leadership,
        }
    }

    pub fn impact(&self) -> f64 {
        Dimension::iter()
            .map(|dimension| weighted(dimension.weight(), self.get(dimension)))
            .sum::<f64>()
            .clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineerStats {
    pub prs_created: u32,
    pub reviews_given: u32,
    pub files_changed: u64,
    pub avg_merge_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineerScore {
    pub username: GithubHandle,
    pub name: String,
    pub avatar_url: String,
    pub impact_score: f64,
    pub quality_score: f64,
    pub velocity_score: f64,
    pub collaboration_score: f64,
    pub leadership_score: f64,
    pub stats: EngineerStats,
}

impl EngineerScore {
    pub fn new(
        username: &str,
        contributor: &ContributorActivity,
        stats: &PopulationStatistics,
    ) -> Self {
        let scores = DimensionScores::compute(contributor, stats);
        let mut identity = contributor.clone();
        identity.fill_identity(username);

        Self {
            username: username.to_string(),
            name: identity.name,
            avatar_url: identity.avatar_url,
            impact_score: round_to(scores.impact(), 1),
            quality_score: round_to(scores.quality, 1),
            velocity_score: round_to(scores.velocity, 1),
            collaboration_score: round_to(scores.collaboration, 1),
            leadership_score: round_to(scores.leadership, 1),
            stats: EngineerStats {
                prs_created: contributor.prs_created,
                reviews_given: contributor.reviews_given,
                files_changed: contributor.total_files_changed,
                avg_merge_time: contributor.avg_time_to_merge_hours,
            },
        }
    }

    /// Weakest of the four rounded dimension scores.
    pub fn weakest_dimension(&self) -> f64 {
        self.quality_score
            .min(self.velocity_score)
            .min(self.collaboration_score)
            .min(self.leadership_score)
    }
}

/// Scores every eligible contributor against the current population and ranks
/// them by impact, highest first. Ties keep login order.
pub fn rank_engineers(
    contributors: &BTreeMap<GithubHandle, ContributorActivity>,
) -> Vec<EngineerScore> {
    let stats = PopulationStatistics::from_contributors(contributors.values());
    let mut scores: Vec<EngineerScore> = contributors
        .iter()
        .filter(|(_, contributor)| contributor.is_eligible())
        .map(|(login, contributor)| EngineerScore::new(login, contributor, &stats))
        .collect();
    scores.sort_by(|a, b| b.impact_score.total_cmp(&a.impact_score));
    scores
}
