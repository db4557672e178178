use itertools::Itertools;
use num_format::{Locale, ToFormattedString};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, IntoEnumIterator};

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InsightKind {
    FastestMerger,
    ReviewChampion,
    MostProlific,
    BroadestReach,
    MostWellRounded,
}

impl InsightKind {
    pub fn title(&self) -> &'static str {
        match self {
            InsightKind::FastestMerger => "Fastest Merger",
            InsightKind::ReviewChampion => "Review Champion",
            InsightKind::MostProlific => "Most Prolific",
            InsightKind::BroadestReach => "Broadest Reach",
            InsightKind::MostWellRounded => "Most Well-Rounded",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            InsightKind::FastestMerger => "Lowest average time from opening to merge",
            InsightKind::ReviewChampion => "Most code reviews given to teammates",
            InsightKind::MostProlific => "Most pull requests merged",
            InsightKind::BroadestReach => "Most files touched across the codebase",
            InsightKind::MostWellRounded => {
                "Highest weakest-dimension score across all four dimensions"
            }
        }
    }

    fn pick(&self, candidates: &[&EngineerScore]) -> Option<(usize, String)> {
        let (index, value) = match self {
            InsightKind::FastestMerger => first_best(
                candidates,
                |e| Some(e.stats.avg_merge_time).filter(|hours| *hours > 0.0),
                Prefer::Lowest,
            )?,
            InsightKind::ReviewChampion => first_best(
                candidates,
                |e| Some(e.stats.reviews_given as f64),
                Prefer::Highest,
            )?,
            InsightKind::MostProlific => first_best(
                candidates,
                |e| Some(e.stats.prs_created as f64),
                Prefer::Highest,
            )?,
            InsightKind::BroadestReach => first_best(
                candidates,
                |e| Some(e.stats.files_changed as f64),
                Prefer::Highest,
            )?,
            InsightKind::MostWellRounded => first_best(
                candidates,
                |e| Some(e.weakest_dimension()),
                Prefer::Highest,
            )?,
        };

        let engineer = candidates[index];
        let value = match self {
            InsightKind::FastestMerger => format!("{value:.1}h"),
            InsightKind::ReviewChampion => format!(
                "{} reviews",
                engineer.stats.reviews_given.to_formatted_string(&Locale::en)
            ),
            InsightKind::MostProlific => format!(
                "{} PRs",
                engineer.stats.prs_created.to_formatted_string(&Locale::en)
            ),
            InsightKind::BroadestReach => format!(
                "{} files",
                engineer.stats.files_changed.to_formatted_string(&Locale::en)
            ),
            InsightKind::MostWellRounded => format!("{value:.1} min dimension"),
        };
        Some((index, value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub title: String,
    pub username: GithubHandle,
    pub name: String,
    pub value: String,
    pub description: String,
}

enum Prefer {
    Lowest,
    Highest,
}

// Strict comparison: on ties the earlier candidate stays.
fn first_best(
    candidates: &[&EngineerScore],
    key: impl Fn(&EngineerScore) -> Option<f64>,
    prefer: Prefer,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (index, engineer) in candidates.iter().enumerate() {
        let Some(value) = key(*engineer) else {
            continue;
        };
        let better = match (best, &prefer) {
            (None, _) => true,
            (Some((_, current)), Prefer::Lowest) => value < current,
            (Some((_, current)), Prefer::Highest) => value > current,
        };
        if better {
            best = Some((index, value));
        }
    }
    best
}

/// Superlatives over an already scored population. Candidates are scanned in
/// login order so ties resolve the same way on every pass. A superlative with
/// no qualifying candidate is left out.
pub fn generate_insights(engineers: &[EngineerScore]) -> Vec<Insight> {
    let candidates = engineers
        .iter()
        .sorted_by(|a, b| a.username.cmp(&b.username))
        .collect_vec();

    InsightKind::iter()
        .filter_map(|kind| {
            let (index, value) = kind.pick(&candidates)?;
            let engineer = candidates[index];
            Some(Insight {
                kind,
                title: kind.title().to_string(),
                username: engineer.username.clone(),
                name: engineer.name.clone(),
                value,
                description: kind.description().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engineer(
        username: &str,
        prs_created: u32,
        reviews_given: u32,
        files_changed: u64,
        avg_merge_time: f64,
        dimensions: [f64; 4],
    ) -> EngineerScore {
        EngineerScore {
            username: username.to_string(),
            name: username.to_uppercase(),
            avatar_url: default_avatar(username),
            impact_score: 0.0,
            quality_score: dimensions[0],
            velocity_score: dimensions[1],
            collaboration_score: dimensions[2],
            leadership_score: dimensions[3],
            stats: EngineerStats {
                prs_created,
                reviews_given,
                files_changed,
                avg_merge_time,
            },
        }
    }

    fn winner(insights: &[Insight], kind: InsightKind) -> Option<&Insight> {
        insights.iter().find(|insight| insight.kind == kind)
    }

    #[test]
    fn picks_each_superlative() {
        let engineers = vec![
            engineer("alice", 12, 3, 1200, 30.0, [80.0, 90.0, 20.0, 70.0]),
            engineer("bob", 4, 25, 40, 0.0, [60.0, 30.0, 95.0, 50.0]),
            engineer("carol", 6, 10, 300, 5.24, [65.0, 60.0, 55.0, 62.0]),
        ];

        let insights = generate_insights(&engineers);

        assert_eq!(insights.len(), 5);
        let fastest = winner(&insights, InsightKind::FastestMerger).unwrap();
        // zero merge time means no data
        assert_eq!(fastest.username, "carol");
        assert_eq!(fastest.value, "5.2h");
        let champion = winner(&insights, InsightKind::ReviewChampion).unwrap();
        assert_eq!(champion.username, "bob");
        assert_eq!(champion.value, "25 reviews");
        let prolific = winner(&insights, InsightKind::MostProlific).unwrap();
        assert_eq!(prolific.username, "alice");
        assert_eq!(prolific.name, "ALICE");
        let reach = winner(&insights, InsightKind::BroadestReach).unwrap();
        assert_eq!(reach.value, "1,200 files");
        let rounded = winner(&insights, InsightKind::MostWellRounded).unwrap();
        assert_eq!(rounded.username, "carol");
        assert_eq!(rounded.value, "55.0 min dimension");
        assert_eq!(rounded.title, "Most Well-Rounded");
        assert_eq!(rounded.kind.as_ref(), "most_well_rounded");
    }

    #[test]
    fn ties_go_to_first_login() {
        let engineers = vec![
            engineer("zoe", 5, 9, 10, 2.0, [50.0; 4]),
            engineer("adam", 5, 9, 10, 2.0, [50.0; 4]),
        ];

        let insights = generate_insights(&engineers);

        assert!(insights.iter().all(|insight| insight.username == "adam"));
    }

    #[test]
    fn missing_merge_data_skips_fastest_merger() {
        let engineers = vec![engineer("alice", 2, 1, 3, 0.0, [10.0; 4])];

        let insights = generate_insights(&engineers);

        assert_eq!(insights.len(), 4);
        assert!(winner(&insights, InsightKind::FastestMerger).is_none());
    }

    #[test]
    fn empty_population_has_no_insights() {
        assert!(generate_insights(&[]).is_empty());
    }
}
