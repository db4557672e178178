use chrono::{DateTime, Utc};
use impact_shared::{
    DimensionDescription, EngineerScore, Insight, Methodology, TrendEngineer, TrendPoint,
    TrendResult,
};
use impact_server::backfill::BackfillOutcome;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct IndexResponse {
    pub message: String,
    pub endpoints: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub repo: String,
    pub fetched_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EngineerStatsResponse {
    pub prs_created: u32,
    pub reviews_given: u32,
    pub files_changed: u64,
    pub avg_merge_time: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EngineerResponse {
    pub username: String,
    pub name: String,
    pub avatar_url: String,
    pub impact_score: f64,
    pub quality_score: f64,
    pub velocity_score: f64,
    pub collaboration_score: f64,
    pub leadership_score: f64,
    pub stats: EngineerStatsResponse,
}

impl From<EngineerScore> for EngineerResponse {
    fn from(score: EngineerScore) -> Self {
        Self {
            username: score.username,
            name: score.name,
            avatar_url: score.avatar_url,
            impact_score: score.impact_score,
            quality_score: score.quality_score,
            velocity_score: score.velocity_score,
            collaboration_score: score.collaboration_score,
            leadership_score: score.leadership_score,
            stats: EngineerStatsResponse {
                prs_created: score.stats.prs_created,
                reviews_given: score.stats.reviews_given,
                files_changed: score.stats.files_changed,
                avg_merge_time: score.stats.avg_merge_time,
            },
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct InsightResponse {
    /// One of `fastest_merger`, `review_champion`, `most_prolific`,
    /// `broadest_reach`, `most_well_rounded`.
    pub kind: String,
    pub title: String,
    pub username: String,
    pub name: String,
    pub value: String,
    pub description: String,
}

impl From<Insight> for InsightResponse {
    fn from(insight: Insight) -> Self {
        Self {
            kind: insight.kind.as_ref().to_string(),
            title: insight.title,
            username: insight.username,
            name: insight.name,
            value: insight.value,
            description: insight.description,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TrendEngineerResponse {
    pub username: String,
    pub name: String,
}

impl From<TrendEngineer> for TrendEngineerResponse {
    fn from(engineer: TrendEngineer) -> Self {
        Self {
            username: engineer.username,
            name: engineer.name,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TrendsResponse {
    pub engineers: Vec<TrendEngineerResponse>,
    /// `{ "week": "YYYY-MM-DD", "<username>": count, ... }` per active week.
    #[schema(value_type = Vec<Object>)]
    pub series: Vec<TrendPoint>,
}

impl From<TrendResult> for TrendsResponse {
    fn from(result: TrendResult) -> Self {
        Self {
            engineers: result.engineers.into_iter().map(Into::into).collect(),
            series: result.series,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DimensionResponse {
    pub name: String,
    pub weight: f64,
    pub description: String,
    pub signals: Vec<String>,
}

impl From<DimensionDescription> for DimensionResponse {
    fn from(dimension: DimensionDescription) -> Self {
        Self {
            name: dimension.name,
            weight: dimension.weight,
            description: dimension.description,
            signals: dimension.signals,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MethodologyResponse {
    pub overview: String,
    pub dimensions: Vec<DimensionResponse>,
    pub philosophy: String,
}

impl From<Methodology> for MethodologyResponse {
    fn from(methodology: Methodology) -> Self {
        Self {
            overview: methodology.overview,
            dimensions: methodology.dimensions.into_iter().map(Into::into).collect(),
            philosophy: methodology.philosophy,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BackfillResponse {
    /// `progressed`, `already_complete`, `already_running`, `unavailable` or `failed`.
    pub status: String,
    pub pages_fetched: u32,
    pub pull_requests_added: usize,
    pub next_page: Option<u32>,
    pub complete: bool,
}

impl BackfillResponse {
    pub fn failed() -> Self {
        Self::status("failed", false)
    }

    fn status(status: &str, complete: bool) -> Self {
        Self {
            status: status.to_string(),
            pages_fetched: 0,
            pull_requests_added: 0,
            next_page: None,
            complete,
        }
    }
}

impl From<BackfillOutcome> for BackfillResponse {
    fn from(outcome: BackfillOutcome) -> Self {
        match outcome {
            BackfillOutcome::AlreadyComplete => Self::status("already_complete", true),
            BackfillOutcome::AlreadyRunning => Self::status("already_running", false),
            BackfillOutcome::Unavailable => Self::status("unavailable", false),
            BackfillOutcome::Progressed {
                pages_fetched,
                pull_requests_added,
                next_page,
                complete,
            } => Self {
                status: "progressed".to_string(),
                pages_fetched,
                pull_requests_added,
                next_page: Some(next_page),
                complete,
            },
        }
    }
}
