use std::sync::Arc;

use impact_server::dataset::DatasetService;
use impact_shared::{generate_insights, rank_engineers, Methodology};
use rocket::{serde::json::Json, State};

use super::types::{EngineerResponse, InsightResponse, MethodologyResponse};

const DEFAULT_TOP_ENGINEERS: usize = 5;
const MAX_TOP_ENGINEERS: usize = 20;

#[utoipa::path(
    context_path = "/api",
    params(("limit" = Option<usize>, Query, description = "Number of engineers, default 5, at most 20")),
    responses((status = 200, description = "Most impactful engineers", body = [EngineerResponse]))
)]
#[get("/top-engineers?<limit>")]
pub async fn get_top_engineers(
    service: &State<Arc<DatasetService>>,
    limit: Option<usize>,
) -> Json<Vec<EngineerResponse>> {
    let limit = limit.unwrap_or(DEFAULT_TOP_ENGINEERS).min(MAX_TOP_ENGINEERS);
    let dataset = service.dataset().await;
    Json(
        rank_engineers(&dataset.contributors)
            .into_iter()
            .take(limit)
            .map(Into::into)
            .collect(),
    )
}

#[utoipa::path(
    context_path = "/api",
    responses((status = 200, description = "Every eligible engineer ranked by impact", body = [EngineerResponse]))
)]
#[get("/all-engineers")]
pub async fn get_all_engineers(
    service: &State<Arc<DatasetService>>,
) -> Json<Vec<EngineerResponse>> {
    let dataset = service.dataset().await;
    Json(
        rank_engineers(&dataset.contributors)
            .into_iter()
            .map(Into::into)
            .collect(),
    )
}

#[utoipa::path(
    context_path = "/api",
    responses((status = 200, description = "Team superlatives", body = [InsightResponse]))
)]
#[get("/insights")]
pub async fn get_insights(service: &State<Arc<DatasetService>>) -> Json<Vec<InsightResponse>> {
    let dataset = service.dataset().await;
    let ranked = rank_engineers(&dataset.contributors);
    Json(
        generate_insights(&ranked)
            .into_iter()
            .map(Into::into)
            .collect(),
    )
}

#[utoipa::path(
    context_path = "/api",
    responses((status = 200, description = "How impact is scored", body = MethodologyResponse))
)]
#[get("/methodology")]
pub async fn get_methodology() -> Json<MethodologyResponse> {
    Json(Methodology::default().into())
}

pub fn stage() -> rocket::fairing::AdHoc {
    rocket::fairing::AdHoc::on_ignite("Installing engineer entrypoints", |rocket| async {
        rocket.mount(
            "/api",
            rocket::routes![
                get_top_engineers,
                get_all_engineers,
                get_insights,
                get_methodology
            ],
        )
    })
}
