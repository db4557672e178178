use std::sync::Arc;

use impact_server::dataset::DatasetService;
use rocket::{fairing::AdHoc, serde::json::Json, State};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod backfill;
pub mod engineers;
pub mod trends;
pub mod types;

use types::{HealthResponse, IndexResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        get_index,
        get_health,
        engineers::get_top_engineers,
        engineers::get_all_engineers,
        engineers::get_insights,
        engineers::get_methodology,
        trends::get_trends,
        backfill::run_backfill,
    ),
    components(schemas(
        types::IndexResponse,
        types::HealthResponse,
        types::EngineerResponse,
        types::EngineerStatsResponse,
        types::InsightResponse,
        types::TrendsResponse,
        types::TrendEngineerResponse,
        types::MethodologyResponse,
        types::DimensionResponse,
        types::BackfillResponse,
    )),
    tags((name = "impact", description = "Engineering impact scoring"))
)]
pub struct ApiDoc;

#[utoipa::path(
    responses((status = 200, description = "Service name and endpoints", body = IndexResponse))
)]
#[get("/")]
pub async fn get_index() -> Json<IndexResponse> {
    let endpoints = [
        "/api/top-engineers",
        "/api/all-engineers",
        "/api/insights",
        "/api/trends",
        "/api/methodology",
        "/api/health",
        "/api/backfill",
    ];
    Json(IndexResponse {
        message: "Engineering Impact Dashboard API".to_string(),
        endpoints: endpoints.into_iter().map(String::from).collect(),
    })
}

#[utoipa::path(
    context_path = "/api",
    responses((status = 200, description = "Liveness and freshness of the served dataset", body = HealthResponse))
)]
#[get("/health")]
pub async fn get_health(service: &State<Arc<DatasetService>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        repo: service.base().repo.clone(),
        fetched_at: service.fetched_at(),
    })
}

pub fn stage() -> AdHoc {
    AdHoc::on_ignite("Installing entrypoints", |rocket| async {
        rocket
            .mount("/", rocket::routes![get_index])
            .mount("/api", rocket::routes![get_health])
            .mount(
                "/",
                SwaggerUi::new("/swagger-ui/<_..>")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
            .attach(engineers::stage())
            .attach(trends::stage())
            .attach(backfill::stage())
    })
}
