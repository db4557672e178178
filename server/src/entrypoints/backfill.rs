use std::sync::Arc;

use impact_server::backfill::BackfillCrawler;
use rocket::{serde::json::Json, State};
use tracing::error;

use super::types::BackfillResponse;

#[utoipa::path(
    context_path = "/api",
    responses((status = 200, description = "Outcome of one backfill pass", body = BackfillResponse))
)]
#[post("/backfill")]
pub async fn run_backfill(crawler: &State<Arc<BackfillCrawler>>) -> Json<BackfillResponse> {
    match crawler.run().await {
        Ok(outcome) => Json(outcome.into()),
        Err(e) => {
            error!("Failed to run backfill pass: {e:#}");
            Json(BackfillResponse::failed())
        }
    }
}

pub fn stage() -> rocket::fairing::AdHoc {
    rocket::fairing::AdHoc::on_ignite("Installing backfill entrypoints", |rocket| async {
        rocket.mount("/api", rocket::routes![run_backfill])
    })
}
