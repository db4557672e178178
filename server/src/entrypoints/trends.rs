use std::sync::Arc;

use chrono::NaiveDate;
use impact_server::dataset::DatasetService;
use impact_shared::{parse_date, weekly_trends, CohortRanking, DateWindow};
use rocket::{response::status::BadRequest, serde::json::Json, State};

use super::types::TrendsResponse;

const DEFAULT_TOP: usize = 5;
const MAX_TOP: usize = 10;

fn parse_bound(
    name: &str,
    value: Option<&str>,
) -> Result<Option<NaiveDate>, BadRequest<String>> {
    value
        .map(|value| {
            parse_date(value).ok_or_else(|| {
                BadRequest(format!("`{name}` must be a YYYY-MM-DD date, got {value}"))
            })
        })
        .transpose()
}

#[utoipa::path(
    context_path = "/api",
    params(
        ("top" = Option<usize>, Query, description = "Cohort size, default 5, at most 10"),
        ("since" = Option<String>, Query, description = "Inclusive start date, YYYY-MM-DD"),
        ("until" = Option<String>, Query, description = "Inclusive end date, YYYY-MM-DD"),
        ("rank_by" = Option<String>, Query, description = "`all-time` (default) or `window`")
    ),
    responses(
        (status = 200, description = "Weekly merged pull requests per top engineer", body = TrendsResponse),
        (status = 400, description = "Malformed date or ranking")
    )
)]
#[get("/trends?<top>&<since>&<until>&<rank_by>")]
pub async fn get_trends(
    service: &State<Arc<DatasetService>>,
    top: Option<usize>,
    since: Option<&str>,
    until: Option<&str>,
    rank_by: Option<&str>,
) -> Result<Json<TrendsResponse>, BadRequest<String>> {
    let top = top.unwrap_or(DEFAULT_TOP).min(MAX_TOP);
    let window = DateWindow::new(parse_bound("since", since)?, parse_bound("until", until)?);
    let ranking = match rank_by {
        Some(value) => value.parse::<CohortRanking>().map_err(|_| {
            BadRequest(format!("`rank_by` must be `all-time` or `window`, got {value}"))
        })?,
        None => CohortRanking::default(),
    };

    let dataset = service.dataset().await;
    Ok(Json(weekly_trends(&dataset, top, &window, ranking).into()))
}

pub fn stage() -> rocket::fairing::AdHoc {
    rocket::fairing::AdHoc::on_ignite("Installing trend entrypoints", |rocket| async {
        rocket.mount("/api", rocket::routes![get_trends])
    })
}
