//! Axum route handlers for the Matching API.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    Json,
};
use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use tracing::debug;

use crate::errors::AppError;
use crate::matching::repository::{BulkOutcome, Upsert};
use crate::matching::validation::check_references;
use crate::models::matching::Matching;
use crate::models::object_id;
use crate::state::AppState;

pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

#[derive(Debug, Serialize)]
pub struct BulkCreateResponse {
    pub created: usize,
    pub rejected: usize,
    pub results: Vec<BulkOutcome>,
}

fn parse_id_param(key: &str, raw: &str) -> Result<ObjectId, AppError> {
    object_id::parse(raw).ok_or_else(|| AppError::Validation(format!("invalid request data {key}")))
}

fn require_references(matching: &Matching) -> Result<(), AppError> {
    let problems = check_references(matching);
    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(problems.join("; ")))
    }
}

/// GET /api/v1/matching
pub async fn handle_list_matchings(
    State(state): State<AppState>,
) -> Result<(HeaderMap, Json<Vec<Matching>>), AppError> {
    let matchings = state.repo.with_timeout(state.repo.get_all()).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(TOTAL_COUNT_HEADER),
        HeaderValue::from(matchings.len()),
    );
    Ok((headers, Json(matchings)))
}

/// GET /api/v1/matching/summary/:summary_id
pub async fn handle_get_by_summary(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<Matching>, AppError> {
    let summary_id = parse_id_param("summaryId", &raw)?;
    let matching = state
        .repo
        .with_timeout(state.repo.find_by_summary_id(&summary_id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No matching for summary {summary_id}")))?;
    Ok(Json(matching))
}

/// GET /api/v1/matching/:id
pub async fn handle_get_matching(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<Matching>, AppError> {
    let id = parse_id_param("id", &raw)?;
    let matching = state
        .repo
        .with_timeout(state.repo.find_by_id(&id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Matching {id} not found")))?;
    Ok(Json(matching))
}

/// POST /api/v1/matching
///
/// Creates the matching when the body has no id, otherwise updates the one
/// it names. Echoes the stored record back.
pub async fn handle_save_matching(
    State(state): State<AppState>,
    payload: Result<Json<Matching>, JsonRejection>,
) -> Result<Json<Matching>, AppError> {
    let Json(matching) = payload?;
    require_references(&matching)?;

    let upsert = state
        .repo
        .with_timeout(state.repo.create_or_update(&matching))
        .await?;
    debug!("Save matching: {} document(s) modified", upsert.modified_count());

    match upsert {
        Upsert::Created(created) => Ok(Json(created)),
        Upsert::Updated(counts) if counts.matched == 0 => Err(AppError::NotFound(format!(
            "Matching {} not found",
            matching.id.map(|id| id.to_hex()).unwrap_or_default()
        ))),
        Upsert::Updated(_) => Ok(Json(matching)),
    }
}

/// PUT /api/v1/matching/:id
///
/// The id comes from the route; any id in the body is ignored.
pub async fn handle_update_matching(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    payload: Result<Json<Matching>, JsonRejection>,
) -> Result<Json<Matching>, AppError> {
    let id = parse_id_param("id", &raw)?;
    let Json(matching) = payload?;
    require_references(&matching)?;

    let counts = state
        .repo
        .with_timeout(state.repo.update_by_id(&id, &matching))
        .await?;
    if counts.matched == 0 {
        return Err(AppError::NotFound(format!("Matching {id} not found")));
    }

    let updated = state
        .repo
        .with_timeout(state.repo.find_by_id(&id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Matching {id} not found")))?;
    Ok(Json(updated))
}

/// POST /api/v1/matching/bulk/
pub async fn handle_bulk_create(
    State(state): State<AppState>,
    payload: Result<Json<Vec<Matching>>, JsonRejection>,
) -> Result<Json<BulkCreateResponse>, AppError> {
    let Json(matchings) = payload?;
    if matchings.is_empty() {
        return Err(AppError::Validation(
            "bulk create needs at least one matching".to_string(),
        ));
    }

    let results = state
        .repo
        .with_timeout(state.repo.create_many(&matchings))
        .await?;
    let created = results.iter().filter(|r| r.id.is_some()).count();

    Ok(Json(BulkCreateResponse {
        created,
        rejected: results.len() - created,
        results,
    }))
}
