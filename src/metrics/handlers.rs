use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        handlers::normalize_gender,
        jwt::{AdminUser, CurrentUser},
    },
    categories,
    error::ApiError,
    metrics::{
        dto::{
            group_metric_data, CreateMetricRequest, MetricDataGroup, MetricListQuery,
            MetricResponse, UpdateMetricRequest,
        },
        repo::{self, MetricPatch},
    },
    state::AppState,
    visits::dto::DeletedResponse,
};

async fn check_category(state: &AppState, category_id: Option<i64>) -> Result<(), ApiError> {
    if let Some(id) = category_id {
        categories::repo::find(&state.db, id)
            .await?
            .ok_or_else(|| ApiError::BadRequest(format!("No such category {id}")))?;
    }
    Ok(())
}

#[instrument(skip(state, _user))]
pub async fn list_metrics(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(q): Query<MetricListQuery>,
) -> Result<Json<Vec<MetricResponse>>, ApiError> {
    let gender = match q.gender.as_deref() {
        Some(g) => Some(
            normalize_gender(g).ok_or_else(|| ApiError::BadRequest("Gender must be F or M".into()))?,
        ),
        None => None,
    };
    let metrics = repo::list(&state.db, gender.as_deref()).await?;
    Ok(Json(metrics.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, _user))]
pub async fn get_metric(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<MetricResponse>, ApiError> {
    let metric = repo::find(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Metric not found".into()))?;
    Ok(Json(metric.into()))
}

#[instrument(skip(state, _admin, payload))]
pub async fn create_metric(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(payload): Json<CreateMetricRequest>,
) -> Result<(StatusCode, Json<MetricResponse>), ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Metric name is required".into()));
    }
    let gender = normalize_gender(&payload.gender)
        .ok_or_else(|| ApiError::BadRequest("Gender must be F or M".into()))?;
    check_category(&state, payload.category_id).await?;

    let metric = repo::create(
        &state.db,
        name,
        payload.weight,
        &payload.unit_label,
        (payload.total_range_min, payload.total_range_max),
        (payload.healthy_range_min, payload.healthy_range_max),
        &gender,
        payload.category_id,
    )
    .await?;
    info!(metric_id = metric.id, name = %metric.name, "metric created");
    Ok((StatusCode::CREATED, Json(metric.into())))
}

#[instrument(skip(state, _admin, payload))]
pub async fn update_metric(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateMetricRequest>,
) -> Result<Json<MetricResponse>, ApiError> {
    let gender = match payload.gender.as_deref() {
        Some(g) => Some(
            normalize_gender(g).ok_or_else(|| ApiError::BadRequest("Gender must be F or M".into()))?,
        ),
        None => None,
    };
    check_category(&state, payload.category_id).await?;

    let metric = repo::update(
        &state.db,
        id,
        MetricPatch {
            name: payload.name.as_deref().map(str::trim),
            weight: payload.weight,
            unit_label: payload.unit_label.as_deref(),
            total_range_min: payload.total_range_min,
            total_range_max: payload.total_range_max,
            healthy_range_min: payload.healthy_range_min,
            healthy_range_max: payload.healthy_range_max,
            gender: gender.as_deref(),
            category_id: payload.category_id,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Metric not found".into()))?;
    Ok(Json(metric.into()))
}

#[instrument(skip(state, _admin))]
pub async fn delete_metric(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<DeletedResponse>, ApiError> {
    if repo::has_exams(&state.db, id).await? {
        warn!(metric_id = id, "delete refused, metric has exams");
        return Err(ApiError::Conflict("Metric is referenced by exams".into()));
    }
    let deleted = repo::delete(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Metric not found".into()))?;
    info!(metric_id = deleted, "metric deleted");
    Ok(Json(DeletedResponse::new("metric", deleted)))
}

/// GET /metrics/data — metrics grouped by category for one gender, defaulting
/// to the caller's own.
#[instrument(skip(state, user))]
pub async fn metric_data(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<MetricListQuery>,
) -> Result<Json<Vec<MetricDataGroup>>, ApiError> {
    let gender = match q.gender.as_deref() {
        Some(g) => normalize_gender(g)
            .ok_or_else(|| ApiError::BadRequest("Gender must be F or M".into()))?,
        None => user.gender.clone(),
    };
    let categories = categories::repo::list(&state.db).await?;
    let metrics = repo::list(&state.db, Some(&gender)).await?;
    Ok(Json(group_metric_data(&categories, &metrics)))
}
