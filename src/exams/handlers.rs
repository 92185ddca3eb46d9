use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::{handlers::normalize_gender, jwt::CurrentUser, repo::User},
    error::ApiError,
    exams::{
        dto::{CreateExamRequest, ExamListQuery, ExamResponse, UpdateExamRequest},
        repo, stats,
    },
    metrics,
    state::AppState,
    visits::{self, dto::DeletedResponse, handlers::scope_for},
};

/// Resolve the referenced visit and metric for an exam write. Non-admins may
/// only attach exams to their own visits and only record metrics matching
/// their own gender; violations surface as 400.
async fn resolve_references(
    state: &AppState,
    user: &User,
    visit_id: i64,
    metric_id: i64,
) -> Result<(), ApiError> {
    visits::repo::find(&state.db, visit_id, scope_for(user, None))
        .await?
        .ok_or_else(|| {
            warn!(visit_id, user_id = user.id, "exam write against unreachable visit");
            ApiError::BadRequest(format!("No such visit {visit_id}"))
        })?;

    let metric = metrics::repo::find(&state.db, metric_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(format!("No such metric {metric_id}")))?;
    if !user.is_admin && metric.gender != user.gender {
        warn!(metric_id, user_id = user.id, "metric gender mismatch");
        return Err(ApiError::BadRequest(
            "Metric does not apply to your gender".into(),
        ));
    }
    Ok(())
}

#[instrument(skip(state, user))]
pub async fn list_exams(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<ExamListQuery>,
) -> Result<Json<Vec<ExamResponse>>, ApiError> {
    let owner = scope_for(&user, None);
    if let Some(visit_id) = q.visit_id {
        // An out-of-scope visit filter reads as missing, like single fetches.
        visits::repo::find(&state.db, visit_id, owner)
            .await?
            .ok_or_else(|| ApiError::NotFound("Visit not found".into()))?;
    }
    let exams = repo::list(&state.db, owner, q.visit_id).await?;
    Ok(Json(exams.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, user, payload))]
pub async fn create_exam(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateExamRequest>,
) -> Result<(StatusCode, Json<ExamResponse>), ApiError> {
    resolve_references(&state, &user, payload.visit_id, payload.metric_id).await?;

    let exam = repo::create(&state.db, payload.visit_id, payload.metric_id, payload.value).await?;
    let row = repo::find(&state.db, exam.id, scope_for(&user, None))
        .await?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("created exam vanished")))?;
    info!(exam_id = exam.id, visit_id = exam.visit_id, "exam created");
    Ok((StatusCode::CREATED, Json(row.into())))
}

#[instrument(skip(state, user))]
pub async fn get_exam(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = repo::find(&state.db, id, scope_for(&user, None))
        .await?
        .ok_or_else(|| ApiError::NotFound("Exam not found".into()))?;
    Ok(Json(exam.into()))
}

#[instrument(skip(state, user, payload))]
pub async fn update_exam(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<Json<ExamResponse>, ApiError> {
    let owner = scope_for(&user, None);
    let current = repo::find(&state.db, id, owner)
        .await?
        .ok_or_else(|| ApiError::NotFound("Exam not found".into()))?;

    if let Some(metric_id) = payload.metric_id {
        if metric_id != current.metric_id {
            resolve_references(&state, &user, current.visit_id, metric_id).await?;
        }
    }

    let exam = repo::update(&state.db, id, owner, payload.value, payload.metric_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Exam not found".into()))?;
    let row = repo::find(&state.db, exam.id, owner)
        .await?
        .ok_or_else(|| ApiError::NotFound("Exam not found".into()))?;
    Ok(Json(row.into()))
}

#[instrument(skip(state, user))]
pub async fn delete_exam(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let deleted = repo::delete(&state.db, id, scope_for(&user, None))
        .await?
        .ok_or_else(|| ApiError::NotFound("Exam not found".into()))?;
    info!(exam_id = deleted, "exam deleted");
    Ok(Json(DeletedResponse::new("exam", deleted)))
}

/// GET /exams/statistics. Non-admins always get statistics over their own
/// visits; admins either name visit ids explicitly or filter the population
/// by gender, age range and per-metric value ranges.
#[instrument(skip(state, user, pairs))]
pub async fn statistics(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<stats::StatsEntry>>, ApiError> {
    let q = stats::parse_query(&pairs).map_err(ApiError::BadRequest)?;

    let visit_ids = if !user.is_admin {
        repo::own_visit_ids(&state.db, user.id).await?
    } else if !q.visits.is_empty() {
        q.visits
    } else {
        let gender = q
            .gender
            .as_deref()
            .and_then(normalize_gender)
            .ok_or_else(|| ApiError::BadRequest("A valid gender filter is required".into()))?;
        let age = q
            .age
            .ok_or_else(|| ApiError::BadRequest("An age range is required".into()))?;

        let candidates = repo::visit_owners(&state.db).await?;
        let candidate_ids: Vec<i64> = candidates.iter().map(|c| c.visit_id).collect();
        let samples = repo::metric_samples(&state.db, &candidate_ids).await?;
        let today = OffsetDateTime::now_utc().date();
        stats::filter_visits(&candidates, &samples, &gender, age, &q.metric_filters, today)
    };

    let samples = repo::metric_samples(&state.db, &visit_ids).await?;
    Ok(Json(stats::aggregate(&samples)))
}
