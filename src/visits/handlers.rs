use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use crate::{
    auth::{jwt::CurrentUser, repo::User},
    error::ApiError,
    state::AppState,
    visits::{
        dto::{
            CreateVisitRequest, DeletedResponse, UpdateVisitRequest, VisitListQuery, VisitResponse,
        },
        repo,
    },
};

/// The ownership predicate for a caller: admins see everything (optionally
/// narrowed), everyone else only their own rows.
pub(crate) fn scope_for(user: &User, requested_owner: Option<i64>) -> Option<i64> {
    if user.is_admin {
        requested_owner
    } else {
        Some(user.id)
    }
}

#[instrument(skip(state, user))]
pub async fn list_visits(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<VisitListQuery>,
) -> Result<Json<Vec<VisitResponse>>, ApiError> {
    let owner = scope_for(&user, q.user_id);
    let visits = repo::list(&state.db, owner).await?;
    Ok(Json(visits.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, user, payload))]
pub async fn create_visit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateVisitRequest>,
) -> Result<(StatusCode, Json<VisitResponse>), ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Visit name is required".into()));
    }

    let owner_id = match payload.user_id {
        Some(requested) if user.is_admin => {
            let target = User::find_by_id(&state.db, requested)
                .await?
                .ok_or_else(|| ApiError::BadRequest(format!("No such user {requested}")))?;
            target.id
        }
        // Non-admins always create for themselves.
        _ => user.id,
    };

    let visit = repo::create(&state.db, name, owner_id).await?;
    info!(visit_id = visit.id, user_id = owner_id, "visit created");
    Ok((StatusCode::CREATED, Json(visit.into())))
}

#[instrument(skip(state, user))]
pub async fn get_visit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<VisitResponse>, ApiError> {
    let visit = repo::find(&state.db, id, scope_for(&user, None))
        .await?
        .ok_or_else(|| ApiError::NotFound("Visit not found".into()))?;
    Ok(Json(visit.into()))
}

#[instrument(skip(state, user, payload))]
pub async fn update_visit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateVisitRequest>,
) -> Result<Json<VisitResponse>, ApiError> {
    if let Some(name) = payload.name.as_deref() {
        if name.trim().is_empty() {
            return Err(ApiError::BadRequest("Visit name cannot be empty".into()));
        }
    }
    let visit = repo::update(
        &state.db,
        id,
        scope_for(&user, None),
        payload.name.as_deref().map(str::trim),
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Visit not found".into()))?;
    Ok(Json(visit.into()))
}

#[instrument(skip(state, user))]
pub async fn delete_visit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let deleted = repo::delete(&state.db, id, scope_for(&user, None))
        .await?
        .ok_or_else(|| ApiError::NotFound("Visit not found".into()))?;
    info!(visit_id = deleted, "visit deleted");
    Ok(Json(DeletedResponse::new("visit", deleted)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn user(id: i64, admin: bool) -> User {
        User {
            id,
            username: format!("u{id}"),
            email: None,
            password_hash: "h".into(),
            gender: "F".into(),
            birth_date: date!(1990 - 01 - 01),
            is_admin: admin,
            created_at: datetime!(2024-01-01 00:00 UTC),
            modified_at: datetime!(2024-01-01 00:00 UTC),
        }
    }

    #[test]
    fn non_admin_scope_is_always_self() {
        let u = user(3, false);
        assert_eq!(scope_for(&u, None), Some(3));
        // A requested owner filter cannot widen a non-admin's scope.
        assert_eq!(scope_for(&u, Some(9)), Some(3));
    }

    #[test]
    fn admin_scope_is_open_unless_narrowed() {
        let a = user(1, true);
        assert_eq!(scope_for(&a, None), None);
        assert_eq!(scope_for(&a, Some(9)), Some(9));
    }
}
