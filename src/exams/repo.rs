use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::exams::stats::{MetricSample, VisitOwner};
use crate::visits;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Exam {
    pub id: i64,
    pub value: f64,
    pub visit_id: i64,
    pub metric_id: i64,
    pub created_at: OffsetDateTime,
    pub modified_at: OffsetDateTime,
}

/// Exam joined to its metric's name, the shape all read endpoints return.
#[derive(Debug, Clone, FromRow)]
pub struct ExamRow {
    pub id: i64,
    pub value: f64,
    pub visit_id: i64,
    pub metric_id: i64,
    pub metric_name: String,
    pub created_at: OffsetDateTime,
    pub modified_at: OffsetDateTime,
}

const EXAM_ROW_COLUMNS: &str = "e.id, e.value, e.visit_id, e.metric_id, \
     m.name AS metric_name, e.created_at, e.modified_at";

/// Exams whose owning visit falls in scope, optionally narrowed to one visit.
/// Listings order by metric id, then insertion order.
pub async fn list(
    db: &PgPool,
    owner: Option<i64>,
    visit_id: Option<i64>,
) -> anyhow::Result<Vec<ExamRow>> {
    let rows = sqlx::query_as::<_, ExamRow>(&format!(
        "SELECT {EXAM_ROW_COLUMNS}
         FROM exams e
         JOIN visits v ON v.id = e.visit_id
         JOIN metrics m ON m.id = e.metric_id
         WHERE ($1::bigint IS NULL OR v.user_id = $1)
           AND ($2::bigint IS NULL OR e.visit_id = $2)
         ORDER BY e.metric_id, e.id"
    ))
    .bind(owner)
    .bind(visit_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find(db: &PgPool, id: i64, owner: Option<i64>) -> anyhow::Result<Option<ExamRow>> {
    let row = sqlx::query_as::<_, ExamRow>(&format!(
        "SELECT {EXAM_ROW_COLUMNS}
         FROM exams e
         JOIN visits v ON v.id = e.visit_id
         JOIN metrics m ON m.id = e.metric_id
         WHERE e.id = $1 AND ($2::bigint IS NULL OR v.user_id = $2)"
    ))
    .bind(id)
    .bind(owner)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Insert an exam and bump the parent visit's modified_at in one transaction.
pub async fn create(
    db: &PgPool,
    visit_id: i64,
    metric_id: i64,
    value: f64,
) -> anyhow::Result<Exam> {
    let mut tx = db.begin().await?;
    let exam = sqlx::query_as::<_, Exam>(
        r#"
        INSERT INTO exams (value, visit_id, metric_id)
        VALUES ($1, $2, $3)
        RETURNING id, value, visit_id, metric_id, created_at, modified_at
        "#,
    )
    .bind(value)
    .bind(visit_id)
    .bind(metric_id)
    .fetch_one(&mut *tx)
    .await?;
    visits::repo::touch(&mut tx, visit_id).await?;
    tx.commit().await?;
    Ok(exam)
}

/// Partial update under the owner scope; bumps the parent visit. `None`
/// when the id is absent or out of scope.
pub async fn update(
    db: &PgPool,
    id: i64,
    owner: Option<i64>,
    value: Option<f64>,
    metric_id: Option<i64>,
) -> anyhow::Result<Option<Exam>> {
    let mut tx = db.begin().await?;
    let exam = sqlx::query_as::<_, Exam>(
        r#"
        UPDATE exams e
        SET value = COALESCE($3, e.value),
            metric_id = COALESCE($4, e.metric_id),
            modified_at = now()
        WHERE e.id = $1
          AND e.visit_id IN (SELECT id FROM visits WHERE $2::bigint IS NULL OR user_id = $2)
        RETURNING e.id, e.value, e.visit_id, e.metric_id, e.created_at, e.modified_at
        "#,
    )
    .bind(id)
    .bind(owner)
    .bind(value)
    .bind(metric_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(exam) = exam else {
        return Ok(None);
    };
    visits::repo::touch(&mut tx, exam.visit_id).await?;
    tx.commit().await?;
    Ok(Some(exam))
}

pub async fn delete(db: &PgPool, id: i64, owner: Option<i64>) -> anyhow::Result<Option<i64>> {
    let mut tx = db.begin().await?;
    let row: Option<(i64, i64)> = sqlx::query_as(
        r#"
        DELETE FROM exams e
        WHERE e.id = $1
          AND e.visit_id IN (SELECT id FROM visits WHERE $2::bigint IS NULL OR user_id = $2)
        RETURNING e.id, e.visit_id
        "#,
    )
    .bind(id)
    .bind(owner)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((exam_id, visit_id)) = row else {
        return Ok(None);
    };
    visits::repo::touch(&mut tx, visit_id).await?;
    tx.commit().await?;
    Ok(Some(exam_id))
}

// --- statistics support ---

pub async fn own_visit_ids(db: &PgPool, user_id: i64) -> anyhow::Result<Vec<i64>> {
    let rows: Vec<(i64,)> = sqlx::query_as("SELECT id FROM visits WHERE user_id = $1 ORDER BY id")
        .bind(user_id)
        .fetch_all(db)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Every visit with its owner's demographics, for the admin filter mode.
pub async fn visit_owners(db: &PgPool) -> anyhow::Result<Vec<VisitOwner>> {
    let rows: Vec<(i64, String, time::Date)> = sqlx::query_as(
        r#"
        SELECT v.id, u.gender, u.birth_date
        FROM visits v
        JOIN users u ON u.id = v.user_id
        ORDER BY v.id
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(visit_id, gender, birth_date)| VisitOwner {
            visit_id,
            gender,
            birth_date,
        })
        .collect())
}

/// Exam values joined to metric names for the given visits.
pub async fn metric_samples(db: &PgPool, visit_ids: &[i64]) -> anyhow::Result<Vec<MetricSample>> {
    let rows = sqlx::query_as::<_, MetricSample>(
        r#"
        SELECT e.visit_id, m.id AS metric_id, m.name AS metric_name, e.value
        FROM exams e
        JOIN metrics m ON m.id = e.metric_id
        WHERE e.visit_id = ANY($1)
        ORDER BY m.id, e.id
        "#,
    )
    .bind(visit_ids)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
