use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// Admin-managed reference data describing one measurable quantity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Metric {
    pub id: i64,
    pub name: String,
    pub weight: i32,
    pub unit_label: String,
    pub total_range_min: i32,
    pub total_range_max: i32,
    pub healthy_range_min: i32,
    pub healthy_range_max: i32,
    pub gender: String,
    pub category_id: Option<i64>,
}

const METRIC_COLUMNS: &str = "id, name, weight, unit_label, total_range_min, total_range_max, \
     healthy_range_min, healthy_range_max, gender, category_id";

pub async fn list(db: &PgPool, gender: Option<&str>) -> anyhow::Result<Vec<Metric>> {
    let rows = sqlx::query_as::<_, Metric>(&format!(
        "SELECT {METRIC_COLUMNS} FROM metrics
         WHERE $1::text IS NULL OR gender = $1
         ORDER BY id"
    ))
    .bind(gender)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find(db: &PgPool, id: i64) -> anyhow::Result<Option<Metric>> {
    let row = sqlx::query_as::<_, Metric>(&format!(
        "SELECT {METRIC_COLUMNS} FROM metrics WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

#[allow(clippy::too_many_arguments)]
pub async fn create(
    db: &PgPool,
    name: &str,
    weight: i32,
    unit_label: &str,
    total_range: (i32, i32),
    healthy_range: (i32, i32),
    gender: &str,
    category_id: Option<i64>,
) -> anyhow::Result<Metric> {
    let row = sqlx::query_as::<_, Metric>(&format!(
        "INSERT INTO metrics
             (name, weight, unit_label, total_range_min, total_range_max,
              healthy_range_min, healthy_range_max, gender, category_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING {METRIC_COLUMNS}"
    ))
    .bind(name)
    .bind(weight)
    .bind(unit_label)
    .bind(total_range.0)
    .bind(total_range.1)
    .bind(healthy_range.0)
    .bind(healthy_range.1)
    .bind(gender)
    .bind(category_id)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// Partial update; absent fields keep their stored value.
pub struct MetricPatch<'a> {
    pub name: Option<&'a str>,
    pub weight: Option<i32>,
    pub unit_label: Option<&'a str>,
    pub total_range_min: Option<i32>,
    pub total_range_max: Option<i32>,
    pub healthy_range_min: Option<i32>,
    pub healthy_range_max: Option<i32>,
    pub gender: Option<&'a str>,
    pub category_id: Option<i64>,
}

pub async fn update(db: &PgPool, id: i64, patch: MetricPatch<'_>) -> anyhow::Result<Option<Metric>> {
    let row = sqlx::query_as::<_, Metric>(&format!(
        "UPDATE metrics
         SET name = COALESCE($2, name),
             weight = COALESCE($3, weight),
             unit_label = COALESCE($4, unit_label),
             total_range_min = COALESCE($5, total_range_min),
             total_range_max = COALESCE($6, total_range_max),
             healthy_range_min = COALESCE($7, healthy_range_min),
             healthy_range_max = COALESCE($8, healthy_range_max),
             gender = COALESCE($9, gender),
             category_id = COALESCE($10, category_id)
         WHERE id = $1
         RETURNING {METRIC_COLUMNS}"
    ))
    .bind(id)
    .bind(patch.name)
    .bind(patch.weight)
    .bind(patch.unit_label)
    .bind(patch.total_range_min)
    .bind(patch.total_range_max)
    .bind(patch.healthy_range_min)
    .bind(patch.healthy_range_max)
    .bind(patch.gender)
    .bind(patch.category_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn delete(db: &PgPool, id: i64) -> anyhow::Result<Option<i64>> {
    let row: Option<(i64,)> = sqlx::query_as("DELETE FROM metrics WHERE id = $1 RETURNING id")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row.map(|(id,)| id))
}

pub async fn has_exams(db: &PgPool, id: i64) -> anyhow::Result<bool> {
    let (exists,): (bool,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM exams WHERE metric_id = $1)")
            .bind(id)
            .fetch_one(db)
            .await?;
    Ok(exists)
}
