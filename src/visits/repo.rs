use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;

/// Visit record. `owner` parameters below carry the ownership scope as an
/// explicit predicate: `Some(user_id)` restricts to that user's rows, `None`
/// is the admin view.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Visit {
    pub id: i64,
    pub name: String,
    pub user_id: i64,
    pub created_at: OffsetDateTime,
    pub modified_at: OffsetDateTime,
}

pub async fn list(db: &PgPool, owner: Option<i64>) -> anyhow::Result<Vec<Visit>> {
    let rows = sqlx::query_as::<_, Visit>(
        r#"
        SELECT id, name, user_id, created_at, modified_at
        FROM visits
        WHERE $1::bigint IS NULL OR user_id = $1
        ORDER BY created_at, id
        "#,
    )
    .bind(owner)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find(db: &PgPool, id: i64, owner: Option<i64>) -> anyhow::Result<Option<Visit>> {
    let row = sqlx::query_as::<_, Visit>(
        r#"
        SELECT id, name, user_id, created_at, modified_at
        FROM visits
        WHERE id = $1 AND ($2::bigint IS NULL OR user_id = $2)
        "#,
    )
    .bind(id)
    .bind(owner)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn create(db: &PgPool, name: &str, user_id: i64) -> anyhow::Result<Visit> {
    let row = sqlx::query_as::<_, Visit>(
        r#"
        INSERT INTO visits (name, user_id)
        VALUES ($1, $2)
        RETURNING id, name, user_id, created_at, modified_at
        "#,
    )
    .bind(name)
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// Partial update: a `None` name keeps the stored value. Returns `None` when
/// the id is absent or out of scope.
pub async fn update(
    db: &PgPool,
    id: i64,
    owner: Option<i64>,
    name: Option<&str>,
) -> anyhow::Result<Option<Visit>> {
    let row = sqlx::query_as::<_, Visit>(
        r#"
        UPDATE visits
        SET name = COALESCE($3, name), modified_at = now()
        WHERE id = $1 AND ($2::bigint IS NULL OR user_id = $2)
        RETURNING id, name, user_id, created_at, modified_at
        "#,
    )
    .bind(id)
    .bind(owner)
    .bind(name)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Child exams go with the visit via ON DELETE CASCADE.
pub async fn delete(db: &PgPool, id: i64, owner: Option<i64>) -> anyhow::Result<Option<i64>> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        DELETE FROM visits
        WHERE id = $1 AND ($2::bigint IS NULL OR user_id = $2)
        RETURNING id
        "#,
    )
    .bind(id)
    .bind(owner)
    .fetch_optional(db)
    .await?;
    Ok(row.map(|(id,)| id))
}

/// Bump modified_at inside an exam mutation's transaction.
pub async fn touch(tx: &mut Transaction<'_, Postgres>, id: i64) -> anyhow::Result<()> {
    sqlx::query("UPDATE visits SET modified_at = now() WHERE id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
