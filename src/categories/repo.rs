use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Read-only catalogue entry, seeded by migration.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i32,
    pub name: String,
}

pub async fn page(db: &PgPool, limit: i64, offset: i64) -> anyhow::Result<Vec<Category>> {
    let rows = sqlx::query_as::<_, Category>(
        r#"
        SELECT id, name
        FROM categories
        ORDER BY id
        LIMIT $1 OFFSET $2
    "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn count(db: &PgPool) -> anyhow::Result<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(db)
        .await?;
    Ok(total)
}

/// Ids the user has marked interested. An absent row means not interested, so
/// only `TRUE` rows are returned.
pub async fn interested_ids(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<i32>> {
    let ids: Vec<i32> = sqlx::query_scalar(
        r#"
        SELECT category_id
        FROM user_categories
        WHERE user_id = $1 AND is_interested = TRUE
        ORDER BY category_id
    "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(ids)
}

/// Last writer wins per (user, category); concurrent toggles upsert instead
/// of erroring.
pub async fn upsert_interest(
    db: &PgPool,
    user_id: Uuid,
    category_id: i32,
    is_interested: bool,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_categories (user_id, category_id, is_interested)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, category_id) DO UPDATE
        SET is_interested = EXCLUDED.is_interested
    "#,
    )
    .bind(user_id)
    .bind(category_id)
    .bind(is_interested)
    .execute(db)
    .await?;
    Ok(())
}
