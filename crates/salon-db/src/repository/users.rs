//! Customer profile repository.

use salon_common::models::user::User;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

const SELECT_USER: &str = r#"
    SELECT u.id, u.auth_id, a.email, u.first_name, u.last_name, u.phone,
           u.image_url, u.is_deleted, u.created_at, u.updated_at
    FROM users u
    INNER JOIN auth a ON a.id = u.auth_id
"#;

/// Create a customer profile for an existing auth row.
pub async fn create_user<'e, E>(
    exec: E,
    id: Uuid,
    auth_id: Uuid,
    first_name: &str,
    last_name: &str,
    phone: Option<&str>,
) -> Result<User, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, User>(
        r#"
        WITH inserted AS (
            INSERT INTO users (id, auth_id, first_name, last_name, phone, is_deleted, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, false, NOW(), NOW())
            RETURNING *
        )
        SELECT i.id, i.auth_id, a.email, i.first_name, i.last_name, i.phone,
               i.image_url, i.is_deleted, i.created_at, i.updated_at
        FROM inserted i
        INNER JOIN auth a ON a.id = i.auth_id
        "#,
    )
    .bind(id)
    .bind(auth_id)
    .bind(first_name)
    .bind(last_name)
    .bind(phone)
    .fetch_one(exec)
    .await
}

/// Find a live profile by ID.
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE u.id = $1 AND NOT u.is_deleted"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Find the live profile owned by an auth account.
pub async fn find_by_auth_id(pool: &PgPool, auth_id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "{SELECT_USER} WHERE u.auth_id = $1 AND NOT u.is_deleted"
    ))
    .bind(auth_id)
    .fetch_optional(pool)
    .await
}

/// List live profiles, optionally filtered by an ILIKE pattern on name or email.
pub async fn list_users(
    pool: &PgPool,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<User>, i64), sqlx::Error> {
    let filter = r#"
        WHERE NOT u.is_deleted
          AND ($1::text IS NULL
               OR u.first_name ILIKE $1 OR u.last_name ILIKE $1 OR a.email ILIKE $1)
    "#;

    let users = sqlx::query_as::<_, User>(&format!(
        "{SELECT_USER} {filter} ORDER BY u.last_name, u.first_name LIMIT $2 OFFSET $3"
    ))
    .bind(search)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM users u INNER JOIN auth a ON a.id = u.auth_id {filter}"
    ))
    .bind(search)
    .fetch_one(pool)
    .await?;

    Ok((users, total.0))
}

/// Update profile fields.
pub async fn update_user(
    pool: &PgPool,
    id: Uuid,
    first_name: Option<&str>,
    last_name: Option<&str>,
    phone: Option<&str>,
) -> Result<User, sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE users SET
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            phone = COALESCE($4, phone),
            updated_at = NOW()
        WHERE id = $1 AND NOT is_deleted
        "#,
    )
    .bind(id)
    .bind(first_name)
    .bind(last_name)
    .bind(phone)
    .execute(pool)
    .await?;

    find_by_id(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Point the profile at a newly uploaded image.
pub async fn set_image(pool: &PgPool, id: Uuid, image_url: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET image_url = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(image_url)
        .execute(pool)
        .await?;
    Ok(())
}

/// Soft-delete a profile.
pub async fn soft_delete<'e, E>(exec: E, id: Uuid) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query("UPDATE users SET is_deleted = true, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(exec)
        .await?;
    Ok(())
}
