//! Voucher repository.

use salon_common::models::voucher::{CreateVoucherRequest, UpdateVoucherRequest, Voucher};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Insert a voucher; `code` must already be normalized.
pub async fn create_voucher(
    pool: &PgPool,
    id: Uuid,
    code: &str,
    req: &CreateVoucherRequest,
) -> Result<Voucher, sqlx::Error> {
    sqlx::query_as::<_, Voucher>(
        r#"
        INSERT INTO vouchers
            (id, code, description, discount_type, value, max_uses, used_count,
             valid_from, valid_until, is_deleted, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $8, false, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(code)
    .bind(&req.description)
    .bind(req.discount_type)
    .bind(req.value)
    .bind(req.max_uses)
    .bind(req.valid_from)
    .bind(req.valid_until)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Voucher>, sqlx::Error> {
    sqlx::query_as::<_, Voucher>("SELECT * FROM vouchers WHERE id = $1 AND NOT is_deleted")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Voucher>, sqlx::Error> {
    sqlx::query_as::<_, Voucher>("SELECT * FROM vouchers WHERE code = $1 AND NOT is_deleted")
        .bind(code)
        .fetch_optional(pool)
        .await
}

pub async fn list_vouchers(pool: &PgPool) -> Result<Vec<Voucher>, sqlx::Error> {
    sqlx::query_as::<_, Voucher>(
        "SELECT * FROM vouchers WHERE NOT is_deleted ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
}

pub async fn update_voucher(
    pool: &PgPool,
    id: Uuid,
    req: &UpdateVoucherRequest,
) -> Result<Voucher, sqlx::Error> {
    sqlx::query_as::<_, Voucher>(
        r#"
        UPDATE vouchers SET
            description = COALESCE($2, description),
            discount_type = COALESCE($3, discount_type),
            value = COALESCE($4, value),
            max_uses = COALESCE($5, max_uses),
            valid_from = COALESCE($6, valid_from),
            valid_until = COALESCE($7, valid_until),
            updated_at = NOW()
        WHERE id = $1 AND NOT is_deleted
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&req.description)
    .bind(req.discount_type)
    .bind(req.value)
    .bind(req.max_uses)
    .bind(req.valid_from)
    .bind(req.valid_until)
    .fetch_one(pool)
    .await
}

/// Consume one use. Returns false if the voucher ran out concurrently.
pub async fn redeem<'e, E>(exec: E, id: Uuid) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE vouchers SET used_count = used_count + 1, updated_at = NOW()
        WHERE id = $1 AND NOT is_deleted
          AND (max_uses IS NULL OR used_count < max_uses)
        "#,
    )
    .bind(id)
    .execute(exec)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE vouchers SET is_deleted = true, updated_at = NOW() WHERE id = $1 AND NOT is_deleted",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
