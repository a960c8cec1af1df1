//! Reporting queries over appointment snapshots.
//!
//! Every report runs over the same scope: live appointments whose start date
//! falls inside the range, optionally narrowed to one branch.

use salon_common::models::analytics::{
    AestheticianStat, BranchStat, CustomerMix, HourCount, ReportRange, RevenueBucket,
    RevenueInterval, ServiceStat, StatusCount, Summary, VoucherStat,
};
use salon_common::models::appointment::active_status_values;
use sqlx::PgPool;

const SCOPED: &str = r#"
    WITH scoped AS (
        SELECT * FROM appointments
        WHERE NOT is_deleted
          AND start_time::date BETWEEN $1 AND $2
          AND ($3::uuid IS NULL OR branch_id = $3)
    )
"#;

/// Money counts as earned once paid online or completed at the desk.
const SETTLED: &str = "(payment_status = 'paid' OR status = 'completed')";

fn scoped(select: &str) -> String {
    format!("{SCOPED} {}", select.replace("{settled}", SETTLED))
}

pub async fn summary(pool: &PgPool, range: &ReportRange) -> Result<Summary, sqlx::Error> {
    sqlx::query_as::<_, Summary>(&scoped(
        r#"
        SELECT
            COUNT(*) AS total_appointments,
            COUNT(*) FILTER (WHERE status = 'completed') AS completed,
            COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled,
            COUNT(*) FILTER (WHERE status = ANY($4)) AS active,
            COALESCE(SUM(final_price) FILTER (WHERE {settled}), 0) AS revenue,
            COALESCE(ROUND(AVG(final_price) FILTER (WHERE {settled}), 2), 0) AS average_ticket,
            COALESCE(SUM(service_discount + voucher_discount) FILTER (WHERE status <> 'cancelled'), 0)
                AS discounts_given,
            COUNT(DISTINCT user_id) AS unique_customers,
            COUNT(*) FILTER (WHERE walk_in_id IS NOT NULL) AS walk_ins
        FROM scoped
        "#,
    ))
    .bind(range.from)
    .bind(range.to)
    .bind(range.branch_id)
    .bind(active_status_values())
    .fetch_one(pool)
    .await
}

pub async fn revenue(
    pool: &PgPool,
    range: &ReportRange,
    interval: RevenueInterval,
) -> Result<Vec<RevenueBucket>, sqlx::Error> {
    sqlx::query_as::<_, RevenueBucket>(&scoped(
        r#"
        SELECT
            date_trunc($4, start_time)::date AS bucket,
            COUNT(*) FILTER (WHERE {settled}) AS appointments,
            COALESCE(SUM(final_price) FILTER (WHERE {settled}), 0) AS revenue
        FROM scoped
        GROUP BY bucket
        ORDER BY bucket
        "#,
    ))
    .bind(range.from)
    .bind(range.to)
    .bind(range.branch_id)
    .bind(interval.as_sql())
    .fetch_all(pool)
    .await
}

pub async fn status_breakdown(
    pool: &PgPool,
    range: &ReportRange,
) -> Result<Vec<StatusCount>, sqlx::Error> {
    sqlx::query_as::<_, StatusCount>(&scoped(
        "SELECT status, COUNT(*) AS count FROM scoped GROUP BY status ORDER BY count DESC",
    ))
    .bind(range.from)
    .bind(range.to)
    .bind(range.branch_id)
    .fetch_all(pool)
    .await
}

pub async fn top_services(
    pool: &PgPool,
    range: &ReportRange,
    limit: i64,
) -> Result<Vec<ServiceStat>, sqlx::Error> {
    sqlx::query_as::<_, ServiceStat>(&scoped(
        r#"
        SELECT
            service_name_snapshot AS service_name,
            COUNT(*) AS bookings,
            COALESCE(SUM(final_price) FILTER (WHERE {settled}), 0) AS revenue
        FROM scoped
        WHERE status <> 'cancelled'
        GROUP BY service_name_snapshot
        ORDER BY bookings DESC, revenue DESC
        LIMIT $4
        "#,
    ))
    .bind(range.from)
    .bind(range.to)
    .bind(range.branch_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn branch_performance(
    pool: &PgPool,
    range: &ReportRange,
) -> Result<Vec<BranchStat>, sqlx::Error> {
    sqlx::query_as::<_, BranchStat>(&scoped(
        r#"
        SELECT
            branch_id,
            MAX(branch_name_snapshot) AS branch_name,
            COUNT(*) AS bookings,
            COUNT(*) FILTER (WHERE status = 'completed') AS completed,
            COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled,
            COALESCE(SUM(final_price) FILTER (WHERE {settled}), 0) AS revenue
        FROM scoped
        GROUP BY branch_id
        ORDER BY revenue DESC
        "#,
    ))
    .bind(range.from)
    .bind(range.to)
    .bind(range.branch_id)
    .fetch_all(pool)
    .await
}

pub async fn aesthetician_performance(
    pool: &PgPool,
    range: &ReportRange,
    limit: i64,
) -> Result<Vec<AestheticianStat>, sqlx::Error> {
    sqlx::query_as::<_, AestheticianStat>(&scoped(
        r#"
        SELECT
            aesthetician_id,
            MAX(aesthetician_name_snapshot) AS aesthetician_name,
            COUNT(*) AS bookings,
            COUNT(*) FILTER (WHERE status = 'completed') AS completed,
            COALESCE(SUM(final_price) FILTER (WHERE {settled}), 0) AS revenue
        FROM scoped
        WHERE aesthetician_id IS NOT NULL
        GROUP BY aesthetician_id
        ORDER BY completed DESC, revenue DESC
        LIMIT $4
        "#,
    ))
    .bind(range.from)
    .bind(range.to)
    .bind(range.branch_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn peak_hours(pool: &PgPool, range: &ReportRange) -> Result<Vec<HourCount>, sqlx::Error> {
    sqlx::query_as::<_, HourCount>(&scoped(
        r#"
        SELECT EXTRACT(HOUR FROM start_time)::int4 AS hour, COUNT(*) AS count
        FROM scoped
        WHERE status <> 'cancelled'
        GROUP BY hour
        ORDER BY hour
        "#,
    ))
    .bind(range.from)
    .bind(range.to)
    .bind(range.branch_id)
    .fetch_all(pool)
    .await
}

pub async fn customer_mix(pool: &PgPool, range: &ReportRange) -> Result<CustomerMix, sqlx::Error> {
    sqlx::query_as::<_, CustomerMix>(&scoped(
        r#"
        SELECT
            COUNT(*) FILTER (WHERE user_id IS NOT NULL) AS registered,
            COUNT(*) FILTER (WHERE walk_in_id IS NOT NULL) AS walk_in,
            COALESCE(SUM(final_price) FILTER (WHERE user_id IS NOT NULL AND {settled}), 0)
                AS registered_revenue,
            COALESCE(SUM(final_price) FILTER (WHERE walk_in_id IS NOT NULL AND {settled}), 0)
                AS walk_in_revenue
        FROM scoped
        "#,
    ))
    .bind(range.from)
    .bind(range.to)
    .bind(range.branch_id)
    .fetch_one(pool)
    .await
}

pub async fn voucher_usage(
    pool: &PgPool,
    range: &ReportRange,
) -> Result<Vec<VoucherStat>, sqlx::Error> {
    sqlx::query_as::<_, VoucherStat>(&scoped(
        r#"
        SELECT
            voucher_code_snapshot AS code,
            COUNT(*) AS redemptions,
            COALESCE(SUM(voucher_discount), 0) AS total_discount
        FROM scoped
        WHERE voucher_code_snapshot IS NOT NULL
        GROUP BY voucher_code_snapshot
        ORDER BY redemptions DESC
        "#,
    ))
    .bind(range.from)
    .bind(range.to)
    .bind(range.branch_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_queries_inline_the_settled_predicate() {
        let sql = scoped("SELECT SUM(final_price) FILTER (WHERE {settled}) FROM scoped");
        assert!(sql.contains("WITH scoped AS"));
        assert!(sql.contains("payment_status = 'paid' OR status = 'completed'"));
        assert!(!sql.contains("{settled}"));
    }
}
