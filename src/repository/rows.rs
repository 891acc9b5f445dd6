//! Org-scoped row fetchers. Pure reads: the insights engine never writes
//! any of these tables. Every query binds the organization id, and every
//! result set passes through `retain_org` as a second line of defense
//! against cross-tenant rows.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{CustomerRow, OrderItemRow, OrderRow, OrgScoped, ProductRow};

pub async fn fetch_orders(pool: &PgPool, org_id: Uuid) -> AppResult<Vec<OrderRow>> {
    let rows = sqlx::query_as::<_, OrderRow>(
        "SELECT id, organization_id, customer_id, order_date, status, payment_status,
                payment_method, subtotal, discount_amount, tax_amount, total, paid_amount,
                paid_at, shipped_at, delivered_at
         FROM orders
         WHERE organization_id = $1
         ORDER BY order_date ASC, id ASC",
    )
    .bind(org_id)
    .fetch_all(pool)
    .await
    .map_err(map_db_error)?;
    Ok(retain_org(rows, org_id))
}

pub async fn fetch_order_items(pool: &PgPool, org_id: Uuid) -> AppResult<Vec<OrderItemRow>> {
    let rows = sqlx::query_as::<_, OrderItemRow>(
        "SELECT oi.order_id, o.organization_id, oi.product_id, o.order_date,
                oi.quantity::bigint AS quantity, oi.unit_price, oi.tax_rate,
                oi.discount_amount, oi.line_subtotal, oi.line_tax, oi.line_total
         FROM order_items oi
         JOIN orders o ON o.id = oi.order_id
         WHERE o.organization_id = $1
         ORDER BY o.order_date ASC, oi.order_id ASC",
    )
    .bind(org_id)
    .fetch_all(pool)
    .await
    .map_err(map_db_error)?;
    Ok(retain_org(rows, org_id))
}

pub async fn fetch_customers(pool: &PgPool, org_id: Uuid) -> AppResult<Vec<CustomerRow>> {
    let rows = sqlx::query_as::<_, CustomerRow>(
        "SELECT id, organization_id, name, segment, customer_type, first_purchase_date,
                last_purchase_date, lifetime_value, order_count::bigint AS order_count,
                rfm_score, rfm_segment
         FROM customers
         WHERE organization_id = $1
         ORDER BY id ASC",
    )
    .bind(org_id)
    .fetch_all(pool)
    .await
    .map_err(map_db_error)?;
    Ok(retain_org(rows, org_id))
}

pub async fn fetch_products(pool: &PgPool, org_id: Uuid) -> AppResult<Vec<ProductRow>> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT id, organization_id, name, category, price, price_with_tax, cost_price,
                stock_quantity::bigint AS stock_quantity,
                low_stock_threshold::bigint AS low_stock_threshold, is_active
         FROM products
         WHERE organization_id = $1
         ORDER BY id ASC",
    )
    .bind(org_id)
    .fetch_all(pool)
    .await
    .map_err(map_db_error)?;
    Ok(retain_org(rows, org_id))
}

/// Drops any row that does not belong to `org_id`. The SQL already scopes
/// by organization, so a dropped row indicates a query bug; it is logged
/// rather than silently ignored.
pub fn retain_org<T: OrgScoped>(rows: Vec<T>, org_id: Uuid) -> Vec<T> {
    let before = rows.len();
    let scoped: Vec<T> = rows
        .into_iter()
        .filter(|row| row.organization_id() == org_id)
        .collect();
    if scoped.len() != before {
        tracing::error!(
            org_id = %org_id,
            dropped = before - scoped.len(),
            "Row fetch returned rows outside the requested organization"
        );
    }
    scoped
}

fn map_db_error(error: sqlx::Error) -> AppError {
    tracing::error!(db_error = %error, "Database query failed");
    AppError::Dependency("Database operation failed.".to_string())
}
