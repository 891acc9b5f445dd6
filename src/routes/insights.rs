//! HTTP surface of the insights engine. Each handler validates input,
//! checks organization access, fans out the row fetches it needs, and hands
//! the rows to the pure aggregators in `crate::insights`.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::require_user_id;
use crate::error::{AppError, AppResult};
use crate::insights::compose::{dashboard, FetchedRows};
use crate::insights::period::{self, filter_by_date, ResolvedPeriods};
use crate::insights::{customers, growth, orders, products, revenue, InsightsSettings};
use crate::models::{OrderItemRow, OrderRow};
use crate::repository::rows::{fetch_customers, fetch_order_items, fetch_orders, fetch_products};
use crate::schemas::{validate_input, AppQuery, InsightsQuery};
use crate::state::AppState;
use crate::tenancy::assert_org_member;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/insights", get(full_dashboard))
        .route("/insights/customers/top", get(top_customers))
        .route("/insights/customers/segments", get(customer_segments))
        .route("/insights/customers/retention", get(customer_retention))
        .route("/insights/customers/churn", get(customer_churn))
        .route("/insights/customers/rfm", get(customer_rfm))
        .route("/insights/sales/monthly", get(monthly_sales))
        .route("/insights/products/top", get(top_products))
        .route("/insights/categories/performance", get(category_performance))
        .route("/insights/revenue/metrics", get(revenue_metrics))
        .route("/insights/revenue/gross-margin", get(gross_margin))
        .route("/insights/payments/analysis", get(payment_analysis))
        .route("/insights/payments/dso", get(payment_dso))
        .route("/insights/orders/metrics", get(order_metrics))
        .route("/insights/inventory/health", get(inventory_health))
        .route("/insights/inventory/turnover", get(inventory_turnover))
        .route("/insights/growth/metrics", get(growth_metrics))
}

struct InsightsContext {
    org_id: Uuid,
    periods: ResolvedPeriods,
    limit: usize,
    reference: NaiveDate,
    settings: InsightsSettings,
}

/// Input validation runs in full before the membership check or any row
/// fetch, so an invalid range never touches the store.
async fn resolve_context(
    state: &AppState,
    headers: &HeaderMap,
    query: &InsightsQuery,
) -> AppResult<InsightsContext> {
    validate_input(query)?;

    let org_id = Uuid::parse_str(query.org_id.trim())
        .map_err(|_| AppError::BadRequest("Invalid organization id.".to_string()))?;

    let settings = InsightsSettings::from_config(&state.config);
    let start = query
        .start_date
        .as_deref()
        .map(period::parse_date)
        .transpose()?;
    let end = query
        .end_date
        .as_deref()
        .map(period::parse_date)
        .transpose()?;
    let periods = period::resolve(start, end, settings.max_period_days)?;

    let user_id = require_user_id(state, headers).await?;
    assert_org_member(state, &user_id, org_id).await?;

    Ok(InsightsContext {
        org_id,
        periods,
        limit: query
            .limit
            .map(|limit| limit as usize)
            .unwrap_or(settings.default_top_limit),
        reference: Utc::now().date_naive(),
        settings,
    })
}

fn ok<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

fn in_period(orders: &[OrderRow], periods: &ResolvedPeriods) -> Vec<OrderRow> {
    filter_by_date(orders, periods.current, |o| o.order_date)
}

fn items_in_period(items: &[OrderItemRow], periods: &ResolvedPeriods) -> Vec<OrderItemRow> {
    filter_by_date(items, periods.current, |i| i.order_date)
}

/// `GET /insights` — the full dashboard. Row fetches run concurrently; a
/// failure in any of them fails the whole request rather than returning a
/// partial payload. Order items are skipped here since no dashboard section
/// consumes them.
async fn full_dashboard(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<InsightsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let ctx = resolve_context(&state, &headers, &query).await?;
    let pool = state.db_pool()?;

    let (orders, customers, products) = tokio::try_join!(
        fetch_orders(pool, ctx.org_id),
        fetch_customers(pool, ctx.org_id),
        fetch_products(pool, ctx.org_id),
    )?;

    let rows = FetchedRows {
        orders,
        customers,
        products,
    };
    Ok(ok(dashboard(
        &rows,
        ctx.periods,
        &ctx.settings,
        ctx.reference,
    )))
}

async fn top_customers(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<InsightsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let ctx = resolve_context(&state, &headers, &query).await?;
    let pool = state.db_pool()?;
    let (orders, customer_rows) = tokio::try_join!(
        fetch_orders(pool, ctx.org_id),
        fetch_customers(pool, ctx.org_id),
    )?;
    let scoped = in_period(&orders, &ctx.periods);
    Ok(ok(customers::top_customers(
        &customer_rows,
        &scoped,
        ctx.limit,
    )))
}

async fn customer_segments(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<InsightsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let ctx = resolve_context(&state, &headers, &query).await?;
    let pool = state.db_pool()?;
    let (orders, customer_rows) = tokio::try_join!(
        fetch_orders(pool, ctx.org_id),
        fetch_customers(pool, ctx.org_id),
    )?;
    let scoped = in_period(&orders, &ctx.periods);
    Ok(ok(customers::segment_breakdown(
        &customer_rows,
        &scoped,
        ctx.reference,
    )))
}

async fn customer_retention(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<InsightsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let ctx = resolve_context(&state, &headers, &query).await?;
    let pool = state.db_pool()?;
    let orders = fetch_orders(pool, ctx.org_id).await?;
    Ok(ok(customers::retention(
        &orders,
        ctx.settings.churn_window_days,
        ctx.reference,
    )))
}

async fn customer_churn(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<InsightsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let ctx = resolve_context(&state, &headers, &query).await?;
    let pool = state.db_pool()?;
    let orders = fetch_orders(pool, ctx.org_id).await?;
    Ok(ok(customers::churn(
        &orders,
        ctx.settings.churn_window_days,
        ctx.reference,
    )))
}

async fn customer_rfm(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<InsightsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let ctx = resolve_context(&state, &headers, &query).await?;
    let pool = state.db_pool()?;
    let (orders, customer_rows) = tokio::try_join!(
        fetch_orders(pool, ctx.org_id),
        fetch_customers(pool, ctx.org_id),
    )?;
    Ok(ok(customers::rfm_scores(
        &customer_rows,
        &orders,
        &ctx.settings,
        ctx.reference,
    )))
}

async fn monthly_sales(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<InsightsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let ctx = resolve_context(&state, &headers, &query).await?;
    let pool = state.db_pool()?;
    let orders = fetch_orders(pool, ctx.org_id).await?;
    let scoped = in_period(&orders, &ctx.periods);
    Ok(ok(revenue::monthly_sales(&scoped)))
}

async fn top_products(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<InsightsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let ctx = resolve_context(&state, &headers, &query).await?;
    let pool = state.db_pool()?;
    let (orders, items, product_rows) = tokio::try_join!(
        fetch_orders(pool, ctx.org_id),
        fetch_order_items(pool, ctx.org_id),
        fetch_products(pool, ctx.org_id),
    )?;
    let scoped_items = items_in_period(&items, &ctx.periods);
    Ok(ok(products::top_products(
        &scoped_items,
        &product_rows,
        &orders,
        ctx.limit,
    )))
}

async fn category_performance(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<InsightsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let ctx = resolve_context(&state, &headers, &query).await?;
    let pool = state.db_pool()?;
    let (orders, items, product_rows) = tokio::try_join!(
        fetch_orders(pool, ctx.org_id),
        fetch_order_items(pool, ctx.org_id),
        fetch_products(pool, ctx.org_id),
    )?;
    let scoped_items = items_in_period(&items, &ctx.periods);
    Ok(ok(products::category_performance(
        &scoped_items,
        &product_rows,
        &orders,
    )))
}

async fn revenue_metrics(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<InsightsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let ctx = resolve_context(&state, &headers, &query).await?;
    let pool = state.db_pool()?;
    let orders = fetch_orders(pool, ctx.org_id).await?;
    let scoped = in_period(&orders, &ctx.periods);
    Ok(ok(revenue::revenue_metrics(
        &scoped,
        &ctx.settings,
        ctx.reference,
    )))
}

async fn gross_margin(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<InsightsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let ctx = resolve_context(&state, &headers, &query).await?;
    let pool = state.db_pool()?;
    let (orders, items, product_rows) = tokio::try_join!(
        fetch_orders(pool, ctx.org_id),
        fetch_order_items(pool, ctx.org_id),
        fetch_products(pool, ctx.org_id),
    )?;
    let scoped_orders = in_period(&orders, &ctx.periods);
    let scoped_items = items_in_period(&items, &ctx.periods);
    Ok(ok(revenue::gross_margin(
        &scoped_orders,
        &scoped_items,
        &product_rows,
    )))
}

async fn payment_analysis(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<InsightsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let ctx = resolve_context(&state, &headers, &query).await?;
    let pool = state.db_pool()?;
    let orders = fetch_orders(pool, ctx.org_id).await?;
    let scoped = in_period(&orders, &ctx.periods);
    Ok(ok(orders::payment_analysis(&scoped)))
}

async fn payment_dso(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<InsightsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let ctx = resolve_context(&state, &headers, &query).await?;
    let pool = state.db_pool()?;
    let order_rows = fetch_orders(pool, ctx.org_id).await?;
    let scoped = in_period(&order_rows, &ctx.periods);
    Ok(ok(orders::dso(&scoped, ctx.periods.current, ctx.reference)))
}

async fn order_metrics(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<InsightsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let ctx = resolve_context(&state, &headers, &query).await?;
    let pool = state.db_pool()?;
    let order_rows = fetch_orders(pool, ctx.org_id).await?;
    let scoped = in_period(&order_rows, &ctx.periods);
    Ok(ok(orders::order_metrics(&scoped)))
}

async fn inventory_health(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<InsightsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let ctx = resolve_context(&state, &headers, &query).await?;
    let pool = state.db_pool()?;
    let product_rows = fetch_products(pool, ctx.org_id).await?;
    Ok(ok(products::inventory_health(&product_rows)))
}

async fn inventory_turnover(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<InsightsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let ctx = resolve_context(&state, &headers, &query).await?;
    let pool = state.db_pool()?;
    let (orders, items, product_rows) = tokio::try_join!(
        fetch_orders(pool, ctx.org_id),
        fetch_order_items(pool, ctx.org_id),
        fetch_products(pool, ctx.org_id),
    )?;
    let scoped_items = items_in_period(&items, &ctx.periods);
    Ok(ok(products::inventory_turnover(
        &scoped_items,
        &product_rows,
        &orders,
    )))
}

async fn growth_metrics(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<InsightsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let ctx = resolve_context(&state, &headers, &query).await?;
    let pool = state.db_pool()?;
    // Growth is strictly month-over-month, so the fetch is deliberately
    // unbounded by the request's date filter.
    let orders = fetch_orders(pool, ctx.org_id).await?;
    Ok(ok(growth::growth_metrics(&orders, ctx.reference)))
}
