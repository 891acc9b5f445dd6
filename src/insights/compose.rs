//! Assembles the full dashboard payload from the individual aggregators.
//! The aggregators are independent of one another; the caller fetches each
//! entity's rows once (concurrently) and this module fans the results in.

use chrono::NaiveDate;
use serde::Serialize;

use crate::insights::customers::{segment_breakdown, SegmentMetrics};
use crate::insights::growth::{growth_metrics, GrowthMetrics};
use crate::insights::orders::{order_metrics, payment_analysis, OrderMetrics, PaymentAnalysis};
use crate::insights::period::{filter_by_date, ResolvedPeriods};
use crate::insights::products::{inventory_health, InventoryHealth};
use crate::insights::revenue::{monthly_sales, revenue_metrics, MonthlySalesRow, RevenueMetrics};
use crate::insights::InsightsSettings;
use crate::models::{CustomerRow, OrderRow, ProductRow};

/// Org-scoped row sets for one dashboard request; date-unbounded so the
/// growth aggregator can apply its calendar-month semantics while everything
/// else is sliced to the requested period. Order items are not fetched:
/// no dashboard section reads them, and the item-level endpoints (top
/// products, categories, margin, turnover) fetch their own.
pub struct FetchedRows {
    pub orders: Vec<OrderRow>,
    pub customers: Vec<CustomerRow>,
    pub products: Vec<ProductRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPayload {
    pub period: ResolvedPeriods,
    pub sales_performance: Vec<MonthlySalesRow>,
    pub customer_analytics: Vec<SegmentMetrics>,
    pub revenue_analytics: RevenueMetrics,
    pub order_analytics: OrderMetrics,
    pub inventory_insights: InventoryHealth,
    pub growth_metrics: GrowthMetrics,
    pub payment_analysis: PaymentAnalysis,
}

pub fn dashboard(
    rows: &FetchedRows,
    periods: ResolvedPeriods,
    settings: &InsightsSettings,
    reference: NaiveDate,
) -> DashboardPayload {
    let scoped_orders = filter_by_date(&rows.orders, periods.current, |o| o.order_date);

    DashboardPayload {
        period: periods,
        sales_performance: monthly_sales(&scoped_orders),
        customer_analytics: segment_breakdown(&rows.customers, &scoped_orders, reference),
        revenue_analytics: revenue_metrics(&scoped_orders, settings, reference),
        order_analytics: order_metrics(&scoped_orders),
        inventory_insights: inventory_health(&rows.products),
        growth_metrics: growth_metrics(&rows.orders, reference),
        payment_analysis: payment_analysis(&scoped_orders),
    }
}

#[cfg(test)]
mod tests {
    use super::{dashboard, FetchedRows};
    use crate::insights::period::{resolve, ResolvedPeriods};
    use crate::insights::testutil::{customer, date, order, product};
    use crate::insights::InsightsSettings;
    use crate::models::CustomerSegment;
    use rust_decimal_macros::dec;

    #[test]
    fn dashboard_slices_to_period_but_growth_ignores_it() {
        let rows = FetchedRows {
            orders: vec![
                order(1, 1, date(2026, 5, 10), dec!(1000)),
                order(2, 1, date(2026, 6, 10), dec!(3000)),
            ],
            customers: vec![customer(1, CustomerSegment::Vip)],
            products: vec![product(1, "widgets", dec!(5), dec!(10), 3, 5)],
        };
        let periods = resolve(Some(date(2026, 6, 1)), Some(date(2026, 6, 30)), None).unwrap();

        let payload = dashboard(
            &rows,
            periods,
            &InsightsSettings::default(),
            date(2026, 6, 30),
        );

        // only the June order is in the revenue scope
        assert_eq!(payload.revenue_analytics.total_orders, 1);
        assert_eq!(payload.revenue_analytics.total_revenue, dec!(3000));
        assert_eq!(payload.sales_performance.len(), 1);
        // growth still compares June against May regardless of the filter
        assert_eq!(payload.growth_metrics.previous_month, "2026-05");
        assert_eq!(payload.growth_metrics.revenue.growth_rate, "200.00");
        assert_eq!(payload.inventory_insights.low_stock, 1);
    }

    #[test]
    fn empty_org_produces_a_complete_zero_payload() {
        let rows = FetchedRows {
            orders: vec![],
            customers: vec![],
            products: vec![],
        };
        let payload = dashboard(
            &rows,
            ResolvedPeriods::ALL_TIME,
            &InsightsSettings::default(),
            date(2026, 6, 30),
        );
        assert_eq!(payload.revenue_analytics.total_orders, 0);
        assert_eq!(payload.revenue_analytics.collection_rate, "0.00");
        assert!(payload.sales_performance.is_empty());
        assert_eq!(payload.customer_analytics.len(), 5);
        assert_eq!(payload.order_analytics.fulfillment_rate, "0.00");
        assert_eq!(payload.growth_metrics.revenue.growth_rate, "0.00");
    }
}
