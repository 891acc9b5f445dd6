//! Revenue aggregation: billed/collected/pending/overdue totals, the
//! monthly sales series, and gross margin.

use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::config::DiscountRateBasis;
use crate::insights::numeric::{format_2dp, percentage, pct_string, round2, safe_div};
use crate::insights::period::month_key;
use crate::insights::InsightsSettings;
use crate::models::{OrderItemRow, OrderRow, ProductRow};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueMetrics {
    pub total_orders: i64,
    pub total_revenue: Decimal,
    pub subtotal_revenue: Decimal,
    pub total_tax: Decimal,
    pub total_discounts: Decimal,
    pub average_order_value: Decimal,
    pub collected_revenue: Decimal,
    pub pending_revenue: Decimal,
    pub overdue_revenue: Decimal,
    pub unique_customers: i64,
    pub collection_rate: String,
    pub discount_rate: String,
}

/// Billed revenue comes from non-cancelled orders; collected revenue is the
/// sum of `paid_amount` across all orders regardless of status.
pub fn revenue_metrics(
    orders: &[OrderRow],
    settings: &InsightsSettings,
    reference: NaiveDate,
) -> RevenueMetrics {
    let billed: Vec<&OrderRow> = orders.iter().filter(|o| !o.is_cancelled()).collect();

    let total_revenue: Decimal = billed.iter().map(|o| o.total).sum();
    let subtotal_revenue: Decimal = billed.iter().map(|o| o.subtotal).sum();
    let total_tax: Decimal = billed.iter().map(|o| o.tax_amount).sum();
    let total_discounts: Decimal = billed.iter().map(|o| o.discount_amount).sum();
    let collected_revenue: Decimal = orders.iter().map(|o| o.paid_amount).sum();

    let overdue_cutoff = reference - Duration::days(settings.overdue_grace_days);
    let mut pending_revenue = Decimal::ZERO;
    let mut overdue_revenue = Decimal::ZERO;
    for order in &billed {
        if !order.payment_status.is_outstanding() {
            continue;
        }
        let balance = order.outstanding();
        pending_revenue += balance;
        if order.order_date < overdue_cutoff {
            overdue_revenue += balance;
        }
    }

    let unique_customers = billed
        .iter()
        .map(|o| o.customer_id)
        .collect::<HashSet<Uuid>>()
        .len() as i64;

    let discount_basis = match settings.discount_rate_basis {
        DiscountRateBasis::Subtotal => subtotal_revenue,
        DiscountRateBasis::Total => total_revenue,
    };

    RevenueMetrics {
        total_orders: billed.len() as i64,
        total_revenue: round2(total_revenue),
        subtotal_revenue: round2(subtotal_revenue),
        total_tax: round2(total_tax),
        total_discounts: round2(total_discounts),
        average_order_value: round2(safe_div(total_revenue, Decimal::from(billed.len() as i64))),
        collected_revenue: round2(collected_revenue),
        pending_revenue: round2(pending_revenue),
        overdue_revenue: round2(overdue_revenue),
        unique_customers,
        collection_rate: pct_string(collected_revenue, total_revenue),
        discount_rate: pct_string(total_discounts, discount_basis),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySalesRow {
    pub month: String,
    pub total_sales: Decimal,
    pub total_orders: i64,
    pub average_order_value: Decimal,
    pub unique_customers: i64,
    pub paid_amount: Decimal,
    pub pending_amount: Decimal,
    pub collection_rate: String,
}

/// One row per calendar month present in scope, ascending by month key.
pub fn monthly_sales(orders: &[OrderRow]) -> Vec<MonthlySalesRow> {
    struct MonthAccumulator {
        total: Decimal,
        orders: i64,
        customers: HashSet<Uuid>,
        paid: Decimal,
        pending: Decimal,
    }

    let mut months: BTreeMap<String, MonthAccumulator> = BTreeMap::new();
    for order in orders.iter().filter(|o| !o.is_cancelled()) {
        let entry = months
            .entry(month_key(order.order_date))
            .or_insert_with(|| MonthAccumulator {
                total: Decimal::ZERO,
                orders: 0,
                customers: HashSet::new(),
                paid: Decimal::ZERO,
                pending: Decimal::ZERO,
            });
        entry.total += order.total;
        entry.orders += 1;
        entry.customers.insert(order.customer_id);
        entry.paid += order.paid_amount;
        if order.payment_status.is_outstanding() {
            entry.pending += order.outstanding();
        }
    }

    months
        .into_iter()
        .map(|(month, acc)| MonthlySalesRow {
            month,
            total_sales: round2(acc.total),
            total_orders: acc.orders,
            average_order_value: round2(safe_div(acc.total, Decimal::from(acc.orders))),
            unique_customers: acc.customers.len() as i64,
            paid_amount: round2(acc.paid),
            pending_amount: round2(acc.pending),
            collection_rate: pct_string(acc.paid, acc.total),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrossMarginMetrics {
    pub total_revenue: Decimal,
    pub cost_of_goods_sold: Decimal,
    pub gross_margin: Decimal,
    pub gross_margin_rate: String,
}

/// Revenue minus cost of goods sold. COGS prices each sold unit at the
/// product's current cost price; items from cancelled orders are excluded.
pub fn gross_margin(
    orders: &[OrderRow],
    items: &[OrderItemRow],
    products: &[ProductRow],
) -> GrossMarginMetrics {
    let billed_ids: HashSet<Uuid> = orders
        .iter()
        .filter(|o| !o.is_cancelled())
        .map(|o| o.id)
        .collect();
    let cost_by_product: std::collections::HashMap<Uuid, Decimal> =
        products.iter().map(|p| (p.id, p.cost_price)).collect();

    let total_revenue: Decimal = orders
        .iter()
        .filter(|o| !o.is_cancelled())
        .map(|o| o.total)
        .sum();

    let mut cost_of_goods_sold = Decimal::ZERO;
    for item in items {
        if !billed_ids.contains(&item.order_id) {
            continue;
        }
        if let Some(cost) = cost_by_product.get(&item.product_id) {
            cost_of_goods_sold += *cost * Decimal::from(item.quantity);
        }
    }

    let gross_margin = total_revenue - cost_of_goods_sold;
    GrossMarginMetrics {
        total_revenue: round2(total_revenue),
        cost_of_goods_sold: round2(cost_of_goods_sold),
        gross_margin: round2(gross_margin),
        gross_margin_rate: format_2dp(percentage(gross_margin, total_revenue)),
    }
}

#[cfg(test)]
mod tests {
    use super::{gross_margin, monthly_sales, revenue_metrics};
    use crate::insights::testutil::{date, item, order, product};
    use crate::insights::InsightsSettings;
    use crate::models::{OrderStatus, PaymentStatus};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_scope_reports_zero_values() {
        let metrics = revenue_metrics(&[], &InsightsSettings::default(), date(2026, 7, 1));
        assert_eq!(metrics.total_orders, 0);
        assert_eq!(metrics.total_revenue, Decimal::ZERO);
        assert_eq!(metrics.average_order_value, Decimal::ZERO);
        assert_eq!(metrics.collection_rate, "0.00");
        assert_eq!(metrics.discount_rate, "0.00");
    }

    #[test]
    fn billed_and_collected_sums() {
        let mut paid = order(1, 1, date(2026, 6, 1), dec!(100));
        paid.subtotal = dec!(95);
        paid.tax_amount = dec!(10);
        paid.discount_amount = dec!(5);

        let mut partial = order(2, 2, date(2026, 6, 2), dec!(200));
        partial.payment_status = PaymentStatus::Partial;
        partial.paid_amount = dec!(68);

        let mut cancelled = order(3, 1, date(2026, 6, 3), dec!(999));
        cancelled.status = OrderStatus::Cancelled;
        cancelled.paid_amount = Decimal::ZERO;

        let metrics = revenue_metrics(
            &[paid, partial, cancelled],
            &InsightsSettings::default(),
            date(2026, 6, 10),
        );
        assert_eq!(metrics.total_orders, 2);
        assert_eq!(metrics.total_revenue, dec!(300));
        assert_eq!(metrics.collected_revenue, dec!(168));
        assert_eq!(metrics.pending_revenue, dec!(132));
        assert_eq!(metrics.unique_customers, 2);
        // 168 / 300 * 100
        assert_eq!(metrics.collection_rate, "56.00");
        // invariant: total = subtotal - discounts + tax
        assert_eq!(
            metrics.total_revenue,
            metrics.subtotal_revenue - metrics.total_discounts + metrics.total_tax
        );
    }

    #[test]
    fn overdue_requires_grace_period_to_lapse() {
        let mut recent = order(1, 1, date(2026, 6, 20), dec!(100));
        recent.payment_status = PaymentStatus::Pending;
        recent.paid_amount = Decimal::ZERO;

        let mut stale = order(2, 2, date(2026, 4, 1), dec!(400));
        stale.payment_status = PaymentStatus::Partial;
        stale.paid_amount = dec!(150);

        let metrics = revenue_metrics(
            &[recent, stale],
            &InsightsSettings::default(),
            date(2026, 7, 1),
        );
        assert_eq!(metrics.pending_revenue, dec!(350));
        assert_eq!(metrics.overdue_revenue, dec!(250));
    }

    #[test]
    fn discount_rate_uses_subtotal_basis() {
        let mut discounted = order(1, 1, date(2026, 6, 1), dec!(90));
        discounted.subtotal = dec!(100);
        discounted.discount_amount = dec!(10);

        let metrics = revenue_metrics(
            &[discounted],
            &InsightsSettings::default(),
            date(2026, 6, 10),
        );
        assert_eq!(metrics.discount_rate, "10.00");
    }

    #[test]
    fn monthly_series_groups_by_calendar_month() {
        let orders = vec![
            order(1, 1, date(2026, 9, 3), dec!(7000)),
            order(2, 2, date(2026, 9, 21), dec!(8000)),
            order(3, 1, date(2026, 10, 5), dec!(22000)),
        ];
        let rows = monthly_sales(&orders);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].month, "2026-09");
        assert_eq!(rows[0].total_sales, dec!(15000));
        assert_eq!(rows[0].total_orders, 2);
        assert_eq!(rows[0].unique_customers, 2);
        assert_eq!(rows[0].collection_rate, "100.00");
        assert_eq!(rows[1].month, "2026-10");
        assert_eq!(rows[1].average_order_value, dec!(22000));
    }

    #[test]
    fn gross_margin_prices_units_at_cost() {
        let orders = vec![order(1, 1, date(2026, 6, 1), dec!(500))];
        let items = vec![item(&orders[0], 10, 5, dec!(500))];
        let products = vec![product(10, "widgets", dec!(60), dec!(100), 50, 5)];

        let metrics = gross_margin(&orders, &items, &products);
        assert_eq!(metrics.cost_of_goods_sold, dec!(300));
        assert_eq!(metrics.gross_margin, dec!(200));
        assert_eq!(metrics.gross_margin_rate, "40.00");
    }
}
