//! Month-over-month growth for revenue, orders, and customers. Growth is
//! defined strictly against calendar months, independent of any date-range
//! filter on the request: the current month is the most recent month with
//! order activity (falling back to the reference date's month), and the
//! previous month is the one immediately before it.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::insights::numeric::{format_2dp, growth_rate, round2};
use crate::insights::period::{month_key, month_window, Period};
use crate::models::OrderRow;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthSeries {
    pub current: Decimal,
    pub previous: Decimal,
    pub growth_rate: String,
}

impl GrowthSeries {
    fn new(current: Decimal, previous: Decimal) -> Self {
        Self {
            current,
            previous,
            growth_rate: format_2dp(growth_rate(current, previous)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthMetrics {
    pub current_month: String,
    pub previous_month: String,
    pub revenue: GrowthSeries,
    pub orders: GrowthSeries,
    pub customers: GrowthSeries,
}

pub fn growth_metrics(orders: &[OrderRow], reference: NaiveDate) -> GrowthMetrics {
    let anchor = orders
        .iter()
        .filter(|o| !o.is_cancelled())
        .map(|o| o.order_date)
        .max()
        .unwrap_or(reference);

    let current_window = month_window(anchor);
    let previous_window = month_window(current_window.from - Duration::days(1));

    let current = month_totals(orders, current_window);
    let previous = month_totals(orders, previous_window);

    GrowthMetrics {
        current_month: month_key(current_window.from),
        previous_month: month_key(previous_window.from),
        revenue: GrowthSeries::new(round2(current.revenue), round2(previous.revenue)),
        orders: GrowthSeries::new(
            Decimal::from(current.orders),
            Decimal::from(previous.orders),
        ),
        customers: GrowthSeries::new(
            Decimal::from(current.customers),
            Decimal::from(previous.customers),
        ),
    }
}

struct MonthTotals {
    revenue: Decimal,
    orders: i64,
    customers: i64,
}

fn month_totals(orders: &[OrderRow], window: Period) -> MonthTotals {
    let mut revenue = Decimal::ZERO;
    let mut count = 0_i64;
    let mut customers: HashSet<Uuid> = HashSet::new();
    for order in orders.iter().filter(|o| !o.is_cancelled()) {
        if !window.contains(order.order_date) {
            continue;
        }
        revenue += order.total;
        count += 1;
        customers.insert(order.customer_id);
    }
    MonthTotals {
        revenue,
        orders: count,
        customers: customers.len() as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::growth_metrics;
    use crate::insights::testutil::{date, order};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn month_over_month_revenue_growth() {
        let mut orders = Vec::new();
        // September: 62 orders totaling 15,000
        for i in 0..62_u128 {
            let total = if i == 0 { dec!(241.66) } else { dec!(241.94) };
            orders.push(order(i + 1, i + 1, date(2026, 9, 10), total));
        }
        let september_total: Decimal = orders.iter().map(|o| o.total).sum();
        assert_eq!(september_total, dec!(15000.00));
        // October: 85 orders totaling 22,000
        for i in 0..85_u128 {
            let total = if i == 0 { dec!(259.12) } else { dec!(258.82) };
            orders.push(order(100 + i, i + 1, date(2026, 10, 12), total));
        }

        let metrics = growth_metrics(&orders, date(2026, 11, 2));
        assert_eq!(metrics.current_month, "2026-10");
        assert_eq!(metrics.previous_month, "2026-09");
        assert_eq!(metrics.revenue.growth_rate, "46.67");
        assert_eq!(metrics.orders.current, dec!(85));
        assert_eq!(metrics.orders.previous, dec!(62));
        assert_eq!(metrics.orders.growth_rate, "37.10");
    }

    #[test]
    fn first_month_of_activity_reports_one_hundred() {
        let orders = vec![order(1, 1, date(2026, 3, 5), dec!(500))];
        let metrics = growth_metrics(&orders, date(2026, 3, 20));
        assert_eq!(metrics.revenue.current, dec!(500));
        assert_eq!(metrics.revenue.previous, Decimal::ZERO);
        assert_eq!(metrics.revenue.growth_rate, "100.00");
        assert_eq!(metrics.customers.growth_rate, "100.00");
    }

    #[test]
    fn no_activity_reports_zero_growth() {
        let metrics = growth_metrics(&[], date(2026, 3, 20));
        assert_eq!(metrics.current_month, "2026-03");
        assert_eq!(metrics.previous_month, "2026-02");
        assert_eq!(metrics.revenue.growth_rate, "0.00");
        assert_eq!(metrics.orders.growth_rate, "0.00");
    }
}
