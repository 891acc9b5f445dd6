//! Order, payment, and accounts-receivable analytics.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::insights::numeric::{format_2dp, mean_days, pct_string, round2, safe_div};
use crate::insights::period::Period;
use crate::models::{OrderRow, OrderStatus, PaymentStatus};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBucket {
    pub status: String,
    pub count: i64,
    pub total_value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMetrics {
    pub total_orders: i64,
    pub by_status: Vec<StatusBucket>,
    pub by_payment_status: Vec<StatusBucket>,
    pub fulfillment_rate: String,
}

/// Breakdown over every lifecycle and payment status, zero-filled so the
/// dashboard always sees the full set of buckets.
pub fn order_metrics(orders: &[OrderRow]) -> OrderMetrics {
    let total_orders = orders.len() as i64;

    let by_status = OrderStatus::ALL
        .iter()
        .map(|status| {
            let matching: Vec<&OrderRow> =
                orders.iter().filter(|o| o.status == *status).collect();
            StatusBucket {
                status: status.as_str().to_string(),
                count: matching.len() as i64,
                total_value: round2(matching.iter().map(|o| o.total).sum()),
            }
        })
        .collect();

    let by_payment_status = PaymentStatus::ALL
        .iter()
        .map(|status| {
            let matching: Vec<&OrderRow> = orders
                .iter()
                .filter(|o| o.payment_status == *status)
                .collect();
            StatusBucket {
                status: status.as_str().to_string(),
                count: matching.len() as i64,
                total_value: round2(matching.iter().map(|o| o.total).sum()),
            }
        })
        .collect();

    let delivered = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Delivered)
        .count() as i64;

    OrderMetrics {
        total_orders,
        by_status,
        by_payment_status,
        fulfillment_rate: pct_string(Decimal::from(delivered), Decimal::from(total_orders)),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentGroup {
    pub payment_status: String,
    pub payment_method: String,
    pub count: i64,
    pub total_amount: Decimal,
    pub percentage: String,
    pub average_days_to_payment: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAnalysis {
    pub total_amount: Decimal,
    pub groups: Vec<PaymentGroup>,
}

/// Groups non-cancelled orders by `(payment_status, payment_method)`.
/// Days-to-payment averages only orders that actually reached paid or
/// partial status with a recorded `paid_at`.
pub fn payment_analysis(orders: &[OrderRow]) -> PaymentAnalysis {
    struct GroupAccumulator {
        count: i64,
        amount: Decimal,
        days_to_payment: Vec<i64>,
    }

    let mut groups: BTreeMap<(String, String), GroupAccumulator> = BTreeMap::new();
    for order in orders.iter().filter(|o| !o.is_cancelled()) {
        let method = order
            .payment_method
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or("unknown")
            .to_string();
        let key = (order.payment_status.as_str().to_string(), method);
        let entry = groups.entry(key).or_insert(GroupAccumulator {
            count: 0,
            amount: Decimal::ZERO,
            days_to_payment: Vec::new(),
        });
        entry.count += 1;
        entry.amount += order.total;

        if matches!(
            order.payment_status,
            PaymentStatus::Paid | PaymentStatus::Partial
        ) {
            if let Some(paid_at) = order.paid_at {
                let days = (paid_at.date_naive() - order.order_date).num_days();
                entry.days_to_payment.push(days.max(0));
            }
        }
    }

    let total_amount: Decimal = groups.values().map(|g| g.amount).sum();

    let mut rows: Vec<PaymentGroup> = groups
        .into_iter()
        .map(|((payment_status, payment_method), acc)| PaymentGroup {
            payment_status,
            payment_method,
            count: acc.count,
            total_amount: round2(acc.amount),
            percentage: pct_string(acc.amount, total_amount),
            average_days_to_payment: mean_days(&acc.days_to_payment),
        })
        .collect();

    rows.sort_by(|left, right| {
        right
            .total_amount
            .cmp(&left.total_amount)
            .then_with(|| left.payment_status.cmp(&right.payment_status))
            .then_with(|| left.payment_method.cmp(&right.payment_method))
    });

    PaymentAnalysis {
        total_amount: round2(total_amount),
        groups: rows,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DsoMetrics {
    pub accounts_receivable: Decimal,
    pub credit_revenue: Decimal,
    pub period_days: i64,
    pub dso_days: String,
}

/// Days Sales Outstanding: open receivables divided by billed revenue,
/// scaled by the number of days in the period. For an unbounded request the
/// span runs from the earliest order date through the reference date.
pub fn dso(orders: &[OrderRow], period: Option<Period>, reference: NaiveDate) -> DsoMetrics {
    let billed: Vec<&OrderRow> = orders.iter().filter(|o| !o.is_cancelled()).collect();

    let accounts_receivable: Decimal = billed
        .iter()
        .filter(|o| o.payment_status.is_outstanding())
        .map(|o| o.outstanding())
        .sum();
    let credit_revenue: Decimal = billed.iter().map(|o| o.total).sum();

    let period_days = match period {
        Some(period) => period.days(),
        None => billed
            .iter()
            .map(|o| o.order_date)
            .min()
            .map(|earliest| (reference - earliest).num_days() + 1)
            .unwrap_or(0),
    };

    DsoMetrics {
        accounts_receivable: round2(accounts_receivable),
        credit_revenue: round2(credit_revenue),
        period_days,
        dso_days: format_2dp(safe_div(
            accounts_receivable * Decimal::from(period_days),
            credit_revenue,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::{dso, order_metrics, payment_analysis};
    use crate::insights::period::Period;
    use crate::insights::testutil::{date, order};
    use crate::models::{OrderStatus, PaymentStatus};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn status_buckets_are_zero_filled() {
        let metrics = order_metrics(&[]);
        assert_eq!(metrics.total_orders, 0);
        assert_eq!(metrics.by_status.len(), 6);
        assert_eq!(metrics.by_payment_status.len(), 4);
        assert_eq!(metrics.fulfillment_rate, "0.00");
    }

    #[test]
    fn fulfillment_rate_counts_delivered_orders() {
        let delivered = order(1, 1, date(2026, 6, 1), dec!(100));
        let mut processing = order(2, 1, date(2026, 6, 2), dec!(100));
        processing.status = OrderStatus::Processing;
        let mut cancelled = order(3, 1, date(2026, 6, 3), dec!(100));
        cancelled.status = OrderStatus::Cancelled;

        let metrics = order_metrics(&[delivered, processing, cancelled]);
        assert_eq!(metrics.total_orders, 3);
        assert_eq!(metrics.fulfillment_rate, "33.33");
        let delivered_bucket = metrics
            .by_status
            .iter()
            .find(|b| b.status == "delivered")
            .unwrap();
        assert_eq!(delivered_bucket.count, 1);
        assert_eq!(delivered_bucket.total_value, dec!(100));
    }

    #[test]
    fn payment_groups_split_by_status_and_method() {
        let mut card = order(1, 1, date(2026, 6, 1), dec!(300));
        card.paid_at = Some(Utc.with_ymd_and_hms(2026, 6, 5, 10, 0, 0).unwrap());

        let mut transfer = order(2, 2, date(2026, 6, 1), dec!(100));
        transfer.payment_method = Some("transfer".to_string());
        transfer.paid_at = Some(Utc.with_ymd_and_hms(2026, 6, 9, 10, 0, 0).unwrap());

        let mut pending = order(3, 3, date(2026, 6, 2), dec!(600));
        pending.payment_status = PaymentStatus::Pending;
        pending.payment_method = None;
        pending.paid_amount = Decimal::ZERO;
        pending.paid_at = None;

        let analysis = payment_analysis(&[card, transfer, pending]);
        assert_eq!(analysis.total_amount, dec!(1000));
        assert_eq!(analysis.groups.len(), 3);

        // sorted by amount: pending/unknown 600, paid/card 300, paid/transfer 100
        assert_eq!(analysis.groups[0].payment_status, "pending");
        assert_eq!(analysis.groups[0].payment_method, "unknown");
        assert_eq!(analysis.groups[0].percentage, "60.00");
        assert_eq!(analysis.groups[0].average_days_to_payment, "0.00");

        assert_eq!(analysis.groups[1].payment_method, "card");
        assert_eq!(analysis.groups[1].average_days_to_payment, "4.00");
        assert_eq!(analysis.groups[2].payment_method, "transfer");
        assert_eq!(analysis.groups[2].average_days_to_payment, "8.00");
    }

    #[test]
    fn dso_scales_receivables_by_period_length() {
        let mut open = order(1, 1, date(2026, 6, 1), dec!(500));
        open.payment_status = PaymentStatus::Partial;
        open.paid_amount = dec!(200);
        let paid = order(2, 2, date(2026, 6, 2), dec!(500));

        let period = Period {
            from: date(2026, 6, 1),
            to: date(2026, 6, 30),
        };
        let metrics = dso(&[open, paid], Some(period), date(2026, 6, 30));
        assert_eq!(metrics.accounts_receivable, dec!(300));
        assert_eq!(metrics.credit_revenue, dec!(1000));
        assert_eq!(metrics.period_days, 30);
        // 300 / 1000 * 30
        assert_eq!(metrics.dso_days, "9.00");
    }

    #[test]
    fn dso_with_no_revenue_is_zero() {
        let metrics = dso(&[], None, date(2026, 6, 30));
        assert_eq!(metrics.period_days, 0);
        assert_eq!(metrics.dso_days, "0.00");
    }
}
