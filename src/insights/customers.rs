//! Customer analytics: segment breakdown, top customers, RFM scoring, and
//! retention/churn over a trailing window.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::insights::numeric::{format_2dp, pct_string, round2, safe_div};
use crate::insights::ranking::top_n;
use crate::insights::InsightsSettings;
use crate::models::{CustomerRow, CustomerSegment, OrderRow};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentMetrics {
    pub segment: String,
    pub customer_count: i64,
    pub total_orders: i64,
    pub total_revenue: Decimal,
    pub average_order_value: Decimal,
    pub active_last30_days: i64,
    pub customer_share: String,
    pub revenue_share: String,
}

/// One entry per segment, zero-filled for segments with no customers.
/// Shares are rounded independently per segment, so the column sums land
/// within ±0.1 of 100 rather than exactly on it.
pub fn segment_breakdown(
    customers: &[CustomerRow],
    orders: &[OrderRow],
    reference: NaiveDate,
) -> Vec<SegmentMetrics> {
    let segment_of: HashMap<Uuid, CustomerSegment> =
        customers.iter().map(|c| (c.id, c.segment)).collect();

    struct SegmentAccumulator {
        customers: i64,
        orders: i64,
        revenue: Decimal,
        active: HashSet<Uuid>,
    }
    let mut buckets: HashMap<CustomerSegment, SegmentAccumulator> = CustomerSegment::ALL
        .iter()
        .map(|segment| {
            (
                *segment,
                SegmentAccumulator {
                    customers: 0,
                    orders: 0,
                    revenue: Decimal::ZERO,
                    active: HashSet::new(),
                },
            )
        })
        .collect();

    for customer in customers {
        if let Some(bucket) = buckets.get_mut(&customer.segment) {
            bucket.customers += 1;
        }
    }

    let activity_cutoff = reference - Duration::days(30);
    for order in orders.iter().filter(|o| !o.is_cancelled()) {
        let Some(segment) = segment_of.get(&order.customer_id) else {
            continue;
        };
        if let Some(bucket) = buckets.get_mut(segment) {
            bucket.orders += 1;
            bucket.revenue += order.total;
            if order.order_date > activity_cutoff && order.order_date <= reference {
                bucket.active.insert(order.customer_id);
            }
        }
    }

    let total_customers = Decimal::from(customers.len() as i64);
    let total_revenue: Decimal = buckets.values().map(|b| b.revenue).sum();

    CustomerSegment::ALL
        .iter()
        .map(|segment| {
            let bucket = &buckets[segment];
            SegmentMetrics {
                segment: segment.label().to_string(),
                customer_count: bucket.customers,
                total_orders: bucket.orders,
                total_revenue: round2(bucket.revenue),
                average_order_value: round2(safe_div(
                    bucket.revenue,
                    Decimal::from(bucket.orders),
                )),
                active_last30_days: bucket.active.len() as i64,
                customer_share: pct_string(Decimal::from(bucket.customers), total_customers),
                revenue_share: pct_string(bucket.revenue, total_revenue),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopCustomer {
    pub customer_id: Uuid,
    pub name: String,
    pub segment: String,
    pub total_orders: i64,
    pub total_revenue: Decimal,
    pub last_order_date: Option<NaiveDate>,
}

pub fn top_customers(
    customers: &[CustomerRow],
    orders: &[OrderRow],
    limit: usize,
) -> Vec<TopCustomer> {
    let mut by_customer: HashMap<Uuid, (i64, Decimal, Option<NaiveDate>)> = HashMap::new();
    for order in orders.iter().filter(|o| !o.is_cancelled()) {
        let entry = by_customer
            .entry(order.customer_id)
            .or_insert((0, Decimal::ZERO, None));
        entry.0 += 1;
        entry.1 += order.total;
        if entry.2.is_none_or(|last| order.order_date > last) {
            entry.2 = Some(order.order_date);
        }
    }

    let ranked: Vec<TopCustomer> = customers
        .iter()
        .filter_map(|customer| {
            let (total_orders, total_revenue, last_order_date) =
                by_customer.get(&customer.id).copied()?;
            Some(TopCustomer {
                customer_id: customer.id,
                name: customer.name.clone(),
                segment: customer.segment.label().to_string(),
                total_orders,
                total_revenue: round2(total_revenue),
                last_order_date,
            })
        })
        .collect();

    top_n(ranked, limit, |c| c.total_revenue, |c| c.customer_id)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RfmScore {
    pub customer_id: Uuid,
    pub name: String,
    pub recency_days: i64,
    pub frequency: i64,
    pub monetary: Decimal,
    pub recency_score: u8,
    pub frequency_score: u8,
    pub monetary_score: u8,
    pub rfm_score: u8,
    pub rfm_segment: String,
}

/// Scores every customer with at least one non-cancelled order. Frequency
/// and monetary values are bucketed into quintiles across the organization;
/// recency uses the same buckets inverted so more recent scores higher.
/// Lifetime values cached on the customer row are ignored in favor of the
/// live order history.
pub fn rfm_scores(
    customers: &[CustomerRow],
    orders: &[OrderRow],
    settings: &InsightsSettings,
    reference: NaiveDate,
) -> Vec<RfmScore> {
    struct CustomerHistory {
        last_order: NaiveDate,
        frequency: i64,
        monetary: Decimal,
    }

    let mut history: HashMap<Uuid, CustomerHistory> = HashMap::new();
    for order in orders.iter().filter(|o| !o.is_cancelled()) {
        let entry = history
            .entry(order.customer_id)
            .or_insert(CustomerHistory {
                last_order: order.order_date,
                frequency: 0,
                monetary: Decimal::ZERO,
            });
        entry.frequency += 1;
        entry.monetary += order.total;
        if order.order_date > entry.last_order {
            entry.last_order = order.order_date;
        }
    }

    let recency_values: Vec<Decimal> = history
        .values()
        .map(|h| Decimal::from((reference - h.last_order).num_days()))
        .collect();
    let frequency_values: Vec<Decimal> =
        history.values().map(|h| Decimal::from(h.frequency)).collect();
    let monetary_values: Vec<Decimal> = history.values().map(|h| h.monetary).collect();

    let mut scores: Vec<RfmScore> = customers
        .iter()
        .filter_map(|customer| {
            let record = history.get(&customer.id)?;
            let recency_days = (reference - record.last_order).num_days();

            let recency_score =
                6 - quintile_score(&recency_values, Decimal::from(recency_days));
            let frequency_score =
                quintile_score(&frequency_values, Decimal::from(record.frequency));
            let monetary_score = quintile_score(&monetary_values, record.monetary);
            let composite = recency_score + frequency_score + monetary_score;

            Some(RfmScore {
                customer_id: customer.id,
                name: customer.name.clone(),
                recency_days,
                frequency: record.frequency,
                monetary: round2(record.monetary),
                recency_score,
                frequency_score,
                monetary_score,
                rfm_score: composite,
                rfm_segment: settings.rfm_label(composite).to_string(),
            })
        })
        .collect();

    scores.sort_by(|left, right| {
        right
            .rfm_score
            .cmp(&left.rfm_score)
            .then_with(|| left.customer_id.cmp(&right.customer_id))
    });
    scores
}

/// Rank-based quintile bucket, 1..=5. Equal values always land in the same
/// bucket so scoring is order-independent.
fn quintile_score(values: &[Decimal], target: Decimal) -> u8 {
    let n = values.len();
    if n == 0 {
        return 1;
    }
    let below = values.iter().filter(|value| **value < target).count();
    ((below * 5) / n) as u8 + 1
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionMetrics {
    pub window_days: i64,
    pub previous_active: i64,
    pub current_active: i64,
    pub retained: i64,
    pub retention_rate: String,
    pub churn_rate: String,
}

/// Retention over two consecutive trailing windows ending at `reference`.
/// With no previously-active customers both rates report 0 rather than
/// claiming total churn.
pub fn retention(orders: &[OrderRow], window_days: i64, reference: NaiveDate) -> RetentionMetrics {
    let window_start = reference - Duration::days(window_days);
    let previous_start = window_start - Duration::days(window_days);

    let mut current: HashSet<Uuid> = HashSet::new();
    let mut previous: HashSet<Uuid> = HashSet::new();
    for order in orders.iter().filter(|o| !o.is_cancelled()) {
        if order.order_date > window_start && order.order_date <= reference {
            current.insert(order.customer_id);
        } else if order.order_date > previous_start && order.order_date <= window_start {
            previous.insert(order.customer_id);
        }
    }

    let retained = previous.intersection(&current).count() as i64;
    let previous_active = previous.len() as i64;

    let (retention_rate, churn_rate) = if previous_active == 0 {
        (format_2dp(Decimal::ZERO), format_2dp(Decimal::ZERO))
    } else {
        let retention = safe_div(Decimal::from(retained), Decimal::from(previous_active))
            * Decimal::ONE_HUNDRED;
        (
            format_2dp(retention),
            format_2dp(Decimal::ONE_HUNDRED - retention),
        )
    };

    RetentionMetrics {
        window_days,
        previous_active,
        current_active: current.len() as i64,
        retained,
        retention_rate,
        churn_rate,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChurnMetrics {
    pub window_days: i64,
    pub previous_active: i64,
    pub churned: i64,
    pub churn_rate: String,
}

pub fn churn(orders: &[OrderRow], window_days: i64, reference: NaiveDate) -> ChurnMetrics {
    let retention = retention(orders, window_days, reference);
    ChurnMetrics {
        window_days,
        previous_active: retention.previous_active,
        churned: retention.previous_active - retention.retained,
        churn_rate: retention.churn_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::{churn, quintile_score, retention, rfm_scores, segment_breakdown, top_customers};
    use crate::insights::testutil::{customer, date, order};
    use crate::insights::InsightsSettings;
    use crate::models::{CustomerSegment, OrderStatus};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn segment_shares_match_documented_example() {
        let customers = vec![
            customer(1, CustomerSegment::Vip),
            customer(2, CustomerSegment::Standard),
        ];
        // 456k org-wide revenue, 125k of it VIP
        let orders = vec![
            order(1, 1, date(2026, 6, 1), dec!(125000)),
            order(2, 2, date(2026, 6, 2), dec!(52000)),
            order(3, 2, date(2026, 6, 3), dec!(279000)),
        ];
        let breakdown = segment_breakdown(&customers, &orders, date(2026, 6, 30));
        let vip = breakdown.iter().find(|s| s.segment == "VIP").unwrap();
        assert_eq!(vip.revenue_share, "27.41");
        assert_eq!(vip.customer_share, "50.00");
        assert_eq!(vip.total_revenue, dec!(125000));
    }

    #[test]
    fn empty_segments_report_zero_rates() {
        let breakdown = segment_breakdown(&[], &[], date(2026, 6, 30));
        assert_eq!(breakdown.len(), 5);
        for segment in &breakdown {
            assert_eq!(segment.customer_count, 0);
            assert_eq!(segment.customer_share, "0.00");
            assert_eq!(segment.revenue_share, "0.00");
            assert_eq!(segment.average_order_value, Decimal::ZERO);
        }
    }

    #[test]
    fn activity_window_trails_the_reference_date() {
        let customers = vec![customer(1, CustomerSegment::Vip)];
        let orders = vec![
            order(1, 1, date(2026, 6, 20), dec!(100)),
            order(2, 1, date(2026, 4, 1), dec!(100)),
        ];
        let breakdown = segment_breakdown(&customers, &orders, date(2026, 6, 30));
        let vip = breakdown.iter().find(|s| s.segment == "VIP").unwrap();
        assert_eq!(vip.active_last30_days, 1);
        assert_eq!(vip.total_orders, 2);
    }

    #[test]
    fn top_customers_rank_by_revenue_with_id_tiebreak() {
        let customers = vec![
            customer(7, CustomerSegment::Standard),
            customer(3, CustomerSegment::Standard),
            customer(9, CustomerSegment::Basic),
        ];
        let orders = vec![
            order(1, 7, date(2026, 6, 1), dec!(1000)),
            order(2, 3, date(2026, 6, 2), dec!(1000)),
            order(3, 9, date(2026, 6, 3), dec!(50)),
        ];
        let top = top_customers(&customers, &orders, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].customer_id, Uuid::from_u128(3));
        assert_eq!(top[1].customer_id, Uuid::from_u128(7));
        assert_eq!(top[0].last_order_date, Some(date(2026, 6, 2)));
    }

    #[test]
    fn quintile_scores_are_rank_based_and_tie_stable() {
        let values = vec![dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)];
        assert_eq!(quintile_score(&values, dec!(1)), 1);
        assert_eq!(quintile_score(&values, dec!(3)), 3);
        assert_eq!(quintile_score(&values, dec!(5)), 5);
        // equal values share a bucket
        let tied = vec![dec!(10), dec!(10), dec!(10)];
        assert_eq!(quintile_score(&tied, dec!(10)), 1);
        assert_eq!(quintile_score(&[], dec!(1)), 1);
    }

    #[test]
    fn rfm_scores_prefer_recent_frequent_high_spenders() {
        let customers = vec![
            customer(1, CustomerSegment::Vip),
            customer(2, CustomerSegment::Basic),
        ];
        let reference = date(2026, 6, 30);
        let mut orders = vec![
            // customer 1: recent, frequent, high monetary
            order(1, 1, date(2026, 6, 25), dec!(5000)),
            order(2, 1, date(2026, 6, 10), dec!(4000)),
            order(3, 1, date(2026, 5, 20), dec!(3000)),
            // customer 2: one old small order
            order(4, 2, date(2025, 11, 2), dec!(40)),
        ];
        // a cancelled order must not count toward frequency or monetary
        orders.push({
            let mut cancelled = order(5, 2, date(2026, 6, 29), dec!(90000));
            cancelled.status = OrderStatus::Cancelled;
            cancelled
        });

        let scores = rfm_scores(&customers, &orders, &InsightsSettings::default(), reference);
        assert_eq!(scores.len(), 2);
        let best = &scores[0];
        assert_eq!(best.customer_id, Uuid::from_u128(1));
        assert_eq!(best.frequency, 3);
        assert_eq!(best.monetary, dec!(12000));
        assert!(best.rfm_score > scores[1].rfm_score);
        assert_eq!(scores[1].recency_days, (reference - date(2025, 11, 2)).num_days());
    }

    #[test]
    fn retention_counts_customers_active_in_both_windows() {
        let reference = date(2026, 6, 30);
        let orders = vec![
            // active in previous window only
            order(1, 1, date(2026, 2, 15), dec!(100)),
            // active in both windows
            order(2, 2, date(2026, 2, 20), dec!(100)),
            order(3, 2, date(2026, 5, 10), dec!(100)),
            // new in current window
            order(4, 3, date(2026, 6, 1), dec!(100)),
        ];
        let metrics = retention(&orders, 90, reference);
        assert_eq!(metrics.previous_active, 2);
        assert_eq!(metrics.current_active, 2);
        assert_eq!(metrics.retained, 1);
        assert_eq!(metrics.retention_rate, "50.00");
        assert_eq!(metrics.churn_rate, "50.00");

        let churned = churn(&orders, 90, reference);
        assert_eq!(churned.churned, 1);
        assert_eq!(churned.churn_rate, "50.00");
    }

    #[test]
    fn retention_with_no_prior_activity_reports_zero() {
        let orders = vec![order(1, 1, date(2026, 6, 1), dec!(100))];
        let metrics = retention(&orders, 90, date(2026, 6, 30));
        assert_eq!(metrics.previous_active, 0);
        assert_eq!(metrics.retention_rate, "0.00");
        assert_eq!(metrics.churn_rate, "0.00");
    }
}
