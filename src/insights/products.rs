//! Product and inventory analytics: top sellers, category performance,
//! stock health, and inventory turnover.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::insights::numeric::{format_2dp, pct_string, round2, safe_div};
use crate::insights::ranking::top_n;
use crate::models::{OrderItemRow, OrderRow, ProductRow};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub category: String,
    pub total_quantity_sold: i64,
    pub total_revenue: Decimal,
    pub average_selling_price: Decimal,
}

/// Sold quantities per product, excluding items from cancelled orders. A
/// product id appearing on items but missing from the product list still
/// ranks, with a blank name, so revenue is never silently dropped.
pub fn top_products(
    items: &[OrderItemRow],
    products: &[ProductRow],
    orders: &[OrderRow],
    limit: usize,
) -> Vec<TopProduct> {
    let sold = sold_by_product(items, orders);
    let by_id: HashMap<Uuid, &ProductRow> = products.iter().map(|p| (p.id, p)).collect();

    let ranked: Vec<TopProduct> = sold
        .into_iter()
        .map(|(product_id, (quantity, revenue))| {
            let product = by_id.get(&product_id);
            TopProduct {
                product_id,
                name: product.map(|p| p.name.clone()).unwrap_or_default(),
                category: product.map(|p| p.category.clone()).unwrap_or_default(),
                total_quantity_sold: quantity,
                total_revenue: round2(revenue),
                average_selling_price: round2(safe_div(revenue, Decimal::from(quantity))),
            }
        })
        .collect();

    top_n(ranked, limit, |p| p.total_revenue, |p| p.product_id)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPerformance {
    pub category: String,
    pub total_revenue: Decimal,
    pub total_quantity_sold: i64,
    pub revenue_share: String,
    pub active_product_count: i64,
    pub total_stock_value: Decimal,
}

pub fn category_performance(
    items: &[OrderItemRow],
    products: &[ProductRow],
    orders: &[OrderRow],
) -> Vec<CategoryPerformance> {
    let sold = sold_by_product(items, orders);
    let category_of: HashMap<Uuid, &str> = products
        .iter()
        .map(|p| (p.id, p.category.as_str()))
        .collect();

    let mut revenue_by_category: HashMap<String, (Decimal, i64)> = HashMap::new();
    for (product_id, (quantity, revenue)) in &sold {
        let category = category_of
            .get(product_id)
            .copied()
            .unwrap_or("uncategorized");
        let entry = revenue_by_category
            .entry(category.to_string())
            .or_insert((Decimal::ZERO, 0));
        entry.0 += *revenue;
        entry.1 += *quantity;
    }

    // Categories with stock but no sales still appear, zero-filled.
    let mut stock_by_category: HashMap<String, (i64, Decimal)> = HashMap::new();
    for product in products.iter().filter(|p| p.is_active) {
        let entry = stock_by_category
            .entry(product.category.clone())
            .or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += product.price * Decimal::from(product.stock_quantity);
    }

    let total_revenue: Decimal = revenue_by_category.values().map(|(r, _)| *r).sum();

    let mut categories: HashSet<String> = revenue_by_category.keys().cloned().collect();
    categories.extend(stock_by_category.keys().cloned());

    let mut rows: Vec<CategoryPerformance> = categories
        .into_iter()
        .map(|category| {
            let (revenue, quantity) = revenue_by_category
                .get(&category)
                .copied()
                .unwrap_or((Decimal::ZERO, 0));
            let (product_count, stock_value) = stock_by_category
                .get(&category)
                .copied()
                .unwrap_or((0, Decimal::ZERO));
            CategoryPerformance {
                category,
                total_revenue: round2(revenue),
                total_quantity_sold: quantity,
                revenue_share: pct_string(revenue, total_revenue),
                active_product_count: product_count,
                total_stock_value: round2(stock_value),
            }
        })
        .collect();

    rows.sort_by(|left, right| {
        right
            .total_revenue
            .cmp(&left.total_revenue)
            .then_with(|| left.category.cmp(&right.category))
    });
    rows
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryHealth {
    pub total_active_products: i64,
    pub healthy_stock: i64,
    pub low_stock: i64,
    pub out_of_stock: i64,
    pub total_stock_value: Decimal,
    pub stock_health_rate: String,
    pub stockout_rate: String,
}

/// Healthy means stock strictly above the product's low-stock threshold;
/// a product at or below it (but nonzero) is low; zero stock is a stockout.
pub fn inventory_health(products: &[ProductRow]) -> InventoryHealth {
    let active: Vec<&ProductRow> = products.iter().filter(|p| p.is_active).collect();
    let total = Decimal::from(active.len() as i64);

    let mut healthy = 0_i64;
    let mut low = 0_i64;
    let mut out = 0_i64;
    let mut stock_value = Decimal::ZERO;
    for product in &active {
        if product.stock_quantity == 0 {
            out += 1;
        } else if product.stock_quantity <= product.low_stock_threshold {
            low += 1;
        } else {
            healthy += 1;
        }
        stock_value += product.price * Decimal::from(product.stock_quantity);
    }

    InventoryHealth {
        total_active_products: active.len() as i64,
        healthy_stock: healthy,
        low_stock: low,
        out_of_stock: out,
        total_stock_value: round2(stock_value),
        stock_health_rate: pct_string(Decimal::from(healthy), total),
        stockout_rate: pct_string(Decimal::from(out), total),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryTurnover {
    pub cost_of_goods_sold: Decimal,
    pub period_start_stock_value: Decimal,
    pub period_end_stock_value: Decimal,
    pub average_stock_value: Decimal,
    pub turnover_ratio: String,
}

/// COGS over the mean of period-start and period-end stock valuation. The
/// period-start quantity is reconstructed by adding the units sold in the
/// period back onto the current stock level (a two-point average, not a
/// daily integration).
pub fn inventory_turnover(
    items: &[OrderItemRow],
    products: &[ProductRow],
    orders: &[OrderRow],
) -> InventoryTurnover {
    let sold = sold_by_product(items, orders);

    let mut cost_of_goods_sold = Decimal::ZERO;
    let mut end_value = Decimal::ZERO;
    let mut start_value = Decimal::ZERO;
    for product in products.iter().filter(|p| p.is_active) {
        let sold_quantity = sold.get(&product.id).map(|(q, _)| *q).unwrap_or(0);
        cost_of_goods_sold += product.cost_price * Decimal::from(sold_quantity);
        end_value += product.cost_price * Decimal::from(product.stock_quantity);
        start_value += product.cost_price * Decimal::from(product.stock_quantity + sold_quantity);
    }

    let average = safe_div(start_value + end_value, Decimal::from(2));
    InventoryTurnover {
        cost_of_goods_sold: round2(cost_of_goods_sold),
        period_start_stock_value: round2(start_value),
        period_end_stock_value: round2(end_value),
        average_stock_value: round2(average),
        turnover_ratio: format_2dp(safe_div(cost_of_goods_sold, average)),
    }
}

/// Quantity and revenue per product over items whose parent order is not
/// cancelled.
fn sold_by_product(
    items: &[OrderItemRow],
    orders: &[OrderRow],
) -> HashMap<Uuid, (i64, Decimal)> {
    let billed_ids: HashSet<Uuid> = orders
        .iter()
        .filter(|o| !o.is_cancelled())
        .map(|o| o.id)
        .collect();

    let mut sold: HashMap<Uuid, (i64, Decimal)> = HashMap::new();
    for item in items {
        if !billed_ids.contains(&item.order_id) {
            continue;
        }
        let entry = sold.entry(item.product_id).or_insert((0, Decimal::ZERO));
        entry.0 += item.quantity;
        entry.1 += item.line_total;
    }
    sold
}

#[cfg(test)]
mod tests {
    use super::{category_performance, inventory_health, inventory_turnover, top_products};
    use crate::insights::testutil::{date, item, order, product};
    use crate::models::OrderStatus;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn top_products_tie_breaks_on_ascending_id() {
        let orders = vec![
            order(1, 1, date(2026, 6, 1), dec!(1000)),
            order(2, 2, date(2026, 6, 2), dec!(1000)),
        ];
        let products = vec![
            product(7, "widgets", dec!(10), dec!(20), 5, 2),
            product(3, "widgets", dec!(10), dec!(20), 5, 2),
        ];
        let items = vec![
            item(&orders[0], 7, 10, dec!(1000)),
            item(&orders[1], 3, 10, dec!(1000)),
        ];
        let top = top_products(&items, &products, &orders, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].product_id, Uuid::from_u128(3));
        assert_eq!(top[0].average_selling_price, dec!(100));
    }

    #[test]
    fn cancelled_orders_do_not_sell() {
        let mut cancelled = order(1, 1, date(2026, 6, 1), dec!(500));
        cancelled.status = OrderStatus::Cancelled;
        let live = order(2, 1, date(2026, 6, 2), dec!(300));
        let products = vec![product(1, "widgets", dec!(5), dec!(10), 100, 10)];
        let items = vec![
            item(&cancelled, 1, 50, dec!(500)),
            item(&live, 1, 30, dec!(300)),
        ];
        let top = top_products(&items, &products, &[cancelled, live], 10);
        assert_eq!(top[0].total_quantity_sold, 30);
        assert_eq!(top[0].total_revenue, dec!(300));
    }

    #[test]
    fn category_shares_sum_to_roughly_one_hundred() {
        let orders = vec![order(1, 1, date(2026, 6, 1), dec!(1000))];
        let products = vec![
            product(1, "widgets", dec!(5), dec!(10), 10, 2),
            product(2, "gadgets", dec!(5), dec!(10), 20, 2),
            product(3, "gizmos", dec!(5), dec!(10), 0, 2),
        ];
        let items = vec![
            item(&orders[0], 1, 10, dec!(333)),
            item(&orders[0], 2, 10, dec!(333)),
            item(&orders[0], 3, 10, dec!(334)),
        ];
        let rows = category_performance(&items, &products, &orders);
        assert_eq!(rows.len(), 3);
        let share_sum: f64 = rows
            .iter()
            .map(|r| r.revenue_share.parse::<f64>().unwrap())
            .sum();
        assert!((share_sum - 100.0).abs() <= 0.1);
        // stock valuation only counts active products in the category
        let widgets = rows.iter().find(|r| r.category == "widgets").unwrap();
        assert_eq!(widgets.total_stock_value, dec!(100));
    }

    #[test]
    fn inventory_health_thresholds() {
        let products = vec![
            product(1, "widgets", dec!(5), dec!(10), 0, 10),
            product(2, "widgets", dec!(5), dec!(10), 5, 10),
        ];
        let health = inventory_health(&products);
        assert_eq!(health.total_active_products, 2);
        assert_eq!(health.stockout_rate, "50.00");
        assert_eq!(health.stock_health_rate, "0.00");
        assert_eq!(health.low_stock, 1);
    }

    #[test]
    fn inventory_health_with_no_active_products() {
        let mut inactive = product(1, "widgets", dec!(5), dec!(10), 0, 10);
        inactive.is_active = false;
        let health = inventory_health(&[inactive]);
        assert_eq!(health.total_active_products, 0);
        assert_eq!(health.stockout_rate, "0.00");
        assert_eq!(health.stock_health_rate, "0.00");
    }

    #[test]
    fn turnover_uses_two_point_average() {
        let orders = vec![order(1, 1, date(2026, 6, 1), dec!(1000))];
        // 40 units sold at cost 10; 60 left in stock
        let products = vec![product(1, "widgets", dec!(10), dec!(25), 60, 5)];
        let items = vec![item(&orders[0], 1, 40, dec!(1000))];
        let turnover = inventory_turnover(&items, &products, &orders);
        assert_eq!(turnover.cost_of_goods_sold, dec!(400));
        assert_eq!(turnover.period_start_stock_value, dec!(1000));
        assert_eq!(turnover.period_end_stock_value, dec!(600));
        assert_eq!(turnover.average_stock_value, dec!(800));
        assert_eq!(turnover.turnover_ratio, "0.50");
    }

    #[test]
    fn turnover_with_no_inventory_is_zero() {
        let turnover = inventory_turnover(&[], &[], &[]);
        assert_eq!(turnover.turnover_ratio, "0.00");
    }
}
