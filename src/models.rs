//! Read-only row types consumed by the insights engine. The rows are owned
//! and mutated by the order/customer/product management subsystem; nothing
//! here ever writes them back.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Draft,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Draft,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::Partial,
        PaymentStatus::Paid,
        PaymentStatus::Refunded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Refunded => "refunded",
        }
    }

    /// Statuses that still carry an open balance.
    pub fn is_outstanding(self) -> bool {
        !matches!(self, Self::Paid | Self::Refunded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "customer_segment", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CustomerSegment {
    Vip,
    Premium,
    Standard,
    Basic,
    Potential,
}

impl CustomerSegment {
    pub const ALL: [CustomerSegment; 5] = [
        CustomerSegment::Vip,
        CustomerSegment::Premium,
        CustomerSegment::Standard,
        CustomerSegment::Basic,
        CustomerSegment::Potential,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Vip => "VIP",
            Self::Premium => "Premium",
            Self::Standard => "Standard",
            Self::Basic => "Basic",
            Self::Potential => "Potential",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "customer_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    Corporate,
    Individual,
    Government,
    Other,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub customer_id: Uuid,
    pub order_date: NaiveDate,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub paid_amount: Decimal,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    pub fn is_cancelled(&self) -> bool {
        self.status == OrderStatus::Cancelled
    }

    /// Unpaid balance, floored at zero since refunds can push `paid_amount`
    /// above `total`.
    pub fn outstanding(&self) -> Decimal {
        (self.total - self.paid_amount).max(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItemRow {
    pub order_id: Uuid,
    pub organization_id: Uuid,
    pub product_id: Uuid,
    pub order_date: NaiveDate,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
    pub discount_amount: Decimal,
    pub line_subtotal: Decimal,
    pub line_tax: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CustomerRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub segment: CustomerSegment,
    pub customer_type: CustomerType,
    pub first_purchase_date: Option<NaiveDate>,
    pub last_purchase_date: Option<NaiveDate>,
    // Maintained externally; treated as a possibly-stale projection. The
    // RFM scorer recomputes from live orders instead of trusting these.
    pub lifetime_value: Decimal,
    pub order_count: i64,
    pub rfm_score: Option<i32>,
    pub rfm_segment: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub price_with_tax: Decimal,
    pub cost_price: Decimal,
    pub stock_quantity: i64,
    pub low_stock_threshold: i64,
    pub is_active: bool,
}

/// Every row type the engine reads carries its organization id so the scope
/// filter in `repository::rows` can reject cross-tenant rows outright.
pub trait OrgScoped {
    fn organization_id(&self) -> Uuid;
}

impl OrgScoped for OrderRow {
    fn organization_id(&self) -> Uuid {
        self.organization_id
    }
}

impl OrgScoped for OrderItemRow {
    fn organization_id(&self) -> Uuid {
        self.organization_id
    }
}

impl OrgScoped for CustomerRow {
    fn organization_id(&self) -> Uuid {
        self.organization_id
    }
}

impl OrgScoped for ProductRow {
    fn organization_id(&self) -> Uuid {
        self.organization_id
    }
}
