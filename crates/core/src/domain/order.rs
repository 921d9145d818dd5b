use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::format::format_price;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Returned => "Returned",
            Self::Unknown => "Unknown",
        }
    }

    /// Customers may still cancel while the order has not entered fulfilment.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

pub const CANCELLATION_HINT: &str =
    "This order can still be cancelled. Contact support to cancel it.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackOrderRequest {
    pub order_number: String,
    pub email: String,
}

/// Order record as returned by the tracking endpoint. Unknown fields are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderProjection {
    pub order_number: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub items: Vec<OrderProjectionItem>,
    pub total: Decimal,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub tracking_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderProjectionItem {
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResultItem {
    pub name: String,
    pub quantity: u32,
    /// Line total: unit price times quantity.
    pub price: Decimal,
    pub image_url: Option<String>,
}

impl OrderResultItem {
    pub fn label(&self) -> String {
        format!("{} x{}", self.name, self.quantity)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResultData {
    pub order_number: String,
    pub status: OrderStatus,
    pub items: Vec<OrderResultItem>,
    pub total: Decimal,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<OrderProjection> for OrderResultData {
    fn from(order: OrderProjection) -> Self {
        let items = order
            .items
            .into_iter()
            .map(|item| OrderResultItem {
                price: item.unit_price * Decimal::from(item.quantity),
                name: item.product_name,
                quantity: item.quantity,
                image_url: item.image_url,
            })
            .collect();

        Self {
            order_number: order.order_number,
            status: order.status,
            items,
            total: order.total,
            tracking_number: order.tracking_number.filter(|value| !value.trim().is_empty()),
            tracking_url: order.tracking_url.filter(|value| !value.trim().is_empty()),
            created_at: order.created_at,
        }
    }
}

impl OrderResultData {
    pub fn formatted_total(&self) -> String {
        format_price(self.total)
    }

    pub fn summary(&self) -> String {
        format!("Order #{} is {}.", self.order_number, self.status.label())
    }

    /// Plain-text rendering used by text front ends.
    pub fn render_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Order #{}", self.order_number),
            format!("Status: {}", self.status.label()),
            format!("Placed: {}", self.created_at.format("%d %b %Y")),
        ];
        for item in &self.items {
            lines.push(format!("  {}  {}", item.label(), format_price(item.price)));
        }
        lines.push(format!("Total: {}", self.formatted_total()));
        if let Some(tracking_number) = &self.tracking_number {
            lines.push(format!("Tracking #: {tracking_number}"));
        }
        if let Some(tracking_url) = &self.tracking_url {
            lines.push(format!("Track shipment: {tracking_url}"));
        }
        if self.status.is_cancellable() {
            lines.push(CANCELLATION_HINT.to_string());
        }
        lines
    }
}
