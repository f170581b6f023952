//! Order confirmation route handler and shared order views.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use rust_decimal::Decimal;
use tracing::instrument;

use harbor_core::OrderId;

use crate::commerce::Order;
use crate::error::Result;
use crate::filters;
use crate::middleware::{Layout, OptionalAuth};
use crate::state::AppState;

/// Format a backend timestamp as a calendar date ("March 4, 2026").
///
/// Unparseable values are shown as-is.
#[must_use]
pub fn format_date(timestamp: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(timestamp).map_or_else(
        |_| timestamp.to_string(),
        |dt| dt.format("%B %-d, %Y").to_string(),
    )
}

/// Order line display data.
#[derive(Clone)]
pub struct OrderItemView {
    pub title: String,
    pub variant_title: Option<String>,
    pub thumbnail: Option<String>,
    pub quantity: u32,
    pub total: String,
}

/// Order summary for lists.
#[derive(Clone)]
pub struct OrderSummaryView {
    pub id: String,
    pub number: String,
    pub date: String,
    pub status: &'static str,
    pub item_count: u32,
    pub total: String,
}

impl From<&Order> for OrderSummaryView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            number: order.number(),
            date: order.created_at.as_deref().map(format_date).unwrap_or_default(),
            status: order.status.label(),
            item_count: order.items.iter().map(|i| i.quantity).sum(),
            total: order.money(order.total).display(),
        }
    }
}

/// Full order display data.
#[derive(Clone)]
pub struct OrderView {
    pub summary: OrderSummaryView,
    pub email: String,
    pub payment_status: &'static str,
    pub fulfillment_status: &'static str,
    pub items: Vec<OrderItemView>,
    pub subtotal: String,
    pub shipping: String,
    pub discount: Option<String>,
    pub tax: Option<String>,
    pub total: String,
    pub shipping_name: String,
    pub shipping_address: String,
    pub shipping_method: String,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        let nonzero = |amount: Decimal| (!amount.is_zero()).then(|| order.money(amount).display());
        let shipping = order.shipping_address.clone().unwrap_or_default();

        Self {
            summary: OrderSummaryView::from(order),
            email: order.email.clone().unwrap_or_default(),
            payment_status: order.payment_status.label(),
            fulfillment_status: order.fulfillment_status.label(),
            items: order
                .items
                .iter()
                .map(|item| OrderItemView {
                    title: item
                        .product_title
                        .clone()
                        .unwrap_or_else(|| item.title.clone()),
                    variant_title: item
                        .variant_title
                        .clone()
                        .filter(|t| !t.is_empty() && t != "Default"),
                    thumbnail: item.thumbnail.clone(),
                    quantity: item.quantity,
                    total: order
                        .money(
                            item.total
                                .unwrap_or_else(|| item.unit_price * Decimal::from(item.quantity)),
                        )
                        .display(),
                })
                .collect(),
            subtotal: order.money(order.item_subtotal).display(),
            shipping: order.money(order.shipping_total).display(),
            discount: nonzero(order.discount_total),
            tax: nonzero(order.tax_total),
            total: order.money(order.total).display(),
            shipping_name: shipping.full_name(),
            shipping_address: shipping.summary(),
            shipping_method: order
                .shipping_methods
                .iter()
                .map(|m| m.name.clone())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Order confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "order/confirmed.html")]
pub struct OrderConfirmedTemplate {
    pub layout: Layout,
    pub order: OrderView,
}

/// Display the confirmation for a just-placed order.
#[instrument(skip(state, customer, layout), fields(order_id = %id))]
pub async fn confirmed(
    State(state): State<AppState>,
    OptionalAuth(customer): OptionalAuth,
    layout: Layout,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let order = state
        .store()
        .retrieve_order(&OrderId::new(id), customer.as_ref().map(|c| c.token.as_str()))
        .await?;

    Ok(OrderConfirmedTemplate {
        layout,
        order: OrderView::from(&order),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2026-03-04T10:15:00.000Z"), "March 4, 2026");
        assert_eq!(format_date("yesterday"), "yesterday");
    }

    #[test]
    fn test_order_view() {
        let order: Order = serde_json::from_value(json!({
            "id": "order_1",
            "display_id": 1042,
            "email": "ada@example.com",
            "status": "pending",
            "payment_status": "authorized",
            "currency_code": "eur",
            "items": [
                {"id": "li_1", "title": "Shirt", "quantity": 2, "unit_price": 20}
            ],
            "shipping_methods": [{"id": "sm_1", "name": "Express", "amount": 9}],
            "item_subtotal": 40,
            "shipping_total": 9,
            "total": 49,
            "created_at": "2026-03-04T10:15:00Z"
        }))
        .unwrap();

        let view = OrderView::from(&order);
        assert_eq!(view.summary.number, "#1042");
        assert_eq!(view.summary.status, "Processing");
        assert_eq!(view.summary.item_count, 2);
        assert_eq!(view.payment_status, "Authorized");
        assert_eq!(view.items[0].total, "€40.00");
        assert_eq!(view.shipping, "€9.00");
        assert_eq!(view.discount, None);
        assert_eq!(view.total, "€49.00");
        assert_eq!(view.shipping_method, "Express");
    }
}
