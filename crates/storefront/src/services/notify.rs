//! Fire-and-forget order notifications.
//!
//! The notification collaborator receives an order-confirmed event after a
//! successful checkout. Delivery is best-effort: a failure is logged and
//! never fails the order.

use cloudberry_commerce::models::Order;

/// Notification collaborator client.
#[derive(Clone)]
pub struct OrderNotifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl OrderNotifier {
    /// Create a new notifier. With no webhook URL configured, every send is
    /// a no-op.
    #[must_use]
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }

    /// Send an order-confirmed event without blocking the caller.
    pub fn order_confirmed(&self, order: &Order) {
        let Some(url) = self.webhook_url.clone() else {
            return;
        };

        let email = order
            .guest_email
            .as_ref()
            .or(order.shipping_address.email.as_ref())
            .map(|e| e.as_str().to_owned());

        let body = serde_json::json!({
            "event": "order_confirmed",
            "order_number": order.order_number,
            "total": order.total.as_minor(),
            "email": email,
        });

        let client = self.client.clone();
        let order_number = order.order_number.clone();

        tokio::spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(order_number = %order_number, "Order notification sent");
                }
                Ok(response) => {
                    tracing::warn!(
                        order_number = %order_number,
                        status = %response.status(),
                        "Order notification rejected"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        order_number = %order_number,
                        error = %e,
                        "Order notification failed"
                    );
                }
            }
        });
    }
}
