//! Email templates for order events.

use domain::OrderEvent;

use crate::email::Email;

const CONFIRMATION_SUBJECT: &str = "We have received your order";
const RETURN_SUBJECT: &str = "Your return request has been accepted";

/// Renders the email for an order event.
///
/// Returns None when the order has no contact address.
pub fn render(event: &OrderEvent) -> Option<Email> {
    match event {
        OrderEvent::OrderPlaced(data) => Some(Email {
            to: data.contact_email.clone()?,
            subject: CONFIRMATION_SUBJECT.to_string(),
            html: confirmation_html(&data.order_id.to_string(), &data.total.to_string()),
        }),
        OrderEvent::OrderReturned(data) => Some(Email {
            to: data.contact_email.clone()?,
            subject: RETURN_SUBJECT.to_string(),
            html: return_html(&data.order_id.to_string()),
        }),
    }
}

fn confirmation_html(order_id: &str, total: &str) -> String {
    format!(
        r#"<div style="color: #333; text-align: center;">
  <h1 style="color: #1E1E1E;">Thanks for your purchase</h1>
  <p>We'll prepare your order for immediate dispatch and you will receive it shortly. We'll email you the shipping confirmation once your order is on its way.</p>
  <p>Order {order_id} &middot; Total {total}</p>
  <p style="font-size: 14px; color: #302B2E;">Black Tigers Team</p>
</div>"#
    )
}

fn return_html(order_id: &str) -> String {
    format!(
        r#"<div style="color: #333; text-align: center;">
  <h1 style="color: #1E1E1E;">Your return is on its way</h1>
  <p>We have accepted the return of order {order_id}. Your refund will be issued once we receive the items.</p>
  <p style="font-size: 14px; color: #302B2E;">Black Tigers Team</p>
</div>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{OrderId, UserId};
    use domain::{Money, OrderPlacedData, OrderReturnedData};

    fn placed(email: Option<&str>) -> OrderEvent {
        OrderEvent::OrderPlaced(OrderPlacedData {
            order_id: OrderId::new(),
            user_id: UserId::new(),
            contact_email: email.map(str::to_string),
            lines: Vec::new(),
            total: Money::from_cents(2500),
            placed_at: Utc::now(),
        })
    }

    #[test]
    fn renders_confirmation() {
        let email = render(&placed(Some("buyer@example.com"))).unwrap();

        assert_eq!(email.to, "buyer@example.com");
        assert_eq!(email.subject, CONFIRMATION_SUBJECT);
        assert!(email.html.contains("Thanks for your purchase"));
        assert!(email.html.contains("$25.00"));
    }

    #[test]
    fn renders_return_notice() {
        let event = OrderEvent::OrderReturned(OrderReturnedData {
            order_id: OrderId::new(),
            user_id: UserId::new(),
            contact_email: Some("buyer@example.com".to_string()),
            returned_at: Utc::now(),
        });

        let email = render(&event).unwrap();
        assert_eq!(email.subject, RETURN_SUBJECT);
    }

    #[test]
    fn skips_orders_without_address() {
        assert!(render(&placed(None)).is_none());
    }
}
