//! Order service: creation, queries, status changes and returns.

use std::sync::Arc;

use common::{OrderId, UserId};
use doc_store::{DocumentStore, DocumentStoreExt, Filter, FindQuery, StoreError, Update};
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    EventPublisher, NewOrder, NoopEventPublisher, Order, OrderError, OrderEvent, OrderLine,
    OrderPolicy, OrderRequest, OrderStatus, StatusChange, TransitionTable,
};
use crate::collections::ORDERS;
use crate::{Clock, DomainError, ProductCatalog, Result, SystemClock};

/// Filters and pagination for listing orders.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    /// 1-based page number.
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub user: Option<UserId>,
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    pub const DEFAULT_LIMIT: usize = 10;
    pub const MAX_LIMIT: usize = 100;

    pub fn current_page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> usize {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    fn to_filter(&self) -> Filter {
        Filter::new()
            .eq_opt("user_id", self.user.map(|u| u.to_string()))
            .eq_opt("status", self.status.map(|s| s.as_str()))
    }
}

/// One page of orders.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: u64,
    pub total_pages: u64,
    pub current_page: usize,
}

/// Service for managing orders.
#[derive(Clone)]
pub struct OrderService<S: DocumentStore> {
    store: S,
    catalog: Arc<dyn ProductCatalog>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    policy: OrderPolicy,
    transitions: TransitionTable,
}

impl<S: DocumentStore> OrderService<S> {
    /// Creates a service with the permissive transition table, the default
    /// return window and no event sink.
    pub fn new(store: S, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self {
            store,
            catalog,
            publisher: Arc::new(NoopEventPublisher),
            clock: Arc::new(SystemClock),
            policy: OrderPolicy::default(),
            transitions: TransitionTable::permissive(),
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: OrderPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_transitions(mut self, transitions: TransitionTable) -> Self {
        self.transitions = transitions;
        self
    }

    pub fn policy(&self) -> &OrderPolicy {
        &self.policy
    }

    pub fn transitions(&self) -> &TransitionTable {
        &self.transitions
    }

    /// Persists a new order and publishes `OrderPlaced`.
    ///
    /// No stock check happens here. A failing event sink is logged and
    /// does not fail the creation.
    #[tracing::instrument(skip(self, new), fields(user_id = %new.user_id))]
    pub async fn create(&self, new: NewOrder) -> Result<Order> {
        let order = Order::place(new, self.clock.now())?;
        self.store
            .insert_value(ORDERS, order.id().into(), &order)
            .await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = %order.id(),
            status = %order.status(),
            total = %order.total_amount(),
            "order created"
        );

        self.publish(OrderEvent::placed(&order)).await;
        Ok(order)
    }

    /// Resolves product names and prices, then creates the order.
    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn create_from_request(&self, request: OrderRequest) -> Result<Order> {
        let lookups = request.lines.iter().map(|requested| async move {
            let product = self
                .catalog
                .product(requested.product_id)
                .await?
                .ok_or(DomainError::ProductNotFound(requested.product_id))?;
            Ok::<_, DomainError>(OrderLine {
                product_id: product.id,
                product_name: product.name,
                quantity: requested.quantity,
                unit_price: product.price,
            })
        });
        let lines = try_join_all(lookups).await?;

        self.create(NewOrder {
            user_id: request.user_id,
            order_date: request.order_date,
            lines,
            shipping_info: request.shipping_info,
            status: request.status,
            contact_email: request.contact_email,
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_id(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get_value(ORDERS, order_id.into())
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))
    }

    /// Lists orders in creation order, one page at a time.
    #[tracing::instrument(skip(self))]
    pub async fn find_all(&self, filter: OrderFilter) -> Result<OrderPage> {
        let page = filter.current_page();
        let limit = filter.page_size();
        let store_filter = filter.to_filter();

        let total = self.store.count(ORDERS, &store_filter).await?;
        let docs = self
            .store
            .find(ORDERS, FindQuery::filtered(store_filter).page(page, limit))
            .await?;
        let orders = docs
            .into_iter()
            .map(|doc| doc.into_decoded())
            .collect::<std::result::Result<Vec<Order>, _>>()?;

        Ok(OrderPage {
            orders,
            total,
            total_pages: total.div_ceil(limit as u64),
            current_page: page,
        })
    }

    /// Every order of a user, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn history(&self, user_id: UserId) -> Result<Vec<Order>> {
        let filter = Filter::new().eq("user_id", user_id.to_string());
        let docs = self.store.find(ORDERS, FindQuery::filtered(filter)).await?;
        Ok(docs
            .into_iter()
            .map(|doc| doc.into_decoded())
            .collect::<std::result::Result<Vec<Order>, _>>()?)
    }

    /// Deletes an order unconditionally.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, order_id: OrderId) -> Result<Order> {
        let doc = self
            .store
            .delete(ORDERS, order_id.into())
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))?;
        tracing::info!(%order_id, "order removed");
        Ok(doc.into_decoded()?)
    }

    /// Moves an order to `status` if the transition table allows it.
    #[tracing::instrument(skip(self))]
    pub async fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order> {
        let order = self.find_by_id(order_id).await?;
        self.transitions.check(order.status(), status)?;
        self.apply_status(&order, status).await
    }

    /// Accepts a return for a delivered order still inside the return window.
    #[tracing::instrument(skip(self))]
    pub async fn request_return(&self, order_id: OrderId) -> Result<Order> {
        let order = self.find_by_id(order_id).await?;
        let now = self.clock.now();

        order.check_return(now, &self.policy)?;
        self.transitions
            .check(order.status(), OrderStatus::Returned)?;

        let returned = self.apply_status(&order, OrderStatus::Returned).await?;
        metrics::counter!("orders_returned_total").increment(1);
        self.publish(OrderEvent::returned(&returned, now)).await;
        Ok(returned)
    }

    /// Writes a status change, guarded on the status it was read with.
    async fn apply_status(&self, order: &Order, to: OrderStatus) -> Result<Order> {
        let from = order.status();
        let change = StatusChange {
            from,
            to,
            at: self.clock.now(),
        };
        let update = Update::Many(vec![
            Update::Expect {
                field: "status".to_string(),
                value: Value::String(from.as_str().to_string()),
            },
            Update::set("status", to.as_str()),
            Update::Push {
                array: "status_history".to_string(),
                value: serde_json::to_value(&change)?,
            },
        ]);

        let doc = match self.store.update(ORDERS, order.id().into(), update).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return Err(DomainError::OrderNotFound(order.id())),
            Err(StoreError::ConditionFailed { .. }) => {
                return Err(OrderError::ConcurrentStatusChange {
                    order_id: order.id(),
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };

        metrics::counter!(
            "order_status_changes_total",
            "from" => from.as_str(),
            "to" => to.as_str()
        )
        .increment(1);
        tracing::info!(order_id = %order.id(), %from, %to, "order status changed");
        Ok(doc.into_decoded()?)
    }

    async fn publish(&self, event: OrderEvent) {
        let event_type = event.event_type();
        let order_id = event.order_id();
        if let Err(e) = self.publisher.publish(event).await {
            tracing::warn!(%order_id, event_type, error = %e, "failed to publish order event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        FixedClock, InMemoryEventPublisher, Money, NewProduct, RequestedLine, StoreProductCatalog,
    };
    use chrono::{Duration, Utc};
    use doc_store::InMemoryDocumentStore;

    fn service() -> OrderService<InMemoryDocumentStore> {
        let store = InMemoryDocumentStore::new();
        let catalog = StoreProductCatalog::new(store.clone());
        OrderService::new(store, Arc::new(catalog))
    }

    fn new_order(user_id: UserId, status: OrderStatus) -> NewOrder {
        NewOrder {
            user_id,
            order_date: None,
            lines: vec![OrderLine {
                product_id: common::ProductId::new(),
                product_name: "Widget".to_string(),
                quantity: 1,
                unit_price: Money::from_cents(1000),
            }],
            shipping_info: serde_json::json!({"address": "1 Main St"}),
            status: Some(status),
            contact_email: Some("buyer@example.com".to_string()),
        }
    }

    #[tokio::test]
    async fn create_publishes_order_placed() {
        let publisher = InMemoryEventPublisher::new();
        let service = service().with_publisher(Arc::new(publisher.clone()));

        let order = service
            .create(new_order(UserId::new(), OrderStatus::Pending))
            .await
            .unwrap();

        let events = publisher.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "OrderPlaced");
        assert_eq!(events[0].order_id(), order.id());
    }

    #[tokio::test]
    async fn create_survives_failing_publisher() {
        let publisher = InMemoryEventPublisher::new();
        publisher.set_fail_on_publish(true);
        let service = service().with_publisher(Arc::new(publisher.clone()));

        let order = service
            .create(new_order(UserId::new(), OrderStatus::Pending))
            .await
            .unwrap();

        assert_eq!(service.find_by_id(order.id()).await.unwrap(), order);
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn create_from_request_snapshots_products() {
        let store = InMemoryDocumentStore::new();
        let catalog = StoreProductCatalog::new(store.clone());
        let product = catalog
            .register(NewProduct {
                name: "Lamp".to_string(),
                price: Money::from_cents(4500),
                quantity_in_stock: 3,
            })
            .await
            .unwrap();
        let service = OrderService::new(store, Arc::new(catalog));

        let order = service
            .create_from_request(OrderRequest {
                user_id: UserId::new(),
                order_date: None,
                lines: vec![RequestedLine {
                    product_id: product.id,
                    quantity: 2,
                }],
                shipping_info: Value::Null,
                status: None,
                contact_email: None,
            })
            .await
            .unwrap();

        assert_eq!(order.lines()[0].product_name, "Lamp");
        assert_eq!(order.total_amount(), Money::from_cents(9000));
    }

    #[tokio::test]
    async fn set_status_records_history() {
        let service = service();
        let order = service
            .create(new_order(UserId::new(), OrderStatus::Pending))
            .await
            .unwrap();

        let order = service
            .set_status(order.id(), OrderStatus::Shipped)
            .await
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Shipped);
        assert_eq!(order.status_history().len(), 1);
        assert_eq!(order.status_history()[0].from, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn denied_transition_leaves_status() {
        let service = service().with_transitions(
            TransitionTable::permissive().deny(OrderStatus::Returned, OrderStatus::Pending),
        );
        let order = service
            .create(new_order(UserId::new(), OrderStatus::Returned))
            .await
            .unwrap();

        let result = service.set_status(order.id(), OrderStatus::Pending).await;

        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::TransitionDenied { .. }))
        ));
        let stored = service.find_by_id(order.id()).await.unwrap();
        assert_eq!(stored.status(), OrderStatus::Returned);
    }

    #[tokio::test]
    async fn request_return_uses_injected_clock() {
        let publisher = InMemoryEventPublisher::new();
        let service = service().with_publisher(Arc::new(publisher.clone()));
        let order = service
            .create(new_order(UserId::new(), OrderStatus::Delivered))
            .await
            .unwrap();

        let late = service
            .clone()
            .with_clock(Arc::new(FixedClock(Utc::now() + Duration::days(8))));
        assert!(matches!(
            late.request_return(order.id()).await,
            Err(DomainError::Order(OrderError::ReturnWindowExpired { .. }))
        ));

        let returned = service.request_return(order.id()).await.unwrap();
        assert_eq!(returned.status(), OrderStatus::Returned);
        assert_eq!(
            publisher.events().last().unwrap().event_type(),
            "OrderReturned"
        );
    }

    #[tokio::test]
    async fn filter_by_status_and_user() {
        let service = service();
        let alice = UserId::new();
        service
            .create(new_order(alice, OrderStatus::Pending))
            .await
            .unwrap();
        service
            .create(new_order(alice, OrderStatus::Shipped))
            .await
            .unwrap();
        service
            .create(new_order(UserId::new(), OrderStatus::Shipped))
            .await
            .unwrap();

        let page = service
            .find_all(OrderFilter {
                status: Some(OrderStatus::Shipped),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 2);

        let page = service
            .find_all(OrderFilter {
                user: Some(alice),
                status: Some(OrderStatus::Shipped),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.orders.len(), 1);

        assert_eq!(service.history(alice).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn page_far_past_the_end_is_empty() {
        let service = service();
        service
            .create(new_order(UserId::new(), OrderStatus::Pending))
            .await
            .unwrap();

        let page = service
            .find_all(OrderFilter {
                page: Some(usize::MAX / 2),
                limit: Some(10),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(page.orders.is_empty());
        assert_eq!(page.total, 1);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn filter_clamps_limit() {
        let filter = OrderFilter {
            page: Some(0),
            limit: Some(1000),
            ..Default::default()
        };
        assert_eq!(filter.current_page(), 1);
        assert_eq!(filter.page_size(), OrderFilter::MAX_LIMIT);
        assert_eq!(OrderFilter::default().page_size(), 10);
    }
}
