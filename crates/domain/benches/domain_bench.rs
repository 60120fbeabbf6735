use std::sync::Arc;

use common::UserId;
use criterion::{Criterion, criterion_group, criterion_main};
use doc_store::InMemoryDocumentStore;
use domain::{
    CartService, CheckoutService, Money, NewProduct, OrderFilter, OrderService, StockLedger,
    StockPolicy, StoreProductCatalog,
};

struct Services {
    catalog: StoreProductCatalog<InMemoryDocumentStore>,
    carts: CartService<InMemoryDocumentStore>,
    orders: OrderService<InMemoryDocumentStore>,
    checkout: CheckoutService<InMemoryDocumentStore>,
}

fn services() -> Services {
    let store = InMemoryDocumentStore::new();
    let catalog = StoreProductCatalog::new(store.clone());
    let lookup = Arc::new(catalog.clone());
    let carts = CartService::new(store.clone(), lookup.clone());
    let orders = OrderService::new(store.clone(), lookup.clone());
    let ledger = StockLedger::new(store, StockPolicy::default());
    let checkout = CheckoutService::new(carts.clone(), orders.clone(), ledger, lookup);
    Services {
        catalog,
        carts,
        orders,
        checkout,
    }
}

fn new_product(stock: u32) -> NewProduct {
    NewProduct {
        name: "Benchmark Widget".to_string(),
        price: Money::from_cents(1000),
        quantity_in_stock: stock,
    }
}

fn bench_add_to_cart(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let s = services();
    let user = UserId::new();
    let product = rt.block_on(async { s.catalog.register(new_product(u32::MAX)).await.unwrap() });

    c.bench_function("domain/add_to_cart", |b| {
        b.iter(|| {
            rt.block_on(async {
                let cart = s.carts.get_or_create(user).await.unwrap();
                s.carts.add_item(&cart, &product, 1).await.unwrap();
            });
        });
    });
}

fn bench_cart_total(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let s = services();
    let user = UserId::new();
    let cart = rt.block_on(async {
        for _ in 0..10 {
            let product = s.catalog.register(new_product(100)).await.unwrap();
            s.carts.add_product(user, product.id, 2).await.unwrap();
        }
        s.carts.find_cart(user).await.unwrap().unwrap()
    });

    c.bench_function("domain/cart_total_10_lines", |b| {
        b.iter(|| rt.block_on(s.carts.total_price(&cart)));
    });
}

fn bench_checkout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/checkout", |b| {
        b.iter(|| {
            rt.block_on(async {
                let s = services();
                let user = UserId::new();
                let product = s.catalog.register(new_product(10)).await.unwrap();
                s.carts.add_product(user, product.id, 2).await.unwrap();
                s.checkout
                    .checkout(user, serde_json::Value::Null, None)
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_list_orders(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let s = services();
    let user = UserId::new();
    rt.block_on(async {
        let product = s.catalog.register(new_product(u32::MAX)).await.unwrap();
        for _ in 0..100 {
            s.carts.add_product(user, product.id, 1).await.unwrap();
            s.checkout
                .checkout(user, serde_json::Value::Null, None)
                .await
                .unwrap();
        }
    });

    c.bench_function("domain/list_orders_page", |b| {
        b.iter(|| {
            rt.block_on(async {
                s.orders
                    .find_all(OrderFilter {
                        page: Some(5),
                        limit: Some(10),
                        user: Some(user),
                        status: None,
                    })
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_add_to_cart,
    bench_cart_total,
    bench_checkout,
    bench_list_orders
);
criterion_main!(benches);
