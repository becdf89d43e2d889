// tests/marketplace_flow.rs
//
// Fluxos completos contra um Postgres real. Rode com:
//   DATABASE_URL=postgres://... cargo test -- --ignored

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use wholesale_backend::{
    common::error::AppError,
    config::{AppConfig, AppState},
    models::{
        auth::{
            Actor, CreateSalesmanPayload, RegisterRetailerPayload, RegisterWholesalerPayload,
            SalesmanPermissions,
        },
        catalog::{PricingTier, ProductFilter, UnitType},
        connection::ConnectionStatus,
        orders::{OrderStatus, PaymentTerms},
    },
    services::{catalog_service::ProductInput, order_service::PlaceOrderInput},
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn state(pool: PgPool) -> AppState {
    let config = AppConfig {
        database_url: String::new(),
        jwt_secret: "segredo-de-teste".into(),
        bind_addr: "127.0.0.1:0".into(),
        database_max_connections: 5,
        jwt_ttl_days: 1,
        gst_api_url: None,
        gst_api_key: None,
        gst_timeout: Duration::from_secs(1),
    };
    AppState::build(pool, config).unwrap()
}

async fn wholesaler(app: &AppState, email: &str) -> Actor {
    let response = app
        .auth_service
        .register_wholesaler(&RegisterWholesalerPayload {
            email: email.into(),
            password: "senha123".into(),
            business_name: "Atacado Central".into(),
            owner_name: "Dona Maria".into(),
            phone: "9999999999".into(),
            gst_number: None,
            address: None,
            city: None,
            state: None,
            pincode: None,
        })
        .await
        .unwrap();
    app.auth_service.resolve_actor(&response.token).await.unwrap()
}

async fn retailer(app: &AppState, email: &str) -> Actor {
    let response = app
        .auth_service
        .register_retailer(&RegisterRetailerPayload {
            email: email.into(),
            password: "senha123".into(),
            shop_name: "Mercadinho".into(),
            owner_name: "Seu João".into(),
            phone: "8888888888".into(),
            gst_number: None,
            address: None,
            city: None,
            state: None,
            pincode: None,
        })
        .await
        .unwrap();
    app.auth_service.resolve_actor(&response.token).await.unwrap()
}

async fn connect(app: &AppState, wholesaler: &Actor, retailer: &Actor) -> Uuid {
    let connection = app
        .connection_service
        .request_connection(retailer, wholesaler.id(), None)
        .await
        .unwrap();
    app.connection_service.approve(wholesaler, connection.id).await.unwrap();
    connection.id
}

/// Produto com MOQ 10, preço base 10.00, faixa 10..=49 a 9.00 e 18% de imposto.
async fn product(app: &AppState, wholesaler: &Actor, stock: i32) -> Uuid {
    let category = app
        .catalog_service
        .create_category(wholesaler, &format!("Bebidas {}", Uuid::new_v4()), None)
        .await
        .unwrap();

    let input = ProductInput {
        category_id: category.id,
        brand_id: None,
        name: "Refrigerante 2L".into(),
        description: None,
        unit_type: UnitType::Piece,
        min_order_quantity: 10,
        base_price: dec("10.00"),
        tax_percentage: dec("18"),
        pricing_tiers: vec![PricingTier {
            min_quantity: 10,
            max_quantity: Some(49),
            price_per_unit: dec("9.00"),
        }],
    };
    app.catalog_service
        .create_product(wholesaler, &input, stock)
        .await
        .unwrap()
        .id
}

async fn stock_of(app: &AppState, wholesaler: &Actor, product_id: Uuid) -> i32 {
    app.catalog_service
        .get_product(wholesaler, product_id)
        .await
        .unwrap()
        .stock_quantity
}

fn checkout() -> PlaceOrderInput {
    PlaceOrderInput {
        retailer_id: None,
        delivery_address: "Rua das Flores, 100".into(),
        notes: None,
        payment_terms: PaymentTerms::Immediate,
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn placing_an_order_decrements_stock_and_freezes_totals(pool: PgPool) {
    let app = state(pool);
    let w = wholesaler(&app, "w@test.com").await;
    let r = retailer(&app, "r@test.com").await;
    connect(&app, &w, &r).await;
    let product_id = product(&app, &w, 100).await;

    app.cart_service.add(&r, None, product_id, 10).await.unwrap();
    let orders = app.order_service.place_order(&r, &checkout()).await.unwrap();

    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.header.status, OrderStatus::Pending);
    assert_eq!(order.header.subtotal, dec("90.00"));
    assert_eq!(order.header.tax_amount, dec("16.20"));
    assert_eq!(order.header.total_amount, dec("106.20"));
    assert!(order.header.order_number.starts_with("ORD"));
    assert_eq!(order.header.order_number.len(), 13);
    assert_eq!(order.items[0].unit_price, dec("9.00"));

    assert_eq!(stock_of(&app, &w, product_id).await, 90);

    // O carrinho é esvaziado depois do fechamento
    let cart = app.cart_service.view(&r, None).await.unwrap();
    assert!(cart.items.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn cancelling_a_pending_order_restores_stock(pool: PgPool) {
    let app = state(pool);
    let w = wholesaler(&app, "w@test.com").await;
    let r = retailer(&app, "r@test.com").await;
    connect(&app, &w, &r).await;
    let product_id = product(&app, &w, 100).await;

    app.cart_service.add(&r, None, product_id, 25).await.unwrap();
    let orders = app.order_service.place_order(&r, &checkout()).await.unwrap();
    assert_eq!(stock_of(&app, &w, product_id).await, 75);

    let cancelled = app
        .order_service
        .cancel_order(&r, orders[0].header.id)
        .await
        .unwrap();

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&app, &w, product_id).await, 100);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn cancelling_a_confirmed_order_fails_without_touching_stock(pool: PgPool) {
    let app = state(pool);
    let w = wholesaler(&app, "w@test.com").await;
    let r = retailer(&app, "r@test.com").await;
    connect(&app, &w, &r).await;
    let product_id = product(&app, &w, 100).await;

    app.cart_service.add(&r, None, product_id, 10).await.unwrap();
    let orders = app.order_service.place_order(&r, &checkout()).await.unwrap();
    let order_id = orders[0].header.id;

    app.order_service
        .update_status(&w, order_id, OrderStatus::Confirmed)
        .await
        .unwrap();

    let result = app.order_service.cancel_order(&r, order_id).await;
    assert!(matches!(result, Err(AppError::InvalidStateTransition(_))));
    assert_eq!(stock_of(&app, &w, product_id).await, 90);

    // Voltar na esteira também é proibido
    let back = app
        .order_service
        .update_status(&w, order_id, OrderStatus::Pending)
        .await;
    assert!(matches!(back, Err(AppError::InvalidStateTransition(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn checkout_below_stock_is_rejected(pool: PgPool) {
    let app = state(pool);
    let w = wholesaler(&app, "w@test.com").await;
    let r = retailer(&app, "r@test.com").await;
    connect(&app, &w, &r).await;
    let product_id = product(&app, &w, 100).await;

    app.cart_service.add(&r, None, product_id, 40).await.unwrap();
    // O estoque cai depois que o item já está no carrinho
    app.catalog_service.adjust_stock(&w, product_id, -80).await.unwrap();

    let result = app.order_service.place_order(&r, &checkout()).await;
    assert!(matches!(
        result,
        Err(AppError::InsufficientStock { available: 20, requested: 40 })
    ));
    assert_eq!(stock_of(&app, &w, product_id).await, 20);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_checkouts_never_oversell(pool: PgPool) {
    let app = state(pool);
    let w = wholesaler(&app, "w@test.com").await;
    let r1 = retailer(&app, "r1@test.com").await;
    let r2 = retailer(&app, "r2@test.com").await;
    connect(&app, &w, &r1).await;
    connect(&app, &w, &r2).await;
    let product_id = product(&app, &w, 100).await;

    app.cart_service.add(&r1, None, product_id, 60).await.unwrap();
    app.cart_service.add(&r2, None, product_id, 60).await.unwrap();

    let input = checkout();
    let (first, second) = tokio::join!(
        app.order_service.place_order(&r1, &input),
        app.order_service.place_order(&r2, &input),
    );

    let succeeded = [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(succeeded, 1);
    let failure = if first.is_err() { first } else { second };
    assert!(matches!(failure, Err(AppError::InsufficientStock { .. })));
    assert_eq!(stock_of(&app, &w, product_id).await, 40);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn empty_cart_cannot_be_placed(pool: PgPool) {
    let app = state(pool);
    let r = retailer(&app, "r@test.com").await;

    let result = app.order_service.place_order(&r, &checkout()).await;
    assert!(matches!(result, Err(AppError::EmptyCart)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn salesman_places_orders_for_a_connected_retailer(pool: PgPool) {
    let app = state(pool);
    let w = wholesaler(&app, "w@test.com").await;
    let product_id = product(&app, &w, 100).await;

    let salesman = app
        .account_service
        .create_salesman(
            &w,
            &CreateSalesmanPayload {
                name: "Carlos".into(),
                email: "s@test.com".into(),
                phone: "7777777777".into(),
                password: "senha123".into(),
                permissions: SalesmanPermissions {
                    can_add_retailers: true,
                    can_place_orders: true,
                    ..Default::default()
                },
            },
        )
        .await
        .unwrap();
    let s = Actor::Salesman {
        id: salesman.id,
        delegate_of: w.id(),
        permissions: salesman.permissions,
    };

    let shop = app
        .account_service
        .create_retailer_for_wholesaler(
            &s,
            &RegisterRetailerPayload {
                email: "loja@test.com".into(),
                password: "senha123".into(),
                shop_name: "Loja do Bairro".into(),
                owner_name: "Ana".into(),
                phone: "6666666666".into(),
                gst_number: None,
                address: None,
                city: None,
                state: None,
                pincode: None,
            },
        )
        .await
        .unwrap();

    app.cart_service
        .add(&s, Some(shop.id), product_id, 50)
        .await
        .unwrap();

    let input = PlaceOrderInput {
        retailer_id: Some(shop.id),
        ..checkout()
    };
    let orders = app.order_service.place_order(&s, &input).await.unwrap();

    assert_eq!(orders[0].header.retailer_id, shop.id);
    assert_eq!(orders[0].header.salesman_id, Some(salesman.id));
    // 50 unidades caem fora da faixa 10..=49: preço base
    assert_eq!(orders[0].items[0].unit_price, dec("10.00"));
    assert_eq!(stock_of(&app, &w, product_id).await, 50);

    // Cancelamento é exclusivo do varejista
    let result = app.order_service.cancel_order(&s, orders[0].header.id).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn connection_requests_conflict_unless_rejected(pool: PgPool) {
    let app = state(pool);
    let w = wholesaler(&app, "w@test.com").await;
    let r = retailer(&app, "r@test.com").await;

    let pending = app
        .connection_service
        .request_connection(&r, w.id(), Some("Olá"))
        .await
        .unwrap();
    assert_eq!(pending.status, ConnectionStatus::Pending);

    let duplicate = app.connection_service.request_connection(&r, w.id(), None).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let rejected = app.connection_service.reject(&w, pending.id).await.unwrap();
    assert_eq!(rejected.status, ConnectionStatus::Rejected);

    // Um pedido rejeitado pode ser refeito e volta a pendente
    let reopened = app
        .connection_service
        .request_connection(&r, w.id(), None)
        .await
        .unwrap();
    assert_eq!(reopened.id, pending.id);
    assert_eq!(reopened.status, ConnectionStatus::Pending);

    app.connection_service.approve(&w, reopened.id).await.unwrap();
    let approved_again = app.connection_service.request_connection(&r, w.id(), None).await;
    assert!(matches!(approved_again, Err(AppError::Conflict(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn catalog_is_empty_without_connections(pool: PgPool) {
    let app = state(pool);
    let w = wholesaler(&app, "w@test.com").await;
    let r = retailer(&app, "r@test.com").await;
    let product_id = product(&app, &w, 100).await;

    let visible = app
        .catalog_service
        .list_products(&r, &ProductFilter::default())
        .await
        .unwrap();
    assert!(visible.is_empty());

    let direct = app.catalog_service.get_product(&r, product_id).await;
    assert!(matches!(direct, Err(AppError::NotFound(_))));

    let add = app.cart_service.add(&r, None, product_id, 10).await;
    assert!(matches!(add, Err(AppError::NotConnected)));

    connect(&app, &w, &r).await;
    let visible = app
        .catalog_service
        .list_products(&r, &ProductFilter::default())
        .await
        .unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].pricing_tiers.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn cart_spanning_two_wholesalers_becomes_two_orders(pool: PgPool) {
    let app = state(pool);
    let w1 = wholesaler(&app, "w1@test.com").await;
    let w2 = wholesaler(&app, "w2@test.com").await;
    let r = retailer(&app, "r@test.com").await;
    connect(&app, &w1, &r).await;
    connect(&app, &w2, &r).await;
    let p1 = product(&app, &w1, 100).await;
    let p2 = product(&app, &w2, 100).await;

    app.cart_service.add(&r, None, p1, 10).await.unwrap();
    let before = app.cart_service.add(&r, None, p2, 60).await.unwrap();

    let orders = app.order_service.place_order(&r, &checkout()).await.unwrap();

    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].header.wholesaler_id, w1.id());
    assert_eq!(orders[1].header.wholesaler_id, w2.id());
    assert_ne!(orders[0].header.order_number, orders[1].header.order_number);

    let placed_total: Decimal = orders.iter().map(|o| o.header.total_amount).sum();
    assert_eq!(placed_total, before.total_amount);
    // 10 × 9.00 + 18% e 60 × 10.00 + 18%
    assert_eq!(placed_total, dec("814.20"));

    assert_eq!(stock_of(&app, &w1, p1).await, 90);
    assert_eq!(stock_of(&app, &w2, p2).await, 40);
    assert!(app.cart_service.view(&r, None).await.unwrap().items.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn failed_second_wholesaler_keeps_the_first_order(pool: PgPool) {
    let app = state(pool);
    let w1 = wholesaler(&app, "w1@test.com").await;
    let w2 = wholesaler(&app, "w2@test.com").await;
    let r = retailer(&app, "r@test.com").await;
    connect(&app, &w1, &r).await;
    connect(&app, &w2, &r).await;
    let p1 = product(&app, &w1, 100).await;
    let p2 = product(&app, &w2, 100).await;

    app.cart_service.add(&r, None, p1, 10).await.unwrap();
    app.cart_service.add(&r, None, p2, 20).await.unwrap();
    // O segundo atacadista perde estoque depois do item entrar no carrinho
    app.catalog_service.adjust_stock(&w2, p2, -95).await.unwrap();

    let result = app.order_service.place_order(&r, &checkout()).await;
    assert!(matches!(
        result,
        Err(AppError::InsufficientStock { available: 5, requested: 20 })
    ));

    // O pedido do primeiro atacadista fica gravado
    let orders = app.order_service.list_orders(&r, None).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].wholesaler_id, w1.id());
    assert_eq!(stock_of(&app, &w1, p1).await, 90);
    assert_eq!(stock_of(&app, &w2, p2).await, 5);

    // Só as linhas do atacadista que falhou continuam no carrinho
    let cart = app.cart_service.view(&r, None).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].line.product_id, p2);
    assert_eq!(cart.items[0].line.quantity, 20);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn connection_rejected_after_adding_blocks_checkout(pool: PgPool) {
    let app = state(pool);
    let w = wholesaler(&app, "w@test.com").await;
    let r = retailer(&app, "r@test.com").await;
    let connection_id = connect(&app, &w, &r).await;
    let product_id = product(&app, &w, 100).await;

    app.cart_service.add(&r, None, product_id, 10).await.unwrap();
    app.connection_service.reject(&w, connection_id).await.unwrap();

    let result = app.order_service.place_order(&r, &checkout()).await;
    assert!(matches!(result, Err(AppError::NotConnected)));

    assert_eq!(stock_of(&app, &w, product_id).await, 100);
    assert!(app.order_service.list_orders(&r, None).await.unwrap().is_empty());
    assert_eq!(app.cart_service.view(&r, None).await.unwrap().items.len(), 1);
}
