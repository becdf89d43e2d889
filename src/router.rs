// src/router.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::handlers;
use crate::middleware::auth::auth_guard;

/// Monta o router completo da API.
pub fn app(app_state: AppState) -> Router {
    // Rotas públicas de autenticação
    let auth_routes = Router::new()
        .route("/register/wholesaler", post(handlers::auth::register_wholesaler))
        .route("/register/retailer", post(handlers::auth::register_retailer))
        .route("/login", post(handlers::auth::login));

    let gst_routes = Router::new()
        .route("/verify/{gst_number}", get(handlers::gst::verify_gst));

    let team_routes = Router::new()
        .route(
            "/salesmen",
            post(handlers::team::create_salesman).get(handlers::team::list_salesmen),
        )
        .route(
            "/salesmen/{salesman_id}/permissions",
            put(handlers::team::update_salesman_permissions),
        )
        .route(
            "/salesmen/{salesman_id}/active",
            patch(handlers::team::set_salesman_active),
        )
        .route(
            "/retailers",
            post(handlers::team::create_retailer).get(handlers::team::list_retailers),
        )
        .route(
            "/retailers/{retailer_id}/connect",
            post(handlers::team::connect_retailer),
        );

    let connection_routes = Router::new()
        .route(
            "/",
            post(handlers::connections::request_connection)
                .get(handlers::connections::list_connections),
        )
        .route(
            "/status/{counterpart_id}",
            get(handlers::connections::connection_status),
        )
        .route(
            "/{connection_id}",
            delete(handlers::connections::delete_connection),
        )
        .route(
            "/{connection_id}/approve",
            post(handlers::connections::approve_connection),
        )
        .route(
            "/{connection_id}/reject",
            post(handlers::connections::reject_connection),
        );

    let catalog_routes = Router::new()
        .route(
            "/categories",
            post(handlers::catalog::create_category).get(handlers::catalog::list_categories),
        )
        .route(
            "/brands",
            post(handlers::catalog::create_brand).get(handlers::catalog::list_brands),
        )
        .route(
            "/products",
            post(handlers::catalog::create_product).get(handlers::catalog::list_products),
        )
        .route(
            "/products/{product_id}",
            get(handlers::catalog::get_product)
                .put(handlers::catalog::update_product)
                .delete(handlers::catalog::delete_product),
        )
        .route("/products/{product_id}/stock", post(handlers::catalog::adjust_stock))
        .route("/products/{product_id}/active", patch(handlers::catalog::set_product_active))
        .route("/products/{product_id}/quote", get(handlers::catalog::quote_price));

    let cart_routes = Router::new()
        .route(
            "/",
            get(handlers::cart::get_cart).delete(handlers::cart::clear_cart),
        )
        .route("/items", post(handlers::cart::add_item))
        .route(
            "/items/{product_id}",
            put(handlers::cart::update_item).delete(handlers::cart::remove_item),
        );

    let order_routes = Router::new()
        .route(
            "/",
            post(handlers::orders::place_order).get(handlers::orders::list_orders),
        )
        .route("/{order_id}", get(handlers::orders::get_order))
        .route("/{order_id}/cancel", post(handlers::orders::cancel_order))
        .route("/{order_id}/status", patch(handlers::orders::update_status))
        .route("/{order_id}/payment", patch(handlers::orders::update_payment_status));

    // Tudo que exige um ator autenticado passa pelo auth_guard
    let protected_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .merge(team_routes)
        .merge(catalog_routes)
        .nest("/connections", connection_routes)
        .nest("/cart", cart_routes)
        .nest("/orders", order_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/gst", gst_routes)
        .nest("/api", protected_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}
