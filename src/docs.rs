// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register_wholesaler,
        handlers::auth::register_retailer,
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,

        // --- Team ---
        handlers::team::create_salesman,
        handlers::team::list_salesmen,
        handlers::team::update_salesman_permissions,
        handlers::team::set_salesman_active,
        handlers::team::create_retailer,
        handlers::team::list_retailers,
        handlers::team::connect_retailer,

        // --- Connections ---
        handlers::connections::request_connection,
        handlers::connections::list_connections,
        handlers::connections::connection_status,
        handlers::connections::approve_connection,
        handlers::connections::reject_connection,
        handlers::connections::delete_connection,

        // --- Catalog ---
        handlers::catalog::create_category,
        handlers::catalog::list_categories,
        handlers::catalog::create_brand,
        handlers::catalog::list_brands,
        handlers::catalog::create_product,
        handlers::catalog::list_products,
        handlers::catalog::get_product,
        handlers::catalog::update_product,
        handlers::catalog::adjust_stock,
        handlers::catalog::set_product_active,
        handlers::catalog::delete_product,
        handlers::catalog::quote_price,

        // --- Cart ---
        handlers::cart::get_cart,
        handlers::cart::add_item,
        handlers::cart::update_item,
        handlers::cart::remove_item,
        handlers::cart::clear_cart,

        // --- Orders ---
        handlers::orders::place_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::cancel_order,
        handlers::orders::update_status,
        handlers::orders::update_payment_status,

        // --- GST ---
        handlers::gst::verify_gst,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,
            models::auth::Wholesaler,
            models::auth::Retailer,
            models::auth::Salesman,
            models::auth::SalesmanPermissions,
            models::auth::RegisterWholesalerPayload,
            models::auth::RegisterRetailerPayload,
            models::auth::LoginPayload,
            models::auth::CreateSalesmanPayload,
            models::auth::AuthResponse,
            models::auth::Profile,
            handlers::team::SetActivePayload,

            // --- Connections ---
            models::connection::ConnectionStatus,
            models::connection::RequestedBy,
            models::connection::Connection,
            models::connection::ConnectedRetailer,
            models::connection::ConnectionStatusResponse,
            handlers::connections::RequestConnectionPayload,

            // --- Catalog ---
            models::catalog::UnitType,
            models::catalog::Category,
            models::catalog::Brand,
            models::catalog::BrandSummary,
            models::catalog::PricingTier,
            models::catalog::Product,
            models::catalog::PriceQuote,
            handlers::catalog::CategoryPayload,
            handlers::catalog::BrandPayload,
            handlers::catalog::ProductPayload,
            handlers::catalog::CreateProductPayload,
            handlers::catalog::StockAdjustmentPayload,
            handlers::catalog::ProductActivePayload,
            handlers::catalog::StockResponse,

            // --- Cart ---
            models::cart::CartLine,
            models::cart::CartLineView,
            models::cart::CartView,
            handlers::cart::AddCartItemPayload,
            handlers::cart::UpdateCartItemPayload,

            // --- Orders ---
            models::orders::OrderStatus,
            models::orders::PaymentStatus,
            models::orders::PaymentTerms,
            models::orders::Order,
            models::orders::OrderItem,
            models::orders::OrderDetail,
            handlers::orders::PlaceOrderPayload,
            handlers::orders::UpdateStatusPayload,
            handlers::orders::UpdatePaymentPayload,

            // --- GST ---
            services::gst::GstVerification,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Usuário e Perfil"),
        (name = "Team", description = "Vendedores e Varejistas do Atacadista"),
        (name = "Connections", description = "Conexões entre Atacadistas e Varejistas"),
        (name = "Catalog", description = "Categorias, Marcas e Produtos"),
        (name = "Cart", description = "Carrinho de Compras"),
        (name = "Orders", description = "Fechamento e Ciclo de Vida dos Pedidos"),
        (name = "GST", description = "Verificação de GSTIN")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_the_order_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/orders"));
        assert!(doc.paths.paths.contains_key("/api/orders/{order_id}/cancel"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
    }
}
