// src/services/cart_service.rs

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CartRepository, CatalogRepository},
    models::{
        auth::Actor,
        cart::{Cart, CartLine, CartLineView, CartScope, CartView},
    },
    services::{pricing, visibility::Visibility},
};

/// Escopo do carrinho sem consultar o banco. A aprovação da conexão do
/// vendedor é checada à parte, em `CartService::resolve_scope`.
pub fn scope_for(actor: &Actor, retailer_id: Option<Uuid>) -> Result<CartScope, AppError> {
    match actor {
        Actor::Retailer { id } => Ok(CartScope {
            retailer_id: *id,
            salesman_id: None,
        }),
        Actor::Salesman { id, permissions, .. } => {
            if !permissions.can_place_orders {
                return Err(AppError::Forbidden("missing permission to place orders".into()));
            }
            let retailer_id = retailer_id.ok_or_else(|| {
                AppError::Forbidden("a salesman must name the retailer it is acting for".into())
            })?;
            Ok(CartScope {
                retailer_id,
                salesman_id: Some(*id),
            })
        }
        Actor::Wholesaler { .. } => Err(AppError::Forbidden("wholesalers do not have a cart".into())),
    }
}

/// Monta a visão do carrinho. O imposto é uma estimativa com a alíquota atual.
pub fn build_view(cart: &Cart, lines: Vec<CartLine>) -> CartView {
    let totals: pricing::Totals = lines
        .iter()
        .map(|line| pricing::compute_totals(line.unit_price, line.quantity, line.tax_percentage))
        .sum();

    let items = lines
        .into_iter()
        .map(|line| CartLineView {
            line_total: line.line_total(),
            line,
        })
        .collect();

    CartView {
        cart_id: cart.id,
        retailer_id: cart.retailer_id,
        salesman_id: cart.salesman_id,
        items,
        subtotal: totals.subtotal,
        tax_amount: totals.tax,
        total_amount: totals.total,
    }
}

#[derive(Clone)]
pub struct CartService {
    repo: CartRepository,
    catalog_repo: CatalogRepository,
    visibility: Visibility,
}

impl CartService {
    pub fn new(repo: CartRepository, catalog_repo: CatalogRepository, visibility: Visibility) -> Self {
        Self {
            repo,
            catalog_repo,
            visibility,
        }
    }

    /// Resolve o carrinho do ator. Vendedor só age por varejistas conectados ao seu atacadista.
    pub async fn resolve_scope(&self, actor: &Actor, retailer_id: Option<Uuid>) -> Result<CartScope, AppError> {
        let scope = scope_for(actor, retailer_id)?;
        if let Actor::Salesman { delegate_of, .. } = actor {
            if !self.visibility.is_connected(*delegate_of, scope.retailer_id).await? {
                return Err(AppError::NotConnected);
            }
        }
        Ok(scope)
    }

    /// Preço unitário de `quantity` unidades de um produto que o ator pode colocar no carrinho.
    async fn price_for(&self, actor: &Actor, product_id: Uuid, quantity: i32) -> Result<Decimal, AppError> {
        let product = self
            .catalog_repo
            .get_product(product_id)
            .await?
            .ok_or(AppError::NotFound("Product"))?;

        match actor {
            Actor::Salesman { delegate_of, .. } => {
                if product.wholesaler_id != *delegate_of {
                    return Err(AppError::Forbidden("the product belongs to another wholesaler".into()));
                }
            }
            Actor::Retailer { .. } => {
                if !self.visibility.can_see_wholesaler(actor, product.wholesaler_id).await? {
                    return Err(AppError::NotConnected);
                }
            }
            Actor::Wholesaler { .. } => {}
        }

        pricing::quote(&product, quantity)
    }

    pub async fn add(
        &self,
        actor: &Actor,
        retailer_id: Option<Uuid>,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, AppError> {
        let scope = self.resolve_scope(actor, retailer_id).await?;
        let unit_price = self.price_for(actor, product_id, quantity).await?;

        let cart = self.repo.get_or_create(scope).await?;
        self.repo.upsert_line(cart.id, product_id, quantity, unit_price).await?;

        tracing::info!("🛒 Produto {} (x{}) no carrinho {}.", product_id, quantity, cart.id);
        self.render(&cart).await
    }

    pub async fn update(
        &self,
        actor: &Actor,
        retailer_id: Option<Uuid>,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, AppError> {
        let scope = self.resolve_scope(actor, retailer_id).await?;
        let cart = self.repo.find(scope).await?.ok_or(AppError::NotFound("Cart item"))?;
        if !self.repo.has_line(cart.id, product_id).await? {
            return Err(AppError::NotFound("Cart item"));
        }

        let unit_price = self.price_for(actor, product_id, quantity).await?;
        if !self.repo.update_line(cart.id, product_id, quantity, unit_price).await? {
            // Removido entre a checagem e o update
            return Err(AppError::NotFound("Cart item"));
        }
        self.render(&cart).await
    }

    pub async fn remove(&self, actor: &Actor, retailer_id: Option<Uuid>, product_id: Uuid) -> Result<CartView, AppError> {
        let scope = self.resolve_scope(actor, retailer_id).await?;
        let cart = self.repo.find(scope).await?.ok_or(AppError::NotFound("Cart item"))?;
        if !self.repo.remove_line(cart.id, product_id).await? {
            return Err(AppError::NotFound("Cart item"));
        }
        self.render(&cart).await
    }

    pub async fn clear(&self, actor: &Actor, retailer_id: Option<Uuid>) -> Result<(), AppError> {
        let scope = self.resolve_scope(actor, retailer_id).await?;
        if let Some(cart) = self.repo.find(scope).await? {
            let removed = self.repo.clear_all(cart.id).await?;
            tracing::info!("🧹 Carrinho {} esvaziado ({} itens).", cart.id, removed);
        }
        Ok(())
    }

    /// Não revalida MOQ nem estoque: isso acontece no fechamento do pedido.
    pub async fn view(&self, actor: &Actor, retailer_id: Option<Uuid>) -> Result<CartView, AppError> {
        let scope = self.resolve_scope(actor, retailer_id).await?;
        let cart = self.repo.get_or_create(scope).await?;
        self.render(&cart).await
    }

    async fn render(&self, cart: &Cart) -> Result<CartView, AppError> {
        let lines = self.repo.lines(cart.id).await?;
        Ok(build_view(cart, lines))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{models::auth::SalesmanPermissions, services::pricing::tests::dec};

    fn line(unit: &str, qty: i32, tax: &str) -> CartLine {
        CartLine {
            product_id: Uuid::new_v4(),
            product_name: "Item".into(),
            wholesaler_id: Uuid::new_v4(),
            quantity: qty,
            unit_price: dec(unit),
            tax_percentage: dec(tax),
            added_at: Utc::now(),
        }
    }

    fn cart() -> Cart {
        Cart {
            id: Uuid::new_v4(),
            retailer_id: Uuid::new_v4(),
            salesman_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn retailer_uses_its_own_cart() {
        let retailer = Uuid::new_v4();
        let scope = scope_for(&Actor::Retailer { id: retailer }, Some(Uuid::new_v4())).unwrap();
        assert_eq!(scope, CartScope { retailer_id: retailer, salesman_id: None });
    }

    #[test]
    fn salesman_cart_is_per_retailer() {
        let salesman = Uuid::new_v4();
        let retailer = Uuid::new_v4();
        let actor = Actor::Salesman {
            id: salesman,
            delegate_of: Uuid::new_v4(),
            permissions: SalesmanPermissions {
                can_place_orders: true,
                ..Default::default()
            },
        };
        let scope = scope_for(&actor, Some(retailer)).unwrap();
        assert_eq!(scope.salesman_id, Some(salesman));
        assert_eq!(scope.retailer_id, retailer);

        assert!(matches!(scope_for(&actor, None), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn salesman_without_order_permission_has_no_cart() {
        let actor = Actor::Salesman {
            id: Uuid::new_v4(),
            delegate_of: Uuid::new_v4(),
            permissions: SalesmanPermissions::default(),
        };
        assert!(matches!(scope_for(&actor, Some(Uuid::new_v4())), Err(AppError::Forbidden(_))));
        assert!(scope_for(&Actor::Wholesaler { id: Uuid::new_v4() }, None).is_err());
    }

    #[test]
    fn view_sums_lines_in_insertion_order() {
        let lines = vec![line("9.00", 10, "18"), line("8.00", 50, "5")];
        let first = lines[0].product_id;
        let view = build_view(&cart(), lines);

        assert_eq!(view.items[0].line.product_id, first);
        assert_eq!(view.items[0].line_total, dec("90.00"));
        assert_eq!(view.items[1].line_total, dec("400.00"));
        assert_eq!(view.subtotal, dec("490.00"));
        assert_eq!(view.tax_amount, dec("16.20") + dec("20.00"));
        assert_eq!(view.total_amount, view.subtotal + view.tax_amount);
    }

    #[test]
    fn empty_cart_view_is_zero() {
        let view = build_view(&cart(), Vec::new());
        assert!(view.items.is_empty());
        assert_eq!(view.total_amount, Decimal::ZERO);
    }
}
