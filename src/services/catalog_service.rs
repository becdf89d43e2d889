// src/services/catalog_service.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{catalog_repo::ProductFields, CatalogRepository},
    models::{
        auth::{Actor, SalesmanPermissions},
        catalog::{Brand, Category, PriceQuote, PricingTier, Product, ProductFilter, UnitType},
    },
    services::{pricing, visibility::Visibility},
};

/// Dados de entrada do produto já validados pelo handler.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub category_id: Uuid,
    pub brand_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub unit_type: UnitType,
    pub min_order_quantity: i32,
    pub base_price: Decimal,
    pub tax_percentage: Decimal,
    pub pricing_tiers: Vec<PricingTier>,
}

impl ProductInput {
    fn fields(&self) -> ProductFields<'_> {
        ProductFields {
            category_id: self.category_id,
            brand_id: self.brand_id,
            name: &self.name,
            description: self.description.as_deref(),
            unit_type: self.unit_type,
            min_order_quantity: self.min_order_quantity,
            base_price: self.base_price,
            tax_percentage: self.tax_percentage,
        }
    }
}

/// Atacadista efetivo, se o ator tiver a capacidade pedida.
fn require_capability(
    actor: &Actor,
    capability: impl Fn(&SalesmanPermissions) -> bool,
    what: &str,
) -> Result<Uuid, AppError> {
    match actor.effective_wholesaler_id() {
        Some(wholesaler_id) if actor.can(capability) => Ok(wholesaler_id),
        _ => Err(AppError::Forbidden(format!("missing permission to {what}"))),
    }
}

/// Erro de um ajuste que o saldo não comporta: retirada acima do disponível,
/// ou entrada que estouraria o limite da coluna.
fn rejected_adjustment(available: i32, delta: i32) -> AppError {
    if delta < 0 {
        AppError::InsufficientStock {
            available,
            requested: delta.saturating_neg(),
        }
    } else {
        AppError::Conflict(format!("Adding {delta} units would exceed the maximum stock."))
    }
}

#[derive(Clone)]
pub struct CatalogService {
    repo: CatalogRepository,
    visibility: Visibility,
    pool: PgPool,
}

impl CatalogService {
    pub fn new(repo: CatalogRepository, visibility: Visibility, pool: PgPool) -> Self {
        Self { repo, visibility, pool }
    }

    // --- CATEGORIAS ---

    pub async fn create_category(&self, actor: &Actor, name: &str, description: Option<&str>) -> Result<Category, AppError> {
        if !matches!(actor, Actor::Wholesaler { .. }) {
            return Err(AppError::Forbidden("only wholesalers can create categories".into()));
        }
        self.repo.create_category(name, description).await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        self.repo.list_categories().await
    }

    // --- MARCAS ---

    pub async fn create_brand(
        &self,
        actor: &Actor,
        name: &str,
        description: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<Brand, AppError> {
        let wholesaler_id = require_capability(actor, |p| p.can_add_brands, "add brands")?;
        self.repo.create_brand(wholesaler_id, name, description, image_url).await
    }

    pub async fn list_brands(&self, actor: &Actor) -> Result<Vec<Brand>, AppError> {
        let wholesaler_ids = self.visibility.visible_wholesalers(actor).await?;
        self.repo.list_brands(&wholesaler_ids).await
    }

    // --- PRODUTOS ---

    async fn check_references(&self, wholesaler_id: Uuid, input: &ProductInput) -> Result<(), AppError> {
        if !self.repo.category_exists(input.category_id).await? {
            return Err(AppError::NotFound("Category"));
        }
        if let Some(brand_id) = input.brand_id {
            if !self.repo.brand_belongs_to(brand_id, wholesaler_id).await? {
                return Err(AppError::NotFound("Brand"));
            }
        }
        Ok(())
    }

    /// Produto do atacadista efetivo do ator; produto alheio é `NotFound`.
    async fn owned_product(&self, wholesaler_id: Uuid, product_id: Uuid) -> Result<Product, AppError> {
        self.repo
            .find_product(&self.pool, product_id)
            .await?
            .filter(|p| p.wholesaler_id == wholesaler_id)
            .ok_or(AppError::NotFound("Product"))
    }

    pub async fn create_product(&self, actor: &Actor, input: &ProductInput, stock_quantity: i32) -> Result<Product, AppError> {
        let wholesaler_id = require_capability(actor, |p| p.can_add_products, "add products")?;
        self.check_references(wholesaler_id, input).await?;

        let mut tx = self.pool.begin().await?;

        let mut product = self
            .repo
            .create_product(&mut *tx, wholesaler_id, actor.salesman_id(), &input.fields(), stock_quantity)
            .await?;
        self.repo.replace_tiers(&mut tx, product.id, &input.pricing_tiers).await?;

        tx.commit().await?;

        product.pricing_tiers = input.pricing_tiers.clone();
        tracing::info!("📦 Produto {} criado pelo ator {}.", product.id, actor.id());
        Ok(product)
    }

    pub async fn update_product(&self, actor: &Actor, product_id: Uuid, input: &ProductInput) -> Result<Product, AppError> {
        let wholesaler_id = require_capability(actor, |p| p.can_add_products, "edit products")?;
        self.owned_product(wholesaler_id, product_id).await?;
        self.check_references(wholesaler_id, input).await?;

        let mut tx = self.pool.begin().await?;

        self.repo
            .update_product(&mut *tx, product_id, &input.fields())
            .await?
            .ok_or(AppError::NotFound("Product"))?;
        self.repo.replace_tiers(&mut tx, product_id, &input.pricing_tiers).await?;

        tx.commit().await?;

        self.repo.get_product(product_id).await?.ok_or(AppError::NotFound("Product"))
    }

    /// Ajuste manual de estoque por delta atômico.
    pub async fn adjust_stock(&self, actor: &Actor, product_id: Uuid, delta: i32) -> Result<i32, AppError> {
        let wholesaler_id = require_capability(actor, |p| p.can_add_products, "adjust stock")?;
        let product = self.owned_product(wholesaler_id, product_id).await?;

        match self.repo.apply_stock_delta(&self.pool, product_id, delta).await? {
            Some(stock) => {
                tracing::info!("📊 Estoque do produto {} ajustado em {} (saldo {}).", product_id, delta, stock);
                Ok(stock)
            }
            None => Err(rejected_adjustment(product.stock_quantity, delta)),
        }
    }

    pub async fn set_product_active(&self, actor: &Actor, product_id: Uuid, active: bool) -> Result<Product, AppError> {
        let wholesaler_id = require_capability(actor, |p| p.can_delete_products, "deactivate products")?;
        self.owned_product(wholesaler_id, product_id).await?;
        self.repo
            .set_active(product_id, active)
            .await?
            .ok_or(AppError::NotFound("Product"))
    }

    /// Remoção definitiva: só o próprio atacadista.
    pub async fn delete_product(&self, actor: &Actor, product_id: Uuid) -> Result<(), AppError> {
        let Actor::Wholesaler { id: wholesaler_id } = actor else {
            return Err(AppError::Forbidden("only the wholesaler can delete products".into()));
        };
        self.owned_product(*wholesaler_id, product_id).await?;
        self.repo.delete_product(product_id).await?;
        tracing::info!("🗑️ Produto {} removido.", product_id);
        Ok(())
    }

    /// Produto visível ao ator (varejistas só enxergam ativos de atacadistas conectados).
    pub async fn get_product(&self, actor: &Actor, product_id: Uuid) -> Result<Product, AppError> {
        let product = self
            .repo
            .get_product(product_id)
            .await?
            .ok_or(AppError::NotFound("Product"))?;

        let visible = match actor {
            Actor::Retailer { .. } => {
                product.is_active && self.visibility.can_see_wholesaler(actor, product.wholesaler_id).await?
            }
            _ => actor.effective_wholesaler_id() == Some(product.wholesaler_id),
        };
        if !visible {
            return Err(AppError::NotFound("Product"));
        }
        Ok(product)
    }

    pub async fn list_products(&self, actor: &Actor, filter: &ProductFilter) -> Result<Vec<Product>, AppError> {
        // Sem conexões aprovadas, a lista é vazia (não é erro).
        let wholesaler_ids = self.visibility.visible_wholesalers(actor).await?;
        let only_active = matches!(actor, Actor::Retailer { .. });
        self.repo.list_products(&wholesaler_ids, only_active, filter).await
    }

    pub async fn quote_price(&self, actor: &Actor, product_id: Uuid, quantity: i32) -> Result<PriceQuote, AppError> {
        let product = self.get_product(actor, product_id).await?;
        let unit_price = pricing::quote(&product, quantity)?;
        let totals = pricing::compute_totals(unit_price, quantity, product.tax_percentage);

        Ok(PriceQuote {
            product_id,
            quantity,
            unit_price,
            subtotal: totals.subtotal,
            tax_amount: totals.tax,
            total_amount: totals.total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_check_resolves_effective_wholesaler() {
        let wholesaler = Uuid::new_v4();
        let salesman = Actor::Salesman {
            id: Uuid::new_v4(),
            delegate_of: wholesaler,
            permissions: SalesmanPermissions {
                can_add_brands: true,
                ..Default::default()
            },
        };
        assert_eq!(require_capability(&salesman, |p| p.can_add_brands, "x").unwrap(), wholesaler);
        assert!(require_capability(&salesman, |p| p.can_add_products, "x").is_err());

        let retailer = Actor::Retailer { id: Uuid::new_v4() };
        assert!(require_capability(&retailer, |p| p.can_add_products, "x").is_err());
    }

    #[test]
    fn rejected_withdrawal_reports_the_requested_amount() {
        assert!(matches!(
            rejected_adjustment(3, -5),
            AppError::InsufficientStock { available: 3, requested: 5 }
        ));
        assert!(matches!(
            rejected_adjustment(0, i32::MIN),
            AppError::InsufficientStock { available: 0, requested: i32::MAX }
        ));
    }

    #[test]
    fn rejected_entry_is_a_conflict() {
        assert!(matches!(rejected_adjustment(i32::MAX, 1), AppError::Conflict(_)));
    }
}
