// src/services/order_service.rs
//
// Fechamento do carrinho em pedidos (um por atacadista) e ciclo de vida do pedido.

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        order_repo::{NewOrder, OrderVisibility},
        CartRepository, CatalogRepository, OrderRepository,
    },
    models::{
        auth::Actor,
        cart::{CartLine, CartScope},
        orders::{Order, OrderDetail, OrderItem, OrderStatus, PaymentStatus, PaymentTerms},
    },
    services::{cart_service::CartService, pricing, visibility::Visibility},
};

const CANCEL_ONLY_PENDING: &str = "only pending orders may be cancelled";

/// Dados do fechamento vindos do handler.
#[derive(Debug, Clone)]
pub struct PlaceOrderInput {
    pub retailer_id: Option<Uuid>,
    pub delivery_address: String,
    pub notes: Option<String>,
    pub payment_terms: PaymentTerms,
}

/// Erro devolvido numa falha parcial: sempre o do atacadista que falhou.
/// Uma falha na limpeza do carrinho é só registrada.
fn partial_failure(cart_id: Uuid, failure: AppError, cleanup: Result<u64, AppError>) -> AppError {
    if let Err(cleanup_err) = cleanup {
        tracing::error!(
            "Falha ao remover do carrinho {} as linhas já convertidas em pedido: {}",
            cart_id,
            cleanup_err
        );
    }
    failure
}

/// Agrupa as linhas por atacadista, na ordem em que cada atacadista aparece no carrinho.
pub fn partition_by_wholesaler(lines: Vec<CartLine>) -> Vec<(Uuid, Vec<CartLine>)> {
    let mut partitions: Vec<(Uuid, Vec<CartLine>)> = Vec::new();
    for line in lines {
        match partitions.iter_mut().find(|(w, _)| *w == line.wholesaler_id) {
            Some((_, group)) => group.push(line),
            None => partitions.push((line.wholesaler_id, vec![line])),
        }
    }
    partitions
}

/// Snapshot das linhas e totais do pedido. Usa o preço congelado no carrinho
/// e a alíquota atual do produto.
pub fn draft_items(lines: &[CartLine]) -> (Vec<OrderItem>, pricing::Totals) {
    let mut totals = pricing::Totals::ZERO;
    let items = lines
        .iter()
        .map(|line| {
            let line_totals = pricing::compute_totals(line.unit_price, line.quantity, line.tax_percentage);
            totals = totals + line_totals;
            OrderItem {
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                tax_amount: line_totals.tax,
                line_total: line_totals.total,
            }
        })
        .collect();
    (items, totals)
}

/// `ORD` + AAMMDD + sequência diária com 4 dígitos.
pub fn format_order_number(day: NaiveDate, sequence: i32) -> String {
    format!("ORD{}{:04}", day.format("%y%m%d"), sequence)
}

pub fn visibility_for(actor: &Actor) -> OrderVisibility {
    match actor {
        Actor::Retailer { id } => OrderVisibility::Retailer(*id),
        Actor::Wholesaler { id } => OrderVisibility::Wholesaler(*id),
        Actor::Salesman { id, delegate_of, permissions } => {
            if permissions.can_view_all_retailers {
                OrderVisibility::Wholesaler(*delegate_of)
            } else {
                OrderVisibility::PlacedBy {
                    wholesaler_id: *delegate_of,
                    salesman_id: *id,
                }
            }
        }
    }
}

pub fn can_view(actor: &Actor, order: &Order) -> bool {
    match visibility_for(actor) {
        OrderVisibility::Retailer(id) => order.retailer_id == id,
        OrderVisibility::Wholesaler(id) => order.wholesaler_id == id,
        OrderVisibility::PlacedBy { wholesaler_id, salesman_id } => {
            order.wholesaler_id == wholesaler_id && order.salesman_id == Some(salesman_id)
        }
    }
}

#[derive(Clone)]
pub struct OrderService {
    repo: OrderRepository,
    cart_repo: CartRepository,
    catalog_repo: CatalogRepository,
    cart_service: CartService,
    visibility: Visibility,
    pool: PgPool,
}

impl OrderService {
    pub fn new(
        repo: OrderRepository,
        cart_repo: CartRepository,
        catalog_repo: CatalogRepository,
        cart_service: CartService,
        visibility: Visibility,
        pool: PgPool,
    ) -> Self {
        Self {
            repo,
            cart_repo,
            catalog_repo,
            cart_service,
            visibility,
            pool,
        }
    }

    /// Fecha o carrinho do ator: um pedido por atacadista, cada um na sua transação.
    ///
    /// Se um atacadista falhar depois de outros já gravados, os pedidos gravados
    /// permanecem, as linhas deles saem do carrinho e o erro é devolvido.
    pub async fn place_order(&self, actor: &Actor, input: &PlaceOrderInput) -> Result<Vec<OrderDetail>, AppError> {
        let scope = self.cart_service.resolve_scope(actor, input.retailer_id).await?;
        let cart = self.cart_repo.find(scope).await?.ok_or(AppError::EmptyCart)?;
        let lines = self.cart_repo.lines(cart.id).await?;
        if lines.is_empty() {
            return Err(AppError::EmptyCart);
        }

        let partitions = partition_by_wholesaler(lines);

        // Varejista: a conexão é conferida de novo no fechamento, antes de qualquer escrita.
        if let Actor::Retailer { id: retailer_id } = actor {
            for (wholesaler_id, _) in &partitions {
                if !self.visibility.is_connected(*wholesaler_id, *retailer_id).await? {
                    return Err(AppError::NotConnected);
                }
            }
        }

        let today = Utc::now().date_naive();
        let mut placed: Vec<OrderDetail> = Vec::with_capacity(partitions.len());

        for (wholesaler_id, group) in &partitions {
            match self.place_partition(actor, scope, *wholesaler_id, group, input, today).await {
                Ok(detail) => placed.push(detail),
                Err(mut e) => {
                    if !placed.is_empty() {
                        let committed: Vec<Uuid> = placed
                            .iter()
                            .flat_map(|d| d.items.iter().map(|i| i.product_id))
                            .collect();
                        let cleanup = self.cart_repo.clear(&self.pool, cart.id, Some(committed.as_slice())).await;
                        e = partial_failure(cart.id, e, cleanup);
                        tracing::warn!(
                            "⚠️ Fechamento parcial do carrinho {}: {} pedido(s) gravado(s) antes da falha no atacadista {}.",
                            cart.id,
                            placed.len(),
                            wholesaler_id
                        );
                    }
                    return Err(e);
                }
            }
        }

        self.cart_repo.clear(&self.pool, cart.id, None).await?;

        tracing::info!(
            "🧾 Carrinho {} fechado em {} pedido(s) por {}.",
            cart.id,
            placed.len(),
            actor.id()
        );
        Ok(placed)
    }

    async fn place_partition(
        &self,
        actor: &Actor,
        scope: CartScope,
        wholesaler_id: Uuid,
        lines: &[CartLine],
        input: &PlaceOrderInput,
        today: NaiveDate,
    ) -> Result<OrderDetail, AppError> {
        let (items, totals) = draft_items(lines);

        let mut tx = self.pool.begin().await?;

        let sequence = self.repo.next_daily_sequence(&mut *tx, today).await?;
        let order_number = format_order_number(today, sequence);

        let order = self
            .repo
            .insert_order(
                &mut *tx,
                &NewOrder {
                    order_number: &order_number,
                    retailer_id: scope.retailer_id,
                    wholesaler_id,
                    salesman_id: actor.salesman_id(),
                    subtotal: totals.subtotal,
                    tax_amount: totals.tax,
                    total_amount: totals.total,
                    delivery_address: &input.delivery_address,
                    notes: input.notes.as_deref(),
                    payment_terms: input.payment_terms,
                },
            )
            .await?;

        for item in &items {
            self.repo.insert_item(&mut *tx, order.id, item).await?;

            // Decremento atômico; sem saldo, a transação inteira deste atacadista volta.
            let remaining = self
                .catalog_repo
                .apply_stock_delta(&mut *tx, item.product_id, -item.quantity)
                .await?;
            if remaining.is_none() {
                let available = self
                    .catalog_repo
                    .stock_of(&mut *tx, item.product_id)
                    .await?
                    .ok_or(AppError::NotFound("Product"))?;
                return Err(AppError::InsufficientStock {
                    available,
                    requested: item.quantity,
                });
            }
        }

        tx.commit().await?;

        tracing::info!(
            "📝 Pedido {} criado para o atacadista {} (total {}).",
            order.order_number,
            wholesaler_id,
            order.total_amount
        );
        Ok(OrderDetail { header: order, items })
    }

    pub async fn list_orders(&self, actor: &Actor, status: Option<OrderStatus>) -> Result<Vec<Order>, AppError> {
        self.repo.list(visibility_for(actor), status).await
    }

    async fn visible_order(&self, actor: &Actor, order_id: Uuid) -> Result<Order, AppError> {
        self.repo
            .find(&self.pool, order_id)
            .await?
            .filter(|o| can_view(actor, o))
            .ok_or(AppError::NotFound("Order"))
    }

    pub async fn get_order(&self, actor: &Actor, order_id: Uuid) -> Result<OrderDetail, AppError> {
        let order = self.visible_order(actor, order_id).await?;
        let items = self.repo.items(&self.pool, order_id).await?;
        Ok(OrderDetail { header: order, items })
    }

    /// Cancelamento pelo varejista, só enquanto pendente. Devolve o estoque na mesma transação.
    pub async fn cancel_order(&self, actor: &Actor, order_id: Uuid) -> Result<Order, AppError> {
        let order = self.visible_order(actor, order_id).await?;
        if !matches!(actor, Actor::Retailer { id } if *id == order.retailer_id) {
            return Err(AppError::Forbidden("only the retailer can cancel its order".into()));
        }
        if !order.status.can_cancel() {
            return Err(AppError::InvalidStateTransition(CANCEL_ONLY_PENDING.into()));
        }

        let mut tx = self.pool.begin().await?;

        let cancelled = self
            .repo
            .transition_status(&mut *tx, order_id, &[OrderStatus::Pending], OrderStatus::Cancelled)
            .await?
            .ok_or_else(|| AppError::InvalidStateTransition(CANCEL_ONLY_PENDING.into()))?;

        let items = self.repo.items(&mut *tx, order_id).await?;
        for item in &items {
            let restored = self
                .catalog_repo
                .apply_stock_delta(&mut *tx, item.product_id, item.quantity)
                .await?;
            if restored.is_none() {
                // Produto apagado depois do pedido: não há estoque para devolver.
                tracing::warn!(
                    "⚠️ Produto {} do pedido {} não existe mais; estoque não devolvido.",
                    item.product_id,
                    cancelled.order_number
                );
            }
        }

        tx.commit().await?;

        tracing::info!("❌ Pedido {} cancelado.", cancelled.order_number);
        Ok(cancelled)
    }

    /// Avanço de atendimento pelo atacadista dono do pedido.
    pub async fn update_status(&self, actor: &Actor, order_id: Uuid, next: OrderStatus) -> Result<Order, AppError> {
        let order = self.owned_order(actor, order_id).await?;

        if !order.status.can_advance_to(next) {
            return Err(AppError::InvalidStateTransition(format!(
                "cannot move an order from {} to {}",
                order.status.as_str(),
                next.as_str()
            )));
        }

        let updated = self
            .repo
            .transition_status(&self.pool, order_id, &[order.status], next)
            .await?
            .ok_or_else(|| AppError::InvalidStateTransition("the order changed concurrently".into()))?;

        tracing::info!("🚚 Pedido {} agora está {}.", updated.order_number, next.as_str());
        Ok(updated)
    }

    pub async fn update_payment_status(
        &self,
        actor: &Actor,
        order_id: Uuid,
        payment_status: PaymentStatus,
    ) -> Result<Order, AppError> {
        self.owned_order(actor, order_id).await?;
        self.repo
            .set_payment_status(order_id, payment_status)
            .await?
            .ok_or(AppError::NotFound("Order"))
    }

    async fn owned_order(&self, actor: &Actor, order_id: Uuid) -> Result<Order, AppError> {
        let Actor::Wholesaler { id: wholesaler_id } = actor else {
            return Err(AppError::Forbidden("only the wholesaler can update orders".into()));
        };
        self.repo
            .find(&self.pool, order_id)
            .await?
            .filter(|o| o.wholesaler_id == *wholesaler_id)
            .ok_or(AppError::NotFound("Order"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;
    use crate::{models::auth::SalesmanPermissions, services::pricing::tests::dec};

    fn line(wholesaler_id: Uuid, unit: &str, qty: i32, tax: &str) -> CartLine {
        CartLine {
            product_id: Uuid::new_v4(),
            product_name: "Item".into(),
            wholesaler_id,
            quantity: qty,
            unit_price: dec(unit),
            tax_percentage: dec(tax),
            added_at: Utc::now(),
        }
    }

    fn order(retailer_id: Uuid, wholesaler_id: Uuid, salesman_id: Option<Uuid>) -> Order {
        Order {
            id: Uuid::new_v4(),
            order_number: "ORD2510190001".into(),
            retailer_id,
            wholesaler_id,
            salesman_id,
            subtotal: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            delivery_address: "Rua 1".into(),
            notes: None,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_terms: PaymentTerms::Immediate,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn partitions_keep_first_appearance_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let lines = vec![
            line(b, "1.00", 1, "0"),
            line(a, "1.00", 1, "0"),
            line(b, "2.00", 1, "0"),
        ];
        let partitions = partition_by_wholesaler(lines);
        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions[0].0, b);
        assert_eq!(partitions[0].1.len(), 2);
        assert_eq!(partitions[1].0, a);
    }

    #[test]
    fn single_wholesaler_cart_is_one_partition() {
        let w = Uuid::new_v4();
        let partitions = partition_by_wholesaler(vec![line(w, "1.00", 1, "0"), line(w, "1.00", 2, "0")]);
        assert_eq!(partitions.len(), 1);
    }

    #[test]
    fn draft_sums_match_cart_total() {
        let w = Uuid::new_v4();
        let lines = vec![line(w, "9.00", 10, "18"), line(w, "0.10", 3, "18")];
        let (items, totals) = draft_items(&lines);

        assert_eq!(items[0].tax_amount, dec("16.20"));
        assert_eq!(items[0].line_total, dec("106.20"));
        for item in &items {
            assert_eq!(
                item.line_total,
                item.unit_price * Decimal::from(item.quantity) + item.tax_amount
            );
        }
        assert_eq!(totals.subtotal, dec("90.30"));
        assert_eq!(totals.total, totals.subtotal + totals.tax);
        assert_eq!(totals.total, items.iter().map(|i| i.line_total).sum::<Decimal>());
    }

    #[test]
    fn order_number_format() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(format_order_number(day, 1), "ORD2503070001");
        assert_eq!(format_order_number(day, 42), "ORD2503070042");
        assert_eq!(format_order_number(day, 12345), "ORD25030712345");
    }

    #[test]
    fn order_visibility_by_actor() {
        let (r, w, s) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let placed_by_salesman = order(r, w, Some(s));
        let placed_by_retailer = order(r, w, None);

        assert!(can_view(&Actor::Retailer { id: r }, &placed_by_salesman));
        assert!(!can_view(&Actor::Retailer { id: Uuid::new_v4() }, &placed_by_salesman));
        assert!(can_view(&Actor::Wholesaler { id: w }, &placed_by_retailer));

        let restricted = Actor::Salesman {
            id: s,
            delegate_of: w,
            permissions: SalesmanPermissions::default(),
        };
        assert!(can_view(&restricted, &placed_by_salesman));
        assert!(!can_view(&restricted, &placed_by_retailer));

        let sees_all = Actor::Salesman {
            id: s,
            delegate_of: w,
            permissions: SalesmanPermissions {
                can_view_all_retailers: true,
                ..Default::default()
            },
        };
        assert!(can_view(&sees_all, &placed_by_retailer));
    }

    #[test]
    fn partial_failure_keeps_the_partition_error() {
        let cart_id = Uuid::new_v4();
        let failure = AppError::InsufficientStock { available: 2, requested: 5 };
        let cleanup: Result<u64, AppError> = Err(AppError::InternalServerError(anyhow::anyhow!("pool closed")));
        assert!(matches!(
            partial_failure(cart_id, failure, cleanup),
            AppError::InsufficientStock { available: 2, requested: 5 }
        ));

        assert!(matches!(
            partial_failure(cart_id, AppError::NotConnected, Ok(3)),
            AppError::NotConnected
        ));
    }
}
