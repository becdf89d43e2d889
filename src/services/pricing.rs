// src/services/pricing.rs
//
// Motor de preços: funções puras, sem I/O. Todo dinheiro é `Decimal`.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    common::error::AppError,
    models::catalog::{PricingTier, Product},
};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Maior valor monetário aceito no cadastro (999 999 999 999,99), igual ao `NUMERIC(14,2)`
/// das colunas de preço. Com esse teto, preço × `i32::MAX` × imposto cabe em `Decimal`.
pub const MAX_MONEY: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Casas decimais aceitas em preços e alíquotas.
pub const MONEY_SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl Totals {
    pub const ZERO: Totals = Totals {
        subtotal: Decimal::ZERO,
        tax: Decimal::ZERO,
        total: Decimal::ZERO,
    };
}

impl std::ops::Add for Totals {
    type Output = Totals;

    fn add(self, rhs: Totals) -> Totals {
        Totals {
            subtotal: self.subtotal + rhs.subtotal,
            tax: self.tax + rhs.tax,
            total: self.total + rhs.total,
        }
    }
}

impl std::iter::Sum for Totals {
    fn sum<I: Iterator<Item = Totals>>(iter: I) -> Totals {
        iter.fold(Totals::ZERO, |acc, t| acc + t)
    }
}

/// Preço unitário pela PRIMEIRA faixa (na ordem armazenada) que contém a quantidade.
/// Sem faixa compatível, vale o preço base. A ordem das faixas é responsabilidade
/// de quem cadastra: uma faixa genérica antes de uma específica "esconde" a específica.
pub fn unit_price_for(tiers: &[PricingTier], base_price: Decimal, quantity: i32) -> Decimal {
    tiers
        .iter()
        .find(|tier| tier.matches(quantity))
        .map(|tier| tier.price_per_unit)
        .unwrap_or(base_price)
}

pub fn compute_totals(unit_price: Decimal, quantity: i32, tax_percentage: Decimal) -> Totals {
    let subtotal = unit_price * Decimal::from(quantity);
    let tax = subtotal * tax_percentage / HUNDRED;
    Totals {
        subtotal,
        tax,
        total: subtotal + tax,
    }
}

/// Validação que precede qualquer cálculo: MOQ primeiro, depois estoque.
pub fn validate_quantity(product: &Product, quantity: i32) -> Result<(), AppError> {
    if quantity < product.min_order_quantity {
        return Err(AppError::BelowMinimumOrder {
            moq: product.min_order_quantity,
            requested: quantity,
        });
    }
    if quantity > product.stock_quantity {
        return Err(AppError::InsufficientStock {
            available: product.stock_quantity,
            requested: quantity,
        });
    }
    Ok(())
}

/// Valida e resolve o preço unitário de `quantity` unidades do produto.
pub fn quote(product: &Product, quantity: i32) -> Result<Decimal, AppError> {
    if !product.is_active {
        return Err(AppError::ProductInactive);
    }
    validate_quantity(product, quantity)?;
    Ok(unit_price_for(
        &product.pricing_tiers,
        product.base_price,
        quantity,
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::str::FromStr;

    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::models::catalog::UnitType;

    pub(crate) fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn tier(min: i32, max: Option<i32>, price: &str) -> PricingTier {
        PricingTier {
            min_quantity: min,
            max_quantity: max,
            price_per_unit: dec(price),
        }
    }

    pub(crate) fn sample_product() -> Product {
        Product {
            id: Uuid::new_v4(),
            wholesaler_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            brand_id: None,
            created_by_salesman: None,
            name: "Arroz 5kg".into(),
            description: None,
            unit_type: UnitType::Box,
            min_order_quantity: 10,
            stock_quantity: 100,
            base_price: dec("10.00"),
            tax_percentage: dec("18"),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            pricing_tiers: vec![tier(10, Some(49), "9.00"), tier(50, None, "8.00")],
            brand: None,
        }
    }

    #[test]
    fn reference_scenario() {
        let p = sample_product();
        assert_eq!(unit_price_for(&p.pricing_tiers, p.base_price, 10), dec("9.00"));
        assert_eq!(unit_price_for(&p.pricing_tiers, p.base_price, 49), dec("9.00"));
        assert_eq!(unit_price_for(&p.pricing_tiers, p.base_price, 50), dec("8.00"));

        let totals = compute_totals(dec("9.00"), 10, dec("18"));
        assert_eq!(totals.subtotal, dec("90.00"));
        assert_eq!(totals.tax, dec("16.20"));
        assert_eq!(totals.total, dec("106.20"));
    }

    #[test]
    fn falls_back_to_base_price_when_no_tier_matches() {
        let tiers = vec![tier(10, Some(20), "9.00")];
        assert_eq!(unit_price_for(&tiers, dec("10.00"), 5), dec("10.00"));
        assert_eq!(unit_price_for(&tiers, dec("10.00"), 21), dec("10.00"));
        assert_eq!(unit_price_for(&[], dec("10.00"), 21), dec("10.00"));
    }

    #[test]
    fn first_match_wins_over_best_match() {
        // Faixa genérica cadastrada primeiro: a específica nunca é alcançada.
        let tiers = vec![tier(1, None, "10.00"), tier(50, None, "7.00")];
        assert_eq!(unit_price_for(&tiers, dec("12.00"), 60), dec("10.00"));

        let tiers = vec![tier(50, None, "7.00"), tier(1, None, "10.00")];
        assert_eq!(unit_price_for(&tiers, dec("12.00"), 60), dec("7.00"));
    }

    #[test]
    fn totals_are_decimal_exact() {
        let cases = [
            ("9.00", 10, "0"),
            ("0.10", 3, "18"),
            ("19.99", 7, "12.5"),
            ("33.33", 3, "5"),
            ("0.01", 1, "28"),
        ];
        for (unit, qty, tax) in cases {
            let t = compute_totals(dec(unit), qty, dec(tax));
            assert_eq!(t.subtotal, dec(unit) * Decimal::from(qty));
            assert_eq!(t.total, t.subtotal + t.tax);
        }

        let t = compute_totals(dec("0.10"), 3, dec("18"));
        assert_eq!(t.subtotal, dec("0.30"));
        assert_eq!(t.tax, dec("0.054"));

        let zero_tax = compute_totals(dec("9.00"), 10, Decimal::ZERO);
        assert_eq!(zero_tax.tax, Decimal::ZERO);
        assert_eq!(zero_tax.total, dec("90.00"));
    }

    #[test]
    fn quantity_validation_has_distinct_kinds() {
        let p = sample_product();
        assert!(matches!(
            validate_quantity(&p, 9),
            Err(AppError::BelowMinimumOrder { moq: 10, requested: 9 })
        ));
        assert!(matches!(
            validate_quantity(&p, 101),
            Err(AppError::InsufficientStock { available: 100, requested: 101 })
        ));
        assert!(validate_quantity(&p, 100).is_ok());
    }

    #[test]
    fn quote_rejects_inactive_products() {
        let mut p = sample_product();
        assert_eq!(quote(&p, 50).unwrap(), dec("8.00"));
        p.is_active = false;
        assert!(matches!(quote(&p, 50), Err(AppError::ProductInactive)));
    }

    #[test]
    fn totals_sum() {
        let a = compute_totals(dec("9.00"), 10, dec("18"));
        let b = compute_totals(dec("8.00"), 50, dec("5"));
        let sum: Totals = [a, b].into_iter().sum();
        assert_eq!(sum.subtotal, dec("490.00"));
        assert_eq!(sum.total, sum.subtotal + sum.tax);
    }

    #[test]
    fn money_ceiling_matches_the_column_precision() {
        assert_eq!(MAX_MONEY, dec("999999999999.99"));
        assert_eq!(MAX_MONEY.scale(), MONEY_SCALE);
    }

    #[test]
    fn totals_at_the_money_ceiling_do_not_overflow() {
        let totals = compute_totals(MAX_MONEY, i32::MAX, Decimal::ONE_HUNDRED);
        assert_eq!(totals.subtotal, MAX_MONEY * Decimal::from(i32::MAX));
        assert_eq!(totals.tax, totals.subtotal);
        assert_eq!(totals.total, totals.subtotal + totals.tax);
    }
}
