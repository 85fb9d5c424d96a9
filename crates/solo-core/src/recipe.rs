//! # Recipe Resolver
//!
//! Turns "N units of product P" into the stock each ingredient loses.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Sale: 3 × Margherita, 2 × Coca                                         │
//! │                                                                         │
//! │  Margherita (Recipe)           Coca (Linked)                            │
//! │   ├─ Flour  0.2 kg × 3          └─ Can  1 × 2                           │
//! │   └─ Mozza  0.1 kg × 3                                                  │
//! │                                                                         │
//! │  Deductions (summed per ingredient, one movement each):                 │
//! │   Flour 0.6 │ Mozza 0.3 │ Can 2                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Summing before applying means one ingredient receives at most one stock
//! mutation per transaction, and restoring is the exact inverse.

use rust_decimal::Decimal;
use tracing::warn;

use crate::catalog::Catalog;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Consumption, Product, SaleLine, StockMovement};

// =============================================================================
// Deductions
// =============================================================================

/// Per-ingredient quantities to remove from stock, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deductions {
    entries: Vec<StockMovement>,
}

impl Deductions {
    pub fn new() -> Self {
        Deductions::default()
    }

    /// Adds `quantity` to the running total of `ingredient_id`.
    ///
    /// Zero quantities are ignored.
    pub fn add(&mut self, ingredient_id: &str, quantity: Decimal) {
        if quantity.is_zero() {
            return;
        }
        match self
            .entries
            .iter_mut()
            .find(|e| e.ingredient_id == ingredient_id)
        {
            Some(entry) => entry.quantity += quantity,
            None => self.entries.push(StockMovement {
                ingredient_id: ingredient_id.to_string(),
                quantity,
            }),
        }
    }

    pub fn merge(&mut self, other: &Deductions) {
        for entry in &other.entries {
            self.add(&entry.ingredient_id, entry.quantity);
        }
    }

    pub fn get(&self, ingredient_id: &str) -> Option<Decimal> {
        self.entries
            .iter()
            .find(|e| e.ingredient_id == ingredient_id)
            .map(|e| e.quantity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StockMovement> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot stored on the sale or loss record.
    pub fn to_movements(&self) -> Vec<StockMovement> {
        self.entries.clone()
    }

    /// Rebuilds deductions from a stored snapshot.
    pub fn from_movements(movements: &[StockMovement]) -> Self {
        let mut deductions = Deductions::new();
        for movement in movements {
            deductions.add(&movement.ingredient_id, movement.quantity);
        }
        deductions
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Stock consumed by selling or losing `quantity` units of `product`.
///
/// ## Rules
/// - Recipe: every line contributes `line.quantity × quantity`
/// - Linked: `quantity_per_unit × quantity` of the single ingredient
/// - Zero-quantity recipe lines are skipped
/// - An empty recipe yields empty deductions (no-op)
pub fn resolve_deductions(product: &Product, quantity: Decimal) -> Deductions {
    let mut deductions = Deductions::new();
    match &product.consumption {
        Consumption::Recipe { lines } => {
            for line in lines {
                if line.quantity.is_zero() {
                    warn!(product = %product.name, ingredient = %line.ingredient_id, "Skipping zero-quantity recipe line");
                    continue;
                }
                deductions.add(&line.ingredient_id, line.quantity * quantity);
            }
        }
        Consumption::Linked {
            ingredient_id,
            quantity_per_unit,
        } => deductions.add(ingredient_id, *quantity_per_unit * quantity),
    }
    deductions
}

/// Summed deductions for a list of sale lines.
///
/// Fails with `UnknownProduct` if any line's product is not in the catalog.
/// Ingredient existence is checked by the transaction coordinator inside the
/// commit, not here.
pub fn resolve_sale_lines(lines: &[SaleLine], catalog: &Catalog) -> CoreResult<Deductions> {
    let mut total = Deductions::new();
    for line in lines {
        let product = catalog
            .product(&line.product_id)
            .ok_or_else(|| CoreError::UnknownProduct(line.product_id.clone()))?;
        total.merge(&resolve_deductions(product, line.quantity));
    }
    Ok(total)
}

// =============================================================================
// Costing
// =============================================================================

/// Current cost of one unit of `product`.
///
/// - Recipe: Σ ingredient cost × line quantity
/// - Linked: ingredient cost × quantity per unit
///
/// Ingredients missing from the catalog cost nothing.
pub fn product_cost(product: &Product, catalog: &Catalog) -> Money {
    match &product.consumption {
        Consumption::Recipe { lines } => lines
            .iter()
            .map(|line| {
                catalog
                    .ingredient(&line.ingredient_id)
                    .map(|i| i.cost.times(line.quantity))
                    .unwrap_or_default()
            })
            .sum(),
        Consumption::Linked {
            ingredient_id,
            quantity_per_unit,
        } => catalog
            .ingredient(ingredient_id)
            .map(|i| i.cost.times(*quantity_per_unit))
            .unwrap_or_default(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
