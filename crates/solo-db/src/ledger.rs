//! # Stock Ledger
//!
//! Ingredient quantities, moved only by relative deltas inside a batch.
//!
//! ## Movement Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Sale / Loss          Deductions ──► deduct()  ──► Increment(-q)        │
//! │  Sale / Loss deleted  snapshot   ──► restore() ──► Increment(+q)        │
//! │  Purchase receipt     lines      ──► receive() ──► Increment(+q)        │
//! │                                                                         │
//! │  Increment ops ride in the caller's WriteBatch; the ledger never        │
//! │  commits on its own and never writes an absolute quantity.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Quantities may go negative. An increment on a missing ingredient makes
//! the whole batch fail with `UnknownReference`.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use solo_core::{Catalog, CoreError, Deductions, Ingredient, PurchaseLine};

use crate::error::DbResult;
use crate::repository::Repository;
use crate::store::{Collection, SharedStore, WriteBatch};

/// Field of the ingredient document holding the ledger entry.
pub const QUANTITY_FIELD: &str = "quantity";

#[derive(Clone)]
pub struct StockLedger {
    ingredients: Repository<Ingredient>,
}

impl StockLedger {
    pub fn new(store: SharedStore) -> Self {
        StockLedger {
            ingredients: Repository::new(store),
        }
    }

    /// Queues a signed adjustment of one ingredient.
    pub fn adjust(batch: &mut WriteBatch, ingredient_id: &str, delta: Decimal) {
        if delta.is_zero() {
            return;
        }
        batch.increment(Collection::Ingredients, ingredient_id, QUANTITY_FIELD, delta);
    }

    /// Queues one decrement per ingredient.
    pub fn deduct(batch: &mut WriteBatch, deductions: &Deductions) {
        for movement in deductions.iter() {
            Self::adjust(batch, &movement.ingredient_id, -movement.quantity);
        }
    }

    /// Queues the exact inverse of [`StockLedger::deduct`].
    pub fn restore(batch: &mut WriteBatch, deductions: &Deductions) {
        for movement in deductions.iter() {
            Self::adjust(batch, &movement.ingredient_id, movement.quantity);
        }
    }

    /// Queues the stock brought in by a purchase receipt.
    ///
    /// Lines with a non-positive quantity are skipped. Returns how many
    /// increments were queued.
    pub fn receive(batch: &mut WriteBatch, lines: &[PurchaseLine]) -> usize {
        let mut queued = 0;
        for line in lines {
            if line.quantity <= Decimal::ZERO {
                warn!(
                    ingredient_id = %line.ingredient_id,
                    quantity = %line.quantity,
                    "Skipping purchase line without a positive quantity"
                );
                continue;
            }
            Self::adjust(batch, &line.ingredient_id, line.quantity);
            queued += 1;
        }
        queued
    }

    /// Fails with `UnknownIngredient` on the first deduction target missing
    /// from `catalog`.
    pub fn ensure_known(deductions: &Deductions, catalog: &Catalog) -> DbResult<()> {
        for movement in deductions.iter() {
            if catalog.ingredient(&movement.ingredient_id).is_none() {
                return Err(CoreError::UnknownIngredient(movement.ingredient_id.clone()).into());
            }
        }
        Ok(())
    }

    /// Current stock of one ingredient.
    pub async fn quantity(&self, ingredient_id: &str) -> DbResult<Decimal> {
        let ingredient = self.ingredients.require(ingredient_id).await?;
        debug!(ingredient_id = %ingredient_id, quantity = %ingredient.quantity, "Read stock level");
        Ok(ingredient.quantity)
    }
}
