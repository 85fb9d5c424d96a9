//! # Drafts
//!
//! Value objects for the things an operator builds up before committing:
//! an order, a recipe, a purchase order. The caller owns the draft (a UI
//! controller, a request handler) and hands it to the commit call.
//!
//! ## Draft Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  OrderDraft::new()                                                      │
//! │       │  add_product(Margherita, 2)   ← name + price snapshotted        │
//! │       │  add_product(Margherita, 1)   ← merged: quantity 3              │
//! │       │  add_product(Coca, 2)                                           │
//! │       ▼                                                                 │
//! │  into_sale(total override?, business date)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  NewSale ──► TransactionCoordinator::record_sale (solo-db)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    business_noon, new_id, Consumption, Ingredient, LossKind, PaymentStatus, Product,
    PurchaseLine, PurchaseOrder, PurchaseStatus, RecipeLine, SaleLine, SaleSource, Supplier,
};
use crate::validation::{require_non_negative, require_positive, require_text};

// =============================================================================
// Requests
// =============================================================================

/// A sale ready to be recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    pub items: Vec<SaleLine>,
    pub total_price: Money,
    pub sale_date: DateTime<Utc>,
    #[serde(default)]
    pub source: SaleSource,
    #[serde(default)]
    pub bill_no: Option<String>,
    #[serde(default)]
    pub had_discount: bool,
}

impl NewSale {
    /// A manual sale dated at noon of `date`.
    pub fn manual(items: Vec<SaleLine>, total_price: Money, date: NaiveDate) -> Self {
        NewSale {
            items,
            total_price,
            sale_date: business_noon(date),
            source: SaleSource::Manual,
            bill_no: None,
            had_discount: false,
        }
    }

    /// Checks the parts that need no store access.
    pub fn validate(&self) -> CoreResult<()> {
        if self.items.is_empty() {
            return Err(ValidationError::empty("items").into());
        }
        require_non_negative("total price", self.total_price.amount())?;
        for item in &self.items {
            require_positive("quantity", item.quantity)?;
        }
        Ok(())
    }
}

/// A loss to declare against a product or an ingredient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLoss {
    #[serde(rename = "type")]
    pub kind: LossKind,
    pub target_id: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub reason: Option<String>,
}

impl NewLoss {
    pub fn validate(&self) -> CoreResult<()> {
        require_text("target", &self.target_id)?;
        require_positive("quantity", self.quantity)?;
        Ok(())
    }

    /// Reason with surrounding whitespace removed; blank means none.
    pub fn reason(&self) -> Option<String> {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
    }
}

// =============================================================================
// Order Draft
// =============================================================================

/// The order being rung up.
///
/// ## Invariants
/// - Lines are unique by product (adding the same product merges)
/// - Quantities are > 0 (setting 0 removes the line)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub items: Vec<SaleLine>,
}

impl OrderDraft {
    pub fn new() -> Self {
        OrderDraft::default()
    }

    /// Adds a product or increases its quantity.
    ///
    /// Name and price are frozen at the first add.
    pub fn add_product(&mut self, product: &Product, quantity: Decimal) -> CoreResult<()> {
        require_positive("quantity", quantity)?;
        if let Some(line) = self.items.iter_mut().find(|l| l.product_id == product.id) {
            line.quantity += quantity;
            return Ok(());
        }
        self.items.push(SaleLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            quantity,
            price: product.price,
            returned: None,
        });
        Ok(())
    }

    /// Sets the quantity of a line; zero removes it.
    pub fn set_quantity(&mut self, product_id: &str, quantity: Decimal) -> CoreResult<()> {
        require_non_negative("quantity", quantity)?;
        if quantity.is_zero() {
            self.remove(product_id);
            return Ok(());
        }
        let line = self
            .items
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or_else(|| CoreError::not_found("Order line", product_id))?;
        line.quantity = quantity;
        Ok(())
    }

    pub fn remove(&mut self, product_id: &str) {
        self.items.retain(|l| l.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Σ price × quantity at the snapshot prices.
    pub fn total(&self) -> Money {
        self.items.iter().map(SaleLine::line_total).sum()
    }

    /// Turns the draft into a sale, optionally with a negotiated total.
    pub fn into_sale(self, total_override: Option<Money>, date: NaiveDate) -> CoreResult<NewSale> {
        let total = total_override.unwrap_or_else(|| self.total());
        let sale = NewSale::manual(self.items, total, date);
        sale.validate()?;
        Ok(sale)
    }
}

// =============================================================================
// Recipe Draft
// =============================================================================

/// A recipe being edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDraft {
    pub lines: Vec<RecipeLine>,
}

impl RecipeDraft {
    pub fn new() -> Self {
        RecipeDraft::default()
    }

    /// Starts from an existing recipe (empty for linked products).
    pub fn from_consumption(consumption: &Consumption) -> Self {
        match consumption {
            Consumption::Recipe { lines } => RecipeDraft {
                lines: lines.clone(),
            },
            Consumption::Linked { .. } => RecipeDraft::new(),
        }
    }

    /// Adds an ingredient; an ingredient already present gets the new
    /// quantity.
    pub fn add(&mut self, ingredient: &Ingredient, quantity: Decimal) -> CoreResult<()> {
        require_positive("quantity", quantity)?;
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.ingredient_id == ingredient.id)
        {
            line.quantity = quantity;
            return Ok(());
        }
        self.lines.push(RecipeLine {
            ingredient_id: ingredient.id.clone(),
            name: ingredient.name.clone(),
            quantity,
            unit: ingredient.unit.clone(),
        });
        Ok(())
    }

    pub fn remove(&mut self, ingredient_id: &str) {
        self.lines.retain(|l| l.ingredient_id != ingredient_id);
    }

    pub fn build(self) -> CoreResult<Consumption> {
        if self.lines.is_empty() {
            return Err(ValidationError::empty("recipe").into());
        }
        Ok(Consumption::Recipe { lines: self.lines })
    }
}

// =============================================================================
// Purchase Draft
// =============================================================================

/// Lines of a purchase order being prepared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDraft {
    pub lines: Vec<PurchaseLine>,
}

impl PurchaseDraft {
    pub fn new() -> Self {
        PurchaseDraft::default()
    }

    /// Copies the lines of an earlier order ("reorder").
    pub fn reorder(order: &PurchaseOrder) -> Self {
        PurchaseDraft {
            lines: order.items.clone(),
        }
    }

    pub fn add_line(
        &mut self,
        ingredient: &Ingredient,
        quantity: Decimal,
        unit_price: Money,
    ) -> CoreResult<()> {
        require_positive("quantity", quantity)?;
        require_non_negative("unit price", unit_price.amount())?;
        self.lines.push(PurchaseLine {
            ingredient_id: ingredient.id.clone(),
            name: ingredient.name.clone(),
            unit: ingredient.unit.clone(),
            quantity,
            unit_price,
        });
        Ok(())
    }

    pub fn set_quantity(&mut self, index: usize, quantity: Decimal) -> CoreResult<()> {
        require_positive("quantity", quantity)?;
        self.line_mut(index)?.quantity = quantity;
        Ok(())
    }

    pub fn set_unit_price(&mut self, index: usize, unit_price: Money) -> CoreResult<()> {
        require_non_negative("unit price", unit_price.amount())?;
        self.line_mut(index)?.unit_price = unit_price;
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Option<PurchaseLine> {
        (index < self.lines.len()).then(|| self.lines.remove(index))
    }

    pub fn total(&self) -> Money {
        self.lines.iter().map(PurchaseLine::line_total).sum()
    }

    fn line_mut(&mut self, index: usize) -> CoreResult<&mut PurchaseLine> {
        self.lines
            .get_mut(index)
            .ok_or_else(|| CoreError::not_found("Purchase line", index.to_string()))
    }

    /// Builds a pending order for `supplier`.
    ///
    /// The total defaults to the sum of lines. A paid order is stamped
    /// `paid_at` now.
    pub fn into_order(
        self,
        supplier: &Supplier,
        total_override: Option<Money>,
        payment_status: PaymentStatus,
    ) -> CoreResult<PurchaseOrder> {
        if self.lines.is_empty() {
            return Err(ValidationError::empty("items").into());
        }
        let total_cost = total_override.unwrap_or_else(|| self.total());
        require_non_negative("total cost", total_cost.amount())?;
        let now = Utc::now();
        Ok(PurchaseOrder {
            id: new_id(),
            supplier_id: supplier.id.clone(),
            supplier_name: supplier.name.clone(),
            items: self.lines,
            total_cost,
            status: PurchaseStatus::Pending,
            payment_status,
            invoice: None,
            created_at: now,
            received_at: None,
            paid_at: (payment_status == PaymentStatus::Paid).then_some(now),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
