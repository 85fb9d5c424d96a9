//! # Transaction Coordinator
//!
//! Commits a business event and the stock it moves as one batch.
//!
//! ## Sale Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_sale(NewSale)                                                   │
//! │       │                                                                 │
//! │       ├── validate request (items, total ≥ 0, quantities > 0)           │
//! │       ├── load catalog snapshot                                         │
//! │       ├── resolve + sum deductions      ← UnknownProduct aborts         │
//! │       ├── check every ingredient exists ← UnknownIngredient aborts      │
//! │       ▼                                                                 │
//! │  WriteBatch                                                             │
//! │  ├── Increment ingredients/<id> quantity -q   (one per ingredient)      │
//! │  └── Create    orders/<sale id>  {…, deductions: snapshot}              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  store.commit(batch)  ── all or nothing                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Reversal
//! Deleting a sale or loss adds back the deduction snapshot stored on the
//! record. Records written before snapshots existed are re-resolved against
//! the current catalog; products that no longer exist restore nothing.
//!
//! ## Purchase Orders
//! ```text
//!   pending ──receive──► received        (stock +q per line, once)
//!   unpaid  ──mark_paid─► paid
//! ```
//! Receipt is guarded inside the batch on `status == "pending"`, so two
//! concurrent receipts cannot both increment stock. Deleting an order never
//! touches stock.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use solo_core::draft::{NewLoss, NewSale};
use solo_core::recipe::{resolve_deductions, resolve_sale_lines};
use solo_core::{
    new_id, Catalog, CoreError, Deductions, Ingredient, Loss, LossKind, Product, PurchaseOrder,
    PurchaseStatus, Sale, SaleLine,
};

use crate::error::DbResult;
use crate::invoice::InvoiceStorage;
use crate::ledger::StockLedger;
use crate::repository::Repository;
use crate::store::{Collection, SharedStore, WriteBatch};

#[derive(Clone)]
pub struct TransactionCoordinator {
    store: SharedStore,
    invoices: Arc<dyn InvoiceStorage>,
    products: Repository<Product>,
    ingredients: Repository<Ingredient>,
    sales: Repository<Sale>,
    losses: Repository<Loss>,
    orders: Repository<PurchaseOrder>,
}

impl TransactionCoordinator {
    pub fn new(store: SharedStore, invoices: Arc<dyn InvoiceStorage>) -> Self {
        TransactionCoordinator {
            products: Repository::new(store.clone()),
            ingredients: Repository::new(store.clone()),
            sales: Repository::new(store.clone()),
            losses: Repository::new(store.clone()),
            orders: Repository::new(store.clone()),
            store,
            invoices,
        }
    }

    /// Fresh snapshot of products and ingredients.
    pub async fn catalog(&self) -> DbResult<Catalog> {
        let products = self.products.list().await?;
        let ingredients = self.ingredients.list().await?;
        Ok(Catalog::new(products, ingredients))
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Records a sale and deducts the stock it consumed.
    ///
    /// ## Errors
    /// - `Validation` for an empty sale, a negative total or a non-positive quantity
    /// - `UnknownProduct` / `UnknownIngredient` for dangling references
    ///
    /// Nothing is written on error.
    pub async fn record_sale(&self, sale: NewSale) -> DbResult<Sale> {
        let catalog = self.catalog().await?;
        let (record, deductions) = prepare_sale(sale, &catalog)?;

        let mut batch = WriteBatch::new();
        StockLedger::deduct(&mut batch, &deductions);
        batch.create(&record)?;
        self.store.commit(batch).await?;

        info!(
            sale_id = %record.id,
            total = %record.total_price,
            lines = record.items.len(),
            movements = deductions.len(),
            "Sale recorded"
        );
        Ok(record)
    }

    /// Records several sales in one batch (CSV order import).
    ///
    /// Every sale keeps its own snapshot; the stock mutation is summed so each
    /// ingredient moves once.
    pub async fn record_sales(&self, sales: Vec<NewSale>) -> DbResult<Vec<Sale>> {
        let catalog = self.catalog().await?;
        let mut total = Deductions::new();
        let mut records = Vec::with_capacity(sales.len());
        for sale in sales {
            let (record, deductions) = prepare_sale(sale, &catalog)?;
            total.merge(&deductions);
            records.push(record);
        }
        if records.is_empty() {
            return Ok(records);
        }

        let mut batch = WriteBatch::new();
        StockLedger::deduct(&mut batch, &total);
        for record in &records {
            batch.create(record)?;
        }
        self.store.commit(batch).await?;

        info!(sales = records.len(), movements = total.len(), "Sales batch recorded");
        Ok(records)
    }

    /// Deletes a sale and adds back what it deducted.
    pub async fn delete_sale(&self, sale_id: &str) -> DbResult<Sale> {
        let sale = self.sales.require(sale_id).await?;
        let deductions = match &sale.deductions {
            Some(snapshot) => Deductions::from_movements(snapshot),
            None => {
                debug!(sale_id = %sale_id, "No deduction snapshot, recomputing");
                recompute_sale(&sale.items, &self.catalog().await?)
            }
        };

        let mut batch = WriteBatch::new();
        batch.guard(Collection::Orders, sale_id, "id", sale_id);
        StockLedger::restore(&mut batch, &deductions);
        batch.delete(Collection::Orders, sale_id);
        self.store.commit(batch).await?;

        info!(sale_id = %sale_id, movements = deductions.len(), "Sale deleted, stock restored");
        Ok(sale)
    }

    // =========================================================================
    // Losses
    // =========================================================================

    /// Declares a loss and deducts the stock.
    ///
    /// Product losses go through the recipe; ingredient losses remove the
    /// quantity directly and snapshot the unit.
    pub async fn record_loss(&self, loss: NewLoss) -> DbResult<Loss> {
        loss.validate()?;
        let catalog = self.catalog().await?;

        let (name, unit, deductions) = match loss.kind {
            LossKind::Product => {
                let product = catalog
                    .product(&loss.target_id)
                    .ok_or_else(|| CoreError::UnknownProduct(loss.target_id.clone()))?;
                (
                    product.name.clone(),
                    None,
                    resolve_deductions(product, loss.quantity),
                )
            }
            LossKind::Ingredient => {
                let ingredient = catalog
                    .ingredient(&loss.target_id)
                    .ok_or_else(|| CoreError::UnknownIngredient(loss.target_id.clone()))?;
                let mut deductions = Deductions::new();
                deductions.add(&ingredient.id, loss.quantity);
                (
                    ingredient.name.clone(),
                    Some(ingredient.unit.clone()),
                    deductions,
                )
            }
        };
        StockLedger::ensure_known(&deductions, &catalog)?;

        let record = Loss {
            id: new_id(),
            kind: loss.kind,
            target_id: loss.target_id.clone(),
            name,
            quantity: loss.quantity,
            unit,
            reason: loss.reason(),
            created_at: Utc::now(),
            deductions: Some(deductions.to_movements()),
        };

        let mut batch = WriteBatch::new();
        StockLedger::deduct(&mut batch, &deductions);
        batch.create(&record)?;
        self.store.commit(batch).await?;

        info!(loss_id = %record.id, kind = %record.kind, target = %record.name, "Loss recorded");
        Ok(record)
    }

    pub async fn delete_loss(&self, loss_id: &str) -> DbResult<Loss> {
        let loss = self.losses.require(loss_id).await?;
        let deductions = match &loss.deductions {
            Some(snapshot) => Deductions::from_movements(snapshot),
            None => recompute_loss(&loss, &self.catalog().await?),
        };

        let mut batch = WriteBatch::new();
        batch.guard(Collection::Losses, loss_id, "id", loss_id);
        StockLedger::restore(&mut batch, &deductions);
        batch.delete(Collection::Losses, loss_id);
        self.store.commit(batch).await?;

        info!(loss_id = %loss_id, movements = deductions.len(), "Loss deleted, stock restored");
        Ok(loss)
    }

    // =========================================================================
    // Purchase Orders
    // =========================================================================

    /// Marks a pending order received and brings its lines into stock.
    ///
    /// ## Errors
    /// - `InvalidState` if the order is already received (also when another
    ///   receipt wins the race inside the commit)
    pub async fn receive_purchase_order(&self, order_id: &str) -> DbResult<PurchaseOrder> {
        let mut order = self.orders.require(order_id).await?;
        if order.is_received() {
            return Err(CoreError::invalid_state(
                "Purchase order",
                order_id,
                PurchaseStatus::Received.as_str(),
                "receive",
            )
            .into());
        }

        let received_at = Utc::now();
        let mut batch = WriteBatch::new();
        batch.guard(
            Collection::PurchaseOrders,
            order_id,
            "status",
            PurchaseStatus::Pending.as_str(),
        );
        let increments = StockLedger::receive(&mut batch, &order.items);
        batch.merge(
            Collection::PurchaseOrders,
            order_id,
            json!({
                "status": PurchaseStatus::Received,
                "receivedAt": received_at,
            }),
        );
        self.store.commit(batch).await?;

        order.status = PurchaseStatus::Received;
        order.received_at = Some(received_at);
        info!(order_id = %order_id, increments, "Purchase order received");
        Ok(order)
    }

    /// Deletes the order record. Stock brought in by a receipt stays.
    ///
    /// The attached invoice is released afterwards; a release failure is
    /// logged and does not fail the deletion.
    pub async fn delete_purchase_order(&self, order_id: &str) -> DbResult<PurchaseOrder> {
        let order = self.orders.require(order_id).await?;

        let mut batch = WriteBatch::new();
        batch.delete(Collection::PurchaseOrders, order_id);
        self.store.commit(batch).await?;
        info!(order_id = %order_id, received = order.is_received(), "Purchase order deleted");

        if let Some(invoice) = &order.invoice {
            if let Err(e) = self.invoices.release(invoice).await {
                warn!(order_id = %order_id, key = %invoice.key, error = %e, "Could not release invoice");
            }
        }
        Ok(order)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn prepare_sale(sale: NewSale, catalog: &Catalog) -> DbResult<(Sale, Deductions)> {
    sale.validate()?;
    let deductions = resolve_sale_lines(&sale.items, catalog)?;
    StockLedger::ensure_known(&deductions, catalog)?;

    let record = Sale {
        id: new_id(),
        items: sale.items,
        total_price: sale.total_price,
        sale_date: sale.sale_date,
        created_at: Utc::now(),
        source: sale.source,
        bill_no: sale.bill_no,
        had_discount: sale.had_discount,
        deductions: Some(deductions.to_movements()),
    };
    Ok((record, deductions))
}

/// Deductions of a legacy sale, against the current catalog.
fn recompute_sale(items: &[SaleLine], catalog: &Catalog) -> Deductions {
    let mut total = Deductions::new();
    for item in items {
        match catalog.product(&item.product_id) {
            Some(product) => total.merge(&resolve_deductions(product, item.quantity)),
            None => warn!(
                product_id = %item.product_id,
                name = %item.name,
                "Product gone, its stock cannot be restored"
            ),
        }
    }
    total
}

fn recompute_loss(loss: &Loss, catalog: &Catalog) -> Deductions {
    match loss.kind {
        LossKind::Ingredient => {
            let mut deductions = Deductions::new();
            deductions.add(&loss.target_id, loss.quantity);
            deductions
        }
        LossKind::Product => match catalog.product(&loss.target_id) {
            Some(product) => resolve_deductions(product, loss.quantity),
            None => {
                warn!(loss_id = %loss.id, product_id = %loss.target_id, "Product gone, its stock cannot be restored");
                Deductions::new()
            }
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
