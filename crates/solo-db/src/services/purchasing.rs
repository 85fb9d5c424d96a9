//! # Purchasing Service
//!
//! Suppliers and purchase orders.
//!
//! ## Order Axes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  status          pending ──receive──► received   (stock moves once)     │
//! │  paymentStatus   unpaid  ──mark_paid─► paid      (stamps paidAt)        │
//! │                                                                         │
//! │  Edits:  pending  → supplier, lines, total, payment, invoice            │
//! │          received → total and invoice only                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use solo_core::draft::PurchaseDraft;
use solo_core::{
    CoreError, Ingredient, Money, PaymentStatus, PurchaseOrder, PurchaseStatus, Supplier,
    ValidationError,
};

use crate::coordinator::TransactionCoordinator;
use crate::error::DbResult;
use crate::invoice::InvoiceStorage;
use crate::repository::Repository;
use crate::store::{Collection, SharedStore, WriteBatch};

/// Changes to apply to a purchase order. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderEdit {
    pub supplier_id: Option<String>,
    pub lines: Option<PurchaseDraft>,
    pub total_cost: Option<Money>,
    pub payment_status: Option<PaymentStatus>,
}

impl PurchaseOrderEdit {
    fn touches_receipt_locked_fields(&self) -> bool {
        self.supplier_id.is_some() || self.lines.is_some() || self.payment_status.is_some()
    }
}

#[derive(Clone)]
pub struct PurchasingService {
    store: SharedStore,
    coordinator: TransactionCoordinator,
    invoices: Arc<dyn InvoiceStorage>,
    suppliers: Repository<Supplier>,
    orders: Repository<PurchaseOrder>,
    ingredients: Repository<Ingredient>,
}

impl PurchasingService {
    pub fn new(
        store: SharedStore,
        coordinator: TransactionCoordinator,
        invoices: Arc<dyn InvoiceStorage>,
    ) -> Self {
        PurchasingService {
            suppliers: Repository::new(store.clone()),
            orders: Repository::new(store.clone()),
            ingredients: Repository::new(store.clone()),
            store,
            coordinator,
            invoices,
        }
    }

    // =========================================================================
    // Suppliers
    // =========================================================================

    pub async fn list_suppliers(&self) -> DbResult<Vec<Supplier>> {
        self.suppliers.list().await
    }

    pub async fn create_supplier(&self, name: &str, contact: &str) -> DbResult<Supplier> {
        let supplier = Supplier::new(name, contact)?;
        self.suppliers.create(&supplier).await?;
        info!(supplier_id = %supplier.id, name = %supplier.name, "Supplier created");
        Ok(supplier)
    }

    pub async fn update_supplier(&self, id: &str, name: &str, contact: &str) -> DbResult<Supplier> {
        let current = self.suppliers.require(id).await?;
        let checked = Supplier::new(name, contact)?;
        let supplier = Supplier {
            id: current.id,
            created_at: current.created_at,
            ..checked
        };
        self.suppliers.save(&supplier).await?;
        Ok(supplier)
    }

    /// Orders keep their supplier name snapshot after the supplier is gone.
    pub async fn delete_supplier(&self, id: &str) -> DbResult<bool> {
        self.suppliers.delete(id).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    pub async fn list_orders(&self) -> DbResult<Vec<PurchaseOrder>> {
        self.orders.list().await
    }

    pub async fn get_order(&self, id: &str) -> DbResult<PurchaseOrder> {
        self.orders.require(id).await
    }

    /// Creates a pending order from a draft.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown supplier
    /// - `UnknownIngredient` when a line points at a deleted ingredient
    /// - `Validation` for an empty draft or a negative total
    pub async fn create_order(
        &self,
        supplier_id: &str,
        draft: PurchaseDraft,
        total_override: Option<Money>,
        payment_status: PaymentStatus,
    ) -> DbResult<PurchaseOrder> {
        let supplier = self.suppliers.require(supplier_id).await?;
        self.ensure_ingredients(&draft).await?;
        let order = draft.into_order(&supplier, total_override, payment_status)?;
        self.orders.create(&order).await?;
        info!(
            order_id = %order.id,
            supplier = %order.supplier_name,
            total = %order.total_cost,
            lines = order.items.len(),
            "Purchase order created"
        );
        Ok(order)
    }

    /// Applies an edit, respecting what a received order still allows.
    pub async fn update_order(&self, id: &str, edit: PurchaseOrderEdit) -> DbResult<PurchaseOrder> {
        let mut order = self.orders.require(id).await?;
        if order.is_received() && edit.touches_receipt_locked_fields() {
            return Err(CoreError::invalid_state(
                "Purchase order",
                id,
                PurchaseStatus::Received.as_str(),
                "edit lines, supplier or payment",
            )
            .into());
        }

        if let Some(supplier_id) = &edit.supplier_id {
            let supplier = self.suppliers.require(supplier_id).await?;
            order.supplier_id = supplier.id;
            order.supplier_name = supplier.name;
        }
        if let Some(lines) = edit.lines {
            if lines.lines.is_empty() {
                return Err(ValidationError::empty("items").into());
            }
            self.ensure_ingredients(&lines).await?;
            order.total_cost = lines.total();
            order.items = lines.lines;
        }
        if let Some(total) = edit.total_cost {
            if total.is_negative() {
                return Err(ValidationError::non_negative("total cost").into());
            }
            order.total_cost = total;
        }
        if let Some(payment) = edit.payment_status {
            if order.is_paid() && payment == PaymentStatus::Unpaid {
                return Err(CoreError::invalid_state("Purchase order", id, "paid", "mark unpaid").into());
            }
            if payment == PaymentStatus::Paid && order.paid_at.is_none() {
                order.paid_at = Some(Utc::now());
            }
            order.payment_status = payment;
        }

        let mut batch = WriteBatch::new();
        batch.guard(Collection::PurchaseOrders, id, "status", order.status.as_str());
        batch.set(&order)?;
        self.store.commit(batch).await?;

        info!(order_id = %id, "Purchase order updated");
        Ok(order)
    }

    /// One-way `unpaid → paid`.
    pub async fn mark_paid(&self, id: &str) -> DbResult<PurchaseOrder> {
        let mut order = self.orders.require(id).await?;
        if order.is_paid() {
            return Err(CoreError::invalid_state("Purchase order", id, "paid", "mark paid").into());
        }

        let paid_at = Utc::now();
        let mut batch = WriteBatch::new();
        batch
            .guard(Collection::PurchaseOrders, id, "paymentStatus", "unpaid")
            .merge(
                Collection::PurchaseOrders,
                id,
                json!({ "paymentStatus": PaymentStatus::Paid, "paidAt": paid_at }),
            );
        self.store.commit(batch).await?;

        order.payment_status = PaymentStatus::Paid;
        order.paid_at = Some(paid_at);
        info!(order_id = %id, "Purchase order paid");
        Ok(order)
    }

    /// Stores an invoice file and attaches it, replacing any previous one.
    pub async fn attach_invoice(
        &self,
        id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> DbResult<PurchaseOrder> {
        let mut order = self.orders.require(id).await?;
        let invoice = self.invoices.store(file_name, bytes).await?;

        if let Err(e) = self
            .store
            .update(Collection::PurchaseOrders, id, json!({ "invoice": invoice }))
            .await
        {
            if let Err(release) = self.invoices.release(&invoice).await {
                warn!(key = %invoice.key, error = %release, "Could not release orphan invoice");
            }
            return Err(e);
        }

        if let Some(previous) = order.invoice.replace(invoice) {
            if let Err(e) = self.invoices.release(&previous).await {
                warn!(order_id = %id, key = %previous.key, error = %e, "Could not release replaced invoice");
            }
        }
        info!(order_id = %id, "Invoice attached");
        Ok(order)
    }

    /// New pending, unpaid order with the lines of an existing one.
    pub async fn reorder(&self, id: &str) -> DbResult<PurchaseOrder> {
        let source = self.orders.require(id).await?;
        let draft = PurchaseDraft::reorder(&source);
        self.create_order(&source.supplier_id, draft, None, PaymentStatus::Unpaid)
            .await
    }

    pub async fn receive(&self, id: &str) -> DbResult<PurchaseOrder> {
        self.coordinator.receive_purchase_order(id).await
    }

    pub async fn delete_order(&self, id: &str) -> DbResult<PurchaseOrder> {
        self.coordinator.delete_purchase_order(id).await
    }

    async fn ensure_ingredients(&self, draft: &PurchaseDraft) -> DbResult<()> {
        for line in &draft.lines {
            if self.ingredients.get(&line.ingredient_id).await?.is_none() {
                return Err(CoreError::UnknownIngredient(line.ingredient_id.clone()).into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::testing::MemoryInvoices;
    use crate::testing::Kitchen;
    use rust_decimal::Decimal;
    use solo_core::ErrorKind;

    struct Setup {
        kitchen: Kitchen,
        invoices: Arc<MemoryInvoices>,
        purchasing: PurchasingService,
        supplier: Supplier,
    }

    async fn setup() -> Setup {
        let kitchen = Kitchen::memory().await;
        let invoices = Arc::new(MemoryInvoices::default());
        let coordinator = TransactionCoordinator::new(kitchen.store.clone(), invoices.clone());
        let purchasing = PurchasingService::new(kitchen.store.clone(), coordinator, invoices.clone());
        let supplier = purchasing.create_supplier("Metro", "contact@metro.fr").await.unwrap();
        Setup {
            kitchen,
            invoices,
            purchasing,
            supplier,
        }
    }

    fn flour_draft(kitchen: &Kitchen, qty: i64) -> PurchaseDraft {
        let mut draft = PurchaseDraft::new();
        draft
            .add_line(&kitchen.flour, Decimal::from(qty), Money::from_cents(150))
            .unwrap();
        draft
    }

    #[tokio::test]
    async fn test_create_defaults_total_and_stamps_paid() {
        let s = setup().await;
        let order = s
            .purchasing
            .create_order(&s.supplier.id, flour_draft(&s.kitchen, 20), None, PaymentStatus::Paid)
            .await
            .unwrap();
        assert_eq!(order.total_cost, Money::from_units(30));
        assert_eq!(order.status, PurchaseStatus::Pending);
        assert!(order.paid_at.is_some());

        let err = s
            .purchasing
            .create_order(&s.supplier.id, PurchaseDraft::new(), None, PaymentStatus::Unpaid)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_received_order_only_accepts_total_edits() {
        let s = setup().await;
        let order = s
            .purchasing
            .create_order(&s.supplier.id, flour_draft(&s.kitchen, 10), None, PaymentStatus::Unpaid)
            .await
            .unwrap();
        s.purchasing.receive(&order.id).await.unwrap();

        let err = s
            .purchasing
            .update_order(
                &order.id,
                PurchaseOrderEdit {
                    lines: Some(flour_draft(&s.kitchen, 99)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let edited = s
            .purchasing
            .update_order(
                &order.id,
                PurchaseOrderEdit {
                    total_cost: Some(Money::from_units(14)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.total_cost, Money::from_units(14));
        assert_eq!(edited.status, PurchaseStatus::Received);
        assert_eq!(s.kitchen.stock(&s.kitchen.flour).await, Decimal::from(110));
    }

    #[tokio::test]
    async fn test_mark_paid_is_one_way() {
        let s = setup().await;
        let order = s
            .purchasing
            .create_order(&s.supplier.id, flour_draft(&s.kitchen, 1), None, PaymentStatus::Unpaid)
            .await
            .unwrap();

        let paid = s.purchasing.mark_paid(&order.id).await.unwrap();
        assert!(paid.is_paid());
        assert!(s.purchasing.mark_paid(&order.id).await.is_err());

        let err = s
            .purchasing
            .update_order(
                &order.id,
                PurchaseOrderEdit {
                    payment_status: Some(PaymentStatus::Unpaid),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_invoice_replace_and_delete_release_files() {
        let s = setup().await;
        let order = s
            .purchasing
            .create_order(&s.supplier.id, flour_draft(&s.kitchen, 1), None, PaymentStatus::Unpaid)
            .await
            .unwrap();

        s.purchasing.attach_invoice(&order.id, "a.pdf", b"a").await.unwrap();
        let second = s.purchasing.attach_invoice(&order.id, "b.pdf", b"b").await.unwrap();
        assert_eq!(second.invoice.as_ref().unwrap().file_name, "b.pdf");
        assert_eq!(s.invoices.files.lock().await.len(), 1);

        s.purchasing.delete_order(&order.id).await.unwrap();
        assert!(s.invoices.files.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_reorder_copies_lines_as_new_pending_order() {
        let s = setup().await;
        let order = s
            .purchasing
            .create_order(&s.supplier.id, flour_draft(&s.kitchen, 7), None, PaymentStatus::Paid)
            .await
            .unwrap();
        s.purchasing.receive(&order.id).await.unwrap();

        let copy = s.purchasing.reorder(&order.id).await.unwrap();
        assert_ne!(copy.id, order.id);
        assert_eq!(copy.items, order.items);
        assert_eq!(copy.status, PurchaseStatus::Pending);
        assert_eq!(copy.payment_status, PaymentStatus::Unpaid);
        assert_eq!(s.purchasing.list_orders().await.unwrap().len(), 2);
    }
}
