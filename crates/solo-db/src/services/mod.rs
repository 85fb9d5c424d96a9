//! # Back-Office Services
//!
//! One service per dashboard area, all sharing a [`SharedStore`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Backoffice                                                             │
//! │  ├── catalog()      ingredients, products, CSV import/export            │
//! │  ├── transactions() sales, losses, receipts  (TransactionCoordinator)   │
//! │  ├── purchasing()   suppliers, purchase orders, invoices                │
//! │  ├── payroll()      employees, absences, salary runs                    │
//! │  ├── finance()      charges, daily cash declarations                    │
//! │  └── reports()      sales history, KPIs, low stock                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Services read through repositories and write through batches; none of
//! them caches collections between calls.

pub mod catalog;
pub mod finance;
pub mod payroll;
pub mod purchasing;
pub mod reports;

use std::sync::Arc;

use crate::coordinator::TransactionCoordinator;
use crate::invoice::InvoiceStorage;
use crate::store::SharedStore;

pub use catalog::{CatalogService, IngredientEdit};
pub use finance::FinanceService;
pub use payroll::{ChargeCleanup, PayrollService};
pub use purchasing::{PurchaseOrderEdit, PurchasingService};
pub use reports::ReportService;

/// Entry point handing out every service over one store.
#[derive(Clone)]
pub struct Backoffice {
    store: SharedStore,
    coordinator: TransactionCoordinator,
    invoices: Arc<dyn InvoiceStorage>,
}

impl Backoffice {
    pub fn new(store: SharedStore, invoices: Arc<dyn InvoiceStorage>) -> Self {
        Backoffice {
            coordinator: TransactionCoordinator::new(store.clone(), invoices.clone()),
            store,
            invoices,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn transactions(&self) -> &TransactionCoordinator {
        &self.coordinator
    }

    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(self.store.clone(), self.coordinator.clone())
    }

    pub fn purchasing(&self) -> PurchasingService {
        PurchasingService::new(
            self.store.clone(),
            self.coordinator.clone(),
            self.invoices.clone(),
        )
    }

    pub fn payroll(&self) -> PayrollService {
        PayrollService::new(self.store.clone())
    }

    pub fn finance(&self) -> FinanceService {
        FinanceService::new(self.store.clone())
    }

    pub fn reports(&self) -> ReportService {
        ReportService::new(self.store.clone())
    }
}
