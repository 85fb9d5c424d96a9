//! # solo-core: Pure Business Logic for the Solo Back-Office
//!
//! This crate holds the inventory-consistency rules of the restaurant
//! back-office as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Solo Back-Office Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Dashboard / CLI binaries                        │   │
//! │  │    Orders ──► Losses ──► Purchases ──► Payroll ──► KPIs         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │  solo-sync: External Sales Reconciler (relay HTTP client)       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │  solo-db: document store, Stock Ledger, Transaction Coordinator │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ solo-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  types   │ │  recipe  │ │   kpi    │ │  import  │          │   │
//! │  │   │  money   │ │ catalog  │ │ payroll  │ │  export  │          │   │
//! │  │   │  error   │ │  draft   │ │ finance  │ │  period  │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO DATABASE • NO NETWORK • PURE FUNCTIONS                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Ingredient, Product, Sale, Loss, ...)
//! - [`money`] - Exact decimal money
//! - [`error`] - Domain error types and the shared [`ErrorKind`]
//! - [`validation`] - Input rules
//! - [`catalog`] - Id and name lookup over products and ingredients
//! - [`recipe`] - Recipe Resolver: product × quantity → stock deductions
//! - [`draft`] - Order, recipe and purchase drafts
//! - [`kpi`] - KPI Aggregator
//! - [`period`] - Reporting date ranges
//! - [`payroll`] - Salary computation
//! - [`finance`] - Daily cash declaration
//! - [`import`] / [`export`] - CSV files
//!
//! ## Example Usage
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use solo_core::{Consumption, Ingredient, Money, Product, ProductType};
//! use solo_core::recipe::resolve_deductions;
//!
//! let can = Ingredient::new("Canette Coca", Decimal::from(24), "u", Money::from_cents(60)).unwrap();
//! let coca = Product::new(
//!     "Coca",
//!     Money::from_units(2),
//!     ProductType::Boisson,
//!     Consumption::linked(can.id.clone(), Decimal::ONE),
//! )
//! .unwrap();
//!
//! let deductions = resolve_deductions(&coca, Decimal::from(3));
//! assert_eq!(deductions.get(&can.id), Some(Decimal::from(3)));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod draft;
pub mod error;
pub mod export;
pub mod finance;
pub mod import;
pub mod kpi;
pub mod money;
pub mod payroll;
pub mod period;
pub mod recipe;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use catalog::Catalog;
pub use error::{CoreError, CoreResult, ErrorKind, ImportError, RowError, ValidationError};
pub use money::Money;
pub use recipe::Deductions;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

use rust_decimal::Decimal;

/// Working days in a payroll month; the daily rate is salary / 26.
pub const WORKING_DAYS_PER_MONTH: u32 = 26;

/// Ingredients below this quantity are reported as low stock.
pub const LOW_STOCK_THRESHOLD: Decimal = Decimal::TEN;

/// Length of the top-pizza and top-drink rankings.
pub const TOP_PRODUCTS_LIMIT: usize = 5;
