//! # Domain Types
//!
//! Core domain types used throughout the back-office.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalog                 Events (history)          Back-office          │
//! │  ─────────────────       ─────────────────         ──────────────────   │
//! │  Ingredient (ledger)     Sale ─ SaleLine           Supplier             │
//! │  Product                 Loss                      PurchaseOrder        │
//! │   └─ Consumption         StockMovement (snapshot)  Charge               │
//! │       ├─ Recipe                                     Employee / Absence  │
//! │       └─ Linked                                     SalaryPayment       │
//! │                                                     DailyPayment        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! History records copy names, prices and units at creation time. Later
//! catalog edits never rewrite a past sale, loss or purchase order.
//!
//! Field names serialize in camelCase, matching the stored documents.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{require_non_negative, require_positive, require_text};

// =============================================================================
// Ingredient
// =============================================================================

/// A stock item. Its `quantity` is the Stock Ledger entry for this id.
///
/// The quantity may go negative; the ledger enforces no floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    #[ts(type = "string")]
    pub quantity: Decimal,
    pub unit: String,
    /// Cost of one unit.
    #[serde(default)]
    pub cost: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Ingredient {
    /// Creates an ingredient with an opening stock level.
    pub fn new(
        name: &str,
        quantity: Decimal,
        unit: &str,
        cost: Money,
    ) -> CoreResult<Self> {
        require_text("name", name)?;
        require_text("unit", unit)?;
        require_non_negative("cost", cost.amount())?;
        Ok(Ingredient {
            id: new_id(),
            name: name.trim().to_string(),
            quantity,
            unit: unit.trim().to_string(),
            cost,
            created_at: Utc::now(),
        })
    }
}

// =============================================================================
// Product
// =============================================================================

/// Product category.
///
/// Pizza, Entrée and Dessert are made from a recipe; the others consume a
/// single stock item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ProductType {
    Pizza,
    #[serde(rename = "Entrée")]
    Entree,
    Dessert,
    Boisson,
    Autre,
}

impl ProductType {
    pub const ALL: [ProductType; 5] = [
        ProductType::Pizza,
        ProductType::Entree,
        ProductType::Dessert,
        ProductType::Boisson,
        ProductType::Autre,
    ];

    /// True for types whose products carry a multi-ingredient recipe.
    pub fn has_recipe(&self) -> bool {
        matches!(
            self,
            ProductType::Pizza | ProductType::Entree | ProductType::Dessert
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Pizza => "Pizza",
            ProductType::Entree => "Entrée",
            ProductType::Dessert => "Dessert",
            ProductType::Boisson => "Boisson",
            ProductType::Autre => "Autre",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pizza" => Ok(ProductType::Pizza),
            "entrée" | "entree" => Ok(ProductType::Entree),
            "dessert" => Ok(ProductType::Dessert),
            "boisson" => Ok(ProductType::Boisson),
            "autre" => Ok(ProductType::Autre),
            _ => Err(ValidationError::NotAllowed {
                field: "type".to_string(),
                allowed: ProductType::ALL.iter().map(|t| t.to_string()).collect(),
            }),
        }
    }
}

/// One ingredient of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RecipeLine {
    pub ingredient_id: String,
    /// Ingredient name at the time the recipe was written.
    #[serde(default)]
    pub name: String,
    #[ts(type = "string")]
    pub quantity: Decimal,
    #[serde(default)]
    pub unit: String,
}

/// How selling one unit of a product consumes stock.
///
/// Exactly one shape exists per product; switching type replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "shape", rename_all = "camelCase")]
pub enum Consumption {
    /// Weighted set of ingredients (Pizza, Entrée, Dessert).
    Recipe { lines: Vec<RecipeLine> },

    /// A fixed multiple of one stock item (Boisson, Autre).
    #[serde(rename_all = "camelCase")]
    Linked {
        ingredient_id: String,
        #[serde(default = "one")]
        #[ts(type = "string")]
        quantity_per_unit: Decimal,
    },
}

fn one() -> Decimal {
    Decimal::ONE
}

impl Consumption {
    pub fn linked(ingredient_id: impl Into<String>, quantity_per_unit: Decimal) -> Self {
        Consumption::Linked {
            ingredient_id: ingredient_id.into(),
            quantity_per_unit,
        }
    }

    /// Ids of every ingredient this shape may touch.
    pub fn ingredient_ids(&self) -> Vec<&str> {
        match self {
            Consumption::Recipe { lines } => {
                lines.iter().map(|l| l.ingredient_id.as_str()).collect()
            }
            Consumption::Linked { ingredient_id, .. } => vec![ingredient_id.as_str()],
        }
    }

    fn validate_for(&self, product_type: ProductType) -> CoreResult<()> {
        match (self, product_type.has_recipe()) {
            (Consumption::Recipe { lines }, true) => {
                if lines.is_empty() {
                    return Err(ValidationError::empty("recipe").into());
                }
                for line in lines {
                    require_text("recipe ingredient", &line.ingredient_id)?;
                    require_positive("recipe quantity", line.quantity)?;
                }
                Ok(())
            }
            (
                Consumption::Linked {
                    ingredient_id,
                    quantity_per_unit,
                },
                false,
            ) => {
                require_text("linked ingredient", ingredient_id)?;
                require_positive("linked quantity", *quantity_per_unit)?;
                Ok(())
            }
            (_, true) => Err(ValidationError::required("recipe").into()),
            (_, false) => Err(ValidationError::required("linked ingredient").into()),
        }
    }
}

/// A product on the menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: Money,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub consumption: Consumption,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Creates a product, rejecting a consumption shape that does not match
    /// the type.
    ///
    /// ## Rules
    /// - Recipe types need a non-empty recipe with positive quantities
    /// - Other types need a linked ingredient with a positive quantity
    pub fn new(
        name: &str,
        price: Money,
        product_type: ProductType,
        consumption: Consumption,
    ) -> CoreResult<Self> {
        require_text("name", name)?;
        require_non_negative("price", price.amount())?;
        consumption.validate_for(product_type)?;
        Ok(Product {
            id: new_id(),
            name: name.trim().to_string(),
            price,
            product_type,
            consumption,
            created_at: Utc::now(),
        })
    }

    /// Switches the product type together with its consumption shape.
    ///
    /// The old shape is dropped; nothing of it survives the switch.
    pub fn change_type(
        &mut self,
        product_type: ProductType,
        consumption: Consumption,
    ) -> CoreResult<()> {
        consumption.validate_for(product_type)?;
        self.product_type = product_type;
        self.consumption = consumption;
        Ok(())
    }

    /// Re-checks the invariants of a product edited field by field.
    pub fn validate(&self) -> CoreResult<()> {
        require_text("name", &self.name)?;
        require_non_negative("price", self.price.amount())?;
        self.consumption.validate_for(self.product_type)
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// A signed quantity applied to one ingredient by one business event.
///
/// Sales and losses keep the list of movements they applied so deleting them
/// restores exactly what was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub ingredient_id: String,
    /// Quantity removed from stock (positive = deducted).
    #[ts(type = "string")]
    pub quantity: Decimal,
}

// =============================================================================
// Sale
// =============================================================================

/// Where a sale came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleSource {
    #[default]
    Manual,
    CsvImport,
    ExternalPos,
}

/// A line item in a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name: String,
    #[ts(type = "string")]
    pub quantity: Decimal,
    /// Unit price at time of sale (frozen).
    pub price: Money,
    /// Units handed back (external imports only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub returned: Option<Decimal>,
}

impl SaleLine {
    /// Quantity actually kept by the customer.
    pub fn net_quantity(&self) -> Decimal {
        let returned = self.returned.unwrap_or_default();
        (self.quantity - returned).max(Decimal::ZERO)
    }

    /// Naive line total at the snapshot price.
    pub fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

/// A recorded sale (an "order" in the dashboard).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub items: Vec<SaleLine>,
    /// Stored total; may differ from the sum of lines.
    pub total_price: Money,
    /// Business date the sale is reported on.
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub source: SaleSource,
    /// External bill number (imported sales only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bill_no: Option<String>,
    #[serde(default)]
    pub had_discount: bool,
    /// Stock movements applied when the sale was committed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deductions: Option<Vec<StockMovement>>,
}

// =============================================================================
// Loss
// =============================================================================

/// What a loss was declared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum LossKind {
    Product,
    Ingredient,
}

impl fmt::Display for LossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LossKind::Product => f.write_str("product"),
            LossKind::Ingredient => f.write_str("ingredient"),
        }
    }
}

/// Waste, breakage or spoilage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Loss {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LossKind,
    pub target_id: String,
    /// Target name at declaration time (frozen).
    pub name: String,
    #[ts(type = "string")]
    pub quantity: Decimal,
    /// Ingredient unit (ingredient losses only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deductions: Option<Vec<StockMovement>>,
}

// =============================================================================
// Purchasing
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub contact: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Supplier {
    pub fn new(name: &str, contact: &str) -> CoreResult<Self> {
        require_text("name", name)?;
        Ok(Supplier {
            id: new_id(),
            name: name.trim().to_string(),
            contact: contact.trim().to_string(),
            created_at: Utc::now(),
        })
    }
}

/// Receipt axis of a purchase order. One-way: pending → received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    #[default]
    Pending,
    Received,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Received => "received",
        }
    }
}

/// Payment axis of a purchase order. One-way: unpaid → paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

/// A line of a purchase order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLine {
    pub ingredient_id: String,
    /// Ingredient name at order time (frozen).
    pub name: String,
    pub unit: String,
    #[ts(type = "string")]
    pub quantity: Decimal,
    pub unit_price: Money,
}

impl PurchaseLine {
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Reference to an uploaded supplier invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRef {
    /// Storage key used to release the file.
    pub key: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    pub id: String,
    pub supplier_id: String,
    /// Supplier name at order time (frozen).
    #[serde(default)]
    pub supplier_name: String,
    pub items: Vec<PurchaseLine>,
    /// Stored total; may be overridden from the sum of lines.
    pub total_cost: Money,
    #[serde(default)]
    pub status: PurchaseStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice: Option<InvoiceRef>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl PurchaseOrder {
    pub fn is_received(&self) -> bool {
        self.status == PurchaseStatus::Received
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// Sum of line totals, ignoring any override.
    pub fn computed_total(&self) -> Money {
        self.items.iter().map(PurchaseLine::line_total).sum()
    }
}

// =============================================================================
// Charges
// =============================================================================

/// Tag on charges generated by another workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ChargeKind {
    Salary,
}

/// An operating expense (rent, energy, salaries...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Charge {
    pub id: String,
    pub name: String,
    pub amount: Money,
    /// Declaration date.
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ChargeKind>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Charge {
    /// Creates a manual charge dated at noon of `date`.
    pub fn new(name: &str, amount: Money, date: NaiveDate) -> CoreResult<Self> {
        require_text("name", name)?;
        require_positive("amount", amount.amount())?;
        Ok(Charge {
            id: new_id(),
            name: name.trim().to_string(),
            amount,
            date: business_noon(date),
            kind: None,
            created_at: Utc::now(),
        })
    }
}

// =============================================================================
// Payroll
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub monthly_salary: Money,
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[serde(default = "active_by_default")]
    pub active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

fn active_by_default() -> bool {
    true
}

impl Employee {
    pub fn new(name: &str, monthly_salary: Money, start_date: NaiveDate) -> CoreResult<Self> {
        require_text("name", name)?;
        require_positive("monthly salary", monthly_salary.amount())?;
        Ok(Employee {
            id: new_id(),
            name: name.trim().to_string(),
            monthly_salary,
            start_date,
            active: true,
            created_at: Utc::now(),
        })
    }
}

/// A calendar month, rendered `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError::OutOfRange {
                field: "month".to_string(),
                min: "1".to_string(),
                max: "12".to_string(),
            });
        }
        Ok(MonthKey { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        MonthKey {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ValidationError::format("month", format!("expected YYYY-MM, got '{}'", s));
        let (year, month) = s.trim().split_once('-').ok_or_else(bad)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(bad());
        }
        let year = year.parse::<i32>().map_err(|_| bad())?;
        let month = month.parse::<u32>().map_err(|_| bad())?;
        MonthKey::new(year, month)
    }
}

impl TryFrom<String> for MonthKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

/// Days an employee missed in a month (0..=26).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Absence {
    pub id: String,
    pub employee_id: String,
    #[ts(as = "String")]
    pub month: MonthKey,
    #[ts(type = "string")]
    pub days: Decimal,
}

/// Computed pay for one employee in one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalaryLine {
    pub employee_id: String,
    pub employee_name: String,
    pub monthly_salary: Money,
    #[ts(type = "string")]
    pub absence_days: Decimal,
    pub deduction: Money,
    pub final_salary: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalaryPayment {
    pub id: String,
    #[ts(as = "String")]
    pub month: MonthKey,
    pub lines: Vec<SalaryLine>,
    pub total_amount: Money,
    #[ts(as = "String")]
    pub payment_date: DateTime<Utc>,
    /// Charge generated with this payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge_id: Option<String>,
}

// =============================================================================
// Daily cash declaration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DailyPayment {
    pub id: String,
    /// Unique per date.
    #[ts(as = "String")]
    pub date: NaiveDate,
    /// Card terminal (TPE) total.
    pub tpe: Money,
    /// Delivery platform digital payouts.
    pub glovo: Money,
    /// Cash collected by delivery riders.
    #[serde(default)]
    pub glovo_cash: Money,
    pub total_sales: Money,
    /// total_sales − (tpe + glovo). Not clamped.
    pub expected_cash: Money,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Helpers
// =============================================================================

/// Generates a new entity id (UUID v4).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Noon UTC on `date`.
///
/// Business dates are pinned to midday so a timezone shift never moves a
/// record to the neighbouring day.
pub fn business_noon(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, qty: i64) -> RecipeLine {
        RecipeLine {
            ingredient_id: id.to_string(),
            name: id.to_string(),
            quantity: Decimal::from(qty),
            unit: "g".to_string(),
        }
    }

    #[test]
    fn test_product_shape_must_match_type() {
        let recipe = Consumption::Recipe {
            lines: vec![line("flour", 2)],
        };
        assert!(Product::new("Margherita", Money::from_units(10), ProductType::Pizza, recipe.clone()).is_ok());
        assert!(Product::new("Coca", Money::from_units(2), ProductType::Boisson, recipe).is_err());

        let linked = Consumption::linked("can", Decimal::ONE);
        assert!(Product::new("Coca", Money::from_units(2), ProductType::Boisson, linked.clone()).is_ok());
        assert!(Product::new("Calzone", Money::from_units(9), ProductType::Pizza, linked).is_err());
    }

    #[test]
    fn test_empty_recipe_and_zero_link_rejected() {
        let empty = Consumption::Recipe { lines: vec![] };
        assert!(Product::new("Tiramisu", Money::from_units(5), ProductType::Dessert, empty).is_err());

        let zero = Consumption::linked("can", Decimal::ZERO);
        assert!(Product::new("Coca", Money::from_units(2), ProductType::Boisson, zero).is_err());
    }

    #[test]
    fn test_change_type_replaces_shape() {
        let mut product = Product::new(
            "Coca",
            Money::from_units(2),
            ProductType::Boisson,
            Consumption::linked("can", Decimal::ONE),
        )
        .unwrap();

        product
            .change_type(
                ProductType::Dessert,
                Consumption::Recipe {
                    lines: vec![line("sugar", 1)],
                },
            )
            .unwrap();

        assert_eq!(product.product_type, ProductType::Dessert);
        assert_eq!(product.consumption.ingredient_ids(), vec!["sugar"]);
    }

    #[test]
    fn test_linked_quantity_defaults_to_one() {
        let json = r#"{"shape":"linked","ingredientId":"can"}"#;
        let consumption: Consumption = serde_json::from_str(json).unwrap();
        assert_eq!(consumption, Consumption::linked("can", Decimal::ONE));
    }

    #[test]
    fn test_product_type_serializes_accented_name() {
        let json = serde_json::to_string(&ProductType::Entree).unwrap();
        assert_eq!(json, "\"Entrée\"");
        assert_eq!("entrée".parse::<ProductType>().unwrap(), ProductType::Entree);
        assert!("Sandwich".parse::<ProductType>().is_err());
    }

    #[test]
    fn test_month_key() {
        let key: MonthKey = "2024-03".parse().unwrap();
        assert_eq!(key.to_string(), "2024-03");
        assert!("2024-13".parse::<MonthKey>().is_err());
        assert!("03/2024".parse::<MonthKey>().is_err());

        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"2024-03\"");
    }

    #[test]
    fn test_net_quantity_floors_at_zero() {
        let sale_line = SaleLine {
            product_id: "p".into(),
            name: "Pizza".into(),
            quantity: Decimal::from(2),
            price: Money::from_units(10),
            returned: Some(Decimal::from(3)),
        };
        assert_eq!(sale_line.net_quantity(), Decimal::ZERO);
    }

    #[test]
    fn test_business_noon() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 21).unwrap();
        assert_eq!(business_noon(date).to_rfc3339(), "2025-10-21T12:00:00+00:00");
    }
}
