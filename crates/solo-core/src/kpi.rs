//! # KPI Aggregator
//!
//! Derives period-scoped financial metrics from the event history.
//!
//! ## Inputs and Date Fields
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Collection        Filtered by            Notes                         │
//! │  ───────────────   ────────────────────   ───────────────────────────── │
//! │  sales             sale_date              stored total, not recomputed  │
//! │  purchase orders   received_at            received orders only          │
//! │  losses            created_at                                           │
//! │  charges           date                                                 │
//! │  ingredients       (never)                low stock is a live snapshot  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Derived Metrics
//! ```text
//! gross_margin      = total_sales − total_cogs
//! gross_margin_rate = gross_margin / total_sales      (0 when no sales)
//! net_profit        = gross_margin − total_charges
//! loss_rate         = total_loss_value / total_sales  (0 when no sales)
//! ```
//!
//! Costs use the *current* product definitions, not a snapshot taken at
//! sale time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::catalog::Catalog;
use crate::money::Money;
use crate::period::DateRange;
use crate::recipe::product_cost;
use crate::types::{Charge, Ingredient, Loss, LossKind, ProductType, PurchaseOrder, Sale};
use crate::{LOW_STOCK_THRESHOLD, TOP_PRODUCTS_LIMIT};

// =============================================================================
// Report Types
// =============================================================================

/// One row of a best-seller leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: String,
    /// Name as snapshotted on the first sale line seen.
    pub name: String,
    #[ts(type = "string")]
    pub quantity: Decimal,
    pub revenue: Money,
}

/// An ingredient under the low-stock threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LowStockItem {
    pub ingredient_id: String,
    pub name: String,
    #[ts(type = "string")]
    pub quantity: Decimal,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct KpiReport {
    pub total_sales: Money,
    pub total_orders: usize,
    pub average_order_value: Money,
    pub total_cogs: Money,
    pub gross_margin: Money,
    /// Ratio, e.g. 0.6 for 60%.
    #[ts(type = "string")]
    pub gross_margin_rate: Decimal,
    pub total_loss_value: Money,
    #[ts(type = "string")]
    pub loss_rate: Decimal,
    pub total_charges: Money,
    pub net_profit: Money,
    pub total_purchases: Money,
    pub total_unpaid_purchases: Money,
    #[ts(type = "string")]
    pub total_pizzas_sold: Decimal,
    pub top_pizzas: Vec<TopProduct>,
    pub top_drinks: Vec<TopProduct>,
    pub low_stock: Vec<LowStockItem>,
}

/// Everything the aggregator reads.
#[derive(Debug, Clone, Copy)]
pub struct KpiInput<'a> {
    pub sales: &'a [Sale],
    pub purchase_orders: &'a [PurchaseOrder],
    pub losses: &'a [Loss],
    pub charges: &'a [Charge],
    pub catalog: &'a Catalog,
}

// =============================================================================
// Aggregation
// =============================================================================

fn in_range(range: Option<&DateRange>, at: chrono::DateTime<chrono::Utc>) -> bool {
    range.map_or(true, |r| r.contains(at))
}

/// Computes every dashboard metric. `range = None` means all time.
pub fn compute_kpis(input: KpiInput<'_>, range: Option<&DateRange>) -> KpiReport {
    let catalog = input.catalog;

    let sales: Vec<&Sale> = input
        .sales
        .iter()
        .filter(|s| in_range(range, s.sale_date))
        .collect();

    let received: Vec<&PurchaseOrder> = input
        .purchase_orders
        .iter()
        .filter(|po| po.is_received())
        .filter(|po| match (range, po.received_at) {
            (None, _) => true,
            (Some(r), Some(at)) => r.contains(at),
            (Some(_), None) => false,
        })
        .collect();

    let losses = input
        .losses
        .iter()
        .filter(|l| in_range(range, l.created_at));

    let total_sales: Money = sales.iter().map(|s| s.total_price).sum();
    let total_orders = sales.len();

    let mut total_cogs = Money::zero();
    let mut total_pizzas_sold = Decimal::ZERO;
    for line in sales.iter().flat_map(|s| s.items.iter()) {
        if let Some(product) = catalog.product(&line.product_id) {
            total_cogs += product_cost(product, catalog).times(line.quantity);
            if product.product_type == ProductType::Pizza {
                total_pizzas_sold += line.quantity;
            }
        }
    }

    let total_loss_value: Money = losses.map(|loss| loss_value(loss, catalog)).sum();

    let total_charges: Money = input
        .charges
        .iter()
        .filter(|c| in_range(range, c.date))
        .map(|c| c.amount)
        .sum();

    let total_purchases: Money = received.iter().map(|po| po.total_cost).sum();
    let total_unpaid_purchases: Money = received
        .iter()
        .filter(|po| !po.is_paid())
        .map(|po| po.total_cost)
        .sum();

    let gross_margin = total_sales - total_cogs;
    let average_order_value = if total_orders == 0 {
        Money::zero()
    } else {
        total_sales.divided_by(Decimal::from(total_orders))
    };

    KpiReport {
        total_sales,
        total_orders,
        average_order_value,
        total_cogs,
        gross_margin,
        gross_margin_rate: gross_margin.ratio_to(total_sales),
        total_loss_value,
        loss_rate: total_loss_value.ratio_to(total_sales),
        total_charges,
        net_profit: gross_margin - total_charges,
        total_purchases,
        total_unpaid_purchases,
        total_pizzas_sold,
        top_pizzas: top_products(sales.iter().copied(), catalog, ProductType::Pizza),
        top_drinks: top_products(sales.iter().copied(), catalog, ProductType::Boisson),
        low_stock: low_stock(catalog.ingredients(), LOW_STOCK_THRESHOLD),
    }
}

/// Current cost of a declared loss.
///
/// Product losses use the product cost, ingredient losses the unit cost.
/// Targets that no longer exist are valued at zero.
pub fn loss_value(loss: &Loss, catalog: &Catalog) -> Money {
    match loss.kind {
        LossKind::Product => catalog
            .product(&loss.target_id)
            .map(|p| product_cost(p, catalog).times(loss.quantity))
            .unwrap_or_default(),
        LossKind::Ingredient => catalog
            .ingredient(&loss.target_id)
            .map(|i| i.cost.times(loss.quantity))
            .unwrap_or_default(),
    }
}

/// Best sellers of one type, by quantity.
///
/// Ties keep the order in which products were first encountered.
pub fn top_products<'a>(
    sales: impl IntoIterator<Item = &'a Sale>,
    catalog: &Catalog,
    product_type: ProductType,
) -> Vec<TopProduct> {
    let mut rows: Vec<TopProduct> = Vec::new();
    for line in sales.into_iter().flat_map(|s| s.items.iter()) {
        let matches_type = catalog
            .product(&line.product_id)
            .is_some_and(|p| p.product_type == product_type);
        if !matches_type {
            continue;
        }
        let revenue = line.price.times(line.quantity);
        match rows.iter_mut().find(|r| r.product_id == line.product_id) {
            Some(row) => {
                row.quantity += line.quantity;
                row.revenue += revenue;
            }
            None => rows.push(TopProduct {
                product_id: line.product_id.clone(),
                name: line.name.clone(),
                quantity: line.quantity,
                revenue,
            }),
        }
    }
    // sort_by is stable: equal quantities keep encounter order
    rows.sort_by(|a, b| b.quantity.cmp(&a.quantity));
    rows.truncate(TOP_PRODUCTS_LIMIT);
    rows
}

/// Ingredients strictly below `threshold`, in catalog order.
pub fn low_stock(ingredients: &[Ingredient], threshold: Decimal) -> Vec<LowStockItem> {
    ingredients
        .iter()
        .filter(|i| i.quantity < threshold)
        .map(|i| LowStockItem {
            ingredient_id: i.id.clone(),
            name: i.name.clone(),
            quantity: i.quantity,
            unit: i.unit.clone(),
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
