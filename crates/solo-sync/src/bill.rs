//! # Bill Assembly
//!
//! Turns raw POS lines into bills ready to be recorded as sales.
//!
//! ## Line Arithmetic
//! ```text
//! net quantity = max(0, sold − returned)
//! line total   = (unit price × net quantity + extra charge) × discount / 100
//!                (a line with no net quantity contributes nothing)
//!
//! discount missing or unparsable → 100 (no discount)
//! discount < 100                 → bill flagged had_discount
//! ```
//!
//! Stock is deducted on the sold quantity; returns only lower the total.
//!
//! ## Skips
//! - product name not in the catalog (case-insensitive, trimmed) → unmatched
//! - no bill number, missing or non-positive quantity, missing price → invalid
//!
//! Bills left with no line are dropped.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use solo_core::draft::NewSale;
use solo_core::{Catalog, Money, SaleLine, SaleSource};

use crate::relay::RawSaleLine;

const FULL_PRICE: Decimal = Decimal::ONE_HUNDRED;

/// One external bill, grouped from its lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub bill_no: String,
    pub sale_date: DateTime<Utc>,
    pub items: Vec<SaleLine>,
    pub total: Money,
    pub had_discount: bool,
}

impl Bill {
    pub fn into_sale(self) -> NewSale {
        NewSale {
            items: self.items,
            total_price: self.total.rounded(),
            sale_date: self.sale_date,
            source: SaleSource::ExternalPos,
            bill_no: Some(self.bill_no),
            had_discount: self.had_discount,
        }
    }
}

/// Bills in first-seen order, plus what was left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grouping {
    pub bills: Vec<Bill>,
    pub unmatched_lines: usize,
    pub invalid_lines: usize,
}

/// Contribution of one line to its bill total.
pub fn line_total(
    unit_price: Decimal,
    quantity: Decimal,
    returned: Decimal,
    extra: Decimal,
    discount_percent: Decimal,
) -> Money {
    let net = (quantity - returned).max(Decimal::ZERO);
    if net.is_zero() {
        return Money::zero();
    }
    Money::new((unit_price * net + extra) * discount_percent / FULL_PRICE)
}

/// Business date of a bill from the POS operation timestamp (UTC).
pub fn parse_oper_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Groups raw lines into bills against the current catalog.
///
/// `now` dates bills whose first line has no usable timestamp.
pub fn group_bills(lines: &[RawSaleLine], catalog: &Catalog, now: DateTime<Utc>) -> Grouping {
    let mut grouping = Grouping::default();

    for line in lines {
        let Some(bill_no) = line.bill_no.as_deref().map(str::trim).filter(|b| !b.is_empty()) else {
            warn!(product = ?line.goods_name, "Line without bill number ignored");
            grouping.invalid_lines += 1;
            continue;
        };

        let index = match grouping.bills.iter().position(|b| b.bill_no == bill_no) {
            Some(index) => index,
            None => {
                let sale_date = match line.oper_date.as_deref().map(|d| (d, parse_oper_date(d))) {
                    Some((_, Some(at))) => at,
                    Some((raw, None)) => {
                        warn!(bill_no = %bill_no, oper_date = %raw, "Invalid operation date, using now");
                        now
                    }
                    None => now,
                };
                grouping.bills.push(Bill {
                    bill_no: bill_no.to_string(),
                    sale_date,
                    items: Vec::new(),
                    total: Money::zero(),
                    had_discount: false,
                });
                grouping.bills.len() - 1
            }
        };
        let bill = &mut grouping.bills[index];

        let name = line.goods_name.as_deref().unwrap_or("").trim();
        let Some(product) = catalog.product_by_name(name) else {
            warn!(bill_no = %bill_no, product = %name, "External product not in catalog, line ignored");
            grouping.unmatched_lines += 1;
            continue;
        };

        let discount = line.discount.unwrap_or(FULL_PRICE);
        if discount < FULL_PRICE {
            bill.had_discount = true;
        }

        let (quantity, price) = match (line.num_num, line.num_price) {
            (Some(quantity), Some(price)) if quantity > Decimal::ZERO => (quantity, price),
            _ => {
                warn!(bill_no = %bill_no, product = %name, "Invalid quantity or price, line ignored");
                grouping.invalid_lines += 1;
                continue;
            }
        };
        let returned = line.num_back.unwrap_or(Decimal::ZERO);
        let extra = line.num_price_add.unwrap_or(Decimal::ZERO);

        bill.total += line_total(price, quantity, returned, extra, discount);
        bill.items.push(SaleLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            quantity,
            price: Money::new(price),
            returned: (!returned.is_zero()).then_some(returned),
        });
    }

    grouping.bills.retain(|bill| !bill.items.is_empty());
    grouping
}
