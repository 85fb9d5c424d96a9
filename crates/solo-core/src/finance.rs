//! # Daily Cash Declaration
//!
//! End-of-day reconciliation between recorded sales and declared payouts.
//!
//! ```text
//! expected cash = sales of the day − (card terminal + delivery platform)
//! ```
//!
//! The stored value is not clamped; a negative expected cash means more was
//! declared than sold and is worth a look. The preview shown while typing is
//! clamped at zero.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::money::Money;
use crate::types::{new_id, DailyPayment, Sale};
use crate::validation::require_non_negative;

/// Amounts declared by the manager for one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashDeclaration {
    pub date: NaiveDate,
    pub tpe: Money,
    pub glovo: Money,
    #[serde(default)]
    pub glovo_cash: Money,
}

impl CashDeclaration {
    fn validate(&self) -> CoreResult<()> {
        require_non_negative("tpe", self.tpe.amount())?;
        require_non_negative("glovo", self.glovo.amount())?;
        require_non_negative("glovo cash", self.glovo_cash.amount())?;
        Ok(())
    }
}

/// Stored totals of every sale whose business date falls on `date` (UTC).
pub fn total_sales_on<'a>(sales: impl IntoIterator<Item = &'a Sale>, date: NaiveDate) -> Money {
    sales
        .into_iter()
        .filter(|s| s.sale_date.date_naive() == date)
        .map(|s| s.total_price)
        .sum()
}

pub fn expected_cash(total_sales: Money, tpe: Money, glovo: Money) -> Money {
    total_sales - (tpe + glovo)
}

/// Preview shown while the declaration is being typed.
pub fn expected_cash_preview(total_sales: Money, tpe: Money, glovo: Money) -> Money {
    expected_cash(total_sales, tpe, glovo).clamp_non_negative()
}

/// Builds the record to upsert for a declaration.
///
/// Reuses the id of `existing` so there is at most one record per date.
pub fn build_daily_payment(
    declaration: &CashDeclaration,
    total_sales: Money,
    existing: Option<&DailyPayment>,
) -> CoreResult<DailyPayment> {
    declaration.validate()?;
    Ok(DailyPayment {
        id: existing.map(|p| p.id.clone()).unwrap_or_else(new_id),
        date: declaration.date,
        tpe: declaration.tpe,
        glovo: declaration.glovo,
        glovo_cash: declaration.glovo_cash,
        total_sales,
        expected_cash: expected_cash(total_sales, declaration.tpe, declaration.glovo),
        updated_at: Utc::now(),
    })
}
