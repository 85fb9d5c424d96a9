//! # Finance Service
//!
//! Operating charges and the end-of-day cash declaration.
//!
//! A declaration is stored once per business date; declaring the same date
//! again recomputes the day's sales and replaces the stored record.

use chrono::NaiveDate;
use tracing::info;

use solo_core::finance::{build_daily_payment, expected_cash_preview, total_sales_on, CashDeclaration};
use solo_core::{Charge, DailyPayment, Money, Sale};

use crate::error::DbResult;
use crate::repository::Repository;
use crate::store::SharedStore;

#[derive(Clone)]
pub struct FinanceService {
    charges: Repository<Charge>,
    daily_payments: Repository<DailyPayment>,
    sales: Repository<Sale>,
}

impl FinanceService {
    pub fn new(store: SharedStore) -> Self {
        FinanceService {
            charges: Repository::new(store.clone()),
            daily_payments: Repository::new(store.clone()),
            sales: Repository::new(store),
        }
    }

    // =========================================================================
    // Charges
    // =========================================================================

    pub async fn list_charges(&self) -> DbResult<Vec<Charge>> {
        self.charges.list().await
    }

    pub async fn create_charge(&self, name: &str, amount: Money, date: NaiveDate) -> DbResult<Charge> {
        let charge = Charge::new(name, amount, date)?;
        self.charges.create(&charge).await?;
        info!(charge_id = %charge.id, name = %charge.name, amount = %charge.amount, "Charge recorded");
        Ok(charge)
    }

    pub async fn delete_charge(&self, id: &str) -> DbResult<()> {
        self.charges.require(id).await?;
        self.charges.delete(id).await?;
        info!(charge_id = %id, "Charge deleted");
        Ok(())
    }

    // =========================================================================
    // Daily Cash Declaration
    // =========================================================================

    pub async fn list_daily_payments(&self) -> DbResult<Vec<DailyPayment>> {
        self.daily_payments.list().await
    }

    pub async fn daily_payment_on(&self, date: NaiveDate) -> DbResult<Option<DailyPayment>> {
        Ok(self
            .daily_payments
            .list()
            .await?
            .into_iter()
            .find(|p| p.date == date))
    }

    /// Sum of the stored sale totals whose business date is `date`.
    pub async fn sales_total_on(&self, date: NaiveDate) -> DbResult<Money> {
        let sales = self.sales.list().await?;
        Ok(total_sales_on(&sales, date))
    }

    /// Expected cash shown while a declaration is typed, floored at zero.
    pub async fn preview(&self, date: NaiveDate, tpe: Money, glovo: Money) -> DbResult<Money> {
        let total = self.sales_total_on(date).await?;
        Ok(expected_cash_preview(total, tpe, glovo))
    }

    /// Creates or replaces the declaration of `declaration.date`.
    pub async fn declare_daily_payment(&self, declaration: CashDeclaration) -> DbResult<DailyPayment> {
        let total = self.sales_total_on(declaration.date).await?;
        let existing = self.daily_payment_on(declaration.date).await?;
        let payment = build_daily_payment(&declaration, total, existing.as_ref())?;
        self.daily_payments.save(&payment).await?;

        info!(
            date = %payment.date,
            total_sales = %payment.total_sales,
            expected_cash = %payment.expected_cash,
            replaced = existing.is_some(),
            "Daily payment declared"
        );
        Ok(payment)
    }

    pub async fn delete_daily_payment(&self, id: &str) -> DbResult<()> {
        self.daily_payments.require(id).await?;
        self.daily_payments.delete(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Utc;
    use solo_core::{business_noon, new_id, ErrorKind, SaleSource};
    use std::sync::Arc;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    async fn with_sales(totals: &[(NaiveDate, i64)]) -> (FinanceService, SharedStore) {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let sales = Repository::<Sale>::new(store.clone());
        for (date, total) in totals {
            let sale = Sale {
                id: new_id(),
                items: vec![],
                total_price: Money::from_units(*total),
                sale_date: business_noon(*date),
                created_at: Utc::now(),
                source: SaleSource::Manual,
                bill_no: None,
                had_discount: false,
                deductions: None,
            };
            sales.create(&sale).await.unwrap();
        }
        (FinanceService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_declaration_computes_expected_cash() {
        let next = day().succ_opt().unwrap();
        let (finance, _) = with_sales(&[(day(), 150), (day(), 50), (next, 400)]).await;

        let payment = finance
            .declare_daily_payment(CashDeclaration {
                date: day(),
                tpe: Money::from_units(50),
                glovo: Money::from_units(30),
                glovo_cash: Money::zero(),
            })
            .await
            .unwrap();
        assert_eq!(payment.total_sales, Money::from_units(200));
        assert_eq!(payment.expected_cash, Money::from_units(120));
    }

    #[tokio::test]
    async fn test_redeclaring_a_date_replaces_it() {
        let (finance, _) = with_sales(&[(day(), 100)]).await;
        let declaration = CashDeclaration {
            date: day(),
            tpe: Money::from_units(20),
            glovo: Money::zero(),
            glovo_cash: Money::zero(),
        };
        let first = finance.declare_daily_payment(declaration).await.unwrap();
        let second = finance
            .declare_daily_payment(CashDeclaration {
                tpe: Money::from_units(150),
                ..declaration
            })
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(finance.list_daily_payments().await.unwrap().len(), 1);
        assert_eq!(second.expected_cash, Money::from_units(-50));
        assert_eq!(
            finance.preview(day(), Money::from_units(150), Money::zero()).await.unwrap(),
            Money::zero()
        );
    }

    #[tokio::test]
    async fn test_charge_rules() {
        let (finance, _) = with_sales(&[]).await;
        let err = finance
            .create_charge("Loyer", Money::zero(), day())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let rent = finance.create_charge("Loyer", Money::from_units(3000), day()).await.unwrap();
        assert_eq!(rent.date, business_noon(day()));
        finance.delete_charge(&rent.id).await.unwrap();
        assert_eq!(
            finance.delete_charge(&rent.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
}
