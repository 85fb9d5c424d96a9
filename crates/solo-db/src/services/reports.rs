//! # Report Service
//!
//! Read-only views for the dashboard: sales history, KPIs and low stock.
//! Every call reads the collections fresh and hands them to the pure
//! aggregator in `solo_core::kpi`.

use chrono::NaiveDate;
use tracing::debug;

use solo_core::kpi::{compute_kpis, low_stock, KpiInput, KpiReport, LowStockItem};
use solo_core::period::{DateRange, Period};
use solo_core::{
    Catalog, Charge, Ingredient, Loss, Product, PurchaseOrder, Sale, LOW_STOCK_THRESHOLD,
};

use crate::error::DbResult;
use crate::repository::Repository;
use crate::store::SharedStore;

#[derive(Clone)]
pub struct ReportService {
    sales: Repository<Sale>,
    orders: Repository<PurchaseOrder>,
    losses: Repository<Loss>,
    charges: Repository<Charge>,
    products: Repository<Product>,
    ingredients: Repository<Ingredient>,
}

impl ReportService {
    pub fn new(store: SharedStore) -> Self {
        ReportService {
            sales: Repository::new(store.clone()),
            orders: Repository::new(store.clone()),
            losses: Repository::new(store.clone()),
            charges: Repository::new(store.clone()),
            products: Repository::new(store.clone()),
            ingredients: Repository::new(store),
        }
    }

    /// Sales whose business date falls in `range`, most recent first.
    pub async fn sales_between(&self, range: Option<&DateRange>) -> DbResult<Vec<Sale>> {
        let mut sales: Vec<Sale> = self
            .sales
            .list()
            .await?
            .into_iter()
            .filter(|s| range.map_or(true, |r| r.contains(s.sale_date)))
            .collect();
        sales.sort_by(|a, b| b.sale_date.cmp(&a.sale_date));
        Ok(sales)
    }

    pub async fn losses(&self) -> DbResult<Vec<Loss>> {
        let mut losses = self.losses.list().await?;
        losses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(losses)
    }

    pub async fn kpis(&self, range: Option<&DateRange>) -> DbResult<KpiReport> {
        let sales = self.sales.list().await?;
        let purchase_orders = self.orders.list().await?;
        let losses = self.losses.list().await?;
        let charges = self.charges.list().await?;
        let catalog = Catalog::new(self.products.list().await?, self.ingredients.list().await?);

        debug!(
            sales = sales.len(),
            purchase_orders = purchase_orders.len(),
            losses = losses.len(),
            charges = charges.len(),
            ranged = range.is_some(),
            "Computing KPIs"
        );
        Ok(compute_kpis(
            KpiInput {
                sales: &sales,
                purchase_orders: &purchase_orders,
                losses: &losses,
                charges: &charges,
                catalog: &catalog,
            },
            range,
        ))
    }

    /// KPIs for a dashboard preset resolved against `today`.
    pub async fn kpis_for(&self, period: Period, today: NaiveDate) -> DbResult<KpiReport> {
        let range = period.resolve(today)?;
        self.kpis(range.as_ref()).await
    }

    pub async fn low_stock(&self) -> DbResult<Vec<LowStockItem>> {
        let ingredients = self.ingredients.list().await?;
        Ok(low_stock(&ingredients, LOW_STOCK_THRESHOLD))
    }
}
