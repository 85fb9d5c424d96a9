//! # External Sales Reconciler
//!
//! Pulls a date range of sales from the relay and records each new bill as
//! a sale through the transaction coordinator.
//!
//! ## Import Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  run(start, end)                                                        │
//! │                                                                         │
//! │  1. authenticate ─────────────── failure aborts the import              │
//! │  2. page 1, 2, … ─────────────── stop on a short page or at max_pages   │
//! │  3. group lines into bills ───── against the current catalog            │
//! │  4. skip bills already stored ── same bill number                       │
//! │  5. record_sale per bill ─────── one atomic write per bill              │
//! │                                  failures are collected, not fatal      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancellation is checked before each page and each bill. Bills committed
//! before the flag was raised stay committed.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use solo_core::{ErrorKind, Sale};
use solo_db::{Backoffice, Repository, TransactionCoordinator};

use crate::bill::group_bills;
use crate::config::RelaySettings;
use crate::error::{SyncError, SyncResult};
use crate::relay::{PageQuery, RawSaleLine, SalesFeed};

// =============================================================================
// Progress and Report
// =============================================================================

/// Progress events streamed while an import runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "camelCase")]
pub enum ImportProgress {
    Authenticating,
    FetchedPage { page: u32, lines: usize },
    Committing { bills: usize },
    BillCommitted { bill_no: String, done: usize, total: usize },
}

/// A bill that could not be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillFailure {
    pub bill_no: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub pages: u32,
    pub lines_fetched: usize,
    pub bills_seen: usize,
    pub committed: Vec<String>,
    pub already_imported: usize,
    pub skipped_unmatched: usize,
    pub skipped_invalid: usize,
    pub failures: Vec<BillFailure>,
    pub cancelled: bool,
}

impl ImportReport {
    /// True when the range held no bill to record. Not an error.
    pub fn nothing_to_import(&self) -> bool {
        self.bills_seen == 0
    }
}

// =============================================================================
// Reconciler
// =============================================================================

pub struct Reconciler {
    feed: Arc<dyn SalesFeed>,
    coordinator: TransactionCoordinator,
    sales: Repository<Sale>,
    page_size: u32,
    max_pages: u32,
    progress: Option<mpsc::Sender<ImportProgress>>,
    cancel: Option<watch::Receiver<bool>>,
}

impl Reconciler {
    pub fn new(feed: Arc<dyn SalesFeed>, office: &Backoffice, settings: &RelaySettings) -> Self {
        Reconciler {
            feed,
            coordinator: office.transactions().clone(),
            sales: Repository::new(office.store().clone()),
            page_size: settings.page_size.max(1),
            max_pages: settings.max_pages.max(1),
            progress: None,
            cancel: None,
        }
    }

    pub fn with_progress(mut self, progress: mpsc::Sender<ImportProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Stops the run once the watched flag turns true.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Imports every bill dated between `start` and `end` (inclusive).
    ///
    /// ## Errors
    /// - `InvalidRange` when `end` is before `start`
    /// - relay errors (auth, network, shape) abort the run before anything
    ///   is written
    ///
    /// Per-bill write failures land in [`ImportReport::failures`].
    pub async fn run(&self, start: NaiveDate, end: NaiveDate) -> SyncResult<ImportReport> {
        if end < start {
            return Err(SyncError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        info!(%start, %end, "Starting external sales import");

        let mut report = ImportReport::default();

        self.emit(ImportProgress::Authenticating).await;
        let token = self.feed.authenticate().await?;

        let lines = self.fetch_all(&token, start, end, &mut report).await?;
        if report.cancelled {
            info!(pages = report.pages, "Import cancelled while fetching");
            return Ok(report);
        }

        let catalog = self.coordinator.catalog().await?;
        let grouping = group_bills(&lines, &catalog, Utc::now());
        report.bills_seen = grouping.bills.len();
        report.skipped_unmatched = grouping.unmatched_lines;
        report.skipped_invalid = grouping.invalid_lines;

        let known: HashSet<String> = self
            .sales
            .list()
            .await?
            .into_iter()
            .filter_map(|sale| sale.bill_no)
            .collect();

        let (fresh, seen): (Vec<_>, Vec<_>) = grouping
            .bills
            .into_iter()
            .partition(|bill| !known.contains(&bill.bill_no));
        report.already_imported = seen.len();

        let total = fresh.len();
        self.emit(ImportProgress::Committing { bills: total }).await;

        for (done, bill) in fresh.into_iter().enumerate() {
            if self.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let bill_no = bill.bill_no.clone();
            match self.coordinator.record_sale(bill.into_sale()).await {
                Ok(_) => {
                    report.committed.push(bill_no.clone());
                    self.emit(ImportProgress::BillCommitted {
                        bill_no,
                        done: done + 1,
                        total,
                    })
                    .await;
                }
                Err(err) => {
                    warn!(bill_no = %bill_no, error = %err, "Failed to record external bill");
                    report.failures.push(BillFailure {
                        bill_no,
                        kind: err.kind(),
                        message: err.to_string(),
                    });
                }
            }
        }

        info!(
            pages = report.pages,
            lines = report.lines_fetched,
            committed = report.committed.len(),
            already_imported = report.already_imported,
            unmatched = report.skipped_unmatched,
            invalid = report.skipped_invalid,
            failed = report.failures.len(),
            cancelled = report.cancelled,
            "External sales import finished"
        );
        Ok(report)
    }

    async fn fetch_all(
        &self,
        token: &str,
        start: NaiveDate,
        end: NaiveDate,
        report: &mut ImportReport,
    ) -> SyncResult<Vec<RawSaleLine>> {
        let mut lines = Vec::new();

        for page in 1..=self.max_pages {
            if self.is_cancelled() {
                report.cancelled = true;
                return Ok(lines);
            }

            let query = PageQuery {
                page,
                page_size: self.page_size,
                start,
                end,
            };
            let batch = self.feed.fetch_page(token, query).await?;
            let count = batch.len();
            report.pages = page;
            report.lines_fetched += count;
            lines.extend(batch);
            self.emit(ImportProgress::FetchedPage { page, lines: count }).await;

            if count < self.page_size as usize {
                return Ok(lines);
            }
        }

        warn!(
            max_pages = self.max_pages,
            "Page ceiling reached, later sales in the range were not fetched"
        );
        Ok(lines)
    }

    async fn emit(&self, event: ImportProgress) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(event).await;
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use solo_core::{Consumption, Ingredient, Money, Product, ProductType, SaleSource};
    use solo_db::{FsInvoiceStorage, MemoryStore};
    use std::sync::Mutex;

    struct FakeFeed {
        pages: Vec<Vec<RawSaleLine>>,
        reject_login: bool,
        queries: Mutex<Vec<PageQuery>>,
    }

    impl FakeFeed {
        fn new(pages: Vec<Vec<RawSaleLine>>) -> Self {
            FakeFeed {
                pages,
                reject_login: false,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SalesFeed for FakeFeed {
        async fn authenticate(&self) -> SyncResult<String> {
            if self.reject_login {
                return Err(SyncError::AuthFailed("Invalid credentials".into()));
            }
            Ok("tok".into())
        }

        async fn fetch_page(&self, token: &str, query: PageQuery) -> SyncResult<Vec<RawSaleLine>> {
            assert_eq!(token, "tok");
            self.queries.lock().unwrap().push(query);
            Ok(self
                .pages
                .get(query.page as usize - 1)
                .cloned()
                .unwrap_or_default())
        }
    }

    struct Shop {
        office: Backoffice,
        can: Ingredient,
    }

    async fn shop() -> Shop {
        let office = Backoffice::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FsInvoiceStorage::new(std::env::temp_dir())),
        );
        let can = Ingredient::new("Canette", Decimal::from(50), "p", Money::from_cents(40)).unwrap();
        let coca = Product::new(
            "Coca",
            Money::from_units(2),
            ProductType::Boisson,
            Consumption::linked(can.id.clone(), Decimal::ONE),
        )
        .unwrap();
        Repository::<Ingredient>::new(office.store().clone())
            .create(&can)
            .await
            .unwrap();
        Repository::<Product>::new(office.store().clone())
            .create(&coca)
            .await
            .unwrap();
        Shop { office, can }
    }

    fn line(bill: &str, name: &str, qty: i64) -> RawSaleLine {
        RawSaleLine {
            bill_no: Some(bill.into()),
            oper_date: Some("2024-03-01 12:30:00".into()),
            goods_name: Some(name.into()),
            num_num: Some(Decimal::from(qty)),
            num_price: Some(Decimal::TWO),
            ..RawSaleLine::default()
        }
    }

    fn settings(page_size: u32, max_pages: u32) -> RelaySettings {
        RelaySettings {
            page_size,
            max_pages,
            ..RelaySettings::default()
        }
    }

    fn march(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    async fn stock(shop: &Shop) -> Decimal {
        Repository::<Ingredient>::new(shop.office.store().clone())
            .require(&shop.can.id)
            .await
            .unwrap()
            .quantity
    }

    #[tokio::test]
    async fn test_imports_bills_and_deducts_stock() {
        let shop = shop().await;
        let feed = Arc::new(FakeFeed::new(vec![
            vec![line("B1", "coca", 2), line("B1", "Pepsi", 1)],
        ]));
        let reconciler = Reconciler::new(feed, &shop.office, &settings(100, 5));

        let report = reconciler.run(march(1), march(1)).await.unwrap();

        assert_eq!(report.committed, vec!["B1".to_string()]);
        assert_eq!(report.skipped_unmatched, 1);
        assert_eq!(report.pages, 1);
        assert_eq!(stock(&shop).await, Decimal::from(48));

        let sales = Repository::<Sale>::new(shop.office.store().clone()).list().await.unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].source, SaleSource::ExternalPos);
        assert_eq!(sales[0].total_price, Money::from_units(4));
    }

    #[tokio::test]
    async fn test_second_run_skips_known_bills() {
        let shop = shop().await;
        let pages = vec![vec![line("B1", "Coca", 1), line("B2", "Coca", 1)]];

        let first = Reconciler::new(Arc::new(FakeFeed::new(pages.clone())), &shop.office, &settings(100, 5));
        first.run(march(1), march(2)).await.unwrap();

        let second = Reconciler::new(Arc::new(FakeFeed::new(pages)), &shop.office, &settings(100, 5));
        let report = second.run(march(1), march(2)).await.unwrap();

        assert!(report.committed.is_empty());
        assert_eq!(report.already_imported, 2);
        assert_eq!(stock(&shop).await, Decimal::from(48));
    }

    #[tokio::test]
    async fn test_pages_until_short_page() {
        let shop = shop().await;
        let feed = Arc::new(FakeFeed::new(vec![
            vec![line("B1", "Coca", 1), line("B2", "Coca", 1)],
            vec![line("B3", "Coca", 1), line("B4", "Coca", 1)],
            vec![line("B5", "Coca", 1)],
        ]));
        let reconciler = Reconciler::new(feed.clone(), &shop.office, &settings(2, 10));

        let report = reconciler.run(march(1), march(3)).await.unwrap();

        assert_eq!(report.pages, 3);
        assert_eq!(report.lines_fetched, 5);
        assert_eq!(report.committed.len(), 5);
        let queries = feed.queries.lock().unwrap();
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[2].page, 3);
        assert_eq!(queries[0].end, march(3));
    }

    #[tokio::test]
    async fn test_stops_at_page_ceiling() {
        let shop = shop().await;
        let feed = Arc::new(FakeFeed::new(vec![
            vec![line("B1", "Coca", 1)],
            vec![line("B2", "Coca", 1)],
            vec![line("B3", "Coca", 1)],
        ]));
        let reconciler = Reconciler::new(feed, &shop.office, &settings(1, 2));

        let report = reconciler.run(march(1), march(1)).await.unwrap();

        assert_eq!(report.pages, 2);
        assert_eq!(report.committed, vec!["B1".to_string(), "B2".to_string()]);
    }

    #[tokio::test]
    async fn test_login_failure_aborts_before_writes() {
        let shop = shop().await;
        let feed = Arc::new(FakeFeed {
            reject_login: true,
            ..FakeFeed::new(vec![vec![line("B1", "Coca", 1)]])
        });
        let reconciler = Reconciler::new(feed, &shop.office, &settings(100, 5));

        let err = reconciler.run(march(1), march(1)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ExternalAuth);
        assert_eq!(stock(&shop).await, Decimal::from(50));
    }

    #[tokio::test]
    async fn test_range_and_empty_results() {
        let shop = shop().await;
        let reconciler = Reconciler::new(Arc::new(FakeFeed::new(vec![])), &shop.office, &settings(100, 5));

        let err = reconciler.run(march(5), march(1)).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidRange { .. }));

        let report = reconciler.run(march(1), march(5)).await.unwrap();
        assert!(report.nothing_to_import());
        assert_eq!(report.pages, 1);
    }

    #[tokio::test]
    async fn test_progress_and_cancellation() {
        let shop = shop().await;
        let (tx, mut rx) = mpsc::channel(16);
        let (cancel_tx, cancel_rx) = watch::channel(true);
        let reconciler = Reconciler::new(
            Arc::new(FakeFeed::new(vec![vec![line("B1", "Coca", 1)]])),
            &shop.office,
            &settings(100, 5),
        )
        .with_progress(tx)
        .with_cancel(cancel_rx);

        let report = reconciler.run(march(1), march(1)).await.unwrap();
        assert!(report.cancelled);
        assert_eq!(report.pages, 0);
        assert_eq!(rx.recv().await, Some(ImportProgress::Authenticating));

        cancel_tx.send(false).unwrap();
        let report = reconciler.run(march(1), march(1)).await.unwrap();
        assert!(!report.cancelled);
        assert_eq!(report.committed.len(), 1);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events.last(),
            Some(&ImportProgress::BillCommitted {
                bill_no: "B1".into(),
                done: 1,
                total: 1
            })
        );
    }
}
