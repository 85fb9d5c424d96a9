//! # Seed Data Generator
//!
//! Populates the database with a demo pizzeria for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./solo_dev.db with 30 days of sales (default)
//! cargo run -p solo-db --bin seed
//!
//! # Custom history length
//! cargo run -p solo-db --bin seed -- --days 90
//!
//! # Specify database path
//! cargo run -p solo-db --bin seed -- --db ./data/solo.db
//! ```
//!
//! ## Generated Data
//! - Ingredients and products, loaded through the CSV importers
//! - One supplier and a received, paid purchase order
//! - Manual sales for every past day, a few losses
//! - Two employees, one absence, a rent charge

use chrono::{Days, Utc};
use rust_decimal::Decimal;
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use solo_core::draft::{NewLoss, OrderDraft, PurchaseDraft};
use solo_core::{LossKind, Money, MonthKey, PaymentStatus};
use solo_db::{Database, DbConfig, FsInvoiceStorage};

const INGREDIENTS_CSV: &str = "\
name,quantity,unit,cost
Farine,40,kg,1.20
Sauce tomate,25,l,2.50
Mozzarella,18,kg,7.80
Jambon,8,kg,11.00
Champignons,6,kg,4.20
Canette Coca,96,p,0.45
Bouteille eau,120,p,0.20
Tiramisu portion,30,p,1.60
";

const PRODUCTS_CSV: &str = "\
name,price,type,details
Margherita,45,Pizza,Farine:0.25:kg;Sauce tomate:0.1:l;Mozzarella:0.12:kg
Regina,60,Pizza,Farine:0.25:kg;Sauce tomate:0.1:l;Mozzarella:0.12:kg;Jambon:0.08:kg;Champignons:0.05:kg
Coca,12,Boisson,Canette Coca:1
Eau,8,Boisson,Bouteille eau:1
Tiramisu,25,Dessert,Tiramisu portion:1:p
";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut days: u64 = 30;
    let mut db_path = String::from("./solo_dev.db");
    let mut invoice_dir = String::from("./solo_invoices");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--days" | "-n" => {
                if i + 1 < args.len() {
                    days = args[i + 1].parse().unwrap_or(30);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--invoices" => {
                if i + 1 < args.len() {
                    invoice_dir = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Solo Back-Office Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --days <N>        Days of sales history (default: 30)");
                println!("  -d, --db <PATH>       Database file path (default: ./solo_dev.db)");
                println!("      --invoices <DIR>  Invoice directory (default: ./solo_invoices)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Solo Back-Office Seed Data Generator");
    println!("=======================================");
    println!("Database: {}", db_path);
    println!("Days:     {}", days);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let office = db.backoffice(Arc::new(FsInvoiceStorage::new(&invoice_dir)));

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let catalog = office.catalog();
    let existing = catalog.list_ingredients().await?.len();
    if existing > 0 {
        println!("⚠ Database already has {} ingredients", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Catalog
    let ingredients = catalog.import_ingredients(INGREDIENTS_CSV.as_bytes()).await?;
    let products = catalog.import_products(PRODUCTS_CSV.as_bytes()).await?;
    println!("✓ {} ingredients, {} products", ingredients.len(), products.len());

    // Purchasing
    let purchasing = office.purchasing();
    let supplier = purchasing.create_supplier("Metro Casablanca", "0522 00 00 00").await?;
    let mut draft = PurchaseDraft::new();
    for ingredient in ingredients.iter().take(3) {
        draft.add_line(ingredient, Decimal::from(20), ingredient.cost)?;
    }
    let order = purchasing
        .create_order(&supplier.id, draft, None, PaymentStatus::Unpaid)
        .await?;
    purchasing.receive(&order.id).await?;
    purchasing.mark_paid(&order.id).await?;
    println!("✓ Purchase order {} received and paid", order.id);

    // Sales
    let today = Utc::now().date_naive();
    let start = std::time::Instant::now();
    let mut recorded = 0;
    for back in (1..=days).rev() {
        let Some(date) = today.checked_sub_days(Days::new(back)) else {
            continue;
        };
        let mut order = OrderDraft::new();
        for (idx, product) in products.iter().enumerate() {
            let quantity = (back as usize + idx) % 3;
            if quantity > 0 {
                order.add_product(product, Decimal::from(quantity))?;
            }
        }
        if order.is_empty() {
            continue;
        }
        match office.transactions().record_sale(order.into_sale(None, date)?).await {
            Ok(_) => recorded += 1,
            Err(e) => eprintln!("Failed to record sale for {}: {}", date, e),
        }
    }
    println!("✓ {} sales in {:?}", recorded, start.elapsed());

    // Losses
    if let Some(pizza) = products.first() {
        office
            .transactions()
            .record_loss(NewLoss {
                kind: LossKind::Product,
                target_id: pizza.id.clone(),
                quantity: Decimal::ONE,
                reason: Some("Brûlée".to_string()),
            })
            .await?;
    }

    // Staff and charges
    let payroll = office.payroll();
    let hired = today.checked_sub_days(Days::new(365)).unwrap_or(today);
    let cook = payroll.create_employee("Karim", Money::from_units(4200), hired).await?;
    payroll.create_employee("Salma", Money::from_units(3600), hired).await?;
    payroll
        .set_absence(&cook.id, MonthKey::of(today), Decimal::ONE)
        .await?;
    office
        .finance()
        .create_charge("Loyer", Money::from_units(8000), today)
        .await?;
    println!("✓ Staff and charges");

    let report = office.reports().kpis(None).await?;
    println!();
    println!("  Sales:        {}", report.total_sales);
    println!("  COGS:         {}", report.total_cogs);
    println!("  Gross margin: {}", report.gross_margin);
    println!("  Net profit:   {}", report.net_profit);

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
