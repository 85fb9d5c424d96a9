//! # CSV Import
//!
//! Parses the three bulk-import files into domain values, validating every
//! row against the current catalog.
//!
//! ## Formats
//! ```text
//! ingredients   name,quantity,unit,cost           Tomates,10,kg,2.5
//! products      name,price,type,details           Margherita,8.5,Pizza,"Pâte:1:p;Sauce:0.1:kg"
//!                                                 Coca,2,Boisson,"Canette Coca:1"
//! orders        date,products,quantities          21/10/2025,"Margherita;Coca","2;1"
//! ```
//!
//! ## All-or-nothing
//! Every row is checked. Failing rows are collected with their physical line
//! number (header = line 1) and returned together as one [`ImportError`];
//! the caller commits only a fully valid file.

use std::io::Read;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::catalog::Catalog;
use crate::draft::NewSale;
use crate::error::{CoreResult, ImportError, RowError, ValidationError};
use crate::money::Money;
use crate::recipe::resolve_sale_lines;
use crate::types::{
    business_noon, Consumption, Ingredient, Product, ProductType, RecipeLine, SaleLine,
    SaleSource,
};
use crate::validation::{parse_decimal, require_non_negative, require_positive};

/// Collects parsed rows and row errors for one file.
struct RowCollector<T> {
    file: &'static str,
    rows: Vec<T>,
    errors: Vec<RowError>,
}

impl<T> RowCollector<T> {
    fn new(file: &'static str) -> Self {
        RowCollector {
            file,
            rows: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn push(&mut self, line: usize, row: Result<T, String>) {
        match row {
            Ok(value) => self.rows.push(value),
            Err(message) => self.errors.push(RowError { line, message }),
        }
    }

    fn finish(self) -> CoreResult<Vec<T>> {
        if !self.errors.is_empty() {
            return Err(ImportError {
                file: self.file.to_string(),
                rows: self.errors,
            }
            .into());
        }
        if self.rows.is_empty() {
            return Err(ValidationError::empty(format!("{} file", self.file)).into());
        }
        debug!(file = self.file, rows = self.rows.len(), "CSV file validated");
        Ok(self.rows)
    }
}

/// Walks the data lines of `input`, handing each one with its physical line
/// number (header = 1) to `parse`. Blank lines are skipped but still counted.
fn read_rows<T>(
    mut input: impl Read,
    file: &'static str,
    mut parse: impl FnMut(&[&str]) -> Result<T, String>,
) -> CoreResult<Vec<T>> {
    let mut collector = RowCollector::new(file);
    let mut content = String::new();
    if let Err(e) = input.read_to_string(&mut content) {
        collector.push(1, Err(e.to_string()));
        return collector.finish();
    }

    for (index, text) in content.lines().enumerate().skip(1) {
        let line = index + 1;
        if text.trim().is_empty() {
            continue;
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());
        match reader.records().next() {
            Some(Ok(record)) => {
                let fields: Vec<&str> = record.iter().collect();
                if fields.iter().all(|f| f.is_empty()) {
                    continue;
                }
                collector.push(line, parse(&fields));
            }
            Some(Err(e)) => collector.push(line, Err(e.to_string())),
            None => {}
        }
    }
    collector.finish()
}

fn required<'a>(fields: &[&'a str], index: usize, name: &str) -> Result<&'a str, String> {
    fields
        .get(index)
        .map(|f| f.trim_matches('"').trim())
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ValidationError::required(name).to_string())
}

fn decimal(field: &str, raw: &str) -> Result<Decimal, String> {
    parse_decimal(field, raw).map_err(|e| e.to_string())
}

// =============================================================================
// Ingredients
// =============================================================================

/// Parses `name,quantity,unit,cost`. A missing cost means 0.
pub fn parse_ingredients(input: impl Read) -> CoreResult<Vec<Ingredient>> {
    read_rows(input, "ingredients", |fields| {
        let name = required(fields, 0, "name")?;
        let quantity = decimal("quantity", required(fields, 1, "quantity")?)?;
        let unit = required(fields, 2, "unit")?;
        let cost = match fields.get(3).map(|c| c.trim()).filter(|c| !c.is_empty()) {
            Some(raw) => Money::new(decimal("cost", raw)?),
            None => Money::zero(),
        };
        require_non_negative("quantity", quantity).map_err(|e| e.to_string())?;
        Ingredient::new(name, quantity, unit, cost).map_err(|e| e.to_string())
    })
}

// =============================================================================
// Products
// =============================================================================

/// Parses `name,price,type,details`, resolving ingredient names
/// case-insensitively against `catalog`.
pub fn parse_products(input: impl Read, catalog: &Catalog) -> CoreResult<Vec<Product>> {
    read_rows(input, "products", |fields| {
        let name = required(fields, 0, "name")?;
        let price = Money::new(decimal("price", required(fields, 1, "price")?)?);
        let product_type: ProductType = required(fields, 2, "type")?
            .parse()
            .map_err(|e: ValidationError| e.to_string())?;
        // An unquoted details column may have been split on commas.
        let details = fields.get(3..).unwrap_or_default().join(",");
        let details = details.replace('"', "");
        let details = details.trim();
        if details.is_empty() {
            return Err(ValidationError::required("details").to_string());
        }

        let consumption = if product_type.has_recipe() {
            parse_recipe(name, details, catalog)?
        } else {
            parse_link(name, details, catalog)?
        };
        Product::new(name, price, product_type, consumption).map_err(|e| e.to_string())
    })
}

fn parse_recipe(product: &str, details: &str, catalog: &Catalog) -> Result<Consumption, String> {
    let mut lines = Vec::new();
    for part in details.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let pieces: Vec<&str> = part.split(':').map(str::trim).collect();
        let (ing_name, qty, unit) = match pieces.as_slice() {
            [n, q, u] if !n.is_empty() && !q.is_empty() && !u.is_empty() => (*n, *q, *u),
            _ => {
                return Err(format!(
                    "bad recipe entry '{}' for {} (expected name:quantity:unit)",
                    part, product
                ))
            }
        };
        let ingredient = catalog
            .ingredient_by_name(ing_name)
            .ok_or_else(|| format!("unknown ingredient '{}' for {}", ing_name, product))?;
        let quantity = decimal("recipe quantity", qty)?;
        require_positive("recipe quantity", quantity).map_err(|e| e.to_string())?;
        lines.push(RecipeLine {
            ingredient_id: ingredient.id.clone(),
            name: ingredient.name.clone(),
            quantity,
            unit: unit.to_string(),
        });
    }
    if lines.is_empty() {
        return Err(format!("empty recipe for {}", product));
    }
    Ok(Consumption::Recipe { lines })
}

fn parse_link(product: &str, details: &str, catalog: &Catalog) -> Result<Consumption, String> {
    let bad = || format!("bad link for {} (expected name:quantity)", product);
    let (ing_name, qty) = details.split_once(':').ok_or_else(bad)?;
    let ing_name = ing_name.trim();
    let quantity = parse_decimal("linked quantity", qty).map_err(|_| bad())?;
    if ing_name.is_empty() || quantity <= Decimal::ZERO {
        return Err(bad());
    }
    let ingredient = catalog
        .ingredient_by_name(ing_name)
        .ok_or_else(|| format!("unknown stock item '{}' for {}", ing_name, product))?;
    Ok(Consumption::linked(ingredient.id.clone(), quantity))
}

// =============================================================================
// Orders
// =============================================================================

/// Parses `date,products,quantities` into sales.
///
/// Unit prices are the current catalog prices; the total is their sum.
/// Any extra column (such as an exported total) is ignored.
pub fn parse_orders(input: impl Read, catalog: &Catalog) -> CoreResult<Vec<NewSale>> {
    read_rows(input, "orders", |fields| {
        let date = parse_day(required(fields, 0, "date")?)?;
        let names: Vec<&str> = required(fields, 1, "products")?.split(';').map(str::trim).collect();
        let quantities: Vec<&str> = required(fields, 2, "quantities")?.split(';').map(str::trim).collect();
        if names.len() != quantities.len() {
            return Err(format!(
                "{} product(s) but {} quantity(ies)",
                names.len(),
                quantities.len()
            ));
        }

        let mut items = Vec::with_capacity(names.len());
        for (name, raw_qty) in names.iter().zip(&quantities) {
            let quantity = match raw_qty.parse::<u32>() {
                Ok(q) if q > 0 => Decimal::from(q),
                _ => return Err(format!("invalid quantity '{}' for {}", raw_qty, name)),
            };
            let product = catalog
                .product_by_name(name)
                .ok_or_else(|| format!("unknown product '{}'", name))?;
            items.push(SaleLine {
                product_id: product.id.clone(),
                name: product.name.clone(),
                quantity,
                price: product.price,
                returned: None,
            });
        }
        resolve_sale_lines(&items, catalog).map_err(|e| e.to_string())?;

        let total_price = items.iter().map(SaleLine::line_total).sum();
        Ok(NewSale {
            items,
            total_price,
            sale_date: business_noon(date),
            source: SaleSource::CsvImport,
            bill_no: None,
            had_discount: false,
        })
    })
}

/// Strict `DD/MM/YYYY`.
fn parse_day(raw: &str) -> Result<NaiveDate, String> {
    let bad = || format!("invalid date '{}' (expected DD/MM/YYYY)", raw);
    let parts: Vec<&str> = raw.split('/').collect();
    match parts.as_slice() {
        [d, m, y] if d.len() == 2 && m.len() == 2 && y.len() == 4 => {
            let day = d.parse::<u32>().map_err(|_| bad())?;
            let month = m.parse::<u32>().map_err(|_| bad())?;
            let year = y.parse::<i32>().map_err(|_| bad())?;
            NaiveDate::from_ymd_opt(year, month, day).ok_or_else(bad)
        }
        _ => Err(bad()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn catalog() -> Catalog {
        let pate = Ingredient::new("Pâte", Decimal::from(50), "p", Money::from_units(1)).unwrap();
        let sauce = Ingredient::new("Sauce", Decimal::from(5), "kg", Money::from_units(4)).unwrap();
        let can = Ingredient::new("Canette Coca", Decimal::from(24), "u", Money::from_cents(60)).unwrap();
        let margherita = Product::new(
            "Margherita",
            Money::from_cents(850),
            ProductType::Pizza,
            Consumption::Recipe {
                lines: vec![RecipeLine {
                    ingredient_id: pate.id.clone(),
                    name: "Pâte".into(),
                    quantity: Decimal::ONE,
                    unit: "p".into(),
                }],
            },
        )
        .unwrap();
        let coca = Product::new(
            "Coca",
            Money::from_units(2),
            ProductType::Boisson,
            Consumption::linked(can.id.clone(), Decimal::ONE),
        )
        .unwrap();
        Catalog::new(vec![margherita, coca], vec![pate, sauce, can])
    }

    fn rows_of(err: CoreError) -> Vec<RowError> {
        match err {
            CoreError::Import(e) => e.rows,
            other => panic!("expected import error, got {:?}", other),
        }
    }

    #[test]
    fn test_ingredients_with_optional_cost() {
        let csv = "nom,quantite,unite,cout\nTomates,10,kg,2.5\nSel,1,kg\n";
        let parsed = parse_ingredients(csv.as_bytes()).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].cost, Money::from_cents(250));
        assert_eq!(parsed[1].cost, Money::zero());
    }

    #[test]
    fn test_all_row_errors_are_reported_with_physical_lines() {
        let csv = "nom,quantite,unite,cout\nTomates,10,kg,2.5\n\nOignons,abc,kg,1\n,3,kg,1\n";
        let rows = rows_of(parse_ingredients(csv.as_bytes()).unwrap_err());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 4);
        assert_eq!(rows[1].line, 5);
    }

    #[test]
    fn test_line_numbers_count_blank_lines_in_crlf_files() {
        let csv = "nom,prix,type,details\r\n\r\n\r\nRegina,9.5,Pizza,\"pâte:1:p\"\r\n\r\nCalzone,x,Pizza,\"pâte:1:p\"\r\n";
        let rows = rows_of(parse_products(csv.as_bytes(), &catalog()).unwrap_err());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].line, 6);
    }

    #[test]
    fn test_header_only_is_empty() {
        let err = parse_ingredients("nom,quantite,unite,cout\n".as_bytes()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Empty { .. })));
    }

    #[test]
    fn test_products_resolve_ingredients_by_name() {
        let csv = "nom,prix,type,details\n\
                   Regina,9.5,Pizza,\"pâte:1:p;SAUCE:0.1:kg\"\n\
                   Coca Zero,2,Boisson,\"Canette Coca:2\"\n";
        let parsed = parse_products(csv.as_bytes(), &catalog()).unwrap();
        assert_eq!(parsed.len(), 2);
        match &parsed[0].consumption {
            Consumption::Recipe { lines } => {
                assert_eq!(lines.len(), 2);
                assert_eq!(lines[1].name, "Sauce");
                assert_eq!(lines[1].quantity, Decimal::new(1, 1));
            }
            other => panic!("unexpected shape {:?}", other),
        }
        match &parsed[1].consumption {
            Consumption::Linked {
                quantity_per_unit, ..
            } => assert_eq!(*quantity_per_unit, Decimal::from(2)),
            other => panic!("unexpected shape {:?}", other),
        }
    }

    #[test]
    fn test_product_rows_with_bad_links_fail() {
        let csv = "nom,prix,type,details\n\
                   Fanta,2,Boisson,\"Canette Fanta:1\"\n\
                   Sprite,2,Boisson,\"Canette Coca:0\"\n\
                   Calzone,9,Pizza,\"Pâte:1\"\n";
        let rows = rows_of(parse_products(csv.as_bytes(), &catalog()).unwrap_err());
        assert_eq!(rows.iter().map(|r| r.line).collect::<Vec<_>>(), vec![2, 3, 4]);
        assert!(rows[0].message.contains("Canette Fanta"));
    }

    #[test]
    fn test_orders_use_catalog_prices() {
        let csv = "date,produits,quantites\n21/10/2025,\"margherita;Coca\",\"2;1\"\n";
        let sales = parse_orders(csv.as_bytes(), &catalog()).unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].total_price, Money::from_units(19));
        assert_eq!(sales[0].source, SaleSource::CsvImport);
        assert_eq!(
            sales[0].sale_date,
            business_noon(NaiveDate::from_ymd_opt(2025, 10, 21).unwrap())
        );
    }

    #[test]
    fn test_order_rows_rejected() {
        let csv = "date,produits,quantites\n\
                   2025-10-21,Margherita,1\n\
                   21/10/2025,\"Margherita;Coca\",1\n\
                   21/10/2025,Margherita,1.5\n\
                   21/10/2025,Calzone,1\n\
                   21/10/2025,Coca,3\n";
        let rows = rows_of(parse_orders(csv.as_bytes(), &catalog()).unwrap_err());
        assert_eq!(rows.iter().map(|r| r.line).collect::<Vec<_>>(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_exported_total_column_is_ignored() {
        let csv = "date,produits,quantites,prix_total\n21/10/2025,Coca,3,6.00\n";
        let sales = parse_orders(csv.as_bytes(), &catalog()).unwrap();
        assert_eq!(sales[0].total_price, Money::from_units(6));
    }
}
