//! # CSV Export
//!
//! Writes sales history, ingredients and products in the formats the
//! importer reads back.

use std::io::Write;

use crate::catalog::Catalog;
use crate::types::{Consumption, Ingredient, Product, Sale};

pub const SALES_HEADER: [&str; 4] = ["date", "produits", "quantites", "prix_total"];
pub const INGREDIENTS_HEADER: [&str; 4] = ["nom", "quantite", "unite", "cout"];
pub const PRODUCTS_HEADER: [&str; 4] = ["nom", "prix", "type", "details"];

/// Placeholder written for a linked product whose stock item is gone.
pub const UNLINKED_DETAILS: &str = "NON LIÉ:1";

fn writer<W: Write>(out: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out)
}

/// One row per sale: business date, `;`-joined names and quantities, total.
pub fn write_sales<W: Write>(sales: &[Sale], out: W) -> csv::Result<()> {
    let mut csv = writer(out);
    csv.write_record(SALES_HEADER)?;
    for sale in sales {
        let names: Vec<&str> = sale.items.iter().map(|i| i.name.as_str()).collect();
        let quantities: Vec<String> = sale
            .items
            .iter()
            .map(|i| i.quantity.normalize().to_string())
            .collect();
        csv.write_record([
            sale.sale_date.format("%d/%m/%Y").to_string(),
            names.join(";"),
            quantities.join(";"),
            sale.total_price.to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_ingredients<W: Write>(ingredients: &[Ingredient], out: W) -> csv::Result<()> {
    let mut csv = writer(out);
    csv.write_record(INGREDIENTS_HEADER)?;
    for ingredient in ingredients {
        csv.write_record([
            ingredient.name.clone(),
            ingredient.quantity.normalize().to_string(),
            ingredient.unit.clone(),
            ingredient.cost.amount().normalize().to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Products with their consumption in import syntax.
///
/// Linked stock items are named from `catalog`.
pub fn write_products<W: Write>(products: &[Product], catalog: &Catalog, out: W) -> csv::Result<()> {
    let mut csv = writer(out);
    csv.write_record(PRODUCTS_HEADER)?;
    for product in products {
        csv.write_record([
            product.name.clone(),
            product.price.amount().normalize().to_string(),
            product.product_type.to_string(),
            details(product, catalog),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

fn details(product: &Product, catalog: &Catalog) -> String {
    match &product.consumption {
        Consumption::Recipe { lines } => lines
            .iter()
            .map(|l| format!("{}:{}:{}", l.name, l.quantity.normalize(), l.unit))
            .collect::<Vec<_>>()
            .join(";"),
        Consumption::Linked {
            ingredient_id,
            quantity_per_unit,
        } => match catalog.ingredient(ingredient_id) {
            Some(ingredient) => format!("{}:{}", ingredient.name, quantity_per_unit.normalize()),
            None => UNLINKED_DETAILS.to_string(),
        },
    }
}
