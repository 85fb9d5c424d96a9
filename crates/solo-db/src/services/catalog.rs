//! # Catalog Service
//!
//! Ingredients and products, plus the CSV files that fill them.
//!
//! ## Stock Ownership
//! An ingredient's quantity is written once, at creation (form or CSV).
//! Edits only touch name, unit and cost through a merge patch, so they can
//! never overwrite a stock movement committed in between.
//!
//! ## CSV Import
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  bytes ──► solo_core::import::parse_*  ──► every row checked            │
//! │                 │                                                       │
//! │                 ├── any bad row ──► ImportError (all rows listed),      │
//! │                 │                    nothing written                    │
//! │                 ▼                                                       │
//! │            one WriteBatch for the whole file                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::io::Read;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use solo_core::recipe::product_cost;
use solo_core::{
    export, import, Catalog, Consumption, Ingredient, Money, Product, ProductType, Sale,
};

use crate::coordinator::TransactionCoordinator;
use crate::error::{DbError, DbResult};
use crate::repository::Repository;
use crate::store::{Collection, SharedStore, WriteBatch};

/// Editable fields of an ingredient. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientEdit {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub cost: Option<Money>,
}

#[derive(Clone)]
pub struct CatalogService {
    store: SharedStore,
    coordinator: TransactionCoordinator,
    ingredients: Repository<Ingredient>,
    products: Repository<Product>,
}

impl CatalogService {
    pub fn new(store: SharedStore, coordinator: TransactionCoordinator) -> Self {
        CatalogService {
            ingredients: Repository::new(store.clone()),
            products: Repository::new(store.clone()),
            store,
            coordinator,
        }
    }

    pub async fn load(&self) -> DbResult<Catalog> {
        self.coordinator.catalog().await
    }

    // =========================================================================
    // Ingredients
    // =========================================================================

    pub async fn list_ingredients(&self) -> DbResult<Vec<Ingredient>> {
        self.ingredients.list().await
    }

    pub async fn create_ingredient(
        &self,
        name: &str,
        quantity: Decimal,
        unit: &str,
        cost: Money,
    ) -> DbResult<Ingredient> {
        let ingredient = Ingredient::new(name, quantity, unit, cost)?;
        self.ingredients.create(&ingredient).await?;
        info!(ingredient_id = %ingredient.id, name = %ingredient.name, "Ingredient created");
        Ok(ingredient)
    }

    /// Renames or re-prices an ingredient. Stock is never touched here.
    pub async fn update_ingredient(&self, id: &str, edit: IngredientEdit) -> DbResult<Ingredient> {
        let current = self.ingredients.require(id).await?;
        let name = edit.name.unwrap_or(current.name.clone());
        let unit = edit.unit.unwrap_or(current.unit.clone());
        let cost = edit.cost.unwrap_or(current.cost);

        // Re-run constructor rules on the edited values.
        let checked = Ingredient::new(&name, current.quantity, &unit, cost)?;
        let updated = Ingredient {
            id: current.id,
            name: checked.name,
            quantity: current.quantity,
            unit: checked.unit,
            cost: checked.cost,
            created_at: current.created_at,
        };

        let patch = json!({
            "name": updated.name,
            "unit": updated.unit,
            "cost": updated.cost,
        });
        self.store.update(Collection::Ingredients, id, patch).await?;

        info!(ingredient_id = %id, "Ingredient updated");
        Ok(updated)
    }

    /// Deletes an ingredient. Products still pointing at it are left as
    /// they are and cost nothing for that part.
    pub async fn delete_ingredient(&self, id: &str) -> DbResult<bool> {
        let users: Vec<String> = self
            .products
            .list()
            .await?
            .into_iter()
            .filter(|p| p.consumption.ingredient_ids().contains(&id))
            .map(|p| p.name)
            .collect();
        if !users.is_empty() {
            warn!(ingredient_id = %id, products = ?users, "Deleting an ingredient still used by products");
        }
        self.ingredients.delete(id).await
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub async fn list_products(&self) -> DbResult<Vec<Product>> {
        self.products.list().await
    }

    pub async fn create_product(
        &self,
        name: &str,
        price: Money,
        product_type: ProductType,
        consumption: Consumption,
    ) -> DbResult<Product> {
        let product = Product::new(name, price, product_type, consumption)?;
        self.products.create(&product).await?;
        info!(product_id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Saves an edited product after re-checking its shape.
    pub async fn update_product(&self, product: &Product) -> DbResult<()> {
        self.products.require(&product.id).await?;
        product.validate()?;
        self.products.save(product).await?;
        info!(product_id = %product.id, "Product updated");
        Ok(())
    }

    /// Switches type and consumption together.
    pub async fn change_product_type(
        &self,
        id: &str,
        product_type: ProductType,
        consumption: Consumption,
    ) -> DbResult<Product> {
        let mut product = self.products.require(id).await?;
        product.change_type(product_type, consumption)?;
        self.products.save(&product).await?;
        info!(product_id = %id, product_type = %product_type, "Product type changed");
        Ok(product)
    }

    pub async fn delete_product(&self, id: &str) -> DbResult<bool> {
        self.products.delete(id).await
    }

    /// Current cost of one unit of a product.
    pub async fn product_cost(&self, id: &str) -> DbResult<Money> {
        let catalog = self.load().await?;
        let product = catalog
            .product(id)
            .ok_or_else(|| DbError::not_found("Product", id))?;
        Ok(product_cost(product, &catalog))
    }

    // =========================================================================
    // CSV Import
    // =========================================================================

    pub async fn import_ingredients(&self, input: impl Read) -> DbResult<Vec<Ingredient>> {
        let ingredients = import::parse_ingredients(input)?;
        let mut batch = WriteBatch::new();
        for ingredient in &ingredients {
            batch.create(ingredient)?;
        }
        self.store.commit(batch).await?;
        info!(count = ingredients.len(), "Ingredients imported");
        Ok(ingredients)
    }

    pub async fn import_products(&self, input: impl Read) -> DbResult<Vec<Product>> {
        let catalog = self.load().await?;
        let products = import::parse_products(input, &catalog)?;
        let mut batch = WriteBatch::new();
        for product in &products {
            batch.create(product)?;
        }
        self.store.commit(batch).await?;
        info!(count = products.len(), "Products imported");
        Ok(products)
    }

    /// Imports historical orders and deducts their stock in one batch.
    pub async fn import_orders(&self, input: impl Read) -> DbResult<Vec<Sale>> {
        let catalog = self.load().await?;
        let sales = import::parse_orders(input, &catalog)?;
        let recorded = self.coordinator.record_sales(sales).await?;
        info!(count = recorded.len(), "Orders imported");
        Ok(recorded)
    }

    // =========================================================================
    // CSV Export
    // =========================================================================

    pub async fn export_ingredients(&self) -> DbResult<Vec<u8>> {
        let mut out = Vec::new();
        export::write_ingredients(&self.ingredients.list().await?, &mut out).map_err(csv_error)?;
        Ok(out)
    }

    pub async fn export_products(&self) -> DbResult<Vec<u8>> {
        let catalog = self.load().await?;
        let mut out = Vec::new();
        export::write_products(catalog.products(), &catalog, &mut out).map_err(csv_error)?;
        Ok(out)
    }

    /// Sales history in the orders import format.
    pub async fn export_sales(&self, sales: &[Sale]) -> DbResult<Vec<u8>> {
        let mut out = Vec::new();
        export::write_sales(sales, &mut out).map_err(csv_error)?;
        Ok(out)
    }
}

fn csv_error(err: csv::Error) -> DbError {
    DbError::Internal(format!("CSV export failed: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::testing::MemoryInvoices;
    use crate::testing::Kitchen;
    use solo_core::{CoreError, ErrorKind};
    use std::sync::Arc;

    fn service(kitchen: &Kitchen) -> CatalogService {
        let coordinator =
            TransactionCoordinator::new(kitchen.store.clone(), Arc::new(MemoryInvoices::default()));
        CatalogService::new(kitchen.store.clone(), coordinator)
    }

    #[tokio::test]
    async fn test_edit_never_touches_stock() {
        let kitchen = Kitchen::memory().await;
        let catalog = service(&kitchen);

        let updated = catalog
            .update_ingredient(
                &kitchen.flour.id,
                IngredientEdit {
                    name: Some(" Farine T55 ".into()),
                    cost: Some(Money::from_cents(180)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Farine T55");
        assert_eq!(updated.unit, "kg");

        let stored = Repository::<Ingredient>::new(kitchen.store.clone())
            .require(&kitchen.flour.id)
            .await
            .unwrap();
        assert_eq!(stored.quantity, Decimal::from(100));
        assert_eq!(stored.cost, Money::from_cents(180));
    }

    #[tokio::test]
    async fn test_product_shape_is_enforced() {
        let kitchen = Kitchen::memory().await;
        let catalog = service(&kitchen);

        let err = catalog
            .create_product(
                "Tiramisu",
                Money::from_units(5),
                ProductType::Dessert,
                Consumption::linked(kitchen.can.id.clone(), Decimal::ONE),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let switched = catalog
            .change_product_type(
                &kitchen.coca.id,
                ProductType::Autre,
                Consumption::linked(kitchen.can.id.clone(), Decimal::TWO),
            )
            .await
            .unwrap();
        assert_eq!(switched.product_type, ProductType::Autre);
        assert_eq!(
            catalog.product_cost(&kitchen.coca.id).await.unwrap(),
            Money::from_units(1)
        );
        assert_eq!(
            catalog.product_cost(&kitchen.regina.id).await.unwrap(),
            Money::from_units(8)
        );
    }

    #[tokio::test]
    async fn test_bad_csv_writes_nothing() {
        let kitchen = Kitchen::memory().await;
        let catalog = service(&kitchen);

        let csv = "name,quantity,unit,cost\nTomates,10,kg,2.5\nBasilic,abc,botte,1\nHuile,,l,\n";
        let err = catalog.import_ingredients(csv.as_bytes()).await.unwrap_err();
        match err {
            DbError::Domain(CoreError::Import(import)) => {
                let lines: Vec<usize> = import.rows.iter().map(|r| r.line).collect();
                assert_eq!(lines, vec![3, 4]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(catalog.list_ingredients().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_order_import_deducts_stock_once() {
        let kitchen = Kitchen::memory().await;
        let catalog = service(&kitchen);

        let csv = "date,produits,quantites\n\
                   01/03/2024,\"Margherita;Coca\",\"2;2\"\n\
                   02/03/2024,regina,1\n";
        let sales = catalog.import_orders(csv.as_bytes()).await.unwrap();
        assert_eq!(sales.len(), 2);
        assert_eq!(sales[0].total_price, Money::from_units(24));
        assert_eq!(kitchen.stock(&kitchen.flour).await, Decimal::from(94));
        assert_eq!(kitchen.stock(&kitchen.can).await, Decimal::from(46));

        let exported = catalog.export_sales(&sales).await.unwrap();
        let text = String::from_utf8(exported).unwrap();
        assert!(text.starts_with("date,produits,quantites,prix_total\n01/03/2024,Margherita;Coca,2;2,24.00\n"));
    }

    #[tokio::test]
    async fn test_products_export_marks_unlinked() {
        let kitchen = Kitchen::memory().await;
        let catalog = service(&kitchen);
        catalog.delete_ingredient(&kitchen.can.id).await.unwrap();

        let text = String::from_utf8(catalog.export_products().await.unwrap()).unwrap();
        assert!(text.contains("Coca,2,Boisson,NON LIÉ:1"));
        assert!(text.contains("Regina,12,Pizza,Farine:2:kg;Mozzarella:0.5:kg"));
    }
}
