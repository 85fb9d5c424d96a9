//! # Catalog Snapshot
//!
//! Read-only view over products and ingredients, indexed by id and by
//! lowercase name. Built once per operation from whatever the caller loaded
//! from the store; never cached globally.

use std::collections::HashMap;

use crate::types::{Ingredient, Product};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    ingredients: Vec<Ingredient>,
    product_ids: HashMap<String, usize>,
    ingredient_ids: HashMap<String, usize>,
    product_names: HashMap<String, usize>,
    ingredient_names: HashMap<String, usize>,
}

impl Catalog {
    /// Indexes the given records, keeping their order for listings.
    ///
    /// When two records share a name, the first one wins name lookups.
    pub fn new(products: Vec<Product>, ingredients: Vec<Ingredient>) -> Self {
        let mut catalog = Catalog::default();
        for product in products {
            let idx = catalog.products.len();
            catalog.product_ids.insert(product.id.clone(), idx);
            catalog
                .product_names
                .entry(name_key(&product.name))
                .or_insert(idx);
            catalog.products.push(product);
        }
        for ingredient in ingredients {
            let idx = catalog.ingredients.len();
            catalog.ingredient_ids.insert(ingredient.id.clone(), idx);
            catalog
                .ingredient_names
                .entry(name_key(&ingredient.name))
                .or_insert(idx);
            catalog.ingredients.push(ingredient);
        }
        catalog
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.product_ids.get(id).map(|&i| &self.products[i])
    }

    pub fn ingredient(&self, id: &str) -> Option<&Ingredient> {
        self.ingredient_ids.get(id).map(|&i| &self.ingredients[i])
    }

    /// Case-insensitive exact name match (surrounding whitespace ignored).
    pub fn product_by_name(&self, name: &str) -> Option<&Product> {
        self.product_names
            .get(&name_key(name))
            .map(|&i| &self.products[i])
    }

    /// Case-insensitive exact name match (surrounding whitespace ignored).
    pub fn ingredient_by_name(&self, name: &str) -> Option<&Ingredient> {
        self.ingredient_names
            .get(&name_key(name))
            .map(|&i| &self.ingredients[i])
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use rust_decimal::Decimal;

    #[test]
    fn test_lookup_by_name_ignores_case_and_padding() {
        let flour = Ingredient::new("Farine", Decimal::from(10), "kg", Money::from_units(2)).unwrap();
        let catalog = Catalog::new(vec![], vec![flour.clone()]);

        assert_eq!(catalog.ingredient_by_name("  farine ").map(|i| &i.id), Some(&flour.id));
        assert!(catalog.ingredient_by_name("far").is_none());
        assert_eq!(catalog.ingredient(&flour.id).map(|i| i.name.as_str()), Some("Farine"));
    }
}
