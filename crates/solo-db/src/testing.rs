//! Shared fixtures for the service tests.

use std::sync::Arc;

use rust_decimal::Decimal;
use solo_core::{
    Consumption, Ingredient, Money, Product, ProductType, RecipeLine, SaleLine,
};

use crate::repository::Repository;
use crate::store::{MemoryStore, SharedStore};

/// A small pizzeria: flour, mozzarella, cans; two pizzas and a soda.
pub(crate) struct Kitchen {
    pub store: SharedStore,
    /// 100 kg at 2.00
    pub flour: Ingredient,
    /// 20 kg at 8.00
    pub mozza: Ingredient,
    /// 48 cans at 0.50
    pub can: Ingredient,
    /// Pizza at 10.00: flour 2
    pub margherita: Product,
    /// Pizza at 12.00: flour 2, mozza 0.5
    pub regina: Product,
    /// Boisson at 2.00: 1 can
    pub coca: Product,
}

fn recipe_line(ingredient: &Ingredient, quantity: Decimal) -> RecipeLine {
    RecipeLine {
        ingredient_id: ingredient.id.clone(),
        name: ingredient.name.clone(),
        quantity,
        unit: ingredient.unit.clone(),
    }
}

impl Kitchen {
    pub async fn memory() -> Self {
        Kitchen::open(Arc::new(MemoryStore::new())).await
    }

    pub async fn open(store: SharedStore) -> Self {
        let flour = Ingredient::new("Farine", Decimal::from(100), "kg", Money::from_units(2)).unwrap();
        let mozza = Ingredient::new("Mozzarella", Decimal::from(20), "kg", Money::from_units(8)).unwrap();
        let can = Ingredient::new("Canette Coca", Decimal::from(48), "p", Money::from_cents(50)).unwrap();

        let margherita = Product::new(
            "Margherita",
            Money::from_units(10),
            ProductType::Pizza,
            Consumption::Recipe {
                lines: vec![recipe_line(&flour, Decimal::TWO)],
            },
        )
        .unwrap();
        let regina = Product::new(
            "Regina",
            Money::from_units(12),
            ProductType::Pizza,
            Consumption::Recipe {
                lines: vec![
                    recipe_line(&flour, Decimal::TWO),
                    recipe_line(&mozza, Decimal::new(5, 1)),
                ],
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

        let ingredients = Repository::<Ingredient>::new(store.clone());
        for ingredient in [&flour, &mozza, &can] {
            ingredients.create(ingredient).await.unwrap();
        }
        let products = Repository::<Product>::new(store.clone());
        for product in [&margherita, &regina, &coca] {
            products.create(product).await.unwrap();
        }

        Kitchen {
            store,
            flour,
            mozza,
            can,
            margherita,
            regina,
            coca,
        }
    }

    pub fn line(&self, product: &Product, quantity: i64) -> SaleLine {
        SaleLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            quantity: Decimal::from(quantity),
            price: product.price,
            returned: None,
        }
    }

    pub async fn stock(&self, ingredient: &Ingredient) -> Decimal {
        Repository::<Ingredient>::new(self.store.clone())
            .require(&ingredient.id)
            .await
            .unwrap()
            .quantity
    }
}
