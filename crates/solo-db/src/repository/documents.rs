//! Collection bindings for the domain records.

use solo_core::{
    Absence, Charge, DailyPayment, Employee, Ingredient, Loss, Product, PurchaseOrder, Sale,
    SalaryPayment, Supplier,
};

use crate::store::{Collection, Document};

macro_rules! document {
    ($ty:ty, $collection:expr, $entity:literal) => {
        impl Document for $ty {
            const COLLECTION: Collection = $collection;
            const ENTITY: &'static str = $entity;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

document!(Ingredient, Collection::Ingredients, "Ingredient");
document!(Product, Collection::Products, "Product");
document!(Sale, Collection::Orders, "Sale");
document!(Loss, Collection::Losses, "Loss");
document!(Supplier, Collection::Suppliers, "Supplier");
document!(PurchaseOrder, Collection::PurchaseOrders, "Purchase order");
document!(Charge, Collection::Charges, "Charge");
document!(Employee, Collection::Employees, "Employee");
document!(Absence, Collection::Absences, "Absence");
document!(SalaryPayment, Collection::SalaryPayments, "Salary payment");
document!(DailyPayment, Collection::DailyPayments, "Daily payment");
