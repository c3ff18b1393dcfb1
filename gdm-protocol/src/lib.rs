pub mod cart;
pub mod catalog;

pub mod prelude {
    pub use crate::cart::{CartSelection, Fee};
    pub use crate::catalog::{
        Currency, CurrencyPosition, Product, ProductAttribute, ProductBuilder, StockStatus, Term,
    };
}
