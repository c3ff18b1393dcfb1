pub mod money;
pub mod product;

pub use money::{Currency, CurrencyPosition, MAX_DECIMALS};
pub use product::{Product, ProductAttribute, ProductBuilder, StockStatus, Term};
