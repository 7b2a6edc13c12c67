pub use entity::{products, Id};

pub mod error;
pub mod product;
