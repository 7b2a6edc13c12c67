//! This module re-exports various items from the `entity_api` crate.
//!
//! The purpose of this re-export is to ensure that consumers of the `domain` crate do not need to
//! directly depend on the `entity_api` crate. Business rules (validation, what gets published
//! after a write) live here; persistence lives in `entity_api`.
pub use entity_api::{products, Id};

pub mod error;
pub mod product;
