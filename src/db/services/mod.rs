//! Data access for the foodgram tables.
//!
//! Each sub-module owns one area of the schema. Functions take the caller's
//! identity explicitly and return `AppError` so handlers can forward them
//! unchanged. Everything public is re-exported under `crate::db::services`.

pub mod collection_service;
pub mod follow_service;
pub mod ingredient_service;
pub mod recipe_service;
pub mod shopping_list_service;
pub mod tag_service;
pub mod user_service;

pub use collection_service::*;
pub use follow_service::*;
pub use ingredient_service::*;
pub use recipe_service::*;
pub use shopping_list_service::*;
pub use tag_service::*;
pub use user_service::*;
