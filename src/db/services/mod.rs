//! The `services` module provides a high-level API for interacting with the database.
//! It encapsulates the query logic and data access patterns, allowing the HTTP
//! handlers to work with domain models without knowing about the underlying
//! schema or queries.
//!
//! Each sub-module owns one entity, except `label_service`, which serves both
//! label kinds. Every service object is constructed with the `DatabaseConnection`
//! it works on; there is no global handle.

pub mod label_service;
pub mod recipe_service;
pub mod user_service;

pub use label_service::{IngredientService, Label, LabelService, TagService};
pub use recipe_service::{NewRecipe, RecipeChanges, RecipeFilter, RecipeService, RecipeWithLabels};
pub use user_service::{UserExtra, UserService, normalize_email};
