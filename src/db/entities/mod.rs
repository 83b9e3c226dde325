//! SeaORM entities: accounts, recipes, the per-user tag and ingredient
//! labels, and the two junction tables linking recipes to labels.

pub mod ingredient;
pub mod recipe;
pub mod recipe_ingredient;
pub mod recipe_tag;
pub mod tag;
pub mod user;

