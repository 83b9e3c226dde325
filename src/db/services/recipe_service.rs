use rust_decimal::Decimal;
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, LoaderTrait,
    ModelTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info};

use crate::db::entities::{ingredient, recipe, recipe_ingredient, recipe_tag, tag};
use crate::db::services::label_service::replace_recipe_labels;
use crate::web::error::AppError;

const NOT_FOUND: &str = "No Recipe matches the given query.";

/// A recipe together with its tags and ingredients, each ordered by id.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeWithLabels {
    pub recipe: recipe::Model,
    pub tags: Vec<tag::Model>,
    pub ingredients: Vec<ingredient::Model>,
}

/// Validated input for a new recipe. `None` for `tags`/`ingredients` means the
/// key was absent from the request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub description: String,
    pub link: String,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

/// Validated input for an update. Only `Some` fields are written; a `Some`
/// label list (even empty) replaces the whole association.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

/// List filter: a recipe matches when it carries any of the given tag ids
/// and any of the given ingredient ids. Empty lists do not filter.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub tag_ids: Vec<i32>,
    pub ingredient_ids: Vec<i32>,
}

#[derive(Clone)]
pub struct RecipeService {
    db: DatabaseConnection,
}

impl RecipeService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists the user's recipes, newest first.
    pub async fn list_recipes(
        &self,
        user_id: i32,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeWithLabels>, AppError> {
        let mut query = recipe::Entity::find().filter(recipe::Column::UserId.eq(user_id));

        if !filter.tag_ids.is_empty() {
            query = query.filter(
                recipe::Column::Id.in_subquery(
                    Query::select()
                        .column(recipe_tag::Column::RecipeId)
                        .from(recipe_tag::Entity)
                        .and_where(recipe_tag::Column::TagId.is_in(filter.tag_ids.clone()))
                        .to_owned(),
                ),
            );
        }
        if !filter.ingredient_ids.is_empty() {
            query = query.filter(
                recipe::Column::Id.in_subquery(
                    Query::select()
                        .column(recipe_ingredient::Column::RecipeId)
                        .from(recipe_ingredient::Entity)
                        .and_where(
                            recipe_ingredient::Column::IngredientId
                                .is_in(filter.ingredient_ids.clone()),
                        )
                        .to_owned(),
                ),
            );
        }

        let recipes = query.order_by_desc(recipe::Column::Id).all(&self.db).await?;
        let tags = recipes
            .load_many_to_many(tag::Entity, recipe_tag::Entity, &self.db)
            .await?;
        let ingredients = recipes
            .load_many_to_many(ingredient::Entity, recipe_ingredient::Entity, &self.db)
            .await?;

        debug!(user_id, count = recipes.len(), "Listed recipes.");

        Ok(recipes
            .into_iter()
            .zip(tags)
            .zip(ingredients)
            .map(|((recipe, mut tags), mut ingredients)| {
                tags.sort_by_key(|t| t.id);
                ingredients.sort_by_key(|i| i.id);
                RecipeWithLabels {
                    recipe,
                    tags,
                    ingredients,
                }
            })
            .collect())
    }

    /// Returns one of the user's recipes. Another user's recipe is reported as
    /// not found, exactly like a missing one.
    pub async fn get_recipe(&self, user_id: i32, recipe_id: i32) -> Result<RecipeWithLabels, AppError> {
        let recipe = find_owned_recipe(&self.db, user_id, recipe_id).await?;
        load_labels(&self.db, recipe).await
    }

    /// Creates a recipe owned by `user_id`, resolving its tags and ingredients
    /// in the same transaction.
    pub async fn create_recipe(&self, user_id: i32, new: NewRecipe) -> Result<RecipeWithLabels, AppError> {
        let txn = self.db.begin().await?;

        let recipe = recipe::ActiveModel {
            user_id: Set(user_id),
            title: Set(new.title),
            time_minutes: Set(new.time_minutes),
            price: Set(new.price),
            description: Set(new.description),
            link: Set(new.link),
            ..Default::default() // id is set by the database
        }
        .insert(&txn)
        .await?;

        if let Some(names) = &new.tags {
            replace_recipe_labels::<tag::Entity, _>(&txn, user_id, recipe.id, names).await?;
        }
        if let Some(names) = &new.ingredients {
            replace_recipe_labels::<ingredient::Entity, _>(&txn, user_id, recipe.id, names).await?;
        }

        let created = load_labels(&txn, recipe).await?;
        txn.commit().await?;

        info!(user_id, recipe_id = created.recipe.id, "Recipe created.");
        Ok(created)
    }

    /// Applies `changes` to one of the user's recipes. Ownership never changes.
    pub async fn update_recipe(
        &self,
        user_id: i32,
        recipe_id: i32,
        changes: RecipeChanges,
    ) -> Result<RecipeWithLabels, AppError> {
        let txn = self.db.begin().await?;
        let existing = find_owned_recipe(&txn, user_id, recipe_id).await?;

        let mut active_model: recipe::ActiveModel = existing.clone().into();
        if let Some(title) = changes.title {
            active_model.title = Set(title);
        }
        if let Some(time_minutes) = changes.time_minutes {
            active_model.time_minutes = Set(time_minutes);
        }
        if let Some(price) = changes.price {
            active_model.price = Set(price);
        }
        if let Some(description) = changes.description {
            active_model.description = Set(description);
        }
        if let Some(link) = changes.link {
            active_model.link = Set(link);
        }
        let recipe = if active_model.is_changed() {
            active_model.update(&txn).await?
        } else {
            existing
        };

        if let Some(names) = &changes.tags {
            replace_recipe_labels::<tag::Entity, _>(&txn, user_id, recipe.id, names).await?;
        }
        if let Some(names) = &changes.ingredients {
            replace_recipe_labels::<ingredient::Entity, _>(&txn, user_id, recipe.id, names).await?;
        }

        let updated = load_labels(&txn, recipe).await?;
        txn.commit().await?;

        info!(user_id, recipe_id, "Recipe updated.");
        Ok(updated)
    }

    /// Deletes one of the user's recipes and its association rows. Tags and
    /// ingredients themselves are kept.
    pub async fn delete_recipe(&self, user_id: i32, recipe_id: i32) -> Result<(), AppError> {
        let txn = self.db.begin().await?;
        let recipe = find_owned_recipe(&txn, user_id, recipe_id).await?;

        recipe_tag::Entity::delete_many()
            .filter(recipe_tag::Column::RecipeId.eq(recipe.id))
            .exec(&txn)
            .await?;
        recipe_ingredient::Entity::delete_many()
            .filter(recipe_ingredient::Column::RecipeId.eq(recipe.id))
            .exec(&txn)
            .await?;
        recipe::Entity::delete_by_id(recipe.id).exec(&txn).await?;
        txn.commit().await?;

        info!(user_id, recipe_id, "Recipe deleted.");
        Ok(())
    }
}

async fn find_owned_recipe<C>(conn: &C, user_id: i32, recipe_id: i32) -> Result<recipe::Model, AppError>
where
    C: ConnectionTrait,
{
    recipe::Entity::find_by_id(recipe_id)
        .filter(recipe::Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))
}

async fn load_labels<C>(conn: &C, recipe: recipe::Model) -> Result<RecipeWithLabels, AppError>
where
    C: ConnectionTrait,
{
    let tags = recipe
        .find_related(tag::Entity)
        .order_by_asc(tag::Column::Id)
        .all(conn)
        .await?;
    let ingredients = recipe
        .find_related(ingredient::Entity)
        .order_by_asc(ingredient::Column::Id)
        .all(conn)
        .await?;
    Ok(RecipeWithLabels {
        recipe,
        tags,
        ingredients,
    })
}
