//! Per-user labels (tags and ingredients) and their association with recipes.
//!
//! Both label kinds share one table shape: `id`, `user_id` and a `name` unique
//! per user, linked to recipes through a `(recipe_id, label_id)` junction table.
//! [`Label`] names those columns for an entity so that [`LabelService`] and the
//! nested resolution helpers are written once.

use std::marker::PhantomData;

use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use tracing::info;

use crate::db::entities::{ingredient, recipe_ingredient, recipe_tag, tag};
use crate::web::error::AppError;

/// An entity usable as a recipe label.
pub trait Label: EntityTrait {
    /// Junction entity linking this label to recipes.
    type Link: EntityTrait;

    /// Human-readable kind, used in messages and logs.
    const KIND: &'static str;
    const CONFLICT_MESSAGE: &'static str;

    fn id_column() -> Self::Column;
    fn user_id_column() -> Self::Column;
    fn name_column() -> Self::Column;

    fn link_recipe_column() -> <Self::Link as EntityTrait>::Column;
    fn link_label_column() -> <Self::Link as EntityTrait>::Column;

    fn label_id(model: &Self::Model) -> i32;
    fn label_name(model: &Self::Model) -> &str;
}

impl Label for tag::Entity {
    type Link = recipe_tag::Entity;

    const KIND: &'static str = "Tag";
    const CONFLICT_MESSAGE: &'static str = "A tag with this name already exists.";

    fn id_column() -> tag::Column {
        tag::Column::Id
    }
    fn user_id_column() -> tag::Column {
        tag::Column::UserId
    }
    fn name_column() -> tag::Column {
        tag::Column::Name
    }
    fn link_recipe_column() -> recipe_tag::Column {
        recipe_tag::Column::RecipeId
    }
    fn link_label_column() -> recipe_tag::Column {
        recipe_tag::Column::TagId
    }
    fn label_id(model: &tag::Model) -> i32 {
        model.id
    }
    fn label_name(model: &tag::Model) -> &str {
        &model.name
    }
}

impl Label for ingredient::Entity {
    type Link = recipe_ingredient::Entity;

    const KIND: &'static str = "Ingredient";
    const CONFLICT_MESSAGE: &'static str = "An ingredient with this name already exists.";

    fn id_column() -> ingredient::Column {
        ingredient::Column::Id
    }
    fn user_id_column() -> ingredient::Column {
        ingredient::Column::UserId
    }
    fn name_column() -> ingredient::Column {
        ingredient::Column::Name
    }
    fn link_recipe_column() -> recipe_ingredient::Column {
        recipe_ingredient::Column::RecipeId
    }
    fn link_label_column() -> recipe_ingredient::Column {
        recipe_ingredient::Column::IngredientId
    }
    fn label_id(model: &ingredient::Model) -> i32 {
        model.id
    }
    fn label_name(model: &ingredient::Model) -> &str {
        &model.name
    }
}

pub type TagService = LabelService<tag::Entity>;
pub type IngredientService = LabelService<ingredient::Entity>;

pub struct LabelService<E> {
    db: DatabaseConnection,
    _label: PhantomData<E>,
}

impl<E> Clone for LabelService<E> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            _label: PhantomData,
        }
    }
}

impl<E: Label> LabelService<E> {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            _label: PhantomData,
        }
    }

    /// Lists the user's labels by name, descending. With `assigned_only`, only
    /// labels attached to at least one recipe are returned.
    pub async fn list(&self, user_id: i32, assigned_only: bool) -> Result<Vec<E::Model>, AppError> {
        let mut query = E::find().filter(E::user_id_column().eq(user_id));
        if assigned_only {
            query = query.filter(
                E::id_column().in_subquery(
                    Query::select()
                        .column(E::link_label_column())
                        .from(E::Link::default())
                        .to_owned(),
                ),
            );
        }
        Ok(query.order_by_desc(E::name_column()).all(&self.db).await?)
    }

    /// Creates a standalone label. A name the user already has is a conflict.
    pub async fn create(&self, user_id: i32, name: &str) -> Result<E::Model, AppError> {
        if find_by_name::<E, _>(&self.db, user_id, name).await?.is_some() {
            return Err(AppError::Conflict(E::CONFLICT_MESSAGE.to_string()));
        }
        insert_label::<E, _>(&self.db, user_id, name, false).await?;
        let model = find_by_name::<E, _>(&self.db, user_id, name)
            .await?
            .ok_or_else(|| unresolved::<E>(name))?;
        info!(user_id, label_id = E::label_id(&model), kind = E::KIND, "Label created.");
        Ok(model)
    }

    /// Renames one of the user's labels.
    pub async fn rename(&self, user_id: i32, label_id: i32, name: &str) -> Result<E::Model, AppError> {
        let model = find_owned::<E, _>(&self.db, user_id, label_id).await?;
        if E::label_name(&model) == name {
            return Ok(model);
        }
        if find_by_name::<E, _>(&self.db, user_id, name).await?.is_some() {
            return Err(AppError::Conflict(E::CONFLICT_MESSAGE.to_string()));
        }

        E::update_many()
            .col_expr(E::name_column(), Expr::value(name.to_owned()))
            .filter(E::id_column().eq(label_id))
            .exec(&self.db)
            .await?;
        find_owned::<E, _>(&self.db, user_id, label_id).await
    }

    /// Deletes one of the user's labels. Recipes using it only lose the association.
    pub async fn delete(&self, user_id: i32, label_id: i32) -> Result<(), AppError> {
        let txn = self.db.begin().await?;
        find_owned::<E, _>(&txn, user_id, label_id).await?;

        E::Link::delete_many()
            .filter(E::link_label_column().eq(label_id))
            .exec(&txn)
            .await?;
        E::delete_many()
            .filter(E::id_column().eq(label_id))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        info!(user_id, label_id, kind = E::KIND, "Label deleted.");
        Ok(())
    }
}

fn unresolved<E: Label>(name: &str) -> DbErr {
    DbErr::RecordNotFound(format!("{} '{name}' could not be resolved", E::KIND))
}

async fn find_owned<E, C>(conn: &C, user_id: i32, label_id: i32) -> Result<E::Model, AppError>
where
    E: Label,
    C: ConnectionTrait,
{
    E::find()
        .filter(E::id_column().eq(label_id))
        .filter(E::user_id_column().eq(user_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No {} matches the given query.", E::KIND)))
}

async fn find_by_name<E, C>(conn: &C, user_id: i32, name: &str) -> Result<Option<E::Model>, DbErr>
where
    E: Label,
    C: ConnectionTrait,
{
    E::find()
        .filter(E::user_id_column().eq(user_id))
        .filter(E::name_column().eq(name))
        .one(conn)
        .await
}

/// Inserts a `(user_id, name)` row. With `skip_existing` the insert is
/// `ON CONFLICT DO NOTHING` against the `(user_id, name)` unique index.
async fn insert_label<E, C>(conn: &C, user_id: i32, name: &str, skip_existing: bool) -> Result<(), DbErr>
where
    E: Label,
    C: ConnectionTrait,
{
    let mut insert = Query::insert();
    insert
        .into_table(E::default())
        .columns([E::user_id_column(), E::name_column()])
        .values([user_id.into(), name.into()])
        .map_err(|err| DbErr::Custom(err.to_string()))?;
    if skip_existing {
        insert.on_conflict(
            OnConflict::columns([E::user_id_column(), E::name_column()])
                .do_nothing()
                .to_owned(),
        );
    }
    let backend = conn.get_database_backend();
    conn.execute(backend.build(&insert)).await?;
    Ok(())
}

/// Returns the user's label called `name`, creating it if needed.
///
/// A concurrent request creating the same label is picked up by the second
/// lookup instead of producing a duplicate or failing the transaction.
pub async fn resolve_or_create<E, C>(conn: &C, user_id: i32, name: &str) -> Result<E::Model, DbErr>
where
    E: Label,
    C: ConnectionTrait,
{
    if let Some(existing) = find_by_name::<E, _>(conn, user_id, name).await? {
        return Ok(existing);
    }
    insert_label::<E, _>(conn, user_id, name, true).await?;
    find_by_name::<E, _>(conn, user_id, name)
        .await?
        .ok_or_else(|| unresolved::<E>(name))
}

/// Replaces the full label set of a recipe with the labels named in `names`.
///
/// Names are resolved in order of appearance; a repeated name maps to the same
/// label. An empty slice clears the association. Returns the resolved labels.
pub async fn replace_recipe_labels<E, C>(
    conn: &C,
    user_id: i32,
    recipe_id: i32,
    names: &[String],
) -> Result<Vec<E::Model>, DbErr>
where
    E: Label,
    C: ConnectionTrait,
{
    let mut resolved: Vec<E::Model> = Vec::with_capacity(names.len());
    for name in names {
        if resolved.iter().any(|label| E::label_name(label) == name) {
            continue;
        }
        resolved.push(resolve_or_create::<E, _>(conn, user_id, name).await?);
    }

    E::Link::delete_many()
        .filter(E::link_recipe_column().eq(recipe_id))
        .exec(conn)
        .await?;

    if !resolved.is_empty() {
        let mut links = Query::insert();
        links
            .into_table(E::Link::default())
            .columns([E::link_recipe_column(), E::link_label_column()]);
        for label in &resolved {
            links
                .values([recipe_id.into(), E::label_id(label).into()])
                .map_err(|err| DbErr::Custom(err.to_string()))?;
        }
        let backend = conn.get_database_backend();
        conn.execute(backend.build(&links)).await?;
    }

    Ok(resolved)
}
