//! Schema bootstrap.
//!
//! Tables are derived from the SeaORM entities and created when missing, so a
//! fresh PostgreSQL database (or an in-memory SQLite one in tests) is usable
//! right after connecting.

use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Schema};
use tracing::info;

use crate::db::entities::{ingredient, recipe, recipe_ingredient, recipe_tag, tag, user};

/// Creates every table and index used by the service if it does not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Referenced tables first; PostgreSQL checks foreign keys at CREATE time.
    create_table(db, user::Entity).await?;
    create_table(db, recipe::Entity).await?;
    create_table(db, tag::Entity).await?;
    create_table(db, ingredient::Entity).await?;
    create_table(db, recipe_tag::Entity).await?;
    create_table(db, recipe_ingredient::Entity).await?;

    // A name is unique per owner, which makes name resolution race-free.
    create_index(
        db,
        Index::create()
            .name("idx_tags_user_id_name")
            .table(tag::Entity)
            .col(tag::Column::UserId)
            .col(tag::Column::Name)
            .unique()
            .if_not_exists()
            .to_owned(),
    )
    .await?;
    create_index(
        db,
        Index::create()
            .name("idx_ingredients_user_id_name")
            .table(ingredient::Entity)
            .col(ingredient::Column::UserId)
            .col(ingredient::Column::Name)
            .unique()
            .if_not_exists()
            .to_owned(),
    )
    .await?;

    info!("Database schema is up to date.");
    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let mut stmt = Schema::new(backend).create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

async fn create_index(db: &DatabaseConnection, stmt: IndexCreateStatement) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}
