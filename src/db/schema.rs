//! Creates the tables and indexes described by the entities.
//!
//! Tables are created in foreign-key order and every statement is
//! `IF NOT EXISTS`, so running this against an existing database is a no-op.

use sea_orm::{
    sea_query::{Expr, Iden, Index, IndexCreateStatement, TableCreateStatement},
    ConnectionTrait, DbErr, EntityTrait, Schema,
};

use crate::db::entities::{prelude::*, *};

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    create_table_with(db, schema, entity, |_| {}).await
}

async fn create_table_with<C, E, F>(
    db: &C,
    schema: &Schema,
    entity: E,
    customize: F,
) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
    F: FnOnce(&mut TableCreateStatement),
{
    let backend = db.get_database_backend();
    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    customize(&mut table);
    db.execute(backend.build(&table)).await?;

    for mut index in schema.create_index_from_entity(entity) {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }
    Ok(())
}

fn unique_pair<E, A, B>(entity: E, name: &str, a: A, b: B) -> IndexCreateStatement
where
    E: Iden + 'static,
    A: Iden + 'static,
    B: Iden + 'static,
{
    Index::create()
        .name(name)
        .table(entity)
        .col(a)
        .col(b)
        .unique()
        .if_not_exists()
        .to_owned()
}

pub async fn create_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    create_table(db, &schema, User).await?;
    create_table(db, &schema, Tag).await?;
    create_table(db, &schema, Ingredient).await?;
    create_table(db, &schema, Recipe).await?;
    create_table(db, &schema, RecipeIngredient).await?;
    create_table(db, &schema, RecipeTag).await?;
    create_table(db, &schema, Favorite).await?;
    create_table(db, &schema, ShoppingCart).await?;
    create_table_with(db, &schema, Follow, |table| {
        table.check(Expr::col(follow::Column::UserId).ne(Expr::col(follow::Column::AuthorId)));
    })
    .await?;

    let unique_indexes = [
        unique_pair(
            Ingredient,
            "uq_ingredient_name_unit",
            ingredient::Column::Name,
            ingredient::Column::MeasurementUnit,
        ),
        unique_pair(
            Recipe,
            "uq_recipe_name_author",
            recipe::Column::Name,
            recipe::Column::AuthorId,
        ),
        unique_pair(
            RecipeIngredient,
            "uq_recipe_ingredient",
            recipe_ingredient::Column::RecipeId,
            recipe_ingredient::Column::IngredientId,
        ),
        unique_pair(
            Favorite,
            "uq_favorite_user_recipe",
            favorite::Column::UserId,
            favorite::Column::RecipeId,
        ),
        unique_pair(
            ShoppingCart,
            "uq_shopping_cart_user_recipe",
            shopping_cart::Column::UserId,
            shopping_cart::Column::RecipeId,
        ),
        unique_pair(
            Follow,
            "uq_follow_user_author",
            follow::Column::UserId,
            follow::Column::AuthorId,
        ),
    ];
    for index in unique_indexes {
        db.execute(backend.build(&index)).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

    use crate::db::{self, entities::*};

    async fn insert_user(db: &sea_orm::DatabaseConnection, name: &str) -> user::Model {
        user::ActiveModel {
            email: Set(format!("{name}@example.com")),
            username: Set(name.to_string()),
            first_name: Set(name.to_string()),
            last_name: Set(name.to_string()),
            password_hash: Set("x".to_string()),
            role: Set("user".to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    fn follow_row(user_id: i32, author_id: i32) -> follow::ActiveModel {
        follow::ActiveModel {
            user_id: Set(user_id),
            author_id: Set(author_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_follows_table_rejects_self_follow() {
        let db = db::connect("sqlite::memory:").await.unwrap();
        let alice = insert_user(&db, "alice").await;
        let bob = insert_user(&db, "bob").await;

        assert!(follow_row(alice.id, alice.id).insert(&db).await.is_err());
        assert!(follow_row(alice.id, bob.id).insert(&db).await.is_ok());
        assert_eq!(follow::Entity::find().count(&db).await.unwrap(), 1);
    }
}
