pub mod cart_item;
pub mod category;
pub mod product;
pub mod user;

use sea_orm::{
    sea_query::Index, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, Schema, Set,
};

use crate::config::AdminSeed;
use crate::error::AppError;
use crate::entities::{
    cart_item::Entity as CartItem, category::Entity as Category, product::Entity as Product,
    user::Entity as User,
};

/// Creates every table (parents first) and the indexes the services rely on.
pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut tables = [
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(Category),
        schema.create_table_from_entity(Product),
        schema.create_table_from_entity(CartItem),
    ];
    for table in tables.iter_mut() {
        table.if_not_exists();
        db.execute(backend.build(&*table)).await?;
    }

    let mut indexes = schema.create_index_from_entity(Product);
    indexes.extend(schema.create_index_from_entity(CartItem));
    //one line per (user, product): add_to_cart upserts against this index
    indexes.push(
        Index::create()
            .name("idx-cart_items-user_id-product_id")
            .table(CartItem)
            .col(cart_item::Column::UserId)
            .col(cart_item::Column::ProductId)
            .unique()
            .to_owned(),
    );
    for index in indexes.iter_mut() {
        index.if_not_exists();
        db.execute(backend.build(&*index)).await?;
    }

    Ok(())
}

pub async fn seed_admin(db: &DatabaseConnection, seed: &AdminSeed) -> Result<(), AppError> {
    let existing = User::find()
        .filter(user::Column::Username.eq(seed.username.as_str()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let password = user::hash_password(&seed.password)
        .map_err(|err| AppError::Internal(format!("Failed to hash password: {err}")))?;

    let admin = user::ActiveModel {
        username: Set(seed.username.clone()),
        password: Set(password),
        role: Set(user::Role::Admin),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(user_id = admin.id, username = %admin.username, "Seeded admin account");
    Ok(())
}
