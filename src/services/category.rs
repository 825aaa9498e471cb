use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use validator::Validate;

use crate::entities::{category, product};
use crate::error::AppError;
use crate::services::slug::{map_slug_conflict, slug_for};
use crate::storage::{ImageNamespace, ImageStore, ImageUpload};

#[derive(Deserialize, Validate, Clone, Debug)]
pub struct CreateCategory {
    #[validate(length(min = 1, max = 255, message = "must be 1 to 255 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 32, message = "must be 1 to 32 characters"))]
    pub color: String,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize, Validate, Clone, Debug, Default)]
pub struct UpdateCategory {
    #[validate(length(min = 1, max = 255, message = "must be 1 to 255 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 32, message = "must be 1 to 32 characters"))]
    pub color: Option<String>,
    /// An empty string clears the description.
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn list_active<C: ConnectionTrait>(db: &C) -> Result<Vec<category::Model>, AppError> {
    Ok(category::Entity::find()
        .filter(category::Column::IsActive.eq(true))
        .order_by_desc(category::Column::CreatedAt)
        .order_by_desc(category::Column::Id)
        .all(db)
        .await?)
}

pub async fn find_active_by_slug<C: ConnectionTrait>(
    db: &C,
    slug: &str,
) -> Result<category::Model, AppError> {
    category::Entity::find()
        .filter(category::Column::Slug.eq(slug))
        .filter(category::Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Category `{slug}`")))
}

/// Every category, newest first.
pub async fn list_all<C: ConnectionTrait>(db: &C) -> Result<Vec<category::Model>, AppError> {
    Ok(category::Entity::find()
        .order_by_desc(category::Column::CreatedAt)
        .order_by_desc(category::Column::Id)
        .all(db)
        .await?)
}

pub async fn get<C: ConnectionTrait>(db: &C, id: i32) -> Result<category::Model, AppError> {
    category::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Category {id}")))
}

pub async fn create(
    db: &DatabaseConnection,
    input: CreateCategory,
) -> Result<category::Model, AppError> {
    input.validate()?;
    let slug = slug_for(&input.name)?;

    let txn = db.begin().await?;
    ensure_slug_free(&txn, &slug, None).await?;

    let created = category::ActiveModel {
        name: Set(input.name),
        slug: Set(slug.clone()),
        color: Set(input.color),
        description: Set(input.description.filter(|d| !d.is_empty())),
        image: Set(None),
        is_active: Set(input.is_active.unwrap_or(true)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|err| map_slug_conflict(err, &slug))?;

    txn.commit().await?;
    tracing::info!(category_id = created.id, slug = %created.slug, "Created category");
    Ok(created)
}

/// The slug follows the name, and only changes when the name does.
pub async fn update(
    db: &DatabaseConnection,
    id: i32,
    input: UpdateCategory,
) -> Result<category::Model, AppError> {
    input.validate()?;

    let txn = db.begin().await?;
    let current = get(&txn, id).await?;
    let mut category: category::ActiveModel = current.clone().into();
    let mut slug = current.slug.clone();

    if let Some(name) = input.name {
        if name != current.name {
            slug = slug_for(&name)?;
            ensure_slug_free(&txn, &slug, Some(id)).await?;
            category.slug = Set(slug.clone());
        }
        category.name = Set(name);
    }

    if let Some(color) = input.color {
        category.color = Set(color);
    }

    if let Some(description) = input.description {
        category.description = Set(Some(description).filter(|d| !d.is_empty()));
    }

    if let Some(is_active) = input.is_active {
        category.is_active = Set(is_active);
    }

    let updated = if category.is_changed() {
        category
            .update(&txn)
            .await
            .map_err(|err| map_slug_conflict(err, &slug))?
    } else {
        current
    };
    txn.commit().await?;

    tracing::info!(category_id = id, slug = %updated.slug, "Updated category");
    Ok(updated)
}

/// Refused while any product still belongs to the category.
pub async fn delete(db: &DatabaseConnection, store: &ImageStore, id: i32) -> Result<(), AppError> {
    let txn = db.begin().await?;
    let category = get(&txn, id).await?;

    let products = product::Entity::find()
        .filter(product::Column::CategoryId.eq(id))
        .count(&txn)
        .await?;
    if products > 0 {
        return Err(AppError::CategoryInUse {
            category_id: id,
            products,
        });
    }

    category::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    if let Some(image) = category.image {
        store.discard(&image).await;
    }
    tracing::info!(category_id = id, "Deleted category");
    Ok(())
}

/// Stores the new image, points the category at it, then drops the old file.
pub async fn replace_image(
    db: &DatabaseConnection,
    store: &ImageStore,
    id: i32,
    upload: ImageUpload,
) -> Result<category::Model, AppError> {
    store.check("image", &upload)?;
    get(db, id).await?;

    let path = store.put(ImageNamespace::Categories, &upload).await?;
    let (previous, updated) = store
        .commit_or_discard(std::slice::from_ref(&path), async {
            let txn = db.begin().await?;
            let current = get(&txn, id).await?;
            let previous = current.image.clone();

            let mut category: category::ActiveModel = current.into();
            category.image = Set(Some(path.clone()));
            let updated = category.update(&txn).await?;
            txn.commit().await?;
            Ok::<_, AppError>((previous, updated))
        })
        .await?;

    if let Some(previous) = previous {
        store.discard(&previous).await;
    }
    Ok(updated)
}

async fn ensure_slug_free<C: ConnectionTrait>(
    db: &C,
    slug: &str,
    except: Option<i32>,
) -> Result<(), AppError> {
    let mut query = category::Entity::find().filter(category::Column::Slug.eq(slug));
    if let Some(id) = except {
        query = query.filter(category::Column::Id.ne(id));
    }
    match query.one(db).await? {
        Some(_) => Err(AppError::DuplicateSlug(slug.to_string())),
        None => Ok(()),
    }
}
