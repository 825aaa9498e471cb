use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::Deserialize;
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use crate::entities::{cart_item, category, product};
use crate::error::AppError;
use crate::services::catalog::ProductView;
use crate::services::slug::{map_slug_conflict, slug_for};
use crate::storage::{ImageNamespace, ImageStore, ImageUpload};

static COLOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^=]+=#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("color pattern is valid")
});

#[derive(Deserialize, Validate, Clone, Debug)]
pub struct CreateProduct {
    #[validate(length(min = 1, max = 255, message = "must be 1 to 255 characters"))]
    pub name: String,
    pub category_id: i32,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub price: f64,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub original_price: Option<f64>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    #[validate(custom(function = "validate_features"))]
    pub features: Vec<String>,
    #[serde(default)]
    #[validate(custom(function = "validate_colors"))]
    pub colors: Vec<String>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub stock: Option<i32>,
}

#[derive(Deserialize, Validate, Clone, Debug, Default)]
pub struct UpdateProduct {
    #[validate(length(min = 1, max = 255, message = "must be 1 to 255 characters"))]
    pub name: Option<String>,
    pub category_id: Option<i32>,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub price: Option<f64>,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub original_price: Option<f64>,
    /// Drops the reference price.
    #[serde(default)]
    pub clear_original_price: bool,
    pub description: Option<String>,
    #[validate(custom(function = "validate_features"))]
    pub features: Option<Vec<String>>,
    #[validate(custom(function = "validate_colors"))]
    pub colors: Option<Vec<String>>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub stock: Option<i32>,
}

fn validate_features(features: &Vec<String>) -> Result<(), ValidationError> {
    if features.iter().any(|f| f.trim().is_empty()) {
        return Err(ValidationError::new("features")
            .with_message(Cow::from("entries must not be empty")));
    }
    Ok(())
}

fn validate_colors(colors: &Vec<String>) -> Result<(), ValidationError> {
    if let Some(bad) = colors.iter().find(|c| !COLOR_REGEX.is_match(c)) {
        return Err(ValidationError::new("colors").with_message(Cow::from(format!(
            "`{bad}` is not of the form name=#rrggbb"
        ))));
    }
    Ok(())
}

/// Product in any state, for the dashboard.
pub async fn get<C: ConnectionTrait>(db: &C, id: i32) -> Result<ProductView, AppError> {
    product::Entity::find_by_id(id)
        .find_also_related(category::Entity)
        .one(db)
        .await?
        .map(|(product, category)| ProductView::new(product, category))
        .ok_or_else(|| AppError::not_found(format!("Product {id}")))
}

pub async fn create(db: &DatabaseConnection, input: CreateProduct) -> Result<ProductView, AppError> {
    input.validate()?;
    let slug = slug_for(&input.name)?;

    let txn = db.begin().await?;
    ensure_category(&txn, input.category_id).await?;
    ensure_slug_free(&txn, &slug, None).await?;

    let created = product::ActiveModel {
        name: Set(input.name),
        slug: Set(slug.clone()),
        category_id: Set(input.category_id),
        price: Set(input.price),
        original_price: Set(input.original_price),
        description: Set(input.description),
        features: Set(input.features.into()),
        colors: Set(input.colors.into()),
        image: Set(None),
        images: Set(product::StringList::default()),
        is_featured: Set(input.is_featured.unwrap_or(false)),
        is_active: Set(input.is_active.unwrap_or(true)),
        stock: Set(input.stock.unwrap_or(0)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|err| map_slug_conflict(err, &slug))?;

    let view = get(&txn, created.id).await?;
    txn.commit().await?;

    tracing::info!(product_id = created.id, slug = %created.slug, "Created product");
    Ok(view)
}

/// Partial update. The slug is regenerated only when the name changes.
pub async fn update(
    db: &DatabaseConnection,
    id: i32,
    input: UpdateProduct,
) -> Result<ProductView, AppError> {
    input.validate()?;

    let txn = db.begin().await?;
    let current = find(&txn, id).await?;
    let mut product: product::ActiveModel = current.clone().into();
    let mut slug = current.slug.clone();

    if let Some(name) = input.name {
        if name != current.name {
            slug = slug_for(&name)?;
            ensure_slug_free(&txn, &slug, Some(id)).await?;
            product.slug = Set(slug.clone());
        }
        product.name = Set(name);
    }

    if let Some(category_id) = input.category_id {
        if category_id != current.category_id {
            ensure_category(&txn, category_id).await?;
        }
        product.category_id = Set(category_id);
    }

    if let Some(price) = input.price {
        product.price = Set(price);
    }

    if input.clear_original_price {
        product.original_price = Set(None);
    } else if let Some(original_price) = input.original_price {
        product.original_price = Set(Some(original_price));
    }

    if let Some(description) = input.description {
        product.description = Set(description);
    }

    if let Some(features) = input.features {
        product.features = Set(features.into());
    }

    if let Some(colors) = input.colors {
        product.colors = Set(colors.into());
    }

    if let Some(is_featured) = input.is_featured {
        product.is_featured = Set(is_featured);
    }

    if let Some(is_active) = input.is_active {
        product.is_active = Set(is_active);
    }

    if let Some(stock) = input.stock {
        product.stock = Set(stock);
    }

    if product.is_changed() {
        product
            .update(&txn)
            .await
            .map_err(|err| map_slug_conflict(err, &slug))?;
    }
    let view = get(&txn, id).await?;
    txn.commit().await?;

    tracing::info!(product_id = id, slug = %view.product.slug, "Updated product");
    Ok(view)
}

/// Deletes the product with every cart line pointing at it, then its images.
pub async fn delete(db: &DatabaseConnection, store: &ImageStore, id: i32) -> Result<(), AppError> {
    let txn = db.begin().await?;
    let product = find(&txn, id).await?;

    let lines = cart_item::Entity::delete_many()
        .filter(cart_item::Column::ProductId.eq(id))
        .exec(&txn)
        .await?;
    product::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    for path in product.image.iter().chain(product.images.0.iter()) {
        store.discard(path).await;
    }
    tracing::info!(
        product_id = id,
        cart_lines = lines.rows_affected,
        "Deleted product"
    );
    Ok(())
}

/// Stores the new primary image, points the product at it, then drops the old file.
pub async fn replace_image(
    db: &DatabaseConnection,
    store: &ImageStore,
    id: i32,
    upload: ImageUpload,
) -> Result<ProductView, AppError> {
    store.check("image", &upload)?;
    find(db, id).await?;

    let path = store.put(ImageNamespace::Products, &upload).await?;
    let (previous, view) = store
        .commit_or_discard(std::slice::from_ref(&path), async {
            let txn = db.begin().await?;
            let current = find(&txn, id).await?;
            let previous = current.image.clone();

            let mut product: product::ActiveModel = current.into();
            product.image = Set(Some(path.clone()));
            product.update(&txn).await?;
            let view = get(&txn, id).await?;
            txn.commit().await?;
            Ok::<_, AppError>((previous, view))
        })
        .await?;

    if let Some(previous) = previous {
        store.discard(&previous).await;
    }
    Ok(view)
}

/// Appends images to the gallery, keeping upload order. Either every
/// upload lands on the product or none does.
pub async fn add_gallery_images(
    db: &DatabaseConnection,
    store: &ImageStore,
    id: i32,
    uploads: Vec<ImageUpload>,
) -> Result<ProductView, AppError> {
    if uploads.is_empty() {
        return Err(AppError::invalid("images", "at least one image is required"));
    }
    for upload in &uploads {
        store.check("images", upload)?;
    }
    find(db, id).await?;

    let mut paths = Vec::with_capacity(uploads.len());
    for upload in &uploads {
        match store.put(ImageNamespace::ProductGallery, upload).await {
            Ok(path) => paths.push(path),
            Err(err) => {
                for path in &paths {
                    store.discard(path).await;
                }
                return Err(err);
            }
        }
    }

    store
        .commit_or_discard(&paths, async {
            let txn = db.begin().await?;
            let current = find(&txn, id).await?;
            let mut gallery = current.images.0.clone();
            gallery.extend(paths.iter().cloned());

            let mut product: product::ActiveModel = current.into();
            product.images = Set(gallery.into());
            product.update(&txn).await?;
            let view = get(&txn, id).await?;
            txn.commit().await?;
            Ok::<_, AppError>(view)
        })
        .await
}

/// Removes the gallery image at `index` (0-based) from the product and from storage.
pub async fn remove_gallery_image(
    db: &DatabaseConnection,
    store: &ImageStore,
    id: i32,
    index: usize,
) -> Result<ProductView, AppError> {
    let txn = db.begin().await?;
    let current = find(&txn, id).await?;

    let mut gallery = current.images.0.clone();
    if index >= gallery.len() {
        return Err(AppError::not_found(format!(
            "Gallery image {index} of product {id}"
        )));
    }
    let removed = gallery.remove(index);

    let mut product: product::ActiveModel = current.into();
    product.images = Set(gallery.into());
    product.update(&txn).await?;
    let view = get(&txn, id).await?;
    txn.commit().await?;

    store.discard(&removed).await;
    Ok(view)
}

async fn find<C: ConnectionTrait>(db: &C, id: i32) -> Result<product::Model, AppError> {
    product::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {id}")))
}

async fn ensure_category<C: ConnectionTrait>(db: &C, category_id: i32) -> Result<(), AppError> {
    match category::Entity::find_by_id(category_id).one(db).await? {
        Some(_) => Ok(()),
        None => Err(AppError::not_found(format!("Category {category_id}"))),
    }
}

async fn ensure_slug_free<C: ConnectionTrait>(
    db: &C,
    slug: &str,
    except: Option<i32>,
) -> Result<(), AppError> {
    let mut query = product::Entity::find().filter(product::Column::Slug.eq(slug));
    if let Some(id) = except {
        query = query.filter(product::Column::Id.ne(id));
    }
    match query.one(db).await? {
        Some(_) => Err(AppError::DuplicateSlug(slug.to_string())),
        None => Ok(()),
    }
}
