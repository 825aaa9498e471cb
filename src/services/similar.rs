use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};

use crate::entities::{category, product};
use crate::error::AppError;
use crate::services::catalog::{sorted, ProductView, SortKey};

pub const DEFAULT_SIMILAR_LIMIT: u64 = 4;
pub const MAX_SIMILAR_LIMIT: u64 = 20;

/// Other active products from the same category as `product_id`, newest first.
pub async fn similar_to<C: ConnectionTrait>(
    db: &C,
    product_id: i32,
    limit: Option<u64>,
) -> Result<Vec<ProductView>, AppError> {
    let limit = limit
        .unwrap_or(DEFAULT_SIMILAR_LIMIT)
        .clamp(1, MAX_SIMILAR_LIMIT);

    let source = product::Entity::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {product_id}")))?;

    let peers = sorted(
        product::Entity::find()
            .filter(product::Column::CategoryId.eq(source.category_id))
            .filter(product::Column::Id.ne(source.id))
            .filter(product::Column::IsActive.eq(true)),
        SortKey::Latest,
    )
    .find_also_related(category::Entity)
    .limit(limit)
    .all(db)
    .await?;

    Ok(peers
        .into_iter()
        .map(|(product, category)| ProductView::new(product, category))
        .collect())
}
