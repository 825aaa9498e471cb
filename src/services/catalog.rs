//! Product listing for the storefront and the dashboard: filters, sort
//! order and pagination over the product table.

use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};
use serde::Serialize;

use crate::entities::{category, product};
use crate::error::AppError;

pub const STOREFRONT_PER_PAGE: u64 = 12;
pub const ADMIN_PER_PAGE: u64 = 10;
pub const MAX_PER_PAGE: u64 = 100;
pub const FEATURED_LIMIT: u64 = 8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Newest first.
    #[default]
    Latest,
    PriceLow,
    PriceHigh,
    Name,
}

impl SortKey {
    /// Unknown or missing values fall back to [`SortKey::Latest`].
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("price_low") => SortKey::PriceLow,
            Some("price_high") => SortKey::PriceHigh,
            Some("name") => SortKey::Name,
            _ => SortKey::Latest,
        }
    }
}

/// Who is listing. The storefront only ever sees active products.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatalogScope {
    Storefront,
    Admin,
}

impl CatalogScope {
    fn default_per_page(&self) -> u64 {
        match self {
            CatalogScope::Storefront => STOREFRONT_PER_PAGE,
            CatalogScope::Admin => ADMIN_PER_PAGE,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProductCriteria {
    pub search: Option<String>,
    pub category_id: Option<i32>,
    /// Only applied together with `max_price`.
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub featured: Option<bool>,
    /// Ignored in [`CatalogScope::Storefront`].
    pub active: Option<bool>,
    pub sort: SortKey,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
}

impl Pagination {
    /// Out-of-range values are clamped, never rejected.
    pub fn resolve(page: Option<i64>, per_page: Option<i64>, default_per_page: u64) -> Self {
        let page = page.unwrap_or(1).max(1) as u64;
        let per_page = match per_page {
            Some(value) => value.clamp(1, MAX_PER_PAGE as i64) as u64,
            None => default_per_page,
        };
        Pagination { page, per_page }
    }

    fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.per_page).max(1)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

/// A product with its category resolved, as every listing returns it.
#[derive(Clone, Debug, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: product::Model,
    pub in_stock: bool,
    pub category: Option<category::Model>,
}

impl ProductView {
    pub fn new(product: product::Model, category: Option<category::Model>) -> Self {
        ProductView {
            in_stock: product.in_stock(),
            product,
            category,
        }
    }
}

pub async fn list_products<C: ConnectionTrait>(
    db: &C,
    scope: CatalogScope,
    criteria: &ProductCriteria,
) -> Result<Page<ProductView>, AppError> {
    let pagination = Pagination::resolve(
        criteria.page,
        criteria.per_page,
        scope.default_per_page(),
    );
    let condition = filter_condition(scope, criteria);

    let total = product::Entity::find()
        .filter(condition.clone())
        .count(db)
        .await?;

    let rows = sorted(product::Entity::find().filter(condition), criteria.sort)
        .find_also_related(category::Entity)
        .offset(pagination.offset())
        .limit(pagination.per_page)
        .all(db)
        .await?;

    Ok(Page {
        data: rows
            .into_iter()
            .map(|(product, category)| ProductView::new(product, category))
            .collect(),
        total,
        page: pagination.page,
        per_page: pagination.per_page,
        total_pages: pagination.total_pages(total),
    })
}

/// Active product by slug.
pub async fn find_by_slug<C: ConnectionTrait>(db: &C, slug: &str) -> Result<ProductView, AppError> {
    let found = product::Entity::find()
        .filter(product::Column::Slug.eq(slug))
        .filter(product::Column::IsActive.eq(true))
        .find_also_related(category::Entity)
        .one(db)
        .await?;

    match found {
        Some((product, category)) => Ok(ProductView::new(product, category)),
        None => Err(AppError::not_found(format!("Product `{slug}`"))),
    }
}

pub async fn featured<C: ConnectionTrait>(db: &C) -> Result<Vec<ProductView>, AppError> {
    let rows = sorted(
        product::Entity::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::IsFeatured.eq(true)),
        SortKey::Latest,
    )
    .find_also_related(category::Entity)
    .limit(FEATURED_LIMIT)
    .all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(product, category)| ProductView::new(product, category))
        .collect())
}

fn filter_condition(scope: CatalogScope, criteria: &ProductCriteria) -> Condition {
    let mut condition = Condition::all();

    match scope {
        CatalogScope::Storefront => {
            condition = condition.add(product::Column::IsActive.eq(true));
        }
        CatalogScope::Admin => {
            if let Some(active) = criteria.active {
                condition = condition.add(product::Column::IsActive.eq(active));
            }
        }
    }

    if let Some(search) = criteria
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let pattern = like_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(lower_like(product::Column::Name, &pattern))
                .add(lower_like(product::Column::Description, &pattern)),
        );
    }

    if let Some(category_id) = criteria.category_id {
        condition = condition.add(product::Column::CategoryId.eq(category_id));
    }

    //one bound alone is ignored
    if let (Some(min), Some(max)) = (criteria.min_price, criteria.max_price) {
        condition = condition.add(product::Column::Price.between(min, max));
    }

    if let Some(featured) = criteria.featured {
        condition = condition.add(product::Column::IsFeatured.eq(featured));
    }

    condition
}

/// Every order ends on a unique column so pages never overlap.
pub(crate) fn sorted(select: Select<product::Entity>, sort: SortKey) -> Select<product::Entity> {
    match sort {
        SortKey::Latest => select
            .order_by_desc(product::Column::CreatedAt)
            .order_by_desc(product::Column::Id),
        SortKey::PriceLow => select
            .order_by_asc(product::Column::Price)
            .order_by_asc(product::Column::Id),
        SortKey::PriceHigh => select
            .order_by_desc(product::Column::Price)
            .order_by_asc(product::Column::Id),
        SortKey::Name => select
            .order_by_asc(product::Column::Name)
            .order_by_asc(product::Column::Id),
    }
}

fn lower_like(column: product::Column, pattern: &str) -> sea_orm::sea_query::SimpleExpr {
    Expr::expr(Func::lower(Expr::col((product::Entity, column))))
        .like(LikeExpr::new(pattern).escape('\\'))
}

/// `%term%` with LIKE wildcards escaped. Only ASCII is lowercased, the
/// same folding SQLite's `LOWER()` applies to the column.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.to_ascii_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
