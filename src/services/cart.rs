//! Cart lines of the calling user.
//!
//! Every operation takes the caller explicitly and only ever touches rows
//! whose `user_id` matches it. A line of someone else's cart is reported as
//! not found. There is at most one line per (user, product): the unique
//! index on those columns backs the upsert in [`add_to_cart`], so concurrent
//! adds of the same product converge on one row holding the summed quantity.
//! Writes are single statements outside any transaction: on SQLite a
//! deferred transaction that reads before writing can fail with
//! `SQLITE_BUSY` instead of waiting for the lock.

use sea_orm::{
    sea_query::{Alias, Expr, Func, OnConflict, SimpleExpr},
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};
use serde::{Deserialize, Serialize};

use crate::entities::{cart_item, product};
use crate::error::AppError;
use crate::middleware::auth::CurrentUser;

/// Upper bound for one line. Adds and increments saturate at it.
pub const MAX_LINE_QUANTITY: i64 = 9_999;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increase,
    Decrease,
}

/// A line joined with the product as it is right now. Prices are not
/// frozen at add time.
#[derive(Clone, Debug, Serialize)]
pub struct CartLine {
    pub id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub product: CartProduct,
    pub line_total: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct CartProduct {
    pub name: String,
    pub slug: String,
    pub price: f64,
    pub image: Option<String>,
    pub in_stock: bool,
}

/// Missing, zero or negative quantities mean one item.
pub fn coerce_quantity(quantity: Option<i64>) -> i32 {
    quantity
        .filter(|q| *q >= 1)
        .unwrap_or(1)
        .min(MAX_LINE_QUANTITY) as i32
}

pub async fn add_to_cart(
    db: &DatabaseConnection,
    user: Option<CurrentUser>,
    product_id: i32,
    quantity: Option<i64>,
) -> Result<cart_item::Model, AppError> {
    let user = CurrentUser::require(user)?;
    let quantity = coerce_quantity(quantity);

    if product::Entity::find_by_id(product_id)
        .one(db)
        .await?
        .is_none()
    {
        return Err(AppError::not_found(format!("Product {product_id}")));
    }

    let line = cart_item::ActiveModel {
        user_id: Set(user.user_id),
        product_id: Set(product_id),
        quantity: Set(quantity),
        ..Default::default()
    };

    //one autocommit statement; no read lock is held while it waits to write
    cart_item::Entity::insert(line)
        .on_conflict(
            OnConflict::columns([cart_item::Column::UserId, cart_item::Column::ProductId])
                .value(
                    cart_item::Column::Quantity,
                    capped(Expr::col((cart_item::Entity, cart_item::Column::Quantity)).add(quantity)),
                )
                .to_owned(),
        )
        .exec_without_returning(db)
        .await
        .map_err(|err| match err.sql_err() {
            //product removed after the existence check
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                AppError::not_found(format!("Product {product_id}"))
            }
            _ => AppError::Database(err),
        })?;

    let line = cart_item::Entity::find()
        .filter(cart_item::Column::UserId.eq(user.user_id))
        .filter(cart_item::Column::ProductId.eq(product_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {product_id}")))?;

    tracing::info!(
        user_id = user.user_id,
        product_id,
        added = quantity,
        quantity = line.quantity,
        "Added to cart"
    );
    Ok(line)
}

/// Steps a line up or down by one. Decreasing never goes below one and
/// never removes the line.
pub async fn update_quantity(
    db: &DatabaseConnection,
    user: Option<CurrentUser>,
    item_id: i32,
    direction: Direction,
) -> Result<cart_item::Model, AppError> {
    let user = CurrentUser::require(user)?;

    let update = cart_item::Entity::update_many()
        .filter(cart_item::Column::Id.eq(item_id))
        .filter(cart_item::Column::UserId.eq(user.user_id));
    let update = match direction {
        Direction::Increase => update.col_expr(
            cart_item::Column::Quantity,
            capped(Expr::col(cart_item::Column::Quantity).add(1)),
        ),
        Direction::Decrease => update
            .col_expr(
                cart_item::Column::Quantity,
                Expr::col(cart_item::Column::Quantity).sub(1),
            )
            .filter(cart_item::Column::Quantity.gt(1)),
    };
    update.exec(db).await?;

    find_owned(db, user, item_id).await
}

/// Overwrites the quantity. Not checked against stock.
pub async fn set_quantity(
    db: &DatabaseConnection,
    user: Option<CurrentUser>,
    item_id: i32,
    quantity: i64,
) -> Result<cart_item::Model, AppError> {
    let user = CurrentUser::require(user)?;
    if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
        return Err(AppError::invalid(
            "quantity",
            format!("must be between 1 and {MAX_LINE_QUANTITY}"),
        ));
    }

    cart_item::Entity::update_many()
        .col_expr(cart_item::Column::Quantity, Expr::value(quantity as i32))
        .filter(cart_item::Column::Id.eq(item_id))
        .filter(cart_item::Column::UserId.eq(user.user_id))
        .exec(db)
        .await?;

    find_owned(db, user, item_id).await
}

pub async fn remove_item(
    db: &DatabaseConnection,
    user: Option<CurrentUser>,
    item_id: i32,
) -> Result<(), AppError> {
    let user = CurrentUser::require(user)?;

    let result = cart_item::Entity::delete_many()
        .filter(cart_item::Column::Id.eq(item_id))
        .filter(cart_item::Column::UserId.eq(user.user_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::not_found(format!("Cart item {item_id}")));
    }
    tracing::info!(user_id = user.user_id, item_id, "Removed cart item");
    Ok(())
}

pub async fn list_items<C: ConnectionTrait>(
    db: &C,
    user: Option<CurrentUser>,
) -> Result<Vec<CartLine>, AppError> {
    let user = CurrentUser::require(user)?;

    let rows = cart_item::Entity::find()
        .filter(cart_item::Column::UserId.eq(user.user_id))
        .order_by_asc(cart_item::Column::Id)
        .find_also_related(product::Entity)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(line, product)| {
            let product = product?;
            Some(CartLine {
                id: line.id,
                product_id: line.product_id,
                quantity: line.quantity,
                line_total: product.price * f64::from(line.quantity),
                product: CartProduct {
                    in_stock: product.in_stock(),
                    name: product.name,
                    slug: product.slug,
                    price: product.price,
                    image: product.image,
                },
            })
        })
        .collect())
}

/// `MIN(expr, MAX_LINE_QUANTITY)`; SQLite's two-argument `MIN` is scalar.
fn capped(quantity: SimpleExpr) -> SimpleExpr {
    Func::cust(Alias::new("MIN"))
        .arg(quantity)
        .arg(MAX_LINE_QUANTITY as i32)
        .into()
}

async fn find_owned<C: ConnectionTrait>(
    db: &C,
    user: CurrentUser,
    item_id: i32,
) -> Result<cart_item::Model, AppError> {
    cart_item::Entity::find_by_id(item_id)
        .filter(cart_item::Column::UserId.eq(user.user_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Cart item {item_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_is_coerced_to_at_least_one() {
        assert_eq!(coerce_quantity(None), 1);
        assert_eq!(coerce_quantity(Some(0)), 1);
        assert_eq!(coerce_quantity(Some(-3)), 1);
        assert_eq!(coerce_quantity(Some(5)), 5);
        assert_eq!(coerce_quantity(Some(i64::MAX)), MAX_LINE_QUANTITY as i32);
    }
}
