use sea_orm::{DbErr, SqlErr};

use crate::error::AppError;

/// Derives a URL-safe identifier from a display name.
///
/// Output is lowercase ASCII `[a-z0-9-]`, with runs of any other character
/// collapsed into one hyphen and no hyphen at either end. Names without a
/// single ASCII letter or digit produce an empty string.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}

/// Slug for a record named `name`; a name that yields no slug is invalid.
pub fn slug_for(name: &str) -> Result<String, AppError> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(AppError::invalid(
            "name",
            "must contain at least one latin letter or digit",
        ));
    }
    Ok(slug)
}

/// Turns a unique-index violation raised while writing `slug` into `DuplicateSlug`.
pub fn map_slug_conflict(err: DbErr, slug: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::DuplicateSlug(slug.to_string()),
        _ => AppError::Database(err),
    }
}
