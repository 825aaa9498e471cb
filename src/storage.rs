use axum::body::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    future::Future,
    io::ErrorKind,
    path::PathBuf,
};
use tokio::fs as tokio_fs;
use uuid::Uuid;

use crate::error::AppError;

/// Where an image belongs; also the directory it is stored under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageNamespace {
    Categories,
    Products,
    ProductGallery,
}

impl ImageNamespace {
    pub fn dir(&self) -> &'static str {
        match self {
            ImageNamespace::Categories => "categories",
            ImageNamespace::Products => "products",
            ImageNamespace::ProductGallery => "products/gallery",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileExtension {
    Jpg,
    Png,
    Webp,
}

impl FileExtension {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            "image/jpeg" => Some(FileExtension::Jpg),
            "image/png" => Some(FileExtension::Png),
            "image/webp" => Some(FileExtension::Webp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileExtension::Jpg => "jpg",
            FileExtension::Png => "png",
            FileExtension::Webp => "webp",
        }
    }
}

/// An image received from a client, not yet written anywhere.
#[derive(Clone, Debug)]
pub struct ImageUpload {
    pub content_type: String,
    pub bytes: Bytes,
}

static STORED_PATH_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(categories|products|products/gallery)/[0-9a-f]{8}(-[0-9a-f]{4}){3}-[0-9a-f]{12}\.(jpg|png|webp)$")
        .expect("stored path pattern is valid")
});

/// Local-disk object storage rooted at `UPLOAD_DIR`.
#[derive(Clone, Debug)]
pub struct ImageStore {
    root: PathBuf,
    max_bytes: usize,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Rejects uploads with an unsupported type or over the size limit.
    pub fn check(&self, field: &str, upload: &ImageUpload) -> Result<FileExtension, AppError> {
        let extension = FileExtension::from_content_type(&upload.content_type).ok_or_else(|| {
            AppError::invalid(
                field,
                format!("Unsupported content type `{}`", upload.content_type),
            )
        })?;
        if upload.bytes.is_empty() {
            return Err(AppError::invalid(field, "File is empty"));
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(AppError::invalid(
                field,
                format!("File is larger than {} bytes", self.max_bytes),
            ));
        }
        Ok(extension)
    }

    /// Writes the blob and returns the relative path to store on the record.
    pub async fn put(
        &self,
        namespace: ImageNamespace,
        upload: &ImageUpload,
    ) -> Result<String, AppError> {
        let extension = self.check("image", upload)?;
        let path = format!("{}/{}.{}", namespace.dir(), Uuid::new_v4(), extension.as_str());
        let full_path = self.root.join(&path);

        if let Some(parent) = full_path.parent() {
            tokio_fs::create_dir_all(parent)
                .await
                .map_err(|err| AppError::Storage(format!("Failed to create {parent:?}: {err}")))?;
        }
        tokio_fs::write(&full_path, &upload.bytes)
            .await
            .map_err(|err| AppError::Storage(format!("Failed to write {path}: {err}")))?;

        tracing::debug!(path = %path, bytes = upload.bytes.len(), "Stored image");
        Ok(path)
    }

    /// Removes a stored image. A file that is already gone is not an error.
    pub async fn delete(&self, path: &str) -> Result<(), AppError> {
        let full_path = self
            .resolve(path)
            .ok_or_else(|| AppError::Storage(format!("Refusing to delete `{path}`")))?;

        match tokio_fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AppError::Storage(format!("Failed to delete {path}: {err}"))),
        }
    }

    /// Best-effort delete for cleanup paths, where the request already has its outcome.
    pub async fn discard(&self, path: &str) {
        if let Err(err) = self.delete(path).await {
            tracing::warn!(path = %path, error = %err, "Failed to clean up image");
        }
    }

    /// Awaits the record write that references the freshly stored `paths`,
    /// deleting those files again if that write fails.
    pub async fn commit_or_discard<T, F>(&self, paths: &[String], write: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        match write.await {
            Ok(value) => Ok(value),
            Err(err) => {
                for path in paths {
                    self.discard(path).await;
                }
                Err(err)
            }
        }
    }

    /// Maps a stored relative path to a file under the root. Anything that
    /// `put` could not have produced is rejected.
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        if STORED_PATH_REGEX.is_match(path) {
            Some(self.root.join(path))
        } else {
            None
        }
    }
}
