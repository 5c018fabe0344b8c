//! Image upload helpers shared by the repositories and storage backends.
//!
//! Uploaded images live under a namespace (`categories/`, `menuImages/`,
//! `slideImages/`) and are referenced from documents by their resolved
//! download URL. Hosted and in-memory storage use
//! `{base}/{percent-encoded path}?alt=media`; the filesystem backend uses
//! `{base}/{encoded segments}`.

use std::time::Instant;

use carte_core::{new_document_id, Error, ImageUpload, ObjectStorage, Result};
use chrono::Utc;
use tracing::{debug, error};

const URL_SUFFIX: &str = "?alt=media";
const UNIQUE_TAG_LEN: usize = 8;

/// Strip directory components and characters that are unsafe in object paths.
pub fn sanitize_file_name(file_name: &str) -> String {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '#' | '%' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim();
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        return "unnamed_file".to_string();
    }

    if sanitized.chars().count() > 255 {
        return sanitized.chars().take(255).collect();
    }

    sanitized.to_string()
}

/// `{namespace}/{sanitized file name}`.
pub fn storage_path(namespace: &str, file_name: &str) -> String {
    format!("{}/{}", namespace, sanitize_file_name(file_name))
}

/// Prefix a file name with the current Unix time in milliseconds and a random
/// tag, so uploads of the same file name never share an object, even within
/// one millisecond.
pub fn timestamped_file_name(file_name: &str) -> String {
    let id = new_document_id();
    let tag = &id[id.len() - UNIQUE_TAG_LEN..];
    format!("{}_{}_{}", Utc::now().timestamp_millis(), tag, file_name)
}

/// Upload an image to `path` and return its resolved download URL.
pub async fn upload_image(
    storage: &dyn ObjectStorage,
    path: &str,
    image: &ImageUpload,
) -> Result<String> {
    let start = Instant::now();

    let reference = storage
        .upload(path, &image.bytes, image.content_type.as_deref())
        .await
        .map_err(|e| {
            error!(
                subsystem = "storage",
                op = "upload",
                storage_path = %path,
                error = %e,
                "Image upload failed"
            );
            as_storage_error(e)
        })?;

    let url = storage.resolve_url(&reference).await.map_err(|e| {
        error!(
            subsystem = "storage",
            op = "resolve_url",
            storage_path = %path,
            error = %e,
            "Could not resolve download URL"
        );
        as_storage_error(e)
    })?;

    debug!(
        subsystem = "storage",
        op = "upload",
        storage_path = %path,
        size = image.bytes.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Image uploaded"
    );

    Ok(url)
}

fn as_storage_error(e: Error) -> Error {
    match e {
        Error::Storage(_) => e,
        other => Error::Storage(other.to_string()),
    }
}

/// Download URL of an object path under `base_url`, with the whole path
/// encoded as one component.
pub fn object_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(path),
        URL_SUFFIX
    )
}

/// URL of an object path under `base_url` with each segment encoded and the
/// separators kept, so a static file server maps it back to the file.
pub fn file_url(base_url: &str, path: &str) -> String {
    let encoded: Vec<_> = path.split('/').map(urlencoding::encode).collect();
    format!("{}/{}", base_url.trim_end_matches('/'), encoded.join("/"))
}

/// Object path encoded in a URL built by [`object_url`] or [`file_url`], if
/// the URL belongs to `base_url`.
pub fn path_from_url(base_url: &str, url: &str) -> Option<String> {
    let base = base_url.trim_end_matches('/');
    let rest = url.strip_prefix(base)?.strip_prefix('/')?;
    let encoded = rest.split('?').next().unwrap_or(rest);
    if encoded.is_empty() {
        return None;
    }
    urlencoding::decode(encoded).ok().map(|path| path.into_owned())
}
