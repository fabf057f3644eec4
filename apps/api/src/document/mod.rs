//! Document rasterization — turns an uploaded resume into the single page
//! image the inference call carries.
//!
//! Only the first page is ever rendered. The result is JPEG, base64-wrapped,
//! tagged `image/jpeg`.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub mod encode;
pub mod poppler;

pub const JPEG_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum RasterizeError {
    #[error("document is empty")]
    EmptyDocument,

    #[error("rasterizer backend '{binary}' is unavailable: {source}")]
    BackendUnavailable {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("rasterizer failed (exit code {code:?}): {stderr}")]
    Backend { code: Option<i32>, stderr: String },

    #[error("rasterizer produced no page image")]
    NoPages,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("encoding task failed: {0}")]
    Task(String),
}

/// Inline image part of an inference request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImagePayload {
    pub mime_type: String,
    /// Base64 (standard alphabet, padded).
    pub data: String,
}

impl ImagePayload {
    pub fn jpeg(data: String) -> Self {
        Self {
            mime_type: JPEG_MIME_TYPE.to_string(),
            data,
        }
    }
}

/// Renders the first page of a document to an inline image.
///
/// Carried by the pipeline as `Arc<dyn DocumentRasterizer>` so tests and
/// alternative backends can stand in for poppler.
#[async_trait]
pub trait DocumentRasterizer: Send + Sync {
    async fn rasterize_first_page(&self, document: &[u8]) -> Result<ImagePayload, RasterizeError>;
}
