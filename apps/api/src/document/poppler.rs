//! Poppler-backed rasterizer. Shells out to `pdftoppm`, which renders page 1
//! to PNG inside a scratch directory; the PNG is then re-encoded to JPEG.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use image::ImageFormat;
use tokio::process::Command;
use tracing::debug;

use crate::document::encode::encode_jpeg_payload;
use crate::document::{DocumentRasterizer, ImagePayload, RasterizeError};

const INPUT_FILE: &str = "resume.pdf";
const OUTPUT_PREFIX: &str = "page";

#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    binary: PathBuf,
    dpi: u32,
    jpeg_quality: u8,
}

impl PdftoppmRasterizer {
    pub fn new(binary: impl Into<PathBuf>, dpi: u32, jpeg_quality: u8) -> Self {
        Self {
            binary: binary.into(),
            dpi,
            jpeg_quality,
        }
    }

    async fn render_first_page_png(&self, document: &[u8]) -> Result<Vec<u8>, RasterizeError> {
        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join(INPUT_FILE);
        let prefix = scratch.path().join(OUTPUT_PREFIX);
        tokio::fs::write(&input, document).await?;

        let output = Command::new(&self.binary)
            .args(["-f", "1", "-l", "1", "-singlefile", "-png", "-r"])
            .arg(self.dpi.to_string())
            .arg(&input)
            .arg(&prefix)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RasterizeError::BackendUnavailable {
                binary: self.binary.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(RasterizeError::Backend {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // -singlefile writes `<prefix>.png` with no page suffix.
        let rendered = prefix.with_extension("png");
        match tokio::fs::read(&rendered).await {
            Ok(png) => Ok(png),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(RasterizeError::NoPages),
            Err(e) => Err(RasterizeError::Io(e)),
        }
    }
}

#[async_trait]
impl DocumentRasterizer for PdftoppmRasterizer {
    async fn rasterize_first_page(&self, document: &[u8]) -> Result<ImagePayload, RasterizeError> {
        if document.is_empty() {
            return Err(RasterizeError::EmptyDocument);
        }

        let png = self.render_first_page_png(document).await?;
        debug!("pdftoppm rendered first page ({} bytes PNG)", png.len());

        // Decoding and JPEG encoding are CPU-bound.
        let quality = self.jpeg_quality;
        tokio::task::spawn_blocking(move || {
            let page = image::load_from_memory_with_format(&png, ImageFormat::Png)?;
            encode_jpeg_payload(&page, quality)
        })
        .await
        .map_err(|e| RasterizeError::Task(e.to_string()))?
    }
}
