//! Byte buffer to [`RasterImage`].

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, ImageReader};

use crate::error::{Result, TablescanError};
use crate::types::RasterImage;

/// Decodes common bitmap containers (PNG, JPEG, BMP, TIFF, WebP, GIF).
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDecoder;

impl ImageDecoder {
    /// Sniffs the container from its magic bytes and decodes the first frame.
    pub fn decode(bytes: &[u8]) -> Result<RasterImage> {
        if bytes.is_empty() {
            return Err(TablescanError::decode("Image buffer is empty"));
        }

        let format = image::guess_format(bytes)
            .map_err(|e| TablescanError::decode_with_source("Unrecognized image container", e))?;
        if !Self::supports(format) {
            return Err(TablescanError::decode(format!("Unsupported image format: {:?}", format)));
        }

        let reader = ImageReader::with_format(Cursor::new(bytes), format);
        let pixels = reader
            .decode()
            .map_err(|e| TablescanError::decode_with_source(format!("Failed to decode {:?} image", format), e))?;

        let raster = RasterImage::from_dynamic(pixels);
        if raster.is_empty() {
            return Err(TablescanError::decode(format!(
                "Decoded image has no pixels ({}x{})",
                raster.width(),
                raster.height()
            )));
        }

        tracing::debug!(
            format = ?format,
            width = raster.width(),
            height = raster.height(),
            depth = ?raster.depth(),
            "Decoded image"
        );
        Ok(raster)
    }

    /// Accepts plain base64 or a `data:image/...;base64,` URL.
    pub fn decode_base64(encoded: &str) -> Result<RasterImage> {
        let payload = strip_data_url(encoded.trim());
        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        if compact.is_empty() {
            return Err(TablescanError::decode("Base64 image payload is empty"));
        }

        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| TablescanError::decode_with_source("Invalid base64 image payload", e))?;
        Self::decode(&bytes)
    }

    pub fn supports(format: ImageFormat) -> bool {
        matches!(
            format,
            ImageFormat::Png
                | ImageFormat::Jpeg
                | ImageFormat::Bmp
                | ImageFormat::Tiff
                | ImageFormat::WebP
                | ImageFormat::Gif
        )
    }
}

fn strip_data_url(input: &str) -> &str {
    if !input.starts_with("data:") {
        return input;
    }
    match input.find(";base64,") {
        Some(idx) => &input[idx + ";base64,".len()..],
        None => input,
    }
}
