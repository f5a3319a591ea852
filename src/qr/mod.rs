//! QR code encoding and the raster it produces
//!
//! The symbol itself comes from the `qrcode` crate; this module owns the
//! payload wrapper, the colored rasterization and the PNG / data URI forms
//! used for display and export.

mod encoder;

pub use encoder::{ErrorCorrection, QrEncoder, RenderOptions};

use crate::error::{Error, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;

const DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Canonical text handed to the encoder: a normalized URL or a vCard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(String);

impl Payload {
    /// Wrap already-normalized text
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The text to encode
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// UTF-8 bytes handed to the encoder
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there is nothing to encode
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An encoded symbol as RGBA pixels
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pixels: RgbaImage,
}

impl RasterImage {
    /// Wrap an existing pixel buffer
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Borrow the pixels
    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Serialize as PNG
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.pixels
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    /// Serialize as a `data:image/png;base64,` URI
    pub fn to_data_uri(&self) -> Result<String> {
        let png = self.to_png_bytes()?;
        Ok(format!("{DATA_URI_PREFIX}{}", STANDARD.encode(png)))
    }

    /// Decode any supported raster format into RGBA
    pub fn from_png_bytes(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| Error::Load(format!("Failed to load QR code image: {e}")))?;
        Ok(Self::new(decoded.to_rgba8()))
    }

    /// Decode a base64 image data URI
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let (_, encoded) = uri
            .split_once(";base64,")
            .filter(|(head, _)| head.starts_with("data:image/"))
            .ok_or_else(|| Error::Load("Not a base64 image data URI".to_string()))?;
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::Load(format!("Invalid base64 image data: {e}")))?;
        Self::from_png_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn payload_counts_utf8_bytes() {
        let payload = Payload::new("FN:Zoë");
        assert_eq!(payload.as_str(), "FN:Zoë");
        assert_eq!(payload.len(), 7);
        assert_eq!(payload.to_string(), "FN:Zoë");
        assert!(Payload::new("").is_empty());
    }

    #[test]
    fn payload_serializes_as_plain_string() {
        let json = serde_json::to_value(Payload::new("https://google.com")).unwrap();
        assert_eq!(json, serde_json::json!("https://google.com"));
    }

    #[test]
    fn data_uri_survives_reload() {
        let mut pixels = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]));
        pixels.put_pixel(3, 4, Rgba([10, 20, 30, 255]));
        let raster = RasterImage::new(pixels);

        let uri = raster.to_data_uri().unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert_eq!(RasterImage::from_data_uri(&uri).unwrap(), raster);
    }

    #[test]
    fn garbage_uri_is_a_load_error() {
        assert!(matches!(
            RasterImage::from_data_uri("data:text/plain;base64,aGk="),
            Err(Error::Load(_))
        ));
        assert!(matches!(
            RasterImage::from_data_uri("data:image/png;base64,aGVsbG8="),
            Err(Error::Load(_))
        ));
    }
}
