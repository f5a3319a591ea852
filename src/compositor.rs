//! Logo overlay on top of an encoded symbol
//!
//! The logo is drawn over the center of the symbol, on a filled circular
//! plate that keeps the occluded area a single clean color. With medium error
//! correction the default 20% logo still leaves the symbol recoverable.

use crate::error::{Error, MSG_NOT_AN_IMAGE, MSG_UNREADABLE_IMAGE, Result};
use crate::qr::RasterImage;
use crate::template::{DEFAULT_BACKGROUND, parse_hex_color, resolve_color};
use bytes::Bytes;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba};
use imageproc::drawing::draw_filled_circle_mut;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Geometry and color of the logo overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoOptions {
    /// Logo edge as a fraction of the smaller raster dimension
    pub scale: f32,
    /// Extra plate radius beyond half the logo edge, in pixels
    pub padding: u32,
    /// Plate color as `#hex`
    pub plate_color: String,
}

impl Default for LogoOptions {
    fn default() -> Self {
        Self {
            scale: 0.2,
            padding: 5,
            plate_color: DEFAULT_BACKGROUND.to_string(),
        }
    }
}

impl LogoOptions {
    fn plate_rgba(&self) -> Rgba<u8> {
        let color = resolve_color(&self.plate_color, DEFAULT_BACKGROUND);
        let Rgba([r, g, b, _]) = parse_hex_color(color).unwrap_or(Rgba([255, 255, 255, 255]));
        // the plate must hide the modules underneath
        Rgba([r, g, b, 255])
    }
}

/// A user-selected logo held in memory for the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoAsset {
    name: String,
    bytes: Bytes,
    format: ImageFormat,
}

impl LogoAsset {
    /// Accept raw bytes if they look like a supported image.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Bytes>) -> Result<Self> {
        let name = name.into();
        let bytes = bytes.into();
        let format = image::guess_format(&bytes).map_err(|e| {
            tracing::debug!(logo = %name, error = %e, "Rejected non-image logo");
            Error::Load(MSG_NOT_AN_IMAGE.to_string())
        })?;

        Ok(Self {
            name,
            bytes,
            format,
        })
    }

    /// Read a logo file fully into memory.
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read logo");
            Error::Load(MSG_UNREADABLE_IMAGE.to_string())
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self::from_bytes(name, bytes)
    }

    /// Source name (usually the file name)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sniffed MIME type, always `image/*`
    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the asset holds no data
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decode into pixels
    pub fn decode(&self) -> Result<DynamicImage> {
        image::load_from_memory_with_format(&self.bytes, self.format)
            .map_err(|e| Error::Load(format!("Failed to load logo image: {e}")))
    }
}

/// Pixel geometry of an overlay on a given raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayGeometry {
    /// Logo edge in pixels
    pub logo_size: u32,
    /// Top-left corner of the logo
    pub origin: (u32, u32),
    /// Plate center
    pub center: (i32, i32),
    /// Plate radius in pixels
    pub radius: i32,
}

impl OverlayGeometry {
    /// Compute placement for a `width` x `height` raster.
    pub fn for_raster(width: u32, height: u32, options: &LogoOptions) -> Self {
        let scale = options.scale.clamp(0.01, 1.0);
        let exact = width.min(height) as f32 * scale;
        let logo_size = (exact.round() as u32).clamp(1, width.min(height));

        Self {
            logo_size,
            origin: ((width - logo_size) / 2, (height - logo_size) / 2),
            center: ((width / 2) as i32, (height / 2) as i32),
            radius: (exact / 2.0 + options.padding as f32).round() as i32,
        }
    }
}

/// Draw `logo` centered over `base` and return the new raster.
pub fn composite(
    base: &RasterImage,
    logo: &LogoAsset,
    options: &LogoOptions,
) -> Result<RasterImage> {
    let logo_pixels = logo.decode()?.to_rgba8();
    let geometry = OverlayGeometry::for_raster(base.width(), base.height(), options);

    let mut canvas = base.as_rgba().clone();
    draw_filled_circle_mut(
        &mut canvas,
        geometry.center,
        geometry.radius,
        options.plate_rgba(),
    );

    let resized = imageops::resize(
        &logo_pixels,
        geometry.logo_size,
        geometry.logo_size,
        FilterType::Lanczos3,
    );
    imageops::overlay(
        &mut canvas,
        &resized,
        i64::from(geometry.origin.0),
        i64::from(geometry.origin.1),
    );

    tracing::debug!(
        logo = %logo.name(),
        logo_size = geometry.logo_size,
        radius = geometry.radius,
        "Composited logo"
    );

    Ok(RasterImage::new(canvas))
}

/// Run [`composite`] on the blocking pool.
pub async fn overlay_logo(
    base: RasterImage,
    logo: LogoAsset,
    options: LogoOptions,
) -> Result<RasterImage> {
    tokio::task::spawn_blocking(move || composite(&base, &logo, &options))
        .await
        .map_err(|e| Error::Other(format!("Logo compositing task failed: {e}")))?
}
