//! QR code encoder

use crate::error::{Error, Result};
use crate::qr::{Payload, RasterImage};
use crate::template::ColorPair;
use image::RgbaImage;
use qrcode::types::QrError;
use qrcode::{Color, EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pixels per module when the requested size cannot fit the symbol
const FALLBACK_SCALE: u32 = 4;

/// Error-correction tier, serializable for configuration files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCorrection {
    /// ~7% recovery
    L,
    /// ~15% recovery
    #[default]
    M,
    /// ~25% recovery
    Q,
    /// ~30% recovery
    H,
}

impl ErrorCorrection {
    /// Equivalent `qrcode` level
    pub fn ec_level(self) -> EcLevel {
        match self {
            ErrorCorrection::L => EcLevel::L,
            ErrorCorrection::M => EcLevel::M,
            ErrorCorrection::Q => EcLevel::Q,
            ErrorCorrection::H => EcLevel::H,
        }
    }

    /// Single-letter label
    pub fn letter(self) -> char {
        match self {
            ErrorCorrection::L => 'L',
            ErrorCorrection::M => 'M',
            ErrorCorrection::Q => 'Q',
            ErrorCorrection::H => 'H',
        }
    }
}

impl fmt::Display for ErrorCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for ErrorCorrection {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "L" | "LOW" => Ok(Self::L),
            "M" | "MEDIUM" => Ok(Self::M),
            "Q" | "QUARTILE" => Ok(Self::Q),
            "H" | "HIGH" => Ok(Self::H),
            other => Err(format!(
                "Unknown error correction level '{other}', expected L, M, Q or H"
            )),
        }
    }
}

/// Raster parameters for encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Output width and height in pixels
    pub size: u32,
    /// Quiet zone in modules
    pub margin: u32,
    /// Error-correction tier
    pub error_correction: ErrorCorrection,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            size: 512,
            margin: 2,
            error_correction: ErrorCorrection::M,
        }
    }
}

/// QR code encoder
#[derive(Debug, Clone, Default)]
pub struct QrEncoder {
    options: RenderOptions,
}

impl QrEncoder {
    /// Create a new QR encoder with the given raster options
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Raster options in use
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Encode a payload into a colored raster.
    ///
    /// A payload that does not fit the largest symbol at the configured level
    /// yields [`Error::CapacityExceeded`]; every other encoder failure is
    /// reported as [`Error::QrEncode`].
    pub fn encode(&self, payload: &Payload, colors: &ColorPair) -> Result<RasterImage> {
        if payload.is_empty() {
            return Err(Error::QrEncode("Refusing to encode an empty payload".to_string()));
        }

        let level = self.options.error_correction;
        let code = QrCode::with_error_correction_level(payload.as_bytes(), level.ec_level())
            .map_err(|e| match e {
                QrError::DataTooLong => Error::CapacityExceeded {
                    bytes: payload.len(),
                    level: level.letter(),
                },
                other => Error::QrEncode(format!("Failed to create QR code: {other}")),
            })?;

        tracing::debug!(
            version = ?code.version(),
            modules = code.width(),
            bytes = payload.len(),
            "Built QR symbol"
        );

        Ok(self.rasterize(&code, colors))
    }

    /// Encode a string into a QR code image
    pub fn encode_string(&self, data: &str, colors: &ColorPair) -> Result<RasterImage> {
        self.encode(&Payload::new(data), colors)
    }

    /// Paint modules onto a square canvas.
    ///
    /// When `size` can hold the symbol plus quiet zone, the output is exactly
    /// `size` pixels wide and each pixel samples module `floor(p * total / size)`.
    /// Otherwise every module gets `FALLBACK_SCALE` pixels.
    fn rasterize(&self, code: &QrCode, colors: &ColorPair) -> RasterImage {
        let modules = code.width() as u32;
        let margin = self.options.margin;
        let total = modules + margin * 2;
        let size = if self.options.size >= total {
            self.options.size
        } else {
            total * FALLBACK_SCALE
        };

        let cells = code.to_colors();
        let dark = colors.dark_rgba();
        let light = colors.light_rgba();

        let module_at = |p: u32| (u64::from(p) * u64::from(total) / u64::from(size)) as u32;
        let is_dark = |mx: u32, my: u32| {
            if mx < margin || my < margin {
                return false;
            }
            let (cx, cy) = (mx - margin, my - margin);
            cx < modules && cy < modules && cells[(cy * modules + cx) as usize] == Color::Dark
        };

        let pixels = RgbaImage::from_fn(size, size, |x, y| {
            if is_dark(module_at(x), module_at(y)) {
                dark
            } else {
                light
            }
        });

        RasterImage::new(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn decode(raster: &RasterImage) -> String {
        let gray = image::DynamicImage::ImageRgba8(raster.as_rgba().clone()).to_luma8();
        let mut prepared = rqrr::PreparedImage::prepare(gray);
        let grids = prepared.detect_grids();
        assert!(!grids.is_empty(), "no QR grid detected");
        let (_meta, content) = grids[0].decode().expect("decode grid");
        content
    }

    #[test]
    fn default_output_is_512_square() {
        let encoder = QrEncoder::default();
        let raster = encoder
            .encode_string("https://google.com", &ColorPair::default())
            .unwrap();
        assert_eq!((raster.width(), raster.height()), (512, 512));
    }

    #[test]
    fn encoded_symbol_scans_back() {
        let encoder = QrEncoder::default();
        let raster = encoder
            .encode_string("https://example.com/scan", &ColorPair::default())
            .unwrap();
        assert_eq!(decode(&raster), "https://example.com/scan");
    }

    #[test]
    fn corners_use_light_color_for_quiet_zone() {
        let colors = ColorPair::resolved("#8B5CF6", "#F3E8FF");
        let raster = QrEncoder::default().encode_string("hi", &colors).unwrap();
        assert_eq!(*raster.as_rgba().get_pixel(0, 0), Rgba([0xF3, 0xE8, 0xFF, 255]));
        assert!(
            raster
                .as_rgba()
                .pixels()
                .any(|p| *p == Rgba([0x8B, 0x5C, 0xF6, 255]))
        );
    }

    #[test]
    fn oversized_payload_reports_capacity() {
        let encoder = QrEncoder::default();
        let huge = "x".repeat(3000);
        let err = encoder.encode_string(&huge, &ColorPair::default()).unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded { bytes: 3000, level: 'M' }));
    }

    #[test]
    fn tiny_size_falls_back_to_integer_scale() {
        let encoder = QrEncoder::new(RenderOptions {
            size: 10,
            ..RenderOptions::default()
        });
        let raster = encoder.encode_string("a", &ColorPair::default()).unwrap();
        // version 1 symbol is 21 modules, plus 2 * 2 quiet zone
        assert_eq!(raster.width(), 25 * FALLBACK_SCALE);
    }

    #[test]
    fn level_parses_from_names() {
        assert_eq!("m".parse::<ErrorCorrection>().unwrap(), ErrorCorrection::M);
        assert_eq!("High".parse::<ErrorCorrection>().unwrap(), ErrorCorrection::H);
        assert!("X".parse::<ErrorCorrection>().is_err());
    }
}
