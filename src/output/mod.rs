//! Helpers for presenting and exporting generated codes

use crate::error::Result;
use crate::input::InputMode;
use crate::qr::RasterImage;
use crate::session::Generated;
use crate::template::Template;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};

/// Combined structured and human-readable representation of a generated code
#[derive(Debug, Clone)]
pub struct RenderedGeneration {
    /// Structured JSON representation suitable for downstream consumers
    pub json: Value,
    /// Human-readable lines for terminal presentation
    pub human: Vec<String>,
}

/// File name offered for a download: `qr-code-<template>-<mode>.png`.
///
/// The template name is lowercased and each run of whitespace becomes a hyphen.
pub fn download_filename(template: &Template, mode: InputMode) -> String {
    let slug = template
        .name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    format!("qr-code-{slug}-{mode}.png")
}

/// Write `raster` as PNG into `dir`. Returns `Ok(None)` when there is nothing to save.
pub fn export(
    raster: Option<&RasterImage>,
    dir: &Path,
    template: &Template,
    mode: InputMode,
) -> Result<Option<PathBuf>> {
    let Some(raster) = raster else {
        tracing::debug!("No QR code to export");
        return Ok(None);
    };

    fs::create_dir_all(dir)?;
    let path = dir.join(download_filename(template, mode));
    fs::write(&path, raster.to_png_bytes()?)?;

    tracing::info!(path = %path.display(), "Exported QR code");
    Ok(Some(path))
}

/// Render a generation result into both JSON and human-readable forms.
pub fn render_generation(generated: &Generated, generated_count: u64) -> RenderedGeneration {
    let template = generated.template;
    let json = json!({
        "mode": generated.mode.as_str(),
        "payload": generated.payload.as_str(),
        "payload_bytes": generated.payload.len(),
        "template": {
            "id": template.id,
            "name": template.name,
            "category": template.category,
        },
        "colors": {
            "dark": generated.colors.dark,
            "light": generated.colors.light,
        },
        "width": generated.raster.width(),
        "height": generated.raster.height(),
        "logo_applied": generated.logo_applied,
        "warnings": generated.warnings,
        "filename": download_filename(template, generated.mode),
        "generated_count": generated_count,
    });

    let mut human = vec![
        "QR code ready".to_string(),
        format!("  Mode: {}", generated.mode),
        format!("  Template: {} ({})", template.name, template.category),
        format!(
            "  Colors: {} on {}",
            generated.colors.dark, generated.colors.light
        ),
        format!(
            "  Size: {}x{}",
            generated.raster.width(),
            generated.raster.height()
        ),
        format!("  Payload: {}", payload_snippet(generated)),
    ];
    if generated.logo_applied {
        human.push("  Logo: applied".to_string());
    }
    for warning in &generated.warnings {
        human.push(format!("  Warning: {warning}"));
    }
    human.push(format!("  {generated_count} generated"));

    RenderedGeneration { json, human }
}

fn payload_snippet(generated: &Generated) -> String {
    const MAX: usize = 80;
    let flat = generated.payload.as_str().replace('\n', " | ");
    if flat.chars().count() <= MAX {
        flat
    } else {
        let snippet: String = flat.chars().take(MAX).collect();
        format!("{snippet}... ({} bytes)", generated.payload.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qr::Payload;
    use crate::template::{self, ColorPair};
    use image::{Rgba, RgbaImage};

    fn sample(template_id: &str, mode: InputMode) -> Generated {
        let template = template::lookup(template_id).unwrap();
        Generated {
            raster: RasterImage::new(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]))),
            payload: Payload::new("https://google.com"),
            template,
            mode,
            colors: template.colors(),
            logo_applied: false,
            warnings: vec!["logo skipped".to_string()],
        }
    }

    #[test]
    fn filename_slugs_template_name() {
        let template = template::lookup("purple").unwrap();
        assert_eq!(
            download_filename(template, InputMode::Url),
            "qr-code-purple-dream-url.png"
        );
        let template = template::lookup("business-card").unwrap();
        assert_eq!(
            download_filename(template, InputMode::Contact),
            "qr-code-business-card-contact.png"
        );
    }

    #[test]
    fn export_without_raster_is_noop() {
        let template = template::default_template();
        let dir = std::env::temp_dir().join("qrstudio-export-noop");
        let written = export(None, &dir, template, InputMode::Url).unwrap();
        assert!(written.is_none());
    }

    #[test]
    fn renders_generation_consistently() {
        let generated = sample("ocean", InputMode::Url);
        let rendered = render_generation(&generated, 3);

        assert_eq!(rendered.json["template"]["id"], "ocean");
        assert_eq!(rendered.json["filename"], "qr-code-ocean-blue-url.png");
        assert_eq!(rendered.json["generated_count"], 3);
        assert_eq!(
            rendered.json["colors"]["dark"],
            ColorPair::resolved("#0EA5E9", "#E0F2FE").dark
        );
        assert!(rendered.human.iter().any(|l| l.contains("Ocean Blue")));
        assert!(rendered.human.iter().any(|l| l.contains("Warning: logo skipped")));
    }

    #[test]
    fn vcard_payload_is_flattened_for_display() {
        let mut generated = sample("business-card", InputMode::Contact);
        generated.payload = Payload::new("BEGIN:VCARD\nFN:A\nEND:VCARD");
        let rendered = render_generation(&generated, 1);
        assert_eq!(rendered.json["payload"], "BEGIN:VCARD\nFN:A\nEND:VCARD");
        assert!(
            rendered
                .human
                .iter()
                .any(|l| l == "  Payload: BEGIN:VCARD | FN:A | END:VCARD")
        );
    }
}
