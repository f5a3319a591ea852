//! Static catalog of color templates and color validation

use crate::error::{Error, Result};
use image::Rgba;
use serde::Serialize;
use std::fmt;

/// Fallback dark module color
pub const DEFAULT_FOREGROUND: &str = "#000000";
/// Fallback light module color
pub const DEFAULT_BACKGROUND: &str = "#FFFFFF";
/// Template selected when nothing else is configured
pub const DEFAULT_TEMPLATE_ID: &str = "purple";

/// Template grouping shown in the picker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Plain two-tone themes
    Basic,
    /// Richer color pairs
    Premium,
    /// Translucent backgrounds
    Glass,
    /// AI-styled themes
    Ai,
    /// Use-case presets
    Special,
}

impl Category {
    /// All categories in display order
    pub const ALL: [Category; 5] = [
        Category::Basic,
        Category::Premium,
        Category::Glass,
        Category::Ai,
        Category::Special,
    ];

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Category::Basic => "Basic",
            Category::Premium => "Premium",
            Category::Glass => "Glass Effect",
            Category::Ai => "AI Powered",
            Category::Special => "Special Edition",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A named foreground/background preset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    /// Stable identifier
    pub id: &'static str,
    /// Display name, also used in export filenames
    pub name: &'static str,
    /// Dark module color as authored (may be invalid)
    pub foreground: &'static str,
    /// Light module color as authored (may be invalid)
    pub background: &'static str,
    /// Two-glyph preview
    pub preview: &'static str,
    /// Picker grouping
    pub category: Category,
    /// Short description
    pub description: &'static str,
}

impl Template {
    /// Colors the encoder will actually use, with invalid values replaced.
    pub fn colors(&self) -> ColorPair {
        ColorPair::resolved(self.foreground, self.background)
    }
}

macro_rules! template {
    (
        $id:literal,
        $name:literal,
        $fg:literal,
        $bg:literal,
        $preview:literal,
        $category:ident,
        $desc:literal $(,)?
    ) => {
        Template {
            id: $id,
            name: $name,
            foreground: $fg,
            background: $bg,
            preview: $preview,
            category: Category::$category,
            description: $desc,
        }
    };
}

static TEMPLATES: [Template; 17] = [
    template!(
        "classic",
        "Classic",
        "#000000",
        "#FFFFFF",
        "⬛⬜",
        Basic,
        "Traditional black and white",
    ),
    template!(
        "purple",
        "Purple Dream",
        "#8B5CF6",
        "#F3E8FF",
        "🟣⚪",
        Basic,
        "Elegant purple theme",
    ),
    template!("ocean", "Ocean Blue", "#0EA5E9", "#E0F2FE", "🔵⚪", Basic, "Calming ocean vibes"),
    template!(
        "forest",
        "Forest Green",
        "#059669",
        "#D1FAE5",
        "🟢⚪",
        Basic,
        "Natural forest theme",
    ),
    template!(
        "sunset",
        "Sunset Orange",
        "#EA580C",
        "#FED7AA",
        "🟠⚪",
        Premium,
        "Warm sunset gradient",
    ),
    template!("rose", "Rose Gold", "#EC4899", "#FCE7F3", "🌸⚪", Premium, "Luxurious rose gold"),
    template!("midnight", "Midnight", "#FFFFFF", "#1F2937", "⬜⬛", Premium, "Sleek dark mode"),
    template!(
        "gradient",
        "Cyber Neon",
        "#06FFA5",
        "#0D1117",
        "🟢⬛",
        Premium,
        "Futuristic neon glow",
    ),
    template!(
        "glass-blue",
        "Glass Blue",
        "#3B82F6",
        "rgba(59, 130, 246, 0.1)",
        "🔷💎",
        Glass,
        "Translucent glass effect",
    ),
    template!(
        "glass-purple",
        "Glass Purple",
        "#8B5CF6",
        "rgba(139, 92, 246, 0.1)",
        "🟣💎",
        Glass,
        "Purple glass aesthetic",
    ),
    template!(
        "glass-emerald",
        "Glass Emerald",
        "#10B981",
        "rgba(16, 185, 129, 0.1)",
        "🟢💎",
        Glass,
        "Emerald glass shine",
    ),
    template!(
        "ai-neural",
        "Neural Network",
        "#FF6B6B",
        "#1A1A2E",
        "🧠⚡",
        Ai,
        "AI-inspired neural pattern",
    ),
    template!("ai-matrix", "Matrix", "#00FF41", "#000000", "💚⬛", Ai, "Matrix-style digital rain"),
    template!(
        "ai-hologram",
        "Hologram",
        "#00D4FF",
        "#0A0A0A",
        "🔵✨",
        Ai,
        "Futuristic holographic",
    ),
    template!(
        "personal-brand",
        "Personal Brand",
        "#6366F1",
        "#F8FAFC",
        "👤💼",
        Special,
        "Professional personal branding",
    ),
    template!(
        "business-card",
        "Business Card",
        "#1F2937",
        "#F9FAFB",
        "💼📇",
        Special,
        "Business card style",
    ),
    template!(
        "social-media",
        "Social Media",
        "#E11D48",
        "#FDF2F8",
        "📱💕",
        Special,
        "Social media optimized",
    ),
];

/// Every template in catalog order
pub fn all() -> &'static [Template] {
    &TEMPLATES
}

/// Find a template by identifier
pub fn find(id: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.id == id)
}

/// Find a template by identifier, failing on unknown ids
pub fn lookup(id: &str) -> Result<&'static Template> {
    find(id).ok_or_else(|| Error::UnknownTemplate(id.to_string()))
}

/// The template the form starts with
pub fn default_template() -> &'static Template {
    &TEMPLATES[1]
}

/// Templates belonging to one category, in catalog order
pub fn by_category(category: Category) -> impl Iterator<Item = &'static Template> {
    TEMPLATES.iter().filter(move |t| t.category == category)
}

/// Whether `candidate` is `#` followed by exactly 3, 6 or 8 hex digits
pub fn is_hex_color(candidate: &str) -> bool {
    match candidate.strip_prefix('#') {
        Some(digits) => {
            matches!(digits.len(), 3 | 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

/// Return `candidate` if it is a solid hex color, otherwise `fallback`.
///
/// The encoder only accepts hex colors; CSS functions such as `rgba(...)` are
/// replaced rather than parsed.
pub fn resolve_color<'a>(candidate: &'a str, fallback: &'a str) -> &'a str {
    if is_hex_color(candidate) {
        candidate
    } else {
        fallback
    }
}

/// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA` into an RGBA pixel.
pub fn parse_hex_color(value: &str) -> Result<Rgba<u8>> {
    if !is_hex_color(value) {
        return Err(Error::Other(format!("Invalid hex color '{value}'")));
    }

    let digits = &value[1..];
    let expanded: String = if digits.len() == 3 {
        digits.chars().flat_map(|c| [c, c]).collect()
    } else {
        digits.to_string()
    };

    let bytes = hex::decode(expanded)?;
    let alpha = bytes.get(3).copied().unwrap_or(u8::MAX);
    Ok(Rgba([bytes[0], bytes[1], bytes[2], alpha]))
}

/// Validated dark/light colors handed to the encoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorPair {
    /// Dark module color as `#hex`
    pub dark: String,
    /// Light module color as `#hex`
    pub light: String,
}

impl ColorPair {
    /// Build a pair, substituting black/white for invalid values
    pub fn resolved(dark: &str, light: &str) -> Self {
        Self {
            dark: resolve_color(dark, DEFAULT_FOREGROUND).to_string(),
            light: resolve_color(light, DEFAULT_BACKGROUND).to_string(),
        }
    }

    /// Dark color as a pixel
    pub fn dark_rgba(&self) -> Rgba<u8> {
        parse_hex_color(&self.dark).unwrap_or(Rgba([0, 0, 0, 255]))
    }

    /// Light color as a pixel
    pub fn light_rgba(&self) -> Rgba<u8> {
        parse_hex_color(&self.light).unwrap_or(Rgba([255, 255, 255, 255]))
    }
}

impl Default for ColorPair {
    fn default() -> Self {
        Self::resolved(DEFAULT_FOREGROUND, DEFAULT_BACKGROUND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_ids_are_unique() {
        let ids: HashSet<_> = all().iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), all().len());
    }

    #[test]
    fn every_category_is_populated() {
        for category in Category::ALL {
            assert!(by_category(category).count() > 0, "{category} is empty");
        }
        assert_eq!(by_category(Category::Glass).count(), 3);
    }

    #[test]
    fn default_is_purple_dream() {
        assert_eq!(default_template().id, DEFAULT_TEMPLATE_ID);
        assert_eq!(default_template().name, "Purple Dream");
    }

    #[test]
    fn hex_pattern_lengths() {
        assert!(is_hex_color("#fff"));
        assert!(is_hex_color("#A1b2C3"));
        assert!(is_hex_color("#00000080"));
        assert!(!is_hex_color("#ffff"));
        assert!(!is_hex_color("fff"));
        assert!(!is_hex_color("#ggg"));
        assert!(!is_hex_color("#1234567"));
    }

    #[test]
    fn invalid_candidates_return_exact_fallback() {
        for candidate in [
            "rgba(59, 130, 246, 0.1)",
            "red",
            "",
            "#12",
            "# 123",
            "#12345",
            "#FFFFFFF",
            "#ÿÿÿ",
        ] {
            assert_eq!(resolve_color(candidate, "#FFFFFF"), "#FFFFFF");
        }
        assert_eq!(resolve_color("#abc", "#FFFFFF"), "#abc");
    }

    #[test]
    fn glass_templates_fall_back_to_white() {
        let colors = lookup("glass-emerald").unwrap().colors();
        assert_eq!(colors.dark, "#10B981");
        assert_eq!(colors.light, DEFAULT_BACKGROUND);
    }

    #[test]
    fn unknown_template_is_an_error() {
        assert!(matches!(lookup("nope"), Err(Error::UnknownTemplate(_))));
    }

    #[test]
    fn parses_short_long_and_alpha_hex() {
        assert_eq!(parse_hex_color("#f0a").unwrap(), Rgba([0xff, 0x00, 0xaa, 255]));
        assert_eq!(parse_hex_color("#8B5CF6").unwrap(), Rgba([0x8b, 0x5c, 0xf6, 255]));
        assert_eq!(parse_hex_color("#00000080").unwrap(), Rgba([0, 0, 0, 0x80]));
        assert!(parse_hex_color("rgba(0,0,0,1)").is_err());
    }
}
