//! # Annotation Configuration
//!
//! Built once at startup and handed to [`ArtifactAnnotator`](crate::ArtifactAnnotator).
//! Nothing in this crate reads the environment per request.
//!
//! Variables (defaults in parentheses):
//!
//! | Variable | Default |
//! |---|---|
//! | `IMAGE_TEXT_PREFIX` | `Document ID:` |
//! | `IMAGE_FONT_PATH` | `assets/fonts/Cairo.ttf` |
//! | `IMAGE_FONT_SIZE` | `18` |
//! | `IMAGE_TEXT_COLOR` | `255,255,255` |
//! | `IMAGE_BG_COLOR` | `0,0,0` |
//! | `IMAGE_BG_OPACITY` | `0.5`, also used when outside `[0, 1]` |
//! | `IMAGE_TEXT_ALIGN` | `center` |
//! | `QR_GENERATOR` | `false` |
//! | `QR_POSITION` | `bottom-right` |
//! | `QR_MARGIN_X`, `QR_MARGIN_Y` | `10` |
//! | `QR_SIZE` | `100` |
//! | `FRONTEND_VERIFY_URL` | `http://localhost:3000/verify` |
//! | `PDF_RENDER_DPI` | `150` |
//! | `PDFIUM_LIBRARY_DIR` | unset, use the system library search path |
//! | `METADATA_BACKEND` | `native` |
//! | `EXIFTOOL_PATH` | `exiftool` |
//! | `METADATA_TIMEOUT_SECS` | `30` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use docseal_core::{ConfigError, DocumentId, EnvSource};

const DEFAULT_OPACITY: f32 = 0.5;

/// An opaque RGB color parsed from `r,g,b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub [u8; 3]);

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err("expected three comma-separated components".into());
        }
        let mut rgb = [0u8; 3];
        for (slot, part) in rgb.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| format!("component {part:?} is not in 0..=255"))?;
        }
        Ok(Self(rgb))
    }
}

/// Horizontal placement of the banner text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

impl FromStr for TextAlign {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "center" | "centre" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            other => Err(format!("unknown alignment {other:?}")),
        }
    }
}

/// Corner the QR code is drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QrPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

impl FromStr for QrPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "top-left" => Ok(Self::TopLeft),
            "top-right" => Ok(Self::TopRight),
            "bottom-left" => Ok(Self::BottomLeft),
            "bottom-right" => Ok(Self::BottomRight),
            other => Err(format!("unknown QR position {other:?}")),
        }
    }
}

/// Which [`MetadataWriter`](crate::MetadataWriter) implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataBackend {
    /// In-process JPEG/PNG/PDF writer.
    #[default]
    Native,
    /// External `exiftool` process.
    ExifTool,
}

impl FromStr for MetadataBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(Self::Native),
            "exiftool" => Ok(Self::ExifTool),
            other => Err(format!("unknown metadata backend {other:?}")),
        }
    }
}

/// QR code settings.
#[derive(Debug, Clone, PartialEq)]
pub struct QrConfig {
    pub enabled: bool,
    pub position: QrPosition,
    pub margin_x: u32,
    pub margin_y: u32,
    /// Edge length of the drawn code in pixels.
    pub size: u32,
    /// Verification page; the payload is `<base>?id=<id>`.
    pub verify_base_url: String,
}

impl QrConfig {
    pub fn payload(&self, id: &DocumentId) -> String {
        format!("{}?id={}", self.verify_base_url, id)
    }
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            position: QrPosition::BottomRight,
            margin_x: 10,
            margin_y: 10,
            size: 100,
            verify_base_url: "http://localhost:3000/verify".to_string(),
        }
    }
}

/// Metadata writer settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataConfig {
    pub backend: MetadataBackend,
    pub exiftool_path: PathBuf,
    pub timeout: Duration,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            backend: MetadataBackend::Native,
            exiftool_path: PathBuf::from("exiftool"),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Everything the annotator needs to know.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationConfig {
    pub text_prefix: String,
    pub font_path: PathBuf,
    pub font_size: f32,
    pub text_color: Rgb,
    pub background_color: Rgb,
    pub background_opacity: f32,
    pub text_align: TextAlign,
    pub qr: QrConfig,
    pub pdf_render_dpi: f32,
    /// Directory holding the pdfium shared library.
    pub pdfium_library_dir: Option<PathBuf>,
    pub metadata: MetadataConfig,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            text_prefix: "Document ID:".to_string(),
            font_path: PathBuf::from("assets/fonts/Cairo.ttf"),
            font_size: 18.0,
            text_color: Rgb([255, 255, 255]),
            background_color: Rgb([0, 0, 0]),
            background_opacity: DEFAULT_OPACITY,
            text_align: TextAlign::Center,
            qr: QrConfig::default(),
            pdf_render_dpi: 150.0,
            pdfium_library_dir: None,
            metadata: MetadataConfig::default(),
        }
    }
}

impl AnnotationConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&EnvSource::process())
    }

    /// Load from an arbitrary variable source.
    pub fn from_source(env: &EnvSource) -> Result<Self, ConfigError> {
        let d = Self::default();

        let font_size: f32 = env.parse_or("IMAGE_FONT_SIZE", d.font_size)?;
        if font_size.is_nan() || font_size <= 0.0 {
            return Err(ConfigError::invalid(
                "IMAGE_FONT_SIZE",
                &font_size.to_string(),
                "must be positive",
            ));
        }

        let background_opacity = match env.parse_or::<f32>("IMAGE_BG_OPACITY", DEFAULT_OPACITY) {
            Ok(v) if (0.0..=1.0).contains(&v) => v,
            _ => {
                if env.get("IMAGE_BG_OPACITY").is_some() {
                    tracing::warn!("IMAGE_BG_OPACITY outside [0, 1]; using {DEFAULT_OPACITY}");
                }
                DEFAULT_OPACITY
            }
        };

        let pdf_render_dpi: f32 = env.parse_or("PDF_RENDER_DPI", d.pdf_render_dpi)?;
        if !(36.0..=600.0).contains(&pdf_render_dpi) {
            return Err(ConfigError::invalid(
                "PDF_RENDER_DPI",
                &pdf_render_dpi.to_string(),
                "must be between 36 and 600",
            ));
        }

        let qr = QrConfig {
            enabled: env.flag("QR_GENERATOR", d.qr.enabled),
            position: env.parse_or("QR_POSITION", d.qr.position)?,
            margin_x: env.parse_or("QR_MARGIN_X", d.qr.margin_x)?,
            margin_y: env.parse_or("QR_MARGIN_Y", d.qr.margin_y)?,
            size: env.parse_or("QR_SIZE", d.qr.size)?,
            verify_base_url: env.string_or("FRONTEND_VERIFY_URL", &d.qr.verify_base_url),
        };

        let metadata = MetadataConfig {
            backend: env.parse_or("METADATA_BACKEND", d.metadata.backend)?,
            exiftool_path: env
                .get("EXIFTOOL_PATH")
                .map(PathBuf::from)
                .unwrap_or(d.metadata.exiftool_path),
            timeout: Duration::from_secs(env.parse_or("METADATA_TIMEOUT_SECS", 30u64)?),
        };

        Ok(Self {
            text_prefix: env.string_or("IMAGE_TEXT_PREFIX", &d.text_prefix),
            font_path: env
                .get("IMAGE_FONT_PATH")
                .map(PathBuf::from)
                .unwrap_or(d.font_path),
            font_size,
            text_color: env.parse_or("IMAGE_TEXT_COLOR", d.text_color)?,
            background_color: env.parse_or("IMAGE_BG_COLOR", d.background_color)?,
            background_opacity,
            text_align: env.parse_or("IMAGE_TEXT_ALIGN", d.text_align)?,
            qr,
            pdf_render_dpi,
            pdfium_library_dir: env.get("PDFIUM_LIBRARY_DIR").map(PathBuf::from),
            metadata,
        })
    }

    /// The banner text for `id`, before shaping.
    pub fn banner_text(&self, id: &DocumentId) -> String {
        format!("{} {}", self.text_prefix, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_environment_is_empty() {
        let cfg = AnnotationConfig::from_source(&EnvSource::from_pairs([])).unwrap();
        assert_eq!(cfg, AnnotationConfig::default());
        assert!(!cfg.qr.enabled);
    }

    #[test]
    fn reads_every_variable() {
        let env = EnvSource::from_pairs([
            ("IMAGE_TEXT_PREFIX", "رقم المستند:"),
            ("IMAGE_FONT_PATH", "/fonts/x.ttf"),
            ("IMAGE_FONT_SIZE", "24"),
            ("IMAGE_TEXT_COLOR", "10, 20, 30"),
            ("IMAGE_BG_COLOR", "1,2,3"),
            ("IMAGE_BG_OPACITY", "0.8"),
            ("IMAGE_TEXT_ALIGN", "RIGHT"),
            ("QR_GENERATOR", "true"),
            ("QR_POSITION", "top-left"),
            ("QR_MARGIN_X", "4"),
            ("QR_MARGIN_Y", "6"),
            ("QR_SIZE", "80"),
            ("FRONTEND_VERIFY_URL", "https://verify.example/v"),
            ("PDF_RENDER_DPI", "96"),
            ("METADATA_BACKEND", "exiftool"),
            ("EXIFTOOL_PATH", "/usr/bin/exiftool"),
            ("METADATA_TIMEOUT_SECS", "5"),
        ]);
        let cfg = AnnotationConfig::from_source(&env).unwrap();
        assert_eq!(cfg.text_prefix, "رقم المستند:");
        assert_eq!(cfg.font_size, 24.0);
        assert_eq!(cfg.text_color, Rgb([10, 20, 30]));
        assert_eq!(cfg.background_opacity, 0.8);
        assert_eq!(cfg.text_align, TextAlign::Right);
        assert!(cfg.qr.enabled);
        assert_eq!(cfg.qr.position, QrPosition::TopLeft);
        assert_eq!((cfg.qr.margin_x, cfg.qr.margin_y, cfg.qr.size), (4, 6, 80));
        assert_eq!(cfg.pdf_render_dpi, 96.0);
        assert_eq!(cfg.metadata.backend, MetadataBackend::ExifTool);
        assert_eq!(cfg.metadata.timeout, Duration::from_secs(5));
    }

    #[test]
    fn out_of_range_opacity_falls_back() {
        for raw in ["1.5", "-0.1", "opaque"] {
            let env = EnvSource::from_pairs([("IMAGE_BG_OPACITY", raw)]);
            let cfg = AnnotationConfig::from_source(&env).unwrap();
            assert_eq!(cfg.background_opacity, DEFAULT_OPACITY, "{raw}");
        }
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (var, raw) in [
            ("IMAGE_TEXT_COLOR", "255,255"),
            ("IMAGE_TEXT_COLOR", "256,0,0"),
            ("IMAGE_TEXT_ALIGN", "justify"),
            ("QR_POSITION", "middle"),
            ("IMAGE_FONT_SIZE", "0"),
            ("PDF_RENDER_DPI", "5000"),
            ("METADATA_BACKEND", "magic"),
        ] {
            let env = EnvSource::from_pairs([(var, raw)]);
            assert!(
                AnnotationConfig::from_source(&env).is_err(),
                "{var}={raw} accepted"
            );
        }
    }

    #[test]
    fn qr_payload_and_banner_text() {
        let cfg = AnnotationConfig::default();
        let id = DocumentId::new();
        assert_eq!(
            cfg.qr.payload(&id),
            format!("http://localhost:3000/verify?id={id}")
        );
        assert_eq!(cfg.banner_text(&id), format!("Document ID: {id}"));
    }
}
