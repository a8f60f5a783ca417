//! # Image Stamping
//!
//! Draws the visible identifier onto a raster image:
//!
//! 1. a full-width banner of height `font_size + 20` along the bottom edge,
//!    in the configured background color and opacity;
//! 2. the shaped text `"<prefix> <id>"`, vertically centered in the banner and
//!    aligned left, center or right;
//! 3. optionally, a QR code linking to the verification page, drawn last in
//!    the configured corner.
//!
//! PDF pages go through the same [`ImageStamper::stamp`] so every page
//! carries an identical mark.

use std::io::Cursor;
use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use docseal_core::{DocumentId, FileKind};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader, Pixel, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};

use crate::config::{AnnotationConfig, TextAlign};
use crate::error::AnnotationError;
use crate::fsutil::replace_file;
use crate::qr::{qr_origin, render_qr};
use crate::text::shape_for_display;

/// JPEG quality for re-encoded images and rasterized PDF pages.
pub const JPEG_QUALITY: u8 = 90;

/// Vertical padding added to the font size to get the banner height.
const BANNER_PADDING: f32 = 20.0;

const MIN_FONT_SIZE: f32 = 6.0;

/// Draws banners, text and QR codes. Holds the loaded font.
#[derive(Clone)]
pub struct ImageStamper {
    config: AnnotationConfig,
    font: FontArc,
}

impl std::fmt::Debug for ImageStamper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageStamper")
            .field("font_path", &self.config.font_path)
            .field("font_size", &self.config.font_size)
            .field("qr", &self.config.qr.enabled)
            .finish()
    }
}

impl ImageStamper {
    /// Load the configured font. Fails if it is missing or not a TrueType/OpenType font.
    pub fn new(config: AnnotationConfig) -> Result<Self, AnnotationError> {
        let bytes = std::fs::read(&config.font_path).map_err(|e| {
            AnnotationError::Font(format!("{}: {e}", config.font_path.display()))
        })?;
        let font = FontArc::try_from_vec(bytes).map_err(|e| {
            AnnotationError::Font(format!("{}: {e}", config.font_path.display()))
        })?;
        Ok(Self::with_font(config, font))
    }

    /// Use an already loaded font.
    pub fn with_font(config: AnnotationConfig, font: FontArc) -> Self {
        Self { config, font }
    }

    pub fn config(&self) -> &AnnotationConfig {
        &self.config
    }

    /// Height in pixels of the banner for an image `image_height` tall.
    pub fn banner_height(&self, image_height: u32) -> u32 {
        ((self.config.font_size + BANNER_PADDING).ceil() as u32).min(image_height)
    }

    /// Draw the banner, identifier text and optional QR code in place.
    pub fn stamp(&self, img: &mut RgbaImage, id: &DocumentId) -> Result<(), AnnotationError> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(AnnotationError::Decode("image has no pixels".into()));
        }

        let box_h = self.banner_height(height);
        let box_top = height - box_h;
        let [r, g, b] = self.config.background_color.0;
        let alpha = (self.config.background_opacity * 255.0).round() as u8;
        let overlay = Rgba([r, g, b, alpha]);
        for y in box_top..height {
            for x in 0..width {
                img.get_pixel_mut(x, y).blend(&overlay);
            }
        }

        let text = shape_for_display(&self.config.banner_text(id));
        let mut scale = PxScale::from(self.config.font_size);
        let (mut text_w, mut text_h) = text_size(scale, &self.font, &text);
        if text_w > width {
            // Shrink to fit narrow images so the whole identifier stays legible.
            let factor = width as f32 / text_w as f32;
            scale = PxScale::from((self.config.font_size * factor).max(MIN_FONT_SIZE));
            (text_w, text_h) = text_size(scale, &self.font, &text);
        }
        let x = match self.config.text_align {
            TextAlign::Left => 0,
            TextAlign::Center => (i64::from(width) - i64::from(text_w)) / 2,
            TextAlign::Right => i64::from(width) - i64::from(text_w),
        };
        let y = i64::from(box_top) + (i64::from(box_h) - i64::from(text_h)) / 2;
        let [tr, tg, tb] = self.config.text_color.0;
        draw_text_mut(
            img,
            Rgba([tr, tg, tb, 255]),
            clamp_i32(x),
            clamp_i32(y),
            scale,
            &self.font,
            &text,
        );

        let qr = &self.config.qr;
        if qr.enabled {
            let code = render_qr(&qr.payload(id), qr.size)?;
            let (qx, qy) = qr_origin(qr.position, width, height, qr.size, qr.margin_x, qr.margin_y);
            image::imageops::overlay(img, &code, qx, qy);
        }

        Ok(())
    }

    /// Decode the image at `path`, stamp it, and replace the file with the
    /// re-encoded result in its original format.
    pub fn stamp_file(
        &self,
        path: &Path,
        kind: FileKind,
        id: &DocumentId,
    ) -> Result<(), AnnotationError> {
        let format = match kind {
            FileKind::Png => ImageFormat::Png,
            FileKind::Jpeg => ImageFormat::Jpeg,
            other => {
                return Err(AnnotationError::Decode(format!(
                    "{} is not a raster image kind",
                    other.category()
                )))
            }
        };
        let mut img = ImageReader::open(path)?
            .with_guessed_format()?
            .decode()?
            .to_rgba8();
        self.stamp(&mut img, id)?;
        let bytes = encode(&img, format)?;
        replace_file(path, &bytes)?;
        tracing::debug!(path = %path.display(), width = img.width(), height = img.height(), "stamped image");
        Ok(())
    }
}

/// Encode `img` as PNG (with alpha) or JPEG (quality 90, alpha dropped).
pub fn encode(img: &RgbaImage, format: ImageFormat) -> Result<Vec<u8>, AnnotationError> {
    let mut buf = Cursor::new(Vec::new());
    match format {
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
            encoder
                .encode_image(&rgb)
                .map_err(|e| AnnotationError::Encode(e.to_string()))?;
        }
        other => {
            img.write_to(&mut buf, other)
                .map_err(|e| AnnotationError::Encode(e.to_string()))?;
        }
    }
    Ok(buf.into_inner())
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(0, i64::from(i32::MAX)) as i32
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::QrPosition;
    use std::path::PathBuf;

    /// DejaVu Sans Mono, committed under `tests/fixtures` with its license.
    pub(crate) const TEST_FONT: &[u8] = include_bytes!("../tests/fixtures/DejaVuSansMono.ttf");

    pub(crate) fn test_stamper(config: AnnotationConfig) -> ImageStamper {
        let font = FontArc::try_from_slice(TEST_FONT).unwrap();
        ImageStamper::with_font(config, font)
    }

    fn white(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]))
    }

    #[test]
    fn missing_font_is_reported() {
        let config = AnnotationConfig {
            font_path: PathBuf::from("/definitely/not/here.ttf"),
            ..AnnotationConfig::default()
        };
        assert!(matches!(
            ImageStamper::new(config),
            Err(AnnotationError::Font(_))
        ));
    }

    #[test]
    fn banner_darkens_bottom_rows_only() {
        let stamper = test_stamper(AnnotationConfig::default());
        let mut img = white(640, 120);
        stamper.stamp(&mut img, &DocumentId::new()).unwrap();

        let box_h = stamper.banner_height(120);
        assert_eq!(box_h, 38);
        // Above the banner nothing changes.
        assert_eq!(*img.get_pixel(5, 120 - box_h - 1), Rgba([255, 255, 255, 255]));
        // Left edge of the banner is half-blended black over white.
        let p = img.get_pixel(0, 119).0;
        assert!(p[0] > 100 && p[0] < 160, "got {p:?}");
        // Some text pixels are brighter than the banner background.
        let bright = (0..640)
            .flat_map(|x| (120 - box_h..120).map(move |y| (x, y)))
            .filter(|&(x, y)| img.get_pixel(x, y).0[0] > 200)
            .count();
        assert!(bright > 0, "no text drawn");
    }

    #[test]
    fn long_text_shrinks_to_fit_narrow_images() {
        let stamper = test_stamper(AnnotationConfig::default());
        let mut img = white(120, 60);
        stamper.stamp(&mut img, &DocumentId::new()).unwrap();
        let box_top = 60 - stamper.banner_height(60);
        let bright_cols: Vec<u32> = (0..120)
            // Glyphs at the minimum size are thin, so antialiased strokes only
            // partly cover the half-dark banner.
            .filter(|&x| (box_top..60).any(|y| img.get_pixel(x, y).0[0] > 160))
            .collect();
        assert!(!bright_cols.is_empty());
        // Text starts inside the image rather than being centered off-canvas.
        assert!(bright_cols[0] < 20);
    }

    #[test]
    fn qr_is_drawn_in_configured_corner() {
        let mut config = AnnotationConfig::default();
        config.qr.enabled = true;
        config.qr.position = QrPosition::TopLeft;
        config.qr.size = 60;
        let stamper = test_stamper(config);
        let mut img = white(300, 300);
        stamper.stamp(&mut img, &DocumentId::new()).unwrap();

        let dark_in_qr = (10..70)
            .flat_map(|x| (10..70).map(move |y| (x, y)))
            .filter(|&(x, y)| img.get_pixel(x, y).0[0] < 64)
            .count();
        assert!(dark_in_qr > 100);
        // Opposite corner above the banner stays white.
        assert_eq!(*img.get_pixel(280, 150), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn stamp_file_round_trips_formats() {
        let stamper = test_stamper(AnnotationConfig::default());
        let dir = tempfile::tempdir().unwrap();
        for (name, kind, format) in [
            ("a.png", FileKind::Png, ImageFormat::Png),
            ("a.jpg", FileKind::Jpeg, ImageFormat::Jpeg),
        ] {
            let path = dir.path().join(name);
            std::fs::write(&path, encode(&white(200, 80), format).unwrap()).unwrap();
            let before = std::fs::read(&path).unwrap();
            stamper.stamp_file(&path, kind, &DocumentId::new()).unwrap();
            let after = std::fs::read(&path).unwrap();
            assert_ne!(before, after);
            let decoded = image::load_from_memory(&after).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (200, 80));
            assert_eq!(image::guess_format(&after).unwrap(), format);
        }
    }

    #[test]
    fn stamp_file_rejects_corrupt_image() {
        let stamper = test_stamper(AnnotationConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\nnot really").unwrap();
        assert!(stamper
            .stamp_file(&path, FileKind::Png, &DocumentId::new())
            .is_err());
    }
}
