//! QR code rendering.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Luma, RgbaImage};
use qrcode::{EcLevel, QrCode};

use crate::config::QrPosition;
use crate::error::AnnotationError;

/// Render `payload` as a `size`×`size` RGBA QR code with medium error
/// correction and a quiet zone.
pub fn render_qr(payload: &str, size: u32) -> Result<RgbaImage, AnnotationError> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)
        .map_err(|e| AnnotationError::Qr(e.to_string()))?;
    let luma = code
        .render::<Luma<u8>>()
        .quiet_zone(true)
        .min_dimensions(size, size)
        .build();
    let rgba = DynamicImage::ImageLuma8(luma).to_rgba8();
    if rgba.width() == size && rgba.height() == size {
        Ok(rgba)
    } else {
        Ok(imageops::resize(&rgba, size, size, FilterType::Nearest))
    }
}

/// Top-left corner for a `size`-pixel code in a `width`×`height` canvas.
///
/// Coordinates are clamped at zero when the image is smaller than the code
/// plus its margins.
pub fn qr_origin(
    position: QrPosition,
    width: u32,
    height: u32,
    size: u32,
    margin_x: u32,
    margin_y: u32,
) -> (i64, i64) {
    let far_x = i64::from(width) - i64::from(size) - i64::from(margin_x);
    let far_y = i64::from(height) - i64::from(size) - i64::from(margin_y);
    let (x, y) = match position {
        QrPosition::TopLeft => (i64::from(margin_x), i64::from(margin_y)),
        QrPosition::TopRight => (far_x, i64::from(margin_y)),
        QrPosition::BottomLeft => (i64::from(margin_x), far_y),
        QrPosition::BottomRight => (far_x, far_y),
    };
    (x.max(0), y.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_exact_size_with_dark_and_light_modules() {
        let img = render_qr("http://localhost:3000/verify?id=abc", 100).unwrap();
        assert_eq!(img.dimensions(), (100, 100));
        let dark = img.pixels().filter(|p| p.0[0] < 128).count();
        let light = img.pixels().filter(|p| p.0[0] >= 128).count();
        assert!(dark > 0 && light > 0);
        // Quiet zone keeps the corner light.
        assert!(img.get_pixel(0, 0).0[0] >= 128);
    }

    #[test]
    fn origins_follow_configured_corner() {
        assert_eq!(qr_origin(QrPosition::TopLeft, 500, 400, 100, 10, 20), (10, 20));
        assert_eq!(qr_origin(QrPosition::TopRight, 500, 400, 100, 10, 20), (390, 20));
        assert_eq!(qr_origin(QrPosition::BottomLeft, 500, 400, 100, 10, 20), (10, 280));
        assert_eq!(qr_origin(QrPosition::BottomRight, 500, 400, 100, 10, 20), (390, 280));
    }

    #[test]
    fn origins_clamp_on_tiny_images() {
        assert_eq!(qr_origin(QrPosition::BottomRight, 50, 50, 100, 10, 10), (0, 0));
    }
}
