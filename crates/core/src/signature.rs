//! Signature capture.
//!
//! The drawing surface is an RGBA bitmap filled in by whatever front end handles the
//! freehand input. Capturing reads that bitmap, rejects it when no stroke was drawn and
//! encodes it as PNG, the same payload a browser canvas produces with `toDataURL`.

use crate::constants::{PNG_DATA_URL_PREFIX, SIGNATURE_CANVAS_HEIGHT, SIGNATURE_CANVAS_WIDTH};
use crate::{IntakeError, IntakeResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

/// Colour an untouched surface is cleared to.
pub const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Freehand signature surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureCanvas {
    bitmap: RgbaImage,
    background: Rgba<u8>,
}

impl SignatureCanvas {
    /// Creates a cleared surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            bitmap: RgbaImage::from_pixel(width, height, BACKGROUND),
            background: BACKGROUND,
        }
    }

    /// Uses `background` instead of transparency as the cleared colour.
    pub fn with_background(mut self, background: Rgba<u8>) -> Self {
        self.background = background;
        self.clear();
        self
    }

    /// Replaces the surface with a drawn bitmap.
    pub fn load(&mut self, bitmap: RgbaImage) {
        self.bitmap = bitmap;
    }

    /// Replaces the surface with a PNG image (for example a saved canvas export).
    pub fn load_png(&mut self, png: &[u8]) -> IntakeResult<()> {
        let image = image::load_from_memory_with_format(png, ImageFormat::Png)
            .map_err(IntakeError::Image)?;
        self.bitmap = image.to_rgba8();
        Ok(())
    }

    /// Clears every pixel back to the background.
    pub fn clear(&mut self) {
        let background = self.background;
        for pixel in self.bitmap.pixels_mut() {
            *pixel = background;
        }
    }

    pub fn bitmap(&self) -> &RgbaImage {
        &self.bitmap
    }

    /// True when no stroke has been drawn.
    pub fn is_blank(&self) -> bool {
        is_blank(&self.bitmap, self.background)
    }

    /// Reads the surface into an embeddable signature.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::BlankSignature` when every pixel is background.
    pub fn capture(&self) -> IntakeResult<Signature> {
        if self.is_blank() {
            return Err(IntakeError::BlankSignature);
        }
        Signature::from_bitmap(&self.bitmap)
    }
}

impl Default for SignatureCanvas {
    fn default() -> Self {
        Self::new(SIGNATURE_CANVAS_WIDTH, SIGNATURE_CANVAS_HEIGHT)
    }
}

/// A pixel counts as background when it is fully transparent or equal to `background`.
pub fn is_blank(bitmap: &RgbaImage, background: Rgba<u8>) -> bool {
    bitmap.pixels().all(|p| p[3] == 0 || *p == background)
}

/// A captured signature, PNG encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    png: Vec<u8>,
    width: u32,
    height: u32,
}

impl Signature {
    pub fn from_bitmap(bitmap: &RgbaImage) -> IntakeResult<Self> {
        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(
                bitmap.as_raw(),
                bitmap.width(),
                bitmap.height(),
                ColorType::Rgba8,
            )
            .map_err(IntakeError::Image)?;
        Ok(Self {
            png,
            width: bitmap.width(),
            height: bitmap.height(),
        })
    }

    /// Parses a `data:image/png;base64,` URL.
    pub fn from_data_url(data_url: &str) -> IntakeResult<Self> {
        let encoded = data_url
            .strip_prefix(PNG_DATA_URL_PREFIX)
            .ok_or(IntakeError::InvalidDataUrl)?;
        let png = STANDARD.decode(encoded).map_err(IntakeError::Base64)?;
        let image = image::load_from_memory_with_format(&png, ImageFormat::Png)
            .map_err(IntakeError::Image)?;
        Ok(Self {
            width: image.width(),
            height: image.height(),
            png,
        })
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn to_data_url(&self) -> String {
        format!("{PNG_DATA_URL_PREFIX}{}", STANDARD.encode(&self.png))
    }

    /// Decodes the signature and composites it over white for opaque embedding.
    pub fn to_rgb_on_white(&self) -> IntakeResult<RgbImage> {
        let rgba = image::load_from_memory_with_format(&self.png, ImageFormat::Png)
            .map_err(IntakeError::Image)?
            .to_rgba8();
        Ok(flatten_on_white(&rgba))
    }
}

/// Alpha-composites an RGBA bitmap over a white page.
pub fn flatten_on_white(rgba: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let blend = |c: u8| -> u8 {
            let a = a as u32;
            ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8
        };
        Rgb([blend(r), blend(g), blend(b)])
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Draws a short horizontal stroke, standing in for the freehand handler.
    pub(crate) fn signed_canvas() -> SignatureCanvas {
        let mut canvas = SignatureCanvas::new(60, 20);
        let mut bitmap = canvas.bitmap().clone();
        for x in 5..55 {
            bitmap.put_pixel(x, 10, Rgba([0, 0, 0, 255]));
            bitmap.put_pixel(x, 11, Rgba([0, 0, 0, 255]));
        }
        canvas.load(bitmap);
        canvas
    }

    #[test]
    fn blank_canvas_is_rejected() {
        let canvas = SignatureCanvas::new(60, 20);
        assert!(canvas.is_blank());
        assert!(matches!(canvas.capture(), Err(IntakeError::BlankSignature)));
    }

    #[test]
    fn canvas_filled_with_opaque_background_is_blank() {
        let canvas = SignatureCanvas::new(10, 10).with_background(Rgba([255, 255, 255, 255]));
        assert!(canvas.is_blank());
        assert!(matches!(canvas.capture(), Err(IntakeError::BlankSignature)));
    }

    #[test]
    fn drawn_canvas_captures_png() {
        let signature = signed_canvas().capture().expect("stroke drawn");
        assert_eq!(signature.width(), 60);
        assert_eq!(signature.height(), 20);
        assert!(signature.png_bytes().starts_with(b"\x89PNG"));
    }

    #[test]
    fn clear_resets_strokes() {
        let mut canvas = signed_canvas();
        assert!(!canvas.is_blank());
        canvas.clear();
        assert!(canvas.is_blank());
    }

    #[test]
    fn data_url_survives_a_trip() {
        let signature = signed_canvas().capture().unwrap();
        let url = signature.to_data_url();
        assert!(url.starts_with(PNG_DATA_URL_PREFIX));
        assert_eq!(Signature::from_data_url(&url).unwrap(), signature);
    }

    #[test]
    fn data_url_with_wrong_prefix_is_rejected() {
        let err = Signature::from_data_url("data:image/jpeg;base64,AAAA").expect_err("jpeg");
        assert!(matches!(err, IntakeError::InvalidDataUrl));
    }

    #[test]
    fn transparent_pixels_flatten_to_white() {
        let signature = signed_canvas().capture().unwrap();
        let rgb = signature.to_rgb_on_white().unwrap();
        assert_eq!(*rgb.get_pixel(0, 0), Rgb([255, 255, 255]));
        assert_eq!(*rgb.get_pixel(10, 10), Rgb([0, 0, 0]));
    }
}
