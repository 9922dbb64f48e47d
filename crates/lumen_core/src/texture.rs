//! Texture maps for material parameters.
//!
//! Lookups are nearest-texel only with wrapping uvs.

use image::DynamicImage;
use lumen_math::{Vec2, Vec3};
use thiserror::Error;

/// Errors that can occur while building a texture.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Texture dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },

    #[error("Expected {expected} texels for the given dimensions, got {actual}")]
    TexelCountMismatch { expected: usize, actual: usize },
}

pub type TextureResult<T> = Result<T, TextureError>;

/// A texture with pixel data in linear RGBA.
#[derive(Clone, Debug)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    /// Row-major, top row first.
    pub pixels: Vec<[f32; 4]>,
}

impl Texture {
    /// Create a new texture from pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<[f32; 4]>) -> TextureResult<Self> {
        if width == 0 || height == 0 {
            return Err(TextureError::EmptyDimensions { width, height });
        }
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(TextureError::TexelCountMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Create a solid color texture (1x1).
    pub fn solid_color(color: Vec3) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![[color.x, color.y, color.z, 1.0]],
        }
    }

    /// Convert a decoded image, treating color channels as sRGB encoded.
    pub fn from_image(image: &DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let pixels = rgba
            .pixels()
            .map(|p| {
                [
                    srgb_to_linear(p[0]),
                    srgb_to_linear(p[1]),
                    srgb_to_linear(p[2]),
                    p[3] as f32 / 255.0,
                ]
            })
            .collect();
        Self {
            width: width.max(1),
            height: height.max(1),
            pixels,
        }
    }

    /// RGB of the texel nearest to `uv`. (0, 0) is the bottom-left corner.
    pub fn sample(&self, uv: Vec2) -> Vec3 {
        let [r, g, b, _] = self.texel(uv);
        Vec3::new(r, g, b)
    }

    /// Single channel (0=R .. 3=A) of the texel nearest to `uv`.
    pub fn sample_channel(&self, uv: Vec2, channel: usize) -> f32 {
        self.texel(uv)[channel.min(3)]
    }

    fn texel(&self, uv: Vec2) -> [f32; 4] {
        if self.pixels.is_empty() {
            return [0.0; 4];
        }
        let u = uv.x.rem_euclid(1.0);
        let v = 1.0 - uv.y.rem_euclid(1.0);
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);
        self.pixels[(y * self.width + x) as usize]
    }
}

/// Decode one sRGB-encoded byte to linear.
fn srgb_to_linear(value: u8) -> f32 {
    let v = value as f32 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}
