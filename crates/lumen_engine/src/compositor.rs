//! Destination for rendered radiance.

use lumen_math::Color;

/// Per-pixel color sink written by the renderer after every frame.
pub trait Compositor {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn set(&mut self, x: u32, y: u32, color: Color);
}

/// Linear radiance per pixel, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct RadianceBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl RadianceBuffer {
    /// Create a new buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; (width * height) as usize],
        }
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Mean over all pixels.
    pub fn average(&self) -> Color {
        if self.pixels.is_empty() {
            return Color::ZERO;
        }
        self.pixels.iter().copied().sum::<Color>() / self.pixels.len() as f32
    }

    /// Clamp, gamma-encode (γ = 2) and quantize to 8-bit RGBA for previews.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for color in &self.pixels {
            let encode = |c: f32| (255.0 * c.max(0.0).sqrt().min(1.0)) as u8;
            bytes.extend_from_slice(&[encode(color.x), encode(color.y), encode(color.z), 255]);
        }
        bytes
    }
}

impl Compositor for RadianceBuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn set(&mut self, x: u32, y: u32, color: Color) {
        self.pixels[(y * self.width + x) as usize] = color;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_and_average() {
        let mut buffer = RadianceBuffer::new(2, 2);
        buffer.set(1, 0, Color::new(4.0, 0.0, 0.0));
        assert_eq!(buffer.get(1, 0).x, 4.0);
        assert_eq!(buffer.get(0, 1), Color::ZERO);
        assert_eq!(buffer.average(), Color::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_rgba_encoding() {
        let mut buffer = RadianceBuffer::new(1, 1);
        buffer.set(0, 0, Color::new(0.25, 2.0, -1.0));
        assert_eq!(buffer.to_rgba8(), vec![127, 255, 0, 255]);
    }
}
