/// Raster images stored as row-major pixel bytes.
use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::palette::{luma, rgba, rgba_components, Palette};

/// Pixel storage format of an image or sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 4 bytes per pixel: red, green, blue, alpha.
    #[default]
    Rgb,
    /// 2 bytes per pixel: value, alpha.
    Grayscale,
    /// 1 byte per pixel: palette index.
    Indexed,
}

impl PixelFormat {
    /// Number of bytes used by one pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb => 4,
            PixelFormat::Grayscale => 2,
            PixelFormat::Indexed => 1,
        }
    }

    /// Config/CLI name of the format.
    pub fn name(self) -> &'static str {
        match self {
            PixelFormat::Rgb => "rgb",
            PixelFormat::Grayscale => "grayscale",
            PixelFormat::Indexed => "indexed",
        }
    }

    /// Parses a config/CLI name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "rgb" => Some(PixelFormat::Rgb),
            "grayscale" | "gray" => Some(PixelFormat::Grayscale),
            "indexed" => Some(PixelFormat::Indexed),
            _ => None,
        }
    }
}

/// An axis-aligned rectangle in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Axis (or axes) a flip mirrors around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlipOrientation {
    Horizontal,
    Vertical,
    Both,
}

/// A rectangular raster of pixels in one [`PixelFormat`].
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    format: PixelFormat,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Image {
    /// Creates an image filled with zero bytes (transparent / index 0).
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * format.bytes_per_pixel();
        Self {
            format,
            width,
            height,
            pixels: vec![0; len],
        }
    }

    /// Builds an image from existing row-major pixel bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `pixels` does not hold exactly `width * height`
    /// pixels of the given format.
    pub fn from_pixels(
        format: PixelFormat,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> Result<Self> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if pixels.len() != expected {
            anyhow::bail!(
                "pixel buffer has {} bytes, expected {} for a {}x{} {} image",
                pixels.len(),
                expected,
                width,
                height,
                format.name()
            );
        }
        Ok(Self {
            format,
            width,
            height,
            pixels,
        })
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whole-image rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    /// Raw row-major pixel bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Byte length of `width` pixels of this image's format.
    pub fn line_size(&self, width: u32) -> usize {
        width as usize * self.format.bytes_per_pixel()
    }

    /// Whether `rect` lies fully inside the image.
    pub fn contains(&self, rect: Rect) -> bool {
        rect.x as u64 + rect.width as u64 <= self.width as u64
            && rect.y as u64 + rect.height as u64 <= self.height as u64
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.format.bytes_per_pixel()
    }

    /// Reads a pixel as a packed value, or `None` outside the image.
    ///
    /// RGB pixels pack as `r | g << 8 | b << 16 | a << 24`, grayscale as
    /// `v | a << 8`, indexed as the palette index.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let at = self.offset(x, y);
        let px = &self.pixels[at..at + self.format.bytes_per_pixel()];
        Some(match self.format {
            PixelFormat::Rgb => u32::from_le_bytes([px[0], px[1], px[2], px[3]]),
            PixelFormat::Grayscale => u16::from_le_bytes([px[0], px[1]]) as u32,
            PixelFormat::Indexed => px[0] as u32,
        })
    }

    /// Writes a packed pixel value. Coordinates outside the image are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, value: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let at = self.offset(x, y);
        let bytes = value.to_le_bytes();
        let bpp = self.format.bytes_per_pixel();
        self.pixels[at..at + bpp].copy_from_slice(&bytes[..bpp]);
    }

    /// Copies the pixels of `rect` out as row-major bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `rect` is not inside the image.
    pub fn read_rect(&self, rect: Rect) -> Result<Vec<u8>> {
        if !self.contains(rect) {
            anyhow::bail!(
                "rect {:?} out of bounds (image is {}x{})",
                rect,
                self.width,
                self.height
            );
        }
        let line = self.line_size(rect.width);
        let mut out = Vec::with_capacity(line * rect.height as usize);
        for row in rect.y..rect.y + rect.height {
            let at = self.offset(rect.x, row);
            out.extend_from_slice(&self.pixels[at..at + line]);
        }
        Ok(out)
    }

    /// Overwrites the pixels of `rect` with row-major bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `rect` is not inside the image or `data` has the
    /// wrong length.
    pub fn write_rect(&mut self, rect: Rect, data: &[u8]) -> Result<()> {
        if !self.contains(rect) {
            anyhow::bail!(
                "rect {:?} out of bounds (image is {}x{})",
                rect,
                self.width,
                self.height
            );
        }
        let line = self.line_size(rect.width);
        if data.len() != line * rect.height as usize {
            anyhow::bail!(
                "rect data has {} bytes, expected {}",
                data.len(),
                line * rect.height as usize
            );
        }
        for (i, row) in (rect.y..rect.y + rect.height).enumerate() {
            let at = self.offset(rect.x, row);
            self.pixels[at..at + line].copy_from_slice(&data[i * line..(i + 1) * line]);
        }
        Ok(())
    }

    /// Byte slice of `width` pixels starting at (`x`, `y`).
    pub(crate) fn span_mut(&mut self, x: u32, y: u32, width: u32) -> &mut [u8] {
        let at = self.offset(x, y);
        let len = self.line_size(width);
        &mut self.pixels[at..at + len]
    }

    pub(crate) fn span(&self, x: u32, y: u32, width: u32) -> &[u8] {
        let at = self.offset(x, y);
        &self.pixels[at..at + self.line_size(width)]
    }

    /// Mirrors the pixels inside `rect`. Applying the same flip twice is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if `rect` is not inside the image.
    pub fn flip(&mut self, rect: Rect, orientation: FlipOrientation) -> Result<()> {
        let area = self.read_rect(rect)?;
        let bpp = self.format.bytes_per_pixel();
        let line = self.line_size(rect.width);
        let horizontal = matches!(orientation, FlipOrientation::Horizontal | FlipOrientation::Both);
        let vertical = matches!(orientation, FlipOrientation::Vertical | FlipOrientation::Both);

        for v in 0..rect.height {
            for u in 0..rect.width {
                let src = v as usize * line + u as usize * bpp;
                let dx = if horizontal { rect.width - 1 - u } else { u };
                let dy = if vertical { rect.height - 1 - v } else { v };
                let at = self.offset(rect.x + dx, rect.y + dy);
                self.pixels[at..at + bpp].copy_from_slice(&area[src..src + bpp]);
            }
        }
        Ok(())
    }

    /// Replaces every palette index `i` by `mapping[i]`.
    ///
    /// Only indexed images are affected.
    pub fn remap(&mut self, mapping: &[u8]) {
        if self.format != PixelFormat::Indexed || mapping.len() < 256 {
            return;
        }
        for px in &mut self.pixels {
            *px = mapping[*px as usize];
        }
    }

    /// Returns a copy of this image converted to `format`.
    ///
    /// Indexed sources are resolved through `palette`; conversions to indexed
    /// pick the nearest palette entry, with fully transparent pixels mapped
    /// to index 0.
    pub fn converted(&self, format: PixelFormat, palette: &Palette) -> Image {
        if format == self.format {
            return self.clone();
        }
        let mut out = Image::new(format, self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let Some(value) = self.get_pixel(x, y) else {
                    continue;
                };
                let color = match self.format {
                    PixelFormat::Rgb => value,
                    PixelFormat::Grayscale => {
                        let v = (value & 0xff) as u8;
                        let a = (value >> 8) as u8;
                        rgba(v, v, v, a)
                    }
                    PixelFormat::Indexed => palette.color(value as usize).unwrap_or(0),
                };
                let (r, g, b, a) = rgba_components(color);
                let converted = match format {
                    PixelFormat::Rgb => color,
                    PixelFormat::Grayscale => luma(r, g, b) as u32 | (a as u32) << 8,
                    PixelFormat::Indexed if a == 0 => 0,
                    PixelFormat::Indexed => palette.nearest_index(color) as u32,
                };
                out.put_pixel(x, y, converted);
            }
        }
        out
    }

    /// Sets every pixel to `value`.
    pub fn fill(&mut self, value: u32) {
        let bpp = self.format.bytes_per_pixel();
        let bytes = value.to_le_bytes();
        for px in self.pixels.chunks_exact_mut(bpp) {
            px.copy_from_slice(&bytes[..bpp]);
        }
    }

    /// Copies the `width` x `height` region with its corner at (`x`, `y`).
    ///
    /// The region may reach outside the image; those pixels are set to
    /// `fill`.
    pub fn cropped(&self, x: i32, y: i32, width: u32, height: u32, fill: u32) -> Image {
        let mut out = Image::new(self.format, width, height);
        out.fill(fill);
        for v in 0..height {
            let sy = y as i64 + v as i64;
            if sy < 0 || sy >= self.height as i64 {
                continue;
            }
            for u in 0..width {
                let sx = x as i64 + u as i64;
                if sx < 0 || sx >= self.width as i64 {
                    continue;
                }
                if let Some(value) = self.get_pixel(sx as u32, sy as u32) {
                    out.put_pixel(u, v, value);
                }
            }
        }
        out
    }

    /// Smallest rectangle holding every pixel that differs from
    /// `reference`, or `None` when the whole image matches it.
    pub fn shrink_bounds(&self, reference: u32) -> Option<Rect> {
        let (mut x1, mut y1) = (u32::MAX, u32::MAX);
        let (mut x2, mut y2) = (0, 0);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get_pixel(x, y) != Some(reference) {
                    x1 = x1.min(x);
                    y1 = y1.min(y);
                    x2 = x2.max(x);
                    y2 = y2.max(y);
                }
            }
        }
        (x1 <= x2 && y1 <= y2).then(|| Rect::new(x1, y1, x2 - x1 + 1, y2 - y1 + 1))
    }
}
