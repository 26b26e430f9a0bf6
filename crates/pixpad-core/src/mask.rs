use serde::{Deserialize, Serialize};

/// Selection mask: an optional bitmap placed at an offset in sprite space.
///
/// A mask with no bitmap selects nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Mask {
    pub x: i32,
    pub y: i32,
    width: u32,
    height: u32,
    /// One byte per pixel, non-zero means selected.
    bits: Vec<u8>,
}

impl Mask {
    /// An empty mask.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the whole `width` x `height` rectangle at (`x`, `y`).
    pub fn rect(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            bits: vec![1; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&b| b == 0)
    }

    /// Whether the sprite-space point (`x`, `y`) is selected.
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        let (u, v) = (x - self.x, y - self.y);
        if u < 0 || v < 0 || u as u32 >= self.width || v as u32 >= self.height {
            return false;
        }
        self.bits[v as usize * self.width as usize + u as usize] != 0
    }

    /// Clears the selection.
    pub fn deselect(&mut self) {
        *self = Mask::new();
    }
}
