/// 256-entry color palettes, one per starting frame.
use serde::{Deserialize, Serialize};

/// Number of entries in every palette.
pub const PALETTE_SIZE: usize = 256;

/// Packs RGBA components into a pixel value.
pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    u32::from_le_bytes([r, g, b, a])
}

/// Splits a packed RGBA value into components.
pub fn rgba_components(color: u32) -> (u8, u8, u8, u8) {
    let [r, g, b, a] = color.to_le_bytes();
    (r, g, b, a)
}

/// Perceptual luminance used when converting color to grayscale.
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 30 + g as u32 * 59 + b as u32 * 11) / 100) as u8
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    /// First frame this palette applies to.
    pub frame: u32,
    colors: Vec<u32>,
}

impl Palette {
    /// Creates an all-black opaque palette for `frame`.
    pub fn new(frame: u32) -> Self {
        Self {
            frame,
            colors: vec![rgba(0, 0, 0, 255); PALETTE_SIZE],
        }
    }

    /// Creates the 256-level gray ramp used by grayscale sprites.
    pub fn grayscale(frame: u32) -> Self {
        let colors = (0..PALETTE_SIZE)
            .map(|i| rgba(i as u8, i as u8, i as u8, 255))
            .collect();
        Self { frame, colors }
    }

    /// Builds a palette from explicit colors, padding or truncating to 256.
    pub fn from_colors(frame: u32, mut colors: Vec<u32>) -> Self {
        colors.resize(PALETTE_SIZE, rgba(0, 0, 0, 255));
        Self { frame, colors }
    }

    pub fn colors(&self) -> &[u32] {
        &self.colors
    }

    pub fn color(&self, index: usize) -> Option<u32> {
        self.colors.get(index).copied()
    }

    /// Sets one entry. Indices past the end are ignored.
    pub fn set_color(&mut self, index: usize, color: u32) {
        if let Some(slot) = self.colors.get_mut(index) {
            *slot = color;
        }
    }

    /// Copies `colors` into consecutive entries starting at `from`.
    pub fn set_colors(&mut self, from: usize, colors: &[u32]) {
        for (offset, &color) in colors.iter().enumerate() {
            self.set_color(from + offset, color);
        }
    }

    /// Index of the entry closest to `color` in RGB space.
    ///
    /// Index 0 is skipped since it is reserved for transparency in
    /// indexed images.
    pub fn nearest_index(&self, color: u32) -> u8 {
        let (r, g, b, _) = rgba_components(color);
        let mut best = 1usize;
        let mut best_dist = u32::MAX;
        for (i, &entry) in self.colors.iter().enumerate().skip(1) {
            let (er, eg, eb, _) = rgba_components(entry);
            let dr = r as i32 - er as i32;
            let dg = g as i32 - eg as i32;
            let db = b as i32 - eb as i32;
            let dist = (dr * dr + dg * dg + db * db) as u32;
            if dist < best_dist {
                best = i;
                best_dist = dist;
                if dist == 0 {
                    break;
                }
            }
        }
        best as u8
    }

    /// Reorders entries so that entry `i` moves to `mapping[i]`.
    pub fn apply_mapping(&mut self, mapping: &[u8]) {
        let old = self.colors.clone();
        for (i, &color) in old.iter().enumerate() {
            if let Some(&to) = mapping.get(i) {
                self.colors[to as usize] = color;
            }
        }
    }
}

/// Returns the inverse of a 256-entry permutation, or `None` if `mapping`
/// is not one.
pub fn invert_mapping(mapping: &[u8]) -> Option<Vec<u8>> {
    if mapping.len() != PALETTE_SIZE {
        return None;
    }
    let mut inverse = vec![0u8; PALETTE_SIZE];
    let mut seen = [false; PALETTE_SIZE];
    for (i, &to) in mapping.iter().enumerate() {
        if seen[to as usize] {
            return None;
        }
        seen[to as usize] = true;
        inverse[to as usize] = i as u8;
    }
    Some(inverse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_packing() {
        let c = rgba(1, 2, 3, 4);
        assert_eq!(rgba_components(c), (1, 2, 3, 4));
        assert_eq!(c, 0x0403_0201);
    }

    #[test]
    fn test_luma_weights() {
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(100, 0, 0), 30);
        assert_eq!(luma(0, 100, 0), 59);
    }

    #[test]
    fn test_grayscale_ramp() {
        let pal = Palette::grayscale(2);
        assert_eq!(pal.frame, 2);
        assert_eq!(pal.colors().len(), PALETTE_SIZE);
        assert_eq!(pal.color(128), Some(rgba(128, 128, 128, 255)));
    }

    #[test]
    fn test_set_colors_clips_at_end() {
        let mut pal = Palette::new(0);
        pal.set_colors(254, &[rgba(1, 1, 1, 255), rgba(2, 2, 2, 255), rgba(3, 3, 3, 255)]);
        assert_eq!(pal.color(254), Some(rgba(1, 1, 1, 255)));
        assert_eq!(pal.color(255), Some(rgba(2, 2, 2, 255)));
        assert_eq!(pal.color(256), None);
    }

    #[test]
    fn test_nearest_index_skips_zero() {
        let pal = Palette::grayscale(0);
        assert_eq!(pal.nearest_index(rgba(0, 0, 0, 255)), 1);
        assert_eq!(pal.nearest_index(rgba(90, 90, 90, 255)), 90);
    }

    #[test]
    fn test_mapping_and_inverse() {
        let mut mapping: Vec<u8> = (0..=255).collect();
        mapping.swap(3, 7);
        mapping.swap(7, 9);
        let inverse = invert_mapping(&mapping).unwrap();

        let mut pal = Palette::grayscale(0);
        let original = pal.clone();
        pal.apply_mapping(&mapping);
        assert_eq!(pal.color(mapping[3] as usize), original.color(3));
        pal.apply_mapping(&inverse);
        assert_eq!(pal, original);
    }

    #[test]
    fn test_invert_mapping_rejects_non_permutation() {
        let mut mapping: Vec<u8> = (0..=255).collect();
        mapping[10] = 11;
        assert!(invert_mapping(&mapping).is_none());
        assert!(invert_mapping(&[0, 1, 2]).is_none());
    }
}
