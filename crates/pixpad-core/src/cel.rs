use serde::{Deserialize, Serialize};

/// Places one stock image on one frame of a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cel {
    pub frame: u32,
    /// Index into the sprite's image stock.
    pub image: usize,
    pub x: i32,
    pub y: i32,
    pub opacity: u8,
}

impl Cel {
    /// Creates an opaque cel at the origin.
    pub fn new(frame: u32, image: usize) -> Self {
        Self {
            frame,
            image,
            x: 0,
            y: 0,
            opacity: 255,
        }
    }

    pub fn with_position(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cel_is_opaque_at_origin() {
        let cel = Cel::new(4, 2).with_position(-3, 5);
        assert_eq!(cel.frame, 4);
        assert_eq!(cel.image, 2);
        assert_eq!((cel.x, cel.y), (-3, 5));
        assert_eq!(cel.opacity, 255);
    }
}
