use anyhow::Result;
use pixpad_core::{Dirty, Document, FlipOrientation, Image, ObjectId, PixelFormat, Rect};
use serde::{Deserialize, Serialize};

use super::Action;
use crate::chunk::{ChunkKind, ChunkWriter};

/// Pixels of one rectangle of an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ImagePatch {
    image: ObjectId,
    format: PixelFormat,
    rect: Rect,
    pixels: Vec<u8>,
}

impl ImagePatch {
    pub(crate) fn capture(doc: &Document, image: ObjectId, rect: Rect) -> Result<Self> {
        let img = doc.image(image)?;
        Ok(Self {
            image,
            format: img.format(),
            pixels: img.read_rect(rect)?,
            rect,
        })
    }

    fn fits(&self, img: &Image) -> bool {
        img.format() == self.format
            && img.contains(self.rect)
            && self.pixels.len() == img.line_size(self.rect.width) * self.rect.height as usize
    }
}

impl Action for ImagePatch {
    const KIND: ChunkKind = ChunkKind::Image;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        match doc.registry().get::<Image>(self.image) {
            Some(img) if self.fits(img) => {}
            Some(_) => {
                tracing::debug!("image {} no longer matches its patch", self.image);
                return Ok(());
            }
            None => return Ok(()),
        }
        out.push(&ImagePatch::capture(doc, self.image, self.rect)?)?;
        doc.image_mut(self.image)?.write_rect(self.rect, &self.pixels)
    }
}

/// A flip over a rectangle. Its own inverse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct FlipImage {
    image: ObjectId,
    format: PixelFormat,
    rect: Rect,
    orientation: FlipOrientation,
}

impl FlipImage {
    pub(crate) fn capture(
        doc: &Document,
        image: ObjectId,
        rect: Rect,
        orientation: FlipOrientation,
    ) -> Result<Self> {
        let img = doc.image(image)?;
        if !img.contains(rect) {
            anyhow::bail!(
                "flip rect {:?} outside {}x{} image",
                rect,
                img.width(),
                img.height()
            );
        }
        Ok(Self {
            image,
            format: img.format(),
            rect,
            orientation,
        })
    }
}

impl Action for FlipImage {
    const KIND: ChunkKind = ChunkKind::Flip;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        let Some(img) = doc.registry_mut().get_mut::<Image>(self.image) else {
            return Ok(());
        };
        if img.format() != self.format || !img.contains(self.rect) {
            return Ok(());
        }
        out.push(&self)?;
        img.flip(self.rect, self.orientation)
    }
}

/// Previous values of the pixels listed in a sparse dirty region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct DirtyPatch {
    image: ObjectId,
    dirty: Dirty,
}

impl DirtyPatch {
    /// Captures the pixels of `image` that `dirty` is about to overwrite.
    pub(crate) fn capture(doc: &Document, image: ObjectId, dirty: &Dirty) -> Result<Self> {
        Ok(Self {
            image,
            dirty: dirty.capture_from(doc.image(image)?)?,
        })
    }
}

impl Action for DirtyPatch {
    const KIND: ChunkKind = ChunkKind::Dirty;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        let Some(img) = doc.registry_mut().get_mut::<Image>(self.image) else {
            return Ok(());
        };
        let current = DirtyPatch {
            image: self.image,
            dirty: self.dirty.capture_from(img)?,
        };
        out.push(&current)?;
        self.dirty.apply_to(img)
    }
}
