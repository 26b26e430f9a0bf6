use anyhow::Result;
use pixpad_core::{Document, ObjectId, Stock};
use serde::{Deserialize, Serialize};

use super::snapshot::ImageSnapshot;
use super::Action;
use crate::chunk::{ChunkKind, ChunkWriter};

/// An image was put into a stock slot; undoing empties the slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AddImage {
    stock: ObjectId,
    index: usize,
}

impl AddImage {
    pub(crate) fn capture(doc: &Document, index: usize) -> Self {
        Self {
            stock: doc.sprite().stock,
            index,
        }
    }
}

impl Action for AddImage {
    const KIND: ChunkKind = ChunkKind::AddImage;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        let stock = doc.registry().get::<Stock>(self.stock);
        let Some(image) = stock.and_then(|s| s.get(self.index)) else {
            return Ok(());
        };
        out.push(&RemoveImage {
            stock: self.stock,
            index: self.index,
            image: ImageSnapshot::capture(doc, image)?,
        })?;
        doc.remove_image(self.index)?;
        Ok(())
    }
}

/// An image was taken out of a stock slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RemoveImage {
    stock: ObjectId,
    index: usize,
    image: ImageSnapshot,
}

impl RemoveImage {
    pub(crate) fn capture(doc: &Document, index: usize) -> Result<Self> {
        Ok(Self {
            stock: doc.sprite().stock,
            index,
            image: ImageSnapshot::capture(doc, doc.stock_image(index)?)?,
        })
    }
}

impl Action for RemoveImage {
    const KIND: ChunkKind = ChunkKind::RemoveImage;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        if !doc.registry().contains(self.stock) {
            return Ok(());
        }
        out.push(&AddImage {
            stock: self.stock,
            index: self.index,
        })?;
        let image = self.image.restore(doc)?;
        doc.attach_image(self.index, image)
    }
}

/// The image in a stock slot was swapped for another one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ReplaceImage {
    stock: ObjectId,
    index: usize,
    image: Option<ImageSnapshot>,
}

impl ReplaceImage {
    pub(crate) fn capture(doc: &Document, index: usize) -> Result<Self> {
        let image = match doc.stock()?.get(index) {
            Some(id) => Some(ImageSnapshot::capture(doc, id)?),
            None => None,
        };
        Ok(Self {
            stock: doc.sprite().stock,
            index,
            image,
        })
    }
}

impl Action for ReplaceImage {
    const KIND: ChunkKind = ChunkKind::ReplaceImage;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        let Some(stock) = doc.registry().get::<Stock>(self.stock) else {
            return Ok(());
        };
        let current = match stock.get(self.index) {
            Some(id) => Some(ImageSnapshot::capture(doc, id)?),
            None => None,
        };
        out.push(&ReplaceImage {
            stock: self.stock,
            index: self.index,
            image: current,
        })?;

        doc.remove_image(self.index)?;
        if let Some(snapshot) = self.image {
            let image = snapshot.restore(doc)?;
            doc.attach_image(self.index, image)?;
        }
        Ok(())
    }
}
