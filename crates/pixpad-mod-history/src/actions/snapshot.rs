//! Whole-object snapshots that re-create destroyed objects under their
//! original IDs.

use anyhow::{Context, Result};
use pixpad_core::{Cel, Document, Image, Layer, LayerKind, ObjectId, Palette, PixelFormat};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ImageSnapshot {
    id: ObjectId,
    format: PixelFormat,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl ImageSnapshot {
    pub(crate) fn capture(doc: &Document, id: ObjectId) -> Result<Self> {
        let image = doc.image(id)?;
        Ok(Self {
            id,
            format: image.format(),
            width: image.width(),
            height: image.height(),
            pixels: image.pixels().to_vec(),
        })
    }

    /// Registers the image again under its original ID.
    pub(crate) fn restore(self, doc: &mut Document) -> Result<ObjectId> {
        let image = Image::from_pixels(self.format, self.width, self.height, self.pixels)
            .context("Failed to rebuild image from snapshot")?;
        doc.registry_mut().assign_id(self.id, image);
        Ok(self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CelSnapshot {
    id: ObjectId,
    cel: Cel,
}

impl CelSnapshot {
    pub(crate) fn capture(doc: &Document, id: ObjectId) -> Result<Self> {
        let cel = doc.get::<Cel>(id).context("Failed to snapshot cel")?;
        Ok(Self {
            id,
            cel: cel.clone(),
        })
    }

    pub(crate) fn restore(self, doc: &mut Document) -> ObjectId {
        doc.registry_mut().assign_id(self.id, self.cel);
        self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum LayerContent {
    Image {
        cels: Vec<CelSnapshot>,
    },
    Folder {
        layers: Vec<LayerSnapshot>,
    },
}

/// A layer with its whole subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct LayerSnapshot {
    id: ObjectId,
    name: String,
    flags: u8,
    blend_mode: u8,
    content: LayerContent,
    /// Stock images only this subtree draws, keyed by stock index. Filled on
    /// the top-level snapshot only.
    images: Vec<(usize, ImageSnapshot)>,
}

impl LayerSnapshot {
    /// Snapshots the subtree of `id` with the stock images that destroying
    /// it would remove.
    pub(crate) fn capture(doc: &Document, id: ObjectId) -> Result<Self> {
        let mut snapshot = Self::capture_tree(doc, id)?;
        for index in doc.owned_images(id)? {
            let image = doc.stock_image(index)?;
            snapshot
                .images
                .push((index, ImageSnapshot::capture(doc, image)?));
        }
        Ok(snapshot)
    }

    fn capture_tree(doc: &Document, id: ObjectId) -> Result<Self> {
        let layer = doc.layer(id)?;
        let content = match &layer.kind {
            LayerKind::Image { cels } => LayerContent::Image {
                cels: cels
                    .iter()
                    .map(|&cel| CelSnapshot::capture(doc, cel))
                    .collect::<Result<_>>()?,
            },
            LayerKind::Folder { layers } => LayerContent::Folder {
                layers: layers
                    .iter()
                    .map(|&child| Self::capture_tree(doc, child))
                    .collect::<Result<_>>()?,
            },
        };
        Ok(Self {
            id,
            name: layer.name.clone(),
            flags: layer.flags,
            blend_mode: layer.blend_mode,
            content,
            images: Vec::new(),
        })
    }

    pub(crate) fn id(&self) -> ObjectId {
        self.id
    }

    /// Re-creates the subtree under its original IDs and puts the stock
    /// images back. The returned layer is not attached to any folder.
    pub(crate) fn restore(self, doc: &mut Document) -> Result<ObjectId> {
        for (index, image) in self.images {
            let image = image.restore(doc)?;
            doc.attach_image(index, image)?;
        }
        let kind = match self.content {
            LayerContent::Image { cels } => LayerKind::Image {
                cels: cels.into_iter().map(|cel| cel.restore(doc)).collect(),
            },
            LayerContent::Folder { layers } => {
                let mut children = Vec::with_capacity(layers.len());
                for child in layers {
                    let child = child.restore(doc)?;
                    if let Some(layer) = doc.registry_mut().get_mut::<Layer>(child) {
                        layer.parent = Some(self.id);
                    }
                    children.push(child);
                }
                LayerKind::Folder { layers: children }
            }
        };
        let layer = Layer {
            name: self.name,
            flags: self.flags,
            blend_mode: self.blend_mode,
            parent: None,
            kind,
        };
        doc.registry_mut().assign_id(self.id, layer);
        Ok(self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PaletteSnapshot {
    id: ObjectId,
    palette: Palette,
}

impl PaletteSnapshot {
    pub(crate) fn capture(doc: &Document, id: ObjectId) -> Result<Self> {
        Ok(Self {
            id,
            palette: doc.palette(id)?.clone(),
        })
    }

    pub(crate) fn restore(self, doc: &mut Document) -> ObjectId {
        doc.registry_mut().assign_id(self.id, self.palette);
        doc.attach_palette(self.id);
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_snapshot_restores_ids_and_images() {
        let mut doc = Document::new(PixelFormat::Indexed, 2, 2, 100);
        let root = doc.root();
        let folder = doc.add_layer(root, Layer::folder("group"), None).unwrap();
        let inner = doc.add_layer(folder, Layer::image("inner"), None).unwrap();
        let index = doc.add_image(Image::new(PixelFormat::Indexed, 2, 2)).unwrap();
        let image = doc.stock_image(index).unwrap();
        doc.image_mut(image).unwrap().put_pixel(1, 1, 9);
        let c0 = doc.add_cel(inner, Cel::new(0, index)).unwrap();
        let c1 = doc.add_cel(inner, Cel::new(1, index)).unwrap();

        let snap = LayerSnapshot::capture(&doc, folder).unwrap();
        // The linked cel does not duplicate the image.
        assert_eq!(snap.images.len(), 1);
        match &snap.content {
            LayerContent::Folder { layers } => match &layers[0].content {
                LayerContent::Image { cels } => assert_eq!(cels.len(), 2),
                LayerContent::Folder { .. } => panic!("expected image layer"),
            },
            LayerContent::Image { .. } => panic!("expected folder"),
        }

        doc.destroy_layer(folder).unwrap();
        assert!(doc.registry().find(c1).is_none());

        let restored = snap.restore(&mut doc).unwrap();
        doc.attach_layer(restored, root, None).unwrap();
        assert_eq!(restored, folder);
        assert_eq!(doc.all_layers().unwrap(), vec![folder, inner]);
        assert_eq!(doc.layer(inner).unwrap().parent, Some(folder));
        assert_eq!(doc.layer(inner).unwrap().cels(), &[c0, c1]);
        assert_eq!(doc.stock_image(index).unwrap(), image);
        assert_eq!(doc.image(image).unwrap().get_pixel(1, 1), Some(9));
    }

    #[test]
    fn test_palette_snapshot_reinserts_in_order() {
        let mut doc = Document::new(PixelFormat::Indexed, 2, 2, 100);
        let first = doc.palettes()[0];
        let p3 = doc.add_palette(Palette::new(3));
        let p6 = doc.add_palette(Palette::new(6));

        let snap = PaletteSnapshot::capture(&doc, p3).unwrap();
        doc.remove_palette(p3);
        snap.restore(&mut doc);
        assert_eq!(doc.palettes(), &[first, p3, p6]);
    }
}
