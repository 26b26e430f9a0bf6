//! Layer tree and cel operations on a [`Document`].

use anyhow::{Context, Result};

use super::Document;
use crate::cel::Cel;
use crate::id::ObjectId;
use crate::layer::{Layer, LayerKind};

impl Document {
    /// Registers `layer` and inserts it into folder `parent` right after
    /// `after` (at the bottom when `after` is `None`).
    pub fn add_layer(
        &mut self,
        parent: ObjectId,
        mut layer: Layer,
        after: Option<ObjectId>,
    ) -> Result<ObjectId> {
        if !self.layer(parent)?.is_folder() {
            anyhow::bail!("layer {parent} is not a folder");
        }
        layer.parent = Some(parent);
        let id = self.registry.register(layer);
        self.layer_mut(parent)?.insert_child_after(id, after);
        Ok(id)
    }

    /// Inserts an already-registered layer into `parent` after `after`.
    pub fn attach_layer(
        &mut self,
        id: ObjectId,
        parent: ObjectId,
        after: Option<ObjectId>,
    ) -> Result<()> {
        self.layer_mut(id)?.parent = Some(parent);
        self.layer_mut(parent)?.insert_child_after(id, after);
        Ok(())
    }

    /// Takes a layer out of its folder without destroying it.
    ///
    /// Returns the folder and the sibling the layer sat right above, which is
    /// what [`Document::attach_layer`] needs to put it back.
    pub fn detach_layer(&mut self, id: ObjectId) -> Result<(ObjectId, Option<ObjectId>)> {
        let parent = self
            .layer(id)?
            .parent
            .with_context(|| format!("layer {id} has no parent"))?;
        let after = self.layer(parent)?.previous_child(id);
        self.layer_mut(parent)?.remove_child(id);
        Ok((parent, after))
    }

    /// Detaches a layer and unregisters it with its whole subtree, including
    /// the stock images its cels draw.
    pub fn destroy_layer(&mut self, id: ObjectId) -> Result<Layer> {
        let owned = self.owned_images(id)?;
        if self.layer(id)?.parent.is_some() {
            self.detach_layer(id)?;
        }
        let layer = self.destroy_subtree(id)?;
        tracing::debug!("destroyed layer {id} with {} owned images", owned.len());
        for index in owned {
            self.remove_image(index)?;
        }
        Ok(layer)
    }

    fn destroy_subtree(&mut self, id: ObjectId) -> Result<Layer> {
        let layer = self
            .registry
            .take::<Layer>(id)
            .with_context(|| format!("layer {id} not found"))?;
        match &layer.kind {
            LayerKind::Image { cels } => {
                for &cel in cels {
                    self.registry.take::<Cel>(cel);
                }
            }
            LayerKind::Folder { layers } => {
                for &child in layers {
                    self.destroy_subtree(child)?;
                }
            }
        }
        Ok(layer)
    }

    /// Stock indices drawn by cels inside `layer`'s subtree and by no cel
    /// outside it. Destroying the subtree takes these images along.
    pub fn owned_images(&self, layer: ObjectId) -> Result<Vec<usize>> {
        let mut inside = Vec::new();
        self.collect_cels(layer, &mut inside)?;

        let mut outside = Vec::new();
        for other in self.image_layers()? {
            for &cel in self.layer(other)?.cels() {
                if !inside.contains(&cel) {
                    outside.push(self.get::<Cel>(cel)?.image);
                }
            }
        }

        let stock = self.stock()?;
        let mut owned = Vec::new();
        for &cel in &inside {
            let index = self.get::<Cel>(cel)?.image;
            let shared = outside.contains(&index) || owned.contains(&index);
            if !shared && stock.get(index).is_some() {
                owned.push(index);
            }
        }
        Ok(owned)
    }

    fn collect_cels(&self, layer: ObjectId, out: &mut Vec<ObjectId>) -> Result<()> {
        match &self.layer(layer)?.kind {
            LayerKind::Image { cels } => out.extend_from_slice(cels),
            LayerKind::Folder { layers } => {
                for &child in layers {
                    self.collect_cels(child, out)?;
                }
            }
        }
        Ok(())
    }

    /// Moves a layer inside its folder so it sits right after `after`.
    pub fn move_layer(&mut self, id: ObjectId, after: Option<ObjectId>) -> Result<()> {
        let (parent, _) = self.detach_layer(id)?;
        self.attach_layer(id, parent, after)
    }

    /// Every layer below the root, depth-first, bottom to top.
    pub fn all_layers(&self) -> Result<Vec<ObjectId>> {
        let mut out = Vec::new();
        self.collect_layers(self.root(), &mut out)?;
        Ok(out)
    }

    fn collect_layers(&self, folder: ObjectId, out: &mut Vec<ObjectId>) -> Result<()> {
        for &child in self.layer(folder)?.children() {
            out.push(child);
            if self.layer(child)?.is_folder() {
                self.collect_layers(child, out)?;
            }
        }
        Ok(())
    }

    /// Every image layer, bottom to top.
    pub fn image_layers(&self) -> Result<Vec<ObjectId>> {
        let mut out = Vec::new();
        for id in self.all_layers()? {
            if self.layer(id)?.is_image() {
                out.push(id);
            }
        }
        Ok(out)
    }

    /// First layer with the given name.
    pub fn find_layer_by_name(&self, name: &str) -> Result<Option<ObjectId>> {
        for id in self.all_layers()? {
            if self.layer(id)?.name == name {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    /// The image layer flagged as background among the root's children.
    pub fn background_layer(&self) -> Result<Option<ObjectId>> {
        for &id in self.layer(self.root())?.children() {
            let layer = self.layer(id)?;
            if layer.is_image() && layer.is_background() {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    /// Canvas-space bounds `(x1, y1, x2, y2)`, inclusive, of every pixel that
    /// differs from its cel image's top-left pixel, across all frames of the
    /// readable image layers. Pixels off the canvas are ignored.
    pub fn content_bounds(&self) -> Result<Option<(i32, i32, i32, i32)>> {
        let (width, height) = (self.sprite.width as i32, self.sprite.height as i32);
        let mut bounds: Option<(i32, i32, i32, i32)> = None;
        for layer in self.image_layers()? {
            if !self.layer(layer)?.is_readable() {
                continue;
            }
            for &cel in self.layer(layer)?.cels() {
                let c = self.get::<Cel>(cel)?;
                let Some(image) = self.stock()?.get(c.image) else {
                    continue;
                };
                let image = self.image(image)?;
                let Some(reference) = image.get_pixel(0, 0) else {
                    continue;
                };
                let Some(rect) = image.shrink_bounds(reference) else {
                    continue;
                };
                let x1 = (c.x + rect.x as i32).max(0);
                let y1 = (c.y + rect.y as i32).max(0);
                let x2 = (c.x + (rect.x + rect.width) as i32 - 1).min(width - 1);
                let y2 = (c.y + (rect.y + rect.height) as i32 - 1).min(height - 1);
                if x1 > x2 || y1 > y2 {
                    continue;
                }
                bounds = Some(match bounds {
                    Some((bx1, by1, bx2, by2)) => {
                        (bx1.min(x1), by1.min(y1), bx2.max(x2), by2.max(y2))
                    }
                    None => (x1, y1, x2, y2),
                });
            }
        }
        Ok(bounds)
    }

    // -- Cels --

    /// Registers `cel` and adds it to an image layer in frame order.
    pub fn add_cel(&mut self, layer: ObjectId, cel: Cel) -> Result<ObjectId> {
        if !self.layer(layer)?.is_image() {
            anyhow::bail!("layer {layer} cannot hold cels");
        }
        let id = self.registry.register(cel);
        self.attach_cel(layer, id)?;
        Ok(id)
    }

    /// Adds an already-registered cel to an image layer in frame order.
    pub fn attach_cel(&mut self, layer: ObjectId, cel: ObjectId) -> Result<()> {
        let frame = self.get::<Cel>(cel)?.frame;
        let registry = &self.registry;
        let at = self
            .layer(layer)?
            .cels()
            .partition_point(|&other| registry.get::<Cel>(other).is_some_and(|c| c.frame <= frame));
        match &mut self.layer_mut(layer)?.kind {
            LayerKind::Image { cels } => cels.insert(at, cel),
            LayerKind::Folder { .. } => anyhow::bail!("layer {layer} cannot hold cels"),
        }
        Ok(())
    }

    /// Removes a cel from its layer without unregistering it.
    pub fn detach_cel(&mut self, layer: ObjectId, cel: ObjectId) -> Result<()> {
        if let LayerKind::Image { cels } = &mut self.layer_mut(layer)?.kind {
            cels.retain(|&id| id != cel);
        }
        Ok(())
    }

    /// Removes a cel from its layer and unregisters it. The stock image it
    /// draws is left alone.
    pub fn remove_cel(&mut self, layer: ObjectId, cel: ObjectId) -> Result<Cel> {
        self.detach_cel(layer, cel)?;
        self.registry
            .take::<Cel>(cel)
            .with_context(|| format!("cel {cel} not found"))
    }

    /// Cel of `layer` on `frame`, if any.
    pub fn cel_at(&self, layer: ObjectId, frame: u32) -> Option<ObjectId> {
        let layer = self.registry.get::<Layer>(layer)?;
        layer
            .cels()
            .iter()
            .copied()
            .find(|&id| self.registry.get::<Cel>(id).is_some_and(|c| c.frame == frame))
    }

    /// Number of cels, across all layers, that draw stock image `index`.
    pub fn image_use_count(&self, index: usize) -> Result<usize> {
        let mut count = 0;
        for layer in self.image_layers()? {
            for &cel in self.layer(layer)?.cels() {
                if self.get::<Cel>(cel)?.image == index {
                    count += 1;
                }
            }
        }
        Ok(count)
    }
}
