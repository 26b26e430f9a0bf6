//! Document model combining the sprite and its object registry.
//!
//! A `Document` owns one [`Sprite`] and the [`Registry`] holding every layer,
//! cel, image, stock, palette and mask that the sprite references. The
//! mutators here are raw: they change the model without recording history.
//! Layer tree and cel operations live in the `layers` submodule.

mod layers;

use anyhow::{Context, Result};

use crate::id::{Identified, ObjectId, Registry};
use crate::image::{Image, PixelFormat};
use crate::layer::Layer;
use crate::mask::Mask;
use crate::palette::Palette;
use crate::sprite::Sprite;
use crate::stock::Stock;

/// A sprite together with the registry that resolves its object IDs.
#[derive(Debug, Clone)]
pub struct Document {
    registry: Registry,
    sprite: Sprite,
}

impl Document {
    /// Creates an empty one-frame sprite: a root folder with no layers, an
    /// empty stock, an empty mask and a single palette on frame 0.
    pub fn new(format: PixelFormat, width: u32, height: u32, frame_duration: u32) -> Self {
        let mut registry = Registry::new();
        let id = registry.reserve();
        let root = registry.register(Layer::folder("Sprite"));
        let stock = registry.register(Stock::new(format));
        let mask = registry.register(Mask::new());
        let palette = registry.register(Palette::grayscale(0));

        let mut sprite = Sprite::new(id, format, width, height, root, stock, mask, frame_duration);
        sprite.palettes.push(palette);
        Self { registry, sprite }
    }

    /// Creates a sprite with one image layer ("Layer 1") holding a blank
    /// cel on frame 0, and selects that layer.
    pub fn with_layer(
        format: PixelFormat,
        width: u32,
        height: u32,
        frame_duration: u32,
    ) -> Result<Self> {
        let mut doc = Self::new(format, width, height, frame_duration);
        let root = doc.root();
        let layer = doc.add_layer(root, Layer::image("Layer 1"), None)?;
        let index = doc.add_image(Image::new(format, width, height))?;
        doc.add_cel(layer, crate::cel::Cel::new(0, index))?;
        doc.sprite.current_layer = Some(layer);
        Ok(doc)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn sprite(&self) -> &Sprite {
        &self.sprite
    }

    pub fn sprite_mut(&mut self) -> &mut Sprite {
        &mut self.sprite
    }

    /// Resolves a sprite ID. Only this document's sprite can match.
    pub fn find_sprite(&self, id: ObjectId) -> Option<&Sprite> {
        (self.sprite.id == id).then_some(&self.sprite)
    }

    pub fn find_sprite_mut(&mut self, id: ObjectId) -> Option<&mut Sprite> {
        (self.sprite.id == id).then_some(&mut self.sprite)
    }

    /// Root folder layer ID.
    pub fn root(&self) -> ObjectId {
        self.sprite.root
    }

    /// Typed lookup that reports a missing or mistyped object as an error.
    pub fn get<T: Identified>(&self, id: ObjectId) -> Result<&T> {
        self.registry
            .get::<T>(id)
            .with_context(|| format!("object {id} not found"))
    }

    pub fn get_mut<T: Identified>(&mut self, id: ObjectId) -> Result<&mut T> {
        self.registry
            .get_mut::<T>(id)
            .with_context(|| format!("object {id} not found"))
    }

    pub fn layer(&self, id: ObjectId) -> Result<&Layer> {
        self.get::<Layer>(id).context("Failed to resolve layer")
    }

    pub fn layer_mut(&mut self, id: ObjectId) -> Result<&mut Layer> {
        self.get_mut::<Layer>(id).context("Failed to resolve layer")
    }

    pub fn image(&self, id: ObjectId) -> Result<&Image> {
        self.get::<Image>(id).context("Failed to resolve image")
    }

    pub fn image_mut(&mut self, id: ObjectId) -> Result<&mut Image> {
        self.get_mut::<Image>(id).context("Failed to resolve image")
    }

    pub fn stock(&self) -> Result<&Stock> {
        self.get::<Stock>(self.sprite.stock).context("Failed to resolve stock")
    }

    pub fn stock_mut(&mut self) -> Result<&mut Stock> {
        let id = self.sprite.stock;
        self.get_mut::<Stock>(id).context("Failed to resolve stock")
    }

    pub fn mask(&self) -> Result<&Mask> {
        self.get::<Mask>(self.sprite.mask).context("Failed to resolve mask")
    }

    pub fn mask_mut(&mut self) -> Result<&mut Mask> {
        let id = self.sprite.mask;
        self.get_mut::<Mask>(id).context("Failed to resolve mask")
    }

    pub fn palette(&self, id: ObjectId) -> Result<&Palette> {
        self.get::<Palette>(id).context("Failed to resolve palette")
    }

    pub fn palette_mut(&mut self, id: ObjectId) -> Result<&mut Palette> {
        self.get_mut::<Palette>(id).context("Failed to resolve palette")
    }

    // -- Stock images --

    /// Image ID stored at `index` in the stock.
    pub fn stock_image(&self, index: usize) -> Result<ObjectId> {
        self.stock()?
            .get(index)
            .with_context(|| format!("stock has no image at index {index}"))
    }

    /// Registers `image` and appends it to the stock. Returns its index.
    pub fn add_image(&mut self, image: Image) -> Result<usize> {
        let id = self.registry.register(image);
        Ok(self.stock_mut()?.push(id))
    }

    /// Puts an already-registered image into stock slot `index`.
    pub fn attach_image(&mut self, index: usize, image: ObjectId) -> Result<()> {
        self.stock_mut()?.set(index, Some(image));
        Ok(())
    }

    /// Removes the image at `index` from the stock and the registry.
    pub fn remove_image(&mut self, index: usize) -> Result<Option<Image>> {
        let Some(id) = self.stock_mut()?.remove(index) else {
            return Ok(None);
        };
        Ok(self.registry.take::<Image>(id))
    }

    /// Swaps the image at `index` for a newly registered one. Returns the
    /// old image, which is unregistered.
    pub fn replace_image(&mut self, index: usize, image: Image) -> Result<Option<Image>> {
        let id = self.registry.register(image);
        let previous = self.stock_mut()?.set(index, Some(id));
        Ok(previous.and_then(|old| self.registry.take::<Image>(old)))
    }

    /// Image drawn by `cel`.
    pub fn cel_image(&self, cel: ObjectId) -> Result<ObjectId> {
        let index = self.get::<crate::cel::Cel>(cel)?.image;
        self.stock_image(index)
    }

    // -- Palettes --

    /// Palette IDs sorted by starting frame.
    pub fn palettes(&self) -> &[ObjectId] {
        &self.sprite.palettes
    }

    /// Palette in effect on `frame`: the last palette starting at or before
    /// it, falling back to the first one.
    pub fn palette_at(&self, frame: u32) -> Option<ObjectId> {
        let mut found = self.sprite.palettes.first().copied();
        for &id in &self.sprite.palettes {
            match self.registry.get::<Palette>(id) {
                Some(palette) if palette.frame <= frame => found = Some(id),
                Some(_) => break,
                None => {}
            }
        }
        found
    }

    /// Registers `palette` and inserts it in frame order.
    pub fn add_palette(&mut self, palette: Palette) -> ObjectId {
        let id = self.registry.register(palette);
        self.attach_palette(id);
        id
    }

    /// Inserts an already-registered palette in frame order.
    pub fn attach_palette(&mut self, id: ObjectId) {
        let Some(frame) = self.registry.get::<Palette>(id).map(|p| p.frame) else {
            return;
        };
        let registry = &self.registry;
        let at = self.sprite.palettes.partition_point(|&other| {
            registry
                .get::<Palette>(other)
                .is_some_and(|p| p.frame <= frame)
        });
        self.sprite.palettes.insert(at, id);
    }

    /// Detaches and unregisters a palette.
    pub fn remove_palette(&mut self, id: ObjectId) -> Option<Palette> {
        let before = self.sprite.palettes.len();
        self.sprite.palettes.retain(|&other| other != id);
        if self.sprite.palettes.len() == before {
            return None;
        }
        self.registry.take::<Palette>(id)
    }

    /// Applies a palette index mapping to every indexed image drawn by cels
    /// on frames `from_frame..=to_frame`.
    pub fn remap_images(&mut self, from_frame: u32, to_frame: u32, mapping: &[u8]) -> Result<()> {
        if self.sprite.format != PixelFormat::Indexed {
            return Ok(());
        }
        let mut indices: Vec<usize> = Vec::new();
        for layer in self.image_layers()? {
            for &cel in self.layer(layer)?.cels() {
                let cel = self.get::<crate::cel::Cel>(cel)?;
                let in_range = cel.frame >= from_frame && cel.frame <= to_frame;
                if in_range && !indices.contains(&cel.image) {
                    indices.push(cel.image);
                }
            }
        }
        for index in indices {
            let id = self.stock_image(index)?;
            self.image_mut(id)?.remap(mapping);
        }
        Ok(())
    }
}
