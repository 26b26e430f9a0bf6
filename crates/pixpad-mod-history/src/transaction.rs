/// Scoped composite operations with automatic rollback.
///
/// An [`UndoTransaction`] opens a group when created. Every operation it
/// offers records its undo information and then mutates the document.
/// [`UndoTransaction::commit`] closes the group as real history; dropping the
/// transaction without committing closes the group, undoes it immediately and
/// discards the redo stream, so a failed command leaves no trace.
use anyhow::{Context, Result};
use pixpad_core::layer::{LAYER_BACKGROUND, LAYER_LOCKMOVE};
use pixpad_core::{
    Cel, Dirty, Document, FlipOrientation, Image, Layer, Mask, ObjectId, Palette, PixelFormat,
    Rect,
};

use crate::actions::Field;
use crate::manager::UndoManager;

pub struct UndoTransaction<'a> {
    doc: &'a mut Document,
    history: &'a mut UndoManager,
    enabled: bool,
    committed: bool,
}

impl<'a> UndoTransaction<'a> {
    /// Starts a transaction; opens a group named `label` if history is
    /// enabled.
    pub fn new(
        doc: &'a mut Document,
        history: &'a mut UndoManager,
        label: &str,
    ) -> Result<Self> {
        let enabled = history.is_enabled();
        if enabled {
            history.open(label).context("Failed to open undo group")?;
        }
        Ok(Self {
            doc,
            history,
            enabled,
            committed: false,
        })
    }

    pub fn document(&self) -> &Document {
        &*self.doc
    }

    pub fn history(&self) -> &UndoManager {
        &*self.history
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Keeps everything recorded so far as one undoable step.
    pub fn commit(mut self) -> Result<()> {
        self.committed = true;
        if self.enabled {
            self.history.close().context("Failed to close undo group")?;
        }
        Ok(())
    }

    fn record(
        &mut self,
        f: impl FnOnce(&mut UndoManager, &Document) -> Result<()>,
    ) -> Result<()> {
        if self.enabled {
            f(&mut *self.history, &*self.doc)?;
        }
        Ok(())
    }

    // -- Sprite --

    pub fn set_total_frames(&mut self, frames: u32) -> Result<()> {
        let frames = frames.max(1);
        let total = self.doc.sprite().total_frames();
        if frames < total {
            for frame in frames..total {
                self.record(|h, d| h.record_set_frame_duration(d, frame))?;
            }
        }
        if self.doc.sprite().current_frame >= frames {
            self.set_current_frame(frames - 1)?;
        }
        self.record(|h, d| h.record_set_total_frames(d))?;
        self.doc.sprite_mut().set_total_frames(frames);
        Ok(())
    }

    pub fn set_current_frame(&mut self, frame: u32) -> Result<()> {
        if frame >= self.doc.sprite().total_frames() {
            anyhow::bail!("frame {frame} out of range");
        }
        self.record(|h, d| h.record_set_current_frame(d))?;
        self.doc.sprite_mut().current_frame = frame;
        Ok(())
    }

    pub fn set_current_layer(&mut self, layer: Option<ObjectId>) -> Result<()> {
        if let Some(layer) = layer {
            self.doc.layer(layer)?;
        }
        self.record(|h, d| h.record_set_current_layer(d))?;
        self.doc.sprite_mut().current_layer = layer;
        Ok(())
    }

    pub fn set_sprite_size(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            anyhow::bail!("sprite size must be positive, got {width}x{height}");
        }
        self.record(|h, d| h.record_set_sprite_size(d))?;
        let sprite = self.doc.sprite_mut();
        sprite.width = width;
        sprite.height = height;
        Ok(())
    }

    /// Resizes the canvas to the given rectangle, moving every cel and the
    /// mask so the rectangle's corner becomes the origin. The background
    /// layer is cropped to the new canvas, padded with `bgcolor`.
    pub fn crop_sprite(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        bgcolor: u32,
    ) -> Result<()> {
        self.set_sprite_size(width, height)?;
        let root = self.doc.root();
        self.displace_layers(root, -x, -y)?;
        if let Some(background) = self.doc.background_layer()? {
            self.crop_layer(background, 0, 0, width, height, bgcolor)?;
        }
        let mask = self.doc.mask()?;
        if !mask.is_empty() {
            let (mx, my) = (mask.x, mask.y);
            self.set_mask_position(mx - x, my - y)?;
        }
        Ok(())
    }

    /// Crops the canvas to the pixels drawn in any frame; see
    /// [`Document::content_bounds`]. Nothing happens when no cel has
    /// content.
    pub fn autocrop_sprite(&mut self, bgcolor: u32) -> Result<()> {
        let Some((x1, y1, x2, y2)) = self.doc.content_bounds()? else {
            return Ok(());
        };
        let (width, height) = ((x2 - x1 + 1) as u32, (y2 - y1 + 1) as u32);
        self.crop_sprite(x1, y1, width, height, bgcolor)
    }

    /// Converts every stock image and the sprite to `format`.
    ///
    /// Converting to grayscale also swaps all palettes for a single gray
    /// ramp.
    pub fn set_image_type(&mut self, format: PixelFormat) -> Result<()> {
        if self.doc.sprite().format == format {
            return Ok(());
        }
        let frame = self.doc.sprite().current_frame;
        let palette = match self.doc.palette_at(frame) {
            Some(id) => self.doc.palette(id)?.clone(),
            None => Palette::grayscale(0),
        };

        let images: Vec<(usize, ObjectId)> = self.doc.stock()?.iter().collect();
        for (index, id) in images {
            let converted = self.doc.image(id)?.converted(format, &palette);
            self.replace_stock_image(index, converted)?;
        }

        let stock = self.doc.sprite().stock;
        self.record(|h, d| h.record_field(d, stock, Field::StockFormat))?;
        self.doc.stock_mut()?.format = format;

        self.record(|h, d| h.record_set_image_type(d))?;
        self.doc.sprite_mut().format = format;

        if format == PixelFormat::Grayscale {
            let palettes: Vec<ObjectId> = self.doc.palettes().to_vec();
            for id in palettes {
                self.remove_palette(id)?;
            }
            self.add_palette(Palette::grayscale(0))?;
        }
        Ok(())
    }

    // -- Stock --

    pub fn add_image_in_stock(&mut self, image: Image) -> Result<usize> {
        let index = self.doc.add_image(image)?;
        self.record(|h, d| h.record_add_image(d, index))?;
        Ok(index)
    }

    pub fn remove_image_from_stock(&mut self, index: usize) -> Result<()> {
        self.record(|h, d| h.record_remove_image(d, index))?;
        self.doc.remove_image(index)?;
        Ok(())
    }

    pub fn replace_stock_image(&mut self, index: usize, image: Image) -> Result<()> {
        self.record(|h, d| h.record_replace_image(d, index))?;
        self.doc.replace_image(index, image)?;
        Ok(())
    }

    // -- Layers --

    fn add_layer_on_top(&mut self, layer: Layer) -> Result<ObjectId> {
        let root = self.doc.root();
        let top = self.doc.layer(root)?.children().last().copied();
        let id = self.doc.add_layer(root, layer, top)?;
        self.record(|h, d| h.record_add_layer(d, root, id))?;
        Ok(id)
    }

    /// Adds an image layer on top of the sprite and selects it.
    pub fn new_layer(&mut self, name: &str) -> Result<ObjectId> {
        let id = self.add_layer_on_top(Layer::image(name))?;
        self.set_current_layer(Some(id))?;
        Ok(id)
    }

    /// Adds an empty folder on top of the sprite.
    pub fn new_layer_folder(&mut self, name: &str) -> Result<ObjectId> {
        self.add_layer_on_top(Layer::folder(name))
    }

    /// Removes a layer with its subtree. If it was selected, the layer
    /// below it, else above it, else its folder (unless that is the root)
    /// becomes selected.
    pub fn remove_layer(&mut self, layer: ObjectId) -> Result<()> {
        let parent = self
            .doc
            .layer(layer)?
            .parent
            .context("the root folder cannot be removed")?;

        if self.doc.sprite().current_layer == Some(layer) {
            let siblings = self.doc.layer(parent)?;
            let select = siblings
                .previous_child(layer)
                .or_else(|| siblings.next_child(layer))
                .or_else(|| (parent != self.doc.root()).then_some(parent));
            self.set_current_layer(select)?;
        }

        self.record(|h, d| h.record_remove_layer(d, layer))?;
        self.doc.destroy_layer(layer)?;
        Ok(())
    }

    /// Moves a layer inside its folder right above `after` (to the bottom
    /// when `None`).
    pub fn move_layer_after(
        &mut self,
        layer: ObjectId,
        after: Option<ObjectId>,
    ) -> Result<()> {
        self.record(|h, d| h.record_move_layer(d, layer))?;
        self.doc.move_layer(layer, after)
    }

    pub fn rename_layer(&mut self, layer: ObjectId, name: &str) -> Result<()> {
        self.record(|h, d| h.record_set_layer_name(d, layer))?;
        self.doc.layer_mut(layer)?.name = name.to_string();
        Ok(())
    }

    pub fn set_layer_flags(&mut self, layer: ObjectId, flags: u8) -> Result<()> {
        self.record(|h, d| h.record_field(d, layer, Field::LayerFlags))?;
        self.doc.layer_mut(layer)?.flags = flags;
        Ok(())
    }

    pub fn set_layer_blend_mode(&mut self, layer: ObjectId, mode: u8) -> Result<()> {
        self.record(|h, d| h.record_field(d, layer, Field::LayerBlendMode))?;
        self.doc.layer_mut(layer)?.blend_mode = mode;
        Ok(())
    }

    /// Crops every cel of an image layer to the given canvas rectangle.
    /// Only the background layer pads with `bgcolor`; other layers pad with
    /// transparent pixels. Folders are left alone.
    pub fn crop_layer(
        &mut self,
        layer: ObjectId,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        bgcolor: u32,
    ) -> Result<()> {
        let node = self.doc.layer(layer)?;
        if !node.is_image() {
            return Ok(());
        }
        let fill = if node.is_background() { bgcolor } else { 0 };
        let cels = node.cels().to_vec();
        for cel in cels {
            self.crop_cel(cel, x, y, width, height, fill)?;
        }
        Ok(())
    }

    /// Turns the selected background layer into a regular movable layer
    /// named "Layer 0".
    pub fn layer_from_background(&mut self) -> Result<()> {
        let layer = self
            .doc
            .sprite()
            .current_layer
            .context("no layer is selected")?;
        let node = self.doc.layer(layer)?;
        if !node.is_image() || !node.is_background() {
            anyhow::bail!("layer {layer} is not the background layer");
        }
        if !node.is_readable() || !node.is_writable() {
            anyhow::bail!("layer {layer} is locked");
        }
        let flags = node.flags & !(LAYER_BACKGROUND | LAYER_LOCKMOVE);
        self.set_layer_flags(layer, flags)?;
        self.rename_layer(layer, "Layer 0")
    }

    /// Flags a top-level image layer as the locked background, renames it
    /// "Background" and moves it to the bottom of the stack.
    pub fn configure_layer_as_background(&mut self, layer: ObjectId) -> Result<()> {
        let node = self.doc.layer(layer)?;
        if !node.is_image() {
            anyhow::bail!("layer {layer} is not an image layer");
        }
        if node.parent != Some(self.doc.root()) {
            anyhow::bail!("layer {layer} is inside a folder");
        }
        let flags = node.flags | LAYER_BACKGROUND | LAYER_LOCKMOVE;
        self.set_layer_flags(layer, flags)?;
        self.rename_layer(layer, "Background")?;
        self.move_layer_after(layer, None)
    }

    /// Shifts every cel below `layer` by (`dx`, `dy`).
    pub fn displace_layers(&mut self, layer: ObjectId, dx: i32, dy: i32) -> Result<()> {
        let node = self.doc.layer(layer)?;
        if node.is_image() {
            let cels = node.cels().to_vec();
            for cel in cels {
                let (x, y) = {
                    let c = self.doc.get::<Cel>(cel)?;
                    (c.x, c.y)
                };
                self.set_cel_position(cel, x + dx, y + dy)?;
            }
        } else {
            let children = node.children().to_vec();
            for child in children {
                self.displace_layers(child, dx, dy)?;
            }
        }
        Ok(())
    }

    // -- Frames --

    /// Inserts a frame after the current one, copying the current cels, and
    /// moves to it.
    pub fn new_frame(&mut self) -> Result<()> {
        let frame = self.doc.sprite().current_frame + 1;
        let total = self.doc.sprite().total_frames();
        self.set_total_frames(total + 1)?;

        // Durations after the insertion point move one frame forward.
        for f in (frame..=total).rev() {
            let duration = self.doc.sprite().frame_duration(f - 1);
            self.set_frame_duration(f, duration)?;
        }

        let root = self.doc.root();
        self.new_frame_for_layer(root, frame)?;
        self.set_current_frame(frame)
    }

    fn new_frame_for_layer(&mut self, layer: ObjectId, frame: u32) -> Result<()> {
        let node = self.doc.layer(layer)?;
        if node.is_image() {
            let mut cels = node.cels().to_vec();
            cels.reverse();
            for cel in cels {
                let cel_frame = self.doc.get::<Cel>(cel)?.frame;
                if cel_frame >= frame {
                    self.set_cel_frame(cel, cel_frame + 1)?;
                }
            }
            self.copy_previous_frame(layer, frame)
        } else {
            let children = node.children().to_vec();
            for child in children {
                self.new_frame_for_layer(child, frame)?;
            }
            Ok(())
        }
    }

    /// Removes `frame` with its cels, moving later frames one step back.
    pub fn remove_frame(&mut self, frame: u32) -> Result<()> {
        let total = self.doc.sprite().total_frames();
        if total <= 1 {
            anyhow::bail!("cannot remove the only frame");
        }
        if frame >= total {
            anyhow::bail!("frame {frame} out of range (sprite has {total} frames)");
        }

        let root = self.doc.root();
        self.remove_frame_of_layer(root, frame)?;

        for f in frame..total - 1 {
            let duration = self.doc.sprite().frame_duration(f + 1);
            self.set_frame_duration(f, duration)?;
        }

        let new_total = total - 1;
        if self.doc.sprite().current_frame >= new_total {
            self.set_current_frame(new_total - 1)?;
        }
        self.set_total_frames(new_total)
    }

    fn remove_frame_of_layer(&mut self, layer: ObjectId, frame: u32) -> Result<()> {
        let node = self.doc.layer(layer)?;
        if node.is_image() {
            if let Some(cel) = self.doc.cel_at(layer, frame) {
                self.remove_cel(layer, cel)?;
            }
            let cels = self.doc.layer(layer)?.cels().to_vec();
            for cel in cels {
                let cel_frame = self.doc.get::<Cel>(cel)?.frame;
                if cel_frame > frame {
                    self.set_cel_frame(cel, cel_frame - 1)?;
                }
            }
        } else {
            let children = node.children().to_vec();
            for child in children {
                self.remove_frame_of_layer(child, frame)?;
            }
        }
        Ok(())
    }

    /// Gives `layer` a copy of its previous frame's cel on `frame`. Nothing
    /// happens when the previous frame has no cel.
    pub fn copy_previous_frame(&mut self, layer: ObjectId, frame: u32) -> Result<()> {
        let Some(previous) = frame.checked_sub(1) else {
            return Ok(());
        };
        let Some(src_cel) = self.doc.cel_at(layer, previous) else {
            return Ok(());
        };
        let src = self.doc.get::<Cel>(src_cel)?.clone();
        let Some(src_image) = self.doc.stock()?.get(src.image) else {
            return Ok(());
        };
        let copy = self.doc.image(src_image)?.clone();
        let index = self.add_image_in_stock(copy)?;

        let mut cel = Cel::new(frame, index).with_position(src.x, src.y);
        cel.opacity = src.opacity;
        self.add_cel(layer, cel)?;
        Ok(())
    }

    /// Moves `frame` so it lands right before `before_frame`, carrying its
    /// duration and cels along.
    pub fn move_frame_before(&mut self, frame: u32, before_frame: u32) -> Result<()> {
        let total = self.doc.sprite().total_frames();
        if frame == before_frame || frame >= total || before_frame >= total {
            return Ok(());
        }

        let moved = self.doc.sprite().frame_duration(frame);
        if frame < before_frame {
            for c in frame..before_frame - 1 {
                let duration = self.doc.sprite().frame_duration(c + 1);
                self.set_frame_duration(c, duration)?;
            }
            self.set_frame_duration(before_frame - 1, moved)?;
        } else {
            for c in (before_frame + 1..=frame).rev() {
                let duration = self.doc.sprite().frame_duration(c - 1);
                self.set_frame_duration(c, duration)?;
            }
            self.set_frame_duration(before_frame, moved)?;
        }

        let root = self.doc.root();
        self.move_frame_before_layer(root, frame, before_frame)
    }

    fn move_frame_before_layer(
        &mut self,
        layer: ObjectId,
        frame: u32,
        before_frame: u32,
    ) -> Result<()> {
        let node = self.doc.layer(layer)?;
        if node.is_image() {
            let cels = node.cels().to_vec();
            for cel in cels {
                let current = self.doc.get::<Cel>(cel)?.frame;
                let mut new_frame = current;
                if frame < before_frame {
                    if current == frame {
                        new_frame = before_frame - 1;
                    } else if current > frame && current < before_frame {
                        new_frame -= 1;
                    }
                } else if before_frame < frame {
                    if current == frame {
                        new_frame = before_frame;
                    } else if current >= before_frame && current < frame {
                        new_frame += 1;
                    }
                }
                if new_frame != current {
                    self.set_cel_frame(cel, new_frame)?;
                }
            }
        } else {
            let children = node.children().to_vec();
            for child in children {
                self.move_frame_before_layer(child, frame, before_frame)?;
            }
        }
        Ok(())
    }

    pub fn set_frame_duration(&mut self, frame: u32, duration: u32) -> Result<()> {
        self.record(|h, d| h.record_set_frame_duration(d, frame))?;
        self.doc.sprite_mut().set_frame_duration(frame, duration);
        Ok(())
    }

    /// Gives every frame the same duration.
    pub fn set_constant_frame_rate(&mut self, duration: u32) -> Result<()> {
        for frame in 0..self.doc.sprite().total_frames() {
            self.set_frame_duration(frame, duration)?;
        }
        Ok(())
    }

    // -- Cels --

    pub fn add_cel(&mut self, layer: ObjectId, cel: Cel) -> Result<ObjectId> {
        let id = self.doc.add_cel(layer, cel)?;
        self.record(|h, d| h.record_add_cel(d, layer, id))?;
        Ok(id)
    }

    /// Removes a cel, and its stock image when no other cel draws it.
    pub fn remove_cel(&mut self, layer: ObjectId, cel: ObjectId) -> Result<()> {
        let index = self.doc.get::<Cel>(cel)?.image;
        if self.doc.image_use_count(index)? <= 1 && self.doc.stock()?.get(index).is_some() {
            self.remove_image_from_stock(index)?;
        }
        self.record(|h, d| h.record_remove_cel(d, layer, cel))?;
        self.doc.remove_cel(layer, cel)?;
        Ok(())
    }

    pub fn set_cel_frame(&mut self, cel: ObjectId, frame: u32) -> Result<()> {
        self.record(|h, d| h.record_field(d, cel, Field::CelFrame))?;
        self.doc.get_mut::<Cel>(cel)?.frame = frame;
        Ok(())
    }

    pub fn set_cel_position(&mut self, cel: ObjectId, x: i32, y: i32) -> Result<()> {
        self.record(|h, d| h.record_field(d, cel, Field::CelPosition))?;
        let c = self.doc.get_mut::<Cel>(cel)?;
        c.x = x;
        c.y = y;
        Ok(())
    }

    pub fn set_cel_opacity(&mut self, cel: ObjectId, opacity: u8) -> Result<()> {
        self.record(|h, d| h.record_field(d, cel, Field::CelOpacity))?;
        self.doc.get_mut::<Cel>(cel)?.opacity = opacity;
        Ok(())
    }

    /// Replaces the cel's image with the canvas rectangle it should cover
    /// and moves the cel onto that rectangle. Pixels the old image did not
    /// cover become `bgcolor`.
    pub fn crop_cel(
        &mut self,
        cel: ObjectId,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        bgcolor: u32,
    ) -> Result<()> {
        let c = self.doc.get::<Cel>(cel)?.clone();
        let image = self.doc.stock_image(c.image)?;
        let cropped = self
            .doc
            .image(image)?
            .cropped(x - c.x, y - c.y, width, height, bgcolor);
        self.replace_stock_image(c.image, cropped)?;
        self.set_cel_position(cel, x, y)
    }

    // -- Pixels --

    /// Overwrites `rect` of `image` with row-major `pixels`, snapshotting the
    /// whole rectangle first.
    pub fn patch_image(&mut self, image: ObjectId, rect: Rect, pixels: &[u8]) -> Result<()> {
        let expected = self.doc.image(image)?.line_size(rect.width) * rect.height as usize;
        if pixels.len() != expected {
            anyhow::bail!("patch has {} bytes, expected {expected}", pixels.len());
        }
        self.record(|h, d| h.record_image_patch(d, image, rect))?;
        self.doc.image_mut(image)?.write_rect(rect, pixels)
    }

    /// Writes the pixels listed in `dirty`, snapshotting only those.
    pub fn paint_dirty(&mut self, image: ObjectId, dirty: &Dirty) -> Result<()> {
        self.record(|h, d| h.record_dirty(d, image, dirty))?;
        dirty.apply_to(self.doc.image_mut(image)?)
    }

    pub fn flip_image(
        &mut self,
        image: ObjectId,
        rect: Rect,
        orientation: FlipOrientation,
    ) -> Result<()> {
        self.record(|h, d| h.record_flip(d, image, rect, orientation))?;
        self.doc.image_mut(image)?.flip(rect, orientation)
    }

    // -- Mask --

    pub fn set_mask(&mut self, mask: Mask) -> Result<()> {
        self.record(|h, d| h.record_set_mask(d))?;
        *self.doc.mask_mut()? = mask;
        Ok(())
    }

    pub fn copy_to_current_mask(&mut self, mask: &Mask) -> Result<()> {
        self.set_mask(mask.clone())
    }

    pub fn set_mask_position(&mut self, x: i32, y: i32) -> Result<()> {
        let mask = self.doc.sprite().mask;
        self.record(|h, d| h.record_field(d, mask, Field::MaskPosition))?;
        let m = self.doc.mask_mut()?;
        m.x = x;
        m.y = y;
        Ok(())
    }

    pub fn deselect_mask(&mut self) -> Result<()> {
        self.record(|h, d| h.record_set_mask(d))?;
        self.doc.mask_mut()?.deselect();
        Ok(())
    }

    /// Sets the selected pixels of the current cel to `bgcolor`.
    ///
    /// With nothing selected the whole cel goes: a background cel is
    /// filled with `bgcolor`, any other cel is removed with its image.
    pub fn clear_mask(&mut self, bgcolor: u32) -> Result<()> {
        let Some(layer) = self.doc.sprite().current_layer else {
            return Ok(());
        };
        let frame = self.doc.sprite().current_frame;
        let Some(cel) = self.doc.cel_at(layer, frame) else {
            return Ok(());
        };
        let c = self.doc.get::<Cel>(cel)?.clone();
        let Some(image) = self.doc.stock()?.get(c.image) else {
            return Ok(());
        };
        let mask = self.doc.mask()?.clone();

        if mask.is_empty() {
            if !self.doc.layer(layer)?.is_background() {
                return self.remove_cel(layer, cel);
            }
            let mut cleared = self.doc.image(image)?.clone();
            cleared.fill(bgcolor);
            return self.patch_image(image, cleared.bounds(), cleared.pixels());
        }

        let img = self.doc.image(image)?;
        let (ox, oy) = (mask.x - c.x, mask.y - c.y);
        let x1 = ox.max(0);
        let y1 = oy.max(0);
        let x2 = (ox + mask.width() as i32 - 1).min(img.width() as i32 - 1);
        let y2 = (oy + mask.height() as i32 - 1).min(img.height() as i32 - 1);
        if x1 > x2 || y1 > y2 {
            return Ok(());
        }

        let rect = Rect::new(x1 as u32, y1 as u32, (x2 - x1 + 1) as u32, (y2 - y1 + 1) as u32);
        let mut area = img.cropped(x1, y1, rect.width, rect.height, 0);
        for v in 0..rect.height {
            for u in 0..rect.width {
                if mask.contains_point(c.x + x1 + u as i32, c.y + y1 + v as i32) {
                    area.put_pixel(u, v, bgcolor);
                }
            }
        }
        self.patch_image(image, rect, area.pixels())
    }

    // -- Palettes --

    pub fn add_palette(&mut self, palette: Palette) -> Result<ObjectId> {
        let id = self.doc.add_palette(palette);
        self.record(|h, d| h.record_add_palette(d, id))?;
        Ok(id)
    }

    pub fn remove_palette(&mut self, palette: ObjectId) -> Result<()> {
        self.record(|h, d| h.record_remove_palette(d, palette))?;
        self.doc.remove_palette(palette);
        Ok(())
    }

    /// Overwrites consecutive palette entries starting at `from`.
    pub fn set_palette_colors(
        &mut self,
        palette: ObjectId,
        from: usize,
        colors: &[u32],
    ) -> Result<()> {
        if colors.is_empty() {
            return Ok(());
        }
        let to = from + colors.len() - 1;
        self.record(|h, d| h.record_set_palette_colors(d, palette, from, to))?;
        self.doc.palette_mut(palette)?.set_colors(from, colors);
        Ok(())
    }

    /// Reorders palette entries by `mapping` (entry `i` moves to
    /// `mapping[i]`) and remaps the indexed images of frames
    /// `from_frame..=to_frame` so they keep their colors.
    pub fn remap_palette(
        &mut self,
        from_frame: u32,
        to_frame: u32,
        mapping: &[u8],
    ) -> Result<()> {
        if pixpad_core::palette::invert_mapping(mapping).is_none() {
            anyhow::bail!("palette remap table is not a 256-entry permutation");
        }

        let mut targets: Vec<ObjectId> = self.doc.palette_at(from_frame).into_iter().collect();
        for &id in self.doc.palettes() {
            let frame = self.doc.palette(id)?.frame;
            if frame >= from_frame && frame <= to_frame && !targets.contains(&id) {
                targets.push(id);
            }
        }
        for id in targets {
            self.record(|h, d| h.record_set_palette_colors(d, id, 0, 255))?;
            self.doc.palette_mut(id)?.apply_mapping(mapping);
        }

        self.record(|h, d| h.record_remap_palette(d, from_frame, to_frame, mapping))?;
        self.doc.remap_images(from_frame, to_frame, mapping)
    }
}

impl Drop for UndoTransaction<'_> {
    fn drop(&mut self) {
        if !self.enabled || self.committed {
            return;
        }
        if let Err(e) = self.history.close() {
            tracing::warn!("Failed to close rolled back undo group: {e:#}");
        }
        let reverted = self.history.do_undo(&mut *self.doc);
        self.history.clear_redo();
        tracing::debug!("rolled back transaction ({reverted} chunks)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HistoryConfig;

    fn setup() -> (Document, UndoManager) {
        let doc = Document::with_layer(PixelFormat::Rgb, 8, 8, 100).unwrap();
        (doc, UndoManager::new(HistoryConfig::default()))
    }

    fn current_layer(doc: &Document) -> ObjectId {
        doc.sprite().current_layer.unwrap()
    }

    #[test]
    fn test_commit_keeps_one_group() {
        let (mut doc, mut history) = setup();
        {
            let mut tx = UndoTransaction::new(&mut doc, &mut history, "Rename").unwrap();
            let layer = current_layer(tx.document());
            tx.rename_layer(layer, "Ink").unwrap();
            tx.commit().unwrap();
        }
        assert!(history.can_undo());
        assert_eq!(history.next_undo_label(), Some("Rename"));
        assert!(history.undo_stream().is_balanced());

        history.do_undo(&mut doc);
        assert_eq!(doc.layer(current_layer(&doc)).unwrap().name, "Layer 1");
        assert!(!history.can_undo());
    }

    #[test]
    fn test_drop_without_commit_rolls_back() {
        let (mut doc, mut history) = setup();
        let layer = current_layer(&doc);
        {
            let mut tx = UndoTransaction::new(&mut doc, &mut history, "Cels").unwrap();
            tx.set_total_frames(4).unwrap();
            for frame in 1..4 {
                let index = tx.add_image_in_stock(Image::new(PixelFormat::Rgb, 2, 2)).unwrap();
                tx.add_cel(layer, Cel::new(frame, index)).unwrap();
            }
        }
        assert_eq!(doc.layer(layer).unwrap().cels().len(), 1);
        assert_eq!(doc.stock().unwrap().iter().count(), 1);
        assert_eq!(doc.sprite().total_frames(), 1);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_disabled_history_mutates_without_recording() {
        let (mut doc, _) = setup();
        let mut history = UndoManager::new(HistoryConfig {
            enabled: false,
            ..HistoryConfig::default()
        });
        {
            let mut tx = UndoTransaction::new(&mut doc, &mut history, "Frames").unwrap();
            assert!(!tx.is_enabled());
            tx.set_total_frames(3).unwrap();
        }
        assert_eq!(doc.sprite().total_frames(), 3);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_new_frame_copies_cel_and_undoes() {
        let (mut doc, mut history) = setup();
        let layer = current_layer(&doc);
        let first = doc.cel_at(layer, 0).unwrap();
        let image = doc.cel_image(first).unwrap();
        doc.image_mut(image).unwrap().put_pixel(1, 1, 0xff00ff00);

        let mut tx = UndoTransaction::new(&mut doc, &mut history, "New Frame").unwrap();
        tx.new_frame().unwrap();
        tx.commit().unwrap();

        assert_eq!(doc.sprite().total_frames(), 2);
        assert_eq!(doc.sprite().current_frame, 1);
        let copy = doc.cel_at(layer, 1).unwrap();
        let copy_image = doc.cel_image(copy).unwrap();
        assert_ne!(copy_image, image);
        assert_eq!(doc.image(copy_image).unwrap().get_pixel(1, 1), Some(0xff00ff00));

        history.do_undo(&mut doc);
        assert_eq!(doc.sprite().total_frames(), 1);
        assert_eq!(doc.sprite().current_frame, 0);
        assert!(doc.cel_at(layer, 1).is_none());
        assert_eq!(doc.stock().unwrap().iter().count(), 1);

        history.do_redo(&mut doc);
        assert_eq!(doc.sprite().total_frames(), 2);
        assert!(doc.cel_at(layer, 1).is_some());
    }

    #[test]
    fn test_remove_frame_shifts_cels_and_durations() {
        let (mut doc, mut history) = setup();
        let layer = current_layer(&doc);
        {
            let mut tx = UndoTransaction::new(&mut doc, &mut history, "Setup").unwrap();
            tx.new_frame().unwrap();
            tx.new_frame().unwrap();
            tx.set_frame_duration(2, 300).unwrap();
            tx.commit().unwrap();
        }
        let last = doc.cel_at(layer, 2).unwrap();

        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Remove Frame").unwrap();
        tx.remove_frame(1).unwrap();
        tx.commit().unwrap();

        assert_eq!(doc.sprite().total_frames(), 2);
        assert_eq!(doc.sprite().durations(), &[100, 300]);
        assert_eq!(doc.cel_at(layer, 1), Some(last));
        assert_eq!(doc.sprite().current_frame, 1);

        history.do_undo(&mut doc);
        assert_eq!(doc.sprite().total_frames(), 3);
        assert_eq!(doc.sprite().durations(), &[100, 100, 300]);
        assert_eq!(doc.cel_at(layer, 2), Some(last));
        assert!(doc.cel_at(layer, 1).is_some());
    }

    #[test]
    fn test_remove_only_frame_fails() {
        let (mut doc, mut history) = setup();
        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Remove Frame").unwrap();
        assert!(tx.remove_frame(0).is_err());
    }

    #[test]
    fn test_move_frame_before() {
        let (mut doc, mut history) = setup();
        let layer = current_layer(&doc);
        {
            let mut tx = UndoTransaction::new(&mut doc, &mut history, "Setup").unwrap();
            tx.new_frame().unwrap();
            tx.new_frame().unwrap();
            tx.set_frame_duration(0, 10).unwrap();
            tx.set_frame_duration(1, 20).unwrap();
            tx.set_frame_duration(2, 30).unwrap();
            tx.commit().unwrap();
        }
        let cels: Vec<ObjectId> = (0..3).map(|f| doc.cel_at(layer, f).unwrap()).collect();

        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Move Frame").unwrap();
        tx.move_frame_before(2, 0).unwrap();
        tx.commit().unwrap();

        assert_eq!(doc.sprite().durations(), &[30, 10, 20]);
        assert_eq!(doc.get::<Cel>(cels[2]).unwrap().frame, 0);
        assert_eq!(doc.get::<Cel>(cels[0]).unwrap().frame, 1);
        assert_eq!(doc.get::<Cel>(cels[1]).unwrap().frame, 2);

        history.do_undo(&mut doc);
        assert_eq!(doc.sprite().durations(), &[10, 20, 30]);
        for (frame, cel) in cels.iter().enumerate() {
            assert_eq!(doc.get::<Cel>(*cel).unwrap().frame, frame as u32);
        }
    }

    #[test]
    fn test_remove_current_layer_selects_neighbor() {
        let (mut doc, mut history) = setup();
        let bottom = current_layer(&doc);
        let top = {
            let mut tx = UndoTransaction::new(&mut doc, &mut history, "New Layer").unwrap();
            let id = tx.new_layer("Layer 2").unwrap();
            tx.commit().unwrap();
            id
        };
        assert_eq!(doc.sprite().current_layer, Some(top));

        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Remove Layer").unwrap();
        tx.remove_layer(top).unwrap();
        tx.commit().unwrap();
        assert_eq!(doc.sprite().current_layer, Some(bottom));
        assert!(doc.layer(top).is_err());

        history.do_undo(&mut doc);
        assert_eq!(doc.sprite().current_layer, Some(top));
        assert_eq!(doc.layer(doc.root()).unwrap().children(), &[bottom, top]);
    }

    #[test]
    fn test_remove_root_fails() {
        let (mut doc, mut history) = setup();
        let root = doc.root();
        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Remove Layer").unwrap();
        assert!(tx.remove_layer(root).is_err());
    }

    #[test]
    fn test_remove_cel_drops_unshared_image() {
        let (mut doc, mut history) = setup();
        let layer = current_layer(&doc);
        let cel = doc.cel_at(layer, 0).unwrap();

        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Clear Cel").unwrap();
        tx.remove_cel(layer, cel).unwrap();
        tx.commit().unwrap();
        assert!(doc.cel_at(layer, 0).is_none());
        assert_eq!(doc.stock().unwrap().iter().count(), 0);

        history.do_undo(&mut doc);
        assert_eq!(doc.cel_at(layer, 0), Some(cel));
        assert!(doc.cel_image(cel).is_ok());
    }

    #[test]
    fn test_crop_sprite_moves_cels() {
        let (mut doc, mut history) = setup();
        let layer = current_layer(&doc);
        let cel = doc.cel_at(layer, 0).unwrap();

        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Crop").unwrap();
        tx.crop_sprite(2, 3, 4, 4, 0).unwrap();
        tx.commit().unwrap();
        assert_eq!((doc.sprite().width, doc.sprite().height), (4, 4));
        let c = doc.get::<Cel>(cel).unwrap();
        assert_eq!((c.x, c.y), (-2, -3));

        history.do_undo(&mut doc);
        assert_eq!((doc.sprite().width, doc.sprite().height), (8, 8));
        let c = doc.get::<Cel>(cel).unwrap();
        assert_eq!((c.x, c.y), (0, 0));
    }

    #[test]
    fn test_set_image_type_grayscale_round_trip() {
        let (mut doc, mut history) = setup();
        let layer = current_layer(&doc);
        let image = doc.cel_image(doc.cel_at(layer, 0).unwrap()).unwrap();
        doc.image_mut(image).unwrap().put_pixel(0, 0, pixpad_core::rgba(200, 100, 50, 255));
        let palettes_before = doc.palettes().to_vec();

        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Color Mode").unwrap();
        tx.set_image_type(PixelFormat::Grayscale).unwrap();
        tx.commit().unwrap();
        assert_eq!(doc.sprite().format, PixelFormat::Grayscale);
        assert_eq!(doc.stock().unwrap().format, PixelFormat::Grayscale);
        let converted = doc.stock_image(0).unwrap();
        assert_eq!(doc.image(converted).unwrap().format(), PixelFormat::Grayscale);

        history.do_undo(&mut doc);
        assert_eq!(doc.sprite().format, PixelFormat::Rgb);
        assert_eq!(doc.palettes(), palettes_before.as_slice());
        let restored = doc.stock_image(0).unwrap();
        assert_eq!(restored, image);
        assert_eq!(
            doc.image(restored).unwrap().get_pixel(0, 0),
            Some(pixpad_core::rgba(200, 100, 50, 255))
        );
    }

    #[test]
    fn test_set_image_type_same_format_records_nothing() {
        let (mut doc, mut history) = setup();
        let before = history.undo_stream().len();
        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Color Mode").unwrap();
        tx.set_image_type(PixelFormat::Rgb).unwrap();
        tx.commit().unwrap();
        // Only the open/close pair.
        assert_eq!(history.undo_stream().len(), before + 2);
    }

    #[test]
    fn test_set_palette_colors_undo() {
        let (mut doc, mut history) = setup();
        let palette = doc.palettes()[0];
        let old = doc.palette(palette).unwrap().color(5);

        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Palette").unwrap();
        tx.set_palette_colors(palette, 5, &[0xff0000ff, 0xff00ff00]).unwrap();
        tx.commit().unwrap();
        assert_eq!(doc.palette(palette).unwrap().color(6), Some(0xff00ff00));

        history.do_undo(&mut doc);
        assert_eq!(doc.palette(palette).unwrap().color(5), old);
    }

    #[test]
    fn test_remap_palette_rejects_bad_table() {
        let (mut doc, mut history) = setup();
        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Remap").unwrap();
        assert!(tx.remap_palette(0, 0, &[0u8; 256]).is_err());
    }

    #[test]
    fn test_remap_palette_keeps_image_colors() {
        let mut doc = Document::with_layer(PixelFormat::Indexed, 2, 1, 100).unwrap();
        let mut history = UndoManager::new(HistoryConfig::default());
        let layer = current_layer(&doc);
        let image = doc.cel_image(doc.cel_at(layer, 0).unwrap()).unwrap();
        doc.image_mut(image).unwrap().put_pixel(0, 0, 1);
        let palette = doc.palettes()[0];
        let color = doc.palette(palette).unwrap().color(1);

        let mut mapping: Vec<u8> = (0..=255).collect();
        mapping.swap(1, 2);
        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Remap").unwrap();
        tx.remap_palette(0, 0, &mapping).unwrap();
        tx.commit().unwrap();

        assert_eq!(doc.image(image).unwrap().get_pixel(0, 0), Some(2));
        assert_eq!(doc.palette(palette).unwrap().color(2), color);

        history.do_undo(&mut doc);
        assert_eq!(doc.image(image).unwrap().get_pixel(0, 0), Some(1));
        assert_eq!(doc.palette(palette).unwrap().color(1), color);
    }

    #[test]
    fn test_deselect_mask_undo() {
        let (mut doc, mut history) = setup();
        {
            let mut tx = UndoTransaction::new(&mut doc, &mut history, "Select").unwrap();
            tx.set_mask(Mask::rect(1, 1, 3, 3)).unwrap();
            tx.commit().unwrap();
        }
        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Deselect").unwrap();
        tx.deselect_mask().unwrap();
        tx.commit().unwrap();
        assert!(doc.mask().unwrap().is_empty());

        history.do_undo(&mut doc);
        let mask = doc.mask().unwrap();
        assert_eq!((mask.x, mask.y, mask.width(), mask.height()), (1, 1, 3, 3));
    }

    #[test]
    fn test_remove_layer_keeps_image_shared_with_other_layer() {
        let (mut doc, mut history) = setup();
        let bottom = current_layer(&doc);
        let kept = doc.cel_at(bottom, 0).unwrap();
        let top = {
            let mut tx = UndoTransaction::new(&mut doc, &mut history, "Link Cel").unwrap();
            let id = tx.new_layer("Layer 2").unwrap();
            tx.add_cel(id, Cel::new(0, 0)).unwrap();
            tx.commit().unwrap();
            id
        };
        let linked = doc.cel_at(top, 0).unwrap();

        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Remove Layer").unwrap();
        tx.remove_layer(top).unwrap();
        tx.commit().unwrap();
        assert!(doc.cel_image(kept).is_ok());
        assert_eq!(doc.stock().unwrap().iter().count(), 1);

        history.do_undo(&mut doc);
        assert_eq!(doc.cel_at(top, 0), Some(linked));
        assert_eq!(doc.cel_image(linked).unwrap(), doc.cel_image(kept).unwrap());
        assert_eq!(doc.stock().unwrap().iter().count(), 1);

        history.do_redo(&mut doc);
        assert!(doc.layer(top).is_err());
        assert!(doc.cel_image(kept).is_ok());
    }

    #[test]
    fn test_set_layer_flags_round_trip() {
        let (mut doc, mut history) = setup();
        let layer = current_layer(&doc);
        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Lock").unwrap();
        tx.set_layer_flags(layer, pixpad_core::layer::LAYER_READABLE).unwrap();
        tx.commit().unwrap();
        assert!(!doc.layer(layer).unwrap().is_writable());

        history.do_undo(&mut doc);
        assert!(doc.layer(layer).unwrap().is_writable());
        history.do_redo(&mut doc);
        assert!(!doc.layer(layer).unwrap().is_writable());
    }

    #[test]
    fn test_set_layer_blend_mode_round_trip() {
        let (mut doc, mut history) = setup();
        let layer = current_layer(&doc);
        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Blend Mode").unwrap();
        tx.set_layer_blend_mode(layer, 4).unwrap();
        tx.commit().unwrap();
        assert_eq!(doc.layer(layer).unwrap().blend_mode, 4);

        history.do_undo(&mut doc);
        assert_eq!(doc.layer(layer).unwrap().blend_mode, 0);
        history.do_redo(&mut doc);
        assert_eq!(doc.layer(layer).unwrap().blend_mode, 4);
    }

    #[test]
    fn test_move_layer_after_at_root() {
        let (mut doc, mut history) = setup();
        let bottom = current_layer(&doc);
        let top = {
            let mut tx = UndoTransaction::new(&mut doc, &mut history, "New Layer").unwrap();
            let id = tx.new_layer("Layer 2").unwrap();
            tx.commit().unwrap();
            id
        };
        let root = doc.root();

        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Move Layer").unwrap();
        tx.move_layer_after(bottom, Some(top)).unwrap();
        tx.commit().unwrap();
        assert_eq!(doc.layer(root).unwrap().children(), &[top, bottom]);

        history.do_undo(&mut doc);
        assert_eq!(doc.layer(root).unwrap().children(), &[bottom, top]);
        history.do_redo(&mut doc);
        assert_eq!(doc.layer(root).unwrap().children(), &[top, bottom]);
    }

    #[test]
    fn test_set_cel_opacity_round_trip() {
        let (mut doc, mut history) = setup();
        let cel = doc.cel_at(current_layer(&doc), 0).unwrap();
        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Opacity").unwrap();
        tx.set_cel_opacity(cel, 64).unwrap();
        tx.commit().unwrap();
        assert_eq!(doc.get::<Cel>(cel).unwrap().opacity, 64);

        history.do_undo(&mut doc);
        assert_eq!(doc.get::<Cel>(cel).unwrap().opacity, 255);
        history.do_redo(&mut doc);
        assert_eq!(doc.get::<Cel>(cel).unwrap().opacity, 64);
    }

    #[test]
    fn test_set_cel_position_round_trip() {
        let (mut doc, mut history) = setup();
        let cel = doc.cel_at(current_layer(&doc), 0).unwrap();
        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Move Cel").unwrap();
        tx.set_cel_position(cel, -3, 5).unwrap();
        tx.commit().unwrap();

        history.do_undo(&mut doc);
        let c = doc.get::<Cel>(cel).unwrap();
        assert_eq!((c.x, c.y), (0, 0));
        history.do_redo(&mut doc);
        let c = doc.get::<Cel>(cel).unwrap();
        assert_eq!((c.x, c.y), (-3, 5));
    }

    #[test]
    fn test_set_mask_position_round_trip() {
        let (mut doc, mut history) = setup();
        {
            let mut tx = UndoTransaction::new(&mut doc, &mut history, "Select").unwrap();
            tx.set_mask(Mask::rect(1, 1, 2, 2)).unwrap();
            tx.commit().unwrap();
        }
        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Move Mask").unwrap();
        tx.set_mask_position(4, 6).unwrap();
        tx.commit().unwrap();
        let mask = doc.mask().unwrap();
        assert_eq!((mask.x, mask.y, mask.width()), (4, 6, 2));

        history.do_undo(&mut doc);
        let mask = doc.mask().unwrap();
        assert_eq!((mask.x, mask.y, mask.width()), (1, 1, 2));
        history.do_redo(&mut doc);
        assert_eq!(doc.mask().unwrap().x, 4);
    }

    #[test]
    fn test_add_palette_round_trip() {
        let (mut doc, mut history) = setup();
        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Add Palette").unwrap();
        let added = tx.add_palette(Palette::grayscale(3)).unwrap();
        tx.commit().unwrap();
        assert_eq!(doc.palettes().len(), 2);
        assert_eq!(doc.palette_at(3), Some(added));

        history.do_undo(&mut doc);
        assert_eq!(doc.palettes().len(), 1);
        assert!(doc.palette(added).is_err());

        history.do_redo(&mut doc);
        assert_eq!(doc.palettes().len(), 2);
        assert_eq!(doc.palette(added).unwrap().frame, 3);
    }

    #[test]
    fn test_remove_palette_round_trip() {
        let (mut doc, mut history) = setup();
        let palette = doc.palettes()[0];
        let colors = doc.palette(palette).unwrap().clone();

        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Remove Palette").unwrap();
        tx.remove_palette(palette).unwrap();
        tx.commit().unwrap();
        assert!(doc.palettes().is_empty());

        history.do_undo(&mut doc);
        assert_eq!(doc.palettes(), &[palette]);
        assert_eq!(doc.palette(palette).unwrap(), &colors);

        history.do_redo(&mut doc);
        assert!(doc.palettes().is_empty());
    }

    #[test]
    fn test_replace_stock_image_round_trip() {
        let (mut doc, mut history) = setup();
        let old = doc.stock_image(0).unwrap();
        doc.image_mut(old).unwrap().put_pixel(2, 2, 0xff0000ff);

        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Replace").unwrap();
        tx.replace_stock_image(0, Image::new(PixelFormat::Rgb, 3, 3)).unwrap();
        tx.commit().unwrap();
        let new = doc.stock_image(0).unwrap();
        assert_ne!(new, old);
        assert_eq!(doc.image(new).unwrap().width(), 3);

        history.do_undo(&mut doc);
        assert_eq!(doc.stock_image(0).unwrap(), old);
        assert_eq!(doc.image(old).unwrap().get_pixel(2, 2), Some(0xff0000ff));

        history.do_redo(&mut doc);
        let again = doc.stock_image(0).unwrap();
        assert_eq!(doc.image(again).unwrap().width(), 3);
    }

    #[test]
    fn test_crop_cel_round_trip() {
        let (mut doc, mut history) = setup();
        let cel = doc.cel_at(current_layer(&doc), 0).unwrap();
        let image = doc.cel_image(cel).unwrap();
        doc.image_mut(image).unwrap().put_pixel(3, 3, 0xff00ff00);

        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Crop Cel").unwrap();
        tx.crop_cel(cel, 2, 2, 4, 4, 0).unwrap();
        tx.commit().unwrap();
        let cropped = doc.image(doc.cel_image(cel).unwrap()).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (4, 4));
        assert_eq!(cropped.get_pixel(1, 1), Some(0xff00ff00));
        let c = doc.get::<Cel>(cel).unwrap();
        assert_eq!((c.x, c.y), (2, 2));

        history.do_undo(&mut doc);
        assert_eq!(doc.cel_image(cel).unwrap(), image);
        assert_eq!(doc.image(image).unwrap().width(), 8);
        assert_eq!(doc.image(image).unwrap().get_pixel(3, 3), Some(0xff00ff00));
        let c = doc.get::<Cel>(cel).unwrap();
        assert_eq!((c.x, c.y), (0, 0));

        history.do_redo(&mut doc);
        let c = doc.get::<Cel>(cel).unwrap();
        assert_eq!((c.x, c.y), (2, 2));
    }

    #[test]
    fn test_crop_layer_pads_only_background_with_color() {
        let (mut doc, mut history) = setup();
        let layer = current_layer(&doc);
        let cel = doc.cel_at(layer, 0).unwrap();

        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Crop").unwrap();
        tx.crop_layer(layer, -1, -1, 3, 3, 0xffffffff).unwrap();
        let padded = tx.document().cel_image(cel).unwrap();
        assert_eq!(tx.document().image(padded).unwrap().get_pixel(0, 0), Some(0));
        tx.configure_layer_as_background(layer).unwrap();
        tx.crop_layer(layer, -2, -2, 2, 2, 0xffffffff).unwrap();
        tx.commit().unwrap();
        let image = doc.image(doc.cel_image(cel).unwrap()).unwrap();
        assert_eq!(image.get_pixel(0, 0), Some(0xffffffff));

        history.do_undo(&mut doc);
        let image = doc.image(doc.cel_image(cel).unwrap()).unwrap();
        assert_eq!((image.width(), image.height()), (8, 8));
        let c = doc.get::<Cel>(cel).unwrap();
        assert_eq!((c.x, c.y), (0, 0));
    }

    #[test]
    fn test_crop_sprite_crops_background_layer() {
        let (mut doc, mut history) = setup();
        let layer = current_layer(&doc);
        let cel = doc.cel_at(layer, 0).unwrap();
        {
            let mut tx = UndoTransaction::new(&mut doc, &mut history, "Background").unwrap();
            tx.configure_layer_as_background(layer).unwrap();
            tx.commit().unwrap();
        }

        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Canvas Size").unwrap();
        tx.crop_sprite(-1, -1, 10, 10, 0xffffffff).unwrap();
        tx.commit().unwrap();
        let image = doc.image(doc.cel_image(cel).unwrap()).unwrap();
        assert_eq!((image.width(), image.height()), (10, 10));
        assert_eq!(image.get_pixel(0, 0), Some(0xffffffff));
        assert_eq!(image.get_pixel(1, 1), Some(0));
        let c = doc.get::<Cel>(cel).unwrap();
        assert_eq!((c.x, c.y), (0, 0));

        history.do_undo(&mut doc);
        let image = doc.image(doc.cel_image(cel).unwrap()).unwrap();
        assert_eq!((image.width(), image.height()), (8, 8));
        assert_eq!((doc.sprite().width, doc.sprite().height), (8, 8));
    }

    #[test]
    fn test_autocrop_sprite_round_trip() {
        let (mut doc, mut history) = setup();
        let cel = doc.cel_at(current_layer(&doc), 0).unwrap();
        let image = doc.cel_image(cel).unwrap();
        doc.image_mut(image).unwrap().put_pixel(2, 3, 0xff0000ff);
        doc.image_mut(image).unwrap().put_pixel(5, 4, 0xff0000ff);

        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Autocrop").unwrap();
        tx.autocrop_sprite(0).unwrap();
        tx.commit().unwrap();
        assert_eq!((doc.sprite().width, doc.sprite().height), (4, 2));
        let c = doc.get::<Cel>(cel).unwrap();
        assert_eq!((c.x, c.y), (-2, -3));

        history.do_undo(&mut doc);
        assert_eq!((doc.sprite().width, doc.sprite().height), (8, 8));
        let c = doc.get::<Cel>(cel).unwrap();
        assert_eq!((c.x, c.y), (0, 0));

        history.do_redo(&mut doc);
        assert_eq!((doc.sprite().width, doc.sprite().height), (4, 2));
    }

    #[test]
    fn test_autocrop_blank_sprite_changes_nothing() {
        let (mut doc, mut history) = setup();
        let before = history.undo_stream().len();
        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Autocrop").unwrap();
        tx.autocrop_sprite(0).unwrap();
        tx.commit().unwrap();
        assert_eq!((doc.sprite().width, doc.sprite().height), (8, 8));
        assert_eq!(history.undo_stream().len(), before + 2);
    }

    #[test]
    fn test_configure_layer_as_background_round_trip() {
        let (mut doc, mut history) = setup();
        let bottom = current_layer(&doc);
        let top = {
            let mut tx = UndoTransaction::new(&mut doc, &mut history, "New Layer").unwrap();
            let id = tx.new_layer("Layer 2").unwrap();
            tx.commit().unwrap();
            id
        };
        let root = doc.root();

        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Background").unwrap();
        tx.configure_layer_as_background(top).unwrap();
        tx.commit().unwrap();
        let layer = doc.layer(top).unwrap();
        assert!(layer.is_background());
        assert!(!layer.is_movable());
        assert_eq!(layer.name, "Background");
        assert_eq!(doc.layer(root).unwrap().children(), &[top, bottom]);
        assert_eq!(doc.background_layer().unwrap(), Some(top));

        history.do_undo(&mut doc);
        let layer = doc.layer(top).unwrap();
        assert!(!layer.is_background());
        assert_eq!(layer.name, "Layer 2");
        assert_eq!(doc.layer(root).unwrap().children(), &[bottom, top]);

        history.do_redo(&mut doc);
        assert_eq!(doc.background_layer().unwrap(), Some(top));
    }

    #[test]
    fn test_configure_folder_as_background_fails() {
        let (mut doc, mut history) = setup();
        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Background").unwrap();
        let folder = tx.new_layer_folder("Group").unwrap();
        assert!(tx.configure_layer_as_background(folder).is_err());
    }

    #[test]
    fn test_layer_from_background_round_trip() {
        let (mut doc, mut history) = setup();
        let layer = current_layer(&doc);
        {
            let mut tx = UndoTransaction::new(&mut doc, &mut history, "Background").unwrap();
            assert!(tx.layer_from_background().is_err());
            tx.configure_layer_as_background(layer).unwrap();
            tx.commit().unwrap();
        }

        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Unlock").unwrap();
        tx.layer_from_background().unwrap();
        tx.commit().unwrap();
        let l = doc.layer(layer).unwrap();
        assert!(!l.is_background());
        assert!(l.is_movable());
        assert_eq!(l.name, "Layer 0");

        history.do_undo(&mut doc);
        let l = doc.layer(layer).unwrap();
        assert!(l.is_background());
        assert!(!l.is_movable());
        assert_eq!(l.name, "Background");
    }

    #[test]
    fn test_clear_mask_without_selection_removes_transparent_cel() {
        let (mut doc, mut history) = setup();
        let layer = current_layer(&doc);
        let cel = doc.cel_at(layer, 0).unwrap();

        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Clear").unwrap();
        tx.clear_mask(0xffffffff).unwrap();
        tx.commit().unwrap();
        assert!(doc.cel_at(layer, 0).is_none());

        history.do_undo(&mut doc);
        assert_eq!(doc.cel_at(layer, 0), Some(cel));
        assert!(doc.cel_image(cel).is_ok());
    }

    #[test]
    fn test_clear_mask_without_selection_fills_background() {
        let (mut doc, mut history) = setup();
        let layer = current_layer(&doc);
        let image = doc.cel_image(doc.cel_at(layer, 0).unwrap()).unwrap();
        {
            let mut tx = UndoTransaction::new(&mut doc, &mut history, "Background").unwrap();
            tx.configure_layer_as_background(layer).unwrap();
            tx.commit().unwrap();
        }

        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Clear").unwrap();
        tx.clear_mask(0xffffffff).unwrap();
        tx.commit().unwrap();
        assert_eq!(doc.image(image).unwrap().shrink_bounds(0xffffffff), None);

        history.do_undo(&mut doc);
        assert_eq!(doc.image(image).unwrap().shrink_bounds(0), None);
    }

    #[test]
    fn test_clear_mask_clears_selected_pixels_only() {
        let (mut doc, mut history) = setup();
        let image = doc.cel_image(doc.cel_at(current_layer(&doc), 0).unwrap()).unwrap();
        doc.image_mut(image).unwrap().fill(0xff0000ff);
        {
            let mut tx = UndoTransaction::new(&mut doc, &mut history, "Select").unwrap();
            tx.set_mask(Mask::rect(-1, 6, 3, 4)).unwrap();
            tx.commit().unwrap();
        }

        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Clear").unwrap();
        tx.clear_mask(0).unwrap();
        tx.commit().unwrap();
        let img = doc.image(image).unwrap();
        assert_eq!(img.get_pixel(0, 6), Some(0));
        assert_eq!(img.get_pixel(1, 7), Some(0));
        assert_eq!(img.get_pixel(2, 7), Some(0xff0000ff));
        assert_eq!(img.get_pixel(0, 5), Some(0xff0000ff));

        history.do_undo(&mut doc);
        assert_eq!(doc.image(image).unwrap().shrink_bounds(0xff0000ff), None);
        history.do_redo(&mut doc);
        assert_eq!(doc.image(image).unwrap().get_pixel(1, 6), Some(0));
    }

    #[test]
    fn test_copy_to_current_mask_round_trip() {
        let (mut doc, mut history) = setup();
        let selection = Mask::rect(2, 2, 3, 1);
        let mut tx = UndoTransaction::new(&mut doc, &mut history, "Select").unwrap();
        tx.copy_to_current_mask(&selection).unwrap();
        tx.commit().unwrap();
        assert_eq!(doc.mask().unwrap(), &selection);

        history.do_undo(&mut doc);
        assert!(doc.mask().unwrap().is_empty());
        history.do_redo(&mut doc);
        assert_eq!(doc.mask().unwrap(), &selection);
    }
}
