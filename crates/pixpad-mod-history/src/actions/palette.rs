use anyhow::Result;
use pixpad_core::palette::invert_mapping;
use pixpad_core::{Document, ObjectId, Palette};
use serde::{Deserialize, Serialize};

use super::snapshot::PaletteSnapshot;
use super::Action;
use crate::chunk::{ChunkKind, ChunkWriter};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AddPalette {
    sprite: ObjectId,
    palette: ObjectId,
}

impl AddPalette {
    pub(crate) fn capture(doc: &Document, palette: ObjectId) -> Self {
        Self {
            sprite: doc.sprite().id,
            palette,
        }
    }
}

impl Action for AddPalette {
    const KIND: ChunkKind = ChunkKind::AddPalette;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        if doc.find_sprite(self.sprite).is_none()
            || doc.registry().get::<Palette>(self.palette).is_none()
        {
            return Ok(());
        }
        out.push(&RemovePalette {
            sprite: self.sprite,
            palette: PaletteSnapshot::capture(doc, self.palette)?,
        })?;
        doc.remove_palette(self.palette);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RemovePalette {
    sprite: ObjectId,
    palette: PaletteSnapshot,
}

impl RemovePalette {
    pub(crate) fn capture(doc: &Document, palette: ObjectId) -> Result<Self> {
        Ok(Self {
            sprite: doc.sprite().id,
            palette: PaletteSnapshot::capture(doc, palette)?,
        })
    }
}

impl Action for RemovePalette {
    const KIND: ChunkKind = ChunkKind::RemovePalette;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        if doc.find_sprite(self.sprite).is_none() {
            return Ok(());
        }
        let sprite = self.sprite;
        let palette = self.palette.restore(doc);
        out.push(&AddPalette { sprite, palette })
    }
}

/// Previous values of a run of palette entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SetPaletteColors {
    palette: ObjectId,
    from: usize,
    colors: Vec<u32>,
}

impl SetPaletteColors {
    /// Captures entries `from..=to`.
    pub(crate) fn capture(
        doc: &Document,
        palette: ObjectId,
        from: usize,
        to: usize,
    ) -> Result<Self> {
        let colors = doc.palette(palette)?.colors();
        if from > to || to >= colors.len() {
            anyhow::bail!("palette range {from}..={to} out of bounds");
        }
        Ok(Self {
            palette,
            from,
            colors: colors[from..=to].to_vec(),
        })
    }
}

impl Action for SetPaletteColors {
    const KIND: ChunkKind = ChunkKind::SetPaletteColors;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        let Some(palette) = doc.registry_mut().get_mut::<Palette>(self.palette) else {
            return Ok(());
        };
        let end = (self.from + self.colors.len()).min(palette.colors().len());
        if self.from >= end {
            return Ok(());
        }
        out.push(&SetPaletteColors {
            palette: self.palette,
            from: self.from,
            colors: palette.colors()[self.from..end].to_vec(),
        })?;
        palette.set_colors(self.from, &self.colors);
        Ok(())
    }
}

/// A permutation applied to the indexed images of a frame range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RemapPalette {
    sprite: ObjectId,
    from_frame: u32,
    to_frame: u32,
    mapping: Vec<u8>,
}

impl RemapPalette {
    pub(crate) fn capture(
        doc: &Document,
        from_frame: u32,
        to_frame: u32,
        mapping: &[u8],
    ) -> Result<Self> {
        if invert_mapping(mapping).is_none() {
            anyhow::bail!("palette remap table is not a 256-entry permutation");
        }
        Ok(Self {
            sprite: doc.sprite().id,
            from_frame,
            to_frame,
            mapping: mapping.to_vec(),
        })
    }
}

impl Action for RemapPalette {
    const KIND: ChunkKind = ChunkKind::RemapPalette;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        if doc.find_sprite(self.sprite).is_none() {
            return Ok(());
        }
        let Some(inverse) = invert_mapping(&self.mapping) else {
            anyhow::bail!("stored remap table is not a permutation");
        };
        out.push(&RemapPalette {
            sprite: self.sprite,
            from_frame: self.from_frame,
            to_frame: self.to_frame,
            mapping: inverse.clone(),
        })?;
        doc.remap_images(self.from_frame, self.to_frame, &inverse)
    }
}
