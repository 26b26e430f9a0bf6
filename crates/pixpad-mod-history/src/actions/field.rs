use anyhow::{Context, Result};
use pixpad_core::{Cel, Document, Layer, Mask, ObjectId, PixelFormat, Stock};
use serde::{Deserialize, Serialize};

use super::Action;
use crate::chunk::{ChunkKind, ChunkWriter};

/// Scalar fields that can be patched individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Field {
    CelFrame,
    CelPosition,
    CelOpacity,
    LayerFlags,
    LayerBlendMode,
    MaskPosition,
    StockFormat,
}

/// A field together with a value for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldPatch {
    CelFrame(u32),
    CelPosition(i32, i32),
    CelOpacity(u8),
    LayerFlags(u8),
    LayerBlendMode(u8),
    MaskPosition(i32, i32),
    StockFormat(PixelFormat),
}

impl FieldPatch {
    /// Reads the current value of `field` on `object`. `None` if the object
    /// is missing or of the wrong type.
    pub fn read(doc: &Document, object: ObjectId, field: Field) -> Option<FieldPatch> {
        let reg = doc.registry();
        Some(match field {
            Field::CelFrame => FieldPatch::CelFrame(reg.get::<Cel>(object)?.frame),
            Field::CelPosition => {
                let cel = reg.get::<Cel>(object)?;
                FieldPatch::CelPosition(cel.x, cel.y)
            }
            Field::CelOpacity => FieldPatch::CelOpacity(reg.get::<Cel>(object)?.opacity),
            Field::LayerFlags => FieldPatch::LayerFlags(reg.get::<Layer>(object)?.flags),
            Field::LayerBlendMode => {
                FieldPatch::LayerBlendMode(reg.get::<Layer>(object)?.blend_mode)
            }
            Field::MaskPosition => {
                let mask = reg.get::<Mask>(object)?;
                FieldPatch::MaskPosition(mask.x, mask.y)
            }
            Field::StockFormat => FieldPatch::StockFormat(reg.get::<Stock>(object)?.format),
        })
    }

    pub fn field(&self) -> Field {
        match self {
            FieldPatch::CelFrame(_) => Field::CelFrame,
            FieldPatch::CelPosition(..) => Field::CelPosition,
            FieldPatch::CelOpacity(_) => Field::CelOpacity,
            FieldPatch::LayerFlags(_) => Field::LayerFlags,
            FieldPatch::LayerBlendMode(_) => Field::LayerBlendMode,
            FieldPatch::MaskPosition(..) => Field::MaskPosition,
            FieldPatch::StockFormat(_) => Field::StockFormat,
        }
    }

    /// Writes this value into `object`. Returns `false` if the object is
    /// missing or of the wrong type.
    pub fn apply(&self, doc: &mut Document, object: ObjectId) -> bool {
        let reg = doc.registry_mut();
        let applied = match *self {
            FieldPatch::CelFrame(frame) => reg.get_mut::<Cel>(object).map(|c| c.frame = frame),
            FieldPatch::CelPosition(x, y) => reg.get_mut::<Cel>(object).map(|c| {
                c.x = x;
                c.y = y;
            }),
            FieldPatch::CelOpacity(opacity) => {
                reg.get_mut::<Cel>(object).map(|c| c.opacity = opacity)
            }
            FieldPatch::LayerFlags(flags) => reg.get_mut::<Layer>(object).map(|l| l.flags = flags),
            FieldPatch::LayerBlendMode(mode) => {
                reg.get_mut::<Layer>(object).map(|l| l.blend_mode = mode)
            }
            FieldPatch::MaskPosition(x, y) => reg.get_mut::<Mask>(object).map(|m| {
                m.x = x;
                m.y = y;
            }),
            FieldPatch::StockFormat(format) => {
                reg.get_mut::<Stock>(object).map(|s| s.format = format)
            }
        };
        applied.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SetField {
    object: ObjectId,
    patch: FieldPatch,
}

impl SetField {
    pub(crate) fn capture(doc: &Document, object: ObjectId, field: Field) -> Result<Self> {
        let patch = FieldPatch::read(doc, object, field)
            .with_context(|| format!("object {object} has no field {field:?}"))?;
        Ok(Self { object, patch })
    }
}

impl Action for SetField {
    const KIND: ChunkKind = ChunkKind::Field;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        let Some(current) = FieldPatch::read(doc, self.object, self.patch.field()) else {
            tracing::debug!("field patch target {} is gone", self.object);
            return Ok(());
        };
        out.push(&SetField {
            object: self.object,
            patch: current,
        })?;
        self.patch.apply(doc, self.object);
        Ok(())
    }
}
