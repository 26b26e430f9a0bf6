use anyhow::Result;
use pixpad_core::{Cel, Document, Layer, ObjectId};
use serde::{Deserialize, Serialize};

use super::snapshot::CelSnapshot;
use super::Action;
use crate::chunk::{ChunkKind, ChunkWriter};

/// A cel was added to a layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AddCel {
    layer: ObjectId,
    cel: ObjectId,
}

impl AddCel {
    pub(crate) fn capture(layer: ObjectId, cel: ObjectId) -> Self {
        Self { layer, cel }
    }
}

impl Action for AddCel {
    const KIND: ChunkKind = ChunkKind::AddCel;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        let reg = doc.registry();
        if reg.get::<Layer>(self.layer).is_none() || reg.get::<Cel>(self.cel).is_none() {
            return Ok(());
        }
        out.push(&RemoveCel {
            layer: self.layer,
            cel: CelSnapshot::capture(doc, self.cel)?,
        })?;
        doc.remove_cel(self.layer, self.cel)?;
        Ok(())
    }
}

/// A cel was removed from a layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RemoveCel {
    layer: ObjectId,
    cel: CelSnapshot,
}

impl RemoveCel {
    pub(crate) fn capture(doc: &Document, layer: ObjectId, cel: ObjectId) -> Result<Self> {
        doc.layer(layer)?;
        Ok(Self {
            layer,
            cel: CelSnapshot::capture(doc, cel)?,
        })
    }
}

impl Action for RemoveCel {
    const KIND: ChunkKind = ChunkKind::RemoveCel;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        if doc.registry().get::<Layer>(self.layer).is_none() {
            return Ok(());
        }
        let cel = self.cel.restore(doc);
        out.push(&AddCel {
            layer: self.layer,
            cel,
        })?;
        doc.attach_cel(self.layer, cel)
    }
}
