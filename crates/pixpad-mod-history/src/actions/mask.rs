use anyhow::Result;
use pixpad_core::{Document, Mask, ObjectId};
use serde::{Deserialize, Serialize};

use super::Action;
use crate::chunk::{ChunkKind, ChunkWriter};

/// Whole selection mask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SetMask {
    mask: ObjectId,
    snapshot: Mask,
}

impl SetMask {
    pub(crate) fn capture(doc: &Document) -> Result<Self> {
        Ok(Self {
            mask: doc.sprite().mask,
            snapshot: doc.mask()?.clone(),
        })
    }
}

impl Action for SetMask {
    const KIND: ChunkKind = ChunkKind::SetMask;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        let Some(mask) = doc.registry_mut().get_mut::<Mask>(self.mask) else {
            return Ok(());
        };
        out.push(&SetMask {
            mask: self.mask,
            snapshot: mask.clone(),
        })?;
        *mask = self.snapshot;
        Ok(())
    }
}
