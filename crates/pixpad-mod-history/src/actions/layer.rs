use anyhow::Result;
use pixpad_core::{Document, Layer, ObjectId};
use serde::{Deserialize, Serialize};

use super::snapshot::LayerSnapshot;
use super::Action;
use crate::chunk::{ChunkKind, ChunkWriter};

/// A layer was inserted into a folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AddLayer {
    parent: ObjectId,
    layer: ObjectId,
}

impl AddLayer {
    pub(crate) fn capture(parent: ObjectId, layer: ObjectId) -> Self {
        Self { parent, layer }
    }
}

impl Action for AddLayer {
    const KIND: ChunkKind = ChunkKind::AddLayer;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        let reg = doc.registry();
        if reg.get::<Layer>(self.parent).is_none() || reg.get::<Layer>(self.layer).is_none() {
            return Ok(());
        }
        out.push(&RemoveLayer::capture(doc, self.layer)?)?;
        doc.destroy_layer(self.layer)?;
        Ok(())
    }
}

/// A layer (with its subtree) was taken out of its folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RemoveLayer {
    parent: ObjectId,
    /// Sibling the layer sat right above.
    after: Option<ObjectId>,
    layer: LayerSnapshot,
}

impl RemoveLayer {
    pub(crate) fn capture(doc: &Document, layer: ObjectId) -> Result<Self> {
        let parent = doc
            .layer(layer)?
            .parent
            .ok_or_else(|| anyhow::anyhow!("the root folder cannot be removed"))?;
        Ok(Self {
            parent,
            after: doc.layer(parent)?.previous_child(layer),
            layer: LayerSnapshot::capture(doc, layer)?,
        })
    }
}

impl Action for RemoveLayer {
    const KIND: ChunkKind = ChunkKind::RemoveLayer;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        if doc.registry().get::<Layer>(self.parent).is_none() {
            return Ok(());
        }
        out.push(&AddLayer {
            parent: self.parent,
            layer: self.layer.id(),
        })?;
        let layer = self.layer.restore(doc)?;
        doc.attach_layer(layer, self.parent, self.after)
    }
}

/// A layer moved inside its folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct MoveLayer {
    layer: ObjectId,
    after: Option<ObjectId>,
}

impl MoveLayer {
    pub(crate) fn capture(doc: &Document, layer: ObjectId) -> Result<Self> {
        let parent = doc
            .layer(layer)?
            .parent
            .ok_or_else(|| anyhow::anyhow!("the root folder cannot be moved"))?;
        Ok(Self {
            layer,
            after: doc.layer(parent)?.previous_child(layer),
        })
    }
}

impl Action for MoveLayer {
    const KIND: ChunkKind = ChunkKind::MoveLayer;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        let Some(parent) = doc.registry().get::<Layer>(self.layer).and_then(|l| l.parent) else {
            return Ok(());
        };
        if doc.registry().get::<Layer>(parent).is_none() {
            return Ok(());
        }
        out.push(&MoveLayer::capture(doc, self.layer)?)?;
        doc.move_layer(self.layer, self.after)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SetLayerName {
    layer: ObjectId,
    name: String,
}

impl SetLayerName {
    pub(crate) fn capture(doc: &Document, layer: ObjectId) -> Result<Self> {
        Ok(Self {
            layer,
            name: doc.layer(layer)?.name.clone(),
        })
    }
}

impl Action for SetLayerName {
    const KIND: ChunkKind = ChunkKind::SetLayerName;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        let Some(current) = doc.registry().get::<Layer>(self.layer).map(|l| l.name.clone()) else {
            return Ok(());
        };
        out.push(&SetLayerName {
            layer: self.layer,
            name: current,
        })?;
        doc.layer_mut(self.layer)?.name = self.name;
        Ok(())
    }
}

/// The sprite's selected layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SetCurrentLayer {
    sprite: ObjectId,
    layer: Option<ObjectId>,
}

impl SetCurrentLayer {
    pub(crate) fn capture(doc: &Document) -> Self {
        Self {
            sprite: doc.sprite().id,
            layer: doc.sprite().current_layer,
        }
    }
}

impl Action for SetCurrentLayer {
    const KIND: ChunkKind = ChunkKind::SetCurrentLayer;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        let Some(sprite) = doc.find_sprite_mut(self.sprite) else {
            return Ok(());
        };
        out.push(&SetCurrentLayer {
            sprite: self.sprite,
            layer: sprite.current_layer,
        })?;
        sprite.current_layer = self.layer;
        Ok(())
    }
}
