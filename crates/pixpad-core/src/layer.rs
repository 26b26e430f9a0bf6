use crate::id::ObjectId;

pub const LAYER_READABLE: u8 = 1;
pub const LAYER_WRITABLE: u8 = 2;
pub const LAYER_LOCKMOVE: u8 = 4;
pub const LAYER_BACKGROUND: u8 = 8;

/// What a layer contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerKind {
    /// Cel IDs, kept sorted by frame.
    Image { cels: Vec<ObjectId> },
    /// Child layer IDs, bottom to top.
    Folder { layers: Vec<ObjectId> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub name: String,
    pub flags: u8,
    pub blend_mode: u8,
    /// Folder this layer belongs to; `None` only for the sprite's root folder.
    pub parent: Option<ObjectId>,
    pub kind: LayerKind,
}

impl Layer {
    /// A readable, writable image layer with no cels.
    pub fn image(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: LAYER_READABLE | LAYER_WRITABLE,
            blend_mode: 0,
            parent: None,
            kind: LayerKind::Image { cels: Vec::new() },
        }
    }

    /// An empty folder layer.
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: LAYER_READABLE | LAYER_WRITABLE,
            blend_mode: 0,
            parent: None,
            kind: LayerKind::Folder { layers: Vec::new() },
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind, LayerKind::Image { .. })
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, LayerKind::Folder { .. })
    }

    pub fn is_background(&self) -> bool {
        self.flags & LAYER_BACKGROUND != 0
    }

    pub fn is_readable(&self) -> bool {
        self.flags & LAYER_READABLE != 0
    }

    pub fn is_writable(&self) -> bool {
        self.flags & LAYER_WRITABLE != 0
    }

    pub fn is_movable(&self) -> bool {
        self.flags & LAYER_LOCKMOVE == 0
    }

    /// Cel IDs of an image layer, empty for folders.
    pub fn cels(&self) -> &[ObjectId] {
        match &self.kind {
            LayerKind::Image { cels } => cels,
            LayerKind::Folder { .. } => &[],
        }
    }

    /// Child layer IDs of a folder, empty for image layers.
    pub fn children(&self) -> &[ObjectId] {
        match &self.kind {
            LayerKind::Folder { layers } => layers,
            LayerKind::Image { .. } => &[],
        }
    }

    /// Folder child before `child` (the one right below it), if any.
    pub fn previous_child(&self, child: ObjectId) -> Option<ObjectId> {
        let children = self.children();
        let at = children.iter().position(|&id| id == child)?;
        at.checked_sub(1).map(|i| children[i])
    }

    /// Folder child after `child` (the one right above it), if any.
    pub fn next_child(&self, child: ObjectId) -> Option<ObjectId> {
        let children = self.children();
        let at = children.iter().position(|&id| id == child)?;
        children.get(at + 1).copied()
    }

    /// Inserts `child` right after `after`, or at the bottom when `after` is
    /// `None` or not a child. Does nothing on image layers.
    pub fn insert_child_after(&mut self, child: ObjectId, after: Option<ObjectId>) {
        if let LayerKind::Folder { layers } = &mut self.kind {
            let at = after
                .and_then(|after| layers.iter().position(|&id| id == after))
                .map_or(0, |i| i + 1);
            layers.insert(at, child);
        }
    }

    /// Removes `child` from a folder. Returns whether it was present.
    pub fn remove_child(&mut self, child: ObjectId) -> bool {
        match &mut self.kind {
            LayerKind::Folder { layers } => {
                let before = layers.len();
                layers.retain(|&id| id != child);
                layers.len() != before
            }
            LayerKind::Image { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Registry;

    #[test]
    fn test_new_layers_flags() {
        let layer = Layer::image("Layer 1");
        assert!(layer.is_image());
        assert!(layer.is_readable() && layer.is_writable() && layer.is_movable());
        assert!(!layer.is_background());
        assert!(Layer::folder("Group").is_folder());
    }

    #[test]
    fn test_insert_child_after() {
        let mut reg = Registry::new();
        let (a, b, c) = (reg.reserve(), reg.reserve(), reg.reserve());
        let mut folder = Layer::folder("root");
        folder.insert_child_after(a, None);
        folder.insert_child_after(b, Some(a));
        folder.insert_child_after(c, None);
        assert_eq!(folder.children(), &[c, a, b]);
        assert_eq!(folder.previous_child(a), Some(c));
        assert_eq!(folder.next_child(a), Some(b));
        assert_eq!(folder.previous_child(c), None);
        assert_eq!(folder.next_child(b), None);
    }

    #[test]
    fn test_remove_child() {
        let mut reg = Registry::new();
        let a = reg.reserve();
        let mut folder = Layer::folder("root");
        folder.insert_child_after(a, None);
        assert!(folder.remove_child(a));
        assert!(!folder.remove_child(a));

        let mut image = Layer::image("img");
        image.insert_child_after(a, None);
        assert!(image.children().is_empty());
    }
}
