//! Change notifications emitted by the [`Editor`](crate::Editor).

use serde::Serialize;

use crate::{LayerId, ScreenId};

/// Direction of a z-order change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerOrder {
    /// One step towards the top.
    Up,
    /// One step towards the bottom.
    Down,
    /// To the top of the stack.
    Top,
    /// To the bottom of the stack.
    Bottom,
}

/// What changed in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanvasEvent {
    /// A layer was added (including duplicates).
    LayerAdded {
        /// The new layer.
        id: LayerId,
    },
    /// A layer was removed.
    LayerRemoved {
        /// The removed layer.
        id: LayerId,
    },
    /// A layer's geometry, appearance, flags or content changed.
    LayerChanged {
        /// The changed layer.
        id: LayerId,
    },
    /// A layer moved in the z-order.
    LayerReordered {
        /// The moved layer.
        id: LayerId,
        /// Previous index.
        from: usize,
        /// New index.
        to: usize,
    },
    /// The layer selection changed.
    SelectionChanged {
        /// The selected layer, if any.
        id: Option<LayerId>,
    },
    /// A screen was added (including duplicates and inserts).
    ScreenAdded {
        /// The new screen.
        id: ScreenId,
    },
    /// A screen was removed.
    ScreenRemoved {
        /// The removed screen.
        id: ScreenId,
    },
    /// A screen was resized, renamed or had its blank flag changed.
    ScreenChanged {
        /// The changed screen.
        id: ScreenId,
    },
    /// The background color changed.
    BackgroundChanged {
        /// New color.
        color: String,
    },
    /// The whole document was replaced by a history snapshot.
    Restored {
        /// Label of the action that was undone or redone.
        label: String,
    },
}

impl CanvasEvent {
    /// The layer this event concerns, if any.
    #[must_use]
    pub fn layer_id(&self) -> Option<&LayerId> {
        match self {
            Self::LayerAdded { id }
            | Self::LayerRemoved { id }
            | Self::LayerChanged { id }
            | Self::LayerReordered { id, .. } => Some(id),
            Self::SelectionChanged { id } => id.as_ref(),
            _ => None,
        }
    }

    /// The screen this event concerns, if any.
    #[must_use]
    pub fn screen_id(&self) -> Option<&ScreenId> {
        match self {
            Self::ScreenAdded { id } | Self::ScreenRemoved { id } | Self::ScreenChanged { id } => {
                Some(id)
            }
            _ => None,
        }
    }
}
