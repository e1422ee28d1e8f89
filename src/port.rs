//! The boundary between the pin core and whatever draws the map.
//!
//! The core never touches a widget. It tells a [`MarkerSurface`] what to show
//! and receives [`SurfaceEvent`]s describing what the user did.

use crate::pin::{MapPoint, Pin, PinId};

/// Screen position a dialog should appear next to. Placement itself is the
/// surface's business.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScreenAnchor {
    pub x: f32,
    pub y: f32,
}

impl ScreenAnchor {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Commands the core issues to the rendering side.
pub trait MarkerSurface {
    fn draw_marker(&mut self, pin: &Pin);
    /// Refresh icon and popup after the pin's fields changed.
    fn update_marker(&mut self, pin: &Pin);
    fn remove_marker(&mut self, id: PinId);
    fn set_draggable(&mut self, id: PinId, draggable: bool);
    /// Arms or disarms "click on the map creates a pin".
    fn set_create_armed(&mut self, armed: bool);
}

/// Raw interaction reported by the rendering side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SurfaceEvent {
    RequestCreateAt {
        position: MapPoint,
        anchor: ScreenAnchor,
    },
    RequestEditOf {
        id: PinId,
        anchor: ScreenAnchor,
    },
    DragEnded {
        id: PinId,
        position: MapPoint,
    },
}

/// A recorded [`MarkerSurface`] call.
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceCommand {
    Draw(Pin),
    Update(Pin),
    Remove(PinId),
    SetDraggable(PinId, bool),
    SetCreateArmed(bool),
}

/// Buffers commands so they can be applied later or inspected.
impl MarkerSurface for Vec<SurfaceCommand> {
    fn draw_marker(&mut self, pin: &Pin) {
        self.push(SurfaceCommand::Draw(pin.clone()));
    }

    fn update_marker(&mut self, pin: &Pin) {
        self.push(SurfaceCommand::Update(pin.clone()));
    }

    fn remove_marker(&mut self, id: PinId) {
        self.push(SurfaceCommand::Remove(id));
    }

    fn set_draggable(&mut self, id: PinId, draggable: bool) {
        self.push(SurfaceCommand::SetDraggable(id, draggable));
    }

    fn set_create_armed(&mut self, armed: bool) {
        self.push(SurfaceCommand::SetCreateArmed(armed));
    }
}
