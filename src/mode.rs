use log::debug;

use crate::pin::PinId;
use crate::port::MarkerSurface;

/// The exclusive interaction modes of the map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InteractionMode {
    #[default]
    Idle,
    AddActive,
    MoveActive,
}

/// Owns the current [`InteractionMode`] and keeps the surface in line with it.
///
/// Switching between Add and Move always leaves the old mode first, so the
/// surface never sees an armed create handler and draggable markers together.
#[derive(Debug, Default)]
pub struct ModeController {
    mode: InteractionMode,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn is_add_active(&self) -> bool {
        self.mode == InteractionMode::AddActive
    }

    pub fn is_move_active(&self) -> bool {
        self.mode == InteractionMode::MoveActive
    }

    pub fn toggle_add(&mut self, surface: &mut dyn MarkerSurface, markers: &[PinId]) {
        let target = if self.is_add_active() {
            InteractionMode::Idle
        } else {
            InteractionMode::AddActive
        };
        self.transition(target, surface, markers);
    }

    pub fn toggle_move(&mut self, surface: &mut dyn MarkerSurface, markers: &[PinId]) {
        let target = if self.is_move_active() {
            InteractionMode::Idle
        } else {
            InteractionMode::MoveActive
        };
        self.transition(target, surface, markers);
    }

    pub fn reset(&mut self, surface: &mut dyn MarkerSurface, markers: &[PinId]) {
        self.transition(InteractionMode::Idle, surface, markers);
    }

    fn transition(
        &mut self,
        target: InteractionMode,
        surface: &mut dyn MarkerSurface,
        markers: &[PinId],
    ) {
        if self.mode == target {
            return;
        }
        match self.mode {
            InteractionMode::AddActive => surface.set_create_armed(false),
            InteractionMode::MoveActive => {
                for &id in markers {
                    surface.set_draggable(id, false);
                }
            }
            InteractionMode::Idle => {}
        }
        match target {
            InteractionMode::AddActive => surface.set_create_armed(true),
            InteractionMode::MoveActive => {
                for &id in markers {
                    surface.set_draggable(id, true);
                }
            }
            InteractionMode::Idle => {}
        }
        debug!("interaction mode {:?} -> {:?}", self.mode, target);
        self.mode = target;
    }
}
