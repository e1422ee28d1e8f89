use std::path::Path;

use log::{debug, info};

use crate::error::{PersistenceError, StoreError, WorkflowError};
use crate::mode::{InteractionMode, ModeController};
use crate::persistence::{self, PinRecord};
use crate::pin::{MapPoint, PinId, PinStore};
use crate::port::{MarkerSurface, ScreenAnchor, SurfaceEvent};
use crate::workflow::{Confirmed, CreateRequest, DeleteStep, DialogView, PinForm, Workflow};

/// Everything the map editor knows, in one owned value.
///
/// The rendering side feeds it [`SurfaceEvent`]s and user commands, and passes
/// itself in as the [`MarkerSurface`] so every store change is mirrored.
#[derive(Default)]
pub struct Editor {
    store: PinStore,
    modes: ModeController,
    workflow: Workflow,
    pending_create: Option<CreateRequest>,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &PinStore {
        &self.store
    }

    pub fn mode(&self) -> InteractionMode {
        self.modes.mode()
    }

    pub fn dialog(&self) -> DialogView {
        self.workflow.view()
    }

    pub fn form(&self) -> &PinForm {
        self.workflow.form()
    }

    pub fn form_mut(&mut self) -> &mut PinForm {
        self.workflow.form_mut()
    }

    /// Replaces every pin with `records`, redrawing the surface.
    pub fn load_records(&mut self, records: Vec<PinRecord>, surface: &mut dyn MarkerSurface) {
        for id in self.store.ids() {
            surface.remove_marker(id);
        }
        let ids = self
            .store
            .replace_all(records.into_iter().map(PinRecord::into_parts));
        for id in ids {
            self.show_new_marker(id, surface);
        }
        info!("editor holds {} pins", self.store.len());
    }

    /// Loads a pin file. On any error the current pins stay as they are.
    pub fn load_file(
        &mut self,
        path: &Path,
        surface: &mut dyn MarkerSurface,
    ) -> Result<usize, PersistenceError> {
        let records = persistence::load_pins(path)?;
        let count = records.len();
        self.load_records(records, surface);
        Ok(count)
    }

    pub fn export_json(&self) -> Result<String, PersistenceError> {
        persistence::pins_to_json(self.store.list())
    }

    pub fn save_file(&self, path: &Path) -> Result<(), PersistenceError> {
        persistence::save_pins(path, self.store.list())
    }

    pub fn toggle_add(&mut self, surface: &mut dyn MarkerSurface) {
        self.modes.toggle_add(surface, &self.store.ids());
    }

    pub fn toggle_move(&mut self, surface: &mut dyn MarkerSurface) {
        self.modes.toggle_move(surface, &self.store.ids());
    }

    pub fn handle_event(
        &mut self,
        event: SurfaceEvent,
        surface: &mut dyn MarkerSurface,
    ) -> Result<(), WorkflowError> {
        match event {
            SurfaceEvent::RequestCreateAt { position, anchor } => {
                self.request_create_at(position, anchor)
            }
            SurfaceEvent::RequestEditOf { id, anchor } => self.request_edit_of(id, anchor),
            SurfaceEvent::DragEnded { id, position } => {
                self.drag_ended(id, position, surface)?;
                Ok(())
            }
        }
    }

    /// Opens the create dialog. Ignored unless Add mode is on.
    pub fn request_create_at(
        &mut self,
        position: MapPoint,
        anchor: ScreenAnchor,
    ) -> Result<(), WorkflowError> {
        if !self.modes.is_add_active() {
            debug!("map click ignored outside add mode");
            return Ok(());
        }
        let request = self.workflow.open_for_create(position, anchor)?;
        self.pending_create = Some(request);
        Ok(())
    }

    pub fn request_edit_of(&mut self, id: PinId, anchor: ScreenAnchor) -> Result<(), WorkflowError> {
        self.workflow.open_for_edit(&self.store, id, anchor)
    }

    /// Records a finished drag. Ignored unless Move mode is on.
    pub fn drag_ended(
        &mut self,
        id: PinId,
        position: MapPoint,
        surface: &mut dyn MarkerSurface,
    ) -> Result<bool, StoreError> {
        if !self.modes.is_move_active() {
            debug!("drag of pin {id} ignored outside move mode");
            return Ok(false);
        }
        self.store.move_to(id, position)?;
        if let Some(pin) = self.store.get(id) {
            surface.update_marker(pin);
        }
        Ok(true)
    }

    pub fn confirm_dialog(
        &mut self,
        surface: &mut dyn MarkerSurface,
    ) -> Result<Confirmed, WorkflowError> {
        let outcome = self.workflow.submit(&mut self.store, surface);
        self.poll_pending_create(surface);
        outcome
    }

    pub fn cancel_dialog(&mut self, surface: &mut dyn MarkerSurface) -> bool {
        let was_open = self.workflow.cancel();
        self.poll_pending_create(surface);
        was_open
    }

    /// Outside click or Escape.
    pub fn dismiss_dialog(&mut self, surface: &mut dyn MarkerSurface) -> bool {
        let was_open = self.workflow.dismiss();
        self.poll_pending_create(surface);
        was_open
    }

    pub fn delete_in_dialog(
        &mut self,
        surface: &mut dyn MarkerSurface,
    ) -> Result<DeleteStep, WorkflowError> {
        let step = self.workflow.delete();
        self.poll_pending_create(surface);
        step
    }

    pub fn resolve_delete(
        &mut self,
        surface: &mut dyn MarkerSurface,
        approved: bool,
    ) -> Result<DeleteStep, WorkflowError> {
        self.workflow.resolve_delete(&mut self.store, surface, approved)
    }

    /// Adds the pin of a confirmed create dialog. Returns its id once the
    /// request resolves with a pin.
    pub fn poll_pending_create(&mut self, surface: &mut dyn MarkerSurface) -> Option<PinId> {
        let outcome = self.pending_create.as_mut()?.try_resolve()?;
        self.pending_create = None;
        let new_pin = outcome?;
        let id = self.store.add(new_pin.fields, new_pin.position);
        self.show_new_marker(id, surface);
        Some(id)
    }

    fn show_new_marker(&self, id: PinId, surface: &mut dyn MarkerSurface) {
        if let Some(pin) = self.store.get(id) {
            surface.draw_marker(pin);
            if self.modes.is_move_active() {
                surface.set_draggable(id, true);
            }
        }
    }
}
