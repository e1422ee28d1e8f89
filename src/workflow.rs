//! The pin dialog: one modal at a time, every request resolved exactly once.
//!
//! All store mutations that come from the user pass through [`Workflow`].
//! Opening is refused while a dialog is up, so a pending [`CreateRequest`]
//! can never be overwritten or leaked.

use std::future::Future;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use log::{debug, warn};

use crate::error::{StoreError, WorkflowError};
use crate::normalize::{normalize_color, normalize_link, normalize_name, DEFAULT_PIN_COLOR};
use crate::pin::{MapPoint, Pin, PinFields, PinId, PinStore};
use crate::port::{MarkerSurface, ScreenAnchor};

/// The editable text of the dialog, exactly as typed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PinForm {
    pub name: String,
    pub description: String,
    pub link: String,
    pub color: String,
}

impl PinForm {
    pub fn blank() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            link: String::new(),
            color: DEFAULT_PIN_COLOR.to_string(),
        }
    }

    pub fn from_pin(pin: &Pin) -> Self {
        Self {
            name: pin.name().to_string(),
            description: pin.description().to_string(),
            link: pin.link().to_string(),
            color: normalize_color(pin.color()),
        }
    }

    /// Cleans the typed values up into storable fields.
    pub fn to_fields(&self) -> PinFields {
        PinFields {
            name: normalize_name(&self.name),
            description: self.description.trim().to_string(),
            link: normalize_link(&self.link),
            color: normalize_color(&self.color),
        }
    }
}

impl Default for PinForm {
    fn default() -> Self {
        Self::blank()
    }
}

/// What a confirmed create dialog hands back to whoever asked for it.
#[derive(Clone, Debug, PartialEq)]
pub struct NewPin {
    pub fields: PinFields,
    pub position: MapPoint,
}

/// Handle for a pending create dialog.
///
/// Resolves to `Some(NewPin)` on confirm and `None` on cancel, dismissal,
/// discard, or if the workflow is dropped while the dialog is still open.
#[derive(Debug)]
pub struct CreateRequest {
    receiver: oneshot::Receiver<Option<NewPin>>,
}

impl CreateRequest {
    /// Non-blocking check. Outer `None` means the dialog is still open.
    pub fn try_resolve(&mut self) -> Option<Option<NewPin>> {
        match self.receiver.try_recv() {
            Ok(Some(outcome)) => Some(outcome),
            Ok(None) => None,
            Err(oneshot::Canceled) => Some(None),
        }
    }
}

impl Future for CreateRequest {
    type Output = Option<NewPin>;

    fn poll(mut self: std::pin::Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        std::pin::Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or(None))
    }
}

enum DialogState {
    Closed,
    OpenForEdit {
        target: PinId,
        anchor: ScreenAnchor,
        confirming_delete: bool,
    },
    OpenForCreate {
        position: MapPoint,
        anchor: ScreenAnchor,
        responder: oneshot::Sender<Option<NewPin>>,
    },
}

/// Read-only view of the dialog state for the rendering side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DialogView {
    Closed,
    Edit {
        target: PinId,
        anchor: ScreenAnchor,
        confirming_delete: bool,
    },
    Create {
        position: MapPoint,
        anchor: ScreenAnchor,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Confirmed {
    Updated(PinId),
    Created,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeleteStep {
    /// The user has to approve the deletion through [`Workflow::resolve_delete`].
    AwaitingConfirmation,
    Deleted(Pin),
    Declined,
    /// Delete on a pin that was never created throws the draft away.
    DiscardedDraft,
}

pub struct Workflow {
    state: DialogState,
    form: PinForm,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

impl Workflow {
    pub fn new() -> Self {
        Self {
            state: DialogState::Closed,
            form: PinForm::blank(),
        }
    }

    pub fn view(&self) -> DialogView {
        match &self.state {
            DialogState::Closed => DialogView::Closed,
            DialogState::OpenForEdit {
                target,
                anchor,
                confirming_delete,
            } => DialogView::Edit {
                target: *target,
                anchor: *anchor,
                confirming_delete: *confirming_delete,
            },
            DialogState::OpenForCreate {
                position, anchor, ..
            } => DialogView::Create {
                position: *position,
                anchor: *anchor,
            },
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, DialogState::Closed)
    }

    pub fn form(&self) -> &PinForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut PinForm {
        &mut self.form
    }

    pub fn open_for_edit(
        &mut self,
        store: &PinStore,
        id: PinId,
        anchor: ScreenAnchor,
    ) -> Result<(), WorkflowError> {
        self.ensure_closed()?;
        let pin = store.get(id).ok_or_else(|| {
            warn!("edit requested for unknown pin {id}");
            StoreError::PinNotFound(id)
        })?;
        self.form = PinForm::from_pin(pin);
        self.state = DialogState::OpenForEdit {
            target: id,
            anchor,
            confirming_delete: false,
        };
        debug!("dialog opened for editing pin {id}");
        Ok(())
    }

    pub fn open_for_create(
        &mut self,
        position: MapPoint,
        anchor: ScreenAnchor,
    ) -> Result<CreateRequest, WorkflowError> {
        self.ensure_closed()?;
        let (responder, receiver) = oneshot::channel();
        self.form = PinForm::blank();
        self.state = DialogState::OpenForCreate {
            position,
            anchor,
            responder,
        };
        debug!("dialog opened for a new pin at ({}, {})", position.x, position.y);
        Ok(CreateRequest { receiver })
    }

    /// Confirms with the dialog's own draft.
    pub fn submit(
        &mut self,
        store: &mut PinStore,
        surface: &mut dyn MarkerSurface,
    ) -> Result<Confirmed, WorkflowError> {
        let form = self.form.clone();
        self.confirm(store, surface, form)
    }

    pub fn confirm(
        &mut self,
        store: &mut PinStore,
        surface: &mut dyn MarkerSurface,
        form: PinForm,
    ) -> Result<Confirmed, WorkflowError> {
        let fields = form.to_fields();
        match self.close() {
            DialogState::Closed => Err(WorkflowError::NotOpen),
            DialogState::OpenForEdit { target, .. } => {
                store.update(target, fields)?;
                if let Some(pin) = store.get(target) {
                    surface.update_marker(pin);
                }
                Ok(Confirmed::Updated(target))
            }
            DialogState::OpenForCreate {
                position,
                responder,
                ..
            } => {
                if responder.send(Some(NewPin { fields, position })).is_err() {
                    warn!("create request was dropped before it was confirmed");
                }
                Ok(Confirmed::Created)
            }
        }
    }

    /// Closes the dialog without touching the store. Returns whether a
    /// dialog was open.
    pub fn cancel(&mut self) -> bool {
        match self.close() {
            DialogState::Closed => false,
            DialogState::OpenForEdit { target, .. } => {
                debug!("edit of pin {target} cancelled");
                true
            }
            DialogState::OpenForCreate { responder, .. } => {
                let _ = responder.send(None);
                debug!("pin creation cancelled");
                true
            }
        }
    }

    /// Outside click or Escape.
    pub fn dismiss(&mut self) -> bool {
        self.cancel()
    }

    pub fn delete(&mut self) -> Result<DeleteStep, WorkflowError> {
        if let DialogState::OpenForCreate { .. } = self.state {
            self.cancel();
            return Ok(DeleteStep::DiscardedDraft);
        }
        match &mut self.state {
            DialogState::OpenForEdit {
                confirming_delete, ..
            } => {
                *confirming_delete = true;
                Ok(DeleteStep::AwaitingConfirmation)
            }
            _ => Err(WorkflowError::NotOpen),
        }
    }

    pub fn resolve_delete(
        &mut self,
        store: &mut PinStore,
        surface: &mut dyn MarkerSurface,
        approved: bool,
    ) -> Result<DeleteStep, WorkflowError> {
        let target = match &mut self.state {
            DialogState::Closed => return Err(WorkflowError::NotOpen),
            DialogState::OpenForCreate { .. } => return Err(WorkflowError::NotEditing),
            DialogState::OpenForEdit {
                confirming_delete: false,
                ..
            } => return Err(WorkflowError::NotEditing),
            DialogState::OpenForEdit {
                target,
                confirming_delete,
                ..
            } => {
                if !approved {
                    *confirming_delete = false;
                    return Ok(DeleteStep::Declined);
                }
                *target
            }
        };
        self.close();
        let removed = store.remove(target).ok_or(StoreError::PinNotFound(target))?;
        surface.remove_marker(target);
        debug!("pin {target} deleted");
        Ok(DeleteStep::Deleted(removed))
    }

    fn ensure_closed(&self) -> Result<(), WorkflowError> {
        if self.is_open() {
            warn!("refusing to open a pin dialog while another one is open");
            return Err(WorkflowError::DialogBusy);
        }
        Ok(())
    }

    fn close(&mut self) -> DialogState {
        std::mem::replace(&mut self.state, DialogState::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::SurfaceCommand;
    use futures::executor::block_on;

    fn store_with_shop() -> (PinStore, PinId) {
        let mut store = PinStore::new();
        let id = store.add(
            PinFields {
                name: "Shop".to_string(),
                ..PinFields::default()
            },
            MapPoint::new(100.0, 50.0),
        );
        (store, id)
    }

    fn form(name: &str, link: &str, color: &str) -> PinForm {
        PinForm {
            name: name.to_string(),
            description: String::new(),
            link: link.to_string(),
            color: color.to_string(),
        }
    }

    #[test]
    fn edit_loads_current_fields_into_form() {
        let (store, id) = store_with_shop();
        let mut workflow = Workflow::new();
        workflow.open_for_edit(&store, id, ScreenAnchor::default()).unwrap();
        assert_eq!(workflow.form().name, "Shop");
        assert_eq!(workflow.form().color, DEFAULT_PIN_COLOR);
        assert!(matches!(workflow.view(), DialogView::Edit { target, .. } if target == id));
    }

    #[test]
    fn edit_of_unknown_pin_is_refused() {
        let (mut store, id) = store_with_shop();
        store.remove(id);
        let mut workflow = Workflow::new();
        let err = workflow.open_for_edit(&store, id, ScreenAnchor::default());
        assert!(matches!(err, Err(WorkflowError::Store(_))));
        assert!(!workflow.is_open());
    }

    #[test]
    fn confirm_edit_updates_store_and_marker() {
        let (mut store, id) = store_with_shop();
        let mut surface: Vec<SurfaceCommand> = Vec::new();
        let mut workflow = Workflow::new();
        workflow.open_for_edit(&store, id, ScreenAnchor::default()).unwrap();
        let outcome = workflow
            .confirm(&mut store, &mut surface, form("Shop", "example.com", "0f0"))
            .unwrap();

        assert_eq!(outcome, Confirmed::Updated(id));
        let pin = store.get(id).unwrap();
        assert_eq!(pin.link(), "https://example.com");
        assert_eq!(pin.color(), "#0f0");
        assert_eq!(surface, vec![SurfaceCommand::Update(pin.clone())]);
        assert_eq!(workflow.view(), DialogView::Closed);
    }

    #[test]
    fn blank_name_confirms_as_placeholder() {
        let (mut store, id) = store_with_shop();
        let mut workflow = Workflow::new();
        workflow.open_for_edit(&store, id, ScreenAnchor::default()).unwrap();
        workflow.form_mut().name = "   ".to_string();
        workflow
            .submit(&mut store, &mut Vec::<SurfaceCommand>::new())
            .unwrap();
        assert_eq!(store.get(id).unwrap().name(), "Pin");
    }

    #[test]
    fn cancel_edit_leaves_store_unchanged() {
        let (mut store, id) = store_with_shop();
        let before = store.list().to_vec();
        let mut workflow = Workflow::new();
        workflow.open_for_edit(&store, id, ScreenAnchor::default()).unwrap();
        workflow.form_mut().name = "changed".to_string();
        assert!(workflow.cancel());
        assert_eq!(store.list(), before.as_slice());
        assert!(!workflow.cancel());
    }

    #[test]
    fn confirm_create_resolves_request_without_touching_store() {
        let mut store = PinStore::new();
        let mut workflow = Workflow::new();
        let request = workflow
            .open_for_create(MapPoint::new(3.0, 4.0), ScreenAnchor::default())
            .unwrap();
        workflow
            .confirm(&mut store, &mut Vec::<SurfaceCommand>::new(), form("New", "", "f00"))
            .unwrap();
        assert!(store.is_empty());

        let created = block_on(request).unwrap();
        assert_eq!(created.position, MapPoint::new(3.0, 4.0));
        assert_eq!(created.fields.color, "#f00");
        assert_eq!(created.fields.name, "New");
    }

    #[test]
    fn cancel_and_dismiss_resolve_create_with_none() {
        let mut workflow = Workflow::new();
        let request = workflow
            .open_for_create(MapPoint::default(), ScreenAnchor::default())
            .unwrap();
        workflow.cancel();
        assert_eq!(block_on(request), None);

        let request = workflow
            .open_for_create(MapPoint::default(), ScreenAnchor::default())
            .unwrap();
        workflow.dismiss();
        assert_eq!(block_on(request), None);
    }

    #[test]
    fn second_open_is_refused_and_pending_request_survives() {
        let (store, id) = store_with_shop();
        let mut workflow = Workflow::new();
        let mut request = workflow
            .open_for_create(MapPoint::new(1.0, 1.0), ScreenAnchor::default())
            .unwrap();

        assert!(matches!(
            workflow.open_for_create(MapPoint::new(9.0, 9.0), ScreenAnchor::default()),
            Err(WorkflowError::DialogBusy)
        ));
        assert_eq!(
            workflow.open_for_edit(&store, id, ScreenAnchor::default()),
            Err(WorkflowError::DialogBusy)
        );
        assert_eq!(request.try_resolve(), None);
        assert!(matches!(
            workflow.view(),
            DialogView::Create { position, .. } if position == MapPoint::new(1.0, 1.0)
        ));
    }

    #[test]
    fn delete_requires_confirmation() {
        let (mut store, id) = store_with_shop();
        let mut surface: Vec<SurfaceCommand> = Vec::new();
        let mut workflow = Workflow::new();
        workflow.open_for_edit(&store, id, ScreenAnchor::default()).unwrap();

        assert_eq!(workflow.delete(), Ok(DeleteStep::AwaitingConfirmation));
        assert_eq!(
            workflow.resolve_delete(&mut store, &mut surface, false),
            Ok(DeleteStep::Declined)
        );
        assert_eq!(store.len(), 1);
        assert!(workflow.is_open());
        assert!(surface.is_empty());

        workflow.delete().unwrap();
        let step = workflow.resolve_delete(&mut store, &mut surface, true).unwrap();
        assert!(matches!(step, DeleteStep::Deleted(pin) if pin.id() == id));
        assert!(store.is_empty());
        assert_eq!(surface, vec![SurfaceCommand::Remove(id)]);
        assert!(!workflow.is_open());
    }

    #[test]
    fn resolve_delete_without_request_is_rejected() {
        let (mut store, id) = store_with_shop();
        let mut workflow = Workflow::new();
        let mut surface: Vec<SurfaceCommand> = Vec::new();
        assert_eq!(
            workflow.resolve_delete(&mut store, &mut surface, true),
            Err(WorkflowError::NotOpen)
        );
        workflow.open_for_edit(&store, id, ScreenAnchor::default()).unwrap();
        assert_eq!(
            workflow.resolve_delete(&mut store, &mut surface, true),
            Err(WorkflowError::NotEditing)
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_on_create_discards_the_draft() {
        let mut workflow = Workflow::new();
        let request = workflow
            .open_for_create(MapPoint::default(), ScreenAnchor::default())
            .unwrap();
        assert_eq!(workflow.delete(), Ok(DeleteStep::DiscardedDraft));
        assert!(!workflow.is_open());
        assert_eq!(block_on(request), None);
    }

    #[test]
    fn confirm_when_closed_fails() {
        let mut workflow = Workflow::new();
        let result = workflow.confirm(
            &mut PinStore::new(),
            &mut Vec::<SurfaceCommand>::new(),
            PinForm::blank(),
        );
        assert_eq!(result, Err(WorkflowError::NotOpen));
        assert_eq!(workflow.delete(), Err(WorkflowError::NotOpen));
    }

    #[test]
    fn dropping_the_workflow_cancels_pending_create() {
        let mut workflow = Workflow::new();
        let mut request = workflow
            .open_for_create(MapPoint::default(), ScreenAnchor::default())
            .unwrap();
        drop(workflow);
        assert_eq!(request.try_resolve(), Some(None));
    }
}
