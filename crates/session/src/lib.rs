//! Editing state for one open document.
//!
//! A session loads a document from the registry and its saved snapshot, lets
//! the user change shapes and form fields freely, and on save writes the
//! snapshot and publishes the updated record back to the registry.

use doc_model::{
    replace_record, DocumentId, DocumentRecord, DocumentRegistry, Position, RegistryError, Shape,
    Size, Snapshot,
};
use std::fmt;
use std::rc::Rc;
use storage::{SnapshotStore, StorageError};
use viewer_core::{OverlayHeight, OverlaySizer, ResizeEvents, ViewerSource, ViewerSurface};

mod navigation;

pub use navigation::{Navigator, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unloaded,
    NotFound,
    Loaded,
    Editing,
    Saved,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no document is open")]
    NoDocument,
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
    #[error("registry update rejected: {0}")]
    Registry(#[from] RegistryError),
}

/// Result of a save attempt, shown to the user as an acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    NothingToSave,
}

impl fmt::Display for SaveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saved => f.write_str("data saved"),
            Self::NothingToSave => f.write_str("nothing to save"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditAction {
    SetComment(String),
    SetAssign(String),
    SetStatus(String),
    AddShape(Shape),
    MoveShape { index: usize, position: Position },
    ResizeShape { index: usize, size: Size },
    SetShapeText { index: usize, text: String },
    RemoveShape { index: usize },
    ReplaceShapes(Vec<Shape>),
    ClearShapes,
}

pub fn apply_edit_action(state: &mut Snapshot, action: EditAction) {
    match action {
        EditAction::SetComment(comment) => state.comment = comment,
        EditAction::SetAssign(assign) => state.assign = assign,
        EditAction::SetStatus(status) => state.status = status,
        EditAction::AddShape(shape) => state.shapes.push(shape),
        EditAction::MoveShape { index, position } => {
            if let Some(shape) = state.shapes.get_mut(index) {
                shape.position = position;
            }
        }
        EditAction::ResizeShape { index, size } => {
            if let Some(shape) = state.shapes.get_mut(index) {
                shape.size = size;
            }
        }
        EditAction::SetShapeText { index, text } => {
            if let Some(shape) = state.shapes.get_mut(index) {
                shape.text = text;
            }
        }
        EditAction::RemoveShape { index } => {
            if index < state.shapes.len() {
                state.shapes.remove(index);
            }
        }
        EditAction::ReplaceShapes(shapes) => state.shapes = shapes,
        EditAction::ClearShapes => state.shapes.clear(),
    }
}

#[derive(Debug)]
struct OpenDocument {
    record: DocumentRecord,
    edits: Snapshot,
    sizer: OverlaySizer,
}

pub struct AnnotationSession<S> {
    registry: DocumentRegistry,
    store: S,
    events: ResizeEvents,
    surface: Rc<dyn ViewerSurface>,
    phase: SessionPhase,
    requested: Option<DocumentId>,
    open: Option<OpenDocument>,
}

impl<S: fmt::Debug> fmt::Debug for AnnotationSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationSession")
            .field("store", &self.store)
            .field("phase", &self.phase)
            .field("requested", &self.requested)
            .field("open", &self.open)
            .finish_non_exhaustive()
    }
}

impl<S: SnapshotStore> AnnotationSession<S> {
    pub fn new(
        registry: DocumentRegistry,
        store: S,
        events: ResizeEvents,
        surface: Rc<dyn ViewerSurface>,
    ) -> Self {
        Self {
            registry,
            store,
            events,
            surface,
            phase: SessionPhase::Unloaded,
            requested: None,
            open: None,
        }
    }

    /// Load `id`, dropping whatever was open before without saving it.
    ///
    /// Record metadata is applied first and a saved snapshot, when there is
    /// one, replaces it. A snapshot that cannot be parsed is ignored. Any
    /// other storage failure leaves the session unloaded.
    pub fn open(&mut self, id: impl Into<DocumentId>) -> Result<SessionPhase, SessionError> {
        let id = id.into();
        self.close();

        let Some(record) = self.registry.find(&id) else {
            tracing::debug!(%id, "document not in registry");
            self.requested = Some(id);
            self.phase = SessionPhase::NotFound;
            return Ok(self.phase);
        };

        let mut edits = Snapshot {
            assign: record.assign.clone().unwrap_or_default(),
            status: record.status.clone().unwrap_or_default(),
            ..Snapshot::default()
        };

        match self.store.get(&id) {
            Ok(Some(saved)) => edits = saved,
            Ok(None) => {}
            Err(StorageError::Malformed { key, source }) => {
                tracing::warn!(%key, error = %source, "ignoring unreadable snapshot");
            }
            Err(error) => return Err(error.into()),
        }

        self.surface.show(&ViewerSource::from(&record));
        let sizer = OverlaySizer::attach(&self.events, Rc::clone(&self.surface), record.file_type);

        tracing::debug!(%id, shapes = edits.shapes.len(), "document loaded");
        self.requested = Some(id);
        self.open = Some(OpenDocument { record, edits, sizer });
        self.phase = SessionPhase::Loaded;
        Ok(self.phase)
    }

    /// End the session. Unsaved edits are dropped and the overlay stops
    /// listening for resizes.
    pub fn close(&mut self) {
        self.open = None;
        self.requested = None;
        self.phase = SessionPhase::Unloaded;
    }

    pub fn apply(&mut self, action: EditAction) -> Result<(), SessionError> {
        let open = self.open.as_mut().ok_or(SessionError::NoDocument)?;
        apply_edit_action(&mut open.edits, action);
        self.phase = SessionPhase::Editing;
        Ok(())
    }

    /// Commit the current edits to the snapshot store and the registry.
    ///
    /// With nothing to save neither store is touched. The registry is only
    /// updated after the snapshot write succeeded.
    pub fn save(&mut self) -> Result<SaveOutcome, SessionError> {
        let open = self.open.as_mut().ok_or(SessionError::NoDocument)?;

        if !open.edits.has_content() {
            tracing::info!(id = %open.record.id, "nothing to save");
            return Ok(SaveOutcome::NothingToSave);
        }

        let updated = open.record.with_metadata(&open.edits.assign, &open.edits.status);
        let current = self.registry.list();
        if !current.iter().any(|record| record.id == updated.id) {
            tracing::warn!(id = %updated.id, "document left the registry while open");
        }
        let next = replace_record(&current, &updated);

        self.store.put(&updated.id, &open.edits)?;
        self.registry.replace_all(next)?;

        tracing::info!(id = %updated.id, shapes = open.edits.shapes.len(), "document saved");
        open.record = updated;
        self.phase = SessionPhase::Saved;
        Ok(SaveOutcome::Saved)
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Id of the last `open` call, also set when it was not found.
    pub fn requested_id(&self) -> Option<&DocumentId> {
        self.requested.as_ref()
    }

    pub fn document(&self) -> Option<&DocumentRecord> {
        self.open.as_ref().map(|open| &open.record)
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.open.as_ref().map(|open| &open.edits)
    }

    pub fn shapes(&self) -> &[Shape] {
        self.snapshot().map(|edits| edits.shapes.as_slice()).unwrap_or_default()
    }

    pub fn comment(&self) -> &str {
        self.snapshot().map(|edits| edits.comment.as_str()).unwrap_or_default()
    }

    pub fn assign(&self) -> &str {
        self.snapshot().map(|edits| edits.assign.as_str()).unwrap_or_default()
    }

    pub fn status(&self) -> &str {
        self.snapshot().map(|edits| edits.status.as_str()).unwrap_or_default()
    }

    pub fn overlay_height(&self) -> OverlayHeight {
        self.open.as_ref().map(|open| open.sizer.height()).unwrap_or_default()
    }

    pub fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn resize_events(&self) -> &ResizeEvents {
        &self.events
    }
}
