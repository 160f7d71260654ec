//! View history for the shell. Going back re-enters the previous view without
//! writing anything.

use crate::{AnnotationSession, SessionError, SessionPhase};
use doc_model::DocumentId;
use storage::SnapshotStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Library,
    Document(DocumentId),
}

#[derive(Debug)]
pub struct Navigator<S> {
    session: AnnotationSession<S>,
    history: Vec<View>,
}

impl<S: SnapshotStore> Navigator<S> {
    pub fn new(session: AnnotationSession<S>) -> Self {
        Self { session, history: vec![View::Library] }
    }

    pub fn current(&self) -> &View {
        self.history.last().unwrap_or(&View::Library)
    }

    pub fn session(&self) -> &AnnotationSession<S> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut AnnotationSession<S> {
        &mut self.session
    }

    pub fn visit(&mut self, view: View) -> Result<SessionPhase, SessionError> {
        self.history.push(view.clone());
        self.enter(view)
    }

    /// Return to the previous view. Returns `Ok(None)` when there is nowhere
    /// to go back to.
    pub fn back(&mut self) -> Result<Option<SessionPhase>, SessionError> {
        if self.history.len() <= 1 {
            return Ok(None);
        }

        self.history.pop();
        let previous = self.current().clone();
        self.enter(previous).map(Some)
    }

    fn enter(&mut self, view: View) -> Result<SessionPhase, SessionError> {
        match view {
            View::Library => {
                self.session.close();
                Ok(self.session.phase())
            }
            View::Document(id) => self.session.open(id),
        }
    }
}
