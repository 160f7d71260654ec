//! Process-wide document list shared by every view.
//!
//! Writers never patch a record in place: they read the current list, build a
//! new one and hand it back through [`DocumentRegistry::replace_all`], which
//! swaps the shared pointer in one step.

use crate::{DocumentId, DocumentRecord};
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate document id: {0}")]
    DuplicateId(DocumentId),
}

#[derive(Debug, Clone)]
pub struct DocumentRegistry {
    documents: Arc<RwLock<Arc<[DocumentRecord]>>>,
}

impl Default for DocumentRegistry {
    fn default() -> Self {
        Self { documents: Arc::new(RwLock::new(Vec::new().into())) }
    }
}

impl DocumentRegistry {
    pub fn new(documents: Vec<DocumentRecord>) -> Result<Self, RegistryError> {
        ensure_unique(&documents)?;
        Ok(Self { documents: Arc::new(RwLock::new(documents.into())) })
    }

    /// Current list. The returned slice never changes; later writes publish a
    /// new list instead.
    pub fn list(&self) -> Arc<[DocumentRecord]> {
        self.documents.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn find(&self, id: &DocumentId) -> Option<DocumentRecord> {
        self.list().iter().find(|record| &record.id == id).cloned()
    }

    /// Replace the whole list. Last write wins.
    pub fn replace_all(&self, documents: Vec<DocumentRecord>) -> Result<(), RegistryError> {
        ensure_unique(&documents)?;

        let next: Arc<[DocumentRecord]> = documents.into();
        tracing::debug!(count = next.len(), "replacing document registry");
        *self.documents.write().unwrap_or_else(PoisonError::into_inner) = next;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.list().is_empty()
    }
}

/// Copy of `documents` with the entry sharing `record.id` swapped for
/// `record`. Every other entry passes through untouched, in order.
pub fn replace_record(documents: &[DocumentRecord], record: &DocumentRecord) -> Vec<DocumentRecord> {
    documents
        .iter()
        .map(|existing| if existing.id == record.id { record.clone() } else { existing.clone() })
        .collect()
}

fn ensure_unique(documents: &[DocumentRecord]) -> Result<(), RegistryError> {
    let mut seen = HashSet::with_capacity(documents.len());
    for record in documents {
        if !seen.insert(&record.id) {
            return Err(RegistryError::DuplicateId(record.id.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileType;

    fn seed() -> Vec<DocumentRecord> {
        vec![
            DocumentRecord::new("1", "a.pdf", "/a.pdf", FileType::Pdf),
            DocumentRecord::new("2", "b.docx", "/b.docx", FileType::Docx),
            DocumentRecord::new("3", "c.xlsx", "/c.xlsx", FileType::Xlsx),
        ]
    }

    #[test]
    fn find_returns_matching_record() {
        let registry = DocumentRegistry::new(seed()).expect("seed should be valid");

        let found = registry.find(&DocumentId::from("2")).expect("record expected");
        assert_eq!(found.name, "b.docx");
        assert!(registry.find(&DocumentId::from("9")).is_none());
    }

    #[test]
    fn clones_share_the_same_list() {
        let registry = DocumentRegistry::new(seed()).expect("seed should be valid");
        let other_view = registry.clone();

        registry.replace_all(seed()[..1].to_vec()).expect("replace should succeed");

        assert_eq!(other_view.len(), 1);
    }

    #[test]
    fn earlier_reads_are_not_affected_by_replace() {
        let registry = DocumentRegistry::new(seed()).expect("seed should be valid");
        let before = registry.list();

        registry.replace_all(Vec::new()).expect("replace should succeed");

        assert_eq!(before.len(), 3);
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected_without_touching_the_list() {
        let registry = DocumentRegistry::new(seed()).expect("seed should be valid");
        let mut documents = seed();
        documents.push(DocumentRecord::new("1", "dup.pdf", "/dup.pdf", FileType::Pdf));

        let result = registry.replace_all(documents);

        assert_eq!(result, Err(RegistryError::DuplicateId(DocumentId::from("1"))));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn replace_record_only_changes_the_target() {
        let documents = seed();
        let updated = documents[1].with_metadata("sam", "review");

        let next = replace_record(&documents, &updated);

        assert_eq!(next.len(), documents.len());
        assert_eq!(next[0], documents[0]);
        assert_eq!(next[1], updated);
        assert_eq!(next[2], documents[2]);
    }
}
