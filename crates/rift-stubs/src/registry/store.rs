use crate::stub::StubMappingDocument;
use anyhow::Result;
use parking_lot::Mutex;
use uuid::Uuid;

/// Durable storage for stub mapping documents.
///
/// Synchronous: the registry calls it while holding its own lock.
pub trait MappingStore: Send + Sync {
    /// Insert or replace the document with the same uuid
    fn save(&self, doc: &StubMappingDocument) -> Result<()>;

    /// Forget a document. Unknown ids are not an error.
    fn remove(&self, id: Uuid) -> Result<()>;

    /// All stored documents, in the order they were first saved
    fn load_all(&self) -> Result<Vec<StubMappingDocument>>;
}

/// In-memory mapping store. Useful for tests and embedders that persist
/// elsewhere.
#[derive(Debug, Default)]
pub struct InMemoryMappingStore {
    docs: Mutex<Vec<StubMappingDocument>>,
}

impl InMemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MappingStore for InMemoryMappingStore {
    fn save(&self, doc: &StubMappingDocument) -> Result<()> {
        let id = doc
            .uuid
            .ok_or_else(|| anyhow::anyhow!("Cannot store a mapping without a uuid"))?;
        let mut docs = self.docs.lock();
        match docs.iter_mut().find(|d| d.uuid == Some(id)) {
            Some(existing) => *existing = doc.clone(),
            None => docs.push(doc.clone()),
        }
        Ok(())
    }

    fn remove(&self, id: Uuid) -> Result<()> {
        self.docs.lock().retain(|d| d.uuid != Some(id));
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<StubMappingDocument>> {
        Ok(self.docs.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::ResponseDefinition;
    use serde_json::json;

    fn doc(id: u128, status: u16) -> StubMappingDocument {
        StubMappingDocument {
            uuid: Some(Uuid::from_u128(id)),
            request: None,
            new_request: None,
            response: ResponseDefinition::new(json!({"status": status})),
            priority: None,
            scenario_name: None,
            required_scenario_state: None,
            new_scenario_state: None,
        }
    }

    #[test]
    fn test_save_replaces_in_place() {
        let store = InMemoryMappingStore::new();
        store.save(&doc(1, 200)).unwrap();
        store.save(&doc(2, 200)).unwrap();
        store.save(&doc(1, 500)).unwrap();

        let docs = store.load_all().unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].uuid, Some(Uuid::from_u128(1)));
        assert_eq!(docs[0].response.as_value()["status"], json!(500));
    }

    #[test]
    fn test_remove_unknown_is_ok() {
        let store = InMemoryMappingStore::new();
        store.save(&doc(1, 200)).unwrap();
        store.remove(Uuid::from_u128(9)).unwrap();
        store.remove(Uuid::from_u128(1)).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_without_uuid_fails() {
        let store = InMemoryMappingStore::new();
        let mut anonymous = doc(1, 200);
        anonymous.uuid = None;
        assert!(store.save(&anonymous).is_err());
    }

    #[test]
    fn test_store_as_trait_object() {
        let store: std::sync::Arc<dyn MappingStore> = std::sync::Arc::new(InMemoryMappingStore::new());
        store.save(&doc(3, 200)).unwrap();
        assert_eq!(store.load_all().unwrap().len(), 1);
    }
}
