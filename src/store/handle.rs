//! Thread-safe object handles: capture on the reading context, resolve
//! inside the write transaction. An object that was never persisted has
//! no record to re-find, so its handle just re-supplies the captured
//! instance.

use super::{Datastore, Record, StoreError, Transaction};
use uuid::Uuid;

/// An owning-context-bound handle to a record, convertible back to a
/// live copy only inside a transaction.
pub struct ObjectHandle<T: Record> {
    object: T,
    /// `Some` when the object had a persisted record at capture time.
    reference: Option<Uuid>,
}

impl<T: Record> ObjectHandle<T> {
    /// Capture a handle on the caller's context.
    pub fn capture(store: &Datastore, object: &T) -> ObjectHandle<T> {
        let reference = store.is_persisted(object).then(|| object.id());
        ObjectHandle {
            object: object.clone(),
            reference,
        }
    }

    /// Resolve to a live, transaction-bound copy. `None` when the record
    /// was persisted at capture time but has since been deleted.
    pub fn resolve(&self, txn: &mut Transaction<'_>) -> Result<Option<T>, StoreError> {
        match self.reference {
            Some(id) => txn.get(id),
            None => Ok(Some(self.object.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreConfig;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
    struct Tag {
        id: Uuid,
        label: String,
    }

    impl Record for Tag {
        const KIND: &'static str = "tags";

        fn id(&self) -> Uuid {
            self.id
        }
    }

    fn tag(label: &str) -> Tag {
        Tag {
            id: Uuid::new_v4(),
            label: label.to_string(),
        }
    }

    #[tokio::test]
    async fn test_unpersisted_handle_resupplies_the_instance() {
        let dir = TempDir::new().unwrap();
        let store = Datastore::open(StoreConfig::new(dir.path()));
        let fresh = tag("fresh");

        let expected = fresh.clone();
        store
            .write_object(&fresh, move |_txn, live| {
                assert_eq!(live, Some(expected));
                Ok(())
            })
            .wait()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_persisted_handle_resolves_live_record() {
        let dir = TempDir::new().unwrap();
        let store = Datastore::open(StoreConfig::new(dir.path()));
        let saved = tag("saved");

        let original = saved.clone();
        store
            .write(move |txn| txn.put(&original))
            .wait()
            .await
            .unwrap();

        // Mutate through the handle path and persist the change.
        store
            .write_object(&saved, |txn, live| {
                let mut live = live.expect("record resolves");
                live.label = "renamed".to_string();
                txn.put(&live)
            })
            .wait()
            .await
            .unwrap();

        let mut results = store.read_all::<Tag>().unwrap();
        assert_eq!(results.items()[0].label, "renamed");
    }

    #[tokio::test]
    async fn test_handle_captured_before_deletion_resolves_to_none() {
        let dir = TempDir::new().unwrap();
        let store = Datastore::open(StoreConfig::new(dir.path()));
        let doomed = tag("doomed");
        let id = doomed.id;

        let original = doomed.clone();
        store
            .write(move |txn| txn.put(&original))
            .wait()
            .await
            .unwrap();

        // Capture while the record exists, delete, then resolve: the
        // handle refers to a record that is no longer there.
        let handle = ObjectHandle::capture(&store, &doomed);
        store
            .write(move |txn| txn.delete::<Tag>(id).map(|_| ()))
            .wait()
            .await
            .unwrap();

        store
            .write(move |txn| {
                assert_eq!(handle.resolve(txn)?, None);
                Ok(())
            })
            .wait()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_batch_resolve_drops_missing_records() {
        let dir = TempDir::new().unwrap();
        let store = Datastore::open(StoreConfig::new(dir.path()));
        let kept = tag("kept");
        let gone = tag("gone");
        let gone_id = gone.id;

        let (a, b) = (kept.clone(), gone.clone());
        store
            .write(move |txn| {
                txn.put(&a)?;
                txn.put(&b)
            })
            .wait()
            .await
            .unwrap();

        let handles = vec![
            ObjectHandle::capture(&store, &kept),
            ObjectHandle::capture(&store, &gone),
        ];
        store
            .write(move |txn| txn.delete::<Tag>(gone_id).map(|_| ()))
            .wait()
            .await
            .unwrap();

        store
            .write(move |txn| {
                let mut live = Vec::new();
                for handle in &handles {
                    if let Some(object) = handle.resolve(txn)? {
                        live.push(object);
                    }
                }
                assert_eq!(live.len(), 1);
                assert_eq!(live[0].label, "kept");
                Ok(())
            })
            .wait()
            .await
            .unwrap();
    }
}
