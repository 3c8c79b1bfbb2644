//! Pending table shared across threads.

use crate::error::PendingError;
use crate::pending::PendingTable;
use parking_lot::Mutex;
use std::sync::Arc;
use wsrpc_protocol::RequestId;

/// A [`PendingTable`] behind a mutex, for callers that issue and resolve
/// calls from different threads.
///
/// Allocation and registration happen under a single lock acquisition, so
/// a concurrent resolver never sees an identifier before its entry exists.
#[derive(Debug)]
pub struct SharedPendingTable<V> {
    inner: Arc<Mutex<PendingTable<V>>>,
}

impl<V> SharedPendingTable<V> {
    pub fn new(table: PendingTable<V>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(table)),
        }
    }

    /// Allocates an identifier and registers `value` atomically.
    pub fn register(&self, value: V) -> Result<RequestId, PendingError> {
        self.inner.lock().register(value)
    }

    pub fn add(&self, id: RequestId, value: V) -> Result<(), PendingError> {
        self.inner.lock().add(id, value)
    }

    /// Resolves `id`; see [`PendingTable::get`].
    pub fn resolve(&self, id: RequestId) -> Result<V, PendingError> {
        self.inner.lock().get(id)
    }

    pub fn cancel(&self, id: RequestId) -> Option<V> {
        self.inner.lock().cancel(id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn drain(&self) -> Vec<(RequestId, V)> {
        self.inner.lock().drain()
    }
}

impl<V> Clone for SharedPendingTable<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Default for SharedPendingTable<V> {
    fn default() -> Self {
        Self::new(PendingTable::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn test_register_resolve_across_threads() {
        let table: SharedPendingTable<usize> = SharedPendingTable::default();
        let (tx, rx) = mpsc::channel();

        let resolver = {
            let table = table.clone();
            thread::spawn(move || {
                let mut resolved = 0;
                for (id, expected) in rx {
                    assert_eq!(table.resolve(id), Ok(expected));
                    resolved += 1;
                }
                resolved
            })
        };

        let issuers: Vec<_> = (0..4)
            .map(|t| {
                let table = table.clone();
                let tx = tx.clone();
                thread::spawn(move || {
                    for i in 0..1000 {
                        let value = t * 1000 + i;
                        let id = table.register(value).unwrap();
                        tx.send((id, value)).unwrap();
                    }
                })
            })
            .collect();
        drop(tx);

        for issuer in issuers {
            issuer.join().unwrap();
        }
        assert_eq!(resolver.join().unwrap(), 4000);
        assert!(table.is_empty());
    }

    #[test]
    fn test_cancel_then_resolve() {
        let table = SharedPendingTable::new(PendingTable::with_id_base(100));
        let id = table.register("slow").unwrap();
        assert_eq!(id, RequestId(101));

        assert_eq!(table.cancel(id), Some("slow"));
        assert_eq!(table.resolve(id), Err(PendingError::NotFound(id)));
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_drain() {
        let table = SharedPendingTable::default();
        table.add(RequestId(5), 'a').unwrap();
        table.add(RequestId(2), 'b').unwrap();
        assert_eq!(table.add(RequestId(5), 'c'), Err(PendingError::DuplicateId(RequestId(5))));

        assert_eq!(table.drain(), vec![(RequestId(5), 'a'), (RequestId(2), 'b')]);
        assert!(table.is_empty());
    }
}
