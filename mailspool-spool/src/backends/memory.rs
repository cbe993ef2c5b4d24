use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, PoisonError, RwLock},
};

use async_trait::async_trait;
use mailspool_common::Message;

use crate::{SpoolError, r#trait::BackingStore, types::SpooledMessageId};

#[derive(Debug, Default)]
struct Queue {
    queued: BTreeMap<SpooledMessageId, Message>,
    claimed: HashSet<SpooledMessageId>,
}

impl Queue {
    fn held(&self) -> usize {
        self.queued.len() + self.claimed.len()
    }
}

/// In-memory backing store implementation
///
/// Messages live in an ordered map keyed by their (monotonic) ID, so iteration
/// order is enqueue order. Nothing survives the process; this is the store the
/// end-of-request flush trigger drains.
///
/// # Capacity Management
/// The store can be configured with a maximum capacity to prevent unbounded
/// memory growth. Claimed messages count towards the capacity until they are
/// completed. When capacity is reached, write operations fail with
/// [`SpoolError::CapacityExceeded`].
///
/// # Concurrency
/// Clones share the same queue. A single `RwLock` guards both the queue and
/// the claim set, so a claim is atomic with respect to other flushers.
#[derive(Debug, Clone)]
pub struct MemoryBackingStore {
    queue: Arc<RwLock<Queue>>,
    /// Maximum number of messages to store (None = unlimited)
    capacity: Option<usize>,
}

impl MemoryBackingStore {
    /// Create a new empty memory-backed store with unlimited capacity
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Arc::new(RwLock::new(Queue::default())),
            capacity: None,
        }
    }

    /// Create a new memory-backed store with a capacity limit
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: Arc::new(RwLock::new(Queue::default())),
            capacity: Some(capacity),
        }
    }

    /// Get the current number of queued messages
    ///
    /// Recovers gracefully if the lock is poisoned by accessing the underlying data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .queued
            .len()
    }

    /// Check if the store has no queued messages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the configured capacity (None = unlimited)
    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Snapshot of queued messages, in order
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.queue
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .queued
            .values()
            .cloned()
            .collect()
    }

    /// Drop every queued message
    pub fn clear(&self) {
        self.queue
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .queued
            .clear();
    }
}

impl Default for MemoryBackingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackingStore for MemoryBackingStore {
    async fn write(&self, message: &Message) -> crate::Result<SpooledMessageId> {
        let mut queue = self.queue.write()?;

        if let Some(capacity) = self.capacity
            && queue.held() >= capacity
        {
            return Err(SpoolError::CapacityExceeded {
                len: queue.held(),
                capacity,
            });
        }

        let id = SpooledMessageId::generate();
        queue.queued.insert(id.clone(), message.clone());

        Ok(id)
    }

    async fn list(&self) -> crate::Result<Vec<SpooledMessageId>> {
        Ok(self.queue.read()?.queued.keys().cloned().collect())
    }

    async fn read(&self, id: &SpooledMessageId) -> crate::Result<Message> {
        self.queue
            .read()?
            .queued
            .get(id)
            .cloned()
            .ok_or_else(|| SpoolError::NotFound(id.clone()))
    }

    async fn claim(&self, id: &SpooledMessageId) -> crate::Result<Option<Message>> {
        let mut queue = self.queue.write()?;

        let Some(message) = queue.queued.remove(id) else {
            return Ok(None);
        };
        queue.claimed.insert(id.clone());

        Ok(Some(message))
    }

    async fn release(&self, id: &SpooledMessageId, message: Message) -> crate::Result<()> {
        let mut queue = self.queue.write()?;

        if !queue.claimed.remove(id) {
            return Err(SpoolError::NotFound(id.clone()));
        }
        queue.queued.insert(id.clone(), message);

        Ok(())
    }

    async fn complete(&self, id: &SpooledMessageId) -> crate::Result<()> {
        if self.queue.write()?.claimed.remove(id) {
            Ok(())
        } else {
            Err(SpoolError::NotFound(id.clone()))
        }
    }

    async fn len(&self) -> crate::Result<usize> {
        Ok(self.queue.read()?.queued.len())
    }
}
