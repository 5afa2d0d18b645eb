//! Generated-type cache with single-flight creation
//!
//! One slot per originating class. The first requester creates the generated
//! type while concurrent requesters for the same class block on the slot and
//! receive the same result. A failed creation leaves the slot empty, so the
//! next request runs creation again and fails the same way.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::vm::{Class, ClassId};

/// Originating class paired with its generated type
#[derive(Debug, Clone)]
pub struct GeneratedTypeRecord {
    /// The proxied class
    pub origin: Arc<Class>,
    /// The generated proxy type
    pub generated: Arc<Class>,
    /// Cache generation the record was created in
    pub generation: u64,
}

type Slot = Arc<OnceCell<GeneratedTypeRecord>>;

/// Per-class cache of generated types
#[derive(Debug, Default)]
pub struct TypeCache {
    slots: Mutex<FxHashMap<ClassId, Slot>>,
    generation: AtomicU64,
}

impl TypeCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached record for `class`, running `create` at most once
    /// concurrently per class on a miss
    pub fn get_or_create<F, E>(&self, class: &Arc<Class>, create: F) -> Result<GeneratedTypeRecord, E>
    where
        F: FnOnce() -> Result<Arc<Class>, E>,
    {
        let slot = self.slot(class.id());
        if let Some(record) = slot.get() {
            debug!(target_type = %class.name(), "type cache hit");
            return Ok(record.clone());
        }

        let generation = self.generation();
        let result = slot.get_or_try_init(|| {
            debug!(target_type = %class.name(), generation, "type cache miss");
            create().map(|generated| GeneratedTypeRecord {
                origin: class.clone(),
                generated,
                generation,
            })
        });

        match result {
            Ok(record) => Ok(record.clone()),
            Err(err) => {
                self.discard_empty(class.id(), &slot);
                Err(err)
            }
        }
    }

    /// Cached record for `class`, if any
    pub fn get(&self, class: &Class) -> Option<GeneratedTypeRecord> {
        self.slots
            .lock()
            .get(&class.id())
            .and_then(|slot| slot.get().cloned())
    }

    /// Forget the record for `class`; returns whether one was cached
    pub fn invalidate(&self, class: &Class) -> bool {
        let removed = self.slots.lock().remove(&class.id());
        debug!(target_type = %class.name(), "type cache invalidate");
        removed.is_some_and(|slot| slot.get().is_some())
    }

    /// Forget every record and start a new generation
    pub fn clear(&self) {
        self.slots.lock().clear();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "type cache cleared");
    }

    /// Current generation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Number of cached records
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, id: ClassId) -> Slot {
        self.slots.lock().entry(id).or_default().clone()
    }

    fn discard_empty(&self, id: ClassId, slot: &Slot) {
        let mut slots = self.slots.lock();
        let ours = slots
            .get(&id)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && current.get().is_none());
        if ours {
            slots.remove(&id);
        }
    }
}
