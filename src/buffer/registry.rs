//! Name lookup for shared buffers and per-object buffer bindings.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};

use spin::{Mutex, RwLock};

use super::SharedBuffer;

/// Named buffers known to the host. Control thread only.
#[derive(Debug, Default)]
pub struct BufferRegistry {
    buffers: RwLock<BTreeMap<String, Arc<SharedBuffer>>>,
}

impl BufferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `buffer` under `name`, returning the buffer it replaces.
    pub fn insert(&self, name: &str, buffer: Arc<SharedBuffer>) -> Option<Arc<SharedBuffer>> {
        self.buffers.write().insert(name.to_string(), buffer)
    }

    pub fn remove(&self, name: &str) -> Option<Arc<SharedBuffer>> {
        self.buffers.write().remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<SharedBuffer>> {
        self.buffers.read().get(name).cloned()
    }
}

/// The buffer an object reads from, bound by name.
///
/// Rebinding happens on the control thread. The audio thread only ever tries
/// the lock and treats contention as an unbound buffer for that block.
#[derive(Debug, Default)]
pub struct BufferBinding {
    name: Mutex<String>,
    buffer: Mutex<Option<Arc<SharedBuffer>>>,
    generation: AtomicU64,
}

impl BufferBinding {
    pub fn new(name: &str) -> Self {
        Self {
            name: Mutex::new(name.to_string()),
            buffer: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Bind to the buffer called `name`. An unknown or empty name unbinds.
    ///
    /// Returns true if a buffer was found.
    pub fn set(&self, name: &str, registry: &BufferRegistry) -> bool {
        *self.name.lock() = name.to_string();
        self.resolve(registry)
    }

    /// Look the stored name up again, e.g. after the buffer was replaced.
    pub fn resolve(&self, registry: &BufferRegistry) -> bool {
        let name = self.name.lock().clone();
        let found = if name.is_empty() {
            log::warn!("no buffer specified");
            None
        } else {
            let found = registry.get(&name);
            if found.is_none() {
                log::warn!("no buffer {name}");
            }
            found
        };
        let bound = found.is_some();
        let mut slot = self.buffer.lock();
        // The previous buffer is dropped here, outside the audio thread.
        let _previous = core::mem::replace(&mut *slot, found);
        // Bumped while the slot is locked.
        self.generation.fetch_add(1, Ordering::Release);
        drop(slot);
        bound
    }

    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    /// Counter bumped on every rebind. Read it inside [`Self::with_buffer`]
    /// to get the generation of the buffer passed to the closure.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn is_bound(&self) -> bool {
        self.buffer.lock().is_some()
    }

    /// Run `f` with the bound buffer. Audio thread safe: never blocks.
    #[inline]
    pub fn with_buffer<R>(&self, f: impl FnOnce(Option<&SharedBuffer>) -> R) -> R {
        match self.buffer.try_lock() {
            Some(guard) => f(guard.as_deref()),
            None => f(None),
        }
    }
}
