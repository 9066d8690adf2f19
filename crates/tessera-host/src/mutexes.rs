//! Host-managed mutexes.
//!
//! Plugins cannot assume a common threading runtime, so the host owns
//! the locks and hands out ids. Named mutexes let independently loaded
//! plugins rendezvous on a shared lock; anonymous ones serve a single
//! plugin's internals. Each lock records its holding thread, and unlock
//! is refused unless the caller is that thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::lock_api::RawMutex as _;
use parking_lot::{Mutex, RawMutex};
use rustc_hash::FxHashMap;

use tessera_core::host::HostError;
use tessera_core::ids::MutexId;

struct LockState {
    raw: RawMutex,
    holder: Mutex<Option<ThreadId>>,
}

struct Entry {
    name: Option<String>,
    state: Arc<LockState>,
}

struct Inner {
    by_id: FxHashMap<MutexId, Entry>,
    by_name: FxHashMap<String, MutexId>,
}

/// Thread-safe table of host-managed mutexes.
pub struct MutexService {
    inner: Mutex<Inner>,
    next_id: AtomicU64,
}

impl MutexService {
    /// Creates an empty table.
    pub fn new() -> Self {
        MutexService {
            inner: Mutex::new(Inner {
                by_id: FxHashMap::default(),
                by_name: FxHashMap::default(),
            }),
            next_id: AtomicU64::new(1),
        }
    }

    /// Creates a mutex, optionally published under `name`. Creating an
    /// already-published name returns the existing mutex.
    pub fn create(&self, name: Option<&str>) -> MutexId {
        let mut inner = self.inner.lock();
        if let Some(name) = name {
            if let Some(&id) = inner.by_name.get(name) {
                return id;
            }
        }
        let id = MutexId(self.next_id.fetch_add(1, Ordering::Relaxed));
        inner.by_id.insert(
            id,
            Entry {
                name: name.map(str::to_string),
                state: Arc::new(LockState {
                    raw: RawMutex::INIT,
                    holder: Mutex::new(None),
                }),
            },
        );
        if let Some(name) = name {
            inner.by_name.insert(name.to_string(), id);
        }
        id
    }

    /// Removes a mutex from the table. Callers must ensure no thread
    /// still holds or waits on it.
    pub fn destroy(&self, id: MutexId) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        let entry = inner.by_id.remove(&id).ok_or(HostError::UnknownMutex(id))?;
        if entry.state.holder.lock().is_some() {
            log::warn!("mutex {} destroyed while locked", id.0);
        }
        if let Some(name) = entry.name {
            inner.by_name.remove(&name);
        }
        Ok(())
    }

    /// Finds a published mutex by name.
    pub fn find_by_name(&self, name: &str) -> Option<MutexId> {
        self.inner.lock().by_name.get(name).copied()
    }

    /// Blocks until the mutex is acquired.
    pub fn lock(&self, id: MutexId) -> Result<(), HostError> {
        let state = {
            let inner = self.inner.lock();
            inner
                .by_id
                .get(&id)
                .ok_or(HostError::UnknownMutex(id))?
                .state
                .clone()
        };
        // The table lock is dropped before blocking so other mutexes
        // stay usable while this one is contended.
        state.raw.lock();
        *state.holder.lock() = Some(thread::current().id());
        Ok(())
    }

    /// Releases the mutex. Refused with [`HostError::MutexNotLocked`]
    /// unless the calling thread is the recorded holder.
    pub fn unlock(&self, id: MutexId) -> Result<(), HostError> {
        let state = {
            let inner = self.inner.lock();
            inner
                .by_id
                .get(&id)
                .ok_or(HostError::UnknownMutex(id))?
                .state
                .clone()
        };
        {
            let mut holder = state.holder.lock();
            if *holder != Some(thread::current().id()) {
                return Err(HostError::MutexNotLocked(id));
            }
            *holder = None;
        }
        // Held by this thread per the holder record we just cleared.
        unsafe { state.raw.unlock() };
        Ok(())
    }
}

impl Default for MutexService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;
    use std::sync::mpsc;

    #[test]
    fn test_lock_unlock_round_trip() {
        let svc = MutexService::new();
        let id = svc.create(None);
        svc.lock(id).unwrap();
        svc.unlock(id).unwrap();
        assert!(matches!(
            svc.unlock(id),
            Err(HostError::MutexNotLocked(_))
        ));
        svc.destroy(id).unwrap();
    }

    #[test]
    fn test_named_mutex_rendezvous() {
        let svc = MutexService::new();
        let a = svc.create(Some("audio_engine"));
        let b = svc.create(Some("audio_engine"));
        assert_eq!(a, b);
        assert_eq!(svc.find_by_name("audio_engine"), Some(a));
        assert_eq!(svc.find_by_name("missing"), None);
    }

    #[test]
    fn test_unknown_id_refused() {
        let svc = MutexService::new();
        assert!(matches!(
            svc.lock(MutexId(404)),
            Err(HostError::UnknownMutex(_))
        ));
        assert!(matches!(
            svc.destroy(MutexId(404)),
            Err(HostError::UnknownMutex(_))
        ));
    }

    #[test]
    fn test_unlock_refused_for_non_holder_thread() {
        let svc = Arc::new(MutexService::new());
        let id = svc.create(None);

        let (locked_tx, locked_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let holder = {
            let svc = svc.clone();
            thread::spawn(move || {
                svc.lock(id).unwrap();
                locked_tx.send(()).unwrap();
                release_rx.recv().unwrap();
                svc.unlock(id).unwrap();
            })
        };

        locked_rx.recv().unwrap();
        // Another thread holds the lock, so this thread may not release it.
        assert!(matches!(
            svc.unlock(id),
            Err(HostError::MutexNotLocked(_))
        ));
        release_tx.send(()).unwrap();
        holder.join().unwrap();

        // The holder released it; now this thread can take and drop it.
        svc.lock(id).unwrap();
        svc.unlock(id).unwrap();
    }

    #[test]
    fn test_mutual_exclusion_across_threads() {
        static COUNTER: AtomicI32 = AtomicI32::new(0);
        let svc = Arc::new(MutexService::new());
        let id = svc.create(Some("shared"));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let svc = svc.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    svc.lock(id).unwrap();
                    let v = COUNTER.load(Ordering::Relaxed);
                    COUNTER.store(v + 1, Ordering::Relaxed);
                    svc.unlock(id).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(COUNTER.load(Ordering::Relaxed), 400);
    }
}
