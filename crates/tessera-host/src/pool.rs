//! Object pools for recycling short-lived component instances.
//!
//! One pool exists per (class, hint) pair. A released instance is
//! parked in its slot rather than freed; the next acquisition for the
//! same pair takes the parked box, resets it to fresh-construction
//! state, and hands it back out without touching the heap. Each pool's
//! slot count is capped by the class's priority tier; acquisitions past
//! the cap report exhaustion and the host falls back to plain heap
//! allocation.

use rustc_hash::FxHashMap;

use tessera_core::component::{
    Component, ComponentBox, PoolHandle, PoolHint, PoolPriority, ValidationTag,
};
use tessera_core::host::HostError;
use tessera_core::ids::ClassId;

/// Slot budget for each priority tier.
fn capacity_for(priority: PoolPriority) -> u32 {
    match priority {
        PoolPriority::Low => 16,
        PoolPriority::Medium => 32,
        PoolPriority::High => 64,
    }
}

/// Outcome of a pooled acquisition.
pub enum PoolAcquire {
    /// A parked instance was recycled; no heap allocation happened.
    Recycled(ComponentBox),
    /// A fresh instance was heap-allocated into a new pool slot.
    Fresh(ComponentBox),
    /// Every slot is checked out; the caller should heap-allocate an
    /// unpooled instance.
    Exhausted,
}

struct Pool {
    capacity: u32,
    /// Parked boxes by slot; `None` while the slot's object is checked
    /// out.
    slots: Vec<Option<ComponentBox>>,
    free: Vec<u32>,
}

/// All pools of one host, keyed by (class, hint).
pub struct ObjectPool {
    pools: Vec<Pool>,
    by_key: FxHashMap<(ClassId, PoolHint), u16>,
    recycled: u64,
}

/// Aggregate pool counters, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of (class, hint) pools created so far.
    pub pools: usize,
    /// Parked instances across all pools.
    pub parked: usize,
    /// Lifetime count of recycled acquisitions.
    pub recycled: u64,
}

impl ObjectPool {
    /// Creates an empty pool set.
    pub fn new() -> Self {
        ObjectPool {
            pools: Vec::new(),
            by_key: FxHashMap::default(),
            recycled: 0,
        }
    }

    fn pool_index(&mut self, class_id: ClassId, hint: PoolHint, priority: PoolPriority) -> u16 {
        match self.by_key.get(&(class_id, hint)) {
            Some(&idx) => idx,
            None => {
                let idx = self.pools.len() as u16;
                self.pools.push(Pool {
                    capacity: capacity_for(priority),
                    slots: Vec::new(),
                    free: Vec::new(),
                });
                self.by_key.insert((class_id, hint), idx);
                idx
            }
        }
    }

    /// Acquires an instance of `class_id` from its (class, hint) pool.
    ///
    /// Recycled instances are reset via [`Component::reinit`] and
    /// re-tagged live before they are handed out, so callers never see
    /// state from a slot's previous occupant.
    pub fn acquire(
        &mut self,
        class_id: ClassId,
        hint: PoolHint,
        priority: PoolPriority,
        template: &dyn Component,
    ) -> PoolAcquire {
        let pool_id = self.pool_index(class_id, hint, priority);
        let pool = &mut self.pools[pool_id as usize];

        if let Some(slot) = pool.free.pop() {
            // Checked-out slots are None; a freed slot always holds a box.
            if let Some(mut obj) = pool.slots[slot as usize].take() {
                obj.reinit();
                obj.header_mut().set_tag(ValidationTag::Valid);
                obj.header_mut()
                    .set_pool_handle(Some(PoolHandle { pool_id, slot }));
                self.recycled += 1;
                return PoolAcquire::Recycled(obj);
            }
        }

        if (pool.slots.len() as u32) < pool.capacity {
            let slot = pool.slots.len() as u32;
            pool.slots.push(None);
            let mut obj = template.spawn();
            obj.header_mut()
                .set_pool_handle(Some(PoolHandle { pool_id, slot }));
            return PoolAcquire::Fresh(obj);
        }

        PoolAcquire::Exhausted
    }

    /// Parks a released instance back into its slot.
    ///
    /// The host has already finalized the instance and stamped its tag
    /// invalid; the pool only validates the handle and stores the box.
    pub fn release(&mut self, obj: ComponentBox, handle: PoolHandle) -> Result<(), HostError> {
        let pool = self
            .pools
            .get_mut(handle.pool_id as usize)
            .ok_or(HostError::BadPoolHandle)?;
        let slot = pool
            .slots
            .get_mut(handle.slot as usize)
            .ok_or(HostError::BadPoolHandle)?;
        if slot.is_some() {
            return Err(HostError::BadPoolHandle);
        }
        *slot = Some(obj);
        pool.free.push(handle.slot);
        Ok(())
    }

    /// Number of parked instances in one (class, hint) pool.
    pub fn free_slot_count(&self, class_id: ClassId, hint: PoolHint) -> usize {
        self.by_key
            .get(&(class_id, hint))
            .map(|&idx| self.pools[idx as usize].free.len())
            .unwrap_or(0)
    }

    /// Aggregate counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            pools: self.pools.len(),
            parked: self.pools.iter().map(|p| p.free.len()).sum(),
            recycled: self.recycled,
        }
    }
}

impl Default for ObjectPool {
    fn default() -> Self {
        Self::new()
    }
}
