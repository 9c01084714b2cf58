//! Generation-checked table of live kinds addressed by `u64` handles.
//!
//! A handle packs a slot index (upper 32 bits) and the slot's generation
//! (lower 32 bits). Removing a kind bumps its slot's generation, so stale
//! and double-destroyed handles miss instead of aliasing a newer kind.
//! Generations start at 1, which keeps the all-zero handle invalid.

use numakind_arena::KindDescriptor;

fn pack(slot: u32, generation: u32) -> u64 {
    (u64::from(slot) << 32) | u64::from(generation)
}

fn unpack(handle: u64) -> (usize, u32) {
    ((handle >> 32) as usize, handle as u32)
}

struct Entry {
    generation: u32,
    kind: Option<KindDescriptor>,
}

/// Owns every kind created through the C ABI.
pub(crate) struct KindTable {
    entries: Vec<Entry>,
    vacant: Vec<u32>,
}

impl KindTable {
    pub(crate) const fn new() -> Self {
        Self {
            entries: Vec::new(),
            vacant: Vec::new(),
        }
    }

    /// Store a live kind and return its handle. The kind is handed back
    /// if it is not live or once the slot space is exhausted, so every
    /// handle in the table resolves to a live kind.
    pub(crate) fn insert(&mut self, kind: KindDescriptor) -> Result<u64, KindDescriptor> {
        if !kind.is_live() {
            return Err(kind);
        }
        if let Some(slot) = self.vacant.pop() {
            let entry = &mut self.entries[slot as usize];
            entry.kind = Some(kind);
            return Ok(pack(slot, entry.generation));
        }
        let Ok(slot) = u32::try_from(self.entries.len()) else {
            return Err(kind);
        };
        self.entries.push(Entry {
            generation: 1,
            kind: Some(kind),
        });
        Ok(pack(slot, 1))
    }

    pub(crate) fn get(&self, handle: u64) -> Option<&KindDescriptor> {
        let (slot, generation) = unpack(handle);
        let entry = self.entries.get(slot)?;
        if entry.generation != generation {
            return None;
        }
        entry.kind.as_ref()
    }

    /// Take the kind out of the table, invalidating `handle`.
    ///
    /// A slot whose generation would wrap is retired rather than reused.
    pub(crate) fn remove(&mut self, handle: u64) -> Option<KindDescriptor> {
        let (slot, generation) = unpack(handle);
        let entry = self.entries.get_mut(slot)?;
        if entry.generation != generation {
            return None;
        }
        let kind = entry.kind.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        if entry.generation != 0 {
            self.vacant.push(slot as u32);
        }
        Some(kind)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.kind.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use numakind_arena::{ArenaRouter, HeapEngine, Partition, RoutingStrategy};

    fn live() -> KindDescriptor {
        let router = ArenaRouter::with_os_topology(HeapEngine::default());
        let mut kind = KindDescriptor::new();
        router
            .create(&mut kind, RoutingStrategy::Passthrough, Partition(0), "table")
            .unwrap();
        kind
    }

    #[test]
    fn only_live_kinds_are_admitted() {
        let mut table = KindTable::new();
        let rejected = table.insert(KindDescriptor::new()).unwrap_err();
        assert!(!rejected.is_live());
        assert_eq!(table.len(), 0);

        let h = table.insert(live()).unwrap();
        assert!(table.get(h).unwrap().is_live());
    }

    #[test]
    fn zero_handle_is_never_issued() {
        let mut table = KindTable::new();
        let h = table.insert(live()).unwrap();
        assert_ne!(h, 0);
        assert!(table.get(0).is_none());
    }

    #[test]
    fn remove_invalidates_the_handle() {
        let mut table = KindTable::new();
        let h = table.insert(live()).unwrap();
        assert!(table.get(h).is_some());
        assert!(table.remove(h).is_some());
        assert!(table.get(h).is_none());
        assert!(table.remove(h).is_none());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn reused_slot_gets_a_new_generation() {
        let mut table = KindTable::new();
        let first = table.insert(live()).unwrap();
        table.remove(first);
        let second = table.insert(live()).unwrap();

        let (slot_a, gen_a) = unpack(first);
        let (slot_b, gen_b) = unpack(second);
        assert_eq!(slot_a, slot_b);
        assert_eq!(gen_b, gen_a + 1);
        assert!(table.get(first).is_none());
        assert!(table.get(second).is_some());
    }

    #[test]
    fn unknown_slot_misses() {
        let table = KindTable::new();
        assert!(table.get(pack(42, 1)).is_none());
    }

    #[test]
    fn wrapping_generation_retires_the_slot() {
        let mut table = KindTable::new();
        let h = table.insert(live()).unwrap();
        table.remove(h);
        table.entries[0].generation = u32::MAX;

        let last = table.insert(live()).unwrap();
        assert_eq!(unpack(last), (0, u32::MAX));
        table.remove(last);
        assert!(table.vacant.is_empty());

        let fresh = table.insert(live()).unwrap();
        assert_eq!(unpack(fresh).0, 1);
    }
}
