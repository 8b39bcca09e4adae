use std::fmt;
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawHandle {
    slot: u32,
    generation: u32,
}

impl RawHandle {
    pub fn slot(self) -> u32 {
        self.slot
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.slot, self.generation)
    }
}

pub(crate) trait ArenaKey: Copy {
    fn from_raw(raw: RawHandle) -> Self;
    fn raw(self) -> RawHandle;
}

#[derive(Debug, Clone)]
enum Slot<V> {
    Occupied { generation: u32, value: V },
    Vacant { generation: u32 },
}

#[derive(Debug, Clone)]
pub(crate) struct Arena<K, V> {
    slots: Vec<Slot<V>>,
    free: Vec<u32>,
    len: usize,
    _key: PhantomData<K>,
}

impl<K, V> Default for Arena<K, V> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            _key: PhantomData,
        }
    }
}

impl<K: ArenaKey, V> Arena<K, V> {
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn insert(&mut self, value: V) -> K {
        self.len += 1;
        // Reuse the lowest freed slot so iteration order stays compact.
        if let Some(position) = self
            .free
            .iter()
            .enumerate()
            .min_by_key(|(_, slot)| **slot)
            .map(|(position, _)| position)
        {
            let slot = self.free.swap_remove(position);
            let generation = match self.slots[slot as usize] {
                Slot::Vacant { generation } => generation,
                Slot::Occupied { generation, .. } => generation,
            };
            self.slots[slot as usize] = Slot::Occupied { generation, value };
            return K::from_raw(RawHandle { slot, generation });
        }

        let slot = self.slots.len() as u32;
        self.slots.push(Slot::Occupied {
            generation: 0,
            value,
        });
        K::from_raw(RawHandle {
            slot,
            generation: 0,
        })
    }

    pub(crate) fn remove(&mut self, key: K) -> Option<V> {
        let raw = key.raw();
        let slot = self.slots.get_mut(raw.slot as usize)?;
        match slot {
            Slot::Occupied { generation, .. } if *generation == raw.generation => {}
            _ => return None,
        }

        let vacated = std::mem::replace(
            slot,
            Slot::Vacant {
                generation: raw.generation.wrapping_add(1),
            },
        );
        self.free.push(raw.slot);
        self.len -= 1;
        match vacated {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    pub(crate) fn contains(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    pub(crate) fn get(&self, key: K) -> Option<&V> {
        let raw = key.raw();
        match self.slots.get(raw.slot as usize)? {
            Slot::Occupied { generation, value } if *generation == raw.generation => Some(value),
            _ => None,
        }
    }

    pub(crate) fn get_mut(&mut self, key: K) -> Option<&mut V> {
        let raw = key.raw();
        match self.slots.get_mut(raw.slot as usize)? {
            Slot::Occupied { generation, value } if *generation == raw.generation => Some(value),
            _ => None,
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| match entry {
                Slot::Occupied { generation, value } => Some((
                    K::from_raw(RawHandle {
                        slot: slot as u32,
                        generation: *generation,
                    }),
                    value,
                )),
                Slot::Vacant { .. } => None,
            })
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut V)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(slot, entry)| match entry {
                Slot::Occupied { generation, value } => Some((
                    K::from_raw(RawHandle {
                        slot: slot as u32,
                        generation: *generation,
                    }),
                    value,
                )),
                Slot::Vacant { .. } => None,
            })
    }

    pub(crate) fn keys(&self) -> Vec<K> {
        self.iter().map(|(key, _)| key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct TestKey(RawHandle);

    impl ArenaKey for TestKey {
        fn from_raw(raw: RawHandle) -> Self {
            Self(raw)
        }

        fn raw(self) -> RawHandle {
            self.0
        }
    }

    #[test]
    fn removed_handle_is_stale_even_after_slot_reuse() {
        let mut arena: Arena<TestKey, &str> = Arena::default();
        let first = arena.insert("first");
        let second = arena.insert("second");

        assert_eq!(arena.remove(first), Some("first"));
        assert_eq!(arena.get(first), None);
        assert_eq!(arena.remove(first), None);

        let reused = arena.insert("third");
        assert_eq!(reused.0.slot(), first.0.slot());
        assert_ne!(reused, first);
        assert_eq!(arena.get(first), None);
        assert_eq!(arena.get(reused), Some(&"third"));
        assert_eq!(arena.get(second), Some(&"second"));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn iteration_is_in_slot_order_and_skips_vacant() {
        let mut arena: Arena<TestKey, u32> = Arena::default();
        let keys: Vec<_> = (0..4).map(|value| arena.insert(value)).collect();
        arena.remove(keys[1]);

        let values: Vec<u32> = arena.iter().map(|(_, value)| *value).collect();
        assert_eq!(values, vec![0, 2, 3]);
    }

    #[test]
    fn lowest_free_slot_is_reused_first() {
        let mut arena: Arena<TestKey, u32> = Arena::default();
        let keys: Vec<_> = (0..4).map(|value| arena.insert(value)).collect();
        arena.remove(keys[3]);
        arena.remove(keys[1]);

        let reused = arena.insert(10);
        assert_eq!(reused.0.slot(), 1);
    }
}
