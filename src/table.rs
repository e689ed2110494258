//! Open-addressing hash table keyed by raw station bytes.
//!
//! Slots live in a flat `Vec<Option<Entry>>` whose length is always zero or a
//! power of two. Collisions are resolved by linear probing with wraparound.
//! The table doubles before any insert that would push the load factor past
//! one half, so probe runs stay short. Entries are never removed.

// FNV-1 64-bit constants.
const OFFSET64: u64 = 14695981039346656037;
const PRIME64: u64 = 1099511628211;

/// Capacity allocated by the first insertion.
pub const INITIAL_CAPACITY: usize = 1024;

/// FNV-1 (multiply, then xor) over `key`.
#[inline]
pub fn fnv1(key: &[u8]) -> u64 {
    let mut hash = OFFSET64;
    for &b in key {
        hash = hash.wrapping_mul(PRIME64);
        hash ^= b as u64;
    }
    hash
}

/// Running statistics for one key.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    key: Box<[u8]>,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub count: i64,
}

impl Entry {
    pub fn new(key: &[u8], value: f64) -> Self {
        Self {
            key: key.into(),
            min: value,
            max: value,
            sum: value,
            count: 1,
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }

    fn update(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
        self.count += 1;
    }

    fn combine(&mut self, other: &Entry) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.count += other.count;
    }
}

#[derive(Debug, Default)]
pub struct AggregationTable {
    slots: Vec<Option<Entry>>,
    len: usize,
}

impl AggregationTable {
    /// An empty table. Nothing is allocated until the first insertion.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots, zero or a power of two.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Records one raw observation for `key`. The key bytes are copied on
    /// first sight.
    pub fn update(&mut self, key: &[u8], value: f64) {
        let index = self.probe(fnv1(key), key);
        let slot = &mut self.slots[index];
        match slot {
            Some(entry) => entry.update(value),
            None => {
                *slot = Some(Entry::new(key, value));
                self.len += 1;
            }
        }
    }

    /// Folds an already aggregated entry into the table. The empty-slot case
    /// stores `entry` as is; a key match combines both statistics.
    pub fn merge_entry(&mut self, entry: Entry) {
        let index = self.probe(fnv1(&entry.key), &entry.key);
        let slot = &mut self.slots[index];
        match slot {
            Some(existing) => existing.combine(&entry),
            None => {
                *slot = Some(entry);
                self.len += 1;
            }
        }
    }

    /// Folds every entry of `other` into `self`, consuming the smaller table.
    pub fn merge(mut self, mut other: AggregationTable) -> AggregationTable {
        if self.len < other.len {
            std::mem::swap(&mut self, &mut other);
        }
        for entry in other.into_items() {
            self.merge_entry(entry);
        }
        self
    }

    pub fn get(&self, key: &[u8]) -> Option<&Entry> {
        if self.slots.is_empty() {
            return None;
        }
        let mask = self.slots.len() - 1;
        let mut index = fnv1(key) as usize & mask;
        loop {
            match &self.slots[index] {
                None => return None,
                Some(entry) if *entry.key == *key => return Some(entry),
                Some(_) => index = (index + 1) & mask,
            }
        }
    }

    /// Occupied entries in slot order. Not sorted.
    pub fn items(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.slots.iter().flatten()
    }

    pub fn into_items(self) -> impl Iterator<Item = Entry> {
        self.slots.into_iter().flatten()
    }

    /// Returns the slot holding `key`, or the empty slot where it belongs.
    /// Grows first if the table is at least half full.
    fn probe(&mut self, hash: u64, key: &[u8]) -> usize {
        if self.len >= self.slots.len() / 2 {
            self.grow();
        }
        let mask = self.slots.len() - 1;
        let mut index = hash as usize & mask;
        loop {
            match &self.slots[index] {
                Some(entry) if *entry.key != *key => index = (index + 1) & mask,
                _ => return index,
            }
        }
    }

    fn grow(&mut self) {
        let new_len = match self.slots.len() {
            0 => INITIAL_CAPACITY,
            n => n * 2,
        };
        let old = std::mem::replace(&mut self.slots, vec![None; new_len]);
        let mask = new_len - 1;
        // Keys are already unique, so re-insertion only looks for a free slot.
        for entry in old.into_iter().flatten() {
            let mut index = fnv1(&entry.key) as usize & mask;
            while self.slots[index].is_some() {
                index = (index + 1) & mask;
            }
            self.slots[index] = Some(entry);
        }
    }
}
