// Copyright (C) 2025, Cloudflare, Inc.
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//     * Redistributions of source code must retain the above copyright notice,
//       this list of conditions and the following disclaimer.
//
//     * Redistributions in binary form must reproduce the above copyright
//       notice, this list of conditions and the following disclaimer in the
//       documentation and/or other materials provided with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS
// IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO,
// THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR
// PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! The QPACK dynamic table.
//!
//! [`HeaderTable`] holds the bookkeeping shared by both endpoints: the live
//! entries in insertion order, their total size, the capacity and its
//! negotiated maximum, and how many entries have been evicted so far. The
//! encoder and decoder each wrap it in a view adding the operations only
//! their side needs; see [`EncoderHeaderTable`] and [`DecoderHeaderTable`].

use std::collections::VecDeque;
use std::sync::Arc;

use crate::Error;
use crate::Result;
use crate::ENTRY_SIZE_OVERHEAD;

pub use self::decoder::DecoderHeaderTable;
pub use self::decoder::Observers;
pub use self::encoder::EncoderHeaderTable;
pub use self::encoder::EncoderIndex;
pub use self::encoder::MatchResult;
pub use self::encoder::MatchType;

/// Returns the size an entry with the given name and value takes up in the
/// dynamic table.
pub fn entry_size(name: &[u8], value: &[u8]) -> u64 {
    name.len() as u64 + value.len() as u64 + ENTRY_SIZE_OVERHEAD
}

/// A dynamic table entry.
///
/// Name and value are immutable once inserted, and shared with the indices
/// the encoder keeps on the side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    name: Arc<[u8]>,
    value: Arc<[u8]>,
}

impl Entry {
    pub fn new(name: &[u8], value: &[u8]) -> Entry {
        Entry {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn size(&self) -> u64 {
        entry_size(&self.name, &self.value)
    }

    pub(crate) fn shared_name(&self) -> &Arc<[u8]> {
        &self.name
    }

    pub(crate) fn shared_value(&self) -> &Arc<[u8]> {
        &self.value
    }
}

/// Side index maintained alongside the entries of a [`HeaderTable`].
///
/// The hooks are called with the absolute index of the entry right after it
/// is appended and right before it is evicted.
pub trait EntryIndex: Default {
    fn on_insert(&mut self, _entry: &Entry, _index: u64) {}

    fn on_evict(&mut self, _entry: &Entry, _index: u64) {}
}

/// An [`EntryIndex`] that doesn't index anything.
#[derive(Default)]
pub struct NoIndex;

impl EntryIndex for NoIndex {}

/// State shared by both views of the dynamic table.
#[derive(Default)]
pub struct HeaderTable<I: EntryIndex> {
    entries: VecDeque<Entry>,

    /// Sum of the sizes of all live entries.
    size: u64,

    capacity: u64,

    maximum_dynamic_table_capacity: u64,

    maximum_dynamic_table_capacity_set: bool,

    /// Number of entries evicted so far, which is also the absolute index
    /// of the oldest live entry.
    dropped_entry_count: u64,

    dynamic_table_entry_referenced: bool,

    index: I,
}

impl<I: EntryIndex> HeaderTable<I> {
    pub fn new() -> HeaderTable<I> {
        HeaderTable::default()
    }

    /// Returns true if an entry with the given name and value can be
    /// inserted with the current capacity, possibly after evicting others.
    pub fn entry_fits(&self, name: &[u8], value: &[u8]) -> bool {
        entry_size(name, value) <= self.capacity
    }

    /// Inserts an entry, evicting from the oldest end first as needed, and
    /// returns its absolute index.
    ///
    /// Fails with [`Error::EntryTooLarge`] without changing any state if the
    /// entry doesn't fit.
    pub fn insert_entry(&mut self, name: &[u8], value: &[u8]) -> Result<u64> {
        let entry_size = entry_size(name, value);

        if entry_size > self.capacity {
            return Err(Error::EntryTooLarge);
        }

        self.evict_down_to(self.capacity - entry_size);

        let entry = Entry::new(name, value);
        let index = self.inserted_entry_count();

        self.index.on_insert(&entry, index);

        self.size += entry_size;
        self.entries.push_back(entry);

        trace!(
            "dynamic table insert index={} size={} capacity={}",
            index,
            self.size,
            self.capacity
        );

        Ok(index)
    }

    /// Changes the capacity, evicting entries that no longer fit.
    ///
    /// Returns false without changing any state if `capacity` exceeds the
    /// maximum dynamic table capacity.
    pub fn set_dynamic_table_capacity(&mut self, capacity: u64) -> bool {
        if capacity > self.maximum_dynamic_table_capacity {
            return false;
        }

        trace!("dynamic table capacity {} -> {}", self.capacity, capacity);

        self.capacity = capacity;
        self.evict_down_to(capacity);

        true
    }

    /// Sets the maximum dynamic table capacity. The first call wins, later
    /// calls succeed only if they pass the same value.
    pub fn set_maximum_dynamic_table_capacity(
        &mut self, maximum_dynamic_table_capacity: u64,
    ) -> bool {
        if self.maximum_dynamic_table_capacity_set {
            return self.maximum_dynamic_table_capacity ==
                maximum_dynamic_table_capacity;
        }

        self.maximum_dynamic_table_capacity = maximum_dynamic_table_capacity;
        self.maximum_dynamic_table_capacity_set = true;

        true
    }

    /// Returns the live entry with the given absolute index.
    pub fn lookup(&self, index: u64) -> Option<&Entry> {
        let offset = index.checked_sub(self.dropped_entry_count)?;

        self.entries.get(usize::try_from(offset).ok()?)
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn maximum_dynamic_table_capacity(&self) -> u64 {
        self.maximum_dynamic_table_capacity
    }

    /// Returns the maximum number of entries the table could ever hold,
    /// used to encode the Required Insert Count.
    pub fn max_entries(&self) -> u64 {
        self.maximum_dynamic_table_capacity / ENTRY_SIZE_OVERHEAD
    }

    pub fn inserted_entry_count(&self) -> u64 {
        self.dropped_entry_count + self.entries.len() as u64
    }

    pub fn dropped_entry_count(&self) -> u64 {
        self.dropped_entry_count
    }

    /// Returns true if any header block ever referenced a dynamic entry.
    pub fn dynamic_table_entry_referenced(&self) -> bool {
        self.dynamic_table_entry_referenced
    }

    pub fn set_dynamic_table_entry_referenced(&mut self) {
        self.dynamic_table_entry_referenced = true;
    }

    /// Live entries, oldest first.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &Entry> {
        self.entries.iter()
    }

    pub(crate) fn index(&self) -> &I {
        &self.index
    }

    fn evict_down_to(&mut self, required_size: u64) {
        while self.size > required_size {
            let Some(entry) = self.entries.pop_front() else {
                break;
            };

            self.index.on_evict(&entry, self.dropped_entry_count);

            self.size -= entry.size();
            self.dropped_entry_count += 1;

            trace!(
                "dynamic table evict index={} size={}",
                self.dropped_entry_count - 1,
                self.size
            );
        }
    }
}


mod decoder;
mod encoder;
