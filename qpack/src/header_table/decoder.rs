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

use std::collections::BTreeMap;
use std::ops::Deref;
use std::ops::DerefMut;

use smallvec::SmallVec;

use crate::static_table::StaticTable;
use crate::Error;
use crate::Result;

use super::HeaderTable;
use super::NoIndex;

/// Stream IDs of observers notified by a single table operation.
pub type Observers = SmallVec<[u64; 4]>;

/// The decoder's view of the dynamic table, mutated by instructions received
/// on the encoder stream.
///
/// Header blocks that can't be decoded until more entries are inserted
/// register an observer, identified by the stream ID of the block, together
/// with the insert count they are waiting for.
#[derive(Default)]
pub struct DecoderHeaderTable {
    table: HeaderTable<NoIndex>,

    /// Observers by the insert count that releases them, in registration
    /// order.
    observers: BTreeMap<u64, Observers>,
}

impl DecoderHeaderTable {
    pub fn new() -> DecoderHeaderTable {
        DecoderHeaderTable::default()
    }

    /// Returns the name and value of a static entry, or of a live dynamic
    /// entry by absolute index.
    pub fn lookup_entry(
        &self, is_static: bool, index: u64,
    ) -> Result<(&[u8], &[u8])> {
        if is_static {
            return StaticTable::get()
                .lookup(index)
                .ok_or(Error::InvalidStaticTableIndex);
        }

        self.table
            .lookup(index)
            .map(|entry| (entry.name(), entry.value()))
            .ok_or(Error::InvalidDynamicTableIndex)
    }

    /// Inserts an entry and returns the observers released by it, in the
    /// order of the insert count they were waiting for. Released observers
    /// are unregistered.
    pub fn insert_entry(
        &mut self, name: &[u8], value: &[u8],
    ) -> Result<Observers> {
        self.table.insert_entry(name, value)?;

        let inserted_entry_count = self.table.inserted_entry_count();

        let mut released = Observers::new();

        while let Some(entry) = self.observers.first_entry() {
            if *entry.key() > inserted_entry_count {
                break;
            }

            released.extend(entry.remove());
        }

        Ok(released)
    }

    /// Registers `stream_id` to be released once `required_insert_count`
    /// entries have been inserted.
    pub fn register_observer(
        &mut self, required_insert_count: u64, stream_id: u64,
    ) {
        debug_assert!(
            required_insert_count > self.table.inserted_entry_count()
        );

        self.observers
            .entry(required_insert_count)
            .or_default()
            .push(stream_id);
    }

    /// Unregisters an observer that hasn't been released yet.
    pub fn unregister_observer(
        &mut self, required_insert_count: u64, stream_id: u64,
    ) {
        let Some(observers) = self.observers.get_mut(&required_insert_count)
        else {
            return;
        };

        observers.retain(|id| *id != stream_id);

        if observers.is_empty() {
            self.observers.remove(&required_insert_count);
        }
    }

    /// Unregisters all observers, returning them so they can be told that
    /// they will never be released.
    pub fn cancel_observers(&mut self) -> Observers {
        std::mem::take(&mut self.observers)
            .into_values()
            .flatten()
            .collect()
    }

    /// Returns the number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.values().map(SmallVec::len).sum()
    }
}

impl Deref for DecoderHeaderTable {
    type Target = HeaderTable<NoIndex>;

    fn deref(&self) -> &Self::Target {
        &self.table
    }
}

impl DerefMut for DecoderHeaderTable {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.table
    }
}
