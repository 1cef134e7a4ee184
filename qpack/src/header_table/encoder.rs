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

use std::collections::HashMap;
use std::ops::Deref;
use std::ops::DerefMut;
use std::sync::Arc;

use crate::static_table::StaticTable;

use super::Entry;
use super::EntryIndex;
use super::HeaderTable;

/// How much of a header field a table entry matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchType {
    NameAndValue,
    Name,
    NoMatch,
}

/// The outcome of looking up a header field in the static and dynamic
/// tables. `is_static` and `index` are meaningless for
/// [`MatchType::NoMatch`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchResult {
    pub match_type: MatchType,
    pub is_static: bool,
    pub index: u64,
}

impl MatchResult {
    const NO_MATCH: MatchResult = MatchResult {
        match_type: MatchType::NoMatch,
        is_static: false,
        index: 0,
    };

    fn new(match_type: MatchType, is_static: bool, index: u64) -> Self {
        MatchResult {
            match_type,
            is_static,
            index,
        }
    }
}

/// Maps names and name/value pairs to the most recent live entry holding
/// them.
#[derive(Default)]
pub struct EncoderIndex {
    by_name: HashMap<Arc<[u8]>, u64>,
    by_name_value: HashMap<Arc<[u8]>, HashMap<Arc<[u8]>, u64>>,
}

impl EntryIndex for EncoderIndex {
    fn on_insert(&mut self, entry: &Entry, index: u64) {
        self.by_name.insert(entry.shared_name().clone(), index);

        self.by_name_value
            .entry(entry.shared_name().clone())
            .or_default()
            .insert(entry.shared_value().clone(), index);
    }

    fn on_evict(&mut self, entry: &Entry, index: u64) {
        // A more recent entry with the same name or field may have taken over
        // the mapping, in which case it stays.
        if self.by_name.get(entry.name()) == Some(&index) {
            self.by_name.remove(entry.name());
        }

        if let Some(values) = self.by_name_value.get_mut(entry.name()) {
            if values.get(entry.value()) == Some(&index) {
                values.remove(entry.value());
            }

            if values.is_empty() {
                self.by_name_value.remove(entry.name());
            }
        }
    }
}

/// The encoder's view of the dynamic table, mutated when the encoder
/// decides to insert entries.
#[derive(Default)]
pub struct EncoderHeaderTable {
    table: HeaderTable<EncoderIndex>,
}

impl EncoderHeaderTable {
    pub fn new() -> EncoderHeaderTable {
        EncoderHeaderTable::default()
    }

    /// Finds the best match for a header field.
    ///
    /// Exact static matches win over exact dynamic ones, which win over
    /// name-only matches, static first again. Among static entries the
    /// lowest index is returned, among dynamic entries the most recent.
    pub fn find_header_field(&self, name: &[u8], value: &[u8]) -> MatchResult {
        let static_table = StaticTable::get();

        if let Some(index) = static_table.find_name_value(name, value) {
            return MatchResult::new(MatchType::NameAndValue, true, index);
        }

        if let Some(&index) = self
            .table
            .index()
            .by_name_value
            .get(name)
            .and_then(|values| values.get(value))
        {
            return MatchResult::new(MatchType::NameAndValue, false, index);
        }

        self.find_header_name(name)
    }

    /// Finds an entry with the given name, static first.
    pub fn find_header_name(&self, name: &[u8]) -> MatchResult {
        if let Some(index) = StaticTable::get().find_name(name) {
            return MatchResult::new(MatchType::Name, true, index);
        }

        if let Some(&index) = self.table.index().by_name.get(name) {
            return MatchResult::new(MatchType::Name, false, index);
        }

        MatchResult::NO_MATCH
    }

    /// Returns the size of the largest entry that could be inserted without
    /// evicting the entry with absolute index `index`.
    pub fn max_insert_size_without_evicting_given_entry(
        &self, index: u64,
    ) -> u64 {
        let mut max_insert_size = self.capacity() - self.size();

        let mut entry_index = self.dropped_entry_count();

        for entry in self.entries() {
            if entry_index >= index {
                break;
            }

            entry_index += 1;
            max_insert_size += entry.size();
        }

        max_insert_size
    }

    /// Returns the absolute index of the oldest entry that is not draining.
    ///
    /// Entries with a lower index are closest to eviction: once they are
    /// gone, at least `draining_fraction` of the capacity is free. Encoders
    /// avoid referencing draining entries so they can be evicted soon.
    pub fn draining_index(&self, draining_fraction: f64) -> u64 {
        debug_assert!((0.0..=1.0).contains(&draining_fraction));

        let required_space =
            (draining_fraction * self.capacity() as f64) as u64;
        let mut space_above_draining_index = self.capacity() - self.size();

        let mut entry_index = self.dropped_entry_count();

        for entry in self.entries() {
            if space_above_draining_index >= required_space {
                break;
            }

            space_above_draining_index += entry.size();
            entry_index += 1;
        }

        entry_index
    }
}

impl Deref for EncoderHeaderTable {
    type Target = HeaderTable<EncoderIndex>;

    fn deref(&self) -> &Self::Target {
        &self.table
    }
}

impl DerefMut for EncoderHeaderTable {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(capacity: u64) -> EncoderHeaderTable {
        let mut table = EncoderHeaderTable::new();

        assert!(table.set_maximum_dynamic_table_capacity(capacity));
        assert!(table.set_dynamic_table_capacity(capacity));

        table
    }

    #[test]
    fn find_static() {
        let table = table(0);

        assert_eq!(
            table.find_header_field(b":method", b"GET"),
            MatchResult::new(MatchType::NameAndValue, true, 17)
        );

        assert_eq!(
            table.find_header_field(b":method", b"FORGET"),
            MatchResult::new(MatchType::Name, true, 15)
        );

        assert_eq!(
            table.find_header_field(b"custom-key", b"custom-value"),
            MatchResult::NO_MATCH
        );
    }

    #[test]
    fn find_dynamic() {
        let mut table = table(300);

        table.insert_entry(b"custom-key", b"value1").unwrap();
        table.insert_entry(b"custom-key", b"value2").unwrap();
        table.insert_entry(b":method", b"FORGET").unwrap();

        assert_eq!(
            table.find_header_field(b"custom-key", b"value1"),
            MatchResult::new(MatchType::NameAndValue, false, 0)
        );

        // The most recent entry with a matching name.
        assert_eq!(
            table.find_header_field(b"custom-key", b"value3"),
            MatchResult::new(MatchType::Name, false, 1)
        );

        assert_eq!(
            table.find_header_name(b"custom-key"),
            MatchResult::new(MatchType::Name, false, 1)
        );

        // Exact dynamic matches win over static name matches.
        assert_eq!(
            table.find_header_field(b":method", b"FORGET"),
            MatchResult::new(MatchType::NameAndValue, false, 2)
        );

        // Static name matches win over dynamic ones.
        assert_eq!(
            table.find_header_name(b":method"),
            MatchResult::new(MatchType::Name, true, 15)
        );
    }

    #[test]
    fn find_duplicate_prefers_most_recent() {
        let mut table = table(300);

        table.insert_entry(b"custom-key", b"custom-value").unwrap();
        table.insert_entry(b"custom-key", b"custom-value").unwrap();

        assert_eq!(
            table.find_header_field(b"custom-key", b"custom-value"),
            MatchResult::new(MatchType::NameAndValue, false, 1)
        );
    }

    #[test]
    fn evicted_entries_are_not_found() {
        // Room for exactly one of the entries below.
        let mut table = table(50);

        table.insert_entry(b"key1", b"value").unwrap();
        table.insert_entry(b"key2", b"value").unwrap();

        assert_eq!(table.find_header_name(b"key1"), MatchResult::NO_MATCH);
        assert_eq!(
            table.find_header_field(b"key2", b"value"),
            MatchResult::new(MatchType::NameAndValue, false, 1)
        );

        // Duplicating the live entry and evicting the original keeps the
        // mapping pointing at the new copy.
        table.insert_entry(b"key2", b"value").unwrap();

        assert_eq!(
            table.find_header_field(b"key2", b"value"),
            MatchResult::new(MatchType::NameAndValue, false, 2)
        );
    }

    #[test]
    fn max_insert_size_without_evicting_given_entry() {
        let mut table = table(150);

        // Each entry takes 40 octets.
        table.insert_entry(b"key1", b"val1").unwrap();
        table.insert_entry(b"key2", b"val2").unwrap();
        table.insert_entry(b"key3", b"val3").unwrap();

        assert_eq!(table.max_insert_size_without_evicting_given_entry(0), 30);
        assert_eq!(table.max_insert_size_without_evicting_given_entry(1), 70);
        assert_eq!(table.max_insert_size_without_evicting_given_entry(2), 110);
        assert_eq!(table.max_insert_size_without_evicting_given_entry(3), 150);
    }

    #[test]
    fn draining_index() {
        let mut table = table(160);

        assert_eq!(table.draining_index(0.0), 0);
        assert_eq!(table.draining_index(1.0), 0);

        // Each entry takes 40 octets.
        for _ in 0..4 {
            table.insert_entry(b"key1", b"val1").unwrap();
        }

        assert_eq!(table.size(), 160);

        assert_eq!(table.draining_index(0.0), 0);
        assert_eq!(table.draining_index(0.25), 1);
        assert_eq!(table.draining_index(0.5), 2);
        assert_eq!(table.draining_index(1.0), 4);

        assert!(table.set_dynamic_table_capacity(100));
        assert_eq!(table.dropped_entry_count(), 2);

        // 20 octets are free, so draining the oldest entry is enough.
        assert_eq!(table.draining_index(0.5), 3);
    }
}
