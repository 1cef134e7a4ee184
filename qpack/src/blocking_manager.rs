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

//! Encoder-side tracking of header blocks the decoder hasn't acknowledged.
//!
//! The encoder must not evict an entry that an unacknowledged header block
//! references, and must not cause more streams to be blocked than the
//! decoder allows. Both depend on which dynamic table entries each
//! outstanding header block references, and on how many inserts the decoder
//! is known to have received.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::VecDeque;

/// Absolute indices of the dynamic table entries referenced by a header
/// block, including name references.
pub type IndexSet = BTreeSet<u64>;

/// Returns the Required Insert Count of a header block referencing
/// `indices`.
pub fn required_insert_count(indices: &IndexSet) -> u64 {
    indices.last().map_or(0, |index| index + 1)
}

#[derive(Debug, Default)]
pub struct BlockingManager {
    /// Unacknowledged header blocks referencing the dynamic table, per
    /// stream, in the order they were sent.
    header_blocks: HashMap<u64, VecDeque<IndexSet>>,

    /// Number of unacknowledged header blocks referencing each entry.
    entry_reference_counts: BTreeMap<u64, u64>,

    /// The number of inserts the decoder has acknowledged, directly or
    /// through a Header Acknowledgement.
    known_received_count: u64,
}

impl BlockingManager {
    pub fn new() -> BlockingManager {
        BlockingManager::default()
    }

    pub fn known_received_count(&self) -> u64 {
        self.known_received_count
    }

    /// Processes a Header Acknowledgement, which always acknowledges the
    /// oldest outstanding header block of the stream.
    ///
    /// Returns false if the stream has no outstanding header blocks.
    pub fn on_header_acknowledgement(&mut self, stream_id: u64) -> bool {
        let Some(blocks) = self.header_blocks.get_mut(&stream_id) else {
            return false;
        };

        let Some(indices) = blocks.pop_front() else {
            return false;
        };

        if blocks.is_empty() {
            self.header_blocks.remove(&stream_id);
        }

        self.known_received_count = self
            .known_received_count
            .max(required_insert_count(&indices));

        self.decrease_reference_counts(&indices);

        true
    }

    /// Processes a Stream Cancellation, forgetting about all outstanding
    /// header blocks of the stream.
    pub fn on_stream_cancellation(&mut self, stream_id: u64) {
        let Some(blocks) = self.header_blocks.remove(&stream_id) else {
            return;
        };

        for indices in &blocks {
            self.decrease_reference_counts(indices);
        }
    }

    /// Processes an Insert Count Increment. Returns false if the known
    /// received count would overflow.
    pub fn on_insert_count_increment(&mut self, increment: u64) -> bool {
        let Some(known_received_count) =
            self.known_received_count.checked_add(increment)
        else {
            return false;
        };

        self.known_received_count = known_received_count;

        true
    }

    /// Records a header block sent on `stream_id`. Blocks that don't
    /// reference the dynamic table are not tracked, as they are not
    /// acknowledged.
    pub fn on_header_block_sent(&mut self, stream_id: u64, indices: IndexSet) {
        if indices.is_empty() {
            return;
        }

        for index in &indices {
            *self.entry_reference_counts.entry(*index).or_default() += 1;
        }

        self.header_blocks
            .entry(stream_id)
            .or_default()
            .push_back(indices);
    }

    /// Returns true if a header block on `stream_id` may reference entries
    /// the decoder hasn't acknowledged, given the decoder's limit on
    /// blocked streams.
    pub fn blocking_allowed_on_stream(
        &self, stream_id: u64, maximum_blocked_streams: u64,
    ) -> bool {
        // Even if all streams with outstanding header blocks were blocked,
        // one more would be fine.
        if (self.header_blocks.len() as u64) < maximum_blocked_streams {
            return true;
        }

        if maximum_blocked_streams == 0 {
            return false;
        }

        // A stream that is already blocked can't make things worse.
        if self.is_blocked(stream_id) {
            return true;
        }

        self.blocked_stream_count() < maximum_blocked_streams
    }

    /// Returns the number of streams with a header block referencing an
    /// entry the decoder might not have received yet.
    pub fn blocked_stream_count(&self) -> u64 {
        self.header_blocks
            .keys()
            .filter(|stream_id| self.is_blocked(**stream_id))
            .count() as u64
    }

    /// Returns the lowest absolute index referenced by any unacknowledged
    /// header block, or `u64::MAX` if there is none. That entry and all
    /// following ones must not be evicted.
    pub fn smallest_blocking_index(&self) -> u64 {
        self.entry_reference_counts
            .keys()
            .next()
            .copied()
            .unwrap_or(u64::MAX)
    }

    fn is_blocked(&self, stream_id: u64) -> bool {
        self.header_blocks.get(&stream_id).is_some_and(|blocks| {
            blocks.iter().any(|indices| {
                required_insert_count(indices) > self.known_received_count
            })
        })
    }

    fn decrease_reference_counts(&mut self, indices: &IndexSet) {
        for index in indices {
            let Some(count) = self.entry_reference_counts.get_mut(index) else {
                continue;
            };

            *count -= 1;

            if *count == 0 {
                self.entry_reference_counts.remove(index);
            }
        }
    }
}
