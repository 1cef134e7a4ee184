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

use std::collections::HashSet;

/// Enforces the limit on the number of streams blocked on the dynamic
/// table, as advertised in the SETTINGS_QPACK_BLOCKED_STREAMS setting.
pub trait BlockedStreamLimitEnforcer {
    /// Called when a header block on `stream_id` becomes blocked. Returns
    /// false if that puts the number of blocked streams above the limit.
    fn on_stream_blocked(&mut self, stream_id: u64) -> bool;

    /// Called when a blocked header block on `stream_id` is released or
    /// abandoned.
    fn on_stream_unblocked(&mut self, stream_id: u64);
}

/// Tracks the set of streams blocked on the dynamic table.
#[derive(Debug, Default)]
pub struct BlockedStreams {
    max_blocked_streams: u64,
    blocked: HashSet<u64>,
}

impl BlockedStreams {
    pub fn new(max_blocked_streams: u64) -> BlockedStreams {
        BlockedStreams {
            max_blocked_streams,
            blocked: HashSet::new(),
        }
    }

    pub fn max_blocked_streams(&self) -> u64 {
        self.max_blocked_streams
    }

    pub fn blocked_stream_count(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_blocked(&self, stream_id: u64) -> bool {
        self.blocked.contains(&stream_id)
    }
}

impl BlockedStreamLimitEnforcer for BlockedStreams {
    fn on_stream_blocked(&mut self, stream_id: u64) -> bool {
        self.blocked.insert(stream_id);

        debug!(
            "stream {} blocked, {}/{} blocked streams",
            stream_id,
            self.blocked.len(),
            self.max_blocked_streams
        );

        self.blocked.len() as u64 <= self.max_blocked_streams
    }

    fn on_stream_unblocked(&mut self, stream_id: u64) {
        if self.blocked.remove(&stream_id) {
            debug!("stream {} unblocked", stream_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit() {
        let mut blocked = BlockedStreams::new(2);

        assert!(blocked.on_stream_blocked(0));
        assert!(blocked.on_stream_blocked(4));
        assert!(!blocked.on_stream_blocked(8));
        assert_eq!(blocked.blocked_stream_count(), 3);

        blocked.on_stream_unblocked(8);
        blocked.on_stream_unblocked(0);
        assert_eq!(blocked.blocked_stream_count(), 1);
        assert!(blocked.is_blocked(4));

        assert!(blocked.on_stream_blocked(12));
    }

    #[test]
    fn blocking_not_allowed() {
        let mut blocked = BlockedStreams::new(0);

        assert!(!blocked.on_stream_blocked(0));
    }

    #[test]
    fn unblock_unknown_stream() {
        let mut blocked = BlockedStreams::default();

        blocked.on_stream_unblocked(4);
        assert_eq!(blocked.blocked_stream_count(), 0);
    }
}
