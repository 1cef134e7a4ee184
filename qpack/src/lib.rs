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

//! HTTP/3 header compression (QPACK).
//!
//! This crate implements [QPACK] on both sides of a connection: an
//! [`Encoder`] turning header lists into header blocks, and a [`Decoder`]
//! turning them back into header lists. Both maintain a dynamic table,
//! synchronized through the encoder stream and the decoder stream that the
//! application carries alongside its HTTP/3 streams.
//!
//! Like the rest of the quiche stack the crate performs no I/O: data
//! received from the peer is fed in, and pending instructions are written
//! out into caller provided buffers.
//!
//! ## Encoding
//!
//! ```
//! let mut encoder = qpack::Encoder::new();
//!
//! let headers = vec![
//!     qpack::Header::new(b":method", b"GET"),
//!     qpack::Header::new(b":path", b"/"),
//! ];
//!
//! let mut block = [0; 64];
//! let len = encoder.encode(0, &headers, &mut block)?;
//! # Ok::<(), qpack::Error>(())
//! ```
//!
//! ## Decoding
//!
//! A header block can arrive in several pieces. Once the end of the block
//! is signalled, the decoded headers are returned right away, unless the
//! block references dynamic table entries that haven't been received yet.
//! In that case the stream is blocked, and the headers are reported later
//! by [`Decoder::poll()`], once the encoder stream catches up:
//!
//! ```
//! let mut decoder = qpack::Decoder::new(4096, 16);
//!
//! // A header block with a single static reference to ":method: GET".
//! decoder.decode_header_block(0, &[0x00, 0x00, 0xd1])?;
//!
//! let decoded = decoder.end_header_block(0)?.unwrap();
//! assert_eq!(decoded.headers, vec![qpack::Header::new(b":method", b"GET")]);
//!
//! loop {
//!     match decoder.poll() {
//!         Ok((stream_id, qpack::Event::Headers(decoded))) => {
//!             // Unblocked header block for `stream_id`.
//!         },
//!
//!         Ok((stream_id, qpack::Event::DecodingError(e))) => {
//!             // Reset `stream_id` with QPACK_DECOMPRESSION_FAILED.
//!         },
//!
//!         Err(qpack::Error::Done) => break,
//!
//!         Err(e) => return Err(e),
//!     }
//! }
//! # Ok::<(), qpack::Error>(())
//! ```
//!
//! [QPACK]: https://www.rfc-editor.org/rfc/rfc9204.html
//! [`Encoder`]: struct.Encoder.html
//! [`Decoder`]: struct.Decoder.html
//! [`Decoder::poll()`]: struct.Decoder.html#method.poll

#[macro_use]
extern crate log;

use std::fmt;
use std::fmt::Write;

/// Overhead added to the length of the name and value of each dynamic table
/// entry, and of each header counted against the header list size limit.
pub const ENTRY_SIZE_OVERHEAD: u64 = 32;

/// A trait for types with associated string name and value.
pub trait NameValue {
    /// Returns the object's name.
    fn name(&self) -> &[u8];

    /// Returns the object's value.
    fn value(&self) -> &[u8];
}

impl NameValue for (&[u8], &[u8]) {
    fn name(&self) -> &[u8] {
        self.0
    }

    fn value(&self) -> &[u8] {
        self.1
    }
}

/// An owned name-value pair representing a raw HTTP header.
#[derive(Clone, PartialEq, Eq)]
pub struct Header(Vec<u8>, Vec<u8>);

fn try_print_as_readable(hdr: &[u8], f: &mut fmt::Formatter) -> fmt::Result {
    match std::str::from_utf8(hdr) {
        Ok(s) => f.write_str(&s.escape_default().to_string()),
        Err(_) => write!(f, "{hdr:?}"),
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('"')?;
        try_print_as_readable(&self.0, f)?;
        f.write_str(": ")?;
        try_print_as_readable(&self.1, f)?;
        f.write_char('"')
    }
}

impl Header {
    /// Creates a new header.
    ///
    /// Both `name` and `value` will be cloned.
    pub fn new(name: &[u8], value: &[u8]) -> Self {
        Self(name.to_vec(), value.to_vec())
    }
}

impl NameValue for Header {
    fn name(&self) -> &[u8] {
        &self.0
    }

    fn value(&self) -> &[u8] {
        &self.1
    }
}

/// A non-owned name-value pair representing a raw HTTP header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderRef<'a>(&'a [u8], &'a [u8]);

impl<'a> HeaderRef<'a> {
    /// Creates a new header.
    pub const fn new(name: &'a [u8], value: &'a [u8]) -> Self {
        Self(name, value)
    }
}

impl NameValue for HeaderRef<'_> {
    fn name(&self) -> &[u8] {
        self.0
    }

    fn value(&self) -> &[u8] {
        self.1
    }
}

pub use crate::blocked_streams::BlockedStreamLimitEnforcer;
pub use crate::blocked_streams::BlockedStreams;
pub use crate::blocking_manager::BlockingManager;
pub use crate::config::Config;
pub use crate::decoder::Decoder;
pub use crate::decoder::Event;
pub use crate::encoder::Encoder;
pub use crate::error::Error;
pub use crate::error::Result;
pub use crate::error::QPACK_DECODER_STREAM_ERROR;
pub use crate::error::QPACK_DECOMPRESSION_FAILED;
pub use crate::error::QPACK_ENCODER_STREAM_ERROR;
pub use crate::header_table::DecoderHeaderTable;
pub use crate::header_table::EncoderHeaderTable;
pub use crate::header_table::Entry;
pub use crate::progressive_decoder::DecodedHeaders;
pub use crate::progressive_decoder::ProgressiveDecoder;
pub use crate::static_table::StaticTable;

mod blocked_streams;
mod blocking_manager;
mod config;
mod decoder;
mod decoder_stream;
mod encoder;
mod encoder_stream;
mod error;
pub mod header_table;
pub mod huffman;
pub mod instructions;
pub mod prefix_int;
mod progressive_decoder;
pub mod required_insert_count;
mod static_table;

#[cfg(test)]
mod tests;
