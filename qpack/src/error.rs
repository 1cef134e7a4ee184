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

/// HTTP/3 error code for failures decoding a header block.
pub const QPACK_DECOMPRESSION_FAILED: u64 = 0x200;

/// HTTP/3 error code for failures processing the peer's encoder stream.
pub const QPACK_ENCODER_STREAM_ERROR: u64 = 0x201;

/// HTTP/3 error code for failures processing the peer's decoder stream.
pub const QPACK_DECODER_STREAM_ERROR: u64 = 0x202;

/// A specialized [`Result`] type for QPACK operations.
///
/// This type is used throughout the crate's public API for any operation
/// that can produce an error.
///
/// [`Result`]: https://doc.rust-lang.org/std/result/enum.Result.html
pub type Result<T> = std::result::Result<T, Error>;

/// A QPACK error.
///
/// Errors returned while processing the encoder stream or the decoder stream
/// are fatal to the whole connection, and should be reported to the peer
/// with [`QPACK_ENCODER_STREAM_ERROR`] or [`QPACK_DECODER_STREAM_ERROR`]
/// respectively. Errors reported for a single header block only affect the
/// request stream carrying it, and map to [`QPACK_DECOMPRESSION_FAILED`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// There is no error or no work to do.
    #[error("done")]
    Done,

    /// The provided buffer is too short.
    #[error("buffer too short")]
    BufferTooShort,

    /// A prefixed integer does not fit in 64 bits.
    #[error("encoded integer too large")]
    IntegerTooLarge,

    /// A string literal declared a length above the 1 MiB limit.
    #[error("string literal too long")]
    StringLiteralTooLong,

    /// A Huffman-coded string literal is invalid or incomplete.
    #[error("invalid huffman encoding")]
    InvalidHuffmanEncoding,

    /// The static table index provided doesn't exist.
    #[error("invalid static table index")]
    InvalidStaticTableIndex,

    /// The dynamic table entry referenced has been evicted, has not been
    /// inserted yet, or lies beyond the declared Required Insert Count.
    #[error("invalid dynamic table index")]
    InvalidDynamicTableIndex,

    /// The encoded Required Insert Count cannot be mapped to a valid value.
    #[error("invalid required insert count")]
    InvalidRequiredInsertCount,

    /// The Base computed from the header block prefix over- or underflows.
    #[error("invalid base")]
    InvalidBase,

    /// The largest referenced dynamic entry doesn't match the declared
    /// Required Insert Count.
    #[error("required insert count mismatch")]
    RequiredInsertCountMismatch,

    /// A dynamic table capacity above the negotiated maximum was requested.
    #[error("dynamic table capacity exceeds maximum")]
    MaximumCapacityViolation,

    /// An entry larger than the dynamic table capacity was inserted.
    #[error("entry does not fit in the dynamic table")]
    EntryTooLarge,

    /// The insertion would evict an entry that unacknowledged header blocks
    /// still reference.
    #[error("dynamic table is full")]
    DynamicTableFull,

    /// More streams are blocked than the peer-advertised limit allows.
    #[error("blocked stream limit exceeded")]
    BlockedStreamLimitExceeded,

    /// The header block ended in the middle of an instruction.
    #[error("truncated header block")]
    TruncatedHeaderBlock,

    /// An Insert Count Increment of zero, or beyond the number of inserts.
    #[error("invalid insert count increment")]
    InvalidInsertCountIncrement,

    /// A Header Acknowledgement for a stream with no outstanding header
    /// blocks.
    #[error("unexpected header acknowledgement")]
    UnexpectedHeaderAcknowledgement,

    /// The method was called on an object in a terminal state.
    #[error("invalid state")]
    InvalidState,
}

impl std::convert::From<octets::BufferTooShortError> for Error {
    fn from(_err: octets::BufferTooShortError) -> Self {
        Error::BufferTooShort
    }
}
