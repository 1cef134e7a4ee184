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

//! Decoding of a single header block.
//!
//! A header block can reference dynamic table entries the decoder hasn't
//! received yet on the encoder stream. When that happens the block is
//! blocked: its remaining octets are buffered untouched until the dynamic
//! table reaches the block's Required Insert Count, at which point the owner
//! calls [`ProgressiveDecoder::on_insert_count_reached()`] and decoding
//! resumes where it left off.
//!
//! The decoder doesn't own the dynamic table nor the blocked stream limiter,
//! both are passed to every call that needs them.

use std::mem;

use crate::blocked_streams::BlockedStreamLimitEnforcer;
use crate::header_table::DecoderHeaderTable;
use crate::instructions::DecodedInstruction;
use crate::instructions::InstructionDecoder;
use crate::instructions::Opcode;
use crate::instructions::PREFIX_LANGUAGE;
use crate::instructions::REQUEST_STREAM_LANGUAGE;
use crate::required_insert_count::decode_required_insert_count;
use crate::Error;
use crate::Header;
use crate::Result;
use crate::ENTRY_SIZE_OVERHEAD;

/// A fully decoded header block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedHeaders {
    /// The decoded header fields, in order. Truncated if the header list
    /// size limit was exceeded.
    pub headers: Vec<Header>,

    /// Whether the header list exceeded the size limit, in which case the
    /// header field that crossed the limit and all following ones were
    /// dropped.
    pub limit_exceeded: bool,

    /// Size of the encoded header block.
    pub compressed_bytes: u64,

    /// Sum of the lengths of all decoded names and values.
    pub uncompressed_bytes: u64,

    /// Like `uncompressed_bytes` but also counting the 32 octet overhead of
    /// each field, which is what the header list size limit applies to.
    pub uncompressed_bytes_including_overhead: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    DecodingPrefix,
    Blocked,
    DecodingInstructions,
    Done,
    Error,
}

/// Incrementally decodes the header block of one stream.
pub struct ProgressiveDecoder {
    stream_id: u64,

    max_header_list_size: u64,

    state: State,

    prefix_decoder: InstructionDecoder,

    instruction_decoder: InstructionDecoder,

    required_insert_count: u64,

    base: u64,

    /// One more than the largest absolute index referenced so far, which
    /// must equal the Required Insert Count at the end of the block.
    required_insert_count_so_far: u64,

    /// Octets received while blocked.
    buffer: Vec<u8>,

    /// Whether the end of the block was signaled while blocked.
    end_of_block: bool,

    decoded: DecodedHeaders,
}

impl ProgressiveDecoder {
    /// Creates a decoder for the header block on `stream_id`. Header fields
    /// are kept until their total size, including the per-field overhead,
    /// exceeds `max_header_list_size`.
    pub fn new(stream_id: u64, max_header_list_size: u64) -> ProgressiveDecoder {
        ProgressiveDecoder {
            stream_id,
            max_header_list_size,
            state: State::DecodingPrefix,
            prefix_decoder: InstructionDecoder::new(PREFIX_LANGUAGE),
            instruction_decoder: InstructionDecoder::new(
                REQUEST_STREAM_LANGUAGE,
            ),
            required_insert_count: 0,
            base: 0,
            required_insert_count_so_far: 0,
            buffer: Vec::new(),
            end_of_block: false,
            decoded: DecodedHeaders::default(),
        }
    }

    pub fn stream_id(&self) -> u64 {
        self.stream_id
    }

    /// Returns the Required Insert Count, which is only known once the
    /// prefix has been decoded.
    pub fn required_insert_count(&self) -> u64 {
        self.required_insert_count
    }

    pub fn is_blocked(&self) -> bool {
        self.state == State::Blocked
    }

    /// Returns true once the decoder reached a terminal state, after which
    /// no further calls are accepted.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Done | State::Error)
    }

    /// Feeds the next chunk of the header block.
    ///
    /// On error the decoder is left in a terminal state and the error is not
    /// reported again.
    pub fn decode(
        &mut self, data: &[u8], table: &mut DecoderHeaderTable,
        limiter: &mut dyn BlockedStreamLimitEnforcer,
    ) -> Result<()> {
        if self.is_finished() {
            return Err(Error::InvalidState);
        }

        // No data may follow the end of the block.
        if self.end_of_block {
            return Err(self.fail(Error::InvalidState, table, limiter));
        }

        self.decoded.compressed_bytes += data.len() as u64;

        self.decode_data(data, table, limiter)
            .map_err(|e| self.fail(e, table, limiter))
    }

    /// Signals the end of the header block.
    ///
    /// Returns the decoded headers, or `None` if the block is blocked, in
    /// which case they'll be returned by
    /// [`on_insert_count_reached()`](Self::on_insert_count_reached).
    pub fn end_header_block(
        &mut self, table: &mut DecoderHeaderTable,
        limiter: &mut dyn BlockedStreamLimitEnforcer,
    ) -> Result<Option<DecodedHeaders>> {
        if self.is_finished() {
            return Err(Error::InvalidState);
        }

        if self.end_of_block {
            return Err(self.fail(Error::InvalidState, table, limiter));
        }

        match self.state {
            State::Blocked => {
                self.end_of_block = true;

                Ok(None)
            },

            State::DecodingPrefix =>
                Err(self.fail(Error::TruncatedHeaderBlock, table, limiter)),

            _ => self
                .finish()
                .map(Some)
                .map_err(|e| self.fail(e, table, limiter)),
        }
    }

    /// Resumes a blocked decoder once the dynamic table reached its Required
    /// Insert Count.
    ///
    /// Returns the decoded headers if the end of the block was already
    /// signaled.
    pub fn on_insert_count_reached(
        &mut self, table: &mut DecoderHeaderTable,
        limiter: &mut dyn BlockedStreamLimitEnforcer,
    ) -> Result<Option<DecodedHeaders>> {
        if self.state != State::Blocked {
            return Err(Error::InvalidState);
        }

        debug_assert!(
            table.inserted_entry_count() >= self.required_insert_count
        );

        trace!("stream {} resumed", self.stream_id);

        self.state = State::DecodingInstructions;

        let buffer = mem::take(&mut self.buffer);
        let res = self.decode_instructions(&buffer, table);

        limiter.on_stream_unblocked(self.stream_id);

        if let Err(e) = res {
            return Err(self.fail(e, table, limiter));
        }

        if !self.end_of_block {
            return Ok(None);
        }

        self.finish()
            .map(Some)
            .map_err(|e| self.fail(e, table, limiter))
    }

    /// Moves the decoder to a terminal state because the dynamic table it
    /// was waiting on is gone. The table must not be used on its behalf
    /// anymore.
    pub fn cancel(&mut self) {
        if self.is_finished() {
            return;
        }

        debug!("stream {} cancelled", self.stream_id);

        self.state = State::Error;
        self.buffer = Vec::new();
    }

    /// Abandons decoding, e.g. because the stream was reset, releasing any
    /// observer registration and blocked stream slot.
    pub fn abort(
        &mut self, table: &mut DecoderHeaderTable,
        limiter: &mut dyn BlockedStreamLimitEnforcer,
    ) {
        if self.is_finished() {
            return;
        }

        debug!("stream {} aborted", self.stream_id);

        self.release(table, limiter);
        self.state = State::Error;
    }

    fn decode_data(
        &mut self, mut data: &[u8], table: &mut DecoderHeaderTable,
        limiter: &mut dyn BlockedStreamLimitEnforcer,
    ) -> Result<()> {
        if self.state == State::DecodingPrefix {
            let Some(prefix) = self.prefix_decoder.decode(&mut data)? else {
                return Ok(());
            };

            self.start(prefix, table, limiter)?;
        }

        if self.state == State::Blocked {
            self.buffer.extend_from_slice(data);

            return Ok(());
        }

        self.decode_instructions(data, table)
    }

    fn start(
        &mut self, prefix: DecodedInstruction, table: &mut DecoderHeaderTable,
        limiter: &mut dyn BlockedStreamLimitEnforcer,
    ) -> Result<()> {
        let required_insert_count = decode_required_insert_count(
            prefix.varint,
            table.max_entries(),
            table.inserted_entry_count(),
        )?;

        let delta_base = prefix.varint2;

        let base = if prefix.s_bit {
            required_insert_count
                .checked_sub(delta_base)
                .and_then(|v| v.checked_sub(1))
        } else {
            required_insert_count.checked_add(delta_base)
        };

        self.required_insert_count = required_insert_count;
        self.base = base.ok_or(Error::InvalidBase)?;

        trace!(
            "stream {} header block required_insert_count={} base={}",
            self.stream_id,
            self.required_insert_count,
            self.base
        );

        if required_insert_count <= table.inserted_entry_count() {
            self.state = State::DecodingInstructions;

            return Ok(());
        }

        if !limiter.on_stream_blocked(self.stream_id) {
            limiter.on_stream_unblocked(self.stream_id);

            return Err(Error::BlockedStreamLimitExceeded);
        }

        table.register_observer(required_insert_count, self.stream_id);

        self.state = State::Blocked;

        debug!(
            "stream {} blocked waiting for insert count {}",
            self.stream_id, required_insert_count
        );

        Ok(())
    }

    fn decode_instructions(
        &mut self, mut data: &[u8], table: &mut DecoderHeaderTable,
    ) -> Result<()> {
        while let Some(instruction) =
            self.instruction_decoder.decode(&mut data)?
        {
            self.on_instruction(instruction, table)?;
        }

        Ok(())
    }

    fn on_instruction(
        &mut self, instruction: DecodedInstruction,
        table: &mut DecoderHeaderTable,
    ) -> Result<()> {
        let index = instruction.varint;

        match instruction.opcode {
            Opcode::IndexedHeaderField if instruction.s_bit => {
                let (name, value) = table.lookup_entry(true, index)?;
                let header = Header::new(name, value);

                self.on_header(header);
            },

            Opcode::IndexedHeaderField => {
                let index = self.relative_to_absolute(index)?;
                let header = self.lookup_dynamic(index, table)?;

                self.on_header(header);
            },

            Opcode::IndexedHeaderFieldPostBase => {
                let index = self.post_base_to_absolute(index)?;
                let header = self.lookup_dynamic(index, table)?;

                self.on_header(header);
            },

            Opcode::LiteralWithNameReference if instruction.s_bit => {
                let (name, _) = table.lookup_entry(true, index)?;
                let header = Header(name.to_vec(), instruction.value);

                self.on_header(header);
            },

            Opcode::LiteralWithNameReference => {
                let index = self.relative_to_absolute(index)?;
                let Header(name, _) = self.lookup_dynamic(index, table)?;

                self.on_header(Header(name, instruction.value));
            },

            Opcode::LiteralWithPostBaseNameReference => {
                let index = self.post_base_to_absolute(index)?;
                let Header(name, _) = self.lookup_dynamic(index, table)?;

                self.on_header(Header(name, instruction.value));
            },

            Opcode::LiteralWithoutNameReference =>
                self.on_header(Header(instruction.name, instruction.value)),

            _ => return Err(Error::InvalidState),
        }

        Ok(())
    }

    fn relative_to_absolute(&self, relative_index: u64) -> Result<u64> {
        if relative_index >= self.base {
            return Err(Error::InvalidDynamicTableIndex);
        }

        let index = self.base - 1 - relative_index;

        if index >= self.required_insert_count {
            return Err(Error::InvalidDynamicTableIndex);
        }

        Ok(index)
    }

    fn post_base_to_absolute(&self, post_base_index: u64) -> Result<u64> {
        let index = self
            .base
            .checked_add(post_base_index)
            .ok_or(Error::InvalidDynamicTableIndex)?;

        if index >= self.required_insert_count {
            return Err(Error::InvalidDynamicTableIndex);
        }

        Ok(index)
    }

    fn lookup_dynamic(
        &mut self, index: u64, table: &mut DecoderHeaderTable,
    ) -> Result<Header> {
        let (name, value) = table.lookup_entry(false, index)?;
        let header = Header::new(name, value);

        table.set_dynamic_table_entry_referenced();

        self.required_insert_count_so_far =
            self.required_insert_count_so_far.max(index + 1);

        Ok(header)
    }

    fn on_header(&mut self, header: Header) {
        let decoded = &mut self.decoded;

        let len = (header.0.len() + header.1.len()) as u64;

        decoded.uncompressed_bytes += len;
        decoded.uncompressed_bytes_including_overhead +=
            len + ENTRY_SIZE_OVERHEAD;

        if decoded.limit_exceeded ||
            decoded.uncompressed_bytes_including_overhead >
                self.max_header_list_size
        {
            decoded.limit_exceeded = true;

            return;
        }

        trace!("stream {} header {:?}", self.stream_id, header);

        decoded.headers.push(header);
    }

    fn finish(&mut self) -> Result<DecodedHeaders> {
        if !self.instruction_decoder.at_instruction_boundary() {
            return Err(Error::TruncatedHeaderBlock);
        }

        if self.required_insert_count_so_far != self.required_insert_count {
            return Err(Error::RequiredInsertCountMismatch);
        }

        self.state = State::Done;

        debug!(
            "stream {} header block decoded, {} fields, {} octets",
            self.stream_id,
            self.decoded.headers.len(),
            self.decoded.compressed_bytes
        );

        Ok(mem::take(&mut self.decoded))
    }

    fn release(
        &mut self, table: &mut DecoderHeaderTable,
        limiter: &mut dyn BlockedStreamLimitEnforcer,
    ) {
        if self.state == State::Blocked {
            table.unregister_observer(
                self.required_insert_count,
                self.stream_id,
            );
            limiter.on_stream_unblocked(self.stream_id);
        }

        self.buffer = Vec::new();
    }

    fn fail(
        &mut self, e: Error, table: &mut DecoderHeaderTable,
        limiter: &mut dyn BlockedStreamLimitEnforcer,
    ) -> Error {
        debug!("stream {} header block error {:?}", self.stream_id, e);

        self.release(table, limiter);
        self.state = State::Error;

        e
    }
}
