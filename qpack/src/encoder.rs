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

use std::borrow::Cow;

use crate::blocking_manager::required_insert_count;
use crate::blocking_manager::BlockingManager;
use crate::blocking_manager::IndexSet;
use crate::decoder_stream::DecoderInstruction;
use crate::decoder_stream::DecoderStreamReceiver;
use crate::encoder_stream::EncoderStreamSender;
use crate::header_table::entry_size;
use crate::header_table::EncoderHeaderTable;
use crate::header_table::MatchType;
use crate::instructions::encode_instruction;
use crate::instructions::InstructionValues;
use crate::instructions::INDEXED_HEADER_FIELD;
use crate::instructions::LITERAL_WITHOUT_NAME_REFERENCE;
use crate::instructions::LITERAL_WITH_NAME_REFERENCE;
use crate::instructions::PREFIX;
use crate::required_insert_count::encode_required_insert_count;
use crate::Config;
use crate::Error;
use crate::NameValue;
use crate::Result;

/// Fraction of the dynamic table capacity closest to eviction. Entries in
/// that part of the table are not referenced by new header blocks, so that
/// they can be evicted soon.
const DRAINING_FRACTION: f64 = 0.25;

/// How a header field is represented in a header block.
enum Representation<'a> {
    Indexed { is_static: bool, index: u64 },

    LiteralWithNameReference {
        is_static: bool,
        index: u64,
        value: &'a [u8],
    },

    Literal { name: Cow<'a, [u8]>, value: &'a [u8] },
}

/// A QPACK encoder.
///
/// Which entries to insert into the dynamic table is up to the caller: the
/// encoder only references entries that were inserted with
/// [`insert()`](Self::insert), and only when that doesn't risk blocking
/// more streams than the peer allows.
pub struct Encoder {
    table: EncoderHeaderTable,

    encoder_stream_sender: EncoderStreamSender,

    decoder_stream_receiver: DecoderStreamReceiver,

    blocking_manager: BlockingManager,

    /// The peer's `SETTINGS_QPACK_BLOCKED_STREAMS` setting.
    maximum_blocked_streams: u64,

    huffman: bool,

    /// Decoder stream error, fatal to the connection.
    error: Option<Error>,
}

impl Default for Encoder {
    fn default() -> Self {
        Encoder::new()
    }
}

impl Encoder {
    /// Creates a new QPACK encoder.
    ///
    /// The dynamic table can't be used until the peer's settings are
    /// applied with [`set_maximum_dynamic_table_capacity()`] and
    /// [`set_maximum_blocked_streams()`].
    ///
    /// [`set_maximum_dynamic_table_capacity()`]: Self::set_maximum_dynamic_table_capacity
    /// [`set_maximum_blocked_streams()`]: Self::set_maximum_blocked_streams
    pub fn new() -> Encoder {
        Encoder {
            table: EncoderHeaderTable::new(),
            encoder_stream_sender: EncoderStreamSender::new(true),
            decoder_stream_receiver: DecoderStreamReceiver::new(),
            blocking_manager: BlockingManager::new(),
            maximum_blocked_streams: 0,
            huffman: true,
            error: None,
        }
    }

    /// Creates a new QPACK encoder with the settings from `config`.
    pub fn with_config(config: &Config) -> Encoder {
        Encoder {
            encoder_stream_sender: EncoderStreamSender::new(config.huffman()),
            huffman: config.huffman(),
            ..Encoder::new()
        }
    }

    /// Returns the encoder's view of the dynamic table.
    pub fn table(&self) -> &EncoderHeaderTable {
        &self.table
    }

    /// Returns the number of streams that might currently be blocked on the
    /// peer's decoder.
    pub fn blocked_stream_count(&self) -> u64 {
        self.blocking_manager.blocked_stream_count()
    }

    /// Applies the peer's `SETTINGS_QPACK_MAX_TABLE_CAPACITY` setting.
    ///
    /// Returns false if a different value was applied before.
    pub fn set_maximum_dynamic_table_capacity(&mut self, v: u64) -> bool {
        self.table.set_maximum_dynamic_table_capacity(v)
    }

    /// Applies the peer's `SETTINGS_QPACK_BLOCKED_STREAMS` setting.
    ///
    /// Returns false if `v` is lower than the value applied before.
    pub fn set_maximum_blocked_streams(&mut self, v: u64) -> bool {
        if v < self.maximum_blocked_streams {
            return false;
        }

        self.maximum_blocked_streams = v;

        true
    }

    /// Changes the capacity of the dynamic table and tells the decoder.
    ///
    /// Fails with [`Error::DynamicTableFull`] if that would evict entries
    /// referenced by unacknowledged header blocks.
    pub fn set_dynamic_table_capacity(&mut self, capacity: u64) -> Result<()> {
        if capacity > self.table.maximum_dynamic_table_capacity() {
            return Err(Error::MaximumCapacityViolation);
        }

        let blocking_index = self.blocking_manager.smallest_blocking_index();

        let referenced_size = self.table.capacity() -
            self.table
                .max_insert_size_without_evicting_given_entry(blocking_index);

        if referenced_size > capacity {
            return Err(Error::DynamicTableFull);
        }

        self.encoder_stream_sender
            .send_set_dynamic_table_capacity(capacity)?;

        self.table.set_dynamic_table_capacity(capacity);

        Ok(())
    }

    /// Inserts an entry into the dynamic table, and returns its absolute
    /// index.
    ///
    /// The name is lowercased. Fails with [`Error::EntryTooLarge`] if the
    /// entry is larger than the capacity, and with
    /// [`Error::DynamicTableFull`] if inserting it would evict an entry
    /// referenced by an unacknowledged header block.
    pub fn insert(&mut self, name: &[u8], value: &[u8]) -> Result<u64> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let name = lowercase(name);
        let size = entry_size(&name, value);

        if size > self.table.capacity() {
            return Err(Error::EntryTooLarge);
        }

        let blocking_index = self.blocking_manager.smallest_blocking_index();

        if size >
            self.table
                .max_insert_size_without_evicting_given_entry(blocking_index)
        {
            return Err(Error::DynamicTableFull);
        }

        let m = self.table.find_header_field(&name, value);
        let inserted_entry_count = self.table.inserted_entry_count();

        let sender = &mut self.encoder_stream_sender;

        match (m.match_type, m.is_static) {
            (MatchType::NameAndValue, false) =>
                sender.send_duplicate(inserted_entry_count - 1 - m.index)?,

            (MatchType::NameAndValue, true) | (MatchType::Name, true) =>
                sender.send_insert_with_name_reference(true, m.index, value)?,

            (MatchType::Name, false) => sender.send_insert_with_name_reference(
                false,
                inserted_entry_count - 1 - m.index,
                value,
            )?,

            (MatchType::NoMatch, _) =>
                sender.send_insert_without_name_reference(&name, value)?,
        }

        self.table.insert_entry(&name, value)
    }

    /// Encodes a list of headers into a QPACK header block for `stream_id`.
    ///
    /// Header names are lowercased. Returns the size of the header block.
    pub fn encode<T: NameValue>(
        &mut self, stream_id: u64, headers: &[T], out: &mut [u8],
    ) -> Result<usize> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let mut referenced = IndexSet::new();

        let representations: Vec<Representation> = headers
            .iter()
            .map(|h| self.representation(stream_id, h, &mut referenced))
            .collect();

        let required_insert_count = required_insert_count(&referenced);

        let mut b = octets::OctetsMut::with_slice(out);

        // The Base is the Required Insert Count, so there's no need for
        // post-base indices.
        let base = required_insert_count;

        let prefix = InstructionValues {
            varint: encode_required_insert_count(
                required_insert_count,
                self.table.max_entries(),
            ),
            ..Default::default()
        };

        encode_instruction(&PREFIX, &prefix, false, &mut b)?;

        for r in &representations {
            self.encode_representation(r, base, &mut b)?;
        }

        trace!(
            "stream {} header block required_insert_count={} len={}",
            stream_id,
            required_insert_count,
            b.off()
        );

        self.blocking_manager
            .on_header_block_sent(stream_id, referenced);

        Ok(b.off())
    }

    /// Processes data received on the peer's decoder stream.
    ///
    /// Errors are fatal to the connection, which should be closed with
    /// [`QPACK_DECODER_STREAM_ERROR`]. Once an error is returned, the same
    /// error is returned by all following calls.
    ///
    /// [`QPACK_DECODER_STREAM_ERROR`]: constant.QPACK_DECODER_STREAM_ERROR.html
    pub fn on_decoder_stream_data(&mut self, data: &[u8]) -> Result<()> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let res = self.process_decoder_stream(data);

        if let Err(e) = res {
            debug!("decoder stream error {:?}", e);

            self.error = Some(e);
        }

        res
    }

    /// Check if the encoder wants to emit any instructions on the encoder
    /// stream.
    pub fn has_instructions(&self) -> bool {
        self.encoder_stream_sender.has_pending()
    }

    /// Emit any pending instructions on the encoder stream. Once emitted
    /// the buffer must be fully sent to the peer, or else the encoder and
    /// decoder may get out of sync.
    pub fn emit_instructions(&mut self, buf: &mut [u8]) -> usize {
        self.encoder_stream_sender.emit(buf)
    }

    fn process_decoder_stream(&mut self, mut data: &[u8]) -> Result<()> {
        while let Some(instruction) =
            self.decoder_stream_receiver.decode(&mut data)?
        {
            self.on_decoder_instruction(instruction)?;
        }

        Ok(())
    }

    fn on_decoder_instruction(
        &mut self, instruction: DecoderInstruction,
    ) -> Result<()> {
        match instruction {
            DecoderInstruction::InsertCountIncrement { increment } => {
                if increment == 0 ||
                    !self.blocking_manager.on_insert_count_increment(increment)
                {
                    return Err(Error::InvalidInsertCountIncrement);
                }

                if self.blocking_manager.known_received_count() >
                    self.table.inserted_entry_count()
                {
                    return Err(Error::InvalidInsertCountIncrement);
                }
            },

            DecoderInstruction::HeaderAcknowledgement { stream_id } => {
                if !self.blocking_manager.on_header_acknowledgement(stream_id) {
                    return Err(Error::UnexpectedHeaderAcknowledgement);
                }
            },

            DecoderInstruction::StreamCancellation { stream_id } =>
                self.blocking_manager.on_stream_cancellation(stream_id),
        }

        Ok(())
    }

    /// Picks the representation of a header field, recording referenced
    /// dynamic entries in `referenced`.
    fn representation<'a, T: NameValue>(
        &self, stream_id: u64, h: &'a T, referenced: &mut IndexSet,
    ) -> Representation<'a> {
        let name = lowercase(h.name());
        let value = h.value();

        // Unacknowledged entries can only be referenced if that doesn't
        // block too many streams, and draining entries not at all.
        let known_received_count = self.blocking_manager.known_received_count();
        let blocking_allowed = self
            .blocking_manager
            .blocking_allowed_on_stream(stream_id, self.maximum_blocked_streams);
        let draining_index = self.table.draining_index(DRAINING_FRACTION);

        let usable = |index: u64| {
            index >= draining_index &&
                (index < known_received_count || blocking_allowed)
        };

        let m = self.table.find_header_field(&name, value);

        if m.match_type == MatchType::NameAndValue &&
            (m.is_static || usable(m.index))
        {
            if !m.is_static {
                referenced.insert(m.index);
            }

            return Representation::Indexed {
                is_static: m.is_static,
                index: m.index,
            };
        }

        let m = self.table.find_header_name(&name);

        if m.match_type == MatchType::Name && (m.is_static || usable(m.index)) {
            if !m.is_static {
                referenced.insert(m.index);
            }

            return Representation::LiteralWithNameReference {
                is_static: m.is_static,
                index: m.index,
                value,
            };
        }

        Representation::Literal { name, value }
    }

    fn encode_representation(
        &self, r: &Representation, base: u64, b: &mut octets::OctetsMut,
    ) -> Result<()> {
        // Dynamic entries are referenced relative to the Base.
        let relative = |is_static: bool, index: u64| {
            if is_static {
                index
            } else {
                base - 1 - index
            }
        };

        match r {
            Representation::Indexed { is_static, index } => {
                let values = InstructionValues {
                    s_bit: *is_static,
                    varint: relative(*is_static, *index),
                    ..Default::default()
                };

                encode_instruction(&INDEXED_HEADER_FIELD, &values, false, b)
            },

            Representation::LiteralWithNameReference {
                is_static,
                index,
                value,
            } => {
                let values = InstructionValues {
                    s_bit: *is_static,
                    varint: relative(*is_static, *index),
                    value,
                    ..Default::default()
                };

                encode_instruction(
                    &LITERAL_WITH_NAME_REFERENCE,
                    &values,
                    self.huffman,
                    b,
                )
            },

            Representation::Literal { name, value } => {
                let values = InstructionValues {
                    name,
                    value,
                    ..Default::default()
                };

                encode_instruction(
                    &LITERAL_WITHOUT_NAME_REFERENCE,
                    &values,
                    self.huffman,
                    b,
                )
            },
        }
    }
}

/// Lowercases `name`, only allocating if it contains uppercase characters.
fn lowercase(name: &[u8]) -> Cow<'_, [u8]> {
    if name.iter().any(u8::is_ascii_uppercase) {
        return Cow::Owned(name.to_ascii_lowercase());
    }

    Cow::Borrowed(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::Header;

    // RFC 9204, B.2 encoder stream: Set Dynamic Table Capacity = 220, then
    // insert (:authority, www.example.com) and (:path, /sample/path).
    const B2_ENCODER_STREAM: [u8; 34] = [
        0x3f, 0xbd, 0x01, 0xc0, 0x0f, 0x77, 0x77, 0x77, 0x2e, 0x65, 0x78, 0x61,
        0x6d, 0x70, 0x6c, 0x65, 0x2e, 0x63, 0x6f, 0x6d, 0xc1, 0x0c, 0x2f, 0x73,
        0x61, 0x6d, 0x70, 0x6c, 0x65, 0x2f, 0x70, 0x61, 0x74, 0x68,
    ];

    fn encoder(capacity: u64, max_blocked_streams: u64) -> Encoder {
        let mut config = Config::new();
        config.enable_huffman(false);

        let mut enc = Encoder::with_config(&config);

        assert!(enc.set_maximum_dynamic_table_capacity(capacity));
        assert!(enc.set_maximum_blocked_streams(max_blocked_streams));
        assert_eq!(enc.set_dynamic_table_capacity(capacity), Ok(()));

        enc
    }

    fn b2_encoder(max_blocked_streams: u64) -> Encoder {
        let mut enc = encoder(220, max_blocked_streams);

        assert_eq!(enc.insert(b":authority", b"www.example.com"), Ok(0));
        assert_eq!(enc.insert(b":path", b"/sample/path"), Ok(1));

        enc
    }

    fn b2_headers() -> Vec<Header> {
        vec![
            Header::new(b":authority", b"www.example.com"),
            Header::new(b":path", b"/sample/path"),
        ]
    }

    #[test]
    fn encode_static_header() {
        let mut encoded = [0u8; 240];

        let mut enc = Encoder::new();

        let headers = vec![Header::new(b":method", b"GET")];

        assert_eq!(enc.encode(0, &headers, &mut encoded), Ok(3));
        assert_eq!(encoded[..3], [0x00, 0x00, 0x80 | 0x40 | 17]);
        assert!(!enc.has_instructions());
    }

    #[test]
    fn encode_static_header_name_only() {
        let mut encoded = [0u8; 240];

        let mut enc = Encoder::new();

        let headers = vec![Header::new(b":method", b"FORGET")];

        assert_eq!(enc.encode(0, &headers, &mut encoded), Ok(11));
        assert_eq!(encoded[..4], [0x00, 0x00, 0x50 | 0x0f, 0x00]);
        assert_eq!(&encoded[4..11], b"\x06FORGET");
    }

    #[test]
    fn encode_lowercases_names() {
        let mut encoded = [0u8; 240];

        let mut enc = Encoder::new();

        let headers = vec![(&b":METHOD"[..], &b"GET"[..])];

        assert_eq!(enc.encode(0, &headers, &mut encoded), Ok(3));
        assert_eq!(encoded[..3], [0x00, 0x00, 0xd1]);
    }

    #[test]
    fn buffer_too_short() {
        let mut encoded = [0u8; 4];

        let mut enc = b2_encoder(1);

        assert_eq!(
            enc.encode(0, &b2_headers(), &mut encoded[..2]),
            Err(Error::BufferTooShort)
        );
        assert_eq!(enc.blocked_stream_count(), 0);

        assert_eq!(enc.encode(0, &b2_headers(), &mut encoded), Ok(4));
        assert_eq!(enc.blocked_stream_count(), 1);
    }

    #[test]
    fn insert_emits_encoder_instructions() {
        let mut enc = b2_encoder(0);

        assert!(enc.has_instructions());

        let mut buf = [0u8; 64];
        let len = enc.emit_instructions(&mut buf);

        assert_eq!(buf[..len], B2_ENCODER_STREAM);
        assert!(!enc.has_instructions());
    }

    #[test]
    fn insert_duplicate_and_dynamic_name_reference() {
        let mut enc = encoder(220, 0);

        assert_eq!(enc.insert(b"custom-key", b"custom-value"), Ok(0));
        assert_eq!(enc.insert(b"custom-key", b"custom-value"), Ok(1));
        assert_eq!(enc.insert(b"Custom-Key", b"other"), Ok(2));

        let mut buf = [0u8; 64];
        let len = enc.emit_instructions(&mut buf);

        let mut expected = vec![0x3f, 0xbd, 0x01];
        expected.push(0x4a);
        expected.extend_from_slice(b"custom-key");
        expected.push(0x0c);
        expected.extend_from_slice(b"custom-value");
        // Duplicate of relative index 0.
        expected.push(0x00);
        // Dynamic name reference with relative index 0.
        expected.push(0x80);
        expected.push(0x05);
        expected.extend_from_slice(b"other");

        assert_eq!(buf[..len], expected[..]);
    }

    #[test]
    fn insert_too_large() {
        let mut enc = encoder(40, 0);

        assert_eq!(enc.insert(b"name", b"value"), Err(Error::EntryTooLarge));
        assert_eq!(enc.table().inserted_entry_count(), 0);
    }

    #[test]
    fn encode_dynamic_blocking() {
        let mut encoded = [0u8; 64];

        let mut enc = b2_encoder(1);

        assert_eq!(enc.encode(0, &b2_headers(), &mut encoded), Ok(4));

        // Required Insert Count 2 and Base 2, so relative indices 1 and 0.
        assert_eq!(encoded[..4], [0x03, 0x00, 0x81, 0x80]);
        assert_eq!(enc.blocked_stream_count(), 1);

        // The only blocked stream slot is taken.
        let len = enc.encode(4, &b2_headers(), &mut encoded).unwrap();

        assert_eq!(encoded[..3], [0x00, 0x00, 0x50]);
        assert_eq!(len, 2 + 1 + 1 + 15 + 1 + 1 + 12);
        assert_eq!(enc.blocked_stream_count(), 1);

        // Streams already blocked can keep referencing unacknowledged
        // entries.
        assert_eq!(enc.encode(0, &b2_headers(), &mut encoded), Ok(4));
        assert_eq!(enc.blocked_stream_count(), 1);
    }

    #[test]
    fn encode_without_blocking() {
        let mut encoded = [0u8; 64];

        let mut enc = b2_encoder(0);

        let len = enc.encode(0, &b2_headers(), &mut encoded).unwrap();

        // Literals with static name references.
        let mut expected = vec![0x00, 0x00, 0x50, 0x0f];
        expected.extend_from_slice(b"www.example.com");
        expected.extend_from_slice(&[0x51, 0x0c]);
        expected.extend_from_slice(b"/sample/path");

        assert_eq!(encoded[..len], expected[..]);
        assert_eq!(enc.blocked_stream_count(), 0);

        // Insert Count Increment of 2.
        assert_eq!(enc.on_decoder_stream_data(&[0x02]), Ok(()));

        assert_eq!(enc.encode(4, &b2_headers(), &mut encoded), Ok(4));
        assert_eq!(encoded[..4], [0x03, 0x00, 0x81, 0x80]);
        assert_eq!(enc.blocked_stream_count(), 0);
    }

    #[test]
    fn draining_entries_are_not_referenced() {
        let mut encoded = [0u8; 64];

        let mut enc = encoder(100, 1);

        assert_eq!(enc.insert(b"a", b"aaaaaaa"), Ok(0));
        assert_eq!(enc.insert(b"b", b"bbbbbbb"), Ok(1));

        // Entry 0 is draining.
        let headers = vec![Header::new(b"a", b"aaaaaaa")];
        let len = enc.encode(0, &headers, &mut encoded).unwrap();

        assert_eq!(encoded[..len], *b"\x00\x00\x21a\x07aaaaaaa");
        assert_eq!(enc.blocked_stream_count(), 0);

        let headers = vec![Header::new(b"b", b"bbbbbbb")];

        assert_eq!(enc.encode(0, &headers, &mut encoded), Ok(3));
        assert_eq!(encoded[..3], [0x03, 0x00, 0x80]);
    }

    #[test]
    fn referenced_entries_are_not_evicted() {
        let mut encoded = [0u8; 64];

        let mut enc = encoder(100, 1);

        assert_eq!(enc.insert(b"a", b"aaaaaaa"), Ok(0));
        assert_eq!(enc.insert(b"b", b"bbbbbbb"), Ok(1));

        let headers = vec![Header::new(b"b", b"bbbbbbb")];
        assert_eq!(enc.encode(0, &headers, &mut encoded), Ok(3));

        // Evicting entry 0 is fine, but not entry 1.
        let large = [b'c'; 37];
        assert_eq!(enc.insert(b"c", &large), Err(Error::DynamicTableFull));
        assert_eq!(
            enc.set_dynamic_table_capacity(30),
            Err(Error::DynamicTableFull)
        );

        // Header Acknowledgement for stream 0.
        assert_eq!(enc.on_decoder_stream_data(&[0x80]), Ok(()));

        assert_eq!(enc.insert(b"c", &large), Ok(2));
        assert_eq!(enc.table().dropped_entry_count(), 2);
    }

    #[test]
    fn set_dynamic_table_capacity() {
        let mut enc = Encoder::new();

        assert_eq!(
            enc.set_dynamic_table_capacity(1),
            Err(Error::MaximumCapacityViolation)
        );

        assert!(enc.set_maximum_dynamic_table_capacity(100));
        assert!(!enc.set_maximum_dynamic_table_capacity(200));

        assert_eq!(enc.set_dynamic_table_capacity(100), Ok(()));
        assert_eq!(
            enc.set_dynamic_table_capacity(101),
            Err(Error::MaximumCapacityViolation)
        );

        assert_eq!(enc.insert(b"a", b"aaaaaaa"), Ok(0));
        assert_eq!(enc.set_dynamic_table_capacity(0), Ok(()));
        assert_eq!(enc.table().dropped_entry_count(), 1);
    }

    #[test]
    fn maximum_blocked_streams_never_decreases() {
        let mut enc = Encoder::new();

        assert!(enc.set_maximum_blocked_streams(10));
        assert!(enc.set_maximum_blocked_streams(10));
        assert!(!enc.set_maximum_blocked_streams(9));
        assert!(enc.set_maximum_blocked_streams(11));
    }

    #[test]
    fn stream_cancellation_unblocks() {
        let mut encoded = [0u8; 64];

        let mut enc = b2_encoder(1);

        assert_eq!(enc.encode(0, &b2_headers(), &mut encoded), Ok(4));
        assert_eq!(enc.blocked_stream_count(), 1);

        // Stream Cancellation for stream 0.
        assert_eq!(enc.on_decoder_stream_data(&[0x40]), Ok(()));
        assert_eq!(enc.blocked_stream_count(), 0);

        assert_eq!(enc.encode(4, &b2_headers(), &mut encoded), Ok(4));
        assert_eq!(enc.blocked_stream_count(), 1);
    }

    #[test]
    fn zero_insert_count_increment() {
        let mut enc = b2_encoder(0);

        assert_eq!(
            enc.on_decoder_stream_data(&[0x00]),
            Err(Error::InvalidInsertCountIncrement)
        );

        // Errors are latched.
        assert_eq!(
            enc.on_decoder_stream_data(&[0x01]),
            Err(Error::InvalidInsertCountIncrement)
        );
        assert_eq!(
            enc.insert(b"name", b"value"),
            Err(Error::InvalidInsertCountIncrement)
        );
    }

    #[test]
    fn insert_count_increment_beyond_inserts() {
        let mut enc = b2_encoder(0);

        assert_eq!(
            enc.on_decoder_stream_data(&[0x03]),
            Err(Error::InvalidInsertCountIncrement)
        );
    }

    #[test]
    fn unexpected_header_acknowledgement() {
        let mut enc = Encoder::new();

        assert_eq!(
            enc.on_decoder_stream_data(&[0x81]),
            Err(Error::UnexpectedHeaderAcknowledgement)
        );
    }

    #[test]
    fn fragmented_decoder_stream() {
        let mut encoded = [0u8; 64];

        let mut enc = b2_encoder(1);

        assert_eq!(enc.encode(1337, &b2_headers(), &mut encoded), Ok(4));

        // Header Acknowledgement for stream 1337, one byte at a time.
        for b in [0xff, 0xba, 0x09] {
            assert_eq!(enc.on_decoder_stream_data(&[b]), Ok(()));
        }

        assert_eq!(enc.blocked_stream_count(), 0);
        assert_eq!(enc.blocking_manager.known_received_count(), 2);
    }
}
