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
use std::collections::VecDeque;

use crate::blocked_streams::BlockedStreams;
use crate::decoder_stream::DecoderStreamSender;
use crate::encoder_stream::EncoderInstruction;
use crate::encoder_stream::EncoderStreamReceiver;
use crate::header_table::DecoderHeaderTable;
use crate::progressive_decoder::DecodedHeaders;
use crate::progressive_decoder::ProgressiveDecoder;
use crate::static_table::StaticTable;
use crate::Config;
use crate::Error;
use crate::Result;

/// An event reported by [`Decoder::poll()`] for a header block that was
/// blocked when its end was signaled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The header block was decoded.
    Headers(DecodedHeaders),

    /// Decoding the header block failed. Only the stream carrying it is
    /// affected, see [`QPACK_DECOMPRESSION_FAILED`].
    ///
    /// [`QPACK_DECOMPRESSION_FAILED`]: constant.QPACK_DECOMPRESSION_FAILED.html
    DecodingError(Error),
}

/// A QPACK decoder.
///
/// Owns the decoder's view of the dynamic table and decodes the header
/// blocks of all request streams of a connection. Data received on the
/// peer's encoder stream is passed to [`on_encoder_stream_data()`], and
/// instructions for the local decoder stream are produced by
/// [`emit_instructions()`].
///
/// [`on_encoder_stream_data()`]: struct.Decoder.html#method.on_encoder_stream_data
/// [`emit_instructions()`]: struct.Decoder.html#method.emit_instructions
pub struct Decoder {
    table: DecoderHeaderTable,

    encoder_stream_receiver: EncoderStreamReceiver,

    decoder_stream_sender: DecoderStreamSender,

    blocked_streams: BlockedStreams,

    /// Header blocks that have started but not completed, by stream ID.
    decoders: HashMap<u64, ProgressiveDecoder>,

    max_field_section_size: u64,

    /// The number of inserts the encoder knows the decoder has received.
    known_received_count: u64,

    events: VecDeque<(u64, Event)>,

    /// Encoder stream error, fatal to the connection.
    error: Option<Error>,
}

impl Decoder {
    /// Creates a new QPACK decoder.
    ///
    /// `max_table_capacity` and `max_blocked_streams` are the values of the
    /// `SETTINGS_QPACK_MAX_TABLE_CAPACITY` and
    /// `SETTINGS_QPACK_BLOCKED_STREAMS` settings sent to the peer.
    pub fn new(max_table_capacity: u64, max_blocked_streams: u64) -> Decoder {
        let mut table = DecoderHeaderTable::new();
        table.set_maximum_dynamic_table_capacity(max_table_capacity);

        Decoder {
            table,
            encoder_stream_receiver: EncoderStreamReceiver::new(),
            decoder_stream_sender: DecoderStreamSender::new(),
            blocked_streams: BlockedStreams::new(max_blocked_streams),
            decoders: HashMap::new(),
            max_field_section_size: u64::MAX,
            known_received_count: 0,
            events: VecDeque::new(),
            error: None,
        }
    }

    /// Creates a new QPACK decoder with the settings from `config`.
    pub fn with_config(config: &Config) -> Decoder {
        let mut decoder = Decoder::new(
            config.qpack_max_table_capacity(),
            config.qpack_blocked_streams(),
        );

        decoder.max_field_section_size = config.max_field_section_size();

        decoder
    }

    /// Returns the decoder's view of the dynamic table.
    pub fn table(&self) -> &DecoderHeaderTable {
        &self.table
    }

    /// Returns the number of header blocks currently blocked on the dynamic
    /// table.
    pub fn blocked_stream_count(&self) -> usize {
        self.blocked_streams.blocked_stream_count()
    }

    /// Processes data received on the peer's encoder stream.
    ///
    /// Header blocks unblocked by new entries are decoded before this
    /// returns, and reported by [`poll()`](Self::poll).
    ///
    /// Errors are fatal to the connection, which should be closed with
    /// [`QPACK_ENCODER_STREAM_ERROR`]. Once an error is returned, the same
    /// error is returned by all following calls.
    ///
    /// [`QPACK_ENCODER_STREAM_ERROR`]: constant.QPACK_ENCODER_STREAM_ERROR.html
    pub fn on_encoder_stream_data(&mut self, data: &[u8]) -> Result<()> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let res = self.process_encoder_stream(data);

        if let Err(e) = res {
            debug!("encoder stream error {:?}", e);

            self.error = Some(e);
        }

        res
    }

    /// Processes part of the header block of `stream_id`.
    ///
    /// Errors only affect the given stream, which should be reset with
    /// [`QPACK_DECOMPRESSION_FAILED`].
    ///
    /// [`QPACK_DECOMPRESSION_FAILED`]: constant.QPACK_DECOMPRESSION_FAILED.html
    pub fn decode_header_block(
        &mut self, stream_id: u64, data: &[u8],
    ) -> Result<()> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let decoder = self.decoders.entry(stream_id).or_insert_with(|| {
            ProgressiveDecoder::new(stream_id, self.max_field_section_size)
        });

        let res =
            decoder.decode(data, &mut self.table, &mut self.blocked_streams);

        if res.is_err() {
            self.discard(stream_id);
        }

        res
    }

    /// Signals the end of the header block of `stream_id`.
    ///
    /// Returns the decoded headers, or `None` if the header block is
    /// blocked, in which case the outcome will be reported by
    /// [`poll()`](Self::poll).
    pub fn end_header_block(
        &mut self, stream_id: u64,
    ) -> Result<Option<DecodedHeaders>> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let decoder = self
            .decoders
            .get_mut(&stream_id)
            .ok_or(Error::InvalidState)?;

        let required_insert_count = decoder.required_insert_count();

        match decoder.end_header_block(&mut self.table, &mut self.blocked_streams)
        {
            Ok(Some(headers)) => {
                self.decoders.remove(&stream_id);
                self.acknowledge(stream_id, required_insert_count)?;

                Ok(Some(headers))
            },

            Ok(None) => Ok(None),

            Err(e) => {
                self.discard(stream_id);

                Err(e)
            },
        }
    }

    /// Abandons any header block in progress on `stream_id`, because the
    /// stream was reset or is no longer of interest.
    pub fn on_stream_reset(&mut self, stream_id: u64) -> Result<()> {
        self.discard(stream_id);

        // Those notifications MAY be omitted if there is no dynamic table.
        if self.table.maximum_dynamic_table_capacity() > 0 {
            self.decoder_stream_sender.send_stream_cancellation(stream_id)?;
        }

        Ok(())
    }

    /// Returns the next event for a previously blocked header block.
    ///
    /// Returns [`Error::Done`] when there are no events.
    pub fn poll(&mut self) -> Result<(u64, Event)> {
        self.events.pop_front().ok_or(Error::Done)
    }

    /// Check if the decoder wants to emit any instructions on the decoder
    /// stream.
    pub fn has_instructions(&self) -> bool {
        self.decoder_stream_sender.has_pending() ||
            self.table.inserted_entry_count() > self.known_received_count
    }

    /// Emit any pending instructions on the decoder stream. Once emitted
    /// the buffer must be fully sent to the peer, or else the encoder and
    /// decoder may get out of sync.
    pub fn emit_instructions(&mut self, buf: &mut [u8]) -> usize {
        let increment =
            self.table.inserted_entry_count() - self.known_received_count;

        if increment > 0 &&
            self.decoder_stream_sender
                .send_insert_count_increment(increment)
                .is_ok()
        {
            self.known_received_count = self.table.inserted_entry_count();
        }

        self.decoder_stream_sender.emit(buf)
    }

    fn process_encoder_stream(&mut self, mut data: &[u8]) -> Result<()> {
        while let Some(instruction) =
            self.encoder_stream_receiver.decode(&mut data)?
        {
            self.on_encoder_instruction(instruction)?;
        }

        Ok(())
    }

    fn on_encoder_instruction(
        &mut self, instruction: EncoderInstruction,
    ) -> Result<()> {
        match instruction {
            EncoderInstruction::SetDynamicTableCapacity { capacity } => {
                if !self.table.set_dynamic_table_capacity(capacity) {
                    return Err(Error::MaximumCapacityViolation);
                }
            },

            EncoderInstruction::InsertWithNameReference {
                is_static: true,
                name_index,
                value,
            } => {
                let (name, _) = StaticTable::get()
                    .lookup(name_index)
                    .ok_or(Error::InvalidStaticTableIndex)?;

                self.insert(name, &value)?;
            },

            EncoderInstruction::InsertWithNameReference {
                is_static: false,
                name_index,
                value,
            } => {
                let index = self.relative_to_absolute(name_index)?;
                let (name, _) = self.table.lookup_entry(false, index)?;
                let name = name.to_vec();

                self.insert(&name, &value)?;
            },

            EncoderInstruction::InsertWithoutNameReference { name, value } =>
                self.insert(&name, &value)?,

            EncoderInstruction::Duplicate { index } => {
                let index = self.relative_to_absolute(index)?;
                let (name, value) = self.table.lookup_entry(false, index)?;
                let (name, value) = (name.to_vec(), value.to_vec());

                self.insert(&name, &value)?;
            },
        }

        Ok(())
    }

    /// Converts an index relative to the insert count, as used on the
    /// encoder stream, to an absolute index.
    fn relative_to_absolute(&self, relative_index: u64) -> Result<u64> {
        self.table
            .inserted_entry_count()
            .checked_sub(relative_index)
            .and_then(|v| v.checked_sub(1))
            .ok_or(Error::InvalidDynamicTableIndex)
    }

    fn insert(&mut self, name: &[u8], value: &[u8]) -> Result<()> {
        let released = self.table.insert_entry(name, value)?;

        for stream_id in released {
            self.resume(stream_id)?;
        }

        Ok(())
    }

    /// Resumes the blocked header block of `stream_id`.
    fn resume(&mut self, stream_id: u64) -> Result<()> {
        let Some(decoder) = self.decoders.get_mut(&stream_id) else {
            return Ok(());
        };

        let required_insert_count = decoder.required_insert_count();

        let res = decoder
            .on_insert_count_reached(&mut self.table, &mut self.blocked_streams);

        let event = match res {
            Ok(None) => return Ok(()),

            Ok(Some(headers)) => {
                self.acknowledge(stream_id, required_insert_count)?;

                Event::Headers(headers)
            },

            Err(e) => Event::DecodingError(e),
        };

        self.decoders.remove(&stream_id);
        self.events.push_back((stream_id, event));

        Ok(())
    }

    /// Drops the header block of `stream_id`, releasing its observer and
    /// blocked stream slot if it still holds them.
    fn discard(&mut self, stream_id: u64) {
        if let Some(mut decoder) = self.decoders.remove(&stream_id) {
            decoder.abort(&mut self.table, &mut self.blocked_streams);
        }
    }

    /// Cancels every blocked header block, since the dynamic table they
    /// wait on is going away.
    fn cancel_blocked(&mut self) {
        for stream_id in self.table.cancel_observers() {
            if let Some(decoder) = self.decoders.get_mut(&stream_id) {
                decoder.cancel();
            }
        }
    }

    fn acknowledge(
        &mut self, stream_id: u64, required_insert_count: u64,
    ) -> Result<()> {
        if required_insert_count == 0 {
            return Ok(());
        }

        self.decoder_stream_sender
            .send_header_acknowledgement(stream_id)?;

        self.known_received_count =
            self.known_received_count.max(required_insert_count);

        Ok(())
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        self.cancel_blocked();
    }
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

    // RFC 9204, B.3 encoder stream: Insert With Literal Name
    // (custom-key, custom-value).
    const B3_ENCODER_STREAM: [u8; 24] = [
        0x4a, 0x63, 0x75, 0x73, 0x74, 0x6f, 0x6d, 0x2d, 0x6b, 0x65, 0x79, 0x0c,
        0x63, 0x75, 0x73, 0x74, 0x6f, 0x6d, 0x2d, 0x76, 0x61, 0x6c, 0x75, 0x65,
    ];

    fn decode(
        decoder: &mut Decoder, stream_id: u64, block: &[u8],
    ) -> Result<Option<DecodedHeaders>> {
        decoder.decode_header_block(stream_id, block)?;
        decoder.end_header_block(stream_id)
    }

    fn chk_hdr(decoder: &Decoder, index: u64, n: &str, v: &str) -> bool {
        let (name, value) = decoder.table().lookup_entry(false, index).unwrap();

        name == n.as_bytes() && value == v.as_bytes()
    }

    #[test]
    fn decode_static() {
        let mut decoder = Decoder::new(0, 0);

        // RFC 9204, B.1.
        let block = [
            0x00, 0x00, 0x51, 0x0b, 0x2f, 0x69, 0x6e, 0x64, 0x65, 0x78, 0x2e,
            0x68, 0x74, 0x6d, 0x6c,
        ];

        let decoded = decode(&mut decoder, 0, &block).unwrap().unwrap();

        assert_eq!(decoded.headers, vec![Header::new(b":path", b"/index.html")]);
        assert!(!decoder.has_instructions());
    }

    #[test]
    fn decode_dynamic1() {
        let mut decoder = Decoder::new(300, 0);
        let mut decoder_stream = [0u8; 16];

        assert!(!decoder.has_instructions());

        decoder.on_encoder_stream_data(&B2_ENCODER_STREAM).unwrap();

        assert_eq!(decoder.table().inserted_entry_count(), 2);
        assert_eq!(decoder.table().size(), 106);

        let n = decoder.emit_instructions(&mut decoder_stream);

        assert_eq!(n, 1);
        assert_eq!(decoder_stream[0], 0x02);

        // Stream 4: Required Insert Count = 2, Base = 0, two post-base
        // indexed fields.
        let decoded = decode(&mut decoder, 4, &[0x03, 0x81, 0x10, 0x11])
            .unwrap()
            .unwrap();

        assert_eq!(decoded.headers, vec![
            Header::new(b":authority", b"www.example.com"),
            Header::new(b":path", b"/sample/path"),
        ]);
        assert!(decoder.has_instructions());

        // Section Acknowledgement for stream 4.
        let n = decoder.emit_instructions(&mut decoder_stream);

        assert_eq!(n, 1);
        assert_eq!(decoder_stream[0], 0x84);
        assert!(!decoder.has_instructions());
    }

    #[test]
    fn decode_dynamic2() {
        let mut decoder = Decoder::new(300, 0);
        let mut decoder_stream = [0u8; 16];

        decoder.on_encoder_stream_data(&B2_ENCODER_STREAM).unwrap();
        decoder.emit_instructions(&mut decoder_stream);

        decoder.on_encoder_stream_data(&B3_ENCODER_STREAM).unwrap();

        assert_eq!(decoder.table().inserted_entry_count(), 3);
        assert_eq!(decoder.table().size(), 160);

        // Insert Count Increment (1).
        let n = decoder.emit_instructions(&mut decoder_stream);

        assert_eq!(n, 1);
        assert_eq!(decoder_stream[0], 0x01);

        assert!(chk_hdr(&decoder, 0, ":authority", "www.example.com"));
        assert!(chk_hdr(&decoder, 1, ":path", "/sample/path"));
        assert!(chk_hdr(&decoder, 2, "custom-key", "custom-value"));
    }

    #[test]
    fn decode_dynamic3() {
        let mut decoder = Decoder::new(300, 0);
        let mut decoder_stream = [0u8; 16];

        decoder.on_encoder_stream_data(&B2_ENCODER_STREAM).unwrap();
        decoder.on_encoder_stream_data(&B3_ENCODER_STREAM).unwrap();
        decoder.emit_instructions(&mut decoder_stream);

        // Duplicate (Relative Index = 2), absolute index 0.
        decoder.on_encoder_stream_data(&[0x02]).unwrap();
        decoder.emit_instructions(&mut decoder_stream);

        assert_eq!(decoder.table().inserted_entry_count(), 4);
        assert_eq!(decoder.table().size(), 217);
        assert!(chk_hdr(&decoder, 3, ":authority", "www.example.com"));

        // Stream 8: Required Insert Count = 4, Base = 4.
        let decoded = decode(&mut decoder, 8, &[0x05, 0x00, 0x80, 0xc1, 0x81])
            .unwrap()
            .unwrap();

        assert_eq!(decoded.headers, vec![
            Header::new(b":authority", b"www.example.com"),
            Header::new(b":path", b"/"),
            Header::new(b"custom-key", b"custom-value"),
        ]);

        let n = decoder.emit_instructions(&mut decoder_stream);

        assert_eq!(n, 1);
        assert_eq!(decoder_stream[0], 0x88);

        assert!(!decoder.has_instructions());
        decoder.on_stream_reset(8).unwrap();
        assert!(decoder.has_instructions());

        // Stream Cancellation (Stream = 8).
        let n = decoder.emit_instructions(&mut decoder_stream);

        assert_eq!(n, 1);
        assert_eq!(decoder_stream[0], 0x48);
    }

    #[test]
    /// Test partial instructions are properly buffered
    fn decode_dynamic4() {
        let mut decoder = Decoder::new(300, 0);

        let mut encoder_stream = B2_ENCODER_STREAM.to_vec();
        encoder_stream.extend_from_slice(&B3_ENCODER_STREAM);
        encoder_stream.push(0x02);

        decoder.on_encoder_stream_data(&encoder_stream[..7]).unwrap();
        decoder.on_encoder_stream_data(&encoder_stream[7..31]).unwrap();
        decoder.on_encoder_stream_data(&encoder_stream[31..]).unwrap();

        assert!(chk_hdr(&decoder, 0, ":authority", "www.example.com"));
        assert!(chk_hdr(&decoder, 1, ":path", "/sample/path"));
        assert!(chk_hdr(&decoder, 2, "custom-key", "custom-value"));
        assert!(chk_hdr(&decoder, 3, ":authority", "www.example.com"));
    }

    #[test]
    /// Test entries are evicted
    fn decode_dynamic5() {
        let mut decoder = Decoder::new(200, 0);

        // Set Dynamic Table Capacity = 200.
        let mut encoder_stream = vec![0x3f, 0xa9, 0x01];
        encoder_stream.extend_from_slice(&B2_ENCODER_STREAM[3..]);
        encoder_stream.extend_from_slice(&B3_ENCODER_STREAM);
        encoder_stream.push(0x02);

        decoder.on_encoder_stream_data(&encoder_stream).unwrap();

        assert_eq!(decoder.table().size(), 160);
        assert!(decoder.table().lookup_entry(false, 0).is_err());
        assert!(chk_hdr(&decoder, 1, ":path", "/sample/path"));
        assert!(chk_hdr(&decoder, 2, "custom-key", "custom-value"));
        assert!(chk_hdr(&decoder, 3, ":authority", "www.example.com"));
    }

    #[test]
    fn blocked_header_block_is_reported_by_poll() {
        let mut decoder = Decoder::new(300, 1);
        let mut decoder_stream = [0u8; 16];

        // The header block arrives before the encoder stream.
        decoder
            .decode_header_block(4, &[0x03, 0x81, 0x10, 0x11])
            .unwrap();
        assert_eq!(decoder.end_header_block(4), Ok(None));

        assert_eq!(decoder.blocked_stream_count(), 1);
        assert_eq!(decoder.poll(), Err(Error::Done));

        // Only the capacity and the first insert.
        decoder
            .on_encoder_stream_data(&B2_ENCODER_STREAM[..20])
            .unwrap();
        assert_eq!(decoder.poll(), Err(Error::Done));

        decoder
            .on_encoder_stream_data(&B2_ENCODER_STREAM[20..])
            .unwrap();

        let (stream_id, event) = decoder.poll().unwrap();

        assert_eq!(stream_id, 4);
        assert_eq!(
            event,
            Event::Headers(DecodedHeaders {
                headers: vec![
                    Header::new(b":authority", b"www.example.com"),
                    Header::new(b":path", b"/sample/path"),
                ],
                limit_exceeded: false,
                compressed_bytes: 4,
                uncompressed_bytes: 42,
                uncompressed_bytes_including_overhead: 106,
            })
        );

        assert_eq!(decoder.poll(), Err(Error::Done));
        assert_eq!(decoder.blocked_stream_count(), 0);

        // The acknowledgement covers all inserts, no increment is needed.
        let n = decoder.emit_instructions(&mut decoder_stream);

        assert_eq!(&decoder_stream[..n], &[0x84]);
    }

    #[test]
    fn blocked_streams_released_in_threshold_order() {
        let mut decoder = Decoder::new(300, 2);

        // Stream 0 needs two entries, stream 4 needs one.
        decode(&mut decoder, 0, &[0x03, 0x81, 0x10, 0x11]).unwrap();
        decode(&mut decoder, 4, &[0x02, 0x80, 0x10]).unwrap();

        decoder.on_encoder_stream_data(&B2_ENCODER_STREAM).unwrap();

        assert_eq!(decoder.poll().unwrap().0, 4);
        assert_eq!(decoder.poll().unwrap().0, 0);
        assert_eq!(decoder.poll(), Err(Error::Done));
    }

    #[test]
    fn blocked_stream_error_is_reported_by_poll() {
        let mut decoder = Decoder::new(300, 1);

        // Required Insert Count = 1, but the block references the second
        // entry.
        decode(&mut decoder, 4, &[0x02, 0x80, 0x11]).unwrap();

        decoder.on_encoder_stream_data(&B2_ENCODER_STREAM).unwrap();

        assert_eq!(
            decoder.poll(),
            Ok((4, Event::DecodingError(Error::InvalidDynamicTableIndex)))
        );

        // The connection is unaffected.
        assert_eq!(decoder.blocked_stream_count(), 0);
        assert!(decoder.on_encoder_stream_data(&B3_ENCODER_STREAM).is_ok());
    }

    #[test]
    fn too_many_blocked_streams() {
        let mut decoder = Decoder::new(300, 1);

        decode(&mut decoder, 0, &[0x03, 0x81, 0x10, 0x11]).unwrap();

        assert_eq!(
            decoder.decode_header_block(4, &[0x02, 0x80, 0x10]),
            Err(Error::BlockedStreamLimitExceeded)
        );

        assert_eq!(decoder.blocked_stream_count(), 1);
    }

    #[test]
    fn reset_blocked_stream() {
        let mut decoder = Decoder::new(300, 1);
        let mut decoder_stream = [0u8; 16];

        decode(&mut decoder, 4, &[0x03, 0x81, 0x10, 0x11]).unwrap();
        decoder.on_stream_reset(4).unwrap();

        assert_eq!(decoder.blocked_stream_count(), 0);

        decoder.on_encoder_stream_data(&B2_ENCODER_STREAM).unwrap();
        assert_eq!(decoder.poll(), Err(Error::Done));

        // Stream Cancellation, then Insert Count Increment (2).
        let n = decoder.emit_instructions(&mut decoder_stream);
        assert_eq!(&decoder_stream[..n], &[0x44, 0x02]);
    }

    #[test]
    fn reset_without_dynamic_table() {
        let mut decoder = Decoder::new(0, 0);

        decoder.decode_header_block(4, &[0x00, 0x00]).unwrap();
        decoder.on_stream_reset(4).unwrap();

        assert!(!decoder.has_instructions());
    }

    #[test]
    fn encoder_stream_errors_are_latched() {
        let mut decoder = Decoder::new(100, 0);

        // Set Dynamic Table Capacity = 220.
        assert_eq!(
            decoder.on_encoder_stream_data(&B2_ENCODER_STREAM[..3]),
            Err(Error::MaximumCapacityViolation)
        );

        assert_eq!(
            decoder.on_encoder_stream_data(&[0x20]),
            Err(Error::MaximumCapacityViolation)
        );
        assert_eq!(
            decoder.decode_header_block(0, &[0x00, 0x00]),
            Err(Error::MaximumCapacityViolation)
        );
    }

    #[test]
    fn insert_into_zero_capacity_table() {
        let mut decoder = Decoder::new(300, 0);

        assert_eq!(
            decoder.on_encoder_stream_data(&B2_ENCODER_STREAM[3..]),
            Err(Error::EntryTooLarge)
        );
    }

    #[test]
    fn invalid_encoder_stream_references() {
        // Duplicate of a nonexistent entry.
        let mut decoder = Decoder::new(300, 0);
        assert_eq!(
            decoder.on_encoder_stream_data(&[0x3f, 0xbd, 0x01, 0x00]),
            Err(Error::InvalidDynamicTableIndex)
        );

        // Insert With Name Reference to static index 99.
        let mut decoder = Decoder::new(300, 0);
        assert_eq!(
            decoder.on_encoder_stream_data(&[0x3f, 0xbd, 0x01, 0xff, 0x24, 0x00]),
            Err(Error::InvalidStaticTableIndex)
        );

        // Insert With Name Reference to dynamic relative index 2 while only
        // two entries exist.
        let mut decoder = Decoder::new(300, 0);
        let mut encoder_stream = B2_ENCODER_STREAM.to_vec();
        encoder_stream.extend_from_slice(&[0x82, 0x00]);
        assert_eq!(
            decoder.on_encoder_stream_data(&encoder_stream),
            Err(Error::InvalidDynamicTableIndex)
        );
    }

    #[test]
    fn insert_with_dynamic_name_reference() {
        let mut decoder = Decoder::new(300, 0);

        decoder.on_encoder_stream_data(&B2_ENCODER_STREAM).unwrap();

        // Name of relative index 0 (:path), value "/".
        decoder.on_encoder_stream_data(&[0x80, 0x01, 0x2f]).unwrap();

        assert!(chk_hdr(&decoder, 2, ":path", "/"));
    }

    #[test]
    fn header_list_size_limit() {
        let mut config = Config::new();
        config.set_max_field_section_size(50);

        let mut decoder = Decoder::with_config(&config);

        // :method GET, :path /.
        let decoded = decode(&mut decoder, 0, &[0x00, 0x00, 0xd1, 0xc1])
            .unwrap()
            .unwrap();

        assert_eq!(decoded.headers, vec![Header::new(b":method", b"GET")]);
        assert!(decoded.limit_exceeded);
    }

    #[test]
    fn end_unknown_header_block() {
        let mut decoder = Decoder::new(0, 0);

        assert_eq!(decoder.end_header_block(0), Err(Error::InvalidState));
    }

    #[test]
    fn cancel_blocked_streams() {
        let mut decoder = Decoder::new(300, 2);

        decode(&mut decoder, 0, &[0x03, 0x81, 0x10, 0x11]).unwrap();
        decode(&mut decoder, 4, &[0x02, 0x80, 0x10]).unwrap();

        assert_eq!(decoder.table().observer_count(), 2);

        decoder.cancel_blocked();

        assert_eq!(decoder.table().observer_count(), 0);
        assert_eq!(decoder.decoders.len(), 2);
        assert!(decoder.decoders.values().all(|d| d.is_finished()));

        drop(decoder);
    }

    #[test]
    fn decode_after_end_while_blocked() {
        let mut decoder = Decoder::new(300, 1);

        assert_eq!(decode(&mut decoder, 4, &[0x03, 0x81, 0x10, 0x11]), Ok(None));
        assert_eq!(decoder.blocked_stream_count(), 1);

        assert_eq!(
            decoder.decode_header_block(4, &[0xd1]),
            Err(Error::InvalidState)
        );

        assert_eq!(decoder.blocked_stream_count(), 0);
        assert_eq!(decoder.table().observer_count(), 0);

        // The blocked stream slot is available again.
        assert_eq!(decode(&mut decoder, 8, &[0x03, 0x81, 0x10, 0x11]), Ok(None));
        assert_eq!(decoder.blocked_stream_count(), 1);
    }

    #[test]
    fn end_twice_while_blocked() {
        let mut decoder = Decoder::new(300, 1);

        assert_eq!(decode(&mut decoder, 4, &[0x03, 0x81, 0x10, 0x11]), Ok(None));

        assert_eq!(decoder.end_header_block(4), Err(Error::InvalidState));

        assert_eq!(decoder.blocked_stream_count(), 0);
        assert_eq!(decoder.table().observer_count(), 0);

        // A new header block on the same stream isn't resumed on behalf of
        // the discarded one.
        assert_eq!(decode(&mut decoder, 4, &[0x03, 0x81, 0x10, 0x11]), Ok(None));
        assert_eq!(decoder.table().observer_count(), 1);
        assert_eq!(decoder.poll(), Err(Error::Done));
    }
}
