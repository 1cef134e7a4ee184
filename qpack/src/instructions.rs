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

//! Declarative description of QPACK instructions, and a resumable decoder and
//! an encoder driven by it.
//!
//! Every instruction on the encoder stream, on the decoder stream, and in a
//! header block (including the header block prefix) is a sequence of fields
//! sharing octets in a fixed way: the opcode occupies the high bits of the
//! first octet, a one-bit flag or the prefix of an integer or string length
//! occupies the remaining low bits, and further fields start on the next
//! octet. Describing instructions as data allows a single state machine to
//! parse all of them one octet at a time.

use std::mem;

use crate::huffman;
use crate::prefix_int::encode_int;
use crate::prefix_int::encoded_int_len;
use crate::prefix_int::IntDecoder;
use crate::Error;
use crate::Result;

/// String literals declaring a longer length are rejected before any of
/// their octets are read.
pub const MAX_STRING_LITERAL_LENGTH: u64 = 1024 * 1024;

/// A single field of an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    /// A one-bit flag in the current octet, identified by its mask.
    SBit(u8),

    /// An integer with the given prefix length.
    Varint(u8),

    /// A second integer field, used only by the header block prefix.
    Varint2(u8),

    /// A name string literal, whose Huffman flag sits right above the
    /// length prefix.
    Name(u8),

    /// A value string literal, whose Huffman flag sits right above the
    /// length prefix.
    Value(u8),
}

impl Field {
    fn prefix(self) -> u8 {
        match self {
            Field::SBit(_) => 0,

            Field::Varint(prefix) |
            Field::Varint2(prefix) |
            Field::Name(prefix) |
            Field::Value(prefix) => prefix,
        }
    }
}

/// Identifies an instruction independently of the stream it's used on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    InsertWithNameReference,
    InsertWithoutNameReference,
    Duplicate,
    SetDynamicTableCapacity,

    InsertCountIncrement,
    HeaderAcknowledgement,
    StreamCancellation,

    Prefix,
    IndexedHeaderField,
    IndexedHeaderFieldPostBase,
    LiteralWithNameReference,
    LiteralWithPostBaseNameReference,
    LiteralWithoutNameReference,
}

/// The wire layout of an instruction: the opcode bits of the first octet
/// and the list of fields that follow.
#[derive(Debug)]
pub struct Instruction {
    pub opcode: Opcode,
    pub value: u8,
    pub mask: u8,
    pub fields: &'static [Field],
}

/// The set of instructions that may appear on a given stream. Every
/// possible first octet matches exactly one instruction of a language.
pub type Language = &'static [&'static Instruction];

pub static INSERT_WITH_NAME_REFERENCE: Instruction = Instruction {
    opcode: Opcode::InsertWithNameReference,
    value: 0b1000_0000,
    mask: 0b1000_0000,
    fields: &[Field::SBit(0b0100_0000), Field::Varint(6), Field::Value(7)],
};

pub static INSERT_WITHOUT_NAME_REFERENCE: Instruction = Instruction {
    opcode: Opcode::InsertWithoutNameReference,
    value: 0b0100_0000,
    mask: 0b1100_0000,
    fields: &[Field::Name(5), Field::Value(7)],
};

pub static DUPLICATE: Instruction = Instruction {
    opcode: Opcode::Duplicate,
    value: 0b0000_0000,
    mask: 0b1110_0000,
    fields: &[Field::Varint(5)],
};

pub static SET_DYNAMIC_TABLE_CAPACITY: Instruction = Instruction {
    opcode: Opcode::SetDynamicTableCapacity,
    value: 0b0010_0000,
    mask: 0b1110_0000,
    fields: &[Field::Varint(5)],
};

pub static ENCODER_STREAM_LANGUAGE: Language = &[
    &INSERT_WITH_NAME_REFERENCE,
    &INSERT_WITHOUT_NAME_REFERENCE,
    &DUPLICATE,
    &SET_DYNAMIC_TABLE_CAPACITY,
];

pub static INSERT_COUNT_INCREMENT: Instruction = Instruction {
    opcode: Opcode::InsertCountIncrement,
    value: 0b0000_0000,
    mask: 0b1100_0000,
    fields: &[Field::Varint(6)],
};

pub static HEADER_ACKNOWLEDGEMENT: Instruction = Instruction {
    opcode: Opcode::HeaderAcknowledgement,
    value: 0b1000_0000,
    mask: 0b1000_0000,
    fields: &[Field::Varint(7)],
};

pub static STREAM_CANCELLATION: Instruction = Instruction {
    opcode: Opcode::StreamCancellation,
    value: 0b0100_0000,
    mask: 0b1100_0000,
    fields: &[Field::Varint(6)],
};

pub static DECODER_STREAM_LANGUAGE: Language = &[
    &INSERT_COUNT_INCREMENT,
    &HEADER_ACKNOWLEDGEMENT,
    &STREAM_CANCELLATION,
];

/// Encoded Required Insert Count, followed by the sign bit and Delta Base.
pub static PREFIX: Instruction = Instruction {
    opcode: Opcode::Prefix,
    value: 0b0000_0000,
    mask: 0b0000_0000,
    fields: &[Field::Varint(8), Field::SBit(0b1000_0000), Field::Varint2(7)],
};

pub static PREFIX_LANGUAGE: Language = &[&PREFIX];

pub static INDEXED_HEADER_FIELD: Instruction = Instruction {
    opcode: Opcode::IndexedHeaderField,
    value: 0b1000_0000,
    mask: 0b1000_0000,
    fields: &[Field::SBit(0b0100_0000), Field::Varint(6)],
};

pub static INDEXED_HEADER_FIELD_POST_BASE: Instruction = Instruction {
    opcode: Opcode::IndexedHeaderFieldPostBase,
    value: 0b0001_0000,
    mask: 0b1111_0000,
    fields: &[Field::Varint(4)],
};

pub static LITERAL_WITH_NAME_REFERENCE: Instruction = Instruction {
    opcode: Opcode::LiteralWithNameReference,
    value: 0b0100_0000,
    mask: 0b1100_0000,
    fields: &[Field::SBit(0b0001_0000), Field::Varint(4), Field::Value(7)],
};

pub static LITERAL_WITH_POST_BASE_NAME_REFERENCE: Instruction = Instruction {
    opcode: Opcode::LiteralWithPostBaseNameReference,
    value: 0b0000_0000,
    mask: 0b1111_0000,
    fields: &[Field::Varint(3), Field::Value(7)],
};

pub static LITERAL_WITHOUT_NAME_REFERENCE: Instruction = Instruction {
    opcode: Opcode::LiteralWithoutNameReference,
    value: 0b0010_0000,
    mask: 0b1110_0000,
    fields: &[Field::Name(3), Field::Value(7)],
};

pub static REQUEST_STREAM_LANGUAGE: Language = &[
    &INDEXED_HEADER_FIELD,
    &INDEXED_HEADER_FIELD_POST_BASE,
    &LITERAL_WITH_NAME_REFERENCE,
    &LITERAL_WITH_POST_BASE_NAME_REFERENCE,
    &LITERAL_WITHOUT_NAME_REFERENCE,
];

/// The field values of a decoded instruction. Fields not present in the
/// instruction are left at their default.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub opcode: Opcode,
    pub s_bit: bool,
    pub varint: u64,
    pub varint2: u64,
    pub name: Vec<u8>,
    pub value: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    StartInstruction,
    StartField,
    ReadBit,
    VarintStart,
    VarintResume,
    VarintDone,
    ReadString,
    ReadStringDone,
}

/// Resumable decoder for the instructions of one [`Language`].
///
/// Input may be split at arbitrary points: whatever part of an instruction
/// has been seen is kept until the rest arrives. Once an error is returned
/// the decoder stays in error.
pub struct InstructionDecoder {
    language: Language,
    state: State,
    instruction: &'static Instruction,
    field: usize,

    s_bit: bool,
    varint: u64,
    varint2: u64,
    name: Vec<u8>,
    value: Vec<u8>,

    int_decoder: IntDecoder,
    int_value: u64,
    is_huffman: bool,
    string_length: usize,

    error: Option<Error>,
}

impl InstructionDecoder {
    /// Creates a decoder for `language`.
    pub fn new(language: Language) -> InstructionDecoder {
        debug_assert!(!language.is_empty());

        InstructionDecoder {
            language,
            state: State::StartInstruction,
            instruction: language[0],
            field: 0,

            s_bit: false,
            varint: 0,
            varint2: 0,
            name: Vec::new(),
            value: Vec::new(),

            int_decoder: IntDecoder::default(),
            int_value: 0,
            is_huffman: false,
            string_length: 0,

            error: None,
        }
    }

    /// Returns true if no instruction has been partially decoded.
    pub fn at_instruction_boundary(&self) -> bool {
        self.state == State::StartInstruction
    }

    /// Decodes at most one instruction from the front of `data`, advancing it
    /// past the consumed octets.
    ///
    /// Returns `Ok(None)` once `data` is exhausted without completing an
    /// instruction, in which case all of it has been consumed.
    pub fn decode(
        &mut self, data: &mut &[u8],
    ) -> Result<Option<DecodedInstruction>> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let res = self.decode_instruction(data);

        if let Err(e) = res {
            self.error = Some(e);
        }

        res
    }

    fn decode_instruction(
        &mut self, data: &mut &[u8],
    ) -> Result<Option<DecodedInstruction>> {
        loop {
            match self.state {
                State::StartInstruction => {
                    let Some(&first) = data.first() else {
                        return Ok(None);
                    };

                    self.start_instruction(first)?;
                },

                State::StartField => {
                    let Some(&field) = self.instruction.fields.get(self.field)
                    else {
                        self.state = State::StartInstruction;
                        return Ok(Some(self.take_instruction()));
                    };

                    self.state = match field {
                        Field::SBit(_) => State::ReadBit,
                        _ => State::VarintStart,
                    };
                },

                State::ReadBit => {
                    // The flag shares the octet with the next field, so it's
                    // not consumed here.
                    let Some(&byte) = data.first() else {
                        return Ok(None);
                    };

                    if let Field::SBit(mask) = self.current_field() {
                        self.s_bit = byte & mask == mask;
                    }

                    self.field += 1;
                    self.state = State::StartField;
                },

                State::VarintStart => {
                    let Some((&byte, rest)) = data.split_first() else {
                        return Ok(None);
                    };

                    *data = rest;

                    let field = self.current_field();
                    let prefix = field.prefix();

                    if let Field::Name(_) | Field::Value(_) = field {
                        self.is_huffman = byte & (1 << prefix) != 0;
                    }

                    self.state = match self.int_decoder.start(byte, prefix) {
                        Some(v) => {
                            self.int_value = v;
                            State::VarintDone
                        },

                        None => State::VarintResume,
                    };
                },

                State::VarintResume => {
                    let Some((&byte, rest)) = data.split_first() else {
                        return Ok(None);
                    };

                    *data = rest;

                    if let Some(v) = self.int_decoder.resume(byte)? {
                        self.int_value = v;
                        self.state = State::VarintDone;
                    }
                },

                State::VarintDone => self.varint_done()?,

                State::ReadString => {
                    if data.is_empty() {
                        return Ok(None);
                    }

                    let string_length = self.string_length;
                    let string = self.current_string();

                    let len = (string_length - string.len()).min(data.len());

                    string.extend_from_slice(&data[..len]);
                    *data = &data[len..];

                    if string.len() == string_length {
                        self.state = State::ReadStringDone;
                    }
                },

                State::ReadStringDone => {
                    if self.is_huffman {
                        let string = self.current_string();
                        *string = huffman::decode(string)?;
                    }

                    self.field += 1;
                    self.state = State::StartField;
                },
            }
        }
    }

    fn start_instruction(&mut self, first: u8) -> Result<()> {
        self.instruction = self
            .language
            .iter()
            .find(|i| first & i.mask == i.value)
            .ok_or(Error::InvalidState)?;

        self.field = 0;
        self.s_bit = false;
        self.varint = 0;
        self.varint2 = 0;
        self.name.clear();
        self.value.clear();

        self.state = State::StartField;

        Ok(())
    }

    fn varint_done(&mut self) -> Result<()> {
        let v = self.int_value;

        match self.current_field() {
            Field::Varint(_) => self.varint = v,

            Field::Varint2(_) => self.varint2 = v,

            Field::Name(_) | Field::Value(_) => {
                if v > MAX_STRING_LITERAL_LENGTH {
                    return Err(Error::StringLiteralTooLong);
                }

                self.string_length = v as usize;

                self.state = if self.string_length == 0 {
                    State::ReadStringDone
                } else {
                    State::ReadString
                };

                return Ok(());
            },

            Field::SBit(_) => return Err(Error::InvalidState),
        }

        self.field += 1;
        self.state = State::StartField;

        Ok(())
    }

    fn current_field(&self) -> Field {
        self.instruction.fields[self.field]
    }

    fn current_string(&mut self) -> &mut Vec<u8> {
        match self.current_field() {
            Field::Name(_) => &mut self.name,
            _ => &mut self.value,
        }
    }

    fn take_instruction(&mut self) -> DecodedInstruction {
        DecodedInstruction {
            opcode: self.instruction.opcode,
            s_bit: self.s_bit,
            varint: self.varint,
            varint2: self.varint2,
            name: mem::take(&mut self.name),
            value: mem::take(&mut self.value),
        }
    }
}

/// The field values of an instruction to encode.
#[derive(Clone, Copy, Debug, Default)]
pub struct InstructionValues<'a> {
    pub s_bit: bool,
    pub varint: u64,
    pub varint2: u64,
    pub name: &'a [u8],
    pub value: &'a [u8],
}

/// Encodes `instruction` with the given field values. String literals are
/// Huffman-coded only if `huffman` is set and it makes them strictly
/// shorter.
pub fn encode_instruction(
    instruction: &Instruction, values: &InstructionValues, huffman: bool,
    b: &mut octets::OctetsMut,
) -> Result<()> {
    let mut first = instruction.value;

    for &field in instruction.fields {
        match field {
            Field::SBit(mask) => {
                if values.s_bit {
                    first |= mask;
                }

                continue;
            },

            Field::Varint(prefix) => encode_int(values.varint, first, prefix, b)?,

            Field::Varint2(prefix) =>
                encode_int(values.varint2, first, prefix, b)?,

            Field::Name(prefix) =>
                encode_str(values.name, first, prefix, huffman, b)?,

            Field::Value(prefix) =>
                encode_str(values.value, first, prefix, huffman, b)?,
        }

        first = 0;
    }

    Ok(())
}

/// Returns the number of octets [`encode_instruction()`] writes.
pub fn encoded_instruction_len(
    instruction: &Instruction, values: &InstructionValues, huffman: bool,
) -> usize {
    instruction
        .fields
        .iter()
        .map(|&field| match field {
            Field::SBit(_) => 0,

            Field::Varint(prefix) => encoded_int_len(values.varint, prefix),

            Field::Varint2(prefix) => encoded_int_len(values.varint2, prefix),

            Field::Name(prefix) => encoded_str_len(values.name, prefix, huffman),

            Field::Value(prefix) =>
                encoded_str_len(values.value, prefix, huffman),
        })
        .sum()
}

/// Appends the encoding of `instruction` to `out`.
pub fn encode_instruction_to_vec(
    instruction: &Instruction, values: &InstructionValues, huffman: bool,
    out: &mut Vec<u8>,
) -> Result<()> {
    let start = out.len();
    let len = encoded_instruction_len(instruction, values, huffman);

    out.resize(start + len, 0);

    let res = {
        let mut b = octets::OctetsMut::with_slice(&mut out[start..]);
        encode_instruction(instruction, values, huffman, &mut b)
    };

    if res.is_err() {
        out.truncate(start);
    }

    res
}

fn huffman_len(v: &[u8], huffman: bool) -> Option<usize> {
    if !huffman {
        return None;
    }

    // Huffman-encoding generally saves space but in some cases it doesn't, for
    // those just encode the literal string.
    let len = huffman::encode_output_length(v);

    if len < v.len() {
        return Some(len);
    }

    None
}

fn encode_str(
    v: &[u8], first: u8, prefix: u8, huffman: bool, b: &mut octets::OctetsMut,
) -> Result<()> {
    match huffman_len(v, huffman) {
        Some(len) => {
            encode_int(len as u64, first | 1 << prefix, prefix, b)?;
            huffman::encode(v, b)?;
        },

        None => {
            encode_int(v.len() as u64, first, prefix, b)?;
            b.put_bytes(v)?;
        },
    }

    Ok(())
}

fn encoded_str_len(v: &[u8], prefix: u8, huffman: bool) -> usize {
    let len = huffman_len(v, huffman).unwrap_or(v.len());

    encoded_int_len(len as u64, prefix) + len
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    fn decode_all(
        decoder: &mut InstructionDecoder, data: &[u8], chunk: usize,
    ) -> Result<Vec<DecodedInstruction>> {
        let mut out = Vec::new();

        for mut chunk in data.chunks(chunk) {
            while let Some(i) = decoder.decode(&mut chunk)? {
                out.push(i);
            }

            assert!(chunk.is_empty());
        }

        Ok(out)
    }

    fn encode_to_vec(
        instruction: &Instruction, values: &InstructionValues, huffman: bool,
    ) -> Vec<u8> {
        let mut out =
            vec![0; encoded_instruction_len(instruction, values, huffman)];
        let mut b = octets::OctetsMut::with_slice(&mut out);

        encode_instruction(instruction, values, huffman, &mut b).unwrap();
        assert_eq!(b.cap(), 0);

        out
    }

    #[test]
    fn languages_are_complete_and_unambiguous() {
        for language in [
            ENCODER_STREAM_LANGUAGE,
            DECODER_STREAM_LANGUAGE,
            PREFIX_LANGUAGE,
            REQUEST_STREAM_LANGUAGE,
        ] {
            for b in 0..=255u8 {
                let matches =
                    language.iter().filter(|i| b & i.mask == i.value).count();

                assert_eq!(matches, 1, "octet {b:#010b}");
            }
        }
    }

    #[rstest]
    fn encoder_stream_fragmented(
        #[values(1, 2, 3, 7, 64)] chunk: usize,
    ) {
        // RFC 9204, B.2 and B.3 encoder stream.
        let encoder_stream = [
            0x3f, 0xbd, 0x01, 0xc0, 0x0f, 0x77, 0x77, 0x77, 0x2e, 0x65, 0x78,
            0x61, 0x6d, 0x70, 0x6c, 0x65, 0x2e, 0x63, 0x6f, 0x6d, 0xc1, 0x0c,
            0x2f, 0x73, 0x61, 0x6d, 0x70, 0x6c, 0x65, 0x2f, 0x70, 0x61, 0x74,
            0x68, 0x4a, 0x63, 0x75, 0x73, 0x74, 0x6f, 0x6d, 0x2d, 0x6b, 0x65,
            0x79, 0x0c, 0x63, 0x75, 0x73, 0x74, 0x6f, 0x6d, 0x2d, 0x76, 0x61,
            0x6c, 0x75, 0x65, 0x02,
        ];

        let mut decoder = InstructionDecoder::new(ENCODER_STREAM_LANGUAGE);
        let out = decode_all(&mut decoder, &encoder_stream, chunk).unwrap();

        assert!(decoder.at_instruction_boundary());
        assert_eq!(out.len(), 5);

        assert_eq!(out[0].opcode, Opcode::SetDynamicTableCapacity);
        assert_eq!(out[0].varint, 220);

        assert_eq!(out[1].opcode, Opcode::InsertWithNameReference);
        assert!(out[1].s_bit);
        assert_eq!(out[1].varint, 0);
        assert_eq!(out[1].value, b"www.example.com");

        assert_eq!(out[2].opcode, Opcode::InsertWithNameReference);
        assert_eq!(out[2].varint, 1);
        assert_eq!(out[2].value, b"/sample/path");

        assert_eq!(out[3].opcode, Opcode::InsertWithoutNameReference);
        assert_eq!(out[3].name, b"custom-key");
        assert_eq!(out[3].value, b"custom-value");

        assert_eq!(out[4].opcode, Opcode::Duplicate);
        assert_eq!(out[4].varint, 2);
    }

    #[test]
    fn prefix() {
        // Required Insert Count = 2, Base = 0.
        let mut decoder = InstructionDecoder::new(PREFIX_LANGUAGE);
        let mut data = &[0x03, 0x81, 0x10][..];

        let prefix = decoder.decode(&mut data).unwrap().unwrap();

        assert_eq!(prefix.opcode, Opcode::Prefix);
        assert_eq!(prefix.varint, 3);
        assert!(prefix.s_bit);
        assert_eq!(prefix.varint2, 1);
        assert_eq!(data, [0x10]);
    }

    #[test]
    fn partial_instruction_is_not_at_boundary() {
        let mut decoder = InstructionDecoder::new(REQUEST_STREAM_LANGUAGE);
        let mut data = &[0x5f][..];

        assert_eq!(decoder.decode(&mut data), Ok(None));
        assert!(data.is_empty());
        assert!(!decoder.at_instruction_boundary());
    }

    #[test]
    fn huffman_value() {
        // Literal with static name reference 4 (content-length), Huffman
        // value "1337".
        let values = InstructionValues {
            s_bit: true,
            varint: 4,
            value: b"1337",
            ..Default::default()
        };

        let encoded = encode_to_vec(&LITERAL_WITH_NAME_REFERENCE, &values, true);
        assert_eq!(encoded[0], 0b0101_0100);
        assert_eq!(encoded[1] & 0x80, 0x80);

        let mut decoder = InstructionDecoder::new(REQUEST_STREAM_LANGUAGE);
        let out = decode_all(&mut decoder, &encoded, 1).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].opcode, Opcode::LiteralWithNameReference);
        assert!(out[0].s_bit);
        assert_eq!(out[0].varint, 4);
        assert_eq!(out[0].value, b"1337");
    }

    #[rstest]
    fn literal_round_trip(
        #[values(true, false)] huffman: bool,
        #[values(
            &b""[..],
            &b"a"[..],
            &b"ZZZZZZZZ"[..],
            &b"custom-key"[..],
            &[0x00, 0xff, 0x7f, 0x80][..],
            &[b'x'; 300][..]
        )]
        string: &[u8],
    ) {
        let values = InstructionValues {
            name: string,
            value: string,
            ..Default::default()
        };

        let encoded =
            encode_to_vec(&INSERT_WITHOUT_NAME_REFERENCE, &values, huffman);

        let mut decoder = InstructionDecoder::new(ENCODER_STREAM_LANGUAGE);
        let out = decode_all(&mut decoder, &encoded, 5).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, string);
        assert_eq!(out[0].value, string);
    }

    #[test]
    fn huffman_not_used_when_not_shorter() {
        // 'Z' has an 8 bit code, Huffman would not save anything.
        let values = InstructionValues {
            name: b"ZZZZ",
            value: b"ZZZZ",
            ..Default::default()
        };

        let encoded =
            encode_to_vec(&INSERT_WITHOUT_NAME_REFERENCE, &values, true);

        assert_eq!(encoded[0], 0b0100_0100);
        assert_eq!(&encoded[1..5], b"ZZZZ");
        assert_eq!(encoded[5], 0b0000_0100);
        assert_eq!(&encoded[6..], b"ZZZZ");
    }

    #[test]
    fn string_literal_too_long() {
        // Insert Without Name Reference, raw name whose length is one more
        // than the limit. No string octets follow.
        let mut encoded = [0; 8];
        let mut b = octets::OctetsMut::with_slice(&mut encoded);
        encode_int(MAX_STRING_LITERAL_LENGTH + 1, 0b0100_0000, 5, &mut b)
            .unwrap();
        let len = b.off();

        let mut decoder = InstructionDecoder::new(ENCODER_STREAM_LANGUAGE);
        let mut data = &encoded[..len];

        assert_eq!(decoder.decode(&mut data), Err(Error::StringLiteralTooLong));

        // The error is latched.
        let mut data = &[0x00][..];
        assert_eq!(decoder.decode(&mut data), Err(Error::StringLiteralTooLong));
    }

    #[test]
    fn string_literal_at_limit_is_accepted() {
        let mut encoded = [0; 8];
        let mut b = octets::OctetsMut::with_slice(&mut encoded);
        encode_int(MAX_STRING_LITERAL_LENGTH, 0b0100_0000, 5, &mut b).unwrap();
        let len = b.off();

        let mut decoder = InstructionDecoder::new(ENCODER_STREAM_LANGUAGE);
        let mut data = &encoded[..len];

        assert_eq!(decoder.decode(&mut data), Ok(None));
    }

    #[test]
    fn integer_too_large() {
        let mut data = vec![0x3f];
        data.extend_from_slice(&[0xff; 10]);
        data.push(0x01);

        let mut decoder = InstructionDecoder::new(ENCODER_STREAM_LANGUAGE);
        let mut data = &data[..];

        assert_eq!(decoder.decode(&mut data), Err(Error::IntegerTooLarge));
    }

    #[test]
    fn invalid_huffman() {
        // Insert Without Name Reference, Huffman name of one octet that
        // decodes to 'a' followed by invalid padding.
        let mut decoder = InstructionDecoder::new(ENCODER_STREAM_LANGUAGE);
        let mut data = &[0b0110_0001, 0x18, 0x00][..];

        assert_eq!(decoder.decode(&mut data), Err(Error::InvalidHuffmanEncoding));
    }
}
