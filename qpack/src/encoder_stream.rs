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

//! Instructions carried on the encoder stream.

use crate::instructions::encode_instruction_to_vec;
use crate::instructions::DecodedInstruction;
use crate::instructions::Instruction;
use crate::instructions::InstructionDecoder;
use crate::instructions::InstructionValues;
use crate::instructions::Opcode;
use crate::instructions::DUPLICATE;
use crate::instructions::ENCODER_STREAM_LANGUAGE;
use crate::instructions::INSERT_WITHOUT_NAME_REFERENCE;
use crate::instructions::INSERT_WITH_NAME_REFERENCE;
use crate::instructions::SET_DYNAMIC_TABLE_CAPACITY;
use crate::Error;
use crate::Result;

/// An instruction sent by the encoder to mutate the decoder's dynamic table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncoderInstruction {
    /// Inserts an entry whose name is taken from the static table, or from
    /// the dynamic table relative to the current insert count.
    InsertWithNameReference {
        is_static: bool,
        name_index: u64,
        value: Vec<u8>,
    },

    InsertWithoutNameReference {
        name: Vec<u8>,
        value: Vec<u8>,
    },

    /// Duplicates the dynamic table entry at the given relative index.
    Duplicate { index: u64 },

    SetDynamicTableCapacity { capacity: u64 },
}

impl TryFrom<DecodedInstruction> for EncoderInstruction {
    type Error = Error;

    fn try_from(i: DecodedInstruction) -> Result<EncoderInstruction> {
        let instruction = match i.opcode {
            Opcode::InsertWithNameReference =>
                EncoderInstruction::InsertWithNameReference {
                    is_static: i.s_bit,
                    name_index: i.varint,
                    value: i.value,
                },

            Opcode::InsertWithoutNameReference =>
                EncoderInstruction::InsertWithoutNameReference {
                    name: i.name,
                    value: i.value,
                },

            Opcode::Duplicate =>
                EncoderInstruction::Duplicate { index: i.varint },

            Opcode::SetDynamicTableCapacity =>
                EncoderInstruction::SetDynamicTableCapacity {
                    capacity: i.varint,
                },

            _ => return Err(Error::InvalidState),
        };

        Ok(instruction)
    }
}

/// Parses the encoder stream received from the peer.
pub struct EncoderStreamReceiver {
    decoder: InstructionDecoder,
}

impl Default for EncoderStreamReceiver {
    fn default() -> Self {
        EncoderStreamReceiver {
            decoder: InstructionDecoder::new(ENCODER_STREAM_LANGUAGE),
        }
    }
}

impl EncoderStreamReceiver {
    pub fn new() -> EncoderStreamReceiver {
        EncoderStreamReceiver::default()
    }

    /// Decodes the next instruction from `data`, advancing it past the
    /// consumed octets. Returns `Ok(None)` when `data` has been exhausted
    /// without completing an instruction.
    pub fn decode(
        &mut self, data: &mut &[u8],
    ) -> Result<Option<EncoderInstruction>> {
        let Some(instruction) = self.decoder.decode(data)? else {
            return Ok(None);
        };

        let instruction = EncoderInstruction::try_from(instruction)?;

        trace!("encoder stream instruction {:?}", instruction);

        Ok(Some(instruction))
    }
}

/// Serializes encoder stream instructions until they are emitted.
#[derive(Default)]
pub struct EncoderStreamSender {
    buffer: Vec<u8>,
    huffman: bool,
}

impl EncoderStreamSender {
    pub fn new(huffman: bool) -> EncoderStreamSender {
        EncoderStreamSender {
            buffer: Vec::new(),
            huffman,
        }
    }

    pub fn send_insert_with_name_reference(
        &mut self, is_static: bool, name_index: u64, value: &[u8],
    ) -> Result<()> {
        let values = InstructionValues {
            s_bit: is_static,
            varint: name_index,
            value,
            ..Default::default()
        };

        self.send(&INSERT_WITH_NAME_REFERENCE, &values)
    }

    pub fn send_insert_without_name_reference(
        &mut self, name: &[u8], value: &[u8],
    ) -> Result<()> {
        let values = InstructionValues {
            name,
            value,
            ..Default::default()
        };

        self.send(&INSERT_WITHOUT_NAME_REFERENCE, &values)
    }

    pub fn send_duplicate(&mut self, index: u64) -> Result<()> {
        let values = InstructionValues {
            varint: index,
            ..Default::default()
        };

        self.send(&DUPLICATE, &values)
    }

    pub fn send_set_dynamic_table_capacity(
        &mut self, capacity: u64,
    ) -> Result<()> {
        let values = InstructionValues {
            varint: capacity,
            ..Default::default()
        };

        self.send(&SET_DYNAMIC_TABLE_CAPACITY, &values)
    }

    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Moves as many buffered octets as fit into `buf`, returning how many
    /// were written. Emitted octets must be delivered to the peer in order.
    pub fn emit(&mut self, buf: &mut [u8]) -> usize {
        let len = self.buffer.len().min(buf.len());

        buf[..len].copy_from_slice(&self.buffer[..len]);
        self.buffer.drain(..len);

        len
    }

    fn send(
        &mut self, instruction: &Instruction, values: &InstructionValues,
    ) -> Result<()> {
        encode_instruction_to_vec(
            instruction,
            values,
            self.huffman,
            &mut self.buffer,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(data: &[u8]) -> Result<Vec<EncoderInstruction>> {
        let mut receiver = EncoderStreamReceiver::new();
        let mut data = data;
        let mut out = Vec::new();

        while let Some(i) = receiver.decode(&mut data)? {
            out.push(i);
        }

        Ok(out)
    }

    #[test]
    fn insert_static_name_reference_empty_value() {
        assert_eq!(
            decode_all(&[0xc5, 0x00]),
            Ok(vec![EncoderInstruction::InsertWithNameReference {
                is_static: true,
                name_index: 5,
                value: Vec::new(),
            }])
        );
    }

    #[test]
    fn decode_rfc9204_encoder_stream() {
        let encoder_stream = [
            0x3f, 0xbd, 0x01, 0xc0, 0x0f, 0x77, 0x77, 0x77, 0x2e, 0x65, 0x78,
            0x61, 0x6d, 0x70, 0x6c, 0x65, 0x2e, 0x63, 0x6f, 0x6d, 0xc1, 0x0c,
            0x2f, 0x73, 0x61, 0x6d, 0x70, 0x6c, 0x65, 0x2f, 0x70, 0x61, 0x74,
            0x68, 0x4a, 0x63, 0x75, 0x73, 0x74, 0x6f, 0x6d, 0x2d, 0x6b, 0x65,
            0x79, 0x0c, 0x63, 0x75, 0x73, 0x74, 0x6f, 0x6d, 0x2d, 0x76, 0x61,
            0x6c, 0x75, 0x65, 0x02,
        ];

        assert_eq!(decode_all(&encoder_stream), Ok(vec![
            EncoderInstruction::SetDynamicTableCapacity { capacity: 220 },
            EncoderInstruction::InsertWithNameReference {
                is_static: true,
                name_index: 0,
                value: b"www.example.com".to_vec(),
            },
            EncoderInstruction::InsertWithNameReference {
                is_static: true,
                name_index: 1,
                value: b"/sample/path".to_vec(),
            },
            EncoderInstruction::InsertWithoutNameReference {
                name: b"custom-key".to_vec(),
                value: b"custom-value".to_vec(),
            },
            EncoderInstruction::Duplicate { index: 2 },
        ]));
    }

    #[test]
    fn send_matches_rfc9204() {
        let mut sender = EncoderStreamSender::new(false);
        assert!(!sender.has_pending());

        sender.send_set_dynamic_table_capacity(220).unwrap();
        sender
            .send_insert_with_name_reference(true, 0, b"www.example.com")
            .unwrap();
        sender
            .send_insert_with_name_reference(true, 1, b"/sample/path")
            .unwrap();
        sender
            .send_insert_without_name_reference(b"custom-key", b"custom-value")
            .unwrap();
        sender.send_duplicate(2).unwrap();

        assert!(sender.has_pending());

        let mut out = [0; 64];
        assert_eq!(sender.emit(&mut out[..10]), 10);
        assert_eq!(sender.emit(&mut out[10..]), 49);
        assert!(!sender.has_pending());

        assert_eq!(&out[..3], &[0x3f, 0xbd, 0x01]);
        assert_eq!(out[58], 0x02);
        assert_eq!(decode_all(&out[..59]).unwrap().len(), 5);
    }

    #[test]
    fn send_huffman() {
        let mut sender = EncoderStreamSender::new(true);

        sender
            .send_insert_without_name_reference(b"custom-key", b"custom-value")
            .unwrap();

        let mut out = [0; 64];
        let len = sender.emit(&mut out);

        // RFC 7541, C.4.3.
        assert_eq!(&out[..len], &[
            0x68, 0x25, 0xa8, 0x49, 0xe9, 0x5b, 0xa9, 0x7d, 0x7f, 0x89, 0x25,
            0xa8, 0x49, 0xe9, 0x5b, 0xb8, 0xe8, 0xb4, 0xbf,
        ]);
    }
}
