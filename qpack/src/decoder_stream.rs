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

//! Instructions carried on the decoder stream.

use crate::instructions::encode_instruction_to_vec;
use crate::instructions::DecodedInstruction;
use crate::instructions::Instruction;
use crate::instructions::InstructionDecoder;
use crate::instructions::InstructionValues;
use crate::instructions::Opcode;
use crate::instructions::DECODER_STREAM_LANGUAGE;
use crate::instructions::HEADER_ACKNOWLEDGEMENT;
use crate::instructions::INSERT_COUNT_INCREMENT;
use crate::instructions::STREAM_CANCELLATION;
use crate::Error;
use crate::Result;

/// An instruction sent by the decoder to inform the encoder about the state
/// of its dynamic table and of outstanding header blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecoderInstruction {
    InsertCountIncrement { increment: u64 },

    HeaderAcknowledgement { stream_id: u64 },

    StreamCancellation { stream_id: u64 },
}

impl TryFrom<DecodedInstruction> for DecoderInstruction {
    type Error = Error;

    fn try_from(i: DecodedInstruction) -> Result<DecoderInstruction> {
        let instruction = match i.opcode {
            Opcode::InsertCountIncrement =>
                DecoderInstruction::InsertCountIncrement {
                    increment: i.varint,
                },

            Opcode::HeaderAcknowledgement =>
                DecoderInstruction::HeaderAcknowledgement {
                    stream_id: i.varint,
                },

            Opcode::StreamCancellation =>
                DecoderInstruction::StreamCancellation {
                    stream_id: i.varint,
                },

            _ => return Err(Error::InvalidState),
        };

        Ok(instruction)
    }
}

/// Parses the decoder stream received from the peer.
pub struct DecoderStreamReceiver {
    decoder: InstructionDecoder,
}

impl Default for DecoderStreamReceiver {
    fn default() -> Self {
        DecoderStreamReceiver {
            decoder: InstructionDecoder::new(DECODER_STREAM_LANGUAGE),
        }
    }
}

impl DecoderStreamReceiver {
    pub fn new() -> DecoderStreamReceiver {
        DecoderStreamReceiver::default()
    }

    /// Decodes the next instruction from `data`, advancing it past the
    /// consumed octets. Returns `Ok(None)` when `data` has been exhausted
    /// without completing an instruction.
    pub fn decode(
        &mut self, data: &mut &[u8],
    ) -> Result<Option<DecoderInstruction>> {
        let Some(instruction) = self.decoder.decode(data)? else {
            return Ok(None);
        };

        let instruction = DecoderInstruction::try_from(instruction)?;

        trace!("decoder stream instruction {:?}", instruction);

        Ok(Some(instruction))
    }
}

/// Serializes decoder stream instructions until they are emitted.
#[derive(Default)]
pub struct DecoderStreamSender {
    buffer: Vec<u8>,
}

impl DecoderStreamSender {
    pub fn new() -> DecoderStreamSender {
        DecoderStreamSender::default()
    }

    pub fn send_insert_count_increment(&mut self, increment: u64) -> Result<()> {
        self.send(&INSERT_COUNT_INCREMENT, increment)
    }

    pub fn send_header_acknowledgement(&mut self, stream_id: u64) -> Result<()> {
        self.send(&HEADER_ACKNOWLEDGEMENT, stream_id)
    }

    pub fn send_stream_cancellation(&mut self, stream_id: u64) -> Result<()> {
        self.send(&STREAM_CANCELLATION, stream_id)
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

    fn send(&mut self, instruction: &Instruction, varint: u64) -> Result<()> {
        let values = InstructionValues {
            varint,
            ..Default::default()
        };

        encode_instruction_to_vec(instruction, &values, false, &mut self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let mut sender = DecoderStreamSender::new();

        sender.send_header_acknowledgement(4).unwrap();
        sender.send_insert_count_increment(1).unwrap();
        sender.send_stream_cancellation(8).unwrap();
        sender.send_header_acknowledgement(1337).unwrap();

        let mut out = [0; 16];
        let len = sender.emit(&mut out);

        assert!(!sender.has_pending());
        assert_eq!(&out[..4], &[0x84, 0x01, 0x48, 0xff]);

        let mut receiver = DecoderStreamReceiver::new();
        let mut data = &out[..len];
        let mut decoded = Vec::new();

        while let Some(i) = receiver.decode(&mut data).unwrap() {
            decoded.push(i);
        }

        assert_eq!(decoded, vec![
            DecoderInstruction::HeaderAcknowledgement { stream_id: 4 },
            DecoderInstruction::InsertCountIncrement { increment: 1 },
            DecoderInstruction::StreamCancellation { stream_id: 8 },
            DecoderInstruction::HeaderAcknowledgement { stream_id: 1337 },
        ]);
    }

    #[test]
    fn fragmented() {
        // Header Acknowledgement for stream 1337, split after every octet.
        let encoded = [0xff, 0xba, 0x09];
        let mut receiver = DecoderStreamReceiver::new();

        let mut data = &encoded[..1];
        assert_eq!(receiver.decode(&mut data), Ok(None));

        let mut data = &encoded[1..2];
        assert_eq!(receiver.decode(&mut data), Ok(None));

        let mut data = &encoded[2..];
        assert_eq!(
            receiver.decode(&mut data),
            Ok(Some(DecoderInstruction::HeaderAcknowledgement {
                stream_id: 1337
            }))
        );
    }
}
