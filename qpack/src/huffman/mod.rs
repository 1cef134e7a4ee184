// Copyright (C) 2019, Cloudflare, Inc.
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

//! Huffman coding of string literals (RFC 7541, Appendix B).

use crate::Error;
use crate::Result;

use self::table::DECODE_TABLE;
use self::table::ENCODE_TABLE;

/// Decodes a complete Huffman-coded string literal.
pub fn decode(src: &[u8]) -> Result<Vec<u8>> {
    // Max compression ratio is >= 0.5
    let mut out = Vec::with_capacity(src.len() << 1);

    let mut decoder = Decoder::new();

    for &byte in src {
        if let Some(b) = decoder.decode4(byte >> 4)? {
            out.push(b);
        }

        if let Some(b) = decoder.decode4(byte & 0xf)? {
            out.push(b);
        }
    }

    if !decoder.is_final() {
        return Err(Error::InvalidHuffmanEncoding);
    }

    Ok(out)
}

/// Huffman-codes `src` into `out`, padding the last octet with the most
/// significant bits of EOS.
pub fn encode(src: &[u8], out: &mut octets::OctetsMut) -> Result<()> {
    let mut bits: u64 = 0;
    let mut bits_left = 40;

    for &b in src {
        let (nbits, code) = ENCODE_TABLE[b as usize];

        bits |= code << (bits_left - nbits);
        bits_left -= nbits;

        while bits_left <= 32 {
            out.put_u8((bits >> 32) as u8)?;

            bits <<= 8;
            bits_left += 8;
        }
    }

    if bits_left != 40 {
        // This writes the EOS token
        bits |= (1 << bits_left) - 1;

        out.put_u8((bits >> 32) as u8)?;
    }

    Ok(())
}

/// Returns the number of octets [`encode()`] would produce for `src`.
pub fn encode_output_length(src: &[u8]) -> usize {
    let bits: usize = src.iter().map(|&b| ENCODE_TABLE[b as usize].0).sum();

    bits.div_ceil(8)
}

struct Decoder {
    state: usize,
    maybe_eos: bool,
}

impl Decoder {
    fn new() -> Decoder {
        Decoder {
            state: 0,
            maybe_eos: false,
        }
    }

    // Decodes 4 bits
    fn decode4(&mut self, input: u8) -> Result<Option<u8>> {
        const MAYBE_EOS: u8 = 1;
        const DECODED: u8 = 2;
        const ERROR: u8 = 4;

        // (next-state, byte, flags)
        let (next, byte, flags) = DECODE_TABLE[self.state][input as usize];

        if flags & ERROR == ERROR {
            // The EOS symbol was decoded
            return Err(Error::InvalidHuffmanEncoding);
        }

        let ret = if flags & DECODED == DECODED {
            Some(byte)
        } else {
            None
        };

        self.state = next;
        self.maybe_eos = flags & MAYBE_EOS == MAYBE_EOS;

        Ok(ret)
    }

    // Padding must be a prefix of EOS shorter than 8 bits.
    fn is_final(&self) -> bool {
        self.state == 0 || self.maybe_eos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_to_vec(src: &[u8]) -> Vec<u8> {
        let mut out = vec![0; encode_output_length(src)];
        let mut b = octets::OctetsMut::with_slice(&mut out);
        encode(src, &mut b).unwrap();
        assert_eq!(b.cap(), 0);

        out
    }

    #[test]
    fn rfc7541_vectors() {
        // RFC 7541, C.4.1 - C.4.3
        assert_eq!(encode_to_vec(b"www.example.com"), [
            0xf1, 0xe3, 0xc2, 0xe5, 0xf2, 0x3a, 0x6b, 0xa0, 0xab, 0x90, 0xf4,
            0xff
        ]);
        assert_eq!(encode_to_vec(b"no-cache"), [
            0xa8, 0xeb, 0x10, 0x64, 0x9c, 0xbf
        ]);
        assert_eq!(encode_to_vec(b"custom-key"), [
            0x25, 0xa8, 0x49, 0xe9, 0x5b, 0xa9, 0x7d, 0x7f
        ]);

        assert_eq!(
            decode(&[0xa8, 0xeb, 0x10, 0x64, 0x9c, 0xbf]),
            Ok(b"no-cache".to_vec())
        );
    }

    #[test]
    fn all_octets() {
        let src: Vec<u8> = (0..=255).collect();

        assert_eq!(decode(&encode_to_vec(&src)), Ok(src));
    }

    #[test]
    fn output_length() {
        assert_eq!(encode_output_length(b""), 0);
        // 'Z' has an 8 bit code.
        assert_eq!(encode_output_length(b"Z"), 1);
        assert_eq!(encode_output_length(b"ZZZZ"), 4);
        // 'a' has a 5 bit code.
        assert_eq!(encode_output_length(b"aaaaaaaa"), 5);
    }

    #[test]
    fn padding_too_long() {
        // 'a' (00011) followed by 11 bits of padding.
        assert_eq!(decode(&[0x1f, 0xff]), Err(Error::InvalidHuffmanEncoding));
    }

    #[test]
    fn padding_not_eos_prefix() {
        // 'a' (00011) followed by 000 padding.
        assert_eq!(decode(&[0x18]), Err(Error::InvalidHuffmanEncoding));
    }

    #[test]
    fn eos_in_string() {
        assert_eq!(
            decode(&[0xff, 0xff, 0xff, 0xff]),
            Err(Error::InvalidHuffmanEncoding)
        );
    }

    #[test]
    fn empty() {
        assert_eq!(decode(&[]), Ok(Vec::new()));
    }
}

mod table;
