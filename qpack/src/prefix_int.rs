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

//! Integers with an N-bit prefix (RFC 7541, Section 5.1).

use crate::Error;
use crate::Result;

/// Encodes `v` using the low `prefix` bits of the first octet, the high bits
/// of which are taken from `first`.
pub fn encode_int(
    mut v: u64, first: u8, prefix: u8, b: &mut octets::OctetsMut,
) -> Result<()> {
    let mask = prefix_mask(prefix);

    // Encode I on N bits.
    if v < mask {
        b.put_u8(first | v as u8)?;
        return Ok(());
    }

    // Encode (2^N - 1) on N bits.
    b.put_u8(first | mask as u8)?;

    v -= mask;

    while v >= 128 {
        // Encode (I % 128 + 128) on 8 bits.
        b.put_u8((v % 128 + 128) as u8)?;

        v >>= 7;
    }

    // Encode I on 8 bits.
    b.put_u8(v as u8)?;

    Ok(())
}

/// Returns the number of octets [`encode_int()`] writes for `v`.
pub fn encoded_int_len(v: u64, prefix: u8) -> usize {
    let mask = prefix_mask(prefix);

    if v < mask {
        return 1;
    }

    let mut v = v - mask;
    let mut len = 2;

    while v >= 128 {
        v >>= 7;
        len += 1;
    }

    len
}

fn prefix_mask(prefix: u8) -> u64 {
    debug_assert!((1..=8).contains(&prefix));

    (1u64 << prefix) - 1
}

/// Resumable decoder for a single prefixed integer.
///
/// The first octet is handed to [`start()`], every continuation octet to
/// [`resume()`], until either returns a value.
///
/// [`start()`]: IntDecoder::start
/// [`resume()`]: IntDecoder::resume
#[derive(Clone, Copy, Debug, Default)]
pub struct IntDecoder {
    value: u64,
    shift: u32,
}

impl IntDecoder {
    /// Starts decoding with the first octet, returning the value right away
    /// if it fits in the prefix.
    pub fn start(&mut self, first: u8, prefix: u8) -> Option<u64> {
        let mask = prefix_mask(prefix);
        let v = u64::from(first) & mask;

        self.value = v;
        self.shift = 0;

        if v < mask {
            return Some(v);
        }

        None
    }

    /// Consumes one continuation octet, returning the value once the last
    /// one is seen.
    pub fn resume(&mut self, byte: u8) -> Result<Option<u64>> {
        let chunk = u64::from(byte & 0x7f);

        if self.shift >= u64::BITS {
            return Err(Error::IntegerTooLarge);
        }

        let inc = chunk << self.shift;

        // Bits shifted out of the accumulator.
        if inc >> self.shift != chunk {
            return Err(Error::IntegerTooLarge);
        }

        self.value =
            self.value.checked_add(inc).ok_or(Error::IntegerTooLarge)?;

        self.shift += 7;

        if byte & 0x80 == 0 {
            return Ok(Some(self.value));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_int(b: &mut octets::Octets, prefix: u8) -> Result<u64> {
        let mut decoder = IntDecoder::default();

        if let Some(v) = decoder.start(b.get_u8()?, prefix) {
            return Ok(v);
        }

        loop {
            if let Some(v) = decoder.resume(b.get_u8()?)? {
                return Ok(v);
            }
        }
    }

    #[test]
    fn encode_int1() {
        let expected = [0b01010];
        let mut encoded = [0; 1];
        let mut b = octets::OctetsMut::with_slice(&mut encoded);

        assert!(encode_int(10, 0, 5, &mut b).is_ok());

        assert_eq!(expected, encoded);
        assert_eq!(encoded_int_len(10, 5), 1);
    }

    #[test]
    fn encode_int2() {
        let expected = [0b11111, 0b10011010, 0b00001010];
        let mut encoded = [0; 3];
        let mut b = octets::OctetsMut::with_slice(&mut encoded);

        assert!(encode_int(1337, 0, 5, &mut b).is_ok());

        assert_eq!(expected, encoded);
        assert_eq!(encoded_int_len(1337, 5), 3);
    }

    #[test]
    fn encode_int3() {
        let expected = [0b101010];
        let mut encoded = [0; 1];
        let mut b = octets::OctetsMut::with_slice(&mut encoded);

        assert!(encode_int(42, 0, 8, &mut b).is_ok());

        assert_eq!(expected, encoded);
    }

    #[test]
    fn encode_int_keeps_high_bits() {
        let mut encoded = [0; 1];
        let mut b = octets::OctetsMut::with_slice(&mut encoded);

        assert!(encode_int(5, 0b1100_0000, 6, &mut b).is_ok());

        assert_eq!(encoded, [0b1100_0101]);
    }

    #[test]
    fn encode_int_buffer_too_short() {
        let mut encoded = [0; 2];
        let mut b = octets::OctetsMut::with_slice(&mut encoded);

        assert_eq!(encode_int(1337, 0, 5, &mut b), Err(Error::BufferTooShort));
    }

    #[test]
    fn encoded_len_boundaries() {
        assert_eq!(encoded_int_len(30, 5), 1);
        assert_eq!(encoded_int_len(31, 5), 2);
        assert_eq!(encoded_int_len(31 + 127, 5), 2);
        assert_eq!(encoded_int_len(31 + 128, 5), 3);
        assert_eq!(encoded_int_len(u64::MAX, 8), 11);
    }

    #[test]
    fn decode_int1() {
        let encoded = [0b01010, 0x02];
        let mut b = octets::Octets::with_slice(&encoded);

        assert_eq!(decode_int(&mut b, 5), Ok(10));
        assert_eq!(b.cap(), 1);
    }

    #[test]
    fn decode_int2() {
        let encoded = [0b11111, 0b10011010, 0b00001010];
        let mut b = octets::Octets::with_slice(&encoded);

        assert_eq!(decode_int(&mut b, 5), Ok(1337));
    }

    #[test]
    fn decode_int3() {
        let encoded = [0b101010];
        let mut b = octets::Octets::with_slice(&encoded);

        assert_eq!(decode_int(&mut b, 8), Ok(42));
    }

    #[test]
    fn decode_int_ignores_high_bits() {
        let encoded = [0b1110_1010];
        let mut b = octets::Octets::with_slice(&encoded);

        assert_eq!(decode_int(&mut b, 5), Ok(10));
    }

    #[test]
    fn decode_int_incomplete() {
        let encoded = [0b11111, 0b10011010];
        let mut b = octets::Octets::with_slice(&encoded);

        assert_eq!(decode_int(&mut b, 5), Err(Error::BufferTooShort));
    }

    #[test]
    fn decode_max() {
        let mut encoded = [0; 11];
        let mut b = octets::OctetsMut::with_slice(&mut encoded);
        encode_int(u64::MAX, 0, 8, &mut b).unwrap();
        assert_eq!(b.cap(), 0);

        let mut b = octets::Octets::with_slice(&encoded);
        assert_eq!(decode_int(&mut b, 8), Ok(u64::MAX));
    }

    #[test]
    fn decode_too_large() {
        // Exceeds u64::MAX.
        let encoded =
            [0xff, 0x81, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        let mut b = octets::Octets::with_slice(&encoded);

        assert_eq!(decode_int(&mut b, 8), Err(Error::IntegerTooLarge));
    }

    #[test]
    fn decode_too_many_continuation_bytes() {
        let mut encoded = vec![0x1f];
        encoded.extend_from_slice(&[0x80; 10]);
        encoded.push(0x01);
        let mut b = octets::Octets::with_slice(&encoded);

        assert_eq!(decode_int(&mut b, 5), Err(Error::IntegerTooLarge));
    }

    #[test]
    fn decode_resumes_one_byte_at_a_time() {
        let encoded = [0b11111, 0b10011010, 0b00001010];
        let mut decoder = IntDecoder::default();

        assert_eq!(decoder.start(encoded[0], 5), None);
        assert_eq!(decoder.resume(encoded[1]), Ok(None));
        assert_eq!(decoder.resume(encoded[2]), Ok(Some(1337)));
    }
}
