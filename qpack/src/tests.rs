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

//! Encoder and decoder talking to each other over the encoder stream, the
//! decoder stream and request streams.

use rstest::rstest;

use crate::*;

/// Moves pending encoder stream instructions to the decoder, `chunk` octets
/// at a time.
fn send_encoder_stream(enc: &mut Encoder, dec: &mut Decoder, chunk: usize) {
    let mut buf = [0u8; 4096];
    let len = enc.emit_instructions(&mut buf);

    for data in buf[..len].chunks(chunk) {
        assert_eq!(dec.on_encoder_stream_data(data), Ok(()));
    }
}

/// Moves pending decoder stream instructions to the encoder.
fn send_decoder_stream(dec: &mut Decoder, enc: &mut Encoder) {
    let mut buf = [0u8; 4096];
    let len = dec.emit_instructions(&mut buf);

    assert_eq!(enc.on_decoder_stream_data(&buf[..len]), Ok(()));
}

fn decode_header_block(
    dec: &mut Decoder, stream_id: u64, block: &[u8], chunk: usize,
) -> Result<Option<DecodedHeaders>> {
    for data in block.chunks(chunk) {
        dec.decode_header_block(stream_id, data)?;
    }

    dec.end_header_block(stream_id)
}

fn pair(huffman: bool, capacity: u64, max_blocked: u64) -> (Encoder, Decoder) {
    let mut config = Config::new();
    config.enable_huffman(huffman);
    config.set_qpack_max_table_capacity(capacity);
    config.set_qpack_blocked_streams(max_blocked);

    let mut enc = Encoder::with_config(&config);
    assert!(enc.set_maximum_dynamic_table_capacity(capacity));
    assert!(enc.set_maximum_blocked_streams(max_blocked));
    assert_eq!(enc.set_dynamic_table_capacity(capacity), Ok(()));

    (enc, Decoder::with_config(&config))
}

#[test]
fn encode_decode() {
    let mut encoded = [0u8; 512];

    let headers = vec![
        Header::new(b":path", b"/rsrc.php/v3/yn/r/rIPZ9Qkrdd9.png"),
        Header::new(b"accept-encoding", b"gzip, deflate, br"),
        Header::new(b"accept-language", b"en-US,en;q=0.9"),
        Header::new(b"user-agent", b"Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/63.0.3239.70 Safari/537.36"),
        Header::new(b"accept", b"image/webp,image/apng,image/*,*/*;q=0.8"),
        Header::new(b"referer", b"https://static.xx.fbcdn.net/rsrc.php/v3/yT/l/0,cross/dzXGESIlGQQ.css"),
        Header::new(b":authority", b"static.xx.fbcdn.net"),
        Header::new(b":scheme", b"https"),
        Header::new(b":method", b"GET"),
    ];

    let mut enc = Encoder::new();
    let len = enc.encode(0, &headers, &mut encoded).unwrap();

    let mut dec = Decoder::new(0, 0);
    let decoded = decode_header_block(&mut dec, 0, &encoded[..len], len)
        .unwrap()
        .unwrap();

    assert_eq!(decoded.headers, headers);
    assert_eq!(decoded.compressed_bytes, len as u64);
    assert!(!dec.has_instructions());
}

#[test]
fn lower_case() {
    let mut encoded = [0u8; 64];

    let headers_expected = vec![
        Header::new(b":status", b"200"),
        Header::new(b":path", b"/HeLlO"),
        Header::new(b"woot", b"woot"),
        Header::new(b"hello", b"WorlD"),
        Header::new(b"foo", b"BaR"),
    ];

    // Header.
    let headers_in = vec![
        Header::new(b":StAtUs", b"200"),
        Header::new(b":PaTh", b"/HeLlO"),
        Header::new(b"WooT", b"woot"),
        Header::new(b"hello", b"WorlD"),
        Header::new(b"fOo", b"BaR"),
    ];

    let mut enc = Encoder::new();
    let len = enc.encode(0, &headers_in, &mut encoded).unwrap();

    let mut dec = Decoder::new(0, 0);
    let headers_out = decode_header_block(&mut dec, 0, &encoded[..len], len)
        .unwrap()
        .unwrap()
        .headers;

    assert_eq!(headers_expected, headers_out);

    // HeaderRef.
    let headers_in = vec![
        HeaderRef::new(b":StAtUs", b"200"),
        HeaderRef::new(b":PaTh", b"/HeLlO"),
        HeaderRef::new(b"WooT", b"woot"),
        HeaderRef::new(b"hello", b"WorlD"),
        HeaderRef::new(b"fOo", b"BaR"),
    ];

    let mut enc = Encoder::new();
    let len = enc.encode(0, &headers_in, &mut encoded).unwrap();

    let mut dec = Decoder::new(0, 0);
    let headers_out = decode_header_block(&mut dec, 0, &encoded[..len], len)
        .unwrap()
        .unwrap()
        .headers;

    assert_eq!(headers_expected, headers_out);
}

#[rstest]
fn blocked_header_block(
    #[values(true, false)] huffman: bool, #[values(1, 3, 4096)] chunk: usize,
) {
    let mut encoded = [0u8; 64];

    let (mut enc, mut dec) = pair(huffman, 220, 16);

    let headers = vec![
        Header::new(b":authority", b"www.example.com"),
        Header::new(b":path", b"/sample/path"),
        Header::new(b"custom-key", b"custom-value"),
    ];

    for h in &headers {
        enc.insert(h.name(), h.value()).unwrap();
    }

    let len = enc.encode(4, &headers, &mut encoded).unwrap();
    assert_eq!(enc.blocked_stream_count(), 1);

    // The header block overtakes the encoder stream.
    assert_eq!(
        decode_header_block(&mut dec, 4, &encoded[..len], chunk),
        Ok(None)
    );
    assert_eq!(dec.blocked_stream_count(), 1);
    assert_eq!(dec.poll(), Err(Error::Done));

    send_encoder_stream(&mut enc, &mut dec, chunk);

    let (stream_id, event) = dec.poll().unwrap();
    assert_eq!(stream_id, 4);

    match event {
        Event::Headers(decoded) => {
            assert_eq!(decoded.headers, headers);
            assert_eq!(decoded.compressed_bytes, len as u64);
        },

        event => panic!("unexpected event {event:?}"),
    }

    assert_eq!(dec.poll(), Err(Error::Done));
    assert_eq!(dec.blocked_stream_count(), 0);

    send_decoder_stream(&mut dec, &mut enc);
    assert_eq!(enc.blocked_stream_count(), 0);
}

#[rstest]
fn no_blocking_allowed(#[values(true, false)] huffman: bool) {
    let mut encoded = [0u8; 64];

    let (mut enc, mut dec) = pair(huffman, 220, 0);

    enc.insert(b"custom-key", b"custom-value").unwrap();

    let headers = vec![Header::new(b"custom-key", b"custom-value")];

    // The entry can't be referenced until the decoder acknowledges it.
    let len = enc.encode(0, &headers, &mut encoded).unwrap();

    let decoded = decode_header_block(&mut dec, 0, &encoded[..len], len)
        .unwrap()
        .unwrap();
    assert_eq!(decoded.headers, headers);

    send_encoder_stream(&mut enc, &mut dec, 4096);
    send_decoder_stream(&mut dec, &mut enc);

    // Now it can.
    let len = enc.encode(4, &headers, &mut encoded).unwrap();
    assert_eq!(encoded[..len], [0x02, 0x00, 0x80]);

    let decoded = decode_header_block(&mut dec, 4, &encoded[..len], len)
        .unwrap()
        .unwrap();
    assert_eq!(decoded.headers, headers);

    send_decoder_stream(&mut dec, &mut enc);
    assert_eq!(enc.blocked_stream_count(), 0);
}

#[rstest]
fn table_churn(#[values(true, false)] huffman: bool) {
    let mut encoded = [0u8; 128];

    let (mut enc, mut dec) = pair(huffman, 200, 16);

    for i in 0..100u64 {
        let name = format!("x-key-{}", i % 7);
        let value = format!("value-{i}");

        assert_eq!(enc.insert(name.as_bytes(), value.as_bytes()), Ok(i));

        let headers = vec![
            Header::new(name.as_bytes(), value.as_bytes()),
            Header::new(b":method", b"GET"),
        ];

        let len = enc.encode(i * 4, &headers, &mut encoded).unwrap();

        send_encoder_stream(&mut enc, &mut dec, 5);

        let decoded =
            decode_header_block(&mut dec, i * 4, &encoded[..len], 7)
                .unwrap()
                .unwrap();
        assert_eq!(decoded.headers, headers);

        send_decoder_stream(&mut dec, &mut enc);
        assert_eq!(enc.blocked_stream_count(), 0);
    }

    assert_eq!(enc.table().inserted_entry_count(), 100);
    assert_eq!(dec.table().inserted_entry_count(), 100);
    assert_eq!(
        enc.table().dropped_entry_count(),
        dec.table().dropped_entry_count()
    );
    assert_eq!(enc.table().size(), dec.table().size());
}

#[test]
fn reset_blocked_stream() {
    let mut encoded = [0u8; 64];

    let (mut enc, mut dec) = pair(false, 220, 16);

    enc.insert(b"custom-key", b"custom-value").unwrap();

    let headers = vec![Header::new(b"custom-key", b"custom-value")];

    let len = enc.encode(8, &headers, &mut encoded).unwrap();
    assert_eq!(enc.blocked_stream_count(), 1);

    assert_eq!(
        decode_header_block(&mut dec, 8, &encoded[..len], len),
        Ok(None)
    );

    assert_eq!(dec.on_stream_reset(8), Ok(()));
    assert_eq!(dec.blocked_stream_count(), 0);

    send_decoder_stream(&mut dec, &mut enc);
    assert_eq!(enc.blocked_stream_count(), 0);

    // The insert still reaches the decoder, without unblocking anything.
    send_encoder_stream(&mut enc, &mut dec, 4096);
    assert_eq!(dec.poll(), Err(Error::Done));
    assert_eq!(dec.table().inserted_entry_count(), 1);
}

#[test]
fn header_list_too_large() {
    let mut encoded = [0u8; 64];

    let mut enc = Encoder::new();

    let headers = vec![
        Header::new(b":method", b"GET"),
        Header::new(b"x-large", b"0123456789"),
    ];

    let len = enc.encode(0, &headers, &mut encoded).unwrap();

    let mut config = Config::new();
    config.set_max_field_section_size(50);

    let mut dec = Decoder::with_config(&config);

    let decoded = decode_header_block(&mut dec, 0, &encoded[..len], len)
        .unwrap()
        .unwrap();

    assert!(decoded.limit_exceeded);
    assert_eq!(decoded.headers, vec![Header::new(b":method", b"GET")]);
}
